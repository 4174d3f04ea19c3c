//! SQLite storage for the final per-epoch validator states.
use crate::activity_tracker::ValidatorEpochRecord;
use log::{debug, info};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Transaction};
use std::fs::OpenOptions;
use std::path::Path;
use std::time::Duration;

pub use self::error::Error;

mod error;

type Pool = r2d2::Pool<SqliteConnectionManager>;

/// A single writer is all the tool ever needs.
pub const POOL_SIZE: u32 = 1;
#[cfg(not(test))]
pub const CONNECTION_TIMEOUT: Duration = Duration::from_secs(5);
#[cfg(test)]
pub const CONNECTION_TIMEOUT: Duration = Duration::from_millis(100);

/// Log progress every time this many records have been written in a batch.
pub const PROGRESS_LOG_INTERVAL: usize = 1000;

#[derive(Debug, Clone)]
pub struct Database {
    conn_pool: Pool,
}

impl Database {
    /// Open an existing database at the given `path`, or create one if none exists.
    pub fn open_or_create(path: &Path) -> Result<Self, Error> {
        if path.exists() {
            Self::open(path)
        } else {
            Self::create(path)
        }
    }

    /// Create a database at `path`.
    ///
    /// Error if any file already exists at `path`.
    pub fn create(path: &Path) -> Result<Self, Error> {
        OpenOptions::new()
            .write(true)
            .read(true)
            .create_new(true)
            .open(path)?;

        let conn_pool = Self::open_conn_pool(path)?;
        let conn = conn_pool.get()?;

        conn.execute(
            "CREATE TABLE validator_state (
                validator_idx INTEGER NOT NULL,
                epoch INTEGER NOT NULL,
                distance INTEGER NOT NULL
            )",
            params![],
        )?;

        info!("Created database at {}", path.display());
        Ok(Self { conn_pool })
    }

    /// Open an existing database from disk.
    pub fn open(path: &Path) -> Result<Self, Error> {
        let conn_pool = Self::open_conn_pool(path)?;
        debug!("Opened database at {}", path.display());
        Ok(Self { conn_pool })
    }

    fn open_conn_pool(path: &Path) -> Result<Pool, Error> {
        let manager = SqliteConnectionManager::file(path)
            .with_flags(rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE);
        let conn_pool = Pool::builder()
            .max_size(POOL_SIZE)
            .connection_timeout(CONNECTION_TIMEOUT)
            .build(manager)?;
        Ok(conn_pool)
    }

    /// Store the final state of a single validator for an epoch.
    pub fn register_validator_state(&self, record: &ValidatorEpochRecord) -> Result<(), Error> {
        let mut conn = self.conn_pool.get()?;
        let txn = conn.transaction()?;
        Self::insert_validator_state(&txn, record)?;
        txn.commit()?;
        Ok(())
    }

    /// Store many records in a single transaction. Returns the number of rows written.
    pub fn insert_batch_validator_states(
        &self,
        records: &[ValidatorEpochRecord],
    ) -> Result<usize, Error> {
        let mut conn = self.conn_pool.get()?;
        let txn = conn.transaction()?;

        for (i, record) in records.iter().enumerate() {
            Self::insert_validator_state(&txn, record)?;

            let written = i + 1;
            if written % PROGRESS_LOG_INTERVAL == 0 {
                info!("Written {}/{} validator states", written, records.len());
            }
        }

        txn.commit()?;
        Ok(records.len())
    }

    fn insert_validator_state(
        txn: &Transaction,
        record: &ValidatorEpochRecord,
    ) -> Result<(), Error> {
        txn.execute(
            "INSERT INTO validator_state (validator_idx, epoch, distance) VALUES (?1, ?2, ?3)",
            params![record.validator_index, record.epoch, record.distance],
        )?;
        Ok(())
    }

    /// Read back every stored record, in insertion order.
    pub fn validator_states(&self) -> Result<Vec<ValidatorEpochRecord>, Error> {
        let conn = self.conn_pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT validator_idx, epoch, distance FROM validator_state ORDER BY rowid ASC",
        )?;
        let records = stmt
            .query_map(params![], |row| {
                Ok(ValidatorEpochRecord {
                    validator_index: row.get(0)?,
                    epoch: row.get(1)?,
                    distance: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity_tracker::VALIDATOR_MISSING;
    use tempfile::tempdir;
    use types::Epoch;

    fn record(validator_index: u64, epoch: u64, distance: u64) -> ValidatorEpochRecord {
        ValidatorEpochRecord {
            validator_index,
            epoch: Epoch::new(epoch),
            distance,
        }
    }

    #[test]
    fn open_non_existent_error() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("db.sqlite");
        assert!(Database::open(&file).is_err());
    }

    #[test]
    fn double_create_error() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("db.sqlite");
        let db = Database::create(&file).unwrap();
        drop(db);
        assert!(matches!(Database::create(&file), Err(Error::Io(_))));
    }

    #[test]
    fn open_or_create_keeps_existing_rows() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("db.sqlite");

        let db = Database::open_or_create(&file).unwrap();
        db.register_validator_state(&record(9, 3, VALIDATOR_MISSING))
            .unwrap();
        drop(db);

        let db = Database::open_or_create(&file).unwrap();
        assert_eq!(
            db.validator_states().unwrap(),
            vec![record(9, 3, VALIDATOR_MISSING)]
        );
    }

    #[test]
    fn batch_insert_preserves_order() {
        let dir = tempdir().unwrap();
        let db = Database::create(&dir.path().join("db.sqlite")).unwrap();

        let records = (0..2500)
            .map(|i| record(i, 3 + i / 1000, 2 + i % 5))
            .collect::<Vec<_>>();
        assert_eq!(db.insert_batch_validator_states(&records).unwrap(), 2500);
        assert_eq!(db.validator_states().unwrap(), records);
    }

    #[test]
    fn empty_batch() {
        let dir = tempdir().unwrap();
        let db = Database::create(&dir.path().join("db.sqlite")).unwrap();
        assert_eq!(db.insert_batch_validator_states(&[]).unwrap(), 0);
        assert!(db.validator_states().unwrap().is_empty());
    }

    #[test]
    fn connection_settings_applied() {
        let dir = tempdir().unwrap();
        let db = Database::create(&dir.path().join("db.sqlite")).unwrap();
        assert_eq!(db.conn_pool.max_size(), POOL_SIZE);
        assert_eq!(db.conn_pool.connection_timeout(), CONNECTION_TIMEOUT);
    }
}
