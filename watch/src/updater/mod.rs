use crate::config::Config;
use crate::correlator::{self, Correlator};
use crate::database::{self, Database};
use crate::shutdown::{shutdown_signal, FinalizeGuard, ShutdownReason};
use crate::source::ChainSource;
use eth2::types::{BlockId, Epoch, SignedBeaconBlock, Slot, SLOTS_PER_EPOCH};
use eth2::BeaconNodeHttpClient;
use log::{debug, info, warn};
use std::fmt;
use std::future::Future;
use tokio::time::{interval, MissedTickBehavior};
use url::Url;

#[derive(Debug)]
pub enum Error {
    BeaconNode(eth2::Error),
    Correlation(correlator::Error),
    Database(database::Error),
    /// The beacon node has no genesis yet.
    ChainNotStarted,
    InvalidUrl(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl From<eth2::Error> for Error {
    fn from(e: eth2::Error) -> Self {
        Error::BeaconNode(e)
    }
}

impl From<correlator::Error> for Error {
    fn from(e: correlator::Error) -> Self {
        Error::Correlation(e)
    }
}

impl From<database::Error> for Error {
    fn from(e: database::Error) -> Self {
        Error::Database(e)
    }
}

/// The outcome of a completed wrap-up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpSummary {
    pub reason: ShutdownReason,
    pub blocks_processed: u64,
    pub fully_seen_epochs: Option<(Epoch, Epoch)>,
    pub num_interesting: usize,
    pub records_written: usize,
}

/// Drives the fetch loop: pulls blocks one slot at a time, feeds them to the correlator and
/// persists the results once the experiment ends.
pub struct UpdateHandler<S> {
    source: S,
    correlator: Correlator,
    database: Database,
    config: Config,
    /// `None` until a block has been handled, in which case the head is fetched.
    next_slot: Option<Slot>,
    failed_attempts: u64,
    blocks_processed: u64,
    guard: FinalizeGuard,
}

impl<S: ChainSource> UpdateHandler<S> {
    pub fn new(source: S, database: Database, config: Config) -> Self {
        Self {
            source,
            correlator: Correlator::new(SLOTS_PER_EPOCH),
            database,
            config,
            next_slot: None,
            failed_attempts: 0,
            blocks_processed: 0,
            guard: FinalizeGuard::new(),
        }
    }

    /// Fetch the block at `block_id` and process its attestations.
    ///
    /// Returns the slot of the processed block, or `None` if the beacon node had no such block.
    pub async fn fetch_and_process_block(
        &mut self,
        block_id: BlockId,
    ) -> Result<Option<Slot>, Error> {
        debug!("Fetching block {}", block_id);
        let Some(block) = self.source.get_block(block_id).await? else {
            debug!("Block {} not found", block_id);
            return Ok(None);
        };

        self.process_block(&block).await?;
        Ok(Some(block.slot()))
    }

    async fn process_block(&mut self, block: &SignedBeaconBlock) -> Result<(), Error> {
        let slot = block.slot();
        let attestations = block.attestations();
        info!(
            "Processing block at slot {} (position {} in epoch {}) with {} attestations",
            slot,
            slot.position_in_epoch(SLOTS_PER_EPOCH),
            slot.epoch(SLOTS_PER_EPOCH),
            attestations.len()
        );

        self.correlator
            .ensure_committees_loaded(&self.source, attestations)
            .await?;
        self.correlator.handle_attestations(attestations, slot)?;
        Ok(())
    }

    /// Fetch the next block and update the position of the loop.
    ///
    /// Returns `true` once enough blocks have been processed.
    pub async fn step(&mut self) -> Result<bool, Error> {
        if self.blocks_processed >= self.config.experiment_duration_blocks {
            return Ok(true);
        }

        let requested = self.next_slot;
        let block_id = requested.map_or(BlockId::Head, BlockId::Slot);
        let handled = self.fetch_and_process_block(block_id).await?;

        match (requested, handled) {
            (None, Some(slot)) => self.advance(slot),
            (Some(requested), Some(slot)) if requested == slot => self.advance(slot),
            _ => {
                self.failed_attempts += 1;
                if self.failed_attempts >= self.config.same_block_retries {
                    if let Some(requested) = requested {
                        warn!(
                            "Giving up on slot {} after {} attempts",
                            requested, self.failed_attempts
                        );
                        self.next_slot = Some(requested + 1);
                    }
                    self.failed_attempts = 0;
                } else {
                    debug!(
                        "Failed to fetch block {} (attempt {}/{})",
                        block_id, self.failed_attempts, self.config.same_block_retries
                    );
                }
            }
        }

        Ok(false)
    }

    fn advance(&mut self, handled: Slot) {
        self.next_slot = Some(handled + 1);
        self.failed_attempts = 0;
        self.blocks_processed += 1;
    }

    /// Run until the experiment completes or `shutdown` resolves, then wrap up.
    ///
    /// Returns `None` if wrap-up had already been performed.
    ///
    /// `shutdown` is only polled between ticks: a signal received during a fetch is acted upon
    /// once that fetch completes, which may take up to the request timeout.
    pub async fn run<F>(&mut self, shutdown: F) -> Result<Option<DumpSummary>, Error>
    where
        F: Future<Output = ShutdownReason>,
    {
        tokio::pin!(shutdown);

        let mut ticker = interval(self.config.fetch_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        // The first tick completes immediately and fetches the head.
        loop {
            tokio::select! {
                reason = &mut shutdown => return self.wrap_up(reason),
                _ = ticker.tick() => {
                    if self.step().await? {
                        return self.wrap_up(ShutdownReason::ExperimentComplete);
                    }
                }
            }
        }
    }

    /// Dump the interesting validators to the database. Runs at most once.
    pub fn wrap_up(&mut self, reason: ShutdownReason) -> Result<Option<DumpSummary>, Error> {
        let Some(_ticket) = self.guard.try_begin() else {
            debug!("Wrap-up already performed, ignoring {:?}", reason);
            return Ok(None);
        };

        info!(
            "Wrapping up ({:?}) after {} blocks",
            reason, self.blocks_processed
        );

        let tracker = self.correlator.tracker();
        let fully_seen_epochs = tracker.fully_seen_epochs();
        match fully_seen_epochs {
            Some((first, last)) => info!(
                "Fully seen epochs: {:?} (slots {}..={})",
                Epoch::range_inclusive(first, last).collect::<Vec<_>>(),
                first.start_slot(SLOTS_PER_EPOCH),
                last.end_slot(SLOTS_PER_EPOCH)
            ),
            None => info!("No epochs were fully seen"),
        }
        info!("Interesting validators: {}", tracker.num_interesting());

        let records = tracker.dump();
        let records_written = self.database.insert_batch_validator_states(&records)?;
        info!("Stored {} validator states", records_written);

        Ok(Some(DumpSummary {
            reason,
            blocks_processed: self.blocks_processed,
            fully_seen_epochs,
            num_interesting: tracker.num_interesting(),
            records_written,
        }))
    }

    pub fn guard(&self) -> FinalizeGuard {
        self.guard.clone()
    }

    pub fn correlator(&self) -> &Correlator {
        &self.correlator
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn next_slot(&self) -> Option<Slot> {
        self.next_slot
    }

    pub fn blocks_processed(&self) -> u64 {
        self.blocks_processed
    }
}

/// Connect to the beacon node and the database, then run until finished or interrupted.
pub async fn run_updater(config: Config) -> Result<Option<DumpSummary>, Error> {
    let server = Url::parse(&config.beacon_node_url)
        .map_err(|e| Error::InvalidUrl(format!("{}: {:?}", config.beacon_node_url, e)))?;
    let client = BeaconNodeHttpClient::new(server, config.request_timeout());

    let genesis = client
        .get_beacon_genesis()
        .await?
        .ok_or(Error::ChainNotStarted)?;
    info!(
        "Connected to {} (genesis time {})",
        config.beacon_node_url, genesis.data.genesis_time
    );

    let database = Database::open_or_create(&config.database_path)?;
    let mut handler = UpdateHandler::new(client, database, config);
    handler.run(shutdown_signal()).await
}
