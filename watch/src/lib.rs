pub mod activity_tracker;
pub mod cli;
pub mod committee_registry;
pub mod config;
pub mod correlator;
pub mod database;
pub mod logger;
pub mod shutdown;
pub mod source;
pub mod updater;
