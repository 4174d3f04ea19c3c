use crate::{config::Config, logger, updater};
use clap::{Arg, ArgMatches, Command};
use log::info;

pub const BEACON_NODE: &str = "beacon-node";
pub const CONFIG: &str = "config";
pub const DATABASE: &str = "database";
pub const DEBUG_LEVEL: &str = "debug-level";
pub const DURATION_BLOCKS: &str = "duration-blocks";

pub fn app() -> Command {
    Command::new("inclusion_watch")
        .author("Sigma Prime <contact@sigmaprime.io>")
        .about("Reports validators whose attestations were missing or included late")
        .arg(
            Arg::new(BEACON_NODE)
                .value_name("BEACON_NODE")
                .help("Beacon node to monitor, as ip:port or a full URL")
                .index(1),
        )
        .arg(
            Arg::new(CONFIG)
                .long(CONFIG)
                .value_name("PATH_TO_CONFIG")
                .help("Path to configuration file"),
        )
        .arg(
            Arg::new(DATABASE)
                .long(DATABASE)
                .value_name("PATH")
                .help("Path to the SQLite database the results are written to"),
        )
        .arg(
            Arg::new(DEBUG_LEVEL)
                .long(DEBUG_LEVEL)
                .value_name("LEVEL")
                .help("Verbosity of the logs")
                .value_parser(["error", "warn", "info", "debug", "trace"]),
        )
        .arg(
            Arg::new(DURATION_BLOCKS)
                .long(DURATION_BLOCKS)
                .value_name("BLOCKS")
                .help("Number of blocks to process before wrapping up")
                .value_parser(clap::value_parser!(u64)),
        )
}

/// Turn `ip:port` into a URL. Values which already carry a scheme are left untouched.
pub fn normalize_beacon_node_url(beacon_node: &str) -> String {
    if beacon_node.contains("://") {
        beacon_node.to_string()
    } else {
        format!("http://{}", beacon_node)
    }
}

/// Build the effective configuration from the (optional) file and the command line.
pub fn parse_config(matches: &ArgMatches) -> Result<Config, String> {
    let mut config = match matches.get_one::<String>(CONFIG) {
        Some(path) => Config::load_from_file(path.to_string())?,
        None => Config::default(),
    };

    if let Some(beacon_node) = matches.get_one::<String>(BEACON_NODE) {
        config.beacon_node_url = normalize_beacon_node_url(beacon_node);
    }
    if let Some(database) = matches.get_one::<String>(DATABASE) {
        config.database_path = database.into();
    }
    if let Some(level) = matches.get_one::<String>(DEBUG_LEVEL) {
        config.log_level = level.clone();
    }
    if let Some(blocks) = matches.get_one::<u64>(DURATION_BLOCKS) {
        config.experiment_duration_blocks = *blocks;
    }

    Ok(config)
}

pub async fn run() -> Result<(), String> {
    let matches = app().get_matches();
    let config = parse_config(&matches)?;

    logger::init_logger(&config.log_level)?;

    match updater::run_updater(config)
        .await
        .map_err(|e| format!("Failure: {:?}", e))?
    {
        Some(summary) => info!(
            "Finished: {} records written for {} interesting validators",
            summary.records_written, summary.num_interesting
        ),
        None => info!("Finished"),
    }
    Ok(())
}
