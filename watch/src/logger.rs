use env_logger::Builder;
use log::{info, LevelFilter};

pub fn init_logger(log_level: &str) -> Result<(), String> {
    let log_level = match log_level.to_lowercase().as_str() {
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "info" => LevelFilter::Info,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        other => return Err(format!("Unsupported log level: {}", other)),
    };

    let mut builder = Builder::new();
    builder.filter(Some("inclusion_watch"), log_level);

    builder
        .try_init()
        .map_err(|e| format!("Unable to initialize logger: {:?}", e))?;

    info!("Logger initialized with log-level: {}", log_level);
    Ok(())
}
