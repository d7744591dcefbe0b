use std::env;

use dotenvy::dotenv;
use fern::Dispatch;

/// # configure the log dispatch
/// level comes from `LOGGING_LEVEL`, defaulting to info. lines go to
/// stdout and to `telemetry.log` with the target and level per line.
pub fn setup_logging() -> Result<(), fern::InitError> {
    dotenv().ok();

    let verbosity = env::var("LOGGING_LEVEL").unwrap_or_else(|_| "INFO".to_string());

    let mut base_config = fern::Dispatch::new();

    base_config = match verbosity.as_str() {
        "OFF" => base_config.level(log::LevelFilter::Off),
        "ERROR" => base_config.level(log::LevelFilter::Error),
        "WARN" => base_config.level(log::LevelFilter::Warn),
        "DEBUG" => base_config.level(log::LevelFilter::Debug),
        "TRACE" => base_config.level(log::LevelFilter::Trace),
        _ => base_config.level(log::LevelFilter::Info),
    };

    let formatted = Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{} [{}][{}] {}",
                chrono::Local::now().format("[%Y-%m-%d][%H:%M:%S]"),
                record.target(),
                record.level(),
                message
            ))
        })
        .chain(std::io::stdout())
        .chain(fern::log_file("telemetry.log")?);

    base_config.chain(formatted).apply()?;

    Ok(())
}
