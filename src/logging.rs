use crate::error::{ServerError, ServerResult};
use log::LevelFilter;

/// Parse a level name such as `info` or `debug`
pub fn parse_level(level: &str) -> ServerResult<LevelFilter> {
    level
        .parse::<LevelFilter>()
        .map_err(|_| ServerError::Config(format!("invalid log level {:?}", level)))
}

/// Send log records at or above `level` to stderr
pub fn init(level: &str) -> ServerResult<()> {
    let level = parse_level(level)?;

    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{} [{}] {}: {}",
                chrono::Local::now().format("[%Y-%m-%d %H:%M:%S%.3f]"),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stderr())
        .apply()
        .map_err(|err| ServerError::Config(format!("failed to set up logging: {}", err)))
}
