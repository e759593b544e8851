//! Program logger.

use std::env;

use clap::{Arg, ArgMatches, Command};
use log::LevelFilter;
use serde::Deserialize;

/// Logger configuration object.
#[derive(Default, Deserialize)]
pub struct Config {
    /// Log level. `off`, `error`, `warn`, `info`, `debug`, `trace`. Default is `info`.
    pub level: Option<String>,
}

pub const DEF_LEVEL: &'static str = "info";

/// To register Clap arguments.
pub fn reg_args(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("log.level")
            .long("log.level")
            .help("Log level (off,error,warn,info,debug,trace)")
            .num_args(1)
            .default_value(DEF_LEVEL),
    )
}

/// To read input arguments from command-line arguments and environment variables.
///
/// This function will call [`apply_default()`] to fill missing values so you do not need call it
/// again.
pub fn read_args(args: &ArgMatches) -> Config {
    apply_default(&Config {
        level: match args.get_one::<String>("log.level") {
            None => match env::var("LOG_LEVEL") {
                Err(_) => None,
                Ok(v) => Some(v),
            },
            Some(v) => Some(v.clone()),
        },
    })
}

/// Fill missing configurations with default values.
pub fn apply_default(config: &Config) -> Config {
    Config {
        level: match config.level.as_ref() {
            None => Some(DEF_LEVEL.to_string()),
            Some(level) => Some(level.clone()),
        },
    }
}

/// Initialize the process logger with the configured level.
pub fn init(conf: &Config) {
    let level = match conf.level.as_ref() {
        None => LevelFilter::Info,
        Some(level) => match level.as_str().parse::<LevelFilter>() {
            Err(_) => LevelFilter::Info,
            Ok(level) => level,
        },
    };
    env_logger::Builder::new()
        .filter_level(level)
        .format_timestamp_millis()
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_default_fills_level() {
        let conf = apply_default(&Config { level: None });
        assert_eq!(conf.level, Some(DEF_LEVEL.to_string()));

        let conf = apply_default(&Config {
            level: Some("debug".to_string()),
        });
        assert_eq!(conf.level, Some("debug".to_string()));
    }
}
