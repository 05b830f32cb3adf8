/// log4rs setup for applications that run a manager
///
use anyhow::{Context, Result};
use log::LevelFilter;
use log4rs::append::console::ConsoleAppender;
use log4rs::config::{Appender, Config as LogConfig, Root};
use log4rs::encode::pattern::PatternEncoder;
use std::path::Path;

use crate::config::Config;

pub const PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S%.3f)} {h({l})} {t} - {m}{n}";

/// a console-only log4rs config at the given level
pub fn console_config(level: LevelFilter) -> Result<LogConfig> {
    let stdout = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new(PATTERN)))
        .build();

    let config = LogConfig::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout)))
        .build(Root::builder().appender("stdout").build(level))?;

    Ok(config)
}

pub fn init_console(level: LevelFilter) -> Result<()> {
    log4rs::init_config(console_config(level)?).context("logger already initialized")?;
    Ok(())
}

/// initialize from a log4rs yaml/json config file
pub fn init_file<P: AsRef<Path>>(path: P) -> Result<()> {
    log4rs::init_file(path, Default::default())
}

pub fn init(config: &Config) -> Result<()> {
    match &config.log_file {
        Some(path) => init_file(path),
        None => init_console(config.level_filter()?),
    }
}
