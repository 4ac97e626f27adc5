use anyhow::Context;
use log::LevelFilter;
use log4rs::append::console::{ConsoleAppender, Target};
use log4rs::append::file::FileAppender;
use log4rs::config::{Appender, Root};
use log4rs::encode::pattern::PatternEncoder;
use log4rs::filter::threshold::ThresholdFilter;
use log4rs::Config;
use std::path::PathBuf;

use pdl::utils::error::PdlResult;

/// `~/.pdl/logs`
pub(crate) fn log_dir() -> PathBuf {
    home::home_dir()
        .unwrap_or_default()
        .join(".pdl")
        .join("logs")
}

/// Warnings go to stderr, everything from `info` up goes to the log file.
///
/// Terminal output of regular progress is the sink's job, so the console
/// appender stays quiet below `warn`.
pub(crate) fn init_log() -> PdlResult {
    let stderr_name = "stderr";
    let file_name = "regular_out";

    let stderr = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new("{h({l})} - {m}{n}")))
        .build();
    let regular_out = FileAppender::builder()
        .encoder(Box::new(PatternEncoder::new("{d} {l} - {m}{n}")))
        .build(log_dir().join("pdl.log"))
        .context("create log file failed")?;

    let config = Config::builder()
        .appender(
            Appender::builder()
                .filter(Box::new(ThresholdFilter::new(LevelFilter::Warn)))
                .build(stderr_name, Box::new(stderr)),
        )
        .appender(Appender::builder().build(file_name, Box::new(regular_out)))
        .build(
            Root::builder()
                .appender(stderr_name)
                .appender(file_name)
                .build(LevelFilter::Info),
        )
        .context("build log config failed")?;

    log4rs::init_config(config).context("init logger failed")?;
    Ok(())
}
