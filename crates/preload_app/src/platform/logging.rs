//! Launcher logging: the console for the operator, `./preload.log` for bug reports.

use std::fs::File;
use std::path::Path;

use log::LevelFilter;
use simplelog::{
    ColorChoice, CombinedLogger, Config, ConfigBuilder, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};

const LOG_FILE: &str = "./preload.log";
const DEBUG_ENV: &str = "PRELOAD_DEBUG";

/// Installs the global logger. The file is truncated on every launch; if it cannot be
/// created the launcher still logs to the console.
pub fn initialize() {
    let level = level_from_env(std::env::var_os(DEBUG_ENV).is_some());
    let config = ConfigBuilder::new()
        .set_time_format_rfc3339()
        .set_target_level(LevelFilter::Error)
        .build();

    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        level,
        config.clone(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )];
    match File::create(Path::new(LOG_FILE)) {
        Ok(file) => loggers.push(WriteLogger::new(level, config, file)),
        Err(err) => eprintln!("preload: cannot write {LOG_FILE}: {err}"),
    }

    let _ = CombinedLogger::init(loggers);
}

fn level_from_env(debug: bool) -> LevelFilter {
    if debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    }
}
