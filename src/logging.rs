// src/logging.rs

use stderrlog::{LogLevelNum, Timestamp};

/// Command line flags controlling what `cfg_main` prints to stderr.
///
/// Only records from this crate and the binary are shown; dependencies stay
/// silent whatever the verbosity.
#[derive(clap::Args, Debug, Default)]
pub struct LogArgs {
    /// No log output at all.
    #[arg(short, long)]
    pub quiet: bool,

    /// Raise verbosity: -v errors, -vv warnings, -vvv info, -vvvv debug, more for trace.
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Prefix each record with a timestamp.
    #[arg(long)]
    pub ts: bool,
}

impl LogArgs {
    /// The level selected by `-v` flags, or `default` when none were given.
    pub fn level(&self, default: u8) -> LogLevelNum {
        match if self.verbose > 0 { self.verbose } else { default } {
            0 => LogLevelNum::Off,
            1 => LogLevelNum::Error,
            2 => LogLevelNum::Warn,
            3 => LogLevelNum::Info,
            4 => LogLevelNum::Debug,
            _ => LogLevelNum::Trace,
        }
    }

    pub fn setup_logging(&self, default: u8) -> Result<(), log::SetLoggerError> {
        let timestamp = if self.ts {
            Timestamp::Second
        } else {
            Timestamp::Off
        };
        stderrlog::new()
            .module("cfg_task")
            .module(module_path!().split("::").next().unwrap_or("cfg_main"))
            .quiet(self.quiet)
            .verbosity(self.level(default))
            .timestamp(timestamp)
            .init()
    }
}
