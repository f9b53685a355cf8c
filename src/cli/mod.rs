use crate::constants::{APP_DESCRIPTION, APP_NAME, LOG_FORMAT_JSON, LOG_FORMAT_TEXT};
use clap::Parser;

/// Password-gated, one-time document viewer
///
/// Launched without arguments it shows the password gate. The flags below only
/// adjust logging or help with first-time setup.
#[derive(Parser, Debug)]
#[command(name = APP_NAME, about = APP_DESCRIPTION, author, version, long_about = None)]
pub struct CliArgs {
    /// Print verbose (debug) log output
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Log output format
    #[arg(long, value_parser = [LOG_FORMAT_TEXT, LOG_FORMAT_JSON], default_value = LOG_FORMAT_TEXT)]
    pub log_format: String,

    /// Prompt for a new password, print its hash and exit
    #[arg(long)]
    pub hash_password: bool,
}

impl CliArgs {
    /// Parse command-line arguments
    pub fn parse() -> Self {
        CliArgs::parse_from(std::env::args())
    }
}
