//! Shell completions generation.

use std::io;

use clap::CommandFactory;
use clap_complete::{generate, Shell};

use super::Cli;

/// Generate completions for `shell` and print them to stdout.
pub fn run(shell: Shell) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "hoist", &mut io::stdout());
}
