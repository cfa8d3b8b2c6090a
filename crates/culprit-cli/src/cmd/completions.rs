//! `culprit completions`.

use std::io::Write;

use clap::Args;
use clap_complete::{Shell, generate};

#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate the completion script for.
    #[arg(value_enum)]
    pub shell: Shell,
}

/// Write the completion script for `args.shell` to `out`.
pub fn write_completions(args: &CompletionsArgs, command: &mut clap::Command, out: &mut dyn Write) {
    let bin_name = command.get_name().to_string();
    generate(args.shell, command, bin_name, out);
}
