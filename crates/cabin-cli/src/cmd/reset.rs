//! `cabin reset`: discard every local change.

use clap::Args;

use cabin_core::Portal;

use crate::output::{OutputMode, render_success};

#[derive(Args, Debug, Default)]
pub struct ResetArgs {
    /// Also forget the session.
    #[arg(long)]
    pub session: bool,
}

pub fn run_reset(args: &ResetArgs, portal: &Portal, output: OutputMode) -> anyhow::Result<()> {
    portal.reset()?;
    if args.session {
        portal.sessions().clear()?;
        return render_success(output, "local changes and session cleared");
    }
    render_success(output, "local changes cleared")
}
