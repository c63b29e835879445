//! `cabin outages`: admin management of service outages.

use clap::{Args, Subcommand};
use std::io::{self, Write};

use cabin_core::Portal;
use cabin_core::model::{Outage, OutageInput, OutagePatch, OutageStatus};

use crate::cmd::notices::{AnnouncementArgs, AnnouncementEdits};
use crate::cmd::{DeleteOutcome, short_ts};
use crate::output::{OutputMode, pretty_section, render, render_mode};

#[derive(Args, Debug)]
pub struct OutagesArgs {
    #[command(subcommand)]
    pub command: OutagesCommand,
}

#[derive(Subcommand, Debug)]
pub enum OutagesCommand {
    #[command(about = "List every outage, latest start first")]
    List,

    #[command(about = "Announce an outage at one or more properties")]
    New(NewOutageArgs),

    #[command(about = "Edit an outage")]
    Update(UpdateOutageArgs),

    #[command(about = "Delete an outage")]
    Delete(OutageIdArgs),
}

#[derive(Args, Debug)]
pub struct OutageIdArgs {
    /// Outage id.
    pub id: String,
}

#[derive(Args, Debug)]
pub struct NewOutageArgs {
    #[command(flatten)]
    pub announcement: AnnouncementArgs,

    /// Planned, Active or Resolved.
    #[arg(long, default_value = "Planned")]
    pub status: OutageStatus,
}

#[derive(Args, Debug)]
pub struct UpdateOutageArgs {
    /// Outage id.
    pub id: String,

    #[command(flatten)]
    pub edits: AnnouncementEdits,

    #[arg(long)]
    pub status: Option<OutageStatus>,
}

pub fn run_outages(args: &OutagesArgs, portal: &Portal, output: OutputMode) -> anyhow::Result<()> {
    match &args.command {
        OutagesCommand::List => {
            let outages = portal.notice_board()?.outages;
            render_mode(output, &outages, |o, w| write_rows(o, w), |o, w| {
                pretty_section(w, "Outages")?;
                write_rows(o, w)
            })
        }
        OutagesCommand::New(new) => {
            let a = &new.announcement;
            let created = portal.create_outages(&OutageInput {
                title: a.title.clone(),
                body_markdown: a.body.clone(),
                starts_at: a.starts,
                ends_at: a.ends,
                status: new.status,
                property_ids: a.properties.clone(),
            })?;
            render(output, &created, |outages, w| {
                for o in outages {
                    writeln!(w, "✓ announced {} at {}", o.id, o.property_id)?;
                }
                Ok(())
            })
        }
        OutagesCommand::Update(update) => {
            let e = &update.edits;
            let outage = portal.update_outage(
                &update.id,
                &OutagePatch {
                    title: e.title.clone(),
                    body_markdown: e.body.clone(),
                    starts_at: e.starts,
                    ends_at: e.ends,
                    status: update.status,
                },
            )?;
            render(output, &outage, |o, w| writeln!(w, "✓ updated {} ({})", o.id, o.status))
        }
        OutagesCommand::Delete(target) => {
            let removal = portal.delete_outage(&target.id)?;
            let outcome = DeleteOutcome::new(&target.id, removal);
            render(output, &outcome, |o, w| o.write(w))
        }
    }
}

fn write_rows(outages: &[Outage], w: &mut dyn Write) -> io::Result<()> {
    if outages.is_empty() {
        return writeln!(w, "(none)");
    }
    for o in outages {
        writeln!(
            w,
            "{:<18} {:<6} {} → {}  {:<8} {}",
            o.id,
            o.property_id,
            short_ts(&o.starts_at),
            short_ts(&o.ends_at),
            o.status,
            o.title
        )?;
    }
    Ok(())
}
