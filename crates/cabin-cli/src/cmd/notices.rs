//! `cabin notices`: admin management of property notices.

use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};
use std::io::{self, Write};

use cabin_core::Portal;
use cabin_core::model::{Notice, NoticeInput, NoticePatch};

use crate::cmd::{DeleteOutcome, short_ts, timestamp_arg};
use crate::output::{OutputMode, pretty_section, render, render_mode};

#[derive(Args, Debug)]
pub struct NoticesArgs {
    #[command(subcommand)]
    pub command: NoticesCommand,
}

#[derive(Subcommand, Debug)]
pub enum NoticesCommand {
    #[command(about = "List every notice, latest start first")]
    List,

    #[command(about = "Post a notice to one or more properties")]
    New(NewNoticeArgs),

    #[command(about = "Edit a notice")]
    Update(UpdateNoticeArgs),

    #[command(about = "Delete a notice")]
    Delete(NoticeIdArgs),
}

#[derive(Args, Debug)]
pub struct NoticeIdArgs {
    /// Notice id.
    pub id: String,
}

/// Title, body and window shared by notices and outages.
#[derive(Args, Debug)]
pub struct AnnouncementArgs {
    #[arg(long)]
    pub title: String,

    /// Markdown body.
    #[arg(long, default_value = "")]
    pub body: String,

    /// Start of the window (RFC 3339).
    #[arg(long, value_parser = timestamp_arg)]
    pub starts: DateTime<Utc>,

    /// End of the window (RFC 3339).
    #[arg(long, value_parser = timestamp_arg)]
    pub ends: DateTime<Utc>,

    /// Target property; repeat for several. One record is created per property.
    #[arg(long = "property", required = true)]
    pub properties: Vec<String>,
}

#[derive(Args, Debug)]
pub struct NewNoticeArgs {
    #[command(flatten)]
    pub announcement: AnnouncementArgs,

    /// Pin to the top of the board.
    #[arg(long)]
    pub pinned: bool,
}

/// Optional edits shared by notices and outages.
#[derive(Args, Debug)]
pub struct AnnouncementEdits {
    #[arg(long)]
    pub title: Option<String>,

    #[arg(long)]
    pub body: Option<String>,

    #[arg(long, value_parser = timestamp_arg)]
    pub starts: Option<DateTime<Utc>>,

    #[arg(long, value_parser = timestamp_arg)]
    pub ends: Option<DateTime<Utc>>,
}

#[derive(Args, Debug)]
pub struct UpdateNoticeArgs {
    /// Notice id.
    pub id: String,

    #[command(flatten)]
    pub edits: AnnouncementEdits,

    /// Pin or unpin (`true` / `false`).
    #[arg(long)]
    pub pinned: Option<bool>,
}

pub fn run_notices(args: &NoticesArgs, portal: &Portal, output: OutputMode) -> anyhow::Result<()> {
    match &args.command {
        NoticesCommand::List => {
            let notices = portal.notice_board()?.notices;
            render_mode(output, &notices, |n, w| write_rows(n, w), |n, w| {
                pretty_section(w, "Notices")?;
                write_rows(n, w)
            })
        }
        NoticesCommand::New(new) => {
            let a = &new.announcement;
            let created = portal.create_notices(&NoticeInput {
                title: a.title.clone(),
                body_markdown: a.body.clone(),
                starts_at: a.starts,
                ends_at: a.ends,
                is_pinned: new.pinned,
                property_ids: a.properties.clone(),
            })?;
            render(output, &created, |notices, w| {
                for n in notices {
                    writeln!(w, "✓ posted {} to {}", n.id, n.property_id)?;
                }
                Ok(())
            })
        }
        NoticesCommand::Update(update) => {
            let e = &update.edits;
            let notice = portal.update_notice(
                &update.id,
                &NoticePatch {
                    title: e.title.clone(),
                    body_markdown: e.body.clone(),
                    starts_at: e.starts,
                    ends_at: e.ends,
                    is_pinned: update.pinned,
                },
            )?;
            render(output, &notice, |n, w| writeln!(w, "✓ updated {}", n.id))
        }
        NoticesCommand::Delete(target) => {
            let removal = portal.delete_notice(&target.id)?;
            let outcome = DeleteOutcome::new(&target.id, removal);
            render(output, &outcome, |o, w| o.write(w))
        }
    }
}

fn write_rows(notices: &[Notice], w: &mut dyn Write) -> io::Result<()> {
    if notices.is_empty() {
        return writeln!(w, "(none)");
    }
    for n in notices {
        let pin = if n.is_pinned { "pinned" } else { "-" };
        writeln!(
            w,
            "{:<18} {:<6} {} → {}  {:<6} {}",
            n.id,
            n.property_id,
            short_ts(&n.starts_at),
            short_ts(&n.ends_at),
            pin,
            n.title
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Wrapper {
        #[command(flatten)]
        args: NoticesArgs,
    }

    #[test]
    fn new_collects_repeated_properties() {
        let w = Wrapper::parse_from([
            "test",
            "new",
            "--title",
            "Snow",
            "--starts",
            "2025-01-20T09:00:00Z",
            "--ends",
            "2025-01-20T15:00:00Z",
            "--property",
            "P-001",
            "--property",
            "P-002",
            "--pinned",
        ]);
        match w.args.command {
            NoticesCommand::New(new) => {
                assert_eq!(new.announcement.properties, ["P-001", "P-002"]);
                assert!(new.pinned);
                assert!(new.announcement.body.is_empty());
            }
            other => panic!("expected new, got {other:?}"),
        }
    }

    #[test]
    fn new_requires_a_property() {
        let parsed = Wrapper::try_parse_from([
            "test",
            "new",
            "--title",
            "Snow",
            "--starts",
            "2025-01-20T09:00:00Z",
            "--ends",
            "2025-01-20T15:00:00Z",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn update_parses_optional_pin() {
        let w = Wrapper::parse_from(["test", "update", "N-001", "--pinned", "false"]);
        match w.args.command {
            NoticesCommand::Update(update) => {
                assert_eq!(update.pinned, Some(false));
                assert!(update.edits.title.is_none());
            }
            other => panic!("expected update, got {other:?}"),
        }
    }
}
