//! `cabin threads`: the community board.

use clap::{Args, Subcommand};
use std::io::{self, Write};

use cabin_core::Portal;
use cabin_core::model::Thread;

use crate::cmd::{DeleteOutcome, short_ts};
use crate::output::{OutputMode, pretty_kv, pretty_rule, pretty_section, render, render_mode};

#[derive(Args, Debug)]
pub struct ThreadsArgs {
    #[command(subcommand)]
    pub command: ThreadsCommand,
}

#[derive(Subcommand, Debug)]
pub enum ThreadsCommand {
    #[command(about = "List threads: pinned first, then by latest activity")]
    List,

    #[command(about = "Show a thread and its replies")]
    Show(ThreadIdArgs),

    #[command(about = "Start a thread")]
    New(NewThreadArgs),

    #[command(about = "Reply to a thread")]
    Reply(ReplyArgs),

    #[command(about = "Lock a thread against replies (admin)")]
    Lock(ThreadIdArgs),

    #[command(about = "Unlock a thread (admin)")]
    Unlock(ThreadIdArgs),

    #[command(about = "Delete a thread (admin)")]
    Delete(ThreadIdArgs),
}

#[derive(Args, Debug)]
pub struct ThreadIdArgs {
    /// Thread id.
    pub id: String,
}

#[derive(Args, Debug)]
pub struct NewThreadArgs {
    #[arg(long)]
    pub title: String,

    /// Markdown body.
    #[arg(long)]
    pub body: String,
}

#[derive(Args, Debug)]
pub struct ReplyArgs {
    /// Thread id.
    pub id: String,

    /// Markdown body.
    #[arg(long)]
    pub body: String,
}

pub fn run_threads(args: &ThreadsArgs, portal: &Portal, output: OutputMode) -> anyhow::Result<()> {
    match &args.command {
        ThreadsCommand::List => {
            let board = portal.community()?;
            render_mode(
                output,
                &board,
                |b, w| {
                    for t in b.pinned.iter().chain(&b.regular) {
                        writeln!(w, "{}\t{}\t{}", t.id, flags(t), t.title)?;
                    }
                    Ok(())
                },
                |b, w| {
                    pretty_section(w, "Pinned")?;
                    write_threads(&b.pinned, w)?;
                    writeln!(w)?;
                    pretty_section(w, "Discussions")?;
                    write_threads(&b.regular, w)
                },
            )
        }
        ThreadsCommand::Show(show) => {
            let detail = portal.thread_detail(&show.id)?;
            render(output, &detail, |d, w| {
                pretty_kv(w, "Thread", format!("{} {}", d.thread.id, d.thread.title))?;
                let author = d
                    .author_name
                    .as_deref()
                    .unwrap_or(&d.thread.created_by_user_id);
                pretty_kv(w, "By", author)?;
                pretty_kv(w, "Updated", short_ts(&d.thread.updated_at))?;
                if d.thread.is_locked {
                    pretty_kv(w, "Locked", "yes")?;
                }
                writeln!(w)?;
                writeln!(w, "{}", d.thread.body_markdown)?;
                for reply in &d.replies {
                    pretty_rule(w)?;
                    let who = reply
                        .author_name
                        .as_deref()
                        .unwrap_or(&reply.reply.created_by_user_id);
                    writeln!(w, "{who} · {}", short_ts(&reply.reply.created_at))?;
                    writeln!(w, "{}", reply.reply.body_markdown)?;
                }
                Ok(())
            })
        }
        ThreadsCommand::New(new) => {
            let thread = portal.post_thread(&new.title, &new.body)?;
            render(output, &thread, |t, w| writeln!(w, "✓ posted {}", t.id))
        }
        ThreadsCommand::Reply(reply) => {
            let posted = portal.post_reply(&reply.id, &reply.body)?;
            render(output, &posted, |r, w| writeln!(w, "✓ replied {} on {}", r.id, r.thread_id))
        }
        ThreadsCommand::Lock(target) => set_locked(portal, &target.id, true, output),
        ThreadsCommand::Unlock(target) => set_locked(portal, &target.id, false, output),
        ThreadsCommand::Delete(target) => {
            let removal = portal.delete_thread(&target.id)?;
            let outcome = DeleteOutcome::new(&target.id, removal);
            render(output, &outcome, |o, w| o.write(w))
        }
    }
}

fn set_locked(portal: &Portal, id: &str, locked: bool, output: OutputMode) -> anyhow::Result<()> {
    let thread = portal.set_thread_locked(id, locked)?;
    render(output, &thread, |t, w| {
        let verb = if t.is_locked { "locked" } else { "unlocked" };
        writeln!(w, "✓ {verb} {}", t.id)
    })
}

fn flags(t: &Thread) -> &'static str {
    match (t.is_pinned, t.is_locked) {
        (true, true) => "pinned,locked",
        (true, false) => "pinned",
        (false, true) => "locked",
        (false, false) => "-",
    }
}

fn write_threads(threads: &[Thread], w: &mut dyn Write) -> io::Result<()> {
    if threads.is_empty() {
        return writeln!(w, "(none)");
    }
    for t in threads {
        let lock = if t.is_locked { " 🔒" } else { "" };
        writeln!(w, "{:<18} {}  {}{lock}", t.id, short_ts(&t.updated_at), t.title)?;
    }
    Ok(())
}
