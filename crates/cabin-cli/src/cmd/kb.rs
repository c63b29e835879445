//! `cabin kb`: the staff knowledge base.

use clap::{Args, Subcommand};

use cabin_core::Portal;

use crate::output::{OutputMode, pretty_kv, pretty_rule, render_mode};

#[derive(Args, Debug)]
pub struct KbArgs {
    #[command(subcommand)]
    pub command: KbCommand,
}

#[derive(Subcommand, Debug)]
pub enum KbCommand {
    #[command(about = "List articles for the session property")]
    List,
}

pub fn run_kb(args: &KbArgs, portal: &Portal, output: OutputMode) -> anyhow::Result<()> {
    match args.command {
        KbCommand::List => {
            let articles = portal.kb_articles()?;
            render_mode(
                output,
                &articles,
                |list, w| {
                    for a in list {
                        writeln!(w, "{}\t{}\t{}\t{}", a.id, a.upvotes, a.tags.join(","), a.title)?;
                    }
                    Ok(())
                },
                |list, w| {
                    if list.is_empty() {
                        return writeln!(w, "(no articles)");
                    }
                    for a in list {
                        pretty_rule(w)?;
                        pretty_kv(w, a.id.as_str(), &a.title)?;
                        pretty_kv(w, "Symptoms", &a.symptoms)?;
                        if !a.tags.is_empty() {
                            pretty_kv(w, "Tags", a.tags.join(", "))?;
                        }
                        pretty_kv(w, "Upvotes", a.upvotes.to_string())?;
                        writeln!(w)?;
                        writeln!(w, "{}", a.steps_markdown)?;
                    }
                    Ok(())
                },
            )
        }
    }
}
