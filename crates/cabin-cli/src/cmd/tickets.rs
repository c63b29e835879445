//! `cabin tickets`: maintenance requests for renters and the staff queue.

use clap::{Args, Subcommand};
use std::io::{self, Write};

use cabin_core::Portal;
use cabin_core::model::{Priority, Ticket, TicketPatch, TicketStatus};
use cabin_core::model::ticket::CATEGORIES;
use cabin_core::portal::TicketForm;

use crate::cmd::short_ts;
use crate::output::{OutputMode, pretty_kv, pretty_section, render, render_mode};

#[derive(Args, Debug)]
pub struct TicketsArgs {
    #[command(subcommand)]
    pub command: TicketsCommand,
}

#[derive(Subcommand, Debug)]
pub enum TicketsCommand {
    #[command(about = "List my maintenance requests, newest first")]
    Mine,

    #[command(about = "Show the staff queue: unassigned plus assigned to me")]
    Queue,

    #[command(about = "Show one ticket")]
    Show(TicketIdArgs),

    #[command(about = "Submit a maintenance request for my cabin", after_help = catalogue_help())]
    New(NewTicketArgs),

    #[command(about = "Change status, priority, assignee or description")]
    Update(UpdateTicketArgs),
}

#[derive(Args, Debug)]
pub struct TicketIdArgs {
    /// Ticket id.
    pub id: String,
}

#[derive(Args, Debug)]
pub struct NewTicketArgs {
    /// Category (Plumbing, Electrical, HVAC, Appliances, Structural, Other).
    #[arg(long)]
    pub category: String,

    /// Subcategory within the category.
    #[arg(long)]
    pub subcategory: String,

    /// Urgency.
    #[arg(long, default_value = "Medium")]
    pub priority: Priority,

    /// What is wrong.
    #[arg(long, short)]
    pub description: String,
}

#[derive(Args, Debug)]
pub struct UpdateTicketArgs {
    /// Ticket id.
    pub id: String,

    /// New status (Open, Assigned, "In Progress", Resolved, Closed).
    #[arg(long)]
    pub status: Option<TicketStatus>,

    /// New priority.
    #[arg(long)]
    pub priority: Option<Priority>,

    /// Assign to a staff or admin user.
    #[arg(long, conflicts_with = "unassign")]
    pub assign: Option<String>,

    /// Clear the assignee.
    #[arg(long)]
    pub unassign: bool,

    /// Replace the description.
    #[arg(long)]
    pub description: Option<String>,
}

impl UpdateTicketArgs {
    fn to_patch(&self) -> TicketPatch {
        let assigned_to_user_id = if self.unassign {
            Some(None)
        } else {
            self.assign.clone().map(Some)
        };
        TicketPatch {
            status: self.status,
            priority: self.priority,
            assigned_to_user_id,
            description: self.description.clone(),
        }
    }
}

pub fn run_tickets(args: &TicketsArgs, portal: &Portal, output: OutputMode) -> anyhow::Result<()> {
    match &args.command {
        TicketsCommand::Mine => {
            let tickets = portal.my_tickets()?;
            render_mode(output, &tickets, |t, w| write_rows(t, w), |t, w| {
                pretty_section(w, "My requests")?;
                write_table(t, w)
            })
        }
        TicketsCommand::Queue => {
            let queue = portal.staff_queue()?;
            render_mode(
                output,
                &queue,
                |q, w| {
                    write_rows(&q.unassigned, w)?;
                    write_rows(&q.assigned, w)
                },
                |q, w| {
                    pretty_section(w, "Unassigned")?;
                    write_table(&q.unassigned, w)?;
                    writeln!(w)?;
                    pretty_section(w, "Assigned to me")?;
                    write_table(&q.assigned, w)
                },
            )
        }
        TicketsCommand::Show(show) => {
            let detail = portal.ticket_detail(&show.id)?;
            render(output, &detail, |d, w| {
                write_ticket(&d.ticket, w)?;
                pretty_kv(
                    w,
                    "Assignee",
                    d.assignee_name
                        .as_deref()
                        .or(d.ticket.assigned_to_user_id.as_deref())
                        .unwrap_or("-"),
                )
            })
        }
        TicketsCommand::New(new) => {
            let ticket = portal.submit_ticket(TicketForm {
                category: new.category.clone(),
                subcategory: new.subcategory.clone(),
                priority: new.priority,
                description: new.description.clone(),
            })?;
            render(output, &ticket, |t, w| writeln!(w, "✓ submitted {}", t.id))
        }
        TicketsCommand::Update(update) => {
            let ticket = portal.update_ticket(&update.id, &update.to_patch())?;
            render(output, &ticket, |t, w| {
                writeln!(w, "✓ updated {}", t.id)?;
                write_ticket(t, w)
            })
        }
    }
}

fn write_rows(tickets: &[Ticket], w: &mut dyn Write) -> io::Result<()> {
    for t in tickets {
        writeln!(
            w,
            "{}\t{}\t{}\t{}\t{}",
            t.id, t.status, t.priority, t.cabin_id, t.category
        )?;
    }
    Ok(())
}

fn write_table(tickets: &[Ticket], w: &mut dyn Write) -> io::Result<()> {
    if tickets.is_empty() {
        return writeln!(w, "(none)");
    }
    writeln!(w, "{:<16} {:<12} {:<8} {:<7} {}", "ID", "STATUS", "PRIORITY", "CABIN", "CATEGORY")?;
    for t in tickets {
        writeln!(
            w,
            "{:<16} {:<12} {:<8} {:<7} {} / {}",
            t.id, t.status, t.priority, t.cabin_id, t.category, t.subcategory
        )?;
    }
    Ok(())
}

fn write_ticket(t: &Ticket, w: &mut dyn Write) -> io::Result<()> {
    pretty_kv(w, "ID", &t.id)?;
    pretty_kv(w, "Status", t.status.to_string())?;
    pretty_kv(w, "Priority", t.priority.to_string())?;
    pretty_kv(w, "Cabin", &t.cabin_id)?;
    pretty_kv(w, "Category", format!("{} / {}", t.category, t.subcategory))?;
    pretty_kv(w, "Opened", short_ts(&t.created_at))?;
    pretty_kv(w, "Updated", short_ts(&t.updated_at))?;
    pretty_kv(w, "Description", &t.description)
}

/// Categories and their subcategories, for `--help` text.
fn catalogue_help() -> String {
    let rows: Vec<String> = CATEGORIES
        .iter()
        .map(|(category, subs)| format!("    {category}: {}", subs.join(", ")))
        .collect();
    format!("CATEGORIES:\n{}", rows.join("\n"))
}
