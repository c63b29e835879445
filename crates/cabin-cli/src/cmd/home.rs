//! `cabin home`: the landing dashboard.

use std::io::{self, Write};

use cabin_core::Portal;
use cabin_core::portal::HomeView;

use crate::cmd::short_ts;
use crate::output::{OutputMode, pretty_kv, pretty_section, render_mode};

pub fn run_home(portal: &Portal, output: OutputMode) -> anyhow::Result<()> {
    let view = portal.home()?;
    render_mode(output, &view, write_text, write_pretty)
}

fn write_text(view: &HomeView, w: &mut dyn Write) -> io::Result<()> {
    writeln!(
        w,
        "session  {} {} {}",
        view.session.role, view.session.user_id, view.session.property_id
    )?;
    for notice in &view.notices {
        writeln!(w, "notice  {}  {}", notice.id, notice.title)?;
    }
    for outage in &view.outages {
        writeln!(w, "outage  {}  {}  {}", outage.id, outage.status, outage.title)?;
    }
    for ticket in view.open_tickets.iter().flatten() {
        writeln!(w, "ticket  {}  {}  {}", ticket.id, ticket.status, ticket.category)?;
    }
    Ok(())
}

fn write_pretty(view: &HomeView, w: &mut dyn Write) -> io::Result<()> {
    pretty_section(w, "Session")?;
    pretty_kv(w, "Role", view.session.role.to_string())?;
    pretty_kv(w, "User", &view.session.user_id)?;
    pretty_kv(w, "Property", &view.session.property_id)?;
    if let Some(cabin) = &view.session.cabin_id {
        pretty_kv(w, "Cabin", cabin)?;
    }
    let nav: Vec<&str> = view.nav.iter().map(|entry| entry.label).collect();
    pretty_kv(w, "Screens", nav.join(" · "))?;
    writeln!(w)?;

    pretty_section(w, "Notices")?;
    if view.notices.is_empty() {
        writeln!(w, "(none active)")?;
    }
    for notice in &view.notices {
        let pin = if notice.is_pinned { "📌 " } else { "" };
        writeln!(w, "{pin}{}  until {}", notice.title, short_ts(&notice.ends_at))?;
    }
    writeln!(w)?;

    pretty_section(w, "Outages")?;
    if view.outages.is_empty() {
        writeln!(w, "(none active)")?;
    }
    for outage in &view.outages {
        writeln!(w, "[{}] {}  until {}", outage.status, outage.title, short_ts(&outage.ends_at))?;
    }

    if let Some(tickets) = &view.open_tickets {
        writeln!(w)?;
        pretty_section(w, "My open requests")?;
        if tickets.is_empty() {
            writeln!(w, "(none)")?;
        }
        for ticket in tickets {
            writeln!(
                w,
                "{:<16} {:<12} {} / {}",
                ticket.id, ticket.status, ticket.category, ticket.subcategory
            )?;
        }
    }
    Ok(())
}
