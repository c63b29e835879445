//! `cabin session`: inspect or replace the simulated actor.

use clap::{Args, Subcommand};
use std::io::Write;

use cabin_core::Portal;
use cabin_core::model::Role;
use cabin_core::portal::SessionSwitch;
use cabin_core::session::Session;

use crate::output::{OutputMode, pretty_kv, render, render_success};

#[derive(Args, Debug)]
pub struct SessionArgs {
    #[command(subcommand)]
    pub command: SessionCommand,
}

#[derive(Subcommand, Debug)]
pub enum SessionCommand {
    #[command(about = "Show the acting user, property and cabin")]
    Show,

    #[command(about = "Act as another user")]
    Switch(SwitchArgs),

    #[command(about = "Install the demo renter session if none exists")]
    Demo,

    #[command(about = "Forget the session")]
    Clear,
}

#[derive(Args, Debug)]
pub struct SwitchArgs {
    /// Role to act as (Renter, Staff, Admin).
    #[arg(long)]
    pub role: Role,

    /// User id to act as.
    #[arg(long)]
    pub user: String,

    /// Property id; defaults to the user's first property.
    #[arg(long)]
    pub property: Option<String>,

    /// Cabin id for renters; defaults to the user's cabin.
    #[arg(long)]
    pub cabin: Option<String>,
}

pub fn run_session(args: &SessionArgs, portal: &Portal, output: OutputMode) -> anyhow::Result<()> {
    match &args.command {
        SessionCommand::Show => {
            let profile = portal.profile()?;
            render(output, &profile, |p, w| {
                write_session(&p.session, w)?;
                if let Some(user) = &p.user {
                    pretty_kv(w, "Name", &user.name)?;
                    pretty_kv(w, "Email", &user.email)?;
                }
                if let Some(property) = &p.property {
                    pretty_kv(w, "Site", &property.name)?;
                }
                if let Some(cabin) = &p.cabin {
                    pretty_kv(w, "Cabin name", &cabin.name)?;
                }
                Ok(())
            })
        }
        SessionCommand::Switch(switch) => {
            let session = portal.switch_session(SessionSwitch {
                role: switch.role,
                user_id: switch.user.clone(),
                property_id: switch.property.clone(),
                cabin_id: switch.cabin.clone(),
            })?;
            render(output, &session, write_session)
        }
        SessionCommand::Demo => {
            let session = portal.initialize_demo()?;
            render(output, &session, write_session)
        }
        SessionCommand::Clear => {
            portal.sessions().clear()?;
            render_success(output, "session cleared")
        }
    }
}

fn write_session(session: &Session, w: &mut dyn Write) -> std::io::Result<()> {
    pretty_kv(w, "Role", session.role.to_string())?;
    pretty_kv(w, "User", &session.user_id)?;
    pretty_kv(w, "Property", &session.property_id)?;
    pretty_kv(w, "Cabin", session.cabin_id.as_deref().unwrap_or("-"))
}
