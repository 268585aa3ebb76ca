mod analyze;
mod config;
mod history;
mod manage;
mod present;

use crate::state::Context;

/// CIO - investment analysis reports
#[poise::command(
    slash_command,
    subcommands(
        "analyze::analyze",
        "history::history",
        "history::open",
        "history::delete",
        "manage::reset",
        "config::config"
    )
)]
pub async fn cio(_ctx: Context<'_>) -> Result<(), anyhow::Error> {
    Ok(())
}
