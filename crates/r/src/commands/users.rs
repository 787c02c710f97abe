use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;

use crate::config::Globals;
use crate::utils::print_structured;

#[derive(Clone, Parser, Debug)]
pub struct CommandOptions {
    #[command(subcommand)]
    pub command: UsersCommand,
}

#[derive(Clone, Subcommand, Debug)]
pub enum UsersCommand {
    /// List the user profiles
    #[clap(alias = "ls")]
    List,
}

pub async fn run(options: CommandOptions, globals: &Globals) -> Result<()> {
    let client = globals.client()?;

    match options.command {
        UsersCommand::List => {
            let users = client.list_users().await?;
            if !print_structured(globals.format, &users)? {
                for user in &users {
                    println!(
                        "{}\t{}",
                        user.id.as_deref().unwrap_or("-"),
                        user.created_date.as_deref().unwrap_or("-")
                    );
                }
            }
        }
    }

    Ok(())
}
