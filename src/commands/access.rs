//! Access check CLI commands.

use clap::{Args, Subcommand};

use mediahub_core::error::AppError;
use mediahub_core::types::{FolderId, UserId};
use mediahub_entity::permission::PermissionLevel;
use mediahub_service::AccessFacade;

use super::Cli;
use crate::output::{self, OutputFormat};

/// Arguments for access commands
#[derive(Debug, Args)]
pub struct AccessArgs {
    /// Access subcommand
    #[command(subcommand)]
    pub command: AccessCommand,
}

/// Access subcommands
#[derive(Debug, Subcommand)]
pub enum AccessCommand {
    /// Check whether a user holds at least a level on a folder
    Check {
        /// User ID
        #[arg(long)]
        user: UserId,
        /// Folder ID
        #[arg(long)]
        folder: FolderId,
        /// Required level
        #[arg(long)]
        level: PermissionLevel,
    },
    /// Show a user's effective level on a folder
    Level {
        /// User ID
        #[arg(long)]
        user: UserId,
        /// Folder ID
        #[arg(long)]
        folder: FolderId,
        /// Include grants on ancestor folders
        #[arg(long)]
        inherited: bool,
    },
}

/// Execute access commands
pub async fn execute(args: &AccessArgs, cli: &Cli, facade: &AccessFacade) -> Result<(), AppError> {
    match &args.command {
        AccessCommand::Check {
            user,
            folder,
            level,
        } => {
            let allowed = facade.check_access(*user, *folder, *level).await?;
            match cli.format {
                OutputFormat::Json => output::print_item(&allowed, cli.format),
                OutputFormat::Table if allowed => output::print_success("allowed"),
                OutputFormat::Table => output::print_warning("denied"),
            }
        }
        AccessCommand::Level {
            user,
            folder,
            inherited,
        } => {
            let level = if *inherited {
                facade.effective_level_inherited(*user, *folder).await?
            } else {
                facade.effective_level(*user, *folder).await?
            };
            match cli.format {
                OutputFormat::Json => output::print_item(&level, cli.format),
                OutputFormat::Table => output::print_kv(
                    "level",
                    &level.map_or_else(|| "none".to_string(), |l| l.to_string()),
                ),
            }
        }
    }

    Ok(())
}
