//! Grant management CLI commands.

use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};

use mediahub_core::error::AppError;
use mediahub_core::types::{FolderId, PermissionId, UserId};
use mediahub_entity::permission::PermissionLevel;
use mediahub_service::{AccessFacade, GrantRequest, UpdateGrantRequest};

use super::Cli;
use crate::output::{self, GrantRow};

/// Arguments for grant commands
#[derive(Debug, Args)]
pub struct GrantArgs {
    /// Grant subcommand
    #[command(subcommand)]
    pub command: GrantCommand,
}

/// Grant subcommands
#[derive(Debug, Subcommand)]
pub enum GrantCommand {
    /// Grant a user a level on a folder
    Add {
        /// Folder ID
        #[arg(long)]
        folder: FolderId,
        /// Grantee
        #[arg(long)]
        user: UserId,
        /// Level (view, upload, edit, delete, admin)
        #[arg(long)]
        level: PermissionLevel,
        /// Expiry as an RFC 3339 timestamp
        #[arg(long)]
        expires_at: Option<DateTime<Utc>>,
    },
    /// Change the level or expiry of a grant
    Update {
        /// Grant ID
        id: PermissionId,
        /// New level
        #[arg(long)]
        level: Option<PermissionLevel>,
        /// New expiry as an RFC 3339 timestamp
        #[arg(long, conflicts_with = "no_expiry")]
        expires_at: Option<DateTime<Utc>>,
        /// Remove the expiry
        #[arg(long)]
        no_expiry: bool,
    },
    /// Revoke a grant
    Revoke {
        /// Grant ID
        id: PermissionId,
    },
    /// List the grants on a folder
    List {
        /// Folder ID
        #[arg(long)]
        folder: FolderId,
    },
}

/// Execute grant commands
pub async fn execute(args: &GrantArgs, cli: &Cli, facade: &AccessFacade) -> Result<(), AppError> {
    let ctx = cli.context()?;

    match &args.command {
        GrantCommand::Add {
            folder,
            user,
            level,
            expires_at,
        } => {
            let grant = facade
                .grant(
                    &ctx,
                    GrantRequest {
                        folder_id: *folder,
                        user_id: *user,
                        level: *level,
                        expires_at: *expires_at,
                    },
                )
                .await?;
            output::print_success(&format!(
                "Granted {} on {} to {} (id: {})",
                grant.level, grant.folder_id, grant.user_id, grant.id
            ));
        }
        GrantCommand::Update {
            id,
            level,
            expires_at,
            no_expiry,
        } => {
            let expires_at = if *no_expiry {
                Some(None)
            } else {
                expires_at.map(Some)
            };
            let grant = facade
                .update_grant(
                    &ctx,
                    *id,
                    UpdateGrantRequest {
                        level: *level,
                        expires_at,
                    },
                )
                .await?;
            output::print_list(&[GrantRow::from(&grant)], cli.format);
        }
        GrantCommand::Revoke { id } => {
            if facade.revoke(&ctx, *id).await? {
                output::print_success(&format!("Grant {id} revoked"));
            } else {
                output::print_warning(&format!("Grant {id} did not exist"));
            }
        }
        GrantCommand::List { folder } => {
            let grants = facade.list_grants(&ctx, *folder).await?;
            let rows: Vec<GrantRow> = grants.iter().map(GrantRow::from).collect();
            output::print_list(&rows, cli.format);
        }
    }

    Ok(())
}
