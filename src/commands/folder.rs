//! Folder management CLI commands.

use clap::{Args, Subcommand};

use mediahub_core::error::AppError;
use mediahub_core::types::FolderId;
use mediahub_entity::folder::{FileStats, Visibility};
use mediahub_service::{AccessFacade, CreateFolderRequest, UpdateFolderRequest};

use super::Cli;
use crate::output::{self, FolderRow};

/// Arguments for folder commands
#[derive(Debug, Args)]
pub struct FolderArgs {
    /// Folder subcommand
    #[command(subcommand)]
    pub command: FolderCommand,
}

/// Folder subcommands
#[derive(Debug, Subcommand)]
pub enum FolderCommand {
    /// Show one folder
    Show {
        /// Folder ID
        id: FolderId,
    },
    /// Create a new folder
    Create {
        /// Folder name
        #[arg(short, long)]
        name: String,
        /// Parent folder ID (omit for a root in your library)
        #[arg(short, long)]
        parent: Option<FolderId>,
        /// Display color
        #[arg(long)]
        color: Option<String>,
        /// Display icon
        #[arg(long)]
        icon: Option<String>,
        /// Description
        #[arg(long)]
        description: Option<String>,
        /// Visibility (private, shared, public)
        #[arg(long)]
        visibility: Option<Visibility>,
    },
    /// Rename a folder
    Rename {
        /// Folder ID
        id: FolderId,
        /// New name
        #[arg(short, long)]
        name: String,
    },
    /// Update display metadata or visibility
    Update {
        /// Folder ID
        id: FolderId,
        /// Display color
        #[arg(long)]
        color: Option<String>,
        /// Display icon
        #[arg(long)]
        icon: Option<String>,
        /// Description
        #[arg(long)]
        description: Option<String>,
        /// Visibility (private, shared, public)
        #[arg(long)]
        visibility: Option<Visibility>,
        /// Position among siblings
        #[arg(long)]
        sort_order: Option<i32>,
    },
    /// Move a folder under another folder, or to the root level
    Move {
        /// Folder ID
        id: FolderId,
        /// New parent folder ID
        #[arg(long, conflicts_with = "to_root", required_unless_present = "to_root")]
        to: Option<FolderId>,
        /// Move to the root level of the owner's library
        #[arg(long)]
        to_root: bool,
    },
    /// Delete a folder and everything below it
    Delete {
        /// Folder ID
        id: FolderId,
    },
    /// Show the chain of folders from the root down to a folder
    Breadcrumbs {
        /// Folder ID
        id: FolderId,
    },
    /// Record files added to (positive) or removed from (negative) a folder
    Files {
        /// Folder ID
        id: FolderId,
        /// Change in file count
        #[arg(long, allow_hyphen_values = true, default_value = "0")]
        count: i64,
        /// Change in bytes
        #[arg(long, allow_hyphen_values = true, default_value = "0")]
        bytes: i64,
    },
}

/// Execute folder commands
pub async fn execute(args: &FolderArgs, cli: &Cli, facade: &AccessFacade) -> Result<(), AppError> {
    let ctx = cli.context()?;

    match &args.command {
        FolderCommand::Show { id } => {
            let folder = facade.get_folder(&ctx, *id).await?;
            output::print_item(&folder, cli.format);
        }
        FolderCommand::Create {
            name,
            parent,
            color,
            icon,
            description,
            visibility,
        } => {
            let folder = facade
                .create_folder(
                    &ctx,
                    CreateFolderRequest {
                        parent_id: *parent,
                        name: name.clone(),
                        color: color.clone(),
                        icon: icon.clone(),
                        description: description.clone(),
                        visibility: *visibility,
                    },
                )
                .await?;
            output::print_success(&format!("Folder '{}' created (id: {})", folder.name, folder.id));
        }
        FolderCommand::Rename { id, name } => {
            let folder = facade.rename_folder(&ctx, *id, name).await?;
            output::print_success(&format!("Folder renamed to '{}'", folder.name));
        }
        FolderCommand::Update {
            id,
            color,
            icon,
            description,
            visibility,
            sort_order,
        } => {
            let req = UpdateFolderRequest {
                color: color.clone().map(Some),
                icon: icon.clone().map(Some),
                description: description.clone().map(Some),
                visibility: *visibility,
                sort_order: *sort_order,
            };
            let folder = facade.update_folder(&ctx, *id, req).await?;
            output::print_success(&format!("Folder '{}' updated", folder.name));
        }
        FolderCommand::Move { id, to, to_root } => {
            let target = if *to_root { None } else { *to };
            let folder = facade.move_folder(&ctx, *id, target).await?;
            output::print_success(&format!(
                "Folder '{}' moved (depth {}, path {})",
                folder.name, folder.depth, folder.path
            ));
        }
        FolderCommand::Delete { id } => {
            let removed = facade.delete_folder(&ctx, *id).await?;
            output::print_success(&format!("{removed} folder(s) deleted"));
        }
        FolderCommand::Breadcrumbs { id } => {
            let crumbs = facade.breadcrumbs(&ctx, *id).await?;
            let rows: Vec<FolderRow> = crumbs.iter().map(FolderRow::from).collect();
            output::print_list(&rows, cli.format);
        }
        FolderCommand::Files { id, count, bytes } => {
            let folder = facade
                .record_file_change(&ctx, *id, FileStats::new(*count, *bytes))
                .await?;
            output::print_list(&[FolderRow::from(&folder)], cli.format);
        }
    }

    Ok(())
}
