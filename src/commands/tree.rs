//! Folder tree display.

use clap::Args;

use mediahub_core::error::AppError;
use mediahub_core::types::FolderId;
use mediahub_service::{AccessFacade, TreeScope};

use super::Cli;
use crate::output;

/// Arguments for the tree command
#[derive(Debug, Args)]
pub struct TreeArgs {
    /// Show only this folder and its descendants (default: the caller's library)
    #[arg(long)]
    pub folder: Option<FolderId>,
}

/// Execute the tree command
pub async fn execute(args: &TreeArgs, cli: &Cli, facade: &AccessFacade) -> Result<(), AppError> {
    let ctx = cli.context()?;
    let scope = match args.folder {
        Some(id) => TreeScope::Subtree(id),
        None => TreeScope::Library(ctx.user_id),
    };

    let forest = facade.get_tree(&ctx, scope).await?;
    output::print_tree(&forest, cli.format);

    let orphans = forest.orphans().count();
    if orphans > 0 {
        output::print_warning(&format!("{orphans} folder(s) reference a missing parent"));
    }
    Ok(())
}
