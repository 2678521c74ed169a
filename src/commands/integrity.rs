//! Integrity verification and repair CLI commands.

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use mediahub_core::error::AppError;
use mediahub_core::types::FolderId;
use mediahub_service::{AccessFacade, IntegrityReport, TreeScope};

use super::Cli;
use crate::output::{self, OutputFormat};

/// Arguments for integrity commands
#[derive(Debug, Args)]
pub struct IntegrityArgs {
    /// Integrity subcommand
    #[command(subcommand)]
    pub command: IntegrityCommand,
}

/// Integrity subcommands
#[derive(Debug, Subcommand)]
pub enum IntegrityCommand {
    /// Report records whose path, depth, or statistics have drifted
    Verify {
        /// Check only this subtree (default: the caller's library)
        #[arg(long)]
        folder: Option<FolderId>,
    },
    /// Rewrite drifted records
    Repair {
        /// Repair only this subtree (default: the caller's library)
        #[arg(long)]
        folder: Option<FolderId>,
    },
}

/// Issue display row
#[derive(Debug, Serialize, Tabled)]
struct IssueRow {
    /// Folder ID
    folder: String,
    /// Problem and details
    problem: String,
}

/// Execute integrity commands
pub async fn execute(args: &IntegrityArgs, cli: &Cli, facade: &AccessFacade) -> Result<(), AppError> {
    let ctx = cli.context()?;
    let scope_for = |folder: Option<FolderId>| match folder {
        Some(id) => TreeScope::Subtree(id),
        None => TreeScope::Library(ctx.user_id),
    };

    let report = match &args.command {
        IntegrityCommand::Verify { folder } => {
            facade.verify_integrity(&ctx, scope_for(*folder)).await?
        }
        IntegrityCommand::Repair { folder } => facade.repair(&ctx, scope_for(*folder)).await?,
    };

    print_report(&report, cli.format);
    Ok(())
}

fn print_report(report: &IntegrityReport, format: OutputFormat) {
    if format == OutputFormat::Json {
        output::print_item(report, format);
        return;
    }

    let rows: Vec<IssueRow> = report
        .issues
        .iter()
        .map(|issue| IssueRow {
            folder: issue.folder_id.to_string(),
            problem: format!("{:?}", issue.problem),
        })
        .collect();
    if !rows.is_empty() {
        output::print_list(&rows, format);
    }

    output::print_kv("folders checked", &report.folders_checked.to_string());
    output::print_kv("issues", &report.issues.len().to_string());
    if report.repaired > 0 {
        output::print_success(&format!("{} record(s) repaired", report.repaired));
    } else if report.is_clean() {
        output::print_success("No issues found");
    }
}
