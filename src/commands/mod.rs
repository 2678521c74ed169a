//! CLI command definitions and dispatch.

pub mod access;
pub mod config;
pub mod folder;
pub mod grant;
pub mod integrity;
pub mod migrate;
pub mod tree;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;

use mediahub_core::config::{AppConfig, StoreBackend};
use mediahub_core::error::AppError;
use mediahub_core::types::UserId;
use mediahub_database::{FolderStore, MemoryFolderStore, PgFolderStore, UserDirectory};
use mediahub_service::{AccessFacade, RequestContext, TracingEventSink};

use crate::output::OutputFormat;

/// MediaHub media library folder hierarchy manager
#[derive(Debug, Parser)]
#[command(name = "mediahub", version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,

    /// Configuration environment overlay (config/<env>.toml)
    #[arg(long, env = "MEDIAHUB_ENV", default_value = "development")]
    pub env: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// JSON snapshot to load into the memory backend
    #[arg(long, global = true)]
    pub seed: Option<PathBuf>,

    /// Write the memory backend back to the seed file after the command
    #[arg(long, global = true, requires = "seed")]
    pub save: bool,

    /// Acting user
    #[arg(long = "as", value_name = "USER_ID", global = true)]
    pub actor: Option<UserId>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show a folder tree
    Tree(tree::TreeArgs),
    /// Folder management
    Folder(folder::FolderArgs),
    /// Grant management
    Grant(grant::GrantArgs),
    /// Access checks
    Access(access::AccessArgs),
    /// Integrity verification and repair
    Integrity(integrity::IntegrityArgs),
    /// Run database migrations
    Migrate,
    /// Show the effective configuration
    Config,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self, config: &AppConfig) -> Result<(), AppError> {
        match &self.command {
            Commands::Migrate => return migrate::execute(config).await,
            Commands::Config => return config::execute(config, self.format),
            _ => {}
        }

        let runtime = Runtime::open(config, self.seed.clone(), self.save).await?;
        match &self.command {
            Commands::Tree(args) => tree::execute(args, self, &runtime.facade).await?,
            Commands::Folder(args) => folder::execute(args, self, &runtime.facade).await?,
            Commands::Grant(args) => grant::execute(args, self, &runtime.facade).await?,
            Commands::Access(args) => access::execute(args, self, &runtime.facade).await?,
            Commands::Integrity(args) => integrity::execute(args, self, &runtime.facade).await?,
            Commands::Migrate | Commands::Config => {}
        }
        runtime.finish().await
    }

    /// Request context for the acting user.
    pub fn context(&self) -> Result<RequestContext, AppError> {
        self.actor
            .map(RequestContext::new)
            .ok_or_else(|| AppError::validation("This command needs an acting user (--as <USER_ID>)"))
    }
}

/// The façade plus what is needed to persist the memory backend.
pub struct Runtime {
    /// Service entry point
    pub facade: AccessFacade,
    memory: Option<MemoryFolderStore>,
    save_to: Option<PathBuf>,
}

impl Runtime {
    /// Build the store selected by configuration and wire the services.
    pub async fn open(
        config: &AppConfig,
        seed: Option<PathBuf>,
        save: bool,
    ) -> Result<Self, AppError> {
        let sink = Arc::new(TracingEventSink);
        match config.store.backend {
            StoreBackend::Memory => {
                let store = match &seed {
                    Some(path) => {
                        let source = tokio::fs::read_to_string(path).await.map_err(|e| {
                            AppError::configuration(format!(
                                "Failed to read seed '{}': {e}",
                                path.display()
                            ))
                        })?;
                        MemoryFolderStore::from_json(&source)?
                    }
                    None => MemoryFolderStore::new(),
                };
                info!(
                    folders = store.folder_count().await,
                    "Using in-memory folder store"
                );

                let shared = Arc::new(store.clone());
                let folders: Arc<dyn FolderStore> = shared.clone();
                let users: Arc<dyn UserDirectory> = shared;
                Ok(Self {
                    facade: AccessFacade::new(folders, users, sink, config),
                    memory: Some(store),
                    save_to: if save { seed } else { None },
                })
            }
            StoreBackend::Postgres => {
                let shared = Arc::new(PgFolderStore::connect(&config.store.database).await?);
                let folders: Arc<dyn FolderStore> = shared.clone();
                let users: Arc<dyn UserDirectory> = shared;
                Ok(Self {
                    facade: AccessFacade::new(folders, users, sink, config),
                    memory: None,
                    save_to: None,
                })
            }
        }
    }

    /// Persist the memory backend when requested.
    pub async fn finish(self) -> Result<(), AppError> {
        let (Some(store), Some(path)) = (self.memory, self.save_to) else {
            return Ok(());
        };
        let json = serde_json::to_string_pretty(&store.snapshot().await)
            .map_err(|e| AppError::internal(format!("Failed to encode snapshot: {e}")))?;
        tokio::fs::write(&path, json).await.map_err(|e| {
            AppError::internal(format!("Failed to write '{}': {e}", path.display()))
        })?;
        info!(path = %path.display(), "Memory store saved");
        Ok(())
    }
}
