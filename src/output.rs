//! Table and JSON output formatting for CLI commands.

use serde::Serialize;
use tabled::{Table, Tabled};

use mediahub_entity::folder::{Folder, FolderForest, FolderNode};
use mediahub_entity::permission::FolderPermission;

/// Output format selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// JSON output
    Json,
}

/// Folder display row
#[derive(Debug, Serialize, Tabled)]
pub struct FolderRow {
    /// Folder ID
    pub id: String,
    /// Name
    pub name: String,
    /// Depth
    pub depth: i32,
    /// Files in the subtree
    pub files: i64,
    /// Bytes in the subtree
    pub size: i64,
    /// Visibility
    pub visibility: String,
}

impl From<&Folder> for FolderRow {
    fn from(f: &Folder) -> Self {
        Self {
            id: f.id.to_string(),
            name: f.name.clone(),
            depth: f.depth,
            files: f.file_count,
            size: f.total_size,
            visibility: f.visibility.to_string(),
        }
    }
}

/// Grant display row
#[derive(Debug, Serialize, Tabled)]
pub struct GrantRow {
    /// Grant ID
    pub id: String,
    /// Grantee
    pub user: String,
    /// Level
    pub level: String,
    /// Expiry
    pub expires: String,
    /// Whether the grant is still in force
    pub active: bool,
}

impl From<&FolderPermission> for GrantRow {
    fn from(p: &FolderPermission) -> Self {
        Self {
            id: p.id.to_string(),
            user: p.user_id.to_string(),
            level: p.level.to_string(),
            expires: p
                .expires_at
                .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "never".to_string()),
            active: !p.is_expired(),
        }
    }
}

/// Flattened tree row with the name indented by depth
#[derive(Debug, Serialize, Tabled)]
struct TreeRow {
    /// Indented name
    name: String,
    /// Folder ID
    id: String,
    /// Files in the subtree
    files: i64,
    /// Bytes in the subtree
    size: i64,
}

/// Print a list of items in the selected format
pub fn print_list<T: Serialize + Tabled>(items: &[T], format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            if items.is_empty() {
                println!("No results found.");
            } else {
                let table = Table::new(items).to_string();
                println!("{table}");
            }
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(items).unwrap_or_else(|_| "[]".to_string());
            println!("{json}");
        }
    }
}

/// Print a single item in the selected format
pub fn print_item<T: Serialize + std::fmt::Debug>(item: &T, format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            println!("{item:#?}");
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(item).unwrap_or_else(|_| "{}".to_string());
            println!("{json}");
        }
    }
}

/// Print a forest as an indented table, or as nested JSON
pub fn print_tree(forest: &FolderForest, format: OutputFormat) {
    if format == OutputFormat::Json {
        print_item(forest, format);
        return;
    }

    let mut rows = Vec::with_capacity(forest.total_folders as usize);
    for root in &forest.roots {
        flatten(root, 0, &mut rows);
    }
    print_list(&rows, format);
    println!("{} folder(s)", forest.total_folders);
}

fn flatten(node: &FolderNode, level: usize, rows: &mut Vec<TreeRow>) {
    let marker = if node.dangling_parent { " (orphan)" } else { "" };
    rows.push(TreeRow {
        name: format!("{}{}{}", "  ".repeat(level), node.name, marker),
        id: node.id.to_string(),
        files: node.file_count,
        size: node.total_size,
    });
    for child in &node.children {
        flatten(child, level + 1, rows);
    }
}

/// Print a success message
pub fn print_success(msg: &str) {
    println!("✓ {msg}");
}

/// Print a warning message
pub fn print_warning(msg: &str) {
    println!("⚠ {msg}");
}

/// Print a key-value pair
pub fn print_kv(key: &str, value: &str) {
    println!("  {:<24} {}", format!("{key}:"), value);
}

/// Print an error message
pub fn print_error(msg: &str) {
    eprintln!("✗ {msg}");
}
