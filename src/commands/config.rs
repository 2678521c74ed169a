//! Configuration display.

use mediahub_core::config::AppConfig;
use mediahub_core::error::AppError;

use crate::output::{self, OutputFormat};

/// Print the effective configuration
pub fn execute(config: &AppConfig, format: OutputFormat) -> Result<(), AppError> {
    if format == OutputFormat::Json {
        output::print_item(config, format);
        return Ok(());
    }

    println!("Store");
    output::print_kv("backend", &format!("{:?}", config.store.backend).to_lowercase());
    println!("Hierarchy");
    output::print_kv("max_depth", &config.hierarchy.max_depth.to_string());
    output::print_kv("max_name_length", &config.hierarchy.max_name_length.to_string());
    output::print_kv(
        "case_insensitive_names",
        &config.hierarchy.case_insensitive_names.to_string(),
    );
    println!("Permissions");
    output::print_kv("inheritance", &format!("{:?}", config.permissions.inheritance).to_lowercase());
    println!("Cache");
    output::print_kv("enabled", &config.cache.enabled.to_string());
    output::print_kv("max_capacity", &config.cache.max_capacity.to_string());
    output::print_kv("time_to_live_seconds", &config.cache.time_to_live_seconds.to_string());
    println!("Locking");
    output::print_kv("acquire_timeout_ms", &config.locking.acquire_timeout_ms.to_string());
    output::print_kv("max_retries", &config.locking.max_retries.to_string());
    println!("Logging");
    output::print_kv("level", &config.logging.level);
    output::print_kv("format", &config.logging.format);
    Ok(())
}
