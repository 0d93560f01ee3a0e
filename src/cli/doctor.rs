//! CLI `doctor` command: storage diagnostics, tool directories and the
//! Python interpreter used for import analysis.

use anyhow::{Context, Result};

use mnemos::config::MnemosConfig;
use mnemos::db;
use mnemos::imports::interpreter::InfoSource;
use mnemos::imports::InterpreterInfo;

pub fn doctor(config: &MnemosConfig) -> Result<()> {
    println!("Mnemos Health Report");
    println!("====================");
    println!();
    println!("Backend:           {}", config.storage.backend);

    match config.storage.backend.as_str() {
        "sqlite" => sqlite_report(config)?,
        "fs" => {
            let root = config.resolved_fs_root();
            println!("Node root:         {}", root.display());
            println!("  Exists:          {}", if root.is_dir() { "yes" } else { "no" });
        }
        other => println!("  WARNING: unknown backend {other:?}"),
    }

    println!();
    println!("Tool directories:");
    for dir in config.resolved_tool_dirs() {
        let status = if dir.is_dir() { "ok" } else { "missing" };
        println!("  {:<8} {}", status, dir.display());
    }

    println!();
    let info = InterpreterInfo::from_config(&config.analysis);
    match info.source() {
        InfoSource::Introspected => {
            println!("Python:            {} (introspected)", config.analysis.python);
            for dir in info.site_packages() {
                println!("  site-packages:   {}", dir.display());
            }
        }
        InfoSource::Builtin => {
            println!("Python:            built-in stdlib list (no introspection)");
        }
    }
    Ok(())
}

fn sqlite_report(config: &MnemosConfig) -> Result<()> {
    let db_path = config.resolved_db_path();
    if !db_path.exists() {
        println!("Database:          not found at {}", db_path.display());
        println!("Run `mnemos remember` or `mnemos tools index` to initialize.");
        return Ok(());
    }

    let file_size = std::fs::metadata(&db_path).map(|m| m.len()).unwrap_or(0);
    let conn = db::open_database(&db_path).context("failed to open database (may be corrupt)")?;
    let report = db::check_database_health(&conn).context("failed to run health check")?;

    println!("Database:          {}", db_path.display());
    println!("File size:         {}", format_bytes(file_size));
    println!("Schema version:    {}", report.schema_version);
    println!("Nodes:             {}", report.node_count);
    for (strata, count) in &report.nodes_by_strata {
        println!("  {:<16} {}", strata, count);
    }
    println!("Audit log:         {}", report.log_count);
    if report.integrity_ok {
        println!("Integrity check:   PASSED");
    } else {
        println!("Integrity check:   FAILED ({})", report.integrity_details);
        println!();
        println!("Recovery: restore ~/.mnemos/memory.db from a backup, or switch");
        println!("to the fs backend and re-run `mnemos tools index --force`.");
    }
    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
