use std::path::PathBuf;

use anyhow::Result;

use mnemos::config::MnemosConfig;
use mnemos::deps::DependencyAnalyzer;
use mnemos::imports::ImportResolver;

use super::spinner;

/// Recursive dependency analysis from `seeds`.
pub fn analyze(config: &MnemosConfig, seeds: &[PathBuf], max_depth: Option<usize>, json: bool) -> Result<()> {
    let resolver = ImportResolver::from_config(config);
    let mut analyzer = DependencyAnalyzer::new(resolver).with_exclude_dirs(config.analysis.exclude_dirs.clone());

    let seeds: Vec<PathBuf> = seeds
        .iter()
        .map(|s| std::fs::canonicalize(s).unwrap_or_else(|_| s.clone()))
        .collect();
    let seeds = analyzer.expand_seeds(&seeds);
    let max_depth = max_depth.unwrap_or(config.analysis.max_depth);

    let pb = spinner("analysing imports");
    let graph = analyzer.analyze_recursive_dependencies(&seeds, max_depth);
    pb.finish_and_clear();

    if json {
        println!("{}", graph.to_json()?);
        return Ok(());
    }

    let stats = graph.stats();
    let root = analyzer.resolver().project_root().to_path_buf();
    let rel = |p: &std::path::Path| p.strip_prefix(&root).unwrap_or(p).display().to_string();

    println!("Dependency Analysis");
    println!("{}", "=".repeat(40));
    println!("  Files:               {}", stats.total_files);
    println!("  Imports:             {}", stats.total_imports);
    println!(
        "  Resolved:            {} ({:.1}%)",
        stats.resolved_imports,
        stats.resolution_ratio * 100.0
    );
    println!("  Avg complexity:      {:.1}", stats.average_complexity);
    println!("  Skipped files:       {}", stats.skipped_files);
    println!();

    if !stats.pattern_counts.is_empty() {
        println!("Patterns:");
        for (pattern, count) in &stats.pattern_counts {
            println!("  {:<14} {}", pattern, count);
        }
        println!();
    }

    let cycles = graph.find_cycles();
    if !cycles.is_empty() {
        println!("Cycles:");
        for cycle in &cycles {
            let names: Vec<String> = cycle.iter().map(|p| rel(p.as_path())).collect();
            println!("  {}", names.join(" <-> "));
        }
        println!();
    }

    if !stats.unresolved.is_empty() {
        println!("Unresolved imports:");
        for entry in &stats.unresolved {
            print!("  {}: {} [{}]", rel(entry.file_path.as_path()), entry.import_name, entry.error_type);
            match &entry.suggestion {
                Some(fix) => println!(" - {fix}"),
                None => println!(),
            }
        }
    }
    Ok(())
}
