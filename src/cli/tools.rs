//! CLI commands over the tool registry.

use anyhow::{anyhow, bail, Result};

use mnemos::context::AppContext;
use mnemos::tools::{ToolLevel, ToolMetadata, ToolQuery, ToolType};

use super::{preview, spinner};

pub fn index(ctx: &mut AppContext, force: bool) -> Result<()> {
    let pb = spinner("indexing tool documents");
    let result = ctx.index_tools(force);
    pb.finish_and_clear();
    let report = result?;

    if report.already_indexed {
        println!("Already indexed ({} tools). Use --force to rescan.", report.total_tools);
        return Ok(());
    }

    println!("Scanned {} document(s), indexed {}", report.scanned_files, report.indexed);
    if !report.invalid.is_empty() {
        println!();
        println!("Invalid ({}):", report.invalid.len());
        for f in &report.invalid {
            println!("  {}: {}", f.path, f.reason);
        }
    }
    if !report.failed.is_empty() {
        println!();
        println!("Failed ({}):", report.failed.len());
        for f in &report.failed {
            println!("  {}: {}", f.path, f.reason);
        }
    }
    println!();
    println!("Total tools: {}", report.total_tools);
    Ok(())
}

pub fn search(
    ctx: &AppContext,
    tool_type: Option<&str>,
    keyword: Option<String>,
    level: Option<&str>,
    intent: Option<String>,
    limit: usize,
) -> Result<()> {
    let query = ToolQuery {
        tool_type: tool_type
            .map(str::parse::<ToolType>)
            .transpose()
            .map_err(|e| anyhow!(e))?,
        keyword,
        level: level
            .map(str::parse::<ToolLevel>)
            .transpose()
            .map_err(|e| anyhow!(e))?,
        intent,
        limit,
    };

    let results = ctx.registry.search_tools(&ctx.engine, &query);
    if results.is_empty() {
        println!("No tools found.");
        return Ok(());
    }

    for (i, tool) in results.iter().enumerate() {
        let level = tool.level.map(|l| l.to_string()).unwrap_or_default();
        println!(
            "  {}. [{}] {} {} - {}",
            i + 1,
            tool.tool_type,
            tool.tool_id,
            level,
            preview(&tool.intent, 80)
        );
    }
    Ok(())
}

pub fn show(ctx: &AppContext, tool_id: &str) -> Result<()> {
    let Some(tool) = ctx.registry.get_tool(tool_id) else {
        bail!("no tool named {tool_id}");
    };
    print_tool(tool);
    Ok(())
}

pub fn unregister(ctx: &mut AppContext, tool_id: &str) -> Result<()> {
    if ctx.registry.unregister_tool(&mut ctx.engine, tool_id)? {
        println!("Unregistered {tool_id}");
    } else {
        println!("No tool named {tool_id}");
    }
    Ok(())
}

pub fn stats(ctx: &AppContext) -> Result<()> {
    let stats = ctx.registry.tool_stats();
    println!("Tools: {}", stats.total_tools);
    println!();
    println!("By Type:");
    for (t, count) in &stats.by_type {
        println!("  {:<16} {}", t, count);
    }
    println!();
    println!("By Level:");
    for (l, count) in &stats.by_level {
        println!("  {:<16} {}", l, count);
    }
    Ok(())
}

fn print_tool(tool: &ToolMetadata) {
    println!("{} ({})", tool.tool_id, tool.tool_type);
    if let Some(level) = tool.level {
        println!("  Level:         {level}");
    }
    println!("  Intent:        {}", tool.intent);
    if let Some(sig) = &tool.signature {
        println!("  Signature:     {sig}");
    }
    if !tool.required_params.is_empty() {
        println!("  Requires:      {}", tool.required_params.join(", "));
    }
    if !tool.optional_params.is_empty() {
        println!("  Optional:      {}", tool.optional_params.join(", "));
    }
    if let Some(returns) = &tool.returns {
        println!("  Returns:       {returns}");
    }
    if !tool.keywords.is_empty() {
        println!("  Keywords:      {}", tool.keywords.join(", "));
    }
    if let Some(usage) = &tool.usage_context {
        println!("  Usage:         {usage}");
    }
    if let Some(src) = &tool.source_path {
        println!("  Source:        {src}");
    }
}
