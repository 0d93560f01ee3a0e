//! CLI commands over memory nodes: remember, recall, find, forget, link,
//! traverse.

use anyhow::{anyhow, bail, Result};

use mnemos::context::AppContext;
use mnemos::memory::traversal::traverse as walk;
use mnemos::memory::{LinkDirection, MemoryNode, Strata, WriteOutcome};

use super::preview;

pub struct RememberArgs {
    pub path: String,
    pub content: String,
    pub summary: String,
    pub keywords: Vec<String>,
    pub strata: Option<String>,
    pub transcendence: Vec<String>,
    pub immanence: Vec<String>,
}

pub fn remember(ctx: &mut AppContext, args: RememberArgs) -> Result<()> {
    let strata = args
        .strata
        .as_deref()
        .map(str::parse::<Strata>)
        .transpose()
        .map_err(|e| anyhow!(e))?;

    let node = MemoryNode::new(args.path, args.content, args.summary, args.keywords, Strata::Cognitive)
        .with_transcendence_links(args.transcendence)
        .with_immanence_links(args.immanence);
    let path = node.path.clone();

    let outcome = ctx.remember(node, strata)?;
    let verb = match outcome {
        WriteOutcome::Created => "Created",
        WriteOutcome::Updated => "Updated",
    };
    println!("{verb} {path}");
    Ok(())
}

pub fn recall(ctx: &AppContext, path: &str, json: bool) -> Result<()> {
    let Some(node) = ctx.engine.get_memory_node(path)? else {
        bail!("no node at {path}");
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&node)?);
        return Ok(());
    }

    println!("{}", node.path);
    println!("  Strata:        {}", node.strata);
    if !node.summary.is_empty() {
        println!("  Summary:       {}", node.summary);
    }
    if !node.keywords.is_empty() {
        println!("  Keywords:      {}", node.keywords.join(", "));
    }
    for link in &node.transcendence_links {
        println!("  ↑ {link}");
    }
    for link in &node.immanence_links {
        println!("  ↓ {link}");
    }
    println!();
    println!("{}", node.content);
    Ok(())
}

pub fn find(ctx: &AppContext, keyword: Option<&str>, strata: Option<&str>, under: Option<&str>) -> Result<()> {
    if keyword.is_none() && strata.is_none() {
        bail!("give --keyword and/or --strata");
    }

    let mut paths: Option<Vec<String>> = keyword.map(|k| match under {
        Some(prefix) => ctx.engine.find_memories_by_keyword_in(k, prefix),
        None => ctx.engine.find_memories_by_keyword(k),
    });

    if let Some(s) = strata {
        let strata: Strata = s.parse().map_err(|e: String| anyhow!(e))?;
        let in_strata: Vec<String> = ctx
            .engine
            .find_by_strata(&strata)?
            .into_iter()
            .map(|n| n.path)
            .collect();
        paths = Some(match paths {
            Some(existing) => existing.into_iter().filter(|p| in_strata.contains(p)).collect(),
            None => in_strata,
        });
    }

    let mut paths = paths.unwrap_or_default();
    paths.sort();
    if paths.is_empty() {
        println!("No matching nodes.");
        return Ok(());
    }
    for path in &paths {
        let summary = ctx
            .engine
            .get_memory_node(path)?
            .map(|n| preview(&n.summary, 80))
            .unwrap_or_default();
        println!("  {path:<50} {summary}");
    }
    println!("\n{} node(s)", paths.len());
    Ok(())
}

pub fn forget(ctx: &mut AppContext, path: &str) -> Result<()> {
    if ctx.engine.forget_memory(path)? {
        println!("Forgot {path}");
    } else {
        println!("Nothing stored at {path}");
    }
    Ok(())
}

pub fn link(ctx: &mut AppContext, from: &str, to: &str, direction: &str) -> Result<()> {
    let direction: LinkDirection = direction.parse().map_err(|e: String| anyhow!(e))?;
    let added = match direction {
        LinkDirection::Transcendence => ctx.engine.add_transcendence_link(from, to)?,
        LinkDirection::Immanence => ctx.engine.add_immanence_link(from, to)?,
    };
    if added {
        println!("Linked {from} -> {to} ({direction})");
    } else {
        println!("Link already present");
    }
    if !ctx.engine.contains(to) {
        println!("Note: {to} does not exist yet (soft reference)");
    }
    Ok(())
}

pub fn traverse(ctx: &AppContext, path: &str, direction: &str, depth: usize) -> Result<()> {
    let direction: LinkDirection = direction.parse().map_err(|e: String| anyhow!(e))?;
    let result = walk(&ctx.engine, path, direction, depth)?;

    for step in &result.steps {
        let indent = "  ".repeat(step.depth);
        println!("{indent}{} {}", step.path, preview(&step.summary, 60));
    }
    if !result.dangling.is_empty() {
        println!();
        println!("Dangling links:");
        for d in &result.dangling {
            println!("  {d}");
        }
    }
    Ok(())
}
