use anyhow::Result;

use mnemos::context::AppContext;

/// Display memory statistics in the terminal.
pub fn stats(ctx: &AppContext) -> Result<()> {
    let response = mnemos::memory::stats::memory_stats(&ctx.engine)?;

    println!("Memory Statistics");
    println!("{}", "=".repeat(40));
    println!("  Backend:             {}", response.backend);
    println!("  Total nodes:         {}", response.total_nodes);
    println!("  Distinct keywords:   {}", response.distinct_keywords);
    println!();

    println!("By Strata:");
    for (strata, count) in &response.by_strata {
        println!("  {:<14} {}", strata, count);
    }
    println!();

    println!("By Namespace:");
    for (ns, count) in &response.namespaces {
        println!("  {:<14} {}", ns, count);
    }
    println!();

    println!("Transcendence links:   {}", response.transcendence_links);
    println!("Immanence links:       {}", response.immanence_links);
    println!("Dangling links:        {}", response.dangling_links);

    Ok(())
}
