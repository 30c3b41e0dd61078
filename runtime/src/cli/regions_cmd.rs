//! `lotmap regions`: show the region table a run would use.

use crate::cli::output::{self, Styled};
use crate::config::RegionTable;
use anyhow::{Context, Result};
use std::path::Path;

/// Print the configured regions.
pub fn run(path: Option<&Path>) -> Result<()> {
    let table = RegionTable::load(path).context("failed to load region table")?;

    if output::is_json() {
        output::print_json(&serde_json::to_value(&table)?);
        return Ok(());
    }

    let s = Styled::new();
    if !output::is_quiet() {
        output::print_header(&s);
    }
    print_table(&s, &table);

    if let Err(e) = table.validate() {
        eprintln!();
        eprintln!("  {} {}", s.warn_sym(), s.yellow(&e.to_string()));
    }
    Ok(())
}

fn print_table(s: &Styled, table: &RegionTable) {
    if table.regions.is_empty() {
        eprintln!("  {}", s.dim("No regions configured."));
        return;
    }

    eprintln!(
        "  {}",
        s.bold(&format!("{:<24} {:>38} {:>8}", "Region", "Bounding box (S, W, N, E)", "Divisor"))
    );
    for region in &table.regions {
        let b = region.bbox;
        let bbox = format!("{:.4}, {:.4}, {:.4}, {:.4}", b.south, b.west, b.north, b.east);
        eprintln!(
            "  {:<24} {bbox:>38} {:>8}",
            region.group_key().to_string(),
            region.divisor
        );
    }
}
