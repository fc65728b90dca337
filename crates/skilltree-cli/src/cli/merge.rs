//! `skilltree merge`: merge both feeds and report repairs.

use std::path::Path;

use anyhow::{Context, Result};
use comfy_table::{presets, Cell, Color, ContentArrangement, Table};
use console::style;

use skilltree_types::skill::NodeOrigin;

use crate::state::AppState;

pub async fn handle_merge(state: &AppState, out: Option<&Path>, json: bool, quiet: bool) -> Result<()> {
    if let Some(path) = out {
        let records = state.graph.to_primary_records();
        let content = serde_json::to_string_pretty(&records)?;
        tokio::fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }

    if json {
        let out = serde_json::json!({
            "nodes": state.graph.nodes(),
            "edges": state.graph.edge_count(),
            "warnings": state.warnings.iter().map(|w| w.to_string()).collect::<Vec<_>>(),
            "skipped_documents": state
                .skipped
                .iter()
                .map(|(doc, reason)| serde_json::json!({"document": doc, "reason": reason}))
                .collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    if quiet {
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Id").fg(Color::Cyan),
            Cell::new("Name"),
            Cell::new("Branch"),
            Cell::new("Tier"),
            Cell::new("Requires"),
            Cell::new("Origin"),
        ]);

    for node in state.graph.nodes() {
        let (origin, color) = match node.origin {
            NodeOrigin::Primary => ("primary", Color::Green),
            NodeOrigin::Secondary => ("secondary", Color::Yellow),
            NodeOrigin::Placeholder => ("placeholder", Color::Red),
        };
        let requires = node
            .prerequisites
            .iter()
            .map(|p| state.skill_name(p))
            .collect::<Vec<_>>()
            .join(", ");

        table.add_row(vec![
            Cell::new(node.id.as_str()),
            Cell::new(&node.name),
            Cell::new(node.branch.to_string()),
            Cell::new(node.difficulty_tier.to_string()),
            Cell::new(if requires.is_empty() { "-".to_string() } else { requires }),
            Cell::new(origin).fg(color),
        ]);
    }

    println!();
    println!(
        "  {} {} skills, {} prerequisite edges",
        style("Merged").bold(),
        state.graph.len(),
        state.graph.edge_count()
    );
    println!();
    println!("{table}");

    if !state.warnings.is_empty() {
        println!();
        println!("  {}", style("Repairs").yellow().bold());
        for warning in &state.warnings {
            println!("  {} {warning}", style("!").yellow());
        }
    }
    for (document, reason) in &state.skipped {
        println!("  {} skipped {document}: {reason}", style("✗").red());
    }
    if let Some(path) = out {
        println!();
        println!("  {} Wrote merged feed to {}", style("✓").green(), path.display());
    }
    println!();

    Ok(())
}
