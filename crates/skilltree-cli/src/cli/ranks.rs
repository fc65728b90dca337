//! `skilltree ranks`: resolved rank per skill.

use anyhow::Result;
use comfy_table::{presets, Cell, Color, ContentArrangement, Table};

use skilltree_types::rank::{RankSource, DisplayTier};

use crate::state::AppState;

fn tier_color(tier: DisplayTier) -> Color {
    match tier {
        DisplayTier::Beginner => Color::Green,
        DisplayTier::Ranked(_) => Color::Yellow,
    }
}

pub fn handle_ranks(state: &AppState, json: bool) -> Result<()> {
    let mut rows: Vec<_> = state
        .graph
        .nodes()
        .iter()
        .filter_map(|node| state.ranks.get(&node.id).map(|label| (node, label)))
        .collect();
    rows.sort_by(|(a, la), (b, lb)| la.rank.cmp(&lb.rank).then_with(|| a.name.cmp(&b.name)));

    if json {
        let out: Vec<_> = rows
            .iter()
            .map(|(node, label)| {
                serde_json::json!({
                    "id": node.id,
                    "name": node.name,
                    "rank": label.text,
                    "source": label.source,
                    "display_tier": state.resolver.normalize_rank(label.rank).to_string(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Name").fg(Color::Cyan),
            Cell::new("Tier"),
            Cell::new("Rank"),
            Cell::new("Source"),
            Cell::new("Display"),
        ]);

    for (node, label) in rows {
        let display = state.resolver.normalize_rank(label.rank);
        let source = match label.source {
            RankSource::Override => "override",
            RankSource::Tier => "tier",
        };
        table.add_row(vec![
            Cell::new(&node.name),
            Cell::new(node.difficulty_tier.to_string()),
            Cell::new(&label.text),
            Cell::new(source),
            Cell::new(display.to_string()).fg(tier_color(display)),
        ]);
    }

    println!();
    println!("{table}");
    println!();
    Ok(())
}
