//! `skilltree layout`: lanes, slot ordering and routed connectors.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use comfy_table::{presets, Cell, Color, ContentArrangement, Table};
use console::style;

use skilltree_core::event::EventBus;
use skilltree_core::progress::ProgressView;
use skilltree_core::view::{SkillTreeView, TreeFrame};
use skilltree_types::layout::BoundingBox;
use skilltree_types::progress::UserId;
use skilltree_types::skill::SkillId;

use crate::state::AppState;

/// Read a `{ "<skill id>": { "x", "y", "width", "height" } }` file.
async fn read_geometry(path: &Path) -> Result<BTreeMap<String, BoundingBox>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read geometry file {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Invalid geometry JSON in {}", path.display()))
}

pub async fn handle_layout(
    state: &AppState,
    geometry: Option<&Path>,
    user: Option<&str>,
    json: bool,
) -> Result<()> {
    let mut view = SkillTreeView::new(state.graph.clone(), &state.config, EventBus::default());

    let activity = match user {
        Some(user) => {
            let (tracker, _) = state.load_tracker(&UserId::new(user)).await?;
            tracker.view(&UserId::new(user))
        }
        None => ProgressView::default(),
    };

    if let Some(path) = geometry {
        let now = Instant::now();
        for (id, bounds) in read_geometry(path).await? {
            if let Err(e) = view.report_geometry(&SkillId::new(id.as_str()), bounds, now) {
                tracing::warn!(skill = %id, error = %e, "Ignoring reported geometry");
            }
        }
    }

    let frame = view.render(&activity);

    if json {
        println!("{}", serde_json::to_string_pretty(&frame)?);
        return Ok(());
    }

    print_frame(state, &frame);
    Ok(())
}

fn print_frame(state: &AppState, frame: &TreeFrame) {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Lane").fg(Color::Cyan),
            Cell::new("Slot"),
            Cell::new("Skill"),
            Cell::new("Rank"),
            Cell::new("Depth"),
            Cell::new("State"),
        ]);

    for node in &frame.layouts {
        let rank = frame
            .ranks
            .get(&node.node_id)
            .map(|l| l.text.as_str())
            .unwrap_or("-");
        let current = frame
            .states
            .get(&node.node_id)
            .map(|s| s.to_string())
            .unwrap_or_default();
        table.add_row(vec![
            Cell::new(format!("{} ({})", node.lane, node.lane_index)),
            Cell::new(node.order_within_lane),
            Cell::new(state.skill_name(&node.node_id)),
            Cell::new(rank),
            Cell::new(node.depth),
            Cell::new(current),
        ]);
    }

    println!();
    println!(
        "  {} {} lanes, {} skills",
        style("Layout").bold(),
        frame.lanes.len(),
        frame.layouts.len()
    );
    println!();
    println!("{table}");
    println!();
    println!(
        "  {} connectors routed, {} waiting for geometry",
        style(frame.edges.len()).green(),
        style(frame.deferred.len()).yellow()
    );
    let active = frame.edges.iter().filter(|e| e.is_active).count();
    if active > 0 {
        println!("  {active} active");
    }
    println!();
}
