//! `skilltree progress`: per-user unlock and completion state.

use anyhow::{Context, Result};
use clap::Subcommand;
use comfy_table::{presets, Cell, Color, ContentArrangement, Table};
use console::style;

use skilltree_core::progress::{HydrationReport, ProgressSync, ProgressTracker, StateRepair};
use skilltree_types::progress::{CompletionMetrics, UnlockState, UserId, UserSkillState};
use skilltree_types::skill::SkillId;

use crate::state::AppState;

#[derive(Subcommand)]
pub enum ProgressCommand {
    /// Show every skill's state for a user.
    Show {
        /// User id.
        user: String,
    },

    /// Unlock a skill whose prerequisites are all completed.
    Unlock {
        /// User id.
        user: String,
        /// Skill id or name.
        skill: String,
    },

    /// Complete an unlocked skill, recording the session metrics.
    Complete {
        /// User id.
        user: String,
        /// Skill id or name.
        skill: String,
        /// Repetitions performed in the session.
        #[arg(long, default_value = "0")]
        reps: u32,
        /// Seconds held in the session.
        #[arg(long, default_value = "0")]
        hold_secs: u32,
    },

    /// Record partial progress (1-99) on an unlocked skill.
    Advance {
        /// User id.
        user: String,
        /// Skill id or name.
        skill: String,
        /// Percent complete.
        percent: u8,
    },
}

pub async fn handle_progress_command(cmd: ProgressCommand, state: &AppState, json: bool) -> Result<()> {
    match cmd {
        ProgressCommand::Show { user } => show(state, &UserId::new(user), json).await,
        ProgressCommand::Unlock { user, skill } => {
            let user = UserId::new(user);
            let id = state.skill(&skill)?.id.clone();
            let (tracker, report) = state.load_tracker(&user).await?;
            report_repairs(state, &report, json);

            let sync = ProgressSync::new(tracker, state.store.clone());
            let record = sync.unlock(&user, &id).await?;
            let tracker = sync.tracker().await;
            persist(state, &tracker, &user).await?;
            print_transition(state, &tracker, &user, &record, "Unlocked", json)
        }
        ProgressCommand::Complete {
            user,
            skill,
            reps,
            hold_secs,
        } => {
            let user = UserId::new(user);
            let id = state.skill(&skill)?.id.clone();
            let (tracker, report) = state.load_tracker(&user).await?;
            report_repairs(state, &report, json);

            let metrics = CompletionMetrics {
                total_reps: reps,
                total_hold_secs: hold_secs,
                sessions: 1,
            };
            let sync = ProgressSync::new(tracker, state.store.clone());
            let record = sync.complete(&user, &id, metrics).await?;
            let tracker = sync.tracker().await;
            persist(state, &tracker, &user).await?;
            print_transition(state, &tracker, &user, &record, "Completed", json)
        }
        ProgressCommand::Advance { user, skill, percent } => {
            let user = UserId::new(user);
            let id = state.skill(&skill)?.id.clone();
            let (mut tracker, report) = state.load_tracker(&user).await?;
            report_repairs(state, &report, json);

            let record = tracker.record_progress(&user, &id, percent)?;
            persist(state, &tracker, &user).await?;
            print_transition(state, &tracker, &user, &record, "Progress recorded", json)
        }
    }
}

async fn persist(state: &AppState, tracker: &ProgressTracker, user: &UserId) -> Result<()> {
    state
        .store
        .store_statuses(user, &tracker.snapshot(user))
        .await
        .with_context(|| format!("Failed to save progress for '{user}'"))
}

fn report_repairs(state: &AppState, report: &HydrationReport, json: bool) {
    if json || report.is_clean() {
        return;
    }
    for id in &report.unknown {
        eprintln!("  {} ignoring stored record for unknown skill '{id}'", style("!").yellow());
    }
    for repair in &report.repairs {
        let line = match repair {
            StateRepair::UnlockedForCompletion { skill_id } => {
                format!("{} was completed but not unlocked; unlocked", state.skill_name(skill_id))
            }
            StateRepair::Demoted { skill_id, missing } => format!(
                "{} relocked; prerequisites not completed: {}",
                state.skill_name(skill_id),
                names(state, missing)
            ),
            StateRepair::ProgressClamped { skill_id, from, to } => {
                format!("{} progress {from}% corrected to {to}%", state.skill_name(skill_id))
            }
        };
        eprintln!("  {} {line}", style("!").yellow());
    }
}

fn names(state: &AppState, ids: &[SkillId]) -> String {
    ids.iter()
        .map(|id| state.skill_name(id))
        .collect::<Vec<_>>()
        .join(", ")
}

fn print_transition(
    state: &AppState,
    tracker: &ProgressTracker,
    user: &UserId,
    record: &UserSkillState,
    verb: &str,
    json: bool,
) -> Result<()> {
    let ready = tracker.unlockable_dependents(user, &record.skill_id);

    if json {
        let out = serde_json::json!({
            "record": record,
            "now_unlockable": ready,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!();
    println!(
        "  {} {} {}",
        style("✓").green().bold(),
        verb,
        style(state.skill_name(&record.skill_id)).bold()
    );
    if !record.is_completed && record.completion_progress > 0 {
        println!("    Progress: {}%", record.completion_progress);
    }
    if record.is_completed {
        println!(
            "    Totals:   {} reps, {}s held, {} sessions",
            record.metrics.total_reps, record.metrics.total_hold_secs, record.metrics.sessions
        );
    }
    if !ready.is_empty() {
        println!("    Now unlockable: {}", style(names(state, &ready)).cyan());
    }
    println!();
    Ok(())
}

fn state_cell(state: UnlockState) -> Cell {
    let color = match state {
        UnlockState::Locked => Color::DarkGrey,
        UnlockState::Unlockable => Color::Cyan,
        UnlockState::Unlocked => Color::Yellow,
        UnlockState::Completed => Color::Green,
    };
    Cell::new(state.to_string()).fg(color)
}

async fn show(state: &AppState, user: &UserId, json: bool) -> Result<()> {
    let (tracker, report) = state.load_tracker(user).await?;
    let summary = tracker.summary(user, &state.ranks, &state.resolver);

    if json {
        let skills: Vec<_> = state
            .graph
            .nodes()
            .iter()
            .filter_map(|node| {
                let record = tracker.record(user, &node.id).ok()?;
                let current = tracker.state(user, &node.id).ok()?;
                Some(serde_json::json!({
                    "id": node.id,
                    "name": node.name,
                    "state": current,
                    "completion_progress": record.completion_progress,
                    "metrics": record.metrics,
                }))
            })
            .collect();
        let out = serde_json::json!({
            "summary": summary,
            "skills": skills,
            "hydration": report,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    report_repairs(state, &report, json);

    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Skill").fg(Color::Cyan),
            Cell::new("Branch"),
            Cell::new("Rank"),
            Cell::new("State"),
            Cell::new("Progress"),
        ]);

    for node in state.graph.nodes() {
        let current = tracker.state(user, &node.id)?;
        let record = tracker.record(user, &node.id)?;
        let rank = state
            .ranks
            .get(&node.id)
            .map(|l| l.text.clone())
            .unwrap_or_else(|| "-".to_string());
        table.add_row(vec![
            Cell::new(&node.name),
            Cell::new(node.branch.to_string()),
            Cell::new(rank),
            state_cell(current),
            Cell::new(format!("{}%", record.completion_progress)),
        ]);
    }

    println!();
    println!(
        "  {} {}: {}/{} completed, {} unlocked",
        style("Progress").bold(),
        style(user).cyan(),
        summary.completed,
        summary.total,
        summary.unlocked
    );
    println!();
    println!("{table}");
    println!();
    for tier in &summary.tiers {
        println!(
            "  {:<10} {:>3}/{:<3} completed  {:>3} unlocked",
            tier.tier.to_string(),
            tier.completed,
            tier.total,
            tier.unlocked
        );
    }
    println!();
    Ok(())
}
