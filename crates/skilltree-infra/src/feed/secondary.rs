//! Secondary feed: markdown documents with YAML frontmatter.
//!
//! ```text
//! ---
//! name: Handstand push-up
//! branch: push
//! tier: advanced
//! rank: B+
//! ---
//! Free text.
//!
//! ## Prerequisites
//! - Pike push-up
//! - [[Wall handstand]]
//!
//! ## Attributes
//! min_hold_secs: 30
//! equipment: wall
//! ```

use std::path::Path;

use anyhow::Context;
use serde_json::Value;
use skilltree_types::error::FeedError;
use skilltree_types::skill::SecondarySkill;

/// Parsed secondary documents plus the ones that were skipped.
#[derive(Debug, Clone, Default)]
pub struct SecondaryFeed {
    pub skills: Vec<SecondarySkill>,
    pub skipped: Vec<(String, String)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Other,
    Prerequisites,
    Attributes,
}

/// Split a document into its YAML frontmatter and markdown body.
fn extract_frontmatter<'a>(document: &str, content: &'a str) -> Result<(&'a str, &'a str), FeedError> {
    let missing = || FeedError::MissingFrontmatter {
        document: document.to_string(),
    };

    let content = content.trim_start_matches('\u{feff}');
    let after_open = content.strip_prefix("---").ok_or_else(missing)?;
    let after_open = after_open
        .strip_prefix("\r\n")
        .or_else(|| after_open.strip_prefix('\n'))
        .unwrap_or(after_open);

    let closing_pos = after_open.find("\n---").ok_or_else(missing)?;
    let yaml_str = &after_open[..closing_pos];
    let remainder = &after_open[closing_pos + 4..];
    let body_str = remainder.trim_start_matches(['\r', '\n']);

    Ok((yaml_str, body_str))
}

fn classify_heading(title: &str) -> Section {
    match title.trim().to_lowercase().as_str() {
        "prerequisites" | "prerequisitos" | "requires" => Section::Prerequisites,
        "attributes" | "atributos" => Section::Attributes,
        _ => Section::Other,
    }
}

/// Strip a bullet marker and wiki/markdown link syntax from a list item.
fn bullet_text(line: &str) -> Option<&str> {
    let item = line
        .strip_prefix("- ")
        .or_else(|| line.strip_prefix("* "))?
        .trim();

    let item = item
        .strip_prefix("[[")
        .and_then(|s| s.strip_suffix("]]"))
        .unwrap_or(item);
    // [Name](target) keeps the visible name.
    let item = match (item.strip_prefix('['), item.find("](")) {
        (Some(_), Some(end)) if item.ends_with(')') => &item[1..end],
        _ => item,
    };

    let item = item.trim();
    (!item.is_empty()).then_some(item)
}

/// Numbers parse as numbers, `true`/`false` as booleans, anything else is
/// kept as a string.
fn attribute_value(raw: &str) -> Value {
    let raw = raw.trim();
    if let Ok(n) = raw.parse::<i64>() {
        return Value::from(n);
    }
    if let Ok(f) = raw.parse::<f64>() {
        if f.is_finite() {
            return Value::from(f);
        }
    }
    match raw {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::String(raw.trim_matches('"').to_string()),
    }
}

/// Parse one secondary document. `document` names it in errors.
pub fn parse_secondary_document(document: &str, content: &str) -> Result<SecondarySkill, FeedError> {
    let (yaml_str, body) = extract_frontmatter(document, content)?;

    let mut skill: SecondarySkill =
        serde_yaml_ng::from_str(yaml_str).map_err(|e| FeedError::Malformed {
            document: document.to_string(),
            reason: format!("invalid frontmatter: {e}"),
        })?;
    if skill.name.trim().is_empty() {
        return Err(FeedError::MissingField {
            document: document.to_string(),
            field: "name",
        });
    }

    let mut section = Section::Other;
    for line in body.lines() {
        let line = line.trim();
        if let Some(title) = line.strip_prefix("## ") {
            section = classify_heading(title);
            continue;
        }
        if line.starts_with('#') {
            section = Section::Other;
            continue;
        }

        match section {
            Section::Prerequisites => {
                if let Some(reference) = bullet_text(line) {
                    if !skill.prerequisites.iter().any(|p| p == reference) {
                        skill.prerequisites.push(reference.to_string());
                    }
                }
            }
            Section::Attributes => {
                let entry = bullet_text(line).unwrap_or(line);
                if let Some((key, value)) = entry.split_once(':') {
                    let key = key.trim();
                    if !key.is_empty() {
                        skill
                            .supplemental_attributes
                            .insert(key.to_string(), attribute_value(value));
                    }
                }
            }
            Section::Other => {}
        }
    }

    Ok(skill)
}

/// Parse every `*.md` document in `dir`, in file name order.
///
/// Documents that fail to parse are skipped with a warning. A missing
/// directory yields an empty feed.
pub async fn load_secondary_feed(dir: &Path) -> anyhow::Result<SecondaryFeed> {
    let mut feed = SecondaryFeed::default();
    if !tokio::fs::try_exists(dir).await.unwrap_or(false) {
        tracing::debug!(dir = %dir.display(), "No secondary feed directory");
        return Ok(feed);
    }

    let mut paths = Vec::new();
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .with_context(|| format!("Failed to read secondary feed directory: {}", dir.display()))?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
        if is_file && path.extension().is_some_and(|ext| ext == "md") {
            paths.push(path);
        }
    }
    paths.sort();

    for path in paths {
        let document = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();
        let content = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;

        match parse_secondary_document(&document, &content) {
            Ok(skill) => feed.skills.push(skill),
            Err(e) => {
                tracing::warn!(document = %document, error = %e, "Skipping unparseable secondary document");
                feed.skipped.push((document, e.to_string()));
            }
        }
    }

    tracing::debug!(
        dir = %dir.display(),
        records = feed.skills.len(),
        skipped = feed.skipped.len(),
        "Secondary feed loaded"
    );
    Ok(feed)
}
