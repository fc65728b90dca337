//! Skill graph domain types.
//!
//! Defines the canonical `SkillNode` shape, the fixed branch and difficulty
//! enumerations, and the two source-record variants that feed the merger.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Free-form additive metadata attached to a skill (e.g. physiological
/// demand breakdown). Keys are kept sorted so serialization is stable.
pub type Attributes = BTreeMap<String, serde_json::Value>;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Stable identifier of a skill node. Unique after merge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SkillId(pub String);

impl SkillId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SkillId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SkillId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for SkillId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Borrow<str> for SkillId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Normalize a display name into the merge identity key.
///
/// Trims, collapses inner whitespace runs to a single space, and lowercases
/// (Unicode-aware, so "DOMINADAS  Avanzadas" and "dominadas avanzadas" match).
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Derive a URL-safe slug from a display name ("Handstand Push-up" -> "handstand-push-up").
///
/// Non-ASCII letters are kept as-is; runs of anything that is not
/// alphanumeric become a single hyphen.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_hyphen = false;
    for c in name.trim().chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c);
        } else {
            pending_hyphen = true;
        }
    }
    slug
}

// ---------------------------------------------------------------------------
// Core enums
// ---------------------------------------------------------------------------

/// Category tag grouping skills into a layout lane.
///
/// Declaration order is the default lane order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Branch {
    Push,
    Pull,
    Core,
    Legs,
    Balance,
    Mobility,
}

impl Branch {
    pub const ALL: [Branch; 6] = [
        Branch::Push,
        Branch::Pull,
        Branch::Core,
        Branch::Legs,
        Branch::Balance,
        Branch::Mobility,
    ];
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Branch::Push => write!(f, "push"),
            Branch::Pull => write!(f, "pull"),
            Branch::Core => write!(f, "core"),
            Branch::Legs => write!(f, "legs"),
            Branch::Balance => write!(f, "balance"),
            Branch::Mobility => write!(f, "mobility"),
        }
    }
}

impl FromStr for Branch {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_name(s).as_str() {
            "push" | "empuje" => Ok(Branch::Push),
            "pull" | "tiron" | "tirón" => Ok(Branch::Pull),
            "core" | "abs" => Ok(Branch::Core),
            "legs" | "piernas" => Ok(Branch::Legs),
            "balance" | "equilibrio" => Ok(Branch::Balance),
            "mobility" | "movilidad" | "flexibility" => Ok(Branch::Mobility),
            other => Err(format!("invalid branch: '{other}'")),
        }
    }
}

/// Authored difficulty of a skill. Variants are declared in ascending order,
/// so the derived `Ord` is the difficulty order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DifficultyTier {
    #[serde(alias = "beginner")]
    Beginner,
    #[serde(alias = "intermediate")]
    Intermediate,
    #[serde(alias = "advanced")]
    Advanced,
    #[serde(alias = "expert")]
    Expert,
}

impl fmt::Display for DifficultyTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DifficultyTier::Beginner => write!(f, "BEGINNER"),
            DifficultyTier::Intermediate => write!(f, "INTERMEDIATE"),
            DifficultyTier::Advanced => write!(f, "ADVANCED"),
            DifficultyTier::Expert => write!(f, "EXPERT"),
        }
    }
}

impl FromStr for DifficultyTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_name(s).as_str() {
            "beginner" | "principiante" => Ok(DifficultyTier::Beginner),
            "intermediate" | "intermedio" => Ok(DifficultyTier::Intermediate),
            "advanced" | "avanzado" => Ok(DifficultyTier::Advanced),
            "expert" | "experto" => Ok(DifficultyTier::Expert),
            other => Err(format!("invalid difficulty tier: '{other}'")),
        }
    }
}

/// Where a merged node came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NodeOrigin {
    #[default]
    Primary,
    Secondary,
    /// Synthesized for a dangling prerequisite reference (externally sourced).
    Placeholder,
}

impl NodeOrigin {
    pub fn is_primary(&self) -> bool {
        *self == NodeOrigin::Primary
    }
}

// ---------------------------------------------------------------------------
// Canonical node
// ---------------------------------------------------------------------------

/// A trainable unit in the merged progression graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillNode {
    pub id: SkillId,
    pub name: String,
    pub branch: Branch,
    pub difficulty_tier: DifficultyTier,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank_override: Option<String>,
    /// Canonical prerequisite ids, deduplicated, in first-seen order.
    #[serde(default)]
    pub prerequisites: Vec<SkillId>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub supplemental_attributes: Attributes,
    /// Explicit in-lane position set by the author, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authoring_order: Option<u32>,
    #[serde(default)]
    pub origin: NodeOrigin,
    /// Ids from other records that resolve to this node.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<SkillId>,
}

impl SkillNode {
    pub fn normalized_name(&self) -> String {
        normalize_name(&self.name)
    }

    pub fn is_placeholder(&self) -> bool {
        self.origin == NodeOrigin::Placeholder
    }

    pub fn has_prerequisite(&self, id: &SkillId) -> bool {
        self.prerequisites.contains(id)
    }
}

// ---------------------------------------------------------------------------
// Source records
// ---------------------------------------------------------------------------

/// A record from the primary (structured) feed. Branch and tier are typed.
///
/// Prerequisites are free references: either a skill id or a display name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrimarySkill {
    pub id: SkillId,
    pub name: String,
    pub branch: Branch,
    pub difficulty_tier: DifficultyTier,
    #[serde(default)]
    pub prerequisites: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub supplemental_attributes: Attributes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank_override: Option<String>,
    #[serde(default, alias = "order", skip_serializing_if = "Option::is_none")]
    pub authoring_order: Option<u32>,
    /// Provenance carried over when a merged graph is fed back in; fresh
    /// primary records leave it at the default.
    #[serde(default, skip_serializing_if = "NodeOrigin::is_primary")]
    pub origin: NodeOrigin,
    /// Other ids that refer to this skill.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<SkillId>,
}

/// A record from the secondary (derived, free-text authored) feed.
///
/// Scalar fields are untyped strings parsed leniently at the merge boundary;
/// the id is optional and derived from the name when absent.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SecondarySkill {
    #[serde(default)]
    pub id: Option<SkillId>,
    pub name: String,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default, alias = "tier")]
    pub difficulty_tier: Option<String>,
    #[serde(default)]
    pub prerequisites: Vec<String>,
    #[serde(default)]
    pub supplemental_attributes: Attributes,
    #[serde(default, alias = "rank")]
    pub rank_override: Option<String>,
}

impl SecondarySkill {
    /// The id this record claims, falling back to the slug of its name.
    pub fn effective_id(&self) -> SkillId {
        self.id
            .clone()
            .unwrap_or_else(|| SkillId(slugify(&self.name)))
    }
}

/// A skill record tagged with the feed it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum SourceSkill {
    Primary(PrimarySkill),
    Secondary(SecondarySkill),
}

impl SourceSkill {
    pub fn name(&self) -> &str {
        match self {
            SourceSkill::Primary(p) => &p.name,
            SourceSkill::Secondary(s) => &s.name,
        }
    }

    pub fn prerequisites(&self) -> &[String] {
        match self {
            SourceSkill::Primary(p) => &p.prerequisites,
            SourceSkill::Secondary(s) => &s.prerequisites,
        }
    }
}

impl From<SkillNode> for PrimarySkill {
    /// Re-express a merged node as a primary record, so a merged graph can
    /// be fed back into the merger.
    fn from(node: SkillNode) -> Self {
        Self {
            id: node.id,
            name: node.name,
            branch: node.branch,
            difficulty_tier: node.difficulty_tier,
            prerequisites: node.prerequisites.into_iter().map(|p| p.0).collect(),
            supplemental_attributes: node.supplemental_attributes,
            rank_override: node.rank_override,
            authoring_order: node.authoring_order,
            origin: node.origin,
            aliases: node.aliases,
        }
    }
}
