use thiserror::Error;

use crate::skill::SkillId;

/// A data-integrity problem found while merging the skill feeds.
///
/// Merge warnings are never fatal: each one describes a repair the merger
/// already applied so the resulting graph stays usable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MergeWarning {
    #[error(
        "id '{id}' is used by '{kept_name}' and '{discarded_name}'; kept the primary node, merged only edges and attributes"
    )]
    DuplicateId {
        id: SkillId,
        kept_name: String,
        discarded_name: String,
    },

    #[error("skill '{id}': secondary {field} '{secondary}' ignored in favour of '{kept}'")]
    ScalarConflict {
        id: SkillId,
        field: &'static str,
        kept: String,
        secondary: String,
    },

    #[error("skill '{referenced_by}' requires unknown '{reference}'; synthesized placeholder '{placeholder}'")]
    DanglingPrerequisite {
        referenced_by: SkillId,
        reference: String,
        placeholder: SkillId,
    },

    #[error("skill '{id}' lists itself as a prerequisite; reference dropped")]
    SelfReference { id: SkillId },

    #[error("cycle detected: dropped prerequisite edge '{prerequisite}' -> '{dependent}'")]
    CycleEdgeDropped {
        prerequisite: SkillId,
        dependent: SkillId,
    },

    #[error("skill '{name}': unrecognized {field} '{value}', defaulted to '{fallback}'")]
    UnrecognizedValue {
        name: String,
        field: &'static str,
        value: String,
        fallback: String,
    },
}

/// A rejected progress transition. No state was changed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("skill '{0}' is not part of the skill graph")]
    UnknownSkill(SkillId),

    #[error("skill '{skill}' cannot be unlocked: prerequisites not completed: {missing:?}")]
    PrerequisitesIncomplete {
        skill: SkillId,
        missing: Vec<SkillId>,
    },

    #[error("skill '{0}' is not unlocked")]
    NotUnlocked(SkillId),

    #[error("skill '{0}' is already completed")]
    AlreadyCompleted(SkillId),

    #[error("progress {progress} for skill '{skill}' is outside 1..=99")]
    InvalidProgress { skill: SkillId, progress: u8 },

    #[error("intent for skill '{skill}' rejected by backend: {reason}")]
    Rejected { skill: SkillId, reason: String },

    #[error("intent for skill '{skill}' could not be delivered: {reason}")]
    Delivery { skill: SkillId, reason: String },
}

/// A geometry report the layout engine refused to record.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    #[error("geometry reported for unknown node '{0}'")]
    UnknownNode(SkillId),

    #[error("invalid bounding box for node '{0}'")]
    InvalidBounds(SkillId),
}

/// A skill feed document that could not be turned into source records.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeedError {
    #[error("{document}: missing frontmatter block")]
    MissingFrontmatter { document: String },

    #[error("{document}: required field '{field}' is missing or empty")]
    MissingField {
        document: String,
        field: &'static str,
    },

    #[error("{document}: {reason}")]
    Malformed { document: String, reason: String },
}

/// Errors from repository operations (used by port traits in skilltree-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("storage unavailable")]
    Connection,

    #[error("query error: {0}")]
    Query(String),
}
