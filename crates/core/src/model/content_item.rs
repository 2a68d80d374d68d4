use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::{ContentId, CurriculumId, LabelId, LanguageId, SubjectId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ContentError {
    #[error("content title cannot be empty")]
    EmptyTitle,

    #[error("unknown content kind: {0}")]
    UnknownKind(String),

    #[error("unknown content status: {0}")]
    UnknownStatus(String),

    #[error("invalid filter value: {0}")]
    InvalidFilter(String),
}

//
// ─── KIND & STATUS ─────────────────────────────────────────────────────────────
//

/// Which collection of authored material a query runs over.
///
/// Both collections carry the same tagging fields; they differ only in
/// namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Recipe,
    Slide,
}

impl ContentKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ContentKind::Recipe => "recipe",
            ContentKind::Slide => "slide",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentKind {
    type Err = ContentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "recipe" => Ok(ContentKind::Recipe),
            "slide" => Ok(ContentKind::Slide),
            other => Err(ContentError::UnknownKind(other.to_string())),
        }
    }
}

/// Authoring workflow state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentStatus {
    #[default]
    InProgress,
    PendingReview,
    Completed,
}

impl ContentStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ContentStatus::InProgress => "in_progress",
            ContentStatus::PendingReview => "pending_review",
            ContentStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for ContentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentStatus {
    type Err = ContentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "in_progress" => Ok(ContentStatus::InProgress),
            "pending_review" => Ok(ContentStatus::PendingReview),
            "completed" => Ok(ContentStatus::Completed),
            other => Err(ContentError::UnknownStatus(other.to_string())),
        }
    }
}

//
// ─── CONTENT ITEM ──────────────────────────────────────────────────────────────
//

/// A recipe/worksheet or slideshow, optionally tagged with a topic label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: ContentId,
    pub kind: ContentKind,
    pub title: String,
    pub subject_id: SubjectId,
    pub topic_id: Option<LabelId>,
    pub curriculum_id: Option<CurriculumId>,
    pub language_id: Option<LanguageId>,
    pub status: ContentStatus,
}

impl ContentItem {
    /// Create an in-progress item with no topic or curriculum tagging.
    ///
    /// # Errors
    ///
    /// Returns `ContentError::EmptyTitle` if the title is blank.
    pub fn new(
        id: ContentId,
        kind: ContentKind,
        title: impl Into<String>,
        subject_id: SubjectId,
    ) -> Result<Self, ContentError> {
        let title = title.into().trim().to_string();
        if title.is_empty() {
            return Err(ContentError::EmptyTitle);
        }
        Ok(Self {
            id,
            kind,
            title,
            subject_id,
            topic_id: None,
            curriculum_id: None,
            language_id: None,
            status: ContentStatus::default(),
        })
    }

    #[must_use]
    pub fn with_topic(mut self, topic_id: LabelId) -> Self {
        self.topic_id = Some(topic_id);
        self
    }

    #[must_use]
    pub fn with_status(mut self, status: ContentStatus) -> Self {
        self.status = status;
        self
    }

    #[must_use]
    pub fn with_curriculum(mut self, curriculum_id: CurriculumId) -> Self {
        self.curriculum_id = Some(curriculum_id);
        self
    }

    #[must_use]
    pub fn with_language(mut self, language_id: LanguageId) -> Self {
        self.language_id = Some(language_id);
        self
    }
}

//
// ─── FILTERS ───────────────────────────────────────────────────────────────────
//

/// Token meaning "no restriction" in filter parameters.
pub const WILDCARD: &str = "ALL";

/// One filter dimension: either unrestricted or pinned to a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Scope<T> {
    #[default]
    Any,
    Only(T),
}

impl<T: PartialEq> Scope<T> {
    /// `Any` accepts everything; `Only` requires an equal, present value.
    pub fn accepts(&self, value: Option<&T>) -> bool {
        match self {
            Scope::Any => true,
            Scope::Only(expected) => value == Some(expected),
        }
    }

    #[must_use]
    pub fn value(&self) -> Option<&T> {
        match self {
            Scope::Any => None,
            Scope::Only(v) => Some(v),
        }
    }
}

impl<T: FromStr> Scope<T> {
    /// Parse a filter parameter; empty input and `ALL` both mean `Any`.
    ///
    /// # Errors
    ///
    /// Returns `ContentError::InvalidFilter` when the value does not parse.
    pub fn parse(raw: &str) -> Result<Self, ContentError> {
        let raw = raw.trim();
        if raw.is_empty() || raw.eq_ignore_ascii_case(WILDCARD) {
            return Ok(Scope::Any);
        }
        raw.parse::<T>()
            .map(Scope::Only)
            .map_err(|_| ContentError::InvalidFilter(raw.to_string()))
    }
}

/// Curriculum / language / status refinement applied to content counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ContentFilter {
    pub curriculum: Scope<CurriculumId>,
    pub language: Scope<LanguageId>,
    pub status: Scope<ContentStatus>,
}

impl ContentFilter {
    /// Filter with every dimension unrestricted.
    #[must_use]
    pub fn any() -> Self {
        Self::default()
    }

    /// Same filter with the status dimension lifted.
    ///
    /// Completion reflects whether content exists at all, not its workflow state.
    #[must_use]
    pub fn ignoring_status(self) -> Self {
        Self {
            status: Scope::Any,
            ..self
        }
    }

    #[must_use]
    pub fn matches(&self, item: &ContentItem) -> bool {
        self.curriculum.accepts(item.curriculum_id.as_ref())
            && self.language.accepts(item.language_id.as_ref())
            && self.status.accepts(Some(&item.status))
    }
}
