use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{CurriculumId, LanguageId, SubjectId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SubjectError {
    #[error("subject name cannot be empty")]
    EmptyName,

    #[error("unknown subject level: {0}")]
    UnknownLevel(String),
}

/// An exam programme, e.g. the IB or A-Levels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Curriculum {
    pub id: CurriculumId,
    pub name: String,
}

/// Language a subject is taught and examined in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Language {
    pub id: LanguageId,
    pub name: String,
    /// Short code such as `fr` or `en-US`.
    pub code: String,
}

/// Level a subject is taught at within its curriculum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SubjectLevel {
    Sl,
    Hl,
    Other,
}

impl SubjectLevel {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SubjectLevel::Sl => "SL",
            SubjectLevel::Hl => "HL",
            SubjectLevel::Other => "OTHER",
        }
    }

    /// Parse the storage/wire representation.
    ///
    /// # Errors
    ///
    /// Returns `SubjectError::UnknownLevel` for anything but `SL`, `HL` or `OTHER`.
    pub fn parse(raw: &str) -> Result<Self, SubjectError> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "SL" => Ok(SubjectLevel::Sl),
            "HL" => Ok(SubjectLevel::Hl),
            "OTHER" => Ok(SubjectLevel::Other),
            _ => Err(SubjectError::UnknownLevel(raw.to_string())),
        }
    }
}

/// A subject as offered by one curriculum, in one language, at one level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    id: SubjectId,
    name: String,
    curriculum_id: CurriculumId,
    language_id: LanguageId,
    level: SubjectLevel,
}

impl Subject {
    /// Create a subject.
    ///
    /// # Errors
    ///
    /// Returns `SubjectError::EmptyName` if the name is blank.
    pub fn new(
        id: SubjectId,
        name: impl Into<String>,
        curriculum_id: CurriculumId,
        language_id: LanguageId,
        level: SubjectLevel,
    ) -> Result<Self, SubjectError> {
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(SubjectError::EmptyName);
        }
        Ok(Self {
            id,
            name,
            curriculum_id,
            language_id,
            level,
        })
    }

    #[must_use]
    pub fn id(&self) -> SubjectId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn curriculum_id(&self) -> CurriculumId {
        self.curriculum_id
    }

    #[must_use]
    pub fn language_id(&self) -> LanguageId {
        self.language_id
    }

    #[must_use]
    pub fn level(&self) -> SubjectLevel {
        self.level
    }

    /// Subject name with a trailing ` HL` / ` SL` variant marker removed.
    ///
    /// `"Physics HL"` and `"Physics SL"` both yield `"Physics"`.
    #[must_use]
    pub fn base_name(&self) -> &str {
        base_subject_name(&self.name)
    }
}

/// Strip a whitespace-separated `HL`/`SL` suffix from a subject name.
#[must_use]
pub fn base_subject_name(name: &str) -> &str {
    let trimmed = name.trim();
    for suffix in ["HL", "SL"] {
        if let Some(head) = trimmed.strip_suffix(suffix) {
            if head.ends_with(char::is_whitespace) {
                return head.trim_end();
            }
        }
    }
    trimmed
}
