use serde::{Deserialize, Serialize};

use crate::model::ids::{LabelId, SubjectId};

/// A node in a subject's topic hierarchy.
///
/// Labels range from a whole unit ("Algebra") down to a single concept.
/// `parent_id` is `None` for top-level topics. Catalogue rows are taken as
/// they are: a blank description or a label naming itself as parent is kept,
/// and [`LabelForest`](crate::hierarchy::LabelForest) decides how to place it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    id: LabelId,
    description: String,
    numbering: Option<String>,
    subject_id: SubjectId,
    parent_id: Option<LabelId>,
}

impl Label {
    /// Create a label, trimming the description and normalising a blank
    /// numbering to `None`.
    #[must_use]
    pub fn new(
        id: LabelId,
        description: impl Into<String>,
        numbering: Option<String>,
        subject_id: SubjectId,
        parent_id: Option<LabelId>,
    ) -> Self {
        let description = description.into().trim().to_string();
        let numbering = numbering
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());

        Self {
            id,
            description,
            numbering,
            subject_id,
            parent_id,
        }
    }

    #[must_use]
    pub fn id(&self) -> LabelId {
        self.id
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub fn numbering(&self) -> Option<&str> {
        self.numbering.as_deref()
    }

    #[must_use]
    pub fn subject_id(&self) -> SubjectId {
        self.subject_id
    }

    #[must_use]
    pub fn parent_id(&self) -> Option<LabelId> {
        self.parent_id
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_numbering_becomes_none() {
        let label = Label::new(
            LabelId::new(1),
            "Kinematics",
            Some("  ".into()),
            SubjectId::new(1),
            None,
        );
        assert_eq!(label.numbering(), None);
        assert!(label.is_root());
    }

    #[test]
    fn blank_description_is_kept_empty() {
        let label = Label::new(LabelId::new(7), "   ", None, SubjectId::new(1), None);
        assert_eq!(label.description(), "");
        assert_eq!(label.numbering(), None);
    }

    #[test]
    fn self_parent_is_stored_as_given() {
        let label = Label::new(
            LabelId::new(3),
            "Loop",
            None,
            SubjectId::new(1),
            Some(LabelId::new(3)),
        );
        assert_eq!(label.parent_id(), Some(LabelId::new(3)));
        assert!(!label.is_root());
    }
}
