//! Small demo catalogue used by the `seed` command and integration tests.

use syllabus_core::model::{
    ContentId, ContentItem, ContentKind, ContentStatus, Curriculum, CurriculumId, Label, LabelId,
    Language, LanguageId, Subject, SubjectId, SubjectLevel,
};
use thiserror::Error;

use crate::repository::{Storage, StorageError};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SeedError {
    #[error(transparent)]
    Domain(#[from] syllabus_core::Error),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// What `seed_demo` wrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SeedSummary {
    pub subjects: usize,
    pub labels: usize,
    pub contents: usize,
}

pub const DEMO_CURRICULUM: CurriculumId = CurriculumId::new(1);
pub const DEMO_LANGUAGE: LanguageId = LanguageId::new(1);

// (id, name, level)
const SUBJECTS: &[(u64, &str, SubjectLevel)] = &[
    (1, "Physics HL", SubjectLevel::Hl),
    (2, "Physics SL", SubjectLevel::Sl),
    (3, "Mathematics HL", SubjectLevel::Hl),
];

// (id, subject, parent, numbering, description)
const LABELS: &[(u64, u64, Option<u64>, &str, &str)] = &[
    (1, 1, None, "1", "Measurements and uncertainties"),
    (2, 1, Some(1), "1.1", "Measurements in physics"),
    (3, 1, Some(1), "1.2", "Uncertainties and errors"),
    (4, 1, None, "2", "Mechanics"),
    (5, 1, Some(4), "2.1", "Motion"),
    (11, 2, None, "1", "Measurements and uncertainties"),
    (12, 2, Some(11), "1.1", "Measurements in physics"),
    (13, 2, None, "2", "Mechanics"),
    (14, 2, Some(13), "2.1", "Motion"),
    (21, 3, None, "1", "Number and algebra"),
    (22, 3, Some(21), "1.1", "Sequences and series"),
];

// (id, kind, subject, topic, status, title)
const CONTENTS: &[(u64, ContentKind, u64, u64, ContentStatus, &str)] = &[
    (1, ContentKind::Recipe, 1, 2, ContentStatus::Completed, "SI units drill"),
    (2, ContentKind::Recipe, 1, 2, ContentStatus::InProgress, "Scientific notation"),
    (3, ContentKind::Recipe, 2, 12, ContentStatus::Completed, "Measuring length"),
    (4, ContentKind::Recipe, 1, 5, ContentStatus::PendingReview, "Projectile motion"),
    (5, ContentKind::Recipe, 3, 22, ContentStatus::Completed, "Arithmetic sequences"),
    (6, ContentKind::Slide, 2, 14, ContentStatus::Completed, "Kinematics overview"),
];

fn demo_subjects() -> Result<Vec<Subject>, syllabus_core::Error> {
    let mut subjects = Vec::with_capacity(SUBJECTS.len());
    for (id, name, level) in SUBJECTS {
        subjects.push(Subject::new(
            SubjectId::new(*id),
            *name,
            DEMO_CURRICULUM,
            DEMO_LANGUAGE,
            *level,
        )?);
    }
    Ok(subjects)
}

fn demo_labels() -> Vec<Label> {
    LABELS
        .iter()
        .map(|(id, subject, parent, numbering, description)| {
            Label::new(
                LabelId::new(*id),
                *description,
                Some((*numbering).to_string()),
                SubjectId::new(*subject),
                parent.map(LabelId::new),
            )
        })
        .collect()
}

fn demo_contents() -> Result<Vec<ContentItem>, syllabus_core::Error> {
    let mut contents = Vec::with_capacity(CONTENTS.len());
    for (id, kind, subject, topic, status, title) in CONTENTS {
        let item = ContentItem::new(ContentId::new(*id), *kind, *title, SubjectId::new(*subject))?
            .with_topic(LabelId::new(*topic))
            .with_status(*status)
            .with_curriculum(DEMO_CURRICULUM)
            .with_language(DEMO_LANGUAGE);
        contents.push(item);
    }
    Ok(contents)
}

/// Write the demo catalogue. Safe to run repeatedly: every row is upserted.
///
/// # Errors
///
/// Returns `SeedError::Storage` if any write fails.
pub async fn seed_demo(storage: &Storage) -> Result<SeedSummary, SeedError> {
    let subjects = demo_subjects()?;
    let labels = demo_labels();
    let contents = demo_contents()?;

    storage
        .subjects
        .upsert_curriculum(&Curriculum {
            id: DEMO_CURRICULUM,
            name: "IB Diploma".into(),
        })
        .await?;
    storage
        .subjects
        .upsert_language(&Language {
            id: DEMO_LANGUAGE,
            name: "English".into(),
            code: "en".into(),
        })
        .await?;

    for subject in &subjects {
        storage.subjects.upsert_subject(subject).await?;
    }
    for label in &labels {
        storage.labels.upsert_label(label).await?;
    }
    for item in &contents {
        storage.contents.upsert_content(item).await?;
    }

    let summary = SeedSummary {
        subjects: subjects.len(),
        labels: labels.len(),
        contents: contents.len(),
    };
    tracing::info!(
        subjects = summary.subjects,
        labels = summary.labels,
        contents = summary.contents,
        "seeded demo catalogue"
    );
    Ok(summary)
}
