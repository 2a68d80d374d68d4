use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use syllabus_core::model::{
    ContentFilter, ContentId, ContentItem, ContentKind, Curriculum, CurriculumId, Label, LabelId,
    Language, LanguageId, PlanConfig, ScheduledSession, StudentId, StudyPlan, StudyPlanId,
    Subject, SubjectId,
};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Persisted shape of a study plan before it has an id.
#[derive(Debug, Clone)]
pub struct StudyPlanRecord {
    pub student_id: StudentId,
    pub name: String,
    pub config: PlanConfig,
    pub updated_at: DateTime<Utc>,
}

/// Topic labels, scoped by subject name.
#[async_trait]
pub trait LabelRepository: Send + Sync {
    /// Fetch every label whose owning subject's name starts with `subject_name_prefix`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the labels cannot be read.
    async fn fetch_labels(&self, subject_name_prefix: &str) -> Result<Vec<Label>, StorageError>;

    /// Persist or update a label.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the label cannot be stored.
    async fn upsert_label(&self, label: &Label) -> Result<(), StorageError>;
}

/// Authored recipes and slideshows.
#[async_trait]
pub trait ContentRepository: Send + Sync {
    /// Count items of `kind` per topic label, restricted to subjects whose name
    /// starts with `subject_name_prefix` and to items accepted by `filter`.
    /// Untagged items are not counted.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the counts cannot be computed.
    async fn content_counts(
        &self,
        kind: ContentKind,
        subject_name_prefix: &str,
        filter: &ContentFilter,
    ) -> Result<HashMap<LabelId, u64>, StorageError>;

    /// Topic labels carrying at least one item of `kind` accepted by `filter`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the topics cannot be read.
    async fn authored_topics(
        &self,
        kind: ContentKind,
        subject_name_prefix: &str,
        filter: &ContentFilter,
    ) -> Result<HashSet<LabelId>, StorageError>;

    /// Count items of `kind` accepted by `filter`, per subject.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the counts cannot be computed.
    async fn counts_by_subject(
        &self,
        kind: ContentKind,
        filter: &ContentFilter,
    ) -> Result<HashMap<SubjectId, u64>, StorageError>;

    /// Persist or update an item.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the item cannot be stored.
    async fn upsert_content(&self, item: &ContentItem) -> Result<(), StorageError>;
}

/// Subjects and the curricula/languages they belong to.
#[async_trait]
pub trait SubjectRepository: Send + Sync {
    /// List every subject ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the subjects cannot be read.
    async fn list_subjects(&self) -> Result<Vec<Subject>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the subject cannot be stored.
    async fn upsert_subject(&self, subject: &Subject) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the curriculum cannot be stored.
    async fn upsert_curriculum(&self, curriculum: &Curriculum) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the language cannot be stored.
    async fn upsert_language(&self, language: &Language) -> Result<(), StorageError>;
}

/// One study plan per student plus its generated sessions.
#[async_trait]
pub trait StudyPlanRepository: Send + Sync {
    /// Create the student's plan, or overwrite name/config of the existing one.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the plan cannot be stored.
    async fn save_plan(&self, plan: StudyPlanRecord) -> Result<StudyPlanId, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the plan cannot be read.
    async fn get_plan_for_student(
        &self,
        student_id: StudentId,
    ) -> Result<Option<StudyPlan>, StorageError>;

    /// Replace every stored session of a plan.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the plan does not exist, or other
    /// storage errors.
    async fn replace_sessions(
        &self,
        plan_id: StudyPlanId,
        sessions: &[ScheduledSession],
    ) -> Result<(), StorageError>;

    /// Upsert the student's plan and replace its sessions as one unit.
    ///
    /// Either both the plan row and its sessions are written or neither is.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if any write fails.
    async fn save_plan_with_sessions(
        &self,
        plan: StudyPlanRecord,
        sessions: &[ScheduledSession],
    ) -> Result<StudyPlanId, StorageError>;

    /// Sessions of a plan ordered by start time.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the sessions cannot be read.
    async fn list_sessions(
        &self,
        plan_id: StudyPlanId,
    ) -> Result<Vec<ScheduledSession>, StorageError>;
}

//
// ─── IN-MEMORY ─────────────────────────────────────────────────────────────────
//

#[derive(Default)]
struct MemoryState {
    curricula: HashMap<CurriculumId, Curriculum>,
    languages: HashMap<LanguageId, Language>,
    subjects: HashMap<SubjectId, Subject>,
    labels: HashMap<LabelId, Label>,
    contents: HashMap<ContentId, ContentItem>,
    plans: HashMap<StudyPlanId, StudyPlan>,
    sessions: HashMap<StudyPlanId, Vec<ScheduledSession>>,
}

impl MemoryState {
    fn subjects_with_prefix(&self, prefix: &str) -> HashSet<SubjectId> {
        self.subjects
            .values()
            .filter(|s| s.name().starts_with(prefix))
            .map(Subject::id)
            .collect()
    }

    fn matching_contents<'a>(
        &'a self,
        kind: ContentKind,
        subject_ids: Option<&'a HashSet<SubjectId>>,
        filter: &'a ContentFilter,
    ) -> impl Iterator<Item = &'a ContentItem> + 'a {
        self.contents.values().filter(move |item| {
            item.kind == kind
                && subject_ids.is_none_or(|ids| ids.contains(&item.subject_id))
                && filter.matches(item)
        })
    }

    /// One plan per student: reuse the student's id or allocate the next one.
    fn upsert_plan(&mut self, plan: StudyPlanRecord) -> StudyPlanId {
        let existing = self
            .plans
            .values()
            .find(|p| p.student_id == plan.student_id)
            .map(|p| p.id);
        let id = existing.unwrap_or_else(|| {
            let next = self.plans.keys().map(StudyPlanId::value).max().unwrap_or(0) + 1;
            StudyPlanId::new(next)
        });
        self.plans.insert(
            id,
            StudyPlan {
                id,
                student_id: plan.student_id,
                name: plan.name,
                config: plan.config,
                updated_at: plan.updated_at,
            },
        );
        id
    }
}

fn sorted_sessions(sessions: &[ScheduledSession]) -> Vec<ScheduledSession> {
    let mut sorted = sessions.to_vec();
    sorted.sort_by_key(|s| s.start_time);
    sorted
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, StorageError> {
        self.state
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }
}

#[async_trait]
impl LabelRepository for InMemoryRepository {
    async fn fetch_labels(&self, subject_name_prefix: &str) -> Result<Vec<Label>, StorageError> {
        let guard = self.lock()?;
        let subject_ids = guard.subjects_with_prefix(subject_name_prefix);
        let mut labels: Vec<Label> = guard
            .labels
            .values()
            .filter(|l| subject_ids.contains(&l.subject_id()))
            .cloned()
            .collect();
        labels.sort_by_key(Label::id);
        Ok(labels)
    }

    async fn upsert_label(&self, label: &Label) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        guard.labels.insert(label.id(), label.clone());
        Ok(())
    }
}

#[async_trait]
impl ContentRepository for InMemoryRepository {
    async fn content_counts(
        &self,
        kind: ContentKind,
        subject_name_prefix: &str,
        filter: &ContentFilter,
    ) -> Result<HashMap<LabelId, u64>, StorageError> {
        let guard = self.lock()?;
        let subject_ids = guard.subjects_with_prefix(subject_name_prefix);
        let mut counts = HashMap::new();
        for item in guard.matching_contents(kind, Some(&subject_ids), filter) {
            if let Some(topic) = item.topic_id {
                *counts.entry(topic).or_insert(0) += 1;
            }
        }
        Ok(counts)
    }

    async fn authored_topics(
        &self,
        kind: ContentKind,
        subject_name_prefix: &str,
        filter: &ContentFilter,
    ) -> Result<HashSet<LabelId>, StorageError> {
        let guard = self.lock()?;
        let subject_ids = guard.subjects_with_prefix(subject_name_prefix);
        Ok(guard
            .matching_contents(kind, Some(&subject_ids), filter)
            .filter_map(|item| item.topic_id)
            .collect())
    }

    async fn counts_by_subject(
        &self,
        kind: ContentKind,
        filter: &ContentFilter,
    ) -> Result<HashMap<SubjectId, u64>, StorageError> {
        let guard = self.lock()?;
        let mut counts = HashMap::new();
        for item in guard.matching_contents(kind, None, filter) {
            *counts.entry(item.subject_id).or_insert(0) += 1;
        }
        Ok(counts)
    }

    async fn upsert_content(&self, item: &ContentItem) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        guard.contents.insert(item.id, item.clone());
        Ok(())
    }
}

#[async_trait]
impl SubjectRepository for InMemoryRepository {
    async fn list_subjects(&self) -> Result<Vec<Subject>, StorageError> {
        let guard = self.lock()?;
        let mut subjects: Vec<Subject> = guard.subjects.values().cloned().collect();
        subjects.sort_by_key(Subject::id);
        Ok(subjects)
    }

    async fn upsert_subject(&self, subject: &Subject) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        guard.subjects.insert(subject.id(), subject.clone());
        Ok(())
    }

    async fn upsert_curriculum(&self, curriculum: &Curriculum) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        guard.curricula.insert(curriculum.id, curriculum.clone());
        Ok(())
    }

    async fn upsert_language(&self, language: &Language) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        guard.languages.insert(language.id, language.clone());
        Ok(())
    }
}

#[async_trait]
impl StudyPlanRepository for InMemoryRepository {
    async fn save_plan(&self, plan: StudyPlanRecord) -> Result<StudyPlanId, StorageError> {
        let mut guard = self.lock()?;
        Ok(guard.upsert_plan(plan))
    }

    async fn save_plan_with_sessions(
        &self,
        plan: StudyPlanRecord,
        sessions: &[ScheduledSession],
    ) -> Result<StudyPlanId, StorageError> {
        let mut guard = self.lock()?;
        let id = guard.upsert_plan(plan);
        guard.sessions.insert(id, sorted_sessions(sessions));
        Ok(id)
    }

    async fn get_plan_for_student(
        &self,
        student_id: StudentId,
    ) -> Result<Option<StudyPlan>, StorageError> {
        let guard = self.lock()?;
        Ok(guard
            .plans
            .values()
            .find(|p| p.student_id == student_id)
            .cloned())
    }

    async fn replace_sessions(
        &self,
        plan_id: StudyPlanId,
        sessions: &[ScheduledSession],
    ) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        if !guard.plans.contains_key(&plan_id) {
            return Err(StorageError::NotFound);
        }
        guard.sessions.insert(plan_id, sorted_sessions(sessions));
        Ok(())
    }

    async fn list_sessions(
        &self,
        plan_id: StudyPlanId,
    ) -> Result<Vec<ScheduledSession>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.sessions.get(&plan_id).cloned().unwrap_or_default())
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub labels: Arc<dyn LabelRepository>,
    pub contents: Arc<dyn ContentRepository>,
    pub subjects: Arc<dyn SubjectRepository>,
    pub plans: Arc<dyn StudyPlanRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        Self {
            labels: Arc::new(repo.clone()),
            contents: Arc::new(repo.clone()),
            subjects: Arc::new(repo.clone()),
            plans: Arc::new(repo),
        }
    }
}
