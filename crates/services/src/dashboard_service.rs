use std::sync::Arc;

use storage::repository::{ContentRepository, LabelRepository, SubjectRepository};
use syllabus_core::hierarchy::{ContentTally, LabelForest, TopicAggregate, aggregate_level};
use syllabus_core::model::{ContentFilter, ContentKind, LabelId};
use syllabus_core::subjects::{SubjectTotal, aggregate_subjects};

use crate::error::DashboardError;

/// One topic-level drill-down request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicQuery {
    pub kind: ContentKind,
    /// Matches every subject whose name starts with it, spanning HL/SL variants.
    pub subject_name_prefix: String,
    /// `None` selects the roots; otherwise the direct children of this label.
    pub parent: Option<LabelId>,
    pub filter: ContentFilter,
}

impl TopicQuery {
    #[must_use]
    pub fn roots(kind: ContentKind, subject_name_prefix: impl Into<String>) -> Self {
        Self {
            kind,
            subject_name_prefix: subject_name_prefix.into(),
            parent: None,
            filter: ContentFilter::any(),
        }
    }

    #[must_use]
    pub fn children_of(mut self, parent: LabelId) -> Self {
        self.parent = Some(parent);
        self
    }

    #[must_use]
    pub fn with_filter(mut self, filter: ContentFilter) -> Self {
        self.filter = filter;
        self
    }
}

/// Read-only dashboard queries over labels and authored content.
#[derive(Clone)]
pub struct DashboardService {
    labels: Arc<dyn LabelRepository>,
    contents: Arc<dyn ContentRepository>,
    subjects: Arc<dyn SubjectRepository>,
}

impl DashboardService {
    #[must_use]
    pub fn new(
        labels: Arc<dyn LabelRepository>,
        contents: Arc<dyn ContentRepository>,
        subjects: Arc<dyn SubjectRepository>,
    ) -> Self {
        Self {
            labels,
            contents,
            subjects,
        }
    }

    /// Aggregate one drill-down level of the topic tree.
    ///
    /// Labels are fetched once, then counts and the authored-topic set, then
    /// everything else happens in memory. Memo tables live only for this call.
    /// An empty scope or a parent outside it returns `[]` without reading
    /// content.
    ///
    /// # Errors
    ///
    /// Returns `DashboardError::MissingSubject` for a blank subject prefix.
    /// Returns `DashboardError::Storage` if any fetch fails; no partial result
    /// is produced.
    #[tracing::instrument(
        skip(self, query),
        fields(
            kind = %query.kind,
            subject = %query.subject_name_prefix,
            parent = ?query.parent
        )
    )]
    pub async fn topic_level(
        &self,
        query: &TopicQuery,
    ) -> Result<Vec<TopicAggregate>, DashboardError> {
        let prefix = query.subject_name_prefix.trim();
        if prefix.is_empty() {
            return Err(DashboardError::MissingSubject);
        }

        let labels = self.labels.fetch_labels(prefix).await?;
        if labels.is_empty() {
            tracing::debug!("no labels for subject prefix");
            return Ok(Vec::new());
        }
        let forest = LabelForest::build(labels);
        if let Some(parent) = query.parent.filter(|p| !forest.contains(*p)) {
            tracing::debug!(%parent, "parent label outside subject scope");
            return Ok(Vec::new());
        }

        let counts = self
            .contents
            .content_counts(query.kind, prefix, &query.filter)
            .await?;
        let authored = self
            .contents
            .authored_topics(query.kind, prefix, &query.filter.ignoring_status())
            .await?;
        let tally = ContentTally::new(counts, authored);

        let entries = aggregate_level(&forest, &tally, query.parent);
        tracing::debug!(
            labels = forest.len(),
            entries = entries.len(),
            "aggregated topic level"
        );
        Ok(entries)
    }

    /// Content totals per subject family, for the top of the drill-down.
    ///
    /// # Errors
    ///
    /// Returns `DashboardError::Storage` if subjects or counts cannot be read.
    #[tracing::instrument(skip(self, filter), fields(kind = %kind))]
    pub async fn subject_level(
        &self,
        kind: ContentKind,
        filter: &ContentFilter,
    ) -> Result<Vec<SubjectTotal>, DashboardError> {
        let subjects = self.subjects.list_subjects().await?;
        let counts = self.contents.counts_by_subject(kind, filter).await?;
        Ok(aggregate_subjects(&subjects, &counts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storage::repository::Storage;
    use storage::seed::seed_demo;
    use syllabus_core::model::{ContentStatus, Scope};

    async fn service() -> DashboardService {
        let storage = Storage::in_memory();
        seed_demo(&storage).await.unwrap();
        DashboardService::new(storage.labels, storage.contents, storage.subjects)
    }

    #[tokio::test]
    async fn root_level_merges_curriculum_variants() {
        let svc = service().await;
        let entries = svc
            .topic_level(&TopicQuery::roots(ContentKind::Recipe, "Physics"))
            .await
            .unwrap();

        assert_eq!(entries.len(), 2);
        let first = &entries[0];
        assert_eq!(first.display_label, "1: Measurements and uncertainties");
        assert_eq!(first.member_ids, vec![LabelId::new(1), LabelId::new(11)]);
        assert_eq!(first.count, 3);
        // HL: 1 of 2 leaves authored (50), SL: 1 of 1 (100).
        assert_eq!(first.completion_percentage, 75);

        let second = &entries[1];
        assert_eq!(second.display_label, "2: Mechanics");
        assert_eq!(second.count, 1);
        assert_eq!(second.completion_percentage, 50);
    }

    #[tokio::test]
    async fn status_filter_narrows_counts_but_not_completion() {
        let svc = service().await;
        let query = TopicQuery::roots(ContentKind::Recipe, "Physics").with_filter(ContentFilter {
            status: Scope::Only(ContentStatus::Completed),
            ..ContentFilter::any()
        });
        let entries = svc.topic_level(&query).await.unwrap();

        assert_eq!(entries[0].count, 2);
        assert_eq!(entries[0].completion_percentage, 75);
        assert_eq!(entries[1].count, 0);
        assert_eq!(entries[1].completion_percentage, 50);
    }

    #[tokio::test]
    async fn drill_down_follows_representative() {
        let svc = service().await;
        let query =
            TopicQuery::roots(ContentKind::Recipe, "Physics").children_of(LabelId::new(1));
        let entries = svc.topic_level(&query).await.unwrap();

        let labels: Vec<&str> = entries.iter().map(|e| e.display_label.as_str()).collect();
        assert_eq!(
            labels,
            vec!["1.1: Measurements in physics", "1.2: Uncertainties and errors"]
        );
        assert_eq!(entries[0].count, 2);
        assert_eq!(entries[0].completion_percentage, 100);
        assert_eq!(entries[1].completion_percentage, 0);
    }

    #[tokio::test]
    async fn unknown_scope_yields_empty_levels() {
        let svc = service().await;
        let none = svc
            .topic_level(&TopicQuery::roots(ContentKind::Recipe, "Astrology"))
            .await
            .unwrap();
        assert!(none.is_empty());

        // Label 21 belongs to Mathematics, outside the Physics forest.
        let outside = svc
            .topic_level(
                &TopicQuery::roots(ContentKind::Recipe, "Physics").children_of(LabelId::new(21)),
            )
            .await
            .unwrap();
        assert!(outside.is_empty());
    }

    #[tokio::test]
    async fn blank_subject_is_rejected() {
        let svc = service().await;
        let err = svc
            .topic_level(&TopicQuery::roots(ContentKind::Slide, "  "))
            .await
            .unwrap_err();
        assert!(matches!(err, DashboardError::MissingSubject));
    }

    #[tokio::test]
    async fn repeated_queries_are_identical() {
        let svc = service().await;
        let query = TopicQuery::roots(ContentKind::Recipe, "Physics");
        let first = svc.topic_level(&query).await.unwrap();
        let second = svc.topic_level(&query).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn subject_level_folds_variants() {
        let svc = service().await;
        let totals = svc
            .subject_level(ContentKind::Recipe, &ContentFilter::any())
            .await
            .unwrap();
        let summary: Vec<(&str, u64)> = totals.iter().map(|t| (t.name.as_str(), t.count)).collect();
        assert_eq!(summary, vec![("Physics", 4), ("Mathematics", 1)]);

        let slides = svc
            .subject_level(ContentKind::Slide, &ContentFilter::any())
            .await
            .unwrap();
        let summary: Vec<(&str, u64)> = slides.iter().map(|t| (t.name.as_str(), t.count)).collect();
        assert_eq!(summary, vec![("Physics", 1), ("Mathematics", 0)]);
    }
}
