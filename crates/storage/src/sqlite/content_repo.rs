use std::collections::{HashMap, HashSet};

use sqlx::Row;
use syllabus_core::model::{ContentFilter, ContentItem, ContentKind, LabelId, SubjectId};

use super::SqliteRepository;
use super::mapping::{
    FilterBinds, conn, count_from_i64, id_to_i64, label_id_from_i64, ser, subject_id_from_i64,
};
use crate::repository::{ContentRepository, StorageError};

#[async_trait::async_trait]
impl ContentRepository for SqliteRepository {
    async fn content_counts(
        &self,
        kind: ContentKind,
        subject_name_prefix: &str,
        filter: &ContentFilter,
    ) -> Result<HashMap<LabelId, u64>, StorageError> {
        let binds = FilterBinds::from_filter(filter)?;
        let rows = sqlx::query(
            r"
            SELECT c.topic_id AS topic_id, COUNT(*) AS n
            FROM content_items c
            JOIN subjects s ON s.id = c.subject_id
            WHERE c.kind = ?1
              AND c.topic_id IS NOT NULL
              AND substr(s.name, 1, length(?2)) = ?2
              AND (?3 IS NULL OR c.curriculum_id = ?3)
              AND (?4 IS NULL OR c.language_id = ?4)
              AND (?5 IS NULL OR c.status = ?5)
            GROUP BY c.topic_id
            ",
        )
        .bind(kind.as_str())
        .bind(subject_name_prefix)
        .bind(binds.curriculum)
        .bind(binds.language)
        .bind(binds.status)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut counts = HashMap::with_capacity(rows.len());
        for row in rows {
            let topic = label_id_from_i64(row.try_get("topic_id").map_err(ser)?)?;
            counts.insert(topic, count_from_i64(row.try_get("n").map_err(ser)?)?);
        }
        Ok(counts)
    }

    async fn authored_topics(
        &self,
        kind: ContentKind,
        subject_name_prefix: &str,
        filter: &ContentFilter,
    ) -> Result<HashSet<LabelId>, StorageError> {
        let binds = FilterBinds::from_filter(filter)?;
        let rows = sqlx::query(
            r"
            SELECT DISTINCT c.topic_id AS topic_id
            FROM content_items c
            JOIN subjects s ON s.id = c.subject_id
            WHERE c.kind = ?1
              AND c.topic_id IS NOT NULL
              AND substr(s.name, 1, length(?2)) = ?2
              AND (?3 IS NULL OR c.curriculum_id = ?3)
              AND (?4 IS NULL OR c.language_id = ?4)
              AND (?5 IS NULL OR c.status = ?5)
            ",
        )
        .bind(kind.as_str())
        .bind(subject_name_prefix)
        .bind(binds.curriculum)
        .bind(binds.language)
        .bind(binds.status)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter()
            .map(|row| label_id_from_i64(row.try_get("topic_id").map_err(ser)?))
            .collect()
    }

    async fn counts_by_subject(
        &self,
        kind: ContentKind,
        filter: &ContentFilter,
    ) -> Result<HashMap<SubjectId, u64>, StorageError> {
        let binds = FilterBinds::from_filter(filter)?;
        let rows = sqlx::query(
            r"
            SELECT c.subject_id AS subject_id, COUNT(*) AS n
            FROM content_items c
            WHERE c.kind = ?1
              AND (?2 IS NULL OR c.curriculum_id = ?2)
              AND (?3 IS NULL OR c.language_id = ?3)
              AND (?4 IS NULL OR c.status = ?4)
            GROUP BY c.subject_id
            ",
        )
        .bind(kind.as_str())
        .bind(binds.curriculum)
        .bind(binds.language)
        .bind(binds.status)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut counts = HashMap::with_capacity(rows.len());
        for row in rows {
            let subject = subject_id_from_i64(row.try_get("subject_id").map_err(ser)?)?;
            counts.insert(subject, count_from_i64(row.try_get("n").map_err(ser)?)?);
        }
        Ok(counts)
    }

    async fn upsert_content(&self, item: &ContentItem) -> Result<(), StorageError> {
        let topic = item
            .topic_id
            .map(|t| id_to_i64("topic_id", t.value()))
            .transpose()?;
        let curriculum = item
            .curriculum_id
            .map(|c| id_to_i64("curriculum_id", c.value()))
            .transpose()?;
        let language = item
            .language_id
            .map(|l| id_to_i64("language_id", l.value()))
            .transpose()?;

        sqlx::query(
            r"
            INSERT INTO content_items (id, kind, title, subject_id, topic_id, curriculum_id, language_id, status)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(id) DO UPDATE SET
                kind = excluded.kind,
                title = excluded.title,
                subject_id = excluded.subject_id,
                topic_id = excluded.topic_id,
                curriculum_id = excluded.curriculum_id,
                language_id = excluded.language_id,
                status = excluded.status
            ",
        )
        .bind(id_to_i64("content_id", item.id.value())?)
        .bind(item.kind.as_str())
        .bind(item.title.as_str())
        .bind(id_to_i64("subject_id", item.subject_id.value())?)
        .bind(topic)
        .bind(curriculum)
        .bind(language)
        .bind(item.status.as_str())
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }
}
