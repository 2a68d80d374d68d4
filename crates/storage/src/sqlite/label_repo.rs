use syllabus_core::model::Label;

use super::SqliteRepository;
use super::mapping::{conn, id_to_i64, map_label_row};
use crate::repository::{LabelRepository, StorageError};

#[async_trait::async_trait]
impl LabelRepository for SqliteRepository {
    async fn fetch_labels(&self, subject_name_prefix: &str) -> Result<Vec<Label>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT l.id, l.description, l.numbering, l.subject_id, l.parent_id
            FROM labels l
            JOIN subjects s ON s.id = l.subject_id
            WHERE substr(s.name, 1, length(?1)) = ?1
            ORDER BY l.id ASC
            ",
        )
        .bind(subject_name_prefix)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut labels = Vec::with_capacity(rows.len());
        for row in rows {
            labels.push(map_label_row(&row)?);
        }
        tracing::debug!(subject_name_prefix, count = labels.len(), "fetched labels");
        Ok(labels)
    }

    async fn upsert_label(&self, label: &Label) -> Result<(), StorageError> {
        let parent = label
            .parent_id()
            .map(|p| id_to_i64("parent_id", p.value()))
            .transpose()?;

        sqlx::query(
            r"
            INSERT INTO labels (id, description, numbering, subject_id, parent_id)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(id) DO UPDATE SET
                description = excluded.description,
                numbering = excluded.numbering,
                subject_id = excluded.subject_id,
                parent_id = excluded.parent_id
            ",
        )
        .bind(id_to_i64("label_id", label.id().value())?)
        .bind(label.description())
        .bind(label.numbering())
        .bind(id_to_i64("subject_id", label.subject_id().value())?)
        .bind(parent)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }
}
