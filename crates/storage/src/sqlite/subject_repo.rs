use syllabus_core::model::{Curriculum, Language, Subject};

use super::SqliteRepository;
use super::mapping::{conn, id_to_i64, map_subject_row};
use crate::repository::{StorageError, SubjectRepository};

#[async_trait::async_trait]
impl SubjectRepository for SqliteRepository {
    async fn list_subjects(&self) -> Result<Vec<Subject>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, name, curriculum_id, language_id, level
            FROM subjects
            ORDER BY id ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut subjects = Vec::with_capacity(rows.len());
        for row in rows {
            subjects.push(map_subject_row(&row)?);
        }
        Ok(subjects)
    }

    async fn upsert_subject(&self, subject: &Subject) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO subjects (id, name, curriculum_id, language_id, level)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                curriculum_id = excluded.curriculum_id,
                language_id = excluded.language_id,
                level = excluded.level
            ",
        )
        .bind(id_to_i64("subject_id", subject.id().value())?)
        .bind(subject.name())
        .bind(id_to_i64("curriculum_id", subject.curriculum_id().value())?)
        .bind(id_to_i64("language_id", subject.language_id().value())?)
        .bind(subject.level().as_str())
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }

    async fn upsert_curriculum(&self, curriculum: &Curriculum) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO curricula (id, name)
            VALUES (?1, ?2)
            ON CONFLICT(id) DO UPDATE SET name = excluded.name
            ",
        )
        .bind(id_to_i64("curriculum_id", curriculum.id.value())?)
        .bind(curriculum.name.as_str())
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }

    async fn upsert_language(&self, language: &Language) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO languages (id, name, code)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                code = excluded.code
            ",
        )
        .bind(id_to_i64("language_id", language.id.value())?)
        .bind(language.name.as_str())
        .bind(language.code.as_str())
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }
}
