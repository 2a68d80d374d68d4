use sqlx::{Row, SqliteConnection};
use syllabus_core::model::{ScheduledSession, StudentId, StudyPlan, StudyPlanId};

use super::SqliteRepository;
use super::mapping::{conn, id_to_i64, map_plan_row, map_session_row, plan_id_from_i64, ser};
use crate::repository::{StorageError, StudyPlanRecord, StudyPlanRepository};

async fn upsert_plan(
    db: &mut SqliteConnection,
    plan: StudyPlanRecord,
) -> Result<StudyPlanId, StorageError> {
    let config = serde_json::to_string(&plan.config).map_err(ser)?;

    let row = sqlx::query(
        r"
        INSERT INTO study_plans (student_id, name, config, updated_at)
        VALUES (?1, ?2, ?3, ?4)
        ON CONFLICT(student_id) DO UPDATE SET
            name = excluded.name,
            config = excluded.config,
            updated_at = excluded.updated_at
        RETURNING id
        ",
    )
    .bind(id_to_i64("student_id", plan.student_id.value())?)
    .bind(plan.name)
    .bind(config)
    .bind(plan.updated_at)
    .fetch_one(&mut *db)
    .await
    .map_err(conn)?;

    plan_id_from_i64(row.try_get("id").map_err(ser)?)
}

/// Drop the plan's sessions and insert `sessions` in their place.
async fn write_sessions(
    db: &mut SqliteConnection,
    plan: i64,
    sessions: &[ScheduledSession],
) -> Result<(), StorageError> {
    sqlx::query("DELETE FROM scheduled_sessions WHERE plan_id = ?1")
        .bind(plan)
        .execute(&mut *db)
        .await
        .map_err(conn)?;

    for session in sessions {
        sqlx::query(
            r"
            INSERT INTO scheduled_sessions (plan_id, subject_name, subject_color, subject_local_id, start_time, end_time)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ",
        )
        .bind(plan)
        .bind(session.subject_name.as_str())
        .bind(session.subject_color.as_str())
        .bind(i64::from(session.subject_local_id))
        .bind(session.start_time)
        .bind(session.end_time)
        .execute(&mut *db)
        .await
        .map_err(conn)?;
    }
    Ok(())
}

#[async_trait::async_trait]
impl StudyPlanRepository for SqliteRepository {
    async fn save_plan(&self, plan: StudyPlanRecord) -> Result<StudyPlanId, StorageError> {
        let mut db = self.pool.acquire().await.map_err(conn)?;
        upsert_plan(&mut *db, plan).await
    }

    async fn save_plan_with_sessions(
        &self,
        plan: StudyPlanRecord,
        sessions: &[ScheduledSession],
    ) -> Result<StudyPlanId, StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;
        let plan_id = upsert_plan(&mut *tx, plan).await?;
        write_sessions(&mut *tx, id_to_i64("plan_id", plan_id.value())?, sessions).await?;
        tx.commit().await.map_err(conn)?;

        tracing::debug!(%plan_id, sessions = sessions.len(), "saved plan with sessions");
        Ok(plan_id)
    }

    async fn get_plan_for_student(
        &self,
        student_id: StudentId,
    ) -> Result<Option<StudyPlan>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, student_id, name, config, updated_at
            FROM study_plans WHERE student_id = ?1
            ",
        )
        .bind(id_to_i64("student_id", student_id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        row.as_ref().map(map_plan_row).transpose()
    }

    async fn replace_sessions(
        &self,
        plan_id: StudyPlanId,
        sessions: &[ScheduledSession],
    ) -> Result<(), StorageError> {
        let plan = id_to_i64("plan_id", plan_id.value())?;
        let mut tx = self.pool.begin().await.map_err(conn)?;

        let exists = sqlx::query("SELECT 1 FROM study_plans WHERE id = ?1")
            .bind(plan)
            .fetch_optional(&mut *tx)
            .await
            .map_err(conn)?;
        if exists.is_none() {
            return Err(StorageError::NotFound);
        }

        write_sessions(&mut *tx, plan, sessions).await?;

        tx.commit().await.map_err(conn)?;
        tracing::debug!(plan_id = plan, sessions = sessions.len(), "replaced sessions");
        Ok(())
    }

    async fn list_sessions(
        &self,
        plan_id: StudyPlanId,
    ) -> Result<Vec<ScheduledSession>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT subject_name, subject_color, subject_local_id, start_time, end_time
            FROM scheduled_sessions
            WHERE plan_id = ?1
            ORDER BY start_time ASC, id ASC
            ",
        )
        .bind(id_to_i64("plan_id", plan_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut sessions = Vec::with_capacity(rows.len());
        for row in rows {
            sessions.push(map_session_row(&row)?);
        }
        Ok(sessions)
    }
}
