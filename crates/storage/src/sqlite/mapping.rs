use chrono::NaiveDateTime;
use sqlx::Row;
use sqlx::sqlite::SqliteRow;
use syllabus_core::model::{
    ContentFilter, CurriculumId, Label, LabelId, LanguageId, PlanConfig, ScheduledSession,
    StudentId, StudyPlan, StudyPlanId, Subject, SubjectId, SubjectLevel,
};

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn id_to_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn label_id_from_i64(v: i64) -> Result<LabelId, StorageError> {
    Ok(LabelId::new(i64_to_u64("label_id", v)?))
}

pub(crate) fn subject_id_from_i64(v: i64) -> Result<SubjectId, StorageError> {
    Ok(SubjectId::new(i64_to_u64("subject_id", v)?))
}

pub(crate) fn plan_id_from_i64(v: i64) -> Result<StudyPlanId, StorageError> {
    Ok(StudyPlanId::new(i64_to_u64("plan_id", v)?))
}

pub(crate) fn count_from_i64(v: i64) -> Result<u64, StorageError> {
    i64_to_u64("count", v)
}

/// Bind values for the optional filter columns, `None` meaning "any".
pub(crate) struct FilterBinds {
    pub curriculum: Option<i64>,
    pub language: Option<i64>,
    pub status: Option<&'static str>,
}

impl FilterBinds {
    pub(crate) fn from_filter(filter: &ContentFilter) -> Result<Self, StorageError> {
        Ok(Self {
            curriculum: filter
                .curriculum
                .value()
                .map(|id| id_to_i64("curriculum_id", id.value()))
                .transpose()?,
            language: filter
                .language
                .value()
                .map(|id| id_to_i64("language_id", id.value()))
                .transpose()?,
            status: filter.status.value().map(|s| s.as_str()),
        })
    }
}

pub(crate) fn map_subject_row(row: &SqliteRow) -> Result<Subject, StorageError> {
    let level: String = row.try_get("level").map_err(ser)?;
    Subject::new(
        subject_id_from_i64(row.try_get("id").map_err(ser)?)?,
        row.try_get::<String, _>("name").map_err(ser)?,
        CurriculumId::new(i64_to_u64(
            "curriculum_id",
            row.try_get("curriculum_id").map_err(ser)?,
        )?),
        LanguageId::new(i64_to_u64(
            "language_id",
            row.try_get("language_id").map_err(ser)?,
        )?),
        SubjectLevel::parse(&level).map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_label_row(row: &SqliteRow) -> Result<Label, StorageError> {
    Ok(Label::new(
        label_id_from_i64(row.try_get("id").map_err(ser)?)?,
        row.try_get::<String, _>("description").map_err(ser)?,
        row.try_get::<Option<String>, _>("numbering").map_err(ser)?,
        subject_id_from_i64(row.try_get("subject_id").map_err(ser)?)?,
        row.try_get::<Option<i64>, _>("parent_id")
            .map_err(ser)?
            .map(label_id_from_i64)
            .transpose()?,
    ))
}

pub(crate) fn map_plan_row(row: &SqliteRow) -> Result<StudyPlan, StorageError> {
    let config_json: String = row.try_get("config").map_err(ser)?;
    let config: PlanConfig = serde_json::from_str(&config_json).map_err(ser)?;
    Ok(StudyPlan {
        id: plan_id_from_i64(row.try_get("id").map_err(ser)?)?,
        student_id: StudentId::new(i64_to_u64(
            "student_id",
            row.try_get("student_id").map_err(ser)?,
        )?),
        name: row.try_get("name").map_err(ser)?,
        config,
        updated_at: row.try_get("updated_at").map_err(ser)?,
    })
}

pub(crate) fn map_session_row(row: &SqliteRow) -> Result<ScheduledSession, StorageError> {
    let local_id: i64 = row.try_get("subject_local_id").map_err(ser)?;
    Ok(ScheduledSession {
        subject_name: row.try_get("subject_name").map_err(ser)?,
        subject_color: row.try_get("subject_color").map_err(ser)?,
        subject_local_id: u32::try_from(local_id)
            .map_err(|_| StorageError::Serialization(format!("invalid local id: {local_id}")))?,
        start_time: row.try_get::<NaiveDateTime, _>("start_time").map_err(ser)?,
        end_time: row.try_get::<NaiveDateTime, _>("end_time").map_err(ser)?,
    })
}
