use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::model::ids::{StudentId, StudyPlanId};

fn default_color() -> String {
    "#808080".to_string()
}

/// The planner form posts `""` for a subject without an exam date.
fn blank_date_as_none<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(Some)
        .map_err(serde::de::Error::custom)
}

/// A subject the student is preparing, as entered in the planner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedSubject {
    /// Client-side identifier, stable within one plan.
    pub local_id: u32,
    pub name: String,
    #[serde(default, deserialize_with = "blank_date_as_none")]
    pub exam_date: Option<NaiveDate>,
    #[serde(default)]
    pub weight: u32,
    #[serde(default = "default_color")]
    pub color: String,
}

/// A day off, or an inclusive range of days off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Vacation {
    Day(NaiveDate),
    Range { start: NaiveDate, end: NaiveDate },
}

impl Vacation {
    #[must_use]
    pub fn covers(&self, date: NaiveDate) -> bool {
        match *self {
            Vacation::Day(day) => day == date,
            Vacation::Range { start, end } => start <= date && date <= end,
        }
    }
}

/// Everything the schedule generator needs.
///
/// `availability` maps an English weekday name (`"Monday"`) to `"HH:MM"`
/// start times and whether that hour is free.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanConfig {
    #[serde(default)]
    pub subjects: Vec<PlannedSubject>,
    #[serde(default)]
    pub availability: BTreeMap<String, BTreeMap<String, bool>>,
    #[serde(default)]
    pub vacations: Vec<Vacation>,
}

/// One hour of study assigned to a subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledSession {
    pub subject_name: String,
    pub subject_color: String,
    pub subject_local_id: u32,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
}

/// A student's single study plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudyPlan {
    pub id: StudyPlanId,
    pub student_id: StudentId,
    pub name: String,
    pub config: PlanConfig,
    pub updated_at: DateTime<Utc>,
}
