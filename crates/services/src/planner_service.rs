use std::sync::Arc;

use storage::repository::{StudyPlanRecord, StudyPlanRepository};
use syllabus_core::model::{PlanConfig, ScheduledSession, StudentId, StudyPlan, StudyPlanId};
use syllabus_core::planner::ScheduleGenerator;

use crate::Clock;
use crate::error::PlannerServiceError;

/// Result of regenerating a student's plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanOutcome {
    pub plan_id: StudyPlanId,
    pub sessions: Vec<ScheduledSession>,
}

/// Saves study plans and keeps their generated sessions in sync.
#[derive(Clone)]
pub struct PlannerService {
    clock: Clock,
    plans: Arc<dyn StudyPlanRepository>,
}

impl PlannerService {
    #[must_use]
    pub fn new(clock: Clock, plans: Arc<dyn StudyPlanRepository>) -> Self {
        Self { clock, plans }
    }

    /// Store the student's plan and replace its sessions with a fresh schedule
    /// starting today.
    ///
    /// The schedule is generated before anything is written, so a malformed
    /// availability grid leaves the stored plan untouched. The plan row and its
    /// sessions are then written together; a failed write keeps the previous
    /// plan and sessions.
    ///
    /// # Errors
    ///
    /// Returns `PlannerServiceError::EmptyName` for a blank plan name.
    /// Returns `PlannerServiceError::Planner` if the config cannot be scheduled.
    /// Returns `PlannerServiceError::Storage` if persistence fails.
    pub async fn generate_and_save(
        &self,
        student_id: StudentId,
        name: &str,
        config: PlanConfig,
    ) -> Result<PlanOutcome, PlannerServiceError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(PlannerServiceError::EmptyName);
        }

        let sessions = ScheduleGenerator::new(&config).generate(self.clock.today())?;

        let record = StudyPlanRecord {
            student_id,
            name: name.to_string(),
            config,
            updated_at: self.clock.now(),
        };
        let plan_id = self.plans.save_plan_with_sessions(record, &sessions).await?;

        tracing::info!(
            student = %student_id,
            plan = %plan_id,
            sessions = sessions.len(),
            "study plan regenerated"
        );
        Ok(PlanOutcome { plan_id, sessions })
    }

    /// Fetch a student's plan together with its stored sessions.
    ///
    /// Returns `Ok(None)` when the student has no plan.
    ///
    /// # Errors
    ///
    /// Returns `PlannerServiceError::Storage` if repository access fails.
    pub async fn plan_for_student(
        &self,
        student_id: StudentId,
    ) -> Result<Option<(StudyPlan, Vec<ScheduledSession>)>, PlannerServiceError> {
        let Some(plan) = self.plans.get_plan_for_student(student_id).await? else {
            return Ok(None);
        };
        let sessions = self.plans.list_sessions(plan.id).await?;
        Ok(Some((plan, sessions)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use chrono::Duration;
    use storage::repository::Storage;
    use syllabus_core::model::PlannedSubject;
    use syllabus_core::planner::PlannerError;
    use syllabus_core::time::fixed_clock;

    fn config() -> PlanConfig {
        let clock = fixed_clock();
        let hours: BTreeMap<String, bool> = [("17:00", true), ("18:00", true)]
            .into_iter()
            .map(|(t, free)| (t.to_string(), free))
            .collect();
        let availability = ["Monday", "Tuesday", "Wednesday", "Thursday", "Friday"]
            .into_iter()
            .map(|d| (d.to_string(), hours.clone()))
            .collect();
        PlanConfig {
            subjects: vec![
                PlannedSubject {
                    local_id: 0,
                    name: "Physics".into(),
                    exam_date: Some(clock.today() + Duration::days(13)),
                    weight: 1,
                    color: "#e74c3c".into(),
                },
                PlannedSubject {
                    local_id: 1,
                    name: "Maths".into(),
                    exam_date: Some(clock.today() + Duration::days(6)),
                    weight: 1,
                    color: "#3498db".into(),
                },
            ],
            availability,
            vacations: Vec::new(),
        }
    }

    #[tokio::test]
    async fn regenerating_replaces_sessions() {
        let storage = Storage::in_memory();
        let svc = PlannerService::new(fixed_clock(), storage.plans);

        let first = svc
            .generate_and_save(StudentId::new(5), "Finals", config())
            .await
            .unwrap();
        assert!(!first.sessions.is_empty());

        let smaller = PlanConfig {
            subjects: config().subjects.into_iter().take(1).collect(),
            ..config()
        };
        let second = svc
            .generate_and_save(StudentId::new(5), "Finals", smaller)
            .await
            .unwrap();
        assert_eq!(first.plan_id, second.plan_id);

        let (plan, stored) = svc
            .plan_for_student(StudentId::new(5))
            .await
            .unwrap()
            .expect("plan");
        assert_eq!(plan.config.subjects.len(), 1);
        assert_eq!(stored, second.sessions);
        assert!(stored.iter().all(|s| s.subject_local_id == 0));
    }

    #[tokio::test]
    async fn invalid_availability_stores_nothing() {
        let storage = Storage::in_memory();
        let svc = PlannerService::new(fixed_clock(), storage.plans);
        let mut bad = config();
        bad.availability
            .insert("Someday".into(), BTreeMap::from([("09:00".to_string(), true)]));

        let err = svc
            .generate_and_save(StudentId::new(9), "Broken", bad)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PlannerServiceError::Planner(PlannerError::InvalidWeekday(_))
        ));
        assert!(svc.plan_for_student(StudentId::new(9)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn blank_name_is_rejected() {
        let svc = PlannerService::new(fixed_clock(), Storage::in_memory().plans);
        let err = svc
            .generate_and_save(StudentId::new(1), " ", config())
            .await
            .unwrap_err();
        assert!(matches!(err, PlannerServiceError::EmptyName));
    }
}
