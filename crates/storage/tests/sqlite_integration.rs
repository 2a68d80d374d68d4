use std::collections::HashMap;

use chrono::{Duration, NaiveDate};
use storage::repository::{Storage, StorageError, StudyPlanRecord, StudyPlanRepository};
use storage::seed::{DEMO_CURRICULUM, seed_demo};
use storage::sqlite::SqliteRepository;
use syllabus_core::model::{
    ContentFilter, ContentId, ContentItem, ContentKind, ContentStatus, CurriculumId, LabelId,
    PlanConfig, PlannedSubject, Scope, ScheduledSession, StudentId, StudyPlanId, SubjectId,
};
use syllabus_core::time::fixed_now;

async fn seeded(name: &str) -> Storage {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let storage = Storage::sqlite(&url).await.expect("connect");
    seed_demo(&storage).await.expect("seed");
    storage
}

fn session(local_id: u32, day: u32, hour: u32) -> ScheduledSession {
    let start = NaiveDate::from_ymd_opt(2024, 3, day)
        .unwrap()
        .and_hms_opt(hour, 0, 0)
        .unwrap();
    ScheduledSession {
        subject_name: format!("Subject {local_id}"),
        subject_color: "#3498db".into(),
        subject_local_id: local_id,
        start_time: start,
        end_time: start + Duration::hours(1),
    }
}

#[tokio::test]
async fn migrate_is_repeatable() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_migrate?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("first migrate");
    repo.migrate().await.expect("second migrate");
}

#[tokio::test]
async fn labels_are_fetched_by_subject_prefix() {
    let storage = seeded("memdb_labels").await;

    let physics = storage.labels.fetch_labels("Physics").await.unwrap();
    assert_eq!(physics.len(), 9);
    assert!(physics.windows(2).all(|w| w[0].id() < w[1].id()));

    let hl_only = storage.labels.fetch_labels("Physics HL").await.unwrap();
    assert_eq!(hl_only.len(), 5);

    // Prefix matching is case-sensitive.
    assert!(storage.labels.fetch_labels("physics").await.unwrap().is_empty());
    assert!(storage.labels.fetch_labels("Astrology").await.unwrap().is_empty());
}

#[tokio::test]
async fn content_counts_apply_kind_status_and_curriculum() {
    let storage = seeded("memdb_counts").await;

    let all = storage
        .contents
        .content_counts(ContentKind::Recipe, "Physics", &ContentFilter::any())
        .await
        .unwrap();
    assert_eq!(
        all,
        HashMap::from([
            (LabelId::new(2), 2),
            (LabelId::new(5), 1),
            (LabelId::new(12), 1),
        ])
    );

    let completed = ContentFilter {
        status: Scope::Only(ContentStatus::Completed),
        ..ContentFilter::any()
    };
    let done = storage
        .contents
        .content_counts(ContentKind::Recipe, "Physics", &completed)
        .await
        .unwrap();
    assert_eq!(
        done,
        HashMap::from([(LabelId::new(2), 1), (LabelId::new(12), 1)])
    );

    let other_curriculum = ContentFilter {
        curriculum: Scope::Only(CurriculumId::new(99)),
        ..ContentFilter::any()
    };
    assert!(
        storage
            .contents
            .content_counts(ContentKind::Recipe, "Physics", &other_curriculum)
            .await
            .unwrap()
            .is_empty()
    );

    let same_curriculum = ContentFilter {
        curriculum: Scope::Only(DEMO_CURRICULUM),
        ..ContentFilter::any()
    };
    let slides = storage
        .contents
        .authored_topics(ContentKind::Slide, "Physics", &same_curriculum)
        .await
        .unwrap();
    assert_eq!(slides.len(), 1);
    assert!(slides.contains(&LabelId::new(14)));
}

#[tokio::test]
async fn untagged_content_counts_per_subject_only() {
    let storage = seeded("memdb_untagged").await;
    let loose = ContentItem::new(
        ContentId::new(100),
        ContentKind::Recipe,
        "Loose worksheet",
        SubjectId::new(1),
    )
    .unwrap();
    storage.contents.upsert_content(&loose).await.unwrap();

    let per_topic = storage
        .contents
        .content_counts(ContentKind::Recipe, "Physics HL", &ContentFilter::any())
        .await
        .unwrap();
    assert_eq!(per_topic.values().sum::<u64>(), 3);

    let per_subject = storage
        .contents
        .counts_by_subject(ContentKind::Recipe, &ContentFilter::any())
        .await
        .unwrap();
    assert_eq!(per_subject.get(&SubjectId::new(1)), Some(&4));
}

#[tokio::test]
async fn study_plan_is_upserted_per_student() {
    let storage = seeded("memdb_plans").await;
    let config = PlanConfig {
        subjects: vec![PlannedSubject {
            local_id: 0,
            name: "Physics".into(),
            exam_date: NaiveDate::from_ymd_opt(2024, 5, 1),
            weight: 2,
            color: "#3498db".into(),
        }],
        ..PlanConfig::default()
    };
    let record = StudyPlanRecord {
        student_id: StudentId::new(42),
        name: "Finals".into(),
        config: config.clone(),
        updated_at: fixed_now(),
    };

    let first = storage.plans.save_plan(record.clone()).await.unwrap();
    let second = storage
        .plans
        .save_plan(StudyPlanRecord {
            name: "Finals v2".into(),
            ..record
        })
        .await
        .unwrap();
    assert_eq!(first, second);

    let plan = storage
        .plans
        .get_plan_for_student(StudentId::new(42))
        .await
        .unwrap()
        .expect("plan");
    assert_eq!(plan.name, "Finals v2");
    assert_eq!(plan.config, config);
    assert_eq!(plan.updated_at, fixed_now());

    assert!(
        storage
            .plans
            .get_plan_for_student(StudentId::new(7))
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn sessions_are_replaced_wholesale() {
    let storage = seeded("memdb_sessions").await;
    let plan_id = storage
        .plans
        .save_plan(StudyPlanRecord {
            student_id: StudentId::new(1),
            name: "Mocks".into(),
            config: PlanConfig::default(),
            updated_at: fixed_now(),
        })
        .await
        .unwrap();

    storage
        .plans
        .replace_sessions(plan_id, &[session(0, 2, 10), session(1, 1, 9)])
        .await
        .unwrap();
    let listed = storage.plans.list_sessions(plan_id).await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].subject_local_id, 1);

    storage
        .plans
        .replace_sessions(plan_id, &[session(3, 5, 14)])
        .await
        .unwrap();
    let listed = storage.plans.list_sessions(plan_id).await.unwrap();
    assert_eq!(listed, vec![session(3, 5, 14)]);

    let err = storage
        .plans
        .replace_sessions(StudyPlanId::new(999), &[])
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound));
}

#[tokio::test]
async fn failed_session_write_keeps_previous_plan() {
    let repo = SqliteRepository::open("sqlite:file:memdb_plan_atomic?mode=memory&cache=shared")
        .await
        .expect("open");
    let record = StudyPlanRecord {
        student_id: StudentId::new(8),
        name: "Mocks".into(),
        config: PlanConfig::default(),
        updated_at: fixed_now(),
    };
    let plan_id = repo
        .save_plan_with_sessions(record.clone(), &[session(0, 2, 10), session(1, 1, 9)])
        .await
        .expect("first save");

    sqlx::query(
        r"
        CREATE TRIGGER reject_broken_sessions BEFORE INSERT ON scheduled_sessions
        WHEN NEW.subject_name = 'Broken'
        BEGIN SELECT RAISE(ABORT, 'rejected'); END;
        ",
    )
    .execute(repo.pool())
    .await
    .expect("create trigger");

    let mut broken = session(2, 4, 11);
    broken.subject_name = "Broken".into();
    let result = repo
        .save_plan_with_sessions(
            StudyPlanRecord {
                name: "Mocks v2".into(),
                ..record
            },
            &[session(3, 3, 12), broken],
        )
        .await;
    assert!(result.is_err());

    let plan = repo
        .get_plan_for_student(StudentId::new(8))
        .await
        .unwrap()
        .expect("plan");
    assert_eq!(plan.id, plan_id);
    assert_eq!(plan.name, "Mocks");
    let listed = repo.list_sessions(plan_id).await.unwrap();
    assert_eq!(listed, vec![session(1, 1, 9), session(0, 2, 10)]);
}
