mod content_item;
mod ids;
mod label;
mod study_plan;
mod subject;

pub use content_item::{
    ContentError, ContentFilter, ContentItem, ContentKind, ContentStatus, Scope, WILDCARD,
};
pub use ids::{
    ContentId, CurriculumId, LabelId, LanguageId, ParseIdError, StudentId, StudyPlanId, SubjectId,
};
pub use label::Label;
pub use study_plan::{PlanConfig, PlannedSubject, ScheduledSession, StudyPlan, Vacation};
pub use subject::{Curriculum, Language, Subject, SubjectError, SubjectLevel, base_subject_name};
