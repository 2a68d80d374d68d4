use thiserror::Error;

use crate::model::{ContentError, SubjectError};
use crate::planner::PlannerError;

/// Any validation failure raised by the domain layer.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Subject(#[from] SubjectError),
    #[error(transparent)]
    Content(#[from] ContentError),
    #[error(transparent)]
    Planner(#[from] PlannerError),
}
