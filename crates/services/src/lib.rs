#![forbid(unsafe_code)]

pub mod app_services;
pub mod dashboard_service;
pub mod error;
pub mod planner_service;

pub use syllabus_core::Clock;

pub use app_services::AppServices;
pub use dashboard_service::{DashboardService, TopicQuery};
pub use error::{AppServicesError, DashboardError, PlannerServiceError};
pub use planner_service::{PlanOutcome, PlannerService};
