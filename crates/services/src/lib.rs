#![forbid(unsafe_code)]

pub mod app_services;
pub mod catalog_service;
pub mod course_view_service;
pub mod decision_service;
pub mod error;
pub mod lesson_run;
pub mod progress_service;

pub use pathway_core::Clock;

pub use app_services::AppServices;
pub use catalog_service::CatalogService;
pub use course_view_service::CourseViewService;
pub use decision_service::DecisionService;
pub use error::{
    AppServicesError, CourseViewError, DecisionServiceError, ErrorKind, LessonRunError,
    ProgressServiceError,
};
pub use lesson_run::{ExerciseResult, LessonRun, LessonRunProgress, LessonRunService};
pub use progress_service::{Completion, ProgressService};
