use std::sync::Arc;

use pathway_core::Calendar;
use storage::repository::Storage;

use crate::catalog_service::CatalogService;
use crate::course_view_service::CourseViewService;
use crate::decision_service::DecisionService;
use crate::error::AppServicesError;
use crate::lesson_run::LessonRunService;
use crate::progress_service::ProgressService;
use crate::Clock;

/// Assembles app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    progress: Arc<ProgressService>,
    course_view: Arc<CourseViewService>,
    lesson_runs: Arc<LessonRunService>,
    decisions: Arc<DecisionService>,
    catalog: Arc<CatalogService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the database cannot be opened or migrated.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        calendar: Calendar,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_storage(&storage, clock, calendar))
    }

    /// Build services over fresh in-memory storage.
    #[must_use]
    pub fn in_memory(clock: Clock, calendar: Calendar) -> Self {
        Self::from_storage(&Storage::in_memory(), clock, calendar)
    }

    #[must_use]
    pub fn from_storage(storage: &Storage, clock: Clock, calendar: Calendar) -> Self {
        let progress = Arc::new(ProgressService::new(
            clock,
            calendar,
            Arc::clone(&storage.progress),
        ));
        let course_view = Arc::new(CourseViewService::new(
            Arc::clone(&storage.lessons),
            Arc::clone(&storage.progress),
        ));
        let lesson_runs = Arc::new(LessonRunService::new(Arc::clone(&progress)));
        let decisions = Arc::new(DecisionService::new(
            clock,
            Arc::clone(&storage.decisions),
        ));
        let catalog = Arc::new(CatalogService::new(Arc::clone(&storage.lessons)));

        Self {
            progress,
            course_view,
            lesson_runs,
            decisions,
            catalog,
        }
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressService> {
        Arc::clone(&self.progress)
    }

    #[must_use]
    pub fn course_view(&self) -> Arc<CourseViewService> {
        Arc::clone(&self.course_view)
    }

    #[must_use]
    pub fn lesson_runs(&self) -> Arc<LessonRunService> {
        Arc::clone(&self.lesson_runs)
    }

    #[must_use]
    pub fn decisions(&self) -> Arc<DecisionService> {
        Arc::clone(&self.decisions)
    }

    #[must_use]
    pub fn catalog(&self) -> Arc<CatalogService> {
        Arc::clone(&self.catalog)
    }
}
