pub mod memory;
pub mod sqlite;

use async_trait::async_trait;

use crate::error::AppError;
use crate::models::*;

/// Minimal record-store contract: per entity, list / get / insert / update /
/// delete. Insert assigns the id and creation timestamp; update is a shallow
/// merge of the provided fields; `Ok(None)` / `Ok(false)` mean "not found",
/// which the API layer turns into a 404. Derived values (averages, urgency,
/// schedule) live in `stats` and `services`, never here.
#[async_trait]
pub trait Storage: Send + Sync {
    // Subjects
    async fn list_subjects(&self) -> Result<Vec<Subject>, AppError>;
    async fn get_subject(&self, id: &str) -> Result<Option<Subject>, AppError>;
    async fn insert_subject(&self, req: NewSubjectRequest) -> Result<Subject, AppError>;
    async fn update_subject(
        &self,
        id: &str,
        req: UpdateSubjectRequest,
    ) -> Result<Option<Subject>, AppError>;
    /// Cascades: the subject's classes and grades are removed, its tasks
    /// keep existing with `subject_id = None`.
    async fn delete_subject(&self, id: &str) -> Result<bool, AppError>;

    // Classes
    async fn list_classes(&self) -> Result<Vec<Class>, AppError>;
    async fn get_class(&self, id: &str) -> Result<Option<Class>, AppError>;
    async fn insert_class(&self, req: NewClassRequest) -> Result<Class, AppError>;
    async fn update_class(
        &self,
        id: &str,
        req: UpdateClassRequest,
    ) -> Result<Option<Class>, AppError>;
    /// Cascades: tasks keep existing with `class_id = None`, the class's
    /// study plan is removed.
    async fn delete_class(&self, id: &str) -> Result<bool, AppError>;

    // Tasks
    async fn list_tasks(&self) -> Result<Vec<Task>, AppError>;
    async fn get_task(&self, id: &str) -> Result<Option<Task>, AppError>;
    async fn insert_task(&self, req: NewTaskRequest) -> Result<Task, AppError>;
    async fn update_task(
        &self,
        id: &str,
        req: UpdateTaskRequest,
    ) -> Result<Option<Task>, AppError>;
    async fn delete_task(&self, id: &str) -> Result<bool, AppError>;

    // Grades
    async fn list_grades(&self) -> Result<Vec<Grade>, AppError>;
    async fn get_grade(&self, id: &str) -> Result<Option<Grade>, AppError>;
    async fn insert_grade(&self, req: NewGradeRequest) -> Result<Grade, AppError>;
    async fn update_grade(
        &self,
        id: &str,
        req: UpdateGradeRequest,
    ) -> Result<Option<Grade>, AppError>;
    async fn delete_grade(&self, id: &str) -> Result<bool, AppError>;

    // Study plans
    async fn list_study_plans(&self) -> Result<Vec<StudyPlan>, AppError>;
    async fn get_study_plan(&self, class_id: &str) -> Result<Option<StudyPlan>, AppError>;
    /// Creates the plan on first edit, merges provided fields afterwards.
    async fn upsert_study_plan(
        &self,
        class_id: &str,
        req: UpsertStudyPlanRequest,
    ) -> Result<StudyPlan, AppError>;
}

pub use memory::MemoryStorage;
pub use sqlite::SqliteStorage;
