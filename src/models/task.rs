use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::AppError;
use crate::models::{Class, Subject};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
pub enum TaskStatus {
    Pendente,
    #[serde(rename = "Em Andamento")]
    #[sqlx(rename = "Em Andamento")]
    EmAndamento,
    #[serde(rename = "Concluído")]
    #[sqlx(rename = "Concluído")]
    Concluido,
}

impl Default for TaskStatus {
    fn default() -> Self {
        TaskStatus::Pendente
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    /// Weak reference: survives subject deletion as `None`.
    pub subject_id: Option<String>,
    pub class_id: Option<String>,
    pub status: TaskStatus,
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTaskRequest {
    pub title: String,
    pub description: Option<String>,
    pub subject_id: Option<String>,
    pub class_id: Option<String>,
    #[serde(default)]
    pub status: TaskStatus,
    pub due_date: Option<DateTime<Utc>>,
}

impl NewTaskRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.title.trim().is_empty() {
            return Err(AppError::BadRequest("title must not be empty".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub subject_id: Option<String>,
    pub class_id: Option<String>,
    pub status: Option<TaskStatus>,
    pub due_date: Option<DateTime<Utc>>,
}

impl UpdateTaskRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if let Some(title) = &self.title {
            if title.trim().is_empty() {
                return Err(AppError::BadRequest("title must not be empty".to_string()));
            }
        }
        Ok(())
    }
}

/// Task joined with its optional subject and class. Dangling references
/// resolve to `None` instead of failing the read.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskWithSubject {
    #[serde(flatten)]
    pub task: Task,
    pub subject: Option<Subject>,
    pub class: Option<Class>,
}
