use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::AppError;

pub const DEFAULT_COLOR: &str = "#2563EB";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub id: String,
    pub name: String,
    pub code: Option<String>,
    pub color: String,
    pub semester: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSubjectRequest {
    pub name: String,
    pub code: Option<String>,
    pub color: Option<String>,
    pub semester: i32,
}

impl NewSubjectRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.name.trim().is_empty() {
            return Err(AppError::BadRequest("name must not be empty".to_string()));
        }
        if self.semester < 1 {
            return Err(AppError::BadRequest("semester must be at least 1".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSubjectRequest {
    pub name: Option<String>,
    pub code: Option<String>,
    pub color: Option<String>,
    pub semester: Option<i32>,
}

impl UpdateSubjectRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err(AppError::BadRequest("name must not be empty".to_string()));
            }
        }
        if let Some(semester) = self.semester {
            if semester < 1 {
                return Err(AppError::BadRequest("semester must be at least 1".to_string()));
            }
        }
        Ok(())
    }
}

/// Subject merged with the derived values the dashboard cards show.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectWithStats {
    #[serde(flatten)]
    pub subject: Subject,
    pub completed_tasks: usize,
    pub total_tasks: usize,
    pub progress_percentage: u32,
    pub average_grade: Option<f64>,
    pub weekly_classes: usize,
}
