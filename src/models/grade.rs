use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::AppError;
use crate::models::Subject;

pub const DEFAULT_MAX_SCORE: f64 = 10.0;
pub const DEFAULT_WEIGHT: f64 = 1.0;

/// A scored, weighted assessment result tied to a subject. `weight` is a
/// relative contribution to the subject average; weights need not sum to 100.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Grade {
    pub id: String,
    pub subject_id: String,
    pub exam_name: String,
    pub score: f64,
    pub max_score: f64,
    pub weight: f64,
    pub exam_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewGradeRequest {
    pub subject_id: String,
    pub exam_name: String,
    pub score: f64,
    pub max_score: Option<f64>,
    pub weight: Option<f64>,
    pub exam_date: DateTime<Utc>,
}

impl NewGradeRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.exam_name.trim().is_empty() {
            return Err(AppError::BadRequest("examName must not be empty".to_string()));
        }
        if self.score < 0.0 {
            return Err(AppError::BadRequest("score must not be negative".to_string()));
        }
        if self.max_score.is_some_and(|m| m <= 0.0) {
            return Err(AppError::BadRequest("maxScore must be positive".to_string()));
        }
        if self.weight.is_some_and(|w| w < 0.0) {
            return Err(AppError::BadRequest("weight must not be negative".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateGradeRequest {
    pub subject_id: Option<String>,
    pub exam_name: Option<String>,
    pub score: Option<f64>,
    pub max_score: Option<f64>,
    pub weight: Option<f64>,
    pub exam_date: Option<DateTime<Utc>>,
}

impl UpdateGradeRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.exam_name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(AppError::BadRequest("examName must not be empty".to_string()));
        }
        if self.score.is_some_and(|s| s < 0.0) {
            return Err(AppError::BadRequest("score must not be negative".to_string()));
        }
        if self.max_score.is_some_and(|m| m <= 0.0) {
            return Err(AppError::BadRequest("maxScore must be positive".to_string()));
        }
        if self.weight.is_some_and(|w| w < 0.0) {
            return Err(AppError::BadRequest("weight must not be negative".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeWithSubject {
    #[serde(flatten)]
    pub grade: Grade,
    pub subject: Subject,
}
