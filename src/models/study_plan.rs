use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Free-text pre/post-class study notes. At most one per class, created
/// lazily on first edit.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct StudyPlan {
    pub id: String,
    pub class_id: String,
    pub pre_study: Option<String>,
    pub post_study: Option<String>,
    pub resources: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertStudyPlanRequest {
    pub pre_study: Option<String>,
    pub post_study: Option<String>,
    pub resources: Option<String>,
    pub notes: Option<String>,
}
