use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::AppError;
use crate::models::Subject;

/// Day of a recurring weekly slot. Wire and database values are the
/// Portuguese day names the UI displays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
pub enum Weekday {
    Segunda,
    #[serde(rename = "Terça")]
    #[sqlx(rename = "Terça")]
    Terca,
    Quarta,
    Quinta,
    Sexta,
    #[serde(rename = "Sábado")]
    #[sqlx(rename = "Sábado")]
    Sabado,
    Domingo,
}

impl Weekday {
    /// Monday-first week order used by the schedule view.
    pub const ALL: [Weekday; 7] = [
        Weekday::Segunda,
        Weekday::Terca,
        Weekday::Quarta,
        Weekday::Quinta,
        Weekday::Sexta,
        Weekday::Sabado,
        Weekday::Domingo,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
pub enum ClassType {
    #[serde(rename = "Aula Expositiva")]
    #[sqlx(rename = "Aula Expositiva")]
    AulaExpositiva,
    #[serde(rename = "Laboratório")]
    #[sqlx(rename = "Laboratório")]
    Laboratorio,
    #[serde(rename = "SBE")]
    #[sqlx(rename = "SBE")]
    Sbe,
    #[serde(rename = "TBL")]
    #[sqlx(rename = "TBL")]
    Tbl,
}

/// A recurring weekly slot, not a dated occurrence.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Class {
    pub id: String,
    pub subject_id: String,
    pub day_of_week: Weekday,
    pub start_time: String,
    pub end_time: String,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub kind: ClassType,
    pub location: Option<String>,
    pub created_at: DateTime<Utc>,
}

fn validate_time(value: &str, field: &str) -> Result<(), AppError> {
    if value.len() != 5 || NaiveTime::parse_from_str(value, "%H:%M").is_err() {
        return Err(AppError::BadRequest(format!(
            "{} must be a zero-padded HH:MM time, got {:?}",
            field, value
        )));
    }
    Ok(())
}

fn validate_time_range(start: &str, end: &str) -> Result<(), AppError> {
    validate_time(start, "startTime")?;
    validate_time(end, "endTime")?;
    if start >= end {
        return Err(AppError::BadRequest(
            "startTime must be earlier than endTime".to_string(),
        ));
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewClassRequest {
    pub subject_id: String,
    pub day_of_week: Weekday,
    pub start_time: String,
    pub end_time: String,
    #[serde(rename = "type")]
    pub kind: ClassType,
    pub location: Option<String>,
}

impl NewClassRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        validate_time_range(&self.start_time, &self.end_time)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateClassRequest {
    pub subject_id: Option<String>,
    pub day_of_week: Option<Weekday>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<ClassType>,
    pub location: Option<String>,
}

impl UpdateClassRequest {
    /// Partial updates are checked against the merged result, so a request
    /// changing only one end of the range still cannot invert it.
    pub fn validate_against(&self, current: &Class) -> Result<(), AppError> {
        let start = self.start_time.as_deref().unwrap_or(&current.start_time);
        let end = self.end_time.as_deref().unwrap_or(&current.end_time);
        validate_time_range(start, end)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassWithSubject {
    #[serde(flatten)]
    pub class: Class,
    pub subject: Subject,
}

/// One bucket of the weekly schedule view.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleDay {
    pub day_of_week: Weekday,
    pub classes: Vec<ClassWithSubject>,
}
