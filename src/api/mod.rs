use axum::Json;
use axum::extract::{Path, Query};
use axum::{Router, extract::State, http::StatusCode, routing::get};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::*;
use crate::services::PlannerService;
use crate::state::AppState;
use crate::stats::DashboardStats;

#[derive(Deserialize)]
struct TaskQueryParams {
    status: Option<TaskStatus>,
}

#[derive(Deserialize)]
struct RecentGradesParams {
    limit: Option<usize>,
}

#[derive(Debug, Serialize)]
struct AverageResponse {
    average: Option<f64>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/subjects", get(list_subjects).post(create_subject))
        .route("/api/subjects/stats", get(subjects_with_stats))
        .route(
            "/api/subjects/{id}",
            get(get_subject).put(update_subject).delete(delete_subject),
        )
        .route("/api/classes", get(list_classes).post(create_class))
        .route(
            "/api/classes/{id}",
            get(get_class).put(update_class).delete(delete_class),
        )
        .route("/api/schedule", get(weekly_schedule))
        .route("/api/tasks", get(list_tasks).post(create_task))
        .route("/api/tasks/urgent", get(urgent_tasks))
        .route(
            "/api/tasks/{id}",
            get(get_task).put(update_task).delete(delete_task),
        )
        .route("/api/grades", get(list_grades).post(create_grade))
        .route("/api/grades/recent", get(recent_grades))
        .route("/api/grades/average/overall", get(overall_average))
        .route("/api/grades/average/{subjectId}", get(subject_average))
        .route(
            "/api/grades/{id}",
            get(get_grade).put(update_grade).delete(delete_grade),
        )
        .route("/api/study-plans", get(list_study_plans))
        .route(
            "/api/study-plans/{classId}",
            get(get_study_plan).post(upsert_study_plan),
        )
        .route("/api/dashboard/stats", get(dashboard_stats))
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    state.storage.list_subjects().await?;
    Ok(StatusCode::OK)
}

// Subjects

async fn list_subjects(State(state): State<AppState>) -> Result<Json<Vec<Subject>>, AppError> {
    let subjects = state.storage.list_subjects().await?;
    Ok(Json(subjects))
}

async fn subjects_with_stats(
    State(state): State<AppState>,
) -> Result<Json<Vec<SubjectWithStats>>, AppError> {
    let service = PlannerService::new(state.storage.clone());
    Ok(Json(service.subjects_with_stats().await?))
}

async fn get_subject(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Subject>, AppError> {
    let subject = state
        .storage
        .get_subject(&id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(subject))
}

async fn create_subject(
    State(state): State<AppState>,
    Json(req): Json<NewSubjectRequest>,
) -> Result<(StatusCode, Json<Subject>), AppError> {
    req.validate()?;
    let subject = state.storage.insert_subject(req).await?;
    Ok((StatusCode::CREATED, Json(subject)))
}

async fn update_subject(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateSubjectRequest>,
) -> Result<Json<Subject>, AppError> {
    req.validate()?;
    let subject = state
        .storage
        .update_subject(&id, req)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(subject))
}

async fn delete_subject(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    if state.storage.delete_subject(&id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound)
    }
}

// Classes

async fn list_classes(
    State(state): State<AppState>,
) -> Result<Json<Vec<ClassWithSubject>>, AppError> {
    let service = PlannerService::new(state.storage.clone());
    Ok(Json(service.classes_with_subject().await?))
}

async fn get_class(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ClassWithSubject>, AppError> {
    let service = PlannerService::new(state.storage.clone());
    let class = service
        .class_with_subject(&id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(class))
}

async fn create_class(
    State(state): State<AppState>,
    Json(req): Json<NewClassRequest>,
) -> Result<(StatusCode, Json<Class>), AppError> {
    req.validate()?;
    let class = state.storage.insert_class(req).await?;
    Ok((StatusCode::CREATED, Json(class)))
}

async fn update_class(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateClassRequest>,
) -> Result<Json<Class>, AppError> {
    let current = state
        .storage
        .get_class(&id)
        .await?
        .ok_or(AppError::NotFound)?;
    req.validate_against(&current)?;
    let class = state
        .storage
        .update_class(&id, req)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(class))
}

async fn delete_class(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    if state.storage.delete_class(&id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound)
    }
}

async fn weekly_schedule(
    State(state): State<AppState>,
) -> Result<Json<Vec<ScheduleDay>>, AppError> {
    let service = PlannerService::new(state.storage.clone());
    Ok(Json(service.weekly_schedule().await?))
}

// Tasks

async fn list_tasks(
    State(state): State<AppState>,
    Query(params): Query<TaskQueryParams>,
) -> Result<Json<Vec<TaskWithSubject>>, AppError> {
    let service = PlannerService::new(state.storage.clone());
    let tasks = match params.status {
        Some(status) => service.tasks_by_status(status).await?,
        None => service.tasks_with_subject().await?,
    };
    Ok(Json(tasks))
}

async fn urgent_tasks(
    State(state): State<AppState>,
) -> Result<Json<Vec<TaskWithSubject>>, AppError> {
    let service = PlannerService::new(state.storage.clone());
    Ok(Json(service.urgent_tasks(Utc::now()).await?))
}

async fn get_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TaskWithSubject>, AppError> {
    let service = PlannerService::new(state.storage.clone());
    let task = service
        .task_with_subject(&id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(task))
}

async fn create_task(
    State(state): State<AppState>,
    Json(req): Json<NewTaskRequest>,
) -> Result<(StatusCode, Json<Task>), AppError> {
    req.validate()?;
    let task = state.storage.insert_task(req).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

async fn update_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateTaskRequest>,
) -> Result<Json<Task>, AppError> {
    req.validate()?;
    let task = state
        .storage
        .update_task(&id, req)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(task))
}

async fn delete_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    if state.storage.delete_task(&id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound)
    }
}

// Grades

async fn list_grades(
    State(state): State<AppState>,
) -> Result<Json<Vec<GradeWithSubject>>, AppError> {
    let service = PlannerService::new(state.storage.clone());
    Ok(Json(service.grades_with_subject().await?))
}

async fn recent_grades(
    State(state): State<AppState>,
    Query(params): Query<RecentGradesParams>,
) -> Result<Json<Vec<GradeWithSubject>>, AppError> {
    let service = PlannerService::new(state.storage.clone());
    let grades = service.recent_grades(params.limit.unwrap_or(10)).await?;
    Ok(Json(grades))
}

async fn overall_average(State(state): State<AppState>) -> Result<Json<AverageResponse>, AppError> {
    let service = PlannerService::new(state.storage.clone());
    let average = service.overall_average().await?;
    Ok(Json(AverageResponse { average }))
}

async fn subject_average(
    State(state): State<AppState>,
    Path(subject_id): Path<String>,
) -> Result<Json<AverageResponse>, AppError> {
    let service = PlannerService::new(state.storage.clone());
    let average = service.subject_average(&subject_id).await?;
    Ok(Json(AverageResponse { average }))
}

async fn get_grade(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<GradeWithSubject>, AppError> {
    let service = PlannerService::new(state.storage.clone());
    let grade = service
        .grade_with_subject(&id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(grade))
}

async fn create_grade(
    State(state): State<AppState>,
    Json(req): Json<NewGradeRequest>,
) -> Result<(StatusCode, Json<Grade>), AppError> {
    req.validate()?;
    let grade = state.storage.insert_grade(req).await?;
    Ok((StatusCode::CREATED, Json(grade)))
}

async fn update_grade(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateGradeRequest>,
) -> Result<Json<Grade>, AppError> {
    req.validate()?;
    let grade = state
        .storage
        .update_grade(&id, req)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(grade))
}

async fn delete_grade(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    if state.storage.delete_grade(&id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound)
    }
}

// Study plans

async fn list_study_plans(
    State(state): State<AppState>,
) -> Result<Json<Vec<StudyPlan>>, AppError> {
    let plans = state.storage.list_study_plans().await?;
    Ok(Json(plans))
}

async fn get_study_plan(
    State(state): State<AppState>,
    Path(class_id): Path<String>,
) -> Result<Json<StudyPlan>, AppError> {
    let plan = state
        .storage
        .get_study_plan(&class_id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(plan))
}

async fn upsert_study_plan(
    State(state): State<AppState>,
    Path(class_id): Path<String>,
    Json(req): Json<UpsertStudyPlanRequest>,
) -> Result<(StatusCode, Json<StudyPlan>), AppError> {
    // The plan is 1:1 with a class; an unknown class id is a missing resource.
    state
        .storage
        .get_class(&class_id)
        .await?
        .ok_or(AppError::NotFound)?;
    let plan = state.storage.upsert_study_plan(&class_id, req).await?;
    Ok((StatusCode::CREATED, Json(plan)))
}

async fn dashboard_stats(State(state): State<AppState>) -> Result<Json<DashboardStats>, AppError> {
    let service = PlannerService::new(state.storage.clone());
    Ok(Json(service.dashboard_stats().await?))
}
