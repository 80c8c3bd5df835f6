use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use chrono::{Duration, Utc};
use serde_json::{Value, json};
use tower::ServiceExt;

use planner_backend::api::router;
use planner_backend::models::*;
use planner_backend::state::AppState;
use planner_backend::storage::{MemoryStorage, Storage};

fn app() -> (Arc<MemoryStorage>, Router) {
    let storage = Arc::new(MemoryStorage::new());
    let state = AppState {
        storage: storage.clone(),
    };
    (storage, router(state))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn subject_crud_over_http() {
    let (_storage, app) = app();
    let (status, created) = send(
        &app,
        "POST",
        "/api/subjects",
        Some(json!({"name": "Anatomia", "code": "ANA001", "semester": 6})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["name"], "Anatomia");
    assert_eq!(created["color"], "#2563EB");
    assert!(created["createdAt"].is_string());

    let id = created["id"].as_str().unwrap();
    let (status, fetched) = send(&app, "GET", &format!("/api/subjects/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["id"], created["id"]);

    let (status, updated) = send(
        &app,
        "PUT",
        &format!("/api/subjects/{}", id),
        Some(json!({"semester": 7})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["semester"], 7);
    assert_eq!(updated["name"], "Anatomia");

    let (status, _) = send(&app, "DELETE", &format!("/api/subjects/{}", id), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, "GET", &format!("/api/subjects/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_payloads_are_rejected() {
    let (storage, app) = app();
    let (status, body) = send(
        &app,
        "POST",
        "/api/subjects",
        Some(json!({"name": "", "semester": 6})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("name"));

    let (status, _) = send(
        &app,
        "POST",
        "/api/subjects",
        Some(json!({"name": "Anatomia", "semester": 0})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let subject = storage
        .insert_subject(NewSubjectRequest {
            name: "Anatomia".to_string(),
            code: None,
            color: None,
            semester: 6,
        })
        .await
        .unwrap();

    // Inverted time range on a class.
    let (status, _) = send(
        &app,
        "POST",
        "/api/classes",
        Some(json!({
            "subjectId": subject.id,
            "dayOfWeek": "Segunda",
            "startTime": "10:00",
            "endTime": "08:00",
            "type": "Laboratório"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Negative score on a grade.
    let (status, _) = send(
        &app,
        "POST",
        "/api/grades",
        Some(json!({
            "subjectId": subject.id,
            "examName": "P1",
            "score": -1.0,
            "examDate": Utc::now().to_rfc3339()
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn averages_flow_from_grades_to_dashboard() {
    let (storage, app) = app();

    let (status, body) = send(&app, "GET", "/api/grades/average/overall", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"average": null}));

    let subject = storage
        .insert_subject(NewSubjectRequest {
            name: "Anatomia".to_string(),
            code: None,
            color: None,
            semester: 6,
        })
        .await
        .unwrap();
    // A second subject with no grades must not drag the overall average down.
    storage
        .insert_subject(NewSubjectRequest {
            name: "Fisiologia".to_string(),
            code: None,
            color: None,
            semester: 6,
        })
        .await
        .unwrap();

    for (score, weight) in [(8.5, 40.0), (9.2, 30.0)] {
        storage
            .insert_grade(NewGradeRequest {
                subject_id: subject.id.clone(),
                exam_name: "Prova".to_string(),
                score,
                max_score: Some(10.0),
                weight: Some(weight),
                exam_date: Utc::now(),
            })
            .await
            .unwrap();
    }

    let (_, body) = send(
        &app,
        "GET",
        &format!("/api/grades/average/{}", subject.id),
        None,
    )
    .await;
    assert_eq!(body["average"].as_f64().unwrap(), 8.8);

    let (_, body) = send(&app, "GET", "/api/grades/average/overall", None).await;
    assert_eq!(body["average"].as_f64().unwrap(), 8.8);

    let (_, body) = send(&app, "GET", "/api/dashboard/stats", None).await;
    assert_eq!(body["generalAverage"].as_f64().unwrap(), 8.8);
}

#[tokio::test]
async fn subject_stats_carry_progress_and_counts() {
    let (storage, app) = app();
    let subject = storage
        .insert_subject(NewSubjectRequest {
            name: "Patologia".to_string(),
            code: None,
            color: None,
            semester: 6,
        })
        .await
        .unwrap();
    storage
        .insert_class(NewClassRequest {
            subject_id: subject.id.clone(),
            day_of_week: Weekday::Terca,
            start_time: "08:00".to_string(),
            end_time: "10:00".to_string(),
            kind: ClassType::AulaExpositiva,
            location: None,
        })
        .await
        .unwrap();
    for status in [
        TaskStatus::Concluido,
        TaskStatus::Concluido,
        TaskStatus::Pendente,
        TaskStatus::Pendente,
        TaskStatus::Pendente,
    ] {
        storage
            .insert_task(NewTaskRequest {
                title: "Estudo".to_string(),
                description: None,
                subject_id: Some(subject.id.clone()),
                class_id: None,
                status,
                due_date: None,
            })
            .await
            .unwrap();
    }

    let (status, body) = send(&app, "GET", "/api/subjects/stats", None).await;
    assert_eq!(status, StatusCode::OK);
    let stats = &body.as_array().unwrap()[0];
    assert_eq!(stats["name"], "Patologia");
    assert_eq!(stats["totalTasks"], 5);
    assert_eq!(stats["completedTasks"], 2);
    assert_eq!(stats["progressPercentage"], 40);
    assert_eq!(stats["weeklyClasses"], 1);
    assert_eq!(stats["averageGrade"], Value::Null);
}

#[tokio::test]
async fn urgent_route_filters_and_sorts() {
    let (storage, app) = app();
    let now = Utc::now();
    let cases = [
        ("em 12h", Some(now + Duration::hours(12)), TaskStatus::Pendente),
        ("em 48h", Some(now + Duration::hours(48)), TaskStatus::Pendente),
        ("atrasada", Some(now - Duration::days(2)), TaskStatus::EmAndamento),
        ("feita", Some(now + Duration::hours(1)), TaskStatus::Concluido),
        ("sem prazo", None, TaskStatus::Pendente),
    ];
    for (title, due_date, status) in cases {
        storage
            .insert_task(NewTaskRequest {
                title: title.to_string(),
                description: None,
                subject_id: None,
                class_id: None,
                status,
                due_date,
            })
            .await
            .unwrap();
    }

    let (status, body) = send(&app, "GET", "/api/tasks/urgent", None).await;
    assert_eq!(status, StatusCode::OK);
    let titles: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["atrasada", "em 12h"]);
    // Unlinked tasks join with explicit nulls, not errors.
    assert_eq!(body[0]["subject"], Value::Null);
    assert_eq!(body[0]["class"], Value::Null);
}

#[tokio::test]
async fn task_status_filter_uses_wire_names() {
    let (storage, app) = app();
    for status in [TaskStatus::Pendente, TaskStatus::EmAndamento] {
        storage
            .insert_task(NewTaskRequest {
                title: "t".to_string(),
                description: None,
                subject_id: None,
                class_id: None,
                status,
                due_date: None,
            })
            .await
            .unwrap();
    }

    let (status, body) = send(&app, "GET", "/api/tasks?status=Em%20Andamento", None).await;
    assert_eq!(status, StatusCode::OK);
    let tasks = body.as_array().unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0]["status"], "Em Andamento");
}

#[tokio::test]
async fn study_plan_routes_validate_the_class() {
    let (storage, app) = app();
    let (status, _) = send(
        &app,
        "POST",
        "/api/study-plans/nope",
        Some(json!({"preStudy": "Ler"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let subject = storage
        .insert_subject(NewSubjectRequest {
            name: "Anatomia".to_string(),
            code: None,
            color: None,
            semester: 6,
        })
        .await
        .unwrap();
    let class = storage
        .insert_class(NewClassRequest {
            subject_id: subject.id.clone(),
            day_of_week: Weekday::Quinta,
            start_time: "08:00".to_string(),
            end_time: "10:00".to_string(),
            kind: ClassType::Sbe,
            location: None,
        })
        .await
        .unwrap();

    let (status, plan) = send(
        &app,
        "POST",
        &format!("/api/study-plans/{}", class.id),
        Some(json!({"preStudy": "Ler capítulo 3"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(plan["preStudy"], "Ler capítulo 3");

    let (status, fetched) = send(
        &app,
        "GET",
        &format!("/api/study-plans/{}", class.id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["id"], plan["id"]);
}

#[tokio::test]
async fn schedule_route_buckets_by_day() {
    let (storage, app) = app();
    let subject = storage
        .insert_subject(NewSubjectRequest {
            name: "Fisiologia".to_string(),
            code: None,
            color: None,
            semester: 6,
        })
        .await
        .unwrap();
    for (day, start, end) in [
        (Weekday::Sexta, "08:00", "12:00"),
        (Weekday::Segunda, "14:00", "16:00"),
        (Weekday::Segunda, "08:00", "10:00"),
    ] {
        storage
            .insert_class(NewClassRequest {
                subject_id: subject.id.clone(),
                day_of_week: day,
                start_time: start.to_string(),
                end_time: end.to_string(),
                kind: ClassType::Laboratorio,
                location: None,
            })
            .await
            .unwrap();
    }

    let (status, body) = send(&app, "GET", "/api/schedule", None).await;
    assert_eq!(status, StatusCode::OK);
    let days = body.as_array().unwrap();
    assert_eq!(days.len(), 7);
    assert_eq!(days[0]["dayOfWeek"], "Segunda");
    let monday: Vec<&str> = days[0]["classes"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["startTime"].as_str().unwrap())
        .collect();
    assert_eq!(monday, vec!["08:00", "14:00"]);
    assert_eq!(days[6]["dayOfWeek"], "Domingo");
    assert!(days[6]["classes"].as_array().unwrap().is_empty());
}
