use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::*;
use crate::storage::Storage;

/// SQLite-backed store. Lists come back in insertion (rowid) order so both
/// backends expose the same encounter order to the aggregation layer.
pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn list_subjects(&self) -> Result<Vec<Subject>, AppError> {
        let subjects = sqlx::query_as::<_, Subject>(
            "SELECT id, name, code, color, semester, created_at FROM subjects ORDER BY rowid",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(subjects)
    }

    async fn get_subject(&self, id: &str) -> Result<Option<Subject>, AppError> {
        let subject = sqlx::query_as::<_, Subject>(
            "SELECT id, name, code, color, semester, created_at FROM subjects WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(subject)
    }

    async fn insert_subject(&self, req: NewSubjectRequest) -> Result<Subject, AppError> {
        let subject = Subject {
            id: Uuid::new_v4().to_string(),
            name: req.name,
            code: req.code,
            color: req.color.unwrap_or_else(|| subject::DEFAULT_COLOR.to_string()),
            semester: req.semester,
            created_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO subjects (id, name, code, color, semester, created_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&subject.id)
        .bind(&subject.name)
        .bind(&subject.code)
        .bind(&subject.color)
        .bind(subject.semester)
        .bind(subject.created_at)
        .execute(&self.pool)
        .await?;

        Ok(subject)
    }

    async fn update_subject(
        &self,
        id: &str,
        req: UpdateSubjectRequest,
    ) -> Result<Option<Subject>, AppError> {
        let Some(mut current) = self.get_subject(id).await? else {
            return Ok(None);
        };
        if let Some(name) = req.name {
            current.name = name;
        }
        if let Some(code) = req.code {
            current.code = Some(code);
        }
        if let Some(color) = req.color {
            current.color = color;
        }
        if let Some(semester) = req.semester {
            current.semester = semester;
        }

        sqlx::query("UPDATE subjects SET name = ?, code = ?, color = ?, semester = ? WHERE id = ?")
            .bind(&current.name)
            .bind(&current.code)
            .bind(&current.color)
            .bind(current.semester)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(Some(current))
    }

    async fn delete_subject(&self, id: &str) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;

        let affected = sqlx::query("DELETE FROM subjects WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if affected == 0 {
            return Ok(false);
        }

        // Cascades run while the classes rows still exist for the subqueries.
        sqlx::query(
            "DELETE FROM study_plans \
             WHERE class_id IN (SELECT id FROM classes WHERE subject_id = ?)",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;
        sqlx::query(
            "UPDATE tasks SET class_id = NULL \
             WHERE class_id IN (SELECT id FROM classes WHERE subject_id = ?)",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;
        sqlx::query("UPDATE tasks SET subject_id = NULL WHERE subject_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM classes WHERE subject_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM grades WHERE subject_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn list_classes(&self) -> Result<Vec<Class>, AppError> {
        let classes = sqlx::query_as::<_, Class>(
            "SELECT id, subject_id, day_of_week, start_time, end_time, type, location, \
             created_at FROM classes ORDER BY rowid",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(classes)
    }

    async fn get_class(&self, id: &str) -> Result<Option<Class>, AppError> {
        let class = sqlx::query_as::<_, Class>(
            "SELECT id, subject_id, day_of_week, start_time, end_time, type, location, \
             created_at FROM classes WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(class)
    }

    async fn insert_class(&self, req: NewClassRequest) -> Result<Class, AppError> {
        let class = Class {
            id: Uuid::new_v4().to_string(),
            subject_id: req.subject_id,
            day_of_week: req.day_of_week,
            start_time: req.start_time,
            end_time: req.end_time,
            kind: req.kind,
            location: req.location,
            created_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO classes (id, subject_id, day_of_week, start_time, end_time, type, \
             location, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&class.id)
        .bind(&class.subject_id)
        .bind(class.day_of_week)
        .bind(&class.start_time)
        .bind(&class.end_time)
        .bind(class.kind)
        .bind(&class.location)
        .bind(class.created_at)
        .execute(&self.pool)
        .await?;

        Ok(class)
    }

    async fn update_class(
        &self,
        id: &str,
        req: UpdateClassRequest,
    ) -> Result<Option<Class>, AppError> {
        let Some(mut current) = self.get_class(id).await? else {
            return Ok(None);
        };
        if let Some(subject_id) = req.subject_id {
            current.subject_id = subject_id;
        }
        if let Some(day_of_week) = req.day_of_week {
            current.day_of_week = day_of_week;
        }
        if let Some(start_time) = req.start_time {
            current.start_time = start_time;
        }
        if let Some(end_time) = req.end_time {
            current.end_time = end_time;
        }
        if let Some(kind) = req.kind {
            current.kind = kind;
        }
        if let Some(location) = req.location {
            current.location = Some(location);
        }

        sqlx::query(
            "UPDATE classes SET subject_id = ?, day_of_week = ?, start_time = ?, end_time = ?, \
             type = ?, location = ? WHERE id = ?",
        )
        .bind(&current.subject_id)
        .bind(current.day_of_week)
        .bind(&current.start_time)
        .bind(&current.end_time)
        .bind(current.kind)
        .bind(&current.location)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(Some(current))
    }

    async fn delete_class(&self, id: &str) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;

        let affected = sqlx::query("DELETE FROM classes WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if affected == 0 {
            return Ok(false);
        }

        sqlx::query("DELETE FROM study_plans WHERE class_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE tasks SET class_id = NULL WHERE class_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn list_tasks(&self) -> Result<Vec<Task>, AppError> {
        let tasks = sqlx::query_as::<_, Task>(
            "SELECT id, title, description, subject_id, class_id, status, due_date, \
             created_at, updated_at FROM tasks ORDER BY rowid",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(tasks)
    }

    async fn get_task(&self, id: &str) -> Result<Option<Task>, AppError> {
        let task = sqlx::query_as::<_, Task>(
            "SELECT id, title, description, subject_id, class_id, status, due_date, \
             created_at, updated_at FROM tasks WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(task)
    }

    async fn insert_task(&self, req: NewTaskRequest) -> Result<Task, AppError> {
        let now = Utc::now();
        let task = Task {
            id: Uuid::new_v4().to_string(),
            title: req.title,
            description: req.description,
            subject_id: req.subject_id,
            class_id: req.class_id,
            status: req.status,
            due_date: req.due_date,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            "INSERT INTO tasks (id, title, description, subject_id, class_id, status, due_date, \
             created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&task.id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(&task.subject_id)
        .bind(&task.class_id)
        .bind(task.status)
        .bind(task.due_date)
        .bind(task.created_at)
        .bind(task.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(task)
    }

    async fn update_task(
        &self,
        id: &str,
        req: UpdateTaskRequest,
    ) -> Result<Option<Task>, AppError> {
        let Some(mut current) = self.get_task(id).await? else {
            return Ok(None);
        };
        if let Some(title) = req.title {
            current.title = title;
        }
        if let Some(description) = req.description {
            current.description = Some(description);
        }
        if let Some(subject_id) = req.subject_id {
            current.subject_id = Some(subject_id);
        }
        if let Some(class_id) = req.class_id {
            current.class_id = Some(class_id);
        }
        if let Some(status) = req.status {
            current.status = status;
        }
        if let Some(due_date) = req.due_date {
            current.due_date = Some(due_date);
        }
        current.updated_at = Utc::now();

        sqlx::query(
            "UPDATE tasks SET title = ?, description = ?, subject_id = ?, class_id = ?, \
             status = ?, due_date = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&current.title)
        .bind(&current.description)
        .bind(&current.subject_id)
        .bind(&current.class_id)
        .bind(current.status)
        .bind(current.due_date)
        .bind(current.updated_at)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(Some(current))
    }

    async fn delete_task(&self, id: &str) -> Result<bool, AppError> {
        let affected = sqlx::query("DELETE FROM tasks WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(affected > 0)
    }

    async fn list_grades(&self) -> Result<Vec<Grade>, AppError> {
        let grades = sqlx::query_as::<_, Grade>(
            "SELECT id, subject_id, exam_name, score, max_score, weight, exam_date, \
             created_at FROM grades ORDER BY rowid",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(grades)
    }

    async fn get_grade(&self, id: &str) -> Result<Option<Grade>, AppError> {
        let grade = sqlx::query_as::<_, Grade>(
            "SELECT id, subject_id, exam_name, score, max_score, weight, exam_date, \
             created_at FROM grades WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(grade)
    }

    async fn insert_grade(&self, req: NewGradeRequest) -> Result<Grade, AppError> {
        let grade = Grade {
            id: Uuid::new_v4().to_string(),
            subject_id: req.subject_id,
            exam_name: req.exam_name,
            score: req.score,
            max_score: req.max_score.unwrap_or(grade::DEFAULT_MAX_SCORE),
            weight: req.weight.unwrap_or(grade::DEFAULT_WEIGHT),
            exam_date: req.exam_date,
            created_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO grades (id, subject_id, exam_name, score, max_score, weight, exam_date, \
             created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&grade.id)
        .bind(&grade.subject_id)
        .bind(&grade.exam_name)
        .bind(grade.score)
        .bind(grade.max_score)
        .bind(grade.weight)
        .bind(grade.exam_date)
        .bind(grade.created_at)
        .execute(&self.pool)
        .await?;

        Ok(grade)
    }

    async fn update_grade(
        &self,
        id: &str,
        req: UpdateGradeRequest,
    ) -> Result<Option<Grade>, AppError> {
        let Some(mut current) = self.get_grade(id).await? else {
            return Ok(None);
        };
        if let Some(subject_id) = req.subject_id {
            current.subject_id = subject_id;
        }
        if let Some(exam_name) = req.exam_name {
            current.exam_name = exam_name;
        }
        if let Some(score) = req.score {
            current.score = score;
        }
        if let Some(max_score) = req.max_score {
            current.max_score = max_score;
        }
        if let Some(weight) = req.weight {
            current.weight = weight;
        }
        if let Some(exam_date) = req.exam_date {
            current.exam_date = exam_date;
        }

        sqlx::query(
            "UPDATE grades SET subject_id = ?, exam_name = ?, score = ?, max_score = ?, \
             weight = ?, exam_date = ? WHERE id = ?",
        )
        .bind(&current.subject_id)
        .bind(&current.exam_name)
        .bind(current.score)
        .bind(current.max_score)
        .bind(current.weight)
        .bind(current.exam_date)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(Some(current))
    }

    async fn delete_grade(&self, id: &str) -> Result<bool, AppError> {
        let affected = sqlx::query("DELETE FROM grades WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(affected > 0)
    }

    async fn list_study_plans(&self) -> Result<Vec<StudyPlan>, AppError> {
        let plans = sqlx::query_as::<_, StudyPlan>(
            "SELECT id, class_id, pre_study, post_study, resources, notes, created_at, \
             updated_at FROM study_plans ORDER BY rowid",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(plans)
    }

    async fn get_study_plan(&self, class_id: &str) -> Result<Option<StudyPlan>, AppError> {
        let plan = sqlx::query_as::<_, StudyPlan>(
            "SELECT id, class_id, pre_study, post_study, resources, notes, created_at, \
             updated_at FROM study_plans WHERE class_id = ?",
        )
        .bind(class_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(plan)
    }

    async fn upsert_study_plan(
        &self,
        class_id: &str,
        req: UpsertStudyPlanRequest,
    ) -> Result<StudyPlan, AppError> {
        if let Some(mut current) = self.get_study_plan(class_id).await? {
            if let Some(pre_study) = req.pre_study {
                current.pre_study = Some(pre_study);
            }
            if let Some(post_study) = req.post_study {
                current.post_study = Some(post_study);
            }
            if let Some(resources) = req.resources {
                current.resources = Some(resources);
            }
            if let Some(notes) = req.notes {
                current.notes = Some(notes);
            }
            current.updated_at = Utc::now();

            sqlx::query(
                "UPDATE study_plans SET pre_study = ?, post_study = ?, resources = ?, notes = ?, \
                 updated_at = ? WHERE class_id = ?",
            )
            .bind(&current.pre_study)
            .bind(&current.post_study)
            .bind(&current.resources)
            .bind(&current.notes)
            .bind(current.updated_at)
            .bind(class_id)
            .execute(&self.pool)
            .await?;

            return Ok(current);
        }

        let now = Utc::now();
        let plan = StudyPlan {
            id: Uuid::new_v4().to_string(),
            class_id: class_id.to_string(),
            pre_study: req.pre_study,
            post_study: req.post_study,
            resources: req.resources,
            notes: req.notes,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            "INSERT INTO study_plans (id, class_id, pre_study, post_study, resources, notes, \
             created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&plan.id)
        .bind(&plan.class_id)
        .bind(&plan.pre_study)
        .bind(&plan.post_study)
        .bind(&plan.resources)
        .bind(&plan.notes)
        .bind(plan.created_at)
        .bind(plan.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn setup_test_db() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to create test db");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run migrations");

        pool
    }

    #[tokio::test]
    async fn entities_round_trip_through_sqlite() {
        let store = SqliteStorage::new(setup_test_db().await);

        let subject = store
            .insert_subject(NewSubjectRequest {
                name: "Anatomia".to_string(),
                code: Some("ANA001".to_string()),
                color: None,
                semester: 6,
            })
            .await
            .unwrap();

        let class = store
            .insert_class(NewClassRequest {
                subject_id: subject.id.clone(),
                day_of_week: Weekday::Terca,
                start_time: "08:00".to_string(),
                end_time: "10:00".to_string(),
                kind: ClassType::AulaExpositiva,
                location: Some("Auditório".to_string()),
            })
            .await
            .unwrap();

        let fetched = store.get_class(&class.id).await.unwrap().unwrap();
        assert_eq!(fetched.day_of_week, Weekday::Terca);
        assert_eq!(fetched.kind, ClassType::AulaExpositiva);
        assert_eq!(fetched.location.as_deref(), Some("Auditório"));
        assert_eq!(fetched.created_at.timestamp(), class.created_at.timestamp());

        let task = store
            .insert_task(NewTaskRequest {
                title: "Revisar".to_string(),
                description: None,
                subject_id: Some(subject.id.clone()),
                class_id: None,
                status: TaskStatus::EmAndamento,
                due_date: Some(Utc::now()),
            })
            .await
            .unwrap();
        let fetched = store.get_task(&task.id).await.unwrap().unwrap();
        assert_eq!(fetched.status, TaskStatus::EmAndamento);
        assert!(fetched.due_date.is_some());
    }

    #[tokio::test]
    async fn lists_keep_insertion_order() {
        let store = SqliteStorage::new(setup_test_db().await);
        for name in ["Anatomia", "Fisiologia", "Patologia"] {
            store
                .insert_subject(NewSubjectRequest {
                    name: name.to_string(),
                    code: None,
                    color: None,
                    semester: 1,
                })
                .await
                .unwrap();
        }
        let names: Vec<String> = store
            .list_subjects()
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["Anatomia", "Fisiologia", "Patologia"]);
    }
}
