use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::*;
use crate::storage::Storage;

/// All tables behind one lock so a subject delete and its cascades are
/// observed atomically. Vec keeps insertion order, which the urgency sort's
/// tie-breaking contract depends on.
#[derive(Default)]
struct Tables {
    subjects: Vec<Subject>,
    classes: Vec<Class>,
    tasks: Vec<Task>,
    grades: Vec<Grade>,
    study_plans: Vec<StudyPlan>,
}

#[derive(Default)]
pub struct MemoryStorage {
    tables: RwLock<Tables>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, AppError> {
        self.tables.read().map_err(|_| AppError::InternalServerError)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, AppError> {
        self.tables.write().map_err(|_| AppError::InternalServerError)
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn list_subjects(&self) -> Result<Vec<Subject>, AppError> {
        Ok(self.read()?.subjects.clone())
    }

    async fn get_subject(&self, id: &str) -> Result<Option<Subject>, AppError> {
        Ok(self.read()?.subjects.iter().find(|s| s.id == id).cloned())
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
        self.write()?.subjects.push(subject.clone());
        Ok(subject)
    }

    async fn update_subject(
        &self,
        id: &str,
        req: UpdateSubjectRequest,
    ) -> Result<Option<Subject>, AppError> {
        let mut tables = self.write()?;
        let Some(subject) = tables.subjects.iter_mut().find(|s| s.id == id) else {
            return Ok(None);
        };
        if let Some(name) = req.name {
            subject.name = name;
        }
        if let Some(code) = req.code {
            subject.code = Some(code);
        }
        if let Some(color) = req.color {
            subject.color = color;
        }
        if let Some(semester) = req.semester {
            subject.semester = semester;
        }
        Ok(Some(subject.clone()))
    }

    async fn delete_subject(&self, id: &str) -> Result<bool, AppError> {
        let mut tables = self.write()?;
        let before = tables.subjects.len();
        tables.subjects.retain(|s| s.id != id);
        if tables.subjects.len() == before {
            return Ok(false);
        }

        let removed_classes: Vec<String> = tables
            .classes
            .iter()
            .filter(|c| c.subject_id == id)
            .map(|c| c.id.clone())
            .collect();
        tables.classes.retain(|c| c.subject_id != id);
        tables.grades.retain(|g| g.subject_id != id);
        tables
            .study_plans
            .retain(|p| !removed_classes.contains(&p.class_id));
        for task in tables.tasks.iter_mut() {
            if task.subject_id.as_deref() == Some(id) {
                task.subject_id = None;
            }
            if task
                .class_id
                .as_ref()
                .is_some_and(|c| removed_classes.contains(c))
            {
                task.class_id = None;
            }
        }
        Ok(true)
    }

    async fn list_classes(&self) -> Result<Vec<Class>, AppError> {
        Ok(self.read()?.classes.clone())
    }

    async fn get_class(&self, id: &str) -> Result<Option<Class>, AppError> {
        Ok(self.read()?.classes.iter().find(|c| c.id == id).cloned())
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
        self.write()?.classes.push(class.clone());
        Ok(class)
    }

    async fn update_class(
        &self,
        id: &str,
        req: UpdateClassRequest,
    ) -> Result<Option<Class>, AppError> {
        let mut tables = self.write()?;
        let Some(class) = tables.classes.iter_mut().find(|c| c.id == id) else {
            return Ok(None);
        };
        if let Some(subject_id) = req.subject_id {
            class.subject_id = subject_id;
        }
        if let Some(day_of_week) = req.day_of_week {
            class.day_of_week = day_of_week;
        }
        if let Some(start_time) = req.start_time {
            class.start_time = start_time;
        }
        if let Some(end_time) = req.end_time {
            class.end_time = end_time;
        }
        if let Some(kind) = req.kind {
            class.kind = kind;
        }
        if let Some(location) = req.location {
            class.location = Some(location);
        }
        Ok(Some(class.clone()))
    }

    async fn delete_class(&self, id: &str) -> Result<bool, AppError> {
        let mut tables = self.write()?;
        let before = tables.classes.len();
        tables.classes.retain(|c| c.id != id);
        if tables.classes.len() == before {
            return Ok(false);
        }

        tables.study_plans.retain(|p| p.class_id != id);
        for task in tables.tasks.iter_mut() {
            if task.class_id.as_deref() == Some(id) {
                task.class_id = None;
            }
        }
        Ok(true)
    }

    async fn list_tasks(&self) -> Result<Vec<Task>, AppError> {
        Ok(self.read()?.tasks.clone())
    }

    async fn get_task(&self, id: &str) -> Result<Option<Task>, AppError> {
        Ok(self.read()?.tasks.iter().find(|t| t.id == id).cloned())
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
        self.write()?.tasks.push(task.clone());
        Ok(task)
    }

    async fn update_task(
        &self,
        id: &str,
        req: UpdateTaskRequest,
    ) -> Result<Option<Task>, AppError> {
        let mut tables = self.write()?;
        let Some(task) = tables.tasks.iter_mut().find(|t| t.id == id) else {
            return Ok(None);
        };
        if let Some(title) = req.title {
            task.title = title;
        }
        if let Some(description) = req.description {
            task.description = Some(description);
        }
        if let Some(subject_id) = req.subject_id {
            task.subject_id = Some(subject_id);
        }
        if let Some(class_id) = req.class_id {
            task.class_id = Some(class_id);
        }
        if let Some(status) = req.status {
            task.status = status;
        }
        if let Some(due_date) = req.due_date {
            task.due_date = Some(due_date);
        }
        task.updated_at = Utc::now();
        Ok(Some(task.clone()))
    }

    async fn delete_task(&self, id: &str) -> Result<bool, AppError> {
        let mut tables = self.write()?;
        let before = tables.tasks.len();
        tables.tasks.retain(|t| t.id != id);
        Ok(tables.tasks.len() != before)
    }

    async fn list_grades(&self) -> Result<Vec<Grade>, AppError> {
        Ok(self.read()?.grades.clone())
    }

    async fn get_grade(&self, id: &str) -> Result<Option<Grade>, AppError> {
        Ok(self.read()?.grades.iter().find(|g| g.id == id).cloned())
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
        self.write()?.grades.push(grade.clone());
        Ok(grade)
    }

    async fn update_grade(
        &self,
        id: &str,
        req: UpdateGradeRequest,
    ) -> Result<Option<Grade>, AppError> {
        let mut tables = self.write()?;
        let Some(grade) = tables.grades.iter_mut().find(|g| g.id == id) else {
            return Ok(None);
        };
        if let Some(subject_id) = req.subject_id {
            grade.subject_id = subject_id;
        }
        if let Some(exam_name) = req.exam_name {
            grade.exam_name = exam_name;
        }
        if let Some(score) = req.score {
            grade.score = score;
        }
        if let Some(max_score) = req.max_score {
            grade.max_score = max_score;
        }
        if let Some(weight) = req.weight {
            grade.weight = weight;
        }
        if let Some(exam_date) = req.exam_date {
            grade.exam_date = exam_date;
        }
        Ok(Some(grade.clone()))
    }

    async fn delete_grade(&self, id: &str) -> Result<bool, AppError> {
        let mut tables = self.write()?;
        let before = tables.grades.len();
        tables.grades.retain(|g| g.id != id);
        Ok(tables.grades.len() != before)
    }

    async fn list_study_plans(&self) -> Result<Vec<StudyPlan>, AppError> {
        Ok(self.read()?.study_plans.clone())
    }

    async fn get_study_plan(&self, class_id: &str) -> Result<Option<StudyPlan>, AppError> {
        Ok(self
            .read()?
            .study_plans
            .iter()
            .find(|p| p.class_id == class_id)
            .cloned())
    }

    async fn upsert_study_plan(
        &self,
        class_id: &str,
        req: UpsertStudyPlanRequest,
    ) -> Result<StudyPlan, AppError> {
        let mut tables = self.write()?;
        if let Some(plan) = tables.study_plans.iter_mut().find(|p| p.class_id == class_id) {
            if let Some(pre_study) = req.pre_study {
                plan.pre_study = Some(pre_study);
            }
            if let Some(post_study) = req.post_study {
                plan.post_study = Some(post_study);
            }
            if let Some(resources) = req.resources {
                plan.resources = Some(resources);
            }
            if let Some(notes) = req.notes {
                plan.notes = Some(notes);
            }
            plan.updated_at = Utc::now();
            return Ok(plan.clone());
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
        tables.study_plans.push(plan.clone());
        Ok(plan)
    }
}
