use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::error::AppError;
use crate::models::*;
use crate::stats::{self, DashboardStats};
use crate::storage::Storage;

/// Read-side queries: joins store snapshots and runs them through `stats`.
/// Holds no state of its own; every call re-reads the store.
pub struct PlannerService {
    storage: Arc<dyn Storage>,
}

impl PlannerService {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    async fn subject_index(&self) -> Result<HashMap<String, Subject>, AppError> {
        let index = self
            .storage
            .list_subjects()
            .await?
            .into_iter()
            .map(|s| (s.id.clone(), s))
            .collect();
        Ok(index)
    }

    async fn class_index(&self) -> Result<HashMap<String, Class>, AppError> {
        let index = self
            .storage
            .list_classes()
            .await?
            .into_iter()
            .map(|c| (c.id.clone(), c))
            .collect();
        Ok(index)
    }

    pub async fn subjects_with_stats(&self) -> Result<Vec<SubjectWithStats>, AppError> {
        let subjects = self.storage.list_subjects().await?;
        let tasks = self.storage.list_tasks().await?;
        let classes = self.storage.list_classes().await?;
        let grades = self.storage.list_grades().await?;

        Ok(subjects
            .iter()
            .map(|s| stats::subject_stats(s, &tasks, &classes, &grades))
            .collect())
    }

    /// Classes whose subject was deleted are omitted rather than surfaced
    /// with a broken reference.
    pub async fn classes_with_subject(&self) -> Result<Vec<ClassWithSubject>, AppError> {
        let classes = self.storage.list_classes().await?;
        let subjects = self.subject_index().await?;

        Ok(classes
            .into_iter()
            .filter_map(|class| {
                let subject = subjects.get(&class.subject_id)?.clone();
                Some(ClassWithSubject { class, subject })
            })
            .collect())
    }

    pub async fn class_with_subject(&self, id: &str) -> Result<Option<ClassWithSubject>, AppError> {
        let Some(class) = self.storage.get_class(id).await? else {
            return Ok(None);
        };
        let Some(subject) = self.storage.get_subject(&class.subject_id).await? else {
            return Ok(None);
        };
        Ok(Some(ClassWithSubject { class, subject }))
    }

    pub async fn classes_by_subject(
        &self,
        subject_id: &str,
    ) -> Result<Vec<ClassWithSubject>, AppError> {
        let Some(subject) = self.storage.get_subject(subject_id).await? else {
            return Ok(Vec::new());
        };
        let classes = self.storage.list_classes().await?;

        Ok(classes
            .into_iter()
            .filter(|c| c.subject_id == subject_id)
            .map(|class| ClassWithSubject {
                class,
                subject: subject.clone(),
            })
            .collect())
    }

    fn join_task(
        task: Task,
        subjects: &HashMap<String, Subject>,
        classes: &HashMap<String, Class>,
    ) -> TaskWithSubject {
        // Dangling references demote to None instead of failing the read.
        let subject = task
            .subject_id
            .as_ref()
            .and_then(|id| subjects.get(id))
            .cloned();
        let class = task
            .class_id
            .as_ref()
            .and_then(|id| classes.get(id))
            .cloned();
        TaskWithSubject { task, subject, class }
    }

    pub async fn tasks_with_subject(&self) -> Result<Vec<TaskWithSubject>, AppError> {
        let tasks = self.storage.list_tasks().await?;
        let subjects = self.subject_index().await?;
        let classes = self.class_index().await?;

        Ok(tasks
            .into_iter()
            .map(|t| Self::join_task(t, &subjects, &classes))
            .collect())
    }

    pub async fn task_with_subject(&self, id: &str) -> Result<Option<TaskWithSubject>, AppError> {
        let Some(task) = self.storage.get_task(id).await? else {
            return Ok(None);
        };
        let subjects = self.subject_index().await?;
        let classes = self.class_index().await?;
        Ok(Some(Self::join_task(task, &subjects, &classes)))
    }

    pub async fn tasks_by_status(
        &self,
        status: TaskStatus,
    ) -> Result<Vec<TaskWithSubject>, AppError> {
        let tasks = self.storage.list_tasks().await?;
        let subjects = self.subject_index().await?;
        let classes = self.class_index().await?;

        Ok(tasks
            .into_iter()
            .filter(|t| t.status == status)
            .map(|t| Self::join_task(t, &subjects, &classes))
            .collect())
    }

    pub async fn tasks_by_subject(
        &self,
        subject_id: &str,
    ) -> Result<Vec<TaskWithSubject>, AppError> {
        let tasks = self.storage.list_tasks().await?;
        let subjects = self.subject_index().await?;
        let classes = self.class_index().await?;

        Ok(tasks
            .into_iter()
            .filter(|t| t.subject_id.as_deref() == Some(subject_id))
            .map(|t| Self::join_task(t, &subjects, &classes))
            .collect())
    }

    pub async fn grades_with_subject(&self) -> Result<Vec<GradeWithSubject>, AppError> {
        let grades = self.storage.list_grades().await?;
        let subjects = self.subject_index().await?;

        Ok(grades
            .into_iter()
            .filter_map(|grade| {
                let subject = subjects.get(&grade.subject_id)?.clone();
                Some(GradeWithSubject { grade, subject })
            })
            .collect())
    }

    pub async fn grade_with_subject(&self, id: &str) -> Result<Option<GradeWithSubject>, AppError> {
        let Some(grade) = self.storage.get_grade(id).await? else {
            return Ok(None);
        };
        let Some(subject) = self.storage.get_subject(&grade.subject_id).await? else {
            return Ok(None);
        };
        Ok(Some(GradeWithSubject { grade, subject }))
    }

    pub async fn grades_by_subject(
        &self,
        subject_id: &str,
    ) -> Result<Vec<GradeWithSubject>, AppError> {
        let Some(subject) = self.storage.get_subject(subject_id).await? else {
            return Ok(Vec::new());
        };
        let grades = self.storage.list_grades().await?;

        Ok(grades
            .into_iter()
            .filter(|g| g.subject_id == subject_id)
            .map(|grade| GradeWithSubject {
                grade,
                subject: subject.clone(),
            })
            .collect())
    }

    pub async fn recent_grades(&self, limit: usize) -> Result<Vec<GradeWithSubject>, AppError> {
        let mut grades = self.storage.list_grades().await?;
        let subjects = self.subject_index().await?;

        grades.sort_by(|a, b| b.exam_date.cmp(&a.exam_date));
        Ok(grades
            .into_iter()
            .take(limit)
            .filter_map(|grade| {
                let subject = subjects.get(&grade.subject_id)?.clone();
                Some(GradeWithSubject { grade, subject })
            })
            .collect())
    }

    pub async fn subject_average(&self, subject_id: &str) -> Result<Option<f64>, AppError> {
        let grades = self.storage.list_grades().await?;
        Ok(stats::subject_average(&grades, subject_id))
    }

    pub async fn overall_average(&self) -> Result<Option<f64>, AppError> {
        let subjects = self.storage.list_subjects().await?;
        let grades = self.storage.list_grades().await?;
        Ok(stats::overall_average(&subjects, &grades))
    }

    pub async fn urgent_tasks(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<TaskWithSubject>, AppError> {
        let tasks = self.storage.list_tasks().await?;
        let subjects = self.subject_index().await?;
        let classes = self.class_index().await?;

        Ok(stats::urgent_tasks(&tasks, now)
            .into_iter()
            .map(|t| Self::join_task(t, &subjects, &classes))
            .collect())
    }

    pub async fn weekly_schedule(&self) -> Result<Vec<ScheduleDay>, AppError> {
        let classes = self.classes_with_subject().await?;
        Ok(stats::weekly_schedule(classes))
    }

    pub async fn dashboard_stats(&self) -> Result<DashboardStats, AppError> {
        let tasks = self.storage.list_tasks().await?;
        let classes = self.classes_with_subject().await?;
        let overall = self.overall_average().await?;
        Ok(stats::dashboard_stats(&tasks, classes.len(), overall))
    }
}
