//! Read-only aggregation over entity snapshots: weighted averages, task
//! progress, urgency ordering, schedule buckets, dashboard counters.
//!
//! Every function here is pure and total: defined for empty inputs, no I/O,
//! no stored derived state. "No data" is an explicit `None`, never zero —
//! the single exception is the dashboard's `general_average`, which the UI
//! expects as `0` when no grade exists anywhere.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::models::{Class, ClassWithSubject, Grade, ScheduleDay, Subject, SubjectWithStats, Task, TaskStatus, Weekday};

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Weighted average of a subject's grades on a 0-10 scale, rounded to two
/// decimals. Each score is normalized by its own `max_score` before the
/// weight applies. Absent when the subject has no grades or the weights sum
/// to zero.
pub fn subject_average(grades: &[Grade], subject_id: &str) -> Option<f64> {
    let subject_grades: Vec<&Grade> = grades
        .iter()
        .filter(|g| g.subject_id == subject_id)
        .collect();
    if subject_grades.is_empty() {
        return None;
    }

    let total_weight: f64 = subject_grades.iter().map(|g| g.weight).sum();
    if total_weight == 0.0 {
        return None;
    }

    let weighted_sum: f64 = subject_grades
        .iter()
        .map(|g| (g.score / g.max_score) * 10.0 * g.weight)
        .sum();

    Some(round2(weighted_sum / total_weight))
}

/// Unweighted mean of the per-subject averages that exist. A subject with
/// one grade counts as much as a subject with twenty; subjects with no
/// average are excluded rather than counted as zero.
pub fn overall_average(subjects: &[Subject], grades: &[Grade]) -> Option<f64> {
    let averages: Vec<f64> = subjects
        .iter()
        .filter_map(|s| subject_average(grades, &s.id))
        .collect();
    if averages.is_empty() {
        return None;
    }

    let sum: f64 = averages.iter().sum();
    Some(round2(sum / averages.len() as f64))
}

/// Completed-over-total as a whole percentage; 0 when there are no tasks.
pub fn progress_percentage(completed: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    ((completed as f64 / total as f64) * 100.0).round() as u32
}

/// Derived card values for one subject.
pub fn subject_stats(
    subject: &Subject,
    tasks: &[Task],
    classes: &[Class],
    grades: &[Grade],
) -> SubjectWithStats {
    let subject_tasks: Vec<&Task> = tasks
        .iter()
        .filter(|t| t.subject_id.as_deref() == Some(subject.id.as_str()))
        .collect();
    let completed_tasks = subject_tasks
        .iter()
        .filter(|t| t.status == TaskStatus::Concluido)
        .count();
    let total_tasks = subject_tasks.len();
    // Each Class row is one weekly recurring slot, never multiplied by weeks.
    let weekly_classes = classes
        .iter()
        .filter(|c| c.subject_id == subject.id)
        .count();

    SubjectWithStats {
        subject: subject.clone(),
        completed_tasks,
        total_tasks,
        progress_percentage: progress_percentage(completed_tasks, total_tasks),
        average_grade: subject_average(grades, &subject.id),
        weekly_classes,
    }
}

/// Incomplete tasks due within the next 24 hours, overdue included, in
/// ascending due-date order. Ties keep their encounter order (stable sort).
/// Display truncation is the caller's concern.
pub fn urgent_tasks(tasks: &[Task], now: DateTime<Utc>) -> Vec<Task> {
    let cutoff = now + Duration::hours(24);
    let mut urgent: Vec<Task> = tasks
        .iter()
        .filter(|t| t.status != TaskStatus::Concluido)
        .filter(|t| t.due_date.is_some_and(|due| due <= cutoff))
        .cloned()
        .collect();
    urgent.sort_by(|a, b| a.due_date.cmp(&b.due_date));
    urgent
}

/// Classes bucketed per weekday in Segunda..Domingo order, each day sorted
/// by start time (lexicographic on zero-padded HH:MM).
pub fn weekly_schedule(classes: Vec<ClassWithSubject>) -> Vec<ScheduleDay> {
    Weekday::ALL
        .into_iter()
        .map(|day| {
            let mut bucket: Vec<ClassWithSubject> = classes
                .iter()
                .filter(|c| c.class.day_of_week == day)
                .cloned()
                .collect();
            bucket.sort_by(|a, b| a.class.start_time.cmp(&b.class.start_time));
            ScheduleDay {
                day_of_week: day,
                classes: bucket,
            }
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub pending_tasks: usize,
    pub general_average: f64,
    pub weekly_classes: usize,
    pub weekly_progress: u32,
    pub total_tasks: usize,
    pub completed_tasks: usize,
    pub in_progress_tasks: usize,
}

/// Summary counters for the dashboard header. `general_average` substitutes
/// 0 for an absent overall average; everywhere else absence stays absent.
pub fn dashboard_stats(
    tasks: &[Task],
    class_count: usize,
    general_average: Option<f64>,
) -> DashboardStats {
    let completed = tasks
        .iter()
        .filter(|t| t.status == TaskStatus::Concluido)
        .count();

    DashboardStats {
        pending_tasks: tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Pendente)
            .count(),
        general_average: general_average.unwrap_or(0.0),
        weekly_classes: class_count,
        weekly_progress: progress_percentage(completed, tasks.len()),
        total_tasks: tasks.len(),
        completed_tasks: completed,
        in_progress_tasks: tasks
            .iter()
            .filter(|t| t.status == TaskStatus::EmAndamento)
            .count(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ClassType;

    fn subject(id: &str) -> Subject {
        Subject {
            id: id.to_string(),
            name: format!("Subject {}", id),
            code: None,
            color: "#2563EB".to_string(),
            semester: 6,
            created_at: Utc::now(),
        }
    }

    fn grade(subject_id: &str, score: f64, max_score: f64, weight: f64) -> Grade {
        Grade {
            id: uuid::Uuid::new_v4().to_string(),
            subject_id: subject_id.to_string(),
            exam_name: "Prova".to_string(),
            score,
            max_score,
            weight,
            exam_date: Utc::now(),
            created_at: Utc::now(),
        }
    }

    fn task(
        id: &str,
        subject_id: Option<&str>,
        status: TaskStatus,
        due_date: Option<DateTime<Utc>>,
    ) -> Task {
        Task {
            id: id.to_string(),
            title: format!("Task {}", id),
            description: None,
            subject_id: subject_id.map(str::to_string),
            class_id: None,
            status,
            due_date,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn class_on(subject_id: &str, day: Weekday, start: &str, end: &str) -> Class {
        Class {
            id: uuid::Uuid::new_v4().to_string(),
            subject_id: subject_id.to_string(),
            day_of_week: day,
            start_time: start.to_string(),
            end_time: end.to_string(),
            kind: ClassType::AulaExpositiva,
            location: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn subject_average_is_absent_without_grades() {
        assert_eq!(subject_average(&[], "s1"), None);
        let grades = [grade("other", 8.0, 10.0, 1.0)];
        assert_eq!(subject_average(&grades, "s1"), None);
    }

    #[test]
    fn subject_average_weights_normalized_scores() {
        let grades = [
            grade("s1", 8.5, 10.0, 40.0),
            grade("s1", 9.2, 10.0, 30.0),
        ];
        // (8.5*40 + 9.2*30) / 70
        assert_eq!(subject_average(&grades, "s1"), Some(8.8));
    }

    #[test]
    fn subject_average_normalizes_by_max_score() {
        let grades = [grade("s1", 45.0, 50.0, 1.0)];
        assert_eq!(subject_average(&grades, "s1"), Some(9.0));
    }

    #[test]
    fn zero_weight_sum_yields_absent_not_a_crash() {
        let grades = [grade("s1", 7.0, 10.0, 0.0)];
        assert_eq!(subject_average(&grades, "s1"), None);
    }

    #[test]
    fn subject_average_stays_within_scale() {
        let grades = [
            grade("s1", 0.0, 10.0, 2.0),
            grade("s1", 10.0, 10.0, 3.0),
            grade("s1", 37.5, 50.0, 5.0),
        ];
        let avg = subject_average(&grades, "s1").unwrap();
        assert!((0.0..=10.0).contains(&avg));
    }

    #[test]
    fn overall_average_is_absent_without_any_subject_average() {
        assert_eq!(overall_average(&[], &[]), None);
        let subjects = [subject("s1"), subject("s2")];
        assert_eq!(overall_average(&subjects, &[]), None);
    }

    #[test]
    fn gradeless_subject_does_not_change_overall_average() {
        let subjects = [subject("s1"), subject("s2")];
        let grades = [grade("s1", 8.0, 10.0, 1.0)];
        // s2 has no grades and is excluded, not counted as zero.
        assert_eq!(overall_average(&subjects, &grades), Some(8.0));
    }

    #[test]
    fn overall_average_counts_each_subject_equally() {
        // Deliberate double averaging: the per-subject weighted averages are
        // combined as a plain mean, so one grade in s2 balances three in s1.
        let subjects = [subject("s1"), subject("s2")];
        let grades = [
            grade("s1", 10.0, 10.0, 1.0),
            grade("s1", 10.0, 10.0, 1.0),
            grade("s1", 10.0, 10.0, 1.0),
            grade("s2", 6.0, 10.0, 1.0),
        ];
        assert_eq!(overall_average(&subjects, &grades), Some(8.0));
    }

    #[test]
    fn progress_percentage_handles_empty_and_rounds() {
        assert_eq!(progress_percentage(0, 0), 0);
        assert_eq!(progress_percentage(4, 10), 40);
        assert_eq!(progress_percentage(1, 3), 33);
        assert_eq!(progress_percentage(2, 3), 67);
        assert_eq!(progress_percentage(10, 10), 100);
    }

    #[test]
    fn subject_stats_counts_only_own_records() {
        let s = subject("s1");
        let tasks = [
            task("t1", Some("s1"), TaskStatus::Concluido, None),
            task("t2", Some("s1"), TaskStatus::Pendente, None),
            task("t3", Some("s2"), TaskStatus::Concluido, None),
            task("t4", None, TaskStatus::Pendente, None),
        ];
        let classes = [
            class_on("s1", Weekday::Segunda, "08:00", "10:00"),
            class_on("s2", Weekday::Quarta, "08:00", "10:00"),
        ];
        let grades = [grade("s1", 9.0, 10.0, 1.0)];

        let stats = subject_stats(&s, &tasks, &classes, &grades);
        assert_eq!(stats.completed_tasks, 1);
        assert_eq!(stats.total_tasks, 2);
        assert_eq!(stats.progress_percentage, 50);
        assert_eq!(stats.average_grade, Some(9.0));
        assert_eq!(stats.weekly_classes, 1);
    }

    #[test]
    fn urgent_window_is_now_plus_24h_with_overdue_included() {
        let now = Utc::now();
        let tasks = [
            task("in-12h", None, TaskStatus::Pendente, Some(now + Duration::hours(12))),
            task("in-48h", None, TaskStatus::Pendente, Some(now + Duration::hours(48))),
            task("overdue", None, TaskStatus::EmAndamento, Some(now - Duration::days(2))),
            task("done", None, TaskStatus::Concluido, Some(now + Duration::hours(1))),
            task("undated", None, TaskStatus::Pendente, None),
        ];

        let urgent = urgent_tasks(&tasks, now);
        let ids: Vec<&str> = urgent.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["overdue", "in-12h"]);
    }

    #[test]
    fn urgent_tasks_never_contain_completed_ones() {
        let now = Utc::now();
        let tasks = [
            task("done1", None, TaskStatus::Concluido, Some(now - Duration::hours(2))),
            task("done2", None, TaskStatus::Concluido, Some(now + Duration::hours(2))),
        ];
        assert!(urgent_tasks(&tasks, now).is_empty());
    }

    #[test]
    fn urgent_ties_keep_encounter_order() {
        let now = Utc::now();
        let due = Some(now + Duration::hours(3));
        let tasks = [
            task("first", None, TaskStatus::Pendente, due),
            task("second", None, TaskStatus::EmAndamento, due),
            task("third", None, TaskStatus::Pendente, due),
        ];
        let ids: Vec<String> = urgent_tasks(&tasks, now)
            .into_iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, vec!["first", "second", "third"]);
    }

    #[test]
    fn schedule_buckets_are_week_ordered_and_time_sorted() {
        let s = subject("s1");
        let mk = |day, start: &str, end: &str| ClassWithSubject {
            class: class_on("s1", day, start, end),
            subject: s.clone(),
        };
        let schedule = weekly_schedule(vec![
            mk(Weekday::Sexta, "08:00", "12:00"),
            mk(Weekday::Segunda, "14:00", "16:00"),
            mk(Weekday::Segunda, "08:00", "10:00"),
        ]);

        assert_eq!(schedule.len(), 7);
        assert_eq!(schedule[0].day_of_week, Weekday::Segunda);
        assert_eq!(schedule[6].day_of_week, Weekday::Domingo);

        let monday: Vec<&str> = schedule[0]
            .classes
            .iter()
            .map(|c| c.class.start_time.as_str())
            .collect();
        assert_eq!(monday, vec!["08:00", "14:00"]);
        assert_eq!(schedule[4].classes.len(), 1);
        assert!(schedule[6].classes.is_empty());
    }

    #[test]
    fn dashboard_counters_and_average_fallback() {
        let tasks = [
            task("t1", None, TaskStatus::Pendente, None),
            task("t2", None, TaskStatus::Pendente, None),
            task("t3", None, TaskStatus::EmAndamento, None),
            task("t4", None, TaskStatus::Concluido, None),
        ];

        let stats = dashboard_stats(&tasks, 6, Some(8.43));
        assert_eq!(stats.pending_tasks, 2);
        assert_eq!(stats.in_progress_tasks, 1);
        assert_eq!(stats.completed_tasks, 1);
        assert_eq!(stats.total_tasks, 4);
        assert_eq!(stats.weekly_progress, 25);
        assert_eq!(stats.weekly_classes, 6);
        assert_eq!(stats.general_average, 8.43);

        // Absent overall average is reported as 0 here, and only here.
        let empty = dashboard_stats(&[], 0, None);
        assert_eq!(empty.general_average, 0.0);
        assert_eq!(empty.weekly_progress, 0);
    }
}
