pub mod class;
pub mod grade;
pub mod study_plan;
pub mod subject;
pub mod task;

pub use class::{Class, ClassType, ClassWithSubject, NewClassRequest, ScheduleDay, UpdateClassRequest, Weekday};
pub use grade::{Grade, GradeWithSubject, NewGradeRequest, UpdateGradeRequest};
pub use study_plan::{StudyPlan, UpsertStudyPlanRequest};
pub use subject::{NewSubjectRequest, Subject, SubjectWithStats, UpdateSubjectRequest};
pub use task::{NewTaskRequest, Task, TaskStatus, TaskWithSubject, UpdateTaskRequest};
