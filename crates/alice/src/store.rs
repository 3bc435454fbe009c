//! The record store boundary: the courses and assignments the capabilities act on.
//!
//! Work happens inside a [`StoreSession`] obtained from [`RecordStore::begin`].
//! Changes become visible to other sessions only after [`StoreSession::commit`];
//! a session dropped without committing leaves the store untouched.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use thiserror::Error;

pub mod memory;

pub use memory::MemoryStore;

pub const DEFAULT_COURSE_COLOR: &str = "#3B82F6";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("Invalid reference: {0}")]
    InvalidReference(String),

    #[error("Store failure: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, AsRefStr, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AssignmentStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub id: i64,
    pub name: String,
    pub full_name: Option<String>,
    pub description: Option<String>,
    pub color: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewCourse {
    pub name: String,
    pub full_name: Option<String>,
    pub description: Option<String>,
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub due_date: NaiveDateTime,
    pub status: AssignmentStatus,
    /// 1 = low, 2 = medium, 3 = high
    pub priority: u8,
    pub estimated_hours: Option<u32>,
    pub actual_hours: Option<u32>,
    pub class_id: i64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub completed_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewAssignment {
    pub title: String,
    pub description: Option<String>,
    pub due_date: NaiveDateTime,
    pub priority: u8,
    pub estimated_hours: Option<u32>,
    pub class_id: i64,
}

/// Assignment query. Completed assignments are excluded unless `include_completed`
/// is set; date bounds are inclusive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssignmentFilter {
    pub class_id: Option<i64>,
    pub status: Option<AssignmentStatus>,
    pub include_completed: bool,
    pub due_from: Option<NaiveDateTime>,
    pub due_until: Option<NaiveDateTime>,
}

impl AssignmentFilter {
    pub fn matches(&self, assignment: &Assignment) -> bool {
        self.class_id.map_or(true, |id| assignment.class_id == id)
            && self.status.map_or(true, |status| assignment.status == status)
            && (self.include_completed || assignment.status != AssignmentStatus::Completed)
            && self.due_from.map_or(true, |from| assignment.due_date >= from)
            && self.due_until.map_or(true, |until| assignment.due_date <= until)
    }
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn begin(&self) -> StoreResult<Box<dyn StoreSession>>;
}

/// One unit of work against the store
#[async_trait]
pub trait StoreSession: Send + Sync {
    async fn create_course(&mut self, course: NewCourse) -> StoreResult<Course>;

    /// All courses ordered by name
    async fn list_courses(&self) -> StoreResult<Vec<Course>>;

    async fn get_course(&self, id: i64) -> StoreResult<Course>;

    /// Delete a course together with its assignments, returning how many assignments went with it
    async fn delete_course(&mut self, id: i64) -> StoreResult<usize>;

    async fn create_assignment(&mut self, assignment: NewAssignment) -> StoreResult<Assignment>;

    /// Matching assignments ordered by due date
    async fn list_assignments(&self, filter: &AssignmentFilter) -> StoreResult<Vec<Assignment>>;

    async fn get_assignment(&self, id: i64) -> StoreResult<Assignment>;

    async fn save_assignment(&mut self, assignment: Assignment) -> StoreResult<Assignment>;

    async fn delete_assignment(&mut self, id: i64) -> StoreResult<()>;

    async fn commit(self: Box<Self>) -> StoreResult<()>;
}
