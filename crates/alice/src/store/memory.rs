use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use super::{
    Assignment, AssignmentFilter, Course, NewAssignment, NewCourse, RecordStore, StoreError,
    StoreResult, StoreSession, DEFAULT_COURSE_COLOR,
};

#[derive(Debug, Clone, Default)]
struct StoreState {
    courses: BTreeMap<i64, Course>,
    assignments: BTreeMap<i64, Assignment>,
    last_course_id: i64,
    last_assignment_id: i64,
}

/// In-process record store. Sessions run one at a time against a private working
/// copy that replaces the shared state on commit.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<StoreState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn begin(&self) -> StoreResult<Box<dyn StoreSession>> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemorySession { guard, working }))
    }
}

struct MemorySession {
    guard: OwnedMutexGuard<StoreState>,
    working: StoreState,
}

fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

#[async_trait]
impl StoreSession for MemorySession {
    async fn create_course(&mut self, course: NewCourse) -> StoreResult<Course> {
        self.working.last_course_id += 1;
        let created_at = now();
        let course = Course {
            id: self.working.last_course_id,
            name: course.name,
            full_name: course.full_name,
            description: course.description,
            color: course
                .color
                .unwrap_or_else(|| DEFAULT_COURSE_COLOR.to_string()),
            created_at,
            updated_at: created_at,
        };
        self.working.courses.insert(course.id, course.clone());
        Ok(course)
    }

    async fn list_courses(&self) -> StoreResult<Vec<Course>> {
        let mut courses: Vec<Course> = self.working.courses.values().cloned().collect();
        courses.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(courses)
    }

    async fn get_course(&self, id: i64) -> StoreResult<Course> {
        self.working
            .courses
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound { entity: "Class", id })
    }

    async fn delete_course(&mut self, id: i64) -> StoreResult<usize> {
        if self.working.courses.remove(&id).is_none() {
            return Err(StoreError::NotFound { entity: "Class", id });
        }
        let before = self.working.assignments.len();
        self.working.assignments.retain(|_, a| a.class_id != id);
        Ok(before - self.working.assignments.len())
    }

    async fn create_assignment(&mut self, assignment: NewAssignment) -> StoreResult<Assignment> {
        if !self.working.courses.contains_key(&assignment.class_id) {
            return Err(StoreError::InvalidReference(format!(
                "class {} does not exist",
                assignment.class_id
            )));
        }

        self.working.last_assignment_id += 1;
        let created_at = now();
        let assignment = Assignment {
            id: self.working.last_assignment_id,
            title: assignment.title,
            description: assignment.description,
            due_date: assignment.due_date,
            status: Default::default(),
            priority: assignment.priority,
            estimated_hours: assignment.estimated_hours,
            actual_hours: None,
            class_id: assignment.class_id,
            created_at,
            updated_at: created_at,
            completed_at: None,
        };
        self.working
            .assignments
            .insert(assignment.id, assignment.clone());
        Ok(assignment)
    }

    async fn list_assignments(&self, filter: &AssignmentFilter) -> StoreResult<Vec<Assignment>> {
        let mut assignments: Vec<Assignment> = self
            .working
            .assignments
            .values()
            .filter(|a| filter.matches(a))
            .cloned()
            .collect();
        assignments.sort_by(|a, b| a.due_date.cmp(&b.due_date).then(a.id.cmp(&b.id)));
        Ok(assignments)
    }

    async fn get_assignment(&self, id: i64) -> StoreResult<Assignment> {
        self.working
            .assignments
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound {
                entity: "Assignment",
                id,
            })
    }

    async fn save_assignment(&mut self, mut assignment: Assignment) -> StoreResult<Assignment> {
        if !self.working.assignments.contains_key(&assignment.id) {
            return Err(StoreError::NotFound {
                entity: "Assignment",
                id: assignment.id,
            });
        }
        if !self.working.courses.contains_key(&assignment.class_id) {
            return Err(StoreError::InvalidReference(format!(
                "class {} does not exist",
                assignment.class_id
            )));
        }

        assignment.updated_at = now();
        self.working
            .assignments
            .insert(assignment.id, assignment.clone());
        Ok(assignment)
    }

    async fn delete_assignment(&mut self, id: i64) -> StoreResult<()> {
        self.working
            .assignments
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound {
                entity: "Assignment",
                id,
            })
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let MemorySession { mut guard, working } = *self;
        debug!(
            courses = working.courses.len(),
            assignments = working.assignments.len(),
            "memory store commit"
        );
        *guard = working;
        Ok(())
    }
}
