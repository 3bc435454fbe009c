use chrono::{Duration as ChronoDuration, Local, NaiveTime, Utc};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

use super::arguments::{
    end_of_day, flag, hours, optional_datetime, optional_id, optional_str, parse_datetime,
    priority, required_id, required_str, Arguments, DayBound,
};
use super::builtin::{
    CREATE_ASSIGNMENT, CREATE_CLASS, DELETE_ASSIGNMENT, DELETE_CLASS, GET_ASSIGNMENTS,
    GET_CALENDAR_VIEW, GET_CLASSES, UPDATE_ASSIGNMENT_STATUS,
};
use super::catalog::CapabilityCatalog;
use crate::errors::{AgentError, AgentResult};
use crate::models::tool::{Tool, ToolResult};
use crate::store::{
    Assignment, AssignmentFilter, AssignmentStatus, Course, NewAssignment, NewCourse,
    RecordStore, StoreError, StoreSession,
};

const CALENDAR_WINDOW_DAYS: i64 = 30;

impl From<StoreError> for AgentError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Backend(_) => AgentError::Internal(error.to_string()),
            _ => AgentError::ExecutionError(error.to_string()),
        }
    }
}

/// Runs one named capability against the record store.
///
/// Every call gets its own store session which is committed only when the
/// handler succeeds. Failures of any kind come back as a failed [`ToolResult`].
pub struct CapabilityInvoker {
    catalog: Arc<CapabilityCatalog>,
    store: Arc<dyn RecordStore>,
}

impl CapabilityInvoker {
    pub fn new(catalog: Arc<CapabilityCatalog>, store: Arc<dyn RecordStore>) -> Self {
        Self { catalog, store }
    }

    pub async fn invoke(&self, tool_name: &str, arguments: &Arguments) -> ToolResult {
        let start = Instant::now();
        let outcome = self.dispatch(tool_name, arguments).await;
        let elapsed = start.elapsed();

        match outcome {
            Ok(value) => {
                debug!(tool = tool_name, elapsed_ms = elapsed.as_millis() as u64, "tool succeeded");
                ToolResult::succeeded(tool_name, value, elapsed)
            }
            Err(error) => {
                warn!(tool = tool_name, error = %error, "tool failed");
                ToolResult::failed(tool_name, &error, elapsed)
            }
        }
    }

    async fn dispatch(&self, tool_name: &str, args: &Arguments) -> AgentResult<Value> {
        let tool = self
            .catalog
            .find(tool_name)
            .await
            .ok_or_else(|| AgentError::ToolNotFound(tool_name.to_string()))?;
        check_required(&tool, args)?;

        let mut session = self.store.begin().await?;
        let store = session.as_mut();
        let value = match tool_name {
            CREATE_CLASS => create_class(store, args).await?,
            GET_CLASSES => get_classes(store).await?,
            CREATE_ASSIGNMENT => create_assignment(store, args).await?,
            GET_ASSIGNMENTS => get_assignments(store, args).await?,
            UPDATE_ASSIGNMENT_STATUS => update_assignment_status(store, args).await?,
            GET_CALENDAR_VIEW => get_calendar_view(store, args).await?,
            DELETE_ASSIGNMENT => delete_assignment(store, args).await?,
            DELETE_CLASS => delete_class(store, args).await?,
            other => {
                return Err(AgentError::ExecutionError(format!(
                    "No handler for tool '{}'",
                    other
                )))
            }
        };
        session.commit().await?;
        Ok(value)
    }
}

fn check_required(tool: &Tool, args: &Arguments) -> AgentResult<()> {
    let missing: Vec<&str> = tool
        .required_parameters()
        .filter(|name| args.get(*name).map_or(true, Value::is_null))
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(AgentError::InvalidParameters(format!(
            "Missing required parameter(s) for {}: {}",
            tool.name,
            missing.join(", ")
        )))
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> AgentResult<Value> {
    serde_json::to_value(value).map_err(|e| AgentError::Internal(e.to_string()))
}

fn with_adjustments(mut value: Value, adjustments: Vec<String>) -> Value {
    if !adjustments.is_empty() {
        value["adjustments"] = json!(adjustments);
    }
    value
}

fn parse_status(text: &str) -> AgentResult<AssignmentStatus> {
    text.parse().map_err(|_| {
        AgentError::InvalidParameters(format!(
            "Invalid status '{}': expected not_started, in_progress or completed",
            text
        ))
    })
}

async fn create_class(store: &mut dyn StoreSession, args: &Arguments) -> AgentResult<Value> {
    let course = store
        .create_course(NewCourse {
            name: required_str(args, "name")?,
            full_name: optional_str(args, "full_name"),
            description: optional_str(args, "description"),
            color: optional_str(args, "color"),
        })
        .await?;

    Ok(json!({
        "id": course.id,
        "message": format!("Created class '{}'", course.name),
    }))
}

async fn get_classes(store: &mut dyn StoreSession) -> AgentResult<Value> {
    to_json(&store.list_courses().await?)
}

async fn create_assignment(store: &mut dyn StoreSession, args: &Arguments) -> AgentResult<Value> {
    let mut adjustments = Vec::new();

    let (priority, note) = priority(args);
    adjustments.extend(note);
    let (estimated_hours, note) = hours(args, "estimated_hours");
    adjustments.extend(note);

    let title = required_str(args, "title")?;
    let assignment = store
        .create_assignment(NewAssignment {
            description: optional_str(args, "description"),
            due_date: parse_datetime(&required_str(args, "due_date")?, DayBound::Start)?,
            priority,
            estimated_hours,
            class_id: required_id(args, "class_id")?,
            title,
        })
        .await?;

    for note in &adjustments {
        warn!(assignment = assignment.id, "{}", note);
    }

    Ok(with_adjustments(
        json!({
            "id": assignment.id,
            "message": format!("Created assignment '{}'", assignment.title),
        }),
        adjustments,
    ))
}

fn assignment_row(assignment: &Assignment, courses: &HashMap<i64, Course>) -> AgentResult<Value> {
    let mut row = to_json(assignment)?;
    let course = courses.get(&assignment.class_id);
    row["class_name"] = json!(course.map(|c| c.name.as_str()));
    row["class_color"] = json!(course.map(|c| c.color.as_str()));
    Ok(row)
}

async fn course_index(store: &mut dyn StoreSession) -> AgentResult<HashMap<i64, Course>> {
    Ok(store
        .list_courses()
        .await?
        .into_iter()
        .map(|course| (course.id, course))
        .collect())
}

async fn get_assignments(store: &mut dyn StoreSession, args: &Arguments) -> AgentResult<Value> {
    let status = optional_str(args, "status")
        .map(|text| parse_status(&text))
        .transpose()?;

    let filter = AssignmentFilter {
        class_id: optional_id(args, "class_id")?,
        status,
        // Asking for completed assignments by status implies including them
        include_completed: flag(args, "include_completed", false)
            || status == Some(AssignmentStatus::Completed),
        due_from: optional_datetime(args, "start_date", DayBound::Start)?,
        due_until: optional_datetime(args, "end_date", DayBound::End)?,
    };

    let courses = course_index(store).await?;
    let rows = store
        .list_assignments(&filter)
        .await?
        .iter()
        .map(|assignment| assignment_row(assignment, &courses))
        .collect::<AgentResult<Vec<_>>>()?;
    Ok(Value::Array(rows))
}

async fn update_assignment_status(
    store: &mut dyn StoreSession,
    args: &Arguments,
) -> AgentResult<Value> {
    let id = required_id(args, "assignment_id")?;
    let status = parse_status(&required_str(args, "status")?)?;
    let (actual_hours, note) = hours(args, "actual_hours");

    let mut assignment = store.get_assignment(id).await?;
    assignment.status = status;
    assignment.completed_at = match status {
        AssignmentStatus::Completed => Some(Utc::now().naive_utc()),
        _ => None,
    };
    if actual_hours.is_some() {
        assignment.actual_hours = actual_hours;
    }
    store.save_assignment(assignment).await?;

    if let Some(note) = &note {
        warn!(assignment = id, "{}", note);
    }

    Ok(with_adjustments(
        json!({ "message": format!("Updated assignment {} status to {}", id, status) }),
        note.into_iter().collect(),
    ))
}

async fn get_calendar_view(store: &mut dyn StoreSession, args: &Arguments) -> AgentResult<Value> {
    let start = optional_datetime(args, "start_date", DayBound::Start)?
        .unwrap_or_else(|| Local::now().date_naive().and_time(NaiveTime::MIN));
    let end = optional_datetime(args, "end_date", DayBound::End)?.unwrap_or_else(|| {
        (start.date() + ChronoDuration::days(CALENDAR_WINDOW_DAYS)).and_time(end_of_day())
    });

    let filter = AssignmentFilter {
        include_completed: flag(args, "include_completed", false),
        due_from: Some(start),
        due_until: Some(end),
        ..Default::default()
    };

    let courses = course_index(store).await?;
    let rows: Vec<Value> = store
        .list_assignments(&filter)
        .await?
        .iter()
        .map(|a| {
            let course = courses.get(&a.class_id);
            json!({
                "id": a.id,
                "title": a.title,
                "due_date": a.due_date,
                "status": a.status,
                "class_name": course.map(|c| c.name.as_str()),
                "class_color": course.map(|c| c.color.as_str()),
            })
        })
        .collect();
    Ok(Value::Array(rows))
}

async fn delete_assignment(store: &mut dyn StoreSession, args: &Arguments) -> AgentResult<Value> {
    let id = required_id(args, "assignment_id")?;
    store.delete_assignment(id).await?;
    Ok(json!({ "message": format!("Deleted assignment {}", id) }))
}

async fn delete_class(store: &mut dyn StoreSession, args: &Arguments) -> AgentResult<Value> {
    let id = required_id(args, "class_id")?;
    let removed = store.delete_course(id).await?;
    Ok(json!({
        "message": format!("Deleted class {} and all its assignments", id),
        "assignments_removed": removed,
    }))
}
