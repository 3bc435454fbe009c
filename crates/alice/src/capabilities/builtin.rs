use crate::models::tool::{ParameterKind, ParameterSpec, Tool};

pub const CREATE_CLASS: &str = "create_class";
pub const GET_CLASSES: &str = "get_classes";
pub const CREATE_ASSIGNMENT: &str = "create_assignment";
pub const GET_ASSIGNMENTS: &str = "get_assignments";
pub const UPDATE_ASSIGNMENT_STATUS: &str = "update_assignment_status";
pub const GET_CALENDAR_VIEW: &str = "get_calendar_view";
pub const DELETE_ASSIGNMENT: &str = "delete_assignment";
pub const DELETE_CLASS: &str = "delete_class";

/// The capabilities the record store supports. This is also what the capability
/// provider process publishes, so either source yields the same catalog.
pub fn builtin_tools() -> Vec<Tool> {
    vec![
        Tool::new(
            CREATE_CLASS,
            "Create a new class/subject for organizing assignments",
        )
        .with_parameter(ParameterSpec::required(
            "name",
            ParameterKind::String,
            "Class code (e.g., 'ICS 211')",
        ))
        .with_parameter(ParameterSpec::optional(
            "full_name",
            ParameterKind::String,
            "Full class name (optional)",
        ))
        .with_parameter(ParameterSpec::optional(
            "description",
            ParameterKind::String,
            "Class description (optional)",
        ))
        .with_parameter(ParameterSpec::optional(
            "color",
            ParameterKind::String,
            "Hex color code for UI (optional)",
        )),
        Tool::new(GET_CLASSES, "Get all classes/subjects"),
        Tool::new(CREATE_ASSIGNMENT, "Create a new assignment for a class")
            .with_parameter(ParameterSpec::required(
                "title",
                ParameterKind::String,
                "Assignment title",
            ))
            .with_parameter(ParameterSpec::optional(
                "description",
                ParameterKind::String,
                "Assignment description (optional)",
            ))
            .with_parameter(ParameterSpec::required(
                "due_date",
                ParameterKind::String,
                "Due date in ISO format (YYYY-MM-DD or YYYY-MM-DD HH:MM:SS)",
            ))
            .with_parameter(ParameterSpec::required(
                "class_id",
                ParameterKind::Integer,
                "ID of the class this assignment belongs to",
            ))
            .with_parameter(ParameterSpec::optional(
                "priority",
                ParameterKind::Integer,
                "Priority level (1=Low, 2=Medium, 3=High, defaults to 1)",
            ))
            .with_parameter(ParameterSpec::optional(
                "estimated_hours",
                ParameterKind::Integer,
                "Estimated hours to complete (optional)",
            )),
        Tool::new(GET_ASSIGNMENTS, "Get assignments with optional filtering")
            .with_parameter(ParameterSpec::optional(
                "class_id",
                ParameterKind::Integer,
                "Filter by class ID (optional)",
            ))
            .with_parameter(ParameterSpec::optional(
                "status",
                ParameterKind::String,
                "Filter by status: not_started, in_progress, completed (optional)",
            ))
            .with_parameter(ParameterSpec::optional(
                "include_completed",
                ParameterKind::Boolean,
                "Include completed assignments (defaults to false)",
            ))
            .with_parameter(ParameterSpec::optional(
                "start_date",
                ParameterKind::String,
                "Start date for filtering (ISO format, optional)",
            ))
            .with_parameter(ParameterSpec::optional(
                "end_date",
                ParameterKind::String,
                "End date for filtering (ISO format, optional)",
            )),
        Tool::new(UPDATE_ASSIGNMENT_STATUS, "Update the status of an assignment")
            .with_parameter(ParameterSpec::required(
                "assignment_id",
                ParameterKind::Integer,
                "ID of the assignment to update",
            ))
            .with_parameter(ParameterSpec::required(
                "status",
                ParameterKind::String,
                "New status: not_started, in_progress, completed",
            ))
            .with_parameter(ParameterSpec::optional(
                "actual_hours",
                ParameterKind::Integer,
                "Actual hours spent (optional, for completed assignments)",
            )),
        Tool::new(
            GET_CALENDAR_VIEW,
            "Get assignments organized by date for calendar view",
        )
        .with_parameter(ParameterSpec::optional(
            "start_date",
            ParameterKind::String,
            "Start date (ISO format, defaults to today)",
        ))
        .with_parameter(ParameterSpec::optional(
            "end_date",
            ParameterKind::String,
            "End date (ISO format, defaults to 30 days from start)",
        ))
        .with_parameter(ParameterSpec::optional(
            "include_completed",
            ParameterKind::Boolean,
            "Include completed assignments (defaults to false)",
        )),
        Tool::new(DELETE_ASSIGNMENT, "Delete an assignment").with_parameter(
            ParameterSpec::required("assignment_id", ParameterKind::Integer, "ID of the assignment to delete"),
        ),
        Tool::new(DELETE_CLASS, "Delete a class and all its assignments").with_parameter(
            ParameterSpec::required("class_id", ParameterKind::Integer, "ID of the class to delete"),
        ),
    ]
}
