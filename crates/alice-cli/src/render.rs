use alice::agent::{AgentKind, AssistantStatus, ChatOutcome, GenerationReport};
use anyhow::{anyhow, Result};
use bat::WrappingMode;
use console::style;
use serde_json::Value;

const THEME: &str = "zenburn";

pub fn print_markdown(content: &str) -> Result<()> {
    bat::PrettyPrinter::new()
        .input(bat::Input::from_bytes(content.as_bytes()))
        .theme(THEME)
        .language("Markdown")
        .wrapping_mode(WrappingMode::Character)
        .print()
        .map_err(|e| anyhow!("failed to render reply: {}", e))?;
    println!();
    Ok(())
}

pub fn print_outcome(outcome: &ChatOutcome) -> Result<()> {
    print_markdown(&outcome.response)?;
    if let Some(footer) = outcome_footer(outcome) {
        println!("{}", style(footer).dim());
    }
    Ok(())
}

/// One dim line describing how the reply was produced
pub fn outcome_footer(outcome: &ChatOutcome) -> Option<String> {
    match outcome.agent {
        AgentKind::General => None,
        AgentKind::Fallback => Some("─── fallback mode: no model available ───".to_string()),
        AgentKind::MultiStep => {
            let steps = outcome
                .metadata
                .get("workflow_steps")
                .and_then(Value::as_u64)
                .unwrap_or(0);
            let tools: Vec<&str> = outcome
                .metadata
                .get("tools_used")
                .and_then(Value::as_array)
                .map(|tools| tools.iter().filter_map(Value::as_str).collect())
                .unwrap_or_default();
            let success = outcome
                .metadata
                .get("success")
                .and_then(Value::as_bool)
                .unwrap_or(false);

            let mut footer = format!("─── {} step(s)", steps);
            if !tools.is_empty() {
                footer.push_str(&format!(" | {}", tools.join(", ")));
            }
            if !success {
                footer.push_str(" | some steps failed");
            }
            footer.push_str(" ───");
            Some(footer)
        }
    }
}

pub fn print_report(report: &GenerationReport) -> Result<()> {
    print_markdown(&report.response)?;
    let lines = created_lines(report);
    if lines.is_empty() {
        println!("{}", style("Nothing was created.").dim());
    }
    for line in lines {
        println!("{}", line);
    }
    Ok(())
}

/// One line per record a syllabus parse or generation created
pub fn created_lines(report: &GenerationReport) -> Vec<String> {
    let classes = report
        .classes
        .iter()
        .map(|c| format!("+ class {} [id {}]", c.name, c.id));
    let assignments = report.assignments.iter().map(|a| {
        format!(
            "+ assignment {} (due {}) [id {}]",
            a.title,
            a.due_date.format("%Y-%m-%d %H:%M"),
            a.id
        )
    });
    classes.chain(assignments).collect()
}

pub fn print_status(status: &AssistantStatus) {
    let availability = if status.current_model_available {
        style("connected").green()
    } else {
        style("not connected").red()
    };
    println!("Model: {} ({})", style(&status.current_model).bold(), availability);
    println!("Tools: {}", status.tool_count);
    println!();
    print_models(status);
}

pub fn print_models(status: &AssistantStatus) {
    for model in &status.models {
        let marker = if model.available {
            style("✓").green()
        } else {
            style("✗").red()
        };
        let current = if model.key == status.current_model {
            style(" (current)").cyan().to_string()
        } else {
            String::new()
        };
        println!(
            "{} {}{} {}",
            marker,
            model.key,
            current,
            style(&model.description).dim()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map};

    fn outcome(agent: AgentKind, metadata: Value) -> ChatOutcome {
        let metadata: Map<String, Value> = metadata.as_object().cloned().unwrap_or_default();
        ChatOutcome {
            response: "ok".to_string(),
            agent,
            action_taken: false,
            metadata,
        }
    }

    #[test]
    fn test_footer_for_workflow() {
        let outcome = outcome(
            AgentKind::MultiStep,
            json!({"workflow_steps": 2, "tools_used": ["create_class", "get_classes"], "success": true}),
        );
        assert_eq!(
            outcome_footer(&outcome).unwrap(),
            "─── 2 step(s) | create_class, get_classes ───"
        );
    }

    #[test]
    fn test_footer_flags_failures() {
        let outcome = outcome(
            AgentKind::MultiStep,
            json!({"workflow_steps": 1, "tools_used": [], "success": false}),
        );
        assert_eq!(
            outcome_footer(&outcome).unwrap(),
            "─── 1 step(s) | some steps failed ───"
        );
    }

    #[test]
    fn test_no_footer_for_conversation() {
        assert!(outcome_footer(&outcome(AgentKind::General, json!({}))).is_none());
        assert!(outcome_footer(&outcome(AgentKind::Fallback, json!({})))
            .unwrap()
            .contains("fallback"));
    }

    #[test]
    fn test_created_lines() {
        let report = GenerationReport {
            response: "done".to_string(),
            agent: AgentKind::Fallback,
            classes: vec![serde_json::from_value(json!({
                "id": 1, "name": "PARSED 101", "full_name": null, "description": null,
                "color": "#3B82F6", "created_at": "2024-09-01T10:00:00",
                "updated_at": "2024-09-01T10:00:00"
            }))
            .unwrap()],
            assignments: vec![serde_json::from_value(json!({
                "id": 4, "title": "Midterm", "description": null,
                "due_date": "2024-10-20T09:30:00", "status": "not_started", "priority": 2,
                "estimated_hours": 5, "actual_hours": null, "class_id": 1,
                "created_at": "2024-09-01T10:00:00", "updated_at": "2024-09-01T10:00:00",
                "completed_at": null
            }))
            .unwrap()],
            metadata: Map::new(),
        };

        assert_eq!(
            created_lines(&report),
            vec![
                "+ class PARSED 101 [id 1]",
                "+ assignment Midterm (due 2024-10-20 09:30) [id 4]",
            ]
        );
    }
}
