pub mod arguments;
pub mod builtin;
pub mod catalog;
pub mod error;
pub mod invoker;
pub mod transport;

pub use catalog::CapabilityCatalog;
pub use invoker::CapabilityInvoker;
pub use transport::ProviderCommand;

use crate::models::tool::Tool;

/// Render the catalog for a model prompt: one bullet per tool followed by its parameters
pub fn render_catalog(tools: &[Tool]) -> String {
    if tools.is_empty() {
        return "No tools available".to_string();
    }

    tools
        .iter()
        .map(|tool| {
            let mut line = format!("• {}: {}", tool.name, tool.description);
            if !tool.parameters.is_empty() {
                let parameters: Vec<String> = tool
                    .parameters
                    .iter()
                    .map(|p| {
                        let mut text = format!("{} ({}", p.name, p.kind);
                        if p.required {
                            text.push_str(", required");
                        }
                        text.push(')');
                        if let Some(description) = &p.description {
                            text.push_str(&format!(" - {}", description));
                        }
                        text
                    })
                    .collect();
                line.push_str(&format!("\n  Parameters: {}", parameters.join(", ")));
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::tool::{ParameterKind, ParameterSpec};

    #[test]
    fn test_render_catalog() {
        let tools = vec![
            Tool::new("get_classes", "Get all classes/subjects"),
            Tool::new("delete_class", "Delete a class")
                .with_parameter(ParameterSpec::required(
                    "class_id",
                    ParameterKind::Integer,
                    "ID of the class",
                ))
                .with_parameter(ParameterSpec {
                    name: "force".to_string(),
                    kind: ParameterKind::Boolean,
                    required: false,
                    description: None,
                }),
        ];

        assert_eq!(
            render_catalog(&tools),
            "• get_classes: Get all classes/subjects\n\
             • delete_class: Delete a class\n  \
             Parameters: class_id (integer, required) - ID of the class, force (boolean)"
        );
    }

    #[test]
    fn test_render_empty_catalog() {
        assert_eq!(render_catalog(&[]), "No tools available");
    }
}
