use tracing::{debug, info, warn};

use crate::capabilities::CapabilityInvoker;
use crate::models::workflow::{AgentWorkflow, StepOutcome};

/// Runs every step of a workflow in order. A failed step is recorded on that
/// step and execution moves on to the next one.
pub struct WorkflowExecutor {
    invoker: CapabilityInvoker,
}

impl WorkflowExecutor {
    pub fn new(invoker: CapabilityInvoker) -> Self {
        Self { invoker }
    }

    pub async fn execute(&self, workflow: &mut AgentWorkflow) {
        for (index, step) in workflow.steps.iter_mut().enumerate() {
            debug!(ordinal = step.ordinal, "executing step: {}", step.description);

            match step.tool_name.clone() {
                Some(tool_name) => {
                    let arguments = step.tool_arguments.get_or_insert_with(Default::default);
                    let result = self.invoker.invoke(&tool_name, arguments).await;
                    if !result.success {
                        warn!(ordinal = step.ordinal, tool = %tool_name, "step failed");
                        step.error = result.error.clone();
                    }
                    step.outcome = Some(StepOutcome::Tool(result));
                }
                None => {
                    step.outcome = Some(StepOutcome::Reasoning {
                        note: format!("Reasoning step: {}", step.description),
                    });
                }
            }

            step.completed = true;
            workflow.current_step = index + 1;
        }

        workflow.completed = workflow.steps.iter().all(|step| step.completed);
        info!(
            steps = workflow.steps.len(),
            succeeded = workflow.successful_steps(),
            "workflow executed"
        );
    }
}
