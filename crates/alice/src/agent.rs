use chrono::{Duration as ChronoDuration, Local, NaiveDateTime};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::HashSet;
use std::sync::Arc;
use strum_macros::{AsRefStr, Display};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::capabilities::arguments::end_of_day;
use crate::capabilities::{CapabilityCatalog, CapabilityInvoker};
use crate::credentials::Environment;
use crate::errors::{AgentError, AgentResult};
use crate::executor::WorkflowExecutor;
use crate::models::message::ChatMessage;
use crate::planner::WorkflowPlanner;
use crate::prompt_template::{load_prompt, persona, GENERATE_PROMPT, SYLLABUS_PROMPT};
use crate::providers::client::ModelClient;
use crate::providers::registry::ModelRegistry;
use crate::router::{Intent, IntentRouter};
use crate::store::{
    Assignment, AssignmentFilter, Course, NewAssignment, NewCourse, RecordStore, StoreSession,
};
use crate::synthesizer::ResponseSynthesizer;

pub const FALLBACK_GREETING: &str = "Hi! I'm Alice, your academic assistant. My AI capabilities are limited right now, but I can still help you keep track of your classes and assignments.";

pub const FALLBACK_GUIDANCE: &str = "I'm having trouble with my AI capabilities right now, but I can still help with basic operations. Could you try a more specific request like 'show my assignments' or 'create a new class'?";

pub const GENERATED_CLASS: &str = "AI Generated";
pub const PARSED_CLASS: &str = "PARSED 101";
const SYLLABUS_PLACEHOLDERS: [&str; 3] = ["Assignment 1", "Midterm", "Final Project"];

/// Which path produced a reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, AsRefStr)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum AgentKind {
    General,
    MultiStep,
    Fallback,
}

/// The reply to one user message
#[derive(Debug, Clone, Serialize)]
pub struct ChatOutcome {
    pub response: String,
    pub agent: AgentKind,
    pub action_taken: bool,
    pub metadata: Map<String, Value>,
}

/// What a syllabus parse or an assignment generation left in the store
#[derive(Debug, Clone, Serialize)]
pub struct GenerationReport {
    pub response: String,
    pub agent: AgentKind,
    pub classes: Vec<Course>,
    pub assignments: Vec<Assignment>,
    pub metadata: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelStatus {
    pub key: String,
    pub description: String,
    pub available: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssistantStatus {
    pub current_model: String,
    pub current_model_available: bool,
    pub models: Vec<ModelStatus>,
    pub tool_count: usize,
}

struct ModelSlot {
    key: String,
    client: Option<Arc<ModelClient>>,
}

/// The assistant service. Built once and handed to whatever serves requests;
/// concurrent requests share only the catalog, the store and the current model.
pub struct Assistant {
    registry: ModelRegistry,
    env: Arc<dyn Environment>,
    catalog: Arc<CapabilityCatalog>,
    store: Arc<dyn RecordStore>,
    executor: WorkflowExecutor,
    model: RwLock<ModelSlot>,
}

impl Assistant {
    /// An assistant with no model connected. Every request takes the fallback path
    /// until [`Assistant::switch_model`] succeeds.
    pub fn new(
        registry: ModelRegistry,
        catalog: Arc<CapabilityCatalog>,
        store: Arc<dyn RecordStore>,
        env: Arc<dyn Environment>,
    ) -> Self {
        let key = registry.default_key(None);
        let invoker = CapabilityInvoker::new(Arc::clone(&catalog), Arc::clone(&store));
        Self {
            registry,
            env,
            catalog,
            store,
            executor: WorkflowExecutor::new(invoker),
            model: RwLock::new(ModelSlot { key, client: None }),
        }
    }

    pub fn with_client(mut self, client: ModelClient) -> Self {
        let slot = self.model.get_mut();
        slot.key = client.key().to_string();
        slot.client = Some(Arc::new(client));
        self
    }

    /// Build the assistant and try to connect the preferred model (or the default).
    /// A model that cannot be connected leaves the assistant in fallback mode.
    pub async fn start(
        registry: ModelRegistry,
        preferred: Option<&str>,
        catalog: Arc<CapabilityCatalog>,
        store: Arc<dyn RecordStore>,
        env: Arc<dyn Environment>,
    ) -> Self {
        let key = registry.default_key(preferred);
        if let Some(preferred) = preferred.filter(|p| *p != key) {
            warn!(model = preferred, fallback = %key, "unknown model requested, using default");
        }

        let assistant = Self::new(registry, catalog, store, env);
        match ModelClient::connect(&key, &assistant.registry, assistant.env.as_ref()).await {
            Ok(client) => assistant.with_client(client),
            Err(e) => {
                warn!(model = %key, error = %e, "no model connected, running in fallback mode");
                assistant.model.write().await.key = key;
                assistant
            }
        }
    }

    pub fn catalog(&self) -> &Arc<CapabilityCatalog> {
        &self.catalog
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub async fn current_model(&self) -> String {
        self.model.read().await.key.clone()
    }

    // Snapshot the client so a concurrent switch never affects the request using it
    async fn snapshot(&self) -> (String, Option<Arc<ModelClient>>) {
        let slot = self.model.read().await;
        (slot.key.clone(), slot.client.clone())
    }

    pub async fn chat(&self, message: &str) -> ChatOutcome {
        let (key, client) = self.snapshot().await;

        let intent = IntentRouter::route(client.as_deref(), message).await;
        debug!(%intent, model = %key, "routed request");

        match client {
            None => fallback_outcome(intent, None),
            Some(client) if intent.needs_workflow() => {
                self.run_workflow(client, &key, intent, message).await
            }
            Some(client) => converse(&client, &key, message).await,
        }
    }

    async fn run_workflow(
        &self,
        client: Arc<ModelClient>,
        key: &str,
        intent: Intent,
        message: &str,
    ) -> ChatOutcome {
        let tools = self.catalog.discover().await;

        let mut workflow = WorkflowPlanner::new(Arc::clone(&client))
            .plan(message, &tools)
            .await;
        self.executor.execute(&mut workflow).await;
        let response = ResponseSynthesizer::new(client).synthesize(&workflow).await;
        workflow.final_response = Some(response.clone());

        let tools_used = workflow.tools_used();
        let action_taken = !tools_used.is_empty();
        info!(
            steps = workflow.steps.len(),
            success = workflow.succeeded(),
            action_taken,
            "request handled"
        );

        let mut metadata = Map::new();
        metadata.insert("intent".into(), json!(intent));
        metadata.insert("workflow_steps".into(), json!(workflow.steps.len()));
        metadata.insert("tools_used".into(), json!(tools_used));
        metadata.insert("success".into(), json!(workflow.succeeded()));
        metadata.insert("execution_time_ms".into(), json!(workflow.execution_time_ms()));
        metadata.insert("model".into(), json!(key));

        ChatOutcome {
            response,
            agent: AgentKind::MultiStep,
            action_taken,
            metadata,
        }
    }

    /// Create the classes and assignments described in a syllabus.
    ///
    /// With a model connected the syllabus goes through the plan, execute and
    /// synthesize pipeline and the report lists the records that run created.
    /// Without one, a placeholder class with three placeholder assignments is created.
    pub async fn parse_syllabus(&self, syllabus: &str) -> AgentResult<GenerationReport> {
        let syllabus = non_blank(syllabus, "syllabus")?;
        let (key, client) = self.snapshot().await;
        let Some(client) = client else {
            warn!("no model connected, creating placeholder syllabus records");
            return self.placeholder_syllabus().await;
        };

        let request = load_prompt(SYLLABUS_PROMPT, &json!({ "syllabus": syllabus }))
            .map_err(|e| AgentError::Internal(format!("syllabus prompt: {}", e)))?;
        self.run_directed(client, &key, &request, None).await
    }

    /// Create assignments from a free-form description, optionally inside one class.
    /// Only assignments in `class_id` are reported when it is given.
    pub async fn generate_assignments(
        &self,
        prompt: &str,
        class_id: Option<i64>,
    ) -> AgentResult<GenerationReport> {
        let prompt = non_blank(prompt, "prompt")?;
        let (key, client) = self.snapshot().await;
        let Some(client) = client else {
            warn!("no model connected, creating a placeholder assignment");
            return self.placeholder_assignment(prompt, class_id).await;
        };

        let request = load_prompt(
            GENERATE_PROMPT,
            &json!({ "prompt": prompt, "class_id": class_id }),
        )
        .map_err(|e| AgentError::Internal(format!("generation prompt: {}", e)))?;
        self.run_directed(client, &key, &request, class_id).await
    }

    async fn run_directed(
        &self,
        client: Arc<ModelClient>,
        key: &str,
        request: &str,
        class_id: Option<i64>,
    ) -> AgentResult<GenerationReport> {
        let (courses_before, assignments_before) = self.record_ids().await?;
        let outcome = self.run_workflow(client, key, Intent::Create, request).await;

        let session = self.store.begin().await?;
        let classes: Vec<Course> = session
            .list_courses()
            .await?
            .into_iter()
            .filter(|c| !courses_before.contains(&c.id))
            .collect();
        let assignments: Vec<Assignment> = session
            .list_assignments(&every_assignment())
            .await?
            .into_iter()
            .filter(|a| !assignments_before.contains(&a.id))
            .filter(|a| class_id.map_or(true, |id| a.class_id == id))
            .collect();
        drop(session);

        info!(
            classes = classes.len(),
            assignments = assignments.len(),
            "directed request created records"
        );
        Ok(GenerationReport {
            response: outcome.response,
            agent: outcome.agent,
            classes,
            assignments,
            metadata: outcome.metadata,
        })
    }

    async fn record_ids(&self) -> AgentResult<(HashSet<i64>, HashSet<i64>)> {
        let session = self.store.begin().await?;
        let courses = session.list_courses().await?.iter().map(|c| c.id).collect();
        let assignments = session
            .list_assignments(&every_assignment())
            .await?
            .iter()
            .map(|a| a.id)
            .collect();
        Ok((courses, assignments))
    }

    async fn placeholder_assignment(
        &self,
        prompt: &str,
        class_id: Option<i64>,
    ) -> AgentResult<GenerationReport> {
        let mut session = self.store.begin().await?;
        let mut classes = Vec::new();
        let class_id = match class_id {
            Some(id) => session.get_course(id).await?.id,
            None => {
                let course = session
                    .create_course(NewCourse {
                        name: GENERATED_CLASS.to_string(),
                        full_name: Some("AI Generated Class".to_string()),
                        description: Some("Auto-created for AI-generated assignments".to_string()),
                        color: None,
                    })
                    .await?;
                let id = course.id;
                classes.push(course);
                id
            }
        };

        let gist: String = prompt.chars().take(50).collect();
        let due_date = (Local::now().date_naive() + ChronoDuration::days(7)).and_time(end_of_day());
        let assignment = session
            .create_assignment(NewAssignment {
                title: format!("Generated: {}...", gist),
                description: Some(format!("AI-generated assignment based on: {}", prompt)),
                due_date,
                priority: 2,
                estimated_hours: Some(4),
                class_id,
            })
            .await?;
        session.commit().await?;

        Ok(placeholder_report(classes, vec![assignment]))
    }

    async fn placeholder_syllabus(&self) -> AgentResult<GenerationReport> {
        let mut session = self.store.begin().await?;
        let course = session
            .create_course(NewCourse {
                name: PARSED_CLASS.to_string(),
                full_name: Some("Parsed Course".to_string()),
                description: Some("Auto-created from syllabus parsing".to_string()),
                color: None,
            })
            .await?;

        let now = Local::now().naive_local();
        let mut assignments = Vec::with_capacity(SYLLABUS_PLACEHOLDERS.len());
        for (weeks, title) in (1i64..).zip(SYLLABUS_PLACEHOLDERS) {
            let last = weeks == SYLLABUS_PLACEHOLDERS.len() as i64;
            let assignment = create_placeholder(
                session.as_mut(),
                title,
                now + ChronoDuration::days(weeks * 14),
                if last { (3, 15) } else { (2, 5) },
                course.id,
            )
            .await?;
            assignments.push(assignment);
        }
        session.commit().await?;

        Ok(placeholder_report(vec![course], assignments))
    }

    /// Replace the current model. On failure the previous model stays in place.
    pub async fn switch_model(&self, key: &str) -> AgentResult<bool> {
        self.registry.get_config(key)?;
        if !self.registry.is_available(key, self.env.as_ref()) {
            return Err(AgentError::ModelUnavailable(format!(
                "{}: credentials are not configured",
                key
            )));
        }

        let client = ModelClient::connect(key, &self.registry, self.env.as_ref()).await?;

        let mut slot = self.model.write().await;
        let previous = std::mem::replace(&mut slot.key, key.to_string());
        slot.client = Some(Arc::new(client));
        info!(from = %previous, to = key, "switched model");
        Ok(true)
    }

    pub async fn status(&self) -> AssistantStatus {
        let (current_model, current_model_available) = {
            let slot = self.model.read().await;
            (slot.key.clone(), slot.client.is_some())
        };

        let models = self
            .registry
            .list()
            .into_iter()
            .map(|(key, description)| ModelStatus {
                available: self.registry.is_available(&key, self.env.as_ref()),
                key,
                description,
            })
            .collect();

        AssistantStatus {
            current_model,
            current_model_available,
            models,
            tool_count: self.catalog.discovered_count().await,
        }
    }
}

async fn converse(client: &ModelClient, key: &str, message: &str) -> ChatOutcome {
    let messages = [ChatMessage::system(persona()), ChatMessage::user(message)];
    match client.chat(&messages, None, None).await {
        Ok(reply) if !reply.content.trim().is_empty() => {
            let mut metadata = Map::new();
            metadata.insert("intent".into(), json!(Intent::General));
            metadata.insert("model".into(), json!(key));
            ChatOutcome {
                response: reply.content,
                agent: AgentKind::General,
                action_taken: false,
                metadata,
            }
        }
        Ok(_) => {
            warn!(model = key, "model returned an empty reply");
            fallback_outcome(Intent::General, Some("empty reply".to_string()))
        }
        Err(e) => {
            warn!(model = key, error = %e, "conversation failed");
            fallback_outcome(Intent::General, Some(e.to_string()))
        }
    }
}

/// `model_error` is set when a model was connected but its call failed
fn fallback_outcome(intent: Intent, model_error: Option<String>) -> ChatOutcome {
    let llm_available = model_error.is_some();
    let response = match intent {
        Intent::General => FALLBACK_GREETING,
        Intent::Query | Intent::Create => FALLBACK_GUIDANCE,
    };

    let mut metadata = Map::new();
    metadata.insert("intent".into(), json!(intent));
    metadata.insert("fallback".into(), json!(true));
    metadata.insert("llm_available".into(), json!(llm_available));
    if let Some(error) = model_error {
        metadata.insert("error".into(), json!(error));
    }

    ChatOutcome {
        response: response.to_string(),
        agent: AgentKind::Fallback,
        action_taken: false,
        metadata,
    }
}

fn non_blank<'a>(text: &'a str, what: &str) -> AgentResult<&'a str> {
    let text = text.trim();
    if text.is_empty() {
        return Err(AgentError::InvalidParameters(format!("{} must not be empty", what)));
    }
    Ok(text)
}

fn every_assignment() -> AssignmentFilter {
    AssignmentFilter {
        include_completed: true,
        ..Default::default()
    }
}

async fn create_placeholder(
    session: &mut dyn StoreSession,
    title: &str,
    due_date: NaiveDateTime,
    (priority, hours): (u8, u32),
    class_id: i64,
) -> AgentResult<Assignment> {
    let assignment = session
        .create_assignment(NewAssignment {
            title: title.to_string(),
            description: Some(format!("Extracted from syllabus: {}", title)),
            due_date,
            priority,
            estimated_hours: Some(hours),
            class_id,
        })
        .await?;
    Ok(assignment)
}

fn placeholder_report(classes: Vec<Course>, assignments: Vec<Assignment>) -> GenerationReport {
    let mut metadata = Map::new();
    metadata.insert("fallback".into(), json!(true));
    metadata.insert("llm_available".into(), json!(false));

    GenerationReport {
        response: format!(
            "My AI capabilities are unavailable, so I added {} placeholder class(es) and {} placeholder assignment(s) for you to edit.",
            classes.len(),
            assignments.len()
        ),
        agent: AgentKind::Fallback,
        classes,
        assignments,
        metadata,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::builtin::builtin_tools;
    use crate::capabilities::ProviderCommand;
    use crate::credentials::MockEnvironment;
    use crate::providers::mock::MockProvider;
    use crate::providers::registry::{ModelConfig, ProviderKind};
    use crate::store::MemoryStore;
    use std::env::VarError;

    fn env_with(keys: &'static [&'static str]) -> Arc<dyn Environment> {
        let mut env = MockEnvironment::new();
        env.expect_get_var().returning(move |name| {
            if keys.contains(&name) {
                Ok("test-key".to_string())
            } else {
                Err(VarError::NotPresent)
            }
        });
        Arc::new(env)
    }

    fn assistant(store: Arc<MemoryStore>, env: Arc<dyn Environment>) -> Assistant {
        Assistant::new(
            ModelRegistry::builtin(),
            Arc::new(CapabilityCatalog::builtin()),
            store,
            env,
        )
    }

    fn mock_client(provider: MockProvider) -> ModelClient {
        ModelClient::with_provider(
            "llama-70b",
            ModelConfig::new(ProviderKind::Groq, "mock"),
            Box::new(provider),
        )
    }

    #[tokio::test]
    async fn test_create_class_end_to_end() {
        let store = Arc::new(MemoryStore::new());
        let provider = MockProvider::replies([
            "create",
            r#"Here is the plan:
```json
{"steps": [{"step_number": 1, "description": "Create the class", "tool_name": "create_class", "tool_arguments": {"name": "CS 101"}}]}
```"#,
            "Done! I created the class CS 101 for you.",
        ]);
        let assistant = assistant(Arc::clone(&store), env_with(&[])).with_client(mock_client(provider));

        let outcome = assistant.chat("Create a class called 'CS 101'").await;

        assert_eq!(outcome.agent, AgentKind::MultiStep);
        assert!(outcome.action_taken);
        assert!(outcome.response.contains("CS 101"));
        assert_eq!(outcome.metadata["intent"], json!("create"));
        assert_eq!(outcome.metadata["tools_used"], json!(["create_class"]));
        assert_eq!(outcome.metadata["workflow_steps"], json!(1));
        assert_eq!(outcome.metadata["success"], json!(true));
        assert_eq!(outcome.metadata["model"], json!("llama-70b"));

        let session = store.begin().await.unwrap();
        let courses = session.list_courses().await.unwrap();
        assert_eq!(courses.len(), 1);
        assert_eq!(courses[0].name, "CS 101");
    }

    #[tokio::test]
    async fn test_no_credentials_falls_back_to_keywords() {
        let assistant = Assistant::start(
            ModelRegistry::builtin(),
            None,
            Arc::new(CapabilityCatalog::builtin()),
            Arc::new(MemoryStore::new()),
            env_with(&[]),
        )
        .await;

        let greeting = assistant.chat("hello there").await;
        assert_eq!(greeting.agent, AgentKind::Fallback);
        assert!(!greeting.action_taken);
        assert_eq!(greeting.response, FALLBACK_GREETING);
        assert_eq!(greeting.metadata["llm_available"], json!(false));
        assert_eq!(greeting.metadata["intent"], json!("general"));

        let request = assistant.chat("add an essay for history").await;
        assert_eq!(request.response, FALLBACK_GUIDANCE);
        assert_eq!(request.metadata["intent"], json!("create"));
        assert!(!request.action_taken);

        let status = assistant.status().await;
        assert_eq!(status.current_model, "llama-70b");
        assert!(!status.current_model_available);
    }

    #[tokio::test]
    async fn test_unknown_tool_mid_plan() {
        let store = Arc::new(MemoryStore::new());
        let provider = MockProvider::replies([
            "create",
            r#"[
                {"step_number": 1, "description": "Create class", "tool_name": "create_class", "tool_arguments": {"name": "Physics"}},
                {"step_number": 2, "description": "Book a room", "tool_name": "book_room", "tool_arguments": null},
                {"step_number": 3, "description": "List classes", "tool_name": "get_classes", "tool_arguments": {}}
            ]"#,
            "Created Physics. I could not book a room.",
        ]);
        let requests = provider.requests();
        let assistant = assistant(Arc::clone(&store), env_with(&[])).with_client(mock_client(provider));

        let outcome = assistant.chat("set up physics and book a room").await;

        assert_eq!(outcome.metadata["workflow_steps"], json!(3));
        assert_eq!(
            outcome.metadata["tools_used"],
            json!(["create_class", "book_room", "get_classes"])
        );
        assert_eq!(outcome.metadata["success"], json!(false));
        assert!(outcome.action_taken);

        // The synthesis prompt saw the failed step and the later one
        let sent = requests.lock().unwrap();
        let synthesis = &sent[2][1].content;
        assert!(synthesis.contains("Step 2: FAILED - Tool not found: book_room"));
        assert!(synthesis.contains("Step 3: Used get_classes successfully"));
    }

    #[tokio::test]
    async fn test_missing_provider_uses_builtin_catalog() {
        let catalog = Arc::new(CapabilityCatalog::new(Some(ProviderCommand::new(
            "/nonexistent/alice-capabilities",
        ))));
        let assistant = Assistant::new(
            ModelRegistry::builtin(),
            Arc::clone(&catalog),
            Arc::new(MemoryStore::new()),
            env_with(&[]),
        );

        let tools = catalog.discover().await;
        let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "create_class",
                "get_classes",
                "create_assignment",
                "get_assignments",
                "update_assignment_status",
                "get_calendar_view",
                "delete_assignment",
                "delete_class",
            ]
        );
        assert_eq!(&tools[..], builtin_tools().as_slice());
        assert_eq!(assistant.status().await.tool_count, 8);
    }

    #[tokio::test]
    async fn test_general_chat_uses_persona() {
        let provider = MockProvider::replies(["general", "Hi! How can I help with your studies?"]);
        let requests = provider.requests();
        let assistant = assistant(Arc::new(MemoryStore::new()), env_with(&[]))
            .with_client(mock_client(provider));

        let outcome = assistant.chat("hey").await;
        assert_eq!(outcome.agent, AgentKind::General);
        assert_eq!(outcome.response, "Hi! How can I help with your studies?");
        assert!(!outcome.action_taken);

        let sent = requests.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[1][0].content, persona());
        assert_eq!(sent[1][1].content, "hey");
    }

    #[tokio::test]
    async fn test_general_chat_failure_falls_back() {
        let provider = MockProvider::new(vec![
            Ok("general".to_string()),
            Err("rate limited".to_string()),
        ]);
        let assistant = assistant(Arc::new(MemoryStore::new()), env_with(&[]))
            .with_client(mock_client(provider));

        let outcome = assistant.chat("good morning").await;
        assert_eq!(outcome.agent, AgentKind::Fallback);
        assert_eq!(outcome.response, FALLBACK_GREETING);
        assert_eq!(outcome.metadata["llm_available"], json!(true));
        assert!(outcome.metadata["error"]
            .as_str()
            .unwrap()
            .contains("rate limited"));
    }

    #[tokio::test]
    async fn test_classification_failure_uses_keywords() {
        // Classification and planning fail, synthesis succeeds
        let provider = MockProvider::new(vec![
            Err("timeout".to_string()),
            Err("timeout".to_string()),
            Ok("Here is what I found.".to_string()),
        ]);
        let assistant = assistant(Arc::new(MemoryStore::new()), env_with(&[]))
            .with_client(mock_client(provider));

        let outcome = assistant.chat("show my assignments").await;
        assert_eq!(outcome.agent, AgentKind::MultiStep);
        assert_eq!(outcome.metadata["intent"], json!("query"));
        assert_eq!(outcome.metadata["workflow_steps"], json!(1));
        assert!(!outcome.action_taken);
        assert_eq!(outcome.response, "Here is what I found.");
    }

    #[tokio::test]
    async fn test_synthesis_failure_never_returns_nothing() {
        let provider = MockProvider::new(vec![
            Ok("query".to_string()),
            Ok(r#"{"steps": [{"step_number": 1, "description": "List", "tool_name": "get_classes"}]}"#
                .to_string()),
            Err("server error".to_string()),
        ]);
        let assistant = assistant(Arc::new(MemoryStore::new()), env_with(&[]))
            .with_client(mock_client(provider));

        let outcome = assistant.chat("list my classes").await;
        assert_eq!(
            outcome.response,
            "I've completed your request: completed 1 of 1 steps."
        );
        assert!(outcome.action_taken);
    }

    #[tokio::test]
    async fn test_switch_model() {
        let assistant = assistant(Arc::new(MemoryStore::new()), env_with(&["OPENAI_API_KEY"]));

        assert!(matches!(
            assistant.switch_model("gpt-5").await,
            Err(AgentError::UnknownModel(_))
        ));
        assert!(matches!(
            assistant.switch_model("claude-3.5-sonnet").await,
            Err(AgentError::ModelUnavailable(_))
        ));
        assert_eq!(assistant.current_model().await, "llama-70b");
        assert!(!assistant.status().await.current_model_available);

        assert_eq!(assistant.switch_model("gpt-4").await, Ok(true));
        assert_eq!(assistant.current_model().await, "gpt-4");

        let status = assistant.status().await;
        assert!(status.current_model_available);
        let availability: Vec<(&str, bool)> = status
            .models
            .iter()
            .map(|m| (m.key.as_str(), m.available))
            .collect();
        assert!(availability.contains(&("gpt-4", true)));
        assert!(availability.contains(&("gpt-3.5-turbo", true)));
        assert!(availability.contains(&("llama-70b", false)));
        assert!(availability.contains(&("llama3-local", true)));
    }

    async fn seed_course(store: &MemoryStore, name: &str) -> i64 {
        let mut session = store.begin().await.unwrap();
        let course = session
            .create_course(NewCourse {
                name: name.to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        session.commit().await.unwrap();
        course.id
    }

    #[tokio::test]
    async fn test_generate_assignments_reports_new_records_in_class() {
        let store = Arc::new(MemoryStore::new());
        let cs = seed_course(&store, "CS 101").await;
        let math = seed_course(&store, "Math 200").await;

        let provider = MockProvider::replies([
            r#"{"steps": [
                {"step_number": 1, "description": "Quiz", "tool_name": "create_assignment",
                 "tool_arguments": {"title": "Quiz 1", "class_id": 1, "due_date": "2024-11-01"}},
                {"step_number": 2, "description": "Stray", "tool_name": "create_assignment",
                 "tool_arguments": {"title": "Problem set", "class_id": 2, "due_date": "2024-11-02"}}
            ]}"#,
            "I added Quiz 1 to CS 101.",
        ]);
        let requests = provider.requests();
        let assistant = assistant(Arc::clone(&store), env_with(&[])).with_client(mock_client(provider));

        let report = assistant
            .generate_assignments("a short quiz on loops", Some(cs))
            .await
            .unwrap();

        assert_eq!(report.agent, AgentKind::MultiStep);
        assert_eq!(report.response, "I added Quiz 1 to CS 101.");
        assert!(report.classes.is_empty());
        assert_eq!(report.assignments.len(), 1);
        assert_eq!(report.assignments[0].title, "Quiz 1");
        assert_eq!(report.assignments[0].class_id, cs);
        assert_eq!(report.metadata["tools_used"], json!(["create_assignment", "create_assignment"]));

        // No classification call: the plan prompt is the first request
        let sent = requests.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert!(sent[0][1]
            .content
            .contains("Generate assignments based on this request: a short quiz on loops"));
        assert!(sent[0][1].content.contains("class with ID 1"));
        drop(sent);

        let session = store.begin().await.unwrap();
        let in_math = session
            .list_assignments(&AssignmentFilter {
                class_id: Some(math),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(in_math.len(), 1);
    }

    #[tokio::test]
    async fn test_parse_syllabus_reports_created_class_and_assignments() {
        let store = Arc::new(MemoryStore::new());
        seed_course(&store, "History").await;

        let provider = MockProvider::replies([
            r#"Plan [v2]: {"steps": [
                {"step_number": 1, "description": "Class", "tool_name": "create_class",
                 "tool_arguments": {"name": "CS 201", "full_name": "Data Structures"}},
                {"step_number": 2, "description": "Midterm", "tool_name": "create_assignment",
                 "tool_arguments": {"title": "Midterm", "class_id": 2, "due_date": "2024-10-20", "priority": 3}}
            ]}"#,
            "Created CS 201 with its midterm.",
        ]);
        let requests = provider.requests();
        let assistant = assistant(Arc::clone(&store), env_with(&[])).with_client(mock_client(provider));

        let report = assistant
            .parse_syllabus("CS 201 Data Structures\nMidterm: October 20")
            .await
            .unwrap();

        let classes: Vec<&str> = report.classes.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(classes, vec!["CS 201"]);
        assert_eq!(report.assignments.len(), 1);
        assert_eq!(report.assignments[0].priority, 3);
        assert_eq!(report.metadata["intent"], json!("create"));
        assert_eq!(report.metadata["success"], json!(true));

        let sent = requests.lock().unwrap();
        assert!(sent[0][1].content.contains("Midterm: October 20"));
    }

    #[tokio::test]
    async fn test_generate_assignments_without_model() {
        let store = Arc::new(MemoryStore::new());
        let assistant = assistant(Arc::clone(&store), env_with(&[]));

        let report = assistant
            .generate_assignments("Read chapter 4 of the textbook", None)
            .await
            .unwrap();

        assert_eq!(report.agent, AgentKind::Fallback);
        assert_eq!(report.metadata["fallback"], json!(true));
        assert_eq!(report.classes.len(), 1);
        assert_eq!(report.classes[0].name, GENERATED_CLASS);

        let assignment = &report.assignments[0];
        assert_eq!(assignment.title, "Generated: Read chapter 4 of the textbook...");
        assert_eq!(assignment.priority, 2);
        assert_eq!(assignment.estimated_hours, Some(4));
        assert_eq!(assignment.class_id, report.classes[0].id);
        assert_eq!(
            assignment.due_date.date(),
            Local::now().date_naive() + ChronoDuration::days(7)
        );

        // An explicit class is used as is, and must exist
        let existing = seed_course(&store, "Biology").await;
        let report = assistant.generate_assignments("lab report", Some(existing)).await.unwrap();
        assert!(report.classes.is_empty());
        assert_eq!(report.assignments[0].class_id, existing);

        assert!(matches!(
            assistant.generate_assignments("lab report", Some(99)).await,
            Err(AgentError::ExecutionError(_))
        ));
    }

    #[tokio::test]
    async fn test_parse_syllabus_without_model() {
        let assistant = assistant(Arc::new(MemoryStore::new()), env_with(&[]));

        let report = assistant.parse_syllabus("Week 1: intro").await.unwrap();

        assert_eq!(report.agent, AgentKind::Fallback);
        assert_eq!(report.classes[0].name, PARSED_CLASS);
        let summary: Vec<(&str, u8, Option<u32>)> = report
            .assignments
            .iter()
            .map(|a| (a.title.as_str(), a.priority, a.estimated_hours))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("Assignment 1", 2, Some(5)),
                ("Midterm", 2, Some(5)),
                ("Final Project", 3, Some(15)),
            ]
        );
        assert!(report.assignments[0].due_date < report.assignments[2].due_date);
    }

    #[tokio::test]
    async fn test_directed_requests_reject_blank_input() {
        let assistant = assistant(Arc::new(MemoryStore::new()), env_with(&[]));
        assert!(matches!(
            assistant.parse_syllabus("  \n").await,
            Err(AgentError::InvalidParameters(_))
        ));
        assert!(matches!(
            assistant.generate_assignments("", None).await,
            Err(AgentError::InvalidParameters(_))
        ));
    }

    #[test]
    fn test_agent_labels() {
        assert_eq!(AgentKind::MultiStep.to_string(), "multi-step");
        assert_eq!(json!(AgentKind::Fallback), json!("fallback"));
    }
}
