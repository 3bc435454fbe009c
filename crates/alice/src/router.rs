use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use serde_json::json;
use strum_macros::{AsRefStr, Display, EnumString};
use tracing::{debug, warn};

use crate::errors::{AgentError, AgentResult};
use crate::models::message::ChatMessage;
use crate::prompt_template::{load_prompt, CLASSIFY_PROMPT};
use crate::providers::client::ModelClient;

pub const CLASSIFY_TEMPERATURE: f32 = 0.0;
pub const CLASSIFY_MAX_TOKENS: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, AsRefStr, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Intent {
    General,
    Query,
    Create,
}

impl Intent {
    /// Whether the request goes through plan, execute and synthesize
    pub fn needs_workflow(&self) -> bool {
        !matches!(self, Intent::General)
    }
}

lazy_static! {
    static ref CREATE_KEYWORDS: Regex = Regex::new(
        r"(?i)\b(create|add|make|schedule|plan|delete|remove|update|mark|set|change|complete|finish|new)\b"
    )
    .unwrap();
    static ref QUERY_KEYWORDS: Regex = Regex::new(
        r"(?i)\b(show|list|get|find|due|calendar|upcoming|view|display|see|check|pending|remaining|what|which|when)\b"
    )
    .unwrap();
    static ref GENERAL_KEYWORDS: Regex = Regex::new(
        r"(?i)\b(hello|hi|hey|thanks|thank you|help|good morning|good afternoon|good evening|who are you)\b"
    )
    .unwrap();
    static ref INTERROGATIVE_PREFIX: Regex =
        Regex::new(r"(?i)^\s*(how|what|when|where|which|who|why|is|are|do|does|can|could|should|will)\b")
            .unwrap();
    static ref LABEL: Regex = Regex::new(r"(?i)\b(general|query|create)\b").unwrap();
}

/// Classify without a model. Creation keywords win over query keywords,
/// which win over general ones.
pub fn classify_by_keywords(message: &str) -> Intent {
    if CREATE_KEYWORDS.is_match(message) {
        Intent::Create
    } else if QUERY_KEYWORDS.is_match(message) {
        Intent::Query
    } else if GENERAL_KEYWORDS.is_match(message) {
        Intent::General
    } else if message.trim_end().ends_with('?') || INTERROGATIVE_PREFIX.is_match(message) {
        Intent::Query
    } else {
        Intent::General
    }
}

/// Pull the first intent label out of a classification reply
pub fn parse_label(reply: &str) -> Option<Intent> {
    LABEL
        .captures(reply)
        .and_then(|captures| captures.get(1))
        .and_then(|label| label.as_str().to_lowercase().parse().ok())
}

pub struct IntentRouter;

impl IntentRouter {
    /// Ask the model when one is connected and fall back to keywords otherwise,
    /// or when its reply carries no recognizable label.
    pub async fn route(client: Option<&ModelClient>, message: &str) -> Intent {
        let Some(client) = client else {
            debug!("no model connected, classifying by keywords");
            return classify_by_keywords(message);
        };

        match Self::classify_with_model(client, message).await {
            Ok(intent) => intent,
            Err(e) => {
                warn!(error = %e, "model classification failed, classifying by keywords");
                classify_by_keywords(message)
            }
        }
    }

    async fn classify_with_model(client: &ModelClient, message: &str) -> AgentResult<Intent> {
        let prompt = load_prompt(CLASSIFY_PROMPT, &json!({ "message": message }))
            .map_err(|e| AgentError::Internal(e.to_string()))?;

        let response = client
            .chat(
                &[ChatMessage::user(prompt)],
                Some(CLASSIFY_TEMPERATURE),
                Some(CLASSIFY_MAX_TOKENS),
            )
            .await?;

        let intent = parse_label(&response.content).ok_or_else(|| {
            AgentError::Internal(format!("unrecognized intent label '{}'", response.content.trim()))
        })?;
        debug!(%intent, "model classified request");
        Ok(intent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::mock::MockProvider;
    use crate::providers::registry::{ModelConfig, ProviderKind};

    fn client(provider: MockProvider) -> ModelClient {
        ModelClient::with_provider(
            "mock",
            ModelConfig::new(ProviderKind::OpenAi, "mock"),
            Box::new(provider),
        )
    }

    #[test]
    fn test_keyword_precedence() {
        assert_eq!(classify_by_keywords("Create a class called 'CS 101'"), Intent::Create);
        // "show" is a query word but "add" wins
        assert_eq!(classify_by_keywords("show me how to add an essay"), Intent::Create);
        assert_eq!(classify_by_keywords("list my assignments"), Intent::Query);
        assert_eq!(classify_by_keywords("What is due this week"), Intent::Query);
        assert_eq!(classify_by_keywords("hello there"), Intent::General);
        assert_eq!(classify_by_keywords("thank you so much"), Intent::General);
    }

    #[test]
    fn test_keywords_match_whole_words() {
        // "add" inside "ladder" is not a keyword
        assert_eq!(classify_by_keywords("climbing a ladder"), Intent::General);
        assert_eq!(classify_by_keywords("ok"), Intent::General);
    }

    #[test]
    fn test_questions_default_to_query() {
        assert_eq!(classify_by_keywords("anything for physics?"), Intent::Query);
        assert_eq!(classify_by_keywords("Do I have homework tonight"), Intent::Query);
        assert_eq!(classify_by_keywords("physics tomorrow"), Intent::General);
    }

    #[test]
    fn test_parse_label() {
        assert_eq!(parse_label("create"), Some(Intent::Create));
        assert_eq!(parse_label("  Query.\n"), Some(Intent::Query));
        assert_eq!(parse_label("The category is: GENERAL"), Some(Intent::General));
        assert_eq!(parse_label("no idea"), None);
    }

    #[tokio::test]
    async fn test_route_uses_model_label() {
        let provider = MockProvider::replies(["query"]);
        let requests = provider.requests();
        let client = client(provider);

        // Keywords alone would say create
        let intent = IntentRouter::route(Some(&client), "add it up for me").await;
        assert_eq!(intent, Intent::Query);

        let sent = requests.lock().unwrap();
        assert!(sent[0][0].content.contains("Message: \"add it up for me\""));
    }

    #[tokio::test]
    async fn test_route_falls_back_to_keywords() {
        let unlabeled = client(MockProvider::replies(["I'm not sure"]));
        assert_eq!(
            IntentRouter::route(Some(&unlabeled), "delete my essay").await,
            Intent::Create
        );

        let failing = client(MockProvider::new(vec![Err("connection refused".to_string())]));
        assert_eq!(
            IntentRouter::route(Some(&failing), "list my classes").await,
            Intent::Query
        );

        assert_eq!(IntentRouter::route(None, "hey Alice").await, Intent::General);
    }

    #[test]
    fn test_intent_names() {
        assert_eq!(Intent::Create.to_string(), "create");
        assert!(Intent::Query.needs_workflow());
        assert!(!Intent::General.needs_workflow());
    }
}
