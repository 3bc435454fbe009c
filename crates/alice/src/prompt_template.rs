use serde::Serialize;
use tera::{Context, Error as TeraError, Tera};

/// Prompt templates shipped with the crate
pub const PLAN_PROMPT: &str = include_str!("prompts/plan.md");
pub const SYNTHESIS_PROMPT: &str = include_str!("prompts/synthesis.md");
pub const CLASSIFY_PROMPT: &str = include_str!("prompts/classify.md");
pub const PERSONA_PROMPT: &str = include_str!("prompts/persona.md");
pub const SYLLABUS_PROMPT: &str = include_str!("prompts/syllabus.md");
pub const GENERATE_PROMPT: &str = include_str!("prompts/generate.md");

pub fn load_prompt<T: Serialize>(template: &str, context_data: &T) -> Result<String, TeraError> {
    let mut tera = Tera::default();
    tera.add_raw_template("inline_template", template)?;
    let context = Context::from_serialize(context_data)?;
    let rendered = tera.render("inline_template", &context)?;
    Ok(rendered)
}

pub fn persona() -> &'static str {
    PERSONA_PROMPT.trim()
}
