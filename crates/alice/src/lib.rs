pub mod agent;
pub mod capabilities;
pub mod credentials;
pub mod errors;
pub mod executor;
pub mod models;
pub mod planner;
pub mod prompt_template;
pub mod providers;
pub mod router;
pub mod store;
pub mod synthesizer;
