pub mod anthropic;
pub mod base;
pub mod client;
pub mod configs;
pub mod factory;
pub mod ollama;
pub mod openai;
pub mod registry;
pub mod utils;

#[cfg(test)]
pub mod mock;
