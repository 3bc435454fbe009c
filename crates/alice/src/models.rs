//! These models represent the objects passed around by the assistant
//!
//! There are several related formats we need to interact with:
//! - chat messages exchanged with the reasoning model providers
//! - capability descriptors, either discovered from the capability provider process
//!   (as JSON-Schema `inputSchema` documents) or taken from the built-in catalog
//! - tool results produced by the invoker against the record store
//! - workflows, which tie a request to its plan and the outcome of each step
//!
//! Wire formats are converted into these internal structs at the edges, so the
//! planner, executor and synthesizer only ever see one representation.
pub mod message;
pub mod tool;
pub mod workflow;
