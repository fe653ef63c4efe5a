//! Chat orchestration: one request in, one lazy fragment stream out.

mod orchestrator;

pub use orchestrator::{compose_prompt, Orchestrator, INSTRUCTION_PREAMBLE};
