//! Multi-role conversational state machine
//!
//! Turns free-text hiring requests into structured role data, decides turn
//! by turn what to ask next, and hands completed roles off to document
//! generation.

pub mod completeness;
pub mod extraction;
pub mod machine;
pub mod planner;
pub mod state;
