//! # Task Planner
//!
//! Turns a free-text goal into a dated task plan.
//!
//! This library provides:
//! - An HTTP API for creating, reading, updating and deleting goals
//! - LLM-backed goal decomposition (OpenAI or Groq)
//! - Dependency-aware date scheduling and dependency gating
//!
//! ## Goal Flow
//!
//! ```text
//!   goal text ──► Decomposer ──► task drafts ──► schedule() ──► GoalStore
//!                  (LLM call)                    (dates)        (one transaction)
//! ```
//!
//! 1. Validate the goal text
//! 2. Ask the provider for tasks, durations and dependency titles
//! 3. Assign start/end dates, rejecting cyclic dependencies
//! 4. Store the goal and all of its tasks atomically
//!
//! ## Modules
//! - `api`: axum routes and error mapping
//! - `goals`: orchestration and the error taxonomy
//! - `task`: task types, scheduler and dependency gate
//! - `decompose`: prompt, response cleanup and parsing
//! - `llm`: chat-completion client and error classification
//! - `store`: SQLite and in-memory goal storage

pub mod ai_providers;
pub mod api;
pub mod config;
pub mod decompose;
pub mod goals;
pub mod llm;
pub mod store;
pub mod task;
pub mod util;

pub use config::Config;
pub use goals::{GoalError, GoalService};
