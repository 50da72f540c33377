//! Classroom simulation core.
//!
//! A teacher lectures, students ask questions, a supporter decides when the
//! teacher's explanation needs more, and a summarizer reviews the class
//! afterwards. Everything here is transport-agnostic: the batch runner, the
//! request API and the socket sessions all drive the same agents and cycles.

pub mod agent;
pub mod context;
pub mod error;
pub mod lecture;
pub mod llm_client;
pub mod message;
pub mod prompts;
pub mod review;
pub mod support;
pub mod transcript;
pub mod tutor;

pub use error::{CompletionFailure, LectureError, LookupMiss};
pub use message::{Message, Role};
