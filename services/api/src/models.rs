//! API Models
//!
//! Request and response bodies for the classroom endpoints, documented with
//! `utoipa`, plus the decoding of `speaker||content` entries into messages.

use classroom_core::message::{Message, speaker};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Separates the speaker from the content in a query entry, and student
/// utterances in a socket frame.
pub const SPLIT: &str = "||";

/// A slice of conversation, one `speaker||content` entry per message.
#[derive(Deserialize, Serialize, ToSchema, Debug, Clone, Default)]
pub struct QueriesPayload {
    #[schema(example = json!(["teacher||Plants make food from sunlight.", "Mina||How?"]))]
    pub queries: Vec<String>,
}

impl QueriesPayload {
    /// Decodes every entry. Fails on the first entry without a `||`.
    pub fn to_messages(&self) -> Result<Vec<Message>, String> {
        self.queries.iter().map(|q| decode_query(q)).collect()
    }
}

/// `teacher` becomes a user line from `Teacher`, `system` a system line from
/// `Supporter`, and any other speaker a user line under that name.
pub fn decode_query(query: &str) -> Result<Message, String> {
    let (who, content) = query
        .split_once(SPLIT)
        .ok_or_else(|| format!("query '{}' is not of the form speaker{}content", query, SPLIT))?;
    let content = content.trim();
    let msg = match who.to_lowercase().as_str() {
        "teacher" => Message::user(content).named(speaker::TEACHER),
        "system" => Message::system(content).named(speaker::SUPPORTER),
        _ => Message::user(content).named(who),
    };
    Ok(msg)
}

#[derive(Deserialize, Serialize, ToSchema, Debug, Clone)]
pub struct ImprovementsPayload {
    #[schema(example = "The main points of today's class: photosynthesis, chlorophyll")]
    pub mainpoints: String,
}

#[derive(Deserialize, Serialize, ToSchema, Debug, Clone)]
pub struct HelpPayload {
    #[schema(example = "Mina")]
    pub name: String,
    #[schema(example = "Likes drawing, struggles with reading")]
    pub background: String,
    #[serde(default)]
    pub queries: Vec<String>,
}

#[derive(Serialize, Deserialize, ToSchema, Debug, PartialEq)]
pub struct SupportResponse {
    pub support: bool,
}

#[derive(Serialize, Deserialize, ToSchema, Debug, PartialEq)]
pub struct ExtensionsResponse {
    pub extensions: String,
}

#[derive(Serialize, Deserialize, ToSchema, Debug, PartialEq)]
pub struct RateResponse {
    pub rate: String,
}

#[derive(Serialize, Deserialize, ToSchema, Debug, PartialEq)]
pub struct MainPointsResponse {
    pub main_points: String,
}

#[derive(Serialize, Deserialize, ToSchema, Debug, PartialEq)]
pub struct ImprovementsResponse {
    pub improvements: String,
}

#[derive(Serialize, Deserialize, ToSchema, Debug, PartialEq)]
pub struct HelpResponse {
    pub help: Option<String>,
}

#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct ErrorResponse {
    pub message: String,
}
