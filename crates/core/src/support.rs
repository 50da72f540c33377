//! The support cycle: classify, extend, re-ask.

use crate::agent::{Exchangeable, Supporter, Teacher};
use crate::error::CompletionFailure;
use crate::message::{Message, speaker};
use tracing::info;

/// What a fired support cycle produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupportOutcome {
    /// The supporter's suggestion, as delivered to the teacher.
    pub extension: String,
    /// The teacher's answer after reading the suggestion.
    pub revised: String,
}

/// Runs one support cycle over `context`.
///
/// The supporter only ever sees copies of `context`. When it asks for
/// support, its extension reaches the teacher as a system message from
/// `Supporter`. The supporter's history is cleared on every exit path, so it
/// never reasons from earlier turns.
pub async fn run_support_cycle(
    supporter: &Supporter,
    teacher: &Teacher,
    context: &[Message],
) -> Result<Option<SupportOutcome>, CompletionFailure> {
    let outcome = support_round(supporter, teacher, context).await;
    supporter.clear_history().await;
    outcome
}

async fn support_round(
    supporter: &Supporter,
    teacher: &Teacher,
    context: &[Message],
) -> Result<Option<SupportOutcome>, CompletionFailure> {
    if !supporter.classify_needs_support(context).await? {
        return Ok(None);
    }

    let extension = supporter.propose_extension(context).await?;
    info!(speaker = speaker::SUPPORTER, "{extension}");

    let revised = teacher
        .exchange_text(vec![Message::system(extension.clone()).named(speaker::SUPPORTER)])
        .await?;
    info!(speaker = speaker::TEACHER, revised = true, "{revised}");

    Ok(Some(SupportOutcome { extension, revised }))
}
