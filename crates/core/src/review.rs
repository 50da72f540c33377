//! Post-class review produced by the summarizer.

use crate::agent::{Summarizer, Teacher};
use crate::error::CompletionFailure;
use crate::message::{Message, speaker};
use serde::{Deserialize, Serialize};
use tracing::info;

/// The three review texts, in the order they are produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassReview {
    pub review: String,
    pub main_points: String,
    pub improvements: String,
}

impl ClassReview {
    /// The review as system entries from `Summarizer`, ready for the record.
    pub fn to_messages(&self) -> Vec<Message> {
        [&self.review, &self.main_points, &self.improvements]
            .into_iter()
            .map(|text| Message::system(text.clone()).named(speaker::SUMMARIZER))
            .collect()
    }
}

/// Reviews the teacher's class log in three independent stages.
///
/// Each stage starts from an empty summarizer history seeded with the same
/// log, so stage outputs never leak into each other. Only the main points
/// text is carried, verbatim, into the improvements stage.
pub async fn review_class(
    summarizer: &Summarizer,
    teacher: &Teacher,
) -> Result<ClassReview, CompletionFailure> {
    let log = teacher.class_log().await;

    summarizer.clear_history().await;
    let review = summarizer.rate(log.clone()).await;
    summarizer.clear_history().await;
    let review = review?;
    info!("The overall review: {review}");

    let main_points = summarizer.extract_main_points(log.clone()).await;
    summarizer.clear_history().await;
    let main_points = main_points?;
    info!("{main_points}");

    let improvements = summarizer.recommend_improvements(log, &main_points).await;
    summarizer.clear_history().await;
    let improvements = improvements?;
    info!("{improvements}");

    Ok(ClassReview {
        review,
        main_points,
        improvements,
    })
}

/// Reviews the class and appends the review to the teacher's record.
pub async fn review_and_record(
    summarizer: &Summarizer,
    teacher: &Teacher,
) -> Result<ClassReview, CompletionFailure> {
    let review = review_class(summarizer, teacher).await?;
    for msg in review.to_messages() {
        teacher.record(msg).await;
    }
    Ok(review)
}
