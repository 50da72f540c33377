//! The plain-text wire contract of a classroom socket session.
//!
//! Inbound: one text frame per turn, holding student utterances joined by
//! `||`. Outbound: one text frame per message, in the order the lecture
//! produces them.

use crate::models::SPLIT;
use classroom_core::message::{Message, speaker};

/// A message the server pushes to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundFrame {
    Introduction(String),
    Extension(String),
    TeacherReply(String),
    Review(String),
    MainPoints(String),
    Improvements(String),
}

impl OutboundFrame {
    pub fn kind(&self) -> &'static str {
        match self {
            OutboundFrame::Introduction(_) => "introduction",
            OutboundFrame::Extension(_) => "extension",
            OutboundFrame::TeacherReply(_) => "teacher_reply",
            OutboundFrame::Review(_) => "review",
            OutboundFrame::MainPoints(_) => "main_points",
            OutboundFrame::Improvements(_) => "improvements",
        }
    }

    pub fn into_text(self) -> String {
        match self {
            OutboundFrame::Introduction(text)
            | OutboundFrame::Extension(text)
            | OutboundFrame::TeacherReply(text)
            | OutboundFrame::Review(text)
            | OutboundFrame::MainPoints(text)
            | OutboundFrame::Improvements(text) => text,
        }
    }
}

/// Splits an inbound frame into one `Student` message per segment.
pub fn split_student_batch(frame: &str) -> Vec<Message> {
    frame
        .split(SPLIT)
        .map(|utterance| Message::user(utterance).named(speaker::STUDENT))
        .collect()
}
