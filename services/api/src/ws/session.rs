//! Manages the WebSocket lifecycle of one streamed lecture.

use super::protocol::{self, OutboundFrame};
use crate::state::AppState;
use anyhow::Result;
use axum::{
    extract::{
        Path, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use classroom_core::{
    agent::{Exchangeable, Summarizer, Supporter, Teacher},
    context::TurnContext,
    message::{self, speaker},
    review::review_and_record,
    support::run_support_cycle,
};
use futures_util::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// Axum handler to upgrade an HTTP connection to a WebSocket.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(topic): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state, topic))
}

/// How a session ended without an error.
#[derive(Debug, PartialEq, Eq)]
enum SessionEnd {
    Completed,
    Disconnected,
}

/// Main handler for an individual WebSocket connection.
///
/// Every connection gets its own teacher, supporter and summarizer, so a
/// disconnect or failure here never touches another session's histories.
#[instrument(name = "ws_session", skip_all, fields(session_id, topic = %topic))]
async fn handle_socket(socket: WebSocket, state: Arc<AppState>, topic: String) {
    let session_id = Uuid::new_v4();
    tracing::Span::current().record("session_id", &session_id.to_string());
    info!("New classroom connection.");

    let (mut socket_tx, mut socket_rx) = socket.split();
    let session = StreamingSession::new(&state, topic);

    match session.run(&mut socket_tx, &mut socket_rx).await {
        Ok(SessionEnd::Completed) => {
            info!("Lecture complete. Closing connection.");
            let _ = socket_tx.send(Message::Close(None)).await;
        }
        Ok(SessionEnd::Disconnected) => info!("Client disconnected."),
        Err(e) => {
            error!(error = ?e, "Classroom session terminated with error.");
            let _ = socket_tx.send(Message::Close(None)).await;
        }
    }
}

/// The state of one streamed lecture, alive for as long as its socket.
struct StreamingSession {
    teacher: Teacher,
    supporter: Supporter,
    summarizer: Summarizer,
    topic: String,
    max_turns: usize,
    context: TurnContext,
    turns: usize,
}

impl StreamingSession {
    fn new(state: &AppState, topic: String) -> Self {
        let client = state.llm_client.clone();
        let prompts = &state.prompts;
        let options = state.config.completion_options();
        Self {
            teacher: Teacher::new(prompts.teacher_for(None), client.clone())
                .with_options(options.clone()),
            supporter: Supporter::new(prompts.supporter.clone(), client.clone(), state.config.seed)
                .with_options(options.clone()),
            summarizer: Summarizer::new(prompts.summarizer.clone(), client).with_options(options),
            topic,
            max_turns: state.config.stream_max_turns,
            context: TurnContext::new(),
            turns: 0,
        }
    }

    /// Introduction, then per turn: support cycle on the teacher's last
    /// answer, one inbound batch of student lines, one teacher reply. After
    /// the last turn the review follows.
    async fn run(
        mut self,
        socket_tx: &mut SplitSink<WebSocket, Message>,
        socket_rx: &mut SplitStream<WebSocket>,
    ) -> Result<SessionEnd> {
        let intro = self.teacher.introduce(&self.topic).await?;
        send_frame(socket_tx, OutboundFrame::Introduction(intro.clone())).await?;
        self.context
            .push(message::Message::user(intro).named(speaker::TEACHER));

        loop {
            if let Some(outcome) =
                run_support_cycle(&self.supporter, &self.teacher, self.context.messages()).await?
            {
                send_frame(socket_tx, OutboundFrame::Extension(outcome.extension)).await?;
                send_frame(socket_tx, OutboundFrame::TeacherReply(outcome.revised)).await?;
            }
            self.context.clear();

            let Some(batch) = next_text(socket_rx).await else {
                return Ok(SessionEnd::Disconnected);
            };
            self.context.extend(protocol::split_student_batch(&batch));

            let reply = self.teacher.exchange_text(self.context.snapshot()).await?;
            send_frame(socket_tx, OutboundFrame::TeacherReply(reply.clone())).await?;
            self.context
                .push(message::Message::user(reply).named(speaker::TEACHER));

            self.turns += 1;
            info!(turn = self.turns, max_turns = self.max_turns, "Turn complete");
            if self.turns >= self.max_turns {
                let review = review_and_record(&self.summarizer, &self.teacher).await?;
                send_frame(socket_tx, OutboundFrame::Review(review.review)).await?;
                send_frame(socket_tx, OutboundFrame::MainPoints(review.main_points)).await?;
                send_frame(socket_tx, OutboundFrame::Improvements(review.improvements)).await?;
                return Ok(SessionEnd::Completed);
            }
        }
    }
}

/// Waits for the next text frame. `None` means the client is gone.
async fn next_text(socket_rx: &mut SplitStream<WebSocket>) -> Option<String> {
    while let Some(msg_result) = socket_rx.next().await {
        match msg_result {
            Ok(Message::Text(text)) => return Some(text.to_string()),
            Ok(Message::Close(_)) => {
                info!("Client sent close frame.");
                return None;
            }
            Ok(Message::Binary(_)) => warn!("Ignoring binary frame."),
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Err(e) => {
                warn!("Error receiving from client WebSocket: {:?}", e);
                return None;
            }
        }
    }
    None
}

async fn send_frame(
    socket_tx: &mut SplitSink<WebSocket, Message>,
    frame: OutboundFrame,
) -> Result<()> {
    debug!(kind = frame.kind(), "Sending frame");
    socket_tx.send(Message::Text(frame.into_text().into())).await?;
    Ok(())
}
