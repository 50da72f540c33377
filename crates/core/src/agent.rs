//! Classroom Role Agents
//!
//! Every role is a thin wrapper around a [`Participant`], which owns the
//! agent's private history and performs the single-exchange primitive. The
//! roles add their own operations on top of that primitive instead of
//! overriding it.

use crate::error::CompletionFailure;
use crate::llm_client::{CompletionClient, CompletionOptions};
use crate::message::{Message, Role, speaker};
use crate::prompts::{self, SUPPORT_OPTIONS};
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use regex::Regex;
use std::sync::{Arc, LazyLock, Mutex as SyncMutex};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// The capability shared by every role: send messages, get one reply.
#[async_trait]
pub trait Exchangeable: Send + Sync {
    /// Appends `messages` to the agent's private history, completes over the
    /// whole history and appends the reply. An empty `messages` continues
    /// from the existing history.
    async fn exchange(&self, messages: Vec<Message>) -> Result<Message, CompletionFailure>;

    /// Like [`exchange`](Exchangeable::exchange), but only returns the text.
    async fn exchange_text(&self, messages: Vec<Message>) -> Result<String, CompletionFailure> {
        Ok(self.exchange(messages).await?.content)
    }
}

/// One seat in the classroom: a system prompt, a private history and a
/// handle on the shared completion client.
pub struct Participant {
    label: String,
    system_prompt: String,
    client: Arc<dyn CompletionClient>,
    options: CompletionOptions,
    history: Mutex<Vec<Message>>,
}

impl Participant {
    pub fn new(
        label: impl Into<String>,
        system_prompt: impl Into<String>,
        client: Arc<dyn CompletionClient>,
    ) -> Self {
        Self {
            label: label.into(),
            system_prompt: system_prompt.into(),
            client,
            options: CompletionOptions::default(),
            history: Mutex::new(Vec::new()),
        }
    }

    pub fn with_options(mut self, options: CompletionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// A copy of the private history (without the system prompt).
    pub async fn history(&self) -> Vec<Message> {
        self.history.lock().await.clone()
    }

    pub async fn clear_history(&self) {
        self.history.lock().await.clear();
    }

    /// Records a message without asking the model for anything.
    pub async fn record(&self, msg: Message) {
        self.history.lock().await.push(msg);
    }

    /// Removes the first history entry equal to `msg`. Returns whether one was found.
    pub async fn forget(&self, msg: &Message) -> bool {
        let mut history = self.history.lock().await;
        match history.iter().position(|m| m == msg) {
            Some(idx) => {
                history.remove(idx);
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl Exchangeable for Participant {
    async fn exchange(&self, messages: Vec<Message>) -> Result<Message, CompletionFailure> {
        // Held across the completion call: one exchange per agent at a time.
        let mut history = self.history.lock().await;
        history.extend(messages);

        let mut prompt = Vec::with_capacity(history.len() + 1);
        prompt.push(Message::system(self.system_prompt.clone()));
        prompt.extend(history.iter().cloned());

        debug!(agent = %self.label, history = history.len(), "Exchange");
        let reply = self.client.complete(&prompt, &self.options).await?;
        history.push(reply.clone());
        Ok(reply)
    }
}

/// Leads the lecture. Its private history is the class transcript.
pub struct Teacher {
    inner: Participant,
}

impl Teacher {
    pub fn new(system_prompt: impl Into<String>, client: Arc<dyn CompletionClient>) -> Self {
        Self {
            inner: Participant::new(speaker::TEACHER, system_prompt, client),
        }
    }

    pub fn with_options(mut self, options: CompletionOptions) -> Self {
        self.inner = self.inner.with_options(options);
        self
    }

    /// Produces the opening of the lecture.
    ///
    /// The synthetic topic prompt is removed from the history afterwards, so
    /// only the introduction itself is part of the transcript.
    pub async fn introduce(&self, topic: &str) -> Result<String, CompletionFailure> {
        let opening = Message::user(prompts::opening(topic));
        let result = self.inner.exchange_text(vec![opening.clone()]).await;
        self.inner.forget(&opening).await;
        result
    }

    /// The full private history, in order.
    pub async fn transcript(&self) -> Vec<Message> {
        self.inner.history().await
    }

    /// The transcript as an observer sees it: the teacher's own replies
    /// become user lines spoken by `Teacher`.
    pub async fn class_log(&self) -> Vec<Message> {
        self.inner
            .history()
            .await
            .into_iter()
            .map(|msg| match msg.role {
                Role::Assistant => Message::user(msg.content).named(speaker::TEACHER),
                _ => msg,
            })
            .collect()
    }

    /// Appends an entry to the permanent record.
    pub async fn record(&self, msg: Message) {
        self.inner.record(msg).await;
    }
}

#[async_trait]
impl Exchangeable for Teacher {
    async fn exchange(&self, messages: Vec<Message>) -> Result<Message, CompletionFailure> {
        self.inner.exchange(messages).await
    }
}

/// Asks questions about the lecture.
pub struct Student {
    inner: Participant,
}

impl Student {
    pub fn new(
        name: impl Into<String>,
        system_prompt: impl Into<String>,
        client: Arc<dyn CompletionClient>,
    ) -> Self {
        Self {
            inner: Participant::new(name, system_prompt, client),
        }
    }

    pub fn with_options(mut self, options: CompletionOptions) -> Self {
        self.inner = self.inner.with_options(options);
        self
    }

    pub fn name(&self) -> &str {
        self.inner.label()
    }

    pub async fn history(&self) -> Vec<Message> {
        self.inner.history().await
    }
}

#[async_trait]
impl Exchangeable for Student {
    async fn exchange(&self, messages: Vec<Message>) -> Result<Message, CompletionFailure> {
        self.inner.exchange(messages).await
    }
}

static FIRST_INTEGER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("static pattern is valid"));

/// Picks an option index out of a free-text classification reply.
///
/// The first integer in `reply` wins. A reply with no integer, or with one
/// that is not a valid index, falls back to a uniformly random option.
pub fn parse_option_index<R: Rng + ?Sized>(reply: &str, option_count: usize, rng: &mut R) -> usize {
    let parsed = FIRST_INTEGER
        .find(reply)
        .and_then(|m| m.as_str().parse::<usize>().ok())
        .filter(|idx| *idx < option_count);

    match parsed {
        Some(idx) => idx,
        None => {
            let fallback = rng.random_range(0..option_count);
            warn!(reply, fallback, "Ambiguous classification reply, choosing at random");
            fallback
        }
    }
}

/// Watches the lecture and suggests extensions when the teacher falls short.
pub struct Supporter {
    inner: Participant,
    rng: SyncMutex<StdRng>,
}

impl Supporter {
    pub fn new(
        system_prompt: impl Into<String>,
        client: Arc<dyn CompletionClient>,
        seed: Option<u64>,
    ) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            inner: Participant::new(speaker::SUPPORTER, system_prompt, client),
            rng: SyncMutex::new(rng),
        }
    }

    pub fn with_options(mut self, options: CompletionOptions) -> Self {
        self.inner = self.inner.with_options(options);
        self
    }

    /// Decides whether the teacher's latest answer needs support.
    ///
    /// The request is appended to a copy of `context`; the caller's slice is
    /// never touched. An unparseable reply never fails the call.
    pub async fn classify_needs_support(&self, context: &[Message]) -> Result<bool, CompletionFailure> {
        let mut queries = context.to_vec();
        queries.push(Message::system(prompts::classify_support()));

        let reply = self.inner.exchange_text(queries).await?;
        let idx = {
            let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            parse_option_index(&reply, SUPPORT_OPTIONS.len(), &mut *rng)
        };
        Ok(SUPPORT_OPTIONS[idx] == "Yes")
    }

    /// Asks for 2-3 subtopics the teacher could add. The reply is free text.
    pub async fn propose_extension(&self, context: &[Message]) -> Result<String, CompletionFailure> {
        let mut queries = context.to_vec();
        queries.push(Message::system(prompts::PROPOSE_EXTENSION));
        self.inner.exchange_text(queries).await
    }

    pub async fn history(&self) -> Vec<Message> {
        self.inner.history().await
    }

    pub async fn clear_history(&self) {
        self.inner.clear_history().await;
    }
}

#[async_trait]
impl Exchangeable for Supporter {
    async fn exchange(&self, messages: Vec<Message>) -> Result<Message, CompletionFailure> {
        self.inner.exchange(messages).await
    }
}

/// Reviews a finished lecture.
///
/// Each operation appends `transcript` and its request to the private history.
/// Passing an empty transcript continues from whatever the history already
/// holds.
pub struct Summarizer {
    inner: Participant,
}

impl Summarizer {
    pub fn new(system_prompt: impl Into<String>, client: Arc<dyn CompletionClient>) -> Self {
        Self {
            inner: Participant::new(speaker::SUMMARIZER, system_prompt, client),
        }
    }

    pub fn with_options(mut self, options: CompletionOptions) -> Self {
        self.inner = self.inner.with_options(options);
        self
    }

    /// A 1-10 score with a one-sentence reason.
    pub async fn rate(&self, transcript: Vec<Message>) -> Result<String, CompletionFailure> {
        self.ask(transcript, prompts::RATE_CLASS.to_string()).await
    }

    /// The 2-3 subtopics that mattered most.
    pub async fn extract_main_points(&self, transcript: Vec<Message>) -> Result<String, CompletionFailure> {
        self.ask(transcript, prompts::MAIN_POINTS.to_string()).await
    }

    /// Recommendations for the teacher, conditioned on `main_points` verbatim.
    pub async fn recommend_improvements(
        &self,
        transcript: Vec<Message>,
        main_points: &str,
    ) -> Result<String, CompletionFailure> {
        self.ask(transcript, prompts::improvements(main_points)).await
    }

    async fn ask(&self, mut transcript: Vec<Message>, request: String) -> Result<String, CompletionFailure> {
        transcript.push(Message::system(request));
        self.inner.exchange_text(transcript).await
    }

    pub async fn history(&self) -> Vec<Message> {
        self.inner.history().await
    }

    pub async fn clear_history(&self) {
        self.inner.clear_history().await;
    }
}

#[async_trait]
impl Exchangeable for Summarizer {
    async fn exchange(&self, messages: Vec<Message>) -> Result<Message, CompletionFailure> {
        self.inner.exchange(messages).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::{MockCompletionClient, ScriptedClient};
    use std::time::Duration;

    fn scripted(reply: &'static str) -> Arc<ScriptedClient> {
        Arc::new(ScriptedClient::new(move |_| Ok(reply.to_string())))
    }

    #[test]
    fn test_parse_option_index_takes_first_integer() {
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(parse_option_index("1: No", 2, &mut rng), 1);
        assert_eq!(parse_option_index("I'd say 0, then 1", 2, &mut rng), 0);
    }

    #[test]
    fn test_parse_option_index_falls_back_within_range() {
        let mut rng = StdRng::seed_from_u64(7);
        for reply in ["no digits here", "7", "99999999999999999999999", ""] {
            let idx = parse_option_index(reply, 2, &mut rng);
            assert!(idx < 2, "fallback for {reply:?} out of range");
        }
    }

    #[test]
    fn test_parse_option_index_fallback_is_reproducible() {
        let picks = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            (0..16)
                .map(|_| parse_option_index("maybe", 2, &mut rng))
                .collect::<Vec<_>>()
        };
        assert_eq!(picks(555), picks(555));
    }

    #[tokio::test]
    async fn test_exchange_appends_inputs_and_reply() {
        let client = scripted("Hi class");
        let participant = Participant::new("Teacher", "be nice", client.clone());

        let reply = participant
            .exchange(vec![Message::user("q1"), Message::user("q2")])
            .await
            .unwrap();

        assert_eq!(reply, Message::assistant("Hi class"));
        assert_eq!(
            participant.history().await,
            vec![Message::user("q1"), Message::user("q2"), Message::assistant("Hi class")]
        );
        // The model sees the system prompt followed by the history.
        let call = &client.calls()[0];
        assert_eq!(call[0], Message::system("be nice"));
        assert_eq!(call.len(), 3);
    }

    #[tokio::test]
    async fn test_empty_exchange_continues_history() {
        let client = scripted("more");
        let participant = Participant::new("Supporter", "sys", client.clone());
        participant.record(Message::user("earlier")).await;

        participant.exchange(vec![]).await.unwrap();

        assert_eq!(client.calls()[0].len(), 2);
        assert_eq!(participant.history().await.len(), 2);
    }

    #[tokio::test]
    async fn test_completion_failure_propagates_unmodified() {
        let mut mock = MockCompletionClient::new();
        mock.expect_complete()
            .times(1)
            .returning(|_, _| Err(CompletionFailure::RateLimited("quota".into())));
        let teacher = Teacher::new("sys", Arc::new(mock));

        let err = teacher.exchange(vec![Message::user("hello")]).await.unwrap_err();
        assert_eq!(err, CompletionFailure::RateLimited("quota".into()));
    }

    #[tokio::test]
    async fn test_exchanges_on_one_agent_are_serialized() {
        let client = Arc::new(ScriptedClient::new(|history| {
            std::thread::sleep(Duration::from_millis(5));
            Ok(format!("reply to {}", history.len()))
        }));
        let participant = Arc::new(Participant::new("Student-1", "sys", client));

        let a = tokio::spawn({
            let p = participant.clone();
            async move { p.exchange(vec![Message::user("a")]).await }
        });
        let b = tokio::spawn({
            let p = participant.clone();
            async move { p.exchange(vec![Message::user("b")]).await }
        });
        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();

        // Each input is immediately followed by its own reply.
        let history = participant.history().await;
        assert_eq!(history.len(), 4);
        assert_eq!(history[0].role, Role::User);
        assert_eq!(history[1].role, Role::Assistant);
        assert_eq!(history[2].role, Role::User);
        assert_eq!(history[3].role, Role::Assistant);
    }

    #[tokio::test]
    async fn test_introduce_strips_opening_prompt() {
        let teacher = Teacher::new("sys", scripted("Welcome to volcanoes!"));

        let intro = teacher.introduce("volcanoes").await.unwrap();

        assert_eq!(intro, "Welcome to volcanoes!");
        assert_eq!(teacher.transcript().await, vec![Message::assistant("Welcome to volcanoes!")]);
    }

    #[tokio::test]
    async fn test_class_log_renames_teacher_replies() {
        let teacher = Teacher::new("sys", scripted("Lava is hot."));
        teacher.exchange(vec![Message::user("Why?").named("Student-1")]).await.unwrap();

        let log = teacher.class_log().await;
        assert_eq!(log[0], Message::user("Why?").named("Student-1"));
        assert_eq!(log[1], Message::user("Lava is hot.").named("Teacher"));
    }

    #[tokio::test]
    async fn test_classify_does_not_touch_callers_context() {
        let supporter = Supporter::new("sys", scripted("0"), Some(1));
        let context = vec![Message::user("Plants eat sunlight.").named("Teacher")];

        let needs_support = supporter.classify_needs_support(&context).await.unwrap();

        assert!(needs_support);
        assert_eq!(context.len(), 1);
        let history = supporter.history().await;
        assert_eq!(history.len(), 3);
        assert_eq!(history[1].role, Role::System);
        assert!(history[1].content.contains("answer only in number"));
    }

    #[tokio::test]
    async fn test_classify_no_support() {
        let supporter = Supporter::new("sys", scripted("1"), Some(1));
        assert!(!supporter.classify_needs_support(&[]).await.unwrap());
    }

    #[tokio::test]
    async fn test_ambiguous_classification_is_reproducible_with_seed() {
        let run = |seed| async move {
            let supporter = Supporter::new("sys", scripted("I cannot decide"), Some(seed));
            let mut decisions = Vec::new();
            for _ in 0..8 {
                decisions.push(supporter.classify_needs_support(&[]).await.unwrap());
            }
            decisions
        };
        assert_eq!(run(42).await, run(42).await);
    }

    #[tokio::test]
    async fn test_summarizer_improvements_receive_main_points_literally() {
        let client = scripted("ok");
        let summarizer = Summarizer::new("sys", client.clone());

        summarizer
            .recommend_improvements(vec![Message::user("class")], "The main points of today's class: magma")
            .await
            .unwrap();

        let call = &client.calls()[0];
        let request = &call[call.len() - 1];
        assert_eq!(request.role, Role::System);
        assert!(request.content.ends_with("The main points of today's class: magma"));
    }
}
