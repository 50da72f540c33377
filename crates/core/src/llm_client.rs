//! The completion primitive: message history in, reply message out.

use crate::error::CompletionFailure;
use crate::message::{Message, Role};
use async_openai::{
    Client,
    config::OpenAIConfig,
    error::OpenAIError,
    types::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
};
use async_trait::async_trait;
use backoff::ExponentialBackoffBuilder;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info};

/// Per-call sampling options forwarded to the model.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompletionOptions {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

/// A chat-completion backend shared by every agent in the process.
///
/// Implementations must be safe to call concurrently from different agents.
/// `close` is called exactly once, when the owning process or session ends.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Produces the next message for the given history.
    async fn complete(
        &self,
        history: &[Message],
        options: &CompletionOptions,
    ) -> Result<Message, CompletionFailure>;

    /// Releases the underlying transport.
    async fn close(&self) {}
}

/// Supported OpenAI-compatible backends.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Provider {
    OpenAI,
    Gemini,
}

impl Provider {
    pub fn api_base(&self) -> &'static str {
        match self {
            Provider::OpenAI => "https://api.openai.com/v1/",
            Provider::Gemini => "https://generativelanguage.googleapis.com/v1beta/openai",
        }
    }

    /// Parses a provider name; anything unrecognised means OpenAI.
    pub fn from_name(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "gemini" => Provider::Gemini,
            _ => Provider::OpenAI,
        }
    }
}

/// An implementation of `CompletionClient` for any OpenAI-compatible API.
pub struct OpenAICompatibleClient {
    client: Client<OpenAIConfig>,
    model: String,
    closed: AtomicBool,
}

impl OpenAICompatibleClient {
    /// Creates a new client for an OpenAI-compatible service.
    ///
    /// # Arguments
    ///
    /// * `config` - The configuration for the OpenAI client, including API key and base URL.
    /// * `model` - The model identifier to use for chat completions (e.g., "gpt-4").
    ///
    /// Rate limits and server errors surface on the first attempt; the
    /// caller decides whether to try again.
    pub fn new(config: OpenAIConfig, model: String) -> Self {
        let no_retry = ExponentialBackoffBuilder::new()
            .with_max_elapsed_time(Some(Duration::ZERO))
            .build();
        Self {
            client: Client::with_config(config).with_backoff(no_retry),
            model,
            closed: AtomicBool::new(false),
        }
    }

    /// Creates a client pointed at the given provider's endpoint.
    pub fn for_provider(provider: &Provider, api_key: &str, model: String) -> Self {
        let config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(provider.api_base());
        Self::new(config, model)
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

fn to_request_message(msg: &Message) -> Result<ChatCompletionRequestMessage, OpenAIError> {
    let request = match msg.role {
        Role::User => {
            let mut args = ChatCompletionRequestUserMessageArgs::default();
            args.content(msg.content.clone());
            if let Some(name) = &msg.name {
                args.name(name.clone());
            }
            args.build()?.into()
        }
        Role::Assistant => {
            let mut args = ChatCompletionRequestAssistantMessageArgs::default();
            args.content(msg.content.clone());
            if let Some(name) = &msg.name {
                args.name(name.clone());
            }
            args.build()?.into()
        }
        Role::System => {
            let mut args = ChatCompletionRequestSystemMessageArgs::default();
            args.content(msg.content.clone());
            if let Some(name) = &msg.name {
                args.name(name.clone());
            }
            args.build()?.into()
        }
    };
    Ok(request)
}

/// Maps an API-reported error onto the failure taxonomy.
///
/// `kind` and `code` are the error object's `type` and `code` fields; some
/// providers only fill in one of them.
fn classify_api_error(kind: Option<&str>, code: Option<&str>, message: &str) -> CompletionFailure {
    let kind = format!("{} {}", kind.unwrap_or_default(), code.unwrap_or_default()).to_lowercase();
    let lowered = message.to_lowercase();
    if kind.contains("rate_limit")
        || kind.contains("insufficient_quota")
        || lowered.contains("rate limit")
        || lowered.contains("quota")
    {
        CompletionFailure::RateLimited(message.to_string())
    } else if kind.contains("authentication")
        || kind.contains("invalid_api_key")
        || lowered.contains("api key")
        || lowered.contains("unauthorized")
    {
        CompletionFailure::Auth(message.to_string())
    } else {
        CompletionFailure::Transport(message.to_string())
    }
}

impl From<OpenAIError> for CompletionFailure {
    fn from(err: OpenAIError) -> Self {
        match err {
            OpenAIError::ApiError(api) => {
                classify_api_error(api.r#type.as_deref(), api.code.as_deref(), &api.message)
            }
            OpenAIError::InvalidArgument(msg) => CompletionFailure::Malformed(msg),
            other => CompletionFailure::Transport(other.to_string()),
        }
    }
}

#[async_trait]
impl CompletionClient for OpenAICompatibleClient {
    async fn complete(
        &self,
        history: &[Message],
        options: &CompletionOptions,
    ) -> Result<Message, CompletionFailure> {
        if self.closed.load(Ordering::Acquire) {
            return Err(CompletionFailure::Transport("client is closed".to_string()));
        }

        let messages = history
            .iter()
            .map(to_request_message)
            .collect::<Result<Vec<_>, _>>()?;

        let mut request = CreateChatCompletionRequestArgs::default();
        request.model(&self.model).messages(messages);
        if let Some(temperature) = options.temperature {
            request.temperature(temperature);
        }
        if let Some(max_tokens) = options.max_tokens {
            request.max_completion_tokens(max_tokens);
        }
        let request = request.build()?;

        debug!(model = %self.model, messages = history.len(), "Requesting completion");
        let response = self.client.chat().create(request).await?;

        let content = response
            .choices
            .first()
            .ok_or_else(|| CompletionFailure::Malformed("no response choice".to_string()))?
            .message
            .content
            .clone()
            .ok_or_else(|| CompletionFailure::Malformed("no content in response".to_string()))?;

        Ok(Message::assistant(content))
    }

    async fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            info!(model = %self.model, "Completion client closed");
        }
    }
}

type Responder = dyn Fn(&[Message]) -> Result<String, CompletionFailure> + Send + Sync;

/// A deterministic `CompletionClient` for development and integration testing.
///
/// Every call is answered by a caller-supplied function of the full history
/// and recorded, so tests can assert on exactly what each agent was shown.
pub struct ScriptedClient {
    responder: Box<Responder>,
    calls: Mutex<Vec<Vec<Message>>>,
    closed: AtomicBool,
}

impl ScriptedClient {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&[Message]) -> Result<String, CompletionFailure> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            calls: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        }
    }

    /// Every history this client has been asked to complete, in call order.
    pub fn calls(&self) -> Vec<Vec<Message>> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

#[async_trait]
impl CompletionClient for ScriptedClient {
    async fn complete(
        &self,
        history: &[Message],
        _options: &CompletionOptions,
    ) -> Result<Message, CompletionFailure> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(history.to_vec());
        }
        (self.responder)(history).map(Message::assistant)
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[test]
    fn test_provider_from_name() {
        assert_eq!(Provider::from_name("Gemini"), Provider::Gemini);
        assert_eq!(Provider::from_name("openai"), Provider::OpenAI);
        assert_eq!(Provider::from_name("something-else"), Provider::OpenAI);
        assert!(Provider::Gemini.api_base().contains("generativelanguage"));
    }

    #[test]
    fn test_classify_api_error() {
        assert!(matches!(
            classify_api_error(Some("insufficient_quota"), None, "You exceeded your current quota"),
            CompletionFailure::RateLimited(_)
        ));
        assert!(matches!(
            classify_api_error(None, None, "Rate limit reached for gpt-4"),
            CompletionFailure::RateLimited(_)
        ));
        assert!(matches!(
            classify_api_error(Some("invalid_request_error"), None, "Incorrect API key provided"),
            CompletionFailure::Auth(_)
        ));
        assert!(matches!(
            classify_api_error(Some("server_error"), None, "The server had an error"),
            CompletionFailure::Transport(_)
        ));
    }

    #[test]
    fn test_classify_api_error_reads_code() {
        assert!(matches!(
            classify_api_error(Some("requests"), Some("rate_limit_exceeded"), "Slow down"),
            CompletionFailure::RateLimited(_)
        ));
        assert!(matches!(
            classify_api_error(Some("invalid_request_error"), Some("invalid_api_key"), "Denied"),
            CompletionFailure::Auth(_)
        ));
    }

    /// Serves `status` and `body` to every request, counting the requests.
    async fn stub_server(status: &'static str, body: &'static str) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                counter.fetch_add(1, Ordering::SeqCst);
                let mut buf = vec![0u8; 16 * 1024];
                let _ = socket.read(&mut buf).await;
                let response = format!(
                    "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });
        (format!("http://{addr}/v1"), hits)
    }

    fn stub_client(api_base: &str) -> OpenAICompatibleClient {
        let config = OpenAIConfig::new()
            .with_api_key("test-key")
            .with_api_base(api_base);
        OpenAICompatibleClient::new(config, "gpt-4".to_string())
    }

    #[tokio::test]
    async fn test_rate_limit_fails_on_first_attempt() {
        let (api_base, hits) = stub_server(
            "429 Too Many Requests",
            r#"{"error":{"message":"Slow down","type":"requests","param":null,"code":"rate_limit_exceeded"}}"#,
        )
        .await;
        let client = stub_client(&api_base);

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            client.complete(&[Message::user("hi")], &CompletionOptions::default()),
        )
        .await
        .expect("a rate-limited call must not be retried");

        assert!(matches!(result, Err(CompletionFailure::RateLimited(_))));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_server_error_fails_on_first_attempt() {
        let (api_base, hits) = stub_server("503 Service Unavailable", "overloaded").await;
        let client = stub_client(&api_base);

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            client.complete(&[Message::user("hi")], &CompletionOptions::default()),
        )
        .await
        .expect("a server error must not be retried");

        assert!(matches!(result, Err(CompletionFailure::Transport(_))));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_request_message_keeps_speaker_name() {
        let msg = Message::system("Explain more").named("Supporter");
        match to_request_message(&msg).unwrap() {
            ChatCompletionRequestMessage::System(system) => {
                assert_eq!(system.name.as_deref(), Some("Supporter"));
            }
            other => panic!("expected a system message, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_scripted_client_records_calls() {
        let client = ScriptedClient::new(|history| Ok(format!("seen {}", history.len())));
        let reply = client
            .complete(
                &[Message::user("a"), Message::user("b")],
                &CompletionOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(reply, Message::assistant("seen 2"));
        assert_eq!(client.calls().len(), 1);
        assert!(!client.is_closed());
        client.close().await;
        assert!(client.is_closed());
    }

    #[tokio::test]
    async fn test_closed_openai_client_refuses_calls() {
        let client = OpenAICompatibleClient::for_provider(
            &Provider::OpenAI,
            "test-key",
            "gpt-4".to_string(),
        );
        client.close().await;
        let err = client
            .complete(&[Message::user("hi")], &CompletionOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CompletionFailure::Transport(_)));
    }
}
