//! Personalized help for a single student, backed by an encyclopedia lookup.

use crate::agent::{Exchangeable, Participant};
use crate::error::{CompletionFailure, LookupMiss};
use crate::llm_client::{CompletionClient, CompletionOptions};
use crate::message::Message;
use crate::prompts;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

/// Longest article excerpt handed to the model.
const EXCERPT_CHARS: usize = 1000;

/// Finds reading material for a topic.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TopicLookup: Send + Sync {
    /// Titles matching `query`, best first. May be empty.
    async fn search_titles(&self, query: &str) -> Result<Vec<String>, LookupMiss>;

    /// The plain-text extract of an article, if it has one.
    async fn fetch_extract(&self, title: &str) -> Result<Option<String>, LookupMiss>;
}

/// `TopicLookup` over the MediaWiki API.
pub struct WikipediaClient {
    http: reqwest::Client,
    base_url: String,
}

impl WikipediaClient {
    pub const DEFAULT_BASE_URL: &'static str = "https://en.wikipedia.org/w/api.php";

    pub fn new(base_url: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .user_agent(concat!("classroom-core/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    async fn get_json(&self, params: &[(&str, &str)]) -> Result<Value, LookupMiss> {
        let transport = |e: reqwest::Error| LookupMiss::Transport(e.to_string());
        self.http
            .get(&self.base_url)
            .query(params)
            .send()
            .await
            .map_err(transport)?
            .error_for_status()
            .map_err(transport)?
            .json::<Value>()
            .await
            .map_err(transport)
    }
}

impl Default for WikipediaClient {
    fn default() -> Self {
        Self::new(Self::DEFAULT_BASE_URL)
    }
}

/// `opensearch` answers `[query, [titles], [descriptions], [urls]]`.
fn parse_titles(response: &Value) -> Vec<String> {
    response
        .get(1)
        .and_then(Value::as_array)
        .map(|titles| {
            titles
                .iter()
                .filter_map(|t| t.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

fn parse_extract(response: &Value) -> Option<String> {
    response
        .pointer("/query/pages/0/extract")
        .and_then(Value::as_str)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

#[async_trait]
impl TopicLookup for WikipediaClient {
    async fn search_titles(&self, query: &str) -> Result<Vec<String>, LookupMiss> {
        let response = self
            .get_json(&[("action", "opensearch"), ("format", "json"), ("search", query)])
            .await?;
        Ok(parse_titles(&response))
    }

    async fn fetch_extract(&self, title: &str) -> Result<Option<String>, LookupMiss> {
        let response = self
            .get_json(&[
                ("action", "query"),
                ("format", "json"),
                ("prop", "extracts"),
                ("titles", title),
                ("explaintext", "1"),
                ("formatversion", "2"),
            ])
            .await?;
        Ok(parse_extract(&response))
    }
}

/// Tailors a short reading to one student's background.
///
/// Each `generate_help` call talks to a fresh participant, so one student's
/// context never reaches the next request.
pub struct PersonalizedTutor {
    client: Arc<dyn CompletionClient>,
    options: CompletionOptions,
    lookup: Arc<dyn TopicLookup>,
}

impl PersonalizedTutor {
    pub fn new(client: Arc<dyn CompletionClient>, lookup: Arc<dyn TopicLookup>) -> Self {
        Self {
            client,
            options: CompletionOptions::default(),
            lookup,
        }
    }

    pub fn with_options(mut self, options: CompletionOptions) -> Self {
        self.options = options;
        self
    }

    fn session(&self) -> Participant {
        Participant::new("Tutor", prompts::TUTOR_INSTRUCTION, self.client.clone())
            .with_options(self.options.clone())
    }

    /// Picks a helpful topic for `student`, looks it up and summarizes the
    /// article. Returns `None` when the model sees nothing to add or the
    /// lookup comes back empty.
    pub async fn generate_help(
        &self,
        student: &str,
        background: &str,
        context: &[Message],
    ) -> Result<Option<String>, CompletionFailure> {
        let tutor = self.session();
        let mut queries = context.to_vec();
        queries.push(Message::system(prompts::help_topic(student, background)));
        let topic = tutor.exchange_text(queries).await?;
        if topic.contains("None") {
            return Ok(None);
        }

        let article = match self.find_article(topic.trim()).await {
            Ok(article) => article,
            Err(miss) => {
                warn!(student, %miss, "Skipping personalized help");
                return Ok(None);
            }
        };
        let excerpt: String = article.chars().take(EXCERPT_CHARS).collect();
        let help = tutor
            .exchange_text(vec![Message::system(prompts::help_summary(&excerpt))])
            .await?;
        info!(student, topic = topic.trim(), "Personalized help ready");
        Ok(Some(help))
    }

    async fn find_article(&self, topic: &str) -> Result<String, LookupMiss> {
        let title = self
            .lookup
            .search_titles(topic)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| LookupMiss::NotFound(topic.to_string()))?;
        self.lookup
            .fetch_extract(&title)
            .await?
            .ok_or(LookupMiss::NotFound(title))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::ScriptedClient;
    use serde_json::json;

    fn tutor_client(topic: &'static str) -> Arc<ScriptedClient> {
        Arc::new(ScriptedClient::new(move |history| {
            let last = &history[history.len() - 1].content;
            if last.starts_with("Generate one topic word") {
                Ok(topic.to_string())
            } else {
                Ok(format!("Summary of {} chars", last.len()))
            }
        }))
    }

    #[test]
    fn test_parse_opensearch_titles() {
        let response = json!(["lava", ["Lava", "Lava lamp"], ["", ""], ["u1", "u2"]]);
        assert_eq!(parse_titles(&response), vec!["Lava", "Lava lamp"]);
        assert!(parse_titles(&json!(["lava"])).is_empty());
    }

    #[test]
    fn test_parse_extract() {
        let response = json!({"query": {"pages": [{"title": "Lava", "extract": "Lava is molten rock."}]}});
        assert_eq!(parse_extract(&response).as_deref(), Some("Lava is molten rock."));
        let missing = json!({"query": {"pages": [{"title": "Nope", "missing": true}]}});
        assert_eq!(parse_extract(&missing), None);
    }

    #[tokio::test]
    async fn test_help_summarizes_first_article() {
        let mut lookup = MockTopicLookup::new();
        lookup
            .expect_search_titles()
            .withf(|q| q.to_string() == "Lava")
            .returning(|_| Ok(vec!["Lava".to_string(), "Lava lamp".to_string()]));
        lookup
            .expect_fetch_extract()
            .withf(|t| t.to_string() == "Lava")
            .returning(|_| Ok(Some("x".repeat(5000))));
        let client = tutor_client(" Lava ");
        let tutor = PersonalizedTutor::new(client.clone(), Arc::new(lookup));

        let help = tutor.generate_help("Mina", "likes drawing", &[]).await.unwrap();

        assert!(help.is_some());
        let summary_call = &client.calls()[1];
        let request = &summary_call[summary_call.len() - 1].content;
        assert_eq!(request.matches('x').count(), EXCERPT_CHARS);
    }

    #[tokio::test]
    async fn test_consecutive_students_do_not_share_context() {
        let mut lookup = MockTopicLookup::new();
        lookup
            .expect_search_titles()
            .returning(|_| Ok(vec!["Lava".to_string()]));
        lookup
            .expect_fetch_extract()
            .returning(|_| Ok(Some("Lava is molten rock.".to_string())));
        let client = tutor_client("Lava");
        let tutor = PersonalizedTutor::new(client.clone(), Arc::new(lookup));

        let mina_context = [Message::user("Is lava hot?").named("Mina")];
        tutor.generate_help("Mina", "likes drawing", &mina_context).await.unwrap();
        tutor.generate_help("Omar", "plays chess", &[]).await.unwrap();

        let calls = client.calls();
        assert_eq!(calls.len(), 4);
        let omar_calls = &calls[2..];
        for history in omar_calls {
            assert!(history.iter().all(|m| !m.content.contains("Mina")));
            assert!(history.iter().all(|m| !m.content.contains("Is lava hot?")));
        }
        // Omar's first request holds only the instruction and his own question.
        assert_eq!(omar_calls[0].len(), 2);
    }

    #[tokio::test]
    async fn test_none_topic_skips_lookup() {
        let lookup = MockTopicLookup::new();
        let tutor = PersonalizedTutor::new(tutor_client("None"), Arc::new(lookup));
        assert_eq!(tutor.generate_help("Mina", "", &[]).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_lookup_miss_is_absorbed() {
        let mut lookup = MockTopicLookup::new();
        lookup.expect_search_titles().returning(|_| Ok(vec![]));
        let tutor = PersonalizedTutor::new(tutor_client("Basalt"), Arc::new(lookup));
        assert_eq!(tutor.generate_help("Mina", "", &[]).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_lookup_transport_error_is_absorbed() {
        let mut lookup = MockTopicLookup::new();
        lookup
            .expect_search_titles()
            .returning(|_| Err(LookupMiss::Transport("dns".to_string())));
        let tutor = PersonalizedTutor::new(tutor_client("Basalt"), Arc::new(lookup));
        assert_eq!(tutor.generate_help("Mina", "", &[]).await.unwrap(), None);
    }
}
