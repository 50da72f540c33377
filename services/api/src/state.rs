//! Shared Application State
//!
//! This module defines the `AppState` struct, which holds the shared
//! completion client and the agents behind the request endpoints.

use crate::config::Config;
use classroom_core::{
    agent::{Summarizer, Supporter},
    llm_client::CompletionClient,
    prompts::Prompts,
    tutor::{PersonalizedTutor, TopicLookup},
};
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
///
/// The request endpoints keep no turn context between calls, only the
/// private histories of `supporter` and `summarizer`. Socket sessions build
/// their own agents from `llm_client` and `prompts`.
#[derive(Clone)]
pub struct AppState {
    pub llm_client: Arc<dyn CompletionClient>,
    pub prompts: Arc<Prompts>,
    pub supporter: Arc<Supporter>,
    pub summarizer: Arc<Summarizer>,
    pub tutor: Arc<PersonalizedTutor>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(
        config: Config,
        llm_client: Arc<dyn CompletionClient>,
        lookup: Arc<dyn TopicLookup>,
        prompts: Prompts,
    ) -> Self {
        let options = config.completion_options();
        let supporter = Supporter::new(prompts.supporter.clone(), llm_client.clone(), config.seed)
            .with_options(options.clone());
        let summarizer = Summarizer::new(prompts.summarizer.clone(), llm_client.clone())
            .with_options(options.clone());
        let tutor = PersonalizedTutor::new(llm_client.clone(), lookup).with_options(options);
        Self {
            llm_client,
            prompts: Arc::new(prompts),
            supporter: Arc::new(supporter),
            summarizer: Arc::new(summarizer),
            tutor: Arc::new(tutor),
            config: Arc::new(config),
        }
    }
}
