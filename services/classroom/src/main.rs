//! Batch classroom simulation.
//!
//! Runs one full lecture against the configured provider and writes the
//! teacher's transcript to the output directory.

mod args;

use anyhow::Result;
use args::Args;
use clap::Parser;
use classroom_core::{
    lecture::{Classroom, Lecture, LectureConfig},
    llm_client::{CompletionClient, OpenAICompatibleClient},
    prompts::Prompts,
    transcript::write_transcript,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .init();

    let prompts = match &args.prompts {
        Some(dir) => Prompts::load(dir)?,
        None => Prompts::default(),
    };
    let api_key = args.api_key()?;
    let client: Arc<dyn CompletionClient> = Arc::new(OpenAICompatibleClient::for_provider(
        &args.provider(),
        &api_key,
        args.model.clone(),
    ));

    info!(
        topic = %args.topic,
        model = %args.model,
        students = args.num_students,
        max_turns = args.max_turns,
        seed = args.seed,
        "Starting simulation"
    );
    let outcome = simulate(&args, client.clone(), &prompts).await;
    client.close().await;

    let path = outcome?;
    info!(path = %path.display(), "Simulation finished");
    Ok(())
}

/// Runs the lecture to completion and exports its transcript.
async fn simulate(
    args: &Args,
    client: Arc<dyn CompletionClient>,
    prompts: &Prompts,
) -> Result<PathBuf> {
    let classroom = Classroom::new(
        client,
        prompts,
        &args.topic,
        args.num_students,
        Some(args.seed),
    )
    .with_options(args.completion_options());
    let lecture = Lecture::new(
        classroom,
        LectureConfig {
            topic: args.topic.clone(),
            max_turns: args.max_turns,
            seed: Some(args.seed),
        },
    )?;
    let record = lecture.run().await?;
    write_transcript(&args.output_dir, &args.artifact_meta(), &record.transcript)
}
