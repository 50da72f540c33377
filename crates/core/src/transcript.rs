//! Transcript artifacts written at the end of a batch lecture.

use crate::message::Message;
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Run parameters encoded into the artifact's file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactMeta {
    pub seed: u64,
    pub model: String,
    pub num_students: usize,
    pub max_turns: usize,
    pub topic: String,
}

impl ArtifactMeta {
    /// A single path component: separators in the topic become `_`.
    pub fn file_name(&self, at: DateTime<Local>) -> String {
        let topic: String = self
            .topic
            .chars()
            .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
            .collect();
        format!(
            "seed={}_model={}_students={}_turns={}_topics={}_time={}.json",
            self.seed,
            self.model,
            self.num_students,
            self.max_turns,
            topic,
            at.format("%Y-%m-%d-%H-%M-%S")
        )
    }
}

/// Writes `transcript` as a JSON array of `{role, name, content}` records
/// into `dir`, creating the directory when needed.
pub fn write_transcript(dir: &Path, meta: &ArtifactMeta, transcript: &[Message]) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
    let path = dir.join(meta.file_name(Local::now()));
    let json = serde_json::to_string(transcript)?;
    fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    info!(path = %path.display(), entries = transcript.len(), "Transcript exported");
    Ok(path)
}

pub fn read_transcript(path: &Path) -> Result<Vec<Message>> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("{} is not a transcript", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn meta() -> ArtifactMeta {
        ArtifactMeta {
            seed: 555,
            model: "gpt-4".to_string(),
            num_students: 4,
            max_turns: 20,
            topic: "volcanoes".to_string(),
        }
    }

    #[test]
    fn test_file_name_encodes_run() {
        let at = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(
            meta().file_name(at),
            "seed=555_model=gpt-4_students=4_turns=20_topics=volcanoes_time=2024-03-09-14-05-07.json"
        );
    }

    #[test]
    fn test_topic_separators_stay_in_one_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let meta = ArtifactMeta {
            topic: "rocks/minerals\\gems".to_string(),
            ..meta()
        };
        let at = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        assert!(meta.file_name(at).contains("_topics=rocks_minerals_gems_"));

        let path = write_transcript(dir.path(), &meta, &[Message::assistant("hi")]).unwrap();
        assert_eq!(path.parent(), Some(dir.path()));
    }

    #[test]
    fn test_records_have_role_name_content() {
        let json = serde_json::to_value(vec![Message::assistant("hi")]).unwrap();
        assert_eq!(
            json,
            serde_json::json!([{ "role": "assistant", "name": null, "content": "hi" }])
        );
    }

    #[test]
    fn test_transcript_survives_write_and_read() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("data");
        let transcript = vec![
            Message::assistant("Welcome!"),
            Message::system("It might be great to explain more about ash.").named("Supporter"),
            Message::user("Why is lava red?").named("Student-2"),
            Message::system("8: good").named("Summarizer"),
        ];

        let path = write_transcript(&out, &meta(), &transcript).unwrap();

        assert!(path.starts_with(&out));
        assert_eq!(read_transcript(&path).unwrap(), transcript);
    }

    #[test]
    fn test_read_rejects_non_transcript() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "{\"not\": \"a list\"}").unwrap();
        assert!(read_transcript(&path).is_err());
    }
}
