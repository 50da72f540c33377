//! Role instructions and the fixed requests the agents append to their input.
//!
//! The four role instructions can be overridden from a directory of markdown
//! files named after the role (`teacher.md`, `student.md`, `supporter.md`,
//! `summarizer.md`). Requests are part of the protocol and are not overridable.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::info;

const TEACHER_INSTRUCTION: &str = "You are a teacher in the elementary school classroom. \
You should interact with multiple students regarding a specific topic. \
However, you are also not a perfect teacher, so you might have to give a false or insufficent answer sometimes. \
If the supporter suggests some additional contents, you can improve your previous answer or continue the lecture. \
Your answer should be in one or two sentences.";

const STUDENT_INSTRUCTION: &str = "You are a student in the classroom who is 10 years old. \
You should interact with the teacher and other students regarding a specific topic. \
Also you should ask as many questions as possible, even if the question has been already asked by other students. \
Focus on which part of the course is hard to understand and needs more elaboration. \
Your response should be in one or two sentences.";

const SUPPORTER_INSTRUCTION: &str = "You are a support who helps the teacher in the class. \
Your job include two things. \
First, given the interaction between the teacher and students during the class, you should determine whether there should be any additional explanation or subtopic to discuss for the questions. \
Second, if there should be, you should suggest a list of additional topics or extensions which the teacher can decide to proceed. \
You should strictly follow the output format for each response.";

const SUMMARIZER_INSTRUCTION: &str = "You are a reviewer who observed a whole class between a teacher and several students. \
You will be given the full record of the class. \
Your job is to evaluate the lecture, point out its essential contents, and advise the teacher on how to improve. \
You should strictly follow the output format for each response.";

pub const TUTOR_INSTRUCTION: &str = "You are a personal tutor who looks after individual students during a class. \
You find short, reliable readings that fit each student's background and explain them simply.";

/// Options the supporter chooses between, in request order.
pub const SUPPORT_OPTIONS: [&str; 2] = ["Yes", "No"];

pub fn opening(topic: &str) -> String {
    format!("Generate the introduction of today's lecture topic: {topic}")
}

pub fn classify_support() -> String {
    let options = SUPPORT_OPTIONS
        .iter()
        .enumerate()
        .map(|(i, option)| format!("{i}: {option}"))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "Do you think the teacher's answer needs some support or not? You should answer only in number.\n\n{options}"
    )
}

pub const PROPOSE_EXTENSION: &str = "Suggest about 2-3 additional subtopics or extensions you think useful for the teacher to help the students understand better.\n\n\
Your answer should start with: 'It might be great to explain more about...' and then the list of suggestions.";

pub const RATE_CLASS: &str = "Rate the overall quality of the lecture in terms of the quality of the content and how detailed and understandable the teacher's explanation is. \
You should generate the score between 1 to 10 and a brief reason in one sentence.";

pub const MAIN_POINTS: &str = "Generate 2-3 essential subtopics or contents during the class. \
These could be the ones which most students were curious about or which you think as the important contents to refer to for improving the course quality in the future. \
Your answer should start with: 'The main points of today's class: ' and then the list of contents. Each item should be as simple as possible.";

pub fn improvements(main_points: &str) -> String {
    format!(
        "Generate your recommendation to the teacher so that the course quality can be improve next time based on the suggested main points of the class. \
You should only give recommendations without any additional ratings or repetition of main points.\n\n{main_points}"
    )
}

pub fn help_topic(student: &str, background: &str) -> String {
    format!(
        "Generate one topic word which would be most helpful to the student {student}. If there is none, just generate 'None'.\n\nStudent background: {background}."
    )
}

pub fn help_summary(article: &str) -> String {
    format!(
        "Generate the summarization of given article in 2-3 sentences to help the student.\n\n{article}"
    )
}

/// The role instructions used as each agent's system prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompts {
    pub teacher: String,
    pub student: String,
    pub supporter: String,
    pub summarizer: String,
}

impl Default for Prompts {
    fn default() -> Self {
        Self {
            teacher: TEACHER_INSTRUCTION.to_string(),
            student: STUDENT_INSTRUCTION.to_string(),
            supporter: SUPPORTER_INSTRUCTION.to_string(),
            summarizer: SUMMARIZER_INSTRUCTION.to_string(),
        }
    }
}

impl Prompts {
    /// Loads the defaults, replacing any role that has a `<role>.md` file in `dir`.
    pub fn load(dir: &Path) -> Result<Self> {
        let mut prompts = Self::default();
        for entry in fs::read_dir(dir)
            .with_context(|| format!("Could not read prompts directory {}", dir.display()))?
        {
            let path = entry?.path();
            if !path.is_file() || path.extension().and_then(|s| s.to_str()) != Some("md") {
                continue;
            }
            let key = path
                .file_stem()
                .and_then(|s| s.to_str())
                .context("Could not get file stem")?;
            let slot = match key {
                "teacher" => &mut prompts.teacher,
                "student" => &mut prompts.student,
                "supporter" => &mut prompts.supporter,
                "summarizer" => &mut prompts.summarizer,
                _ => continue,
            };
            *slot = fs::read_to_string(&path)?.trim().to_string();
            info!(role = key, "Loaded prompt override");
        }
        Ok(prompts)
    }

    /// The teacher instruction, scoped to a topic when one is known up front.
    pub fn teacher_for(&self, topic: Option<&str>) -> String {
        match topic {
            Some(topic) => format!("{} The topic is about {topic}.", self.teacher),
            None => self.teacher.clone(),
        }
    }

    pub fn student_for(&self, topic: &str) -> String {
        format!("{} The topic is about {topic}.", self.student)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_request_lists_numbered_options() {
        let request = classify_support();
        assert!(request.ends_with("0: Yes\n1: No"));
        assert!(request.contains("answer only in number"));
    }

    #[test]
    fn test_improvements_request_carries_main_points_verbatim() {
        let request = improvements("The main points of today's class: gravity");
        assert!(request.ends_with("\n\nThe main points of today's class: gravity"));
    }

    #[test]
    fn test_teacher_for_topic() {
        let prompts = Prompts::default();
        assert!(prompts.teacher_for(Some("volcanoes")).ends_with("The topic is about volcanoes."));
        assert_eq!(prompts.teacher_for(None), prompts.teacher);
    }

    #[test]
    fn test_load_overrides_known_roles_only() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("teacher.md"), "Custom teacher.\n").unwrap();
        fs::write(dir.path().join("unknown.md"), "ignored").unwrap();
        fs::write(dir.path().join("student.txt"), "ignored").unwrap();

        let prompts = Prompts::load(dir.path()).unwrap();
        assert_eq!(prompts.teacher, "Custom teacher.");
        assert_eq!(prompts.student, Prompts::default().student);
    }

    #[test]
    fn test_load_missing_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Prompts::load(&dir.path().join("missing")).is_err());
    }
}
