//! Lecture Orchestrator
//!
//! Drives one class through `Init → Teaching(0..max_turns) → Closing →
//! Summarizing → Done`, or to `Failed` as soon as a completion fails. The
//! orchestrator owns the turn context and decides
//! who speaks; the agents only ever see snapshots of it.

use crate::agent::{Exchangeable, Student, Summarizer, Supporter, Teacher};
use crate::context::TurnContext;
use crate::error::{CompletionFailure, LectureError};
use crate::llm_client::{CompletionClient, CompletionOptions};
use crate::message::{Message, speaker};
use crate::prompts::Prompts;
use crate::review::{ClassReview, review_and_record};
use crate::support::{SupportOutcome, run_support_cycle};
use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};
use std::fmt;
use std::sync::Arc;
use tracing::info;

/// The agents taking part in one lecture.
pub struct Classroom {
    pub teacher: Teacher,
    pub students: Vec<Student>,
    pub supporter: Supporter,
    pub summarizer: Summarizer,
}

impl Classroom {
    /// Seats a teacher, `num_students` students, a supporter and a summarizer
    /// for `topic`, all sharing one completion client.
    pub fn new(
        client: Arc<dyn CompletionClient>,
        prompts: &Prompts,
        topic: &str,
        num_students: usize,
        seed: Option<u64>,
    ) -> Self {
        let students = (0..num_students)
            .map(|i| Student::new(speaker::student(i), prompts.student_for(topic), client.clone()))
            .collect();
        Self {
            teacher: Teacher::new(prompts.teacher_for(Some(topic)), client.clone()),
            students,
            supporter: Supporter::new(prompts.supporter.clone(), client.clone(), seed.map(|s| s.wrapping_add(1))),
            summarizer: Summarizer::new(prompts.summarizer.clone(), client),
        }
    }

    /// Applies the same sampling options to every agent in the room.
    pub fn with_options(self, options: CompletionOptions) -> Self {
        Self {
            teacher: self.teacher.with_options(options.clone()),
            students: self
                .students
                .into_iter()
                .map(|s| s.with_options(options.clone()))
                .collect(),
            supporter: self.supporter.with_options(options.clone()),
            summarizer: self.summarizer.with_options(options),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LectureConfig {
    pub topic: String,
    pub max_turns: usize,
    /// Fixes student selection and classification fallbacks when set.
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Init,
    Teaching { turn: usize },
    Closing,
    Summarizing,
    Done,
    /// A completion failed; nothing more can be asked of this lecture.
    Failed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Init => write!(f, "init"),
            Phase::Teaching { turn } => write!(f, "teaching turn {turn}"),
            Phase::Closing => write!(f, "closing"),
            Phase::Summarizing => write!(f, "summarizing"),
            Phase::Done => write!(f, "done"),
            Phase::Failed => write!(f, "failed"),
        }
    }
}

/// A student's contribution to a turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentLine {
    /// Position of the student in the classroom's pool.
    pub index: usize,
    pub name: String,
    pub text: String,
}

/// Everything that was said during one teaching turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnReport {
    pub turn: usize,
    pub teacher: String,
    pub support: Option<SupportOutcome>,
    pub students: Vec<StudentLine>,
}

/// The outcome of a complete lecture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LectureRecord {
    pub turns: Vec<TurnReport>,
    pub closing: String,
    pub review: ClassReview,
    /// The teacher's private history: the authoritative transcript.
    pub transcript: Vec<Message>,
}

/// Picks 1 or 2 distinct students out of a pool of `pool` in random order.
///
/// A pool of one always yields that single student.
pub fn choose_speakers<R: Rng + ?Sized>(rng: &mut R, pool: usize) -> Vec<usize> {
    let amount = rng.random_range(1..=2).min(pool);
    index::sample(rng, pool, amount).into_vec()
}

pub struct Lecture {
    classroom: Classroom,
    config: LectureConfig,
    rng: StdRng,
    context: TurnContext,
    phase: Phase,
    opening: Option<String>,
}

impl Lecture {
    pub fn new(classroom: Classroom, config: LectureConfig) -> Result<Self, LectureError> {
        if classroom.students.is_empty() {
            return Err(LectureError::InvalidConfig(
                "a lecture needs at least one student".to_string(),
            ));
        }
        if config.max_turns == 0 {
            return Err(LectureError::InvalidConfig(
                "a lecture needs at least one turn".to_string(),
            ));
        }
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Ok(Self {
            classroom,
            config,
            rng,
            context: TurnContext::new(),
            phase: Phase::Init,
            opening: None,
        })
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn context(&self) -> &TurnContext {
        &self.context
    }

    pub fn classroom(&self) -> &Classroom {
        &self.classroom
    }

    fn wrong_phase(&self, action: &'static str) -> LectureError {
        LectureError::Phase {
            action,
            phase: self.phase.to_string(),
        }
    }

    /// Records a completion failure as terminal. A turn that failed halfway
    /// has already written to the window and the agents' histories, so it
    /// cannot be replayed.
    fn settle<T>(&mut self, result: Result<T, CompletionFailure>) -> Result<T, LectureError> {
        if result.is_err() {
            self.phase = Phase::Failed;
        }
        Ok(result?)
    }

    /// Init: the teacher introduces the topic. The introduction becomes the
    /// teacher's utterance for turn 0.
    pub async fn open(&mut self) -> Result<String, LectureError> {
        if self.phase != Phase::Init {
            return Err(self.wrong_phase("open"));
        }
        let intro = self.classroom.teacher.introduce(&self.config.topic).await;
        let intro = self.settle(intro)?;
        self.opening = Some(intro.clone());
        self.context.clear();
        self.phase = Phase::Teaching { turn: 0 };
        info!(topic = %self.config.topic, max_turns = self.config.max_turns, "Lecture opened");
        Ok(intro)
    }

    /// Runs one teaching turn: teacher, at most one support cycle, 1-2
    /// students, then truncation to the students' lines.
    pub async fn teach_turn(&mut self) -> Result<TurnReport, LectureError> {
        let Phase::Teaching { turn } = self.phase else {
            return Err(self.wrong_phase("teach"));
        };
        let report = self.run_turn(turn).await;
        let report = self.settle(report)?;
        self.phase = if turn + 1 < self.config.max_turns {
            Phase::Teaching { turn: turn + 1 }
        } else {
            Phase::Closing
        };
        Ok(report)
    }

    async fn run_turn(&mut self, turn: usize) -> Result<TurnReport, CompletionFailure> {
        let teacher = match self.opening.take() {
            Some(intro) => intro,
            None => {
                self.classroom
                    .teacher
                    .exchange_text(self.context.snapshot())
                    .await?
            }
        };
        info!(turn, speaker = speaker::TEACHER, "{teacher}");
        self.context
            .push(Message::user(teacher.clone()).named(speaker::TEACHER));

        let support = run_support_cycle(
            &self.classroom.supporter,
            &self.classroom.teacher,
            self.context.messages(),
        )
        .await?;
        if let Some(outcome) = &support {
            self.context
                .push(Message::user(outcome.revised.clone()).named(speaker::TEACHER));
        }

        let speakers = choose_speakers(&mut self.rng, self.classroom.students.len());
        let mut students = Vec::with_capacity(speakers.len());
        for idx in speakers {
            let student = &self.classroom.students[idx];
            let text = student.exchange_text(self.context.snapshot()).await?;
            info!(turn, speaker = student.name(), "{text}");
            self.context
                .push(Message::user(text.clone()).named(student.name()));
            students.push(StudentLine {
                index: idx,
                name: student.name().to_string(),
                text,
            });
        }

        self.context.retain_recent(students.len());

        Ok(TurnReport {
            turn,
            teacher,
            support,
            students,
        })
    }

    /// Closing: one last teacher reply to the remaining student lines.
    pub async fn close(&mut self) -> Result<String, LectureError> {
        if self.phase != Phase::Closing {
            return Err(self.wrong_phase("close"));
        }
        let closing = self
            .classroom
            .teacher
            .exchange_text(self.context.snapshot())
            .await;
        let closing = self.settle(closing)?;
        info!(speaker = speaker::TEACHER, closing = true, "{closing}");
        self.phase = Phase::Summarizing;
        Ok(closing)
    }

    /// Summarizing: review the class and append the review to the record.
    pub async fn summarize(&mut self) -> Result<ClassReview, LectureError> {
        if self.phase != Phase::Summarizing {
            return Err(self.wrong_phase("summarize"));
        }
        let review = review_and_record(&self.classroom.summarizer, &self.classroom.teacher).await;
        let review = self.settle(review)?;
        self.phase = Phase::Done;
        Ok(review)
    }

    /// Drives the whole state machine to `Done`.
    pub async fn run(mut self) -> Result<LectureRecord, LectureError> {
        self.open().await?;
        let mut turns = Vec::with_capacity(self.config.max_turns);
        while matches!(self.phase, Phase::Teaching { .. }) {
            turns.push(self.teach_turn().await?);
        }
        let closing = self.close().await?;
        let review = self.summarize().await?;
        let transcript = self.classroom.teacher.transcript().await;
        info!(turns = turns.len(), entries = transcript.len(), "Lecture finished");
        Ok(LectureRecord {
            turns,
            closing,
            review,
            transcript,
        })
    }
}
