use std::io::Write;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader, Lines, Stdin};
use tokio::sync::{watch, Mutex};

use crate::core::time::format_remaining;
use crate::services::answers::{AnswerValue, Question, QuestionKind};
use crate::services::attempt_session::{ExamAttemptSession, SubmitMode, SubmitOutcome};
use crate::services::errors::SessionError;
use crate::services::observer::{Confirmation, SessionObserver, SubmissionOutcome, SubmitPreview};

const HELP: &str = "commands: <question> <answer> | clear <question> | status | submit | quit";

type Input<R = Stdin> = Arc<Mutex<Lines<BufReader<R>>>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Command {
    Answer { question: String, raw: String },
    Clear(String),
    Status,
    Submit,
    Help,
    Quit,
}

impl Command {
    pub(crate) fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let (head, rest) = match line.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, rest.trim()),
            None => (line, ""),
        };

        let command = match (head.to_ascii_lowercase().as_str(), rest) {
            ("status", "") => Self::Status,
            ("submit", "") => Self::Submit,
            ("help", "") | ("?", "") => Self::Help,
            ("quit", "") | ("exit", "") => Self::Quit,
            ("clear", question) if !question.is_empty() => Self::Clear(question.to_string()),
            (_, "") => Self::Help,
            _ => Self::Answer { question: head.to_string(), raw: rest.to_string() },
        };
        Some(command)
    }
}

/// Shapes typed input into the answer the question expects. Option keys are matched
/// case-insensitively.
pub(crate) fn parse_answer(question: &Question, raw: &str) -> Result<AnswerValue, String> {
    let raw = raw.trim();
    match &question.kind {
        QuestionKind::MultipleChoice { options } => options
            .keys()
            .find(|key| key.eq_ignore_ascii_case(raw))
            .map(|key| AnswerValue::Choice(key.clone()))
            .ok_or_else(|| {
                let keys: Vec<_> = options.keys().map(String::as_str).collect();
                format!("choose one of {}", keys.join(", "))
            }),
        QuestionKind::ShortText | QuestionKind::LongText => Ok(AnswerValue::Text(raw.to_string())),
        QuestionKind::FileUpload => Ok(AnswerValue::File(raw.to_string())),
    }
}

/// Prints session events for the student. Logs go to stderr, so stdout stays readable.
#[derive(Debug, Default)]
pub(crate) struct ConsoleObserver;

impl SessionObserver for ConsoleObserver {
    fn on_tick(&self, remaining_seconds: u64) {
        if remaining_seconds % 60 == 0 || remaining_seconds <= 10 {
            println!("Time left: {}", format_remaining(remaining_seconds));
        }
    }

    fn on_answered(&self, count: usize, total: usize) {
        println!("Answered {count}/{total}");
    }

    fn on_submitted(&self, outcome: &SubmissionOutcome) {
        match outcome {
            SubmissionOutcome::Scored { obtained, total } => {
                println!("Exam submitted. Score: {obtained}/{total}");
            }
            SubmissionOutcome::PendingEvaluation { message } => {
                println!(
                    "Exam submitted. {}",
                    message.as_deref().unwrap_or("Your answers will be evaluated later.")
                );
            }
        }
    }

    fn on_failed(&self, error: &SessionError) {
        println!("{error}");
    }
}

/// Asks on stdin before a manual submission. Answers no once the attempt is cancelled.
pub(crate) struct StdinConfirmation<R = Stdin> {
    input: Input<R>,
    cancelled: watch::Receiver<bool>,
}

#[async_trait]
impl<R> Confirmation for StdinConfirmation<R>
where
    R: AsyncRead + Unpin + Send,
{
    async fn confirm(&self, preview: &SubmitPreview) -> bool {
        let mut prompt = format!(
            "Submit now? {} of {} answered, {} left.",
            preview.answered,
            preview.total,
            format_remaining(preview.remaining_seconds)
        );
        if preview.unanswered() > 0 {
            prompt.push_str(&format!(" {} unanswered.", preview.unanswered()));
        }
        if preview.file_questions > 0 {
            prompt.push_str(" File answers are not sent for scoring.");
        }
        print!("{prompt} [y/N] ");
        if let Err(err) = std::io::stdout().flush() {
            tracing::debug!(error = %err, "Failed to flush the confirmation prompt");
        }

        let mut cancelled = self.cancelled.clone();
        let line = tokio::select! {
            line = async { self.input.lock().await.next_line().await } => line,
            _ = until_cancelled(&mut cancelled) => {
                println!();
                tracing::debug!("Attempt cancelled while waiting for confirmation");
                return false;
            }
        };

        match line {
            Ok(Some(line)) => is_yes(&line),
            Ok(None) => false,
            Err(err) => {
                tracing::warn!(error = %err, "Failed to read confirmation");
                false
            }
        }
    }
}

async fn until_cancelled(cancelled: &mut watch::Receiver<bool>) {
    loop {
        let done = *cancelled.borrow_and_update();
        if done || cancelled.changed().await.is_err() {
            return;
        }
    }
}

fn is_yes(line: &str) -> bool {
    matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

/// Prompts once and reads a single line from stdin. `None` when input is closed.
pub(crate) async fn read_line(prompt: &str) -> anyhow::Result<Option<String>> {
    print!("{prompt}");
    if let Err(err) = std::io::stdout().flush() {
        tracing::debug!(error = %err, "Failed to flush the prompt");
    }
    Ok(BufReader::new(tokio::io::stdin()).lines().next_line().await?)
}

pub(crate) fn print_questions(questions: &[Question]) {
    for (index, question) in questions.iter().enumerate() {
        println!("{}. [{}] {}", index + 1, question.id, question.text);
        match &question.kind {
            QuestionKind::MultipleChoice { options } => {
                for (key, text) in options {
                    println!("     {key}) {text}");
                }
            }
            QuestionKind::ShortText | QuestionKind::LongText => println!("     (text answer)"),
            QuestionKind::FileUpload => println!("     (file upload, not scored here)"),
        }
    }
    println!("{HELP}");
}

/// Reads commands from stdin until the attempt is submitted or the student quits.
pub(crate) async fn run(session: &ExamAttemptSession) -> anyhow::Result<()> {
    let input: Input = Arc::new(Mutex::new(BufReader::new(tokio::io::stdin()).lines()));
    let confirmation = StdinConfirmation { input: input.clone(), cancelled: session.cancelled() };
    let mut cancelled = session.cancelled();

    loop {
        if *cancelled.borrow() {
            break;
        }

        let line = tokio::select! {
            line = async { input.lock().await.next_line().await } => line?,
            _ = cancelled.changed() => continue,
        };
        let Some(line) = line else {
            tracing::info!("Input closed; leaving the attempt unsubmitted");
            break;
        };
        let Some(command) = Command::parse(&line) else {
            continue;
        };

        match command {
            Command::Answer { question, raw } => {
                let questions = session.questions().await;
                let Some(target) = questions.iter().find(|candidate| candidate.id == question)
                else {
                    println!("Unknown question '{question}'");
                    continue;
                };
                match parse_answer(target, &raw) {
                    Ok(value) => report(session.set_answer(&question, value).await),
                    Err(hint) => println!("{hint}"),
                }
            }
            Command::Clear(question) => report(session.clear_answer(&question).await),
            Command::Status => {
                let (answered, total) = session.answered().await;
                println!(
                    "{}: {answered}/{total} answered, {} left",
                    session.phase().await.as_str(),
                    format_remaining(session.remaining_seconds().await)
                );
            }
            Command::Submit => match session.submit(SubmitMode::Manual(&confirmation)).await {
                Ok(SubmitOutcome::Submitted(_)) => break,
                Ok(SubmitOutcome::Declined) => println!("Submission cancelled"),
                Ok(SubmitOutcome::Ignored) => println!("Nothing to submit"),
                Err(_) => println!("You can try submitting again."),
            },
            Command::Help => println!("{HELP}"),
            Command::Quit => break,
        }
    }

    Ok(())
}

fn report(result: Result<(), SessionError>) {
    if let Err(err) = result {
        println!("{err}");
    }
}
