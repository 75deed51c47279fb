//! Bounded version prompt for the update engine
//!
//! Answers come from an injected [`VersionPrompt`] so the retry loop runs the
//! same against a terminal and against scripted responses.

use crate::{PackageError, Result};
use std::collections::VecDeque;
use std::io::{BufRead, Write};
use tracing::info;

/// Hard cap on prompt answers before the update is abandoned
pub const MAX_ATTEMPTS: usize = 5;

const QUESTION: &str = "Please enter the version you want to install.";

/// Source of interactive answers
pub trait VersionPrompt {
    /// Ask `question`; `None` when no more input is available
    fn ask(&mut self, question: &str) -> Result<Option<String>>;
}

/// Pre-recorded answers, consumed in order
#[derive(Debug, Clone, Default)]
pub struct ScriptedPrompt {
    responses: VecDeque<String>,
    asked: usize,
}

impl ScriptedPrompt {
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            responses: responses.into_iter().map(Into::into).collect(),
            asked: 0,
        }
    }

    /// How many questions have been asked
    pub fn asked(&self) -> usize {
        self.asked
    }
}

impl VersionPrompt for ScriptedPrompt {
    fn ask(&mut self, _question: &str) -> Result<Option<String>> {
        self.asked += 1;
        Ok(self.responses.pop_front())
    }
}

/// Line-oriented prompt over a reader, echoing questions to stderr
pub struct StdinPrompt<R> {
    reader: R,
}

impl<R: BufRead> StdinPrompt<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl StdinPrompt<std::io::StdinLock<'static>> {
    pub fn stdin() -> Self {
        Self::new(std::io::stdin().lock())
    }
}

impl<R: BufRead> VersionPrompt for StdinPrompt<R> {
    fn ask(&mut self, question: &str) -> Result<Option<String>> {
        let mut stderr = std::io::stderr();
        let _ = write!(stderr, "{} ", question);
        let _ = stderr.flush();

        let mut line = String::new();
        let read = self
            .reader
            .read_line(&mut line)
            .map_err(|e| PackageError::io("<stdin>", e))?;
        if read == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }
}

/// Why a proposed version cannot be installed, if it cannot
pub fn rejection(candidate: &str, installed: &str, available: &[String]) -> Option<String> {
    if candidate == installed {
        Some(format!("Version already installed: {}.", candidate))
    } else if !available.iter().any(|v| v == candidate) {
        Some(format!("Version unavailable: {}.", candidate))
    } else {
        None
    }
}

/// Ask until an installable version is given, at most [`MAX_ATTEMPTS`] times
pub fn choose_version(
    prompt: &mut dyn VersionPrompt,
    installed: &str,
    available: &[String],
) -> Result<String> {
    for attempt in 1..=MAX_ATTEMPTS {
        let Some(answer) = prompt.ask(QUESTION)? else {
            return Err(PackageError::AliasResolution(
                "No version entered; update cancelled.".to_string(),
            ));
        };
        let answer = answer.trim();
        match rejection(answer, installed, available) {
            None => return Ok(answer.to_string()),
            Some(reason) => info!(attempt, "{}", reason),
        }
    }
    Err(PackageError::AliasResolution(format!(
        "Max attempts ({}) reached.",
        MAX_ATTEMPTS
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn available() -> Vec<String> {
        vec!["1.0.0".to_string(), "1.0.1".to_string(), "2.0.0".to_string()]
    }

    #[test]
    fn test_first_valid_answer_wins() {
        let mut prompt = ScriptedPrompt::new(["2.0.0"]);
        assert_eq!(choose_version(&mut prompt, "1.0.0", &available()).unwrap(), "2.0.0");
        assert_eq!(prompt.asked(), 1);
    }

    #[test]
    fn test_retries_after_rejections() {
        let mut prompt = ScriptedPrompt::new(["1.0.0", "9.9.9", " 1.0.1 "]);
        assert_eq!(choose_version(&mut prompt, "1.0.0", &available()).unwrap(), "1.0.1");
        assert_eq!(prompt.asked(), 3);
    }

    #[test]
    fn test_gives_up_after_max_attempts() {
        let mut prompt = ScriptedPrompt::new(vec!["1.0.0"; 10]);
        let err = choose_version(&mut prompt, "1.0.0", &available()).unwrap_err();
        assert!(err.to_string().contains("Max attempts (5) reached."));
        assert_eq!(prompt.asked(), MAX_ATTEMPTS);
    }

    #[test]
    fn test_exhausted_input_cancels() {
        let mut prompt = ScriptedPrompt::new(Vec::<String>::new());
        assert!(choose_version(&mut prompt, "1.0.0", &available()).is_err());
    }

    #[test]
    fn test_reader_prompt() {
        let mut prompt = StdinPrompt::new(&b"2.0.0\n"[..]);
        assert_eq!(prompt.ask(QUESTION).unwrap().as_deref(), Some("2.0.0"));
        assert_eq!(prompt.ask(QUESTION).unwrap(), None);
    }

    #[rstest]
    #[case("1.0.0", Some("Version already installed: 1.0.0."))]
    #[case("3.0.0", Some("Version unavailable: 3.0.0."))]
    #[case("2.0.0", None)]
    fn test_rejection(#[case] candidate: &str, #[case] expected: Option<&str>) {
        assert_eq!(
            rejection(candidate, "1.0.0", &available()).as_deref(),
            expected
        );
    }
}
