//! Operator interaction. Every question the reducer asks goes through the
//! [`Operator`] trait so the whole workflow can be driven from a script in
//! tests.

use crate::error::{StepError, StepResult};
use crossterm::style::Stylize;
use dialoguer::{Confirm, Input};
use std::io::{self, BufRead, ErrorKind, Stdout, StdinLock, Write};

pub trait Operator {
    /// Show `question` and return the next input line, trimmed.
    fn ask(&mut self, question: &str) -> StepResult<String>;

    fn say(&mut self, message: &str);

    fn warn(&mut self, message: &str) {
        self.say(&message.yellow().to_string());
    }

    fn fail(&mut self, message: &str) {
        self.say(&message.red().to_string());
    }

    fn success(&mut self, message: &str) {
        self.say(&message.green().to_string());
    }

    /// Yes/no question, re-asked until the answer is recognisable.
    fn confirm(&mut self, question: &str) -> StepResult<bool> {
        loop {
            let answer = self.ask(question)?;
            match parse_yes_no(&answer) {
                Some(value) => return Ok(value),
                None => self.say("Invalid response, please answer y or n."),
            }
        }
    }

    fn ask_f64(&mut self, question: &str) -> StepResult<f64> {
        loop {
            let answer = self.ask(question)?;
            match answer.parse::<f64>() {
                Ok(value) if value.is_finite() => return Ok(value),
                _ => self.say(&format!("Unable to read '{}' as a number, try again.", answer)),
            }
        }
    }

    fn ask_u32(&mut self, question: &str) -> StepResult<u32> {
        loop {
            let answer = self.ask(question)?;
            match answer.parse::<u32>() {
                Ok(value) => return Ok(value),
                Err(_) => self.say(&format!("Unable to read '{}' as a whole number, try again.", answer)),
            }
        }
    }
}

/// Case-insensitive `y`/`yes`/`n`/`no`.
pub fn parse_yes_no(answer: &str) -> Option<bool> {
    let answer = answer.trim();
    if answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes") {
        Some(true)
    } else if answer.eq_ignore_ascii_case("n") || answer.eq_ignore_ascii_case("no") {
        Some(false)
    } else {
        None
    }
}

/// Line-oriented operator over any reader/writer pair.
pub struct ConsoleOperator<R, W> {
    input: R,
    output: W,
}

impl ConsoleOperator<StdinLock<'static>, Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> ConsoleOperator<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    #[cfg(test)]
    pub fn output(&self) -> &W {
        &self.output
    }
}

impl<R: BufRead, W: Write> Operator for ConsoleOperator<R, W> {
    fn ask(&mut self, question: &str) -> StepResult<String> {
        write!(self.output, "{}", question)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(StepError::InputClosed);
        }
        Ok(line.trim().to_string())
    }

    fn say(&mut self, message: &str) {
        if let Err(e) = writeln!(self.output, "{}", message) {
            log::warn!("failed to write to the terminal: {}", e);
        }
    }
}

/// Operator for an attached terminal, with line editing and single-key
/// yes/no answers.
pub struct TerminalOperator {
    output: Stdout,
}

impl TerminalOperator {
    pub fn new() -> Self {
        Self { output: io::stdout() }
    }
}

impl Operator for TerminalOperator {
    fn ask(&mut self, question: &str) -> StepResult<String> {
        let answer: String = Input::new()
            .with_prompt(prompt_text(question))
            .allow_empty(true)
            .interact_text()
            .map_err(from_dialoguer)?;
        Ok(answer.trim().to_string())
    }

    fn say(&mut self, message: &str) {
        if let Err(e) = writeln!(self.output, "{}", message) {
            log::warn!("failed to write to the terminal: {}", e);
        }
    }

    fn confirm(&mut self, question: &str) -> StepResult<bool> {
        Confirm::new()
            .with_prompt(prompt_text(question))
            .interact()
            .map_err(from_dialoguer)
    }
}

/// Questions are written for a plain console; dialoguer adds its own
/// `: ` or `[y/n]` suffix.
fn prompt_text(question: &str) -> &str {
    question
        .trim_end()
        .trim_end_matches("(y/n)")
        .trim_end()
        .trim_end_matches(':')
}

fn from_dialoguer(err: dialoguer::Error) -> StepError {
    match err {
        dialoguer::Error::IO(e) if matches!(e.kind(), ErrorKind::UnexpectedEof | ErrorKind::Interrupted) => {
            StepError::InputClosed
        }
        dialoguer::Error::IO(e) => StepError::Io(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn operator(input: &str) -> ConsoleOperator<Cursor<Vec<u8>>, Vec<u8>> {
        ConsoleOperator::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    fn transcript(op: &ConsoleOperator<Cursor<Vec<u8>>, Vec<u8>>) -> String {
        String::from_utf8_lossy(op.output()).into_owned()
    }

    #[test]
    fn yes_no_is_case_insensitive() {
        assert_eq!(parse_yes_no("Y"), Some(true));
        assert_eq!(parse_yes_no(" yes "), Some(true));
        assert_eq!(parse_yes_no("N"), Some(false));
        assert_eq!(parse_yes_no("No"), Some(false));
        assert_eq!(parse_yes_no("maybe"), None);
        assert_eq!(parse_yes_no(""), None);
    }

    #[test]
    fn confirm_reasks_until_valid() {
        let mut op = operator("sure\n\nN\n");
        assert!(!op.confirm("Continue? ").unwrap());
        let out = transcript(&op);
        assert_eq!(out.matches("Continue? ").count(), 3);
        assert_eq!(out.matches("Invalid response").count(), 2);
    }

    #[test]
    fn ask_f64_rejects_garbage() {
        let mut op = operator("three\nnan\n3.01\n");
        assert_eq!(op.ask_f64("What is the FWHM? ").unwrap(), 3.01);
        assert_eq!(transcript(&op).matches("Unable to read").count(), 2);
    }

    #[test]
    fn ask_u32_rejects_negative() {
        let mut op = operator("-5\n150\n");
        assert_eq!(op.ask_u32("How many? ").unwrap(), 150);
    }

    #[test]
    fn closed_input_is_reported() {
        let mut op = operator("");
        assert!(matches!(op.ask("Anything? "), Err(StepError::InputClosed)));
        let mut op = operator("maybe\n");
        assert!(matches!(op.confirm("Ok? "), Err(StepError::InputClosed)));
    }

    #[test]
    fn terminal_prompts_drop_console_suffixes() {
        assert_eq!(prompt_text("Run it anyway? (y/n) "), "Run it anyway?");
        assert_eq!(
            prompt_text("Enter the frame you want to work on (ex: n21158): "),
            "Enter the frame you want to work on (ex: n21158)"
        );
        assert_eq!(prompt_text("What is the FWHM? "), "What is the FWHM?");
    }

    #[test]
    fn terminal_end_of_input_closes_the_session() {
        let eof = dialoguer::Error::IO(io::Error::new(ErrorKind::UnexpectedEof, "eof"));
        assert!(matches!(from_dialoguer(eof), StepError::InputClosed));
        let other = dialoguer::Error::IO(io::Error::new(ErrorKind::PermissionDenied, "tty"));
        assert!(matches!(from_dialoguer(other), StepError::Io(_)));
    }

    #[test]
    fn answers_are_trimmed() {
        let mut op = operator("  /data/n2158  \r\n");
        assert_eq!(op.ask("Dir? ").unwrap(), "/data/n2158");
    }
}
