use std::time::Duration;
use thiserror::Error;

/// Conditions that abort a single step. None of them ends the session on its
/// own; the sequencer reports them and returns to the main prompt.
#[derive(Debug, Error)]
pub enum StepError {
    #[error("missing required input files: {}", .0.join(", "))]
    MissingInputs(Vec<String>),

    #[error("template parameter '{0}' was not supplied")]
    MissingParameter(String),

    #[error("invalid placeholder in template at byte {position}")]
    InvalidPlaceholder { position: usize },

    #[error("tool '{0}' is not available on this system")]
    ToolUnavailable(String),

    #[error("no tool named '{0}' is registered")]
    UnknownTool(String),

    #[error("tool '{tool}' did not finish within {}s and was killed", .timeout.as_secs())]
    ToolTimeout { tool: String, timeout: Duration },

    #[error("operator input was closed")]
    InputClosed,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type StepResult<T> = std::result::Result<T, StepError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_inputs_lists_every_file() {
        let err = StepError::MissingInputs(vec!["n21158.ap".into(), "n21158.lst".into()]);
        assert_eq!(
            err.to_string(),
            "missing required input files: n21158.ap, n21158.lst"
        );
    }

    #[test]
    fn timeout_reports_whole_seconds() {
        let err = StepError::ToolTimeout {
            tool: "daophot".into(),
            timeout: Duration::from_millis(90_500),
        };
        assert_eq!(
            err.to_string(),
            "tool 'daophot' did not finish within 90s and was killed"
        );
    }

    #[test]
    fn io_errors_convert() {
        let err: StepError = std::io::Error::other("disk gone").into();
        assert_eq!(err.to_string(), "disk gone");
    }
}
