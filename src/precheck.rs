use crate::error::{StepError, StepResult};
use crate::templates::OPTION_FILES;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    Ready,
    MissingInputs(Vec<String>),
}

impl Readiness {
    pub fn into_result(self) -> StepResult<()> {
        match self {
            Readiness::Ready => Ok(()),
            Readiness::MissingInputs(files) => Err(StepError::MissingInputs(files)),
        }
    }
}

/// Stat each required file in `frame_dir`. Missing names are reported in the
/// order they were declared.
pub fn check_ready<S: AsRef<str>>(required: &[S], frame_dir: &Path) -> Readiness {
    let missing: Vec<String> = required
        .iter()
        .filter_map(|name| {
            let name: &str = name.as_ref();
            (!frame_dir.join(name).exists()).then(|| name.to_string())
        })
        .collect();

    if missing.is_empty() {
        Readiness::Ready
    } else {
        log::debug!("{} is missing {:?}", frame_dir.display(), missing);
        Readiness::MissingInputs(missing)
    }
}

/// Option files from the template store that are not yet in `frame_dir`.
pub fn check_option_files(frame_dir: &Path) -> Readiness {
    let names: Vec<&str> = OPTION_FILES.keys().copied().collect();
    check_ready(&names, frame_dir)
}
