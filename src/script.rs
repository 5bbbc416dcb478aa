use crate::error::StepResult;
use crate::template::{Params, Template};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// One command file a step writes before running its tool.
#[derive(Debug, Clone)]
pub struct ScriptSpec {
    pub file_name: String,
    pub template: Template<'static>,
    /// Files the tool creates from this script. The tools refuse to overwrite,
    /// so these are removed before each run.
    pub produced_outputs: Vec<String>,
    /// Opt in to safe substitution: unknown placeholders are left as written.
    pub safe: bool,
}

impl ScriptSpec {
    pub fn new(file_name: impl Into<String>, template: Template<'static>) -> Self {
        Self {
            file_name: file_name.into(),
            template,
            produced_outputs: Vec::new(),
            safe: false,
        }
    }

    pub fn produces<I, S>(mut self, outputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.produced_outputs.extend(outputs.into_iter().map(Into::into));
        self
    }

    pub fn safe(mut self) -> Self {
        self.safe = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedScript {
    pub path: PathBuf,
    pub content: String,
}

/// Render `spec` with `params`, clear its stale outputs and write the script
/// into `frame_dir`, replacing any previous version. Nothing on disk changes
/// when rendering fails.
pub fn generate(spec: &ScriptSpec, params: &Params, frame_dir: &Path) -> StepResult<GeneratedScript> {
    let content = if spec.safe {
        spec.template.safe_substitute(params)
    } else {
        spec.template.substitute(params)?
    };

    remove_outputs(&spec.produced_outputs, frame_dir)?;

    let script = GeneratedScript {
        path: frame_dir.join(&spec.file_name),
        content,
    };
    fs::write(&script.path, &script.content)?;
    log::debug!("wrote {} ({} bytes)", script.path.display(), script.content.len());

    Ok(script)
}

/// Delete each named file; a file that is already gone is not an error.
pub fn remove_outputs<S: AsRef<str>>(names: &[S], frame_dir: &Path) -> StepResult<()> {
    for name in names {
        let path = frame_dir.join(name.as_ref());
        match fs::remove_file(&path) {
            Ok(()) => log::info!("removed stale {}", path.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StepError;
    use crate::templates::{PSF_CANDIDATE, PSF_FIRST_PASS};
    use tempfile::TempDir;

    fn frame_params(frame: &str) -> Params {
        Params::from([("frame".to_string(), frame.to_string())])
    }

    fn first_pass() -> ScriptSpec {
        ScriptSpec::new("psfFirstPass.in", PSF_FIRST_PASS).produces(["n21158.coo", "n21158.ap"])
    }

    #[test]
    fn first_pass_script_is_byte_exact() {
        let dir = TempDir::new().unwrap();
        let script = generate(&first_pass(), &frame_params("n21158"), dir.path()).unwrap();
        let expected = "at n21158.imh\nnomon\nfi\n1 1\nn21158.coo\ny\nph\n\n\nn21158.coo\nn21158.ap\n";
        assert_eq!(script.content, expected);
        assert_eq!(script.path, dir.path().join("psfFirstPass.in"));
        assert_eq!(fs::read_to_string(&script.path).unwrap(), expected);
    }

    #[test]
    fn stale_outputs_are_removed() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("n21158.coo"), "old stars").unwrap();
        fs::write(dir.path().join("n21158.ap"), "old photometry").unwrap();
        fs::write(dir.path().join("n21158.lst"), "keep me").unwrap();

        generate(&first_pass(), &frame_params("n21158"), dir.path()).unwrap();

        assert!(!dir.path().join("n21158.coo").exists());
        assert!(!dir.path().join("n21158.ap").exists());
        assert!(dir.path().join("n21158.lst").exists());
    }

    #[test]
    fn regeneration_overwrites_instead_of_appending() {
        let dir = TempDir::new().unwrap();
        let spec = ScriptSpec::new("psfCandidate.in", PSF_CANDIDATE);
        let mut params = frame_params("n21158");
        params.insert("num_stars".into(), "1500".into());
        params.insert("mag_limit".into(), "18.25".into());
        generate(&spec, &params, dir.path()).unwrap();

        params.insert("num_stars".into(), "150".into());
        params.insert("mag_limit".into(), "18.5".into());
        let second = generate(&spec, &params, dir.path()).unwrap();

        let on_disk = fs::read_to_string(dir.path().join("psfCandidate.in")).unwrap();
        assert_eq!(on_disk, second.content);
        assert!(on_disk.contains("n21158.ap\n150 18.5\nn21158.lst\n"));
        assert!(!on_disk.contains("1500"));
    }

    #[test]
    fn same_params_give_identical_bytes() {
        let dir = TempDir::new().unwrap();
        let a = generate(&first_pass(), &frame_params("n1"), dir.path()).unwrap();
        let b = generate(&first_pass(), &frame_params("n1"), dir.path()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn missing_parameter_leaves_disk_untouched() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("n21158.lst"), "previous").unwrap();
        let spec = ScriptSpec::new("psfCandidate.in", PSF_CANDIDATE).produces(["n21158.lst"]);

        let err = generate(&spec, &frame_params("n21158"), dir.path()).unwrap_err();

        assert!(matches!(err, StepError::MissingParameter(ref k) if k == "num_stars"));
        assert!(dir.path().join("n21158.lst").exists());
        assert!(!dir.path().join("psfCandidate.in").exists());
    }

    #[test]
    fn safe_specs_keep_unknown_placeholders() {
        let dir = TempDir::new().unwrap();
        let spec = ScriptSpec::new("echo.sh", Template::new("echo $1 ${frame} $unset\n")).safe();
        let script = generate(&spec, &frame_params("n1"), dir.path()).unwrap();
        assert_eq!(script.content, "echo $1 n1 $unset\n");
    }

    #[test]
    fn removing_absent_outputs_is_a_no_op() {
        let dir = TempDir::new().unwrap();
        remove_outputs(&["nothing.here"], dir.path()).unwrap();
    }
}
