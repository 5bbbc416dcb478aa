use crate::error::{StepError, StepResult};
use crate::template::Params;
use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};

/// Working state for one reduction run.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub work_dir: PathBuf,
    pub frame: String,
    pub fwhm: Option<f64>,
}

impl Session {
    pub fn new(work_dir: impl Into<PathBuf>, frame: impl Into<String>) -> Self {
        Self {
            work_dir: work_dir.into(),
            frame: frame.into(),
            fwhm: None,
        }
    }

    pub fn frame_dir(&self) -> PathBuf {
        self.work_dir.join(&self.frame)
    }

    pub fn frame_file(&self, name: &str) -> PathBuf {
        self.frame_dir().join(name)
    }

    /// Cumulative tool output for the frame.
    pub fn log_path(&self) -> PathBuf {
        self.frame_file(&format!("{}.log", self.frame))
    }

    /// Substitution keys every template may use. `fwhm` is only present once
    /// it has been measured.
    pub fn params(&self) -> Params {
        let mut params = Params::new();
        params.insert("frame".into(), self.frame.clone());
        params.insert("frame_dir".into(), self.frame_dir().display().to_string());
        if let Some(fwhm) = self.fwhm {
            params.insert("fwhm".into(), fwhm.to_string());
        }
        params
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolReference {
    pub logical_name: String,
    pub executable: String,
    pub available: bool,
}

/// Logical name -> executable the reduction relies on.
pub const DEFAULT_TOOLS: &[(&str, &str)] = &[
    ("daophot", "daophot"),
    ("allstar", "allstar8192"),
    ("merge", "merge.e"),
    ("ap2als", "ap2als.e"),
    ("compapcorr", "compapcorrHDI.e"),
    ("pyraf", "pyraf"),
    ("ds9", "ds9"),
    ("dao2iraf", "dao2iraf.e"),
    ("sm", "sm"),
    ("pstopdf", "pstopdf"),
    ("alsedt", "alsedt.e"),
    ("sigrejfit", "sigrejfit.e"),
    ("poly", "poly.e"),
    ("apply_apcorr", "apply_apcorrHDI.e"),
    ("shell", "sh"),
];

/// Answers whether an executable can be launched from this environment.
pub trait PathLookup {
    fn find(&self, executable: &str) -> bool;
}

impl<F: Fn(&str) -> bool> PathLookup for F {
    fn find(&self, executable: &str) -> bool {
        self(executable)
    }
}

/// Searches `PATH` the way a shell would.
pub struct SystemPath;

impl PathLookup for SystemPath {
    fn find(&self, executable: &str) -> bool {
        if executable.contains(std::path::MAIN_SEPARATOR) {
            return is_executable(Path::new(executable));
        }
        env::var_os("PATH")
            .map(|paths| env::split_paths(&paths).any(|dir| is_executable(&dir.join(executable))))
            .unwrap_or(false)
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

#[derive(Debug, Clone)]
pub struct ToolRegistry {
    tools: BTreeMap<String, ToolReference>,
}

impl ToolRegistry {
    /// Built-in tools with `overrides` applied. Nothing is marked available
    /// until [`ToolRegistry::probe`] runs.
    pub fn new(overrides: &BTreeMap<String, String>) -> Self {
        let mut tools: BTreeMap<String, ToolReference> = DEFAULT_TOOLS
            .iter()
            .map(|(name, exe)| {
                (
                    name.to_string(),
                    ToolReference {
                        logical_name: name.to_string(),
                        executable: exe.to_string(),
                        available: false,
                    },
                )
            })
            .collect();

        for (name, exe) in overrides {
            if !tools.contains_key(name) {
                log::warn!("configuration adds unknown tool '{}' -> {}", name, exe);
            }
            tools.insert(
                name.clone(),
                ToolReference {
                    logical_name: name.clone(),
                    executable: exe.clone(),
                    available: false,
                },
            );
        }

        Self { tools }
    }

    /// Record availability once; the result is kept for the session.
    pub fn probe(&mut self, lookup: &dyn PathLookup) {
        for tool in self.tools.values_mut() {
            tool.available = lookup.find(&tool.executable);
            log::debug!(
                "tool {} ({}) available: {}",
                tool.logical_name,
                tool.executable,
                tool.available
            );
        }
    }

    pub fn get(&self, logical_name: &str) -> StepResult<&ToolReference> {
        self.tools
            .get(logical_name)
            .ok_or_else(|| StepError::UnknownTool(logical_name.to_string()))
    }

    pub fn unavailable(&self) -> impl Iterator<Item = &ToolReference> {
        self.tools.values().filter(|t| !t.available)
    }
}
