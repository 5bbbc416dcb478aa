//! The operator-facing state machine: set up the session once, then dispatch
//! numbered steps until the operator quits.

use crate::config::Config;
use crate::error::{StepError, StepResult};
use crate::model::{Session, ToolRegistry};
use crate::prompt::Operator;
use crate::steps::{self, Step, StepContext};
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    AwaitingSessionSetup,
    AwaitingFwhm,
    AwaitingOptionFiles,
    MainLoop,
    Terminated,
}

/// What the operator typed at the main prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Run(Step),
    Help,
    Quit,
    UnknownStep(i64),
    Invalid(String),
}

pub fn parse_command(input: &str, registry: &BTreeMap<u32, Step>) -> Command {
    let input = input.trim();
    if input.eq_ignore_ascii_case("q") {
        return Command::Quit;
    }
    if input.eq_ignore_ascii_case("h") {
        return Command::Help;
    }
    match input.parse::<i64>() {
        Ok(n) => u32::try_from(n)
            .ok()
            .and_then(|id| registry.get(&id).copied())
            .map(Command::Run)
            .unwrap_or(Command::UnknownStep(n)),
        Err(_) => Command::Invalid(input.to_string()),
    }
}

/// Values supplied up front, e.g. on the command line. Each is validated like
/// a typed answer and falls back to prompting when it does not check out.
#[derive(Debug, Clone, Default)]
pub struct Presets {
    pub work_dir: Option<PathBuf>,
    pub frame: Option<String>,
    pub fwhm: Option<f64>,
}

pub struct Sequencer<'a> {
    phase: Phase,
    session: Option<Session>,
    presets: Presets,
    registry: BTreeMap<u32, Step>,
    tools: &'a ToolRegistry,
    config: &'a Config,
    operator: &'a mut dyn Operator,
}

impl<'a> Sequencer<'a> {
    pub fn new(tools: &'a ToolRegistry, config: &'a Config, operator: &'a mut dyn Operator, presets: Presets) -> Self {
        Self {
            phase: Phase::AwaitingSessionSetup,
            session: None,
            presets,
            registry: steps::registry(),
            tools,
            config,
            operator,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Drive the phases until the operator quits. Nothing but a quit (or
    /// closed input) ends the loop; every other failure is reported and the
    /// current phase is retried.
    pub fn run(&mut self) {
        while self.phase != Phase::Terminated {
            match self.advance() {
                Ok(()) => {}
                Err(StepError::InputClosed) => {
                    log::info!("input closed, leaving");
                    self.operator.say("Input closed. Goodbye.");
                    self.phase = Phase::Terminated;
                }
                Err(e) => {
                    log::warn!("{:?} failed: {}", self.phase, e);
                    self.operator.fail(&format!("{}", e));
                }
            }
        }
    }

    /// Perform one unit of work for the current phase.
    pub fn advance(&mut self) -> StepResult<()> {
        match self.phase {
            Phase::AwaitingSessionSetup => {
                let work_dir = steps::ask_work_dir(&mut *self.operator, self.presets.work_dir.take())?;
                let frame = steps::ask_frame(&mut *self.operator, &work_dir, self.presets.frame.take())?;
                log::info!("working on frame {} in {}", frame, work_dir.display());
                self.session = Some(Session::new(work_dir, frame));
                self.report_tools();
                self.phase = Phase::AwaitingFwhm;
            }
            Phase::AwaitingFwhm => {
                match self.presets.fwhm.take() {
                    Some(fwhm) if fwhm.is_finite() => {
                        if let Some(session) = self.session.as_mut() {
                            session.fwhm = Some(fwhm);
                        }
                    }
                    preset => {
                        if let Some(bad) = preset {
                            self.operator.warn(&format!("{} is not a usable FWHM.", bad));
                        }
                        self.with_context(steps::settle_fwhm)?
                    }
                }
                self.phase = Phase::AwaitingOptionFiles;
            }
            Phase::AwaitingOptionFiles => {
                self.with_context(steps::ensure_option_files)?;
                self.phase = Phase::MainLoop;
            }
            Phase::MainLoop => self.main_prompt()?,
            Phase::Terminated => {}
        }
        Ok(())
    }

    fn main_prompt(&mut self) -> StepResult<()> {
        let frame = self.session.as_ref().map(|s| s.frame.clone()).unwrap_or_default();
        let answer = self
            .operator
            .ask(&format!("[{}] What do you want to do? (step number, h for help, q to quit) ", frame))?;

        match parse_command(&answer, &self.registry) {
            Command::Quit => {
                self.operator.say("Goodbye.");
                self.phase = Phase::Terminated;
            }
            Command::Help => self.print_help(),
            Command::UnknownStep(n) => {
                self.operator.fail(&format!("There is no step {}. Enter h to list the steps.", n));
            }
            Command::Invalid(token) => {
                log::debug!("unrecognised selection {:?}", token);
                self.operator.say("Please enter a valid selection.");
            }
            Command::Run(step) => match self.with_context(|ctx| step.run(ctx)) {
                Ok(()) => {}
                Err(StepError::InputClosed) => return Err(StepError::InputClosed),
                Err(StepError::MissingInputs(files)) => {
                    self.operator.fail(&format!(
                        "Step {} cannot run yet, these files are missing: {}",
                        step.id(),
                        files.join(", ")
                    ));
                    self.operator.say("Produce them and run the step again.");
                }
                Err(e) => {
                    log::warn!("step {} failed: {}", step.id(), e);
                    self.operator.fail(&format!("Step {} stopped: {}", step.id(), e));
                }
            },
        }
        Ok(())
    }

    fn with_context<T, F>(&mut self, f: F) -> StepResult<T>
    where
        F: FnOnce(&mut StepContext) -> StepResult<T>,
    {
        let Some(session) = self.session.as_mut() else {
            self.phase = Phase::AwaitingSessionSetup;
            return Err(StepError::MissingParameter("session".into()));
        };
        let mut ctx = StepContext {
            session,
            tools: self.tools,
            config: self.config,
            operator: &mut *self.operator,
        };
        f(&mut ctx)
    }

    fn report_tools(&mut self) {
        let missing: Vec<String> = self
            .tools
            .unavailable()
            .map(|t| format!("Cannot execute program {} called as '{}'", t.logical_name, t.executable))
            .collect();
        if missing.is_empty() {
            self.operator.success("All external programs are callable.");
            return;
        }
        for line in &missing {
            self.operator.warn(line);
        }
        self.operator
            .warn("The programs listed above are not callable. You should fix this before proceeding.");
    }

    fn print_help(&mut self) {
        self.operator.say("Steps:");
        for (id, step) in &self.registry {
            self.operator.say(&format!("  {:>2}  {}", id, step.name()));
        }
        self.operator.say("   h  Show this list");
        self.operator.say("   q  Quit");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::ConsoleOperator;
    use std::fs;
    use std::io::Cursor;
    use tempfile::TempDir;

    fn tools(available: bool) -> ToolRegistry {
        let mut registry = ToolRegistry::new(&BTreeMap::new());
        registry.probe(&move |_: &str| available);
        registry
    }

    fn dry_config() -> Config {
        Config {
            dry_run: true,
            ..Config::default()
        }
    }

    struct Outcome {
        phase: Phase,
        session: Option<Session>,
        transcript: String,
    }

    fn drive(input: &str, presets: Presets, registry: &ToolRegistry, config: &Config) -> Outcome {
        let mut op = ConsoleOperator::new(Cursor::new(input.as_bytes().to_vec()), Vec::new());
        let (phase, session) = {
            let mut seq = Sequencer::new(registry, config, &mut op, presets);
            seq.run();
            (seq.phase(), seq.session().cloned())
        };
        Outcome {
            phase,
            session,
            transcript: String::from_utf8_lossy(op.output()).into_owned(),
        }
    }

    fn frame_fixture() -> TempDir {
        let dir = TempDir::new().unwrap();
        let frame = dir.path().join("n21158");
        fs::create_dir(&frame).unwrap();
        fs::write(frame.join("n21158.imh"), "").unwrap();
        dir
    }

    #[test]
    fn commands_parse() {
        let reg = steps::registry();
        assert_eq!(parse_command("3", &reg), Command::Run(Step::PsfFirstPass));
        assert_eq!(parse_command(" 12 ", &reg), Command::Run(Step::ApertureCorrection));
        assert_eq!(parse_command("q", &reg), Command::Quit);
        assert_eq!(parse_command("Q", &reg), Command::Quit);
        assert_eq!(parse_command("H", &reg), Command::Help);
        assert_eq!(parse_command("99", &reg), Command::UnknownStep(99));
        assert_eq!(parse_command("-1", &reg), Command::UnknownStep(-1));
        assert_eq!(parse_command("quit", &reg), Command::Invalid("quit".into()));
        assert_eq!(parse_command("", &reg), Command::Invalid(String::new()));
    }

    #[test]
    fn full_dry_run_session() {
        let dir = frame_fixture();
        let input = format!(
            "{}\nn21158\ny\n3.01\ny\ny\ny\ny\ny\n3\ny\nxyz\n99\nh\nq\n",
            dir.path().display()
        );

        let out = drive(&input, Presets::default(), &tools(true), &dry_config());

        assert_eq!(out.phase, Phase::Terminated);
        let session = out.session.unwrap();
        assert_eq!(session.fwhm, Some(3.01));
        let frame_dir = dir.path().join("n21158");
        assert_eq!(
            fs::read_to_string(frame_dir.join("psfFirstPass.in")).unwrap(),
            "at n21158.imh\nnomon\nfi\n1 1\nn21158.coo\ny\nph\n\n\nn21158.coo\nn21158.ap\n"
        );
        assert!(fs::read_to_string(frame_dir.join("daophot.opt"))
            .unwrap()
            .contains("FW=3.01"));
        assert!(out.transcript.contains("All external programs are callable."));
        assert!(out.transcript.contains("Please enter a valid selection."));
        assert!(out.transcript.contains("There is no step 99."));
        assert!(out.transcript.contains("   3  PSF fitting, first pass (FIND + PHOT)"));
        assert!(out.transcript.ends_with("Goodbye.\n"));
    }

    #[test]
    fn presets_skip_the_setup_questions() {
        let dir = frame_fixture();
        let presets = Presets {
            work_dir: Some(dir.path().to_path_buf()),
            frame: Some("n21158".into()),
            fwhm: Some(2.4),
        };

        // Decline option files, then quit.
        let out = drive("n\nQ\n", presets, &tools(true), &dry_config());

        assert_eq!(out.session.unwrap().fwhm, Some(2.4));
        assert!(!out.transcript.contains("Enter the current working directory"));
        assert!(out.transcript.contains("Continuing without option files."));
    }

    #[test]
    fn bad_presets_fall_back_to_prompts() {
        let dir = frame_fixture();
        let presets = Presets {
            work_dir: Some(dir.path().join("nope")),
            frame: None,
            fwhm: Some(3.0),
        };
        let input = format!("{}\nn21158\nn\nq\n", dir.path().display());

        let out = drive(&input, presets, &tools(true), &dry_config());

        assert_eq!(out.phase, Phase::Terminated);
        assert!(out.transcript.contains("is not a directory"));
        assert_eq!(out.session.unwrap().work_dir, dir.path());
    }

    #[test]
    fn non_finite_fwhm_preset_is_asked_again() {
        let dir = frame_fixture();
        let presets = Presets {
            work_dir: Some(dir.path().to_path_buf()),
            frame: Some("n21158".into()),
            fwhm: Some(f64::NAN),
        };

        // Known FWHM? yes, 2.2; decline option files; quit.
        let out = drive("y\n2.2\nn\nq\n", presets, &tools(true), &dry_config());

        assert_eq!(out.session.unwrap().fwhm, Some(2.2));
        assert!(out.transcript.contains("NaN is not a usable FWHM."));
        assert!(out.transcript.contains("What is the FWHM? "));
    }

    #[test]
    fn missing_inputs_return_to_the_prompt() {
        let dir = frame_fixture();
        let presets = Presets {
            work_dir: Some(dir.path().to_path_buf()),
            frame: Some("n21158".into()),
            fwhm: Some(3.0),
        };

        let out = drive("n\n5\nq\n", presets, &tools(true), &dry_config());

        assert_eq!(out.phase, Phase::Terminated);
        assert!(out
            .transcript
            .contains("Step 5 cannot run yet, these files are missing: n21158.ap, n21158.lst"));
        assert!(!dir.path().join("n21158").join("psfErrorDeletion.in").exists());
    }

    #[test]
    fn unavailable_tools_are_listed_but_do_not_block() {
        let dir = frame_fixture();
        let presets = Presets {
            work_dir: Some(dir.path().to_path_buf()),
            frame: Some("n21158".into()),
            fwhm: Some(3.0),
        };

        let out = drive("n\nq\n", presets, &tools(false), &Config::default());

        assert_eq!(out.phase, Phase::Terminated);
        assert!(out
            .transcript
            .contains("Cannot execute program daophot called as 'daophot'"));
        assert!(out.transcript.contains("not callable"));
    }

    #[test]
    fn closed_input_terminates_cleanly() {
        let dir = frame_fixture();
        let input = format!("{}\nn21158\n", dir.path().display());

        let out = drive(&input, Presets::default(), &tools(true), &dry_config());

        assert_eq!(out.phase, Phase::Terminated);
        assert!(out.transcript.ends_with("Input closed. Goodbye.\n"));
    }

    #[test]
    fn steps_can_run_in_any_order_and_repeat() {
        let dir = frame_fixture();
        let frame_dir = dir.path().join("n21158");
        for name in ["n21158.ap", "daophot.opt", "photo.opt", "allstar.opt", "apcorr.opt"] {
            fs::write(frame_dir.join(name), "").unwrap();
        }
        let presets = Presets {
            work_dir: Some(dir.path().to_path_buf()),
            frame: Some("n21158".into()),
            fwhm: Some(3.0),
        };

        let out = drive(
            "4\n100\n17\ny\n4\n120\n17.5\ny\n3\ny\nq\n",
            presets,
            &tools(true),
            &dry_config(),
        );

        assert_eq!(out.phase, Phase::Terminated);
        let candidates = fs::read_to_string(frame_dir.join("psfCandidate.in")).unwrap();
        assert!(candidates.contains("120 17.5"));
        assert!(frame_dir.join("psfFirstPass.in").exists());
        assert!(!frame_dir.join("n21158.ap").exists());
    }
}
