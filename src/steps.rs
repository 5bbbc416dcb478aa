//! The numbered reduction steps and the operator dialogue they share.
//!
//! Each step composes the same pipeline: check the frame directory for its
//! inputs, confirm its tool can run, write the command script and run the
//! tool. Most steps then repeat until the operator is happy with the result.

use crate::config::Config;
use crate::error::{StepError, StepResult};
use crate::executor::{self, describe_status, InvokeOptions, Invocation};
use crate::model::{Session, ToolReference, ToolRegistry};
use crate::precheck::{check_option_files, check_ready, Readiness};
use crate::prompt::Operator;
use crate::script::{generate, ScriptSpec};
use crate::template::Params;
use crate::templates::{self, APCORR_OPT, DAOPHOT_OPT, OPTION_FILES, PHOTO_OPT};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

const SATISFIED: &str = "Are you satisfied with the result? (y/n) ";

/// Everything a step may read or change while it runs.
pub struct StepContext<'a> {
    pub session: &'a mut Session,
    pub tools: &'a ToolRegistry,
    pub config: &'a Config,
    pub operator: &'a mut dyn Operator,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    ChangeFrame,
    Fwhm,
    OptionFiles,
    PsfFirstPass,
    PsfCandidates,
    PsfErrorDeletion,
    NeighborSubtraction,
    MakePsf,
    BadPsfStarRemoval,
    Allstar,
    Plots,
    Alsedt,
    ApertureCorrection,
}

impl Step {
    pub const ALL: [Step; 13] = [
        Step::ChangeFrame,
        Step::Fwhm,
        Step::OptionFiles,
        Step::PsfFirstPass,
        Step::PsfCandidates,
        Step::PsfErrorDeletion,
        Step::NeighborSubtraction,
        Step::MakePsf,
        Step::BadPsfStarRemoval,
        Step::Allstar,
        Step::Plots,
        Step::Alsedt,
        Step::ApertureCorrection,
    ];

    pub fn id(self) -> u32 {
        match self {
            Step::ChangeFrame => 0,
            Step::Fwhm => 1,
            Step::OptionFiles => 2,
            Step::PsfFirstPass => 3,
            Step::PsfCandidates => 4,
            Step::PsfErrorDeletion => 5,
            Step::NeighborSubtraction => 6,
            Step::MakePsf => 7,
            Step::BadPsfStarRemoval => 8,
            Step::Allstar => 9,
            Step::Plots => 10,
            Step::Alsedt => 11,
            Step::ApertureCorrection => 12,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Step::ChangeFrame => "Change working directory and frame",
            Step::Fwhm => "Measure or enter the FWHM",
            Step::OptionFiles => "Set up option files",
            Step::PsfFirstPass => "PSF fitting, first pass (FIND + PHOT)",
            Step::PsfCandidates => "PSF candidate selection",
            Step::PsfErrorDeletion => "PSF error deletion",
            Step::NeighborSubtraction => "Neighbor star subtraction",
            Step::MakePsf => "Make PSF script",
            Step::BadPsfStarRemoval => "Bad PSF subtraction star removal",
            Step::Allstar => "ALLSTAR script",
            Step::Plots => "Make plots",
            Step::Alsedt => "ALSEDT",
            Step::ApertureCorrection => "Aperture correction",
        }
    }

    pub fn run(self, ctx: &mut StepContext) -> StepResult<()> {
        log::info!("step {}: {}", self.id(), self.name());
        match self {
            Step::ChangeFrame => change_frame(ctx),
            Step::Fwhm => settle_fwhm(ctx),
            Step::OptionFiles => option_files(ctx),
            Step::PsfFirstPass => psf_first_pass(ctx),
            Step::PsfCandidates => psf_candidates(ctx),
            Step::PsfErrorDeletion => psf_error_deletion(ctx),
            Step::NeighborSubtraction => neighbor_subtraction(ctx),
            Step::MakePsf => make_psf(ctx),
            Step::BadPsfStarRemoval => bad_psf_star_removal(ctx),
            Step::Allstar => allstar(ctx),
            Step::Plots => plots(ctx),
            Step::Alsedt => alsedt(ctx),
            Step::ApertureCorrection => aperture_correction(ctx),
        }
    }
}

/// Step id -> step, in id order.
pub fn registry() -> BTreeMap<u32, Step> {
    Step::ALL.iter().map(|step| (step.id(), *step)).collect()
}

// ---------------------------------------------------------------------------
// Session setup dialogue, shared with the sequencer's start-up phases.
// ---------------------------------------------------------------------------

pub fn ask_work_dir(operator: &mut dyn Operator, preset: Option<PathBuf>) -> StepResult<PathBuf> {
    if let Some(dir) = preset {
        if dir.is_dir() {
            return Ok(dir);
        }
        operator.warn(&format!("{} is not a directory.", dir.display()));
    }
    loop {
        let answer = operator.ask("Enter the current working directory (ex: /data/n2158_phot/n2158/): ")?;
        let dir = PathBuf::from(&answer);
        if !answer.is_empty() && dir.is_dir() {
            return Ok(dir);
        }
        operator.say("Invalid path, try again.");
    }
}

pub fn ask_frame(operator: &mut dyn Operator, work_dir: &Path, preset: Option<String>) -> StepResult<String> {
    if let Some(frame) = preset {
        if is_frame_dir(work_dir, &frame) {
            return Ok(frame);
        }
        operator.warn(&format!("{} has no frame directory '{}'.", work_dir.display(), frame));
    }
    loop {
        let frame = operator.ask("Enter the frame you want to work on (ex: n21158): ")?;
        if is_frame_dir(work_dir, &frame) {
            return Ok(frame);
        }
        operator.say(&format!(
            "Invalid frame selection for {}, try again.",
            work_dir.join(&frame).display()
        ));
    }
}

fn is_frame_dir(work_dir: &Path, frame: &str) -> bool {
    !frame.is_empty() && work_dir.join(frame).is_dir()
}

/// Ask for the FWHM directly, or measure it interactively first.
pub fn settle_fwhm(ctx: &mut StepContext) -> StepResult<()> {
    let fwhm = if ctx
        .operator
        .confirm("Do you know the FWHM of this frame? If not, we can go get it together. (y/n) ")?
    {
        ctx.operator.ask_f64("What is the FWHM? ")?
    } else {
        acquire_fwhm(ctx)?
    };
    ctx.session.fwhm = Some(fwhm);
    ctx.operator.success(&format!("FWHM for {} set to {}.", ctx.session.frame, fwhm));
    Ok(())
}

fn acquire_fwhm(ctx: &mut StepContext) -> StepResult<f64> {
    match require_tool(ctx, "pyraf") {
        Ok(tool) => {
            ctx.operator.say(&format!(
                "Starting {}. Run imexam on {}.imh, press 'a' on several bright isolated stars \
                 and note the FWHM column. Exit when done.",
                tool.executable, ctx.session.frame
            ));
            let opts = InvokeOptions::from(ctx.config);
            let outcome = executor::run_interactive(&tool, std::iter::empty::<&str>(), &ctx.session.frame_dir(), &opts)?;
            if let Invocation::Completed(status) = outcome {
                if !status.success() {
                    ctx.operator.fail(&format!("{} {}.", tool.executable, describe_status(&status)));
                }
            }
        }
        Err(StepError::ToolUnavailable(_)) => {
            ctx.operator.warn("Measure the FWHM with another tool, then enter it here.");
        }
        Err(e) => return Err(e),
    }
    ctx.operator.ask_f64("What FWHM did you measure? ")
}

/// Start-up check: offer to create whichever option files are missing.
/// Declining is allowed; the run continues without them.
pub fn ensure_option_files(ctx: &mut StepContext) -> StepResult<()> {
    let frame_dir = ctx.session.frame_dir();
    loop {
        if check_option_files(&frame_dir) == Readiness::Ready {
            return Ok(());
        }
        if !ctx
            .operator
            .confirm("Option files don't seem to exist in this directory. Do you want to set them up? (y/n) ")?
        {
            ctx.operator.warn("Continuing without option files.");
            return Ok(());
        }
        create_missing_option_files(ctx)?;
        if let Readiness::MissingInputs(still) = check_option_files(&frame_dir) {
            ctx.operator.fail(&format!(
                "I tried setting them up, but {} still don't appear to exist.",
                still.join(", ")
            ));
        }
    }
}

fn create_missing_option_files(ctx: &mut StepContext) -> StepResult<()> {
    let params = ctx.session.params();
    for (name, template) in OPTION_FILES.iter() {
        let path = ctx.session.frame_file(name);
        if path.exists() {
            continue;
        }
        ctx.operator.say(&format!("Option file {} does not exist.", name));
        if ctx.operator.confirm("Do you want to create this file from a template? (y/n) ")? {
            fs::write(&path, template.substitute(&params)?)?;
            log::info!("created {}", path.display());
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Shared pipeline
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Launch {
    /// Script on stdin, output appended to the frame log.
    Stdin,
    /// Script as the only argument, output appended to the frame log.
    Argument,
    /// Script as the only argument with the terminal handed over.
    Interactive,
}

struct Stage {
    tool: &'static str,
    /// Further registry tools the script itself calls, by logical name.
    calls: &'static [&'static str],
    required: Vec<String>,
    script: ScriptSpec,
    launch: Launch,
}

const MKPSF_CALLS: &[&str] = &["daophot", "allstar", "merge"];
const ALLSTAR_CALLS: &[&str] = &["daophot", "allstar", "ap2als"];
const APCORR_CALLS: &[&str] = &["daophot", "sm", "pstopdf", "ap2als", "compapcorr", "sigrejfit", "poly"];

/// `frame` followed by each suffix.
fn frame_files(frame: &str, suffixes: &[&str]) -> Vec<String> {
    suffixes.iter().map(|s| format!("{}{}", frame, s)).collect()
}

/// Repeat `body` until the operator accepts the result. Errors end the loop.
fn until_satisfied<F>(ctx: &mut StepContext, mut body: F) -> StepResult<()>
where
    F: FnMut(&mut StepContext) -> StepResult<()>,
{
    loop {
        body(ctx)?;
        if ctx.operator.confirm(SATISFIED)? {
            return Ok(());
        }
        log::debug!("operator asked to repeat the step");
    }
}

/// Look up a tool; an unavailable one runs only with the operator's consent.
fn require_tool(ctx: &mut StepContext, name: &str) -> StepResult<ToolReference> {
    let tool = ctx.tools.get(name)?.clone();
    if tool.available || ctx.config.dry_run {
        return Ok(tool);
    }
    ctx.operator.warn(&format!(
        "Tool '{}' ({}) was not found on this system.",
        name, tool.executable
    ));
    if ctx.operator.confirm("Run it anyway? (y/n) ")? {
        log::warn!("running unavailable tool {} on operator override", name);
        Ok(tool)
    } else {
        Err(StepError::ToolUnavailable(name.to_string()))
    }
}

/// `params` plus the executable of each named tool under its logical name.
/// Every tool goes through the same availability check as a launched one.
fn with_tools(ctx: &mut StepContext, names: &[&str], params: &Params) -> StepResult<Params> {
    let mut params = params.clone();
    for name in names {
        let tool = require_tool(ctx, name)?;
        params.insert(tool.logical_name, tool.executable);
    }
    Ok(params)
}

fn run_stage(ctx: &mut StepContext, stage: &Stage, params: &Params) -> StepResult<Invocation> {
    let frame_dir = ctx.session.frame_dir();
    check_ready(&stage.required, &frame_dir).into_result()?;
    let tool = require_tool(ctx, stage.tool)?;
    let params = with_tools(ctx, stage.calls, params)?;
    let script = generate(&stage.script, &params, &frame_dir)?;
    launch(ctx, &tool, &script.path, stage.launch)
}

fn failed(outcome: Invocation) -> bool {
    matches!(outcome, Invocation::Completed(status) if !status.success())
}

/// Run `tool` on `file` and tell the operator how it went.
fn launch(ctx: &mut StepContext, tool: &ToolReference, file: &Path, how: Launch) -> StepResult<Invocation> {
    let frame_dir = ctx.session.frame_dir();
    let log = ctx.session.log_path();
    let opts = InvokeOptions::from(ctx.config);
    let outcome = match how {
        Launch::Stdin => executor::invoke(tool, file, &log, &frame_dir, &opts)?,
        Launch::Argument => executor::run_script(tool, file, &log, &frame_dir, &opts)?,
        Launch::Interactive => executor::run_interactive(tool, [file], &frame_dir, &opts)?,
    };
    report(ctx, tool, file, &log, outcome);
    Ok(outcome)
}

fn report(ctx: &mut StepContext, tool: &ToolReference, file: &Path, log: &Path, outcome: Invocation) {
    match outcome {
        Invocation::Completed(status) if status.success() => ctx.operator.success(&format!(
            "{} finished. Output was appended to {}.",
            tool.logical_name,
            log.display()
        )),
        Invocation::Completed(status) => ctx.operator.fail(&format!(
            "{} {}. Check {} before deciding whether to re-run this step.",
            tool.logical_name,
            describe_status(&status),
            log.display()
        )),
        Invocation::Skipped => ctx.operator.say(&format!(
            "Dry run: {} was not started on {}.",
            tool.logical_name,
            file.display()
        )),
    }
}

// ---------------------------------------------------------------------------
// Step handlers
// ---------------------------------------------------------------------------

fn change_frame(ctx: &mut StepContext) -> StepResult<()> {
    let work_dir = ask_work_dir(&mut *ctx.operator, None)?;
    let frame = ask_frame(&mut *ctx.operator, &work_dir, None)?;
    *ctx.session = Session::new(work_dir, frame);
    settle_fwhm(ctx)?;
    ensure_option_files(ctx)
}

fn option_files(ctx: &mut StepContext) -> StepResult<()> {
    if check_option_files(&ctx.session.frame_dir()) != Readiness::Ready {
        return ensure_option_files(ctx);
    }
    let fwhm = ctx.session.fwhm.map(|f| f.to_string()).unwrap_or_else(|| "unset".into());
    if !ctx.operator.confirm(&format!(
        "All option files exist. Rewrite them from the templates with FWHM {}? (y/n) ",
        fwhm
    ))? {
        return Ok(());
    }
    let params = ctx.session.params();
    for (name, template) in OPTION_FILES.iter() {
        let content = template.substitute(&params)?;
        fs::write(ctx.session.frame_file(name), content)?;
    }
    ctx.operator.success("Option files rewritten.");
    Ok(())
}

fn psf_first_pass(ctx: &mut StepContext) -> StepResult<()> {
    let frame = ctx.session.frame.clone();
    let mut required = frame_files(&frame, &[".imh"]);
    required.extend([DAOPHOT_OPT.to_string(), PHOTO_OPT.to_string()]);
    let stage = Stage {
        tool: "daophot",
        calls: &[],
        required,
        script: ScriptSpec::new("psfFirstPass.in", templates::PSF_FIRST_PASS)
            .produces(frame_files(&frame, &[".coo", ".ap"])),
        launch: Launch::Stdin,
    };
    let params = ctx.session.params();
    until_satisfied(ctx, |ctx| run_stage(ctx, &stage, &params).map(drop))
}

fn psf_candidates(ctx: &mut StepContext) -> StepResult<()> {
    let frame = ctx.session.frame.clone();
    let mut required = frame_files(&frame, &[".imh", ".ap"]);
    required.push(DAOPHOT_OPT.to_string());
    let stage = Stage {
        tool: "daophot",
        calls: &[],
        required,
        script: ScriptSpec::new("psfCandidate.in", templates::PSF_CANDIDATE)
            .produces(frame_files(&frame, &[".lst"])),
        launch: Launch::Stdin,
    };
    until_satisfied(ctx, |ctx| {
        check_ready(&stage.required, &ctx.session.frame_dir()).into_result()?;
        let num_stars = ctx.operator.ask_u32("How many PSF candidate stars should be picked? ")?;
        let mag_limit = ctx.operator.ask_f64("What is the faintest magnitude to accept? ")?;
        let mut params = ctx.session.params();
        params.insert("num_stars".into(), num_stars.to_string());
        params.insert("mag_limit".into(), mag_limit.to_string());
        run_stage(ctx, &stage, &params).map(drop)
    })
}

fn psf_error_deletion(ctx: &mut StepContext) -> StepResult<()> {
    let frame = ctx.session.frame.clone();
    let stage = Stage {
        tool: "daophot",
        calls: &[],
        required: frame_files(&frame, &[".imh", ".ap", ".lst"]),
        script: ScriptSpec::new("psfErrorDeletion.in", templates::PSF_ERROR_DELETION)
            .produces(frame_files(&frame, &[".psf", ".nei"])),
        launch: Launch::Stdin,
    };
    let params = ctx.session.params();
    until_satisfied(ctx, |ctx| {
        run_stage(ctx, &stage, &params)?;
        ctx.operator.say(&format!(
            "Look in {0}.log for PSF stars flagged with '*' or '?'. Delete them from {0}.lst before re-running.",
            frame
        ));
        Ok(())
    })
}

fn neighbor_subtraction(ctx: &mut StepContext) -> StepResult<()> {
    let frame = ctx.session.frame.clone();
    let subtract = Stage {
        tool: "daophot",
        calls: &[],
        required: frame_files(&frame, &[".imh", ".psf", ".nei", ".lst"]),
        script: ScriptSpec::new("sublst1.in", templates::SUBLST_SUBTRACT)
            .produces(frame_files(&frame, &["_nonei.imh", "_nonei.pix"])),
        launch: Launch::Stdin,
    };
    let refit = Stage {
        tool: "daophot",
        calls: &[],
        required: frame_files(&frame, &[".ap", ".lst"]),
        script: ScriptSpec::new("sublst2.in", templates::SUBLST_REFIT)
            .produces(frame_files(&frame, &["_nonei.psf", "_nonei.nei"])),
        launch: Launch::Stdin,
    };
    let params = ctx.session.params();
    until_satisfied(ctx, |ctx| {
        if failed(run_stage(ctx, &subtract, &params)?) {
            return Ok(());
        }
        run_stage(ctx, &refit, &params).map(drop)
    })
}

fn make_psf(ctx: &mut StepContext) -> StepResult<()> {
    let frame = ctx.session.frame.clone();
    let stage = Stage {
        tool: "shell",
        calls: MKPSF_CALLS,
        required: frame_files(&frame, &[".imh", ".ap", ".lst", ".nei", "_nonei.psf"]),
        script: ScriptSpec::new("mkpsfHDI.scr", templates::MKPSF_SCRIPT).produces(
            frame_files(
                &frame,
                &[
                    ".psf", "psf.als", "1s.imh", "1s.pix", "1s.coo", ".neinew1", "1s.als", "2s.imh",
                    "2s.pix", "2s.coo", ".neinew2", "2s.als", "3s.imh", "3s.pix",
                ],
            )
            .into_iter()
            .chain(["mkpsf.log".to_string()]),
        ),
        launch: Launch::Argument,
    };
    let params = ctx.session.params();
    until_satisfied(ctx, |ctx| {
        run_stage(ctx, &stage, &params)?;
        ctx.operator
            .say(&format!("Details of each pass are in mkpsf.log; the neighbour-free frame is {}3s.", frame));
        Ok(())
    })
}

fn bad_psf_star_removal(ctx: &mut StepContext) -> StepResult<()> {
    let frame = ctx.session.frame.clone();
    let refit = Stage {
        tool: "daophot",
        calls: &[],
        required: frame_files(&frame, &["3s.imh", ".ap", ".lst"]),
        script: ScriptSpec::new("psfNeighborStars.in", templates::PSF_NEIGHBOR_STARS)
            .produces(frame_files(&frame, &["3s.psf", "3s.nei"])),
        launch: Launch::Stdin,
    };
    let subtract = Stage {
        tool: "daophot",
        calls: &[],
        required: frame_files(&frame, &[".imh", ".lst"]),
        script: ScriptSpec::new("psfSubErrorStars.in", templates::PSF_SUB_ERROR_STARS)
            .produces(frame_files(&frame, &["psfsub.imh", "psfsub.pix"])),
        launch: Launch::Stdin,
    };
    let params = ctx.session.params();
    until_satisfied(ctx, |ctx| {
        if failed(run_stage(ctx, &refit, &params)?) || failed(run_stage(ctx, &subtract, &params)?) {
            return Ok(());
        }
        view_residuals(ctx, &format!("{}psfsub.imh", frame))?;
        ctx.operator.say(&format!(
            "Remove PSF stars that leave bad residuals from {}.lst before re-running.",
            frame
        ));
        Ok(())
    })
}

fn view_residuals(ctx: &mut StepContext, image: &str) -> StepResult<()> {
    let tool = match require_tool(ctx, "ds9") {
        Ok(tool) => tool,
        Err(StepError::ToolUnavailable(_)) => {
            ctx.operator.warn(&format!("Inspect {} with another viewer.", image));
            return Ok(());
        }
        Err(e) => return Err(e),
    };
    let opts = InvokeOptions::from(ctx.config);
    executor::run_interactive(&tool, [image], &ctx.session.frame_dir(), &opts)?;
    Ok(())
}

fn allstar(ctx: &mut StepContext) -> StepResult<()> {
    let frame = ctx.session.frame.clone();
    let stage = Stage {
        tool: "shell",
        calls: ALLSTAR_CALLS,
        required: frame_files(&frame, &[".imh", "3s.psf", ".ap"]),
        script: ScriptSpec::new("allstarHDI.scr", templates::ALLSTAR_SCRIPT).produces(
            frame_files(
                &frame,
                &[
                    ".als", "sub.imh", "sub.pix", "sub.coo", "sub.ap", "sub.apals", ".ap2", ".als2",
                    "sub2.imh", "sub2.pix",
                ],
            )
            .into_iter()
            .chain(["allstar.log".to_string()]),
        ),
        launch: Launch::Argument,
    };
    let params = ctx.session.params();
    until_satisfied(ctx, |ctx| run_stage(ctx, &stage, &params).map(drop))
}

fn plots(ctx: &mut StepContext) -> StepResult<()> {
    let frame = ctx.session.frame.clone();
    let mut required = frame_files(&frame, &[".als2"]);
    required.push("macro1.sm".to_string());
    let stage = Stage {
        tool: "sm",
        calls: &[],
        required,
        script: ScriptSpec::new("plots.in", templates::PLOTS).produces(frame_files(&frame, &["als.ps", "als.pdf"])),
        launch: Launch::Stdin,
    };
    let params = ctx.session.params();
    let postscript = ctx.session.frame_file(&format!("{}als.ps", frame));
    until_satisfied(ctx, |ctx| {
        let outcome = run_stage(ctx, &stage, &params)?;
        if matches!(outcome, Invocation::Completed(s) if s.success()) && postscript.exists() {
            let converter = require_tool(ctx, "pstopdf")?;
            launch(ctx, &converter, &postscript, Launch::Argument)?;
        }
        Ok(())
    })
}

fn alsedt(ctx: &mut StepContext) -> StepResult<()> {
    let frame = ctx.session.frame.clone();
    let stage = Stage {
        tool: "alsedt",
        calls: &[],
        required: frame_files(&frame, &[".als2"]),
        script: ScriptSpec::new("alsedt.in", templates::ALSEDT).produces([format!("edt{}.als2", frame)]),
        launch: Launch::Stdin,
    };
    until_satisfied(ctx, |ctx| {
        check_ready(&stage.required, &ctx.session.frame_dir()).into_result()?;
        let max_error = ctx.operator.ask_f64("What is the largest magnitude error to keep? ")?;
        let mut params = ctx.session.params();
        params.insert("max_error".into(), max_error.to_string());
        run_stage(ctx, &stage, &params).map(drop)
    })
}

fn aperture_correction(ctx: &mut StepContext) -> StepResult<()> {
    let frame = ctx.session.frame.clone();
    let frame_dir = ctx.session.frame_dir();
    let mut required = vec![format!("edt{}.als2", frame), format!("{}3s.psf", frame)];
    required.extend([APCORR_OPT.to_string(), "macro1.sm".to_string()]);
    let helper = ScriptSpec::new("compapcorrHDI.scr", templates::COMPAPCORR_SCRIPT).safe();
    let driver = ScriptSpec::new("apcorrHDI.scr", templates::APCORR_SCRIPT).produces([
        "apcorr.coo",
        "apcorr.coo2",
        "apcorr.als",
        "apcorr.ap",
        "apcorr.apfull",
        "apcorr.apals",
        "apcorr.imh",
        "apcorr.pix",
        "ap_plot.out",
        "apcorrplot.pdf",
        "apcorr.log",
    ]);
    let mut params = ctx.session.params();
    params.insert("editor".into(), ctx.config.editor.clone());

    until_satisfied(ctx, |ctx| {
        check_ready(&required, &frame_dir).into_result()?;
        let tool = require_tool(ctx, "shell")?;
        let params = with_tools(ctx, APCORR_CALLS, &params)?;
        let helper_script = generate(&helper, &params, &frame_dir)?;
        make_executable(&helper_script.path)?;
        let script = generate(&driver, &params, &frame_dir)?;
        ctx.operator.say("The aperture-correction script pauses for you to edit files along the way.");
        launch(ctx, &tool, &script.path, Launch::Interactive).map(drop)
    })
}

#[cfg(unix)]
fn make_executable(path: &Path) -> StepResult<()> {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = fs::metadata(path)?.permissions();
    perms.set_mode(perms.mode() | 0o755);
    fs::set_permissions(path, perms)?;
    Ok(())
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> StepResult<()> {
    Ok(())
}
