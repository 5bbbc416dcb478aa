use crate::config::Config;
use crate::error::{StepError, StepResult};
use crate::model::ToolReference;
use std::ffi::OsStr;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvokeOptions {
    pub dry_run: bool,
    pub timeout: Option<Duration>,
    pub poll_interval: Duration,
}

impl From<&Config> for InvokeOptions {
    fn from(config: &Config) -> Self {
        Self {
            dry_run: config.dry_run,
            timeout: config.tool_timeout(),
            poll_interval: config.poll_interval(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Invocation {
    Completed(ExitStatus),
    /// Dry run: the script was left on disk and nothing was executed.
    Skipped,
}

/// Run `tool` with stdin bound to `script`, appending stdout and stderr to
/// `log`. Blocks until the tool exits or the timeout expires.
pub fn invoke(
    tool: &ToolReference,
    script: &Path,
    log: &Path,
    cwd: &Path,
    opts: &InvokeOptions,
) -> StepResult<Invocation> {
    if opts.dry_run {
        log::info!("dry run: not running {} < {}", tool.executable, script.display());
        return Ok(Invocation::Skipped);
    }

    let input = File::open(script)?;
    let label = format!("{} < {}", tool.executable, file_label(script));
    let (stdout, stderr) = open_log(log, &label)?;

    let mut cmd = Command::new(&tool.executable);
    cmd.current_dir(cwd)
        .stdin(input)
        .stdout(stdout)
        .stderr(stderr);

    spawn_and_wait(cmd, tool, opts)
}

/// Run a shell-style `tool` with `script` as its argument and its output
/// appended to `log`. Stdin is closed so a script that prompts fails fast.
pub fn run_script(
    tool: &ToolReference,
    script: &Path,
    log: &Path,
    cwd: &Path,
    opts: &InvokeOptions,
) -> StepResult<Invocation> {
    if opts.dry_run {
        log::info!("dry run: not running {} {}", tool.executable, script.display());
        return Ok(Invocation::Skipped);
    }

    let label = format!("{} {}", tool.executable, file_label(script));
    let (stdout, stderr) = open_log(log, &label)?;

    let mut cmd = Command::new(&tool.executable);
    cmd.current_dir(cwd)
        .arg(script)
        .stdin(Stdio::null())
        .stdout(stdout)
        .stderr(stderr);

    spawn_and_wait(cmd, tool, opts)
}

/// Hand the terminal to `tool` until the operator closes it. No timeout: the
/// operator decides how long an interactive session lasts.
pub fn run_interactive<I, S>(
    tool: &ToolReference,
    args: I,
    cwd: &Path,
    opts: &InvokeOptions,
) -> StepResult<Invocation>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    if opts.dry_run {
        log::info!("dry run: not starting {}", tool.executable);
        return Ok(Invocation::Skipped);
    }

    log::info!("starting interactive {}", tool.executable);
    let status = Command::new(&tool.executable)
        .current_dir(cwd)
        .args(args)
        .status()?;
    Ok(Invocation::Completed(status))
}

/// Human-readable exit status for the operator.
pub fn describe_status(status: &ExitStatus) -> String {
    match status.code() {
        Some(0) => "finished successfully".to_string(),
        Some(code) => format!("exited with status {}", code),
        None => "was terminated by a signal".to_string(),
    }
}

/// Open the log for appending and write a header for the next run. Returns
/// one handle for stdout and one for stderr.
fn open_log(log: &Path, label: &str) -> StepResult<(File, File)> {
    let mut file = OpenOptions::new().create(true).append(true).open(log)?;
    writeln!(file, "\n$ {}", label)?;
    let err = file.try_clone()?;
    Ok((file, err))
}

fn spawn_and_wait(mut cmd: Command, tool: &ToolReference, opts: &InvokeOptions) -> StepResult<Invocation> {
    log::info!("running {}", tool.executable);
    let mut child = cmd.spawn()?;
    let status = wait_with_timeout(&mut child, tool, opts)?;
    log::info!("{} {}", tool.executable, describe_status(&status));
    Ok(Invocation::Completed(status))
}

fn wait_with_timeout(child: &mut Child, tool: &ToolReference, opts: &InvokeOptions) -> StepResult<ExitStatus> {
    let started = Instant::now();
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(status);
        }
        if let Some(limit) = opts.timeout {
            if started.elapsed() >= limit {
                log::warn!("{} exceeded {:?}, killing it", tool.executable, limit);
                // The child may have exited between try_wait and kill.
                let _ = child.kill();
                child.wait()?;
                return Err(StepError::ToolTimeout {
                    tool: tool.logical_name.clone(),
                    timeout: limit,
                });
            }
        }
        thread::sleep(opts.poll_interval);
    }
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
