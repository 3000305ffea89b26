//! External process boundary.
//!
//! Every clone, patch, build and fetch goes through [`CommandRunner`], so the
//! orchestration logic never depends on which concrete tool does the work.

use std::ffi::OsString;
use std::fmt;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use thiserror::Error;

/// A single external invocation: program, arguments, working directory and
/// an optional file streamed to standard input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalCommand {
    pub program: PathBuf,
    pub args: Vec<OsString>,
    pub cwd: PathBuf,
    pub stdin: Option<PathBuf>,
}

impl ExternalCommand {
    pub fn new(program: impl Into<PathBuf>, cwd: impl AsRef<Path>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: cwd.as_ref().to_path_buf(),
            stdin: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn stdin_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.stdin = Some(path.into());
        self
    }

    /// Short program name used in diagnostics and by test doubles.
    pub fn program_name(&self) -> String {
        self.program
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.program.display().to_string())
    }

    /// Success predicate applied to the exit code (`None` means killed by a signal).
    pub fn succeeded(&self, code: Option<i32>) -> bool {
        code == Some(0)
    }
}

impl fmt::Display for ExternalCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        if let Some(stdin) = &self.stdin {
            write!(f, " < {}", stdin.display())?;
        }
        Ok(())
    }
}

/// Why an external command did not succeed.
#[derive(Debug, Error)]
pub enum CommandFailure {
    #[error("could not run `{command}` in '{cwd}': {source}")]
    Spawn {
        command: String,
        cwd: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("`{command}` in '{cwd}' exited with {}", describe_exit(*.code))]
    Exit {
        command: String,
        cwd: PathBuf,
        code: Option<i32>,
    },
}

fn describe_exit(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => "a signal".to_string(),
    }
}

/// Executes external commands and reports their exit code.
pub trait CommandRunner {
    /// Run `command` to completion. `Ok(None)` means the process was killed by
    /// a signal; `Err` means it could not be started at all.
    fn status(&self, command: &ExternalCommand) -> io::Result<Option<i32>>;
}

impl<R: CommandRunner + ?Sized> CommandRunner for &R {
    fn status(&self, command: &ExternalCommand) -> io::Result<Option<i32>> {
        (**self).status(command)
    }
}

/// Run `command` and turn anything but success into a [`CommandFailure`].
pub fn run_checked(
    runner: &dyn CommandRunner,
    command: &ExternalCommand,
) -> Result<(), CommandFailure> {
    let code = runner.status(command).map_err(|source| CommandFailure::Spawn {
        command: command.to_string(),
        cwd: command.cwd.clone(),
        source,
    })?;

    if command.succeeded(code) {
        Ok(())
    } else {
        Err(CommandFailure::Exit {
            command: command.to_string(),
            cwd: command.cwd.clone(),
            code,
        })
    }
}

/// Runs commands on the host. Output is inherited so long builds stay visible.
#[derive(Debug, Default, Clone, Copy)]
pub struct HostRunner;

impl CommandRunner for HostRunner {
    fn status(&self, command: &ExternalCommand) -> io::Result<Option<i32>> {
        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args).current_dir(&command.cwd);

        if let Some(stdin) = &command.stdin {
            let file = File::open(stdin).map_err(|err| {
                io::Error::new(
                    err.kind(),
                    format!("opening stdin file '{}': {err}", stdin.display()),
                )
            })?;
            cmd.stdin(Stdio::from(file));
        }

        let status = cmd.status()?;
        Ok(status.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn display_includes_args_and_stdin() {
        let command = ExternalCommand::new("patch", "/tmp")
            .arg("-p0")
            .stdin_file("/tmp/fix.diff");
        assert_eq!(command.to_string(), "patch -p0 < /tmp/fix.diff");
    }

    #[test]
    fn host_runner_reports_exit_codes() {
        let tmp = TempDir::new().unwrap();
        let ok = ExternalCommand::new("sh", tmp.path()).args(["-c", "exit 0"]);
        let failing = ExternalCommand::new("sh", tmp.path()).args(["-c", "exit 3"]);

        assert!(run_checked(&HostRunner, &ok).is_ok());
        match run_checked(&HostRunner, &failing) {
            Err(CommandFailure::Exit { code, .. }) => assert_eq!(code, Some(3)),
            other => panic!("expected exit failure, got {other:?}"),
        }
    }

    #[test]
    fn host_runner_feeds_stdin_file() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("input.txt");
        fs::write(&input, "payload\n").unwrap();
        let command = ExternalCommand::new("sh", tmp.path())
            .args(["-c", "cat > copied.txt"])
            .stdin_file(&input);

        run_checked(&HostRunner, &command).unwrap();
        assert_eq!(fs::read_to_string(tmp.path().join("copied.txt")).unwrap(), "payload\n");
    }

    #[test]
    fn missing_program_is_a_spawn_failure() {
        let tmp = TempDir::new().unwrap();
        let command = ExternalCommand::new(tmp.path().join("no-such-script.sh"), tmp.path());
        assert!(matches!(
            run_checked(&HostRunner, &command),
            Err(CommandFailure::Spawn { .. })
        ));
    }
}
