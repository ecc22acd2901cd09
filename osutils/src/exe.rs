use std::{
    io,
    os::unix::process::ExitStatusExt,
    process::{Command, Output},
};

use anyhow::{anyhow, Context, Error};
use log::trace;

use crate::crate_private::Sealed;

/// Inspection of the outcome of a spawned process. Sealed, only implemented
/// for the result of `Command::output`.
pub trait OutputChecker: Sealed {
    /// Captured stdout, lossily decoded.
    fn stdout(&self) -> String;

    /// Captured stderr, lossily decoded.
    fn stderr(&self) -> String;

    /// Describes how the process ended.
    fn describe_exit(&self) -> String;

    /// Returns stdout when the process ran and exited with status 0.
    fn checked_stdout(&self) -> Result<String, Error>;
}

impl Sealed for io::Result<Output> {}

impl OutputChecker for io::Result<Output> {
    fn stdout(&self) -> String {
        match self {
            Ok(output) => String::from_utf8_lossy(&output.stdout).into(),
            Err(_) => String::new(),
        }
    }

    fn stderr(&self) -> String {
        match self {
            Ok(output) => String::from_utf8_lossy(&output.stderr).into(),
            Err(_) => String::new(),
        }
    }

    fn describe_exit(&self) -> String {
        match self {
            Err(e) => format!("failed to spawn process: {e}"),
            Ok(output) => match (output.status.code(), output.status.signal()) {
                (Some(code), _) => format!("process exited with status: {code}"),
                (None, Some(signal)) => format!("process was terminated by signal: {signal}"),
                (None, None) => "process exited with unknown status".into(),
            },
        }
    }

    fn checked_stdout(&self) -> Result<String, Error> {
        match self {
            Ok(output) if output.status.success() => Ok(self.stdout()),
            _ => {
                let stderr = self.stderr();
                let detail = if stderr.trim().is_empty() {
                    anyhow!("(no error output was captured)")
                } else {
                    anyhow!("stderr:\n{}", stderr.trim_end())
                };
                Err(detail.context(self.describe_exit()))
            }
        }
    }
}

/// Runs a command to completion and hands back its stdout.
pub trait RunAndCheck: Sealed {
    /// Fails unless the command exited successfully.
    fn output_and_check(&mut self) -> Result<String, Error>;

    /// Renders the command line for log and error messages.
    fn render_command(&self) -> String;
}

impl Sealed for Command {}

impl RunAndCheck for Command {
    fn output_and_check(&mut self) -> Result<String, Error> {
        let rendered = self.render_command();
        trace!("Executing '{rendered}'");
        let result = self.output();
        trace!("Executed '{rendered}': {}", result.describe_exit());

        result
            .checked_stdout()
            .with_context(|| format!("Error when running: {rendered}"))
    }

    fn render_command(&self) -> String {
        std::iter::once(self.get_program().to_string_lossy())
            .chain(self.get_args().map(|arg| arg.to_string_lossy()))
            .map(|part| {
                if part.contains(' ') {
                    format!("'{part}'")
                } else {
                    part.into_owned()
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}
