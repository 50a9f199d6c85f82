// src/exec/generator.rs

//! Running the external site generator.

use std::path::Path;
use std::process::Stdio;

use anyhow::{Context, Result};
use tokio::process::Command;
use tracing::info;

use crate::engine::TaskOutcome;
use crate::serve::ReloadHub;

/// Message shown in connected browsers while the generator runs.
pub fn build_notice(program: &str, args: &[String]) -> String {
    let mut notice = format!("Running {program}");
    for arg in args {
        notice.push(' ');
        notice.push_str(arg);
    }
    notice
}

/// Spawn `program args...` in `cwd` and wait for it to exit.
///
/// The child shares this process's stdin, stdout and stderr, so generator
/// output reaches the terminal untouched. The exit status becomes the
/// outcome: `Success` for 0, `Failed(code)` otherwise, `Failed(-1)` when the
/// process was killed by a signal.
///
/// Errors only when the process could not be spawned or waited on.
pub async fn run_generator(
    program: &str,
    args: &[String],
    cwd: &Path,
    hub: &ReloadHub,
) -> Result<TaskOutcome> {
    hub.notify(build_notice(program, args));

    let mut child = Command::new(program)
        .args(args)
        .current_dir(cwd)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .kill_on_drop(true)
        .spawn()
        .with_context(|| format!("spawning generator '{}'", program))?;

    let status = child
        .wait()
        .await
        .with_context(|| format!("waiting for generator '{}'", program))?;

    let code = status.code().unwrap_or(-1);
    info!(
        program = %program,
        exit_code = code,
        success = status.success(),
        "generator exited"
    );

    Ok(if status.success() {
        TaskOutcome::Success
    } else {
        TaskOutcome::Failed(code)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notice_names_the_command() {
        assert_eq!(
            build_notice("jekyll", &["build".to_string()]),
            "Running jekyll build"
        );
        assert_eq!(build_notice("hugo", &[]), "Running hugo");
    }
}
