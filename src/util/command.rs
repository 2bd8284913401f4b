use crate::core::error::{Error, Result};
use std::io::Write;
use std::process::{Command, Stdio};

/// Run an external program, inheriting stdout and stderr.
pub fn run(program: &str, args: &[&str]) -> Result<()> {
    tracing::debug!("Running {} {}", program, args.join(" "));

    let status = Command::new(program)
        .args(args)
        .status()
        .map_err(|e| Error::command(program, e.to_string()))?;

    check_status(program, status)
}

/// Run an external program with `stdin` piped to it.
pub fn run_with_stdin(stdin: &str, program: &str, args: &[&str]) -> Result<()> {
    tracing::debug!("Running {} {} (with stdin)", program, args.join(" "));

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .spawn()
        .map_err(|e| Error::command(program, e.to_string()))?;

    if let Some(mut pipe) = child.stdin.take() {
        pipe.write_all(stdin.as_bytes())
            .map_err(|e| Error::command(program, format!("failed to write stdin: {e}")))?;
    }

    let status = child
        .wait()
        .map_err(|e| Error::command(program, e.to_string()))?;

    check_status(program, status)
}

/// Check if a command is available on the system.
pub fn check_command_available(cmd: &str) -> bool {
    Command::new(cmd)
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok()
}

fn check_status(program: &str, status: std::process::ExitStatus) -> Result<()> {
    if status.success() {
        Ok(())
    } else {
        Err(Error::command(program, status.to_string()))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_run_success() {
        run("true", &[]).unwrap();
    }

    #[test]
    fn test_run_nonzero_exit() {
        let err = run("false", &[]).unwrap_err();
        match err {
            Error::Command { program, .. } => assert_eq!(program, "false"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_run_missing_program() {
        let err = run("bootable-definitely-not-a-program", &[]).unwrap_err();
        assert!(matches!(err, Error::Command { .. }));
    }

    #[test]
    fn test_run_with_stdin() {
        run_with_stdin(",,c,*\n", "grep", &["-q", "c,\\*"]).unwrap();
        assert!(run_with_stdin("nothing here\n", "grep", &["-q", "xyz"]).is_err());
    }
}
