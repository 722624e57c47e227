use crate::prelude::*;
use crate::{fatal, Result};
use std::process::Stdio;

/// Max number of trailing bytes of stderr that we include into the error
/// message when the program fails.
const STDERR_TAIL_LIMIT: usize = 2048;

/// Runs the program to completion and returns its stdout. Nonzero exit
/// status is reported as an error with the tail of stderr attached.
pub(crate) async fn run(program: &str, args: &[&str]) -> Result<Vec<u8>> {
    let display_args = shlex::try_join(args.iter().copied()).fatal_ctx(|| {
        format!("Couldn't run program that contains a nul byte: {program:?} {args:?}")
    })?;

    let display_cmd = format!("{program} {display_args}");
    debug!(
        cmd = %display_cmd,
        "Running program"
    );

    let output = tokio::process::Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await
        .fatal_ctx(|| format!("Invocation failed. Command:\n`{display_cmd}`"))?;

    let status = output.status;

    if !status.success() {
        let stderr = &output.stderr;
        let tail = &stderr[stderr.len().saturating_sub(STDERR_TAIL_LIMIT)..];
        return Err(fatal!(
            "{program} invocation failed with status {status}. Command:\n{display_cmd}\n\
            Stderr (tail):\n{}",
            String::from_utf8_lossy(tail)
        ));
    }

    Ok(output.stdout)
}
