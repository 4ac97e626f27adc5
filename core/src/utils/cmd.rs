use anyhow::Context;
use console::strip_ansi_codes;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::process::{Command, Stdio};

fn new_command(path: impl AsRef<Path>, cmd: &str, args: &[&str]) -> Command {
    let mut command = Command::new(cmd);
    command
        .current_dir(path)
        .args(args)
        .env("GIT_TERMINAL_PROMPT", "0");

    #[cfg(target_os = "windows")]
    {
        use std::os::windows::process::CommandExt;
        const CREATE_NO_WINDOW: u32 = 0x08000000;
        command.creation_flags(CREATE_NO_WINDOW);
    }
    command
}

pub fn exec_cmd(path: impl AsRef<Path>, cmd: &str, args: &[&str]) -> Result<String, anyhow::Error> {
    let output = new_command(path, cmd, args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .with_context(|| format!("Error starting command: {} {}", cmd, args.join(" ")))?;

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

    match output.status.success() {
        true => Ok(stdout),
        false => Err(anyhow::anyhow!(stderr.trim().to_string())),
    }
}

/// Run a command, feeding each stderr line (split on `\r` and `\n`) to `on_line`.
///
/// `display` replaces the argument list in error messages, so callers can keep
/// secrets embedded in arguments out of logs.
pub fn exec_cmd_with_progress(
    path: impl AsRef<Path>,
    cmd: &str,
    args: &[&str],
    display: &str,
    on_line: &mut dyn FnMut(&str),
) -> anyhow::Result<()> {
    let mut spawned = new_command(path, cmd, args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("Error starting command: {}", display))?;

    // get message from stderr with "--progress" option
    let mut last_line = String::new();
    if let Some(stderr) = spawned.stderr.take() {
        for chunk in BufReader::new(stderr).split(b'\r') {
            let chunk = chunk.context("Error reading command output")?;
            let text = String::from_utf8_lossy(&chunk);
            for line in strip_ansi_codes(&text).lines() {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                on_line(line);
                last_line = line.to_string();
            }
        }
    }

    let exit_code = spawned
        .wait()
        .context("Error waiting for process to finish")?;

    if !exit_code.success() {
        let code = exit_code
            .code()
            .map_or_else(|| "signal".to_string(), |c| c.to_string());
        anyhow::bail!("{} exited with code {}: {}. With command: {}", cmd, code, last_line, display);
    }
    Ok(())
}
