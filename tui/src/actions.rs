use std::io::Write;
use std::process::Command;
use std::process::Stdio;

use anyhow::Context;
use anyhow::Result;
use anyhow::bail;

/// Launch an editor on `path:line:col`. A non-empty template takes
/// precedence; otherwise try `zed`, then the platform opener. The child is
/// detached, not waited on.
pub fn open_location(path: &str, line: u32, col: u32, editor_cmd: &str) -> Result<()> {
    let target = format!("{path}:{line}:{col}");

    if !editor_cmd.trim().is_empty() {
        let (name, args) = build_editor_command(editor_cmd, path, line, col, &target)?;
        let spawned = Command::new(&name)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();
        return match spawned {
            Ok(_) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                bail!("editor command not found: {name}")
            }
            Err(err) => Err(err).with_context(|| format!("launch {name}")),
        };
    }

    if spawn_detached("zed", &[target.as_str()]).is_ok() {
        return Ok(());
    }

    if cfg!(target_os = "macos") {
        spawn_detached("open", &[path]).context("zed and open are unavailable")
    } else if cfg!(target_os = "windows") {
        spawn_detached("explorer.exe", &[path])
            .or_else(|_| spawn_detached("cmd", &["/C", "start", "", path]))
            .context("zed and explorer are unavailable")
    } else {
        spawn_detached("xdg-open", &[path]).context("zed and xdg-open are unavailable")
    }
}

/// Expand the `--editor-cmd` template into a program and argument list.
/// Placeholders `{file} {line} {col} {target}` are substituted after
/// shell-like tokenization, so paths with spaces survive.
pub fn build_editor_command(
    template: &str,
    file: &str,
    line: u32,
    col: u32,
    target: &str,
) -> Result<(String, Vec<String>)> {
    let mut parts = split_command_line(template.trim())?;
    if parts.is_empty() {
        bail!("editor command is empty");
    }

    for part in &mut parts {
        *part = part
            .replace("{file}", file)
            .replace("{line}", &line.to_string())
            .replace("{col}", &col.to_string())
            .replace("{target}", target);
    }

    let name = parts.remove(0);
    Ok((name, parts))
}

/// Tokenize honoring single and double quotes. Quotes group, they do not
/// nest; an empty quoted token is preserved; backslashes pass through
/// untouched so Windows paths survive.
fn split_command_line(input: &str) -> Result<Vec<String>> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut token_active = false;
    let mut in_single = false;
    let mut in_double = false;

    for r in input.chars() {
        match r {
            '\'' if !in_double => {
                in_single = !in_single;
                token_active = true;
            }
            '"' if !in_single => {
                in_double = !in_double;
                token_active = true;
            }
            ' ' | '\t' | '\n' | '\r' if !in_single && !in_double => {
                if token_active {
                    parts.push(std::mem::take(&mut current));
                    token_active = false;
                }
            }
            other => {
                current.push(other);
                token_active = true;
            }
        }
    }

    if in_single || in_double {
        bail!("editor command has unclosed quote");
    }
    if token_active {
        parts.push(current);
    }
    Ok(parts)
}

/// Copy a string to the system clipboard by piping it to whichever
/// platform utility is present.
pub fn copy_to_clipboard(s: &str) -> Result<()> {
    if cfg!(target_os = "macos") {
        return pipe_to_command(s, "pbcopy", &[]);
    }
    if cfg!(target_os = "windows") {
        return pipe_to_command(s, "clip", &[]);
    }

    for (name, args) in [
        ("wl-copy", [].as_slice()),
        ("xclip", ["-selection", "clipboard"].as_slice()),
        ("xsel", ["--clipboard", "--input"].as_slice()),
    ] {
        match pipe_to_command(s, name, args) {
            Ok(()) => return Ok(()),
            Err(err) if is_not_found(&err) => continue,
            Err(err) => return Err(err),
        }
    }
    bail!("no clipboard utility found (install wl-copy, xclip, or xsel)")
}

fn pipe_to_command(input: &str, name: &str, args: &[&str]) -> Result<()> {
    let mut child = Command::new(name)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .with_context(|| format!("spawn {name}"))?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(input.as_bytes())?;
    }
    let status = child.wait()?;
    if !status.success() {
        bail!("{name} exited with {status}");
    }
    Ok(())
}

fn is_not_found(err: &anyhow::Error) -> bool {
    err.downcast_ref::<std::io::Error>()
        .is_some_and(|io| io.kind() == std::io::ErrorKind::NotFound)
}

fn spawn_detached(name: &str, args: &[&str]) -> std::io::Result<()> {
    Command::new(name)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map(|_| ())
}
