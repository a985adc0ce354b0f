//! Hand a file to the desktop's default program.

use std::path::Path;
use std::process::Command;

/// Program and leading arguments for the platform's "open this file" command.
pub fn opener() -> (&'static str, &'static [&'static str]) {
    if cfg!(windows) {
        // empty title, otherwise `start` takes a quoted path as the window title
        ("cmd", &["/C", "start", ""])
    } else if cfg!(target_os = "macos") {
        ("open", &[])
    } else {
        ("xdg-open", &[])
    }
}

/// Open `path` without waiting. Returns `false` when the file does not exist.
pub fn open_in_shell(path: &Path) -> eyre::Result<bool> {
    if !path.exists() {
        tracing::warn!(path = %path.display(), "nothing to open yet");
        return Ok(false);
    }
    let (program, args) = opener();
    Command::new(program)
        .args(args)
        .arg(path)
        .spawn()
        .map_err(|e| eyre::eyre!("run {program} for {}: {e}", path.display()))?;
    tracing::info!(path = %path.display(), program, "ledger opened");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!open_in_shell(&dir.path().join("nope.csv")).unwrap());
    }

    #[test]
    fn opener_matches_platform() {
        let (program, args) = opener();
        if cfg!(windows) {
            assert_eq!(program, "cmd");
            assert_eq!(args.last(), Some(&""));
        } else if cfg!(target_os = "macos") {
            assert_eq!(program, "open");
        } else {
            assert_eq!(program, "xdg-open");
            assert!(args.is_empty());
        }
    }
}
