//! `lsm completions`: shell completion scripts from the clap definition.

use std::{fs, io::Write, path::PathBuf};

use anyhow::{Context, Result};
use clap::CommandFactory;
use clap_complete::{Generator, Shell as CompletionShell, generate};

use crate::cli::{AppContext, Cli, CompletionsArgs, Shell};

pub const BIN_NAME: &str = "lsm";

impl From<Shell> for CompletionShell {
    fn from(shell: Shell) -> Self {
        match shell {
            Shell::Bash => CompletionShell::Bash,
            Shell::Zsh => CompletionShell::Zsh,
            Shell::Fish => CompletionShell::Fish,
            Shell::PowerShell => CompletionShell::PowerShell,
            Shell::Elvish => CompletionShell::Elvish,
        }
    }
}

/// The completion script for `shell`.
pub fn script(shell: Shell) -> Vec<u8> {
    let mut out = Vec::new();
    generate(CompletionShell::from(shell), &mut Cli::command(), BIN_NAME, &mut out);
    out
}

/// Where the script for `shell` lands inside `dir` (e.g. `lsm.bash`, `_lsm`).
pub fn script_path(shell: Shell, dir: &std::path::Path) -> PathBuf {
    dir.join(CompletionShell::from(shell).file_name(BIN_NAME))
}

pub fn run(args: CompletionsArgs, ctx: &AppContext) -> Result<()> {
    if args.stdout {
        return std::io::stdout()
            .write_all(&script(args.shell))
            .context("write completion to stdout");
    }

    let dir = args
        .out_dir
        .ok_or_else(|| anyhow::anyhow!("--out-dir is required unless --stdout is set"))?;
    let path = script_path(args.shell.clone(), &dir);

    if ctx.dry_run {
        if !ctx.quiet {
            println!("DRY RUN: Would write {}", path.display());
        }
        return Ok(());
    }

    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    fs::write(&path, script(args.shell)).with_context(|| format!("write {}", path.display()))?;

    if !ctx.quiet {
        eprintln!("Wrote completion to {}", path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(shell: Shell) -> String {
        String::from_utf8(script(shell)).expect("utf-8 script")
    }

    #[test]
    fn scripts_name_the_binary_and_its_commands() {
        let bash = text(Shell::Bash);
        assert!(bash.contains("lsm"));
        assert!(bash.contains("generate"));
        assert!(bash.contains("facets"));

        assert!(text(Shell::Fish).contains("complete -c lsm"));
        assert!(text(Shell::Zsh).starts_with("#compdef lsm"));
    }

    #[test]
    fn out_dir_receives_a_named_script() {
        let tmp = assert_fs::TempDir::new().expect("tempdir");
        let dir = tmp.path().join("completions");
        let ctx = AppContext { quiet: true, no_color: true, dry_run: false };
        let args = CompletionsArgs { shell: Shell::Bash, out_dir: Some(dir.clone()), stdout: false };

        run(args, &ctx).expect("completions");

        let path = script_path(Shell::Bash, &dir);
        assert_eq!(path.file_name().and_then(|n| n.to_str()), Some("lsm.bash"));
        assert!(fs::read_to_string(&path).expect("script").contains("lsm"));
    }

    #[test]
    fn missing_destination_is_an_error() {
        let ctx = AppContext { quiet: true, no_color: true, dry_run: false };
        let args = CompletionsArgs { shell: Shell::Zsh, out_dir: None, stdout: false };
        assert!(run(args, &ctx).is_err());
    }
}
