//! Shell completion generation using clap_complete.

use anyhow::{Context, Result};
use clap::{Command, CommandFactory};
use clap_complete::{generate, generate_to, Shell as CompletionShell};
use std::{fs, io};

use crate::cli::{AppContext, Cli, CompletionsArgs, Shell};

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

pub fn run(args: CompletionsArgs, ctx: &AppContext) -> Result<()> {
    let mut cmd: Command = Cli::command();
    // Completions are keyed to the name clap knows the binary by
    let bin_name = cmd.get_name().to_string();
    let shell: CompletionShell = args.shell.into();

    if args.stdout {
        generate(shell, &mut cmd, &bin_name, &mut io::stdout());
        return Ok(());
    }

    let dir = args
        .out_dir
        .ok_or_else(|| anyhow::anyhow!("--out-dir is required unless --stdout is set"))?;

    fs::create_dir_all(&dir).context("create --out-dir")?;
    let path = generate_to(shell, &mut cmd, &bin_name, &dir)
        .context("generate completion file")?;

    if !ctx.quiet {
        eprintln!("Wrote completion to {}", path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_completion_file() {
        let dir = assert_fs::TempDir::new().unwrap();
        let args = CompletionsArgs {
            shell: Shell::Bash,
            out_dir: Some(dir.path().to_path_buf()),
            stdout: false,
        };
        let ctx = AppContext { quiet: true, no_color: true, dry_run: false };
        run(args, &ctx).unwrap();
        let expected = format!("{}.bash", Cli::command().get_name());
        assert_eq!(expected, "msync.bash");
        assert!(dir.path().join(expected).exists());
    }

    #[test]
    fn out_dir_required_without_stdout() {
        let args = CompletionsArgs { shell: Shell::Zsh, out_dir: None, stdout: false };
        let ctx = AppContext { quiet: true, no_color: true, dry_run: false };
        let err = run(args, &ctx).unwrap_err();
        assert!(err.to_string().contains("--out-dir"));
    }
}
