use std::path::Path;

use clap::CommandFactory;
use clap_complete::Shell;

use crate::Cli;

pub fn print_completions(requested: Option<Shell>) {
    let shell = resolve_shell(
        requested,
        std::env::var("SHELL").ok().as_deref(),
        cfg!(windows),
    );
    let mut command = Cli::command();
    clap_complete::generate(shell, &mut command, "cgp-deploy", &mut std::io::stdout());
}

pub(crate) fn resolve_shell(
    requested: Option<Shell>,
    shell_env: Option<&str>,
    is_windows: bool,
) -> Shell {
    if let Some(shell) = requested {
        return shell;
    }
    if let Some(shell) = detect_shell_from_env(shell_env) {
        return shell;
    }
    if is_windows {
        Shell::PowerShell
    } else {
        Shell::Bash
    }
}

fn detect_shell_from_env(shell_env: Option<&str>) -> Option<Shell> {
    let shell_value = shell_env?;
    let shell_token = Path::new(shell_value)
        .file_name()
        .and_then(|value| value.to_str())
        .unwrap_or(shell_value)
        .to_ascii_lowercase();
    match shell_token.as_str() {
        "bash" => Some(Shell::Bash),
        "zsh" => Some(Shell::Zsh),
        "fish" => Some(Shell::Fish),
        "powershell" | "pwsh" => Some(Shell::PowerShell),
        _ => None,
    }
}
