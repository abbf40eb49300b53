use std::path::PathBuf;
use std::process::ExitCode;

use cgp_core::DeployError;
use clap::{Parser, Subcommand};

mod completion;
mod config;
mod flows;
mod patch;
mod render;


#[derive(Parser, Debug)]
#[command(name = "cgp-deploy")]
#[command(about = "Versioned installer and update manager for the cgp tool", long_about = None)]
struct Cli {
    /// GitHub repository to install from (owner/name)
    #[arg(long)]
    repo: Option<String>,
    /// Installation root holding versions/ and the current pointer
    #[arg(long)]
    root: Option<PathBuf>,
    /// Directory the user-visible cgp symlink is placed in
    #[arg(long)]
    dest: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Download, verify and install a release
    Install {
        /// Release tag: "latest" or explicit (e.g. v0.1.0)
        #[arg(long)]
        tag: Option<String>,
        /// Copy the asset and checksums from a directory instead of downloading
        #[arg(long)]
        local_source: Option<PathBuf>,
        /// Do not run the installed tool's `auto install` step afterwards
        #[arg(long)]
        no_patch: bool,
    },
    /// Install the newest release when one is available
    Upgrade {
        #[arg(long)]
        local_source: Option<PathBuf>,
        /// Upgrade even when the update check is throttled or inconclusive
        #[arg(long)]
        force: bool,
        #[arg(long)]
        no_patch: bool,
    },
    /// Report whether a newer release is available
    Check,
    /// Show the installation state and the managed tool's own status
    Status,
    /// Apply the patch via the installed tool
    Patch,
    /// Revert the patch via the installed tool
    Unpatch,
    /// Remove the destination symlink and the installation root
    Uninstall {
        /// Do not run the installed tool's `auto uninstall` step first
        #[arg(long)]
        no_patch: bool,
    },
    /// Print the resolved configuration and platform diagnosis
    Doctor,
    /// Generate shell completions (defaults to the shell from $SHELL)
    Completions {
        #[arg(value_enum)]
        shell: Option<clap_complete::Shell>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match flows::run_cli(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            render::print_error(&format!("{err:#}"));
            let code = err
                .downcast_ref::<DeployError>()
                .map(DeployError::exit_code)
                .unwrap_or(1);
            ExitCode::from(code as u8)
        }
    }
}
