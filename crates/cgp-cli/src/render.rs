use std::io::IsTerminal;
use std::time::Duration;

use anstyle::{AnsiColor, Effects, Style};
use indicatif::{ProgressBar, ProgressStyle};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum OutputStyle {
    Plain,
    Rich,
}

pub fn current_output_style() -> OutputStyle {
    if std::env::var_os("NO_COLOR").is_some() {
        return OutputStyle::Plain;
    }
    if std::env::var("TERM").map(|term| term == "dumb").unwrap_or(false) {
        return OutputStyle::Plain;
    }
    if std::io::stdout().is_terminal() {
        OutputStyle::Rich
    } else {
        OutputStyle::Plain
    }
}

#[derive(Copy, Clone, Debug)]
pub struct TerminalRenderer {
    style: OutputStyle,
}

impl TerminalRenderer {
    pub fn current() -> Self {
        Self {
            style: current_output_style(),
        }
    }

    pub fn print_status(self, status: &str, message: &str) {
        println!("{}", render_status_line(self.style, status, message));
    }

    pub fn print_warning(self, message: &str) {
        eprintln!("{}", render_warning_line(self.style, message));
    }

    /// Spinner for a long step in rich mode; a no-op otherwise. Cleared on
    /// drop, so an early error never leaves a stuck spinner line.
    pub fn start_step(self, label: &str) -> StepSpinner {
        let bar = if self.style == OutputStyle::Rich {
            let bar = ProgressBar::new_spinner();
            if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan.bold} {msg}") {
                bar.set_style(style);
            }
            bar.set_message(label.to_string());
            bar.enable_steady_tick(Duration::from_millis(80));
            Some(bar)
        } else {
            None
        };
        StepSpinner { bar }
    }
}

pub struct StepSpinner {
    bar: Option<ProgressBar>,
}

impl StepSpinner {
    pub fn finish(self) {}
}

impl Drop for StepSpinner {
    fn drop(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}

pub fn print_error(message: &str) {
    eprintln!("error: {message}");
}

pub(crate) fn render_status_line(style: OutputStyle, status: &str, message: &str) -> String {
    match style {
        OutputStyle::Plain => format!("{status:>9} {message}"),
        OutputStyle::Rich => format!(
            "{} {}",
            colorize(status_style(), &format!("{status:>9}")),
            message
        ),
    }
}

pub(crate) fn render_warning_line(style: OutputStyle, message: &str) -> String {
    match style {
        OutputStyle::Plain => format!("warning: {message}"),
        OutputStyle::Rich => format!("{} {message}", colorize(warning_style(), "warning:")),
    }
}

fn status_style() -> Style {
    Style::new()
        .fg_color(Some(AnsiColor::BrightCyan.into()))
        .effects(Effects::BOLD)
}

fn warning_style() -> Style {
    Style::new()
        .fg_color(Some(AnsiColor::BrightYellow.into()))
        .effects(Effects::BOLD)
}

fn colorize(style: Style, text: &str) -> String {
    format!("{}{}{}", style.render(), text, style.render_reset())
}
