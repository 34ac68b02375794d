//! Colored terminal output on stderr.

use std::path::Path;

use console::{Style, Term};

/// Terminal output formatter for batch progress.
pub(crate) struct Output {
    term: Term,
    green: Style,
    yellow: Style,
    red: Style,
    cyan_bold: Style,
}

impl Output {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self {
            term: Term::stderr(),
            green: Style::new().green(),
            yellow: Style::new().yellow(),
            red: Style::new().red(),
            cyan_bold: Style::new().cyan().bold(),
        }
    }

    /// Print an info message.
    pub(crate) fn info(&self, msg: &str) {
        let _ = self.term.write_line(msg);
    }

    /// Print a warning message (yellow).
    pub(crate) fn warning(&self, msg: &str) {
        let _ = self.term.write_line(&self.yellow.apply_to(msg).to_string());
    }

    /// Print an error message (red).
    pub(crate) fn error(&self, msg: &str) {
        let _ = self.term.write_line(&self.red.apply_to(msg).to_string());
    }

    /// Announce the directory about to be scanned.
    pub(crate) fn scanning(&self, input_dir: &Path, extension: &str) {
        let line = format!("Scanning {} for .{extension} templates", input_dir.display());
        let _ = self
            .term
            .write_line(&self.cyan_bold.apply_to(line).to_string());
    }

    /// Report one generated template.
    pub(crate) fn converted(&self, source: &Path, target: &Path) {
        let line = format!("{} -> {}", source.display(), target.display());
        let _ = self.term.write_line(&self.green.apply_to(line).to_string());
    }

    /// Report one template that failed to convert.
    pub(crate) fn failed(&self, source: &Path, reason: &str) {
        self.error(&format!("{}: {reason}", source.display()));
    }

    /// Print the closing tally.
    pub(crate) fn summary(&self, converted: usize, failed: usize, dry_run: bool) {
        let verb = if dry_run { "checked" } else { "converted" };
        let line = format!("{converted} template(s) {verb}, {failed} failed");
        let style = if failed > 0 { &self.red } else { &self.green };
        let _ = self.term.write_line(&style.apply_to(line).to_string());
    }
}
