//! Terminal output: status lines on stderr, documents on stdout.

use console::{Style, Term};

use crate::error::CliError;

/// Terminal output formatter.
pub(crate) struct Output {
    status: Term,
    document: Term,
}

impl Output {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self {
            status: Term::stderr(),
            document: Term::stdout(),
        }
    }

    /// Print a progress note (dimmed).
    pub(crate) fn info(&self, msg: &str) {
        self.status_line(&Style::new().dim(), msg);
    }

    /// Print a warning (yellow).
    pub(crate) fn warning(&self, msg: &str) {
        self.status_line(&Style::new().yellow(), msg);
    }

    /// Print an error (red bold).
    pub(crate) fn error(&self, msg: &str) {
        self.status_line(&Style::new().red().bold(), msg);
    }

    /// Write rendered HTML to stdout, newline-terminated.
    pub(crate) fn document(&self, html: &str) -> Result<(), CliError> {
        if html.ends_with('\n') {
            self.document.write_str(html)?;
        } else {
            self.document.write_line(html)?;
        }
        self.document.flush()?;
        Ok(())
    }

    fn status_line(&self, style: &Style, msg: &str) {
        // Best effort: a closed stderr is ignored.
        let _ = self.status.write_line(&style.apply_to(msg).to_string());
    }
}
