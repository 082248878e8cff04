//! Progress reporting
//!
//! Failures while writing a report are logged and swallowed; they never reach
//! the ingestion data path.

use crate::error::ReportingError;
use crate::stats::StatsSnapshot;
use std::io::Write;
use tracing::warn;

pub struct ProgressReporter<'a> {
    out: Option<Box<dyn Write + 'a>>,
}

impl<'a> ProgressReporter<'a> {
    pub fn new(out: impl Write + 'a) -> Self {
        Self {
            out: Some(Box::new(out)),
        }
    }

    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }

    /// Reporter that discards everything
    pub fn silent() -> Self {
        Self { out: None }
    }

    /// Print the snapshot if it has at least one valid row
    pub fn report(&mut self, snapshot: &StatsSnapshot) {
        if let Err(e) = self.try_report(snapshot) {
            warn!("Error printing statistics: {}", e);
        }
    }

    pub fn try_report(&mut self, snapshot: &StatsSnapshot) -> Result<(), ReportingError> {
        let Some(out) = self.out.as_mut() else {
            return Ok(());
        };

        if let Some(text) = snapshot.render() {
            writeln!(out)?;
            writeln!(out, "{}", text)?;
            out.flush()?;
        }

        Ok(())
    }
}
