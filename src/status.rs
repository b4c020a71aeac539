//! Stage-level status reporting.

use std::fmt;

use crate::error::RenderError;

/// Human-readable progress of a capture cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Capturing,
    Processing,
    Displaying,
    /// Continuous run progress, 1-based
    Cycle { index: usize, total: usize },
    /// A cycle was aborted
    Failed(RenderError),
    /// Restoring the sensor mode failed; the current mode stays active
    RestoreFailed(RenderError),
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Capturing => write!(f, "capturing"),
            Status::Processing => write!(f, "processing"),
            Status::Displaying => write!(f, "displaying"),
            Status::Cycle { index, total } => write!(f, "cycle {}/{}", index, total),
            Status::Failed(e) => write!(f, "error: {}", e),
            Status::RestoreFailed(e) => write!(f, "restore failed: {}", e),
        }
    }
}

/// Receiver for pipeline status updates.
pub trait StatusSink {
    fn report(&mut self, status: &Status);
}

/// Forwards status updates to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogStatus;

impl StatusSink for LogStatus {
    fn report(&mut self, status: &Status) {
        match status {
            Status::Failed(_) | Status::RestoreFailed(_) => log::warn!("{}", status),
            Status::Cycle { .. } => log::info!("{}", status),
            _ => log::debug!("{}", status),
        }
    }
}

/// Keeps every status message, oldest first.
#[derive(Debug, Default, Clone)]
pub struct RecordingStatus {
    messages: Vec<Status>,
}

impl RecordingStatus {
    pub fn messages(&self) -> &[Status] {
        &self.messages
    }

    /// Messages rendered as the strings a status line would show.
    pub fn lines(&self) -> Vec<String> {
        self.messages.iter().map(|s| s.to_string()).collect()
    }
}

impl StatusSink for RecordingStatus {
    fn report(&mut self, status: &Status) {
        self.messages.push(status.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SensorError;

    #[test]
    fn test_status_display() {
        assert_eq!(Status::Capturing.to_string(), "capturing");
        assert_eq!(Status::Processing.to_string(), "processing");
        assert_eq!(Status::Displaying.to_string(), "displaying");
        assert_eq!(Status::Cycle { index: 2, total: 5 }.to_string(), "cycle 2/5");
    }

    #[test]
    fn test_failed_status_includes_cause() {
        let status = Status::Failed(RenderError::NoFrame(SensorError::Timeout));
        assert!(status.to_string().starts_with("error: "));
        assert!(status.to_string().contains("Timed out"));
    }

    #[test]
    fn test_recording_status() {
        let mut sink = RecordingStatus::default();
        sink.report(&Status::Capturing);
        sink.report(&Status::Displaying);
        assert_eq!(sink.lines(), vec!["capturing", "displaying"]);
    }
}
