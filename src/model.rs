#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Status {
    #[default]
    Ready,
    Info(String),
    Error {
        title: &'static str,
        message: String,
    },
}

impl Status {
    pub fn label(&self) -> &'static str {
        match self {
            Status::Ready => "Ready",
            Status::Info(_) => "Info",
            Status::Error { .. } => "Error",
        }
    }

    /// Text for the status bar or an error dialog body.
    pub fn message(&self) -> &str {
        match self {
            Status::Ready => "Ready",
            Status::Info(message) => message,
            Status::Error { message, .. } => message,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Status::Error { .. })
    }
}

/// Text shown in the command output pane after a run.
pub fn command_report(exit_code: i32, output: &str) -> String {
    let body = if output.is_empty() { "(no output)" } else { output };
    format!("Exit code: {exit_code}\n\n{body}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_output_is_labelled() {
        assert_eq!(command_report(0, ""), "Exit code: 0\n\n(no output)");
        assert_eq!(command_report(2, "boom"), "Exit code: 2\n\nboom");
    }

    #[test]
    fn status_exposes_message() {
        let status = Status::Error {
            title: "Command Failed",
            message: "timed out".into(),
        };
        assert!(status.is_error());
        assert_eq!(status.label(), "Error");
        assert_eq!(status.message(), "timed out");
        assert_eq!(Status::default().message(), "Ready");
    }
}
