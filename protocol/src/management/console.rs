use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsoleSource {
    ProcessOutput,
    OperatorCommand,
    SystemNotice,
}

/// One line of the server console as shown to observers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleEntry {
    pub timestamp: DateTime<Utc>,
    pub text: String,
    pub source: ConsoleSource,
}

impl ConsoleEntry {
    pub fn new(text: impl Into<String>, source: ConsoleSource) -> Self {
        Self {
            timestamp: Utc::now(),
            text: text.into(),
            source,
        }
    }

    pub fn output(line: impl Into<String>) -> Self {
        Self::new(line, ConsoleSource::ProcessOutput)
    }

    /// Echo of an operator command, rendered the way a terminal prompt would.
    pub fn command(command: &str) -> Self {
        Self::new(format!("> {}", command), ConsoleSource::OperatorCommand)
    }

    pub fn notice(text: impl Into<String>) -> Self {
        Self::new(text, ConsoleSource::SystemNotice)
    }
}
