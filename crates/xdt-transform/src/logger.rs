//! The logging capability handed to a transformation.
//!
//! Every diagnostic produced while applying a transform is forwarded to a
//! [`TransformationLogger`]. When the caller does not supply one, events go
//! to `tracing` through [`TracingLogger`].

use std::fmt;

/// Importance of an informational message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Normal,
    Verbose,
}

/// Where a logged event originates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLocation {
    pub file: String,
    /// 1-based; 0 when unknown.
    pub line: usize,
    /// 1-based; 0 when unknown.
    pub column: usize,
}

impl fmt::Display for LogLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({},{})", self.file, self.line, self.column)
    }
}

pub trait TransformationLogger {
    fn log_message(&mut self, level: MessageType, message: &str);

    fn log_warning(&mut self, message: &str, location: Option<&LogLocation>);

    fn log_error(&mut self, message: &str, location: Option<&LogLocation>);

    fn start_section(&mut self, _message: &str) {}

    fn end_section(&mut self, _message: &str) {}
}

/// Forwards events to `tracing`.
#[derive(Debug, Default)]
pub struct TracingLogger;

impl TransformationLogger for TracingLogger {
    fn log_message(&mut self, level: MessageType, message: &str) {
        match level {
            MessageType::Normal => tracing::info!("{}", message),
            MessageType::Verbose => tracing::debug!("{}", message),
        }
    }

    fn log_warning(&mut self, message: &str, location: Option<&LogLocation>) {
        match location {
            Some(location) => tracing::warn!(%location, "{}", message),
            None => tracing::warn!("{}", message),
        }
    }

    fn log_error(&mut self, message: &str, location: Option<&LogLocation>) {
        match location {
            Some(location) => tracing::error!(%location, "{}", message),
            None => tracing::error!("{}", message),
        }
    }

    fn start_section(&mut self, message: &str) {
        tracing::debug!("{}", message);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogEntry {
    Message(MessageType, String),
    Warning(String, Option<LogLocation>),
    Error(String, Option<LogLocation>),
    StartSection(String),
    EndSection(String),
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct CollectingLogger {
    entries: Vec<LogEntry>,
}

impl CollectingLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn errors(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().filter_map(|e| match e {
            LogEntry::Error(message, _) => Some(message.as_str()),
            _ => None,
        })
    }

    pub fn warnings(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().filter_map(|e| match e {
            LogEntry::Warning(message, _) => Some(message.as_str()),
            _ => None,
        })
    }

    /// One line per event, sections indented.
    pub fn log_text(&self) -> String {
        let mut depth = 0usize;
        let mut out = String::new();
        for entry in &self.entries {
            let line = match entry {
                LogEntry::Message(_, message) => message.clone(),
                LogEntry::Warning(message, Some(location)) => {
                    format!("{}: warning: {}", location, message)
                }
                LogEntry::Warning(message, None) => format!("warning: {}", message),
                LogEntry::Error(message, Some(location)) => {
                    format!("{}: error: {}", location, message)
                }
                LogEntry::Error(message, None) => format!("error: {}", message),
                LogEntry::StartSection(message) => {
                    out.push_str(&"  ".repeat(depth));
                    out.push_str(message);
                    out.push('\n');
                    depth += 1;
                    continue;
                }
                LogEntry::EndSection(message) => {
                    depth = depth.saturating_sub(1);
                    message.clone()
                }
            };
            out.push_str(&"  ".repeat(depth));
            out.push_str(&line);
            out.push('\n');
        }
        out
    }
}

impl TransformationLogger for CollectingLogger {
    fn log_message(&mut self, level: MessageType, message: &str) {
        self.entries.push(LogEntry::Message(level, message.to_string()));
    }

    fn log_warning(&mut self, message: &str, location: Option<&LogLocation>) {
        self.entries
            .push(LogEntry::Warning(message.to_string(), location.cloned()));
    }

    fn log_error(&mut self, message: &str, location: Option<&LogLocation>) {
        self.entries
            .push(LogEntry::Error(message.to_string(), location.cloned()));
    }

    fn start_section(&mut self, message: &str) {
        self.entries.push(LogEntry::StartSection(message.to_string()));
    }

    fn end_section(&mut self, message: &str) {
        self.entries.push(LogEntry::EndSection(message.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collecting_logger_text() {
        let mut logger = CollectingLogger::new();
        let location = LogLocation {
            file: "web.release.config".to_string(),
            line: 4,
            column: 6,
        };
        logger.start_section("Executing Remove on /configuration/a");
        logger.log_warning("nothing here", Some(&location));
        logger.end_section("Done executing Remove");
        logger.log_error("broken", None);
        logger.log_message(MessageType::Verbose, "finished");

        assert_eq!(
            logger.log_text(),
            "Executing Remove on /configuration/a\n\
             \x20 web.release.config(4,6): warning: nothing here\n\
             Done executing Remove\n\
             error: broken\n\
             finished\n"
        );
        assert_eq!(logger.errors().collect::<Vec<_>>(), vec!["broken"]);
        assert_eq!(logger.warnings().count(), 1);
    }

    #[test]
    fn test_default_sections_are_noops() {
        struct Quiet(usize);
        impl TransformationLogger for Quiet {
            fn log_message(&mut self, _: MessageType, _: &str) {
                self.0 += 1;
            }
            fn log_warning(&mut self, _: &str, _: Option<&LogLocation>) {}
            fn log_error(&mut self, _: &str, _: Option<&LogLocation>) {}
        }

        let mut quiet = Quiet(0);
        quiet.start_section("a");
        quiet.end_section("a");
        quiet.log_message(MessageType::Normal, "b");
        assert_eq!(quiet.0, 1);
    }
}
