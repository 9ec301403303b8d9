use std::fmt;
use std::sync::Arc;

/// Process-style outcome of a service, provider run or CLI command.
///
/// There is deliberately no partial-success variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    Success,
    Failure,
}

impl ExitStatus {
    /// Numeric process exit code (`0` / `1`).
    pub fn code(self) -> i32 {
        match self {
            ExitStatus::Success => 0,
            ExitStatus::Failure => 1,
        }
    }

    pub fn is_success(self) -> bool {
        matches!(self, ExitStatus::Success)
    }

    /// Fold several outcomes: `Success` only if every one succeeded.
    pub fn all<I: IntoIterator<Item = ExitStatus>>(statuses: I) -> ExitStatus {
        if statuses.into_iter().all(ExitStatus::is_success) {
            ExitStatus::Success
        } else {
            ExitStatus::Failure
        }
    }
}

impl From<bool> for ExitStatus {
    fn from(ok: bool) -> Self {
        if ok {
            ExitStatus::Success
        } else {
            ExitStatus::Failure
        }
    }
}

impl From<std::process::ExitStatus> for ExitStatus {
    fn from(status: std::process::ExitStatus) -> Self {
        status.success().into()
    }
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitStatus::Success => f.write_str("success"),
            ExitStatus::Failure => f.write_str("failure"),
        }
    }
}

/// User-facing message sink (console front-end, test recorder, ...).
pub type LogSink = Arc<dyn Fn(&str) + Send + Sync>;

/// Cloneable handle around an optional [`LogSink`].
///
/// A narrator without a sink is silent; every component must behave the same
/// whether or not one is attached.
#[derive(Clone, Default)]
pub struct Narrator {
    sink: Option<LogSink>,
}

impl Narrator {
    pub fn new(sink: LogSink) -> Self {
        Self { sink: Some(sink) }
    }

    pub fn silent() -> Self {
        Self { sink: None }
    }

    pub fn from_option(sink: Option<LogSink>) -> Self {
        Self { sink }
    }

    pub fn sink(&self) -> Option<LogSink> {
        self.sink.clone()
    }

    pub fn say(&self, message: impl AsRef<str>) {
        if let Some(sink) = &self.sink {
            sink(message.as_ref());
        }
    }

    pub fn warn(&self, message: impl AsRef<str>) {
        self.say(format!("Warning: {}", message.as_ref()));
    }

    pub fn error(&self, message: impl AsRef<str>) {
        self.say(format!("Error: {}", message.as_ref()));
    }

    /// Narrator whose messages are prefixed with `[label] `.
    pub fn prefixed(&self, label: &str) -> Narrator {
        match &self.sink {
            None => Narrator::silent(),
            Some(sink) => {
                let sink = Arc::clone(sink);
                let label = label.to_string();
                Narrator::new(Arc::new(move |msg: &str| sink(&format!("[{label}] {msg}"))))
            }
        }
    }
}

impl fmt::Debug for Narrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Narrator")
            .field("attached", &self.sink.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[test]
    fn aggregate_is_failure_if_any_failed() {
        assert_eq!(ExitStatus::all([]), ExitStatus::Success);
        assert_eq!(
            ExitStatus::all([ExitStatus::Success, ExitStatus::Failure]),
            ExitStatus::Failure
        );
        assert_eq!(ExitStatus::Failure.code(), 1);
    }

    #[test]
    fn prefixed_narrator_labels_messages() {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let sink_lines = Arc::clone(&lines);
        let narrator = Narrator::new(Arc::new(move |m: &str| {
            sink_lines.lock().unwrap().push(m.to_string())
        }));

        narrator.prefixed("tailwind").say("Done");
        Narrator::silent().prefixed("x").say("dropped");

        assert_eq!(*lines.lock().unwrap(), vec!["[tailwind] Done".to_string()]);
    }
}
