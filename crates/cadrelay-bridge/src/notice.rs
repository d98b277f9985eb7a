//! Operator notices
//!
//! Drivers report every outcome through a [`Notifier`]. The CLI prints them;
//! an embedding host would show a blocking message box.

/// Receives operator-facing notices
pub trait Notifier {
    fn notify(&mut self, title: &str, message: &str);
}

impl<F> Notifier for F
where
    F: FnMut(&str, &str),
{
    fn notify(&mut self, title: &str, message: &str) {
        self(title, message);
    }
}

/// A notice kept for later inspection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub message: String,
}

/// Notifier that records notices instead of showing them
#[derive(Debug, Clone, Default)]
pub struct NoticeLog {
    notices: Vec<Notice>,
}

impl NoticeLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    /// Message of the most recent notice
    pub fn last_message(&self) -> Option<&str> {
        self.notices.last().map(|n| n.message.as_str())
    }
}

impl Notifier for NoticeLog {
    fn notify(&mut self, title: &str, message: &str) {
        self.notices.push(Notice {
            title: title.to_string(),
            message: message.to_string(),
        });
    }
}
