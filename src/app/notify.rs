use crossbeam_channel::{Receiver, Sender};

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum NoticeKind {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub message: String,
    pub kind: NoticeKind,
}

/// Fire-and-forget sink for transient user messages. How long a message stays
/// visible is up to the sink.
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str, kind: NoticeKind);
}

/// Forwards notices to whoever holds the receiving end.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: Sender<Notice>,
}

impl ChannelNotifier {
    pub fn channel() -> (Self, Receiver<Notice>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (Self { tx }, rx)
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, message: &str, kind: NoticeKind) {
        let notice = Notice {
            message: message.to_owned(),
            kind,
        };
        if self.tx.send(notice).is_err() {
            tracing::debug!(message, "notice dropped, no receiver");
        }
    }
}

/// Prints notices to stderr for the command-line front end.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, message: &str, kind: NoticeKind) {
        match kind {
            NoticeKind::Info => tracing::info!(message, "notice"),
            NoticeKind::Error => tracing::warn!(message, "notice"),
        }
        eprintln!("[{kind}] {message}");
    }
}
