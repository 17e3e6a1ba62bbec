use std::time::Duration;

use tokio::time::Instant;

pub const DEFAULT_SUCCESS_TTL: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    /// `None` means the banner stays until dismissed.
    pub expires_at: Option<Instant>,
}

impl Notice {
    pub fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| now >= deadline)
    }
}

/// Single inline banner slot for a screen. Success banners clear themselves;
/// error banners stay until dismissed or replaced.
#[derive(Debug, Default)]
pub struct NoticeBoard {
    current: Option<Notice>,
}

impl NoticeBoard {
    pub fn success(&mut self, message: impl Into<String>, ttl: Duration) {
        self.current = Some(Notice {
            level: NoticeLevel::Success,
            message: message.into(),
            expires_at: Some(Instant::now() + ttl),
        });
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.current = Some(Notice {
            level: NoticeLevel::Error,
            message: message.into(),
            expires_at: None,
        });
    }

    pub fn dismiss(&mut self) {
        self.current = None;
    }

    pub fn current(&self) -> Option<&Notice> {
        self.current
            .as_ref()
            .filter(|notice| !notice.is_expired(Instant::now()))
    }

    pub fn has_error(&self) -> bool {
        self.current()
            .is_some_and(|notice| notice.level == NoticeLevel::Error)
    }
}
