use chrono::{DateTime, TimeZone, Utc};

/// Date and time labels shown on an entry card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryTimestamp {
    pub date: String,
    pub time: String,
}

impl EntryTimestamp {
    pub fn of<Tz>(created_at: DateTime<Utc>, tz: &Tz) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        let local = created_at.with_timezone(tz);
        Self {
            date: local.format("%b %-d, %Y").to_string(),
            time: local.format("%-I:%M %p").to_string(),
        }
    }
}
