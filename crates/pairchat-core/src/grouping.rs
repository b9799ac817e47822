//! Display grouping for the chat log
//!
//! Two passes over the append-ordered log: consecutive messages from one sender that are
//! close in time collapse into a [`MessageGroup`], then day separators are interleaved
//! wherever the calendar day changes. Both passes are pure; labels depend on the `now`
//! supplied at call time.

use core::fmt;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use crate::message::ChatMessage;
use crate::types::{Timestamp, UserId};

// ----------------------------------------------------------------------------
// Message Groups
// ----------------------------------------------------------------------------

/// Maximal run of log-adjacent messages from one sender
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageGroup {
    pub sender: UserId,
    pub messages: Vec<ChatMessage>,
    pub group_start: Timestamp,
    pub group_end: Timestamp,
}

impl MessageGroup {
    fn start(message: &ChatMessage) -> Self {
        Self {
            sender: message.sender.clone(),
            messages: vec![message.clone()],
            group_start: message.sent_at,
            group_end: message.sent_at,
        }
    }

    fn accepts(&self, message: &ChatMessage, threshold_ms: u64) -> bool {
        self.sender == message.sender && message.sent_at - self.group_end <= threshold_ms
    }

    fn push(&mut self, message: &ChatMessage) {
        self.group_end = message.sent_at;
        self.messages.push(message.clone());
    }

    pub fn is_system(&self) -> bool {
        self.sender.is_system()
    }
}

/// Partition the log into sender/time runs
pub fn group_messages(log: &[ChatMessage], threshold_ms: u64) -> Vec<MessageGroup> {
    let mut groups: Vec<MessageGroup> = Vec::new();

    for message in log {
        match groups.last_mut() {
            Some(current) if current.accepts(message, threshold_ms) => current.push(message),
            _ => groups.push(MessageGroup::start(message)),
        }
    }

    groups
}

// ----------------------------------------------------------------------------
// Day Buckets
// ----------------------------------------------------------------------------

/// One renderable transcript row
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptItem {
    DaySeparator(String),
    Group(MessageGroup),
}

/// Interleave day separators before the first group of each calendar day
pub fn build_transcript<Tz>(groups: Vec<MessageGroup>, now: Timestamp, tz: &Tz) -> Vec<TranscriptItem>
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    let mut items = Vec::with_capacity(groups.len() * 2);
    let mut current_day: Option<NaiveDate> = None;

    for group in groups {
        let day = local_time(group.group_start, tz).date_naive();
        if current_day != Some(day) {
            current_day = Some(day);
            items.push(TranscriptItem::DaySeparator(day_label(
                group.group_start,
                now,
                tz,
            )));
        }
        items.push(TranscriptItem::Group(group));
    }

    items
}

/// `"Today"`, `"Yesterday"` or a short month/day such as `"Oct 17"`
pub fn day_label<Tz>(ts: Timestamp, now: Timestamp, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    let local = local_time(ts, tz);
    let day = local.date_naive();
    let today = local_time(now, tz).date_naive();

    if day == today {
        "Today".to_string()
    } else if today.pred_opt() == Some(day) {
        "Yesterday".to_string()
    } else {
        local.format("%b %-d").to_string()
    }
}

/// 24-hour `HH:MM` clock time
pub fn format_clock<Tz>(ts: Timestamp, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    local_time(ts, tz).format("%H:%M").to_string()
}

fn local_time<Tz: TimeZone>(ts: Timestamp, tz: &Tz) -> DateTime<Tz> {
    let millis = i64::try_from(ts.as_millis()).unwrap_or(i64::MAX);
    Utc.timestamp_millis_opt(millis)
        .single()
        .unwrap_or_default()
        .with_timezone(tz)
}
