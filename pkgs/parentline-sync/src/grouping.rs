//! Broadcast grouping
//!
//! A school broadcast arrives as one row per recipient. Rows of the same
//! student that share title, content and send time are shown as one item.

use std::collections::HashMap;

use chrono::{DateTime, SecondsFormat, Utc};
use parentline_store::LocalMessage;

/// Separates key fields so `("ab", "c")` and `("a", "bc")` differ
const KEY_SEPARATOR: char = '\u{1f}';

#[derive(Debug, Clone, PartialEq)]
pub struct MessageGroup {
    pub key: String,
    pub messages: Vec<LocalMessage>,
}

impl MessageGroup {
    /// Row shown for the group
    pub fn representative(&self) -> Option<&LocalMessage> {
        self.messages.first()
    }

    pub fn ids(&self) -> Vec<i64> {
        self.messages.iter().map(|m| m.id).collect()
    }

    /// Read state of the group follows its first member
    pub fn is_unread(&self) -> bool {
        self.messages
            .first()
            .is_some_and(|m| !m.read_status.is_read())
    }

    pub fn unread_count(&self) -> usize {
        self.messages
            .iter()
            .filter(|m| !m.read_status.is_read())
            .count()
    }
}

pub fn group_key(title: &str, content: &str, sent_time: DateTime<Utc>) -> String {
    format!(
        "{title}{sep}{content}{sep}{time}",
        sep = KEY_SEPARATOR,
        time = sent_time.to_rfc3339_opts(SecondsFormat::Millis, true)
    )
}

/// Group a page of rows, keeping the order of first appearance
pub fn group_messages(messages: Vec<LocalMessage>) -> Vec<MessageGroup> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<MessageGroup> = Vec::new();

    for message in messages {
        let key = group_key(&message.title, &message.content, message.sent_time);
        match index.get(&key) {
            Some(&at) => groups[at].messages.push(message),
            None => {
                index.insert(key.clone(), groups.len());
                groups.push(MessageGroup {
                    key,
                    messages: vec![message],
                });
            }
        }
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use parentline_store::{Priority, ReadStatus, SentStatus};

    fn row(id: i64, title: &str, content: &str, sent_time: DateTime<Utc>) -> LocalMessage {
        LocalMessage {
            id,
            title: title.to_string(),
            content: content.to_string(),
            priority: Priority::Medium,
            group_name: None,
            edited_at: None,
            images: vec![],
            sent_time,
            viewed_at: None,
            read_status: ReadStatus::Unread,
            student_id: 7,
            student_number: "S-7".to_string(),
            read_time: None,
            sent_status: SentStatus::Pending,
        }
    }

    #[test]
    fn test_key_is_deterministic() {
        let t = Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap();
        assert_eq!(group_key("Trip", "Bring lunch", t), group_key("Trip", "Bring lunch", t));
        assert!(group_key("Trip", "Bring lunch", t).ends_with("2025-03-01T08:00:00.000Z"));
    }

    #[test]
    fn test_key_distinguishes_each_field() {
        let t = Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap();
        let base = group_key("Trip", "Bring lunch", t);
        assert_ne!(base, group_key("Trip!", "Bring lunch", t));
        assert_ne!(base, group_key("Trip", "Bring lunch.", t));
        assert_ne!(base, group_key("Trip", "Bring lunch", t + Duration::milliseconds(1)));
        assert_ne!(group_key("ab", "c", t), group_key("a", "bc", t));
    }

    #[test]
    fn test_group_messages_keeps_order() {
        let t = Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap();
        let groups = group_messages(vec![
            row(3, "Trip", "Bring lunch", t),
            row(2, "Fees", "Due Friday", t - Duration::hours(1)),
            row(1, "Trip", "Bring lunch", t),
        ]);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].ids(), vec![3, 1]);
        assert_eq!(groups[0].representative().map(|m| m.id), Some(3));
        assert_eq!(groups[1].ids(), vec![2]);
        assert!(groups[0].is_unread());
    }

    #[test]
    fn test_group_state_follows_first_member() {
        let t = Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap();
        let mut first = row(1, "Trip", "Bring lunch", t);
        first.read_status = ReadStatus::Read;
        let groups = group_messages(vec![first, row(2, "Trip", "Bring lunch", t)]);

        assert_eq!(groups.len(), 1);
        assert!(!groups[0].is_unread());
        assert_eq!(groups[0].unread_count(), 1);

        let mut second = row(2, "Trip", "Bring lunch", t);
        second.read_status = ReadStatus::Read;
        let groups = group_messages(vec![row(1, "Trip", "Bring lunch", t), second]);
        assert!(groups[0].is_unread());
        assert_eq!(groups[0].unread_count(), 1);
    }
}
