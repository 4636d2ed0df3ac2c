use serde::{Deserialize, Serialize};

/// Server-assigned message identifier.
///
/// Unique and immutable; also the tie-breaker when two messages share a
/// timestamp.
pub type MessageId = i64;

/// Stored-file metadata carried by file messages.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileRef {
    /// Original file name as uploaded.
    pub original_name: String,
    /// File size in bytes.
    pub file_size: u64,
    /// MIME content type, for example `image/png`.
    pub mime_type: String,
    /// Opaque object-store key used for downloads.
    pub storage_key: String,
}

/// Message payload variant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum MessageBody {
    /// Plain text message.
    Text {
        /// Message text.
        content: String,
    },
    /// File message referencing a stored object.
    File(FileRef),
}

/// One relayed message as observed by every device.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    /// Server-assigned identifier.
    pub id: MessageId,
    /// Originating device, opaque string.
    pub device_id: String,
    /// Creation instant in milliseconds since Unix epoch; primary sort key.
    pub timestamp_ms: i64,
    /// Text or file payload.
    pub body: MessageBody,
}

impl Message {
    /// Total-order key: ascending by `(timestamp, id)`.
    pub fn sort_key(&self) -> (i64, MessageId) {
        (self.timestamp_ms, self.id)
    }
}

/// One full, server-ordered fetch of the visible message window.
///
/// Always authoritative-but-partial: only the most recent window is visible,
/// and consecutive snapshots may shrink or shift. Construction sorts by
/// `(timestamp, id)` and deduplicates by id (the later entry wins), so
/// downstream consumers can rely on both properties.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    messages: Vec<Message>,
}

impl Snapshot {
    /// Build a snapshot from already-validated messages.
    pub fn from_messages(mut messages: Vec<Message>) -> Self {
        messages.sort_by_key(Message::sort_key);

        let mut deduped: Vec<Message> = Vec::with_capacity(messages.len());
        for message in messages {
            if let Some(existing) = deduped.iter_mut().find(|m| m.id == message.id) {
                *existing = message;
            } else {
                deduped.push(message);
            }
        }

        Self { messages: deduped }
    }

    /// Messages in display order.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// `(id, timestamp)` pairs used for cheap change detection.
    pub fn fingerprint(&self) -> Vec<(MessageId, i64)> {
        self.messages
            .iter()
            .map(|m| (m.id, m.timestamp_ms))
            .collect()
    }
}

/// Server-reported statistics after a destructive clear-all.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClearSummary {
    /// Messages deleted from the tabular store.
    pub deleted_messages: u64,
    /// File records deleted.
    pub deleted_files: u64,
    /// Total bytes released.
    pub deleted_file_size: u64,
    /// Objects removed from the object store.
    pub deleted_r2_files: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(id: MessageId, timestamp_ms: i64) -> Message {
        Message {
            id,
            device_id: "cli-test".to_owned(),
            timestamp_ms,
            body: MessageBody::Text {
                content: format!("m{id}"),
            },
        }
    }

    #[test]
    fn sorts_by_timestamp_then_id() {
        let snapshot =
            Snapshot::from_messages(vec![text(3, 200), text(2, 100), text(1, 100)]);
        let ids: Vec<_> = snapshot.messages().iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn dedupes_by_id_keeping_latest_entry() {
        let mut updated = text(1, 100);
        updated.body = MessageBody::Text {
            content: "updated".to_owned(),
        };
        let snapshot = Snapshot::from_messages(vec![text(1, 100), text(2, 150), updated]);

        assert_eq!(snapshot.len(), 2);
        assert_eq!(
            snapshot.messages()[0].body,
            MessageBody::Text {
                content: "updated".to_owned()
            }
        );
    }

    #[test]
    fn fingerprint_tracks_id_and_timestamp_pairs() {
        let snapshot = Snapshot::from_messages(vec![text(1, 100), text(2, 200)]);
        assert_eq!(snapshot.fingerprint(), vec![(1, 100), (2, 200)]);
    }
}
