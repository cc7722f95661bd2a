//! The append-only message log shown in the conversation view.

use bevy::prelude::*;

/// One entry in the conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageEntry {
    /// Text typed by the user or produced by the location announcer
    PlainText(String),
    /// Static map image, fetched lazily by the map preview
    MapReference { url: String },
}

impl MessageEntry {
    pub fn text(text: impl Into<String>) -> Self {
        Self::PlainText(text.into())
    }

    pub fn map(url: impl Into<String>) -> Self {
        Self::MapReference { url: url.into() }
    }

    /// URL of the map image, if this entry references one.
    pub fn map_url(&self) -> Option<&str> {
        match self {
            Self::MapReference { url } => Some(url),
            Self::PlainText(_) => None,
        }
    }
}

/// Ordered conversation log.
///
/// Entries can only be appended; display order is insertion order.
#[derive(Resource, Default, Debug)]
pub struct MessageLog {
    entries: Vec<MessageEntry>,
}

impl MessageLog {
    pub fn append(&mut self, entry: MessageEntry) {
        debug!("Appending message entry #{}: {:?}", self.entries.len(), entry);
        self.entries.push(entry);
    }

    pub fn extend(&mut self, entries: impl IntoIterator<Item = MessageEntry>) {
        for entry in entries {
            self.append(entry);
        }
    }

    pub fn entries(&self) -> &[MessageEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Map URLs in the log, in insertion order.
    pub fn map_urls(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().filter_map(MessageEntry::map_url)
    }
}
