use serde::{Deserialize, Serialize};

use super::item::{Item, ItemId};

/// What leaves the process for each item: never the handle.
#[derive(Debug, Serialize)]
pub struct ReviewEntry<'a> {
    pub id: ItemId,
    pub text: &'a str,
}

impl<'a> From<&'a Item> for ReviewEntry<'a> {
    fn from(item: &'a Item) -> Self {
        Self {
            id: item.id,
            text: &item.text,
        }
    }
}

/// One flagged item as reported by the classifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub id: ItemId,
    pub topic: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueSnapshot {
    pub pending: usize,
    pub seen: usize,
}
