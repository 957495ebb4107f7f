pub mod identity;
pub mod item;
pub mod types;

pub use identity::{hash_text, normalize_text};
pub use item::{Candidate, Handle, Item, ItemId, LiveElement};
pub use types::{QueueSnapshot, ReviewEntry, Verdict};
