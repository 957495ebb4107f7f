pub mod element;
pub mod jsonl;

pub use element::write_style_changes;
pub use jsonl::{CandidateSource, JsonLinesFeed};
