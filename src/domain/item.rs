use std::{
    fmt,
    sync::{Arc, Weak},
};

use serde::{Deserialize, Serialize};

/// Stable identity of an item, derived from its normalized text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub u32);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The host-side representation of a displayed item.
pub trait LiveElement: Send + Sync {
    fn key(&self) -> &str;
    fn set_opacity(&self, opacity: f32);
}

/// Non-owning reference to a live element. The host decides when the
/// element goes away; afterwards every suppression attempt reports detached.
#[derive(Clone)]
pub struct Handle(Weak<dyn LiveElement>);

impl Handle {
    pub fn from_arc<E: LiveElement + 'static>(element: &Arc<E>) -> Self {
        let weak: Weak<dyn LiveElement> = Arc::downgrade(element) as Weak<dyn LiveElement>;
        Self(weak)
    }

    pub fn is_attached(&self) -> bool {
        self.0.strong_count() > 0
    }

    /// Returns `false` when the element no longer exists.
    pub fn suppress(&self, opacity: f32) -> bool {
        match self.0.upgrade() {
            Some(element) => {
                element.set_opacity(opacity);
                true
            }
            None => false,
        }
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.upgrade() {
            Some(element) => write!(f, "Handle({})", element.key()),
            None => f.write_str("Handle(<detached>)"),
        }
    }
}

/// A raw observation before normalization and dedup.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub text: String,
    pub handle: Handle,
}

#[derive(Debug)]
pub struct Item {
    pub id: ItemId,
    pub text: String,
    pub handle: Handle,
}


#[cfg(test)]
mod tests {
    use super::{testing::RecordingElement, *};

    #[test]
    fn handle_detaches_when_host_drops_element() {
        let element = RecordingElement::new("p1");
        let handle = Handle::from_arc(&element);
        assert!(handle.is_attached());
        assert!(handle.suppress(0.1));
        assert_eq!(element.write_count(), 1);

        drop(element);
        assert!(!handle.is_attached());
        assert!(!handle.suppress(0.1));
        assert_eq!(format!("{handle:?}"), "Handle(<detached>)");
    }
}
