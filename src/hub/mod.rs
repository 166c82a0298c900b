//! Minimal hub model the integration plugs into.
//!
//! Provides the collaborator pieces an entity platform needs: a named-signal
//! [`Dispatcher`], the [`Entity`] contract, an [`EntityPlatform`] that
//! attaches and detaches entities, and the [`StateMachine`] that receives
//! their state.

pub mod dispatcher;
pub mod entity;
pub mod platform;
pub mod state;

pub use dispatcher::{Dispatcher, Subscription};
pub use entity::{AttachContext, Attributes, DeviceInfo, Entity, EntityState, StateWriter};
pub use platform::EntityPlatform;
pub use state::{StateChanged, StateMachine};

use serde::{Deserialize, Serialize};

/// Entity domain for sensors.
pub const SENSOR_DOMAIN: &str = "sensor";

/// A configured instance of an integration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigEntry {
    pub entry_id: String,
    pub domain: String,
    pub title: String,
}

impl ConfigEntry {
    pub fn new(
        entry_id: impl Into<String>,
        domain: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            entry_id: entry_id.into(),
            domain: domain.into(),
            title: title.into(),
        }
    }
}

/// Lowercase `text` and join its alphanumeric runs with `_`.
///
/// `"Tim's iPhone level"` becomes `"tim_s_iphone_level"`. Empty input
/// yields `"unnamed"`.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    for c in text.chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            slug.push(c);
        } else if !slug.is_empty() && !slug.ends_with('_') {
            slug.push('_');
        }
    }
    while slug.ends_with('_') {
        slug.pop();
    }

    if slug.is_empty() {
        "unnamed".to_string()
    } else {
        slug
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Tim's iPhone level"), "tim_s_iphone_level");
        assert_eq!(slugify("  iPad -- state  "), "ipad_state");
        assert_eq!(slugify("Ärger"), "ärger");
        assert_eq!(slugify("!!!"), "unnamed");
    }
}
