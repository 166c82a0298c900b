//! Entity capability contract between integrations and the hub.
//!
//! Integrations implement [`Entity`]; the hub's [`EntityPlatform`] attaches
//! them, captures their state into [`EntityState`] snapshots and detaches
//! them on unload.
//!
//! [`EntityPlatform`]: super::EntityPlatform

use super::dispatcher::Subscription;
use super::state::StateMachine;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Extra attributes exposed alongside the state value.
pub type Attributes = BTreeMap<String, serde_json::Value>;

/// Metadata linking an entity to the physical device it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// `(domain, identifier)` pairs identifying the device.
    pub identifiers: BTreeSet<(String, String)>,
    pub name: String,
    pub manufacturer: String,
    pub model: String,
    pub sw_version: String,
}

/// Snapshot of an entity as last written to the hub.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityState {
    pub entity_id: String,
    pub unique_id: String,
    pub name: String,
    /// Rendered state value; `None` until the entity has one.
    pub state: Option<String>,
    pub icon: Option<String>,
    pub unit_of_measurement: Option<String>,
    pub device_info: Option<DeviceInfo>,
    pub attributes: Attributes,
    pub last_updated: DateTime<Utc>,
}

impl EntityState {
    /// Capture the current state of `entity` under `entity_id`.
    pub fn capture(entity_id: &str, entity: &dyn Entity) -> Self {
        Self {
            entity_id: entity_id.to_string(),
            unique_id: entity.unique_id().to_string(),
            name: entity.name().to_string(),
            state: entity.state(),
            icon: entity.icon(),
            unit_of_measurement: entity.unit_of_measurement().map(str::to_string),
            device_info: entity.device_info(),
            attributes: entity.extra_state_attributes(),
            last_updated: Utc::now(),
        }
    }

    /// True when everything but the timestamp matches.
    pub fn same_content(&self, other: &EntityState) -> bool {
        self.entity_id == other.entity_id
            && self.state == other.state
            && self.icon == other.icon
            && self.unit_of_measurement == other.unit_of_measurement
            && self.device_info == other.device_info
            && self.attributes == other.attributes
    }
}

/// Handle an attached entity uses to push its state back to the hub.
#[derive(Clone)]
pub struct StateWriter {
    entity_id: String,
    states: Arc<StateMachine>,
}

impl StateWriter {
    pub(crate) fn new(entity_id: impl Into<String>, states: Arc<StateMachine>) -> Self {
        Self {
            entity_id: entity_id.into(),
            states,
        }
    }

    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }

    /// Capture `entity` and store the snapshot in the state machine.
    pub fn write(&self, entity: &dyn Entity) {
        self.states
            .set(EntityState::capture(&self.entity_id, entity));
    }
}

/// Context handed to [`Entity::added_to_hub`].
///
/// Subscriptions registered with [`AttachContext::on_remove`] are held by
/// the platform and released when the entity is removed.
pub struct AttachContext {
    writer: StateWriter,
    subscriptions: Vec<Subscription>,
}

impl AttachContext {
    pub(crate) fn new(writer: StateWriter) -> Self {
        Self {
            writer,
            subscriptions: Vec::new(),
        }
    }

    pub fn entity_id(&self) -> &str {
        self.writer.entity_id()
    }

    /// Writer for pushing state from callbacks.
    pub fn state_writer(&self) -> StateWriter {
        self.writer.clone()
    }

    /// Keep `subscription` alive until the entity is removed.
    pub fn on_remove(&mut self, subscription: Subscription) {
        self.subscriptions.push(subscription);
    }

    pub(crate) fn into_subscriptions(self) -> Vec<Subscription> {
        self.subscriptions
    }
}

/// Capabilities an integration's entity exposes to the hub.
#[async_trait]
pub trait Entity: Send + Sync + 'static {
    /// Stable identifier, unique across the integration.
    fn unique_id(&self) -> &str;

    /// Display name.
    fn name(&self) -> &str;

    fn device_info(&self) -> Option<DeviceInfo> {
        None
    }

    fn extra_state_attributes(&self) -> Attributes {
        Attributes::new()
    }

    fn icon(&self) -> Option<String> {
        None
    }

    /// Current rendered state value.
    fn state(&self) -> Option<String>;

    fn unit_of_measurement(&self) -> Option<&str> {
        None
    }

    /// Whether the hub must poll [`Entity::update`] for new state.
    fn should_poll(&self) -> bool {
        true
    }

    /// Refresh state from the source. Push-driven entities leave this empty.
    async fn update(&self) {}

    /// Called once when the entity is attached to the hub.
    async fn added_to_hub(self: Arc<Self>, _ctx: &mut AttachContext) -> crate::error::Result<()> {
        Ok(())
    }

    /// Called once before the entity is detached.
    async fn will_remove_from_hub(&self) {}
}
