//! Hub state machine: latest [`EntityState`] per entity id.

use super::entity::EntityState;
use log::debug;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use tokio::sync::broadcast;

/// Capacity of the state-changed broadcast channel.
const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// Emitted whenever an entity's state is written or removed.
#[derive(Debug, Clone)]
pub struct StateChanged {
    pub entity_id: String,
    pub old_state: Option<EntityState>,
    /// `None` when the entity was removed.
    pub new_state: Option<EntityState>,
}

/// Thread-safe store of entity states.
pub struct StateMachine {
    states: RwLock<BTreeMap<String, EntityState>>,
    changes: broadcast::Sender<StateChanged>,
}

impl StateMachine {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            states: RwLock::new(BTreeMap::new()),
            changes,
        }
    }

    /// Store `state`, replacing any previous state for its entity id.
    ///
    /// A change event is emitted only when the content differs.
    pub fn set(&self, state: EntityState) {
        let entity_id = state.entity_id.clone();
        let old_state = self.states.write().insert(entity_id.clone(), state.clone());

        if old_state
            .as_ref()
            .is_some_and(|old| old.same_content(&state))
        {
            return;
        }

        debug!(
            "[Hub] {} -> {}",
            entity_id,
            state.state.as_deref().unwrap_or("unknown")
        );
        // No receivers is fine
        let _ = self.changes.send(StateChanged {
            entity_id,
            old_state,
            new_state: Some(state),
        });
    }

    pub fn get(&self, entity_id: &str) -> Option<EntityState> {
        self.states.read().get(entity_id).cloned()
    }

    pub fn contains(&self, entity_id: &str) -> bool {
        self.states.read().contains_key(entity_id)
    }

    pub fn remove(&self, entity_id: &str) -> Option<EntityState> {
        let old_state = self.states.write().remove(entity_id);
        if old_state.is_some() {
            let _ = self.changes.send(StateChanged {
                entity_id: entity_id.to_string(),
                old_state: old_state.clone(),
                new_state: None,
            });
        }
        old_state
    }

    /// All states ordered by entity id.
    pub fn all(&self) -> Vec<EntityState> {
        self.states.read().values().cloned().collect()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StateChanged> {
        self.changes.subscribe()
    }
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}
