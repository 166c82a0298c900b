//! Entity platform: registers an integration's entities with the hub.

use super::dispatcher::Subscription;
use super::entity::{AttachContext, Entity, StateWriter};
use super::slugify;
use super::state::StateMachine;
use crate::error::{IosError, Result};
use log::{info, warn};
use std::collections::HashSet;
use std::sync::Arc;

struct AttachedEntity {
    entity_id: String,
    entity: Arc<dyn Entity>,
    /// Released when the entity is removed.
    subscriptions: Vec<Subscription>,
}

/// Entities of one integration on one entity domain (e.g. `ios` sensors).
pub struct EntityPlatform {
    /// Entity domain, used as the entity id prefix (`sensor`).
    domain: String,
    /// Integration that owns the entities (`ios`).
    platform_name: String,
    states: Arc<StateMachine>,
    entities: Vec<AttachedEntity>,
}

impl EntityPlatform {
    pub fn new(
        domain: impl Into<String>,
        platform_name: impl Into<String>,
        states: Arc<StateMachine>,
    ) -> Self {
        Self {
            domain: domain.into(),
            platform_name: platform_name.into(),
            states,
            entities: Vec::new(),
        }
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn platform_name(&self) -> &str {
        &self.platform_name
    }

    /// Register and attach `entities`.
    ///
    /// With `update_before_add`, each entity's [`Entity::update`] runs
    /// before it is attached. Entities whose unique id is already
    /// registered are skipped. If any entity fails to attach, the entities
    /// this call already attached are removed again before the error is
    /// returned.
    pub async fn add_entities(
        &mut self,
        entities: Vec<Arc<dyn Entity>>,
        update_before_add: bool,
    ) -> Result<()> {
        let first_new = self.entities.len();
        let mut unique_ids: HashSet<String> = self
            .entities
            .iter()
            .map(|e| e.entity.unique_id().to_string())
            .collect();

        for entity in entities {
            if !unique_ids.insert(entity.unique_id().to_string()) {
                warn!(
                    "[Hub] Platform {} does not generate unique IDs. ID {} already exists - ignoring {}.{}",
                    self.platform_name,
                    entity.unique_id(),
                    self.domain,
                    slugify(entity.name())
                );
                continue;
            }

            if update_before_add {
                entity.update().await;
            }

            let entity_id = self.generate_entity_id(entity.name());
            let writer = StateWriter::new(entity_id.clone(), self.states.clone());
            let mut ctx = AttachContext::new(writer.clone());
            if let Err(e) = entity.clone().added_to_hub(&mut ctx).await {
                warn!(
                    "[Hub] Failed to add {} from {}: {}",
                    entity.unique_id(),
                    self.platform_name,
                    e
                );
                drop(ctx);
                self.remove_from(first_new).await;
                return Err(IosError::EntitySetup {
                    unique_id: entity.unique_id().to_string(),
                    reason: e.to_string(),
                });
            }
            writer.write(entity.as_ref());

            info!(
                "[Hub] Added {} ({}) from {}",
                entity_id,
                entity.unique_id(),
                self.platform_name
            );
            self.entities.push(AttachedEntity {
                entity_id,
                entity,
                subscriptions: ctx.into_subscriptions(),
            });
        }

        Ok(())
    }

    /// Detach every entity and drop its state.
    pub async fn unload(&mut self) {
        self.remove_from(0).await;
    }

    async fn remove_from(&mut self, first: usize) {
        for attached in self.entities.drain(first..) {
            attached.entity.will_remove_from_hub().await;
            drop(attached.subscriptions);
            self.states.remove(&attached.entity_id);
            info!("[Hub] Removed {}", attached.entity_id);
        }
    }

    /// Entity ids in registration order.
    pub fn entity_ids(&self) -> Vec<String> {
        self.entities.iter().map(|e| e.entity_id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Entity id registered for `unique_id`, if any.
    pub fn entity_id_for(&self, unique_id: &str) -> Option<&str> {
        self.entities
            .iter()
            .find(|e| e.entity.unique_id() == unique_id)
            .map(|e| e.entity_id.as_str())
    }

    fn generate_entity_id(&self, name: &str) -> String {
        let base = format!("{}.{}", self.domain, slugify(name));
        let taken = |candidate: &str| {
            self.states.contains(candidate)
                || self.entities.iter().any(|e| e.entity_id == candidate)
        };

        if !taken(&base) {
            return base;
        }
        let mut n = 2;
        loop {
            let candidate = format!("{base}_{n}");
            if !taken(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }
}
