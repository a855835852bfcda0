//! The entity cache: one ordered list per entity kind, keyed by `id`.

use serde::{Deserialize, Serialize};

use crate::domain::{
    Bid, BidInvitation, Client, Consultation, Conversation, Dispute, Entity, EntityKind,
    Freelancer, Message, Milestone, Notification, Payment, Project,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntityCache {
    pub projects: Vec<Project>,
    pub milestones: Vec<Milestone>,
    pub bids: Vec<Bid>,
    pub bid_invitations: Vec<BidInvitation>,
    pub consultations: Vec<Consultation>,
    pub payments: Vec<Payment>,
    pub disputes: Vec<Dispute>,
    pub messages: Vec<Message>,
    pub conversations: Vec<Conversation>,
    pub notifications: Vec<Notification>,
    pub freelancers: Vec<Freelancer>,
    pub clients: Vec<Client>,
}

/// Maps an entity type onto its list inside [`EntityCache`].
pub trait Cached: Entity {
    fn slot(cache: &EntityCache) -> &Vec<Self>;
    fn slot_mut(cache: &mut EntityCache) -> &mut Vec<Self>;
}

macro_rules! cached {
    ($ty:ty, $field:ident) => {
        impl Cached for $ty {
            fn slot(cache: &EntityCache) -> &Vec<Self> {
                &cache.$field
            }

            fn slot_mut(cache: &mut EntityCache) -> &mut Vec<Self> {
                &mut cache.$field
            }
        }
    };
}

cached!(Project, projects);
cached!(Milestone, milestones);
cached!(Bid, bids);
cached!(BidInvitation, bid_invitations);
cached!(Consultation, consultations);
cached!(Payment, payments);
cached!(Dispute, disputes);
cached!(Message, messages);
cached!(Conversation, conversations);
cached!(Notification, notifications);
cached!(Freelancer, freelancers);
cached!(Client, clients);

impl EntityCache {
    pub fn all<T: Cached>(&self) -> &[T] {
        T::slot(self)
    }

    pub fn find<T: Cached>(&self, id: &str) -> Option<&T> {
        T::slot(self).iter().find(|e| e.id() == id)
    }

    /// Replace the entity with the same id in place, or append it.
    pub fn upsert<T: Cached>(&mut self, entity: T) {
        let slot = T::slot_mut(self);
        match slot.iter_mut().find(|e| e.id() == entity.id()) {
            Some(existing) => *existing = entity,
            None => slot.push(entity),
        }
    }

    pub fn remove<T: Cached>(&mut self, id: &str) -> Option<T> {
        let slot = T::slot_mut(self);
        let index = slot.iter().position(|e| e.id() == id)?;
        Some(slot.remove(index))
    }

    pub fn replace_all<T: Cached>(&mut self, entities: Vec<T>) {
        *T::slot_mut(self) = entities;
    }

    pub fn len_of(&self, kind: EntityKind) -> usize {
        match kind {
            EntityKind::Project => self.projects.len(),
            EntityKind::Milestone => self.milestones.len(),
            EntityKind::Bid => self.bids.len(),
            EntityKind::BidInvitation => self.bid_invitations.len(),
            EntityKind::Consultation => self.consultations.len(),
            EntityKind::Payment => self.payments.len(),
            EntityKind::Dispute => self.disputes.len(),
            EntityKind::Message => self.messages.len(),
            EntityKind::Conversation => self.conversations.len(),
            EntityKind::Notification => self.notifications.len(),
            EntityKind::Freelancer => self.freelancers.len(),
            EntityKind::Client => self.clients.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Freelancer, ProjectStatus};

    fn freelancer(id: &str, name: &str) -> Freelancer {
        Freelancer {
            id: id.into(),
            name: name.into(),
            email: None,
            skills: vec!["rust".into()],
            hourly_rate: Some(9_000),
            rating: Some(4.8),
            vetted: true,
        }
    }

    #[test]
    fn upsert_replaces_in_place_and_appends_new() {
        let mut cache = EntityCache::default();
        cache.upsert(freelancer("f1", "Ada"));
        cache.upsert(freelancer("f2", "Grace"));
        cache.upsert(freelancer("f1", "Ada L."));

        let names: Vec<_> = cache.all::<Freelancer>().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Ada L.", "Grace"]);
        assert_eq!(cache.len_of(EntityKind::Freelancer), 2);
    }

    #[test]
    fn remove_returns_the_entity() {
        let mut cache = EntityCache::default();
        cache.upsert(freelancer("f1", "Ada"));

        assert_eq!(cache.remove::<Freelancer>("f1").map(|f| f.name), Some("Ada".into()));
        assert!(cache.remove::<Freelancer>("f1").is_none());
        assert!(cache.find::<Freelancer>("f1").is_none());
    }

    #[test]
    fn json_round_trip_is_identical() {
        let mut cache = EntityCache::default();
        cache.upsert(freelancer("f1", "Ada"));
        cache.upsert(
            serde_json::from_value::<Project>(serde_json::json!({
                "id": "p1",
                "client_id": "c1",
                "title": "Portal",
                "client_budget": 100000,
                "status": "open",
                "deadline": "2026-12-01T00:00:00Z"
            }))
            .unwrap(),
        );

        let json = serde_json::to_string(&cache).unwrap();
        let restored: EntityCache = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, cache);
        assert_eq!(restored.projects[0].status, ProjectStatus::Open);
    }

    #[test]
    fn missing_kinds_default_to_empty() {
        let cache: EntityCache = serde_json::from_str(r#"{ "projects": [] }"#).unwrap();
        assert_eq!(cache, EntityCache::default());
    }
}
