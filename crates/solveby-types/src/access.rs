//! Authorization predicates
//!
//! Ownership and participation checks are expressed once per entity type by
//! implementing these traits, and applied uniformly by the API handlers.

use crate::JobRole;
use uuid::Uuid;

/// An entity with a single owning agent (services, requests, wallets...)
pub trait Owned {
    fn owner_id(&self) -> Uuid;

    fn is_owned_by(&self, agent_id: Uuid) -> bool {
        self.owner_id() == agent_id
    }
}

/// An entity shared between a client and a provider (jobs)
pub trait Participants {
    fn client_id(&self) -> Uuid;
    fn provider_id(&self) -> Uuid;

    /// Which side `agent_id` is on, if any
    fn role_of(&self, agent_id: Uuid) -> Option<JobRole> {
        if agent_id == self.client_id() {
            Some(JobRole::Client)
        } else if agent_id == self.provider_id() {
            Some(JobRole::Provider)
        } else {
            None
        }
    }

    fn is_participant(&self, agent_id: Uuid) -> bool {
        self.role_of(agent_id).is_some()
    }

    /// The other party relative to `agent_id`
    fn counterparty_of(&self, agent_id: Uuid) -> Option<Uuid> {
        match self.role_of(agent_id)? {
            JobRole::Client => Some(self.provider_id()),
            JobRole::Provider => Some(self.client_id()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Pair {
        client: Uuid,
        provider: Uuid,
    }

    impl Participants for Pair {
        fn client_id(&self) -> Uuid {
            self.client
        }
        fn provider_id(&self) -> Uuid {
            self.provider
        }
    }

    #[test]
    fn test_roles_and_counterparty() {
        let pair = Pair {
            client: Uuid::new_v4(),
            provider: Uuid::new_v4(),
        };
        let outsider = Uuid::new_v4();

        assert_eq!(pair.role_of(pair.client), Some(JobRole::Client));
        assert_eq!(pair.role_of(pair.provider), Some(JobRole::Provider));
        assert_eq!(pair.role_of(outsider), None);

        assert_eq!(pair.counterparty_of(pair.client), Some(pair.provider));
        assert_eq!(pair.counterparty_of(pair.provider), Some(pair.client));
        assert_eq!(pair.counterparty_of(outsider), None);
        assert!(!pair.is_participant(outsider));
    }
}
