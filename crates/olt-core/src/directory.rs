// ── Subscriber profile directory ──
//
// The directory owns subscriber data and its own caching. This crate only
// reads it, once per request, and never assumes two reads agree.

use async_trait::async_trait;
use dashmap::DashMap;

use crate::error::DirectoryError;
use crate::model::SubscriberProfile;

/// Read-only lookup of subscriber profiles by key.
#[async_trait]
pub trait ProfileDirectory: Send + Sync {
    /// `Ok(None)` when the directory has no entry for `key`.
    async fn get(&self, key: &str) -> Result<Option<SubscriberProfile>, DirectoryError>;
}

/// In-memory directory, for embedding a fixed subscriber list or for
/// deployments where profiles are pushed in rather than fetched.
#[derive(Debug, Default)]
pub struct StaticProfileDirectory {
    entries: DashMap<String, SubscriberProfile>,
}

impl StaticProfileDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the entry keyed by `profile.id`.
    pub fn insert(&self, profile: SubscriberProfile) -> Option<SubscriberProfile> {
        self.entries.insert(profile.id.clone(), profile)
    }

    pub fn remove(&self, key: &str) -> Option<SubscriberProfile> {
        self.entries.remove(key).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<SubscriberProfile> for StaticProfileDirectory {
    fn from_iter<I: IntoIterator<Item = SubscriberProfile>>(iter: I) -> Self {
        let directory = Self::new();
        for profile in iter {
            directory.insert(profile);
        }
        directory
    }
}

#[async_trait]
impl ProfileDirectory for StaticProfileDirectory {
    async fn get(&self, key: &str) -> Result<Option<SubscriberProfile>, DirectoryError> {
        Ok(self.entries.get(key).map(|entry| entry.value().clone()))
    }
}
