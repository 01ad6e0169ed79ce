// ── Subscriber profile resolution ──
//
// Derives the directory key from port metadata and fetches the profile.
// The directory is queried on every call; two reads may disagree.

use std::sync::Arc;

use tracing::debug;

use crate::directory::ProfileDirectory;
use crate::error::ResolveError;
use crate::model::{AttachmentPoint, Port, SubscriberIdentity, SubscriberProfile, VlanPair};
use crate::validator::ValidatedPort;

/// A complete profile together with the key it was found under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSubscriber {
    pub key: String,
    pub profile: SubscriberProfile,
    pub vlans: VlanPair,
}

pub struct SubscriberProfileResolver {
    directory: Arc<dyn ProfileDirectory>,
    key_annotation: String,
}

impl SubscriberProfileResolver {
    pub fn new(directory: Arc<dyn ProfileDirectory>, key_annotation: impl Into<String>) -> Self {
        Self {
            directory,
            key_annotation: key_annotation.into(),
        }
    }

    /// The port annotation whose value is the directory key.
    pub fn key_annotation(&self) -> &str {
        &self.key_annotation
    }

    /// The directory key for a port, if the port carries one.
    pub fn subscriber_key<'a>(&self, port: &'a Port) -> Option<&'a str> {
        port.annotations.value(&self.key_annotation)
    }

    pub async fn resolve(
        &self,
        validated: &ValidatedPort,
    ) -> Result<ResolvedSubscriber, ResolveError> {
        let key = self.subscriber_key(&validated.port).ok_or_else(|| {
            ResolveError::MissingSubscriberKey {
                attachment_point: validated.attachment_point.clone(),
                annotation: self.key_annotation.clone(),
            }
        })?;

        let mut profile = self.fetch(key).await?;

        if let Some(field) = profile.missing_field() {
            return Err(ResolveError::IncompleteProfile {
                key: key.to_owned(),
                field,
            });
        }
        let Some(vlans) = profile.vlan_pair() else {
            return Err(ResolveError::IncompleteProfile {
                key: key.to_owned(),
                field: "c_tag",
            });
        };

        if profile.hardware_identifier.is_none() {
            profile.hardware_identifier = validated.hardware_identifier();
        }

        debug!(
            attachment_point = %validated.attachment_point,
            key,
            %vlans,
            "resolved subscriber profile"
        );
        Ok(ResolvedSubscriber {
            key: key.to_owned(),
            profile,
            vlans,
        })
    }

    /// Find the enabled port a subscriber is attached to.
    ///
    /// The identity must exist in the directory. `candidates` is every
    /// port on every access device; the first enabled one whose key
    /// annotation equals the identity wins.
    pub async fn locate<I>(
        &self,
        identity: &SubscriberIdentity,
        candidates: I,
    ) -> Result<AttachmentPoint, ResolveError>
    where
        I: IntoIterator<Item = (AttachmentPoint, Port)>,
    {
        self.fetch(identity.as_str()).await?;

        candidates
            .into_iter()
            .find(|(_, port)| {
                port.enabled && self.subscriber_key(port) == Some(identity.as_str())
            })
            .map(|(ap, _)| ap)
            .ok_or_else(|| ResolveError::NotLocated {
                identity: identity.clone(),
            })
    }

    async fn fetch(&self, key: &str) -> Result<SubscriberProfile, ResolveError> {
        self.directory
            .get(key)
            .await?
            .ok_or_else(|| ResolveError::ProfileNotFound {
                key: key.to_owned(),
            })
    }
}
