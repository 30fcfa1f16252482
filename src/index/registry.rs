//! Page-scoped registry of implementor listings keyed by capability.
//!
//! Producers (script loaders) call `register` once per capability file;
//! renderers call `consumer_ready` for the capability page they draw. Each
//! capability owns an independent rendezvous, so data for one trait is never
//! delivered to another trait's consumer. The lookup table is append-only.

use crate::index::identity::{CapabilityName, PackageName, TypePath};
use crate::index::model::{Capability, ImplementorRecord, PackageGroups};
use crate::rendezvous::{Consumer, Merge, Phase, Rendezvous, RendezvousError};
use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Version tag written into and required from snapshot files.
pub const SNAPSHOT_SCHEMA_VERSION: &str = "implementor_snapshot_v1";

#[derive(Debug)]
struct CapabilityEntry {
    capability: Capability,
    groups: PackageGroups,
    rendezvous: Rendezvous<PackageGroups>,
    registrations: usize,
}

impl CapabilityEntry {
    fn new(name: CapabilityName) -> Self {
        Self {
            capability: Capability::new(name),
            groups: PackageGroups::new(),
            rendezvous: Rendezvous::new(),
            registrations: 0,
        }
    }
}

#[derive(Debug, Default)]
/// Capability name to implementor listing, plus the hand-off to renderers.
pub struct ImplementorIndex {
    entries: BTreeMap<CapabilityName, CapabilityEntry>,
}

impl ImplementorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one capability file's groups into the index.
    ///
    /// If a consumer already waits on this capability it receives `groups`
    /// before this call returns; otherwise the groups are buffered for it.
    pub fn register(&mut self, capability: CapabilityName, groups: PackageGroups) {
        debug!(
            capability = %capability,
            packages = groups.len(),
            records = groups.record_count(),
            "registering implementors"
        );
        let entry = self
            .entries
            .entry(capability.clone())
            .or_insert_with(|| CapabilityEntry::new(capability));
        entry.registrations += 1;
        entry.capability.observe(&groups);
        entry.groups.merge(groups.clone());
        entry.rendezvous.register(groups);
    }

    /// Attach the renderer for one capability.
    pub fn consumer_ready(
        &mut self,
        capability: CapabilityName,
        consumer: Consumer<PackageGroups>,
    ) -> Result<(), RendezvousError> {
        debug!(capability = %capability, "consumer ready");
        self.entries
            .entry(capability.clone())
            .or_insert_with(|| CapabilityEntry::new(capability))
            .rendezvous
            .consumer_ready(consumer)
    }

    /// Hand-off progress for a capability; untouched capabilities are `Empty`.
    pub fn phase(&self, capability: &CapabilityName) -> Phase {
        self.entries
            .get(capability)
            .map(|entry| entry.rendezvous.phase())
            .unwrap_or(Phase::Empty)
    }

    /// Everything registered for a capability so far, in registration order.
    ///
    /// `None` means nothing was ever registered for it.
    pub fn implementors(&self, capability: &CapabilityName) -> Option<&PackageGroups> {
        self.entries
            .get(capability)
            .filter(|entry| entry.registrations > 0)
            .map(|entry| &entry.groups)
    }

    pub fn capability(&self, name: &CapabilityName) -> Option<&Capability> {
        self.entries
            .get(name)
            .filter(|entry| entry.registrations > 0)
            .map(|entry| &entry.capability)
    }

    /// Registered capabilities in stable (sorted) order.
    pub fn capabilities(&self) -> impl Iterator<Item = &Capability> {
        self.entries
            .values()
            .filter(|entry| entry.registrations > 0)
            .map(|entry| &entry.capability)
    }

    /// Every capability a type implements, with the row that says so.
    pub fn implementations_of_type<'a>(
        &'a self,
        path: &'a TypePath,
    ) -> impl Iterator<Item = (&'a CapabilityName, &'a PackageName, &'a ImplementorRecord)> + 'a
    {
        self.entries.iter().flat_map(move |(name, entry)| {
            entry
                .groups
                .records()
                .filter(move |(_, record)| record.mentions(path))
                .map(move |(pkg, record)| (name, pkg, record))
        })
    }

    pub fn len(&self) -> usize {
        self.capabilities().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Serializable copy of the lookup table (rendezvous state is not kept).
    pub fn snapshot(&self) -> IndexSnapshot {
        IndexSnapshot {
            schema_version: SNAPSHOT_SCHEMA_VERSION.to_string(),
            capabilities: self
                .entries
                .iter()
                .filter(|(_, entry)| entry.registrations > 0)
                .map(|(name, entry)| {
                    (
                        name.clone(),
                        CapabilityListing {
                            doc_link: entry.capability.doc_link.clone(),
                            implementors: entry.groups.clone(),
                        },
                    )
                })
                .collect(),
        }
    }

    /// Rebuild an index from a snapshot, one registration per capability.
    ///
    /// Rejects unknown schema versions and malformed names rather than
    /// serving a listing that cannot be linked.
    pub fn from_snapshot(snapshot: IndexSnapshot) -> Result<Self> {
        if snapshot.schema_version != SNAPSHOT_SCHEMA_VERSION {
            bail!(
                "snapshot schema_version '{}' does not match expected '{}'",
                snapshot.schema_version,
                SNAPSHOT_SCHEMA_VERSION
            );
        }

        let mut index = Self::new();
        for (name, listing) in snapshot.capabilities {
            validate_capability_name(&name)?;
            for package in listing.implementors.packages() {
                if package.0.trim().is_empty() {
                    bail!("capability {} lists an empty package name", name);
                }
            }
            index.register(name.clone(), listing.implementors);
            if let Some(link) = listing.doc_link {
                if let Some(entry) = index.entries.get_mut(&name) {
                    entry.capability.doc_link = Some(link);
                }
            }
        }
        Ok(index)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
/// On-disk form of an index.
pub struct IndexSnapshot {
    pub schema_version: String,
    pub capabilities: BTreeMap<CapabilityName, CapabilityListing>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CapabilityListing {
    #[serde(default)]
    pub doc_link: Option<String>,
    pub implementors: PackageGroups,
}

fn validate_capability_name(name: &CapabilityName) -> Result<()> {
    if name.0.is_empty() {
        bail!("capability name must not be empty");
    }
    let valid = name.0.split("::").all(|segment| {
        let mut chars = segment.chars();
        matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    });
    if !valid {
        bail!(
            "capability name must be a `::`-separated path of identifiers, got {}",
            name.0
        );
    }
    Ok(())
}
