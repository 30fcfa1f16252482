//! Record types for one capability's implementor listing.
//!
//! The shapes mirror what the documentation generator writes into each
//! `trait.<Name>.js` file: a package-keyed table of rendered rows. Ordering is
//! part of the data; nothing here re-sorts packages or records.

use crate::index::identity::{CapabilityName, ItemKind, PackageName, TypePath};
use crate::markup;
use crate::rendezvous::Merge;
use indexmap::IndexMap;
use indexmap::map::Entry;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
/// One "type X implements this trait" row.
pub struct ImplementorRecord {
    /// Rendered HTML fragment, entities left escaped.
    pub text: String,
    /// True for auto-trait and blanket impls the generator synthesized.
    #[serde(default)]
    pub synthetic: bool,
    /// Fully-qualified type paths used for cross-linking.
    #[serde(default)]
    pub types: Vec<TypePath>,
}

impl ImplementorRecord {
    pub fn new(text: impl Into<String>, synthetic: bool, types: Vec<TypePath>) -> Self {
        Self {
            text: text.into(),
            synthetic,
            types,
        }
    }

    /// Human-readable rendering of `text` (tags stripped, entities decoded).
    pub fn plain_text(&self) -> String {
        markup::plain_text(&self.text)
    }

    /// Whether this row lists `path` among its implementing types.
    pub fn mentions(&self, path: &TypePath) -> bool {
        self.types.iter().any(|candidate| candidate == path)
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
/// Package name to ordered records, in registration order.
pub struct PackageGroups(IndexMap<PackageName, Vec<ImplementorRecord>>);

impl PackageGroups {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a package's records, replacing any earlier assignment in place.
    ///
    /// Matches the generated `implementors["pkg"] = [...]` statement: a repeat
    /// assignment keeps the package's original position.
    pub fn insert(&mut self, package: PackageName, records: Vec<ImplementorRecord>) {
        self.0.insert(package, records);
    }

    /// Append records to a package, creating the group at the end if new.
    pub fn append(&mut self, package: PackageName, records: Vec<ImplementorRecord>) {
        match self.0.entry(package) {
            Entry::Occupied(mut entry) => entry.get_mut().extend(records),
            Entry::Vacant(entry) => {
                entry.insert(records);
            }
        }
    }

    pub fn get(&self, package: &PackageName) -> Option<&[ImplementorRecord]> {
        self.0.get(package).map(Vec::as_slice)
    }

    pub fn packages(&self) -> impl Iterator<Item = &PackageName> {
        self.0.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PackageName, &[ImplementorRecord])> {
        self.0.iter().map(|(pkg, records)| (pkg, records.as_slice()))
    }

    /// Every record in rendering order, tagged with its package.
    pub fn records(&self) -> impl Iterator<Item = (&PackageName, &ImplementorRecord)> {
        self.0
            .iter()
            .flat_map(|(pkg, records)| records.iter().map(move |record| (pkg, record)))
    }

    /// Number of packages.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn record_count(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }

    /// Keep only the named packages, preserving relative order.
    pub fn retain_packages(&mut self, keep: &[PackageName]) {
        self.0.retain(|pkg, _| keep.contains(pkg));
    }

    /// Canonical documentation link for the trait these rows implement.
    ///
    /// Taken from the first `trait`-class cross-link found in any row.
    pub fn trait_doc_link(&self) -> Option<String> {
        self.records().find_map(|(_, record)| {
            markup::links(&record.text)
                .into_iter()
                .find(|link| link.kind == ItemKind::Trait)
                .map(|link| link.href)
        })
    }
}

// Package order is significant, unlike `IndexMap`'s own equality.
impl PartialEq for PackageGroups {
    fn eq(&self, other: &Self) -> bool {
        self.0.len() == other.0.len() && self.0.iter().eq(other.0.iter())
    }
}

impl Eq for PackageGroups {}

impl Merge for PackageGroups {
    fn merge(&mut self, other: Self) {
        for (package, records) in other.0 {
            self.append(package, records);
        }
    }
}

impl FromIterator<(PackageName, Vec<ImplementorRecord>)> for PackageGroups {
    fn from_iter<I: IntoIterator<Item = (PackageName, Vec<ImplementorRecord>)>>(iter: I) -> Self {
        let mut groups = PackageGroups::new();
        for (package, records) in iter {
            groups.append(package, records);
        }
        groups
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
/// Capability metadata surfaced alongside its implementors.
pub struct Capability {
    pub name: CapabilityName,
    #[serde(default)]
    pub doc_link: Option<String>,
}

impl Capability {
    pub fn new(name: CapabilityName) -> Self {
        Self {
            name,
            doc_link: None,
        }
    }

    /// Fill `doc_link` from `groups` if it is still unknown.
    pub fn observe(&mut self, groups: &PackageGroups) {
        if self.doc_link.is_none() {
            self.doc_link = groups.trait_doc_link();
        }
    }
}
