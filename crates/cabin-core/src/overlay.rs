//! Generic create/update/delete overlay layered over immutable fixtures.
//!
//! An [`Overlay<T>`] records three things for one entity kind:
//!
//! - `created`: records that exist only locally, already in final form
//! - `updated`: shallow JSON patches keyed by id, for fixture records
//! - `deleted`: tombstoned ids
//!
//! # Merge
//!
//! [`Overlay::merge`] recomputes the effective record set on every read:
//! fixture records whose id is tombstoned are dropped, survivors get their
//! patch shallow-merged on top, then every staged record is appended. No
//! dedup happens between staged and fixture ids. The fixture slice is only
//! borrowed and never modified.
//!
//! Patches are plain JSON objects so that any subset of fields can be
//! stored, exactly as the persisted envelope carries them. Typed patch
//! structs (`TicketPatch`, ...) convert into a [`Patch`] via [`to_patch`].

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::warn;

use crate::error::{PortalError, Result};
use crate::time::format_timestamp;

/// A shallow patch: top-level field name to replacement value.
pub type Patch = serde_json::Map<String, Value>;

/// A record kind that can live in an overlay.
pub trait Entity: Clone + Serialize + DeserializeOwned {
    /// Human-facing kind name used in errors and logs.
    const KIND: &'static str;
    /// Id prefix for records synthesized locally (`T`, `TH`, ...).
    const ID_PREFIX: &'static str;
    /// Whether patches re-stamp an `updatedAt` field.
    const TRACKS_UPDATED_AT: bool = false;

    fn id(&self) -> &str;
}

/// Convert a typed patch into its JSON object form.
pub fn to_patch<P: Serialize>(kind: &'static str, id: &str, patch: &P) -> Result<Patch> {
    match serde_json::to_value(patch) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(PortalError::invalid(format!(
            "patch for {kind} {id} must be an object, got {other}"
        ))),
        Err(source) => Err(PortalError::InvalidPatch {
            kind,
            id: id.to_string(),
            source,
        }),
    }
}

/// Shallow-merge `patch` over `record`, returning the patched copy.
pub fn apply_patch<E: Entity>(record: &E, patch: &Patch) -> Result<E> {
    let invalid = |source| PortalError::InvalidPatch {
        kind: E::KIND,
        id: record.id().to_string(),
        source,
    };
    let mut value = serde_json::to_value(record).map_err(invalid)?;
    if let Value::Object(fields) = &mut value {
        for (key, val) in patch {
            fields.insert(key.clone(), val.clone());
        }
    }
    serde_json::from_value(value).map_err(invalid)
}

/// Where an update landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchTarget {
    /// Applied in place to a locally created record.
    Staged,
    /// Accumulated into the patch for a fixture record.
    Fixture,
}

/// What a delete did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    /// A locally created record was dropped from `created`.
    Unstaged,
    /// The id was added to `deleted`.
    Tombstoned,
    /// The id was already tombstoned; nothing changed.
    AlreadyDeleted,
}

/// Persisted overlay envelope for one entity kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(serialize = "T: Serialize", deserialize = "T: DeserializeOwned"))]
pub struct Overlay<T> {
    #[serde(default = "Vec::new")]
    pub created: Vec<T>,
    #[serde(default)]
    pub updated: BTreeMap<String, Patch>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deleted: Vec<String>,
}

impl<T> Default for Overlay<T> {
    fn default() -> Self {
        Self {
            created: Vec::new(),
            updated: BTreeMap::new(),
            deleted: Vec::new(),
        }
    }
}

impl<T: Entity> Overlay<T> {
    /// Returns `true` when the overlay holds no local changes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.updated.is_empty() && self.deleted.is_empty()
    }

    fn is_deleted(&self, id: &str) -> bool {
        self.deleted.iter().any(|d| d == id)
    }

    /// Compute the effective record set for `base`.
    #[must_use]
    pub fn merge(&self, base: &[T]) -> Vec<T> {
        let mut merged: Vec<T> = base
            .iter()
            .filter(|record| !self.is_deleted(record.id()))
            .map(|record| match self.updated.get(record.id()) {
                Some(patch) => apply_patch(record, patch).unwrap_or_else(|err| {
                    warn!(kind = T::KIND, id = record.id(), %err, "ignoring stale overlay patch");
                    record.clone()
                }),
                None => record.clone(),
            })
            .collect();

        merged.extend(
            self.created
                .iter()
                .filter(|record| !self.is_deleted(record.id()))
                .cloned(),
        );
        merged
    }

    /// Look up a locally created record.
    #[must_use]
    pub fn staged(&self, id: &str) -> Option<&T> {
        self.created.iter().find(|record| record.id() == id)
    }

    /// Stage a new record.
    pub fn stage(&mut self, record: T) {
        self.created.push(record);
    }

    /// Apply `patch` to the record with `id`, re-stamping `updatedAt` when
    /// the kind tracks it.
    ///
    /// Staged records are patched in place. Anything else accumulates into
    /// `updated[id]`, later keys overwriting earlier ones.
    pub fn patch(
        &mut self,
        id: &str,
        mut patch: Patch,
        now: &DateTime<Utc>,
    ) -> Result<PatchTarget> {
        if T::TRACKS_UPDATED_AT {
            patch.insert("updatedAt".to_string(), Value::String(format_timestamp(now)));
        }

        if let Some(slot) = self.created.iter_mut().find(|record| record.id() == id) {
            *slot = apply_patch(slot, &patch)?;
            return Ok(PatchTarget::Staged);
        }

        self.updated.entry(id.to_string()).or_default().extend(patch);
        Ok(PatchTarget::Fixture)
    }

    /// Remove a staged record, or tombstone a fixture id once.
    pub fn remove(&mut self, id: &str) -> Removal {
        if let Some(pos) = self.created.iter().position(|record| record.id() == id) {
            self.created.remove(pos);
            return Removal::Unstaged;
        }
        if self.is_deleted(id) {
            return Removal::AlreadyDeleted;
        }
        self.deleted.push(id.to_string());
        Removal::Tombstoned
    }
}
