// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Item handle cache.
//!
//! Maps item identifiers to the server handles returned when they were added
//! to the group. Adding an item is a remote call, so handles are kept and
//! reused across acquisition cycles. A handle is dropped when a read against
//! it fails, and the whole cache is cleared on every disconnect so that no
//! handle outlives its session.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::trace;

use opcda_core::{AddItemError, ItemId, RemoteError, ServerHandle};

use super::transport::{GroupHandle, RemoteDataSource};

/// A cached handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheEntry {
    /// Server handle of the item.
    pub handle: ServerHandle,
    /// When the item was added.
    pub added_at: DateTime<Utc>,
}

/// Resolution of one requested identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandleResolution {
    /// The requested item.
    pub item: ItemId,
    /// The handle, or why the item could not be added.
    pub outcome: Result<ServerHandle, AddItemError>,
    /// `true` if the handle was added by this call.
    pub newly_added: bool,
}

impl HandleResolution {
    /// Returns the handle if the item resolved.
    pub fn handle(&self) -> Option<ServerHandle> {
        self.outcome.as_ref().ok().copied()
    }
}

/// Identifier-keyed cache of server handles.
#[derive(Debug, Default)]
pub struct HandleCache {
    entries: DashMap<ItemId, CacheEntry>,
}

impl HandleCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves handles for `ids`, adding the ones not cached yet.
    ///
    /// Missing identifiers are added in one `add_items` call. Per-item
    /// rejections come back as [`AddItemError`] and are not retried. The
    /// result has one entry per requested identifier, in request order.
    ///
    /// # Errors
    ///
    /// Returns the remote error if the `add_items` call itself fails. Nothing
    /// is cached in that case.
    pub async fn ensure<S>(
        &self,
        source: &S,
        group: GroupHandle,
        ids: &[ItemId],
    ) -> Result<Vec<HandleResolution>, RemoteError>
    where
        S: RemoteDataSource + ?Sized,
    {
        let mut missing: Vec<ItemId> = Vec::new();
        for id in ids {
            if !self.entries.contains_key(id) && !missing.contains(id) {
                missing.push(id.clone());
            }
        }

        let mut added: HashMap<ItemId, Result<ServerHandle, AddItemError>> = HashMap::new();
        if !missing.is_empty() {
            let outcomes = source.add_items(group, &missing).await?;
            if outcomes.len() != missing.len() {
                return Err(RemoteError::transport(format!(
                    "add_items returned {} results for {} items",
                    outcomes.len(),
                    missing.len()
                )));
            }

            let now = Utc::now();
            for (id, outcome) in missing.into_iter().zip(outcomes) {
                let resolved = match outcome {
                    Ok(handle) => {
                        trace!(item = %id, handle = %handle, "Item added");
                        self.entries.insert(
                            id.clone(),
                            CacheEntry {
                                handle,
                                added_at: now,
                            },
                        );
                        Ok(handle)
                    }
                    Err(code) => Err(AddItemError::new(id.clone(), code)),
                };
                added.insert(id, resolved);
            }
        }

        let resolutions = ids
            .iter()
            .map(|id| match added.get(id) {
                Some(outcome) => HandleResolution {
                    item: id.clone(),
                    outcome: outcome.clone(),
                    newly_added: outcome.is_ok(),
                },
                None => HandleResolution {
                    item: id.clone(),
                    outcome: self.lookup(id).ok_or_else(|| {
                        AddItemError::new(id.clone(), opcda_core::StatusCode::INVALID_HANDLE)
                    }),
                    newly_added: false,
                },
            })
            .collect();

        Ok(resolutions)
    }

    /// Returns the cached handle of `id`.
    pub fn lookup(&self, id: &ItemId) -> Option<ServerHandle> {
        self.entries.get(id).map(|entry| entry.handle)
    }

    /// Returns the full cache entry of `id`.
    pub fn entry(&self, id: &ItemId) -> Option<CacheEntry> {
        self.entries.get(id).map(|entry| *entry)
    }

    /// Returns `true` if `id` is cached.
    pub fn contains(&self, id: &ItemId) -> bool {
        self.entries.contains_key(id)
    }

    /// Drops the entry of `id`, returning its handle.
    pub fn invalidate(&self, id: &ItemId) -> Option<ServerHandle> {
        let removed = self.entries.remove(id).map(|(_, entry)| entry.handle);
        if removed.is_some() {
            trace!(item = %id, "Handle invalidated");
        }
        removed
    }

    /// Drops every entry. Returns how many were dropped.
    pub fn clear(&self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        count
    }

    /// Number of cached handles.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the cached identifiers, sorted.
    pub fn items(&self) -> Vec<ItemId> {
        let mut items: Vec<ItemId> = self.entries.iter().map(|e| e.key().clone()).collect();
        items.sort();
        items
    }
}
