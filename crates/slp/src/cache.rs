// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Thread-safe keyed store of service registrations.
//!
//! Readers take a shared lock and see a consistent snapshot per call.
//! Mutations are serialized by a dedicated mutation lock; change events
//! fire after the data lock is released but before the mutating call
//! returns, in (removed, added) order for replacements. Listener panics
//! are caught and logged; listeners may query the cache from a callback
//! but must not mutate it.

use crate::attributes::Attributes;
use crate::error::{ErrorCode, SlpError};
use crate::filter::Filter;
use crate::scopes::Scopes;
use crate::service_info::{ServiceInfo, ServiceKey};
use crate::service_type::ServiceType;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

/// Observer of cache mutations. Callbacks run synchronously on the
/// mutating thread.
pub trait ServiceListener: Send + Sync {
    fn service_added(&self, _service: &ServiceInfo) {}
    fn service_updated(&self, _previous: &ServiceInfo, _current: &ServiceInfo) {}
    fn service_removed(&self, _service: &ServiceInfo) {}
}

/// Outcome of a mutation: the entry that was there before and the entry
/// that is there now.
#[derive(Debug, Clone, Default)]
pub struct CacheResult {
    pub previous: Option<ServiceInfo>,
    pub current: Option<ServiceInfo>,
}

enum Event {
    Added(ServiceInfo),
    Updated(ServiceInfo, ServiceInfo),
    Removed(ServiceInfo),
}

#[derive(Default)]
struct Inner {
    entries: HashMap<ServiceKey, ServiceInfo>,
    /// Insertion order of live keys; a replaced key keeps its slot.
    order: Vec<ServiceKey>,
}

/// The Directory Agent's in-memory service registry.
#[derive(Default)]
pub struct ServiceInfoCache {
    /// Serializes mutations and their notifications.
    mutation: Mutex<()>,
    inner: RwLock<Inner>,
    listeners: RwLock<Vec<Arc<dyn ServiceListener>>>,
}

impl ServiceInfoCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_service_listener(&self, listener: Arc<dyn ServiceListener>) {
        self.listeners.write().push(listener);
    }

    pub fn remove_service_listener(&self, listener: &Arc<dyn ServiceListener>) {
        self.listeners
            .write()
            .retain(|l| !Arc::ptr_eq(l, listener));
    }

    /// Insert or fully replace the entry with the same key.
    ///
    /// A replacement notifies `service_removed(previous)` then
    /// `service_added(current)`.
    pub fn put(&self, service: ServiceInfo) -> Result<CacheResult, SlpError> {
        if service.scopes.is_empty() {
            return Err(SlpError::new(
                ErrorCode::InvalidRegistration,
                format!("service {} has no scopes", service.url),
            ));
        }

        let _guard = self.mutation.lock();
        let key = service.key();
        let previous = {
            let mut inner = self.inner.write();
            if !inner.entries.contains_key(&key) {
                inner.order.push(key.clone());
            }
            inner.entries.insert(key, service.clone())
        };

        let mut events = Vec::with_capacity(2);
        if let Some(previous) = &previous {
            events.push(Event::Removed(previous.clone()));
        }
        events.push(Event::Added(service.clone()));
        self.notify(&events);

        Ok(CacheResult {
            previous,
            current: Some(service),
        })
    }

    /// Delete the entry; an absent key is not an error.
    pub fn remove(&self, key: &ServiceKey) -> CacheResult {
        let _guard = self.mutation.lock();
        let previous = {
            let mut inner = self.inner.write();
            let previous = inner.entries.remove(key);
            if previous.is_some() {
                inner.order.retain(|k| k != key);
            }
            previous
        };

        if let Some(previous) = &previous {
            self.notify(&[Event::Removed(previous.clone())]);
        }
        CacheResult {
            previous,
            current: None,
        }
    }

    /// Merge `attributes` into an existing entry. The registration
    /// instant is untouched, so the lifetime keeps counting from the
    /// original registration.
    pub fn add_attributes(
        &self,
        key: &ServiceKey,
        attributes: &Attributes,
    ) -> Result<CacheResult, SlpError> {
        self.update_attributes(key, |existing| existing.merge(attributes))
    }

    /// Unmerge tags or values from an existing entry.
    pub fn remove_attributes(
        &self,
        key: &ServiceKey,
        attributes: &Attributes,
    ) -> Result<CacheResult, SlpError> {
        self.update_attributes(key, |existing| existing.unmerge(attributes))
    }

    fn update_attributes(
        &self,
        key: &ServiceKey,
        apply: impl FnOnce(&Attributes) -> Attributes,
    ) -> Result<CacheResult, SlpError> {
        let _guard = self.mutation.lock();
        let (previous, current) = {
            let mut inner = self.inner.write();
            let Some(existing) = inner.entries.get_mut(key) else {
                return Err(SlpError::new(
                    ErrorCode::InvalidUpdate,
                    format!("service {} is not registered", key.url()),
                ));
            };
            let previous = existing.clone();
            existing.attributes = apply(&existing.attributes);
            (previous, existing.clone())
        };

        self.notify(&[Event::Updated(previous.clone(), current.clone())]);
        Ok(CacheResult {
            previous: Some(previous),
            current: Some(current),
        })
    }

    /// All entries satisfying the conjunction of the given predicates, in
    /// insertion order. A `None` predicate matches anything; empty
    /// request scopes pass every entry.
    pub fn matching(
        &self,
        service_type: Option<&ServiceType>,
        language: Option<&str>,
        scopes: Option<&Scopes>,
        filter: Option<&Filter>,
    ) -> Vec<ServiceInfo> {
        let inner = self.inner.read();
        inner
            .order
            .iter()
            .filter_map(|key| inner.entries.get(key))
            .filter(|service| {
                if let Some(wanted) = service_type {
                    if service.service_type() != *wanted {
                        return false;
                    }
                }
                if let Some(language) = language {
                    if !service.language.eq_ignore_ascii_case(language) {
                        return false;
                    }
                }
                if let Some(requested) = scopes {
                    if !service.scopes.contains_all(requested) {
                        return false;
                    }
                }
                if let Some(filter) = filter {
                    if !filter.matches(&service.attributes) {
                        return false;
                    }
                }
                true
            })
            .cloned()
            .collect()
    }

    /// Remove every entry whose lifetime has elapsed, notifying
    /// `service_removed` for each. Returns the purged entries.
    pub fn purge(&self) -> Vec<ServiceInfo> {
        let now = Instant::now();
        let _guard = self.mutation.lock();
        let removed: Vec<ServiceInfo> = {
            let mut inner = self.inner.write();
            let expired: Vec<ServiceKey> = inner
                .order
                .iter()
                .filter(|key| {
                    inner
                        .entries
                        .get(key)
                        .is_some_and(|service| service.is_expired(now))
                })
                .cloned()
                .collect();
            let mut removed = Vec::with_capacity(expired.len());
            for key in &expired {
                if let Some(service) = inner.entries.remove(key) {
                    removed.push(service);
                }
            }
            inner.order.retain(|k| !expired.contains(k));
            removed
        };

        for service in &removed {
            self.notify(&[Event::Removed(service.clone())]);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn notify(&self, events: &[Event]) {
        let listeners = self.listeners.read().clone();
        for event in events {
            for listener in &listeners {
                let outcome = catch_unwind(AssertUnwindSafe(|| match event {
                    Event::Added(service) => listener.service_added(service),
                    Event::Updated(previous, current) => {
                        listener.service_updated(previous, current)
                    }
                    Event::Removed(service) => listener.service_removed(service),
                }));
                if outcome.is_err() {
                    log::error!("[cache] service listener panicked; cache state is unaffected");
                }
            }
        }
    }
}
