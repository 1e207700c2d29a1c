//! DeviceHandle ↔ DeviceIdentity routing table.
//!
//! The table is immutable once built. Interest changes build a new [`RouteTable`] and swap
//! it in wholesale through [`DeviceRoutes::replace`]; dispatch only ever takes the read
//! lock, so it sees either the old table or the new one, never a half-edited map.
//!
//! A table may also name a *system device* per class: events from a handle that is not
//! mapped explicitly resolve to it. Explicit handles always win.

use crate::device::{DeviceClass, DeviceHandle, DeviceIdentity};
use crate::error::{Error, Result};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RouteTable {
    by_handle: HashMap<DeviceHandle, DeviceIdentity>,
    by_identity: HashMap<DeviceIdentity, DeviceHandle>,
    system: HashMap<DeviceClass, DeviceIdentity>,
}

impl RouteTable {
    pub fn builder() -> RouteTableBuilder {
        RouteTableBuilder::default()
    }

    /// Identity for a packet from `handle` of `class`.
    pub fn resolve(&self, handle: DeviceHandle, class: DeviceClass) -> Option<DeviceIdentity> {
        self.by_handle
            .get(&handle)
            .or_else(|| self.system.get(&class))
            .copied()
    }

    pub fn identity_of(&self, handle: DeviceHandle) -> Option<DeviceIdentity> {
        self.by_handle.get(&handle).copied()
    }

    pub fn handle_of(&self, identity: DeviceIdentity) -> Option<DeviceHandle> {
        self.by_identity.get(&identity).copied()
    }

    pub fn system_device(&self, class: DeviceClass) -> Option<DeviceIdentity> {
        self.system.get(&class).copied()
    }

    /// Number of explicit handle mappings.
    pub fn len(&self) -> usize {
        self.by_handle.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_handle.is_empty() && self.system.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct RouteTableBuilder {
    devices: Vec<(DeviceHandle, DeviceIdentity)>,
    system: Vec<(DeviceClass, DeviceIdentity)>,
}

impl RouteTableBuilder {
    pub fn device(mut self, handle: DeviceHandle, identity: DeviceIdentity) -> Self {
        self.devices.push((handle, identity));
        self
    }

    /// Fallback identity for unmapped handles of `class`. The last call per class wins.
    pub fn system(mut self, class: DeviceClass, identity: DeviceIdentity) -> Self {
        self.system.push((class, identity));
        self
    }

    /// Build the table. A handle mapped to two identities, or an identity claimed by two
    /// handles, is a [`Error::RouteConflict`]. Repeating the same pair is fine.
    pub fn build(self) -> Result<RouteTable> {
        let mut table = RouteTable::default();
        for (handle, identity) in self.devices {
            if let Some(existing) = table.by_handle.get(&handle) {
                if *existing != identity {
                    return Err(Error::RouteConflict(handle));
                }
                continue;
            }
            if table.by_identity.contains_key(&identity) {
                return Err(Error::RouteConflict(handle));
            }
            table.by_handle.insert(handle, identity);
            table.by_identity.insert(identity, handle);
        }
        table.system.extend(self.system);
        Ok(table)
    }
}

/// Shared, swappable route table.
#[derive(Clone, Debug, Default)]
pub struct DeviceRoutes {
    inner: Arc<RwLock<RouteTable>>,
}

impl DeviceRoutes {
    pub fn new(table: RouteTable) -> Self {
        Self {
            inner: Arc::new(RwLock::new(table)),
        }
    }

    /// Swap in a new table, returning the old one.
    pub fn replace(&self, table: RouteTable) -> RouteTable {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *guard, table)
    }

    pub fn resolve(&self, handle: DeviceHandle, class: DeviceClass) -> Option<DeviceIdentity> {
        self.read(|t| t.resolve(handle, class))
    }

    pub fn handle_of(&self, identity: DeviceIdentity) -> Option<DeviceHandle> {
        self.read(|t| t.handle_of(identity))
    }

    pub fn len(&self) -> usize {
        self.read(RouteTable::len)
    }

    pub fn is_empty(&self) -> bool {
        self.read(RouteTable::is_empty)
    }

    /// Run `f` under the read lock.
    pub fn read<R>(&self, f: impl FnOnce(&RouteTable) -> R) -> R {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }
}
