// Copyright 2024, The Android Open Source Project
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Ownership of the audio resources
//!
//! A resource is owned by at most two operations at a time. A second owner is
//! only accepted when the pair of operations is declared as compatible by the
//! chip for this resource.

use crate::chip::ChipCapabilities;
use crate::config::VacConfig;
use crate::error::{Result, VacError};
use crate::types::{Operation, Resource, ResourceProperties};

/// Current owners of a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Owners {
    #[default]
    None,
    One(Operation),
    Two(Operation, Operation),
}

impl Owners {
    pub fn contains(&self, operation: Operation) -> bool {
        match *self {
            Owners::None => false,
            Owners::One(a) => a == operation,
            Owners::Two(a, b) => a == operation || b == operation,
        }
    }

    pub fn to_vec(&self) -> Vec<Operation> {
        match *self {
            Owners::None => vec![],
            Owners::One(a) => vec![a],
            Owners::Two(a, b) => vec![a, b],
        }
    }
}

/// Reason of an allocation denial
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    /// The resource is not enabled on this chip
    NotAvailable,
    /// The resource is held by an incompatible operation
    OwnedBy(Operation),
}

impl Denial {
    pub fn owner(&self) -> Option<Operation> {
        match *self {
            Denial::NotAvailable => None,
            Denial::OwnedBy(owner) => Some(owner),
        }
    }
}

#[derive(Debug, Default)]
struct ResourceEntry {
    available: bool,
    owners: Owners,
    allowed_pairs: Vec<(Operation, Operation)>,
    properties: ResourceProperties,
}

impl ResourceEntry {
    fn allows(&self, a: Operation, b: Operation) -> bool {
        self.allowed_pairs.iter().any(|&(x, y)| (x == a && y == b) || (x == b && y == a))
    }
}

#[derive(Debug)]
pub struct AllocationEngine {
    resources: Vec<ResourceEntry>,
}

impl Default for AllocationEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl AllocationEngine {
    /// Engine with every resource unavailable
    pub fn new() -> Self {
        Self { resources: Resource::all().map(|_| ResourceEntry::default()).collect() }
    }

    /// Enables the external resources listed by the configuration,
    /// and the internal resources supported by the chip.
    pub fn configure(&mut self, capabilities: &ChipCapabilities, config: &VacConfig) -> Result<()> {
        let mut engine = Self::new();

        for name in &config.resources {
            let resource: Resource =
                name.parse().map_err(|e| VacError::InvalidConfiguration(format!("{}", e)))?;
            if !resource.is_external() {
                return Err(VacError::InvalidConfiguration(format!(
                    "{} is an internal resource",
                    resource
                )));
            }
            if !capabilities.supports_resource(resource) {
                return Err(VacError::InvalidConfiguration(format!(
                    "{} is not supported by the chip",
                    resource
                )));
            }
            engine.entry_mut(resource).available = true;
        }

        for &resource in capabilities.resources.iter().filter(|r| !r.is_external()) {
            engine.entry_mut(resource).available = true;
        }

        for (&resource, pairs) in &capabilities.allowed_pairs {
            engine.entry_mut(resource).allowed_pairs = pairs.clone();
        }

        *self = engine;
        Ok(())
    }

    fn entry(&self, resource: Resource) -> &ResourceEntry {
        &self.resources[resource as usize]
    }

    fn entry_mut(&mut self, resource: Resource) -> &mut ResourceEntry {
        &mut self.resources[resource as usize]
    }

    pub fn is_available(&self, resource: Resource) -> bool {
        self.entry(resource).available
    }

    pub fn owners(&self, resource: Resource) -> Owners {
        self.entry(resource).owners
    }

    /// Tries to grant `resource` to `operation`.
    /// Granting a resource already owned by the operation is a no-op.
    pub fn try_allocate(
        &mut self,
        resource: Resource,
        operation: Operation,
    ) -> std::result::Result<(), Denial> {
        let entry = self.entry_mut(resource);
        if !entry.available {
            log::error!("Allocation of unavailable resource {} by {}", resource, operation);
            return Err(Denial::NotAvailable);
        }

        let owners = entry.owners;
        entry.owners = match owners {
            Owners::None => Owners::One(operation),
            Owners::One(owner) if owner == operation => return Ok(()),
            Owners::One(owner) if entry.allows(owner, operation) => Owners::Two(owner, operation),
            Owners::One(owner) => return Err(Denial::OwnedBy(owner)),
            Owners::Two(a, b) if a == operation || b == operation => return Ok(()),
            Owners::Two(a, _) => return Err(Denial::OwnedBy(a)),
        };

        log::debug!("{} allocated to {}, owners {:?}", resource, operation, entry.owners);
        Ok(())
    }

    /// Removes `operation` from the owners of `resource`
    pub fn release(&mut self, resource: Resource, operation: Operation) {
        let entry = self.entry_mut(resource);
        if !entry.available {
            log::error!("Release of unavailable resource {} by {}", resource, operation);
            return;
        }

        entry.owners = match entry.owners {
            Owners::One(owner) if owner == operation => Owners::None,
            Owners::Two(a, b) if a == operation => Owners::One(b),
            Owners::Two(a, b) if b == operation => Owners::One(a),
            owners => {
                log::error!("Release of {} by {}, owned by {:?}", resource, operation, owners);
                return;
            }
        };

        log::debug!("{} released by {}, owners {:?}", resource, operation, entry.owners);
    }

    pub fn set_resource_properties(&mut self, resource: Resource, properties: ResourceProperties) {
        self.entry_mut(resource).properties = properties;
    }

    pub fn resource_properties(&self, resource: Resource) -> &ResourceProperties {
        &self.entry(resource).properties
    }
}
