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

//! Resources needed by each operation
//!
//! An operation always needs its mandatory resources, and uses some of its
//! optional resources, picked by the clients. Each optional resource drags in
//! its derived resources:
//!
//! ```text
//!   FM_RX:  mandatory [FM_CORE]
//!           optional  [I2SH -> (FM_IF)] [FM_ANALOG] (in use)
//! ```
//!
//! resolves to `[FM_CORE, FM_ANALOG]`, or `[FM_CORE, I2SH, FM_IF]` once I2SH is
//! selected instead.

use crate::chip::ChipCapabilities;
use crate::config::VacConfig;
use crate::error::{Result, VacError};
use crate::types::{Operation, Resource};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionalEntry {
    pub resource: Resource,
    pub derived: Vec<Resource>,
    pub in_use: bool,
}

#[derive(Debug, Clone, Default)]
struct OperationMapping {
    mandatory: Vec<Resource>,
    optional: Vec<OptionalEntry>,
}

#[derive(Debug)]
pub struct MappingEngine {
    operations: Vec<OperationMapping>,
}

impl Default for MappingEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn invalid(message: String) -> VacError {
    VacError::InvalidConfiguration(message)
}

impl MappingEngine {
    pub fn new() -> Self {
        Self { operations: Operation::all().map(|_| OperationMapping::default()).collect() }
    }

    /// Loads the mappings offered by the chip, and restricts the optional
    /// resources to the ones listed by the configuration, in its order.
    /// The default resource of each configured operation is put in use.
    pub fn configure(&mut self, capabilities: &ChipCapabilities, config: &VacConfig) -> Result<()> {
        let mut engine = Self::new();

        for (&operation, capability) in &capabilities.operations {
            engine.operations[operation as usize] = OperationMapping {
                mandatory: capability.mandatory.clone(),
                optional: capability
                    .optional
                    .iter()
                    .map(|o| OptionalEntry {
                        resource: o.resource,
                        derived: o.derived.clone(),
                        in_use: false,
                    })
                    .collect(),
            };
        }

        for mapping in &config.mappings {
            let operation: Operation =
                mapping.operation.parse().map_err(|e| invalid(format!("mapping: {}", e)))?;
            if !capabilities.supports_operation(operation) {
                return Err(invalid(format!("mapping of {}, not supported by the chip", operation)));
            }

            let candidates = std::mem::take(&mut engine.operations[operation as usize].optional);
            let mut optional = Vec::with_capacity(mapping.resources.len());
            for name in &mapping.resources {
                let resource: Resource = name
                    .parse()
                    .map_err(|e| invalid(format!("mapping of {}: {}", operation, e)))?;
                let Some(entry) = candidates.iter().find(|c| c.resource == resource) else {
                    return Err(invalid(format!(
                        "{} cannot be used by {} on this chip",
                        resource, operation
                    )));
                };
                if optional.iter().any(|o: &OptionalEntry| o.resource == resource) {
                    return Err(invalid(format!("{} listed twice for {}", resource, operation)));
                }
                optional.push(entry.clone());
            }

            if let Some(name) = &mapping.default_resource {
                let resource: Resource = name
                    .parse()
                    .map_err(|e| invalid(format!("default of {}: {}", operation, e)))?;
                let Some(entry) = optional.iter_mut().find(|o| o.resource == resource) else {
                    return Err(invalid(format!(
                        "default {} of {} is not a possible resource",
                        resource, operation
                    )));
                };
                entry.in_use = true;
            }

            engine.operations[operation as usize].optional = optional;
        }

        *self = engine;
        Ok(())
    }

    /// Ordered list of resources needed by `operation`: the mandatory ones,
    /// then each optional resource in use followed by its derived resources.
    pub fn operation_to_resource_list(&self, operation: Operation) -> Vec<Resource> {
        let mapping = &self.operations[operation as usize];
        let mut resources = mapping.mandatory.clone();
        for entry in mapping.optional.iter().filter(|o| o.in_use) {
            resources.push(entry.resource);
            resources.extend_from_slice(&entry.derived);
        }
        resources
    }

    /// Optional resources in use by `operation`
    pub fn optional_resources(&self, operation: Operation) -> Vec<Resource> {
        self.operations[operation as usize]
            .optional
            .iter()
            .filter(|o| o.in_use)
            .map(|o| o.resource)
            .collect()
    }

    /// Every possible optional resource of `operation`
    pub fn optional_entries(&self, operation: Operation) -> &[OptionalEntry] {
        &self.operations[operation as usize].optional
    }

    /// Puts in use exactly the optional resources of `selection`.
    /// Nothing changes when one of them is not an optional resource of the operation.
    pub fn set_optional_resources(
        &mut self,
        operation: Operation,
        selection: &[Resource],
    ) -> Result<()> {
        let mapping = &mut self.operations[operation as usize];
        if let Some(&resource) =
            selection.iter().find(|&&r| !mapping.optional.iter().any(|o| o.resource == r))
        {
            return Err(VacError::InvalidOptionalResource { operation, resource });
        }

        for entry in mapping.optional.iter_mut() {
            entry.in_use = selection.contains(&entry.resource);
        }
        Ok(())
    }
}
