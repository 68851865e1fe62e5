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

use crate::types::{DigitalConfig, Operation, Resource, ResourceProperties};
use std::collections::HashMap;

/// Answer of the chip layer to a configuration step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChipStatus {
    Success,
    /// The step goes on asynchronously, the completion callback will be called
    Pending,
    Failure,
}

/// Called once by the chip layer when a pending step completes,
/// with `Success` or `Failure`.
pub type CompletionCallback = Box<dyn FnOnce(ChipStatus) + Send>;

/// Interface of the chip abstraction layer, issuing the hardware commands
pub trait ChipLayer: Send + Sync {
    /// Audio capabilities of the chip, read once at configuration time
    fn capabilities(&self) -> ChipCapabilities;

    /// Configure `resource` for `operation`.
    /// `done` is called iff `ChipStatus::Pending` is returned.
    fn configure_resource(
        &self,
        operation: Operation,
        resource: Resource,
        config: &DigitalConfig,
        properties: &ResourceProperties,
        done: CompletionCallback,
    ) -> ChipStatus;

    /// Undo the configuration of `resource` for `operation`.
    /// `done` is called iff `ChipStatus::Pending` is returned.
    fn stop_resource_configuration(
        &self,
        operation: Operation,
        resource: Resource,
        properties: &ResourceProperties,
        done: CompletionCallback,
    ) -> ChipStatus;
}

/// Optional resource the chip can route an operation through,
/// along with the resources it drags in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionalCapability {
    pub resource: Resource,
    pub derived: Vec<Resource>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationCapability {
    /// Resources always needed by the operation
    pub mandatory: Vec<Resource>,
    /// Candidate optional resources, the configuration file picks among them
    pub optional: Vec<OptionalCapability>,
}

/// Audio capabilities reported by the chip layer
#[derive(Debug, Clone, Default)]
pub struct ChipCapabilities {
    pub operations: HashMap<Operation, OperationCapability>,
    pub resources: Vec<Resource>,
    /// Pairs of operations allowed to share a resource, in any order
    pub allowed_pairs: HashMap<Resource, Vec<(Operation, Operation)>>,
}

impl ChipCapabilities {
    pub fn supports_operation(&self, operation: Operation) -> bool {
        self.operations.contains_key(&operation)
    }

    pub fn supports_resource(&self, resource: Resource) -> bool {
        self.resources.contains(&resource)
    }

    /// Declares `operation` as supported, along with its resources.
    /// `optional` lists the candidate resources with their derived resources.
    pub fn with_operation(
        mut self,
        operation: Operation,
        mandatory: &[Resource],
        optional: &[(Resource, &[Resource])],
    ) -> Self {
        let optional = optional
            .iter()
            .map(|(resource, derived)| OptionalCapability {
                resource: *resource,
                derived: derived.to_vec(),
            })
            .collect();
        self.operations
            .insert(operation, OperationCapability { mandatory: mandatory.to_vec(), optional });
        self
    }

    pub fn with_resources(mut self, resources: &[Resource]) -> Self {
        for resource in resources {
            if !self.resources.contains(resource) {
                self.resources.push(*resource);
            }
        }
        self
    }

    pub fn with_allowed_pair(mut self, resource: Resource, a: Operation, b: Operation) -> Self {
        self.allowed_pairs.entry(resource).or_default().push((a, b));
        self
    }
}
