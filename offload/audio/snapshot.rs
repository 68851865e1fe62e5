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

use crate::types::{ChipId, Operation, OperationState, Resource};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationSnapshot {
    pub operation: Operation,
    pub supported: bool,
    pub state: OperationState,
    pub resources: Vec<Resource>,
    pub optional: Vec<Resource>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceSnapshot {
    pub resource: Resource,
    pub available: bool,
    pub owners: Vec<Operation>,
}

/// State of a chip instance, for diagnostics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub chip_id: ChipId,
    pub operations: Vec<OperationSnapshot>,
    pub resources: Vec<ResourceSnapshot>,
}

fn names<T: fmt::Display>(items: &[T]) -> String {
    if items.is_empty() {
        return "-".to_string();
    }
    items.iter().map(|i| i.to_string()).collect::<Vec<_>>().join(",")
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "chip {}", self.chip_id)?;
        for op in self.operations.iter().filter(|o| o.supported) {
            writeln!(
                f,
                "  {:<16} {:<9} resources {:<24} optional {}",
                op.operation.name(),
                format!("{:?}", op.state),
                names(&op.resources),
                names(&op.optional)
            )?;
        }
        for res in self.resources.iter().filter(|r| r.available) {
            writeln!(f, "  {:<16} owners {}", res.resource.name(), names(&res.owners))?;
        }
        Ok(())
    }
}
