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

use crate::types::{ChipId, Operation, Resource};
use std::fmt;
use thiserror::Error;

/// Resource that could not be granted, along with the operation holding it.
/// `owner` is `None` when the resource is not available on the chip at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnavailableResource {
    pub resource: Resource,
    pub owner: Option<Operation>,
}

impl fmt::Display for UnavailableResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.owner {
            Some(owner) => write!(f, "{} (used by {})", self.resource, owner),
            None => write!(f, "{} (not available)", self.resource),
        }
    }
}

fn list(resources: &[UnavailableResource]) -> String {
    resources.iter().map(|r| r.to_string()).collect::<Vec<_>>().join(", ")
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VacError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("no chip with id {0}")]
    InvalidChip(ChipId),

    #[error("operation {0} is not supported")]
    OperationNotSupported(Operation),

    #[error("operation {0} is busy")]
    Busy(Operation),

    #[error("unavailable resources: {}", list(.0))]
    UnavailableResources(Vec<UnavailableResource>),

    #[error("{resource} is not an optional resource of {operation}")]
    InvalidOptionalResource { operation: Operation, resource: Resource },

    #[error("operation {0} already has the maximum number of callbacks")]
    TooManyCallbacks(Operation),

    #[error("callback {id} is not registered on {operation}")]
    UnknownCallback { operation: Operation, id: u32 },

    #[error("chip failed to configure {resource} for {operation}")]
    ChipFailure { operation: Operation, resource: Resource },
}

pub type Result<T> = std::result::Result<T, VacError>;
