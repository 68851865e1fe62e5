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

//! Audio resource manager of a combo Bluetooth / FM chip
//!
//! Arbitrates the audio paths of the chip between the radio operations
//! running at the same time, and drives the chip configuration of these paths:
//!
//! ```text
//!     start / stop / change       ________________________
//!    ------------------------->  |  configuration engine  |   configure
//!    <-------------------------  |                        | ------------> chip
//!      completion callbacks      |   ______     ______    | <------------ layer
//!                                |  | mapping| |allocation|   completion
//!                                |  |________| |________| |
//!                                |________________________|
//! ```
//!
//! The mapping engine gives the resources needed by an operation, the
//! allocation engine grants them, allowing two compatible operations to share
//! a resource. One configuration engine manages each chip of the `ChipTable`.

mod allocation;
mod chip;
mod config;
mod engine;
mod error;
mod mapping;
mod snapshot;
mod table;
mod types;
mod utils;


pub use allocation::{AllocationEngine, Denial, Owners};
pub use chip::{
    ChipCapabilities, ChipLayer, ChipStatus, CompletionCallback, OperationCapability,
    OptionalCapability,
};
pub use config::{ConfigError, MappingConfig, VacConfig};
pub use engine::{ConfigurationEngine, OperationCallbacks, MAX_CALLBACKS_PER_OPERATION};
pub use error::{Result, UnavailableResource, VacError};
pub use mapping::{MappingEngine, OptionalEntry};
pub use snapshot::{OperationSnapshot, ResourceSnapshot, Snapshot};
pub use table::ChipTable;
pub use types::{
    ChipId, Completion, DigitalConfig, Event, Operation, OperationState, Resource,
    ResourceProperties, UnknownName,
};
pub use utils::init_logging;
