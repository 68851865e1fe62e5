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

use crate::chip::ChipLayer;
use crate::config::VacConfig;
use crate::engine::ConfigurationEngine;
use crate::error::{Result, VacError};
use crate::types::ChipId;
use std::sync::Arc;

/// Audio resource managers of the chips of the platform, indexed by `ChipId`.
/// Chips are independent from each other.
pub struct ChipTable {
    engines: Vec<ConfigurationEngine>,
}

impl ChipTable {
    /// Table of one engine per chip layer, the chip id being the index in `chips`
    pub fn new(chips: Vec<Arc<dyn ChipLayer>>) -> Self {
        let engines = chips
            .into_iter()
            .enumerate()
            .map(|(chip_id, chip)| ConfigurationEngine::new(chip_id, chip))
            .collect();
        Self { engines }
    }

    pub fn chip(&self, chip_id: ChipId) -> Result<&ConfigurationEngine> {
        self.engines.get(chip_id).ok_or(VacError::InvalidChip(chip_id))
    }

    pub fn configure(&self, chip_id: ChipId, config: &VacConfig) -> Result<()> {
        self.chip(chip_id)?.configure(config)
    }

    pub fn len(&self) -> usize {
        self.engines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.engines.is_empty()
    }
}
