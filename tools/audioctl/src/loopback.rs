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

//! Chip layer answering every step without hardware

use bluetooth_offload_audio::{
    ChipCapabilities, ChipLayer, ChipStatus, CompletionCallback, DigitalConfig, Operation,
    Resource, ResourceProperties,
};
use std::collections::HashSet;
use std::thread;
use std::time::Duration;

pub struct LoopbackChip {
    /// Steps on these resources complete from another thread
    slow: HashSet<Resource>,
    latency: Duration,
}

impl LoopbackChip {
    pub fn new(slow: impl IntoIterator<Item = Resource>, latency: Duration) -> Self {
        Self { slow: slow.into_iter().collect(), latency }
    }

    fn step(
        &self,
        what: &str,
        operation: Operation,
        resource: Resource,
        done: CompletionCallback,
    ) -> ChipStatus {
        if !self.slow.contains(&resource) {
            log::info!("{} {} for {}", what, resource, operation);
            return ChipStatus::Success;
        }

        log::info!("{} {} for {}, completing in {:?}", what, resource, operation, self.latency);
        let latency = self.latency;
        thread::spawn(move || {
            thread::sleep(latency);
            done(ChipStatus::Success);
        });
        ChipStatus::Pending
    }
}

impl ChipLayer for LoopbackChip {
    /// Capabilities of a combo chip routing BT and FM audio over its PCM
    /// and I2S highways
    fn capabilities(&self) -> ChipCapabilities {
        use Operation::*;
        use Resource::*;

        let bt: &[(Resource, &[Resource])] = &[(Pcmh, &[PcmIf])];
        let a3dp: &[(Resource, &[Resource])] = &[(Pcmh, &[PcmIf]), (I2sh, &[])];
        let fm: &[(Resource, &[Resource])] = &[(Pcmh, &[FmIf]), (I2sh, &[FmIf]), (FmAnalog, &[])];

        ChipCapabilities::default()
            .with_operation(BtVoice, &[Cortex], bt)
            .with_operation(Wbs, &[Cortex], bt)
            .with_operation(Awbs, &[Cortex], bt)
            .with_operation(A3dp, &[Cortex], a3dp)
            .with_operation(FmRx, &[FmCore], fm)
            .with_operation(FmTx, &[FmCore], fm)
            .with_operation(FmRxOverSco, &[FmCore, FmIf, Cortex], &[])
            .with_operation(FmRxOverA3dp, &[FmCore, FmIf, Cortex], &[])
            .with_resources(&Resource::all().collect::<Vec<_>>())
            .with_allowed_pair(Pcmh, BtVoice, FmRx)
            .with_allowed_pair(Pcmh, A3dp, FmRx)
            .with_allowed_pair(PcmIf, BtVoice, A3dp)
            .with_allowed_pair(Cortex, BtVoice, A3dp)
    }

    fn configure_resource(
        &self,
        operation: Operation,
        resource: Resource,
        _config: &DigitalConfig,
        _properties: &ResourceProperties,
        done: CompletionCallback,
    ) -> ChipStatus {
        self.step("configure", operation, resource, done)
    }

    fn stop_resource_configuration(
        &self,
        operation: Operation,
        resource: Resource,
        _properties: &ResourceProperties,
        done: CompletionCallback,
    ) -> ChipStatus {
        self.step("stop", operation, resource, done)
    }
}
