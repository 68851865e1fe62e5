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

use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Client activity needing audio paths on the chip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, FromPrimitive)]
#[repr(u32)]
pub enum Operation {
    FmTx,
    FmRx,
    A3dp,
    BtVoice,
    Wbs,
    Awbs,
    FmRxOverSco,
    FmRxOverA3dp,
}

/// Audio path of the chip
///
/// Resources up to `FmAnalog` are external: they reach the outside of the chip,
/// and are enabled by the configuration file. The remaining ones are internal,
/// and only depend on the chip capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, FromPrimitive)]
#[repr(u32)]
pub enum Resource {
    I2sh,
    Pcmh,
    PcmFrame1,
    PcmFrame2,
    PcmFrame3,
    PcmFrame4,
    PcmFrame5,
    PcmFrame6,
    FmAnalog,
    PcmIf,
    FmIf,
    Cortex,
    FmCore,
}

/// Identifies a chip instance in the `ChipTable`
pub type ChipId = usize;

impl Operation {
    pub const COUNT: usize = Operation::FmRxOverA3dp as usize + 1;

    /// Iterates over every operation, in declaration order
    pub fn all() -> impl Iterator<Item = Operation> {
        (0..Self::COUNT).filter_map(Operation::from_usize)
    }

    /// Name used in configuration files and logs
    pub fn name(&self) -> &'static str {
        match self {
            Operation::FmTx => "FM_TX",
            Operation::FmRx => "FM_RX",
            Operation::A3dp => "A3DP",
            Operation::BtVoice => "BT_VOICE",
            Operation::Wbs => "WBS",
            Operation::Awbs => "AWBS",
            Operation::FmRxOverSco => "FM_RX_OVER_SCO",
            Operation::FmRxOverA3dp => "FM_RX_OVER_A3DP",
        }
    }
}

impl Resource {
    pub const COUNT: usize = Resource::FmCore as usize + 1;

    pub fn all() -> impl Iterator<Item = Resource> {
        (0..Self::COUNT).filter_map(Resource::from_usize)
    }

    pub fn is_external(&self) -> bool {
        *self <= Resource::FmAnalog
    }

    pub fn name(&self) -> &'static str {
        match self {
            Resource::I2sh => "I2SH",
            Resource::Pcmh => "PCMH",
            Resource::PcmFrame1 => "PCM_FRAME_1",
            Resource::PcmFrame2 => "PCM_FRAME_2",
            Resource::PcmFrame3 => "PCM_FRAME_3",
            Resource::PcmFrame4 => "PCM_FRAME_4",
            Resource::PcmFrame5 => "PCM_FRAME_5",
            Resource::PcmFrame6 => "PCM_FRAME_6",
            Resource::FmAnalog => "FM_ANALOG",
            Resource::PcmIf => "PCM_IF",
            Resource::FmIf => "FM_IF",
            Resource::Cortex => "CORTEX",
            Resource::FmCore => "FM_CORE",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Name that does not match any operation or resource
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown name \"{0}\"")]
pub struct UnknownName(pub String);

impl FromStr for Operation {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Operation::all()
            .find(|op| op.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownName(s.to_string()))
    }
}

impl FromStr for Resource {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Resource::all()
            .find(|res| res.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownName(s.to_string()))
    }
}

/// Opaque per-resource parameters, handed through to the chip layer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceProperties {
    pub values: Vec<u32>,
}

/// Digital audio parameters of an operation, handed through to the chip layer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DigitalConfig {
    /// Sample rate in Hz, 0 when not relevant to the operation
    pub sample_rate: u32,
    pub channels: u8,
    /// FM carrier in kHz for FM operations
    pub fm_frequency_khz: Option<u32>,
}

/// Lifecycle state of an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OperationState {
    #[default]
    Idle,
    Starting,
    Running,
    Stopping,
}

/// Event reported to the clients of an operation on completion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Started,
    Stopped,
    ResourceChanged,
    ConfigurationChanged,
}

/// Non failing outcome of a client request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The request is fulfilled
    Done,
    /// The request goes on in the chip, completion is reported to the callbacks
    Pending,
}
