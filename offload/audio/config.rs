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

//! Configuration file of the audio resource manager
//!
//! The file is an ini file, listing the operations and the external resources
//! enabled on the platform, and for each operation, the optional resources
//! it can use and the default one:
//!
//! ```ini
//! [operations]
//! number_of_operations = 2
//! operations = BT_VOICE, A3DP
//!
//! [resources]
//! number_of_resources = 2
//! resources = PCMH, I2SH
//!
//! [mapping.A3DP]
//! number_of_possible_resources = 2
//! resources = PCMH, I2SH
//! default_resource = PCMH
//! ```
//!
//! Names are only resolved by the engines, so that unknown names are
//! reported as invalid configurations along with the chip capabilities.

use crate::error::VacError;
use configparser::ini::Ini;
use std::path::{Path, PathBuf};
use thiserror::Error;

const OPERATIONS_SECTION: &str = "operations";
const RESOURCES_SECTION: &str = "resources";
const MAPPING_SECTION_PREFIX: &str = "mapping.";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {message}")]
    Read { path: PathBuf, message: String },

    #[error("cannot parse configuration: {0}")]
    Parse(String),

    #[error("missing key `{key}` in [{section}]")]
    MissingKey { section: String, key: String },

    #[error("[{section}] declares {expected} {key}, but lists {found}")]
    CountMismatch { section: String, key: String, expected: u64, found: usize },
}

impl From<ConfigError> for VacError {
    fn from(e: ConfigError) -> Self {
        VacError::InvalidConfiguration(e.to_string())
    }
}

/// Optional resources of an operation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingConfig {
    pub operation: String,
    /// Possible optional resources, by order of preference
    pub resources: Vec<String>,
    pub default_resource: Option<String>,
}

/// Parsed configuration source, names are not resolved yet
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VacConfig {
    pub operations: Vec<String>,
    pub resources: Vec<String>,
    pub mappings: Vec<MappingConfig>,
}

impl VacConfig {
    /// Configuration used when the platform does not provide any file
    pub fn builtin() -> Self {
        fn mapping(operation: &str, resources: &[&str], default: Option<&str>) -> MappingConfig {
            MappingConfig {
                operation: operation.to_string(),
                resources: resources.iter().map(|s| s.to_string()).collect(),
                default_resource: default.map(str::to_string),
            }
        }

        let fm_resources = ["PCMH", "I2SH", "FM_ANALOG"];
        Self {
            operations: ["BT_VOICE", "A3DP", "FM_RX", "FM_TX", "FM_RX_OVER_SCO", "FM_RX_OVER_A3DP"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            resources: fm_resources.iter().map(|s| s.to_string()).collect(),
            mappings: vec![
                mapping("BT_VOICE", &["PCMH"], Some("PCMH")),
                mapping("A3DP", &["PCMH", "I2SH"], Some("PCMH")),
                mapping("FM_RX", &fm_resources, Some("FM_ANALOG")),
                mapping("FM_TX", &fm_resources, Some("FM_ANALOG")),
                mapping("FM_RX_OVER_SCO", &[], None),
                mapping("FM_RX_OVER_A3DP", &[], None),
            ],
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Read { path: path.to_path_buf(), message: e.to_string() })?;
        log::info!("Loading audio configuration from {}", path.display());
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let mut ini = Ini::new_cs();
        ini.read(text.to_string()).map_err(ConfigError::Parse)?;

        let operations =
            counted_list(&ini, OPERATIONS_SECTION, "number_of_operations", "operations")?;
        let resources = counted_list(&ini, RESOURCES_SECTION, "number_of_resources", "resources")?;

        let mut sections: Vec<String> = ini
            .sections()
            .into_iter()
            .filter(|s| s.starts_with(MAPPING_SECTION_PREFIX))
            .collect();
        sections.sort();

        let mut mappings = Vec::with_capacity(sections.len());
        for section in sections {
            let operation = section[MAPPING_SECTION_PREFIX.len()..].trim().to_string();
            let resources =
                counted_list(&ini, &section, "number_of_possible_resources", "resources")?;
            let default_resource = ini
                .get(&section, "default_resource")
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty());
            mappings.push(MappingConfig { operation, resources, default_resource });
        }

        Ok(Self { operations, resources, mappings })
    }

    pub fn mapping(&self, operation: &str) -> Option<&MappingConfig> {
        self.mappings.iter().find(|m| m.operation.eq_ignore_ascii_case(operation))
    }
}

/// Reads a comma separated list, checked against the count declared aside
fn counted_list(
    ini: &Ini,
    section: &str,
    count_key: &str,
    list_key: &str,
) -> Result<Vec<String>, ConfigError> {
    let expected = ini
        .getuint(section, count_key)
        .map_err(ConfigError::Parse)?
        .ok_or_else(|| ConfigError::MissingKey {
            section: section.to_string(),
            key: count_key.to_string(),
        })?;

    let list: Vec<String> = ini
        .get(section, list_key)
        .unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    if list.len() as u64 != expected {
        return Err(ConfigError::CountMismatch {
            section: section.to_string(),
            key: list_key.to_string(),
            expected,
            found: list.len(),
        });
    }
    Ok(list)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BUILTIN_INI: &str = "
[operations]
number_of_operations = 6
operations = BT_VOICE, A3DP, FM_RX, FM_TX, FM_RX_OVER_SCO, FM_RX_OVER_A3DP

[resources]
number_of_resources = 3
resources = PCMH, I2SH, FM_ANALOG

[mapping.BT_VOICE]
number_of_possible_resources = 1
resources = PCMH
default_resource = PCMH

[mapping.A3DP]
number_of_possible_resources = 2
resources = PCMH, I2SH
default_resource = PCMH

[mapping.FM_RX]
number_of_possible_resources = 3
resources = PCMH, I2SH, FM_ANALOG
default_resource = FM_ANALOG

[mapping.FM_TX]
number_of_possible_resources = 3
resources = PCMH, I2SH, FM_ANALOG
default_resource = FM_ANALOG

[mapping.FM_RX_OVER_SCO]
number_of_possible_resources = 0

[mapping.FM_RX_OVER_A3DP]
number_of_possible_resources = 0
";

    #[test]
    fn parse_builtin_equivalent() {
        let config = VacConfig::parse(BUILTIN_INI).unwrap();
        let builtin = VacConfig::builtin();

        assert_eq!(config.operations, builtin.operations);
        assert_eq!(config.resources, builtin.resources);
        assert_eq!(config.mappings.len(), builtin.mappings.len());
        for expected in &builtin.mappings {
            assert_eq!(config.mapping(&expected.operation), Some(expected));
        }
    }

    #[test]
    fn count_mismatch() {
        let text = "
[operations]
number_of_operations = 2
operations = BT_VOICE

[resources]
number_of_resources = 0
";
        match VacConfig::parse(text) {
            Err(ConfigError::CountMismatch { expected: 2, found: 1, .. }) => (),
            other => panic!("Unexpected result {:?}", other),
        }
    }

    #[test]
    fn missing_count() {
        let text = "
[operations]
operations = BT_VOICE
";
        assert!(matches!(VacConfig::parse(text), Err(ConfigError::MissingKey { .. })));
    }

    #[test]
    fn config_error_is_invalid_configuration() {
        let e = VacConfig::load("/nonexistent/vac.ini").unwrap_err();
        assert!(matches!(VacError::from(e), VacError::InvalidConfiguration(_)));
    }
}
