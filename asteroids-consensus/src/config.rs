use std::ffi::OsStr;
use std::fs::read_to_string;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use asteroids_core::models::SequenceSource;

use crate::hit::LEGACY_IDENTITY_VERSION;

/// Data release assumed when a config does not name one.
pub const DEFAULT_DATA_VERSION: u32 = LEGACY_IDENTITY_VERSION;

///
/// Optional post-processing passes. The greedy acceptance pass and
/// identifier assignment always run.
///
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct PassSelection {
    pub fill_gaps: bool,
    pub extend_regions: bool,
    pub add_linkers: bool,
    pub add_unmatched: bool,
}

impl Default for PassSelection {
    fn default() -> Self {
        PassSelection {
            fill_gaps: true,
            extend_regions: true,
            add_linkers: true,
            add_unmatched: true,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ConsensusConfig {
    pub max_overlap: usize,
    pub min_gap_length: usize,
    pub max_extension: usize,
    pub max_linker_size: usize,
    pub min_unmatched_length: usize,
    pub sid_prefix: String,
    pub source: SequenceSource,
    pub data_version: u32,
    pub passes: PassSelection,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        ConsensusConfig {
            max_overlap: 20,
            min_gap_length: 10,
            max_extension: 10,
            max_linker_size: 10,
            min_unmatched_length: 30,
            sid_prefix: "e".to_string(),
            source: SequenceSource::Seqres,
            data_version: DEFAULT_DATA_VERSION,
            passes: PassSelection::default(),
        }
    }
}

#[derive(Error, Debug)]
pub enum ConsensusConfigError {
    #[error("Missing or invalid file extension in consensus config file. It must be `toml`")]
    InvalidFileType,
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Toml(#[from] toml::de::Error),
}

impl TryFrom<&Path> for ConsensusConfig {
    type Error = ConsensusConfigError;

    fn try_from(path: &Path) -> Result<Self, Self::Error> {
        if path.extension().and_then(OsStr::to_str) != Some("toml") {
            return Err(ConsensusConfigError::InvalidFileType);
        }
        let toml_str = read_to_string(path)?;
        let config = toml::from_str(&toml_str)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use std::io::Write;
    use std::path::PathBuf;

    #[rstest]
    fn test_try_from_toml() {
        let path = PathBuf::from("../tests/data/consensus/consensus.toml");
        let config = ConsensusConfig::try_from(path.as_path()).unwrap();

        assert_eq!(config.max_overlap, 5);
        assert_eq!(config.source, SequenceSource::Atom);
        assert_eq!(config.data_version, 11);
        assert_eq!(config.passes.add_linkers, false);
        // untouched fields keep their defaults
        assert_eq!(config.min_gap_length, 10);
        assert_eq!(config.sid_prefix, "e");
        assert_eq!(config.passes.fill_gaps, true);
    }

    #[rstest]
    fn test_empty_file_gives_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(b"").unwrap();
        let config = ConsensusConfig::try_from(file.path()).unwrap();
        assert_eq!(config, ConsensusConfig::default());
    }

    #[rstest]
    fn test_round_trip_through_toml() {
        let mut config = ConsensusConfig::default();
        config.sid_prefix = "d".to_string();
        config.passes.add_unmatched = false;

        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(toml::to_string(&config).unwrap().as_bytes()).unwrap();

        assert_eq!(ConsensusConfig::try_from(file.path()).unwrap(), config);
    }

    #[rstest]
    fn test_invalid_extension() {
        let path = PathBuf::from("consensus.yaml");
        let result = ConsensusConfig::try_from(path.as_path());
        assert_eq!(matches!(result, Err(ConsensusConfigError::InvalidFileType)), true);
    }

    #[rstest]
    fn test_invalid_toml() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(b"max_overlap = \"five\"").unwrap();
        let result = ConsensusConfig::try_from(file.path());
        assert_eq!(matches!(result, Err(ConsensusConfigError::Toml(_))), true);
    }
}
