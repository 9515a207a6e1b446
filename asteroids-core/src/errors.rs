use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RafError {
    #[error("Alignment record is too short ({0} bytes); the header alone needs 38")]
    TruncatedHeader(usize),

    #[error("Alignment record body length {0} is not a multiple of the 7-byte slot width")]
    RaggedBody(usize),

    #[error("Alignment record is not ASCII: {0}")]
    NonAscii(String),

    #[error("Unknown sequence source: {0}")]
    UnknownSource(String),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RegionError {
    #[error("Error parsing region header: {0}")]
    RegionParseError(String),

    #[error("Chain {found:?} in header does not match record chain {expected:?}")]
    ChainMismatch { expected: char, found: char },

    #[error("Residue {0} not found in alignment record")]
    ResidueNotFound(String),

    #[error("Region {0} is empty after translation")]
    EmptyRegion(String),
}
