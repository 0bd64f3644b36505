use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SliceError>;

/// Why a slicing run did not produce a [`crate::slice::SliceSet`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SliceError {
    /// Bad caller input: a non-positive layer height or an empty mesh.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    /// Position or index data that can't describe triangles.
    #[error("geometry error: {0}")]
    Geometry(String),
    /// A newer run was started before this one finished.
    #[error("slicing run was superseded by a newer run")]
    Superseded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidParameter,
    Geometry,
    Superseded,
}

impl SliceError {
    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::InvalidParameter(message.into())
    }

    pub fn geometry(message: impl Into<String>) -> Self {
        Self::Geometry(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidParameter(_) => ErrorKind::InvalidParameter,
            Self::Geometry(_) => ErrorKind::Geometry,
            Self::Superseded => ErrorKind::Superseded,
        }
    }
}
