use std::fmt;

use serde::{Deserialize, Serialize};

use crate::identity::UserId;
use crate::ticket::RequestId;

/// Data types delivered as vector features unless configured otherwise.
pub const DEFAULT_VECTOR_DATA_TYPES: &[&str] = &["potholes"];

/// File format of a produced artifact.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactFormat {
    /// Vector features (point/line detections).
    GeoJson,
    /// Raster imagery, the fallback for every other data type.
    GeoTiff,
}

impl ArtifactFormat {
    /// Map a requested data type onto an artifact format.
    ///
    /// Total: anything not in `vector_types` (including a missing data type)
    /// falls through to [`ArtifactFormat::GeoTiff`]. Matching is exact.
    pub fn for_data_type<S: AsRef<str>>(data_type: Option<&str>, vector_types: &[S]) -> Self {
        match data_type {
            Some(dt) if vector_types.iter().any(|v| v.as_ref() == dt) => Self::GeoJson,
            _ => Self::GeoTiff,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::GeoJson => "geojson",
            Self::GeoTiff => "tif",
        }
    }
}

/// URL-shaped location where a request's artifact is expected to appear.
///
/// Built deterministically from the storage base, the owning user, the
/// request ticket, and the artifact format. Nothing here checks that the
/// artifact exists.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultRef(String);

impl ResultRef {
    /// `<base>/<user>/<request>.<ext>`; a trailing `/` on `base` is ignored.
    pub fn build(base: &str, user: &UserId, request: &RequestId, format: ArtifactFormat) -> Self {
        let base = base.trim_end_matches('/');
        Self(format!("{base}/{user}/{request}.{}", format.extension()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ResultRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResultRef({})", self.0)
    }
}

impl fmt::Display for ResultRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
