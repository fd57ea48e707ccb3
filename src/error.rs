// SPDX-License-Identifier: AGPL-3.0-only
//! Error types for splatforge.

use std::fmt;

/// Error type covering GPU setup, pipeline construction, dispatch, and I/O.
#[derive(Debug)]
pub enum SplatForgeError {
    /// No suitable GPU adapter was found on this system.
    NoAdapter,
    /// Adapter was found but device creation failed (missing features/limits).
    DeviceCreation(String),
    /// Shader compilation or compute pipeline construction failed.
    PipelineBuild(String),
    /// A dispatch, readback, or buffer operation failed.
    GpuCompute(String),
    /// Writing an image artifact to disk failed.
    ImageWrite(String),
}

impl fmt::Display for SplatForgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoAdapter => write!(f, "no suitable GPU adapter found"),
            Self::DeviceCreation(msg) => write!(f, "device creation failed: {msg}"),
            Self::PipelineBuild(msg) => write!(f, "pipeline build failed: {msg}"),
            Self::GpuCompute(msg) => write!(f, "GPU compute error: {msg}"),
            Self::ImageWrite(msg) => write!(f, "image write error: {msg}"),
        }
    }
}

impl std::error::Error for SplatForgeError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_no_adapter() {
        let e = SplatForgeError::NoAdapter;
        assert_eq!(format!("{e}"), "no suitable GPU adapter found");
    }

    #[test]
    fn display_pipeline_build() {
        let e = SplatForgeError::PipelineBuild("bad WGSL".into());
        assert!(format!("{e}").contains("bad WGSL"));
    }

    #[test]
    fn display_gpu_compute() {
        let e = SplatForgeError::GpuCompute("map failed".into());
        assert!(format!("{e}").contains("map failed"));
    }
}
