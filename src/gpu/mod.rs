// SPDX-License-Identifier: AGPL-3.0-only

//! GPU compute context for splat training.
//!
//! Creates a wgpu device with `PUSH_CONSTANTS` enabled and provides
//! buffer, pipeline, and dispatch helpers shared by the trainer.
//!
//! ## Adapter selection
//!
//! Set `SPLATFORGE_GPU_ADAPTER` to target a specific GPU:
//!
//! | Value | Behavior |
//! |-------|----------|
//! | `auto` / *(unset)* | Prefer a discrete GPU with `PUSH_CONSTANTS` |
//! | `0`, `1`, … | Select adapter by enumeration index |
//! | substring | Case-insensitive name match (e.g. `"titan"`, `"4070"`) |
//!
//! Use [`GpuContext::enumerate_adapters`] to list available GPUs.
//!
//! ## Module structure
//!
//! - `adapter` — adapter discovery and selection
//! - `buffers` — storage/staging buffer creation, upload, readback
//! - `pipeline` — compute kernel construction with explicit layouts

mod adapter;
mod buffers;
mod pipeline;

pub use adapter::AdapterInfo;
pub use pipeline::{image_workgroups, ComputeKernel};

use crate::error::SplatForgeError;

/// Push constant budget requested from the device. The largest kernel
/// push block (width, height, splat count, plus alignment) fits in 16
/// bytes, which every backend with `PUSH_CONSTANTS` can provide.
pub const MAX_PUSH_CONSTANT_SIZE: u32 = 16;

/// Owns the wgpu device and queue used for training dispatches.
#[must_use]
pub struct GpuContext {
    pub adapter_name: String,
    device: wgpu::Device,
    queue: wgpu::Queue,
}

// ── Core accessors ───────────────────────────────────────────────────

impl GpuContext {
    /// Access the underlying wgpu Device.
    #[must_use]
    pub const fn device(&self) -> &wgpu::Device {
        &self.device
    }

    /// Access the underlying wgpu Queue.
    #[must_use]
    pub const fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }
}

// ── Constructor ──────────────────────────────────────────────────────

impl GpuContext {
    /// Create the GPU device, requesting `PUSH_CONSTANTS`.
    ///
    /// # Errors
    ///
    /// Returns [`SplatForgeError::NoAdapter`] if no adapter is found and
    /// [`SplatForgeError::DeviceCreation`] if the device request fails.
    pub async fn new() -> Result<Self, SplatForgeError> {
        let selected = adapter::select_adapter()?;
        let adapter_info = selected.get_info();

        let required_limits = wgpu::Limits {
            max_push_constant_size: MAX_PUSH_CONSTANT_SIZE,
            ..wgpu::Limits::default()
        };

        let (device, queue) = selected
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("splatforge training device"),
                    required_features: wgpu::Features::PUSH_CONSTANTS,
                    required_limits,
                    memory_hints: wgpu::MemoryHints::default(),
                },
                None,
            )
            .await
            .map_err(|e| SplatForgeError::DeviceCreation(e.to_string()))?;

        Ok(Self {
            adapter_name: adapter_info.name,
            device,
            queue,
        })
    }

    /// Blocking constructor for synchronous callers (binaries, tests).
    ///
    /// # Errors
    ///
    /// Same as [`Self::new`]; also surfaces tokio runtime construction
    /// failure as [`SplatForgeError::DeviceCreation`].
    pub fn new_blocking() -> Result<Self, SplatForgeError> {
        let rt = tokio::runtime::Builder::new_current_thread()
            .build()
            .map_err(|e| SplatForgeError::DeviceCreation(format!("tokio runtime: {e}")))?;
        rt.block_on(Self::new())
    }

    /// Enumerate all available GPU adapters.
    #[must_use]
    pub fn enumerate_adapters() -> Vec<AdapterInfo> {
        adapter::enumerate_adapters()
    }

    /// Print device capabilities.
    pub fn print_info(&self) {
        println!("  GPU: {}", self.adapter_name);
    }

    /// Print all available adapters to stdout.
    pub fn print_available_adapters() {
        let adapters = Self::enumerate_adapters();
        println!("  Available GPU adapters:");
        for info in &adapters {
            let marker = if info.has_push_constants { "✓" } else { "✗" };
            println!("    {marker} {info}");
        }
        if adapters.is_empty() {
            println!("    (none found)");
        }
    }

    /// Drain a validation error scope pushed before resource creation.
    ///
    /// # Errors
    ///
    /// Returns [`SplatForgeError::PipelineBuild`] carrying the driver's
    /// validation message if the scope caught one.
    pub(crate) fn pop_build_error(&self, what: &str) -> Result<(), SplatForgeError> {
        let rt = tokio::runtime::Builder::new_current_thread()
            .build()
            .map_err(|e| SplatForgeError::PipelineBuild(format!("tokio runtime: {e}")))?;
        match rt.block_on(self.device.pop_error_scope()) {
            None => Ok(()),
            Some(e) => Err(SplatForgeError::PipelineBuild(format!("{what}: {e}"))),
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    #[ignore = "requires GPU"]
    fn device_creation_succeeds() {
        let gpu = GpuContext::new_blocking().expect("GPU context");
        assert!(!gpu.adapter_name.is_empty());
    }

    #[test]
    fn enumerate_adapters_does_not_panic() {
        // May be empty on headless CI; must not panic either way.
        let _ = GpuContext::enumerate_adapters();
    }
}
