// SPDX-License-Identifier: AGPL-3.0-only

//! GPU adapter discovery and selection.
//!
//! Runtime capability probing with no hardcoded GPU assumptions. The
//! adapter is selected by environment variable or auto-detected,
//! preferring discrete hardware that reports `PUSH_CONSTANTS`.

/// Summary of a discovered GPU adapter.
#[derive(Debug, Clone)]
pub struct AdapterInfo {
    /// Enumeration index (stable within a single run).
    pub index: usize,
    /// Adapter name as reported by the driver.
    pub name: String,
    /// Driver name (e.g. `"NVIDIA"`, `"radv"`, `"llvmpipe"`).
    pub driver: String,
    /// Whether `PUSH_CONSTANTS` is supported (required by all kernels).
    pub has_push_constants: bool,
    /// Adapter device type (discrete, integrated, software, etc.).
    pub device_type: wgpu::DeviceType,
}

impl std::fmt::Display for AdapterInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let pc_tag = if self.has_push_constants {
            "push-const"
        } else {
            "no-push-const"
        };
        let kind = match self.device_type {
            wgpu::DeviceType::DiscreteGpu => "discrete",
            wgpu::DeviceType::IntegratedGpu => "integrated",
            wgpu::DeviceType::VirtualGpu => "virtual",
            wgpu::DeviceType::Cpu => "cpu",
            wgpu::DeviceType::Other => "other",
        };
        write!(
            f,
            "[{}] {} ({}, {}, {})",
            self.index, self.name, self.driver, kind, pc_tag
        )
    }
}

/// Create a wgpu instance with the backend configured via `SPLATFORGE_WGPU_BACKEND`.
pub fn create_instance() -> wgpu::Instance {
    let backends = match std::env::var("SPLATFORGE_WGPU_BACKEND").as_deref() {
        Ok("vulkan") => wgpu::Backends::VULKAN,
        Ok("metal") => wgpu::Backends::METAL,
        Ok("dx12") => wgpu::Backends::DX12,
        _ => wgpu::Backends::all(),
    };
    wgpu::Instance::new(wgpu::InstanceDescriptor {
        backends,
        ..Default::default()
    })
}

/// Enumerate all available GPU adapters.
///
/// Use the `index` field with `SPLATFORGE_GPU_ADAPTER=<index>` to target
/// a specific GPU.
#[must_use]
pub fn enumerate_adapters() -> Vec<AdapterInfo> {
    let instance = create_instance();
    instance
        .enumerate_adapters(wgpu::Backends::all())
        .into_iter()
        .enumerate()
        .map(|(i, adapter)| {
            let info = adapter.get_info();
            let features = adapter.features();
            AdapterInfo {
                index: i,
                name: info.name.clone(),
                driver: info.driver.clone(),
                has_push_constants: features.contains(wgpu::Features::PUSH_CONSTANTS),
                device_type: info.device_type,
            }
        })
        .collect()
}

/// Select an adapter based on the `SPLATFORGE_GPU_ADAPTER` environment
/// variable (empty/"auto", an index, or a case-insensitive name
/// substring). Falls back to auto-detection.
///
/// # Errors
///
/// Returns [`crate::error::SplatForgeError`] if no compatible adapter is found.
pub fn select_adapter() -> Result<wgpu::Adapter, crate::error::SplatForgeError> {
    let selector = std::env::var("SPLATFORGE_GPU_ADAPTER")
        .unwrap_or_default()
        .trim()
        .to_lowercase();

    let instance = create_instance();
    let adapters: Vec<wgpu::Adapter> = instance.enumerate_adapters(wgpu::Backends::all());
    if adapters.is_empty() {
        return Err(crate::error::SplatForgeError::NoAdapter);
    }

    if selector.is_empty() || selector == "auto" {
        auto_select(adapters)
    } else if let Ok(idx) = selector.parse::<usize>() {
        select_by_index_or_name(adapters, idx, &selector)
    } else {
        select_by_name(adapters, &selector)
    }
}

fn auto_select(
    adapters: Vec<wgpu::Adapter>,
) -> Result<wgpu::Adapter, crate::error::SplatForgeError> {
    let mut chosen: Option<wgpu::Adapter> = None;
    let mut fallback: Option<wgpu::Adapter> = None;
    for a in adapters {
        if a.features().contains(wgpu::Features::PUSH_CONSTANTS) {
            if a.get_info().device_type == wgpu::DeviceType::DiscreteGpu && chosen.is_none() {
                chosen = Some(a);
            } else if fallback.is_none() {
                fallback = Some(a);
            }
        }
    }
    chosen
        .or(fallback)
        .ok_or(crate::error::SplatForgeError::NoAdapter)
}

fn select_by_index_or_name(
    adapters: Vec<wgpu::Adapter>,
    idx: usize,
    selector: &str,
) -> Result<wgpu::Adapter, crate::error::SplatForgeError> {
    if idx < adapters.len() {
        adapters
            .into_iter()
            .nth(idx)
            .ok_or(crate::error::SplatForgeError::NoAdapter)
    } else {
        adapters
            .into_iter()
            .find(|a| a.get_info().name.to_ascii_lowercase().contains(selector))
            .ok_or_else(|| {
                crate::error::SplatForgeError::DeviceCreation(format!(
                    "No adapter matching '{selector}' (tried as index {idx} and name)"
                ))
            })
    }
}

fn select_by_name(
    adapters: Vec<wgpu::Adapter>,
    selector: &str,
) -> Result<wgpu::Adapter, crate::error::SplatForgeError> {
    adapters
        .into_iter()
        .find(|a| a.get_info().name.to_ascii_lowercase().contains(selector))
        .ok_or_else(|| {
            crate::error::SplatForgeError::DeviceCreation(format!(
                "No adapter matching '{selector}'"
            ))
        })
}
