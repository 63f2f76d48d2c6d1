//! Compute device selection.

use serde::{Deserialize, Serialize};

/// Where tensors live. Resolved once at startup and passed down
/// explicitly to the model, batchers and loaders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    /// ndarray backend, always available.
    #[default]
    Cpu,

    /// wgpu backend, requires the `wgpu` feature.
    Gpu,
}

impl DeviceKind {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Cpu => "cpu",
            Self::Gpu => "gpu",
        }
    }

    /// Whether this build can run on the device.
    pub const fn is_available(&self) -> bool {
        match self {
            Self::Cpu => true,
            Self::Gpu => cfg!(feature = "wgpu"),
        }
    }
}

impl std::fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_cpu() {
        assert_eq!(DeviceKind::default(), DeviceKind::Cpu);
        assert!(DeviceKind::Cpu.is_available());
    }

    #[test]
    fn test_serde_uses_lowercase_names() {
        assert_eq!(serde_json::to_string(&DeviceKind::Gpu).unwrap(), "\"gpu\"");
        let kind: DeviceKind = serde_json::from_str("\"cpu\"").unwrap();
        assert_eq!(kind, DeviceKind::Cpu);
    }
}
