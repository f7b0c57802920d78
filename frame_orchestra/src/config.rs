/// Frame orchestration configuration

use crate::graphics_device::TextureFormat;
use crate::log::{self, LogSeverity};

/// How `ResourceManager::validate()` reports an unwired requirement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationMode {
    /// Return `Error::ResourceGraphNotValid` (development builds)
    Strict,
    /// Log a warning and return `Ok(false)` (release builds)
    Lenient,
}

/// Order in which `Graph::execute()` walks its passes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionOrder {
    /// Insertion order, exactly as registered
    Registration,
    /// Producers before consumers along resource links, ties broken by
    /// registration order
    Dependency,
}

/// Configuration shared by the graph, the framebuffers and the pipeline
#[derive(Debug, Clone)]
pub struct OrchestraConfig {
    /// Validation reporting mode
    pub validation: ValidationMode,
    /// Pass execution order
    pub execution_order: ExecutionOrder,
    /// Maximum depth of the framebuffer bind stack
    pub max_bind_depth: usize,
    /// Color written by `Framebuffer::clear_targets()`
    pub clear_color: [f32; 4],
    /// Depth written by `Framebuffer::clear_targets()`
    pub clear_depth: f32,
    /// Sample count of the pipeline's geometry buffers (1 = no MSAA)
    pub msaa_samples: u32,
    /// Color format of pipeline buffers
    pub color_format: TextureFormat,
    /// Depth format of pipeline geometry buffers
    pub depth_format: TextureFormat,
    /// Minimum severity forwarded to the logger by `apply_logging()`
    pub log_level: LogSeverity,
}

impl OrchestraConfig {
    /// Push `log_level` to the process-wide logger
    pub fn apply_logging(&self) {
        log::set_min_severity(self.log_level);
    }
}

impl Default for OrchestraConfig {
    fn default() -> Self {
        Self {
            validation: if cfg!(debug_assertions) {
                ValidationMode::Strict
            } else {
                ValidationMode::Lenient
            },
            execution_order: ExecutionOrder::Registration,
            max_bind_depth: 10,
            clear_color: [0.1, 0.1, 0.1, 1.0],
            clear_depth: 1.0,
            msaa_samples: 4,
            color_format: TextureFormat::R16G16B16A16_SFLOAT,
            depth_format: TextureFormat::D32_FLOAT,
            log_level: if cfg!(debug_assertions) {
                LogSeverity::Debug
            } else {
                LogSeverity::Info
            },
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
