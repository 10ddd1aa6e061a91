//! Export configuration

use serde::{Deserialize, Serialize};

/// Output file format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Flat fixed-schema records
    #[default]
    Bx,
    /// Self-describing typed tree
    Bxon,
}

impl ExportFormat {
    /// File extension without the dot
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Bx => "bx",
            ExportFormat::Bxon => "bxon",
        }
    }

    /// Guess the format from a file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "bx" => Some(ExportFormat::Bx),
            "bxon" => Some(ExportFormat::Bxon),
            _ => None,
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// Options controlling an export
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    /// Output format
    pub format: ExportFormat,
    /// Skip animation curves on unknown properties instead of failing
    pub skip_unknown_channels: bool,
    /// Flatten and write animation tracks
    pub export_animation: bool,
    /// Report per-stage timings at info level
    pub report_timers: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            format: ExportFormat::Bx,
            skip_unknown_channels: true,
            export_animation: true,
            report_timers: true,
        }
    }
}

impl ExportOptions {
    /// Default options writing `format`
    pub fn with_format(format: ExportFormat) -> Self {
        Self {
            format,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(ExportFormat::from_extension("bx"), Some(ExportFormat::Bx));
        assert_eq!(ExportFormat::from_extension(".BXON"), Some(ExportFormat::Bxon));
        assert_eq!(ExportFormat::from_extension("gltf"), None);
    }

    #[test]
    fn test_options_default() {
        let options = ExportOptions::default();
        assert_eq!(options.format, ExportFormat::Bx);
        assert!(options.skip_unknown_channels);
        assert!(options.export_animation);
    }
}
