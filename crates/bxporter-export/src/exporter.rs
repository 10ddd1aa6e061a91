//! Export orchestration
//!
//! An export runs in two stages: the collection walk and the encode. The
//! encoder writes into an in-memory buffer; the sink only sees bytes once
//! both stages have succeeded, so a failed export never leaves a partial
//! file behind.

use std::io::Write;

use bxporter_core::{Error, Result, ResultExt};
use bxporter_scene::Scene;
use serde::Serialize;
use tracing::info;

use crate::bx::BxEncoder;
use crate::bxon::BxonEncoder;
use crate::collect::{Collection, SectionCounts};
use crate::logging::instrument_stage;
use crate::options::{ExportFormat, ExportOptions};

/// Trait for output formats
pub trait Encoder {
    /// Short format name for logs
    fn name(&self) -> &'static str;

    /// File extension without the dot
    fn extension(&self) -> &'static str;

    /// Encode a finished collection into `out`
    fn encode(&self, collection: &Collection<'_>, out: &mut Vec<u8>) -> Result<()>;
}

/// Encoder for `format`
pub fn encoder_for(format: ExportFormat) -> Box<dyn Encoder> {
    match format {
        ExportFormat::Bx => Box::new(BxEncoder),
        ExportFormat::Bxon => Box::new(BxonEncoder),
    }
}

/// What a successful export produced
#[derive(Debug, Clone, Serialize)]
pub struct ExportSummary {
    pub format: ExportFormat,
    pub counts: SectionCounts,
    /// Bytes handed to the sink
    pub bytes: usize,
}

/// Runs collection and encoding for one scene
#[derive(Debug, Clone, Default)]
pub struct Exporter {
    options: ExportOptions,
}

impl Exporter {
    pub fn new(options: ExportOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ExportOptions {
        &self.options
    }

    /// Export `scene` into `sink`
    pub fn export<W: Write>(&self, scene: &Scene, mut sink: W) -> Result<ExportSummary> {
        let (bytes, counts) = self.run(scene)?;
        sink.write_all(&bytes)
            .and_then(|()| sink.flush())
            .map_err(Error::from)
            .context("writing output")?;

        let summary = ExportSummary {
            format: self.options.format,
            counts,
            bytes: bytes.len(),
        };
        info!(format = %summary.format, bytes = summary.bytes, "Export finished");
        Ok(summary)
    }

    /// Export `scene` into a fresh buffer
    pub fn export_to_vec(&self, scene: &Scene) -> Result<Vec<u8>> {
        self.run(scene).map(|(bytes, _)| bytes)
    }

    fn run(&self, scene: &Scene) -> Result<(Vec<u8>, SectionCounts)> {
        let report = self.options.report_timers;
        let encoder = encoder_for(self.options.format);

        let collection = instrument_stage("collect", report, || {
            Collection::collect(scene, &self.options)
        })
        .context("collecting scene")?;

        let mut out = Vec::new();
        instrument_stage(encoder.name(), report, || encoder.encode(&collection, &mut out))
            .with_context(|| format!("encoding {}", encoder.extension()))?;
        Ok((out, collection.counts()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bxporter_scene::{Object, ObjectData};

    struct FailingSink;

    impl Write for FailingSink {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_encoder_for_format() {
        assert_eq!(encoder_for(ExportFormat::Bx).extension(), "bx");
        assert_eq!(encoder_for(ExportFormat::Bxon).extension(), "bxon");
    }

    #[test]
    fn test_empty_scene_exports_header_only() {
        let scene = Scene::default();
        let mut out = Vec::new();
        let summary = Exporter::default().export(&scene, &mut out).unwrap();

        assert_eq!(summary.bytes, out.len());
        assert_eq!(summary.counts, SectionCounts::default());
        // magic string, version and eight counts
        assert_eq!(out.len(), 4 + 6 + 4 + 8 * 4);
    }

    #[test]
    fn test_failed_collect_writes_nothing() {
        let scene = Scene {
            objects: vec![Object::new("Broken", ObjectData::Mesh("Nowhere".into()))],
            ..Default::default()
        };
        let mut out = Vec::new();
        let err = Exporter::default().export(&scene, &mut out).unwrap_err();

        assert!(err.is_reference_not_found());
        assert!(out.is_empty());
    }

    #[test]
    fn test_sink_error_is_io() {
        let scene = Scene::default();
        let err = Exporter::default().export(&scene, FailingSink).unwrap_err();
        assert!(matches!(err.root_cause(), Error::Io(_)));
    }
}
