// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Action dispatcher — maps (detector kind, action) to a redaction transform
// and a persistence step.
//
// | Detector  | Outline | Mask | Burn | Export | Flag |
// |-----------|---------|------|------|--------|------|
// | Geometric |   yes   | yes  | yes  |  yes   | yes  |
// | FreeText  |   no    |  no  |  no  |  yes   | yes  |
//
// Outline, mask and burn overwrite `<output>/<original file name>`, so a DICOM
// source is re-encoded as DICOM. Export writes `<stem>_<millis>.png` plus a
// `.txt` sidecar into the export directory. Flag writes a watermarked copy into
// the quarantine directory. Free-text outputs carry the detector name so they
// never overwrite the geometric detector's files.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use chrono::Utc;
use image::DynamicImage;
use tracing::{debug, info, instrument};
use visionguard_core::{Action, DetectorKind, Destinations, Result, TextRegion, VisionGuardError};
use visionguard_imaging::{Watermark, codec, redact};

use crate::detection::DetectionResult;

/// Whether a detector of `kind` can carry out `action`.
pub fn supports(kind: DetectorKind, action: Action) -> bool {
    match kind {
        DetectorKind::Geometric => true,
        DetectorKind::FreeText => matches!(
            action,
            Action::ExportWithMetadata | Action::FlagForReview
        ),
    }
}

/// Applies redaction actions and writes the results to their destinations.
pub struct ActionDispatcher {
    destinations: Destinations,
    watermark: Watermark,
}

impl ActionDispatcher {
    pub fn new(destinations: Destinations, watermark: Watermark) -> Self {
        Self {
            destinations,
            watermark,
        }
    }

    /// Run `action` for a detector of `kind` and return every file written.
    ///
    /// An unsupported pair is rejected before anything touches the disk.
    #[instrument(skip(self, result), fields(detector = result.detector()))]
    pub fn dispatch(
        &self,
        kind: DetectorKind,
        action: Action,
        result: &DetectionResult<'_>,
        original_name: &str,
    ) -> Result<Vec<PathBuf>> {
        if !supports(kind, action) {
            return Err(VisionGuardError::UnsupportedAction {
                detector: result.detector().to_string(),
                action,
            });
        }

        let buffer = result.image();
        let regions = result.regions().unwrap_or(&[]);
        let written = match action {
            Action::Outline => {
                self.save_redacted(&redact::outline(buffer.image(), regions), original_name)?
            }
            Action::Mask => self.save_redacted(&redact::mask(buffer.image(), regions), original_name)?,
            Action::Burn => self.save_redacted(
                &redact::burn(buffer.image(), regions, buffer.kind()),
                original_name,
            )?,
            Action::ExportWithMetadata => self.export(kind, result, original_name)?,
            Action::FlagForReview => self.quarantine(kind, result, original_name)?,
        };

        info!(files = written.len(), "Action applied");
        Ok(written)
    }

    fn save_redacted(&self, image: &DynamicImage, original_name: &str) -> Result<Vec<PathBuf>> {
        ensure_dir(&self.destinations.output)?;
        let path = self.destinations.output.join(original_name);
        codec::encode(image, &path)?;
        Ok(vec![path])
    }

    fn export(
        &self,
        kind: DetectorKind,
        result: &DetectionResult<'_>,
        original_name: &str,
    ) -> Result<Vec<PathBuf>> {
        let dir = &self.destinations.export;
        ensure_dir(dir)?;

        let base = format!(
            "{}_{}",
            output_stem(kind, result.detector(), original_name),
            Utc::now().timestamp_millis()
        );
        let image_path = dir.join(format!("{base}.png"));
        let sidecar_path = dir.join(format!("{base}.txt"));

        codec::encode(result.image().image(), &image_path)?;
        std::fs::write(&sidecar_path, sidecar_text(result)).map_err(|err| {
            VisionGuardError::Persist(format!(
                "failed to write metadata {}: {err}",
                sidecar_path.display()
            ))
        })?;

        debug!(image = %image_path.display(), metadata = %sidecar_path.display(), "Exported");
        Ok(vec![image_path, sidecar_path])
    }

    fn quarantine(
        &self,
        kind: DetectorKind,
        result: &DetectionResult<'_>,
        original_name: &str,
    ) -> Result<Vec<PathBuf>> {
        let dir = &self.destinations.quarantine;
        ensure_dir(dir)?;

        let stem = output_stem(kind, result.detector(), original_name);
        let file_name = match Path::new(original_name).extension() {
            Some(ext) => format!("{stem}.{}", ext.to_string_lossy()),
            None => stem,
        };
        let path = dir.join(file_name);
        codec::encode(&self.watermark.stamp(result.image().image()), &path)?;
        Ok(vec![path])
    }
}

/// The sidecar body: one line per region, or the raw response when the
/// detector has no geometry.
pub fn sidecar_text(result: &DetectionResult<'_>) -> String {
    match result.regions() {
        Some(regions) => {
            let mut out = String::new();
            for region in regions {
                let _ = writeln!(out, "{}", metadata_line(region));
            }
            out
        }
        None => result.raw_text().unwrap_or_default().to_string(),
    }
}

fn metadata_line(region: &TextRegion) -> String {
    format!(
        "Text: '{}', Bounding Box: [x: {}, y: {}, width: {}, height: {}]",
        region.text().trim(),
        region.x(),
        region.y(),
        region.width(),
        region.height()
    )
}

fn output_stem(kind: DetectorKind, detector: &str, original_name: &str) -> String {
    let stem = Path::new(original_name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| original_name.to_string());
    match kind {
        DetectorKind::Geometric => stem,
        DetectorKind::FreeText => format!("{stem}_{detector}"),
    }
}

fn ensure_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).map_err(|err| {
        VisionGuardError::Persist(format!("cannot create directory {}: {err}", dir.display()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use visionguard_imaging::PixelBuffer;

    const BACKGROUND: Rgba<u8> = Rgba([220, 220, 220, 255]);

    fn buffer() -> PixelBuffer {
        PixelBuffer::raster(DynamicImage::ImageRgba8(RgbaImage::from_pixel(40, 30, BACKGROUND)))
    }

    fn destinations(root: &Path) -> Destinations {
        Destinations {
            output: root.join("out"),
            export: root.join("export"),
            quarantine: root.join("out").join("quarantine"),
        }
    }

    fn dispatcher(root: &Path) -> ActionDispatcher {
        ActionDispatcher::new(destinations(root), Watermark::without_font())
    }

    fn regions() -> Vec<TextRegion> {
        vec![TextRegion::new(5, 5, 10, 10, "Jane Roe").unwrap()]
    }

    #[test]
    fn free_text_rejects_geometric_actions() {
        let dir = tempfile::tempdir().unwrap();
        let buf = buffer();
        let result = DetectionResult::with_text(&buf, "ollama", "Jane Roe");
        for action in [Action::Outline, Action::Mask, Action::Burn] {
            let err = dispatcher(dir.path())
                .dispatch(DetectorKind::FreeText, action, &result, "scan.png")
                .unwrap_err();
            assert!(matches!(err, VisionGuardError::UnsupportedAction { .. }));
            assert!(!err.is_fatal());
        }
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn mask_overwrites_output_with_original_name() {
        let dir = tempfile::tempdir().unwrap();
        let buf = buffer();
        let result = DetectionResult::with_regions(&buf, "ocrs", regions());

        let written = dispatcher(dir.path())
            .dispatch(DetectorKind::Geometric, Action::Mask, &result, "scan.png")
            .unwrap();

        assert_eq!(written, vec![dir.path().join("out/scan.png")]);
        let saved = image::open(&written[0]).unwrap().to_rgba8();
        assert_eq!(*saved.get_pixel(7, 7), redact::MASK_COLOR);
        assert_eq!(*saved.get_pixel(30, 20), BACKGROUND);
    }

    #[test]
    fn export_writes_png_and_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let buf = buffer();
        let result = DetectionResult::with_regions(&buf, "ocrs", regions());

        let written = dispatcher(dir.path())
            .dispatch(DetectorKind::Geometric, Action::ExportWithMetadata, &result, "scan.jpg")
            .unwrap();

        assert_eq!(written.len(), 2);
        let png = &written[0];
        assert_eq!(png.parent().unwrap(), dir.path().join("export"));
        let name = png.file_name().unwrap().to_string_lossy();
        assert!(name.starts_with("scan_") && name.ends_with(".png"), "{name}");

        let sidecar = std::fs::read_to_string(&written[1]).unwrap();
        assert_eq!(
            sidecar,
            "Text: 'Jane Roe', Bounding Box: [x: 5, y: 5, width: 10, height: 10]\n"
        );
    }

    #[test]
    fn sidecar_trims_region_text() {
        let buf = buffer();
        let padded = vec![TextRegion::new(1, 2, 30, 8, "  MRN 00123 \n").unwrap()];
        let result = DetectionResult::with_regions(&buf, "ocrs", padded);
        assert_eq!(
            sidecar_text(&result),
            "Text: 'MRN 00123', Bounding Box: [x: 1, y: 2, width: 30, height: 8]\n"
        );
    }

    #[test]
    fn free_text_export_keeps_raw_response_and_detector_name() {
        let dir = tempfile::tempdir().unwrap();
        let buf = buffer();
        let result = DetectionResult::with_text(&buf, "ollama", "Jane Roe\nDOB 01/02/1970");

        let written = dispatcher(dir.path())
            .dispatch(DetectorKind::FreeText, Action::ExportWithMetadata, &result, "scan.png")
            .unwrap();

        let name = written[0].file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("scan_ollama_"), "{name}");
        assert_eq!(
            std::fs::read_to_string(&written[1]).unwrap(),
            "Jane Roe\nDOB 01/02/1970"
        );
    }

    #[test]
    fn flag_stamps_copy_into_quarantine() {
        let dir = tempfile::tempdir().unwrap();
        let buf = buffer();
        let result = DetectionResult::with_regions(&buf, "ocrs", regions());

        let written = dispatcher(dir.path())
            .dispatch(DetectorKind::Geometric, Action::FlagForReview, &result, "scan.png")
            .unwrap();

        assert_eq!(written, vec![dir.path().join("out/quarantine/scan.png")]);
        let saved = image::open(&written[0]).unwrap().to_rgba8();
        assert_ne!(*saved.get_pixel(20, 15), BACKGROUND);
        assert!(!dir.path().join("out/scan.png").exists());
    }

    #[test]
    fn free_text_flag_does_not_clobber_geometric_copy() {
        let dir = tempfile::tempdir().unwrap();
        let buf = buffer();
        let result = DetectionResult::with_text(&buf, "ollama", "Jane Roe");

        let written = dispatcher(dir.path())
            .dispatch(DetectorKind::FreeText, Action::FlagForReview, &result, "scan.png")
            .unwrap();
        assert_eq!(written, vec![dir.path().join("out/quarantine/scan_ollama.png")]);
    }

    #[test]
    fn outline_with_no_regions_saves_identical_pixels() {
        let dir = tempfile::tempdir().unwrap();
        let buf = buffer();
        let result = DetectionResult::with_regions(&buf, "ocrs", Vec::new());

        let written = dispatcher(dir.path())
            .dispatch(DetectorKind::Geometric, Action::Outline, &result, "scan.png")
            .unwrap();
        let saved = image::open(&written[0]).unwrap().to_rgba8();
        assert_eq!(saved.as_raw(), buf.image().to_rgba8().as_raw());
    }
}
