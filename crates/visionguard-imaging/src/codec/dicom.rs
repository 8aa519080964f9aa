// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// DICOM codec via dicom-rs.
//
// Decoding renders frame 0 of the pixel data. Encoding writes a minimal
// Secondary Capture object: new Study/Series/SOP Instance UIDs, modality "OT"
// (Other), placeholder patient fields, and 8-bit RGB pixel data in Explicit VR
// Little Endian. No attribute of the source object is carried over, so the
// redacted file cannot leak header PHI.

use std::path::Path;

use chrono::Utc;
use dicom_core::{DataElement, PrimitiveValue, VR};
use dicom_dictionary_std::{tags, uids};
use dicom_object::{FileMetaTableBuilder, InMemDicomObject, open_file};
use dicom_pixeldata::PixelDecoder;
use image::DynamicImage;
use tracing::{debug, info};
use uuid::Uuid;
use visionguard_core::{Result, VisionGuardError};

const PLACEHOLDER_PATIENT_NAME: &str = "ANONYMIZED^PATIENT";
const PLACEHOLDER_PATIENT_ID: &str = "ANON0000";
const MODALITY_OTHER: &str = "OT";

/// Read a DICOM file and render its first frame.
pub fn decode(path: &Path) -> Result<DynamicImage> {
    let obj = open_file(path).map_err(|err| {
        VisionGuardError::Decode(format!("failed to open DICOM {}: {}", path.display(), err))
    })?;
    let pixels = obj.decode_pixel_data().map_err(|err| {
        VisionGuardError::Decode(format!(
            "failed to decode pixel data in {}: {}",
            path.display(),
            err
        ))
    })?;
    let image = pixels.to_dynamic_image(0).map_err(|err| {
        VisionGuardError::Decode(format!(
            "failed to render frame 0 of {}: {}",
            path.display(),
            err
        ))
    })?;
    debug!(
        width = image.width(),
        height = image.height(),
        "DICOM frame rendered"
    );
    Ok(image)
}

/// Write `image` as a new Secondary Capture DICOM file.
pub fn encode(image: &DynamicImage, path: &Path) -> Result<()> {
    let rgb = image.to_rgb8();
    let (width, height) = rgb.dimensions();
    let columns = u16::try_from(width).map_err(|_| too_large(path, width, height))?;
    let rows = u16::try_from(height).map_err(|_| too_large(path, width, height))?;

    let sop_instance_uid = new_uid();
    let today = Utc::now().format("%Y%m%d").to_string();

    let mut obj = InMemDicomObject::new_empty();
    let mut put = |tag, vr, value: PrimitiveValue| {
        obj.put(DataElement::new(tag, vr, value));
    };

    put(
        tags::SOP_CLASS_UID,
        VR::UI,
        PrimitiveValue::from(uids::SECONDARY_CAPTURE_IMAGE_STORAGE),
    );
    put(
        tags::SOP_INSTANCE_UID,
        VR::UI,
        PrimitiveValue::from(sop_instance_uid.as_str()),
    );
    put(tags::STUDY_INSTANCE_UID, VR::UI, PrimitiveValue::from(new_uid().as_str()));
    put(tags::SERIES_INSTANCE_UID, VR::UI, PrimitiveValue::from(new_uid().as_str()));
    put(tags::STUDY_DATE, VR::DA, PrimitiveValue::from(today.as_str()));
    put(tags::MODALITY, VR::CS, PrimitiveValue::from(MODALITY_OTHER));
    put(tags::PATIENT_NAME, VR::PN, PrimitiveValue::from(PLACEHOLDER_PATIENT_NAME));
    put(tags::PATIENT_ID, VR::LO, PrimitiveValue::from(PLACEHOLDER_PATIENT_ID));
    put(tags::SAMPLES_PER_PIXEL, VR::US, PrimitiveValue::from(3_u16));
    put(tags::PHOTOMETRIC_INTERPRETATION, VR::CS, PrimitiveValue::from("RGB"));
    put(tags::PLANAR_CONFIGURATION, VR::US, PrimitiveValue::from(0_u16));
    put(tags::ROWS, VR::US, PrimitiveValue::from(rows));
    put(tags::COLUMNS, VR::US, PrimitiveValue::from(columns));
    put(tags::BITS_ALLOCATED, VR::US, PrimitiveValue::from(8_u16));
    put(tags::BITS_STORED, VR::US, PrimitiveValue::from(8_u16));
    put(tags::HIGH_BIT, VR::US, PrimitiveValue::from(7_u16));
    put(tags::PIXEL_REPRESENTATION, VR::US, PrimitiveValue::from(0_u16));
    put(tags::PIXEL_DATA, VR::OB, PrimitiveValue::from(rgb.into_raw()));

    let meta = FileMetaTableBuilder::new()
        .media_storage_sop_class_uid(uids::SECONDARY_CAPTURE_IMAGE_STORAGE)
        .media_storage_sop_instance_uid(sop_instance_uid.as_str())
        .transfer_syntax(uids::EXPLICIT_VR_LITTLE_ENDIAN);

    let file = obj.with_meta(meta).map_err(|err| {
        VisionGuardError::Persist(format!(
            "failed to build DICOM meta for {}: {}",
            path.display(),
            err
        ))
    })?;
    file.write_to_file(path).map_err(|err| {
        VisionGuardError::Persist(format!(
            "failed to write DICOM {}: {}",
            path.display(),
            err
        ))
    })?;

    info!(path = %path.display(), rows, columns, "DICOM image saved");
    Ok(())
}

/// A fresh UUID-derived UID under the `2.25` root.
fn new_uid() -> String {
    format!("2.25.{}", Uuid::new_v4().as_u128())
}

fn too_large(path: &Path, width: u32, height: u32) -> VisionGuardError {
    VisionGuardError::Persist(format!(
        "{}: {width}x{height} exceeds the DICOM 65535 pixel limit",
        path.display()
    ))
}
