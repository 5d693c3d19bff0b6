// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scan decoding — raw submission bytes into a grayscale pixel buffer.
//
// A submission is either an encoded image (PNG, JPEG, TIFF, ...) or a
// single-page PDF wrapping the scanned page as an image XObject. Both decode
// to the same `GrayImage` the rectifier consumes.

use image::{DynamicImage, GrayImage, ImageFormat, RgbImage};
use lopdf::{Document, Object};
use schriftwerk_core::error::{Result, SchriftwerkError};
use tracing::{debug, info, instrument};

/// Decode submitted scan bytes into a grayscale buffer.
///
/// PDF detection is by magic header; everything else goes through the image
/// decoder's own format sniffing.
#[instrument(skip(data), fields(data_len = data.len()))]
pub fn decode_scan(data: &[u8]) -> Result<GrayImage> {
    if data.is_empty() {
        return Err(SchriftwerkError::Decode("empty submission".to_string()));
    }

    let image = if data.starts_with(b"%PDF-") {
        decode_pdf_scan(data)?
    } else {
        image::load_from_memory(data)
            .map_err(|err| SchriftwerkError::Decode(format!("not a decodable image: {err}")))?
    };

    info!(
        width = image.width(),
        height = image.height(),
        "Scan decoded"
    );
    Ok(image.into_luma8())
}

/// Pull the largest image XObject out of a scanned-page PDF.
///
/// Scanner output PDFs wrap one full-page raster per page; the largest image
/// stream by pixel count is the page scan. Supports DCTDecode (embedded
/// JPEG) and FlateDecode gray/RGB rasters.
fn decode_pdf_scan(data: &[u8]) -> Result<DynamicImage> {
    let document = Document::load_mem(data)
        .map_err(|err| SchriftwerkError::Decode(format!("failed to load PDF: {err}")))?;

    let mut best: Option<(i64, &lopdf::Stream)> = None;
    for object in document.objects.values() {
        let Object::Stream(stream) = object else {
            continue;
        };
        let is_image = stream
            .dict
            .get(b"Subtype")
            .ok()
            .and_then(|s| s.as_name().ok())
            .is_some_and(|name| name == b"Image");
        if !is_image {
            continue;
        }
        let (Some(width), Some(height)) = (dict_i64(stream, b"Width"), dict_i64(stream, b"Height"))
        else {
            continue;
        };
        let pixels = width * height;
        if best.as_ref().is_none_or(|(area, _)| pixels > *area) {
            best = Some((pixels, stream));
        }
    }

    let Some((_, stream)) = best else {
        return Err(SchriftwerkError::Decode(
            "PDF contains no image XObject".to_string(),
        ));
    };

    let width = dict_i64(stream, b"Width").unwrap_or(0) as u32;
    let height = dict_i64(stream, b"Height").unwrap_or(0) as u32;
    debug!(width, height, "Largest PDF image stream selected");

    if has_filter(stream, b"DCTDecode") {
        // DCTDecode streams are raw JPEG bytes — hand them to the JPEG decoder.
        return image::load_from_memory_with_format(&stream.content, ImageFormat::Jpeg)
            .map_err(|err| SchriftwerkError::Decode(format!("embedded JPEG: {err}")));
    }

    let raw = stream
        .decompressed_content()
        .map_err(|err| SchriftwerkError::Decode(format!("image stream decompression: {err}")))?;

    let expected_gray = (width as usize) * (height as usize);
    if raw.len() >= expected_gray * 3 {
        let rgb = RgbImage::from_raw(width, height, raw[..expected_gray * 3].to_vec())
            .ok_or_else(|| SchriftwerkError::Decode("malformed RGB image stream".to_string()))?;
        Ok(DynamicImage::ImageRgb8(rgb))
    } else if raw.len() >= expected_gray {
        let gray = GrayImage::from_raw(width, height, raw[..expected_gray].to_vec())
            .ok_or_else(|| SchriftwerkError::Decode("malformed gray image stream".to_string()))?;
        Ok(DynamicImage::ImageLuma8(gray))
    } else {
        Err(SchriftwerkError::Decode(format!(
            "image stream too short: {} bytes for {}x{}",
            raw.len(),
            width,
            height
        )))
    }
}

fn dict_i64(stream: &lopdf::Stream, key: &[u8]) -> Option<i64> {
    stream.dict.get(key).ok().and_then(|v| v.as_i64().ok())
}

/// Whether `name` appears in the stream's /Filter entry (name or array form).
fn has_filter(stream: &lopdf::Stream, name: &[u8]) -> bool {
    match stream.dict.get(b"Filter") {
        Ok(Object::Name(n)) => n == name,
        Ok(Object::Array(items)) => items
            .iter()
            .any(|item| item.as_name().is_ok_and(|n| n == name)),
        _ => false,
    }
}
