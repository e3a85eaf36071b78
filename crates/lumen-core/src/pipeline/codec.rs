//! Encoded-image boundary: decoding photos into pixel buffers and
//! re-encoding results into the same container format.

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, ImageReader, RgbaImage};
use std::io::Cursor;

use crate::error::CodecError;
use crate::types::PixelBuffer;

/// Decode encoded image bytes into an RGBA pixel buffer.
///
/// The container format is detected from the content, not from any file
/// name, and is returned alongside the buffer so the result can be
/// re-encoded into the same format.
pub fn decode(bytes: &[u8]) -> Result<(PixelBuffer, ImageFormat), CodecError> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| CodecError::Decode(format!("cannot detect image format: {e}")))?;
    let format = reader
        .format()
        .ok_or_else(|| CodecError::Decode("unrecognized image format".to_string()))?;
    let image = reader
        .decode()
        .map_err(|e| CodecError::Decode(e.to_string()))?;

    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();
    Ok((
        PixelBuffer {
            width,
            height,
            data: rgba.into_raw(),
        },
        format,
    ))
}

/// Re-encode a pixel buffer into `format`.
///
/// JPEG output uses the fixed `jpeg_quality` and drops the alpha channel,
/// since the format has none. Other formats are written with their default
/// encoder settings.
pub fn encode(
    buffer: &PixelBuffer,
    format: ImageFormat,
    jpeg_quality: u8,
) -> Result<Vec<u8>, CodecError> {
    let image = RgbaImage::from_raw(buffer.width, buffer.height, buffer.data.clone())
        .ok_or_else(|| CodecError::Encode("pixel buffer does not match its dimensions".to_string()))?;

    let mut out = Cursor::new(Vec::new());
    match format {
        ImageFormat::Jpeg => {
            let rgb = DynamicImage::ImageRgba8(image).to_rgb8();
            let encoder = JpegEncoder::new_with_quality(&mut out, jpeg_quality);
            rgb.write_with_encoder(encoder)
                .map_err(|e| CodecError::Encode(e.to_string()))?;
        }
        _ => {
            DynamicImage::ImageRgba8(image)
                .write_to(&mut out, format)
                .map_err(|e| CodecError::Encode(e.to_string()))?;
        }
    }
    Ok(out.into_inner())
}
