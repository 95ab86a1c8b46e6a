use image::DynamicImage;
use std::io::Cursor;
use thiserror::Error;

use rangelens_core::CropRegion;

#[derive(Debug, Error)]
pub enum CropError {
    #[error("Failed to decode source image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("Crop region {region} does not fit a {width}x{height} source")]
    OutOfBounds {
        region: CropRegion,
        width: u32,
        height: u32,
    },
    #[error("Failed to encode cropped image: {0}")]
    Encode(String),
}

/// Cuts `region` out of an encoded source image (any format the `image`
/// crate decodes) and returns the cut as grayscale PNG bytes ready for
/// recognition.
///
/// A region reaching past the frame is an error: the caller sees the
/// mismatch instead of a silently clipped crop. The source is never
/// modified.
pub fn crop_to_png(data: &[u8], region: CropRegion) -> Result<Vec<u8>, CropError> {
    let img = image::load_from_memory(data)?;
    if !region.fits_within(img.width(), img.height()) {
        return Err(CropError::OutOfBounds {
            region,
            width: img.width(),
            height: img.height(),
        });
    }

    let cut = img.crop_imm(region.x, region.y, region.width, region.height);

    // Single-channel input recognizes better than photographed color.
    encode_png(DynamicImage::ImageLuma8(cut.to_luma8()))
}

fn encode_png(img: DynamicImage) -> Result<Vec<u8>, CropError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| CropError::Encode(e.to_string()))?;
    Ok(buf)
}
