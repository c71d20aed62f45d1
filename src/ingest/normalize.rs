use anyhow::{anyhow, Result};
use image::{imageops, RgbImage};

use super::Rotation;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum PixelFormat {
    Rgb24,
    Yuyv,
}

pub(crate) fn normalize_to_rgb(
    pixels: &[u8],
    width: u32,
    height: u32,
    format: PixelFormat,
) -> Result<Vec<u8>> {
    match format {
        PixelFormat::Rgb24 => {
            let expected = width
                .checked_mul(height)
                .and_then(|v| v.checked_mul(3))
                .ok_or_else(|| anyhow!("RGB frame dimensions overflow"))? as usize;
            // Drivers may pad the last buffer; anything short is a torn frame.
            if pixels.len() < expected {
                return Err(anyhow!(
                    "RGB frame length mismatch: expected {}, got {}",
                    expected,
                    pixels.len()
                ));
            }
            Ok(pixels[..expected].to_vec())
        }
        PixelFormat::Yuyv => yuyv_to_rgb(pixels, width, height),
    }
}

fn yuyv_to_rgb(pixels: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let w = width as usize;
    let h = height as usize;
    if w % 2 != 0 {
        return Err(anyhow!("YUYV frame width must be even, got {}", w));
    }
    let pixel_count = w
        .checked_mul(h)
        .ok_or_else(|| anyhow!("YUYV frame dimensions overflow"))?;
    let expected = pixel_count * 2;
    if pixels.len() < expected {
        return Err(anyhow!(
            "YUYV frame length mismatch: expected {}, got {}",
            expected,
            pixels.len()
        ));
    }

    let mut rgb = vec![0u8; pixel_count * 3];
    for (pair, chunk) in pixels[..expected].chunks_exact(4).enumerate() {
        let u = chunk[1] as f32 - 128.0;
        let v = chunk[3] as f32 - 128.0;
        for (k, y) in [chunk[0], chunk[2]].into_iter().enumerate() {
            let y = y as f32;
            let r = y + 1.402_f32 * v;
            let g = y - 0.344_136_f32 * u - 0.714_136_f32 * v;
            let b = y + 1.772_f32 * u;

            let offset = (pair * 2 + k) * 3;
            rgb[offset] = clamp_to_u8(r);
            rgb[offset + 1] = clamp_to_u8(g);
            rgb[offset + 2] = clamp_to_u8(b);
        }
    }

    Ok(rgb)
}

/// Rotate clockwise by the configured camera rotation.
pub(crate) fn rotate(image: RgbImage, rotation: Rotation) -> RgbImage {
    match rotation {
        Rotation::None => image,
        Rotation::Cw90 => imageops::rotate90(&image),
        Rotation::Cw180 => imageops::rotate180(&image),
        Rotation::Cw270 => imageops::rotate270(&image),
    }
}

/// Apply a brightness setting in `0..=100`, 50 being neutral.
pub(crate) fn apply_brightness(image: &mut RgbImage, brightness: u8) {
    if brightness == 50 {
        return;
    }
    let offset = (brightness.min(100) as f32 - 50.0) * (255.0 / 50.0);
    for channel in image.iter_mut() {
        *channel = clamp_to_u8(*channel as f32 + offset);
    }
}

fn clamp_to_u8(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}
