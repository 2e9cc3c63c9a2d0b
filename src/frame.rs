use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, Result};

/// Bytes per pixel in the engine's frame buffer (RGBA, one byte each).
pub const CHANNELS: usize = 4;

/// Decoded frame: row-major RGBA pixels with components in `[0, 1)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PixelGrid {
    width: u32,
    height: u32,
    pixels: Vec<[f32; 4]>,
}

/// Size of the frame buffer the engine writes for a `width x height` frame.
/// Fails when that size does not fit in memory addressing.
pub fn buffer_len(width: u32, height: u32) -> Result<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|pixels| pixels.checked_mul(CHANNELS))
        .ok_or_else(|| {
            BridgeError::InvalidInput(format!("frame size {width}x{height} is too large"))
        })
}

/// Converts the engine's interleaved RGBA bytes into floating point pixels.
///
/// Each byte is divided by 256, so a full channel decodes to `255/256`.
/// Rows come out in the same order the engine wrote them.
pub fn decode(buffer: &[u8], width: u32, height: u32) -> Result<PixelGrid> {
    let expected = buffer_len(width, height)?;
    if buffer.len() != expected {
        return Err(BridgeError::FrameSize {
            expected,
            actual: buffer.len(),
        });
    }
    let pixels = buffer
        .chunks_exact(CHANNELS)
        .map(|px| {
            [
                px[0] as f32 / 256.0,
                px[1] as f32 / 256.0,
                px[2] as f32 / 256.0,
                px[3] as f32 / 256.0,
            ]
        })
        .collect();
    Ok(PixelGrid {
        width,
        height,
        pixels,
    })
}

impl PixelGrid {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[[f32; 4]] {
        &self.pixels
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[f32; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }

    /// Reverses row order, for hosts whose images start at the bottom row.
    pub fn flip_vertical(&mut self) {
        let width = self.width as usize;
        if width == 0 {
            return;
        }
        let rows = self.pixels.len() / width;
        for row in 0..rows / 2 {
            let mirror = rows - 1 - row;
            let (head, tail) = self.pixels.split_at_mut(mirror * width);
            head[row * width..(row + 1) * width].swap_with_slice(&mut tail[..width]);
        }
    }

    /// Re-quantizes to 8-bit RGBA. Exact inverse of [`decode`].
    pub fn to_rgba8(&self) -> Vec<u8> {
        self.pixels
            .iter()
            .flat_map(|px| px.map(|c| (c * 256.0).clamp(0.0, 255.0) as u8))
            .collect()
    }
}
