//! Local QR synthesis for the fallback path
//!
//! Output is deterministic for a given input and settings: black modules on
//! white, `border` modules of white margin, scaled to a fixed square canvas,
//! PNG encoded.

use crate::error::QrError;
use gafetes_common::QrSettings;
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageBuffer, ImageFormat, Luma};
use qrcode::{EcLevel, QrCode};
use std::io::Cursor;

const WHITE: Luma<u8> = Luma([255]);

/// Largest natural or target image side, in pixels
const MAX_SIDE: u32 = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QrGenerator {
    /// Pixels per module before scaling
    pub module_size: u32,
    /// White margin in modules
    pub border: u32,
    /// Side of the final square image in pixels
    pub canvas_size: u32,
}

impl QrGenerator {
    pub fn from_settings(settings: &QrSettings) -> Self {
        Self {
            module_size: settings.module_size,
            border: settings.border,
            canvas_size: settings.canvas_size,
        }
    }

    /// Encode `data` as a PNG QR image
    pub fn generate(&self, data: &str) -> Result<Vec<u8>, QrError> {
        let code = QrCode::with_error_correction_level(data.as_bytes(), EcLevel::L)
            .map_err(|e| QrError::Generation(data.to_string(), e.to_string()))?;

        let side = u32::try_from(code.width())
            .ok()
            .and_then(|width| {
                self.border
                    .checked_mul(2)?
                    .checked_add(width)?
                    .checked_mul(self.module_size)
            })
            .filter(|side| *side <= MAX_SIDE)
            .ok_or_else(|| {
                QrError::Generation(
                    data.to_string(),
                    format!(
                        "module size {} with border {} exceeds {} px",
                        self.module_size, self.border, MAX_SIDE
                    ),
                )
            })?;

        let modules = code
            .render::<Luma<u8>>()
            .quiet_zone(false)
            .module_dimensions(self.module_size, self.module_size)
            .build();

        // Step 1: pad with the white border
        let margin = self.border * self.module_size;
        let mut canvas = ImageBuffer::from_pixel(side, side, WHITE);
        imageops::overlay(&mut canvas, &modules, i64::from(margin), i64::from(margin));

        // Step 2: scale to the fixed canvas when the natural size differs
        let canvas = if side == self.canvas_size {
            canvas
        } else {
            imageops::resize(&canvas, self.canvas_size, self.canvas_size, FilterType::Lanczos3)
        };

        // Step 3: PNG encode
        let mut png = Cursor::new(Vec::new());
        DynamicImage::ImageLuma8(canvas)
            .write_to(&mut png, ImageFormat::Png)
            .map_err(|e| QrError::Generation(data.to_string(), e.to_string()))?;

        Ok(png.into_inner())
    }
}

impl Default for QrGenerator {
    fn default() -> Self {
        Self::from_settings(&QrSettings::default())
    }
}
