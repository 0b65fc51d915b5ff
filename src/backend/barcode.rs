//! Barcode detection over page rasters
//!
//! Linear symbologies (EAN/UPC, Code 128, Code 39, ITF, Codabar) and 2D codes
//! (QR, Data Matrix, PDF417, Aztec) are decoded with `rxing`.

use rxing::helpers::detect_multiple_in_luma;
use rxing::Exceptions;
use tracing::debug;

use crate::core::extractor::{BarcodeDetector, BoundingBox, Detection, RasterImage};
use crate::error::BackendError;

/// Finds and decodes every barcode `rxing` can read on a page.
///
/// Symbols that are located but cannot be decoded are not reported.
#[derive(Debug, Default, Clone, Copy)]
pub struct MultiFormatDetector;

impl MultiFormatDetector {
    pub fn new() -> Self {
        Self
    }
}

impl BarcodeDetector for MultiFormatDetector {
    fn detect(&mut self, image: &RasterImage) -> Result<Vec<Detection>, BackendError> {
        let width = u32::try_from(image.width()).map_err(|_| "raster too wide")?;
        let height = u32::try_from(image.height()).map_err(|_| "raster too tall")?;
        if width == 0 || height == 0 {
            return Ok(Vec::new());
        }

        let results = match detect_multiple_in_luma(image.as_bytes().to_vec(), width, height) {
            Ok(results) => results,
            Err(Exceptions::NotFoundException(_)) => return Ok(Vec::new()),
            Err(err) => return Err(format!("barcode decoding failed: {err}").into()),
        };

        let detections = results
            .iter()
            .map(|result| {
                let corners: Vec<(i32, i32)> = result
                    .getPoints()
                    .iter()
                    .map(|point| (point.x.round() as i32, point.y.round() as i32))
                    .collect();
                debug!(format = ?result.getBarcodeFormat(), payload = result.getText(), "Barcode decoded");
                Detection {
                    payload: result.getText().to_string(),
                    bounding_box: bounding_box(&corners),
                }
            })
            .collect();

        Ok(detections)
    }
}

/// Axis-aligned box around the points a decoder reports for a symbol: the
/// corners of a 2D code, or the ends of the scan line through a linear one.
fn bounding_box(corners: &[(i32, i32)]) -> BoundingBox {
    let left = corners.iter().map(|&(x, _)| x).min().unwrap_or(0);
    let right = corners.iter().map(|&(x, _)| x).max().unwrap_or(0);
    let top = corners.iter().map(|&(_, y)| y).min().unwrap_or(0);
    let bottom = corners.iter().map(|&(_, y)| y).max().unwrap_or(0);

    BoundingBox {
        left,
        top,
        width: right - left,
        height: bottom - top,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NARROW: usize = 2;
    const WIDE: usize = 6;
    const QUIET_ZONE: usize = 40;
    const HEIGHT: usize = 40;

    /// Code 39 element widths, nine bits per character (bar first, 1 = wide)
    fn code39_pattern(c: char) -> u16 {
        match c {
            '0' => 0x034,
            '1' => 0x121,
            '2' => 0x061,
            '3' => 0x160,
            '4' => 0x031,
            '5' => 0x130,
            '6' => 0x070,
            '7' => 0x025,
            '8' => 0x124,
            '9' => 0x064,
            '*' => 0x094,
            other => panic!("no Code 39 pattern for {other:?}"),
        }
    }

    /// Draw `digits` as a Code 39 symbol: black bars on white, quiet zones
    /// on both sides.
    fn render_code39(digits: &str) -> RasterImage {
        let mut row = vec![u8::MAX; QUIET_ZONE];
        let symbol = format!("*{digits}*");
        for (idx, c) in symbol.chars().enumerate() {
            if idx > 0 {
                row.extend(std::iter::repeat(u8::MAX).take(NARROW));
            }
            let pattern = code39_pattern(c);
            for element in 0..9 {
                let wide = pattern & (1 << (8 - element)) != 0;
                let shade = if element % 2 == 0 { 0 } else { u8::MAX };
                row.extend(std::iter::repeat(shade).take(if wide { WIDE } else { NARROW }));
            }
        }
        row.extend(std::iter::repeat(u8::MAX).take(QUIET_ZONE));

        let width = row.len();
        let pixels = row.repeat(HEIGHT);
        RasterImage::from_gray(width, HEIGHT, pixels).unwrap()
    }

    #[test]
    fn test_decodes_linear_barcode() {
        let image = render_code39("12345");
        let detections = MultiFormatDetector::new().detect(&image).unwrap();

        assert!(!detections.is_empty());
        assert!(detections.iter().all(|d| d.payload == "12345"));

        let top_left = detections[0].bounding_box.top_left();
        assert!((QUIET_ZONE as i32..QUIET_ZONE as i32 + 40).contains(&top_left.x()));
        assert!((0..HEIGHT as i32).contains(&top_left.y()));
    }

    #[test]
    fn test_bounding_box_of_rotated_quad() {
        let quad = [(50, 10), (90, 50), (50, 90), (10, 50)];
        assert_eq!(
            bounding_box(&quad),
            BoundingBox {
                left: 10,
                top: 10,
                width: 80,
                height: 80
            }
        );
    }

    #[test]
    fn test_bounding_box_of_scan_line() {
        let line = [(55, 20), (240, 20)];
        assert_eq!(
            bounding_box(&line),
            BoundingBox {
                left: 55,
                top: 20,
                width: 185,
                height: 0
            }
        );
    }

    #[test]
    fn test_blank_page_has_no_detections() {
        let blank = RasterImage::from_gray(64, 64, vec![u8::MAX; 64 * 64]).unwrap();
        assert!(MultiFormatDetector::new().detect(&blank).unwrap().is_empty());
    }
}
