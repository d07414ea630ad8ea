// SPDX-License-Identifier: GPL-3.0-only

//! Code scanner for the QR scan mode
//!
//! Decodes QR codes with `rqrr` and EAN-13 barcodes with `rxing` from RGBA
//! preview frames. Frames larger than `max_dimension` are downscaled to a
//! luminance plane first. Results are only reported; the screen does not
//! change state because of them.

use crate::backends::camera::types::CameraFrame;
use rxing::common::HybridBinarizer;
use rxing::{
    BarcodeFormat, BinaryBitmap, DecodeHintValue, DecodeHints, Exceptions, Luma8LuminanceSource,
    MultiFormatReader, Reader,
};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::{trace, warn};

/// Recognized encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Symbology {
    Qr,
    Ean13,
}

impl fmt::Display for Symbology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Symbology::Qr => write!(f, "QR"),
            Symbology::Ean13 => write!(f, "EAN-13"),
        }
    }
}

/// One decoded code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedCode {
    pub symbology: Symbology,
    pub value: String,
}

impl fmt::Display for ScannedCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.symbology, self.value)
    }
}

/// Luminance image handed to the decoders
struct LumaPlane {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct CodeScanner {
    symbologies: HashSet<Symbology>,
    max_dimension: u32,
}

impl Default for CodeScanner {
    fn default() -> Self {
        Self::new([Symbology::Qr, Symbology::Ean13])
    }
}

impl CodeScanner {
    pub fn new(symbologies: impl IntoIterator<Item = Symbology>) -> Self {
        Self {
            symbologies: symbologies.into_iter().collect(),
            max_dimension: 960,
        }
    }

    pub fn with_max_dimension(mut self, max_dimension: u32) -> Self {
        self.max_dimension = max_dimension.max(64);
        self
    }

    pub fn symbologies(&self) -> &HashSet<Symbology> {
        &self.symbologies
    }

    /// Decode off the async runtime
    pub async fn scan_async(&self, frame: Arc<CameraFrame>) -> Vec<ScannedCode> {
        let scanner = self.clone();
        tokio::task::spawn_blocking(move || scanner.scan(&frame))
            .await
            .unwrap_or_else(|e| {
                warn!(error = %e, "Code scan task panicked");
                Vec::new()
            })
    }

    /// Decode every enabled symbology in a frame
    pub fn scan(&self, frame: &CameraFrame) -> Vec<ScannedCode> {
        if frame.width == 0 || frame.height == 0 {
            return Vec::new();
        }
        let start = std::time::Instant::now();
        let plane = self.prepare(frame);
        let mut codes = Vec::new();

        if self.symbologies.contains(&Symbology::Qr) {
            codes.extend(decode_qr(&plane));
        }
        if self.symbologies.contains(&Symbology::Ean13) {
            codes.extend(decode_ean13(&plane));
        }

        trace!(
            width = plane.width,
            height = plane.height,
            found = codes.len(),
            elapsed_ms = start.elapsed().as_millis(),
            "Scanned frame"
        );
        codes
    }

    fn prepare(&self, frame: &CameraFrame) -> LumaPlane {
        let luma = frame.luma();
        let (w, h) = (frame.width, frame.height);
        if w <= self.max_dimension && h <= self.max_dimension {
            return LumaPlane {
                width: w as usize,
                height: h as usize,
                data: luma,
            };
        }
        let scale = (w as f32 / self.max_dimension as f32).max(h as f32 / self.max_dimension as f32);
        let nw = ((w as f32 / scale) as usize).max(1);
        let nh = ((h as f32 / scale) as usize).max(1);
        let mut data = Vec::with_capacity(nw * nh);
        for y in 0..nh {
            let sy = ((y as f32 * scale) as usize).min(h as usize - 1);
            for x in 0..nw {
                let sx = ((x as f32 * scale) as usize).min(w as usize - 1);
                data.push(luma[sy * w as usize + sx]);
            }
        }
        LumaPlane {
            width: nw,
            height: nh,
            data,
        }
    }
}

fn decode_qr(plane: &LumaPlane) -> Vec<ScannedCode> {
    let mut prepared =
        rqrr::PreparedImage::prepare_from_greyscale(plane.width, plane.height, |x, y| {
            plane.data[y * plane.width + x]
        });
    prepared
        .detect_grids()
        .into_iter()
        .filter_map(|grid| match grid.decode() {
            Ok((_meta, content)) => Some(ScannedCode {
                symbology: Symbology::Qr,
                value: content,
            }),
            Err(e) => {
                trace!(error = ?e, "QR grid failed to decode");
                None
            }
        })
        .collect()
}

fn decode_ean13(plane: &LumaPlane) -> Option<ScannedCode> {
    let hints = DecodeHints::default()
        .with(DecodeHintValue::TryHarder(true))
        .with(DecodeHintValue::PossibleFormats(HashSet::from([
            BarcodeFormat::EAN_13,
        ])));

    let source = Luma8LuminanceSource::new(
        plane.data.clone(),
        plane.width as u32,
        plane.height as u32,
    );
    let mut bitmap = BinaryBitmap::new(HybridBinarizer::new(source));
    let mut reader = MultiFormatReader::default();

    match reader.decode_with_hints(&mut bitmap, &hints) {
        Ok(result) => Some(ScannedCode {
            symbology: Symbology::Ean13,
            value: result.getText().to_string(),
        }),
        Err(Exceptions::NotFoundException(_)) => None,
        Err(e) => {
            trace!(error = ?e, "EAN-13 decode failed");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    const L_CODES: [&str; 10] = [
        "0001101", "0011001", "0010011", "0111101", "0100011", "0110001", "0101111", "0111011",
        "0110111", "0001011",
    ];
    const G_CODES: [&str; 10] = [
        "0100111", "0110011", "0011011", "0100001", "0011101", "0111001", "0000101", "0010001",
        "0001001", "0010111",
    ];
    const R_CODES: [&str; 10] = [
        "1110010", "1100110", "1101100", "1000010", "1011100", "1001110", "1010000", "1000100",
        "1001000", "1110100",
    ];
    const PARITY: [&str; 10] = [
        "LLLLLL", "LLGLGG", "LLGGLG", "LLGGGL", "LGLLGG", "LGGLLG", "LGGGLL", "LGLGLG", "LGLGGL",
        "LGGLGL",
    ];

    fn ean13_modules(code: &str) -> String {
        let digits: Vec<usize> = code.bytes().map(|b| (b - b'0') as usize).collect();
        let mut bits = String::from("101");
        for (i, parity) in PARITY[digits[0]].chars().enumerate() {
            let d = digits[i + 1];
            bits.push_str(if parity == 'L' { L_CODES[d] } else { G_CODES[d] });
        }
        bits.push_str("01010");
        for &d in &digits[7..13] {
            bits.push_str(R_CODES[d]);
        }
        bits.push_str("101");
        bits
    }

    fn barcode_frame(code: &str) -> CameraFrame {
        let module = 4u32;
        let quiet = 12u32;
        let modules = ean13_modules(code);
        let width = (modules.len() as u32 + quiet * 2) * module;
        let height = 80u32;
        let mut data = vec![255u8; (width * height * 4) as usize];
        for y in 0..height {
            for (i, bit) in modules.chars().enumerate() {
                if bit != '1' {
                    continue;
                }
                for dx in 0..module {
                    let x = (quiet + i as u32) * module + dx;
                    let idx = ((y * width + x) * 4) as usize;
                    data[idx..idx + 3].copy_from_slice(&[0, 0, 0]);
                }
            }
        }
        CameraFrame {
            width,
            height,
            stride: width * 4,
            data: data.into(),
            captured_at: Instant::now(),
        }
    }

    #[test]
    fn blank_frame_has_no_codes() {
        let frame = CameraFrame {
            width: 64,
            height: 64,
            stride: 256,
            data: vec![200u8; 64 * 256].into(),
            captured_at: Instant::now(),
        };
        assert!(CodeScanner::default().scan(&frame).is_empty());
    }

    #[test]
    fn empty_frame_is_skipped() {
        let frame = CameraFrame {
            width: 0,
            height: 0,
            stride: 0,
            data: Vec::new().into(),
            captured_at: Instant::now(),
        };
        assert!(CodeScanner::default().scan(&frame).is_empty());
    }

    #[test]
    fn decodes_synthetic_ean13() {
        let codes = CodeScanner::new([Symbology::Ean13]).scan(&barcode_frame("4006381333931"));
        assert_eq!(
            codes,
            vec![ScannedCode {
                symbology: Symbology::Ean13,
                value: "4006381333931".into()
            }]
        );
    }

    #[test]
    fn qr_only_scanner_ignores_barcodes() {
        let codes = CodeScanner::new([Symbology::Qr]).scan(&barcode_frame("4006381333931"));
        assert!(codes.is_empty());
    }

    #[test]
    fn display_prefixes_symbology() {
        let code = ScannedCode {
            symbology: Symbology::Qr,
            value: "http://x".into(),
        };
        assert_eq!(code.to_string(), "QR:http://x");
    }

    #[test]
    fn large_frames_are_downscaled() {
        let scanner = CodeScanner::default().with_max_dimension(100);
        let frame = CameraFrame {
            width: 400,
            height: 200,
            stride: 1600,
            data: vec![0u8; 1600 * 200].into(),
            captured_at: Instant::now(),
        };
        let plane = scanner.prepare(&frame);
        assert_eq!((plane.width, plane.height), (100, 50));
        assert_eq!(plane.data.len(), 5000);
    }
}
