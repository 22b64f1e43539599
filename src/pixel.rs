// src/pixel.rs

//! Pixel and frame types, and the JSON wire shape the device expects.
//!
//! A frame travels to the device as a JSON array of `{"r":..,"g":..,"b":..}`
//! objects in row-major order. An empty array clears the matrix.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors produced while building pixels from user input or decoding payloads.
#[derive(Debug, Error)]
pub enum PixelError {
    #[error("invalid colour '{input}': expected three comma-separated values")]
    BadShape { input: String },
    #[error("invalid colour channel '{value}': must be an integer in 0..=255")]
    ChannelOutOfRange { value: String },
    #[error("malformed frame payload: {0}")]
    Json(#[from] serde_json::Error),
}

/// One RGB value. Channels are 8-bit, so out-of-range values cannot be encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Pixel {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Pixel {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Pixel { r, g, b }
    }
}

impl fmt::Display for Pixel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.r, self.g, self.b)
    }
}

/// Parses `"r,g,b"` (whitespace around values is ignored).
impl FromStr for Pixel {
    type Err = PixelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 3 {
            return Err(PixelError::BadShape {
                input: s.to_string(),
            });
        }
        let channel = |raw: &str| {
            raw.parse::<u8>()
                .map_err(|_| PixelError::ChannelOutOfRange {
                    value: raw.to_string(),
                })
        };
        Ok(Pixel::new(
            channel(parts[0])?,
            channel(parts[1])?,
            channel(parts[2])?,
        ))
    }
}

/// A full set of pixel colours for the matrix, row-major.
///
/// Ownership moves generator -> queue -> transport worker; nothing mutates a
/// frame after it has been handed off.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Frame(Vec<Pixel>);

impl Frame {
    pub fn new(pixels: Vec<Pixel>) -> Self {
        Frame(pixels)
    }

    /// The zero-pixel frame the device interprets as "all pixels off".
    pub fn clear() -> Self {
        Frame(Vec::new())
    }

    /// `count` copies of the same colour.
    pub fn solid(pixel: Pixel, count: usize) -> Self {
        Frame(vec![pixel; count])
    }

    pub fn pixels(&self) -> &[Pixel] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Pixel> for Frame {
    fn from_iter<I: IntoIterator<Item = Pixel>>(iter: I) -> Self {
        Frame(iter.into_iter().collect())
    }
}

/// Serializes a frame into the `/params` body shape.
pub fn encode_frame(frame: &Frame) -> String {
    // A Vec of plain u8 structs cannot fail to serialize.
    serde_json::to_string(frame).unwrap_or_else(|_| String::from("[]"))
}

/// Parses a `/params` body back into a frame. Rejects channels outside 0..=255.
pub fn decode_frame(payload: &str) -> Result<Frame, PixelError> {
    Ok(serde_json::from_str(payload)?)
}
