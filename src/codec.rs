//! LSB bit-packing codec over RGB pixel grids.
//!
//! Each pixel carries one 7-bit character code `b6..b0`:
//!
//! ```text
//! red   : .......b6
//! green : .....b5b4b3
//! blue  : .....b2b1b0
//! ```
//!
//! Characters are written to pixels in row-major order (`i = x + y * width`).
//! The plain codec writes no terminator or length, so the caller transmits the
//! payload length out of band. The framed variant prefixes the payload with a
//! fixed-width length header encoded the same way.
//!
//! Only 7 bits per character survive: a code `c >= 128` is extracted as
//! `c % 128`.

use crate::error::Error;

/// One RGB pixel, channels in `[r, g, b]` order.
pub type Rgb = [u8; 3];

const RED_MASK: u8 = 0b0000_0001;
const GREEN_MASK: u8 = 0b0000_0111;
const BLUE_MASK: u8 = 0b0000_0111;

/// Number of pixels used by the length header of the framed layout.
pub const LENGTH_HEADER_CHARS: usize = 4;

/// Largest payload the framed length header can describe (28 bits).
pub const MAX_FRAMED_LENGTH: usize = (1 << (7 * LENGTH_HEADER_CHARS)) - 1;

/// A rectangular RGB raster, stored row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelGrid {
    width: u32,
    height: u32,
    pixels: Vec<Rgb>,
}

impl PixelGrid {
    /// A grid where every pixel has the same color.
    pub fn filled(width: u32, height: u32, color: Rgb) -> Self {
        Self {
            width,
            height,
            pixels: vec![color; width as usize * height as usize],
        }
    }

    /// Build a grid from interleaved `RGBRGB...` bytes.
    pub fn from_raw(width: u32, height: u32, raw: Vec<u8>) -> Result<Self, Error> {
        let expected = width as usize * height as usize * 3;
        if raw.len() != expected {
            return Err(Error::InvalidDimensions {
                width,
                height,
                len: raw.len(),
            });
        }
        let pixels = raw.chunks_exact(3).map(|c| [c[0], c[1], c[2]]).collect();
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Interleaved `RGBRGB...` bytes, row-major.
    pub fn into_raw(self) -> Vec<u8> {
        self.pixels.into_iter().flatten().collect()
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel_count(&self) -> usize {
        self.pixels.len()
    }

    /// Pixel at `(x, y)`, or `None` outside the grid.
    pub fn get(&self, x: u32, y: u32) -> Option<Rgb> {
        self.index(x, y).map(|i| self.pixels[i])
    }

    /// Overwrite the pixel at `(x, y)`. Returns `false` outside the grid.
    pub fn set(&mut self, x: u32, y: u32, rgb: Rgb) -> bool {
        match self.index(x, y) {
            Some(i) => {
                self.pixels[i] = rgb;
                true
            }
            None => false,
        }
    }

    fn index(&self, x: u32, y: u32) -> Option<usize> {
        if x < self.width && y < self.height {
            Some(x as usize + y as usize * self.width as usize)
        } else {
            None
        }
    }
}

/// Number of characters the plain layout can hold.
pub fn capacity(grid: &PixelGrid) -> usize {
    grid.pixel_count()
}

/// Number of payload characters the framed layout can hold.
pub fn framed_capacity(grid: &PixelGrid) -> usize {
    grid.pixel_count()
        .saturating_sub(LENGTH_HEADER_CHARS)
        .min(MAX_FRAMED_LENGTH)
}

/// Pack a 7-bit code into a pixel, keeping the untouched high bits.
fn pack(pixel: Rgb, code: u8) -> Rgb {
    let [r, g, b] = pixel;
    [
        (r & !RED_MASK) | ((code >> 6) & RED_MASK),
        (g & !GREEN_MASK) | ((code >> 3) & GREEN_MASK),
        (b & !BLUE_MASK) | (code & BLUE_MASK),
    ]
}

fn unpack(pixel: Rgb) -> u8 {
    let [r, g, b] = pixel;
    ((r & RED_MASK) << 6) | ((g & GREEN_MASK) << 3) | (b & BLUE_MASK)
}

/// Character code reduced to the 7 bits the layout carries.
fn char_code(c: char) -> u8 {
    (u32::from(c) & 0x7f) as u8
}

/// Hide `payload` in a copy of `grid`.
///
/// # Errors
///
/// [`Error::CapacityExceeded`] if the payload has more characters than the
/// grid has pixels.
pub fn embed(grid: &PixelGrid, payload: &str) -> Result<PixelGrid, Error> {
    let mut out = grid.clone();
    embed_in_place(&mut out, payload)?;
    Ok(out)
}

/// Hide `payload` directly in `grid`. The grid is left untouched on error.
pub fn embed_in_place(grid: &mut PixelGrid, payload: &str) -> Result<(), Error> {
    let codes: Vec<u8> = payload.chars().map(char_code).collect();
    write_codes(grid, 0, &codes)
}

/// Hide raw bytes, one per pixel. Bit 7 of each byte is discarded.
pub fn embed_bytes(grid: &PixelGrid, payload: &[u8]) -> Result<PixelGrid, Error> {
    let mut out = grid.clone();
    write_codes(&mut out, 0, payload)?;
    Ok(out)
}

fn write_codes(grid: &mut PixelGrid, offset: usize, codes: &[u8]) -> Result<(), Error> {
    let available = grid.pixel_count().saturating_sub(offset);
    if codes.len() > available {
        return Err(Error::CapacityExceeded {
            required: codes.len(),
            available,
        });
    }
    for (pixel, &code) in grid.pixels[offset..].iter_mut().zip(codes) {
        *pixel = pack(*pixel, code);
    }
    Ok(())
}

fn read_codes(grid: &PixelGrid, offset: usize, length: usize) -> Result<Vec<u8>, Error> {
    let available = grid.pixel_count().saturating_sub(offset);
    if length > available {
        return Err(Error::OutOfRange {
            requested: length,
            available,
        });
    }
    Ok(grid.pixels[offset..offset + length]
        .iter()
        .map(|&p| unpack(p))
        .collect())
}

/// Recover `length` characters from the first pixels of `grid`.
///
/// # Errors
///
/// [`Error::OutOfRange`] if `length` exceeds the number of pixels.
pub fn extract(grid: &PixelGrid, length: usize) -> Result<String, Error> {
    let codes = read_codes(grid, 0, length)?;
    Ok(codes.into_iter().map(char::from).collect())
}

/// Recover `length` raw 7-bit codes.
pub fn extract_bytes(grid: &PixelGrid, length: usize) -> Result<Vec<u8>, Error> {
    read_codes(grid, 0, length)
}

/// Hide `payload` behind a fixed-width length header.
///
/// Layout: `LENGTH_HEADER_CHARS` base-128 digits (most significant first),
/// then the payload characters.
pub fn embed_framed(grid: &PixelGrid, payload: &str) -> Result<PixelGrid, Error> {
    let codes: Vec<u8> = payload.chars().map(char_code).collect();
    let available = framed_capacity(grid);
    if codes.len() > available {
        return Err(Error::CapacityExceeded {
            required: codes.len(),
            available,
        });
    }
    let mut out = grid.clone();
    write_codes(&mut out, 0, &encode_length(codes.len()))?;
    write_codes(&mut out, LENGTH_HEADER_CHARS, &codes)?;
    Ok(out)
}

/// Recover a payload written by [`embed_framed`].
///
/// # Errors
///
/// [`Error::OutOfRange`] if the grid is smaller than the header or the header
/// announces more characters than the grid holds.
pub fn extract_framed(grid: &PixelGrid) -> Result<String, Error> {
    let header = read_codes(grid, 0, LENGTH_HEADER_CHARS)?;
    let length = decode_length(&header);
    let codes = read_codes(grid, LENGTH_HEADER_CHARS, length)?;
    Ok(codes.into_iter().map(char::from).collect())
}

fn encode_length(length: usize) -> [u8; LENGTH_HEADER_CHARS] {
    let mut digits = [0u8; LENGTH_HEADER_CHARS];
    for (i, digit) in digits.iter_mut().rev().enumerate() {
        *digit = ((length >> (7 * i)) & 0x7f) as u8;
    }
    digits
}

fn decode_length(digits: &[u8]) -> usize {
    digits
        .iter()
        .fold(0usize, |acc, &d| (acc << 7) | usize::from(d & 0x7f))
}
