//! Portable float map (PFM) images.

use std::path::Path;

use crate::error::SvbrdfError;

/// Largest accepted image side.
const MAX_DIMENSION: u32 = 1 << 14;

/// A CPU-resident float image with 1 or 4 interleaved channels.
#[derive(Debug, Clone, PartialEq)]
pub struct FloatImage {
    pub width: u32,
    pub height: u32,
    pub channels: u32,
    pub pixels: Vec<f32>,
}

impl FloatImage {
    pub fn new(width: u32, height: u32, channels: u32) -> Self {
        Self {
            width,
            height,
            channels,
            pixels: vec![0.0; (width * height * channels) as usize],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Read one channel of one pixel. Coordinates are clamped to the image.
    pub fn sample(&self, x: u32, y: u32, channel: u32) -> f32 {
        if self.is_empty() {
            return 0.0;
        }
        let x = x.min(self.width - 1);
        let y = y.min(self.height - 1);
        let c = channel.min(self.channels - 1);
        self.pixels[((y * self.width + x) * self.channels + c) as usize]
    }

    pub fn set(&mut self, x: u32, y: u32, channel: u32, value: f32) {
        let idx = ((y * self.width + x) * self.channels + channel) as usize;
        self.pixels[idx] = value;
    }

    pub fn size_bytes(&self) -> usize {
        self.pixels.len() * std::mem::size_of::<f32>()
    }
}

struct Header {
    src_channels: u32,
    width: u32,
    height: u32,
    little_endian: bool,
    data_offset: usize,
}

fn invalid(path: &Path, reason: impl Into<String>) -> SvbrdfError {
    SvbrdfError::InvalidPfm {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

/// Split the next whitespace-delimited token from `bytes[*pos..]`.
fn next_token<'a>(bytes: &'a [u8], pos: &mut usize) -> Option<&'a str> {
    while *pos < bytes.len() && bytes[*pos].is_ascii_whitespace() {
        *pos += 1;
    }
    let start = *pos;
    while *pos < bytes.len() && !bytes[*pos].is_ascii_whitespace() {
        *pos += 1;
    }
    if start == *pos {
        return None;
    }
    std::str::from_utf8(&bytes[start..*pos]).ok()
}

fn parse_header(path: &Path, bytes: &[u8]) -> Result<Header, SvbrdfError> {
    let mut pos = 0;
    let src_channels = match next_token(bytes, &mut pos) {
        Some("PF") => 3,
        Some("Pf") => 1,
        _ => return Err(invalid(path, "unexpected magic header")),
    };

    let mut dim = |name: &str| -> Result<u32, SvbrdfError> {
        next_token(bytes, &mut pos)
            .and_then(|t| t.parse::<u32>().ok())
            .ok_or_else(|| invalid(path, format!("unable to determine {name}")))
    };
    let width = dim("width")?;
    let height = dim("height")?;
    if width > MAX_DIMENSION || height > MAX_DIMENSION {
        return Err(invalid(path, format!("dimension too large: {width}x{height}")));
    }

    let scale: f32 = next_token(bytes, &mut pos)
        .and_then(|t| t.parse().ok())
        .ok_or_else(|| invalid(path, "missing scale"))?;

    // Exactly one whitespace byte separates the header from the raster.
    let data_offset = pos + 1;

    Ok(Header {
        src_channels,
        width,
        height,
        little_endian: scale < 0.0,
        data_offset,
    })
}

/// Decode PFM bytes. RGB images are expanded to RGBA with alpha 1.
pub fn decode_pfm(path: &Path, bytes: &[u8]) -> Result<FloatImage, SvbrdfError> {
    let header = parse_header(path, bytes)?;
    let count = (header.width * header.height * header.src_channels) as usize;
    let raster = bytes
        .get(header.data_offset..)
        .filter(|r| r.len() >= count * 4)
        .ok_or_else(|| invalid(path, "ran out of data unexpectedly"))?;

    let values = raster.chunks_exact(4).take(count).map(|b| {
        let b = [b[0], b[1], b[2], b[3]];
        if header.little_endian {
            f32::from_le_bytes(b)
        } else {
            f32::from_be_bytes(b)
        }
    });

    let pixels = if header.src_channels == 3 {
        let src: Vec<f32> = values.collect();
        let mut rgba = Vec::with_capacity(src.len() / 3 * 4);
        for rgb in src.chunks_exact(3) {
            rgba.extend_from_slice(rgb);
            rgba.push(1.0);
        }
        rgba
    } else {
        values.collect()
    };

    Ok(FloatImage {
        width: header.width,
        height: header.height,
        channels: if header.src_channels == 3 { 4 } else { 1 },
        pixels,
    })
}

/// Load a PFM file from disk.
pub fn load_pfm(path: &Path) -> Result<FloatImage, SvbrdfError> {
    let bytes = std::fs::read(path).map_err(|e| SvbrdfError::io(path, e))?;
    let image = decode_pfm(path, &bytes)?;
    log::debug!(
        "Loaded PFM \"{}\" ({}x{}, {} channels)",
        path.display(),
        image.width,
        image.height,
        image.channels
    );
    Ok(image)
}

/// Encode an image as little-endian PFM. Four-channel images drop alpha.
#[cfg(test)]
pub(crate) fn encode_pfm(image: &FloatImage) -> Vec<u8> {
    let magic = if image.channels == 1 { "Pf" } else { "PF" };
    let mut out = format!("{magic}\n{} {}\n-1.0\n", image.width, image.height).into_bytes();
    for px in image.pixels.chunks_exact(image.channels as usize) {
        let used = if image.channels == 1 { 1 } else { 3 };
        for v in &px[..used] {
            out.extend_from_slice(&v.to_le_bytes());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_greyscale_little_endian() {
        let mut bytes = b"Pf\n2 1\n-1.0\n".to_vec();
        bytes.extend_from_slice(&0.25f32.to_le_bytes());
        bytes.extend_from_slice(&0.75f32.to_le_bytes());
        let img = decode_pfm(Path::new("t.pfm"), &bytes).unwrap();
        assert_eq!((img.width, img.height, img.channels), (2, 1, 1));
        assert_eq!(img.sample(1, 0, 0), 0.75);
    }

    #[test]
    fn test_decode_rgb_big_endian_expands_alpha() {
        let mut bytes = b"PF\n1 1\n1.0\n".to_vec();
        for v in [1.0f32, 2.0, 3.0] {
            bytes.extend_from_slice(&v.to_be_bytes());
        }
        let img = decode_pfm(Path::new("t.pfm"), &bytes).unwrap();
        assert_eq!(img.channels, 4);
        assert_eq!(img.pixels, vec![1.0, 2.0, 3.0, 1.0]);
    }

    #[test]
    fn test_truncated_raster_is_rejected() {
        let bytes = b"Pf\n4 4\n-1.0\n\0\0\0\0".to_vec();
        assert!(matches!(
            decode_pfm(Path::new("t.pfm"), &bytes),
            Err(SvbrdfError::InvalidPfm { .. })
        ));
    }

    #[test]
    fn test_bad_magic_is_rejected() {
        assert!(decode_pfm(Path::new("t.pfm"), b"P6\n1 1\n255\n").is_err());
    }

    #[test]
    fn test_encode_then_decode_rgba() {
        let mut img = FloatImage::new(2, 2, 4);
        img.set(1, 1, 0, 0.5);
        img.set(1, 1, 2, 2.0);
        for i in 0..4 {
            img.pixels[i * 4 + 3] = 1.0;
        }
        let back = decode_pfm(Path::new("t.pfm"), &encode_pfm(&img)).unwrap();
        assert_eq!(back, img);
    }

    #[test]
    fn test_sample_clamps_coordinates() {
        let mut img = FloatImage::new(2, 2, 1);
        img.set(1, 1, 0, 9.0);
        assert_eq!(img.sample(10, 10, 0), 9.0);
    }
}
