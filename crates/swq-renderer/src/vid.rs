// vid.rs — pixel formats, palette tables and the destination buffers

use crate::r_local::{COLORMAP_SIZE, FULLBRIGHT_PALETTE_START, VID_GRADES};

// ============================================================
// Pixel format
// ============================================================

/// Chosen once per video mode; every drawing routine branches on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PixelFormat {
    /// One palette index per pixel, shaded through the colormap.
    #[default]
    Indexed,
    /// One palette-expanded 32-bit color per pixel.
    TrueColor,
}

impl PixelFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Indexed => 1,
            PixelFormat::TrueColor => 4,
        }
    }

    /// Map the `vid_pixbytes` cvar value to a format.
    pub fn from_pixbytes(pixbytes: i32) -> Self {
        if pixbytes == 4 {
            PixelFormat::TrueColor
        } else {
            PixelFormat::Indexed
        }
    }
}

// ============================================================
// Palette (d_8to24table)
// ============================================================

pub const PALETTE_BYTES: usize = 256 * 3;

/// 256 palette colors packed as little-endian RGBA.
#[derive(Debug, Clone)]
pub struct Palette {
    pub table: [u32; 256],
    rgb: [[u8; 3]; 256],
}

#[inline]
pub fn pack_rgba(r: u8, g: u8, b: u8, a: u8) -> u32 {
    u32::from_le_bytes([r, g, b, a])
}

impl Palette {
    /// Expand a 768-byte RGB palette. Index 255 is transparent.
    pub fn from_rgb(rgb: &[u8]) -> Result<Self, String> {
        if rgb.len() != PALETTE_BYTES {
            return Err(format!(
                "Palette::from_rgb: expected {} bytes, got {}",
                PALETTE_BYTES,
                rgb.len()
            ));
        }

        let triples: &[[u8; 3]] = bytemuck::cast_slice(rgb);
        let mut table = [0u32; 256];
        let mut colors = [[0u8; 3]; 256];
        for (i, &[r, g, b]) in triples.iter().enumerate() {
            let alpha = if i == 255 { 0 } else { 255 };
            table[i] = pack_rgba(r, g, b, alpha);
            colors[i] = [r, g, b];
        }

        Ok(Self { table, rgb: colors })
    }

    #[inline]
    pub fn color(&self, index: u8) -> u32 {
        self.table[index as usize]
    }

    pub fn rgb(&self, index: u8) -> [u8; 3] {
        self.rgb[index as usize]
    }

    /// Index of the closest non-fullbright entry to `target`.
    fn best_match(&self, target: [i32; 3]) -> u8 {
        let mut best = 0usize;
        let mut best_dist = i32::MAX;
        for (i, c) in self.rgb[..FULLBRIGHT_PALETTE_START as usize].iter().enumerate() {
            let dr = c[0] as i32 - target[0];
            let dg = c[1] as i32 - target[1];
            let db = c[2] as i32 - target[2];
            let dist = dr * dr + dg * dg + db * db;
            if dist < best_dist {
                best_dist = dist;
                best = i;
                if dist == 0 {
                    break;
                }
            }
        }
        best as u8
    }

    /// Build a `VID_GRADES x 256` shading table. Row 0 is twice as bright
    /// as the palette, row `VID_GRADES / 2` is the palette itself and the
    /// last row is close to black. Fullbright entries are never shaded.
    pub fn build_colormap(&self) -> Vec<u8> {
        let half = (VID_GRADES / 2) as i32;
        let mut colormap = vec![0u8; COLORMAP_SIZE];
        for grade in 0..VID_GRADES {
            let scale = VID_GRADES as i32 - grade as i32;
            let row = &mut colormap[grade * 256..(grade + 1) * 256];
            for (index, out) in row.iter_mut().enumerate() {
                if index >= FULLBRIGHT_PALETTE_START as usize || scale == half {
                    *out = index as u8;
                    continue;
                }
                let c = self.rgb[index];
                let shade = |v: u8| ((v as i32 * scale) / half).min(255);
                *out = self.best_match([shade(c[0]), shade(c[1]), shade(c[2])]);
            }
        }
        colormap
    }
}

// ============================================================
// Per-mode tables
// ============================================================

/// Lookup tables the drawing routines read for the current video mode.
#[derive(Debug, Clone)]
pub struct VidTables {
    pub pixel_format: PixelFormat,
    pub palette: Palette,
    pub colormap: Vec<u8>,
}

impl VidTables {
    pub fn new(pixel_format: PixelFormat, palette: Palette, colormap: Vec<u8>) -> Result<Self, String> {
        if colormap.len() != COLORMAP_SIZE {
            return Err(format!(
                "VidTables::new: colormap is {} bytes, expected {}",
                colormap.len(),
                COLORMAP_SIZE
            ));
        }
        Ok(Self {
            pixel_format,
            palette,
            colormap,
        })
    }

    /// Tables with a colormap computed from the palette.
    pub fn from_palette(pixel_format: PixelFormat, palette: Palette) -> Self {
        let colormap = palette.build_colormap();
        Self {
            pixel_format,
            palette,
            colormap,
        }
    }
}

// ============================================================
// Destination buffers
// ============================================================

/// A borrowed destination in the current pixel format.
pub enum PixelBuffer<'a> {
    Indexed(&'a mut [u8]),
    TrueColor(&'a mut [u32]),
}

impl PixelBuffer<'_> {
    pub fn format(&self) -> PixelFormat {
        match self {
            PixelBuffer::Indexed(_) => PixelFormat::Indexed,
            PixelBuffer::TrueColor(_) => PixelFormat::TrueColor,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            PixelBuffer::Indexed(p) => p.len(),
            PixelBuffer::TrueColor(p) => p.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The view buffer plus its parallel z-buffer, as seen by the span and
/// particle drawers. Larger z values are nearer.
pub struct ViewTarget<'a> {
    pub pixels: PixelBuffer<'a>,
    pub zbuffer: &'a mut [i16],
    /// Pixels per view buffer row.
    pub screenwidth: usize,
    /// Entries per z-buffer row.
    pub zwidth: usize,
}

/// Owned pixel storage.
#[derive(Debug, Clone)]
pub enum Pixels {
    Indexed(Vec<u8>),
    TrueColor(Vec<u32>),
}

/// An owned view buffer and z-buffer of one size.
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    pub width: usize,
    pub height: usize,
    pub pixels: Pixels,
    pub zbuffer: Vec<i16>,
}

impl FrameBuffer {
    pub fn new(width: usize, height: usize, format: PixelFormat) -> Self {
        let pixels = match format {
            PixelFormat::Indexed => Pixels::Indexed(vec![0; width * height]),
            PixelFormat::TrueColor => Pixels::TrueColor(vec![0; width * height]),
        };
        Self {
            width,
            height,
            pixels,
            zbuffer: vec![0; width * height],
        }
    }

    pub fn format(&self) -> PixelFormat {
        match self.pixels {
            Pixels::Indexed(_) => PixelFormat::Indexed,
            Pixels::TrueColor(_) => PixelFormat::TrueColor,
        }
    }

    /// Fill with `color` and push the z-buffer to infinitely far.
    pub fn clear(&mut self, color: u8, palette: &Palette) {
        match &mut self.pixels {
            Pixels::Indexed(p) => p.fill(color),
            Pixels::TrueColor(p) => p.fill(palette.color(color)),
        }
        self.zbuffer.fill(0);
    }

    pub fn target(&mut self) -> ViewTarget<'_> {
        let pixels = match &mut self.pixels {
            Pixels::Indexed(p) => PixelBuffer::Indexed(p),
            Pixels::TrueColor(p) => PixelBuffer::TrueColor(p),
        };
        ViewTarget {
            pixels,
            zbuffer: &mut self.zbuffer,
            screenwidth: self.width,
            zwidth: self.width,
        }
    }

    /// Raw bytes of the view buffer (native byte order for true color).
    pub fn as_bytes(&self) -> &[u8] {
        match &self.pixels {
            Pixels::Indexed(p) => p,
            Pixels::TrueColor(p) => bytemuck::cast_slice(p),
        }
    }
}
