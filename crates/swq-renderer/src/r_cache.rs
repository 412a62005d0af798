// r_cache.rs — lit surface cache blocks, built serially or across a rayon pool

use rayon::prelude::*;

use crate::r_light::{BlockLights, LightContext};
use crate::r_surf::{r_draw_surface, DrawSurf};
use crate::vid::{PixelBuffer, PixelFormat, Pixels, VidTables};

/// Below this many surfaces a batch is built on the calling thread.
pub const PARALLEL_SURFACE_THRESHOLD: usize = 16;

/// One lit, textured surface at a fixed mip, ready for span drawing.
#[derive(Debug, Clone)]
pub struct SurfaceCache {
    pub width: usize,
    pub height: usize,
    pub mip: usize,
    pub pixels: Pixels,
}

impl SurfaceCache {
    fn alloc(width: usize, height: usize, mip: usize, format: PixelFormat) -> Self {
        let pixels = match format {
            PixelFormat::Indexed => Pixels::Indexed(vec![0; width * height]),
            PixelFormat::TrueColor => Pixels::TrueColor(vec![0; width * height]),
        };
        Self {
            width,
            height,
            mip,
            pixels,
        }
    }

    fn buffer(&mut self) -> PixelBuffer<'_> {
        match &mut self.pixels {
            Pixels::Indexed(p) => PixelBuffer::Indexed(p),
            Pixels::TrueColor(p) => PixelBuffer::TrueColor(p),
        }
    }
}

/// Build one cache block using the caller's scratch light grid.
pub fn build_surface_cache(
    ds: &DrawSurf,
    light: &LightContext,
    blocklights: &mut BlockLights,
    tables: &VidTables,
    dither: bool,
) -> SurfaceCache {
    debug_assert_eq!(ds.rowpixels, ds.surfwidth);

    let mut cache = SurfaceCache::alloc(ds.surfwidth, ds.surfheight, ds.surfmip, light.pixel_format);
    r_draw_surface(ds, light, blocklights, tables, dither, cache.buffer());
    cache
}

/// Build a batch of cache blocks. Each block is an independent buffer, so
/// workers only share read-only inputs; each keeps its own light grid.
pub fn build_surface_caches(
    draws: &[DrawSurf],
    light: &LightContext,
    tables: &VidTables,
    dither: bool,
) -> Vec<SurfaceCache> {
    if draws.len() < PARALLEL_SURFACE_THRESHOLD {
        let mut blocklights = BlockLights::new();
        return draws
            .iter()
            .map(|ds| build_surface_cache(ds, light, &mut blocklights, tables, dither))
            .collect();
    }

    draws
        .par_iter()
        .map_init(BlockLights::new, |blocklights, ds| {
            build_surface_cache(ds, light, blocklights, tables, dither)
        })
        .collect()
}
