// r_light.rs — light styles, dynamic lights and the per-surface light grid

use crate::r_local::*;
use crate::vid::PixelFormat;
use swq_common::q_shared::vector_ma;

// ============================================================
// LIGHT STYLE ANIMATION
// ============================================================

/// Scale of a style whose map is empty ("normal" light, 8.8 fixed point).
pub const LIGHTSTYLE_NORMAL: i32 = 256;

/// One light style: a string of `a`..`z` brightness steps played at 10Hz.
#[derive(Debug, Clone, Default)]
pub struct LightStyle {
    pub map: Vec<u8>,
}

impl LightStyle {
    pub fn new(map: &str) -> Self {
        Self {
            map: map.bytes().collect(),
        }
    }

    /// 8.8 scale at tick `k`: `'a'` is 0, `'m'` is 264, `'z'` is 550.
    pub fn value_at(&self, k: i32) -> i32 {
        if self.map.is_empty() {
            return LIGHTSTYLE_NORMAL;
        }
        let step = self.map[k as usize % self.map.len()] as i32 - b'a' as i32;
        step * 22
    }
}

/// Compute every style's current scale (d_lightstylevalue).
pub fn r_animate_light(styles: &[LightStyle], time: f64, values: &mut [i32; MAX_LIGHTSTYLES]) {
    let k = (time * 10.0) as i32;
    for (j, value) in values.iter_mut().enumerate() {
        *value = styles.get(j).map_or(LIGHTSTYLE_NORMAL, |s| s.value_at(k));
    }
}

/// The per-slot scales for one surface (r_drawsurf.lightadj).
pub fn surface_lightadj(surf: &Surface, values: &[i32; MAX_LIGHTSTYLES]) -> [u32; MAXLIGHTMAPS] {
    let mut adj = [0u32; MAXLIGHTMAPS];
    for (slot, &style) in surf.styles.iter().enumerate() {
        if style == LIGHTSTYLE_UNUSED {
            break;
        }
        adj[slot] = values[style as usize % MAX_LIGHTSTYLES].max(0) as u32;
    }
    adj
}

// ============================================================
// BLOCK LIGHT GRID
// ============================================================

/// Scratch light grid for one surface, reused across draws.
pub struct BlockLights {
    data: [u32; BLOCKLIGHTS_SIZE],
    smax: usize,
    tmax: usize,
    fullbright: bool,
}

impl Default for BlockLights {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockLights {
    pub fn new() -> Self {
        Self {
            data: [0; BLOCKLIGHTS_SIZE],
            smax: 0,
            tmax: 0,
            fullbright: false,
        }
    }

    fn reset(&mut self, smax: usize, tmax: usize) -> &mut [u32] {
        debug_assert!(smax * tmax <= BLOCKLIGHTS_SIZE, "surface extents exceed the light grid");
        self.smax = smax;
        self.tmax = tmax;
        self.fullbright = false;
        &mut self.data[..smax * tmax]
    }

    /// Grid width in samples.
    pub fn width(&self) -> usize {
        self.smax
    }

    pub fn height(&self) -> usize {
        self.tmax
    }

    /// True when the grid was filled without any shading.
    pub fn is_fullbright(&self) -> bool {
        self.fullbright
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.data[..self.smax * self.tmax]
    }

    pub fn get(&self, s: usize, t: usize) -> u32 {
        self.data[t * self.smax + s]
    }
}

/// Frame-wide inputs to the light accumulator.
#[derive(Debug, Clone, Copy)]
pub struct LightContext<'a> {
    /// r_fullbright: draw every surface unshaded.
    pub fullbright: bool,
    /// The world carries static light data at all.
    pub has_lightdata: bool,
    pub ambientlight: i32,
    /// r_dynamic: apply dynamic lights.
    pub dynamic: bool,
    pub dlights: &'a [DLight],
    pub framecount: i32,
    pub pixel_format: PixelFormat,
}

// ============================================================
// DYNAMIC LIGHTS
// ============================================================

/// Add (or with `dark`, subtract) every marked dynamic light into the grid.
fn r_add_dynamic_lights(surf: &Surface, dlights: &[DLight], blocklights: &mut [u32]) {
    let smax = surf.light_width();
    let tmax = surf.light_height();
    let plane = &surf.plane;

    for (lnum, dl) in dlights.iter().enumerate().take(MAX_DLIGHTS) {
        if surf.dlightbits & (1 << lnum) == 0 {
            continue; // not lit by this light
        }

        let dist = plane.distance(&dl.origin);
        let rad = dl.radius - dist.abs();
        if rad < dl.minlight {
            continue;
        }
        let minlight = rad - dl.minlight;

        let impact = vector_ma(&dl.origin, -dist, &plane.normal);
        let mut local = surf.texinfo.project(&impact);
        local[0] -= surf.texturemins[0] as f32;
        local[1] -= surf.texturemins[1] as f32;

        for t in 0..tmax {
            let td = ((local[1] - (t * 16) as f32) as i32).abs();
            for s in 0..smax {
                let sd = ((local[0] - (s * 16) as f32) as i32).abs();
                // max + half of min, not euclidean
                let dist = if sd > td { sd + (td >> 1) } else { td + (sd >> 1) } as f32;
                if dist < minlight {
                    let amount = ((rad - dist) * 256.0) as u32;
                    let cell = &mut blocklights[t * smax + s];
                    *cell = if dl.dark {
                        cell.saturating_sub(amount)
                    } else {
                        cell.saturating_add(amount)
                    };
                }
            }
        }
    }
}

// ============================================================
// LIGHT MAP BUILDING
// ============================================================

/// Combine and scale the surface's lightmaps into the 8.8 grid.
///
/// For indexed output the grid is then inverted and shifted into colormap
/// row units, bounded so the dither offset cannot overflow a row.
pub fn r_build_light_map(
    surf: &Surface,
    lightadj: &[u32; MAXLIGHTMAPS],
    ctx: &LightContext,
    blocklights: &mut BlockLights,
) {
    let smax = surf.light_width();
    let tmax = surf.light_height();
    let size = smax * tmax;
    let grid = blocklights.reset(smax, tmax);

    if ctx.fullbright || !ctx.has_lightdata {
        grid.fill(0);
        blocklights.fullbright = true;
        return;
    }

    // clear to ambient
    grid.fill((ctx.ambientlight.max(0) as u32) << 8);

    // add all the lightmaps
    if let Some(samples) = &surf.samples {
        for (maps, layer) in samples.chunks_exact(size).take(surf.num_styles()).enumerate() {
            let scale = lightadj[maps]; // 8.8 fraction
            for (cell, &sample) in grid.iter_mut().zip(layer) {
                *cell = cell.wrapping_add(sample as u32 * scale);
            }
        }
    }

    // add all the dynamic lights
    if ctx.dynamic && surf.dlightframe == ctx.framecount {
        r_add_dynamic_lights(surf, ctx.dlights, grid);
    }

    if ctx.pixel_format == PixelFormat::Indexed {
        // bound, invert, and shift
        for cell in grid.iter_mut() {
            *cell = r_light_to_colormap_row(*cell) as u32;
        }
    }
}

/// Smallest indexed-path light value; brighter cells would dither past row 0.
pub const LIGHT_MIN_INDEXED: i32 = 1 << 6;
/// Largest indexed-path light value; darker cells would dither past the last row.
pub const LIGHT_MAX_INDEXED: i32 = ((256 * 256) >> (8 - VID_CBITS)) - 256;

/// Invert an 8.8 light value into colormap row units.
#[inline]
pub fn r_light_to_colormap_row(light: u32) -> i32 {
    let t = (255 * 256 - light.min(i32::MAX as u32) as i32) >> (8 - VID_CBITS);
    t.clamp(LIGHT_MIN_INDEXED, LIGHT_MAX_INDEXED)
}
