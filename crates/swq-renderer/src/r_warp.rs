// r_warp.rs — turbulent and sky tile generation for special surfaces

use crate::r_local::{SourceImage, SurfFlags};
use swq_common::common::com_error;
use swq_common::q_shared::ERR_FATAL;

// ============================================================
// Constants
// ============================================================

/// Entries per sine period.
pub const CYCLE: usize = 128;
/// Warp amplitude in 16.16 texels.
pub const AMP: i32 = 8 * 0x10000;
/// Table steps advanced per second.
pub const SPEED: f64 = 20.0;
/// Side of a generated tile.
pub const TILE_SIZE: usize = 128;
/// Side of the turbulent source texture; coordinates wrap at this size.
pub const TURB_SOURCE_SIZE: usize = 64;

// ============================================================
// Turbulence table
// ============================================================

/// Offset sine wave in 16.16 fixed point, two periods long so any
/// time-shifted window of `CYCLE` entries is contiguous.
#[derive(Debug, Clone)]
pub struct TurbTable {
    sintable: [i32; CYCLE * 2],
}

impl Default for TurbTable {
    fn default() -> Self {
        Self::new()
    }
}

impl TurbTable {
    pub fn new() -> Self {
        let mut sintable = [0i32; CYCLE * 2];
        for (i, entry) in sintable.iter_mut().enumerate() {
            let angle = i as f64 * std::f64::consts::PI * 2.0 / CYCLE as f64;
            *entry = (AMP as f64 + angle.sin() * AMP as f64) as i32;
        }
        Self { sintable }
    }

    pub fn as_slice(&self) -> &[i32] {
        &self.sintable
    }

    /// The `CYCLE` entries in effect at `time`.
    pub fn window(&self, time: f64) -> &[i32] {
        let start = ((time * SPEED) as i32 & (CYCLE as i32 - 1)) as usize;
        &self.sintable[start..start + CYCLE]
    }
}

/// Warp a 64x64 source into a `TILE_SIZE` square tile.
pub fn r_gen_turb_tile(table: &TurbTable, base: &[u8], time: f64, dest: &mut [u8]) {
    debug_assert!(base.len() >= TURB_SOURCE_SIZE * TURB_SOURCE_SIZE);
    debug_assert!(dest.len() >= TILE_SIZE * TILE_SIZE);

    let turb = table.window(time);
    let mask = TURB_SOURCE_SIZE as i32 - 1;

    for (i, row) in dest.chunks_exact_mut(TILE_SIZE).take(TILE_SIZE).enumerate() {
        for (j, pd) in row.iter_mut().enumerate() {
            let s = ((((j as i32) << 16) + turb[i & (CYCLE - 1)]) >> 16) & mask;
            let t = ((((i as i32) << 16) + turb[j & (CYCLE - 1)]) >> 16) & mask;
            *pd = base[((t << 6) + s) as usize];
        }
    }
}

// ============================================================
// Tiles
// ============================================================

/// Provider of sky tiles; the sky renderer lives outside the surface core.
pub trait SkyTileSource: Send + Sync {
    /// Fill a `TILE_SIZE` square tile for `time`.
    fn gen_sky_tile(&self, time: f64, dest: &mut [u8]);
}

/// Generate this frame's source tile for a turbulent or sky surface.
///
/// Any other surface kind reaching here is a fatal error.
pub fn r_gen_tile(
    flags: SurfFlags,
    source: SourceImage<'_>,
    table: &TurbTable,
    sky: Option<&dyn SkyTileSource>,
    time: f64,
    dest: &mut [u8],
) {
    if flags.contains(SurfFlags::DRAWTURB) {
        r_gen_turb_tile(table, source.pixels, time, dest);
    } else if flags.contains(SurfFlags::DRAWSKY) {
        match sky {
            Some(sky) => sky.gen_sky_tile(time, dest),
            None => com_error(ERR_FATAL, "R_GenTile: no sky tile source"),
        }
    } else {
        com_error(ERR_FATAL, "Unknown tile type");
    }
}

/// The generated tile as a drawable source image.
pub fn tile_image(tile: &[u8]) -> SourceImage<'_> {
    SourceImage {
        width: TILE_SIZE,
        height: TILE_SIZE,
        pixels: &tile[..TILE_SIZE * TILE_SIZE],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Source whose texel value is its column.
    fn column_source() -> Vec<u8> {
        (0..TURB_SOURCE_SIZE * TURB_SOURCE_SIZE)
            .map(|i| (i % TURB_SOURCE_SIZE) as u8)
            .collect()
    }

    fn source_image(pixels: &[u8]) -> SourceImage<'_> {
        SourceImage {
            width: TURB_SOURCE_SIZE,
            height: TURB_SOURCE_SIZE,
            pixels,
        }
    }

    struct SolidSky(u8);

    impl SkyTileSource for SolidSky {
        fn gen_sky_tile(&self, _time: f64, dest: &mut [u8]) {
            dest.fill(self.0);
        }
    }

    // ============================================================
    // Sine table
    // ============================================================

    #[test]
    fn test_table_shape() {
        let table = TurbTable::new();
        assert_eq!(table.as_slice().len(), CYCLE * 2);
        assert_eq!(table.as_slice()[0], AMP);
        assert_eq!(table.as_slice()[CYCLE / 4], 2 * AMP);
        assert!(table.as_slice()[3 * CYCLE / 4] <= 1);
    }

    #[test]
    fn test_table_is_periodic() {
        let table = TurbTable::new();
        for i in 0..CYCLE {
            let diff = (table.as_slice()[i] - table.as_slice()[i + CYCLE]).abs();
            assert!(diff <= 1, "entry {} differs by {}", i, diff);
        }
    }

    #[test]
    fn test_table_range() {
        let table = TurbTable::new();
        assert!(table.as_slice().iter().all(|&v| (0..=2 * AMP).contains(&v)));
    }

    #[test]
    fn test_window_advances_with_time() {
        let table = TurbTable::new();
        assert_eq!(table.window(0.0)[0], table.as_slice()[0]);
        // 0.5s * 20 = 10 entries
        assert_eq!(table.window(0.5)[0], table.as_slice()[10]);
        assert_eq!(table.window(0.5).len(), CYCLE);
    }

    // ============================================================
    // Turbulent tiles
    // ============================================================

    #[test]
    fn test_turb_tile_first_row_shift() {
        let table = TurbTable::new();
        let base = column_source();
        let mut dest = vec![0u8; TILE_SIZE * TILE_SIZE];
        r_gen_turb_tile(&table, &base, 0.0, &mut dest);
        // row 0 is displaced by sintable[0] = 8 texels
        for j in 0..TILE_SIZE {
            assert_eq!(dest[j] as usize, (j + 8) & 63);
        }
    }

    #[test]
    fn test_turb_tile_of_flat_source_is_flat() {
        let table = TurbTable::new();
        let base = vec![42u8; TURB_SOURCE_SIZE * TURB_SOURCE_SIZE];
        let mut dest = vec![0u8; TILE_SIZE * TILE_SIZE];
        r_gen_turb_tile(&table, &base, 3.7, &mut dest);
        assert!(dest.iter().all(|&p| p == 42));
    }

    #[test]
    fn test_turb_tile_changes_over_time() {
        let table = TurbTable::new();
        let base = column_source();
        let mut a = vec![0u8; TILE_SIZE * TILE_SIZE];
        let mut b = vec![0u8; TILE_SIZE * TILE_SIZE];
        r_gen_turb_tile(&table, &base, 0.0, &mut a);
        r_gen_turb_tile(&table, &base, 0.5, &mut b);
        assert_ne!(a, b);
    }

    // ============================================================
    // Tile dispatch
    // ============================================================

    #[test]
    fn test_gen_tile_sky_uses_source() {
        let table = TurbTable::new();
        let base = column_source();
        let mut dest = vec![0u8; TILE_SIZE * TILE_SIZE];
        let sky = SolidSky(7);
        r_gen_tile(SurfFlags::DRAWSKY, source_image(&base), &table, Some(&sky), 1.0, &mut dest);
        assert!(dest.iter().all(|&p| p == 7));
    }

    #[test]
    fn test_gen_tile_turb() {
        let table = TurbTable::new();
        let base = column_source();
        let mut direct = vec![0u8; TILE_SIZE * TILE_SIZE];
        let mut dispatched = vec![0u8; TILE_SIZE * TILE_SIZE];
        r_gen_turb_tile(&table, &base, 2.0, &mut direct);
        r_gen_tile(SurfFlags::DRAWTURB, source_image(&base), &table, None, 2.0, &mut dispatched);
        assert_eq!(direct, dispatched);
    }

    #[test]
    #[should_panic(expected = "Unknown tile type")]
    fn test_gen_tile_unknown_type_is_fatal() {
        let table = TurbTable::new();
        let base = column_source();
        let mut dest = vec![0u8; TILE_SIZE * TILE_SIZE];
        r_gen_tile(SurfFlags::empty(), source_image(&base), &table, None, 0.0, &mut dest);
    }

    #[test]
    #[should_panic(expected = "no sky tile source")]
    fn test_gen_tile_sky_without_source_is_fatal() {
        let table = TurbTable::new();
        let base = column_source();
        let mut dest = vec![0u8; TILE_SIZE * TILE_SIZE];
        r_gen_tile(SurfFlags::DRAWSKY, source_image(&base), &table, None, 0.0, &mut dest);
    }

    #[test]
    fn test_tile_image_dimensions() {
        let tile = vec![0u8; TILE_SIZE * TILE_SIZE];
        let img = tile_image(&tile);
        assert_eq!((img.width, img.height), (TILE_SIZE, TILE_SIZE));
    }
}
