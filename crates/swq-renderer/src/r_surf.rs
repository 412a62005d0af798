// r_surf.rs — surface-related refresh code: lit, dithered texel blocks

use crate::r_light::{r_build_light_map, BlockLights, LightContext};
use crate::r_local::*;
use crate::vid::{PixelBuffer, VidTables};

// ============================================================
// Mip blocks
// ============================================================

/// Texel block geometry for one mip level: 16, 8, 4 or 2 texels square.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockShape {
    pub mip: usize,
    /// log2 of the block size (blockdivshift).
    pub shift: u32,
}

impl BlockShape {
    pub fn for_mip(mip: usize) -> Self {
        debug_assert!(mip < MIPLEVELS);
        Self {
            mip,
            shift: 4 - mip as u32,
        }
    }

    #[inline]
    pub fn size(self) -> usize {
        1 << self.shift
    }

    /// blockdivmask
    pub fn mask(self) -> usize {
        self.size() - 1
    }

    pub fn dither(self, enabled: bool) -> Dither {
        match (enabled, self.mip) {
            (false, _) => Dither::Off,
            (true, 3) => Dither::Bayer2x2,
            (true, _) => Dither::Bayer4x4,
        }
    }
}

// ============================================================
// Ordered dither
// ============================================================

const BAYER_4X4: [[i32; 4]; 4] = [
    [0, 8, 2, 10],
    [12, 4, 14, 6],
    [3, 11, 1, 9],
    [15, 7, 13, 5],
];

const BAYER_2X2: [[i32; 2]; 2] = [[0, 2], [3, 1]];

/// Ordered dither applied to indexed light before the colormap row is taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dither {
    Off,
    Bayer4x4,
    /// For 2x2 blocks, where a 4x4 pattern never completes.
    Bayer2x2,
}

impl Dither {
    /// Offset in light units for texel `b` of block row `i`.
    #[inline]
    pub fn offset(self, i: usize, b: usize) -> i32 {
        match self {
            Dither::Off => 0,
            Dither::Bayer4x4 => BAYER_4X4[i & 3][b & 3] * 16,
            Dither::Bayer2x2 => BAYER_2X2[i & 1][b & 1] * 64,
        }
    }
}

// ============================================================
// Toroidal texel addressing
// ============================================================

/// Walks texel rows down a block column, wrapping from the bottom of the
/// texture back to the top once per block.
#[derive(Debug, Clone, Copy)]
pub struct ToroidalCursor {
    pos: usize,
    /// sourcetstep
    tstep: usize,
    /// r_stepback
    stepback: usize,
    /// r_sourcemax
    end: usize,
}

impl ToroidalCursor {
    pub fn new(pos: usize, width: usize, height: usize) -> Self {
        debug_assert!(pos < width * height);
        Self {
            pos,
            tstep: width,
            stepback: width * height,
            end: width * height,
        }
    }

    #[inline]
    pub fn pos(&self) -> usize {
        self.pos
    }

    #[inline]
    pub fn next_row(&mut self) {
        self.pos += self.tstep;
    }

    /// Step back a whole texture if the cursor ran past its last row.
    #[inline]
    pub fn wrap(&mut self) {
        if self.pos >= self.end {
            self.pos -= self.stepback;
        }
    }
}

// ============================================================
// Block rasterizer
// ============================================================

/// One vertical column of blocks: everything a block drawer needs.
struct BlockColumn<'a> {
    shape: BlockShape,
    source: &'a [u8],
    cursor: ToroidalCursor,
    /// Light grid, and the index of this column's top-left sample.
    light: &'a [u32],
    lightptr: usize,
    lightwidth: usize,
    /// Destination offset of the column's first pixel.
    dest: usize,
    rowpixels: usize,
    numvblocks: usize,
}

/// The two grid samples bounding a block edge pair, stepped per row.
struct BlockEdges {
    left: i32,
    right: i32,
    leftstep: i32,
    rightstep: i32,
}

impl BlockColumn<'_> {
    fn edges(&self, lightptr: usize, scale: u32) -> BlockEdges {
        let shift = self.shape.shift;
        let top_left = (self.light[lightptr] as i32) << scale;
        let top_right = (self.light[lightptr + 1] as i32) << scale;
        let below = lightptr + self.lightwidth;
        BlockEdges {
            left: top_left,
            right: top_right,
            leftstep: (((self.light[below] as i32) << scale) - top_left) >> shift,
            rightstep: (((self.light[below + 1] as i32) << scale) - top_right) >> shift,
        }
    }

    /// Indexed blocks: light selects a colormap row for each texel.
    fn draw_8(mut self, colormap: &[u8], dither: Dither, dest: &mut [u8]) {
        let shift = self.shape.shift;
        let size = self.shape.size();
        let mut lightptr = self.lightptr;
        let mut prowdest = self.dest;

        for _v in 0..self.numvblocks {
            let mut e = self.edges(lightptr, 0);
            lightptr += self.lightwidth;

            for i in 0..size {
                let lightstep = (e.left - e.right) >> shift;
                let mut light = e.right;

                let src = &self.source[self.cursor.pos()..self.cursor.pos() + size];
                let row = &mut dest[prowdest..prowdest + size];
                for b in (0..size).rev() {
                    let light_add = light + dither.offset(i, b);
                    row[b] = colormap[(light_add & 0xFF00) as usize + src[b] as usize];
                    light += lightstep;
                }

                self.cursor.next_row();
                e.right += e.rightstep;
                e.left += e.leftstep;
                prowdest += self.rowpixels;
            }

            self.cursor.wrap();
        }
    }

    /// True-color blocks: light scales each channel; fullbright palette
    /// entries and unshaded surfaces keep the raw palette color.
    fn draw_32(mut self, palette: &[u32; 256], unshaded: bool, dest: &mut [u32]) {
        let shift = self.shape.shift;
        let size = self.shape.size();
        let mut lightptr = self.lightptr;
        let mut prowdest = self.dest;

        for _v in 0..self.numvblocks {
            let mut e = self.edges(lightptr, 4);
            lightptr += self.lightwidth;

            for _i in 0..size {
                let lightstep = (e.left - e.right) >> shift;
                let mut light = e.right;

                let src = &self.source[self.cursor.pos()..self.cursor.pos() + size];
                let row = &mut dest[prowdest..prowdest + size];
                for b in (0..size).rev() {
                    let pix = src[b];
                    let color = palette[pix as usize];
                    row[b] = if unshaded || pix >= FULLBRIGHT_PALETTE_START {
                        color
                    } else {
                        shade_rgba(color, light.max(0) as u32)
                    };
                    light += lightstep;
                }

                self.cursor.next_row();
                e.right += e.rightstep;
                e.left += e.leftstep;
                prowdest += self.rowpixels;
            }

            self.cursor.wrap();
        }
    }
}

/// Scale all four channels of `color` by `light` (4.12 over the 8.8 grid).
#[inline]
pub fn shade_rgba(color: u32, light: u32) -> u32 {
    let mut out = 0u32;
    for shift in [24u32, 16, 8, 0] {
        let comp = ((color >> shift) & 0xFF) as u64;
        let lit = ((comp * light as u64) >> 19).min(255) as u32;
        out |= lit << shift;
    }
    out
}

// ============================================================
// Surface driver
// ============================================================

/// Everything needed to draw one surface into a cache block.
#[derive(Debug, Clone, Copy)]
pub struct DrawSurf<'a> {
    pub surf: &'a Surface,
    /// The selected mip (or generated tile) of the surface's texture.
    pub source: SourceImage<'a>,
    pub surfmip: usize,
    /// Destination size in pixels at this mip.
    pub surfwidth: usize,
    pub surfheight: usize,
    /// Destination pixels per row.
    pub rowpixels: usize,
    pub lightadj: [u32; MAXLIGHTMAPS],
}

impl<'a> DrawSurf<'a> {
    /// A tightly packed cache block for `surf` at `miplevel`.
    pub fn new(
        surf: &'a Surface,
        source: SourceImage<'a>,
        miplevel: usize,
        lightadj: [u32; MAXLIGHTMAPS],
    ) -> Self {
        let surfwidth = (surf.extents[0] as usize) >> miplevel;
        Self {
            surf,
            source,
            surfmip: miplevel,
            surfwidth,
            surfheight: (surf.extents[1] as usize) >> miplevel,
            rowpixels: surfwidth,
            lightadj,
        }
    }

    /// Pixels a destination buffer must hold for this draw.
    pub fn dest_len(&self) -> usize {
        let shape = BlockShape::for_mip(self.surfmip);
        let rows = (self.surfheight >> shape.shift) << shape.shift;
        let cols = (self.surfwidth >> shape.shift) << shape.shift;
        if rows == 0 || cols == 0 {
            return 0;
        }
        (rows - 1) * self.rowpixels + cols
    }
}

/// Positive modulo for texel offsets that may be negative.
#[inline]
fn wrap_offset(offset: i32, dim: usize) -> usize {
    ((offset + ((dim as i32) << 16)) % dim as i32) as usize
}

/// Light and draw one surface into `dest`.
pub fn r_draw_surface(
    ds: &DrawSurf,
    light: &LightContext,
    blocklights: &mut BlockLights,
    tables: &VidTables,
    dither: bool,
    mut dest: PixelBuffer,
) {
    // calculate the lightings
    r_build_light_map(ds.surf, &ds.lightadj, light, blocklights);

    let shape = BlockShape::for_mip(ds.surfmip);
    let blocksize = shape.size();
    let source = ds.source;
    let smax = source.width;
    let tmax = source.height;

    debug_assert_eq!(dest.format(), light.pixel_format);
    debug_assert!(dest.len() >= ds.dest_len());
    debug_assert!(source.pixels.len() >= smax * tmax);
    debug_assert!(smax % blocksize == 0 && tmax > 0);
    debug_assert!(
        ds.surf.extents[0] as i32 <= MAX_SURFACE_EXTENT && ds.surf.extents[1] as i32 <= MAX_SURFACE_EXTENT
    );

    let lightwidth = ds.surf.light_width();
    let numhblocks = ds.surfwidth >> shape.shift;
    let numvblocks = ds.surfheight >> shape.shift;

    let mip = ds.surfmip as u32;
    let mut soffset = wrap_offset((ds.surf.texturemins[0] as i32) >> mip, smax);
    let basetoffset = wrap_offset((ds.surf.texturemins[1] as i32) >> mip, tmax) * smax;
    debug_assert!(soffset & shape.mask() == 0, "texturemins not block aligned");

    let dither = shape.dither(dither);
    let unshaded = blocklights.is_fullbright();
    let grid = blocklights.as_slice();

    for u in 0..numhblocks {
        let column = BlockColumn {
            shape,
            source: source.pixels,
            cursor: ToroidalCursor::new(basetoffset + soffset, smax, tmax),
            light: grid,
            lightptr: u,
            lightwidth,
            dest: u * blocksize,
            rowpixels: ds.rowpixels,
            numvblocks,
        };

        match &mut dest {
            PixelBuffer::Indexed(pixels) => column.draw_8(&tables.colormap, dither, pixels),
            PixelBuffer::TrueColor(pixels) => {
                column.draw_32(&tables.palette.table, unshaded, pixels)
            }
        }

        soffset += blocksize;
        if soffset >= smax {
            soffset = 0;
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::vid::tests::gray_palette;
    use crate::vid::PixelFormat;

    // ============================================================
    // Helpers
    // ============================================================

    pub(crate) fn flat_surface(extents: [i16; 2], texturemins: [i16; 2]) -> Surface {
        let mut surf = Surface {
            extents,
            texturemins,
            styles: [0, LIGHTSTYLE_UNUSED, LIGHTSTYLE_UNUSED, LIGHTSTYLE_UNUSED],
            dlightframe: -1,
            ..Default::default()
        };
        surf.samples = Some(vec![128; surf.light_size()]);
        surf
    }

    pub(crate) fn light_ctx(format: PixelFormat) -> LightContext<'static> {
        LightContext {
            fullbright: false,
            has_lightdata: true,
            ambientlight: 0,
            dynamic: false,
            dlights: &[],
            framecount: 0,
            pixel_format: format,
        }
    }

    /// 32x32 texture whose texel value encodes its column and row.
    pub(crate) fn coord_texture() -> Texture {
        let base: Vec<u8> = (0..32 * 32).map(|i| ((i % 32) + (i / 32) * 7 % 190) as u8).collect();
        Texture::from_base("coords", 32, 32, base)
    }

    fn draw_indexed(surf: &Surface, tex: &Texture, mip: usize, dither: bool) -> Vec<u8> {
        let tables = VidTables::from_palette(PixelFormat::Indexed, gray_palette());
        // 128 * 254 lands exactly on the identity colormap row
        let ds = DrawSurf::new(surf, tex.mip(mip), mip, [254, 0, 0, 0]);
        let mut out = vec![0u8; ds.dest_len()];
        let mut bl = BlockLights::new();
        r_draw_surface(
            &ds,
            &light_ctx(PixelFormat::Indexed),
            &mut bl,
            &tables,
            dither,
            PixelBuffer::Indexed(&mut out),
        );
        out
    }

    fn draw_truecolor(surf: &Surface, tex: &Texture, mip: usize, ctx: &LightContext) -> Vec<u32> {
        let tables = VidTables::from_palette(PixelFormat::TrueColor, gray_palette());
        let ds = DrawSurf::new(surf, tex.mip(mip), mip, [256, 0, 0, 0]);
        let mut out = vec![0u32; ds.dest_len()];
        let mut bl = BlockLights::new();
        r_draw_surface(&ds, ctx, &mut bl, &tables, true, PixelBuffer::TrueColor(&mut out));
        out
    }

    // ============================================================
    // Blocks and dither
    // ============================================================

    #[test]
    fn test_block_shape_per_mip() {
        let sizes: Vec<usize> = (0..MIPLEVELS).map(|m| BlockShape::for_mip(m).size()).collect();
        assert_eq!(sizes, vec![16, 8, 4, 2]);
        assert_eq!(BlockShape::for_mip(1).mask(), 7);
        assert_eq!(BlockShape::for_mip(3).dither(true), Dither::Bayer2x2);
        assert_eq!(BlockShape::for_mip(0).dither(true), Dither::Bayer4x4);
        assert_eq!(BlockShape::for_mip(2).dither(false), Dither::Off);
    }

    #[test]
    fn test_dither_offsets_stay_below_one_row() {
        for i in 0..4 {
            for b in 0..4 {
                assert!(Dither::Bayer4x4.offset(i, b) < 256);
                assert!(Dither::Bayer2x2.offset(i, b) < 256);
            }
        }
        assert_eq!(Dither::Bayer4x4.offset(3, 0), 15 * 16);
        assert_eq!(Dither::Bayer2x2.offset(1, 0), 3 * 64);
        assert_eq!(Dither::Off.offset(3, 3), 0);
    }

    #[test]
    fn test_toroidal_cursor_wraps_once_past_end() {
        let mut c = ToroidalCursor::new(4, 8, 2);
        c.next_row();
        c.wrap();
        assert_eq!(c.pos(), 12);
        c.next_row();
        c.wrap();
        assert_eq!(c.pos(), 4);
    }

    #[test]
    fn test_wrap_offset_negative() {
        assert_eq!(wrap_offset(-16, 32), 16);
        assert_eq!(wrap_offset(48, 32), 16);
        assert_eq!(wrap_offset(0, 32), 0);
    }

    #[test]
    fn test_shade_rgba_neutral_and_clamp() {
        let color = u32::from_le_bytes([10, 100, 200, 255]);
        assert_eq!(shade_rgba(color, 128 * 256 << 4), color);
        assert_eq!(shade_rgba(color, 0), 0);
        let bright = shade_rgba(color, 256 * 256 << 4).to_le_bytes();
        assert_eq!(bright, [20, 200, 255, 255]);
    }

    // ============================================================
    // Surface drawing
    // ============================================================

    #[test]
    fn test_dest_len_packed() {
        let surf = flat_surface([32, 16], [0, 0]);
        let tex = coord_texture();
        let ds = DrawSurf::new(&surf, tex.mip(0), 0, [256, 0, 0, 0]);
        assert_eq!(ds.dest_len(), 32 * 16);
        let ds = DrawSurf::new(&surf, tex.mip(1), 1, [256, 0, 0, 0]);
        assert_eq!(ds.dest_len(), 16 * 8);
    }

    #[test]
    fn test_indexed_neutral_light_reproduces_texture() {
        let surf = flat_surface([32, 32], [0, 0]);
        let tex = coord_texture();
        for dither in [false, true] {
            let out = draw_indexed(&surf, &tex, 0, dither);
            assert_eq!(out, tex.mips[0]);
        }
    }

    #[test]
    fn test_texture_wrap_matches_modulo_offset() {
        let tex = coord_texture();
        // a block column that starts at the right half and wraps
        let a = draw_indexed(&flat_surface([32, 32], [16, 0]), &tex, 0, true);
        let b = draw_indexed(&flat_surface([32, 32], [16 - 32, 0]), &tex, 0, true);
        let c = draw_indexed(&flat_surface([32, 32], [16 + 64, 32]), &tex, 0, true);
        assert_eq!(a, b);
        assert_eq!(a, c);
    }

    #[test]
    fn test_vertical_wrap_reads_top_rows() {
        let tex = coord_texture();
        let surf = flat_surface([16, 64], [0, 0]);
        let out = draw_truecolor(&surf, &tex, 0, &light_ctx(PixelFormat::TrueColor));
        // rows 32..64 repeat rows 0..32
        assert_eq!(&out[..32 * 16], &out[32 * 16..]);
    }

    #[test]
    fn test_truecolor_neutral_light_is_palette_color() {
        let tex = coord_texture();
        let surf = flat_surface([32, 32], [0, 0]);
        let out = draw_truecolor(&surf, &tex, 0, &light_ctx(PixelFormat::TrueColor));
        let pal = gray_palette();
        for (i, &p) in out.iter().enumerate() {
            assert_eq!(p, pal.color(tex.mips[0][i]), "texel {}", i);
        }
    }

    #[test]
    fn test_truecolor_fullbright_palette_ignores_light() {
        let base = vec![230u8; 16 * 16];
        let tex = Texture::from_base("lava", 16, 16, base);
        let mut surf = flat_surface([16, 16], [0, 0]);
        surf.samples = Some(vec![0; surf.light_size()]);
        let out = draw_truecolor(&surf, &tex, 0, &light_ctx(PixelFormat::TrueColor));
        let pal = gray_palette();
        assert!(out.iter().all(|&p| p == pal.color(230)));
    }

    #[test]
    fn test_truecolor_fullbright_mode_draws_unshaded() {
        let tex = coord_texture();
        let mut surf = flat_surface([32, 32], [0, 0]);
        surf.samples = Some(vec![0; surf.light_size()]);
        let ctx = LightContext { fullbright: true, ..light_ctx(PixelFormat::TrueColor) };
        let out = draw_truecolor(&surf, &tex, 0, &ctx);
        let pal = gray_palette();
        assert_eq!(out[5], pal.color(tex.mips[0][5]));
    }

    #[test]
    fn test_dark_surface_indexed_uses_last_rows() {
        let tex = Texture::from_base("flat", 16, 16, vec![150u8; 16 * 16]);
        let mut surf = flat_surface([16, 16], [0, 0]);
        surf.samples = Some(vec![0; surf.light_size()]);
        let out = draw_indexed(&surf, &tex, 0, true);
        assert!(out.iter().all(|&p| p < 10));
    }

    #[test]
    fn test_every_mip_fills_destination() {
        let tex = coord_texture();
        let surf = flat_surface([32, 32], [0, 0]);
        for mip in 0..MIPLEVELS {
            let out = draw_truecolor(&surf, &tex, mip, &light_ctx(PixelFormat::TrueColor));
            assert_eq!(out.len(), (32 >> mip) * (32 >> mip));
            let pal = gray_palette();
            let src = tex.mip(mip);
            assert_eq!(out[0], pal.color(src.pixels[0]), "mip {}", mip);
        }
    }

    #[test]
    fn test_indexed_every_mip_reproduces_texture() {
        let tex = coord_texture();
        let surf = flat_surface([32, 32], [0, 0]);
        for mip in 0..MIPLEVELS {
            let out = draw_indexed(&surf, &tex, mip, true);
            assert_eq!(out.as_slice(), tex.mip(mip).pixels, "mip {}", mip);
        }
    }

    #[test]
    fn test_indexed_mip3_uses_2x2_dither() {
        let tex = Texture::from_base("flat", 32, 32, vec![150u8; 32 * 32]);
        let mut surf = flat_surface([32, 32], [0, 0]);
        // light sits 0xBE into colormap row 32
        surf.samples = Some(vec![125; surf.light_size()]);

        let plain = draw_indexed(&surf, &tex, 3, false);
        assert!(plain.iter().all(|&p| p == 150));

        let dithered = draw_indexed(&surf, &tex, 3, true);
        for y in 0..4 {
            for x in 0..4 {
                let expected = match (y & 1, x & 1) {
                    (0, 0) | (1, 1) => 150,
                    _ => 145,
                };
                assert_eq!(dithered[y * 4 + x], expected, "pixel {},{}", x, y);
            }
        }
    }

    #[test]
    fn test_light_gradient_interpolates_down_block() {
        let tex = Texture::from_base("flat", 16, 16, vec![100u8; 16 * 16]);
        let mut surf = flat_surface([16, 16], [0, 0]);
        // top row bright, bottom row dark
        surf.samples = Some(vec![255, 255, 0, 0]);

        let out = draw_indexed(&surf, &tex, 0, false);
        for y in 0..16 {
            let row = &out[y * 16..(y + 1) * 16];
            assert!(row.iter().all(|&p| p == row[0]), "row {}", y);
            if y > 0 {
                assert!(row[0] <= out[(y - 1) * 16], "row {}", y);
            }
        }
        assert_eq!(out[0], 200);
        assert!(out[8 * 16] < out[0]);
        assert!(out[15 * 16] < out[8 * 16]);

        let out = draw_truecolor(&surf, &tex, 0, &light_ctx(PixelFormat::TrueColor));
        let red = |p: u32| p.to_le_bytes()[0];
        assert!(red(out[0]) > red(out[8 * 16]));
        assert!(red(out[8 * 16]) > red(out[15 * 16]));
        assert_eq!(red(out[0]), red(out[15]));
    }

    #[test]
    fn test_light_gradient_interpolates_across_block() {
        let tex = Texture::from_base("flat", 16, 16, vec![100u8; 16 * 16]);
        let mut surf = flat_surface([16, 16], [0, 0]);
        // left column bright, right column dark
        surf.samples = Some(vec![255, 0, 255, 0]);
        let out = draw_truecolor(&surf, &tex, 0, &light_ctx(PixelFormat::TrueColor));
        let red = |p: u32| p.to_le_bytes()[0];
        assert!(red(out[0]) > red(out[8]));
        assert!(red(out[8]) > red(out[15]));
        assert_eq!(red(out[0]), red(out[16]));
    }
}
