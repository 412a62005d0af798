// r_local.rs — renderer local definitions

use swq_common::q_shared::{MPlane, Vec3};

// ============================================================================
// Limits
// ============================================================================

pub const MIPLEVELS: usize = 4;
pub const MAXLIGHTMAPS: usize = 4;
pub const MAX_DLIGHTS: usize = 32;
pub const MAX_LIGHTSTYLES: usize = 64;

/// Style slot value marking an unused lightmap layer.
pub const LIGHTSTYLE_UNUSED: u8 = 255;

/// Largest surface extent, in texels, the light grid is sized for.
pub const MAX_SURFACE_EXTENT: i32 = 256;

/// Light grid scratch capacity: `((MAX_SURFACE_EXTENT >> 4) + 1)` squared, rounded up.
pub const BLOCKLIGHTS_SIZE: usize = 18 * 18;

// ============================================================================
// Color depth
// ============================================================================

pub const VID_CBITS: i32 = 6;
pub const VID_GRADES: usize = 1 << VID_CBITS;
pub const COLORMAP_SIZE: usize = VID_GRADES * 256;

/// Palette entries from here up are drawn without lighting (lava, fire, lights).
pub const FULLBRIGHT_PALETTE_START: u8 = 224;

// ============================================================================
// Particles
// ============================================================================

pub const PARTICLE_Z_CLIP: f32 = 8.0;

// ============================================================================
// Surface flags (msurface_t::flags)
// ============================================================================

bitflags::bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct SurfFlags: i32 {
        const PLANEBACK      = 0x02;
        const DRAWSKY        = 0x04;
        const DRAWSPRITE     = 0x08;
        const DRAWTURB       = 0x10;
        const DRAWTILED      = 0x20;
        const DRAWBACKGROUND = 0x40;
    }
}

impl SurfFlags {
    /// Surfaces whose source pixels come from the tile generator instead of the texture.
    pub fn needs_tile(self) -> bool {
        self.intersects(SurfFlags::DRAWTURB | SurfFlags::DRAWSKY)
    }
}

// ============================================================================
// Textures
// ============================================================================

/// A named texture with its explicit mip chain.
#[derive(Debug, Clone, Default)]
pub struct Texture {
    pub name: String,
    pub width: usize,
    pub height: usize,
    pub mips: [Vec<u8>; MIPLEVELS],
    /// Animation group this texture is a frame of.
    pub anim_group: Option<usize>,
}

impl Texture {
    /// Build a texture from pre-baked mip levels, each a quarter of the previous.
    pub fn new(name: &str, width: usize, height: usize, mips: [Vec<u8>; MIPLEVELS]) -> Self {
        for (level, mip) in mips.iter().enumerate() {
            debug_assert_eq!(mip.len(), (width >> level) * (height >> level));
        }
        Self {
            name: name.to_string(),
            width,
            height,
            mips,
            anim_group: None,
        }
    }

    /// Build a texture from its base level, point-sampling the smaller mips.
    pub fn from_base(name: &str, width: usize, height: usize, base: Vec<u8>) -> Self {
        debug_assert_eq!(base.len(), width * height);
        let mut mips: [Vec<u8>; MIPLEVELS] = Default::default();
        for level in 1..MIPLEVELS {
            let (w, h) = (width >> level, height >> level);
            let mut mip = Vec::with_capacity(w * h);
            for y in 0..h {
                let row = (y << level) * width;
                for x in 0..w {
                    mip.push(base[row + (x << level)]);
                }
            }
            mips[level] = mip;
        }
        mips[0] = base;
        Self::new(name, width, height, mips)
    }

    /// Pixels and dimensions of one mip level.
    pub fn mip(&self, level: usize) -> SourceImage<'_> {
        SourceImage {
            width: self.width >> level,
            height: self.height >> level,
            pixels: &self.mips[level],
        }
    }
}

/// A borrowed block of palette-indexed source texels.
#[derive(Debug, Clone, Copy)]
pub struct SourceImage<'a> {
    pub width: usize,
    pub height: usize,
    pub pixels: &'a [u8],
}

/// Texture projection for a surface: `s = dot(p, vecs[0]) + vecs[0][3]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TexInfo {
    pub vecs: [[f32; 4]; 2],
    /// Index into the world model's texture list.
    pub texture: usize,
}

impl TexInfo {
    pub fn project(&self, point: &Vec3) -> [f32; 2] {
        let axis = |v: &[f32; 4]| point[0] * v[0] + point[1] * v[1] + point[2] * v[2] + v[3];
        [axis(&self.vecs[0]), axis(&self.vecs[1])]
    }
}

// ============================================================================
// Surfaces
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct Surface {
    pub plane: MPlane,
    pub flags: SurfFlags,
    pub texturemins: [i16; 2],
    pub extents: [i16; 2],
    pub texinfo: TexInfo,
    pub styles: [u8; MAXLIGHTMAPS],
    /// Static lightmap samples, one `light_size()` layer per used style.
    pub samples: Option<Vec<u8>>,
    /// Frame stamp of the last dynamic light marking.
    pub dlightframe: i32,
    pub dlightbits: u32,
}

impl Surface {
    /// Light grid width: one sample per 16 texels plus the trailing edge.
    #[inline]
    pub fn light_width(&self) -> usize {
        ((self.extents[0] >> 4) + 1) as usize
    }

    #[inline]
    pub fn light_height(&self) -> usize {
        ((self.extents[1] >> 4) + 1) as usize
    }

    #[inline]
    pub fn light_size(&self) -> usize {
        self.light_width() * self.light_height()
    }

    /// Number of leading style slots in use.
    pub fn num_styles(&self) -> usize {
        self.styles
            .iter()
            .take_while(|&&s| s != LIGHTSTYLE_UNUSED)
            .count()
    }
}

// ============================================================================
// Dynamic lights and particles
// ============================================================================

#[derive(Debug, Clone, Copy, Default)]
pub struct DLight {
    pub origin: Vec3,
    pub radius: f32,
    pub minlight: f32,
    /// Subtracts light instead of adding it.
    pub dark: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Particle {
    pub org: Vec3,
    pub color: u8,
}
