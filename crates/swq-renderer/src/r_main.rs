// r_main.rs — renderer context, cvars and per-frame entry points

use std::borrow::Borrow;

use crate::d_part::{d_draw_particle, d_draw_particles};
use crate::d_view::{d_view_changed, DView, MipSelector, ParticleProjection, VRect};
use crate::r_anim::{build_anim_groups, r_texture_animation, AnimError, AnimGroup};
use crate::r_cache::{build_surface_caches, SurfaceCache};
use crate::r_light::{r_animate_light, surface_lightadj, BlockLights, LightContext, LightStyle};
use crate::r_local::*;
use crate::r_surf::{r_draw_surface, DrawSurf};
use crate::r_warp::{r_gen_tile, tile_image, SkyTileSource, TurbTable, TILE_SIZE};
use crate::vid::{PixelBuffer, ViewTarget, VidTables};
use swq_common::common::{com_dprintf, com_printf};
use swq_common::cvar::{
    cvar_get_latched_vars, cvar_register_table, cvar_take_modified, cvar_variable_value, CvarContext,
};
use swq_common::q_shared::{Vec3, CVAR_ARCHIVE, CVAR_ZERO};

pub const REF_VERSION: &str = "SOFT 0.01";

// ============================================================
// Cvars
// ============================================================

/// Renderer cvars: name, default, flags.
pub const RENDER_CVARS: &[(&str, &str, i32)] = &[
    ("r_fullbright", "0", CVAR_ZERO),
    ("r_ambient", "0", CVAR_ZERO),
    ("r_dynamic", "1", CVAR_ARCHIVE),
    ("d_mipcap", "0", CVAR_ZERO),
    ("d_mipscale", "1", CVAR_ZERO),
    ("r_dither", "1", CVAR_ARCHIVE),
    ("developer", "0", CVAR_ZERO),
];

/// Register the renderer's cvars with the global cvar system.
pub fn r_register() {
    cvar_register_table(RENDER_CVARS);
}

/// Register the renderer's cvars with a private context.
pub fn r_register_in(ctx: &mut CvarContext) {
    ctx.register_table(RENDER_CVARS);
}

/// Snapshot of the renderer cvars, read once per frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderSettings {
    pub fullbright: bool,
    pub ambient: i32,
    pub dynamic: bool,
    pub mipcap: f32,
    pub mipscale: f32,
    pub dither: bool,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            fullbright: false,
            ambient: 0,
            dynamic: true,
            mipcap: 0.0,
            mipscale: 1.0,
            dither: true,
        }
    }
}

impl RenderSettings {
    fn from_lookup(value: impl Fn(&str) -> f32) -> Self {
        Self {
            fullbright: value("r_fullbright") != 0.0,
            ambient: value("r_ambient") as i32,
            dynamic: value("r_dynamic") != 0.0,
            mipcap: value("d_mipcap"),
            mipscale: value("d_mipscale"),
            dither: value("r_dither") != 0.0,
        }
    }

    /// Read from the global cvar system.
    pub fn from_cvars() -> Self {
        Self::from_lookup(cvar_variable_value)
    }

    pub fn from_context(ctx: &CvarContext) -> Self {
        Self::from_lookup(|name| ctx.variable_value(name))
    }
}

// ============================================================
// Frame inputs
// ============================================================

/// The view and lighting state for one frame.
#[derive(Debug, Clone)]
pub struct RefDef<'a> {
    pub vrect: VRect,
    pub fov_x: f32,
    pub pixel_aspect: f32,
    pub vieworg: Vec3,
    pub vpn: Vec3,
    pub vright: Vec3,
    pub vup: Vec3,
    /// Seconds since the level started.
    pub time: f64,
    pub ambientlight: i32,
    pub lightstyles: &'a [LightStyle],
    pub dlights: &'a [DLight],
}

/// The loaded world's textures and surfaces.
#[derive(Debug, Clone, Default)]
pub struct WorldModel {
    pub textures: Vec<Texture>,
    pub anim_groups: Vec<AnimGroup>,
    pub surfaces: Vec<Surface>,
    /// False for maps compiled without light data.
    pub has_lightdata: bool,
}

impl WorldModel {
    /// Take ownership of a level's data, sequencing its animated textures.
    pub fn new(mut textures: Vec<Texture>, surfaces: Vec<Surface>, has_lightdata: bool) -> Result<Self, AnimError> {
        let anim_groups = build_anim_groups(&mut textures).map_err(|e| {
            com_printf(&format!("Mod_LoadTextures: {}\n", e));
            e
        })?;
        for surf in &surfaces {
            debug_assert!(surf.texinfo.texture < textures.len(), "surface without texture");
        }
        Ok(Self {
            textures,
            anim_groups,
            surfaces,
            has_lightdata,
        })
    }
}

// ============================================================
// Renderer
// ============================================================

/// Software refresh state shared by every draw in a frame.
pub struct Renderer {
    pub tables: VidTables,
    pub settings: RenderSettings,
    pub framecount: i32,
    pub lightstylevalue: [i32; MAX_LIGHTSTYLES],
    pub dview: DView,
    pub projection: ParticleProjection,
    pub mip: MipSelector,
    turb: TurbTable,
    blocklights: BlockLights,
    tile: Vec<u8>,
    sky: Option<Box<dyn SkyTileSource>>,
    view: Option<(VRect, f32, f32)>,
    time: f64,
    ambientlight: i32,
    dlights: Vec<DLight>,
}

impl Renderer {
    pub fn new(tables: VidTables, settings: RenderSettings) -> Self {
        let vrect = VRect::new(0, 0, 320, 240);
        Self {
            tables,
            settings,
            framecount: 0,
            lightstylevalue: [0; MAX_LIGHTSTYLES],
            dview: DView::default(),
            projection: ParticleProjection::new(
                &vrect,
                90.0,
                1.0,
                [0.0; 3],
                [1.0, 0.0, 0.0],
                [0.0, -1.0, 0.0],
                [0.0, 0.0, 1.0],
                PARTICLE_Z_CLIP,
            ),
            mip: MipSelector::new(settings.mipscale, settings.mipcap),
            turb: TurbTable::new(),
            blocklights: BlockLights::new(),
            tile: vec![0; TILE_SIZE * TILE_SIZE],
            sky: None,
            view: None,
            time: 0.0,
            ambientlight: 0,
            dlights: Vec::new(),
        }
    }

    /// Register cvars and build a renderer configured from them.
    pub fn init(tables: VidTables) -> Self {
        r_register();
        cvar_get_latched_vars();
        com_printf(&format!("ref_soft version: {}\n", REF_VERSION));
        Self::new(tables, RenderSettings::from_cvars())
    }

    /// Re-read the settings if any renderer cvar changed since the last call.
    pub fn refresh_settings(&mut self) {
        let mut changed = false;
        for &(name, _, _) in RENDER_CVARS {
            changed |= cvar_take_modified(name);
        }
        if changed {
            self.settings = RenderSettings::from_cvars();
            com_dprintf("renderer settings changed\n");
        }
    }

    pub fn set_sky(&mut self, sky: Box<dyn SkyTileSource>) {
        self.sky = Some(sky);
    }

    /// Advance to a new frame: animate light styles, take the frame's
    /// dynamic lights, and rederive view state when the view changed.
    pub fn begin_frame(&mut self, refdef: &RefDef<'_>) {
        self.framecount += 1;
        self.time = refdef.time;
        self.ambientlight = refdef.ambientlight + self.settings.ambient;
        self.mip = MipSelector::new(self.settings.mipscale, self.settings.mipcap);

        r_animate_light(refdef.lightstyles, refdef.time, &mut self.lightstylevalue);

        self.dlights.clear();
        self.dlights
            .extend(refdef.dlights.iter().take(MAX_DLIGHTS).copied());

        let view = (refdef.vrect, refdef.fov_x, refdef.pixel_aspect);
        if self.view != Some(view) {
            self.dview = d_view_changed(&refdef.vrect, refdef.pixel_aspect, refdef.fov_x);
            self.view = Some(view);
            com_dprintf(&format!(
                "D_ViewChanged: {}x{} particles {}..{} shift {} aspect {}\n",
                refdef.vrect.width,
                refdef.vrect.height,
                self.dview.pix_min,
                self.dview.pix_max,
                self.dview.pix_shift,
                self.dview.y_aspect_shift
            ));
        }

        self.projection = ParticleProjection::new(
            &refdef.vrect,
            refdef.fov_x,
            refdef.pixel_aspect,
            refdef.vieworg,
            refdef.vpn,
            refdef.vright,
            refdef.vup,
            PARTICLE_Z_CLIP,
        );
    }

    /// Current frame time.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Mip level for a surface whose nearest point has inverse depth
    /// `nearzi`, given its texture's `mipadjust`.
    pub fn mip_level(&self, nearzi: f32, mipadjust: f32) -> usize {
        self.mip
            .d_mip_level_for_scale(nearzi * self.dview.scale_for_mip * mipadjust)
    }

    fn light_context<'a>(&'a self, world: &WorldModel) -> LightContext<'a> {
        LightContext {
            fullbright: self.settings.fullbright,
            has_lightdata: world.has_lightdata,
            ambientlight: self.ambientlight,
            dynamic: self.settings.dynamic,
            dlights: &self.dlights,
            framecount: self.framecount,
            pixel_format: self.tables.pixel_format,
        }
    }

    /// The texture drawn for `surf` this frame.
    pub fn surface_texture(&self, world: &WorldModel, surf: &Surface, alternate: bool) -> usize {
        r_texture_animation(
            &world.textures,
            &world.anim_groups,
            surf.texinfo.texture,
            self.time,
            alternate,
        )
    }

    /// Light and draw one surface at `miplevel` into `dest`, whose rows are
    /// `rowpixels` apart. Turbulent and sky surfaces draw from a freshly
    /// generated tile at full detail.
    pub fn draw_surface(
        &mut self,
        world: &WorldModel,
        surf: &Surface,
        miplevel: usize,
        alternate: bool,
        dest: PixelBuffer<'_>,
        rowpixels: usize,
    ) {
        let texture = &world.textures[self.surface_texture(world, surf, alternate)];
        let lightadj = surface_lightadj(surf, &self.lightstylevalue);

        let (source, miplevel) = if surf.flags.needs_tile() {
            r_gen_tile(
                surf.flags,
                texture.mip(0),
                &self.turb,
                self.sky.as_deref(),
                self.time,
                &mut self.tile,
            );
            (tile_image(&self.tile), 0)
        } else {
            (texture.mip(miplevel), miplevel)
        };

        let mut ds = DrawSurf::new(surf, source, miplevel, lightadj);
        ds.rowpixels = rowpixels;

        let light = LightContext {
            fullbright: self.settings.fullbright,
            has_lightdata: world.has_lightdata,
            ambientlight: self.ambientlight,
            dynamic: self.settings.dynamic,
            dlights: &self.dlights,
            framecount: self.framecount,
            pixel_format: self.tables.pixel_format,
        };
        r_draw_surface(
            &ds,
            &light,
            &mut self.blocklights,
            &self.tables,
            self.settings.dither,
            dest,
        );
    }

    /// Build cache blocks for `(surface index, mip)` requests, spreading
    /// large batches across worker threads.
    pub fn build_caches(&self, world: &WorldModel, requests: &[(usize, usize)], alternate: bool) -> Vec<SurfaceCache> {
        // tiles are generated up front, one per tiled request
        let tiles: Vec<Option<Vec<u8>>> = requests
            .iter()
            .map(|&(si, _)| {
                let surf = &world.surfaces[si];
                surf.flags.needs_tile().then(|| {
                    let texture = &world.textures[self.surface_texture(world, surf, alternate)];
                    let mut tile = vec![0; TILE_SIZE * TILE_SIZE];
                    r_gen_tile(
                        surf.flags,
                        texture.mip(0),
                        &self.turb,
                        self.sky.as_deref(),
                        self.time,
                        &mut tile,
                    );
                    tile
                })
            })
            .collect();

        let draws: Vec<DrawSurf<'_>> = requests
            .iter()
            .zip(&tiles)
            .map(|(&(si, miplevel), tile)| {
                let surf = &world.surfaces[si];
                let lightadj = surface_lightadj(surf, &self.lightstylevalue);
                match tile {
                    Some(tile) => DrawSurf::new(surf, tile_image(tile), 0, lightadj),
                    None => {
                        let texture = &world.textures[self.surface_texture(world, surf, alternate)];
                        DrawSurf::new(surf, texture.mip(miplevel), miplevel, lightadj)
                    }
                }
            })
            .collect();

        build_surface_caches(&draws, &self.light_context(world), &self.tables, self.settings.dither)
    }

    /// Draw one particle into the view.
    pub fn draw_particle(&self, p: &Particle, target: &mut ViewTarget<'_>) {
        d_draw_particle(&self.projection, &self.dview, p, &self.tables.palette, target);
    }

    /// Draw this frame's particles; returns how many were on screen.
    pub fn draw_particles<I>(&self, particles: I, target: &mut ViewTarget<'_>) -> usize
    where
        I: IntoIterator,
        I::Item: Borrow<Particle>,
    {
        d_draw_particles(&self.projection, &self.dview, particles, &self.tables.palette, target)
    }
}
