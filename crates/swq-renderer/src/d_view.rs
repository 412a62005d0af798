// d_view.rs — per-view driver state: particle sizing, projection, mip selection

use crate::r_local::MIPLEVELS;
use swq_common::q_shared::{vector_scale, Vec3};

/// Pixel aspect above which particles are drawn double height.
pub const TALL_PIXEL_ASPECT: f32 = 1.4;

/// Distance thresholds for mips 0..2 before `d_mipscale`.
pub const BASEMIP: [f32; MIPLEVELS - 1] = [1.0, 0.4, 0.2];

// ============================================================
// View rectangle
// ============================================================

/// The visible part of the destination buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl VRect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }
}

/// Horizontal field of view expressed as the width of the projection plane
/// at unit distance.
pub fn horizontal_field_of_view(fov_x: f32) -> f32 {
    2.0 * (fov_x / 360.0 * std::f32::consts::PI).tan()
}

// ============================================================
// Driver view state
// ============================================================

/// Values derived once per view change and read by every particle draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DView {
    pub pix_min: i32,
    pub pix_max: i32,
    pub pix_shift: i32,
    pub y_aspect_shift: i32,
    pub vrectx: i32,
    pub vrecty: i32,
    pub vrectright_particle: i32,
    pub vrectbottom_particle: i32,
    /// Larger of the two projection scales, used to pick mip levels.
    pub scale_for_mip: f32,
}

impl Default for DView {
    fn default() -> Self {
        d_view_changed(&VRect::new(0, 0, 320, 240), 1.0, 90.0)
    }
}

/// Recompute the per-view particle and mip parameters.
pub fn d_view_changed(vrect: &VRect, pixel_aspect: f32, fov_x: f32) -> DView {
    let width = vrect.width as f32;
    let xscale = width / horizontal_field_of_view(fov_x);
    let yscale = xscale * pixel_aspect;

    let pix_min = (vrect.width / 320).max(1);
    let pix_max = ((width / (320.0 / 4.0) + 0.5) as i32).max(1);
    // Views 2720 px and wider would otherwise shift by a negative amount.
    let pix_shift = (8 - (width / 320.0 + 0.5) as i32).clamp(0, 31);
    let y_aspect_shift = if pixel_aspect > TALL_PIXEL_ASPECT { 1 } else { 0 };

    DView {
        pix_min,
        pix_max,
        pix_shift,
        y_aspect_shift,
        vrectx: vrect.x,
        vrecty: vrect.y,
        vrectright_particle: vrect.right() - pix_max,
        vrectbottom_particle: vrect.bottom() - (pix_max << y_aspect_shift),
        scale_for_mip: xscale.max(yscale),
    }
}

// ============================================================
// Particle projection
// ============================================================

/// The view transform particles are projected through.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParticleProjection {
    pub origin: Vec3,
    pub pright: Vec3,
    pub pup: Vec3,
    pub ppn: Vec3,
    pub xcenter: f32,
    pub ycenter: f32,
    pub z_clip: f32,
}

impl ParticleProjection {
    /// Build the particle axes for a view at `origin` facing `vpn`.
    ///
    /// The right and up axes are scaled so a projected point lands a few
    /// pixels inside the view edges.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        vrect: &VRect,
        fov_x: f32,
        pixel_aspect: f32,
        origin: Vec3,
        vpn: Vec3,
        vright: Vec3,
        vup: Vec3,
        z_clip: f32,
    ) -> Self {
        let xscaleshrink = (vrect.width - 6) as f32 / horizontal_field_of_view(fov_x);
        let yscaleshrink = xscaleshrink * pixel_aspect;

        Self {
            origin,
            pright: vector_scale(&vright, xscaleshrink),
            pup: vector_scale(&vup, yscaleshrink),
            ppn: vpn,
            xcenter: vrect.width as f32 * 0.5 + vrect.x as f32 - 0.5,
            ycenter: vrect.height as f32 * 0.5 + vrect.y as f32 - 0.5,
            z_clip,
        }
    }
}

// ============================================================
// Mip selection
// ============================================================

/// Mip thresholds scaled by `d_mipscale`, floored at `d_mipcap`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MipSelector {
    pub scalemip: [f32; MIPLEVELS - 1],
    pub minmip: usize,
}

impl Default for MipSelector {
    fn default() -> Self {
        Self::new(1.0, 0.0)
    }
}

impl MipSelector {
    pub fn new(mipscale: f32, mipcap: f32) -> Self {
        let mut scalemip = BASEMIP;
        for s in scalemip.iter_mut() {
            *s *= mipscale;
        }
        Self {
            scalemip,
            minmip: (mipcap.max(0.0) as usize).min(MIPLEVELS - 1),
        }
    }

    /// Mip level for a projected texel scale; larger scales are nearer.
    pub fn d_mip_level_for_scale(&self, scale: f32) -> usize {
        let level = self
            .scalemip
            .iter()
            .position(|&threshold| scale >= threshold)
            .unwrap_or(MIPLEVELS - 1);
        level.max(self.minmip)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ============================================================
    // View change
    // ============================================================

    #[test]
    fn test_view_changed_320() {
        let d = d_view_changed(&VRect::new(0, 0, 320, 200), 1.0, 90.0);
        assert_eq!(d.pix_min, 1);
        assert_eq!(d.pix_max, 4);
        assert_eq!(d.pix_shift, 7);
        assert_eq!(d.y_aspect_shift, 0);
        assert_eq!(d.vrectright_particle, 316);
        assert_eq!(d.vrectbottom_particle, 196);
    }

    #[test]
    fn test_view_changed_640_tall_pixels() {
        let d = d_view_changed(&VRect::new(8, 4, 640, 400), 1.5, 90.0);
        assert_eq!(d.pix_min, 2);
        assert_eq!(d.pix_max, 8);
        assert_eq!(d.pix_shift, 6);
        assert_eq!(d.y_aspect_shift, 1);
        assert_eq!(d.vrectx, 8);
        assert_eq!(d.vrecty, 4);
        assert_eq!(d.vrectright_particle, 648 - 8);
        assert_eq!(d.vrectbottom_particle, 404 - 16);
    }

    #[test]
    fn test_view_changed_tiny_view_keeps_one_pixel() {
        let d = d_view_changed(&VRect::new(0, 0, 40, 30), 1.0, 90.0);
        assert_eq!(d.pix_min, 1);
        assert_eq!(d.pix_max, 1);
    }

    #[test]
    fn test_view_changed_wide_view() {
        let d = d_view_changed(&VRect::new(0, 0, 3840, 2160), 1.0, 90.0);
        assert_eq!(d.pix_shift, 0);
        assert_eq!(d.pix_min, 12);
        assert_eq!(d.pix_max, 48);
        let d = d_view_changed(&VRect::new(0, 0, 2560, 1440), 1.0, 90.0);
        assert_eq!(d.pix_shift, 0);
    }

    #[test]
    fn test_scale_for_mip_uses_larger_axis() {
        let square = d_view_changed(&VRect::new(0, 0, 320, 240), 1.0, 90.0);
        let tall = d_view_changed(&VRect::new(0, 0, 320, 240), 2.0, 90.0);
        // fov 90 gives a projection plane 2 units wide
        assert!((square.scale_for_mip - 160.0).abs() < 0.01);
        assert!((tall.scale_for_mip - 320.0).abs() < 0.01);
    }

    // ============================================================
    // Projection
    // ============================================================

    #[test]
    fn test_projection_centers() {
        let p = ParticleProjection::new(
            &VRect::new(10, 20, 320, 240),
            90.0,
            1.0,
            [0.0; 3],
            [1.0, 0.0, 0.0],
            [0.0, -1.0, 0.0],
            [0.0, 0.0, 1.0],
            8.0,
        );
        assert_eq!(p.xcenter, 169.5);
        assert_eq!(p.ycenter, 139.5);
        assert!((p.pright[1] + 157.0).abs() < 0.01);
        assert!((p.pup[2] - 157.0).abs() < 0.01);
        assert_eq!(p.ppn, [1.0, 0.0, 0.0]);
    }

    // ============================================================
    // Mip selection
    // ============================================================

    #[test]
    fn test_mip_thresholds() {
        let m = MipSelector::default();
        assert_eq!(m.d_mip_level_for_scale(2.0), 0);
        assert_eq!(m.d_mip_level_for_scale(1.0), 0);
        assert_eq!(m.d_mip_level_for_scale(0.5), 1);
        assert_eq!(m.d_mip_level_for_scale(0.4), 1);
        assert_eq!(m.d_mip_level_for_scale(0.3), 2);
        assert_eq!(m.d_mip_level_for_scale(0.1), 3);
    }

    #[test]
    fn test_mipscale_moves_thresholds() {
        let m = MipSelector::new(2.0, 0.0);
        assert_eq!(m.d_mip_level_for_scale(1.0), 1);
        assert_eq!(m.d_mip_level_for_scale(0.5), 2);
    }

    #[test]
    fn test_mipcap_floors_level() {
        let m = MipSelector::new(1.0, 2.0);
        assert_eq!(m.d_mip_level_for_scale(10.0), 2);
        assert_eq!(m.d_mip_level_for_scale(0.01), 3);
        assert_eq!(MipSelector::new(1.0, 9.0).minmip, MIPLEVELS - 1);
        assert_eq!(MipSelector::new(1.0, -3.0).minmip, 0);
    }
}
