// d_part.rs — software particle drawing

use std::borrow::Borrow;

use crate::d_view::{DView, ParticleProjection};
use crate::r_local::Particle;
use crate::vid::{Palette, PixelBuffer, ViewTarget};
use swq_common::q_shared::{dot_product, vector_subtract};

/// A particle that survived clipping, in screen space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectedParticle {
    pub u: usize,
    pub v: usize,
    pub izi: i32,
    pub size: usize,
}

/// Transform, clip and size one particle. `None` when it is behind the
/// near plane or outside the particle rectangle.
pub fn d_project_particle(proj: &ParticleProjection, dview: &DView, p: &Particle) -> Option<ProjectedParticle> {
    let local = vector_subtract(&p.org, &proj.origin);
    let transformed = [
        dot_product(&local, &proj.pright),
        dot_product(&local, &proj.pup),
        dot_product(&local, &proj.ppn),
    ];

    if transformed[2] < proj.z_clip {
        return None;
    }

    let zi = 1.0 / transformed[2];
    let u = (proj.xcenter + zi * transformed[0] + 0.5) as i32;
    let v = (proj.ycenter - zi * transformed[1] + 0.5) as i32;

    if v > dview.vrectbottom_particle
        || u > dview.vrectright_particle
        || v < dview.vrecty
        || u < dview.vrectx
    {
        return None;
    }

    let izi = (zi * 0x8000 as f32) as i32;
    let size = (izi >> dview.pix_shift).clamp(dview.pix_min, dview.pix_max);

    Some(ProjectedParticle {
        u: u as usize,
        v: v as usize,
        izi,
        size: size as usize,
    })
}

// ============================================================
// Pixel painting
// ============================================================

struct Splat<'a, T> {
    pdest: &'a mut [T],
    pz: &'a mut [i16],
    screenwidth: usize,
    zwidth: usize,
    u: usize,
    v: usize,
    izi: i16,
    color: T,
    y_aspect_shift: i32,
}

impl<T: Copy> Splat<'_, T> {
    #[inline(always)]
    fn plot_row(&mut self, row: usize, width: usize) {
        let d = (self.v + row) * self.screenwidth + self.u;
        let z = (self.v + row) * self.zwidth + self.u;
        let (izi, color) = (self.izi, self.color);
        for (pd, pz) in self.pdest[d..d + width].iter_mut().zip(&mut self.pz[z..z + width]) {
            if *pz <= izi {
                *pz = izi;
                *pd = color;
            }
        }
    }

    /// Fixed-width square for the common small sizes.
    fn draw_fixed<const N: usize>(&mut self) {
        for row in 0..(N << self.y_aspect_shift) {
            self.plot_row(row, N);
        }
    }

    fn draw_any(&mut self, size: usize) {
        for row in 0..(size << self.y_aspect_shift) {
            self.plot_row(row, size);
        }
    }

    fn draw(&mut self, size: usize) {
        match size {
            1 => self.draw_fixed::<1>(),
            2 => self.draw_fixed::<2>(),
            3 => self.draw_fixed::<3>(),
            4 => self.draw_fixed::<4>(),
            _ => self.draw_any(size),
        }
    }
}

/// Paint a projected particle into the view buffer with a depth test.
/// Pixels whose stored z is not greater than the particle's are replaced.
pub fn d_draw_particle_pixels(pp: &ProjectedParticle, color: u8, dview: &DView, palette: &Palette, target: &mut ViewTarget<'_>) {
    let izi = pp.izi.min(i16::MAX as i32) as i16;
    let (screenwidth, zwidth) = (target.screenwidth, target.zwidth);

    match &mut target.pixels {
        PixelBuffer::Indexed(pixels) => Splat {
            pdest: pixels,
            pz: &mut *target.zbuffer,
            screenwidth,
            zwidth,
            u: pp.u,
            v: pp.v,
            izi,
            color,
            y_aspect_shift: dview.y_aspect_shift,
        }
        .draw(pp.size),
        PixelBuffer::TrueColor(pixels) => Splat {
            pdest: pixels,
            pz: &mut *target.zbuffer,
            screenwidth,
            zwidth,
            u: pp.u,
            v: pp.v,
            izi,
            color: palette.color(color),
            y_aspect_shift: dview.y_aspect_shift,
        }
        .draw(pp.size),
    }
}

/// Draw one particle.
pub fn d_draw_particle(
    proj: &ParticleProjection,
    dview: &DView,
    p: &Particle,
    palette: &Palette,
    target: &mut ViewTarget<'_>,
) {
    if let Some(pp) = d_project_particle(proj, dview, p) {
        d_draw_particle_pixels(&pp, p.color, dview, palette, target);
    }
}

/// Draw every particle from this frame's particle list. Returns how many
/// were visible.
pub fn d_draw_particles<I>(
    proj: &ParticleProjection,
    dview: &DView,
    particles: I,
    palette: &Palette,
    target: &mut ViewTarget<'_>,
) -> usize
where
    I: IntoIterator,
    I::Item: Borrow<Particle>,
{
    let mut drawn = 0;
    for p in particles {
        let p = p.borrow();
        if let Some(pp) = d_project_particle(proj, dview, p) {
            d_draw_particle_pixels(&pp, p.color, dview, palette, target);
            drawn += 1;
        }
    }
    drawn
}
