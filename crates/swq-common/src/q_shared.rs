// q_shared.rs — types and math shared by every engine crate

pub type Vec3 = [f32; 3];

// ============================================================
// Error codes (Com_Error)
// ============================================================

pub const ERR_FATAL: i32 = 0;
pub const ERR_DROP: i32 = 1;

// ============================================================
// Cvar flags
// ============================================================

pub const CVAR_ZERO: i32 = 0;
/// Saved to the config file on shutdown.
pub const CVAR_ARCHIVE: i32 = 1;
/// Cannot be changed by the user at all.
pub const CVAR_NOSET: i32 = 8;
/// Changes are held until `get_latched_vars` (video restart).
pub const CVAR_LATCH: i32 = 16;

// ============================================================
// Planes
// ============================================================

pub const PLANE_X: u8 = 0;
pub const PLANE_Y: u8 = 1;
pub const PLANE_Z: u8 = 2;
pub const PLANE_ANYZ: u8 = 5;

/// A map plane: `dot(normal, p) == dist` for points on the plane.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MPlane {
    pub normal: Vec3,
    pub dist: f32,
    pub plane_type: u8,
}

impl MPlane {
    pub fn new(normal: Vec3, dist: f32) -> Self {
        let plane_type = if normal[0] == 1.0 {
            PLANE_X
        } else if normal[1] == 1.0 {
            PLANE_Y
        } else if normal[2] == 1.0 {
            PLANE_Z
        } else {
            PLANE_ANYZ
        };
        Self { normal, dist, plane_type }
    }

    /// Signed distance from `point` to the plane.
    #[inline]
    pub fn distance(&self, point: &Vec3) -> f32 {
        dot_product(point, &self.normal) - self.dist
    }
}

// ============================================================
// Vector math
// ============================================================

#[inline]
pub fn dot_product(a: &Vec3, b: &Vec3) -> f32 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

#[inline]
pub fn vector_subtract(a: &Vec3, b: &Vec3) -> Vec3 {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

/// veca + scale * vecb
pub fn vector_ma(veca: &Vec3, scale: f32, vecb: &Vec3) -> Vec3 {
    [
        veca[0] + scale * vecb[0],
        veca[1] + scale * vecb[1],
        veca[2] + scale * vecb[2],
    ]
}

pub fn vector_scale(v: &Vec3, scale: f32) -> Vec3 {
    [v[0] * scale, v[1] * scale, v[2] * scale]
}
