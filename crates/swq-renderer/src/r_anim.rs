// r_anim.rs — animated texture groups: load-time building and per-frame lookup

use crate::r_local::Texture;
use swq_common::common::com_dprintf;

/// Ticks (tenths of a second) each frame of a named animation stays up.
pub const ANIM_CYCLE: i32 = 2;
/// Frames per named sequence: `+0`..`+9` and `+a`..`+j`.
pub const MAX_ANIM_FRAMES: usize = 10;
/// Longest cycle accepted for a hand-built group.
pub const MAX_ANIM_HOPS: usize = 100;

// ============================================================
// Errors
// ============================================================

/// Malformed animation data, reported when a level's textures are loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnimError {
    /// A `+` texture whose frame character is not `0-9` or `a-j`.
    BadFrameName(String),
    /// A sequence with a hole in its frame numbers.
    MissingFrame { name: String, frame: usize },
    /// A group with no frames.
    EmptyCycle,
    /// More frames than a cycle may hold.
    CycleTooLong(usize),
    /// A group whose total duration is not positive.
    ZeroDuration,
    /// Frame windows that do not tile `[0, total)` exactly.
    BrokenCycle { expected: i32, found: i32 },
    /// A frame referencing a texture that does not exist.
    BadTexture(usize),
}

impl std::fmt::Display for AnimError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnimError::BadFrameName(name) => write!(f, "Bad animating texture {}", name),
            AnimError::MissingFrame { name, frame } => {
                write!(f, "Missing frame {} of {}", frame, name)
            }
            AnimError::EmptyCycle => write!(f, "Animation group has no frames"),
            AnimError::CycleTooLong(n) => write!(f, "Animation cycle of {} frames is too long", n),
            AnimError::ZeroDuration => write!(f, "Animation group has no duration"),
            AnimError::BrokenCycle { expected, found } => write!(
                f,
                "Broken animation cycle: window starts at {} instead of {}",
                found, expected
            ),
            AnimError::BadTexture(index) => write!(f, "Animation frame uses missing texture {}", index),
        }
    }
}

impl std::error::Error for AnimError {}

// ============================================================
// Groups
// ============================================================

/// One frame of a group and the `[min, max)` tick window it covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimFrame {
    pub texture: usize,
    pub min: i32,
    pub max: i32,
}

/// A validated, ordered animation cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnimGroup {
    frames: Vec<AnimFrame>,
    total: i32,
    /// Group drawn instead when an entity asks for its alternate frames.
    pub alternate: Option<usize>,
}

impl AnimGroup {
    /// Validate a cycle: frames sorted by window, covering `[0, total)`
    /// without gaps or overlaps.
    pub fn new(frames: Vec<AnimFrame>, total: i32) -> Result<Self, AnimError> {
        if frames.is_empty() {
            return Err(AnimError::EmptyCycle);
        }
        if frames.len() > MAX_ANIM_HOPS {
            return Err(AnimError::CycleTooLong(frames.len()));
        }
        if total <= 0 {
            return Err(AnimError::ZeroDuration);
        }

        let mut expected = 0;
        for frame in &frames {
            if frame.min != expected || frame.max <= frame.min {
                return Err(AnimError::BrokenCycle {
                    expected,
                    found: frame.min,
                });
            }
            expected = frame.max;
        }
        if expected != total {
            return Err(AnimError::BrokenCycle {
                expected: total,
                found: expected,
            });
        }

        Ok(Self {
            frames,
            total,
            alternate: None,
        })
    }

    /// A cycle of equal-length frames, `ANIM_CYCLE` ticks each.
    pub fn uniform(textures: &[usize]) -> Result<Self, AnimError> {
        let frames = textures
            .iter()
            .enumerate()
            .map(|(j, &texture)| AnimFrame {
                texture,
                min: j as i32 * ANIM_CYCLE,
                max: (j as i32 + 1) * ANIM_CYCLE,
            })
            .collect();
        Self::new(frames, textures.len() as i32 * ANIM_CYCLE)
    }

    pub fn frames(&self) -> &[AnimFrame] {
        &self.frames
    }

    /// Cycle length in ticks.
    pub fn total(&self) -> i32 {
        self.total
    }

    /// The texture whose window contains `tick` (taken modulo the cycle).
    pub fn frame_at(&self, tick: i32) -> usize {
        let relative = tick.rem_euclid(self.total);
        let idx = self
            .frames
            .partition_point(|frame| frame.max <= relative)
            .min(self.frames.len() - 1);
        self.frames[idx].texture
    }
}

// ============================================================
// Per-frame resolution
// ============================================================

/// Returns the proper texture for a given time and base texture.
///
/// `alternate` switches to the base's alternate group (toggled doors and
/// buttons) when it has one.
pub fn r_texture_animation(
    textures: &[Texture],
    groups: &[AnimGroup],
    base: usize,
    time: f64,
    alternate: bool,
) -> usize {
    let Some(mut group) = textures[base].anim_group else {
        return base;
    };

    if alternate {
        if let Some(alt) = groups[group].alternate {
            group = alt;
        }
    }

    groups[group].frame_at((time * 10.0) as i32)
}

// ============================================================
// Load-time building
// ============================================================

/// Frame slot of a `+` texture name: `(alternate, index)`.
fn parse_frame(name: &str) -> Result<(bool, usize), AnimError> {
    let c = name
        .as_bytes()
        .get(1)
        .copied()
        .ok_or_else(|| AnimError::BadFrameName(name.to_string()))?;
    match c.to_ascii_lowercase() {
        b'0'..=b'9' => Ok((false, (c - b'0') as usize)),
        c @ b'a'..=b'j' => Ok((true, (c - b'a') as usize)),
        _ => Err(AnimError::BadFrameName(name.to_string())),
    }
}

/// Collect `slots` into a dense frame list, failing on holes.
fn dense_frames(slots: &[Option<usize>; MAX_ANIM_FRAMES], name: &str) -> Result<Vec<usize>, AnimError> {
    let count = slots.iter().rposition(Option::is_some).map_or(0, |i| i + 1);
    (0..count)
        .map(|frame| {
            slots[frame].ok_or_else(|| AnimError::MissingFrame {
                name: name.to_string(),
                frame,
            })
        })
        .collect()
}

/// Sequence the animating textures (`+0name`, `+1name`, ..., `+aname`, ...)
/// into groups, linking each primary and alternate sequence to the other.
/// Sets `anim_group` on every member texture.
pub fn build_anim_groups(textures: &mut [Texture]) -> Result<Vec<AnimGroup>, AnimError> {
    let mut groups: Vec<AnimGroup> = Vec::new();
    let mut seen = vec![false; textures.len()];

    for i in 0..textures.len() {
        if seen[i] || !textures[i].name.starts_with('+') {
            continue;
        }

        let stem = textures[i].name.get(2..).unwrap_or("").to_string();
        let mut anims = [None; MAX_ANIM_FRAMES];
        let mut altanims = [None; MAX_ANIM_FRAMES];

        for (j, tx) in textures.iter().enumerate().skip(i) {
            if !tx.name.starts_with('+') || tx.name.get(2..) != Some(stem.as_str()) {
                continue;
            }
            let (alt, frame) = parse_frame(&tx.name)?;
            if alt {
                altanims[frame] = Some(j);
            } else {
                anims[frame] = Some(j);
            }
            seen[j] = true;
        }

        let primary = dense_frames(&anims, &textures[i].name)?;
        let alternate = dense_frames(&altanims, &textures[i].name)?;

        let primary_group = (!primary.is_empty()).then(|| groups.len());
        if !primary.is_empty() {
            groups.push(AnimGroup::uniform(&primary)?);
        }
        let alternate_group = (!alternate.is_empty()).then(|| groups.len());
        if !alternate.is_empty() {
            groups.push(AnimGroup::uniform(&alternate)?);
        }

        if let (Some(p), Some(a)) = (primary_group, alternate_group) {
            groups[p].alternate = Some(a);
            groups[a].alternate = Some(p);
        }
        for (group, members) in [(primary_group, &primary), (alternate_group, &alternate)] {
            for &t in members.iter() {
                textures[t].anim_group = group;
            }
        }

        com_dprintf(&format!(
            "animating {}: {} frames, {} alternate\n",
            stem,
            primary.len(),
            alternate.len()
        ));
    }

    validate_anim_groups(textures, &groups)?;
    Ok(groups)
}

/// Check that every group and texture reference in a loaded set is usable.
pub fn validate_anim_groups(textures: &[Texture], groups: &[AnimGroup]) -> Result<(), AnimError> {
    for group in groups {
        for frame in group.frames() {
            if frame.texture >= textures.len() {
                return Err(AnimError::BadTexture(frame.texture));
            }
        }
        if let Some(alt) = group.alternate {
            if alt >= groups.len() {
                return Err(AnimError::EmptyCycle);
            }
        }
    }
    for tex in textures {
        if let Some(g) = tex.anim_group {
            if g >= groups.len() {
                return Err(AnimError::EmptyCycle);
            }
        }
    }
    Ok(())
}
