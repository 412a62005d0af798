// r_screenshot.rs — dump the view buffer to a PNG

use std::fs;
use std::path::{Path, PathBuf};

use image::{ImageBuffer, Rgba};

use crate::vid::{FrameBuffer, Palette, Pixels};
use swq_common::common::com_printf;

/// Highest numbered screenshot slot (`quake99.png`).
pub const MAX_SCREENSHOTS: u32 = 100;

/// Expand the view buffer to opaque RGBA bytes, row by row.
pub fn r_expand_rgba(fb: &FrameBuffer, palette: &Palette) -> Vec<u8> {
    let mut out = Vec::with_capacity(fb.width * fb.height * 4);
    match &fb.pixels {
        Pixels::Indexed(p) => {
            for &index in p {
                let [r, g, b] = palette.rgb(index);
                out.extend_from_slice(&[r, g, b, 255]);
            }
        }
        Pixels::TrueColor(p) => {
            for &color in p {
                let [r, g, b, _] = color.to_le_bytes();
                out.extend_from_slice(&[r, g, b, 255]);
            }
        }
    }
    out
}

/// First unused `quakeNN.png` in `dir`.
fn next_screenshot_path(dir: &Path) -> Option<PathBuf> {
    (0..MAX_SCREENSHOTS)
        .map(|i| dir.join(format!("quake{:02}.png", i)))
        .find(|path| !path.exists())
}

/// Write the view buffer to the next free screenshot slot under `dir`.
pub fn r_screenshot(dir: &Path, fb: &FrameBuffer, palette: &Palette) -> Result<PathBuf, String> {
    fs::create_dir_all(dir).map_err(|e| format!("SCR_ScreenShot_f: {}: {}", dir.display(), e))?;

    let path = next_screenshot_path(dir)
        .ok_or_else(|| "SCR_ScreenShot_f: Couldn't create a file".to_string())?;

    let img: ImageBuffer<Rgba<u8>, Vec<u8>> =
        ImageBuffer::from_raw(fb.width as u32, fb.height as u32, r_expand_rgba(fb, palette))
            .ok_or_else(|| "SCR_ScreenShot_f: bad buffer size".to_string())?;

    img.save(&path)
        .map_err(|e| format!("SCR_ScreenShot_f: Could not write file: {}", e))?;

    com_printf(&format!("Wrote {}\n", path.display()));
    Ok(path)
}
