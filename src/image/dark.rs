//! Detector dark-level removal.
use super::ImageF64;
use crate::error::Result;

/// What was subtracted from the frames.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DarkCorrection {
    /// A dark frame, pixel by pixel.
    Frame,
    /// A scalar level estimated on the sample corner.
    CornerLevel(f64),
    /// Nothing: the corner held no finite pixel.
    None,
}

/// Subtract `dark` from sample and reference, or, without a dark frame, the
/// [`ImageF64::corner_dark_level`] of the sample over `corner` pixels.
pub fn subtract_dark(
    sample: &mut ImageF64,
    reference: Option<&mut ImageF64>,
    dark: Option<&ImageF64>,
    corner: usize,
) -> Result<DarkCorrection> {
    if let Some(dark) = dark {
        *sample = sample.zip_map(dark, |a, b| a - b)?;
        if let Some(r) = reference {
            *r = r.zip_map(dark, |a, b| a - b)?;
        }
        return Ok(DarkCorrection::Frame);
    }
    let Some(level) = sample.corner_dark_level(corner) else {
        return Ok(DarkCorrection::None);
    };
    log::info!("No dark frame; subtracting dark level {level} from the {corner}x{corner} corner");
    sample.offset(-level);
    if let Some(r) = reference {
        r.offset(-level);
    }
    Ok(DarkCorrection::CornerLevel(level))
}
