//! RGBA color tuples

use crate::error::{Error, Result};

/// An RGBA color with components nominally in `[0, 1]`
pub type Rgba = [f32; 4];

/// Color used to fill components a caller leaves out
pub const DEFAULT_RGBA: Rgba = [0.0, 0.0, 0.0, 1.0];

/// Build a color from up to four components
///
/// Missing trailing components come from [`DEFAULT_RGBA`], so `[1.0, 0.0, 0.0]`
/// is opaque red. More than four components is an error.
pub fn rgba_from_slice(components: &[f32]) -> Result<Rgba> {
    if components.len() > 4 {
        return Err(Error::SizeMismatch {
            expected: 4,
            actual: components.len(),
        });
    }
    let mut rgba = DEFAULT_RGBA;
    rgba[..components.len()].copy_from_slice(components);
    Ok(rgba)
}

/// Parse a comma separated color such as `"1, 0.5, 0"` or `"0,0,1,0.25"`
pub fn parse_rgba(text: &str) -> Result<Rgba> {
    let components = text
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<f32>()
                .map_err(|_| Error::TypeMismatch(format!("Expected a float color component, got '{}'", s)))
        })
        .collect::<Result<Vec<_>>>()?;
    rgba_from_slice(&components)
}
