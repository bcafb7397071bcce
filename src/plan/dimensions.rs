use crate::error::JobError;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn square(side: u32) -> Self {
        Self {
            width: side,
            height: side,
        }
    }

    pub fn long_side(self) -> u32 {
        self.width.max(self.height)
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Scales `width`x`height` so that the longer side becomes `target_long_side`
/// and the shorter one keeps the aspect ratio.
///
/// Both output sides are even, VP9 with `yuva420p` can't encode odd sizes.
/// The shorter side is rounded down to an even number so that it never
/// overshoots the proportional value by more than rounding.
pub fn plan(width: u32, height: u32, target_long_side: u32) -> Result<Dimensions, JobError> {
    let invalid = || JobError::InvalidGeometry {
        width,
        height,
        target_long_side,
    };

    if width == 0 || height == 0 || target_long_side == 0 || target_long_side % 2 != 0 {
        return Err(invalid());
    }

    if width == height {
        return Ok(Dimensions::square(target_long_side));
    }

    let (long, short) = (width.max(height), width.min(height));

    let scaled = (f64::from(target_long_side) * f64::from(short) / f64::from(long)).round() as u32;
    let short_out = (scaled - scaled % 2).max(2);

    Ok(if width > height {
        Dimensions {
            width: target_long_side,
            height: short_out,
        }
    } else {
        Dimensions {
            width: short_out,
            height: target_long_side,
        }
    })
}
