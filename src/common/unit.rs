//! Unit conversion utilities.
//!
//! DrawingML measures lengths in English Metric Units (EMU), 914400 per inch.

pub const EMUS_PER_INCH: i64 = 914_400;

/// Convert inches to EMUs, rounding to the nearest unit.
#[inline]
pub fn inches_to_emu(inches: f64) -> i64 {
    (inches * EMUS_PER_INCH as f64).round() as i64
}

#[inline]
pub fn emu_to_inches(emu: i64) -> f64 {
    emu as f64 / EMUS_PER_INCH as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_slide_sizes() {
        // 4:3 and 16:9 presets
        assert_eq!((inches_to_emu(10.0), inches_to_emu(7.5)), (9_144_000, 6_858_000));
        assert_eq!(inches_to_emu(13.333_333), 12_192_000);
    }

    #[test]
    fn test_emu_to_inches() {
        assert!((emu_to_inches(6_858_000) - 7.5).abs() < f64::EPSILON);
    }
}
