// src/palette.rs

//! The heat -> colour ramp used by the fire effect.

use crate::pixel::Pixel;

/// Black through deep red and orange to pale yellow. Index 0 is "no heat".
pub static FIRE_PALETTE: [Pixel; 24] = [
    Pixel::new(0, 0, 0),
    Pixel::new(7, 0, 0),
    Pixel::new(15, 0, 0),
    Pixel::new(31, 0, 0),
    Pixel::new(47, 7, 0),
    Pixel::new(71, 15, 0),
    Pixel::new(95, 23, 0),
    Pixel::new(119, 31, 0),
    Pixel::new(143, 47, 0),
    Pixel::new(159, 63, 0),
    Pixel::new(175, 79, 0),
    Pixel::new(191, 95, 0),
    Pixel::new(207, 111, 0),
    Pixel::new(223, 127, 0),
    Pixel::new(239, 143, 0),
    Pixel::new(255, 159, 0),
    Pixel::new(255, 175, 0),
    Pixel::new(255, 191, 0),
    Pixel::new(255, 207, 0),
    Pixel::new(255, 215, 31),
    Pixel::new(255, 223, 63),
    Pixel::new(255, 231, 95),
    Pixel::new(255, 239, 127),
    Pixel::new(255, 247, 159),
];

pub const MAX_HEAT: i32 = 255;

/// Palette index for a heat value: `floor(clamp(value) / 255 * (len - 1))`.
pub fn palette_index(value: i32) -> usize {
    let clamped = value.clamp(0, MAX_HEAT) as usize;
    clamped * (FIRE_PALETTE.len() - 1) / MAX_HEAT as usize
}

/// Maps a heat value to its palette colour. Values outside 0..=255 are clamped.
pub fn heat_to_rgb(value: i32) -> Pixel {
    FIRE_PALETTE[palette_index(value)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extremes_map_to_palette_ends() {
        assert_eq!(heat_to_rgb(0), FIRE_PALETTE[0]);
        assert_eq!(heat_to_rgb(255), FIRE_PALETTE[FIRE_PALETTE.len() - 1]);
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        assert_eq!(heat_to_rgb(-40), FIRE_PALETTE[0]);
        assert_eq!(heat_to_rgb(1000), FIRE_PALETTE[23]);
    }

    #[test]
    fn index_truncates_instead_of_rounding() {
        // 11 / 255 * 23 = 0.992...
        assert_eq!(palette_index(11), 0);
        // 12 / 255 * 23 = 1.082...
        assert_eq!(palette_index(12), 1);
        // 254 / 255 * 23 = 22.909...
        assert_eq!(palette_index(254), 22);
    }

    #[test]
    fn index_is_monotonic_over_heat_range() {
        let mut previous = palette_index(0);
        for value in 1..=MAX_HEAT {
            let idx = palette_index(value);
            assert!(idx >= previous, "index dropped at heat {value}");
            previous = idx;
        }
    }
}
