//! Sequential color ramp for the density heatmap.

use plotters::style::RGBColor;

/// Control points of the "Blues" ramp, light to dark.
const BLUES_STOPS: [(u8, u8, u8); 5] = [
    (247, 251, 255),
    (198, 219, 239),
    (107, 174, 214),
    (33, 113, 181),
    (8, 48, 107),
];

/// Linear interpolation between two colors.
pub fn lerp_color(c1: (u8, u8, u8), c2: (u8, u8, u8), t: f64) -> (u8, u8, u8) {
    (
        (c1.0 as f64 * (1.0 - t) + c2.0 as f64 * t) as u8,
        (c1.1 as f64 * (1.0 - t) + c2.1 as f64 * t) as u8,
        (c1.2 as f64 * (1.0 - t) + c2.2 as f64 * t) as u8,
    )
}

/// Maps a normalized value (0.0 to 1.0, clamped) onto the Blues ramp.
pub fn blues(value: f64) -> RGBColor {
    let t = value.clamp(0.0, 1.0) * (BLUES_STOPS.len() - 1) as f64;
    let i = (t.floor() as usize).min(BLUES_STOPS.len() - 2);
    let (r, g, b) = lerp_color(BLUES_STOPS[i], BLUES_STOPS[i + 1], t - i as f64);
    RGBColor(r, g, b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lerp_midpoint() {
        let mid = lerp_color((0, 0, 0), (255, 255, 255), 0.5);
        assert_eq!(mid, (127, 127, 127));
    }

    #[test]
    fn ramp_endpoints_match_the_stops() {
        assert_eq!(blues(0.0), RGBColor(247, 251, 255));
        assert_eq!(blues(1.0), RGBColor(8, 48, 107));
        // Out-of-range values clamp
        assert_eq!(blues(-1.0), RGBColor(247, 251, 255));
        assert_eq!(blues(2.0), RGBColor(8, 48, 107));
    }

    #[test]
    fn ramp_darkens_monotonically_in_blue_channel_start() {
        let light = blues(0.1);
        let dark = blues(0.9);
        assert!(dark.0 < light.0);
    }
}
