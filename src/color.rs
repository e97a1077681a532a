use eframe::egui::Color32;
use palette::{LinSrgb, Mix, Srgb};

use crate::config::ColorMode;
use crate::data::model::PointCloud;

/// Colour of every point in [`ColorMode::Solid`].
pub const SOLID_POINT_COLOR: Color32 = Color32::WHITE;

const LUT_SIZE: usize = 256;

/// Viridis sampled at nine equidistant stops (matplotlib values).
const VIRIDIS_STOPS: [(u8, u8, u8); 9] = [
    (0x44, 0x01, 0x54),
    (0x47, 0x2d, 0x7b),
    (0x3b, 0x52, 0x8b),
    (0x2c, 0x72, 0x8e),
    (0x21, 0x91, 0x8c),
    (0x28, 0xae, 0x80),
    (0x5e, 0xc9, 0x62),
    (0xad, 0xdc, 0x30),
    (0xfd, 0xe7, 0x25),
];

// ---------------------------------------------------------------------------
// Continuous colour map
// ---------------------------------------------------------------------------

/// A continuous colour map stored as a lookup table.
#[derive(Debug, Clone)]
pub struct ColorMap {
    lut: Vec<Color32>,
}

impl ColorMap {
    /// Build a map by interpolating `stops` linearly in linear sRGB.
    pub fn from_stops(stops: &[(u8, u8, u8)]) -> Self {
        let stops: Vec<LinSrgb> = stops
            .iter()
            .map(|&(r, g, b)| Srgb::new(r, g, b).into_format::<f32>().into_linear())
            .collect();

        let segments = (stops.len() - 1) as f32;
        let lut = (0..LUT_SIZE)
            .map(|i| {
                let t = i as f32 / (LUT_SIZE - 1) as f32 * segments;
                let seg = (t.floor() as usize).min(stops.len() - 2);
                let lin = stops[seg].mix(stops[seg + 1], t - seg as f32);
                let srgb: Srgb = Srgb::from_linear(lin);
                let srgb = srgb.into_format::<u8>();
                Color32::from_rgb(srgb.red, srgb.green, srgb.blue)
            })
            .collect();

        ColorMap { lut }
    }

    pub fn viridis() -> Self {
        Self::from_stops(&VIRIDIS_STOPS)
    }

    /// Colour for `t` in `[0, 1]`; values outside are clamped, NaN maps to the low end.
    pub fn color_at(&self, t: f32) -> Color32 {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        self.lut[(t * (LUT_SIZE - 1) as f32).round() as usize]
    }
}

// ---------------------------------------------------------------------------
// Scalar range normalisation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScalarRange {
    pub min: f32,
    pub max: f32,
}

impl ScalarRange {
    /// Range of the finite values, `None` when there are none.
    pub fn from_values(values: &[f32]) -> Option<Self> {
        values
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .fold(None, |acc, v| match acc {
                None => Some(ScalarRange { min: v, max: v }),
                Some(r) => Some(ScalarRange {
                    min: r.min.min(v),
                    max: r.max.max(v),
                }),
            })
    }

    /// Map `value` into `[0, 1]`. A degenerate range maps everything to 0.
    pub fn normalize(&self, value: f32) -> f32 {
        let span = self.max - self.min;
        if span <= f32::EPSILON || !value.is_finite() {
            return 0.0;
        }
        ((value - self.min) / span).clamp(0.0, 1.0)
    }
}

// ---------------------------------------------------------------------------
// Per-point colouring
// ---------------------------------------------------------------------------

/// Compute one colour per point for the given mode.
///
/// `Intensity` on a cloud without an intensity channel falls back to height.
pub fn point_colors(cloud: &PointCloud, mode: ColorMode, map: &ColorMap) -> Vec<Color32> {
    let scalars = match mode {
        ColorMode::Solid => return vec![SOLID_POINT_COLOR; cloud.len()],
        ColorMode::Height => cloud.heights(),
        ColorMode::Intensity => match &cloud.intensity {
            Some(values) => values.clone(),
            None => cloud.heights(),
        },
    };

    match ScalarRange::from_values(&scalars) {
        Some(range) => scalars
            .iter()
            .map(|&v| map.color_at(range.normalize(v)))
            .collect(),
        None => vec![map.color_at(0.0); scalars.len()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn viridis_endpoints_match_stops() {
        let map = ColorMap::viridis();
        assert_eq!(map.color_at(0.0), Color32::from_rgb(0x44, 0x01, 0x54));
        assert_eq!(map.color_at(1.0), Color32::from_rgb(0xfd, 0xe7, 0x25));
    }

    #[test]
    fn color_at_clamps_out_of_range() {
        let map = ColorMap::viridis();
        assert_eq!(map.color_at(-3.0), map.color_at(0.0));
        assert_eq!(map.color_at(7.0), map.color_at(1.0));
        assert_eq!(map.color_at(f32::NAN), map.color_at(0.0));
    }

    #[test]
    fn range_ignores_non_finite() {
        let range = ScalarRange::from_values(&[f32::NAN, 2.0, -1.0, f32::INFINITY]).unwrap();
        assert_eq!(range, ScalarRange { min: -1.0, max: 2.0 });
        assert_relative_eq!(range.normalize(0.5), 0.5);
        assert!(ScalarRange::from_values(&[f32::NAN]).is_none());
    }

    #[test]
    fn degenerate_range_maps_to_zero() {
        let range = ScalarRange { min: 4.0, max: 4.0 };
        assert_eq!(range.normalize(4.0), 0.0);
    }

    #[test]
    fn height_mode_spans_the_map() {
        let cloud = PointCloud::new(vec![[0.0, 0.0, -2.0], [0.0, 0.0, 0.0], [0.0, 0.0, 2.0]]);
        let map = ColorMap::viridis();
        let colors = point_colors(&cloud, ColorMode::Height, &map);
        assert_eq!(colors, vec![map.color_at(0.0), map.color_at(0.5), map.color_at(1.0)]);
    }

    #[test]
    fn solid_mode_is_white() {
        let cloud = PointCloud::new(vec![[1.0; 3]; 4]);
        let colors = point_colors(&cloud, ColorMode::Solid, &ColorMap::viridis());
        assert!(colors.iter().all(|&c| c == SOLID_POINT_COLOR));
    }

    #[test]
    fn intensity_mode_uses_intensity_channel() {
        let cloud = PointCloud::new(vec![[0.0, 0.0, 5.0], [0.0, 0.0, -5.0]])
            .with_intensity(vec![0.0, 1.0]);
        let map = ColorMap::viridis();
        let colors = point_colors(&cloud, ColorMode::Intensity, &map);
        assert_eq!(colors, vec![map.color_at(0.0), map.color_at(1.0)]);
    }
}
