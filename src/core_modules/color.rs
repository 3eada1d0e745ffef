// THEORY:
// The `color` module is the most fundamental unit of the placement system. It is a
// "dumb" data container for a single RGB triplet plus the one comparison the rest of
// the crate needs: a coarse similarity test on channel sums.
//
// Key architectural principles:
// 1.  **RGB only**: Alpha never takes part in placement decisions. Anything decoded
//     with an alpha channel is reduced to its RGB triplet before it gets here.
// 2.  **Cheap similarity**: Two colors are "similar" when their channel sums differ
//     by less than a tolerance. This is not perceptual; a pure red and a pure green
//     are identical under this test. The region locator was tuned against exactly
//     this behaviour, so it must not be swapped for a Lab distance.
// 3.  **Centroid bridge**: Clustering works on `palette::Srgb<f32>` in `0.0..=1.0`.
//     `to_srgb` and `from_srgb` are the only crossings between that space and the
//     0..=255 channel domain.

use palette::Srgb;

pub type Channel = u8;
pub type Sum = i32;

/// A single RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Color {
    pub red: Channel,
    pub green: Channel,
    pub blue: Channel,
}

impl Color {
    /// The fixed fallback background used when clustering is disabled.
    pub const WHITE: Color = Color::new(255, 255, 255);

    pub const fn new(red: Channel, green: Channel, blue: Channel) -> Self {
        Self { red, green, blue }
    }

    /// The sum of the three channels.
    pub fn sum(&self) -> Sum {
        self.red as Sum + self.green as Sum + self.blue as Sum
    }

    /// Brings a clustering centroid back into channel range, rounding to the nearest value.
    pub fn from_srgb(centroid: Srgb<f32>) -> Self {
        let channel = |v: f32| (v * 255.0).round().clamp(0.0, 255.0) as Channel;
        Self::new(channel(centroid.red), channel(centroid.green), channel(centroid.blue))
    }

    pub fn to_srgb(self) -> Srgb<f32> {
        Srgb::new(
            self.red as f32 / 255.0,
            self.green as f32 / 255.0,
            self.blue as f32 / 255.0,
        )
    }
}

impl From<[Channel; 3]> for Color {
    fn from(channels: [Channel; 3]) -> Self {
        Color::new(channels[0], channels[1], channels[2])
    }
}

impl From<Color> for [Channel; 3] {
    fn from(color: Color) -> Self {
        [color.red, color.green, color.blue]
    }
}

/// True when the channel sums of `a` and `b` differ by strictly less than `tolerance`.
pub fn is_similar(a: Color, b: Color, tolerance: u32) -> bool {
    (a.sum() - b.sum()).unsigned_abs() < tolerance
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn similarity_is_strict_on_the_threshold() {
        let base = Color::new(100, 100, 100);
        assert!(is_similar(base, Color::new(129, 100, 100), 30));
        assert!(!is_similar(base, Color::new(130, 100, 100), 30));
        assert!(!is_similar(base, Color::new(70, 100, 100), 30));
    }

    #[test]
    fn similarity_ignores_hue() {
        assert!(is_similar(Color::new(255, 0, 0), Color::new(0, 255, 0), 30));
    }

    #[test]
    fn centroid_is_rounded_and_clamped() {
        let scaled = |r: f32, g: f32, b: f32| Srgb::new(r / 255.0, g / 255.0, b / 255.0);
        assert_eq!(Color::from_srgb(scaled(12.4, 12.6, 300.0)), Color::new(12, 13, 255));
        assert_eq!(Color::from_srgb(scaled(-4.0, 0.6, 254.4)), Color::new(0, 1, 254));
    }

    #[test]
    fn srgb_bridge_keeps_channel_values() {
        let color = Color::new(7, 128, 250);
        assert_eq!(Color::from_srgb(color.to_srgb()), color);
    }

    #[test]
    fn white_sums_to_765() {
        assert_eq!(Color::WHITE.sum(), 765);
    }
}
