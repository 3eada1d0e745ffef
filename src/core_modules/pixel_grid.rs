// THEORY:
// The `PixelGrid` trait is the bridge between decoded images and the placement
// algorithms. The locator and the clusterer never see an `image` type directly;
// they only need a width, a height and an RGB lookup per coordinate.
//
// Key architectural principles:
// 1.  **Opaque containers**: Anything that can answer `color_at(x, y)` can be
//     scanned. Tests build tiny `RgbImage`s, the engine hands over `DynamicImage`s.
// 2.  **RGB projection**: Alpha is dropped at this boundary, so every downstream
//     module works on the same three channels.
// 3.  **Row-major order**: `flatten_srgb` walks rows top to bottom and columns left
//     to right, the same order the locator scans in.

use crate::core_modules::color::Color;
use image::{DynamicImage, GenericImageView, RgbImage, RgbaImage};
use palette::Srgb;

/// Read-only access to the RGB content of an image.
pub trait PixelGrid {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    /// The color at `(x, y)`; callers keep `x < width` and `y < height`.
    fn color_at(&self, x: u32, y: u32) -> Color;

    fn dimensions(&self) -> (u32, u32) {
        (self.width(), self.height())
    }

    fn pixel_count(&self) -> usize {
        self.width() as usize * self.height() as usize
    }
}

impl PixelGrid for RgbImage {
    fn width(&self) -> u32 {
        RgbImage::width(self)
    }

    fn height(&self) -> u32 {
        RgbImage::height(self)
    }

    fn color_at(&self, x: u32, y: u32) -> Color {
        Color::from(self.get_pixel(x, y).0)
    }
}

impl PixelGrid for RgbaImage {
    fn width(&self) -> u32 {
        RgbaImage::width(self)
    }

    fn height(&self) -> u32 {
        RgbaImage::height(self)
    }

    fn color_at(&self, x: u32, y: u32) -> Color {
        let [r, g, b, _] = self.get_pixel(x, y).0;
        Color::new(r, g, b)
    }
}

impl PixelGrid for DynamicImage {
    fn width(&self) -> u32 {
        GenericImageView::width(self)
    }

    fn height(&self) -> u32 {
        GenericImageView::height(self)
    }

    fn color_at(&self, x: u32, y: u32) -> Color {
        let [r, g, b, _] = self.get_pixel(x, y).0;
        Color::new(r, g, b)
    }
}

/// Flattens every pixel into a normalized float color, row by row.
pub fn flatten_srgb<G: PixelGrid + ?Sized>(grid: &G) -> Vec<Srgb<f32>> {
    let (width, height) = grid.dimensions();
    let mut vectors = Vec::with_capacity(grid.pixel_count());
    for y in 0..height {
        for x in 0..width {
            vectors.push(grid.color_at(x, y).to_srgb());
        }
    }
    vectors
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, Rgba};

    #[test]
    fn rgba_grid_drops_alpha() {
        let img = RgbaImage::from_pixel(2, 2, Rgba([10, 20, 30, 0]));
        assert_eq!(img.color_at(1, 1), Color::new(10, 20, 30));
    }

    #[test]
    fn dynamic_grid_matches_inner_buffer() {
        let mut rgb = RgbImage::from_pixel(3, 2, Rgb([0, 0, 0]));
        rgb.put_pixel(2, 1, Rgb([1, 2, 3]));
        let dynamic = DynamicImage::ImageRgb8(rgb.clone());
        assert_eq!(PixelGrid::dimensions(&dynamic), (3, 2));
        assert_eq!(dynamic.color_at(2, 1), rgb.color_at(2, 1));
    }

    #[test]
    fn flatten_is_row_major() {
        let mut rgb = RgbImage::new(2, 2);
        rgb.put_pixel(1, 0, Rgb([1, 1, 1]));
        rgb.put_pixel(0, 1, Rgb([2, 2, 2]));
        let flat = flatten_srgb(&rgb);
        assert_eq!(flat.len(), 4);
        assert_eq!(Color::from_srgb(flat[1]), Color::new(1, 1, 1));
        assert_eq!(Color::from_srgb(flat[2]), Color::new(2, 2, 2));
        assert_eq!(Color::from_srgb(flat[3]), Color::new(0, 0, 0));
    }
}
