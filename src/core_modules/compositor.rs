// THEORY:
// The `Compositor` is the only place where pixels are written. Everything else in the
// crate reads images; this module stretches the substitute to a target size and pastes
// it onto the template.
//
// Key architectural principles:
// 1.  **Collaborator seam**: Resize and paste are external primitives. The `Compositor`
//     trait names exactly those two operations so an engine can run against
//     `image::imageops` in production and a recording fake in tests.
// 2.  **Stretch, not fit**: The substitute is resized to the exact target dimensions.
//     Aspect ratio is not preserved.
// 3.  **Replace, not blend**: The pasted pixels overwrite the template's pixels,
//     alpha included, clipped at the template border.
// 4.  **No blind pastes**: A located rectangle without a position is ambiguous. It is
//     rejected before any resize or paste happens. An explicit size override ignores
//     the located rectangle entirely and pastes at the origin.

use crate::core_modules::region_locator::{Position, Rectangle};
use crate::error::{Result, SubstitutionError};
use image::DynamicImage;
use image::imageops::{self, FilterType};
use serde::{Deserialize, Serialize};

/// Resampling filter used when stretching the substitute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResizeFilter {
    Nearest,
    Triangle,
    #[default]
    CatmullRom,
    Gaussian,
    Lanczos3,
}

impl From<ResizeFilter> for FilterType {
    fn from(filter: ResizeFilter) -> Self {
        match filter {
            ResizeFilter::Nearest => FilterType::Nearest,
            ResizeFilter::Triangle => FilterType::Triangle,
            ResizeFilter::CatmullRom => FilterType::CatmullRom,
            ResizeFilter::Gaussian => FilterType::Gaussian,
            ResizeFilter::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

/// The two image primitives composition is built from.
pub trait Compositor {
    /// Stretches `image` to exactly `width` x `height`.
    fn resize(&self, image: &DynamicImage, width: u32, height: u32) -> DynamicImage;

    /// Writes `overlay` onto `base` with its top-left corner at `(x, y)`.
    fn paste(&self, base: &mut DynamicImage, overlay: &DynamicImage, x: u32, y: u32);
}

/// Production compositor backed by `image::imageops`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageOpsCompositor {
    pub filter: ResizeFilter,
}

impl ImageOpsCompositor {
    pub fn new(filter: ResizeFilter) -> Self {
        Self { filter }
    }
}

impl Compositor for ImageOpsCompositor {
    fn resize(&self, image: &DynamicImage, width: u32, height: u32) -> DynamicImage {
        if width == 0 || height == 0 {
            return DynamicImage::new_rgba8(width, height);
        }
        DynamicImage::ImageRgba8(imageops::resize(image, width, height, self.filter.into()))
    }

    fn paste(&self, base: &mut DynamicImage, overlay: &DynamicImage, x: u32, y: u32) {
        if overlay.width() == 0 || overlay.height() == 0 {
            return;
        }
        imageops::replace(base, overlay, x as i64, y as i64);
    }
}

/// Where and how large the substitute should be placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Resize to this size and paste at the origin, ignoring detection.
    Explicit { width: u32, height: u32 },
    /// Use the locator's rectangle as-is.
    Located(Rectangle),
}

/// The outcome of one composition.
#[derive(Debug, Clone)]
pub struct Composition {
    pub image: DynamicImage,
    pub resized_substitute: DynamicImage,
    pub position: Position,
}

/// Resizes `substitute` per `placement` and pastes it onto a copy of `template`.
pub fn composite<C: Compositor + ?Sized>(
    compositor: &C,
    template: &DynamicImage,
    substitute: &DynamicImage,
    placement: Placement,
) -> Result<Composition> {
    let (position, width, height) = match placement {
        Placement::Explicit { width, height } => (Position { x: 0, y: 0 }, width, height),
        Placement::Located(rect) => {
            let position = rect.position.ok_or(SubstitutionError::PlacementNotFound)?;
            (position, rect.width, rect.height)
        }
    };

    let resized_substitute = compositor.resize(substitute, width, height);
    let mut image = template.clone();
    compositor.paste(&mut image, &resized_substitute, position.x, position.y);

    Ok(Composition {
        image,
        resized_substitute,
        position,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgba, RgbaImage};
    use std::cell::Cell;

    fn solid(width: u32, height: u32, rgba: [u8; 4]) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba(rgba)))
    }

    /// Counts primitive calls so tests can prove nothing was touched.
    #[derive(Default)]
    struct CountingCompositor {
        calls: Cell<u32>,
    }

    impl Compositor for CountingCompositor {
        fn resize(&self, image: &DynamicImage, width: u32, height: u32) -> DynamicImage {
            self.calls.set(self.calls.get() + 1);
            ImageOpsCompositor::default().resize(image, width, height)
        }

        fn paste(&self, base: &mut DynamicImage, overlay: &DynamicImage, x: u32, y: u32) {
            self.calls.set(self.calls.get() + 1);
            ImageOpsCompositor::default().paste(base, overlay, x, y);
        }
    }

    #[test]
    fn located_rectangle_is_stretched_and_pasted() {
        let template = solid(10, 10, [255, 255, 255, 255]);
        let substitute = solid(3, 7, [200, 0, 0, 255]);
        let out = composite(
            &ImageOpsCompositor::new(ResizeFilter::Nearest),
            &template,
            &substitute,
            Placement::Located(Rectangle::at(2, 3, 4, 5)),
        )
        .unwrap();

        assert_eq!(out.resized_substitute.dimensions(), (4, 5));
        assert_eq!(out.position, Position { x: 2, y: 3 });
        assert_eq!(out.image.get_pixel(2, 3), Rgba([200, 0, 0, 255]));
        assert_eq!(out.image.get_pixel(5, 7), Rgba([200, 0, 0, 255]));
        assert_eq!(out.image.get_pixel(6, 7), Rgba([255, 255, 255, 255]));
        assert_eq!(out.image.get_pixel(1, 3), Rgba([255, 255, 255, 255]));
        // The template itself is untouched.
        assert_eq!(template.get_pixel(2, 3), Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn explicit_size_pastes_at_origin() {
        let template = solid(8, 8, [0, 0, 0, 255]);
        let substitute = solid(2, 2, [9, 9, 9, 255]);
        let out = composite(
            &ImageOpsCompositor::new(ResizeFilter::Nearest),
            &template,
            &substitute,
            Placement::Explicit { width: 3, height: 2 },
        )
        .unwrap();

        assert_eq!(out.position, Position { x: 0, y: 0 });
        assert_eq!(out.resized_substitute.dimensions(), (3, 2));
        assert_eq!(out.image.get_pixel(0, 0), Rgba([9, 9, 9, 255]));
        assert_eq!(out.image.get_pixel(3, 0), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn missing_position_is_rejected_before_any_primitive() {
        let compositor = CountingCompositor::default();
        let rect = Rectangle {
            position: None,
            width: 4,
            height: 4,
        };
        let err = composite(
            &compositor,
            &solid(4, 4, [0, 0, 0, 255]),
            &solid(1, 1, [1, 1, 1, 255]),
            Placement::Located(rect),
        )
        .unwrap_err();

        assert!(matches!(err, SubstitutionError::PlacementNotFound));
        assert_eq!(compositor.calls.get(), 0);
    }

    #[test]
    fn zero_sized_target_leaves_template_unchanged() {
        let template = solid(5, 5, [1, 2, 3, 255]);
        let out = composite(
            &ImageOpsCompositor::new(ResizeFilter::Nearest),
            &template,
            &solid(2, 2, [9, 9, 9, 255]),
            Placement::Located(Rectangle::at(1, 1, 0, 3)),
        )
        .unwrap();

        assert_eq!(out.resized_substitute.dimensions(), (0, 3));
        assert_eq!(out.image.to_rgba8(), template.to_rgba8());
    }

    #[test]
    fn paste_is_clipped_at_the_border() {
        let out = composite(
            &ImageOpsCompositor::new(ResizeFilter::Nearest),
            &solid(4, 4, [0, 0, 0, 255]),
            &solid(1, 1, [7, 7, 7, 255]),
            Placement::Located(Rectangle::at(3, 3, 3, 3)),
        )
        .unwrap();

        assert_eq!(out.image.dimensions(), (4, 4));
        assert_eq!(out.image.get_pixel(3, 3), Rgba([7, 7, 7, 255]));
    }
}
