// THEORY:
// The `RegionLocator` is the engine of the placement layer. Given a template and the
// color believed to be its background, it looks for a rectangle that is mostly *not*
// background: the panel of a meme where a picture is expected to go.
//
// It is a deliberately cheap heuristic, not a maximum-empty-rectangle solver. The
// acceptance thresholds downstream were tuned against its exact output, so the scan
// below must be reproduced literally, quirks included.
//
// Algorithm, one pass top to bottom, left to right:
// 1.  **Row tolerance**: each row may contain at most `width / 2` background pixels.
//     The counter is decremented per similar pixel and the row fails the moment it
//     reads exactly zero. A one-pixel-wide row starts at zero, so it can never fail.
// 2.  **Dissimilar run**: the first non-background pixel of a row is `line_start`, the
//     most recent one is `last_different`. Their horizontal distance feeds a running
//     maximum width that is global to the whole scan and is never reset.
// 3.  **Row streaks**: consecutive passing rows grow a streak. The final row never
//     grows it. When a row fails (or the final row is reached) the streak is compared
//     with the best height so far; it only counts if that closing row itself saw a
//     dissimilar pixel. The recorded top-left is `(line_start.x, row - streak)`.
// 4.  **Result**: the best position (if any streak ever qualified) together with the
//     global width and the best height.

use crate::core_modules::color::{Color, is_similar};
use crate::core_modules::pixel_grid::PixelGrid;
use tracing::trace;

/// Channel-sum distance below which a pixel counts as background.
pub const DEFAULT_SIMILARITY_THRESHOLD: u32 = 30;

/// Top-left corner of a placement, in template pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    pub x: u32,
    pub y: u32,
}

/// A placement rectangle. An absent position means nothing suitable was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rectangle {
    pub position: Option<Position>,
    pub width: u32,
    pub height: u32,
}

impl Rectangle {
    pub fn at(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            position: Some(Position { x, y }),
            width,
            height,
        }
    }

    pub fn is_found(&self) -> bool {
        self.position.is_some()
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// Scans `grid` for the best mostly-non-background band, measured against `dominant`.
pub fn locate<G: PixelGrid + ?Sized>(
    grid: &G,
    dominant: Color,
    similarity_threshold: u32,
) -> Rectangle {
    let (width, height) = grid.dimensions();

    let mut substitute_width: u32 = 0;
    let mut substitute_height: u32 = 0;
    let mut best_position: Option<Position> = None;
    let mut streak: u32 = 0;

    for y in 0..height {
        let mut tolerance = (width / 2) as i64;
        let mut line_start: Option<u32> = None;
        let mut last_different: Option<u32> = None;
        let mut passed = true;

        for x in 0..width {
            if is_similar(grid.color_at(x, y), dominant, similarity_threshold) {
                tolerance -= 1;
                if tolerance == 0 {
                    passed = false;
                    break;
                }
            } else {
                last_different = Some(x);
                line_start.get_or_insert(x);
            }

            if let (Some(start), Some(last)) = (line_start, last_different) {
                substitute_width = substitute_width.max(last - start);
            }
        }

        if passed && y != height - 1 {
            streak += 1;
            continue;
        }

        if let Some(start) = line_start {
            if streak > substitute_height {
                substitute_height = streak;
                best_position = Some(Position { x: start, y: y - streak });
                trace!(row = y, streak, x = start, "new best streak");
            }
        }
        streak = 0;
    }

    Rectangle {
        position: best_position,
        width: substitute_width,
        height: substitute_height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
    const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

    fn fill(img: &mut RgbImage, xs: std::ops::Range<u32>, ys: std::ops::Range<u32>, color: Rgb<u8>) {
        for y in ys {
            for x in xs.clone() {
                img.put_pixel(x, y, color);
            }
        }
    }

    #[test]
    fn uniform_template_has_no_position() {
        let img = RgbImage::from_pixel(20, 20, WHITE);
        let rect = locate(&img, Color::WHITE, DEFAULT_SIMILARITY_THRESHOLD);
        assert!(!rect.is_found());
        assert_eq!(rect.width, 0);
        assert_eq!(rect.height, 0);
    }

    #[test]
    fn band_closed_by_a_marked_row_is_reported() {
        // Black band x 4..16, rows 4..12, then a short black stub on row 12
        // that makes the row fail while still providing a line start.
        let mut img = RgbImage::from_pixel(20, 20, WHITE);
        fill(&mut img, 4..16, 4..12, BLACK);
        fill(&mut img, 4..7, 12..13, BLACK);

        let rect = locate(&img, Color::WHITE, DEFAULT_SIMILARITY_THRESHOLD);
        assert_eq!(rect, Rectangle::at(4, 4, 11, 8));
    }

    #[test]
    fn band_closed_by_pure_background_is_not_recorded() {
        // A streak only counts when its closing row has a `line_start`; placements
        // have always been recorded that way. A clean band over background therefore
        // reports no position, only the accumulated width.
        let mut img = RgbImage::from_pixel(20, 20, WHITE);
        fill(&mut img, 4..16, 4..12, BLACK);

        let rect = locate(&img, Color::WHITE, DEFAULT_SIMILARITY_THRESHOLD);
        assert!(!rect.is_found());
        assert_eq!(rect.height, 0);
        // The width is still accumulated from the band rows.
        assert_eq!(rect.width, 11);
    }

    #[test]
    fn centered_band_over_background_has_no_position() {
        let mut img = RgbImage::from_pixel(40, 40, WHITE);
        fill(&mut img, 10..30, 10..30, BLACK);

        let rect = locate(&img, Color::WHITE, DEFAULT_SIMILARITY_THRESHOLD);
        assert_eq!(
            rect,
            Rectangle {
                position: None,
                width: 19,
                height: 0,
            }
        );
    }

    #[test]
    fn final_row_closes_the_streak_without_extending_it() {
        let mut img = RgbImage::from_pixel(20, 20, WHITE);
        fill(&mut img, 4..16, 4..20, BLACK);

        let rect = locate(&img, Color::WHITE, DEFAULT_SIMILARITY_THRESHOLD);
        assert_eq!(rect, Rectangle::at(4, 4, 11, 15));
    }

    #[test]
    fn width_is_the_global_maximum_across_rows() {
        // A short wide band on top, a tall narrower band below it.
        let mut img = RgbImage::from_pixel(20, 30, WHITE);
        fill(&mut img, 1..19, 1..3, BLACK);
        fill(&mut img, 1..2, 3..4, BLACK);
        fill(&mut img, 6..18, 10..20, BLACK);
        fill(&mut img, 6..9, 20..21, BLACK);

        let rect = locate(&img, Color::WHITE, DEFAULT_SIMILARITY_THRESHOLD);
        assert_eq!(rect.position, Some(Position { x: 6, y: 10 }));
        assert_eq!(rect.height, 10);
        assert_eq!(rect.width, 17);
    }

    #[test]
    fn single_column_rows_never_fail() {
        let mut img = RgbImage::from_pixel(1, 6, WHITE);
        img.put_pixel(0, 5, BLACK);

        let rect = locate(&img, Color::WHITE, DEFAULT_SIMILARITY_THRESHOLD);
        assert_eq!(rect.position, Some(Position { x: 0, y: 0 }));
        assert_eq!(rect.height, 5);
        assert_eq!(rect.width, 0);
    }

    #[test]
    fn near_background_pixels_count_as_background() {
        let mut img = RgbImage::from_pixel(10, 10, WHITE);
        fill(&mut img, 0..10, 0..10, Rgb([250, 250, 250]));
        let rect = locate(&img, Color::WHITE, DEFAULT_SIMILARITY_THRESHOLD);
        assert!(!rect.is_found());
    }

    #[test]
    fn rectangle_area_does_not_overflow() {
        let rect = Rectangle::at(0, 0, u32::MAX, 2);
        assert_eq!(rect.area(), u32::MAX as u64 * 2);
    }
}
