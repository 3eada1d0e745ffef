// THEORY:
// `image_io` is the boundary between the filesystem and the placement core. The core
// only ever sees decoded `DynamicImage`s; this module turns paths into images and
// composed images back into PNG files, mapping failures into `SubstitutionError`.

use crate::error::{Result, SubstitutionError};
use image::{DynamicImage, ImageFormat};
use std::path::Path;

/// Decodes the image at `path`, distinguishing a missing file from a bad one.
pub fn load(path: &Path) -> Result<DynamicImage> {
    if !path.exists() {
        return Err(SubstitutionError::ImageNotFound {
            path: path.to_path_buf(),
        });
    }
    image::open(path).map_err(|source| SubstitutionError::ImageDecode {
        path: path.to_path_buf(),
        source,
    })
}

/// Decodes an in-memory image, guessing the format from its header.
pub fn load_from_memory(bytes: &[u8]) -> Result<DynamicImage> {
    image::load_from_memory(bytes).map_err(|source| SubstitutionError::ImageDecode {
        path: "<memory>".into(),
        source,
    })
}

/// Writes `image` as a PNG, whatever the extension of `path`.
pub fn save_png(path: &Path, image: &DynamicImage) -> Result<()> {
    image
        .save_with_format(path, ImageFormat::Png)
        .map_err(|source| SubstitutionError::ImageSave {
            path: path.to_path_buf(),
            source,
        })
}
