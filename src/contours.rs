//! Contour extraction across every color channel and threshold level.
//!
//! Deliberately over-inclusive: a photo edge only has to show up in one of
//! the channel/threshold combinations, and the quadrilateral filter does all
//! rejection afterwards.

use image::imageops::{self, FilterType};
use image::{GrayImage, Luma, RgbImage};
use imageproc::contours::{find_contours, Contour};
use imageproc::distance_transform::Norm;
use imageproc::edges::canny;
use imageproc::morphology::dilate;
use rayon::prelude::*;
use tracing::debug;

use crate::types::DetectConfig;

/// A raw boundary point sequence in pixel coordinates.
pub type RawContour = Contour<i32>;

/// Extract all boundary contours found in any (channel, threshold level)
/// combination of the image. Output order is not meaningful.
pub fn extract_contours(image: &RgbImage, cfg: &DetectConfig) -> Vec<RawContour> {
    let (width, height) = image.dimensions();

    // Pyramid down/up pass to knock out pixel noise before binarization.
    let denoised = if width >= 2 && height >= 2 {
        let down = imageops::resize(image, width / 2, height / 2, FilterType::Gaussian);
        imageops::resize(&down, width, height, FilterType::Gaussian)
    } else {
        image.clone()
    };

    let planes: Vec<GrayImage> = (0..3)
        .map(|c| GrayImage::from_fn(width, height, |x, y| Luma([denoised.get_pixel(x, y)[c]])))
        .collect();

    let levels = cfg.threshold_levels.max(1);
    let grid: Vec<(usize, u32)> = (0..planes.len())
        .flat_map(|c| (0..levels).map(move |l| (c, l)))
        .collect();

    // The grid cells are independent; merging happens once, sequentially.
    let contours = grid
        .par_iter()
        .map(|&(channel, level)| {
            let binary = binarize(&planes[channel], level, levels, cfg);
            find_contours::<i32>(&binary)
        })
        .reduce(Vec::new, |mut acc, mut chunk| {
            acc.append(&mut chunk);
            acc
        });

    debug!(
        contours = contours.len(),
        channels = planes.len(),
        levels,
        "extracted raw contours"
    );
    contours
}

/// Binarize one channel plane for a given threshold level. Level 0 runs edge
/// detection instead of a fixed threshold, which catches photo borders with
/// gradient shading; the dilation closes holes between edge segments.
fn binarize(plane: &GrayImage, level: u32, levels: u32, cfg: &DetectConfig) -> GrayImage {
    if level == 0 {
        // A near-zero low threshold keeps edge merging aggressive; it must
        // stay positive or hysteresis walks off the image border.
        let edges = canny(plane, 1.0, cfg.canny_threshold);
        dilate(&edges, Norm::LInf, 1)
    } else {
        let t = (((level + 1) * 255) / levels).min(255) as u8;
        let (w, h) = plane.dimensions();
        GrayImage::from_fn(w, h, |x, y| {
            if plane.get_pixel(x, y)[0] >= t {
                Luma([255u8])
            } else {
                Luma([0u8])
            }
        })
    }
}
