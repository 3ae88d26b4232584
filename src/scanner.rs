//! Page-level pipeline facade: detection, extraction and orientation
//! correction for one scanned page at a time.

use std::path::Path;

use image::RgbImage;
use tracing::info;

use crate::classifier::FeatureClassifier;
use crate::contours::extract_contours;
use crate::dedup::minimize_shapes;
use crate::detect::filter_shapes;
use crate::error::ScanError;
use crate::extract::extract_all;
use crate::orient::{apply_orientation, classify_photo, page_consensus};
use crate::types::{Detection, DetectConfig, Orientation, OrientConfig, Shape};

/// Runs the detection/extraction pipeline with one set of tuning.
///
/// Holds no per-image state, so a single scanner can serve many pages and
/// several scanners with different tuning can run side by side.
#[derive(Clone, Debug, Default)]
pub struct PageScanner {
    pub detect_cfg: DetectConfig,
    pub orient_cfg: OrientConfig,
}

impl PageScanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_configs(detect_cfg: DetectConfig, orient_cfg: OrientConfig) -> Self {
        Self {
            detect_cfg,
            orient_cfg,
        }
    }

    /// Decode a page image from disk. Failures are labeled with the path so
    /// a batch driver can report and continue.
    pub fn load_page(&self, path: &Path) -> Result<RgbImage, ScanError> {
        let img = image::open(path).map_err(|source| ScanError::Image {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(img.to_rgb8())
    }

    /// Detect photo boundaries on a page: contours, quadrilateral filtering,
    /// deduplication. All three buckets are returned for review tooling.
    pub fn detect(&self, image: &RgbImage) -> Detection {
        let contours = extract_contours(image, &self.detect_cfg);
        let (ungrouped, rejects) = filter_shapes(&contours, &self.detect_cfg);
        let pictures = minimize_shapes(&ungrouped, &self.detect_cfg);
        info!(
            pictures = pictures.len(),
            candidates = ungrouped.len(),
            rejects = rejects.len(),
            "detection finished"
        );
        Detection {
            rejects,
            ungrouped,
            pictures,
        }
    }

    /// Extract every finalized (possibly hand-edited) quadrilateral. Output
    /// order matches `pictures` order; per-entry failures stay in their slot.
    pub fn extract(
        &self,
        image: &RgbImage,
        pictures: &[Shape],
    ) -> Vec<Result<RgbImage, ScanError>> {
        extract_all(image, pictures)
    }

    /// Classify and correct the orientation of every photo from one page,
    /// applying a page-level consensus when the individual votes agree.
    /// Returns the final per-photo orientations, index-aligned with `photos`.
    pub fn correct_page(
        &self,
        photos: &mut Vec<RgbImage>,
        classifiers: &mut [Box<dyn FeatureClassifier>],
    ) -> Vec<Orientation> {
        let mut orientations: Vec<Orientation> = photos
            .iter()
            .map(|photo| classify_photo(photo, classifiers, &self.orient_cfg))
            .collect();

        if let Some(consensus) = page_consensus(&orientations) {
            info!(?consensus, "page consensus overrides individual votes");
            for o in orientations.iter_mut() {
                *o = consensus;
            }
        }

        let corrected: Vec<RgbImage> = photos
            .drain(..)
            .zip(orientations.iter())
            .map(|(photo, &orientation)| apply_orientation(photo, orientation))
            .collect();
        *photos = corrected;
        orientations
    }
}
