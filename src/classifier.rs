//! Feature-classifier seam for orientation voting.
//!
//! The voting logic only needs a hit count per rotated image, so the
//! classifier is a narrow trait; production uses pretrained SeetaFace
//! cascade models through `rustface`, and tests plug in synthetic
//! classifiers.

use std::path::{Path, PathBuf};

use image::GrayImage;
use rustface::{Detector, ImageData};
use tracing::info;

use crate::error::ScanError;

/// An opaque feature oracle: how many instances of its feature (faces,
/// profiles, bodies) appear in a grayscale image.
pub trait FeatureClassifier {
    fn name(&self) -> &str;
    fn count_features(&mut self, gray: &GrayImage) -> usize;
}

/// A cascade classifier backed by a SeetaFace model file.
pub struct CascadeClassifier {
    name: String,
    detector: Box<dyn Detector>,
}

impl CascadeClassifier {
    pub fn from_file(path: &Path) -> Result<Self, ScanError> {
        let path_str = path.to_string_lossy();
        let mut detector =
            rustface::create_detector(&path_str).map_err(|e| ScanError::Classifier {
                path: path.to_path_buf(),
                message: format!("{e:?}"),
            })?;
        detector.set_min_face_size(20);
        detector.set_score_thresh(2.0);
        detector.set_pyramid_scale_factor(0.8);
        detector.set_slide_window_step(4, 4);

        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path_str.into_owned());
        Ok(Self { name, detector })
    }
}

impl FeatureClassifier for CascadeClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn count_features(&mut self, gray: &GrayImage) -> usize {
        let mut data = ImageData::new(gray.as_raw(), gray.width(), gray.height());
        self.detector.detect(&mut data).len()
    }
}

/// Load every classifier, most specific first, failing fast on the first
/// unreadable model file. A missing model is a configuration error: silently
/// skipping it would skew the voting weights, so nothing is voted on until
/// all classifiers load.
pub fn load_classifiers(paths: &[PathBuf]) -> Result<Vec<Box<dyn FeatureClassifier>>, ScanError> {
    let mut classifiers: Vec<Box<dyn FeatureClassifier>> = Vec::with_capacity(paths.len());
    for path in paths {
        if !path.is_file() {
            return Err(ScanError::Classifier {
                path: path.clone(),
                message: "model file not found".into(),
            });
        }
        let classifier = CascadeClassifier::from_file(path)?;
        info!(name = classifier.name(), "loaded cascade classifier");
        classifiers.push(Box::new(classifier));
    }
    Ok(classifiers)
}
