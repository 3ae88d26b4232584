//! # fotoscan - Photo Page Scanner Library
//!
//! fotoscan finds the photos glued onto scanned album pages, cuts each one
//! out along its (possibly rotated) quadrilateral boundary, and rotates it
//! upright. Detection runs multi-channel multi-threshold contour extraction
//! in pure Rust; orientation uses cascade feature classifiers with a
//! sky-brightness fallback and a page-level consensus.
//!
//! ## Features
//!
//! - **Pure Rust**: no OpenCV, built on `image`/`imageproc`/`nalgebra`
//! - **Robust detection**: 3 channels x 11 threshold levels, deduplicated
//!   by polygon-overlap clustering
//! - **True perspective crop**: homography warp, not a bounding-box crop
//! - **Orientation correction**: SeetaFace cascade voting over four
//!   rotations, per photo and per page
//! - **Reviewable**: detection keeps its rejects so external tooling can
//!   show what was dropped and why
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use fotoscan::PageScanner;
//! use std::path::Path;
//!
//! let scanner = PageScanner::new();
//! let page = scanner.load_page(Path::new("album_page.jpg"))?;
//!
//! let detection = scanner.detect(&page);
//! for (i, photo) in scanner.extract(&page, &detection.pictures).into_iter().enumerate() {
//!     photo?.save(format!("photo_{i}.jpg"))?;
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod clip;
mod contours;
mod dedup;
mod detect;
mod extract;
mod geometry;
mod orient;
mod scanner;
mod types;

pub mod classifier;
pub mod error;

// Public API exports
pub use crate::classifier::{load_classifiers, CascadeClassifier, FeatureClassifier};
pub use crate::clip::clip;
pub use crate::dedup::minimize_shapes;
pub use crate::error::ScanError;
pub use crate::extract::extract_photo;
pub use crate::geometry::{area, normalize_quad, perimeter};
pub use crate::scanner::PageScanner;
pub use crate::types::{
    DetectConfig, Detection, Orientation, OrientConfig, PageRecord, Point, RecordPoint, Shape,
    ShapeList,
};
