//! Orientation correction: decide how each extracted photo must be rotated
//! to stand upright, with a page-level consensus override.

use image::imageops::{self, FilterType};
use image::{GrayImage, RgbImage};
use tracing::debug;

use crate::classifier::FeatureClassifier;
use crate::types::{Orientation, OrientConfig};

/// Rotation hypotheses in vote-array order: index k means the photo becomes
/// upright after k clockwise quarter turns.
const ROTATIONS: [Orientation; 4] = [
    Orientation::Correct,
    Orientation::Clockwise,
    Orientation::Flipped,
    Orientation::Counterclockwise,
];

/// Index of the winning rotation, if any: strictly more votes than every
/// other rotation and at least one vote. A tie for the top count means no
/// winner rather than a guess.
pub fn clear_winner(votes: &[u32; 4]) -> Option<usize> {
    let (best, &count) = votes
        .iter()
        .enumerate()
        .max_by_key(|&(_, &v)| v)?;
    if count == 0 {
        return None;
    }
    if votes.iter().enumerate().any(|(i, &v)| i != best && v == count) {
        return None;
    }
    Some(best)
}

/// Classify one photo by feature voting, falling back to border brightness.
///
/// Classifiers are tried most specific first; per classifier, coarser scales
/// first since they are cheap. The first (classifier, scale) pair with a
/// clear winner short-circuits the search.
pub fn classify_photo(
    photo: &RgbImage,
    classifiers: &mut [Box<dyn FeatureClassifier>],
    cfg: &OrientConfig,
) -> Orientation {
    let gray = imageops::grayscale(photo);

    for classifier in classifiers.iter_mut() {
        for &scale in &cfg.scales {
            let w = gray.width() / scale.max(1);
            let h = gray.height() / scale.max(1);
            if w == 0 || h == 0 {
                continue;
            }
            let scaled = imageops::resize(&gray, w, h, FilterType::Triangle);

            let mut votes = [0u32; 4];
            let mut rotated = scaled;
            for slot in votes.iter_mut() {
                *slot = classifier.count_features(&rotated) as u32;
                rotated = imageops::rotate90(&rotated);
            }

            if let Some(winner) = clear_winner(&votes) {
                debug!(
                    classifier = classifier.name(),
                    scale,
                    ?votes,
                    orientation = ?ROTATIONS[winner],
                    "orientation vote decided"
                );
                return ROTATIONS[winner];
            }
        }
    }

    sky_orientation(&gray, cfg)
}

/// Brightness fallback: sky is usually the brightest region and should end
/// up at the top, so pick the rotation that moves the brightest border there.
fn sky_orientation(gray: &GrayImage, cfg: &OrientConfig) -> Orientation {
    let factor = cfg.sky_downscale.max(1);
    let w = (gray.width() / factor).max(1);
    let h = (gray.height() / factor).max(1);
    let small = imageops::resize(gray, w, h, FilterType::Triangle);

    let strip_w = (w / 5).max(1);
    let strip_h = (h / 5).max(1);
    let top = strip_mean(&small, 0, 0, w, strip_h);
    let right = strip_mean(&small, w - strip_w, 0, strip_w, h);
    let bottom = strip_mean(&small, 0, h - strip_h, w, strip_h);
    let left = strip_mean(&small, 0, 0, strip_w, h);

    // border order top/right/bottom/left; rotation that brings it to the top
    let borders = [top, right, bottom, left];
    let orientations = [
        Orientation::Correct,
        Orientation::Counterclockwise,
        Orientation::Flipped,
        Orientation::Clockwise,
    ];
    let brightest = borders
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(i, _)| i)
        .unwrap_or(0);
    debug!(?borders, orientation = ?orientations[brightest], "sky heuristic");
    orientations[brightest]
}

fn strip_mean(img: &GrayImage, x0: u32, y0: u32, w: u32, h: u32) -> f64 {
    let mut sum = 0u64;
    let mut count = 0u64;
    for y in y0..(y0 + h).min(img.height()) {
        for x in x0..(x0 + w).min(img.width()) {
            sum += img.get_pixel(x, y)[0] as u64;
            count += 1;
        }
    }
    if count == 0 {
        0.0
    } else {
        sum as f64 / count as f64
    }
}

/// Page-level consensus: when one orientation clearly wins across the page's
/// photos, every photo takes it. Models a page scanned pre-rotated as a
/// whole. Unknown classifications do not vote.
pub fn page_consensus(orientations: &[Orientation]) -> Option<Orientation> {
    let mut votes = [0u32; 4];
    for o in orientations {
        if let Some(i) = ROTATIONS.iter().position(|r| r == o) {
            votes[i] += 1;
        }
    }
    clear_winner(&votes).map(|i| ROTATIONS[i])
}

/// Rotate a photo's pixels according to its final orientation.
pub fn apply_orientation(photo: RgbImage, orientation: Orientation) -> RgbImage {
    match orientation {
        Orientation::Clockwise => imageops::rotate90(&photo),
        Orientation::Flipped => imageops::rotate180(&photo),
        Orientation::Counterclockwise => imageops::rotate270(&photo),
        Orientation::Correct | Orientation::Unknown => photo,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb};

    struct FixedVotes {
        votes: [usize; 4],
        call: usize,
    }

    impl FeatureClassifier for FixedVotes {
        fn name(&self) -> &str {
            "fixed"
        }
        fn count_features(&mut self, _gray: &GrayImage) -> usize {
            let v = self.votes[self.call % 4];
            self.call += 1;
            v
        }
    }

    #[test]
    fn vote_tally_tie_break() {
        assert_eq!(clear_winner(&[3, 0, 0, 0]), Some(0));
        assert_eq!(clear_winner(&[2, 2, 0, 0]), None);
        assert_eq!(clear_winner(&[5, 3, 0, 0]), Some(0));
        assert_eq!(clear_winner(&[0, 0, 0, 0]), None);
    }

    #[test]
    fn classifier_short_circuits_on_clear_winner() {
        let photo = RgbImage::from_pixel(64, 64, Rgb([128, 128, 128]));
        let mut classifiers: Vec<Box<dyn FeatureClassifier>> = vec![Box::new(FixedVotes {
            votes: [0, 4, 1, 0],
            call: 0,
        })];
        let cfg = OrientConfig {
            scales: vec![1],
            ..OrientConfig::default()
        };
        let orientation = classify_photo(&photo, &mut classifiers, &cfg);
        assert_eq!(orientation, Orientation::Clockwise);
    }

    #[test]
    fn sky_fallback_prefers_brightest_border() {
        // bright band at the bottom: photo is upside down
        let mut gray = GrayImage::from_pixel(100, 100, Luma([30]));
        for y in 80..100 {
            for x in 0..100 {
                gray.put_pixel(x, y, Luma([250]));
            }
        }
        let cfg = OrientConfig {
            sky_downscale: 2,
            ..OrientConfig::default()
        };
        assert_eq!(sky_orientation(&gray, &cfg), Orientation::Flipped);
    }

    #[test]
    fn page_consensus_overrides_with_clear_winner() {
        let page = [
            Orientation::Clockwise,
            Orientation::Clockwise,
            Orientation::Clockwise,
            Orientation::Correct,
            Orientation::Unknown,
        ];
        assert_eq!(page_consensus(&page), Some(Orientation::Clockwise));
    }

    #[test]
    fn page_consensus_tie_yields_none() {
        let page = [
            Orientation::Clockwise,
            Orientation::Correct,
            Orientation::Clockwise,
            Orientation::Correct,
        ];
        assert_eq!(page_consensus(&page), None);
    }

    #[test]
    fn apply_rotations_change_dimensions() {
        let photo = RgbImage::new(40, 20);
        assert_eq!(
            apply_orientation(photo.clone(), Orientation::Clockwise).dimensions(),
            (20, 40)
        );
        assert_eq!(
            apply_orientation(photo.clone(), Orientation::Flipped).dimensions(),
            (40, 20)
        );
        assert_eq!(
            apply_orientation(photo, Orientation::Unknown).dimensions(),
            (40, 20)
        );
    }
}
