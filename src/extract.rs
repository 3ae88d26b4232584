//! Perspective extraction: warp a finalized quadrilateral region of the
//! source page into an upright rectangular photo.

use image::imageops;
use image::RgbImage;
use nalgebra::{DMatrix, Matrix3};
use rayon::prelude::*;
use tracing::debug;

use crate::error::ScanError;
use crate::geometry::{bounding_box, normalize_quad};
use crate::types::{Point, Shape};

/// Extract every finalized quadrilateral from the page. Output slots keep
/// the input order, and one bad quadrilateral does not poison its neighbors.
pub fn extract_all(image: &RgbImage, shapes: &[Shape]) -> Vec<Result<RgbImage, ScanError>> {
    shapes
        .par_iter()
        .map(|shape| extract_photo(image, shape))
        .collect()
}

/// Warp one quadrilateral region into its own upright image.
pub fn extract_photo(image: &RgbImage, shape: &Shape) -> Result<RgbImage, ScanError> {
    let quad = normalize_quad(shape)?;

    // Work on the bounding-box crop, clamped to the image: a hand-edited quad
    // may run up to or past the page edge.
    let (min, max) = bounding_box(&quad);
    let x0 = min.x.floor().max(0.0) as u32;
    let y0 = min.y.floor().max(0.0) as u32;
    let x1 = (max.x.ceil() as u32).min(image.width());
    let y1 = (max.y.ceil() as u32).min(image.height());
    if x1 <= x0 || y1 <= y0 {
        return Err(ScanError::DegenerateQuad(
            "quadrilateral lies outside the image".into(),
        ));
    }
    let crop = imageops::crop_imm(image, x0, y0, x1 - x0, y1 - y0).to_image();

    let local: Vec<Point> = quad
        .iter()
        .map(|p| Point::new(p.x - x0 as f64, p.y - y0 as f64))
        .collect();

    // Destination size from the averaged opposing edge lengths, so a photo
    // rotated on the page keeps its aspect ratio.
    let top = edge_len(local[0], local[1]);
    let bottom = edge_len(local[3], local[2]);
    let left = edge_len(local[0], local[3]);
    let right = edge_len(local[1], local[2]);
    let out_w = (((top + bottom) / 2.0).round() as u32).max(1);
    let out_h = (((left + right) / 2.0).round() as u32).max(1);

    let src = [
        [local[0].x, local[0].y],
        [local[1].x, local[1].y],
        [local[2].x, local[2].y],
        [local[3].x, local[3].y],
    ];
    let dst = [
        [0.0, 0.0],
        [out_w as f64, 0.0],
        [out_w as f64, out_h as f64],
        [0.0, out_h as f64],
    ];

    let m = perspective_transform(&src, &dst)?;
    let photo = warp(&crop, &m, out_w, out_h)?;
    debug!(width = out_w, height = out_h, "extracted photo");
    Ok(photo)
}

fn edge_len(a: Point, b: Point) -> f64 {
    (a.x - b.x).hypot(a.y - b.y)
}

/// Solve for the 3x3 homography mapping the 4 source corners to the 4
/// destination corners: an 8x8 LU solve with c22 = 1, falling back to an SVD
/// of the full 9-parameter system when the simple solve is ill-conditioned.
fn perspective_transform(
    src_pts: &[[f64; 2]; 4],
    dst_pts: &[[f64; 2]; 4],
) -> Result<[[f64; 3]; 3], ScanError> {
    let mut a = DMatrix::<f64>::zeros(8, 8);
    let mut b = DMatrix::<f64>::zeros(8, 1);

    for i in 0..4 {
        let [x, y] = src_pts[i];
        let [u, v] = dst_pts[i];

        a[(i, 0)] = x;
        a[(i, 1)] = y;
        a[(i, 2)] = 1.0;
        a[(i, 6)] = -u * x;
        a[(i, 7)] = -u * y;
        b[(i, 0)] = u;

        a[(i + 4, 3)] = x;
        a[(i + 4, 4)] = y;
        a[(i + 4, 5)] = 1.0;
        a[(i + 4, 6)] = -v * x;
        a[(i + 4, 7)] = -v * y;
        b[(i + 4, 0)] = v;
    }

    if let Some(sol) = a.clone().lu().solve(&b) {
        let residual = (&a * &sol - &b).norm();
        if residual < 1e-8 {
            return Ok([
                [sol[(0, 0)], sol[(1, 0)], sol[(2, 0)]],
                [sol[(3, 0)], sol[(4, 0)], sol[(5, 0)]],
                [sol[(6, 0)], sol[(7, 0)], 1.0],
            ]);
        }
    }

    let mut a9 = DMatrix::<f64>::zeros(8, 9);
    for i in 0..4 {
        let [x, y] = src_pts[i];
        let [u, v] = dst_pts[i];

        a9[(i, 0)] = x;
        a9[(i, 1)] = y;
        a9[(i, 2)] = 1.0;
        a9[(i, 6)] = -u * x;
        a9[(i, 7)] = -u * y;
        a9[(i, 8)] = -u;

        a9[(i + 4, 3)] = x;
        a9[(i + 4, 4)] = y;
        a9[(i + 4, 5)] = 1.0;
        a9[(i + 4, 6)] = -v * x;
        a9[(i + 4, 7)] = -v * y;
        a9[(i + 4, 8)] = -v;
    }

    let ata = a9.transpose() * &a9;
    let svd = ata.svd(true, false);
    let u = svd
        .u
        .ok_or_else(|| ScanError::Transform("SVD failed".into()))?;
    let h = u.column(8);

    Ok([
        [h[0], h[1], h[2]],
        [h[3], h[4], h[5]],
        [h[6], h[7], h[8]],
    ])
}

/// Inverse-map every destination pixel through the homography and sample the
/// source bilinearly, nearest-neighbor at the crop edges.
fn warp(src: &RgbImage, matrix: &[[f64; 3]; 3], out_w: u32, out_h: u32) -> Result<RgbImage, ScanError> {
    let m_inv = invert_3x3(matrix)?;
    let (m00, m01, m02) = (m_inv[0][0], m_inv[0][1], m_inv[0][2]);
    let (m10, m11, m12) = (m_inv[1][0], m_inv[1][1], m_inv[1][2]);
    let (m20, m21, m22) = (m_inv[2][0], m_inv[2][1], m_inv[2][2]);

    let src_w = src.width() as i64;
    let src_h = src.height() as i64;
    let mut out = RgbImage::new(out_w, out_h);

    for y in 0..out_h {
        let y_f = y as f64;
        let m01y = m01 * y_f;
        let m11y = m11 * y_f;
        let m21y = m21 * y_f;

        for x in 0..out_w {
            let x_f = x as f64;
            let w = m20 * x_f + m21y + m22;
            if w.abs() < 1e-12 {
                continue;
            }
            let src_x = (m00 * x_f + m01y + m02) / w;
            let src_y = (m10 * x_f + m11y + m12) / w;

            let x0 = src_x.floor() as i64;
            let y0 = src_y.floor() as i64;
            let x1 = x0 + 1;
            let y1 = y0 + 1;

            if x0 >= 0 && x1 < src_w && y0 >= 0 && y1 < src_h {
                let fx = src_x - x0 as f64;
                let fy = src_y - y0 as f64;

                let p00 = src.get_pixel(x0 as u32, y0 as u32);
                let p10 = src.get_pixel(x1 as u32, y0 as u32);
                let p01 = src.get_pixel(x0 as u32, y1 as u32);
                let p11 = src.get_pixel(x1 as u32, y1 as u32);

                let mut rgb = [0u8; 3];
                for c in 0..3 {
                    rgb[c] = ((1.0 - fx) * (1.0 - fy) * p00[c] as f64
                        + fx * (1.0 - fy) * p10[c] as f64
                        + (1.0 - fx) * fy * p01[c] as f64
                        + fx * fy * p11[c] as f64) as u8;
                }
                out.put_pixel(x, y, image::Rgb(rgb));
            } else if x0 >= 0 && x0 < src_w && y0 >= 0 && y0 < src_h {
                out.put_pixel(x, y, *src.get_pixel(x0 as u32, y0 as u32));
            }
        }
    }

    Ok(out)
}

fn invert_3x3(m: &[[f64; 3]; 3]) -> Result<[[f64; 3]; 3], ScanError> {
    let mat = Matrix3::new(
        m[0][0], m[0][1], m[0][2], m[1][0], m[1][1], m[1][2], m[2][0], m[2][1], m[2][2],
    );
    let inv = mat
        .try_inverse()
        .ok_or_else(|| ScanError::Transform("homography is not invertible".into()))?;
    Ok([
        [inv[(0, 0)], inv[(0, 1)], inv[(0, 2)]],
        [inv[(1, 0)], inv[(1, 1)], inv[(1, 2)]],
        [inv[(2, 0)], inv[(2, 1)], inv[(2, 2)]],
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn near_square_quad_maps_to_average_edge_lengths() {
        let mut img = RgbImage::from_pixel(1000, 1000, Rgb([200, 200, 200]));
        for y in 100..900 {
            for x in 100..900 {
                img.put_pixel(x, y, Rgb([60, 80, 100]));
            }
        }
        let quad = vec![
            Point::new(100.0, 100.0),
            Point::new(900.0, 120.0),
            Point::new(880.0, 900.0),
            Point::new(120.0, 880.0),
        ];
        let photo = extract_photo(&img, &quad).unwrap();
        assert!((779..=781).contains(&photo.width()), "width {}", photo.width());
        assert!((779..=781).contains(&photo.height()), "height {}", photo.height());
        // the center of the warped photo comes from inside the dark region
        let center = photo.get_pixel(photo.width() / 2, photo.height() / 2);
        assert_eq!(*center, Rgb([60, 80, 100]));
    }

    #[test]
    fn axis_aligned_quad_is_a_plain_crop() {
        let mut img = RgbImage::from_pixel(300, 300, Rgb([255, 255, 255]));
        for y in 50..250 {
            for x in 50..150 {
                img.put_pixel(x, y, Rgb([10, 20, 30]));
            }
        }
        let quad = vec![
            Point::new(50.0, 50.0),
            Point::new(150.0, 50.0),
            Point::new(150.0, 250.0),
            Point::new(50.0, 250.0),
        ];
        let photo = extract_photo(&img, &quad).unwrap();
        assert_eq!((photo.width(), photo.height()), (100, 200));
        assert_eq!(*photo.get_pixel(50, 100), Rgb([10, 20, 30]));
    }

    #[test]
    fn non_quad_fails_per_entry_not_per_batch() {
        let img = RgbImage::from_pixel(100, 100, Rgb([0, 0, 0]));
        let good = vec![
            Point::new(10.0, 10.0),
            Point::new(90.0, 10.0),
            Point::new(90.0, 90.0),
            Point::new(10.0, 90.0),
        ];
        let bad = vec![Point::new(0.0, 0.0), Point::new(5.0, 5.0)];
        let results = extract_all(&img, &[good, bad]);
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(matches!(
            results[1],
            Err(ScanError::BadQuad { vertices: 2 })
        ));
    }

    #[test]
    fn reversed_vertex_order_extracts_identically() {
        let mut img = RgbImage::from_pixel(200, 200, Rgb([255, 255, 255]));
        for y in 20..180 {
            for x in 20..180 {
                img.put_pixel(x, y, Rgb([1, 2, 3]));
            }
        }
        let quad = vec![
            Point::new(20.0, 20.0),
            Point::new(180.0, 20.0),
            Point::new(180.0, 180.0),
            Point::new(20.0, 180.0),
        ];
        let mut reversed = quad.clone();
        reversed.reverse();
        let a = extract_photo(&img, &quad).unwrap();
        let b = extract_photo(&img, &reversed).unwrap();
        assert_eq!(a.dimensions(), b.dimensions());
        assert_eq!(a.as_raw(), b.as_raw());
    }
}
