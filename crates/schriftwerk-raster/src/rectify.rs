// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Grid rectification — locate the printed grid boundary in a raw scan and
// perspective-correct it into the fixed-size canonical frame.

use image::{GrayImage, Luma, imageops};
use imageproc::contours::find_contours;
use imageproc::filter::gaussian_blur_f32;
use imageproc::geometric_transformations::{Interpolation, Projection, warp_into};
use imageproc::geometry::{approximate_polygon_dp, arc_length};
use tracing::{debug, info, instrument, warn};

/// Neighbourhood radius for the adaptive binarization pass.
const BINARIZE_BLOCK_RADIUS: u32 = 15;
/// Constant subtracted from the local mean; pixels darker than
/// `mean - c` count as ink.
const BINARIZE_C: i32 = 10;
/// Polygon approximation tolerance as a fraction of the contour perimeter.
const APPROX_EPSILON_FRAC: f64 = 0.02;
/// A grid candidate must cover at least this fraction of the scan area.
const MIN_AREA_FRAC: f32 = 0.10;

/// Locates the grid quadrilateral in a scan and warps it to canonical size.
///
/// Detection is best-effort: when no plausible quadrilateral is found the
/// scan is assumed to already be a tightly cropped grid and is passed through
/// (resampled to canonical dimensions), with the degradation reported to the
/// caller via the returned flag.
pub struct GridRectifier {
    canonical_width: u32,
    canonical_height: u32,
}

impl GridRectifier {
    pub fn new(canonical_width: u32, canonical_height: u32) -> Self {
        Self {
            canonical_width,
            canonical_height,
        }
    }

    /// Rectify a decoded scan into the canonical frame.
    ///
    /// Returns the canonical-sized frame and whether a grid boundary was
    /// actually detected (`false` means the permissive fallback was taken).
    #[instrument(skip_all, fields(width = scan.width(), height = scan.height()))]
    pub fn rectify(&self, scan: &GrayImage) -> (GrayImage, bool) {
        let (scan_w, scan_h) = scan.dimensions();

        // Noise reduction, then local-mean binarization with ink as foreground.
        let blurred = gaussian_blur_f32(scan, 1.0);
        let ink = binarize_ink(&blurred, BINARIZE_BLOCK_RADIUS, BINARIZE_C);
        debug!("Scan binarized for boundary detection");

        let corners = match self.find_grid_quad(&ink, scan_w, scan_h) {
            Some(quad) => quad,
            None => {
                warn!("No grid boundary found; passing scan through unrectified");
                return (self.pass_through(scan), false);
            }
        };

        let ordered = order_corners(corners);
        debug!(
            top_left = ?ordered[0],
            top_right = ?ordered[1],
            bottom_right = ?ordered[2],
            bottom_left = ?ordered[3],
            "Grid corners ordered"
        );

        let dest: [(f32, f32); 4] = [
            (0.0, 0.0),
            (self.canonical_width as f32, 0.0),
            (self.canonical_width as f32, self.canonical_height as f32),
            (0.0, self.canonical_height as f32),
        ];

        let Some(projection) = Projection::from_control_points(ordered, dest) else {
            warn!("Degenerate grid quadrilateral; passing scan through unrectified");
            return (self.pass_through(scan), false);
        };

        let mut output = GrayImage::new(self.canonical_width, self.canonical_height);
        warp_into(
            scan,
            &projection,
            Interpolation::Bilinear,
            Luma([255u8]),
            &mut output,
        );

        info!(
            out_w = self.canonical_width,
            out_h = self.canonical_height,
            "Grid rectified"
        );
        (output, true)
    }

    /// Select the largest 4-vertex contour approximation that looks like the
    /// printed grid: big enough, and with roughly the grid's aspect ratio.
    fn find_grid_quad(&self, ink: &GrayImage, scan_w: u32, scan_h: u32) -> Option<[(f32, f32); 4]> {
        let img_area = scan_w as f32 * scan_h as f32;
        let expected_aspect = self.canonical_width as f32 / self.canonical_height as f32;

        let contours = find_contours::<i32>(ink);
        debug!(contour_count = contours.len(), "Contours located");

        let mut best: Option<(f32, [(f32, f32); 4])> = None;
        for contour in &contours {
            if contour.points.len() < 4 {
                continue;
            }
            let perimeter = arc_length(&contour.points, true);
            let poly = approximate_polygon_dp(&contour.points, APPROX_EPSILON_FRAC * perimeter, true);
            if poly.len() != 4 {
                continue;
            }

            let quad: [(f32, f32); 4] = [
                (poly[0].x as f32, poly[0].y as f32),
                (poly[1].x as f32, poly[1].y as f32),
                (poly[2].x as f32, poly[2].y as f32),
                (poly[3].x as f32, poly[3].y as f32),
            ];

            let area = shoelace_area(&quad);
            if area < img_area * MIN_AREA_FRAC {
                continue;
            }

            let aspect = bounding_box_aspect(&quad);
            if aspect < expected_aspect * 0.55 || aspect > expected_aspect * 1.8 {
                continue;
            }

            if best.as_ref().is_none_or(|(best_area, _)| area > *best_area) {
                best = Some((area, quad));
            }
        }

        best.map(|(_, quad)| quad)
    }

    /// Fallback path: keep the scan content, meet the canonical size contract.
    fn pass_through(&self, scan: &GrayImage) -> GrayImage {
        if scan.dimensions() == (self.canonical_width, self.canonical_height) {
            scan.clone()
        } else {
            imageops::resize(
                scan,
                self.canonical_width,
                self.canonical_height,
                imageops::FilterType::Triangle,
            )
        }
    }
}

/// Order four quadrilateral corners as [top-left, top-right, bottom-right,
/// bottom-left], independent of input order.
///
/// The smallest coordinate sum is the top-left corner and the largest the
/// bottom-right; the smallest difference (y - x) is the top-right and the
/// largest the bottom-left.
pub fn order_corners(corners: [(f32, f32); 4]) -> [(f32, f32); 4] {
    let by_sum = |p: &(f32, f32)| p.0 + p.1;
    let by_diff = |p: &(f32, f32)| p.1 - p.0;

    let top_left = *corners
        .iter()
        .min_by(|a, b| by_sum(a).total_cmp(&by_sum(b)))
        .expect("four corners");
    let bottom_right = *corners
        .iter()
        .max_by(|a, b| by_sum(a).total_cmp(&by_sum(b)))
        .expect("four corners");
    let top_right = *corners
        .iter()
        .min_by(|a, b| by_diff(a).total_cmp(&by_diff(b)))
        .expect("four corners");
    let bottom_left = *corners
        .iter()
        .max_by(|a, b| by_diff(a).total_cmp(&by_diff(b)))
        .expect("four corners");

    [top_left, top_right, bottom_right, bottom_left]
}

/// Local-mean adaptive binarization with ink (dark) as foreground.
///
/// A pixel is ink when it is darker than the mean of its neighbourhood minus
/// a constant, which keeps uniform paper regions background even under
/// uneven lighting.
fn binarize_ink(gray: &GrayImage, block_radius: u32, c: i32) -> GrayImage {
    let (width, height) = gray.dimensions();
    let integral = compute_integral_image(gray);
    let mut output = GrayImage::new(width, height);

    for y in 0..height {
        for x in 0..width {
            let local_mean = region_mean(&integral, width, height, x, y, block_radius);
            let threshold = (local_mean as i32 - c).clamp(0, 255) as u8;
            let pixel_val = gray.get_pixel(x, y).0[0];
            let ink = if pixel_val < threshold { 255u8 } else { 0u8 };
            output.put_pixel(x, y, Luma([ink]));
        }
    }

    output
}

/// Summed-area table with a zero-padded border; dimensions (w+1) x (h+1).
fn compute_integral_image(gray: &GrayImage) -> Vec<u64> {
    let (w, h) = gray.dimensions();
    let stride = (w + 1) as usize;
    let mut table = vec![0u64; stride * (h + 1) as usize];

    for y in 0..h {
        let mut row_sum: u64 = 0;
        for x in 0..w {
            row_sum += gray.get_pixel(x, y).0[0] as u64;
            let idx = (y + 1) as usize * stride + (x + 1) as usize;
            let above = y as usize * stride + (x + 1) as usize;
            table[idx] = row_sum + table[above];
        }
    }

    table
}

/// Mean pixel value in a square region centred on (cx, cy), clamped to the
/// image bounds, via the precomputed integral image.
fn region_mean(
    integral: &[u64],
    img_width: u32,
    img_height: u32,
    cx: u32,
    cy: u32,
    radius: u32,
) -> f64 {
    let stride = (img_width + 1) as usize;

    let x1 = cx.saturating_sub(radius) as usize;
    let y1 = cy.saturating_sub(radius) as usize;
    let x2 = ((cx + radius + 1) as usize).min(img_width as usize);
    let y2 = ((cy + radius + 1) as usize).min(img_height as usize);

    let area = ((x2 - x1) * (y2 - y1)) as f64;
    if area == 0.0 {
        return 128.0;
    }

    let sum = integral[y2 * stride + x2] as f64 - integral[y1 * stride + x2] as f64
        - integral[y2 * stride + x1] as f64
        + integral[y1 * stride + x1] as f64;

    sum / area
}

/// Quadrilateral area via the shoelace formula (vertices in order).
fn shoelace_area(corners: &[(f32, f32); 4]) -> f32 {
    let n = corners.len();
    let mut area = 0.0f32;
    for i in 0..n {
        let j = (i + 1) % n;
        area += corners[i].0 * corners[j].1;
        area -= corners[j].0 * corners[i].1;
    }
    area.abs() / 2.0
}

/// Width/height ratio of the corners' axis-aligned bounding box.
fn bounding_box_aspect(corners: &[(f32, f32); 4]) -> f32 {
    let min_x = corners.iter().map(|p| p.0).fold(f32::INFINITY, f32::min);
    let max_x = corners.iter().map(|p| p.0).fold(f32::NEG_INFINITY, f32::max);
    let min_y = corners.iter().map(|p| p.1).fold(f32::INFINITY, f32::min);
    let max_y = corners.iter().map(|p| p.1).fold(f32::NEG_INFINITY, f32::max);
    let height = (max_y - min_y).max(1.0);
    (max_x - min_x) / height
}

#[cfg(test)]
mod tests {
    use super::*;
    use imageproc::drawing::draw_hollow_rect_mut;
    use imageproc::geometric_transformations::rotate_about_center;
    use imageproc::rect::Rect;

    /// A white scan with a dark hollow grid rectangle at 10% margins, in the
    /// canonical 7.5:5.5 proportions.
    fn synthetic_grid_scan() -> GrayImage {
        let (w, h) = (1125u32, 825u32);
        let mut img = GrayImage::from_pixel(w, h, Luma([255u8]));
        // 3px border so blur does not wash the line out.
        for inset in 0..3i32 {
            draw_hollow_rect_mut(
                &mut img,
                Rect::at(112 + inset, 82 + inset)
                    .of_size(900 - 2 * inset as u32, 660 - 2 * inset as u32),
                Luma([0u8]),
            );
        }
        img
    }

    fn assert_rectifies(scan: &GrayImage) {
        let rectifier = GridRectifier::new(2250, 1650);
        let (frame, found) = rectifier.rectify(scan);
        assert!(found, "grid boundary must be detected");
        assert_eq!(frame.dimensions(), (2250, 1650));
    }

    #[test]
    fn rectifies_straight_scan_to_canonical_size() {
        assert_rectifies(&synthetic_grid_scan());
    }

    #[test]
    fn rectifies_scan_rotated_plus_two_degrees() {
        let rotated = rotate_about_center(
            &synthetic_grid_scan(),
            2.0f32.to_radians(),
            Interpolation::Bilinear,
            Luma([255u8]),
        );
        assert_rectifies(&rotated);
    }

    #[test]
    fn rectifies_scan_rotated_minus_two_degrees() {
        let rotated = rotate_about_center(
            &synthetic_grid_scan(),
            (-2.0f32).to_radians(),
            Interpolation::Bilinear,
            Luma([255u8]),
        );
        assert_rectifies(&rotated);
    }

    #[test]
    fn blank_scan_falls_back_to_resized_input() {
        let blank = GrayImage::from_pixel(400, 300, Luma([255u8]));
        let rectifier = GridRectifier::new(2250, 1650);
        let (frame, found) = rectifier.rectify(&blank);
        assert!(!found, "nothing to detect in a blank scan");
        assert_eq!(frame.dimensions(), (2250, 1650));
    }

    #[test]
    fn corner_ordering_is_input_order_invariant() {
        let tl = (10.0, 20.0);
        let tr = (200.0, 25.0);
        let br = (205.0, 150.0);
        let bl = (8.0, 145.0);
        let expected = [tl, tr, br, bl];

        let permutations = [
            [tl, tr, br, bl],
            [tr, br, bl, tl],
            [br, bl, tl, tr],
            [bl, tl, tr, br],
            [bl, br, tr, tl],
            [tr, tl, bl, br],
            [br, tl, bl, tr],
            [tl, br, tr, bl],
        ];
        for perm in permutations {
            assert_eq!(order_corners(perm), expected, "permutation {perm:?}");
        }
    }

    #[test]
    fn corner_ordering_handles_slight_rotation() {
        // A quad tilted a few degrees still orders unambiguously.
        let quad = [(150.0, 15.0), (12.0, 25.0), (18.0, 140.0), (155.0, 130.0)];
        let ordered = order_corners(quad);
        assert_eq!(ordered[0], (12.0, 25.0));
        assert_eq!(ordered[1], (150.0, 15.0));
        assert_eq!(ordered[2], (155.0, 130.0));
        assert_eq!(ordered[3], (18.0, 140.0));
    }

    #[test]
    fn binarize_marks_dark_strokes_as_ink() {
        let mut img = GrayImage::from_pixel(64, 64, Luma([255u8]));
        for x in 20..44 {
            img.put_pixel(x, 32, Luma([0u8]));
        }
        let ink = binarize_ink(&img, BINARIZE_BLOCK_RADIUS, BINARIZE_C);
        assert_eq!(ink.get_pixel(32, 32).0[0], 255, "stroke is foreground");
        assert_eq!(ink.get_pixel(5, 5).0[0], 0, "paper stays background");
    }
}
