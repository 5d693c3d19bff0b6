// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Outline tracing — binary ink mask to closed vector subpaths.
//
// Boundary pixels come from contour following (outer boundaries and holes
// separately); each boundary polygon is despeckled, smoothed, split at sharp
// corners, and every section between corners is emitted either as a straight
// line or as fitted cubic Beziers. The straight-vs-curve choice is local to
// each section, never globally optimized.

use image::GrayImage;
use imageproc::contours::{BorderType, find_contours};
use kurbo::{BezPath, PathEl, Point, fit_to_bezpath_opt, simplify::SimplifyBezPath};
use schriftwerk_core::config::TraceConfig;
use schriftwerk_core::error::{Result, SchriftwerkError};
use tracing::{debug, instrument, trace};

/// Traces ink-mask boundaries into closed Bezier subpaths.
pub struct OutlineTracer {
    corner_angle_deg: f64,
    fit_accuracy: f64,
    min_speckle_area: f64,
    smooth_iterations: u32,
}

impl OutlineTracer {
    pub fn new(config: &TraceConfig) -> Self {
        Self {
            corner_angle_deg: config.corner_angle_deg,
            fit_accuracy: config.fit_accuracy.max(0.05),
            min_speckle_area: config.min_speckle_area,
            smooth_iterations: config.smooth_iterations,
        }
    }

    /// Trace all ink boundaries in a mask (ink = foreground).
    ///
    /// Returns one `BezPath` holding zero or more closed subpaths: outer
    /// boundaries wound one way, holes the other, so the nonzero winding
    /// rule fills them correctly. An all-background mask yields an empty
    /// path.
    #[instrument(skip_all, fields(width = mask.width(), height = mask.height()))]
    pub fn trace(&self, mask: &GrayImage) -> Result<BezPath> {
        let contours = find_contours::<i32>(mask);
        debug!(boundaries = contours.len(), "Boundaries located");

        let mut outline = BezPath::new();
        for contour in &contours {
            let mut points: Vec<Point> = contour
                .points
                .iter()
                .map(|p| Point::new(p.x as f64, p.y as f64))
                .collect();
            if points.len() < 4 {
                continue;
            }

            let area = signed_area(&points);
            if area.abs() < self.min_speckle_area {
                trace!(area, "Speckle boundary dropped");
                continue;
            }
            orient(&mut points, contour.border_type, area);

            let smoothed = smooth_closed(&points, self.smooth_iterations);
            let subpath = self.fit_boundary(&smoothed)?;
            for el in subpath.elements() {
                outline.push(*el);
            }
        }

        debug!(subpaths = subpath_count(&outline), "Tracing complete");
        Ok(outline)
    }

    /// Fit one closed boundary polygon into a closed subpath.
    fn fit_boundary(&self, points: &[Point]) -> Result<BezPath> {
        for p in points {
            if !p.x.is_finite() || !p.y.is_finite() {
                return Err(SchriftwerkError::CellTrace(
                    "non-finite boundary coordinate".to_string(),
                ));
            }
        }

        let corners = self.find_corners(points);
        let mut subpath = BezPath::new();

        if corners.is_empty() {
            // Smooth blob: fit the whole loop in one pass.
            let mut poly = BezPath::new();
            poly.move_to(points[0]);
            for p in &points[1..] {
                poly.line_to(*p);
            }
            poly.line_to(points[0]);
            let fitted = fit_to_bezpath_opt(&SimplifyBezPath::new(poly), self.fit_accuracy);
            if fitted.elements().is_empty() {
                return Ok(BezPath::new());
            }
            for el in fitted.elements() {
                subpath.push(*el);
            }
        } else {
            subpath.move_to(points[corners[0]]);
            for w in 0..corners.len() {
                let start = corners[w];
                let end = corners[(w + 1) % corners.len()];
                let section = collect_section(points, start, end);
                self.append_section(&mut subpath, &section);
            }
        }

        subpath.close_path();
        Ok(subpath)
    }

    /// Append one corner-to-corner section as either a line or fitted curves.
    fn append_section(&self, path: &mut BezPath, section: &[Point]) {
        let last = *section.last().expect("section has endpoints");
        if section.len() <= 2 || max_chord_deviation(section) <= self.fit_accuracy {
            path.line_to(last);
            return;
        }

        let mut poly = BezPath::new();
        poly.move_to(section[0]);
        for p in &section[1..] {
            poly.line_to(*p);
        }
        let fitted = fit_to_bezpath_opt(&SimplifyBezPath::new(poly), self.fit_accuracy);

        let mut appended = false;
        for el in fitted.elements() {
            if matches!(el, PathEl::MoveTo(_)) {
                continue;
            }
            path.push(*el);
            appended = true;
        }
        if !appended {
            path.line_to(last);
        }
    }

    /// Indices of sharp corners: vertices whose turn angle (measured over a
    /// small lookahead span to ride out pixel staircase) exceeds the
    /// configured sensitivity, thinned to local maxima.
    fn find_corners(&self, points: &[Point]) -> Vec<usize> {
        let n = points.len();
        let span = (n / 16).clamp(2, 8);
        let threshold = self.corner_angle_deg.to_radians();

        let mut turns = vec![0.0f64; n];
        for i in 0..n {
            let prev = points[(i + n - span) % n];
            let next = points[(i + span) % n];
            let incoming = points[i] - prev;
            let outgoing = next - points[i];
            if incoming.hypot() < 1e-9 || outgoing.hypot() < 1e-9 {
                continue;
            }
            turns[i] = incoming.cross(outgoing).atan2(incoming.dot(outgoing)).abs();
        }

        let mut corners = Vec::new();
        for i in 0..n {
            if turns[i] < threshold {
                continue;
            }
            let mut is_peak = true;
            for d in 1..=span {
                let ahead = (i + d) % n;
                let behind = (i + n - d) % n;
                // Strictly-greater ahead wins; ties behind win, so exactly
                // one index survives a flat plateau.
                if turns[ahead] > turns[i] || turns[behind] >= turns[i] {
                    is_peak = false;
                    break;
                }
            }
            if is_peak {
                corners.push(i);
            }
        }
        corners
    }
}

/// Number of subpaths (MoveTo count) in a path.
pub fn subpath_count(path: &BezPath) -> usize {
    path.elements()
        .iter()
        .filter(|el| matches!(el, PathEl::MoveTo(_)))
        .count()
}

/// Signed shoelace area of a closed polygon (positive = counter-clockwise in
/// y-down image coordinates).
fn signed_area(points: &[Point]) -> f64 {
    let n = points.len();
    let mut area = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        area += points[i].x * points[j].y - points[j].x * points[i].y;
    }
    area / 2.0
}

/// Normalize winding so outer boundaries and holes are wound oppositely.
fn orient(points: &mut [Point], border: BorderType, area: f64) {
    let want_positive = matches!(border, BorderType::Outer);
    if (area > 0.0) != want_positive {
        points.reverse();
    }
}

/// Laplacian smoothing of a closed polygon: each vertex moves halfway toward
/// the midpoint of its neighbours, repeated `iterations` times.
fn smooth_closed(points: &[Point], iterations: u32) -> Vec<Point> {
    let n = points.len();
    let mut current = points.to_vec();
    for _ in 0..iterations {
        let mut next = Vec::with_capacity(n);
        for i in 0..n {
            let prev = current[(i + n - 1) % n];
            let here = current[i];
            let after = current[(i + 1) % n];
            next.push(Point::new(
                0.5 * here.x + 0.25 * (prev.x + after.x),
                0.5 * here.y + 0.25 * (prev.y + after.y),
            ));
        }
        current = next;
    }
    current
}

/// Section of a closed polygon from index `start` to `end` inclusive,
/// wrapping; `start == end` yields the whole loop back to its origin.
fn collect_section(points: &[Point], start: usize, end: usize) -> Vec<Point> {
    let n = points.len();
    let mut section = vec![points[start]];
    let mut i = (start + 1) % n;
    loop {
        section.push(points[i]);
        if i == end {
            break;
        }
        i = (i + 1) % n;
    }
    section
}

/// Largest perpendicular distance of interior points from the chord between
/// the section's endpoints.
fn max_chord_deviation(section: &[Point]) -> f64 {
    let a = section[0];
    let b = *section.last().expect("section has endpoints");
    let chord = b - a;
    let len = chord.hypot();
    if len < 1e-9 {
        // Degenerate chord: fall back to distance from the endpoint.
        return section
            .iter()
            .map(|p| (*p - a).hypot())
            .fold(0.0, f64::max);
    }
    section[1..section.len() - 1]
        .iter()
        .map(|p| (chord.cross(*p - a) / len).abs())
        .fold(0.0, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;
    use schriftwerk_core::config::TraceConfig;

    fn tracer() -> OutlineTracer {
        OutlineTracer::new(&TraceConfig::default())
    }

    fn blank(width: u32, height: u32) -> GrayImage {
        GrayImage::from_pixel(width, height, Luma([0u8]))
    }

    fn fill_rect(mask: &mut GrayImage, x0: u32, y0: u32, x1: u32, y1: u32, value: u8) {
        for y in y0..y1 {
            for x in x0..x1 {
                mask.put_pixel(x, y, Luma([value]));
            }
        }
    }

    fn fill_disk(mask: &mut GrayImage, cx: i32, cy: i32, radius: i32) {
        for y in (cy - radius)..(cy + radius) {
            for x in (cx - radius)..(cx + radius) {
                if (x - cx).pow(2) + (y - cy).pow(2) <= radius * radius {
                    mask.put_pixel(x as u32, y as u32, Luma([255u8]));
                }
            }
        }
    }

    /// Split a path into its subpaths and assert each is explicitly closed.
    fn closed_subpaths(path: &BezPath) -> Vec<Vec<PathEl>> {
        let mut subpaths: Vec<Vec<PathEl>> = Vec::new();
        for el in path.elements() {
            if matches!(el, PathEl::MoveTo(_)) {
                subpaths.push(Vec::new());
            }
            subpaths
                .last_mut()
                .expect("element before any MoveTo")
                .push(*el);
        }
        for sub in &subpaths {
            assert!(
                matches!(sub.last(), Some(PathEl::ClosePath)),
                "subpath must be closed: {sub:?}"
            );
        }
        subpaths
    }

    #[test]
    fn all_background_mask_traces_to_nothing() {
        let outline = tracer().trace(&blank(50, 50)).unwrap();
        assert!(outline.elements().is_empty());
    }

    #[test]
    fn filled_square_traces_to_one_closed_subpath() {
        let mut mask = blank(80, 80);
        fill_rect(&mut mask, 20, 20, 60, 60, 255);
        let outline = tracer().trace(&mask).unwrap();
        let subpaths = closed_subpaths(&outline);
        assert_eq!(subpaths.len(), 1);
        // A square's sides should come out straight.
        assert!(
            subpaths[0]
                .iter()
                .any(|el| matches!(el, PathEl::LineTo(_))),
            "square sides should trace as lines"
        );
    }

    #[test]
    fn traced_coordinates_stay_near_the_mask() {
        let mut mask = blank(80, 80);
        fill_rect(&mut mask, 20, 20, 60, 60, 255);
        let outline = tracer().trace(&mask).unwrap();
        for el in outline.elements() {
            let pts: Vec<Point> = match el {
                PathEl::MoveTo(p) | PathEl::LineTo(p) => vec![*p],
                PathEl::QuadTo(a, b) => vec![*a, *b],
                PathEl::CurveTo(a, b, c) => vec![*a, *b, *c],
                PathEl::ClosePath => vec![],
            };
            for p in pts {
                assert!(p.x.is_finite() && p.y.is_finite());
                assert!(
                    (15.0..=65.0).contains(&p.x) && (15.0..=65.0).contains(&p.y),
                    "point {p:?} strays from the ink"
                );
            }
        }
    }

    #[test]
    fn two_disjoint_regions_trace_to_two_closed_subpaths() {
        let mut mask = blank(120, 60);
        fill_rect(&mut mask, 10, 10, 40, 50, 255);
        fill_rect(&mut mask, 70, 10, 100, 50, 255);
        let outline = tracer().trace(&mask).unwrap();
        let subpaths = closed_subpaths(&outline);
        assert!(
            subpaths.len() >= 2,
            "expected at least two subpaths, got {}",
            subpaths.len()
        );
    }

    #[test]
    fn ring_traces_outer_and_hole_boundaries() {
        let mut mask = blank(100, 100);
        fill_rect(&mut mask, 20, 20, 80, 80, 255);
        fill_rect(&mut mask, 40, 40, 60, 60, 0);
        let outline = tracer().trace(&mask).unwrap();
        assert!(
            subpath_count(&outline) >= 2,
            "ring needs an outer boundary and a hole"
        );
        closed_subpaths(&outline);
    }

    #[test]
    fn disk_traces_with_curves() {
        let mut mask = blank(100, 100);
        fill_disk(&mut mask, 50, 50, 30);
        let outline = tracer().trace(&mask).unwrap();
        assert!(
            outline
                .elements()
                .iter()
                .any(|el| matches!(el, PathEl::CurveTo(..))),
            "a disk boundary should fit as curves"
        );
    }

    #[test]
    fn speckle_is_ignored() {
        let mut mask = blank(50, 50);
        mask.put_pixel(25, 25, Luma([255u8]));
        let outline = tracer().trace(&mask).unwrap();
        assert!(outline.elements().is_empty(), "single pixel is speckle");
    }

    #[test]
    fn orientation_separates_outer_from_hole() {
        let mut outer = vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
        ];
        let area = signed_area(&outer);
        orient(&mut outer, BorderType::Outer, area);
        assert!(signed_area(&outer) > 0.0);

        let mut hole = outer.clone();
        let area = signed_area(&hole);
        orient(&mut hole, BorderType::Hole, area);
        assert!(signed_area(&hole) < 0.0);
    }
}
