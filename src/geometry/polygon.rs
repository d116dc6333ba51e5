//! Polygon primitives shared by hull construction and boundary physics.
//!
//! Polygons are vertex lists with an implicit closing edge. One vertex is a
//! point, two vertices a segment; both are accepted everywhere.

use serde::{Deserialize, Serialize};

use super::Point;

/// Containment tolerance for boundary points.
pub const EPSILON: f64 = 1e-9;

/// Shoelace area, positive for counter-clockwise order.
pub fn signed_area(polygon: &[Point]) -> f64 {
    if polygon.len() < 3 {
        return 0.0;
    }
    let mut twice = 0.0;
    for (i, &a) in polygon.iter().enumerate() {
        let b = polygon[(i + 1) % polygon.len()];
        twice += a.cross(b);
    }
    twice / 2.0
}

/// Area centroid; falls back to the vertex mean for zero-area shapes.
pub fn centroid(polygon: &[Point]) -> Point {
    if polygon.is_empty() {
        return Point::default();
    }
    let area = signed_area(polygon);
    if area.abs() <= EPSILON {
        return vertex_mean(polygon);
    }
    let mut cx = 0.0;
    let mut cy = 0.0;
    for (i, &a) in polygon.iter().enumerate() {
        let b = polygon[(i + 1) % polygon.len()];
        let f = a.cross(b);
        cx += (a.x + b.x) * f;
        cy += (a.y + b.y) * f;
    }
    Point::new(cx / (6.0 * area), cy / (6.0 * area))
}

pub fn vertex_mean(points: &[Point]) -> Point {
    if points.is_empty() {
        return Point::default();
    }
    let sum = points.iter().fold(Point::default(), |acc, &p| acc.add(p));
    sum.scale(1.0 / points.len() as f64)
}

pub fn distance_to_segment(p: Point, a: Point, b: Point) -> f64 {
    let ab = b.sub(a);
    let len_sq = ab.dot(ab);
    if len_sq == 0.0 {
        return p.distance(a);
    }
    let t = (p.sub(a).dot(ab) / len_sq).clamp(0.0, 1.0);
    p.distance(a.add(ab.scale(t)))
}

/// Whether `p` lies inside or within `eps` of the boundary.
pub fn contains_point(polygon: &[Point], p: Point, eps: f64) -> bool {
    match polygon.len() {
        0 => return false,
        1 => return p.distance(polygon[0]) <= eps,
        _ => {}
    }

    let n = polygon.len();
    for i in 0..n {
        if distance_to_segment(p, polygon[i], polygon[(i + 1) % n]) <= eps {
            return true;
        }
    }
    if n < 3 {
        return false;
    }

    // Even-odd ray cast towards +x
    let mut inside = false;
    for i in 0..n {
        let a = polygon[i];
        let b = polygon[(i + 1) % n];
        if (a.y > p.y) != (b.y > p.y) {
            let x_cross = a.x + (p.y - a.y) * (b.x - a.x) / (b.y - a.y);
            if p.x < x_cross {
                inside = !inside;
            }
        }
    }
    inside
}

fn orientation(a: Point, b: Point, c: Point) -> f64 {
    b.sub(a).cross(c.sub(a))
}

/// Proper or touching intersection of segments `ab` and `cd`.
pub fn segments_intersect(a: Point, b: Point, c: Point, d: Point) -> bool {
    let d1 = orientation(c, d, a);
    let d2 = orientation(c, d, b);
    let d3 = orientation(a, b, c);
    let d4 = orientation(a, b, d);

    if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
    {
        return true;
    }
    (d1 == 0.0 && distance_to_segment(a, c, d) <= EPSILON)
        || (d2 == 0.0 && distance_to_segment(b, c, d) <= EPSILON)
        || (d3 == 0.0 && distance_to_segment(c, a, b) <= EPSILON)
        || (d4 == 0.0 && distance_to_segment(d, a, b) <= EPSILON)
}

/// No two non-adjacent edges touch and no vertex repeats.
pub fn is_simple(polygon: &[Point]) -> bool {
    let n = polygon.len();
    if n < 3 {
        return false;
    }
    for i in 0..n {
        for j in (i + 1)..n {
            if polygon[i].distance(polygon[j]) <= EPSILON {
                return false;
            }
        }
    }
    for i in 0..n {
        let (a, b) = (polygon[i], polygon[(i + 1) % n]);
        for j in (i + 2)..n {
            if i == 0 && j == n - 1 {
                continue;
            }
            let (c, d) = (polygon[j], polygon[(j + 1) % n]);
            if segments_intersect(a, b, c, d) {
                return false;
            }
        }
    }
    true
}

// ============================================================================
// Bounding boxes
// ============================================================================

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Aabb {
    pub fn from_points(points: &[Point]) -> Self {
        points.iter().fold(
            Self {
                min_x: f64::INFINITY,
                min_y: f64::INFINITY,
                max_x: f64::NEG_INFINITY,
                max_y: f64::NEG_INFINITY,
            },
            |b, p| Self {
                min_x: b.min_x.min(p.x),
                min_y: b.min_y.min(p.y),
                max_x: b.max_x.max(p.x),
                max_y: b.max_y.max(p.y),
            },
        )
    }

    /// Closed-interval overlap test.
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min_x <= other.max_x
            && other.min_x <= self.max_x
            && self.min_y <= other.max_y
            && other.min_y <= self.max_y
    }

    pub fn translate(&self, dx: f64, dy: f64) -> Self {
        Self {
            min_x: self.min_x + dx,
            min_y: self.min_y + dy,
            max_x: self.max_x + dx,
            max_y: self.max_y + dy,
        }
    }
}

// ============================================================================
// Overlap tests
// ============================================================================

/// Minimum translation vector: moving the second shape by `axis * depth`
/// separates it from the first.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mtv {
    /// Unit axis pointing from the first shape towards the second
    pub axis: Point,
    pub depth: f64,
}

fn project(polygon: &[Point], axis: Point) -> (f64, f64) {
    polygon.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
        let d = p.dot(axis);
        (lo.min(d), hi.max(d))
    })
}

fn unit(v: Point) -> Option<Point> {
    let len = v.length();
    (len > EPSILON).then(|| v.scale(1.0 / len))
}

/// Direction from `a` to `b` through their vertex means; +x when they coincide.
fn center_axis(a: &[Point], b: &[Point]) -> Point {
    unit(vertex_mean(b).sub(vertex_mean(a))).unwrap_or(Point::new(1.0, 0.0))
}

/// Shortest shift along `axis` that separates the projections; <= 0 when
/// they are already apart.
fn interval_overlap(a: &[Point], b: &[Point], axis: Point) -> f64 {
    let (a_lo, a_hi) = project(a, axis);
    let (b_lo, b_hi) = project(b, axis);
    (a_hi - b_lo).min(b_hi - a_lo)
}

/// Separating-axis test for convex shapes (points and segments included).
///
/// Returns `None` when a separating axis exists or the shapes only touch.
pub fn sat_overlap(a: &[Point], b: &[Point]) -> Option<Mtv> {
    if a.is_empty() || b.is_empty() {
        return None;
    }
    let toward_b = center_axis(a, b);

    // The center axis goes first and wins ties, so coincident or
    // symmetric shapes separate along it
    let mut axes: Vec<Point> = Vec::with_capacity(a.len() + b.len() + 1);
    axes.push(toward_b);
    for polygon in [a, b] {
        let n = polygon.len();
        if n < 2 {
            continue;
        }
        let edges = if n == 2 { 1 } else { n };
        for i in 0..edges {
            let edge = polygon[(i + 1) % n].sub(polygon[i]);
            if let Some(normal) = unit(Point::new(-edge.y, edge.x)) {
                axes.push(normal);
            }
        }
    }

    let mut best: Option<Mtv> = None;
    for axis in axes {
        let overlap = interval_overlap(a, b, axis);
        if overlap <= EPSILON {
            return None;
        }
        if matches!(best, Some(m) if overlap >= m.depth - EPSILON) {
            continue;
        }
        let axis = if axis.dot(toward_b) < 0.0 { axis.scale(-1.0) } else { axis };
        best = Some(Mtv { axis, depth: overlap });
    }
    best
}

/// Vertices plus edge midpoints.
fn samples(polygon: &[Point]) -> Vec<Point> {
    let n = polygon.len();
    let mut out = polygon.to_vec();
    if n >= 2 {
        for i in 0..n {
            out.push(polygon[i].add(polygon[(i + 1) % n]).scale(0.5));
        }
    }
    out
}

/// Overlap test for arbitrary simple polygons by point sampling and edge
/// crossings. Depth is measured along the center-to-center axis.
pub fn sampled_overlap(a: &[Point], b: &[Point]) -> Option<Mtv> {
    if a.is_empty() || b.is_empty() {
        return None;
    }
    let strictly_inside = |polygon: &[Point], p: Point| {
        contains_point(polygon, p, 0.0) && !on_boundary(polygon, p)
    };
    let sampled = samples(a).into_iter().any(|p| strictly_inside(b, p))
        || samples(b).into_iter().any(|p| strictly_inside(a, p))
        || edges_cross(a, b);
    if !sampled {
        return None;
    }

    let axis = center_axis(a, b);
    let depth = interval_overlap(a, b, axis).max(EPSILON);
    Some(Mtv { axis, depth })
}

fn on_boundary(polygon: &[Point], p: Point) -> bool {
    let n = polygon.len();
    if n == 1 {
        return p.distance(polygon[0]) <= EPSILON;
    }
    (0..n).any(|i| distance_to_segment(p, polygon[i], polygon[(i + 1) % n]) <= EPSILON)
}

/// Proper crossings only (endpoints strictly on both sides).
fn edges_cross(a: &[Point], b: &[Point]) -> bool {
    let edges = |polygon: &[Point]| -> Vec<(Point, Point)> {
        let n = polygon.len();
        match n {
            0 | 1 => Vec::new(),
            2 => vec![(polygon[0], polygon[1])],
            _ => (0..n).map(|i| (polygon[i], polygon[(i + 1) % n])).collect(),
        }
    };
    let eb = edges(b);
    edges(a).into_iter().any(|(p, q)| {
        eb.iter().any(|&(r, s)| {
            let d1 = orientation(r, s, p);
            let d2 = orientation(r, s, q);
            let d3 = orientation(p, q, r);
            let d4 = orientation(p, q, s);
            d1 * d2 < 0.0 && d3 * d4 < 0.0
        })
    })
}

/// Overlap test dispatching on convexity.
pub fn overlap(a: &[Point], a_convex: bool, b: &[Point], b_convex: bool) -> Option<Mtv> {
    if a_convex && b_convex {
        sat_overlap(a, b)
    } else {
        sampled_overlap(a, b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x: f64, y: f64, side: f64) -> Vec<Point> {
        vec![
            Point::new(x, y),
            Point::new(x + side, y),
            Point::new(x + side, y + side),
            Point::new(x, y + side),
        ]
    }

    /// U shape opening upwards, 3 wide and 3 tall with a 1-wide notch.
    fn u_shape() -> Vec<Point> {
        vec![
            Point::new(0.0, 0.0),
            Point::new(3.0, 0.0),
            Point::new(3.0, 3.0),
            Point::new(2.0, 3.0),
            Point::new(2.0, 1.0),
            Point::new(1.0, 1.0),
            Point::new(1.0, 3.0),
            Point::new(0.0, 3.0),
        ]
    }

    #[test]
    fn test_area_and_centroid() {
        let sq = square(0.0, 0.0, 2.0);
        assert!((signed_area(&sq) - 4.0).abs() < EPSILON);
        assert_eq!(centroid(&sq), Point::new(1.0, 1.0));

        let mut cw = sq.clone();
        cw.reverse();
        assert!((signed_area(&cw) + 4.0).abs() < EPSILON);

        let seg = [Point::new(0.0, 0.0), Point::new(4.0, 2.0)];
        assert_eq!(centroid(&seg), Point::new(2.0, 1.0));
    }

    #[test]
    fn test_contains_point() {
        let u = u_shape();
        assert!(contains_point(&u, Point::new(0.5, 2.0), EPSILON));
        assert!(!contains_point(&u, Point::new(1.5, 2.0), EPSILON));
        assert!(contains_point(&u, Point::new(3.0, 1.5), EPSILON));
        assert!(!contains_point(&u, Point::new(3.1, 1.5), EPSILON));

        let seg = [Point::new(0.0, 0.0), Point::new(2.0, 0.0)];
        assert!(contains_point(&seg, Point::new(1.0, 0.0), EPSILON));
        assert!(!contains_point(&seg, Point::new(1.0, 0.1), EPSILON));
    }

    #[test]
    fn test_is_simple() {
        assert!(is_simple(&u_shape()));
        let bowtie = vec![
            Point::new(0.0, 0.0),
            Point::new(2.0, 2.0),
            Point::new(2.0, 0.0),
            Point::new(0.0, 2.0),
        ];
        assert!(!is_simple(&bowtie));
    }

    #[test]
    fn test_aabb() {
        let a = Aabb::from_points(&square(0.0, 0.0, 2.0));
        let b = Aabb::from_points(&square(1.5, 1.5, 2.0));
        let c = Aabb::from_points(&square(5.0, 0.0, 1.0));
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
        assert!(a.translate(4.0, 0.0).intersects(&c));
    }

    #[test]
    fn test_sat_overlap_depth_and_axis() {
        let a = square(0.0, 0.0, 2.0);
        let b = square(1.5, 0.0, 2.0);
        let mtv = sat_overlap(&a, &b).unwrap();
        assert!((mtv.depth - 0.5).abs() < 1e-9);
        assert!((mtv.axis.x - 1.0).abs() < 1e-9);
        assert!(mtv.axis.y.abs() < 1e-9);

        // Reverse order flips the axis
        let mtv = sat_overlap(&b, &a).unwrap();
        assert!((mtv.axis.x + 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_sat_coincident_squares_split_along_x() {
        let a = square(0.0, 0.0, 1.0);
        let b = square(0.0, 0.0, 1.0);
        let mtv = sat_overlap(&a, &b).unwrap();
        assert!((mtv.depth - 1.0).abs() < 1e-9);
        assert!((mtv.axis.x - 1.0).abs() < 1e-9);
        assert!(mtv.axis.y.abs() < 1e-9);
    }

    #[test]
    fn test_sat_tie_prefers_center_axis() {
        // Depth 1.5 on both axes, centers offset along x only
        let a = square(0.0, 0.0, 2.0);
        let b = vec![
            Point::new(0.5, 0.5),
            Point::new(4.5, 0.5),
            Point::new(4.5, 1.5),
            Point::new(0.5, 1.5),
        ];
        let mtv = sat_overlap(&a, &b).unwrap();
        assert!((mtv.depth - 1.5).abs() < 1e-9);
        assert!(mtv.axis.y.abs() < 1e-9);
        assert!(mtv.axis.x > 0.0);
    }

    #[test]
    fn test_sat_separated_and_touching() {
        let a = square(0.0, 0.0, 1.0);
        assert!(sat_overlap(&a, &square(3.0, 0.0, 1.0)).is_none());
        assert!(sat_overlap(&a, &square(1.0, 0.0, 1.0)).is_none());
    }

    #[test]
    fn test_sat_point_inside_square() {
        let a = square(0.0, 0.0, 2.0);
        let mtv = sat_overlap(&a, &[Point::new(1.5, 1.0)]).unwrap();
        assert!((mtv.depth - 0.5).abs() < 1e-9);
        assert!(sat_overlap(&a, &[Point::new(2.5, 1.0)]).is_none());
    }

    #[test]
    fn test_sampled_overlap_respects_notch() {
        let u = u_shape();
        // Sits in the notch without touching the walls
        let inside_notch = square(1.2, 1.5, 0.6);
        assert!(sampled_overlap(&u, &inside_notch).is_none());
        // Same box shifted onto the left arm
        let on_arm = square(0.5, 1.5, 0.6);
        let mtv = sampled_overlap(&u, &on_arm).unwrap();
        assert!(mtv.depth > 0.0);
        // The convex test would wrongly report the notch case
        assert!(sat_overlap(&u, &inside_notch).is_some());
    }
}
