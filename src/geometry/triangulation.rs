//! Delaunay triangulation by sweep insertion and edge flipping.
//!
//! Points are inserted in lexicographic order, so each new point lies
//! outside the current hull and is joined to every hull edge it sees. The
//! edges opposite the new point are then legalized with Lawson flips. The
//! in-circle predicate carries a relative tolerance: points on a common
//! circle never trigger a flip, so rings and grids still triangulate into
//! non-overlapping triangles. Collinear input yields no triangles.

use std::collections::HashMap;

use super::Point;

/// Relative tolerance of the orientation predicate.
const ORIENT_EPS: f64 = 1e-12;
/// Relative tolerance of the in-circle predicate.
const INCIRCLE_EPS: f64 = 1e-10;

fn orient(a: Point, b: Point, c: Point) -> f64 {
    b.sub(a).cross(c.sub(a))
}

fn orient_tolerance(a: Point, b: Point, c: Point) -> f64 {
    ORIENT_EPS * b.sub(a).length() * c.sub(a).length()
}

/// `c` strictly left of the directed line `a -> b`.
fn left_of(a: Point, b: Point, c: Point) -> bool {
    orient(a, b, c) > orient_tolerance(a, b, c)
}

/// `c` strictly right of the directed line `a -> b`.
fn right_of(a: Point, b: Point, c: Point) -> bool {
    orient(a, b, c) < -orient_tolerance(a, b, c)
}

/// `d` strictly inside the circumcircle of the counter-clockwise triangle `abc`.
fn in_circle(a: Point, b: Point, c: Point, d: Point) -> bool {
    let (ad, bd, cd) = (a.sub(d), b.sub(d), c.sub(d));
    let (a2, b2, c2) = (ad.dot(ad), bd.dot(bd), cd.dot(cd));
    let det = a2 * bd.cross(cd) - b2 * ad.cross(cd) + c2 * ad.cross(bd);
    let magnitude = a2 * ((bd.x * cd.y).abs() + (bd.y * cd.x).abs())
        + b2 * ((ad.x * cd.y).abs() + (ad.y * cd.x).abs())
        + c2 * ((ad.x * bd.y).abs() + (ad.y * bd.x).abs());
    det > INCIRCLE_EPS * magnitude
}

fn directed_edges(tri: [usize; 3]) -> [(usize, usize); 3] {
    [(tri[0], tri[1]), (tri[1], tri[2]), (tri[2], tri[0])]
}

/// Counter-clockwise triangles plus directed edge -> owning triangle.
#[derive(Debug, Default)]
struct Mesh {
    triangles: Vec<[usize; 3]>,
    owner: HashMap<(usize, usize), usize>,
}

impl Mesh {
    fn push(&mut self, tri: [usize; 3]) -> usize {
        let t = self.triangles.len();
        self.triangles.push(tri);
        for edge in directed_edges(tri) {
            self.owner.insert(edge, t);
        }
        t
    }

    fn replace(&mut self, t: usize, tri: [usize; 3]) {
        for edge in directed_edges(self.triangles[t]) {
            if self.owner.get(&edge) == Some(&t) {
                self.owner.remove(&edge);
            }
        }
        self.triangles[t] = tri;
        for edge in directed_edges(tri) {
            self.owner.insert(edge, t);
        }
    }

    /// Flip the edges opposite `p` until every one of them is locally Delaunay.
    fn legalize(&mut self, points: &[Point], t: usize, p: usize) {
        let mut stack = vec![t];
        while let Some(t) = stack.pop() {
            let tri = self.triangles[t];
            let Some(k) = tri.iter().position(|&v| v == p) else {
                continue;
            };
            let (x, y) = (tri[(k + 1) % 3], tri[(k + 2) % 3]);
            let Some(&u) = self.owner.get(&(y, x)) else {
                continue;
            };
            let Some(&q) = self.triangles[u].iter().find(|&&v| v != x && v != y) else {
                continue;
            };
            if !in_circle(points[p], points[x], points[y], points[q]) {
                continue;
            }
            // Quad p, x, q, y: swap diagonal x-y for p-q
            self.replace(t, [p, x, q]);
            self.replace(u, [p, q, y]);
            stack.push(t);
            stack.push(u);
        }
    }
}

/// Counter-clockwise triangles as index triples into `points`.
///
/// The input must be free of duplicate points.
pub fn delaunay(points: &[Point]) -> Vec<[usize; 3]> {
    let n = points.len();
    if n < 3 {
        return Vec::new();
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| {
        points[a]
            .x
            .total_cmp(&points[b].x)
            .then(points[a].y.total_cmp(&points[b].y))
    });

    // Seed: the collinear prefix fanned to the first point off its line
    let (s0, s1) = (order[0], order[1]);
    let Some(k) = (2..n).find(|&k| {
        let c = points[order[k]];
        left_of(points[s0], points[s1], c) || right_of(points[s0], points[s1], c)
    }) else {
        return Vec::new();
    };
    let chain = &order[..k];
    let apex = order[k];

    let mut mesh = Mesh::default();
    let mut hull: Vec<usize>;
    if left_of(points[s0], points[s1], points[apex]) {
        for w in chain.windows(2) {
            mesh.push([w[0], w[1], apex]);
        }
        hull = chain.to_vec();
        hull.push(apex);
    } else {
        for w in chain.windows(2) {
            mesh.push([w[1], w[0], apex]);
        }
        hull = vec![s0, apex];
        hull.extend(chain[1..].iter().rev());
    }

    for &p in &order[k + 1..] {
        let m = hull.len();
        let visible: Vec<bool> = (0..m)
            .map(|i| right_of(points[hull[i]], points[hull[(i + 1) % m]], points[p]))
            .collect();
        let Some(first) = (0..m).find(|&i| visible[i] && !visible[(i + m - 1) % m]) else {
            continue;
        };

        let mut fresh = Vec::new();
        let mut i = first;
        while visible[i] && fresh.len() < m {
            let (a, b) = (hull[i], hull[(i + 1) % m]);
            fresh.push(mesh.push([b, a, p]));
            i = (i + 1) % m;
        }

        // Hull vertices strictly inside the visible chain drop out
        let last = i;
        let mut next_hull = Vec::with_capacity(m + 1);
        let mut j = last;
        loop {
            next_hull.push(hull[j]);
            if j == first {
                break;
            }
            j = (j + 1) % m;
        }
        next_hull.push(p);
        hull = next_hull;

        for t in fresh {
            mesh.legalize(points, t, p);
        }
    }

    mesh.triangles
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::polygon;

    fn total_area(points: &[Point], triangles: &[[usize; 3]]) -> f64 {
        triangles
            .iter()
            .map(|&[a, b, c]| orient(points[a], points[b], points[c]) / 2.0)
            .sum()
    }

    fn circumcircle(a: Point, b: Point, c: Point) -> (Point, f64) {
        let d = 2.0 * (a.x * (b.y - c.y) + b.x * (c.y - a.y) + c.x * (a.y - b.y));
        let (a2, b2, c2) = (a.dot(a), b.dot(b), c.dot(c));
        let center = Point::new(
            (a2 * (b.y - c.y) + b2 * (c.y - a.y) + c2 * (a.y - b.y)) / d,
            (a2 * (c.x - b.x) + b2 * (a.x - c.x) + c2 * (b.x - a.x)) / d,
        );
        (center, center.sub(a).dot(center.sub(a)))
    }

    fn assert_all_ccw(points: &[Point], triangles: &[[usize; 3]]) {
        for &[a, b, c] in triangles {
            assert!(orient(points[a], points[b], points[c]) > 0.0);
        }
    }

    #[test]
    fn test_square_with_center() {
        let points = vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
            Point::new(5.0, 5.0),
        ];
        let triangles = delaunay(&points);
        assert_eq!(triangles.len(), 4);
        assert!((total_area(&points, &triangles) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_delaunay_empty_circumcircles() {
        let points: Vec<Point> = (0..30)
            .map(|i| {
                let f = i as f64;
                Point::new((f * 7.3) % 11.0, (f * 3.7) % 13.0 + f * 0.01)
            })
            .collect();
        let triangles = delaunay(&points);
        assert!(!triangles.is_empty());
        assert_all_ccw(&points, &triangles);
        for &[a, b, c] in &triangles {
            let (center, r2) = circumcircle(points[a], points[b], points[c]);
            for (i, p) in points.iter().enumerate() {
                if i == a || i == b || i == c {
                    continue;
                }
                assert!(p.sub(center).dot(p.sub(center)) >= r2 * (1.0 - 1e-9));
            }
        }
    }

    #[test]
    fn test_regular_polygon_tiles_its_hull() {
        let ring: Vec<Point> = (0..12)
            .map(|i| {
                let angle = i as f64 * std::f64::consts::TAU / 12.0;
                Point::new(10.0 * angle.cos(), 10.0 * angle.sin())
            })
            .collect();
        let triangles = delaunay(&ring);
        assert_eq!(triangles.len(), 10);
        assert_all_ccw(&ring, &triangles);
        let hull_area = polygon::signed_area(&ring);
        assert!((hull_area - 300.0).abs() < 1e-9);
        assert!((total_area(&ring, &triangles) - hull_area).abs() < 1e-9);
    }

    #[test]
    fn test_grid_tiles_its_hull() {
        let grid: Vec<Point> = (0..5)
            .flat_map(|i| (0..5).map(move |j| Point::new(i as f64, j as f64)))
            .collect();
        let triangles = delaunay(&grid);
        // 2n - b - 2 with 16 boundary points
        assert_eq!(triangles.len(), 32);
        assert_all_ccw(&grid, &triangles);
        assert!((total_area(&grid, &triangles) - 16.0).abs() < 1e-9);
    }

    #[test]
    fn test_collinear_has_no_triangles() {
        let points: Vec<Point> = (0..5).map(|i| Point::new(i as f64, 2.0 * i as f64)).collect();
        assert!(delaunay(&points).is_empty());
    }

    #[test]
    fn test_collinear_prefix_is_fanned() {
        let points = vec![
            Point::new(0.0, 0.0),
            Point::new(0.0, 1.0),
            Point::new(0.0, 2.0),
            Point::new(1.0, 1.0),
        ];
        let triangles = delaunay(&points);
        assert_eq!(triangles.len(), 2);
        assert_all_ccw(&points, &triangles);
        assert!((total_area(&points, &triangles) - 1.0).abs() < 1e-9);
    }
}
