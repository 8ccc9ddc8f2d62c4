// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Geometric primitives used by the topology kernel.
//!
//! Pure functions over points, lines and planes: plane fitting, collinearity
//! and coplanarity predicates, and closest-approach distances between lines,
//! segments and points. Every predicate takes a [`Tolerance`] so that the
//! kernel makes consistent decisions about "same point" and "same plane".

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Distance and angular tolerances for geometric predicates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tolerance {
    /// Two points closer than this are the same point.
    pub dist: f64,
    /// `dist * dist`.
    pub dist_sq: f64,
    /// Vectors whose normalized dot product is below this are perpendicular.
    pub perp: f64,
    /// Vectors whose normalized |dot| is above this are parallel (`1 - perp`).
    pub para: f64,
}

impl Tolerance {
    /// Creates a tolerance from a distance and a perpendicularity bound.
    pub fn new(dist: f64, perp: f64) -> Self {
        Self {
            dist,
            dist_sq: dist * dist,
            perp,
            para: 1.0 - perp,
        }
    }

    /// Returns `true` if the cosine `dot` between two unit vectors means parallel.
    pub fn vects_are_parallel(&self, dot: f64) -> bool {
        dot.abs() >= self.para
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Self::new(0.005, 1e-6)
    }
}

/// A plane `normal . p = d` with a unit normal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    pub normal: Vector3<f64>,
    pub d: f64,
}

impl Plane {
    /// Creates a plane through `point` with the given (unnormalized) normal.
    pub fn from_point_normal(point: &Point3<f64>, normal: &Vector3<f64>) -> Option<Self> {
        let len = normal.norm();
        if len < 1e-15 {
            return None;
        }
        let n = normal / len;
        Some(Self {
            normal: n,
            d: n.dot(&point.coords),
        })
    }

    /// Signed distance from `p` to the plane.
    pub fn distance(&self, p: &Point3<f64>) -> f64 {
        self.normal.dot(&p.coords) - self.d
    }

    /// The same plane with the opposite orientation.
    pub fn reversed(&self) -> Self {
        Self {
            normal: -self.normal,
            d: -self.d,
        }
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Point3<f64>,
    pub max: Point3<f64>,
}

impl Aabb {
    /// A box containing exactly one point.
    pub fn from_point(p: &Point3<f64>) -> Self {
        Self { min: *p, max: *p }
    }

    /// Smallest box containing all `points`, or `None` if there are none.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point3<f64>>) -> Option<Self> {
        let mut iter = points.into_iter();
        let mut bb = Self::from_point(iter.next()?);
        for p in iter {
            bb.extend(p);
        }
        Some(bb)
    }

    /// Grows the box to contain `p`.
    pub fn extend(&mut self, p: &Point3<f64>) {
        self.min = self.min.inf(p);
        self.max = self.max.sup(p);
    }

    /// Smallest box containing both boxes.
    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.inf(&other.min),
            max: self.max.sup(&other.max),
        }
    }

    /// Returns `true` if `p` is inside the box grown by `tol`.
    pub fn contains(&self, p: &Point3<f64>, tol: f64) -> bool {
        (0..3).all(|i| p[i] >= self.min[i] - tol && p[i] <= self.max[i] + tol)
    }
}

/// How two planes relate to each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coplanarity {
    /// The planes intersect in a line.
    NotParallel,
    /// Parallel, but separated by more than the distance tolerance.
    ParallelDistinct,
    /// Same plane, normals pointing the same way.
    Coplanar,
    /// Same plane, normals pointing opposite ways.
    CoplanarOpposite,
}

/// Fits a plane through three points, with the normal following `a -> b -> c`.
///
/// Returns `None` when two points coincide or the three are collinear.
pub fn mk_plane_3pts(
    a: &Point3<f64>,
    b: &Point3<f64>,
    c: &Point3<f64>,
    tol: &Tolerance,
) -> Option<Plane> {
    let ab = b - a;
    let ac = c - a;
    let bc = c - b;
    if ab.norm_squared() < tol.dist_sq
        || ac.norm_squared() < tol.dist_sq
        || bc.norm_squared() < tol.dist_sq
    {
        return None;
    }
    if three_pts_collinear(a, b, c, tol) {
        return None;
    }
    let n = ab.cross(&ac);
    if n.norm() < 1e-15 {
        return None;
    }
    Plane::from_point_normal(a, &n)
}

/// Returns `true` if three points lie on one line within `tol.dist`.
///
/// The line is taken through the two points that are farthest apart, and the
/// remaining point is tested against it.
pub fn three_pts_collinear(
    a: &Point3<f64>,
    b: &Point3<f64>,
    c: &Point3<f64>,
    tol: &Tolerance,
) -> bool {
    let ab = (b - a).norm_squared();
    let bc = (c - b).norm_squared();
    let ca = (a - c).norm_squared();

    let (start, end, p) = if ab >= bc && ab >= ca {
        (a, b, c)
    } else if bc >= ca {
        (b, c, a)
    } else {
        (c, a, b)
    };

    let dir = end - start;
    let len_sq = dir.norm_squared();
    if len_sq < tol.dist_sq {
        // All three points are within tolerance of each other.
        return true;
    }
    let to_p = p - start;
    let t = to_p.dot(&dir) / len_sq;
    let closest = start + dir * t;
    (p - closest).norm_squared() < tol.dist_sq
}

/// Classifies two planes against each other.
pub fn coplanar(a: &Plane, b: &Plane, tol: &Tolerance) -> Coplanarity {
    let dot = a.normal.dot(&b.normal);
    if !tol.vects_are_parallel(dot) {
        return Coplanarity::NotParallel;
    }
    if dot > 0.0 {
        if (a.d - b.d).abs() < tol.dist {
            Coplanarity::Coplanar
        } else {
            Coplanarity::ParallelDistinct
        }
    } else if (a.d + b.d).abs() < tol.dist {
        Coplanarity::CoplanarOpposite
    } else {
        Coplanarity::ParallelDistinct
    }
}

/// Closest approach of two infinite lines.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LineLine {
    /// Parallel and separated.
    ParallelDistinct,
    /// Parallel and on top of each other.
    Collinear,
    /// The lines meet at `p1 + t1*d1 == p2 + t2*d2`.
    Intersect { t1: f64, t2: f64 },
    /// Skew lines, closest at parameters `t1` and `t2`.
    Skew { t1: f64, t2: f64 },
}

fn check_unit(d: &Vector3<f64>, tol: &Tolerance) -> Result<()> {
    let mag_sq = d.norm_squared();
    if (mag_sq - 1.0).abs() > tol.dist_sq {
        tracing::error!(?d, "non-unit direction vector");
        return Err(Error::NonUnitDirection(mag_sq.sqrt()));
    }
    Ok(())
}

/// Distance from `p` to the line through `a` with direction `dir` (any length).
pub fn dist_line_point(a: &Point3<f64>, dir: &Vector3<f64>, p: &Point3<f64>) -> f64 {
    let len = dir.norm();
    if len < 1e-15 {
        return (p - a).norm();
    }
    let u = dir / len;
    let ap = p - a;
    (ap - u * ap.dot(&u)).norm()
}

/// Closest approach between lines `p1 + t*d1` and `p2 + t*d2`.
///
/// Both directions must be unit length; anything else is a caller bug and is
/// reported as [`Error::NonUnitDirection`].
pub fn dist_line3_line3(
    p1: &Point3<f64>,
    d1: &Vector3<f64>,
    p2: &Point3<f64>,
    d2: &Vector3<f64>,
    tol: &Tolerance,
) -> Result<LineLine> {
    check_unit(d1, tol)?;
    check_unit(d2, tol)?;

    let d1_d2 = d1.dot(d2);
    if tol.vects_are_parallel(d1_d2) {
        return Ok(if dist_line_point(p1, d1, p2) > tol.dist {
            LineLine::ParallelDistinct
        } else {
            LineLine::Collinear
        });
    }

    let p2_to_p1 = p1 - p2;
    let t1 = (d1_d2 * p2_to_p1.dot(d2) - p2_to_p1.dot(d1)) / (1.0 - d1_d2 * d1_d2);
    let t2 = t1 * d1_d2 + p2_to_p1.dot(d2);

    let a1 = p1 + d1 * t1;
    let a2 = p2 + d2 * t2;
    if (a2 - a1).norm() < tol.dist {
        Ok(LineLine::Intersect { t1, t2 })
    } else {
        Ok(LineLine::Skew { t1, t2 })
    }
}

/// Kind of closest approach between a line and a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineSegmentKind {
    ParallelCollinear,
    ParallelDistinct,
    IntersectInside,
    IntersectOutside,
    ApproachInside,
    ApproachOutside,
}

/// Closest approach between the line `p + t*d` and the segment `a..b`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineSegment {
    pub kind: LineSegmentKind,
    /// Distance along the line from `p` to the closest approach.
    pub dist: f64,
    /// Fraction along `a..b` (0 at `a`, 1 at `b`), clamped when inside.
    pub fraction: f64,
}

/// Closest approach between the line `p + t*d` (unit `d`) and segment `a..b`.
pub fn dist_line3_lseg3(
    p: &Point3<f64>,
    d: &Vector3<f64>,
    a: &Point3<f64>,
    b: &Point3<f64>,
    tol: &Tolerance,
) -> Result<LineSegment> {
    let a_to_b = b - a;
    let len_ab = a_to_b.norm();
    if len_ab < tol.dist {
        return Err(Error::Degenerate("zero-length segment"));
    }
    let a_dir = a_to_b / len_ab;

    let (t_line, t_seg, intersects) = match dist_line3_line3(p, d, a, &a_dir, tol)? {
        parallel @ (LineLine::ParallelDistinct | LineLine::Collinear) => {
            let dist_to_a = (a - p).dot(d);
            let dist_to_b = (b - p).dot(d);
            let (dist, fraction) = if dist_to_a <= dist_to_b {
                (dist_to_a, 0.0)
            } else {
                (dist_to_b, 1.0)
            };
            let kind = if parallel == LineLine::Collinear {
                LineSegmentKind::ParallelCollinear
            } else {
                LineSegmentKind::ParallelDistinct
            };
            return Ok(LineSegment {
                kind,
                dist,
                fraction,
            });
        }
        LineLine::Intersect { t1, t2 } => (t1, t2, true),
        LineLine::Skew { t1, t2 } => (t1, t2, false),
    };

    let inside = t_seg >= -tol.dist && t_seg <= len_ab + tol.dist;
    let fraction = if inside {
        (t_seg / len_ab).clamp(0.0, 1.0)
    } else {
        t_seg / len_ab
    };
    let kind = match (intersects, inside) {
        (true, true) => LineSegmentKind::IntersectInside,
        (true, false) => LineSegmentKind::IntersectOutside,
        (false, true) => LineSegmentKind::ApproachInside,
        (false, false) => LineSegmentKind::ApproachOutside,
    };
    Ok(LineSegment {
        kind,
        dist: t_line,
        fraction,
    })
}

/// Where a point projects onto a line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointLine {
    /// The point is within tolerance of the line's start point.
    AtStart,
    /// The point is on the line; `pca` is its projection.
    OnLine { pca: Point3<f64> },
    /// The point is `dist` away from its projection `pca`.
    Off { pca: Point3<f64>, dist: f64 },
}

/// Distance from `p` to the line through `a` along `dir` (any length).
pub fn dist_pt3_line3(
    a: &Point3<f64>,
    dir: &Vector3<f64>,
    p: &Point3<f64>,
    tol: &Tolerance,
) -> PointLine {
    let a_to_p = p - a;
    let ap_sq = a_to_p.norm_squared();
    if ap_sq < tol.dist_sq {
        return PointLine::AtStart;
    }
    let len = dir.norm();
    if len < 1e-15 {
        return PointLine::Off {
            pca: *a,
            dist: ap_sq.sqrt(),
        };
    }
    let unit = dir / len;
    let t = a_to_p.dot(&unit);
    let pca = a + unit * t;
    let dsq = ap_sq - t * t;
    if dsq < tol.dist_sq {
        PointLine::OnLine { pca }
    } else {
        PointLine::Off {
            pca,
            dist: dsq.sqrt(),
        }
    }
}

/// Newell's method normal (unnormalized; length is twice the area).
pub fn newell_normal(points: &[Point3<f64>]) -> Vector3<f64> {
    let mut normal = Vector3::zeros();
    let n = points.len();
    for i in 0..n {
        let curr = &points[i];
        let next = &points[(i + 1) % n];
        normal.x += (curr.y - next.y) * (curr.z + next.z);
        normal.y += (curr.z - next.z) * (curr.x + next.x);
        normal.z += (curr.x - next.x) * (curr.y + next.y);
    }
    normal
}

/// Plane and area of a closed polygon.
///
/// The plane offset is the average of the vertices' projections, so slightly
/// warped polygons get a best-fit plane. Returns `None` for fewer than three
/// points or zero area.
pub fn polygon_plane_area(points: &[Point3<f64>]) -> Option<(Plane, f64)> {
    if points.len() < 3 {
        return None;
    }
    let n = newell_normal(points);
    let mag = n.norm();
    if mag < 1e-15 {
        return None;
    }
    let normal = n / mag;
    let d = points.iter().map(|p| normal.dot(&p.coords)).sum::<f64>() / points.len() as f64;
    Some((Plane { normal, d }, 0.5 * mag))
}

/// Returns `true` if `p` lies inside the planar polygon `poly`.
///
/// Both are projected onto the coordinate plane most perpendicular to
/// `normal` and tested with the even-odd crossing rule.
pub fn point_in_polygon(p: &Point3<f64>, poly: &[Point3<f64>], normal: &Vector3<f64>) -> bool {
    let (u, v) = projection_axes(normal);
    let (px, py) = (p[u], p[v]);
    let mut inside = false;
    let n = poly.len();
    let mut j = n.wrapping_sub(1);
    for i in 0..n {
        let (xi, yi) = (poly[i][u], poly[i][v]);
        let (xj, yj) = (poly[j][u], poly[j][v]);
        if (yi > py) != (yj > py) && px < (xj - xi) * (py - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Indices of the two coordinate axes to keep when projecting along `normal`.
pub fn projection_axes(normal: &Vector3<f64>) -> (usize, usize) {
    let abs_n = Vector3::new(normal.x.abs(), normal.y.abs(), normal.z.abs());
    if abs_n.z >= abs_n.x && abs_n.z >= abs_n.y {
        (0, 1) // project onto XY
    } else if abs_n.y >= abs_n.x {
        (2, 0) // project onto ZX
    } else {
        (1, 2) // project onto YZ
    }
}

/// Returns `true` if `a` and `b` are the same point within tolerance.
pub fn pt3_pt3_equal(a: &Point3<f64>, b: &Point3<f64>, tol: &Tolerance) -> bool {
    (a - b).norm_squared() < tol.dist_sq
}

/// The single point shared by three planes, or `None` when any two are parallel.
pub fn mkpoint_3planes(a: &Plane, b: &Plane, c: &Plane) -> Option<Point3<f64>> {
    let bc = b.normal.cross(&c.normal);
    let det = a.normal.dot(&bc);
    if det.abs() < 1e-12 {
        return None;
    }
    let ca = c.normal.cross(&a.normal);
    let ab = a.normal.cross(&b.normal);
    Some(Point3::from((bc * a.d + ca * b.d + ab * c.d) / det))
}

/// Line where two planes meet, as the point on it closest to `near` plus a
/// unit direction along `a.normal x b.normal`.
pub fn isect_2planes(a: &Plane, b: &Plane, near: &Point3<f64>) -> Option<(Point3<f64>, Vector3<f64>)> {
    let dir = a.normal.cross(&b.normal).try_normalize(1e-12)?;
    let through = Plane {
        normal: dir,
        d: dir.dot(&near.coords),
    };
    mkpoint_3planes(a, b, &through).map(|p| (p, dir))
}

/// Intersection of segments `p..p+pdir` and `q..q+qdir`.
///
/// Returns the fractions along each segment, clamped to `0..=1`, when the
/// supporting lines meet within tolerance of both segments. Collinear
/// overlaps are not reported.
pub fn isect_lseg3_lseg3(
    p: &Point3<f64>,
    pdir: &Vector3<f64>,
    q: &Point3<f64>,
    qdir: &Vector3<f64>,
    tol: &Tolerance,
) -> Option<(f64, f64)> {
    let plen = pdir.norm();
    let qlen = qdir.norm();
    if plen < tol.dist || qlen < tol.dist {
        return None;
    }
    match dist_line3_line3(p, &(pdir / plen), q, &(qdir / qlen), tol).ok()? {
        LineLine::Intersect { t1, t2 } => {
            let inside = |t: f64, len: f64| t >= -tol.dist && t <= len + tol.dist;
            if inside(t1, plen) && inside(t2, qlen) {
                Some(((t1 / plen).clamp(0.0, 1.0), (t2 / qlen).clamp(0.0, 1.0)))
            } else {
                None
            }
        }
        _ => None,
    }
}
