//! Planar geometry kernel.
//!
//! Coordinates are metres in a local Cartesian frame, stored as `f64`.  The
//! optional `z` is carried along (and interpolated) but all distances are
//! planar: road geometry in this workspace is laid out in plan view.
//!
//! Everything here is a pure function of its inputs.

use std::fmt;

/// Segments shorter than this are treated as degenerate (zero length).
pub const DEGENERATE_LENGTH: f64 = 1e-9;

// ── Vertex ────────────────────────────────────────────────────────────────────

/// An immutable point in the network plane with an optional elevation.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Vertex {
    pub x: f64,
    pub y: f64,
    pub z: Option<f64>,
}

impl Vertex {
    #[inline]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y, z: None }
    }

    #[inline]
    pub const fn with_z(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z: Some(z) }
    }

    /// Planar Euclidean distance.
    #[inline]
    pub fn distance(self, other: Vertex) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    /// The point at fraction `t` of the segment `a → b`.
    ///
    /// `t` is not clamped: values outside `[0, 1]` extrapolate along the
    /// segment's supporting line.
    pub fn weighted(t: f64, a: Vertex, b: Vertex) -> Vertex {
        let z = match (a.z, b.z) {
            (Some(za), Some(zb)) => Some(za + t * (zb - za)),
            (za, zb) => za.or(zb),
        };
        Vertex {
            x: a.x + t * (b.x - a.x),
            y: a.y + t * (b.y - a.y),
            z,
        }
    }

    /// `self` displaced by `(dx, dy)`, elevation unchanged.
    #[inline]
    pub fn translated(self, dx: f64, dy: f64) -> Vertex {
        Vertex { x: self.x + dx, y: self.y + dy, z: self.z }
    }
}

impl fmt::Display for Vertex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.z {
            Some(z) => write!(f, "({:.3}, {:.3}, {:.3})", self.x, self.y, z),
            None => write!(f, "({:.3}, {:.3})", self.x, self.y),
        }
    }
}

// ── Circle ────────────────────────────────────────────────────────────────────

/// The physical footprint of a Node: a circle in plan view.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Circle {
    pub center: Vertex,
    pub radius: f64,
}

impl Circle {
    #[inline]
    pub const fn new(center: Vertex, radius: f64) -> Self {
        Self { center, radius }
    }

    /// Fraction along `inner → end` at which a road running along that
    /// segment enters this circle.
    ///
    /// The circle centre is projected onto the segment; the entry point lies
    /// one radius before the projection, measured from `inner`.  Returns
    /// `None` when the segment is degenerate or too short to reach the
    /// entry point.  The result may be negative when `inner` is already
    /// inside the circle.
    pub fn entry_fraction(&self, inner: Vertex, end: Vertex) -> Option<f64> {
        let length = inner.distance(end);
        if length < DEGENERATE_LENGTH {
            return None;
        }
        let projection = nearest_point_on_segment(self.center, inner, end);
        let offset = inner.distance(projection) - self.radius;
        (offset < length).then(|| offset / length)
    }
}

// ── Segment & polyline functions ─────────────────────────────────────────────

/// The point on segment `a → b` closest to `p`.
pub fn nearest_point_on_segment(p: Vertex, a: Vertex, b: Vertex) -> Vertex {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len_sq = dx * dx + dy * dy;
    if len_sq < DEGENERATE_LENGTH * DEGENERATE_LENGTH {
        return a;
    }
    let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / len_sq).clamp(0.0, 1.0);
    Vertex::weighted(t, a, b)
}

/// Arc length of a polyline.  Empty and single-point inputs have length 0.
pub fn polyline_length(points: &[Vertex]) -> f64 {
    points.windows(2).map(|w| w[0].distance(w[1])).sum()
}

/// The point at arc length `s` along `points`, clamped to the polyline.
pub fn point_at(points: &[Vertex], s: f64) -> Option<Vertex> {
    let first = *points.first()?;
    if s <= 0.0 {
        return Some(first);
    }
    let mut walked = 0.0;
    for w in points.windows(2) {
        let seg = w[0].distance(w[1]);
        if walked + seg >= s && seg > DEGENERATE_LENGTH {
            return Some(Vertex::weighted((s - walked) / seg, w[0], w[1]));
        }
        walked += seg;
    }
    points.last().copied()
}

/// The part of `points` between arc lengths `from` and `to` (clamped).
///
/// The result starts and ends with interpolated points and keeps every
/// original vertex strictly in between.
pub fn sub_polyline(points: &[Vertex], from: f64, to: f64) -> Vec<Vertex> {
    let total = polyline_length(points);
    let from = from.clamp(0.0, total);
    let to = to.clamp(from, total);

    let (Some(start), Some(end)) = (point_at(points, from), point_at(points, to)) else {
        return Vec::new();
    };

    let mut out = vec![start];
    let mut walked = 0.0;
    for w in points.windows(2) {
        walked += w[0].distance(w[1]);
        if walked > from && walked < to {
            out.push(w[1]);
        }
    }
    out.push(end);
    out
}

/// Offset a polyline sideways by `d` (positive = right of the direction of
/// travel).
///
/// Interior vertices are moved along the bisector of the adjacent segment
/// normals, scaled so that both offset segments stay parallel to their
/// originals.  The scale is capped to keep very sharp corners bounded.
/// Consecutive duplicate points are dropped first.
pub fn offset_polyline(points: &[Vertex], d: f64) -> Vec<Vertex> {
    const MAX_MITER: f64 = 4.0;

    let mut pts: Vec<Vertex> = Vec::with_capacity(points.len());
    for &p in points {
        if pts.last().is_none_or(|q: &Vertex| q.distance(p) > DEGENERATE_LENGTH) {
            pts.push(p);
        }
    }
    if pts.len() < 2 || d == 0.0 {
        return pts;
    }

    let normals: Vec<(f64, f64)> = pts
        .windows(2)
        .map(|w| {
            let len = w[0].distance(w[1]);
            ((w[1].y - w[0].y) / len, -(w[1].x - w[0].x) / len)
        })
        .collect();

    let mut out = Vec::with_capacity(pts.len());
    for (i, &p) in pts.iter().enumerate() {
        let (nx, ny) = if i == 0 {
            normals[0]
        } else if i == pts.len() - 1 {
            normals[i - 1]
        } else {
            let (ax, ay) = normals[i - 1];
            let (bx, by) = normals[i];
            let (sx, sy) = (ax + bx, ay + by);
            let len = sx.hypot(sy);
            if len < DEGENERATE_LENGTH {
                // Full reversal; fall back to the incoming normal.
                (ax, ay)
            } else {
                let (ux, uy) = (sx / len, sy / len);
                let cos_half = ux * ax + uy * ay;
                let scale = (1.0 / cos_half).min(MAX_MITER);
                (ux * scale, uy * scale)
            }
        };
        out.push(p.translated(nx * d, ny * d));
    }
    out
}
