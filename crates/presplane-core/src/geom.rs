use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in plane coordinates (millimetres).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox2 {
    pub min: Point2<f64>,
    pub max: Point2<f64>,
}

impl BBox2 {
    pub fn new(min: Point2<f64>, max: Point2<f64>) -> Self {
        Self { min, max }
    }

    pub fn empty() -> Self {
        Self {
            min: Point2::new(f64::INFINITY, f64::INFINITY),
            max: Point2::new(f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    /// Rectangle centred on the origin with the given half extents.
    pub fn centered(half_w: f64, half_h: f64) -> Self {
        Self::new(Point2::new(-half_w, -half_h), Point2::new(half_w, half_h))
    }

    pub fn from_points<I>(points: I) -> Self
    where
        I: IntoIterator<Item = Point2<f64>>,
    {
        let mut bbox = Self::empty();
        for p in points {
            bbox.include_point(p);
        }
        bbox
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y
    }

    pub fn include_point(&mut self, point: Point2<f64>) {
        self.min.x = self.min.x.min(point.x);
        self.min.y = self.min.y.min(point.y);
        self.max.x = self.max.x.max(point.x);
        self.max.y = self.max.y.max(point.y);
    }

    pub fn center(&self) -> Point2<f64> {
        Point2::new((self.min.x + self.max.x) * 0.5, (self.min.y + self.max.y) * 0.5)
    }

    pub fn width(&self) -> f64 {
        (self.max.x - self.min.x).max(0.0)
    }

    pub fn height(&self) -> f64 {
        (self.max.y - self.min.y).max(0.0)
    }

    pub fn contains(&self, point: Point2<f64>, tol: f64) -> bool {
        point.x >= self.min.x - tol
            && point.x <= self.max.x + tol
            && point.y >= self.min.y - tol
            && point.y <= self.max.y + tol
    }

    /// Liang-Barsky clip of `a -> b` against the box widened by `tol`.
    ///
    /// Returns the parameter range `[t0, t1]` of the part inside, or `None`
    /// when the segment misses the box.
    pub fn clip_segment(&self, a: Point2<f64>, b: Point2<f64>, tol: f64) -> Option<(f64, f64)> {
        if self.is_empty() {
            return None;
        }
        let d = b - a;
        let checks = [
            (-d.x, a.x - (self.min.x - tol)),
            (d.x, (self.max.x + tol) - a.x),
            (-d.y, a.y - (self.min.y - tol)),
            (d.y, (self.max.y + tol) - a.y),
        ];

        let (mut t0, mut t1) = (0.0f64, 1.0f64);
        for (p, q) in checks {
            if p == 0.0 {
                if q < 0.0 {
                    return None;
                }
                continue;
            }
            let t = q / p;
            if p < 0.0 {
                t0 = t0.max(t);
            } else {
                t1 = t1.min(t);
            }
            if t0 > t1 {
                return None;
            }
        }
        Some((t0, t1))
    }

    /// Closed-interval overlap test; touching edges count, `tol` widens both boxes.
    pub fn intersects(&self, other: &Self, tol: f64) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        self.min.x <= other.max.x + tol
            && other.min.x <= self.max.x + tol
            && self.min.y <= other.max.y + tol
            && other.min.y <= self.max.y + tol
    }
}
