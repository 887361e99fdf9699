use crate::error::{FlattenError, Result};
use nalgebra::{Point3, Rotation3, Unit, Vector3};
use serde::{Deserialize, Serialize};

/// Paper sizes a presentation plane can represent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PageSize {
    #[default]
    #[serde(alias = "SizeA4Paper")]
    A4,
    #[serde(alias = "SizeA3Paper")]
    A3,
}

impl PageSize {
    pub const ALL: [PageSize; 2] = [PageSize::A4, PageSize::A3];

    /// Landscape page size in millimetres, `(width, height)`.
    pub const fn dimensions(self) -> (f64, f64) {
        match self {
            PageSize::A4 => (297.0, 210.0),
            PageSize::A3 => (420.0, 297.0),
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            PageSize::A4 => "A4",
            PageSize::A3 => "A3",
        }
    }
}

/// Axis/angle rotation. The angle is in radians.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rotation {
    pub axis: Vector3<f64>,
    pub angle: f64,
}

impl Default for Rotation {
    fn default() -> Self {
        Self::identity()
    }
}

impl Rotation {
    /// Identity rotation; its axis reports +Z like the host's identity rotation.
    pub fn identity() -> Self {
        Self {
            axis: Vector3::z(),
            angle: 0.0,
        }
    }

    pub fn new(axis: Vector3<f64>, angle: f64) -> Self {
        Self { axis, angle }
    }

    pub fn from_degrees(axis: Vector3<f64>, degrees: f64) -> Self {
        Self::new(axis, degrees.to_radians())
    }

    /// Normalized axis; a zero axis falls back to +Z.
    pub fn axis_dir(&self) -> Unit<Vector3<f64>> {
        Unit::try_new(self.axis, 1e-12).unwrap_or_else(Vector3::z_axis)
    }

    pub fn angle_degrees(&self) -> f64 {
        self.angle.to_degrees()
    }

    pub fn is_identity(&self) -> bool {
        self.angle.abs() < 1e-12
    }

    pub fn to_rotation3(&self) -> Rotation3<f64> {
        Rotation3::from_axis_angle(&self.axis_dir(), self.angle)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Placement {
    pub base: Vector3<f64>,
    pub rotation: Rotation,
}

impl Placement {
    pub fn identity() -> Self {
        Self::default()
    }

    pub fn new(base: Vector3<f64>, rotation: Rotation) -> Self {
        Self { base, rotation }
    }

    pub fn from_base(base: Vector3<f64>) -> Self {
        Self::new(base, Rotation::identity())
    }
}

/// The projection target: page, scale, world placement and arc sampling spacing.
///
/// `scale` and `discretize_spacing` are not checked on construction; the
/// operations that divide by them report [`FlattenError`] instead.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlaneFrame {
    pub page_size: PageSize,
    pub scale: f64,
    pub placement: Placement,
    pub discretize_spacing: f64,
}

impl Default for PlaneFrame {
    fn default() -> Self {
        Self {
            page_size: PageSize::A4,
            scale: 1.0,
            placement: Placement::identity(),
            discretize_spacing: 2.0,
        }
    }
}

impl PlaneFrame {
    pub fn dimensions(&self) -> (f64, f64) {
        self.page_size.dimensions()
    }

    pub fn face_half_extents(&self) -> Result<(f64, f64)> {
        if !(self.scale > 0.0 && self.scale.is_finite()) {
            return Err(FlattenError::InvalidScale(self.scale));
        }
        let (w, h) = self.dimensions();
        Ok((w / self.scale / 2.0, h / self.scale / 2.0))
    }

    /// Maps a point of the origin-centred face into the world.
    ///
    /// The face is first translated by the placement base and then rotated
    /// about that base; the order matters for non-origin placements.
    pub fn to_world(&self, local: &Point3<f64>) -> Point3<f64> {
        let pivot = Point3::from(self.placement.base);
        let moved = *local + self.placement.base;
        pivot + self.placement.rotation.to_rotation3() * (moved - pivot)
    }

    pub fn to_local(&self, world: &Point3<f64>) -> Point3<f64> {
        let pivot = Point3::from(self.placement.base);
        let unrotated = self.placement.rotation.to_rotation3().inverse() * (*world - pivot);
        Point3::from(unrotated)
    }

    pub fn local_origin(&self) -> Point3<f64> {
        self.to_world(&Point3::origin())
    }

    pub fn face_normal(&self) -> Unit<Vector3<f64>> {
        Unit::new_normalize(self.placement.rotation.to_rotation3() * Vector3::z())
    }

    /// Edges are pushed onto the face along the placement's rotation axis.
    pub fn projection_direction(&self) -> Unit<Vector3<f64>> {
        self.placement.rotation.axis_dir()
    }

    /// Face corners in the plane-local frame, in outline drawing order.
    pub fn outline_points(&self) -> Result<[Point3<f64>; 4]> {
        let (hw, hh) = self.face_half_extents()?;
        Ok([
            Point3::new(-hw, hh, 0.0),
            Point3::new(-hw, -hh, 0.0),
            Point3::new(hw, -hh, 0.0),
            Point3::new(hw, hh, 0.0),
        ])
    }

    pub fn face_corners(&self) -> Result<[Point3<f64>; 4]> {
        Ok(self.outline_points()?.map(|p| self.to_world(&p)))
    }
}
