//! Math utilities
//!
//! Bounding boxes and the fit-to-size transform used to normalize decoded assets.

pub use glam::{Mat4, Vec3};

/// Bounds of an asset, aligned to the scene axes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Inverted bounds that any point or merge replaces
    pub const EMPTY: Self = Self {
        min: Vec3::INFINITY,
        max: Vec3::NEG_INFINITY,
    };

    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Box of `2 * half` centred on `center`
    pub fn from_center_half_extents(center: Vec3, half: Vec3) -> Self {
        Self::new(center - half, center + half)
    }

    /// Smallest box containing every point
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Self {
        points.into_iter().fold(Self::EMPTY, |mut bounds, point| {
            bounds.expand_to_include(point);
            bounds
        })
    }

    pub fn center(&self) -> Vec3 {
        self.min.lerp(self.max, 0.5)
    }

    /// Extent along each axis
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Largest of the three extents
    pub fn max_dimension(&self) -> f32 {
        self.size().max_element()
    }

    /// True until at least one point has been included
    pub fn is_empty(&self) -> bool {
        self.min.cmpgt(self.max).any()
    }

    pub fn expand_to_include(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    /// Union of two boxes
    pub fn merge(&self, other: &Aabb) -> Aabb {
        Self::new(self.min.min(other.min), self.max.max(other.max))
    }

    /// Bounds of this box after `matrix`, taken over its eight corners
    pub fn transform(&self, matrix: Mat4) -> Aabb {
        if self.is_empty() {
            return *self;
        }

        let (lo, hi) = (self.min, self.max);
        Self::from_points((0..8u8).map(|corner| {
            let pick = |bit: u8, axis_lo: f32, axis_hi: f32| {
                if corner & bit == 0 { axis_lo } else { axis_hi }
            };
            matrix.transform_point3(Vec3::new(
                pick(1, lo.x, hi.x),
                pick(2, lo.y, hi.y),
                pick(4, lo.z, hi.z),
            ))
        }))
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// Uniform scale followed by translation, applied to a whole asset
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitTransform {
    pub translation: Vec3,
    pub scale: f32,
}

impl FitTransform {
    /// Identity transform
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        scale: 1.0,
    };

    /// Transform that centers `bounds` on the origin and scales its largest
    /// dimension to `target_size`, preserving aspect ratio.
    ///
    /// Empty or zero-sized bounds only get centered.
    pub fn fit(bounds: &Aabb, target_size: f32) -> Self {
        if bounds.is_empty() {
            return Self::IDENTITY;
        }

        let max_dim = bounds.max_dimension();
        let scale = if max_dim > f32::EPSILON && max_dim.is_finite() {
            target_size / max_dim
        } else {
            1.0
        };

        Self {
            translation: -bounds.center() * scale,
            scale,
        }
    }

    /// Apply to a point
    pub fn apply(&self, point: Vec3) -> Vec3 {
        point * self.scale + self.translation
    }

    /// As a matrix
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_translation(self.translation) * Mat4::from_scale(Vec3::splat(self.scale))
    }
}

impl Default for FitTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}
