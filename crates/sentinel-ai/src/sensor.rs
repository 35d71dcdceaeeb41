//! Stateless geometric sensor queries.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Distance reported when there is nothing to measure against.
pub const NO_TARGET_DISTANCE: f32 = f32::INFINITY;

/// Line-of-sight test between two points.
pub trait LineOfSight: std::fmt::Debug {
    /// Whether the segment `from -> to` is unobstructed.
    fn is_clear(&self, from: Vec3, to: Vec3) -> bool;
}

/// Nothing ever blocks sight.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenField;

impl LineOfSight for OpenField {
    fn is_clear(&self, _from: Vec3, _to: Vec3) -> bool {
        true
    }
}

/// A spherical obstacle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Occluder {
    /// Sphere center.
    pub center: Vec3,
    /// Sphere radius.
    pub radius: f32,
}

/// Sight blocked by a set of spheres.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Occluders {
    spheres: Vec<Occluder>,
}

impl Occluders {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a blocker.
    #[must_use]
    pub fn with(mut self, center: Vec3, radius: f32) -> Self {
        self.spheres.push(Occluder {
            center,
            radius: radius.max(0.0),
        });
        self
    }

    /// Number of blockers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.spheres.len()
    }

    /// Whether there are no blockers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.spheres.is_empty()
    }
}

impl LineOfSight for Occluders {
    fn is_clear(&self, from: Vec3, to: Vec3) -> bool {
        self.spheres
            .iter()
            .all(|s| segment_point_distance(from, to, s.center) > s.radius)
    }
}

/// Distance between two positions.
#[must_use]
pub fn distance(a: Vec3, b: Vec3) -> f32 {
    a.distance(b)
}

/// Distance to an optional target position, infinite when absent.
#[must_use]
pub fn distance_to(from: Vec3, target: Option<Vec3>) -> f32 {
    target.map_or(NO_TARGET_DISTANCE, |t| distance(from, t))
}

/// Distance plus line-of-sight test.
///
/// The ray is only cast when the target is inside `radius`.
#[must_use]
pub fn can_sense(from: Vec3, target: Option<Vec3>, radius: f32, sight: &dyn LineOfSight) -> bool {
    match target {
        Some(to) if distance(from, to) <= radius => sight.is_clear(from, to),
        _ => false,
    }
}

/// Shortest distance from `point` to the segment `a -> b`.
fn segment_point_distance(a: Vec3, b: Vec3, point: Vec3) -> f32 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq <= f32::EPSILON {
        return point.distance(a);
    }
    let t = ((point - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    point.distance(a + ab * t)
}
