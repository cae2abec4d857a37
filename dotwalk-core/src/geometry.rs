//! Points, viewports and the safe region the walker is confined to.
//!
//! All coordinates are relative to the centre of the drawable area with `+y`
//! pointing up.

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// Position of the dot relative to the centre of the drawable area.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ORIGIN: Self = Self { x: 0.0, y: 0.0 };

    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Point reached by travelling `distance` along `heading` (radians).
    #[must_use]
    pub fn advanced(self, heading: f64, distance: f64) -> Self {
        Self {
            x: heading.cos().mul_add(distance, self.x),
            y: heading.sin().mul_add(distance, self.y),
        }
    }

    /// Heading (radians) that points from `self` toward the origin.
    #[must_use]
    pub fn heading_to_origin(self) -> f64 {
        (-self.y).atan2(-self.x)
    }
}

/// Size of the host's drawable area in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    #[must_use]
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Half extents of the rectangle the walker is expected to stay inside at rest.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SafeRegion {
    pub half_width: f64,
    pub half_height: f64,
}

impl SafeRegion {
    /// Construct a region, rejecting extents that are not finite and positive.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidRegion` when either half extent is `<= 0` or not finite.
    pub fn new(half_width: f64, half_height: f64) -> Result<Self, ConfigError> {
        let valid = |v: f64| v.is_finite() && v > 0.0;
        if !valid(half_width) || !valid(half_height) {
            return Err(ConfigError::InvalidRegion {
                half_width,
                half_height,
            });
        }
        Ok(Self {
            half_width,
            half_height,
        })
    }

    /// Construct a region without validation, flooring bad extents at zero.
    ///
    /// Used for resizes, where a host may briefly report a window smaller than
    /// the margin.
    #[must_use]
    pub fn floored(half_width: f64, half_height: f64) -> Self {
        let floor = |v: f64| if v.is_finite() { v.max(0.0) } else { 0.0 };
        Self {
            half_width: floor(half_width),
            half_height: floor(half_height),
        }
    }

    /// Region inset from a viewport's edges by `margin`.
    #[must_use]
    pub fn from_viewport(viewport: Viewport, margin: f64) -> Self {
        Self::floored(viewport.width / 2.0 - margin, viewport.height / 2.0 - margin)
    }

    /// Whether `point` lies inside the region (edges inclusive).
    #[must_use]
    pub fn contains(&self, point: Point) -> bool {
        point.x.abs() <= self.half_width && point.y.abs() <= self.half_height
    }

    /// Clamp each axis of `point` independently into the region.
    #[must_use]
    pub fn clamp(&self, point: Point) -> Point {
        Point {
            x: point.x.clamp(-self.half_width, self.half_width),
            y: point.y.clamp(-self.half_height, self.half_height),
        }
    }

    /// Largest per-axis distance by which `point` lies outside the region.
    #[must_use]
    pub fn overshoot(&self, point: Point) -> f64 {
        let dx = (point.x.abs() - self.half_width).max(0.0);
        let dy = (point.y.abs() - self.half_height).max(0.0);
        dx.max(dy)
    }

    /// Diagonal of the full drawable area this region was inset from.
    #[must_use]
    pub fn drawable_diagonal(&self, margin: f64) -> f64 {
        2.0 * (self.half_width + margin).hypot(self.half_height + margin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn region_rejects_non_positive_extents() {
        assert!(SafeRegion::new(0.0, 10.0).is_err());
        assert!(SafeRegion::new(10.0, -1.0).is_err());
        assert!(SafeRegion::new(f64::NAN, 10.0).is_err());
        assert!(SafeRegion::new(400.0, 300.0).is_ok());
    }

    #[test]
    fn viewport_region_subtracts_margin_and_floors() {
        let region = SafeRegion::from_viewport(Viewport::new(830.0, 630.0), 15.0);
        assert!((region.half_width - 400.0).abs() < f64::EPSILON);
        assert!((region.half_height - 300.0).abs() < f64::EPSILON);

        let tiny = SafeRegion::from_viewport(Viewport::new(10.0, 10.0), 15.0);
        assert!(tiny.half_width.abs() < f64::EPSILON);
        assert!(tiny.half_height.abs() < f64::EPSILON);
    }

    #[test]
    fn clamp_is_per_axis() {
        let region = SafeRegion::new(100.0, 50.0).unwrap();
        let clamped = region.clamp(Point::new(150.0, -20.0));
        assert_eq!(clamped, Point::new(100.0, -20.0));
        assert!((region.overshoot(Point::new(103.0, 0.0)) - 3.0).abs() < 1e-12);
        assert!(region.overshoot(Point::new(10.0, 10.0)).abs() < f64::EPSILON);
    }

    #[test]
    fn heading_to_origin_points_back() {
        let heading = Point::new(401.0, 0.0).heading_to_origin();
        assert!((heading.abs() - PI).abs() < 1e-12);
        let moved = Point::new(3.0, 4.0).advanced(Point::new(3.0, 4.0).heading_to_origin(), 5.0);
        assert!(moved.x.hypot(moved.y) < 1e-9);
    }
}
