//! Planar projection and small geographic helpers.
//!
//! Locations are `[lon, lat]` degrees. Geometry actions work in a
//! projected plane (spherical Mercator, screen convention with y growing
//! downward) and convert back afterwards, so angle and distance math
//! stays Euclidean.

use glam::DVec2;

const EQUATORIAL_RADIUS: f64 = 6_378_137.0;
const POLAR_RADIUS: f64 = 6_356_752.314_245_179;
const TAU: f64 = std::f64::consts::TAU;

/// Spherical Mercator projection at a fixed scale.
#[derive(Debug, Clone, Copy)]
pub struct Projection {
    /// Pixels per radian of longitude.
    k: f64,
}

impl Default for Projection {
    /// Scale equivalent to zoom level 17, a typical editing zoom.
    fn default() -> Self {
        Self::with_zoom(17.0)
    }
}

impl Projection {
    pub fn with_zoom(zoom: f64) -> Self {
        Self {
            k: 256.0 * 2f64.powf(zoom) / TAU,
        }
    }

    /// Project `[lon, lat]` degrees into the plane.
    pub fn project(&self, loc: [f64; 2]) -> DVec2 {
        let lambda = loc[0].to_radians();
        let phi = loc[1].to_radians();
        DVec2::new(
            lambda * self.k,
            -((std::f64::consts::FRAC_PI_4 + phi / 2.0).tan().ln()) * self.k,
        )
    }

    /// Invert [`project`](Self::project).
    pub fn unproject(&self, p: DVec2) -> [f64; 2] {
        let lambda = p.x / self.k;
        let phi = 2.0 * (-p.y / self.k).exp().atan() - std::f64::consts::FRAC_PI_2;
        [lambda.to_degrees(), phi.to_degrees()]
    }
}

/// Approximate ground distance in meters between two `[lon, lat]`
/// locations. Equirectangular, adequate at junction scale.
pub fn spherical_distance(a: [f64; 2], b: [f64; 2]) -> f64 {
    let mid_lat = ((a[1] + b[1]) / 2.0).to_radians();
    let x = (a[0] - b[0]) * (TAU * EQUATORIAL_RADIUS / 360.0) * mid_lat.cos().abs();
    let y = (a[1] - b[1]) * (TAU * POLAR_RADIUS / 360.0);
    x.hypot(y)
}

/// Dot product of the unit vectors from `origin` toward `a` and `b`.
/// Coincident points read as a straight line (1.0).
pub fn normalized_dot(a: DVec2, b: DVec2, origin: DVec2) -> f64 {
    if a == origin || b == origin {
        return 1.0;
    }
    let p = (a - origin).normalize_or_zero();
    let q = (b - origin).normalize_or_zero();
    p.dot(q)
}

/// Linear interpolation between two points.
pub fn interp(a: DVec2, b: DVec2, t: f64) -> DVec2 {
    a + (b - a) * t
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn project_round_trips() {
        let proj = Projection::default();
        let loc = [-122.419, 37.775];
        let back = proj.unproject(proj.project(loc));
        assert_relative_eq!(back[0], loc[0], epsilon = 1e-9);
        assert_relative_eq!(back[1], loc[1], epsilon = 1e-9);
    }

    #[test]
    fn projected_y_grows_downward_with_latitude() {
        let proj = Projection::default();
        let north = proj.project([0.0, 10.0]);
        let south = proj.project([0.0, -10.0]);
        assert!(north.y < south.y);
    }

    #[test]
    fn spherical_distance_one_degree_longitude_at_equator() {
        let d = spherical_distance([0.0, 0.0], [1.0, 0.0]);
        assert_relative_eq!(d, 111_319.0, max_relative = 0.01);
    }

    #[test]
    fn normalized_dot_detects_right_angles_and_lines() {
        let o = DVec2::ZERO;
        assert_relative_eq!(
            normalized_dot(DVec2::new(1.0, 0.0), DVec2::new(0.0, 1.0), o),
            0.0
        );
        assert_relative_eq!(
            normalized_dot(DVec2::new(1.0, 0.0), DVec2::new(-1.0, 0.0), o),
            -1.0
        );
        assert_relative_eq!(normalized_dot(o, DVec2::new(1.0, 1.0), o), 1.0);
    }
}
