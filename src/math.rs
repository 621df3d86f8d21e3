//! Vector helpers shared by the controller and the propeller model.

use nalgebra::Vector3;

/// Squared magnitude below which a direction is treated as undefined.
const DIRECTION_EPSILON: f64 = 1e-15;

/// Scales `v` down so that its magnitude does not exceed `max`.
///
/// A `max` of zero yields the zero vector; vectors already inside the
/// limit are returned unchanged.
pub fn clamp_magnitude(v: Vector3<f64>, max: f64) -> Vector3<f64> {
    let max = max.max(0.0);
    let norm_sq = v.norm_squared();
    if norm_sq > max * max {
        v * (max / norm_sq.sqrt())
    } else {
        v
    }
}

/// Unsigned angle between two vectors in radians, `0` if either is degenerate.
pub fn angle_between(from: &Vector3<f64>, to: &Vector3<f64>) -> f64 {
    let denom = (from.norm_squared() * to.norm_squared()).sqrt();
    if denom < DIRECTION_EPSILON {
        return 0.0;
    }
    (from.dot(to) / denom).clamp(-1.0, 1.0).acos()
}

/// Angle from `from` to `to` in radians, signed by the rotation sense about `axis`.
///
/// The sign is positive when `from × to` points along `axis`.
pub fn signed_angle(from: &Vector3<f64>, to: &Vector3<f64>, axis: &Vector3<f64>) -> f64 {
    let angle = angle_between(from, to);
    if axis.dot(&from.cross(to)) < 0.0 {
        -angle
    } else {
        angle
    }
}

/// Removes the component of `v` along `normal`.
pub fn project_on_plane(v: &Vector3<f64>, normal: &Vector3<f64>) -> Vector3<f64> {
    let norm_sq = normal.norm_squared();
    if norm_sq < DIRECTION_EPSILON {
        return *v;
    }
    v - normal * (v.dot(normal) / norm_sq)
}

/// Linear interpolation with `t` clamped to `[0, 1]`.
pub fn lerp_clamped(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_clamp_magnitude_preserves_direction() {
        let v = Vector3::new(3.0, 0.0, 4.0);
        let clamped = clamp_magnitude(v, 2.5);
        assert_relative_eq!(clamped.norm(), 2.5, epsilon = 1e-12);
        assert_relative_eq!(clamped.normalize(), v.normalize(), epsilon = 1e-12);

        // Inside the limit nothing changes
        assert_eq!(clamp_magnitude(v, 10.0), v);
    }

    #[test]
    fn test_clamp_magnitude_zero_limit() {
        let v = Vector3::new(1.0, -2.0, 0.5);
        assert_eq!(clamp_magnitude(v, 0.0), Vector3::zeros());
        assert_eq!(clamp_magnitude(Vector3::zeros(), 0.0), Vector3::zeros());
    }

    #[test]
    fn test_signed_angle_sign_follows_axis() {
        let forward = Vector3::z();
        let right = Vector3::x();
        let up = Vector3::y();

        assert_relative_eq!(signed_angle(&forward, &right, &up), FRAC_PI_2, epsilon = 1e-12);
        assert_relative_eq!(signed_angle(&forward, &-right, &up), -FRAC_PI_2, epsilon = 1e-12);
        assert_relative_eq!(signed_angle(&forward, &right, &-up), -FRAC_PI_2, epsilon = 1e-12);
    }

    #[test]
    fn test_signed_angle_degenerate_is_zero() {
        let up = Vector3::y();
        assert_eq!(signed_angle(&Vector3::z(), &Vector3::zeros(), &up), 0.0);
    }

    #[test]
    fn test_project_on_plane() {
        let v = Vector3::new(1.0, 5.0, -2.0);
        let flat = project_on_plane(&v, &Vector3::y());
        assert_relative_eq!(flat, Vector3::new(1.0, 0.0, -2.0), epsilon = 1e-12);
    }

    #[test]
    fn test_lerp_clamped() {
        assert_eq!(lerp_clamped(1.0, 3.0, -4.0), 1.0);
        assert_eq!(lerp_clamped(1.0, 3.0, 0.5), 2.0);
        assert_eq!(lerp_clamped(1.0, 3.0, 7.0), 3.0);
    }
}
