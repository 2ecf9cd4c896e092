use serde::Serialize;

/// Velocity-squared floor below which a star is treated as co-moving with
/// the reference frame and reported at its current separation.
pub const STATIONARY_EPS: f64 = 1e-8;

/// Time and distance of minimum separation from the origin.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ClosestApproach {
    /// Centuries relative to the epoch; negative means the approach already
    /// happened.
    pub t_min: f64,
    /// Light-years.
    pub d_min: f64,
}

/// Minimize |P + V t| over t for linear motion.
///
/// The squared separation is a convex quadratic in t, so the minimum sits at
/// t = -(P.V)/(V.V) with no iteration. Velocities with squared norm under
/// [`STATIONARY_EPS`] take the t = 0 branch instead of dividing.
pub fn closest_approach(pos: [f64; 3], vel: [f64; 3]) -> ClosestApproach {
    let v2 = vel[0] * vel[0] + vel[1] * vel[1] + vel[2] * vel[2];

    let t_min = if v2 >= STATIONARY_EPS {
        -(pos[0] * vel[0] + pos[1] * vel[1] + pos[2] * vel[2]) / v2
    } else {
        0.0
    };

    let dx = pos[0] + vel[0] * t_min;
    let dy = pos[1] + vel[1] * t_min;
    let dz = pos[2] + vel[2] * t_min;
    let d_min = (dx * dx + dy * dy + dz * dz).sqrt();

    ClosestApproach { t_min, d_min }
}

#[cfg(test)]
mod tests {
    use assert_approx_eq::assert_approx_eq;

    use super::*;

    #[test]
    fn collision_course() {
        let approach = closest_approach([10.0, 0.0, 0.0], [-1.0, 0.0, 0.0]);
        assert_approx_eq!(approach.t_min, 10.0, 1e-12);
        assert_approx_eq!(approach.d_min, 0.0, 1e-12);
    }

    #[test]
    fn perpendicular_velocity_is_already_at_minimum() {
        let approach = closest_approach([0.0, 5.0, 0.0], [1.0, 0.0, 0.0]);
        assert_eq!(approach.t_min, 0.0);
        assert_eq!(approach.d_min, 5.0);
    }

    #[test]
    fn stationary_star_reports_current_separation() {
        let approach = closest_approach([3.0, 4.0, 0.0], [0.0, 0.0, 0.0]);
        assert_eq!(approach.t_min, 0.0);
        assert_eq!(approach.d_min, 5.0);
    }

    #[test]
    fn near_stationary_velocity_takes_the_fallback_branch() {
        // |V|^2 = 2e-10, under the floor.
        let approach = closest_approach([1.0, 2.0, 2.0], [1e-5, -1e-5, 0.0]);
        assert_eq!(approach.t_min, 0.0);
        assert_approx_eq!(approach.d_min, 3.0, 1e-9);
    }

    #[test]
    fn receding_star_has_negative_approach_time() {
        let approach = closest_approach([10.0, 0.0, 0.0], [1.0, 1.0, 0.0]);
        assert_approx_eq!(approach.t_min, -5.0, 1e-12);
        assert!(approach.d_min.is_finite());
        assert_approx_eq!(approach.d_min, 50.0_f64.sqrt(), 1e-9);
    }
}
