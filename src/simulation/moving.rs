//! Velocity correction for facets riding a moving structure. Translation
//! adds a constant velocity; rotation adds a velocity proportional to the
//! hit point's distance from the rotation axis.

use cgmath::{InnerSpace, Point3, Vector3};

use crate::model::{GlobalParams, MotionType};

/// Velocity to add to an outgoing direction*speed vector at `hit_point`,
/// given the model's global motion configuration. Returns the zero vector
/// when the facet isn't flagged as moving or motion is disabled.
pub fn facet_velocity(global: &GlobalParams, is_moving: bool, hit_point: Point3<f64>) -> Vector3<f64> {
    if !is_moving {
        return Vector3::new(0.0, 0.0, 0.0);
    }
    match global.motion_type {
        MotionType::None => Vector3::new(0.0, 0.0, 0.0),
        MotionType::Translate => global.motion_vector1,
        MotionType::Rotate => {
            let axis_point = global.motion_vector1; // misused as a point here
            let axis_dir = global.motion_vector2.normalize();
            let to_point = hit_point - Point3::new(axis_point.x, axis_point.y, axis_point.z);
            let radial = to_point - axis_dir * to_point.dot(axis_dir);
            let omega = global.motion_vector2.magnitude();
            axis_dir.cross(radial) * omega
        }
    }
}

/// Apply the moving-facet correction to an outgoing velocity vector
/// (direction * speed), yielding the corrected lab-frame velocity.
pub fn correct_outgoing_velocity(global: &GlobalParams, is_moving: bool, hit_point: Point3<f64>, outgoing: Vector3<f64>) -> Vector3<f64> {
    outgoing + facet_velocity(global, is_moving, hit_point)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stationary_facet_has_no_added_velocity() {
        let global = GlobalParams {
            gas_mass: 28.0,
            use_maxwell: true,
            enable_decay: false,
            halflife: 0.0,
            motion_type: MotionType::Translate,
            motion_vector1: Vector3::new(1.0, 2.0, 3.0),
            motion_vector2: Vector3::new(0.0, 0.0, 0.0),
            calc_constant_flow: true,
            latest_moment: 1.0,
        };
        let v = facet_velocity(&global, false, Point3::new(0.0, 0.0, 0.0));
        assert_eq!(v, Vector3::new(0.0, 0.0, 0.0));
    }

    #[test]
    fn translate_adds_constant_velocity() {
        let global = GlobalParams {
            gas_mass: 28.0,
            use_maxwell: true,
            enable_decay: false,
            halflife: 0.0,
            motion_type: MotionType::Translate,
            motion_vector1: Vector3::new(1.0, 2.0, 3.0),
            motion_vector2: Vector3::new(0.0, 0.0, 0.0),
            calc_constant_flow: true,
            latest_moment: 1.0,
        };
        let v = facet_velocity(&global, true, Point3::new(5.0, 5.0, 5.0));
        assert_eq!(v, Vector3::new(1.0, 2.0, 3.0));
    }
}
