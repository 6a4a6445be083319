use glam::{EulerRot, Quat, Vec3};
use std::f32::consts::FRAC_PI_2;

/// Pitch is kept this far away from +-pi/2 so the view never flips at the
/// poles.
const PITCH_MARGIN: f32 = 0.01;

/// Free-fly camera expressed as a position plus yaw/pitch angles.
///
/// The engine owns the projection; this struct only produces the pose. Euler
/// order is YXZ (yaw around world Y, then pitch around the local X), matching
/// a no-roll free-look camera.
#[derive(Debug, Clone, Copy)]
pub struct FlyCamera {
    pub position: Vec3,
    pub yaw: f32,
    pub pitch: f32,
}

impl FlyCamera {
    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            yaw: 0.0,
            pitch: 0.0,
        }
    }

    pub fn orientation(&self) -> Quat {
        Quat::from_euler(EulerRot::YXZ, self.yaw, self.pitch, 0.0)
    }

    /// Direction the camera is looking (unit length).
    pub fn forward(&self) -> Vec3 {
        self.orientation() * Vec3::NEG_Z
    }

    /// Strafe direction: forward x world-up, normalized. Zero when looking
    /// straight up or down.
    pub fn right(&self) -> Vec3 {
        self.forward().cross(Vec3::Y).normalize_or_zero()
    }

    /// Apply a mouse-look delta in pixels at the given sensitivity
    /// (radians per pixel). Pitch is clamped away from the poles.
    pub fn look(&mut self, delta_x: f32, delta_y: f32, sensitivity: f32) {
        self.yaw -= delta_x * sensitivity;
        self.pitch = (self.pitch - delta_y * sensitivity)
            .clamp(-FRAC_PI_2 + PITCH_MARGIN, FRAC_PI_2 - PITCH_MARGIN);
    }

    /// Move along the viewing direction; positive = toward what is on screen.
    pub fn dolly(&mut self, distance: f32) {
        self.position += self.forward() * distance;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    #[test]
    fn level_camera_looks_down_negative_z() {
        let camera = FlyCamera::new(Vec3::new(0.0, 3.0, 15.0));
        assert!((camera.forward() - Vec3::NEG_Z).length() < 1e-6);
        assert!((camera.right() - Vec3::X).length() < 1e-6);
    }

    #[test]
    fn pitch_stays_clamped_under_any_drag_sequence() {
        let mut camera = FlyCamera::new(Vec3::ZERO);
        // Drag hard downwards, then hard upwards, in uneven steps.
        for _ in 0..500 {
            camera.look(3.0, 1000.0, 0.005);
        }
        assert!(camera.pitch >= -FRAC_PI_2 + 0.01 - 1e-6);
        for _ in 0..500 {
            camera.look(-7.0, -1000.0, 0.005);
        }
        assert!(camera.pitch <= FRAC_PI_2 - 0.01 + 1e-6);
        assert!(camera.pitch.abs() < FRAC_PI_2);
    }

    #[test]
    fn yaw_half_turn_reverses_forward() {
        let mut camera = FlyCamera::new(Vec3::ZERO);
        camera.look(PI / 0.005, 0.0, 0.005);
        assert!((camera.forward() - Vec3::Z).length() < 1e-4);
    }

    #[test]
    fn dolly_moves_along_forward() {
        let mut camera = FlyCamera::new(Vec3::new(0.0, 0.0, 10.0));
        camera.dolly(0.5);
        assert!((camera.position - Vec3::new(0.0, 0.0, 9.5)).length() < 1e-6);
        camera.dolly(-0.5);
        assert!((camera.position - Vec3::new(0.0, 0.0, 10.0)).length() < 1e-6);
    }

    #[test]
    fn right_vector_degenerates_gracefully_at_the_pole() {
        let mut camera = FlyCamera::new(Vec3::ZERO);
        camera.pitch = FRAC_PI_2 - 0.01;
        let right = camera.right();
        assert!(right.is_finite());
    }
}
