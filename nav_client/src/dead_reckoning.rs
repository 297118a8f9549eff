//! Kinematic fallback used by the physics step while the navigation service
//! is unreachable.
//!
//! Only forward/backward translation along the facing vector and vertical
//! gravity are modelled. Strafing, turning, jumping and collision belong to
//! the authoritative engine.
//!
//! The fallback cannot see the floor, so it uses the movement flags in its
//! place: an agent with neither `JUMPING` nor `FALLING` set keeps its
//! altitude even though its vertical velocity still integrates gravity.
//! Only airborne agents change height. The next authoritative step
//! reconciles the vertical velocity with the real surface.

use nav_runtime::{MovementFlags, PhysicsInput, PhysicsOutput, Position, DEFAULT_GRAVITY};

/// Fixed gravitational constant; the per-request `gravity` field is ignored.
pub const FALLBACK_GRAVITY: f32 = DEFAULT_GRAVITY;

/// Advance `input` by one `delta_time` slice without consulting the world.
///
/// Callers are expected to have passed `input` through
/// [`PhysicsInput::validate`]. A zero `delta_time` still yields finite
/// output: the agent stays put and reports its intended speed.
pub fn dead_reckon(input: &PhysicsInput) -> PhysicsOutput {
    let dt = input.delta_time;
    let flags = input.movement_flags;
    let heading = Position::new(input.facing.cos(), input.facing.sin(), 0.0);

    let mut velocity = Position::zero();
    if flags.contains(MovementFlags::FORWARD) {
        velocity += heading * input.speeds.run;
    }
    if flags.contains(MovementFlags::BACKWARD) {
        velocity = velocity - heading * input.speeds.run_back;
    }

    let mut displacement = velocity * dt;
    // Grounded agents hold altitude; only airborne agents travel vertically.
    if flags.is_airborne() {
        displacement.z = input.velocity.z * dt;
    }
    velocity.z = input.velocity.z - FALLBACK_GRAVITY * dt;

    PhysicsOutput {
        position: input.position + displacement,
        velocity,
        movement_flags: flags,
        orientation: input.facing,
        pitch: input.swim_pitch,
        fall_time: input.fall_time + dt,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nav_runtime::SpeedProfile;
    use std::f32::consts::FRAC_PI_2;

    const EPSILON: f32 = 1e-4;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < EPSILON
    }

    fn speeds(run: f32, run_back: f32) -> SpeedProfile {
        SpeedProfile {
            run,
            run_back,
            ..SpeedProfile::default()
        }
    }

    #[test]
    fn forward_along_facing_zero() {
        let start = Position::new(100.0, 200.0, 30.0);
        let input = PhysicsInput::new(0, start, 0.1)
            .with_flags(MovementFlags::FORWARD)
            .with_speeds(speeds(7.0, 4.5));
        let output = dead_reckon(&input);
        let displacement = output.position - start;

        assert!(approx(displacement.x, 0.7), "dx = {}", displacement.x);
        assert!(approx(displacement.y, 0.0), "dy = {}", displacement.y);
        assert!(approx(displacement.z, 0.0));
        assert!(approx(output.velocity.x, 7.0));
    }

    #[test]
    fn backward_uses_run_back_speed() {
        let input = PhysicsInput::new(0, Position::zero(), 0.5)
            .with_flags(MovementFlags::BACKWARD)
            .with_facing(FRAC_PI_2)
            .with_speeds(speeds(7.0, 4.0));
        let output = dead_reckon(&input);

        assert!(approx(output.position.x, 0.0), "x = {}", output.position.x);
        assert!(approx(output.position.y, -2.0), "y = {}", output.position.y);
    }

    #[test]
    fn forward_and_backward_cancel_by_speed_difference() {
        let input = PhysicsInput::new(0, Position::zero(), 1.0)
            .with_flags(MovementFlags::FORWARD | MovementFlags::BACKWARD)
            .with_speeds(speeds(7.0, 4.5));
        let output = dead_reckon(&input);
        assert!(approx(output.position.x, 2.5));
    }

    #[test]
    fn gravity_applies_every_step() {
        let input = PhysicsInput::new(0, Position::new(0.0, 0.0, 50.0), 1.0)
            .with_velocity(Position::new(0.0, 0.0, 3.0));
        let output = dead_reckon(&input);

        assert!(approx(output.velocity.z, 3.0 - 19.2911));
        // not airborne: velocity integrates but altitude is held
        assert!(approx(output.position.z, 50.0));
    }

    #[test]
    fn airborne_agent_moves_vertically() {
        let input = PhysicsInput::new(0, Position::new(0.0, 0.0, 50.0), 0.5)
            .with_flags(MovementFlags::FALLING)
            .with_velocity(Position::new(0.0, 0.0, -4.0));
        let output = dead_reckon(&input);
        assert!(approx(output.position.z, 48.0));
        assert!(approx(output.velocity.z, -4.0 - 19.2911 * 0.5));
    }

    #[test]
    fn zero_delta_time_stays_finite() {
        let start = Position::new(5.0, 6.0, 7.0);
        let input = PhysicsInput::new(0, start, 0.0)
            .with_flags(MovementFlags::FORWARD | MovementFlags::FALLING)
            .with_speeds(speeds(7.0, 4.5))
            .with_velocity(Position::new(0.0, 0.0, -2.0));
        let output = dead_reckon(&input);

        assert_eq!(output.position, start);
        assert!(output.velocity.is_finite(), "velocity {:?}", output.velocity);
        assert!(approx(output.velocity.x, 7.0));
        assert!(approx(output.velocity.z, -2.0));
    }

    #[test]
    fn unmodelled_intent_and_orientation_pass_through() {
        let mut input = PhysicsInput::new(0, Position::new(1.0, 1.0, 1.0), 0.25)
            .with_flags(MovementFlags::STRAFE_LEFT | MovementFlags::TURN_RIGHT)
            .with_facing(2.0);
        input.swim_pitch = -0.3;
        input.fall_time = 1.5;
        let output = dead_reckon(&input);

        assert_eq!(output.position.x, 1.0);
        assert_eq!(output.position.y, 1.0);
        assert_eq!(output.movement_flags, input.movement_flags);
        assert_eq!(output.orientation, 2.0);
        assert_eq!(output.pitch, -0.3);
        assert!(approx(output.fall_time, 1.75));
    }
}
