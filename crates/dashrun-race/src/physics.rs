use crate::config::PhysicsConfig;
use crate::racer::Racer;

/// Advance one racer by a single fixed tick: gravity, friction, clamping,
/// position and visual spin. Collision is resolved separately.
pub fn integrate(racer: &mut Racer, horizontal_input: bool, cfg: &PhysicsConfig) {
    let airborne = !racer.is_grounded();
    let dashing = racer.is_dashing();

    if airborne && !dashing {
        racer.vy += cfg.gravity;
    }

    if !airborne && !dashing && !horizontal_input {
        racer.vx *= cfg.friction;
        if racer.vx.abs() < cfg.friction_epsilon {
            racer.vx = 0.0;
        }
    }

    racer.vy = racer
        .vy
        .clamp(-cfg.max_vertical_speed, cfg.max_vertical_speed);
    if airborne {
        racer.vx = racer.vx.clamp(-cfg.max_air_speed, cfg.max_air_speed);
    }

    racer.x += racer.vx;
    racer.y += racer.vy;
    racer.distance = racer.distance.max(racer.x);

    if !airborne {
        racer.rotation = 0.0;
    } else if racer.vx != 0.0 {
        racer.rotation = (racer.rotation + cfg.spin_per_tick * racer.vx.signum()).rem_euclid(360.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::racer::{DashState, Facing, JumpState};
    use dashrun_core::test_helpers::make_players;

    fn racer() -> Racer {
        Racer::new(&make_players(1)[0], 100.0, 100.0)
    }

    #[test]
    fn gravity_only_while_airborne() {
        let cfg = PhysicsConfig::default();
        let mut r = racer();
        integrate(&mut r, false, &cfg);
        assert_eq!(r.vy, 0.0);
        assert_eq!(r.y, 100.0);

        r.jump = JumpState::Spent;
        integrate(&mut r, false, &cfg);
        assert_eq!(r.vy, cfg.gravity);
        assert_eq!(r.y, 100.0 + cfg.gravity);
    }

    #[test]
    fn vertical_speed_clamped() {
        let cfg = PhysicsConfig::default();
        let mut r = racer();
        r.jump = JumpState::Spent;
        r.vy = 23.5;
        integrate(&mut r, false, &cfg);
        assert_eq!(r.vy, cfg.max_vertical_speed);

        r.vy = -100.0;
        integrate(&mut r, false, &cfg);
        assert_eq!(r.vy, -cfg.max_vertical_speed);
    }

    #[test]
    fn airborne_horizontal_speed_clamped() {
        let cfg = PhysicsConfig::default();
        let mut r = racer();
        r.jump = JumpState::SecondJumpAvailable;
        r.vx = -40.0;
        integrate(&mut r, false, &cfg);
        assert_eq!(r.vx, -cfg.max_air_speed);
        assert_eq!(r.x, 100.0 - cfg.max_air_speed);
    }

    #[test]
    fn friction_decays_then_snaps_to_zero() {
        let cfg = PhysicsConfig::default();
        let mut r = racer();
        r.vx = 8.0;
        integrate(&mut r, false, &cfg);
        assert!((r.vx - 6.4).abs() < 1e-5);
        for _ in 0..100 {
            integrate(&mut r, false, &cfg);
        }
        assert_eq!(r.vx, 0.0);
    }

    #[test]
    fn no_friction_with_input_or_airborne() {
        let cfg = PhysicsConfig::default();
        let mut r = racer();
        r.vx = 8.0;
        integrate(&mut r, true, &cfg);
        assert_eq!(r.vx, 8.0);

        r.jump = JumpState::FirstJumpAvailable;
        integrate(&mut r, false, &cfg);
        assert_eq!(r.vx, 8.0);
    }

    #[test]
    fn dash_suspends_gravity_and_friction() {
        let cfg = PhysicsConfig::default();
        let mut r = racer();
        r.vx = 16.0;
        r.dash = DashState::Dashing {
            direction: Facing::Right,
            remaining: 64.0,
        };
        integrate(&mut r, false, &cfg);
        assert_eq!(r.vx, 16.0);

        r.jump = JumpState::Spent;
        integrate(&mut r, false, &cfg);
        assert_eq!(r.vy, 0.0);
        assert_eq!(r.y, 100.0);
    }

    #[test]
    fn spin_follows_horizontal_direction_and_wraps() {
        let cfg = PhysicsConfig::default();
        let mut r = racer();
        r.jump = JumpState::Spent;
        r.vx = -4.0;
        integrate(&mut r, true, &cfg);
        assert_eq!(r.rotation, 345.0);

        r.vx = 4.0;
        r.rotation = 350.0;
        integrate(&mut r, true, &cfg);
        assert_eq!(r.rotation, 5.0);

        r.vx = 0.0;
        integrate(&mut r, false, &cfg);
        assert_eq!(r.rotation, 5.0);
    }

    #[test]
    fn grounded_rotation_resets() {
        let cfg = PhysicsConfig::default();
        let mut r = racer();
        r.rotation = 120.0;
        integrate(&mut r, false, &cfg);
        assert_eq!(r.rotation, 0.0);
    }

    #[test]
    fn distance_tracks_furthest_x() {
        let cfg = PhysicsConfig::default();
        let mut r = racer();
        r.vx = 8.0;
        integrate(&mut r, true, &cfg);
        assert_eq!(r.distance, 108.0);
        r.vx = -8.0;
        integrate(&mut r, true, &cfg);
        assert_eq!(r.x, 100.0);
        assert_eq!(r.distance, 108.0);
    }
}
