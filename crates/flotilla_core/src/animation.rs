use std::time::Duration;

/// Angular frequency used for progress bars; settles in roughly one second.
pub const DEFAULT_SPRING_FREQUENCY: f64 = 18.0;

const SETTLE_DISTANCE: f64 = 0.001;
const SETTLE_VELOCITY: f64 = 0.01;

/// Critically damped spring with coefficients precomputed for a fixed time step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spring {
    pos_pos: f64,
    pos_vel: f64,
    vel_pos: f64,
    vel_vel: f64,
}

impl Spring {
    pub fn new(step: Duration, angular_frequency: f64) -> Self {
        let omega = angular_frequency.max(0.0);
        let dt = step.as_secs_f64();

        let exp_term = (-omega * dt).exp();
        let time_exp = dt * exp_term;
        let time_exp_freq = time_exp * omega;

        Self {
            pos_pos: time_exp_freq + exp_term,
            pos_vel: time_exp,
            vel_pos: -omega * time_exp_freq,
            vel_vel: exp_term - time_exp_freq,
        }
    }

    /// Advances `position` and `velocity` one step toward `target`.
    pub fn step(&self, position: f64, velocity: f64, target: f64) -> (f64, f64) {
        let offset = position - target;
        (
            offset * self.pos_pos + velocity * self.pos_vel + target,
            offset * self.vel_pos + velocity * self.vel_vel,
        )
    }
}

/// Visual state of one bar: the value on screen eases toward the last value set.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BarAnimation {
    shown: f64,
    velocity: f64,
    target: f64,
}

impl BarAnimation {
    pub fn shown(&self) -> f64 {
        self.shown
    }

    pub fn target(&self) -> f64 {
        self.target
    }

    pub fn set_target(&mut self, target: f64) {
        self.target = target;
    }

    pub fn is_animating(&self) -> bool {
        (self.shown - self.target).abs() >= SETTLE_DISTANCE || self.velocity.abs() >= SETTLE_VELOCITY
    }

    /// Steps the bar once. Returns whether it is still moving afterwards.
    pub fn advance(&mut self, spring: &Spring) -> bool {
        if !self.is_animating() {
            self.settle();
            return false;
        }

        let before = self.shown - self.target;
        let (position, velocity) = spring.step(self.shown, self.velocity, self.target);
        let after = position - self.target;

        // Never cross the target: the bar only ever closes the gap.
        if after == 0.0 || before.signum() != after.signum() {
            self.settle();
            return false;
        }

        self.shown = position.clamp(0.0, 1.0);
        self.velocity = velocity;
        if self.is_animating() {
            true
        } else {
            self.settle();
            false
        }
    }

    fn settle(&mut self) {
        self.shown = self.target;
        self.velocity = 0.0;
    }
}
