//! Headless runner game
//!
//! A side-scrolling runner on a small canvas: the dino stays at a fixed `x`
//! while cacti and birds scroll towards it at a slowly rising speed. It can
//! jump or duck; touching an obstacle's box ends the episode.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use dino_rl_core::{Action, FlightState, FrameContext, Obstacle, RLError, Result};

use crate::config::RunnerConfig;

/// Obstacle species
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObstacleKind {
    /// Ground obstacle; must be jumped
    Cactus,
    /// Flying obstacle at one of three heights
    Bird,
}

/// An obstacle on the track
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hazard {
    /// Species
    pub kind: ObstacleKind,
    /// Left edge
    pub x: f64,
    /// Top edge
    pub y: f64,
    /// Box width
    pub width: f64,
    /// Box height
    pub height: f64,
}

impl Hazard {
    fn right(&self) -> f64 {
        self.x + self.width
    }

    /// The part of the hazard the learning loop sees
    #[must_use]
    pub fn obstacle(&self) -> Obstacle {
        Obstacle {
            x: self.x,
            y: self.y,
            width: self.width,
        }
    }
}

/// Axis-aligned box
#[derive(Debug, Clone, Copy, PartialEq)]
struct Aabb {
    x: f64,
    y: f64,
    width: f64,
    height: f64,
}

impl Aabb {
    fn overlaps(&self, other: &Aabb) -> bool {
        self.x < other.x + other.width
            && other.x < self.x + self.width
            && self.y < other.y + other.height
            && other.y < self.y + self.height
    }
}

/// Result of advancing one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameOutcome {
    /// Context after the move
    pub context: FrameContext,
    /// Whether the dino touched an obstacle this frame
    pub crashed: bool,
    /// Obstacles cleared so far this episode
    pub passed: usize,
}

/// The runner simulation
#[derive(Debug)]
pub struct RunnerEnv {
    config: RunnerConfig,
    rng: StdRng,
    gap: Normal<f64>,
    /// Height of the dino's feet above the ground
    altitude: f64,
    vertical_velocity: f64,
    ducking: bool,
    speed: f64,
    hazards: Vec<Hazard>,
    next_spawn_in: f64,
    frames: usize,
    passed: usize,
    crashed: bool,
}

impl RunnerEnv {
    /// Create an environment; `seed` makes obstacle sequences reproducible
    pub fn new(config: RunnerConfig, seed: Option<u64>) -> Result<Self> {
        config.validate()?;
        let gap = Normal::new(config.mean_gap, config.gap_std_dev)
            .map_err(|e| RLError::Config(format!("runner gap distribution: {e}")))?;
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut env = Self {
            config,
            rng,
            gap,
            altitude: 0.0,
            vertical_velocity: 0.0,
            ducking: false,
            speed: config.initial_speed,
            hazards: Vec::new(),
            next_spawn_in: 0.0,
            frames: 0,
            passed: 0,
            crashed: false,
        };
        env.reset();
        Ok(env)
    }

    /// Start a new episode
    pub fn reset(&mut self) -> FrameContext {
        self.altitude = 0.0;
        self.vertical_velocity = 0.0;
        self.ducking = false;
        self.speed = self.config.initial_speed;
        self.hazards.clear();
        self.next_spawn_in = self.config.width * 0.5;
        self.frames = 0;
        self.passed = 0;
        self.crashed = false;
        self.context()
    }

    /// Configuration in use
    #[must_use]
    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Frames simulated this episode
    #[must_use]
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Obstacles cleared this episode
    #[must_use]
    pub fn passed(&self) -> usize {
        self.passed
    }

    /// Current scroll speed
    #[must_use]
    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Whether the episode ended in a collision
    #[must_use]
    pub fn is_crashed(&self) -> bool {
        self.crashed
    }

    /// Obstacles currently on the track
    #[must_use]
    pub fn hazards(&self) -> &[Hazard] {
        &self.hazards
    }

    /// Body state as the learning loop reports it
    #[must_use]
    pub fn flight(&self) -> FlightState {
        FlightState::from_flags(self.is_airborne(), self.ducking)
    }

    fn is_airborne(&self) -> bool {
        self.altitude > 0.0
    }

    /// Nearest obstacle the dino has not yet passed
    #[must_use]
    pub fn nearest(&self) -> Option<&Hazard> {
        self.hazards
            .iter()
            .filter(|h| h.right() >= self.config.dino_x)
            .min_by(|a, b| a.x.total_cmp(&b.x))
    }

    /// Snapshot handed to the lifecycle hooks
    #[must_use]
    pub fn context(&self) -> FrameContext {
        FrameContext {
            flight: self.flight(),
            obstacle: self.nearest().map(Hazard::obstacle),
            speed: self.speed,
        }
    }

    /// Apply a control input.
    ///
    /// Jump only takes off from the ground. Duck on the ground crouches and
    /// in the air pulls the dino down faster. Run stands up.
    pub fn apply(&mut self, action: Action) {
        match action {
            Action::Jump => {
                if !self.is_airborne() {
                    self.vertical_velocity = self.config.jump_velocity;
                    self.altitude = f64::EPSILON;
                    self.ducking = false;
                }
            }
            Action::Duck => self.ducking = true,
            Action::Run => self.ducking = false,
        }
    }

    /// Advance one frame
    pub fn step(&mut self) -> Result<FrameOutcome> {
        if self.crashed {
            return Err(RLError::Agent("step called after a crash; reset first".into()));
        }
        self.frames += 1;

        if self.is_airborne() {
            let gravity = if self.ducking {
                self.config.fast_fall_gravity
            } else {
                self.config.gravity
            };
            self.altitude += self.vertical_velocity;
            self.vertical_velocity -= gravity;
            if self.altitude <= 0.0 {
                self.altitude = 0.0;
                self.vertical_velocity = 0.0;
            }
        }

        let dino_x = self.config.dino_x;
        let speed = self.speed;
        for hazard in &mut self.hazards {
            let was_ahead = hazard.right() >= dino_x;
            hazard.x -= speed;
            if was_ahead && hazard.right() < dino_x {
                self.passed += 1;
            }
        }
        self.hazards.retain(|h| h.right() >= 0.0);

        self.next_spawn_in -= self.speed;
        if self.next_spawn_in <= 0.0 {
            let hazard = self.spawn();
            self.hazards.push(hazard);
            self.next_spawn_in = self.gap.sample(&mut self.rng).max(self.config.min_gap);
        }

        self.speed = (self.speed + self.config.acceleration).min(self.config.max_speed);

        let body = self.body();
        self.crashed = self.hazards.iter().any(|h| {
            body.overlaps(&Aabb {
                x: h.x,
                y: h.y,
                width: h.width,
                height: h.height,
            })
        });

        Ok(FrameOutcome {
            context: self.context(),
            crashed: self.crashed,
            passed: self.passed,
        })
    }

    fn body(&self) -> Aabb {
        let (width, height) = if self.ducking && !self.is_airborne() {
            (self.config.duck_width, self.config.duck_height)
        } else {
            (self.config.dino_width, self.config.dino_height)
        };
        Aabb {
            x: self.config.dino_x,
            y: self.config.ground_y - self.altitude - height,
            width,
            height,
        }
    }

    fn spawn(&mut self) -> Hazard {
        let ground = self.config.ground_y;
        let x = self.config.width;
        let birds_allowed = self.speed >= self.config.bird_min_speed;

        if birds_allowed && self.rng.gen_bool(self.config.bird_probability) {
            // Low birds must be jumped, middle ones ducked; high ones clear a standing dino
            let clearance = [10.0, 30.0, 45.0][self.rng.gen_range(0..3)];
            let height = 20.0;
            Hazard {
                kind: ObstacleKind::Bird,
                x,
                y: ground - clearance - height,
                width: 46.0,
                height,
            }
        } else {
            let width = [17.0, 34.0, 51.0][self.rng.gen_range(0..3)];
            let height = self.rng.gen_range(30.0..45.0);
            Hazard {
                kind: ObstacleKind::Cactus,
                x,
                y: ground - height,
                width,
                height,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn env(seed: u64) -> RunnerEnv {
        RunnerEnv::new(RunnerConfig::default(), Some(seed)).unwrap()
    }

    fn bird(env: &RunnerEnv, clearance: f64) -> Hazard {
        let height = 20.0;
        Hazard {
            kind: ObstacleKind::Bird,
            x: env.config.dino_x + env.speed,
            y: env.config.ground_y - clearance - height,
            width: 46.0,
            height,
        }
    }

    #[test]
    fn jump_takes_off_and_lands() {
        let mut env = env(1);
        env.apply(Action::Jump);
        env.step().unwrap();
        assert_eq!(env.flight(), FlightState::Jumping);

        let mut landed = false;
        for _ in 0..60 {
            env.step().unwrap();
            if env.flight() == FlightState::Running {
                landed = true;
                break;
            }
        }
        assert!(landed);
    }

    #[test]
    fn jump_is_ignored_in_the_air() {
        let mut env = env(1);
        env.apply(Action::Jump);
        env.step().unwrap();
        let velocity = env.vertical_velocity;
        env.apply(Action::Jump);
        assert_eq!(env.vertical_velocity, velocity);
    }

    #[test]
    fn ducking_in_the_air_still_reports_jumping() {
        let mut env = env(1);
        env.apply(Action::Jump);
        env.step().unwrap();
        env.apply(Action::Duck);
        assert_eq!(env.flight(), FlightState::Jumping);
    }

    #[test]
    fn idle_dino_hits_the_first_cactus() {
        let mut env = env(7);
        let mut crashed_at = None;
        for frame in 0..1_000 {
            let outcome = env.step().unwrap();
            if outcome.crashed {
                crashed_at = Some(frame);
                break;
            }
        }
        assert!(crashed_at.is_some());
        assert!(env.is_crashed());
        assert!(env.step().is_err());

        let ctx = env.reset();
        assert!(!env.is_crashed());
        assert_eq!(ctx.obstacle, None);
        assert_eq!(env.frames(), 0);
    }

    #[test]
    fn context_tracks_the_nearest_obstacle() {
        let mut env = env(3);
        let mut last_x = None;
        for _ in 0..80 {
            let outcome = env.step().unwrap();
            if let Some(obstacle) = outcome.context.obstacle {
                if let Some(previous) = last_x {
                    assert!(obstacle.x < previous);
                }
                last_x = Some(obstacle.x);
            }
        }
        assert!(last_x.is_some());
        assert!(env.speed() > env.config().initial_speed);
    }

    #[test]
    fn speed_ramps_until_the_cap() {
        let mut env = env(8);
        for _ in 0..100 {
            env.step().unwrap();
        }
        assert_abs_diff_eq!(env.speed(), 6.1, epsilon = 1e-9);

        env.speed = env.config.max_speed;
        env.next_spawn_in = f64::MAX;
        env.hazards.clear();
        env.step().unwrap();
        assert_abs_diff_eq!(env.speed(), env.config.max_speed);
    }

    #[test]
    fn duck_clears_a_middle_bird() {
        let mut env = env(5);
        env.next_spawn_in = f64::MAX;
        let hazard = bird(&env, 30.0);
        env.hazards.push(hazard);
        env.apply(Action::Duck);
        assert!(!env.step().unwrap().crashed);

        let mut env = self::env(5);
        env.next_spawn_in = f64::MAX;
        let hazard = bird(&env, 30.0);
        env.hazards.push(hazard);
        assert!(env.step().unwrap().crashed);
    }

    #[test]
    fn passing_an_obstacle_counts_once() {
        let mut env = env(9);
        env.next_spawn_in = f64::MAX;
        env.hazards.push(Hazard {
            kind: ObstacleKind::Cactus,
            x: env.config.dino_x - 10.0,
            y: 200.0,
            width: 17.0,
            height: 35.0,
        });
        for _ in 0..10 {
            env.step().unwrap();
        }
        assert_eq!(env.passed(), 1);
    }
}
