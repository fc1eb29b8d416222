//! Absolute power control on top of the device's relative step API.
//!
//! The device only understands `/PW/+` and `/PW/-`, each moving power by
//! [`STEP`] percent. [`PowerController`] tracks an advisory level (it never
//! reads the device back) and turns "set power to N" into the right number of
//! step commands, after clamping N to `0..=100` and to the safety ceiling.
//!
//! A `tokio::sync::Mutex` is held for the whole of a step sequence, so two
//! callers can never interleave their steps. The level itself is mirrored in
//! an atomic so readers never wait on a sequence in flight.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Map, Value};
use tokio::sync::{Mutex, MutexGuard};
use tracing::{info, warn};

use crate::device::{CommandResult, DeviceLink};

/// Power change per step command, in percent.
pub const STEP: u8 = 5;
/// Level assumed at startup.
pub const INITIAL_LEVEL: u8 = 50;
pub const MAX_LEVEL: u8 = 100;
/// Lowest power a shock is sent at.
pub const MIN_SHOCK_LEVEL: u8 = 1;

pub const INCREASE_PATH: &str = "/PW/+";
pub const DECREASE_PATH: &str = "/PW/-";
pub const SHOCK_PATH: &str = "/Z1/1";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Up,
    Down,
}

impl Direction {
    fn path(self) -> &'static str {
        match self {
            Self::Up => INCREASE_PATH,
            Self::Down => DECREASE_PATH,
        }
    }
}

/// Result of clamping a requested level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Clamped {
    pub requested: i64,
    pub effective: u8,
    /// True when the safety ceiling, not the `0..=100` range, lowered the level.
    pub limited: bool,
}

/// Owner of the in-memory power level.
pub struct PowerController {
    link: Arc<DeviceLink>,
    sequence: Mutex<()>,
    level: AtomicU8,
    max_power: Option<u8>,
    step_delay: Duration,
}

impl PowerController {
    /// `max_power` is expected already clamped to `0..=100`
    /// (see [`Config::max_power`](crate::config::Config::max_power)).
    pub fn new(link: Arc<DeviceLink>, max_power: Option<u8>, step_delay: Duration) -> Self {
        Self {
            link,
            sequence: Mutex::new(()),
            level: AtomicU8::new(INITIAL_LEVEL),
            max_power,
            step_delay,
        }
    }

    /// Current advisory level. Mid-sequence this is the last step taken.
    pub fn level(&self) -> u8 {
        self.level.load(Ordering::Relaxed)
    }

    pub fn max_power(&self) -> Option<u8> {
        self.max_power
    }

    /// Clamp `requested` to `0..=100`, then to the safety ceiling.
    pub fn clamp(&self, requested: i64) -> Clamped {
        let in_range = u8::try_from(requested.clamp(0, i64::from(MAX_LEVEL))).unwrap_or(MAX_LEVEL);
        let effective = self.max_power.map_or(in_range, |max| in_range.min(max));
        Clamped {
            requested,
            effective,
            limited: effective < in_range,
        }
    }

    /// One `/PW/+`. The level moves only if the device accepted the command.
    pub async fn increase_step(&self) -> CommandResult {
        let _sequence = self.sequence.lock().await;
        self.step(Direction::Up).await
    }

    /// One `/PW/-`. The level moves only if the device accepted the command.
    pub async fn decrease_step(&self) -> CommandResult {
        let _sequence = self.sequence.lock().await;
        self.step(Direction::Down).await
    }

    /// Move to `target` with the fewest step commands.
    ///
    /// Always succeeds as a whole; failed steps only shorten the sequence. The
    /// level is then set to the clamped target even if fewer steps went through.
    pub async fn set_level(&self, target: i64) -> CommandResult {
        let sequence = self.sequence.lock().await;
        self.set_level_locked(&sequence, target).await
    }

    /// Set power to `power` (clamped to `1..=100`, then the ceiling), then
    /// send the shock command.
    ///
    /// Success mirrors only the shock command itself.
    pub async fn shock_at_power(&self, power: i64) -> CommandResult {
        let sequence = self.sequence.lock().await;
        let power = power.max(i64::from(MIN_SHOCK_LEVEL));
        let clamped = self.clamp(power);

        let set = self.set_level_locked(&sequence, power).await;
        if !set.success {
            return set;
        }

        let shock = self.link.send(SHOCK_PATH).await;
        let mut data = Map::new();
        data.insert("power_level".into(), json!(clamped.effective));
        data.insert("shock_sent".into(), json!(shock.success));
        data.insert(
            "shock_response".into(),
            shock.data.clone().unwrap_or_else(|| json!({})),
        );
        self.annotate_limit(&mut data, clamped);

        let endpoint = format!("shock_power_{}", clamped.effective);
        if shock.success {
            CommandResult::ok(endpoint, Value::Object(data))
        } else {
            let mut result = CommandResult::failed(
                endpoint,
                shock.error.unwrap_or_else(|| "shock command failed".into()),
            );
            result.data = Some(Value::Object(data));
            result
        }
    }

    /// Callers hold `sequence`.
    async fn step(&self, direction: Direction) -> CommandResult {
        let result = self.link.send(direction.path()).await;
        if result.success {
            let level = self.level();
            let next = match direction {
                Direction::Up => level.saturating_add(STEP).min(MAX_LEVEL),
                Direction::Down => level.saturating_sub(STEP),
            };
            self.level.store(next, Ordering::Relaxed);
        }
        result
    }

    async fn set_level_locked(&self, _sequence: &MutexGuard<'_, ()>, target: i64) -> CommandResult {
        let clamped = self.clamp(target);
        if clamped.limited {
            warn!(
                "Power {} limited to safety maximum {}",
                clamped.requested, clamped.effective
            );
        }

        let diff = i32::from(clamped.effective) - i32::from(self.level());
        let steps = diff / i32::from(STEP);
        let direction = if steps > 0 { Direction::Up } else { Direction::Down };

        let mut issued = 0u32;
        let mut succeeded = 0u32;
        for _ in 0..steps.unsigned_abs() {
            issued += 1;
            let result = self.step(direction).await;
            if !result.success {
                break;
            }
            succeeded += 1;
            if !self.step_delay.is_zero() {
                tokio::time::sleep(self.step_delay).await;
            }
        }

        info!(
            "Power set to {} ({succeeded}/{issued} steps from {})",
            clamped.effective,
            i32::from(clamped.effective) - diff
        );
        self.level.store(clamped.effective, Ordering::Relaxed);

        let mut data = Map::new();
        data.insert("power_level".into(), json!(clamped.effective));
        data.insert("steps_issued".into(), json!(issued));
        data.insert("steps_succeeded".into(), json!(succeeded));
        self.annotate_limit(&mut data, clamped);

        CommandResult::ok(format!("power_set_{}", clamped.effective), Value::Object(data))
    }

    fn annotate_limit(&self, data: &mut Map<String, Value>, clamped: Clamped) {
        if let (true, Some(max)) = (clamped.limited, self.max_power) {
            data.insert("power_limited_from".into(), json!(clamped.requested));
            data.insert("safety_max_power".into(), json!(max));
        }
    }
}
