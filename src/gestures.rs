use log::debug;
use serde::Serialize;

use crate::buffer::QuadrantSample;
use crate::config::Thresholds;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    None,
    Up,
    Down,
    Left,
    Right,
    Near,
    Far,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Up => "up",
            Self::Down => "down",
            Self::Left => "left",
            Self::Right => "right",
            Self::Near => "near",
            Self::Far => "far",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProximityState {
    #[default]
    None,
    Near,
    Far,
}

/// Percentage imbalance between two opposing channels, truncated toward zero.
/// `None` when both channels read zero.
fn ratio(a: u8, b: u8) -> Option<i32> {
    let (a, b) = (i32::from(a), i32::from(b));
    ((a - b) * 100).checked_div(a + b)
}

fn axis_ratios(s: &QuadrantSample) -> Option<(i32, i32)> {
    Some((ratio(s.up, s.down)?, ratio(s.left, s.right)?))
}

/// -1, 0 or +1 per axis. A large positive accumulated delta maps to -1
/// (up / left), a large negative one to +1 (down / right).
fn axis_count(delta: i32, sensitivity: i32) -> i8 {
    if delta >= sensitivity {
        -1
    } else if delta <= -sensitivity {
        1
    } else {
        0
    }
}

#[derive(Debug, Clone)]
pub struct GestureClassifier {
    th: Thresholds,
    ud_delta: i32,
    lr_delta: i32,
    ud_count: i8,
    lr_count: i8,
    near_count: u32,
    far_count: u32,
    state: ProximityState,
    motion: Direction,
}

impl GestureClassifier {
    pub fn new(th: Thresholds) -> Self {
        Self {
            th,
            ud_delta: 0,
            lr_delta: 0,
            ud_count: 0,
            lr_count: 0,
            near_count: 0,
            far_count: 0,
            state: ProximityState::None,
            motion: Direction::None,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.th);
    }

    pub fn motion(&self) -> Direction {
        self.motion
    }

    pub fn proximity(&self) -> ProximityState {
        self.state
    }

    pub fn deltas(&self) -> (i32, i32) {
        (self.ud_delta, self.lr_delta)
    }

    pub fn counts(&self) -> (i8, i8) {
        (self.ud_count, self.lr_count)
    }

    pub fn near_far_counts(&self) -> (u32, u32) {
        (self.near_count, self.far_count)
    }

    /// Fold one batch into the running state. Returns `true` once the
    /// near and far counters both reach their thresholds.
    pub fn process_batch(&mut self, samples: &[QuadrantSample]) -> bool {
        if samples.len() <= self.th.min_batch {
            return false;
        }

        let th_out = self.th.threshold_out;
        let Some(first) = samples.iter().find(|s| s.all_above(th_out)) else {
            return false;
        };
        let Some(last) = samples.iter().rev().find(|s| s.all_above(th_out)) else {
            return false;
        };

        let (Some((ud_first, lr_first)), Some((ud_last, lr_last))) =
            (axis_ratios(first), axis_ratios(last))
        else {
            return false;
        };

        let ud_batch = ud_last - ud_first;
        let lr_batch = lr_last - lr_first;

        self.ud_delta += ud_batch;
        self.lr_delta += lr_batch;

        self.ud_count = axis_count(self.ud_delta, self.th.sensitivity_1);
        self.lr_count = axis_count(self.lr_delta, self.th.sensitivity_1);

        debug!(
            "batch n={} ud={ud_batch} lr={lr_batch} acc=({}, {}) counts=({}, {})",
            samples.len(),
            self.ud_delta,
            self.lr_delta,
            self.ud_count,
            self.lr_count
        );

        let quiet =
            ud_batch.abs() < self.th.sensitivity_2 && lr_batch.abs() < self.th.sensitivity_2;
        if !quiet {
            return false;
        }
        let still = ud_batch == 0 && lr_batch == 0;

        if self.ud_count == 0 && self.lr_count == 0 {
            if still {
                self.near_count += 1;
            } else {
                self.far_count += 1;
            }

            if self.near_count >= self.th.near_count && self.far_count >= self.th.far_count {
                // A batch with exactly one moving axis leaves the state untouched.
                if still {
                    self.state = ProximityState::Near;
                } else if ud_batch != 0 && lr_batch != 0 {
                    self.state = ProximityState::Far;
                }
                return true;
            }
        } else {
            if still {
                self.near_count += 1;
            }
            if self.near_count >= self.th.near_count {
                // signal went quiet mid-swipe; drop the candidate
                self.ud_count = 0;
                self.lr_count = 0;
                self.ud_delta = 0;
                self.lr_delta = 0;
            }
        }

        false
    }

    /// Resolve the current state into `motion()`. Returns `false` and leaves
    /// the previous motion in place if nothing is decodable.
    pub fn decode(&mut self) -> bool {
        match self.state {
            ProximityState::Near => {
                self.motion = Direction::Near;
                return true;
            }
            ProximityState::Far => {
                self.motion = Direction::Far;
                return true;
            }
            ProximityState::None => {}
        }

        let ud_wins = self.ud_delta.abs() > self.lr_delta.abs();
        let dir = match (self.ud_count, self.lr_count) {
            (-1, 0) => Direction::Up,
            (1, 0) => Direction::Down,
            (0, 1) => Direction::Right,
            (0, -1) => Direction::Left,
            (-1, 1) if ud_wins => Direction::Up,
            (-1, 1) => Direction::Right,
            (1, -1) if ud_wins => Direction::Down,
            (1, -1) => Direction::Left,
            (-1, -1) if ud_wins => Direction::Up,
            (-1, -1) => Direction::Left,
            (1, 1) if ud_wins => Direction::Down,
            (1, 1) => Direction::Right,
            _ => return false,
        };
        self.motion = dir;
        true
    }
}
