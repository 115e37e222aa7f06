//! 各采集角度的姿态接受窗口
//!
//! 窗口边界是经验值，可通过配置调整

use crate::models::{FaceAngle, PoseSample};

/// 区间的一端
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Limit {
    Unbounded,
    Inclusive(f64),
    Exclusive(f64),
}

/// 一维角度区间
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
    pub low: Limit,
    pub high: Limit,
}

impl Interval {
    /// `[low, high]`
    pub const fn closed(low: f64, high: f64) -> Self {
        Self {
            low: Limit::Inclusive(low),
            high: Limit::Inclusive(high),
        }
    }

    /// `(low, high)`
    pub const fn open(low: f64, high: f64) -> Self {
        Self {
            low: Limit::Exclusive(low),
            high: Limit::Exclusive(high),
        }
    }

    /// `(-∞, high]`
    pub const fn at_most(high: f64) -> Self {
        Self {
            low: Limit::Unbounded,
            high: Limit::Inclusive(high),
        }
    }

    pub fn contains(&self, value: f64) -> bool {
        if !value.is_finite() {
            return false;
        }
        let above_low = match self.low {
            Limit::Unbounded => true,
            Limit::Inclusive(l) => value >= l,
            Limit::Exclusive(l) => value > l,
        };
        let below_high = match self.high {
            Limit::Unbounded => true,
            Limit::Inclusive(h) => value <= h,
            Limit::Exclusive(h) => value < h,
        };
        above_low && below_high
    }
}

/// 一个角度的接受窗口
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AngleWindow {
    pub yaw: Interval,
    pub pitch: Interval,
}

impl AngleWindow {
    pub fn accepts(&self, pose: &PoseSample) -> bool {
        self.yaw.contains(pose.yaw) && self.pitch.contains(pose.pitch)
    }
}

/// 全部角度的窗口表
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AngleWindows {
    pub front: AngleWindow,
    pub left: AngleWindow,
    pub right: AngleWindow,
    pub up: AngleWindow,
}

impl AngleWindows {
    pub fn window_for(&self, angle: FaceAngle) -> &AngleWindow {
        match angle {
            FaceAngle::Front => &self.front,
            FaceAngle::Left => &self.left,
            FaceAngle::Right => &self.right,
            FaceAngle::Up => &self.up,
        }
    }

    pub fn accepts(&self, angle: FaceAngle, pose: &PoseSample) -> bool {
        self.window_for(angle).accepts(pose)
    }
}

impl Default for AngleWindows {
    fn default() -> Self {
        Self {
            front: AngleWindow {
                yaw: Interval::closed(-6.0, 6.0),
                pitch: Interval::closed(-6.0, 6.0),
            },
            left: AngleWindow {
                yaw: Interval::closed(-35.0, -8.0),
                pitch: Interval::closed(-10.0, 35.0),
            },
            right: AngleWindow {
                yaw: Interval::closed(8.0, 35.0),
                pitch: Interval::closed(-10.0, 35.0),
            },
            up: AngleWindow {
                yaw: Interval::open(-18.0, 18.0),
                pitch: Interval::at_most(-8.0),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_windows_match_the_table() {
        let w = AngleWindows::default();
        let p = PoseSample::new;

        assert!(w.accepts(FaceAngle::Front, &p(6.0, -6.0)));
        assert!(!w.accepts(FaceAngle::Front, &p(6.1, 0.0)));

        assert!(w.accepts(FaceAngle::Left, &p(-8.0, 35.0)));
        assert!(!w.accepts(FaceAngle::Left, &p(-7.9, 0.0)));
        assert!(!w.accepts(FaceAngle::Left, &p(-20.0, -10.5)));

        assert!(w.accepts(FaceAngle::Right, &p(35.0, -10.0)));
        assert!(!w.accepts(FaceAngle::Right, &p(36.0, 0.0)));

        assert!(w.accepts(FaceAngle::Up, &p(17.9, -40.0)));
        assert!(!w.accepts(FaceAngle::Up, &p(18.0, -40.0)));
        assert!(!w.accepts(FaceAngle::Up, &p(0.0, -7.9)));
    }

    #[test]
    fn non_finite_values_never_match() {
        assert!(!Interval::at_most(0.0).contains(f64::NEG_INFINITY));
        assert!(!Interval::closed(-1.0, 1.0).contains(f64::NAN));
    }
}
