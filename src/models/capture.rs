//! 人脸多角度采集相关的数据结构

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 需要采集的人脸角度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaceAngle {
    Front,
    Left,
    Right,
    Up,
}

impl FaceAngle {
    /// 默认采集顺序
    pub const SEQUENCE: [FaceAngle; 4] =
        [FaceAngle::Front, FaceAngle::Left, FaceAngle::Right, FaceAngle::Up];

    pub fn label(self) -> &'static str {
        match self {
            FaceAngle::Front => "front",
            FaceAngle::Left => "left",
            FaceAngle::Right => "right",
            FaceAngle::Up => "up",
        }
    }

    /// 给考生的提示语
    pub fn hint(self) -> &'static str {
        match self {
            FaceAngle::Front => "请正对摄像头",
            FaceAngle::Left => "请向左转头",
            FaceAngle::Right => "请向右转头",
            FaceAngle::Up => "请微微抬头",
        }
    }
}

impl fmt::Display for FaceAngle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// 图像坐标系中的一个点
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn midpoint(self, other: Point2) -> Point2 {
        Point2::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }

    pub fn distance(self, other: Point2) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// 关键点检测结果（68 点方案）
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FaceLandmarks {
    pub points: Vec<Point2>,
}

impl FaceLandmarks {
    /// 鼻尖
    pub const NOSE_TIP: usize = 30;
    /// 图像左侧眼睛的外眼角
    pub const LEFT_EYE_OUTER: usize = 36;
    /// 图像右侧眼睛的外眼角
    pub const RIGHT_EYE_OUTER: usize = 45;

    pub fn new(points: Vec<Point2>) -> Self {
        Self { points }
    }

    pub fn point(&self, index: usize) -> Option<Point2> {
        self.points
            .get(index)
            .copied()
            .filter(|p| p.x.is_finite() && p.y.is_finite())
    }

    pub fn nose_tip(&self) -> Option<Point2> {
        self.point(Self::NOSE_TIP)
    }

    pub fn left_eye_outer(&self) -> Option<Point2> {
        self.point(Self::LEFT_EYE_OUTER)
    }

    pub fn right_eye_outer(&self) -> Option<Point2> {
        self.point(Self::RIGHT_EYE_OUTER)
    }
}

/// 一次头部姿态估计（角度制）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseSample {
    pub yaw: f64,
    pub pitch: f64,
}

impl PoseSample {
    pub const fn new(yaw: f64, pitch: f64) -> Self {
        Self { yaw, pitch }
    }
}

/// 摄像头的一帧画面
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Frame {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// 采集成功后生成的照片
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageArtifact {
    #[serde(skip_serializing)]
    #[serde(default)]
    pub data: Vec<u8>,
    pub angle: FaceAngle,
    pub captured_at: DateTime<Utc>,
}

impl ImageArtifact {
    pub fn new(frame: Frame, angle: FaceAngle, captured_at: DateTime<Utc>) -> Self {
        Self {
            data: frame.data,
            angle,
            captured_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_finite_points_count_as_missing() {
        let mut points = vec![Point2::new(0.0, 0.0); 68];
        points[FaceLandmarks::NOSE_TIP] = Point2::new(f64::NAN, 1.0);
        let marks = FaceLandmarks::new(points);
        assert!(marks.nose_tip().is_none());
        assert!(marks.left_eye_outer().is_some());
        assert!(FaceLandmarks::default().right_eye_outer().is_none());
    }

    #[test]
    fn geometry_helpers() {
        let a = Point2::new(0.0, 0.0);
        let b = Point2::new(6.0, 8.0);
        assert_eq!(a.distance(b), 10.0);
        assert_eq!(a.midpoint(b), Point2::new(3.0, 4.0));
    }
}
