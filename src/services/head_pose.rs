//! 头部姿态估计 - 业务能力层
//!
//! 只负责"关键点 → 偏航/俯仰角"的换算，不关心采集流程
//!
//! 这是基于鼻尖相对双眼位置的二维近似，不是完整的三维 PnP 解算。
//! 比例系数是经验值，需要按摄像头与人群标定，不能当作经过验证的生物特征算法。

use crate::models::{FaceLandmarks, PoseSample};

/// 姿态换算的标定参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseCalibration {
    /// 水平偏移 → 偏航角
    pub yaw_scale: f64,
    /// 垂直偏移 → 俯仰角
    pub pitch_scale: f64,
    /// 正视时鼻尖相对双眼中心的垂直偏移（以眼距为单位）
    pub pitch_offset: f64,
    /// 小于该眼距（像素）视为退化，无法估计
    pub min_eye_distance: f64,
}

impl Default for PoseCalibration {
    fn default() -> Self {
        Self {
            yaw_scale: 40.0,
            pitch_scale: 60.0,
            pitch_offset: 0.5,
            min_eye_distance: 1e-6,
        }
    }
}

/// 头部姿态估计器
#[derive(Debug, Clone, Copy, Default)]
pub struct HeadPoseEstimator {
    calibration: PoseCalibration,
}

impl HeadPoseEstimator {
    pub fn new(calibration: PoseCalibration) -> Self {
        Self { calibration }
    }

    pub fn calibration(&self) -> &PoseCalibration {
        &self.calibration
    }

    /// 估计头部姿态
    ///
    /// 缺少鼻尖或外眼角、或双眼几乎重合时返回 None
    pub fn estimate(&self, landmarks: &FaceLandmarks) -> Option<PoseSample> {
        let nose = landmarks.nose_tip()?;
        let left_eye = landmarks.left_eye_outer()?;
        let right_eye = landmarks.right_eye_outer()?;

        let eye_center = left_eye.midpoint(right_eye);
        let eye_dist = left_eye.distance(right_eye);
        if !eye_dist.is_finite() || eye_dist <= self.calibration.min_eye_distance {
            return None;
        }

        let nx = (nose.x - eye_center.x) / eye_dist;
        let ny = (nose.y - eye_center.y) / eye_dist;

        Some(PoseSample {
            yaw: nx * self.calibration.yaw_scale,
            pitch: (ny - self.calibration.pitch_offset) * self.calibration.pitch_scale,
        })
    }
}
