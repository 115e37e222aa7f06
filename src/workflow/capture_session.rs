//! 多角度采集状态
//!
//! 按固定顺序逐个角度采集；连续 N 个姿态样本落在当前角度窗口内才允许拍照，
//! 任何一个窗口外样本或未检测到人脸都会把计数清零

use std::collections::BTreeMap;
use std::time::Duration;

use crate::models::{FaceAngle, ImageArtifact, PoseSample};
use crate::services::AngleWindows;

/// 采集参数（均为经验值）
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureConfig {
    pub sequence: Vec<FaceAngle>,
    pub windows: AngleWindows,
    /// 拍照前需要的连续合格样本数
    pub required_consecutive: u32,
    pub poll_interval: Duration,
    /// 拍完一个角度后留给考生调整姿势的时间
    pub settle_pause: Duration,
    pub detector_load_timeout: Duration,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sequence: FaceAngle::SEQUENCE.to_vec(),
            windows: AngleWindows::default(),
            required_consecutive: 4,
            poll_interval: Duration::from_millis(120),
            settle_pause: Duration::from_millis(800),
            detector_load_timeout: Duration::from_secs(15),
        }
    }
}

/// 一个姿态样本的判定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleVerdict {
    /// 不在采样阶段（已完成、已取消或等待拍照）
    Ignored,
    /// 窗口外或无人脸，计数清零
    Miss,
    /// 合格，尚未达到连续次数
    Hold { consecutive: u32, required: u32 },
    /// 达到连续次数，应立即拍照
    Ready(FaceAngle),
}

/// 采集会话
#[derive(Debug, Clone)]
pub struct CaptureSession {
    required: Vec<FaceAngle>,
    windows: AngleWindows,
    required_consecutive: u32,
    captured: BTreeMap<FaceAngle, ImageArtifact>,
    current: usize,
    consecutive: u32,
    awaiting_capture: bool,
    cancelled: bool,
}

impl CaptureSession {
    pub fn new(config: &CaptureConfig) -> Self {
        Self {
            required: config.sequence.clone(),
            windows: config.windows,
            required_consecutive: config.required_consecutive.max(1),
            captured: BTreeMap::new(),
            current: 0,
            consecutive: 0,
            awaiting_capture: false,
            cancelled: false,
        }
    }

    pub fn required_angles(&self) -> &[FaceAngle] {
        &self.required
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    /// 当前待采集的角度；全部完成后为 None
    pub fn current_angle(&self) -> Option<FaceAngle> {
        self.required.get(self.current).copied()
    }

    pub fn consecutive(&self) -> u32 {
        self.consecutive
    }

    pub fn required_consecutive(&self) -> u32 {
        self.required_consecutive
    }

    pub fn is_complete(&self) -> bool {
        self.required.iter().all(|a| self.captured.contains_key(a))
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    pub fn captured_angles(&self) -> Vec<FaceAngle> {
        self.required
            .iter()
            .filter(|a| self.captured.contains_key(a))
            .copied()
            .collect()
    }

    pub fn missing_angles(&self) -> Vec<FaceAngle> {
        self.required
            .iter()
            .filter(|a| !self.captured.contains_key(a))
            .copied()
            .collect()
    }

    fn is_sampling(&self) -> bool {
        !self.cancelled && !self.awaiting_capture && self.current_angle().is_some()
    }

    /// 输入一个姿态样本
    pub fn observe(&mut self, sample: Option<PoseSample>) -> SampleVerdict {
        if !self.is_sampling() {
            return SampleVerdict::Ignored;
        }
        let Some(angle) = self.current_angle() else {
            return SampleVerdict::Ignored;
        };

        match sample {
            Some(pose) if self.windows.accepts(angle, &pose) => {
                self.consecutive += 1;
                if self.consecutive >= self.required_consecutive {
                    self.awaiting_capture = true;
                    SampleVerdict::Ready(angle)
                } else {
                    SampleVerdict::Hold {
                        consecutive: self.consecutive,
                        required: self.required_consecutive,
                    }
                }
            }
            _ => {
                self.consecutive = 0;
                SampleVerdict::Miss
            }
        }
    }

    /// 保存 `Ready` 之后拍下的照片并前进到下一个角度
    ///
    /// 只接受当前角度且处于等待拍照状态时的照片，返回是否被接受
    pub fn record_capture(&mut self, artifact: ImageArtifact) -> bool {
        if self.cancelled || !self.awaiting_capture || self.current_angle() != Some(artifact.angle) {
            return false;
        }
        self.captured.insert(artifact.angle, artifact);
        self.awaiting_capture = false;
        self.consecutive = 0;
        self.current += 1;
        true
    }

    /// 拍照失败，回到当前角度重新计数
    pub fn abort_capture(&mut self) {
        self.awaiting_capture = false;
        self.consecutive = 0;
    }

    /// 取消采集，已拍下的照片保留
    pub fn cancel(&mut self) {
        self.cancelled = true;
        self.awaiting_capture = false;
    }

    /// 按采集顺序列出已拍下的照片
    pub fn artifacts(&self) -> Vec<ImageArtifact> {
        self.required
            .iter()
            .filter_map(|a| self.captured.get(a).cloned())
            .collect()
    }
}
