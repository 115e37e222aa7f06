//! 人脸关键点检测能力
//!
//! 只依赖 `detect(frame) → landmarks | none` 这一窄接口，具体模型由外部提供

use std::future::Future;

use crate::error::DetectorError;
use crate::models::{FaceLandmarks, Frame};

/// 关键点检测器
pub trait LandmarkDetector: Send {
    /// 加载模型；采集开始前必须成功
    fn load(&mut self) -> impl Future<Output = Result<(), DetectorError>> + Send;

    /// 检测一帧中的人脸关键点，没有人脸时返回 None
    fn detect(&self, frame: &Frame) -> Option<FaceLandmarks>;
}
