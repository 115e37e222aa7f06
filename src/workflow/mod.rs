//! 流程层
//!
//! - `exam_session` - 一场考试：作答、导航、计时、监控、交卷
//! - `capture_session` / `capture_sequencer` - 一次多角度人脸采集

pub mod capture_sequencer;
pub mod capture_session;
pub mod exam_session;

pub use capture_sequencer::{
    cancel_pair, CancelHandle, CancelToken, CaptureOutcome, CaptureProgress, CaptureSequencer,
};
pub use capture_session::{CaptureConfig, CaptureSession, SampleVerdict};
pub use exam_session::{ProctoredSession, SessionSettings};
