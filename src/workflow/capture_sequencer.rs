//! 人脸多角度采集流程 - 流程层
//!
//! 流程：加载关键点模型 → 获取摄像头 → 按固定间隔采样 → 去抖 → 拍照 → 停顿 → 下一个角度
//!
//! 摄像头只在 `run` 内部持有，任何退出路径（完成、取消、出错）都会释放

use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{AppResult, CaptureError, DetectorError};
use crate::infrastructure::{CameraDevice, CameraGate, CameraLease, Clock};
use crate::models::{FaceAngle, ImageArtifact};
use crate::services::{HeadPoseEstimator, LandmarkDetector};
use crate::workflow::capture_session::{CaptureConfig, CaptureSession, SampleVerdict};

/// 取消句柄（发起方持有）
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

/// 取消令牌（采集流程持有）
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// 等待取消；句柄全部 drop 且从未取消时永远挂起
    pub async fn cancelled(&mut self) {
        let result = self.rx.wait_for(|cancelled| *cancelled).await.map(|_| ());
        if result.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// 创建一对取消句柄与令牌
pub fn cancel_pair() -> (CancelHandle, CancelToken) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx: Arc::new(tx) }, CancelToken { rx })
}

/// 采集进度事件，用于给考生显示引导
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureProgress {
    /// 正在等待某个角度稳定
    Sampling {
        angle: FaceAngle,
        consecutive: u32,
        required: u32,
        hint: &'static str,
    },
    /// 某个角度已拍下
    Captured {
        angle: FaceAngle,
        captured: Vec<FaceAngle>,
    },
    Completed,
    Cancelled {
        captured: Vec<FaceAngle>,
    },
}

/// 一次 `run` 的结果
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureOutcome {
    /// 全部角度采集完成，按采集顺序排列
    Completed(Vec<ImageArtifact>),
    /// 被取消，保留已采集的照片
    Cancelled { captured: Vec<ImageArtifact> },
}

impl CaptureOutcome {
    pub fn is_complete(&self) -> bool {
        matches!(self, CaptureOutcome::Completed(_))
    }

    pub fn artifacts(&self) -> &[ImageArtifact] {
        match self {
            CaptureOutcome::Completed(artifacts) => artifacts,
            CaptureOutcome::Cancelled { captured } => captured,
        }
    }

    /// 取出可提交核验的完整照片集，缺少任一角度时报错
    pub fn into_verified_set(self, required: &[FaceAngle]) -> Result<Vec<ImageArtifact>, CaptureError> {
        let artifacts = match self {
            CaptureOutcome::Completed(artifacts) => artifacts,
            CaptureOutcome::Cancelled { captured } => captured,
        };
        let missing: Vec<FaceAngle> = required
            .iter()
            .filter(|angle| !artifacts.iter().any(|a| a.angle == **angle))
            .copied()
            .collect();
        if missing.is_empty() {
            Ok(artifacts)
        } else {
            Err(CaptureError::Incomplete { missing })
        }
    }
}

/// 采集流程
///
/// 采集进度保存在流程内部：摄像头或模型出错后可以再次调用 `run` 从当前角度继续
pub struct CaptureSequencer<C: CameraDevice, D: LandmarkDetector> {
    camera: C,
    detector: D,
    detector_ready: bool,
    gate: CameraGate,
    estimator: HeadPoseEstimator,
    config: CaptureConfig,
    session: CaptureSession,
    clock: Arc<dyn Clock>,
    progress: Option<mpsc::UnboundedSender<CaptureProgress>>,
}

impl<C: CameraDevice, D: LandmarkDetector> CaptureSequencer<C, D> {
    pub fn new(
        camera: C,
        detector: D,
        gate: CameraGate,
        estimator: HeadPoseEstimator,
        config: CaptureConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let session = CaptureSession::new(&config);
        Self {
            camera,
            detector,
            detector_ready: false,
            gate,
            estimator,
            config,
            session,
            clock,
            progress: None,
        }
    }

    /// 按程序配置创建：姿态标定与采集参数都取自 `Config`
    pub fn from_config(
        config: &Config,
        camera: C,
        detector: D,
        gate: CameraGate,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self::new(
            camera,
            detector,
            gate,
            HeadPoseEstimator::new(config.pose_calibration()),
            config.capture_config(),
            clock,
        )
    }

    /// 订阅进度事件
    pub fn with_progress(mut self, tx: mpsc::UnboundedSender<CaptureProgress>) -> Self {
        self.progress = Some(tx);
        self
    }

    pub fn session(&self) -> &CaptureSession {
        &self.session
    }

    pub fn required_angles(&self) -> &[FaceAngle] {
        &self.config.sequence
    }

    fn emit(&self, event: CaptureProgress) {
        if let Some(tx) = &self.progress {
            let _ = tx.send(event);
        }
    }

    fn cancelled_outcome(&mut self) -> CaptureOutcome {
        self.session.cancel();
        let captured = self.session.artifacts();
        let angles: Vec<FaceAngle> = captured.iter().map(|a| a.angle).collect();
        info!("🛑 人脸采集已取消，保留 {} 张照片", captured.len());
        self.emit(CaptureProgress::Cancelled { captured: angles });
        CaptureOutcome::Cancelled { captured }
    }

    fn completed_outcome(&mut self) -> CaptureOutcome {
        info!("✅ 人脸采集完成 ({} 个角度)", self.config.sequence.len());
        self.emit(CaptureProgress::Completed);
        CaptureOutcome::Completed(self.session.artifacts())
    }

    async fn ensure_detector_loaded(&mut self) -> Result<(), DetectorError> {
        if self.detector_ready {
            return Ok(());
        }

        let timeout = self.config.detector_load_timeout;
        debug!("加载关键点模型 (超时 {}ms)", timeout.as_millis());
        match tokio::time::timeout(timeout, self.detector.load()).await {
            Ok(Ok(())) => {
                self.detector_ready = true;
                info!("✓ 关键点模型已加载");
                Ok(())
            }
            Ok(Err(e)) => {
                warn!("❌ 关键点模型加载失败: {}", e);
                Err(e)
            }
            Err(_) => {
                let err = DetectorError::LoadTimeout {
                    timeout_ms: timeout.as_millis() as u64,
                };
                warn!("❌ {}", err);
                Err(err)
            }
        }
    }

    /// 执行（或继续）采集
    ///
    /// 摄像头、模型错误直接返回，已采集的角度不受影响；模型加载期间同样响应取消
    pub async fn run(&mut self, token: &mut CancelToken) -> AppResult<CaptureOutcome> {
        if self.session.is_cancelled() || token.is_cancelled() {
            return Ok(self.cancelled_outcome());
        }
        if self.session.is_complete() {
            return Ok(self.completed_outcome());
        }

        let loaded = tokio::select! {
            biased;
            _ = token.cancelled() => None,
            result = self.ensure_detector_loaded() => Some(result),
        };
        match loaded {
            None => return Ok(self.cancelled_outcome()),
            Some(result) => result.map_err(CaptureError::from)?,
        }

        let mut lease = self
            .gate
            .acquire(&mut self.camera)
            .map_err(CaptureError::from)?;
        info!(
            "📷 开始人脸采集 (第 {}/{} 个角度)",
            self.session.current_index() + 1,
            self.config.sequence.len()
        );

        let result = self.sample_until_done(&mut lease, token).await;
        lease.release();
        result
    }

    async fn sample_until_done(
        &mut self,
        lease: &mut CameraLease<C::Stream>,
        token: &mut CancelToken,
    ) -> AppResult<CaptureOutcome> {
        let mut ticker = tokio::time::interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if self.session.is_complete() {
                return Ok(self.completed_outcome());
            }

            tokio::select! {
                biased;
                _ = token.cancelled() => return Ok(self.cancelled_outcome()),
                _ = ticker.tick() => {}
            }

            let frame = lease.read_frame().map_err(CaptureError::from)?;
            let pose = self
                .detector
                .detect(&frame)
                .and_then(|marks| self.estimator.estimate(&marks));

            match self.session.observe(pose) {
                SampleVerdict::Ready(angle) => {
                    let artifact = ImageArtifact::new(frame, angle, self.clock.wall_now());
                    if !self.session.record_capture(artifact) {
                        self.session.abort_capture();
                        continue;
                    }
                    info!("📸 已采集 {} 角度", angle);
                    self.emit(CaptureProgress::Captured {
                        angle,
                        captured: self.session.captured_angles(),
                    });

                    if !self.session.is_complete() {
                        tokio::select! {
                            biased;
                            _ = token.cancelled() => return Ok(self.cancelled_outcome()),
                            _ = tokio::time::sleep(self.config.settle_pause) => {}
                        }
                        ticker.reset();
                    }
                }
                SampleVerdict::Hold {
                    consecutive,
                    required,
                } => {
                    if let Some(angle) = self.session.current_angle() {
                        self.emit(CaptureProgress::Sampling {
                            angle,
                            consecutive,
                            required,
                            hint: angle.hint(),
                        });
                    }
                }
                SampleVerdict::Miss => {
                    if let Some(angle) = self.session.current_angle() {
                        self.emit(CaptureProgress::Sampling {
                            angle,
                            consecutive: 0,
                            required: self.session.required_consecutive(),
                            hint: angle.hint(),
                        });
                    }
                }
                SampleVerdict::Ignored => {}
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::fakes::*;
    use super::*;
    use crate::error::{AppError, CameraError};
    use crate::infrastructure::camera::fakes::FakeCamera;
    use crate::infrastructure::TokioClock;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    fn sequencer(
        camera: FakeCamera,
        detector: ScriptedDetector,
        gate: CameraGate,
    ) -> CaptureSequencer<FakeCamera, ScriptedDetector> {
        CaptureSequencer::new(
            camera,
            detector,
            gate,
            HeadPoseEstimator::default(),
            CaptureConfig::default(),
            Arc::new(TokioClock::new()),
        )
    }

    fn full_script() -> Vec<Option<(f64, f64)>> {
        [hold(FRONT, 4), hold(LEFT, 4), hold(RIGHT, 4), hold(UP, 4)].concat()
    }

    #[tokio::test(start_paused = true)]
    async fn captures_every_angle_in_order_and_releases_camera() {
        let camera = FakeCamera::default();
        let gate = CameraGate::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut seq = sequencer(camera.clone(), ScriptedDetector::new(full_script()), gate.clone())
            .with_progress(tx);
        let (_handle, mut token) = cancel_pair();

        let outcome = seq.run(&mut token).await.unwrap();

        let artifacts = outcome.clone().into_verified_set(&FaceAngle::SEQUENCE).unwrap();
        let angles: Vec<_> = artifacts.iter().map(|a| a.angle).collect();
        assert_eq!(angles, FaceAngle::SEQUENCE.to_vec());
        // 每个角度用第 4 个合格样本的画面
        let frames: Vec<_> = artifacts.iter().map(|a| a.data.clone()).collect();
        assert_eq!(frames, vec![vec![4], vec![8], vec![12], vec![16]]);

        assert_eq!(camera.opened.load(Ordering::SeqCst), 1);
        assert_eq!(camera.stopped.load(Ordering::SeqCst), 1);
        assert!(gate.is_free());

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        assert!(events.contains(&CaptureProgress::Sampling {
            angle: FaceAngle::Left,
            consecutive: 2,
            required: 4,
            hint: "请向左转头",
        }));
        assert_eq!(events.last(), Some(&CaptureProgress::Completed));
    }

    #[tokio::test(start_paused = true)]
    async fn interrupted_streak_delays_the_capture() {
        let mut script = vec![
            Some(FRONT),
            Some(FRONT),
            Some(FRONT),
            Some((15.0, 0.0)),
            Some(FRONT),
            Some(FRONT),
            Some(FRONT),
            Some(FRONT),
        ];
        script.extend([hold(LEFT, 4), hold(RIGHT, 4), hold(UP, 4)].concat());
        let mut seq = sequencer(
            FakeCamera::default(),
            ScriptedDetector::new(script),
            CameraGate::new(),
        );
        let (_handle, mut token) = cancel_pair();

        let outcome = seq.run(&mut token).await.unwrap();
        assert!(outcome.is_complete());
        assert_eq!(outcome.artifacts()[0].data, vec![8]);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_keeps_captured_and_stops_camera() {
        let camera = FakeCamera::default();
        let gate = CameraGate::new();
        // 正脸之后再也检测不到人脸
        let mut seq = sequencer(camera.clone(), ScriptedDetector::new(hold(FRONT, 4)), gate.clone());
        let (handle, mut token) = cancel_pair();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(3)).await;
            handle.cancel();
        });

        let outcome = seq.run(&mut token).await.unwrap();
        match outcome {
            CaptureOutcome::Cancelled { captured } => {
                assert_eq!(captured.len(), 1);
                assert_eq!(captured[0].angle, FaceAngle::Front);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(camera.stopped.load(Ordering::SeqCst), 1);
        assert!(gate.is_free());

        // 取消是终态
        assert!(matches!(
            seq.run(&mut token).await.unwrap(),
            CaptureOutcome::Cancelled { .. }
        ));
        assert_eq!(camera.opened.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn detector_timeout_blocks_before_camera_is_opened() {
        let camera = FakeCamera::default();
        let detector = ScriptedDetector {
            load_delay: Some(Duration::from_secs(60)),
            ..ScriptedDetector::new(full_script())
        };
        let mut seq = sequencer(camera.clone(), detector, CameraGate::new());
        let (_handle, mut token) = cancel_pair();

        let err = seq.run(&mut token).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Capture(CaptureError::Detector(DetectorError::LoadTimeout { timeout_ms: 15000 }))
        ));
        assert_eq!(camera.opened.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_during_detector_load_returns_promptly() {
        let camera = FakeCamera::default();
        let gate = CameraGate::new();
        let detector = ScriptedDetector {
            load_delay: Some(Duration::from_secs(10)),
            ..ScriptedDetector::new(full_script())
        };
        let mut seq = sequencer(camera.clone(), detector, gate.clone());
        let (handle, mut token) = cancel_pair();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            handle.cancel();
        });

        let started = tokio::time::Instant::now();
        let outcome = seq.run(&mut token).await.unwrap();
        assert!(started.elapsed() <= Duration::from_secs(2));
        assert!(matches!(outcome, CaptureOutcome::Cancelled { ref captured } if captured.is_empty()));
        assert_eq!(camera.opened.load(Ordering::SeqCst), 0);
        assert!(gate.is_free());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_during_settle_pause_stops_sampling() {
        let camera = FakeCamera::default();
        let gate = CameraGate::new();
        let mut seq = sequencer(camera.clone(), ScriptedDetector::new(full_script()), gate.clone());
        let (handle, mut token) = cancel_pair();

        // 正脸在第 4 帧 (360ms) 拍下，随后停顿 800ms
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(700)).await;
            handle.cancel();
        });

        let started = tokio::time::Instant::now();
        let outcome = seq.run(&mut token).await.unwrap();
        assert!(started.elapsed() < Duration::from_millis(1_160));
        match outcome {
            CaptureOutcome::Cancelled { captured } => {
                assert_eq!(captured.len(), 1);
                assert_eq!(captured[0].angle, FaceAngle::Front);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(camera.frames.load(Ordering::SeqCst), 4);
        assert_eq!(camera.stopped.load(Ordering::SeqCst), 1);
        assert!(gate.is_free());
    }

    #[tokio::test(start_paused = true)]
    async fn frame_failure_releases_camera_and_run_resumes() {
        let camera = FakeCamera {
            fail_at: Some(6),
            ..Default::default()
        };
        let gate = CameraGate::new();
        // 第 5 帧无人脸，第 6 帧读取失败，恢复后从第 7 帧开始左转
        let script = [
            hold(FRONT, 4),
            vec![None, None],
            hold(LEFT, 4),
            hold(RIGHT, 4),
            hold(UP, 4),
        ]
        .concat();
        let mut seq = sequencer(camera.clone(), ScriptedDetector::new(script), gate.clone());
        let (_handle, mut token) = cancel_pair();

        let err = seq.run(&mut token).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Capture(CaptureError::Camera(CameraError::FrameFailed(_)))
        ));
        assert!(err_is_recoverable(&err));
        assert_eq!(camera.stopped.load(Ordering::SeqCst), 1);
        assert!(gate.is_free());
        assert_eq!(seq.session().captured_angles(), vec![FaceAngle::Front]);
        assert_eq!(seq.session().current_angle(), Some(FaceAngle::Left));

        let outcome = seq.run(&mut token).await.unwrap();
        let frames: Vec<_> = outcome.artifacts().iter().map(|a| a.data.clone()).collect();
        assert_eq!(frames, vec![vec![4], vec![10], vec![14], vec![18]]);
        assert_eq!(camera.opened.load(Ordering::SeqCst), 2);
        assert_eq!(camera.stopped.load(Ordering::SeqCst), 2);
        assert!(gate.is_free());
    }

    fn err_is_recoverable(err: &AppError) -> bool {
        match err {
            AppError::Capture(CaptureError::Camera(e)) => e.is_recoverable(),
            _ => false,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn busy_camera_is_recoverable_and_run_can_be_retried() {
        let gate = CameraGate::new();
        let mut other = FakeCamera::default();
        let held = gate.acquire(&mut other).unwrap();

        let detector = ScriptedDetector {
            load_error: Some(DetectorError::LoadFailed("network".into())),
            ..ScriptedDetector::new(full_script())
        };
        let mut seq = sequencer(FakeCamera::default(), detector, gate.clone());
        let (_handle, mut token) = cancel_pair();

        let err = seq.run(&mut token).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Capture(CaptureError::Detector(DetectorError::LoadFailed(_)))
        ));

        let err = seq.run(&mut token).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Capture(CaptureError::Camera(CameraError::Busy))
        ));

        drop(held);
        assert!(seq.run(&mut token).await.unwrap().is_complete());
    }

    #[test]
    fn partial_set_is_rejected_for_verification() {
        let outcome = CaptureOutcome::Cancelled { captured: vec![] };
        let err = outcome.into_verified_set(&FaceAngle::SEQUENCE).unwrap_err();
        assert_eq!(
            err,
            CaptureError::Incomplete {
                missing: FaceAngle::SEQUENCE.to_vec()
            }
        );
    }
}
