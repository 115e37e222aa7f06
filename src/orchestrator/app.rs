//! 应用入口 - 编排层
//!
//! 加载试卷、开考前身份核验、装配会话与交卷投递任务、接上命令行输入

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;

use crate::clients::{HttpGradingClient, HttpIdentityVerifier};
use crate::config::Config;
use crate::infrastructure::{CameraDevice, CameraGate, HeadlessEnvironment, TokioClock};
use crate::models::{ExamDefinition, ExamSource, TomlExamSource, VerificationReceipt};
use crate::orchestrator::console;
use crate::orchestrator::identity_check::capture_and_verify;
use crate::orchestrator::session_runner::{SessionReport, SessionRunner};
use crate::orchestrator::submission_dispatcher::SubmissionDispatcher;
use crate::services::{LandmarkDetector, SubmissionOutbox, ViolationLog};
use crate::utils::logging::{log_session_summary, log_startup};
use crate::workflow::{CancelToken, CaptureSequencer, ProctoredSession};

/// 应用主结构
pub struct App {
    config: Config,
    exam: Arc<ExamDefinition>,
    camera_gate: CameraGate,
}

impl App {
    /// 初始化应用：打印启动信息并加载试卷
    pub async fn initialize(config: Config) -> Result<Self> {
        log_startup(&config);

        let source = TomlExamSource::new(&config.exam_folder);
        let exam = source
            .load_exam(&config.exam_id)
            .await
            .with_context(|| format!("无法加载试卷 {}", config.exam_id))?;
        info!(
            "✓ 已加载试卷: {} ({}) | {} 个科目 | {} 题",
            exam.title,
            exam.code,
            exam.subject_count(),
            exam.total_questions()
        );

        Ok(Self {
            config,
            exam: Arc::new(exam),
            camera_gate: CameraGate::new(),
        })
    }

    /// 开考前身份核验：按配置采集四个角度并提交核验服务
    ///
    /// 采集被取消时返回 None
    pub async fn verify_identity<C, D>(
        &self,
        camera: C,
        detector: D,
        token: &mut CancelToken,
    ) -> Result<Option<VerificationReceipt>>
    where
        C: CameraDevice,
        D: LandmarkDetector,
    {
        let mut sequencer = CaptureSequencer::from_config(
            &self.config,
            camera,
            detector,
            self.camera_gate.clone(),
            Arc::new(TokioClock::new()),
        );
        let verifier = HttpIdentityVerifier::new(&self.config);
        let receipt = capture_and_verify(&self.exam.id, &mut sequencer, token, &verifier)
            .await
            .with_context(|| format!("[场次 {}] 身份核验失败", self.exam.id))?;
        if let Some(receipt) = &receipt {
            info!(
                "[场次 {}] 🪪 身份核验结果: accepted={}",
                self.exam.id, receipt.accepted
            );
        }
        Ok(receipt)
    }

    /// 运行一场考试直到结束，并等待交卷投递完成
    pub async fn run(self) -> Result<SessionReport> {
        let (outbox, outbox_rx) = SubmissionOutbox::channel();
        let dispatcher = SubmissionDispatcher::new(HttpGradingClient::new(&self.config), outbox_rx);
        let dispatch_task = tokio::spawn(dispatcher.run());

        let settings = self
            .config
            .session_settings()
            .context("受限按键配置无效")?;
        let session = ProctoredSession::new(
            self.exam.clone(),
            settings,
            outbox,
            Box::new(HeadlessEnvironment),
            Arc::new(TokioClock::new()),
        )?;

        let (command_tx, command_rx) = mpsc::channel(32);
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        // 读取线程在进程退出时随之结束，不需要 join
        let _reader = console::spawn_stdin_reader(command_tx, signal_tx);

        let report = SessionRunner::new(session, signal_rx, command_rx)
            .with_violation_log(ViolationLog::with_path(
                &self.config.violation_log_file,
                &self.exam.id,
            ))
            .run()
            .await?;

        // 会话已 drop，发件箱关闭后投递任务自然结束
        let stats = dispatch_task.await.context("交卷投递任务异常退出")?;
        log_session_summary(&report, &stats, &self.config.violation_log_file);

        Ok(report)
    }
}
