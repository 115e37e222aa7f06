//! # Proctor Session
//!
//! 在线监考会话：考场完整性监控 + 多角度人脸采集
//!
//! ## 架构设计
//!
//! 本系统采用分层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（摄像头、时钟、宿主环境），只暴露能力
//! - `CameraGate` - 摄像头独占租约，释放即停止视频流
//! - `Clock` - 可替换的时间来源，测试中可手动推进
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 每个服务只负责一件事
//! - `IntegrityMonitor` - 环境信号 → 违规记录 → 升级处理
//! - `SessionClock` / `AnswerState` / `NavigationController` - 计时、作答与导航
//! - `HeadPoseEstimator` / `AngleWindows` - 头部姿态估计与角度门限
//!
//! ### ③ 流程层（Workflow）
//! - `ProctoredSession` - 一场考试的完整生命周期（同意 → 作答 → 交卷 → 清理）
//! - `CaptureSequencer` - 正/左/右/上四个角度的采集流程
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/session_runner` - 驱动会话的事件循环
//! - `orchestrator/submission_dispatcher` - 交卷投递
//! - `orchestrator/app` - 命令行程序入口
//!
//! ## 模块结构

pub mod clients;
pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::{ExamDefinition, SubmissionPayload};
pub use orchestrator::{capture_and_verify, App, SessionReport, SessionRunner};
pub use workflow::{CaptureSequencer, ProctoredSession};
