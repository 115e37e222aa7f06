//! 编排层（Orchestration Layer）
//!
//! 只做调度和统计，不做具体业务判断
//!
//! ```text
//! app (装配 + 生命周期)
//!     ├── console (标准输入 → 命令 / 环境信号)
//!     ├── session_runner (select! 驱动 ProctoredSession)
//!     ├── submission_dispatcher (发件箱 → 阅卷服务)
//!     └── identity_check (CaptureSequencer → 身份核验服务)
//!     ↓
//! workflow → services → infrastructure
//! ```

pub mod app;
pub mod console;
pub mod identity_check;
pub mod session_runner;
pub mod submission_dispatcher;

pub use app::App;
pub use identity_check::capture_and_verify;
pub use session_runner::{SessionCommand, SessionReport, SessionRunner};
pub use submission_dispatcher::{DispatchStats, SubmissionDispatcher};
