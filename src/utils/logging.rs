/// 日志工具模块
///
/// 提供日志初始化、格式化和输出的辅助函数
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::orchestrator::{DispatchStats, SessionReport};

/// 初始化日志输出
///
/// 优先使用 `RUST_LOG`；未设置时默认 info，详细模式下为 debug
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 监考会话启动");
    info!("📄 试卷: {}/{}.toml", config.exam_folder, config.exam_id);
    info!("💻 设备类型: {}", config.device_class);
    info!(
        "⏱️ 违规宽限期: 桌面 {}ms / 移动 {}ms",
        config.desktop_grace_ms, config.mobile_grace_ms
    );
    info!("{}", "=".repeat(60));
}

/// 打印会话结束统计
pub fn log_session_summary(report: &SessionReport, stats: &DispatchStats, log_file_path: &str) {
    info!("\n{}", "=".repeat(60));
    info!("📊 [场次 {}] 会话结束统计", report.exam_id);
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!(
        "阶段: {} | 原因: {}",
        report.phase,
        report
            .reason
            .map(|r| r.to_string())
            .unwrap_or_else(|| "未交卷".to_string())
    );
    if let Some(payload) = &report.payload {
        info!(
            "✅ 已答 {} 题 | 用时 {} 秒",
            payload.answered_count, payload.time_spent
        );
        if !report.handed_off {
            warn!("⚠️ 交卷数据未进入发件箱，本次提交没有送出");
        }
    }
    info!("🚨 违规次数: {}", report.violations.len());
    info!(
        "📤 交卷投递: 送达 {} | 拒收 {} | 失败 {}",
        stats.delivered, stats.rejected, stats.failed
    );
    info!("{}", "=".repeat(60));
    if !report.violations.is_empty() {
        info!("\n违规记录已保存至: {}", log_file_path);
    }
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度（字符数）
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
