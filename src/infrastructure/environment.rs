//! 运行环境 - 基础设施层
//!
//! 平台事件（全屏、可见性、按键）通过 `EnvironmentSignalSource` 注入，
//! 全屏与监考画面通过 `EnvironmentControl` 控制

use std::future::Future;
use tokio::sync::mpsc;

use crate::models::EnvironmentSignal;

/// 环境信号来源
pub trait EnvironmentSignalSource: Send {
    /// 下一条信号；来源关闭时返回 None
    fn next_signal(&mut self) -> impl Future<Output = Option<EnvironmentSignal>> + Send;
}

impl EnvironmentSignalSource for mpsc::Receiver<EnvironmentSignal> {
    async fn next_signal(&mut self) -> Option<EnvironmentSignal> {
        self.recv().await
    }
}

impl EnvironmentSignalSource for mpsc::UnboundedReceiver<EnvironmentSignal> {
    async fn next_signal(&mut self) -> Option<EnvironmentSignal> {
        self.recv().await
    }
}

/// 会话对运行环境的控制能力
pub trait EnvironmentControl: Send {
    fn request_fullscreen(&mut self);
    fn exit_fullscreen(&mut self);
    /// 关闭监考画面占用的摄像头
    fn release_camera(&mut self);
}

/// 无界面环境（命令行、测试）
#[derive(Debug, Default, Clone, Copy)]
pub struct HeadlessEnvironment;

impl EnvironmentControl for HeadlessEnvironment {
    fn request_fullscreen(&mut self) {}
    fn exit_fullscreen(&mut self) {}
    fn release_camera(&mut self) {}
}
