//! 交卷投递 - 编排层
//!
//! 从发件箱取出交卷数据交给阅卷服务；重试由客户端负责，这里只做统计

use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::clients::GradingClient;
use crate::models::SubmissionPayload;

/// 投递统计
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchStats {
    pub delivered: usize,
    /// 阅卷服务收到但不接受
    pub rejected: usize,
    pub failed: usize,
}

/// 交卷投递任务
pub struct SubmissionDispatcher<G: GradingClient> {
    client: G,
    outbox: mpsc::UnboundedReceiver<SubmissionPayload>,
}

impl<G: GradingClient> SubmissionDispatcher<G> {
    pub fn new(client: G, outbox: mpsc::UnboundedReceiver<SubmissionPayload>) -> Self {
        Self { client, outbox }
    }

    /// 运行到发件箱的所有发送端都关闭
    pub async fn run(mut self) -> DispatchStats {
        let mut stats = DispatchStats::default();

        while let Some(payload) = self.outbox.recv().await {
            match self.client.submit(&payload).await {
                Ok(receipt) if receipt.accepted => {
                    info!("[场次 {}] ✅ 交卷已送达阅卷服务", payload.exam_id);
                    stats.delivered += 1;
                }
                Ok(receipt) => {
                    warn!(
                        "[场次 {}] ⚠️ 阅卷服务未接受交卷: {}",
                        payload.exam_id,
                        receipt.message.unwrap_or_default()
                    );
                    stats.rejected += 1;
                }
                Err(e) => {
                    error!("[场次 {}] ❌ 交卷投递失败: {}", payload.exam_id, e);
                    stats.failed += 1;
                }
            }
        }

        stats
    }
}
