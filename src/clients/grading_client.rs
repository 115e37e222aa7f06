//! 阅卷服务客户端
//!
//! 只关心"收到 / 没收到"，不解读阅卷结果；失败按次数重试

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{ApiError, AppError, AppResult};
use crate::models::{GradingReceipt, SubmissionPayload};

/// 阅卷服务
pub trait GradingClient: Send + Sync {
    /// 提交一份交卷数据，返回阅卷服务的回执
    fn submit(
        &self,
        payload: &SubmissionPayload,
    ) -> impl Future<Output = AppResult<GradingReceipt>> + Send;
}

/// 基于 HTTP JSON 的阅卷服务客户端
pub struct HttpGradingClient {
    http: reqwest::Client,
    endpoint: String,
    token: Option<String>,
    max_retries: usize,
    retry_delay: Duration,
}

impl HttpGradingClient {
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: config.grading_api_url.clone(),
            token: config.api_token().map(str::to_string),
            max_retries: config.submit_max_retries.max(1),
            retry_delay: Duration::from_secs(2),
        }
    }

    /// 指定地址与重试次数，主要用于测试
    pub fn with_endpoint(endpoint: impl Into<String>, max_retries: usize, retry_delay: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
            token: None,
            max_retries: max_retries.max(1),
            retry_delay,
        }
    }

    async fn post_once(&self, payload: &SubmissionPayload) -> AppResult<GradingReceipt> {
        let mut request = self.http.post(&self.endpoint).json(payload);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::api_request_failed(&self.endpoint, e))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::api_request_failed(&self.endpoint, e))?;

        if !status.is_success() {
            return Err(ApiError::BadResponse {
                endpoint: self.endpoint.clone(),
                status: status.as_u16(),
                message: Some(body).filter(|b| !b.is_empty()),
            }
            .into());
        }

        // 部分阅卷服务成功时不返回正文
        if body.trim().is_empty() {
            return Ok(GradingReceipt {
                accepted: true,
                message: None,
            });
        }
        Ok(serde_json::from_str(&body)?)
    }
}

/// 4xx（除请求超时与限流）说明请求本身有问题，重试无意义
fn is_retryable(err: &AppError) -> bool {
    match err {
        AppError::Api(ApiError::BadResponse { status, .. }) => {
            !(400..500).contains(status) || *status == 408 || *status == 429
        }
        AppError::Api(ApiError::JsonParseFailed { .. }) => false,
        _ => true,
    }
}

impl GradingClient for HttpGradingClient {
    async fn submit(&self, payload: &SubmissionPayload) -> AppResult<GradingReceipt> {
        for attempt in 1..=self.max_retries {
            debug!(
                "提交交卷数据: 考试 {} (第 {}/{} 次)",
                payload.exam_id, attempt, self.max_retries
            );
            match self.post_once(payload).await {
                Ok(receipt) => {
                    info!(
                        "✓ 阅卷服务已接收考试 {} 的交卷 (accepted={})",
                        payload.exam_id, receipt.accepted
                    );
                    return Ok(receipt);
                }
                Err(e) if !is_retryable(&e) => {
                    warn!("❌ 交卷被拒绝，不再重试: {}", e);
                    return Err(e);
                }
                Err(e) => {
                    warn!(
                        "交卷提交失败 ({}/{}): {}",
                        attempt, self.max_retries, e
                    );
                    if attempt < self.max_retries {
                        sleep(self.retry_delay * attempt as u32).await;
                    }
                }
            }
        }

        Err(ApiError::RetriesExhausted {
            endpoint: self.endpoint.clone(),
            attempts: self.max_retries,
        }
        .into())
    }
}
