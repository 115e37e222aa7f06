//! 身份核验服务客户端
//!
//! 把四个角度的人脸照片以 base64 JSON 提交，比对与活体判断都由服务端完成

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::future::Future;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{ApiError, AppError, AppResult, CaptureError};
use crate::models::{FaceAngle, ImageArtifact, VerificationReceipt};

/// 身份核验服务
pub trait IdentityVerifier: Send + Sync {
    /// 提交完整的照片集
    fn verify(
        &self,
        exam_id: &str,
        artifacts: &[ImageArtifact],
    ) -> impl Future<Output = AppResult<VerificationReceipt>> + Send;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VerificationImage {
    angle: FaceAngle,
    captured_at: DateTime<Utc>,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VerificationRequest {
    exam_id: String,
    images: Vec<VerificationImage>,
}

/// 按采集顺序组装请求，缺少任一角度时报错
fn build_request(exam_id: &str, artifacts: &[ImageArtifact]) -> Result<VerificationRequest, CaptureError> {
    let mut images = Vec::with_capacity(FaceAngle::SEQUENCE.len());
    let mut missing = Vec::new();
    for angle in FaceAngle::SEQUENCE {
        match artifacts.iter().find(|a| a.angle == angle) {
            Some(artifact) => images.push(VerificationImage {
                angle,
                captured_at: artifact.captured_at,
                data: STANDARD.encode(&artifact.data),
            }),
            None => missing.push(angle),
        }
    }

    if !missing.is_empty() {
        return Err(CaptureError::Incomplete { missing });
    }
    Ok(VerificationRequest {
        exam_id: exam_id.to_string(),
        images,
    })
}

/// 基于 HTTP JSON 的身份核验客户端
pub struct HttpIdentityVerifier {
    http: reqwest::Client,
    endpoint: String,
    token: Option<String>,
}

impl HttpIdentityVerifier {
    pub fn new(config: &Config) -> Self {
        Self::with_endpoint(config.verification_api_url.clone(), config.api_token().map(str::to_string))
    }

    pub fn with_endpoint(endpoint: impl Into<String>, token: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
            token,
        }
    }
}

impl IdentityVerifier for HttpIdentityVerifier {
    async fn verify(&self, exam_id: &str, artifacts: &[ImageArtifact]) -> AppResult<VerificationReceipt> {
        let request_body = build_request(exam_id, artifacts)?;
        debug!(
            "提交身份核验: 考试 {} | {} 张照片",
            exam_id,
            request_body.images.len()
        );

        let mut request = self.http.post(&self.endpoint).json(&request_body);
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

        let receipt: VerificationReceipt = serde_json::from_str(&body)?;
        info!(
            "🪪 身份核验已提交: 考试 {} (accepted={})",
            exam_id, receipt.accepted
        );
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::test_server::{serve, Reply};
    use crate::models::Frame;

    fn artifacts(angles: &[FaceAngle]) -> Vec<ImageArtifact> {
        angles
            .iter()
            .map(|angle| {
                ImageArtifact::new(
                    Frame {
                        data: vec![0xFF, 0xD8, 0xFF],
                        width: 1,
                        height: 1,
                    },
                    *angle,
                    DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap(),
                )
            })
            .collect()
    }

    #[test]
    fn request_lists_angles_in_capture_order() {
        let mut shuffled = artifacts(&FaceAngle::SEQUENCE);
        shuffled.reverse();

        let request = build_request("exam-001", &shuffled).unwrap();
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["examId"], "exam-001");
        assert_eq!(json["images"][0]["angle"], "front");
        assert_eq!(json["images"][3]["angle"], "up");
        assert_eq!(json["images"][1]["data"], "/9j/");
    }

    #[test]
    fn missing_angles_are_rejected_before_sending() {
        let err = build_request("exam-001", &artifacts(&[FaceAngle::Front, FaceAngle::Up])).unwrap_err();
        assert_eq!(
            err,
            CaptureError::Incomplete {
                missing: vec![FaceAngle::Left, FaceAngle::Right]
            }
        );
    }

    #[tokio::test]
    async fn posts_images_and_parses_receipt() {
        let server = serve(vec![Reply::new(200, r#"{"accepted":true,"reference":"v-42"}"#)]).await;
        let config = Config {
            verification_api_url: server.url("/verify"),
            api_token: "t0k".into(),
            ..Config::default()
        };
        let verifier = HttpIdentityVerifier::new(&config);

        let receipt = verifier
            .verify("exam-001", &artifacts(&FaceAngle::SEQUENCE))
            .await
            .unwrap();
        assert_eq!(receipt.reference.as_deref(), Some("v-42"));

        let requests = server.requests();
        assert!(requests[0].to_ascii_lowercase().contains("authorization: bearer t0k"));
        assert!(requests[0].contains("\"angle\":\"right\""));
    }
}
