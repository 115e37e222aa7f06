//! 开考前身份核验 - 编排层
//!
//! 采集四个角度的人脸照片后交给身份核验服务

use tracing::info;

use crate::clients::IdentityVerifier;
use crate::error::AppResult;
use crate::infrastructure::CameraDevice;
use crate::models::VerificationReceipt;
use crate::services::LandmarkDetector;
use crate::workflow::{CancelToken, CaptureSequencer};

/// 执行采集并提交核验
///
/// 采集被取消时返回 None；摄像头、模型错误原样返回，调用方可以再次调用以继续采集
pub async fn capture_and_verify<C, D, V>(
    exam_id: &str,
    sequencer: &mut CaptureSequencer<C, D>,
    token: &mut CancelToken,
    verifier: &V,
) -> AppResult<Option<VerificationReceipt>>
where
    C: CameraDevice,
    D: LandmarkDetector,
    V: IdentityVerifier,
{
    let outcome = sequencer.run(token).await?;
    if !outcome.is_complete() {
        info!(
            "[场次 {}] 身份核验未提交：采集已取消 ({} 张照片)",
            exam_id,
            outcome.artifacts().len()
        );
        return Ok(None);
    }

    let artifacts = outcome.into_verified_set(sequencer.required_angles())?;
    let receipt = verifier.verify(exam_id, &artifacts).await?;
    Ok(Some(receipt))
}
