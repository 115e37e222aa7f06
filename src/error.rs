use thiserror::Error;

use crate::models::{FaceAngle, QuestionKey, SessionPhase};

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 考试会话错误
    #[error("会话错误: {0}")]
    Session(#[from] SessionError),
    /// 人脸采集错误
    #[error("采集错误: {0}")]
    Capture(#[from] CaptureError),
    /// API 调用错误
    #[error("API错误: {0}")]
    Api(#[from] ApiError),
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 其他错误（用于包装第三方库错误）
    #[error("错误: {0}")]
    Other(String),
}

/// 考试会话错误
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// 当前阶段不允许该操作
    #[error("当前阶段 {phase} 不允许执行 {operation}")]
    WrongPhase {
        phase: SessionPhase,
        operation: &'static str,
    },
    /// 未同意考试须知
    #[error("未同意考试须知，无法开始考试")]
    ConsentRequired,
    /// 题目坐标越界
    #[error("题目 {key} 超出试卷范围")]
    QuestionOutOfRange { key: QuestionKey },
    /// 科目索引越界
    #[error("科目索引 {index} 超出范围 [0, {count})")]
    SubjectOutOfRange { index: usize, count: usize },
    /// 选项索引越界
    #[error("题目 {key} 的选项 {option} 超出范围 [0, {count})")]
    OptionOutOfRange {
        key: QuestionKey,
        option: usize,
        count: usize,
    },
    /// 试卷定义不合法
    #[error("试卷定义不合法: {reason}")]
    InvalidExam { reason: String },
}

/// 摄像头错误（可恢复，用户可重试）
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CameraError {
    /// 没有可用的摄像头
    #[error("没有可用的摄像头")]
    Unavailable,
    /// 用户拒绝了摄像头权限
    #[error("摄像头权限被拒绝")]
    PermissionDenied,
    /// 摄像头已被另一个采集流程占用
    #[error("摄像头正被另一个采集流程占用")]
    Busy,
    /// 读取画面失败
    #[error("读取摄像头画面失败: {0}")]
    FrameFailed(String),
}

impl CameraError {
    /// 摄像头错误都不会终止考试，用户可以重新获取
    pub fn is_recoverable(&self) -> bool {
        true
    }
}

/// 人脸关键点检测器错误（采集开始前的阻塞性错误）
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DetectorError {
    /// 模型加载失败
    #[error("关键点模型加载失败: {0}")]
    LoadFailed(String),
    /// 模型加载超时
    #[error("关键点模型加载超时 ({timeout_ms}ms)")]
    LoadTimeout { timeout_ms: u64 },
}

impl DetectorError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, DetectorError::LoadFailed(_) | DetectorError::LoadTimeout { .. })
    }
}

/// 人脸采集错误
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error(transparent)]
    Camera(#[from] CameraError),
    #[error(transparent)]
    Detector(#[from] DetectorError),
    /// 采集未完成就提交核验
    #[error("缺少 {missing:?} 角度的照片")]
    Incomplete { missing: Vec<FaceAngle> },
}

impl CaptureError {
    /// 用户是否可以直接重试
    pub fn is_retryable(&self) -> bool {
        match self {
            CaptureError::Camera(e) => e.is_recoverable(),
            CaptureError::Detector(e) => e.is_retryable(),
            CaptureError::Incomplete { .. } => true,
        }
    }
}

/// API 调用错误
#[derive(Debug, Error)]
pub enum ApiError {
    /// 网络请求失败
    #[error("API请求失败 ({endpoint}): {source}")]
    RequestFailed {
        endpoint: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// API 返回错误响应
    #[error("API返回错误响应 ({endpoint}): status={status}, message={message:?}")]
    BadResponse {
        endpoint: String,
        status: u16,
        message: Option<String>,
    },
    /// 多次重试后仍失败
    #[error("API请求在 {attempts} 次尝试后仍失败 ({endpoint})")]
    RetriesExhausted { endpoint: String, attempts: usize },
    /// JSON 解析失败
    #[error("JSON解析失败: {source}")]
    JsonParseFailed {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 文件不存在
    #[error("文件不存在: {path}")]
    NotFound { path: String },
    /// 读取文件失败
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 写入文件失败
    #[error("写入文件失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// TOML 解析失败
    #[error("TOML解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// 按键组合无法识别
    #[error("无法识别的按键组合: '{chord}'")]
    InvalidKeyChord { chord: String },
}

// ========== 从常见错误类型转换 ==========

impl From<CameraError> for AppError {
    fn from(err: CameraError) -> Self {
        AppError::Capture(CaptureError::Camera(err))
    }
}

impl From<DetectorError> for AppError {
    fn from(err: DetectorError) -> Self {
        AppError::Capture(CaptureError::Detector(err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Api(ApiError::JsonParseFailed {
            source: Box::new(err),
        })
    }
}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        AppError::File(FileError::TomlParseFailed {
            path: String::new(), // TOML错误通常不包含路径信息
            source: Box::new(err),
        })
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::File(FileError::ReadFailed {
            path: String::new(),
            source: Box::new(err),
        })
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建API请求失败错误
    pub fn api_request_failed(
        endpoint: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Api(ApiError::RequestFailed {
            endpoint: endpoint.into(),
            source: Box::new(source),
        })
    }

    /// 创建文件读取错误
    pub fn file_read_failed(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::File(FileError::ReadFailed {
            path: path.into(),
            source: Box::new(source),
        })
    }

    /// 创建文件写入错误
    pub fn file_write_failed(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::File(FileError::WriteFailed {
            path: path.into(),
            source: Box::new(source),
        })
    }

    /// 创建阶段错误
    pub fn wrong_phase(phase: SessionPhase, operation: &'static str) -> Self {
        AppError::Session(SessionError::WrongPhase { phase, operation })
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
