use std::future::Future;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult, FileError};
use crate::models::exam::ExamDefinition;

/// 试卷来源
///
/// 会话开始前取一次试卷，之后不再重复获取
pub trait ExamSource {
    fn load_exam(&self, exam_id: &str) -> impl Future<Output = AppResult<ExamDefinition>> + Send;
}

/// 从 TOML 文件加载 ExamDefinition
pub async fn load_toml_to_exam(toml_file_path: &Path) -> AppResult<ExamDefinition> {
    let path_text = toml_file_path.display().to_string();

    let content = fs::read_to_string(toml_file_path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            AppError::File(FileError::NotFound {
                path: path_text.clone(),
            })
        } else {
            AppError::file_read_failed(&path_text, e)
        }
    })?;

    let exam: ExamDefinition = toml::from_str(&content).map_err(|e| {
        AppError::File(FileError::TomlParseFailed {
            path: path_text.clone(),
            source: Box::new(e),
        })
    })?;

    exam.validate()?;
    debug!(
        "试卷 {} 加载完成: {} 个科目, {} 道题",
        exam.id,
        exam.subject_count(),
        exam.total_questions()
    );

    Ok(exam)
}

/// 按 `<folder>/<exam_id>.toml` 查找试卷
#[derive(Debug, Clone)]
pub struct TomlExamSource {
    folder: PathBuf,
}

impl TomlExamSource {
    pub fn new(folder: impl Into<PathBuf>) -> Self {
        Self {
            folder: folder.into(),
        }
    }

    pub fn path_for(&self, exam_id: &str) -> PathBuf {
        self.folder.join(format!("{}.toml", exam_id))
    }

    /// 列出文件夹中所有可用的试卷 ID
    pub async fn list_exam_ids(&self) -> AppResult<Vec<String>> {
        let folder_text = self.folder.display().to_string();
        if !self.folder.exists() {
            return Err(AppError::File(FileError::NotFound { path: folder_text }));
        }

        let mut ids = Vec::new();
        let mut entries = fs::read_dir(&self.folder)
            .await
            .map_err(|e| AppError::file_read_failed(&folder_text, e))?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) == Some("toml") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    ids.push(stem.to_string());
                }
            }
        }

        if ids.is_empty() {
            warn!("在文件夹 {} 中没有找到 TOML 试卷", folder_text);
        }
        ids.sort();
        Ok(ids)
    }
}

impl ExamSource for TomlExamSource {
    async fn load_exam(&self, exam_id: &str) -> AppResult<ExamDefinition> {
        let path = self.path_for(exam_id);
        info!("📁 正在加载试卷: {}", path.display());
        load_toml_to_exam(&path).await
    }
}
