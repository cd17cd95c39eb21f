/// 过敏原偏好存储
///
/// 用户选择的过敏原以 JSON 字符串数组保存在本地文件中。
/// 核心流程在每轮分析开始时读取一次，从不写入。
use std::path::PathBuf;

use tracing::{debug, info};

use crate::error::StoreError;

/// 偏好存储
pub struct PreferenceStore {
    path: PathBuf,
}

impl PreferenceStore {
    /// 创建指向指定偏好文件的存储
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// 加载过敏原列表
    ///
    /// 文件不存在时视为用户还没有选择任何过敏原，返回空列表
    pub async fn load(&self) -> Result<Vec<String>, StoreError> {
        if !self.path.exists() {
            debug!("偏好文件 {} 不存在，使用空过敏原列表", self.path.display());
            return Ok(Vec::new());
        }

        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| StoreError::ReadFailed {
                path: self.path.display().to_string(),
                source: e,
            })?;

        let allergens: Vec<String> =
            serde_json::from_str(&content).map_err(|e| StoreError::ParseFailed {
                path: self.path.display().to_string(),
                source: e,
            })?;

        info!("📖 已加载 {} 个过敏原偏好", allergens.len());
        Ok(allergens)
    }
}
