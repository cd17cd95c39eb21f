use serde::Deserialize;

use crate::error::AppError;

/// 程序配置
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 分析服务基础地址
    pub api_base_url: String,
    /// 每批分析的菜品数量
    pub batch_size: usize,
    /// 批量请求超时（毫秒）
    pub request_timeout_ms: u64,
    /// 批次之间的间隔（毫秒），减轻远端服务压力
    pub batch_delay_ms: u64,
    /// 菜单提取服务地址
    pub extraction_api_url: String,
    /// 菜单提取服务 API Key
    pub extraction_api_key: String,
    /// 过敏原偏好文件路径
    pub allergen_store_file: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:8000".to_string(),
            batch_size: 5,
            request_timeout_ms: 15_000,
            batch_delay_ms: 200,
            extraction_api_url: "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash-latest:generateContent".to_string(),
            extraction_api_key: String::new(),
            allergen_store_file: "allergens.json".to_string(),
            verbose_logging: false,
        }
    }
}

impl Config {
    /// 从环境变量加载配置，未设置的项使用默认值
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// 在当前配置之上应用环境变量覆盖
    ///
    /// 配置文件和环境变量同时存在时，环境变量优先
    pub fn with_env_overrides(self) -> Self {
        Self {
            api_base_url: std::env::var("API_BASE_URL").unwrap_or(self.api_base_url),
            batch_size: std::env::var("BATCH_SIZE").ok().and_then(|v| v.parse().ok()).unwrap_or(self.batch_size),
            request_timeout_ms: std::env::var("REQUEST_TIMEOUT_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(self.request_timeout_ms),
            batch_delay_ms: std::env::var("BATCH_DELAY_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(self.batch_delay_ms),
            extraction_api_url: std::env::var("EXTRACTION_API_URL").unwrap_or(self.extraction_api_url),
            extraction_api_key: std::env::var("EXTRACTION_API_KEY").unwrap_or(self.extraction_api_key),
            allergen_store_file: std::env::var("ALLERGEN_STORE_FILE").unwrap_or(self.allergen_store_file),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(self.verbose_logging),
        }
    }

    /// 从 TOML 配置文件加载
    ///
    /// # 参数
    /// - `path`: 配置文件路径
    pub fn from_file(path: &str) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("无法读取配置文件 {}: {}", path, e)))?;
        let config = toml::from_str(&content)
            .map_err(|e| AppError::Config(format!("配置文件 {} 解析失败: {}", path, e)))?;
        Ok(config)
    }
}
