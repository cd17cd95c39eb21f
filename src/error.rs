//! 错误类型定义
//!
//! 错误分为三个层面：
//! - `ApiError`：与远程分析服务交互时的网络、协议、格式错误，
//!   在批量粒度触发兜底，在单项粒度记录到结果中，不向上抛出
//! - `ExtractionError` / `StoreError`：菜单提取和偏好读取的错误，
//!   作为整轮分析的失败向调用方报告
//! - `AppError`：应用级错误的统一包装

use thiserror::Error;

/// 分析服务 API 调用错误
#[derive(Debug, Error)]
pub enum ApiError {
    /// 网络请求失败（连接失败、DNS 解析失败等）
    #[error("网络请求失败 ({endpoint}): {source}")]
    Network {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    /// 请求超时
    #[error("请求超时 ({endpoint}): 超过 {timeout_ms} 毫秒未响应")]
    Timeout { endpoint: String, timeout_ms: u64 },
    /// 服务返回非成功状态码
    #[error("API 返回错误状态 ({endpoint}): HTTP {status}")]
    BadStatus { endpoint: String, status: u16 },
    /// 响应体无法解析为 JSON
    #[error("响应体解析失败 ({endpoint}): {source}")]
    JsonParse {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    /// 响应可以解析但缺少预期字段
    #[error("响应格式不符合预期 ({endpoint}): {reason}")]
    InvalidShape { endpoint: String, reason: String },
}

/// 菜单提取服务错误
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// 没有图片数据
    #[error("没有可处理的图片数据")]
    EmptyImage,
    /// 提取服务 API Key 未配置
    #[error("提取服务 API Key 未配置，请设置 EXTRACTION_API_KEY 环境变量")]
    MissingApiKey,
    /// 请求失败
    #[error("提取服务请求失败: {0}")]
    Request(#[from] reqwest::Error),
    /// 服务返回非成功状态码
    #[error("提取服务返回错误状态: HTTP {0}")]
    BadStatus(u16),
    /// 响应中没有可用的文本内容
    #[error("提取服务未返回结构化数据，请重试")]
    EmptyResponse,
}

/// 过敏原偏好存储错误
#[derive(Debug, Error)]
pub enum StoreError {
    /// 读取偏好文件失败
    #[error("读取偏好文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 偏好文件内容无法解析
    #[error("偏好文件解析失败 ({path}): {source}")]
    ParseFailed {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// API 调用错误
    #[error("API错误: {0}")]
    Api(#[from] ApiError),
    /// 菜单提取错误
    #[error("菜单提取错误: {0}")]
    Extraction(#[from] ExtractionError),
    /// 偏好存储错误
    #[error("存储错误: {0}")]
    Store(#[from] StoreError),
    /// 读取菜单照片失败
    #[error("读取图片失败 ({path}): {source}")]
    ImageRead {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 已有分析任务在进行中
    #[error("已有分析任务在进行中，请等待当前分析完成")]
    Busy,
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(String),
}

/// 应用程序结果类型
pub type Result<T> = std::result::Result<T, AppError>;
