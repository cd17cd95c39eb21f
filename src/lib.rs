//! # Menu Allergen Scan
//!
//! 拍下菜单照片，提取菜品列表，调用远程分析服务为每道菜计算
//! 个性化的过敏风险，并按风险从低到高排序展示。
//!
//! ## 架构设计
//!
//! 本系统采用三层架构：
//!
//! ### ① 客户端层（Clients）
//! - `clients/` - 封装对外部服务的 HTTP 调用
//! - `ExtractionClient` - 菜单照片 → 结构化菜品列表
//! - `AnalysisClient` - 批量 / 单项过敏原分析（实现 `AnalysisApi` 接口）
//!
//! ### ② 能力层（Services）
//! - `services/` - 描述"我能做什么"，不发起流程
//! - `PreferenceStore` - 读取用户过敏原偏好
//! - `aggregator` - 合并异构来源的分析结果
//! - `risk` - 危险颜色分级与"最安全优先"排序
//!
//! ### ③ 编排层（Orchestration）
//! - `orchestrator::BatchScheduler` - 分批调用、超时竞速、降级兜底、进度上报
//! - `orchestrator::App` - 持有资源，管理单轮分析的生命周期
//!
//! ## 失败处理
//!
//! 批量请求失败降级为逐个分析，逐个分析失败记录为带 `error` 的结果，
//! 只有提取和偏好读取的失败会让整轮分析失败；忙碌标记在任何退出
//! 路径上都会被清除。

pub mod clients;
pub mod config;
pub mod error;
pub mod logger;
pub mod models;
pub mod orchestrator;
pub mod progress;
pub mod services;

// 重新导出常用类型
pub use clients::{AnalysisApi, AnalysisClient, ExtractionClient};
pub use config::Config;
pub use error::{ApiError, AppError, ExtractionError, Result, StoreError};
pub use models::{AnalysisResult, BatchAnalysisResponse, Dish, Usage, UsageInfo};
pub use orchestrator::{AnalysisRun, App, BatchScheduler};
pub use progress::{NullObserver, ProgressObserver};
pub use services::{classify, rank, DangerColor, PreferenceStore, RankedDish};
