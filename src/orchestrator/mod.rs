//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责"拍照 → 提取 → 分析 → 排序"的完整流程调度。
//!
//! ## 模块划分
//!
//! ### `batch_scheduler` - 批量分析调度器
//! - 分批调用远程分析服务，带超时竞速
//! - 批量失败时降级为逐个分析
//! - 上报进度，汇总异构结果
//!
//! ### `App` - 应用主结构
//! - 持有配置和全部客户端资源
//! - 管理单轮分析的生命周期（忙碌标记、状态通知）
//! - 输出整轮分析的统计信息
//!
//! ## 层次关系
//!
//! ```text
//! App (一轮完整分析)
//!     ↓
//! batch_scheduler (处理 Vec<Dish>)
//!     ↓
//! clients (提取 / 批量分析 / 单项分析)
//!     ↓
//! services (汇总 / 分级排序 / 偏好读取)
//! ```

pub mod batch_scheduler;

pub use batch_scheduler::BatchScheduler;

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use tracing::info;

use crate::clients::{AnalysisClient, ExtractionClient};
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::{AnalysisResult, Dish};
use crate::progress::ProgressObserver;
use crate::services::risk::{self, DangerColor, RankedDish};
use crate::services::PreferenceStore;

/// 一轮"拍照 → 分析"的完整结果
///
/// 下一轮分析整体替换上一轮，不做合并
#[derive(Debug)]
pub struct AnalysisRun {
    /// 从菜单照片中提取出的菜品
    pub dishes: Vec<Dish>,
    /// 本轮使用的过敏原列表
    pub allergens: Vec<String>,
    /// 汇总后的分析结果
    pub results: Vec<AnalysisResult>,
    /// 按风险从低到高排序的展示条目
    pub ranked: Vec<RankedDish>,
}

/// 应用主结构
///
/// 唯一持有客户端资源的模块，同一时刻只允许一轮分析
pub struct App {
    config: Config,
    extraction: ExtractionClient,
    analysis: AnalysisClient,
    store: PreferenceStore,
    analyzing: AtomicBool,
}

impl App {
    /// 初始化应用
    pub fn new(config: Config) -> Self {
        let extraction = ExtractionClient::new(&config);
        let analysis = AnalysisClient::new(&config);
        let store = PreferenceStore::new(&config.allergen_store_file);
        Self {
            config,
            extraction,
            analysis,
            store,
            analyzing: AtomicBool::new(false),
        }
    }

    /// 是否正在分析中
    ///
    /// 并发闸门：分析期间展示层应禁用"拍照 / 分析"入口
    pub fn is_analyzing(&self) -> bool {
        self.analyzing.load(Ordering::SeqCst)
    }

    /// 对一张菜单照片执行完整分析流程
    ///
    /// # 参数
    /// - `image_path`: 菜单照片路径（JPEG）
    /// - `observer`: 进度观察者
    ///
    /// # 返回
    /// 返回排序、标色后的完整分析结果；提取或偏好读取失败时
    /// 整轮失败，忙碌标记无论成败都会被清除
    pub async fn analyze_photo(
        &self,
        image_path: &Path,
        observer: &dyn ProgressObserver,
    ) -> Result<AnalysisRun> {
        if self.analyzing.swap(true, Ordering::SeqCst) {
            return Err(AppError::Busy);
        }
        // 离开作用域时清除忙碌标记并通知观察者，所有退出路径共用
        let _guard = BusyGuard {
            flag: &self.analyzing,
            observer,
        };
        observer.on_analyzing(true);

        let image = tokio::fs::read(image_path)
            .await
            .map_err(|e| AppError::ImageRead {
                path: image_path.display().to_string(),
                source: e,
            })?;
        let image_base64 = BASE64.encode(&image);

        let dishes = self.extraction.extract_menu_items(&image_base64).await?;

        self.run_pipeline(dishes, observer).await
    }

    /// 对一组已提取的菜品重新执行分析流程（跳过拍照与提取）
    ///
    /// 展示层在用户调整过敏原偏好后重新分析时使用，
    /// 与 `analyze_photo` 共用同一个忙碌闸门
    pub async fn analyze_dishes(
        &self,
        dishes: Vec<Dish>,
        observer: &dyn ProgressObserver,
    ) -> Result<AnalysisRun> {
        if self.analyzing.swap(true, Ordering::SeqCst) {
            return Err(AppError::Busy);
        }
        let _guard = BusyGuard {
            flag: &self.analyzing,
            observer,
        };
        observer.on_analyzing(true);

        self.run_pipeline(dishes, observer).await
    }

    /// 提取之后的公共流程：读取偏好 → 批量分析 → 分级排序
    ///
    /// 空菜单不跳过调度器，保证最终进度 100 照常上报
    async fn run_pipeline(
        &self,
        dishes: Vec<Dish>,
        observer: &dyn ProgressObserver,
    ) -> Result<AnalysisRun> {
        if dishes.is_empty() {
            info!("菜单中没有识别到菜品");
        }

        let allergens = self.store.load().await?;

        let scheduler = BatchScheduler::new(&self.analysis, &self.config);
        let results = scheduler.run(&dishes, &allergens, observer).await;
        let ranked = risk::rank(&dishes, &results);

        log_run_summary(&ranked);

        Ok(AnalysisRun {
            dishes,
            allergens,
            results,
            ranked,
        })
    }
}

/// 忙碌标记守卫
struct BusyGuard<'a> {
    flag: &'a AtomicBool,
    observer: &'a dyn ProgressObserver,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
        self.observer.on_analyzing(false);
    }
}

/// 输出整轮分析的统计信息
fn log_run_summary(ranked: &[RankedDish]) {
    let count = |color: DangerColor| ranked.iter().filter(|r| r.color == color).count();

    info!("\n{}", "=".repeat(60));
    info!("📊 分析完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("🍽️ 菜品总数: {}", ranked.len());
    info!("🟢 低风险: {}", count(DangerColor::Green));
    info!("🟡 中风险: {}", count(DangerColor::Yellow));
    info!("🟠 不确定: {}", count(DangerColor::Orange));
    info!("🔴 高风险: {}", count(DangerColor::Red));
    info!("⚪ 无结果: {}", count(DangerColor::Neutral));
    info!("{}", "=".repeat(60));

    for entry in ranked {
        let probability = entry
            .result
            .as_ref()
            .map(|r| format!("{:.0}%", r.probability_with_any))
            .unwrap_or_else(|| "未知".to_string());
        info!("  {} {} ({})", entry.color.hex(), entry.dish.dish_name, probability);
    }
}
