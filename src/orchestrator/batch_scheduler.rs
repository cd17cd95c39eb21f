//! 批量分析调度器 - 编排层
//!
//! ## 职责
//!
//! 1. **分批**：把菜品列表切成固定大小的连续批次，保持输入顺序
//! 2. **批量请求**：每批发一次网络请求，与超时竞速
//! 3. **优雅降级**：批量失败（超时、网络错误、错误状态码、格式不对）时
//!    回退为对本批每道菜逐个调用单项分析
//! 4. **兜底记录**：单项分析也失败的菜品合成一条带 `error` 的结果
//! 5. **进度上报**：每批开始前按已处理菜品数上报，结束后无条件上报 100
//! 6. **限速**：批次之间留固定间隔，最后一批之后不等待
//!
//! 部分失败从不向调用方抛出，调用方拿到的始终是完整的结果列表。

use std::time::Duration;

use serde_json::Value;
use tracing::{error, info, warn};

use crate::clients::AnalysisApi;
use crate::config::Config;
use crate::error::ApiError;
use crate::models::{AnalysisResult, Dish};
use crate::progress::{ProgressObserver, ProgressReporter};
use crate::services::aggregator;

/// 批量分析调度器
pub struct BatchScheduler<'a> {
    api: &'a dyn AnalysisApi,
    config: &'a Config,
}

impl<'a> BatchScheduler<'a> {
    /// 创建新的调度器
    pub fn new(api: &'a dyn AnalysisApi, config: &'a Config) -> Self {
        Self { api, config }
    }

    /// 执行整轮批量分析
    ///
    /// # 参数
    /// - `dishes`: 全部菜品，顺序保持不变
    /// - `user_allergens`: 用户的全部过敏原
    /// - `observer`: 进度观察者
    ///
    /// # 返回
    /// 返回汇总后的分析结果；部分失败不会抛出，
    /// 失败的菜品以带 `error` 的结果形式出现在返回值中
    pub async fn run(
        &self,
        dishes: &[Dish],
        user_allergens: &[String],
        observer: &dyn ProgressObserver,
    ) -> Vec<AnalysisResult> {
        let total = dishes.len();
        let batch_size = self.config.batch_size.max(1);
        let total_batches = total.div_ceil(batch_size);
        let reporter = ProgressReporter::new(observer);

        info!("🚀 开始批量分析: {} 道菜品，每批 {} 道", total, batch_size);

        let mut all_results: Vec<Value> = Vec::with_capacity(total);

        for (batch_index, batch) in dishes.chunks(batch_size).enumerate() {
            // 进度以已处理菜品数为基准，不以批次数为基准
            reporter.report(batch_index * batch_size, total);
            info!(
                "🔄 正在处理第 {}/{} 批（{} 道菜品）",
                batch_index + 1,
                total_batches,
                batch.len()
            );

            match self.try_batch(batch, user_allergens).await {
                Ok(mut results) => {
                    info!("✅ 第 {} 批完成: {} 条结果", batch_index + 1, results.len());
                    all_results.append(&mut results);
                }
                Err(e) => {
                    warn!("❌ 第 {} 批请求失败: {}，回退为逐个分析", batch_index + 1, e);
                    let mut fallback = self.fallback_batch(batch, user_allergens).await;
                    all_results.append(&mut fallback);
                }
            }

            // 批次之间留出固定间隔，减轻远端服务压力
            if batch_index + 1 < total_batches {
                tokio::time::sleep(Duration::from_millis(self.config.batch_delay_ms)).await;
            }
        }

        reporter.finish();
        info!("🎉 分析完成，共 {} 条原始结果", all_results.len());

        aggregator::aggregate(all_results)
    }

    /// 发起一次批量请求，与超时竞速
    ///
    /// 超时后 future 被丢弃，底层请求随之取消
    async fn try_batch(
        &self,
        batch: &[Dish],
        user_allergens: &[String],
    ) -> Result<Vec<Value>, ApiError> {
        let timeout = Duration::from_millis(self.config.request_timeout_ms);
        let response = tokio::time::timeout(timeout, self.api.analyze_batch(batch, user_allergens))
            .await
            .map_err(|_| ApiError::Timeout {
                endpoint: "batch_ingredient_analysis".to_string(),
                timeout_ms: self.config.request_timeout_ms,
            })??;
        Ok(response.results)
    }

    /// 批量失败后的兜底：对本批每道菜并发调用单项分析
    ///
    /// 所有调用结束（成功或记录为失败）后本批才算完成；
    /// 单项失败不再重试，合成一条错误记录
    async fn fallback_batch(&self, batch: &[Dish], user_allergens: &[String]) -> Vec<Value> {
        let calls = batch.iter().map(|dish| async move {
            match self.api.analyze_single(dish, user_allergens).await {
                Ok(value) => value,
                Err(e) => {
                    error!("❌ 菜品 {} 单项分析失败: {}", dish.dish_name, e);
                    synthesized_failure(&dish.dish_name, &e.to_string())
                }
            }
        });
        futures::future::join_all(calls).await
    }
}

/// 两条路径都失败时合成的错误记录，概率字段全部置零
fn synthesized_failure(dish_name: &str, message: &str) -> Value {
    serde_json::json!({
        "dish": dish_name,
        "error": message,
        "probability_with_any": 0,
        "probability_breakdown": {},
        "common_usage": {}
    })
}
