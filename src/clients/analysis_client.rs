/// 过敏原分析 API 客户端
///
/// 封装所有与远程分析服务相关的调用逻辑
use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::config::Config;
use crate::error::ApiError;
use crate::models::{BatchAnalysisRequest, BatchAnalysisResponse, Dish, DishPayload};

/// 远程分析服务能力接口
///
/// 调度器只依赖该接口，测试中可替换为桩实现
#[async_trait]
pub trait AnalysisApi: Send + Sync {
    /// 批量分析一组菜品
    ///
    /// # 参数
    /// - `dishes`: 本批菜品
    /// - `user_allergens`: 用户的全部过敏原
    ///
    /// # 返回
    /// 返回包含 `results` 数组的批量响应
    async fn analyze_batch(
        &self,
        dishes: &[Dish],
        user_allergens: &[String],
    ) -> Result<BatchAnalysisResponse, ApiError>;

    /// 单个菜品分析（批量失败后的兜底路径）
    ///
    /// 自身不设超时，由调用方决定是否包装超时
    async fn analyze_single(
        &self,
        dish: &Dish,
        user_allergens: &[String],
    ) -> Result<Value, ApiError>;
}

/// 分析服务客户端
pub struct AnalysisClient {
    base_url: String,
    client: reqwest::Client,
}

impl AnalysisClient {
    /// 创建新的分析客户端
    pub fn new(config: &Config) -> Self {
        Self {
            base_url: config.api_base_url.clone(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl AnalysisApi for AnalysisClient {
    async fn analyze_batch(
        &self,
        dishes: &[Dish],
        user_allergens: &[String],
    ) -> Result<BatchAnalysisResponse, ApiError> {
        let endpoint = format!("{}/api/batch_ingredient_analysis", self.base_url);
        let request = BatchAnalysisRequest {
            dishes: dishes.iter().map(DishPayload::from).collect(),
            user_allergens: user_allergens.to_vec(),
        };

        debug!("批量分析请求: {} 个菜品", dishes.len());

        let response = self
            .client
            .post(&endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| ApiError::Network {
                endpoint: endpoint.clone(),
                source: e,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::BadStatus {
                endpoint,
                status: status.as_u16(),
            });
        }

        let body: BatchAnalysisResponse =
            response.json().await.map_err(|e| ApiError::JsonParse {
                endpoint: endpoint.clone(),
                source: e,
            })?;

        debug!(
            "批量分析完成: {} 条结果，服务端耗时 {:.2}s",
            body.results.len(),
            body.processing_time
        );

        Ok(body)
    }

    async fn analyze_single(
        &self,
        dish: &Dish,
        user_allergens: &[String],
    ) -> Result<Value, ApiError> {
        let endpoint = format!("{}/api/ingredient_analysis", self.base_url);

        // 食材和过敏原以重复参数编码
        let mut query: Vec<(&str, &str)> = vec![("dish", dish.dish_name.as_str())];
        for ingredient in &dish.main_ingredients {
            query.push(("main_ingredients", ingredient));
        }
        for ingredient in &dish.normalized_ingredients {
            query.push(("normalized_ingredients", ingredient));
        }
        for allergen in user_allergens {
            query.push(("user_allergens", allergen));
        }

        debug!("单项分析请求: {}", dish.dish_name);

        let response = self
            .client
            .get(&endpoint)
            .query(&query)
            .send()
            .await
            .map_err(|e| ApiError::Network {
                endpoint: endpoint.clone(),
                source: e,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::BadStatus {
                endpoint,
                status: status.as_u16(),
            });
        }

        let value: Value = response.json().await.map_err(|e| ApiError::JsonParse {
            endpoint: endpoint.clone(),
            source: e,
        })?;

        if !value.is_object() {
            return Err(ApiError::InvalidShape {
                endpoint,
                reason: "响应不是 JSON 对象".to_string(),
            });
        }

        Ok(value)
    }
}
