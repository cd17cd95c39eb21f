//! 分析结果数据模型
//!
//! 每道菜对应一条 `AnalysisResult`，来源有三种：
//! 批量请求成功、单项兜底请求成功、两者都失败时合成的错误记录。
//! 结果只在一次分析中存活，拍下新照片后整体替换。

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::DishPayload;

/// 过敏原在菜品中的使用确定性
///
/// 定性标签，与数值概率互补
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Usage {
    Always,
    Sometimes,
    Possible,
    Never,
}

/// 单个过敏原的使用情况
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageInfo {
    pub usage: Usage,
}

/// 一道菜的过敏风险分析结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// 菜名，与 `Dish::dish_name` 按字符串相等关联
    pub dish: String,
    /// 含任意一种过敏原的概率（0-100）
    #[serde(default)]
    pub probability_with_any: f64,
    /// 按过敏原拆分的概率（0-100）
    #[serde(default)]
    pub probability_breakdown: HashMap<String, f64>,
    /// 按过敏原拆分的使用确定性
    #[serde(default)]
    pub common_usage: HashMap<String, UsageInfo>,
    /// 分析失败时的错误信息
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AnalysisResult {
    /// 风险判定使用的最大概率
    ///
    /// 有拆分概率时取其中最大值，否则取整体概率
    pub fn max_probability(&self) -> f64 {
        if self.probability_breakdown.is_empty() {
            self.probability_with_any
        } else {
            self.probability_breakdown.values().copied().fold(0.0, f64::max)
        }
    }
}

/// 批量分析请求体
#[derive(Debug, Serialize)]
pub struct BatchAnalysisRequest {
    pub dishes: Vec<DishPayload>,
    pub user_allergens: Vec<String>,
}

/// 批量分析响应体
///
/// `results` 缺失或不是数组时反序列化失败，按格式错误处理
#[derive(Debug, Deserialize)]
pub struct BatchAnalysisResponse {
    pub results: Vec<Value>,
    #[serde(default)]
    pub processing_time: f64,
}
