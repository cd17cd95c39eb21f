//! 危险度分级与排序
//!
//! 根据分析结果给每道菜计算一个危险颜色，并按"最安全优先"排序供展示。
//! 结果与菜品严格按菜名字符串相等关联，从不按位置关联：
//! 兜底路径和批量路径可能改变结果的顺序或数量。

use std::collections::{HashMap, HashSet};

use tracing::warn;

use crate::models::{AnalysisResult, Dish, Usage};

/// 高风险（红色）概率阈值
const HIGH_RISK_THRESHOLD: f64 = 50.0;
/// 中风险（黄色）概率阈值
const MEDIUM_RISK_THRESHOLD: f64 = 10.0;
/// "可能使用"占比达到该值时判为不确定（橙色）
const POSSIBLE_USAGE_RATIO: f64 = 0.6;

/// 危险颜色分级
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DangerColor {
    /// 没有分析结果，中性展示
    Neutral,
    /// 低风险
    Green,
    /// 中风险
    Yellow,
    /// 不确定（"可能使用"占比过高）
    Orange,
    /// 高风险
    Red,
}

impl DangerColor {
    /// 展示层使用的十六进制颜色值
    pub fn hex(&self) -> &'static str {
        match self {
            DangerColor::Neutral => "#FFFFFF",
            DangerColor::Green => "#4CAF50",
            DangerColor::Yellow => "#FFEB3B",
            DangerColor::Orange => "#FF9800",
            DangerColor::Red => "#F44336",
        }
    }
}

/// 计算一道菜的危险颜色
///
/// 判定顺序：
/// 1. 没有结果 → 中性
/// 2. `common_usage` 中 "possible" 占比 ≥ 0.6 且至少一条 → 橙色（优先于数值阈值）
/// 3. 最大概率 ≥ 50 → 红色；≥ 10 → 黄色；否则绿色
pub fn classify(result: Option<&AnalysisResult>) -> DangerColor {
    let Some(result) = result else {
        return DangerColor::Neutral;
    };

    if !result.common_usage.is_empty() {
        let possible = result
            .common_usage
            .values()
            .filter(|info| info.usage == Usage::Possible)
            .count();
        if possible > 0
            && possible as f64 / result.common_usage.len() as f64 >= POSSIBLE_USAGE_RATIO
        {
            return DangerColor::Orange;
        }
    }

    let max_prob = result.max_probability();
    if max_prob >= HIGH_RISK_THRESHOLD {
        DangerColor::Red
    } else if max_prob >= MEDIUM_RISK_THRESHOLD {
        DangerColor::Yellow
    } else {
        DangerColor::Green
    }
}

/// 排序后的展示条目
#[derive(Debug, Clone)]
pub struct RankedDish {
    pub dish: Dish,
    pub color: DangerColor,
    pub result: Option<AnalysisResult>,
}

/// 按风险从低到高排序（"最安全优先"）
///
/// 没有结果的菜品视为未知，排在所有已知结果之后；排序稳定，
/// 只产生展示顺序，不修改结果集本身
pub fn rank(dishes: &[Dish], results: &[AnalysisResult]) -> Vec<RankedDish> {
    let by_name = index_by_name(results);
    warn_on_duplicate_names(dishes);

    let mut ranked: Vec<RankedDish> = dishes
        .iter()
        .map(|dish| {
            let result = by_name.get(dish.dish_name.as_str()).copied();
            RankedDish {
                dish: dish.clone(),
                color: classify(result),
                result: result.cloned(),
            }
        })
        .collect();

    ranked.sort_by(|a, b| sort_key(a).total_cmp(&sort_key(b)));
    ranked
}

/// 按菜名建立结果索引
///
/// 先到先得：重名时保留第一条，后续重复条目被忽略
fn index_by_name(results: &[AnalysisResult]) -> HashMap<&str, &AnalysisResult> {
    let mut map: HashMap<&str, &AnalysisResult> = HashMap::new();
    for result in results {
        map.entry(result.dish.as_str()).or_insert(result);
    }
    map
}

/// 重名菜品只能按名称共享同一条结果，提醒一下
fn warn_on_duplicate_names(dishes: &[Dish]) {
    let mut seen = HashSet::new();
    for dish in dishes {
        if !seen.insert(dish.dish_name.as_str()) {
            warn!("⚠️ 菜单中存在重名菜品: {}，分析结果按名称共享", dish.dish_name);
        }
    }
}

fn sort_key(entry: &RankedDish) -> f64 {
    entry
        .result
        .as_ref()
        .map(|r| r.probability_with_any)
        .unwrap_or(f64::INFINITY)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn result_from(value: serde_json::Value) -> AnalysisResult {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_classify_without_result_is_neutral() {
        assert_eq!(classify(None), DangerColor::Neutral);
        assert_eq!(DangerColor::Neutral.hex(), "#FFFFFF");
    }

    #[test]
    fn test_classify_breakdown_drives_red() {
        let result = result_from(json!({
            "dish": "Pad Thai",
            "probability_breakdown": {"peanut": 80, "dairy": 5}
        }));
        assert_eq!(classify(Some(&result)), DangerColor::Red);
    }

    #[test]
    fn test_classify_possible_usage_overrides_thresholds() {
        // possible 占比 2/3 ≥ 0.6，即使 dairy 概率达到红色阈值也判为橙色
        let result = result_from(json!({
            "dish": "Mystery Stew",
            "probability_breakdown": {"peanut": 20, "soy": 15, "dairy": 60},
            "common_usage": {
                "peanut": {"usage": "possible"},
                "soy": {"usage": "possible"},
                "dairy": {"usage": "always"}
            }
        }));
        assert_eq!(classify(Some(&result)), DangerColor::Orange);
    }

    #[test]
    fn test_classify_possible_usage_below_ratio_uses_thresholds() {
        let result = result_from(json!({
            "dish": "Stew",
            "probability_breakdown": {"dairy": 60},
            "common_usage": {
                "peanut": {"usage": "possible"},
                "soy": {"usage": "never"},
                "dairy": {"usage": "always"}
            }
        }));
        assert_eq!(classify(Some(&result)), DangerColor::Red);
    }

    #[test]
    fn test_classify_medium_and_low_thresholds() {
        let medium = result_from(json!({"dish": "a", "probability_with_any": 10}));
        assert_eq!(classify(Some(&medium)), DangerColor::Yellow);

        let low = result_from(json!({"dish": "b", "probability_with_any": 9.9}));
        assert_eq!(classify(Some(&low)), DangerColor::Green);
    }

    #[test]
    fn test_rank_safest_first_with_unknown_last() {
        let dishes = vec![
            Dish::new("A", vec![]),
            Dish::new("B", vec![]),
            Dish::new("C", vec![]),
        ];
        let results = vec![
            result_from(json!({"dish": "A", "probability_with_any": 70})),
            result_from(json!({"dish": "B", "probability_with_any": 10})),
        ];

        let ranked = rank(&dishes, &results);
        let names: Vec<&str> = ranked.iter().map(|r| r.dish.dish_name.as_str()).collect();
        assert_eq!(names, vec!["B", "A", "C"]);
        assert_eq!(ranked[2].color, DangerColor::Neutral);
    }

    #[test]
    fn test_rank_is_stable_for_ties_and_unknowns() {
        let dishes = vec![
            Dish::new("X", vec![]),
            Dish::new("Y", vec![]),
            Dish::new("Z", vec![]),
        ];
        // X 和 Y 概率相同，Z 无结果；稳定排序必须保持输入相对顺序
        let results = vec![
            result_from(json!({"dish": "X", "probability_with_any": 30})),
            result_from(json!({"dish": "Y", "probability_with_any": 30})),
        ];

        let ranked = rank(&dishes, &results);
        let names: Vec<&str> = ranked.iter().map(|r| r.dish.dish_name.as_str()).collect();
        assert_eq!(names, vec!["X", "Y", "Z"]);
    }

    #[test]
    fn test_rank_duplicate_names_share_first_result() {
        let dishes = vec![Dish::new("House Salad", vec![]), Dish::new("House Salad", vec![])];
        let results = vec![
            result_from(json!({"dish": "House Salad", "probability_with_any": 20})),
            result_from(json!({"dish": "House Salad", "probability_with_any": 90})),
        ];

        let ranked = rank(&dishes, &results);
        assert_eq!(ranked.len(), 2);
        for entry in &ranked {
            assert_eq!(entry.result.as_ref().unwrap().probability_with_any, 20.0);
        }
    }

    #[test]
    fn test_rank_does_not_mutate_results() {
        let dishes = vec![Dish::new("A", vec![])];
        let results = vec![result_from(json!({"dish": "A", "probability_with_any": 5}))];
        let snapshot = results.clone();

        let _ = rank(&dishes, &results);
        assert_eq!(results, snapshot);
    }
}
