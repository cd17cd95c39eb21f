/// 结果汇总
///
/// 批量路径和兜底路径产生的原始结果在这里合并成统一的结果列表。
/// 上游服务可能混入 null、非对象或缺字段的条目，这里静默丢弃，
/// 不去重、不排序，保留到达顺序。
use serde_json::Value;
use tracing::warn;

use crate::models::AnalysisResult;

/// 过滤并解析原始结果
///
/// 永不失败，空输入产生空输出
pub fn aggregate(raw_results: Vec<Value>) -> Vec<AnalysisResult> {
    let total = raw_results.len();

    let results: Vec<AnalysisResult> = raw_results
        .into_iter()
        .filter_map(|value| {
            if !value.is_object() {
                return None;
            }
            match serde_json::from_value::<AnalysisResult>(value) {
                Ok(result) => Some(result),
                Err(e) => {
                    warn!("丢弃无法解析的分析结果: {}", e);
                    None
                }
            }
        })
        .collect();

    let dropped = total - results.len();
    if dropped > 0 {
        warn!("⚠️ 汇总时丢弃了 {} 条无效结果", dropped);
    }

    results
}
