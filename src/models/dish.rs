//! 菜品数据模型
//!
//! 菜品由提取服务从菜单照片中识别，接收后不再修改。
//! `dish_name` 是与分析结果关联的键（同一次提取中可能重名，见 risk 模块）。

use serde::{Deserialize, Serialize};

/// 一道菜品
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dish {
    /// 菜名
    pub dish_name: String,
    /// 菜单描述中列出的主要食材
    #[serde(default)]
    pub main_ingredients: Vec<String>,
    /// 拆解后的基础食材（酱汁、预制品等拆成基本成分）
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub normalized_ingredients: Vec<String>,
    /// 其他信息（描述、价格等）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub other: Option<String>,
}

impl Dish {
    /// 创建只有菜名和主要食材的菜品（测试和示例用）
    pub fn new(dish_name: impl Into<String>, main_ingredients: Vec<String>) -> Self {
        Self {
            dish_name: dish_name.into(),
            main_ingredients,
            normalized_ingredients: Vec::new(),
            other: None,
        }
    }
}

/// 发送给批量分析接口的菜品格式
///
/// 不包含 `other` 字段，分析服务不需要描述和价格
#[derive(Debug, Serialize)]
pub struct DishPayload {
    pub dish_name: String,
    pub main_ingredients: Vec<String>,
    pub normalized_ingredients: Vec<String>,
}

impl From<&Dish> for DishPayload {
    fn from(dish: &Dish) -> Self {
        Self {
            dish_name: dish.dish_name.clone(),
            main_ingredients: dish.main_ingredients.clone(),
            normalized_ingredients: dish.normalized_ingredients.clone(),
        }
    }
}
