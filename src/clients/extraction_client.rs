/// 菜单提取客户端
///
/// 把菜单照片交给视觉模型，解析出结构化的菜品列表。
/// 提取服务是尽力而为的外部协作方：返回内容可能带 markdown 围栏、
/// 可能不是数组、单个条目可能缺字段，这里统一做宽容处理。
use std::sync::OnceLock;

use regex::Regex;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::ExtractionError;
use crate::models::Dish;

/// 菜单解析提示词
const EXTRACTION_PROMPT: &str = r#"You are an expert menu parsing service and food allergen analyst. Extract all food items from this image into a structured JSON array.

For each item on the menu, create a JSON object with the following keys:
- "dish_name": The name of the dish.
- "main_ingredients": A list of the primary ingredients mentioned in the description. If no ingredients are listed, use an empty array.
- "normalized_ingredients": A list of the basic food components found in this dish, breaking down sauces, preparations, and composite ingredients into their core components (e.g. "marinara sauce" -> ["tomatoes", "garlic", "onions", "herbs"]).
- "other": Any other text associated with the item, such as the description or price.

Use your knowledge of cooking to identify hidden allergens in common sauces, seasonings, and preparations.

Your entire response MUST be a single, valid JSON array of these objects. Do not include any text, formatting, or markdown outside of the JSON array."#;

/// 菜单提取客户端
pub struct ExtractionClient {
    api_url: String,
    api_key: String,
    verbose_logging: bool,
    client: reqwest::Client,
}

impl ExtractionClient {
    /// 创建新的提取客户端
    pub fn new(config: &Config) -> Self {
        Self {
            api_url: config.extraction_api_url.clone(),
            api_key: config.extraction_api_key.clone(),
            verbose_logging: config.verbose_logging,
            client: reqwest::Client::new(),
        }
    }

    /// 从菜单照片中提取菜品列表
    ///
    /// # 参数
    /// - `image_base64`: base64 编码的 JPEG 图片数据
    ///
    /// # 返回
    /// 返回识别出的菜品列表，识别不出任何菜品时返回空列表
    pub async fn extract_menu_items(
        &self,
        image_base64: &str,
    ) -> Result<Vec<Dish>, ExtractionError> {
        if image_base64.is_empty() {
            return Err(ExtractionError::EmptyImage);
        }
        if self.api_key.is_empty() {
            return Err(ExtractionError::MissingApiKey);
        }

        let url = format!("{}?key={}", self.api_url, self.api_key);
        let payload = json!({
            "contents": [{
                "parts": [
                    { "text": EXTRACTION_PROMPT },
                    { "inlineData": { "mimeType": "image/jpeg", "data": image_base64 } },
                ],
            }],
            "generationConfig": { "responseMimeType": "application/json" }
        });

        let response = self.client.post(&url).json(&payload).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExtractionError::BadStatus(status.as_u16()));
        }

        let body: Value = response.json().await?;
        let text = body
            .pointer("/candidates/0/content/parts/0/text")
            .and_then(Value::as_str)
            .ok_or(ExtractionError::EmptyResponse)?;

        if self.verbose_logging {
            info!("📄 提取服务原始返回: {}", text);
        } else {
            debug!("提取服务原始返回: {}", text);
        }

        let dishes = parse_menu_items(text);
        info!("✅ 识别出 {} 道菜品", dishes.len());
        Ok(dishes)
    }
}

/// 清理并解析提取服务返回的文本
///
/// 非数组返回按 0 道菜处理，无法解析的条目丢弃
fn parse_menu_items(text: &str) -> Vec<Dish> {
    let cleaned = clean_response_text(text);

    let value: Value = match serde_json::from_str(&cleaned) {
        Ok(value) => value,
        Err(e) => {
            warn!("提取结果无法解析为 JSON: {}", e);
            return Vec::new();
        }
    };

    let Some(items) = value.as_array() else {
        warn!("提取结果不是数组，按 0 道菜处理");
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| match serde_json::from_value::<Dish>(item.clone()) {
            Ok(dish) => Some(dish),
            Err(e) => {
                warn!("跳过无法解析的菜品条目: {}", e);
                None
            }
        })
        .collect()
}

/// 去掉 markdown 代码块围栏，截取最外层的 JSON 数组
fn clean_response_text(text: &str) -> String {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    let fence = FENCE.get_or_init(|| Regex::new(r"^```(?:json)?\s*|\s*```$").unwrap());

    let cleaned = fence.replace_all(text.trim(), "");

    // 进一步截取第一个 '[' 到最后一个 ']' 之间的内容
    if let (Some(start), Some(end)) = (cleaned.find('['), cleaned.rfind(']')) {
        if end > start {
            return cleaned[start..=end].to_string();
        }
    }
    cleaned.into_owned()
}
