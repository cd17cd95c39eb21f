pub mod analysis;
pub mod dish;

pub use analysis::{AnalysisResult, BatchAnalysisRequest, BatchAnalysisResponse, Usage, UsageInfo};
pub use dish::{Dish, DishPayload};
