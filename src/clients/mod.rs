pub mod analysis_client;
pub mod extraction_client;

pub use analysis_client::{AnalysisApi, AnalysisClient};
pub use extraction_client::ExtractionClient;
