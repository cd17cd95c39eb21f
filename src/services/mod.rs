pub mod aggregator;
pub mod preference_store;
pub mod risk;

pub use preference_store::PreferenceStore;
pub use risk::{classify, rank, DangerColor, RankedDish};
