pub mod catalog;
pub mod enrichment;
pub mod popularity;
pub mod ratings;
pub mod recommendations;
pub mod search;
pub mod session;

pub use enrichment::PopularityEnricher;
pub use recommendations::{Recommendation, RecommendationRanker};
pub use search::SearchAggregator;
pub use session::{SearchSession, SessionUpdate};
