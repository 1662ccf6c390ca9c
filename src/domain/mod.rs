pub mod relevance;
pub mod report;
pub mod response_info;
pub mod run_stats;
pub mod search_result;
pub mod search_url;
pub mod verification;
