pub mod data_persistance;
pub mod droid;
pub mod page;
pub mod page_adapter;
pub mod query_invoker;
pub mod result_scraper;
pub mod sentinel;
pub mod suite;

pub use data_persistance::*;
pub use droid::*;
pub use page::*;
pub use page_adapter::*;
pub use query_invoker::*;
pub use result_scraper::*;
pub use sentinel::*;
pub use suite::*;
