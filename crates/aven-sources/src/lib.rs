//! Content sources for Aven ingestion.

pub mod firecrawl;
pub mod fixed;
pub mod web;

pub use firecrawl::FirecrawlSource;
pub use fixed::StaticSource;
pub use web::WebSource;
