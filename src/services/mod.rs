pub mod cache_writer;
pub mod event_bus;
pub mod job_search;

pub use cache_writer::CacheWriter;
pub use event_bus::{EventBus, ListenerId, SearchEventListener};
pub use job_search::JobSearchService;
