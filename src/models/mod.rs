pub mod batch_plan;
pub mod job;
pub mod kpi;
pub mod progress;

pub use batch_plan::BatchPlan;
pub use job::{parse_fetched_records, parse_records, synthesize_id, JobRecord};
pub use kpi::{CacheFreshness, JobKpis, KpiSnapshot};
pub use progress::{SearchEvent, SearchProgress};
