//! Page-level extraction pipeline.
//!
//! Page source output is fanned out by the [`Dispatcher`] to [`PageWorker`]s,
//! each of which asks the selection policy which engine result to keep. The
//! [`aggregator`] then puts the pages back in document order.
pub mod aggregator;
pub mod dispatcher;
pub mod selector;
pub mod worker;

pub use aggregator::{aggregate, page_marker, single_page};
pub use dispatcher::{DispatchOutcome, Dispatcher, PoolBuilder, build_rayon_pool, worker_count};
pub use selector::{Recognition, SelectionPolicy};
pub use worker::PageWorker;
