// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod config;
pub mod export;
pub mod filter;
pub mod ingest;
pub mod metrics;
pub mod session;
pub mod sort;
pub mod summary;
pub mod tender;
pub mod urgency;

// ---- Re-exports for stable public API ----
pub use crate::api::{router, AppState};
pub use crate::filter::{FilterSet, Predicate, Range};
pub use crate::ingest::normalize::{NormalizationError, Normalizer, Normalizers};
pub use crate::ingest::types::{FetchError, NoticePage, NoticeSource};
pub use crate::sort::{Direction, SortKey};
pub use crate::summary::{summarize, GroupTable, Summary};
pub use crate::tender::{AmountUnit, Category, CategoryDomain, SourceSystem, Status, Tender};
pub use crate::urgency::{classify, Urgency};
