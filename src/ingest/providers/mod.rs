// src/ingest/providers/mod.rs
pub mod fixture;
pub mod kimdis;
pub mod mock;

pub use fixture::FixtureSource;
pub use kimdis::KimdisClient;
pub use mock::MockDisclosureSource;
