//! Periodic ingestion: resolve, fetch, parse, append.
//!
//! [`IngestionPipeline`] runs one cycle for one location; [`Scheduler`]
//! drives it on a fixed period until cancelled.

pub mod pipeline;
pub mod scheduler;

pub use pipeline::{
    IngestError, IngestStep, IngestionPipeline, TrackedLocation, OBSERVATION_TIME_FORMAT,
};
pub use scheduler::{
    Scheduler, SchedulerError, SchedulerHandle, SchedulerState, SchedulerStatus, TickSummary,
};
