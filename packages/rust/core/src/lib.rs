//! Job orchestration and enrichment domain logic for trackfill.
//!
//! This crate ties the table, filter, and carrier crates together into the
//! end-to-end `process` workflow: shipment records, the identifier
//! partitioner, the merge engine, and the pipeline driver.

pub mod merge;
pub mod partition;
pub mod pipeline;
pub mod records;

pub use merge::{DerivedFields, FamilyResults, MergeStats, merge, resolve};
pub use partition::{WorkList, partition};
pub use pipeline::{FamilyReport, JobReport, process_file, process_table};
pub use records::{FamilyRouter, ShipmentRecord, extract_records};
