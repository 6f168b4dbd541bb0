//! # docshelf-jobs
//!
//! Background job worker for docshelf.
//!
//! Extraction work must never occupy the request-serving runtime, so the
//! worker claims jobs from the database queue (`FOR UPDATE SKIP LOCKED`)
//! and runs them on its own task, delegating PDF parsing to an external
//! subprocess.

pub mod extract;
pub mod handler;
pub mod ingest;
pub mod worker;

pub use extract::PdfTextExtractor;
pub use handler::{JobContext, JobHandler, JobResult, NoOpHandler};
pub use ingest::ExtractTextHandler;
pub use worker::{JobWorker, WorkerConfig, WorkerEvent, WorkerHandle};
