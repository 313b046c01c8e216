//! Scan Module
//!
//! Runs the full batch number scan for an upload: digest lookup in the result
//! cache, OCR under a job permit, then batch number matching.

mod cache;
mod service;
mod types;

pub use cache::ScanCache;
pub use service::ScanService;
pub use types::{
    ScanError, ScanOutcome, MESSAGE_FOUND, MESSAGE_INVALID_UPLOAD, MESSAGE_NOT_FOUND,
    MESSAGE_OCR_FAILED,
};
