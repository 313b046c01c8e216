//! HTML rendering module
//!
//! Server-rendered pages for the browser front end:
//! - Upload form
//! - Scan result (success or failure message, batch number, raw OCR text)
//! - Error page
//!
//! All user- and OCR-supplied text is escaped with `html-escape`.

mod pages;

pub use pages::{render_error, render_index, render_result};
