//! PDF assembly and inspection

pub mod merge;
pub mod metadata;

pub use merge::{merge_pdfs, MergeOptions};
pub use metadata::{count_pages, extract_metadata, PdfMetadata};
