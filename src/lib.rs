//! PDF Reports Library
//!
//! Builds client-facing PDF reports from weekly product metrics:
//! - Group weekly records by product and derive KPI totals and charts
//! - Fill cover, content and closing slide templates (PPTX)
//! - Convert the decks to PDF with an office converter
//! - Merge the parts into one report per company, per product, or for
//!   several companies at once
//!
//! # Example
//!
//! ```no_run
//! use pdf_reports::config::ReportConfig;
//! use pdf_reports::convert::LibreOffice;
//! use pdf_reports::model::StructureRequest;
//! use pdf_reports::report::ReportBuilder;
//! use pdf_reports::structure::build_structure;
//!
//! let config = ReportConfig::default();
//! let request: StructureRequest = serde_json::from_str(r#"{"main": {}, "products": []}"#).unwrap();
//! let data = build_structure(request, &config).expect("Failed to build structure");
//!
//! let builder = ReportBuilder::new(config.clone(), LibreOffice::from_config(&config.converter));
//! let reports = builder.generate(&data).expect("Failed to generate");
//! println!("{:?}", reports);
//! ```

pub mod chart;
pub mod config;
pub mod convert;
pub mod date;
pub mod deck;
pub mod error;
pub mod layout;
pub mod logo;
pub mod model;
pub mod pdf;
pub mod picture;
pub mod report;
pub mod structure;

// Re-export commonly used items
pub use error::{Error, Result};
