//! Request payloads and slide descriptors
//!
//! Field names on the wire are the ones the calling back-office sends
//! (`titulo_portada`, `pie_l`, `despedida`, ...); the Rust names say what
//! the fields mean. Values the callers are loose about (numbers where text is
//! expected, `0`/`1` for flags) are accepted and normalized.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

use crate::chart::Chart;

/// One flat weekly metrics row, columns in the order the caller sent them.
pub type Record = Map<String, Value>;

/// Accepts both `{"data": {...}}` and the bare object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Envelope<T> {
    Wrapped { data: T },
    Bare(T),
}

impl<T> Envelope<T> {
    pub fn into_inner(self) -> T {
        match self {
            Envelope::Wrapped { data } => data,
            Envelope::Bare(inner) => inner,
        }
    }
}

/// Report-level data: cover texts, footers, logo and the content slides.
///
/// This is both the `main` object of a structure request and the payload of
/// a generate request. Unknown fields are carried through untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportData {
    #[serde(rename = "titulo_portada", default, deserialize_with = "lenient_text")]
    pub cover_title: String,

    #[serde(rename = "subtitulo_portada", default, deserialize_with = "lenient_text")]
    pub cover_subtitle: String,

    /// Raw on input, normalized cover text after structure building.
    #[serde(rename = "fecha_portada", default, skip_serializing_if = "Option::is_none")]
    pub cover_date: Option<Value>,

    #[serde(rename = "pie_l", default, deserialize_with = "lenient_text")]
    pub footer_left: String,

    #[serde(rename = "pie_r", default, deserialize_with = "lenient_text")]
    pub footer_right: String,

    /// Logo file name; its stem names the company in output files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_base64: Option<String>,

    /// Produce cover and closing pages.
    #[serde(default, deserialize_with = "lenient_flag")]
    pub save: bool,

    /// 0: one report with every product; anything else: one report per product.
    #[serde(default, deserialize_with = "lenient_count")]
    pub split: u8,

    #[serde(rename = "despedida", default, skip_serializing_if = "Option::is_none")]
    pub closing: Option<Closing>,

    #[serde(default)]
    pub slides: Vec<SlideEntry>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ReportData {
    /// Company key used in output file names: the logo stem, lower-cased.
    pub fn company(&self) -> String {
        self.logo
            .as_deref()
            .and_then(|logo| Path::new(logo).file_stem())
            .map(|stem| stem.to_string_lossy().to_lowercase())
            .unwrap_or_default()
    }

    /// Cover date as display text.
    pub fn cover_date_text(&self) -> String {
        self.cover_date.as_ref().map(value_text).unwrap_or_default()
    }

    pub fn closing_title(&self) -> &str {
        self.closing.as_ref().map(|c| c.title.as_str()).unwrap_or("")
    }

    pub fn is_split(&self) -> bool {
        self.split != 0
    }
}

/// Closing slide texts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Closing {
    #[serde(rename = "titulo", default, deserialize_with = "lenient_text")]
    pub title: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One content slide: which product, what goes on it, which template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlideEntry {
    #[serde(rename = "type", default, deserialize_with = "lenient_text")]
    pub product: String,

    #[serde(default)]
    pub slide: SlideContent,

    #[serde(default = "default_file_slide")]
    pub file_slide: String,
}

fn default_file_slide() -> String {
    "plantilla_contenido.pptx".to_string()
}

/// Text and charts of a content slide.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SlideContent {
    #[serde(rename = "titulo", default, deserialize_with = "lenient_text")]
    pub title: String,

    /// One `<label>: <total>` line per KPI.
    #[serde(default, deserialize_with = "lenient_text")]
    pub kpis: String,

    #[serde(default)]
    pub charts: IndexMap<String, Chart>,

    #[serde(rename = "resumen", default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    #[serde(rename = "sugerencia", default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,

    #[serde(rename = "sugerencia_version", default, skip_serializing_if = "Option::is_none")]
    pub version_suggestion: Option<String>,
}

/// Input of the structure step.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StructureRequest {
    #[serde(default)]
    pub main: ReportData,

    #[serde(default)]
    pub products: Vec<Record>,
}

/// Input of the multi-company step.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MultiCompanyRequest {
    #[serde(default)]
    pub main: ReportData,

    /// Company codes whose reports were generated earlier, in output order.
    #[serde(default)]
    pub emp_codes: Vec<String>,

    #[serde(default)]
    pub logos_base64: Vec<String>,
}

/// Render a JSON value the way it should appear on a slide.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(value_text(&Value::deserialize(deserializer)?))
}

fn lenient_flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(lenient_number(&Value::deserialize(deserializer)?) != 0)
}

fn lenient_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    Ok(lenient_number(&Value::deserialize(deserializer)?).min(u8::MAX as u64) as u8)
}

fn lenient_number(value: &Value) -> u64 {
    match value {
        Value::Bool(b) => *b as u64,
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f > 0.0).map(|f| f.ceil() as u64))
            .unwrap_or(0),
        Value::String(s) => s.trim().parse::<u64>().unwrap_or(0),
        _ => 0,
    }
}
