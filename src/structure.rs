//! Weekly records to slide descriptors
//!
//! Records arrive flat and in order: a run of weekly rows for a product,
//! followed by its `resumen`/`sugerencia`/`sugerencia_version` text rows,
//! then the next product. Only the first record of a run has to name the
//! product; the rest inherit it.

use indexmap::IndexMap;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::chart::{Chart, ChartDefinitions};
use crate::config::ReportConfig;
use crate::date::normalize_cover_date;
use crate::error::{Error, Result};
use crate::model::{value_text, Record, ReportData, SlideContent, SlideEntry, StructureRequest};

/// Field naming the product of a record
pub const PRODUCT_FIELD: &str = "product";

/// Field holding the week number, or the name of a text row
pub const WEEK_FIELD: &str = "Semana";

/// Text rows, in the order they usually appear
const SUMMARY_ROW: &str = "resumen";
const SUGGESTION_ROW: &str = "sugerencia";
const VERSION_SUGGESTION_ROW: &str = "sugerencia_version";

/// Split records into per-product buckets, keeping first-appearance order
pub fn group_by_product(records: Vec<Record>) -> IndexMap<String, Vec<Record>> {
    let mut groups: IndexMap<String, Vec<Record>> = IndexMap::new();
    let mut current = String::new();

    for record in records {
        match record.get(PRODUCT_FIELD) {
            None | Some(Value::Null) => {}
            Some(product) => current = value_text(product),
        }
        groups.entry(current.clone()).or_default().push(record);
    }
    groups
}

/// The column holding a product's text rows: the second key of its first record
pub fn summary_column<'a>(records: &'a [Record], product: &str) -> Result<&'a str> {
    records
        .first()
        .and_then(|first| first.keys().nth(1))
        .map(String::as_str)
        .ok_or_else(|| {
            Error::InvalidPayload(format!(
                "first record of product '{}' needs at least two fields",
                product
            ))
        })
}

/// Slide title: the product key upper-cased up to its first dot
pub fn slide_title(product: &str) -> String {
    product.split('.').next().unwrap_or_default().to_uppercase()
}

/// Weekly counts arrive as numbers, numeric strings or nothing at all
pub fn coerce_count(value: Option<&Value>) -> i64 {
    match value {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
            .unwrap_or(0),
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map(|f| f.trunc() as i64)
            .unwrap_or(0),
        Some(Value::Bool(b)) => *b as i64,
        _ => 0,
    }
}

fn summary_text(value: Option<&Value>) -> String {
    match value.map(value_text) {
        Some(text) if text != "null" => text,
        _ => String::new(),
    }
}

/// Aggregate one product's records into its content slide
pub fn build_slide(
    records: &[Record],
    product: &str,
    definitions: &ChartDefinitions,
    summary_column: &str,
    week_labels: &[String],
) -> SlideContent {
    let mut slide = SlideContent {
        title: slide_title(product),
        ..SlideContent::default()
    };

    let mut collected: IndexMap<&str, IndexMap<&str, Vec<i64>>> = definitions
        .charts()
        .map(|(name, series)| {
            let columns = series.keys().map(|id| (id.as_str(), Vec::new())).collect();
            (name, columns)
        })
        .collect();

    for record in records {
        let row = record.get(WEEK_FIELD).map(value_text).unwrap_or_default();
        match row.trim() {
            SUMMARY_ROW => slide.summary = Some(summary_text(record.get(summary_column))),
            SUGGESTION_ROW => slide.suggestion = Some(summary_text(record.get(summary_column))),
            VERSION_SUGGESTION_ROW => {
                slide.version_suggestion = Some(summary_text(record.get(summary_column)));
                break;
            }
            _ => {
                for (name, series) in definitions.charts() {
                    let Some(values) = collected.get_mut(name) else { continue };
                    for (id, column) in series {
                        if let Some(column_values) = values.get_mut(id.as_str()) {
                            column_values.push(coerce_count(record.get(column)));
                        }
                    }
                }
            }
        }
    }

    let mut kpis: IndexMap<&str, i64> = IndexMap::new();
    for (name, series) in collected {
        let mut grand_total: i64 = 0;
        for (id, values) in &series {
            let total = values.iter().fold(0_i64, |acc, v| acc.saturating_add(*v));
            grand_total = grand_total.saturating_add(total);
            if total > 0 {
                kpis.insert(*id, total);
            }
        }

        if grand_total > 0 {
            let chart = Chart::weekly_bar(
                week_labels,
                series.into_iter().map(|(id, values)| (id.to_string(), values)),
            );
            slide.charts.insert(name.to_string(), chart);
        } else {
            debug!("Chart '{}' of '{}' has no data, skipped", name, product);
        }
    }

    slide.kpis = kpis
        .iter()
        .map(|(id, total)| format!("{}: {}\n", definitions.column(id).unwrap_or(*id), total))
        .collect();

    slide
}

/// Turn a structure request into report data with one slide per product
pub fn build_structure(request: StructureRequest, config: &ReportConfig) -> Result<ReportData> {
    let StructureRequest { mut main, products } = request;

    let date_text = normalize_cover_date(main.cover_date.as_ref());
    main.cover_date = Some(Value::String(date_text));

    let groups = group_by_product(products);
    debug!("Grouped records into {} products", groups.len());

    for (product, records) in &groups {
        let column = summary_column(records, product)?;

        let definitions_path = config.chart_definitions_path(product);
        let definitions = match ChartDefinitions::load(&definitions_path)? {
            Some(definitions) => definitions,
            None => {
                warn!(
                    "No chart definitions for '{}' at {}",
                    product,
                    definitions_path.display()
                );
                ChartDefinitions::default()
            }
        };

        let slide = build_slide(records, product, &definitions, column, &config.charts.week_labels);
        debug!(
            "Slide '{}': {} charts, {} KPI lines",
            slide.title,
            slide.charts.len(),
            slide.kpis.lines().count()
        );

        main.slides.push(SlideEntry {
            product: product.clone(),
            slide,
            file_slide: config.product(product).template,
        });
    }

    info!("Built structure with {} content slides", main.slides.len());
    Ok(main)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => panic!("test record must be an object"),
        }
    }

    fn weeks() -> Vec<String> {
        (1..=4).map(|n| format!("Semana {}", n)).collect()
    }

    fn definitions() -> ChartDefinitions {
        ChartDefinitions::from_json(
            r#"{
                "tickets": {"abiertos": "Tickets abiertos", "cerrados": "Tickets cerrados"},
                "alertas": {"criticas": "Alertas criticas"}
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_group_by_product_inherits_previous_key() {
        let records = vec![
            record(json!({"product": "uas", "Semana": "1"})),
            record(json!({"Semana": "2"})),
            record(json!({"product": "wazuh", "Semana": "1"})),
            record(json!({"product": null, "Semana": "2"})),
            record(json!({"product": "uas", "Semana": "3"})),
        ];
        let groups = group_by_product(records);

        let keys: Vec<&String> = groups.keys().collect();
        assert_eq!(keys, vec!["uas", "wazuh"]);
        assert_eq!(groups["uas"].len(), 3);
        assert_eq!(groups["wazuh"].len(), 2);
    }

    #[test]
    fn test_group_without_product_uses_empty_key() {
        let groups = group_by_product(vec![record(json!({"Semana": "1"}))]);
        assert_eq!(groups.keys().next().map(String::as_str), Some(""));
    }

    #[test]
    fn test_summary_column_is_second_key() {
        let records = vec![record(json!({"product": "uas", "Comentario": "", "Semana": "1"}))];
        assert_eq!(summary_column(&records, "uas").unwrap(), "Comentario");

        let short = vec![record(json!({"product": "uas"}))];
        assert!(summary_column(&short, "uas").is_err());
        assert!(summary_column(&[], "uas").is_err());
    }

    #[test]
    fn test_slide_title() {
        assert_eq!(slide_title("invgate.asj"), "INVGATE");
        assert_eq!(slide_title("uas"), "UAS");
        assert_eq!(slide_title(""), "");
    }

    #[test]
    fn test_coerce_count() {
        assert_eq!(coerce_count(Some(&json!(3))), 3);
        assert_eq!(coerce_count(Some(&json!(3.9))), 3);
        assert_eq!(coerce_count(Some(&json!("12"))), 12);
        assert_eq!(coerce_count(Some(&json!(" 7.5 "))), 7);
        assert_eq!(coerce_count(Some(&json!("n/a"))), 0);
        assert_eq!(coerce_count(Some(&json!(true))), 1);
        assert_eq!(coerce_count(Some(&Value::Null)), 0);
        assert_eq!(coerce_count(None), 0);
    }

    #[test]
    fn test_build_slide_kpis_and_charts() {
        let records = vec![
            record(json!({"product": "uas", "Notas": "", "Semana": "1", "Tickets abiertos": 2, "Tickets cerrados": 0, "Alertas criticas": 0})),
            record(json!({"Notas": "", "Semana": "2", "Tickets abiertos": "3", "Tickets cerrados": 0})),
            record(json!({"Notas": "", "Semana": "3", "Tickets abiertos": 0, "Tickets cerrados": 0})),
            record(json!({"Notas": "", "Semana": "4", "Tickets abiertos": 1, "Tickets cerrados": 0})),
            record(json!({"Notas": "Todo en orden", "Semana": " resumen "})),
            record(json!({"Notas": "null", "Semana": "sugerencia"})),
        ];

        let slide = build_slide(&records, "uas", &definitions(), "Notas", &weeks());

        assert_eq!(slide.title, "UAS");
        assert_eq!(slide.kpis, "Tickets abiertos: 6\n");
        assert_eq!(slide.summary.as_deref(), Some("Todo en orden"));
        assert_eq!(slide.suggestion.as_deref(), Some(""));
        assert_eq!(slide.version_suggestion, None);

        assert_eq!(slide.charts.len(), 1);
        let tickets = &slide.charts["tickets"];
        assert_eq!(tickets.labels, weeks());
        assert_eq!(tickets.series["abiertos"], json!([2, 3, 0, 1]));
        assert_eq!(tickets.series["cerrados"], json!([0, 0, 0, 0]));
    }

    #[test]
    fn test_build_slide_stops_after_version_suggestion() {
        let records = vec![
            record(json!({"product": "uas", "Notas": "", "Semana": "1", "Alertas criticas": 5})),
            record(json!({"Notas": "v2.1", "Semana": "sugerencia_version"})),
            record(json!({"Notas": "", "Semana": "2", "Alertas criticas": 100})),
        ];

        let slide = build_slide(&records, "uas", &definitions(), "Notas", &weeks());

        assert_eq!(slide.version_suggestion.as_deref(), Some("v2.1"));
        assert_eq!(slide.kpis, "Alertas criticas: 5\n");
        assert_eq!(slide.charts["alertas"].series["criticas"], json!([5]));
    }

    #[test]
    fn test_shared_series_id_keeps_first_position() {
        let definitions = ChartDefinitions::from_json(
            r#"{"uno": {"a": "Col A", "b": "Col B"}, "dos": {"a": "Col A2"}}"#,
        )
        .unwrap();
        let records = vec![record(json!({
            "product": "x", "Notas": "", "Semana": "1", "Col A": 1, "Col B": 2, "Col A2": 9
        }))];

        let slide = build_slide(&records, "x", &definitions, "Notas", &weeks());

        assert_eq!(slide.kpis, "Col A2: 9\nCol B: 2\n");
        assert_eq!(slide.charts.len(), 2);
    }

    #[test]
    fn test_huge_weekly_counts_saturate() {
        let definitions = ChartDefinitions::from_json(r#"{"uno": {"a": "A", "b": "B"}}"#).unwrap();
        let records = vec![
            record(json!({"product": "x", "Notas": "", "Semana": "1", "A": i64::MAX, "B": i64::MAX})),
            record(json!({"Notas": "", "Semana": "2", "A": 1, "B": "1e30"})),
        ];

        let slide = build_slide(&records, "x", &definitions, "Notas", &weeks());

        assert_eq!(slide.kpis, format!("A: {}\nB: {}\n", i64::MAX, i64::MAX));
        assert_eq!(slide.charts.len(), 1);
    }

    #[test]
    fn test_build_slide_without_definitions() {
        let records = vec![record(json!({"product": "x", "Notas": "", "Semana": "1"}))];
        let slide = build_slide(&records, "x", &ChartDefinitions::default(), "Notas", &weeks());

        assert!(slide.charts.is_empty());
        assert_eq!(slide.kpis, "");
    }
}
