//! Chart descriptors, per-product chart definitions and chart images
//!
//! A product's definition file (`chart_<product>.json`) maps every chart to
//! its series, and every series id to the record column it is read from:
//!
//! ```json
//! { "tickets": { "abiertos": "Tickets abiertos", "cerrados": "Tickets cerrados" } }
//! ```
//!
//! The column name doubles as the human label of the series in KPI text and
//! chart legends.

use image::{DynamicImage, RgbImage};
use indexmap::IndexMap;
use plotters::coord::types::RangedCoordf64;
use plotters::coord::Shift;
use plotters::prelude::*;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::path::Path;
use std::sync::Mutex;
use tracing::debug;

use crate::config::ChartConfig;
use crate::error::{Error, Result};
use crate::model::value_text;
use crate::picture::Picture;

/// Chart types the renderer understands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    #[default]
    Bar,
    Line,
    #[serde(other)]
    Unsupported,
}

/// A chart as carried in a slide descriptor
///
/// Series are the remaining keys of the JSON object, in order; only arrays
/// of numbers are drawn.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Chart {
    #[serde(rename = "type", default)]
    pub kind: ChartKind,

    #[serde(default, deserialize_with = "lenient_labels")]
    pub labels: Vec<String>,

    #[serde(default, deserialize_with = "lenient_title", skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Spanish spelling of `title`, used when `title` is absent or empty
    #[serde(
        rename = "titulo",
        default,
        deserialize_with = "lenient_title",
        skip_serializing_if = "Option::is_none"
    )]
    pub titulo: Option<String>,

    #[serde(flatten)]
    pub series: IndexMap<String, Value>,
}

fn lenient_labels<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Vec<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items.iter().map(value_text).collect(),
        _ => Vec::new(),
    })
}

fn lenient_title<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => None,
        other => Some(value_text(&other)),
    })
}

impl Chart {
    /// Bar chart of weekly counts
    pub fn weekly_bar<I>(labels: &[String], series: I) -> Self
    where
        I: IntoIterator<Item = (String, Vec<i64>)>,
    {
        Self {
            kind: ChartKind::Bar,
            labels: labels.to_vec(),
            title: None,
            titulo: None,
            series: series
                .into_iter()
                .map(|(id, values)| (id, Value::from(values)))
                .collect(),
        }
    }

    /// Explicit title, `title` first then `titulo`; empty strings count as absent
    pub fn explicit_title(&self) -> Option<&str> {
        [&self.title, &self.titulo]
            .into_iter()
            .filter_map(|t| t.as_deref())
            .find(|t| !t.is_empty())
    }

    /// Series made only of numbers, in declaration order
    pub fn numeric_series(&self) -> Vec<(&str, Vec<f64>)> {
        self.series
            .iter()
            .filter_map(|(key, value)| {
                let items = value.as_array()?;
                let numbers = items
                    .iter()
                    .map(|item| if item.is_number() { item.as_f64() } else { None })
                    .collect::<Option<Vec<f64>>>()?;
                Some((key.as_str(), numbers))
            })
            .collect()
    }
}

/// Chart name → series id → record column
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChartDefinitions {
    charts: IndexMap<String, IndexMap<String, String>>,
}

impl ChartDefinitions {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Load a definition file; `None` when the product has none.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text).map(Some)
    }

    /// Charts with their series (id, column), in file order
    pub fn charts(&self) -> impl Iterator<Item = (&str, &IndexMap<String, String>)> {
        self.charts.iter().map(|(name, series)| (name.as_str(), series))
    }

    /// Column (and label) of a series id; a later chart wins on duplicates.
    pub fn column(&self, series_id: &str) -> Option<&str> {
        self.charts
            .values()
            .rev()
            .find_map(|series| series.get(series_id))
            .map(String::as_str)
    }
}

/// `"tickets_abiertos"` → `"Tickets abiertos"`
pub fn humanize(key: &str) -> String {
    let spaced = key.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// `1234567` → `"1,234,567"`
pub fn format_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, digit) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    if value < 0 {
        grouped.insert(0, '-');
    }
    grouped
}

/// Greedy word wrap used for legend entries
pub fn wrap_label(text: &str, width: usize) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if !current.is_empty() && current.chars().count() + 1 + word.chars().count() > width {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// `#rrggbb` → colour
pub fn parse_hex_color(hex: &str) -> Option<RGBColor> {
    let hex = hex.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16).ok();
    Some(RGBColor(channel(0..2)?, channel(2..4)?, channel(4..6)?))
}

const GRID_COLOR: RGBColor = RGBColor(0xdc, 0xdc, 0xdc);
const LEGEND_WRAP: usize = 22;
const GROUP_WIDTH: f64 = 0.7;

static FONT_REGISTERED: Mutex<bool> = Mutex::new(false);

/// Register the chart font with the plotters text backend
///
/// The font file is read on every call so a bad path always fails; the
/// backend registry is global, so only the first readable font is kept.
fn register_chart_font(path: &Path) -> Result<()> {
    let bytes = std::fs::read(path).map_err(|e| Error::Chart(format!("{}: {}", path.display(), e)))?;
    let mut registered = FONT_REGISTERED
        .lock()
        .map_err(|_| Error::Chart("font registry lock poisoned".to_string()))?;
    if *registered {
        return Ok(());
    }

    let bytes: &'static [u8] = Box::leak(bytes.into_boxed_slice());
    for style in [FontStyle::Normal, FontStyle::Bold] {
        plotters::style::register_font("sans-serif", style, bytes)
            .map_err(|_| Error::Chart(format!("{} is not a usable TrueType font", path.display())))?;
    }
    *registered = true;
    Ok(())
}

fn chart_error<E: std::fmt::Display>(e: E) -> Error {
    Error::Chart(e.to_string())
}

struct PlotSeries {
    label: String,
    values: Vec<f64>,
    color: RGBColor,
}

/// Draws chart descriptors into PNG pictures
#[derive(Debug, Clone)]
pub struct ChartRenderer {
    width: u32,
    height: u32,
    palette: Vec<RGBColor>,
}

impl ChartRenderer {
    /// Fails when the configured font cannot be loaded; charts need text.
    pub fn from_config(config: &ChartConfig) -> Result<Self> {
        register_chart_font(&config.font)?;

        let mut palette: Vec<RGBColor> =
            config.palette.iter().filter_map(|hex| parse_hex_color(hex)).collect();
        if palette.is_empty() {
            palette.push(RGBColor(0x4f, 0x81, 0xbd));
        }

        Ok(Self {
            width: config.width.max(200),
            height: config.height.max(100),
            palette,
        })
    }

    /// Render one chart; legend labels come from the product definitions.
    pub fn render(&self, name: &str, chart: &Chart, definitions: &ChartDefinitions) -> Result<Picture> {
        let title = chart
            .explicit_title()
            .map(str::to_string)
            .unwrap_or_else(|| humanize(name));

        let series: Vec<PlotSeries> = chart
            .numeric_series()
            .into_iter()
            .enumerate()
            .map(|(i, (key, values))| PlotSeries {
                label: definitions
                    .column(key)
                    .map(str::to_string)
                    .unwrap_or_else(|| humanize(key)),
                values: fit_to_labels(values, chart.labels.len(), chart.kind),
                color: self.palette[i % self.palette.len()],
            })
            .collect();

        debug!("Rendering {:?} chart '{}' with {} series", chart.kind, name, series.len());

        let mut buffer = vec![255u8; self.width as usize * self.height as usize * 3];
        {
            let root = BitMapBackend::with_buffer(&mut buffer, (self.width, self.height))
                .into_drawing_area();
            root.fill(&WHITE).map_err(chart_error)?;

            let legend_width = (self.width / 4) as i32;
            let (plot_area, legend_area) = root.split_horizontally(self.width as i32 - legend_width);

            match chart.kind {
                ChartKind::Bar => self.draw_bars(&plot_area, &title, &chart.labels, &series)?,
                ChartKind::Line => self.draw_lines(&plot_area, &title, &chart.labels, &series)?,
                ChartKind::Unsupported => {
                    return Err(Error::Chart(format!("chart '{}' has an unsupported type", name)))
                }
            }
            draw_legend(&legend_area, &series)?;
            root.present().map_err(chart_error)?;
        }

        let image = RgbImage::from_raw(self.width, self.height, buffer)
            .ok_or_else(|| Error::Chart("chart buffer has the wrong size".to_string()))?;
        Picture::from_image(&DynamicImage::ImageRgb8(image))
    }

    fn draw_bars<DB: DrawingBackend>(
        &self,
        area: &DrawingArea<DB, Shift>,
        title: &str,
        labels: &[String],
        series: &[PlotSeries],
    ) -> Result<()> {
        let slots = labels.len().max(1);
        let y_max = series
            .iter()
            .flat_map(|s| s.values.iter().copied())
            .fold(0.0_f64, f64::max);
        let y_top = if y_max > 0.0 { y_max * 1.15 } else { 1.0 };

        let mut ctx = ChartBuilder::on(area)
            .caption(title, font(40.0, FontStyle::Bold))
            .margin(24)
            .x_label_area_size(60)
            .y_label_area_size(110)
            .build_cartesian_2d(-0.5_f64..(slots as f64 - 0.5), 0.0_f64..y_top)
            .map_err(chart_error)?;

        configure_axes(&mut ctx, labels, slots)?;

        let bar_width = GROUP_WIDTH / series.len().max(1) as f64;
        let half = bar_width * 0.95 / 2.0;
        let centre = (series.len() as f64 - 1.0) / 2.0;
        for (idx, s) in series.iter().enumerate() {
            let offset = (idx as f64 - centre) * bar_width;
            let color = s.color;
            ctx.draw_series(s.values.iter().enumerate().map(move |(i, value)| {
                let x = i as f64 + offset;
                Rectangle::new([(x - half, 0.0), (x + half, *value)], color.filled())
            }))
            .map_err(chart_error)?;
        }
        Ok(())
    }

    fn draw_lines<DB: DrawingBackend>(
        &self,
        area: &DrawingArea<DB, Shift>,
        title: &str,
        labels: &[String],
        series: &[PlotSeries],
    ) -> Result<()> {
        let slots = labels.len().max(1);
        let values = series.iter().flat_map(|s| s.values.iter().copied());
        let (y_min, y_max) = values.fold((0.0_f64, 0.0_f64), |(lo, hi), v| (lo.min(v), hi.max(v)));
        let span = (y_max - y_min).max(1.0);

        let mut ctx = ChartBuilder::on(area)
            .caption(title, font(40.0, FontStyle::Bold))
            .margin(24)
            .x_label_area_size(60)
            .y_label_area_size(110)
            .build_cartesian_2d(-0.5_f64..(slots as f64 - 0.5), y_min..(y_min + span * 1.15))
            .map_err(chart_error)?;

        configure_axes(&mut ctx, labels, slots)?;

        for s in series {
            let color = s.color;
            let points: Vec<(f64, f64)> =
                s.values.iter().enumerate().map(|(i, v)| (i as f64, *v)).collect();
            ctx.draw_series(LineSeries::new(points.clone(), color.stroke_width(3)))
                .map_err(chart_error)?;
            ctx.draw_series(points.into_iter().map(move |p| Circle::new(p, 6, color.filled())))
                .map_err(chart_error)?;
        }
        Ok(())
    }
}

fn font(size: f64, style: FontStyle) -> FontDesc<'static> {
    FontDesc::new(FontFamily::SansSerif, size, style)
}

fn configure_axes<DB: DrawingBackend>(
    ctx: &mut ChartContext<'_, DB, Cartesian2d<RangedCoordf64, RangedCoordf64>>,
    labels: &[String],
    slots: usize,
) -> Result<()> {
    let x_formatter = |x: &f64| label_at(labels, *x);
    let y_formatter = |y: &f64| format_thousands(*y as i64);
    ctx.configure_mesh()
        .disable_x_mesh()
        .max_light_lines(0)
        .bold_line_style(GRID_COLOR.stroke_width(1))
        .x_labels(slots)
        .x_label_formatter(&x_formatter)
        .y_label_formatter(&y_formatter)
        .label_style(font(28.0, FontStyle::Normal))
        .draw()
        .map_err(chart_error)
}

fn draw_legend<DB: DrawingBackend>(area: &DrawingArea<DB, Shift>, series: &[PlotSeries]) -> Result<()> {
    const LINE_HEIGHT: i32 = 32;
    const GAP: i32 = 24;

    let wrapped: Vec<Vec<String>> = series.iter().map(|s| wrap_label(&s.label, LEGEND_WRAP)).collect();
    let total: i32 = wrapped
        .iter()
        .map(|lines| lines.len().max(1) as i32 * LINE_HEIGHT + GAP)
        .sum();
    let (_, height) = area.dim_in_pixel();
    let mut y = ((height as i32 - total) / 2).max(0);

    for (s, lines) in series.iter().zip(&wrapped) {
        area.draw(&Rectangle::new([(8, y + 4), (36, y + 28)], s.color.filled()))
            .map_err(chart_error)?;
        for (i, line) in lines.iter().enumerate() {
            let line_y = y + i as i32 * LINE_HEIGHT;
            area.draw(&Text::new(line.clone(), (46, line_y), font(26.0, FontStyle::Normal)))
                .map_err(chart_error)?;
        }
        y += lines.len().max(1) as i32 * LINE_HEIGHT + GAP;
    }
    Ok(())
}

/// X tick label for a slot centre; ticks between slots stay blank
fn label_at(labels: &[String], x: f64) -> String {
    let slot = x.round();
    if (x - slot).abs() > 1e-6 || slot < 0.0 {
        return String::new();
    }
    labels.get(slot as usize).cloned().unwrap_or_default()
}

/// Bars pad missing weeks with 0; lines only drop the surplus
fn fit_to_labels(mut values: Vec<f64>, label_count: usize, kind: ChartKind) -> Vec<f64> {
    if values.len() > label_count {
        values.truncate(label_count);
    } else if kind == ChartKind::Bar {
        values.resize(label_count, 0.0);
    }
    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_chart_descriptor_wire_format() {
        let chart: Chart = serde_json::from_value(json!({
            "type": "bar",
            "labels": ["Semana 1", "Semana 2"],
            "titulo": "Tickets",
            "abiertos": [1, 2],
            "nota": "ignored"
        }))
        .unwrap();

        assert_eq!(chart.kind, ChartKind::Bar);
        assert_eq!(chart.explicit_title(), Some("Tickets"));
        let series = chart.numeric_series();
        assert_eq!(series, vec![("abiertos", vec![1.0, 2.0])]);
    }

    #[test]
    fn test_title_and_titulo_together() {
        let chart: Chart = serde_json::from_value(json!({
            "title": "T",
            "titulo": "U",
            "labels": ["a"],
            "v": [1]
        }))
        .unwrap();
        assert_eq!(chart.explicit_title(), Some("T"));
        assert_eq!(chart.numeric_series(), vec![("v", vec![1.0])]);

        let fallback: Chart = serde_json::from_value(json!({"title": "", "titulo": "U"})).unwrap();
        assert_eq!(fallback.explicit_title(), Some("U"));

        let untitled: Chart = serde_json::from_value(json!({"title": null})).unwrap();
        assert_eq!(untitled.explicit_title(), None);
    }

    #[test]
    fn test_numeric_labels_are_accepted() {
        let chart: Chart = serde_json::from_value(json!({"labels": [1, 2.5, "S3", null], "v": [1, 2]})).unwrap();
        assert_eq!(chart.labels, vec!["1", "2.5", "S3", ""]);

        let missing: Chart = serde_json::from_value(json!({"labels": null})).unwrap();
        assert!(missing.labels.is_empty());
    }

    #[test]
    fn test_unknown_chart_type() {
        let chart: Chart = serde_json::from_value(json!({"type": "pie", "labels": []})).unwrap();
        assert_eq!(chart.kind, ChartKind::Unsupported);
    }

    #[test]
    fn test_weekly_bar_keeps_series_order() {
        let labels = vec!["Semana 1".to_string()];
        let chart = Chart::weekly_bar(
            &labels,
            vec![("b".to_string(), vec![1]), ("a".to_string(), vec![2])],
        );
        let value = serde_json::to_value(&chart).unwrap();
        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["type", "labels", "b", "a"]);
    }

    #[test]
    fn test_definitions_column_lookup() {
        let defs = ChartDefinitions::from_json(
            r#"{"uno": {"a": "Columna A", "b": "Columna B"}, "dos": {"a": "Otra A"}}"#,
        )
        .unwrap();

        assert_eq!(defs.column("a"), Some("Otra A"));
        assert_eq!(defs.column("b"), Some("Columna B"));
        assert_eq!(defs.column("z"), None);
        let names: Vec<&str> = defs.charts().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["uno", "dos"]);
    }

    #[test]
    fn test_load_missing_definitions() {
        let loaded = ChartDefinitions::load(Path::new("/nonexistent/chart_x.json")).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_humanize() {
        assert_eq!(humanize("tickets_ABIERTOS"), "Tickets abiertos");
        assert_eq!(humanize(""), "");
    }

    #[test]
    fn test_format_thousands() {
        assert_eq!(format_thousands(0), "0");
        assert_eq!(format_thousands(999), "999");
        assert_eq!(format_thousands(1000), "1,000");
        assert_eq!(format_thousands(1234567), "1,234,567");
        assert_eq!(format_thousands(-45000), "-45,000");
    }

    #[test]
    fn test_wrap_label() {
        assert_eq!(
            wrap_label("Vulnerabilidades críticas detectadas", 22),
            vec!["Vulnerabilidades".to_string(), "críticas detectadas".to_string()]
        );
        assert_eq!(wrap_label("corto", 22), vec!["corto".to_string()]);
        assert!(wrap_label("   ", 22).is_empty());
    }

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(parse_hex_color("#4f81bd"), Some(RGBColor(0x4f, 0x81, 0xbd)));
        assert_eq!(parse_hex_color("9abb59"), Some(RGBColor(0x9a, 0xbb, 0x59)));
        assert_eq!(parse_hex_color("#fff"), None);
        assert_eq!(parse_hex_color("#zzzzzz"), None);
    }

    #[test]
    fn test_label_at() {
        let labels = vec!["S1".to_string(), "S2".to_string()];
        assert_eq!(label_at(&labels, 0.0), "S1");
        assert_eq!(label_at(&labels, 1.0000001), "S2");
        assert_eq!(label_at(&labels, 0.5), "");
        assert_eq!(label_at(&labels, 2.0), "");
        assert_eq!(label_at(&labels, -1.0), "");
    }

    #[test]
    fn test_fit_to_labels() {
        assert_eq!(fit_to_labels(vec![1.0], 3, ChartKind::Bar), vec![1.0, 0.0, 0.0]);
        assert_eq!(fit_to_labels(vec![1.0], 3, ChartKind::Line), vec![1.0]);
        assert_eq!(fit_to_labels(vec![1.0, 2.0, 3.0], 2, ChartKind::Line), vec![1.0, 2.0]);
    }

    const SYSTEM_FONT: &str = "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf";

    fn system_renderer() -> Option<ChartRenderer> {
        if !Path::new(SYSTEM_FONT).exists() {
            eprintln!("Skipping test: {} not found", SYSTEM_FONT);
            return None;
        }
        let config = ChartConfig {
            font: SYSTEM_FONT.into(),
            ..ChartConfig::default()
        };
        Some(ChartRenderer::from_config(&config).expect("Failed to set up renderer"))
    }

    #[test]
    fn test_renderer_requires_font() {
        let config = ChartConfig {
            font: "/nonexistent/font.ttf".into(),
            ..ChartConfig::default()
        };
        assert!(matches!(ChartRenderer::from_config(&config), Err(Error::Chart(_))));
    }

    #[test]
    fn test_render_bar_chart() {
        let Some(renderer) = system_renderer() else { return };
        let labels: Vec<String> = ["1", "2", "3"].iter().map(|s| s.to_string()).collect();
        let chart = Chart::weekly_bar(
            &labels,
            [("abiertos".to_string(), vec![3, 4, 0]), ("cerrados".to_string(), vec![2, 0, 1])],
        );
        let definitions = ChartDefinitions::from_json(
            r#"{"tickets": {"abiertos": "Tickets abiertos", "cerrados": "Tickets cerrados"}}"#,
        )
        .unwrap();

        let picture = renderer.render("tickets", &chart, &definitions).expect("Bar chart failed");
        assert_eq!((picture.width, picture.height), (1500, 750));
        assert!(picture.png.starts_with(b"\x89PNG"));
    }

    #[test]
    fn test_render_line_chart() {
        let Some(renderer) = system_renderer() else { return };
        let chart: Chart = serde_json::from_value(json!({
            "type": "line",
            "titulo": "Eventos",
            "labels": [1, 2, 3, 4],
            "eventos": [120, 80.5, 3000, 0],
            "notas": ["no", "numerico"]
        }))
        .unwrap();

        let picture = renderer
            .render("eventos", &chart, &ChartDefinitions::default())
            .expect("Line chart failed");
        assert_eq!((picture.width, picture.height), (1500, 750));
        assert!(picture.png.starts_with(b"\x89PNG"));
    }

    #[test]
    fn test_render_unsupported_type_fails() {
        let Some(renderer) = system_renderer() else { return };
        let chart: Chart = serde_json::from_value(json!({"type": "pie", "labels": ["a"], "v": [1]})).unwrap();
        assert!(renderer.render("torta", &chart, &ChartDefinitions::default()).is_err());
    }
}
