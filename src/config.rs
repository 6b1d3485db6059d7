//! Configuration file handling.
//!
//! Every setting has a default, so running without a config file reproduces
//! the standard `/data` layout and the fixed product table.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use crate::error::{Error, Result};

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Base directory holding templates, chart definitions and outputs.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Sub-directories of `data_dir`.
    #[serde(default)]
    pub paths: PathsConfig,

    /// Template file names.
    #[serde(default)]
    pub templates: TemplatesConfig,

    /// External PDF converter.
    #[serde(default)]
    pub converter: ConverterConfig,

    /// Chart rendering.
    #[serde(default)]
    pub charts: ChartConfig,

    /// Per-product content slide settings, layered over the built-in table.
    #[serde(default = "default_products", deserialize_with = "products_over_defaults")]
    pub products: BTreeMap<String, ProductConfig>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            paths: PathsConfig::default(),
            templates: TemplatesConfig::default(),
            converter: ConverterConfig::default(),
            charts: ChartConfig::default(),
            products: default_products(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("/data")
}

/// Directory names relative to `data_dir`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_templates_dir")]
    pub templates: String,
    #[serde(default = "default_charts_dir")]
    pub charts: String,
    #[serde(default = "default_pptx_parts_dir")]
    pub pptx_parts: String,
    #[serde(default = "default_pdf_parts_dir")]
    pub pdf_parts: String,
    #[serde(default = "default_output_dir")]
    pub output: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            templates: default_templates_dir(),
            charts: default_charts_dir(),
            pptx_parts: default_pptx_parts_dir(),
            pdf_parts: default_pdf_parts_dir(),
            output: default_output_dir(),
        }
    }
}

fn default_templates_dir() -> String {
    "plantillas".to_string()
}

fn default_charts_dir() -> String {
    "charts".to_string()
}

fn default_pptx_parts_dir() -> String {
    "pptx-parts".to_string()
}

fn default_pdf_parts_dir() -> String {
    "pdf-parts".to_string()
}

fn default_output_dir() -> String {
    "generados".to_string()
}

/// Template file names inside the templates directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplatesConfig {
    #[serde(default = "default_cover_template")]
    pub cover: String,
    #[serde(default = "default_closing_template")]
    pub closing: String,
    /// Content template for products missing from `[products]`.
    #[serde(default = "default_content_template")]
    pub content: String,
}

impl Default for TemplatesConfig {
    fn default() -> Self {
        Self {
            cover: default_cover_template(),
            closing: default_closing_template(),
            content: default_content_template(),
        }
    }
}

fn default_cover_template() -> String {
    "plantilla_portada.pptx".to_string()
}

fn default_closing_template() -> String {
    "plantilla_cierre.pptx".to_string()
}

fn default_content_template() -> String {
    "plantilla_contenido.pptx".to_string()
}

const NO_KPIS_TEMPLATE: &str = "plantilla_contenido_no_kpis.pptx";

/// Office-to-PDF converter settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConverterConfig {
    /// Converter executable, looked up on PATH unless absolute.
    #[serde(default = "default_converter_binary")]
    pub binary: String,

    /// Where throw-away converter profiles are created.
    #[serde(default = "default_profile_root")]
    pub profile_root: PathBuf,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            binary: default_converter_binary(),
            profile_root: default_profile_root(),
        }
    }
}

fn default_converter_binary() -> String {
    "libreoffice".to_string()
}

fn default_profile_root() -> PathBuf {
    std::env::temp_dir()
}

/// Chart rendering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartConfig {
    /// Names of the picture placeholders that receive charts.
    #[serde(default = "default_chart_placeholders")]
    pub placeholders: Vec<String>,

    /// Series colours as `#rrggbb`, cycled when a chart has more series.
    #[serde(default = "default_palette")]
    pub palette: Vec<String>,

    /// TrueType font used for chart titles, ticks and legends.
    #[serde(default = "default_chart_font")]
    pub font: PathBuf,

    /// Image width in pixels.
    #[serde(default = "default_chart_width")]
    pub width: u32,

    /// Image height in pixels.
    #[serde(default = "default_chart_height")]
    pub height: u32,

    /// X axis labels of the weekly charts.
    #[serde(default = "default_week_labels")]
    pub week_labels: Vec<String>,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            placeholders: default_chart_placeholders(),
            palette: default_palette(),
            font: default_chart_font(),
            width: default_chart_width(),
            height: default_chart_height(),
            week_labels: default_week_labels(),
        }
    }
}

fn default_chart_placeholders() -> Vec<String> {
    [6, 9, 11, 10, 12]
        .iter()
        .map(|n| format!("Marcador de posición de imagen {}", n))
        .collect()
}

fn default_palette() -> Vec<String> {
    vec![
        "#4f81bd".to_string(),
        "#9abb59".to_string(),
        "#4bacc6".to_string(),
        "#8064a2".to_string(),
    ]
}

fn default_chart_font() -> PathBuf {
    PathBuf::from("/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf")
}

fn default_chart_width() -> u32 {
    1500
}

fn default_chart_height() -> u32 {
    750
}

fn default_week_labels() -> Vec<String> {
    (1..=4).map(|n| format!("Semana {}", n)).collect()
}

/// Content slide settings for one product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductConfig {
    /// Content template file name.
    #[serde(default = "default_content_template")]
    pub template: String,

    /// Whether the `{{ph_kpis}}` placeholder is filled.
    #[serde(default = "default_true")]
    pub show_kpis: bool,
}

impl Default for ProductConfig {
    fn default() -> Self {
        Self {
            template: default_content_template(),
            show_kpis: true,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_products() -> BTreeMap<String, ProductConfig> {
    let mut products = BTreeMap::new();
    for key in ["uas", "ardid", "invgate", "beyondtrust", "whalemate"] {
        products.insert(key.to_string(), ProductConfig::default());
    }
    products.insert(
        "invgate.asj".to_string(),
        ProductConfig {
            template: NO_KPIS_TEMPLATE.to_string(),
            show_kpis: true,
        },
    );
    products.insert(
        "wazuh".to_string(),
        ProductConfig {
            template: NO_KPIS_TEMPLATE.to_string(),
            show_kpis: false,
        },
    );
    products
}

fn products_over_defaults<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<BTreeMap<String, ProductConfig>, D::Error> {
    let mut products = default_products();
    products.extend(BTreeMap::<String, ProductConfig>::deserialize(deserializer)?);
    Ok(products)
}

impl ReportConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        let config: ReportConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Generate a default config file content.
    pub fn default_toml() -> String {
        toml::to_string_pretty(&ReportConfig::default()).unwrap_or_default()
    }

    pub fn templates_dir(&self) -> PathBuf {
        self.data_dir.join(&self.paths.templates)
    }

    pub fn charts_dir(&self) -> PathBuf {
        self.data_dir.join(&self.paths.charts)
    }

    pub fn pptx_parts_dir(&self) -> PathBuf {
        self.data_dir.join(&self.paths.pptx_parts)
    }

    pub fn pdf_parts_dir(&self) -> PathBuf {
        self.data_dir.join(&self.paths.pdf_parts)
    }

    pub fn output_dir(&self) -> PathBuf {
        self.data_dir.join(&self.paths.output)
    }

    /// Full path of a template file.
    pub fn template_path(&self, file_name: &str) -> PathBuf {
        self.templates_dir().join(file_name)
    }

    /// Chart definition file of a product.
    pub fn chart_definitions_path(&self, product: &str) -> PathBuf {
        self.charts_dir().join(format!("chart_{}.json", product))
    }

    /// Settings of a product, falling back to the generic content template.
    pub fn product(&self, key: &str) -> ProductConfig {
        self.products.get(key).cloned().unwrap_or_else(|| ProductConfig {
            template: self.templates.content.clone(),
            show_kpis: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ReportConfig::default();
        assert_eq!(config.data_dir, PathBuf::from("/data"));
        assert_eq!(config.templates_dir(), PathBuf::from("/data/plantillas"));
        assert_eq!(config.output_dir(), PathBuf::from("/data/generados"));
        assert_eq!(config.charts.placeholders.len(), 5);
        assert_eq!(config.charts.week_labels[1], "Semana 2");
    }

    #[test]
    fn test_default_product_table() {
        let config = ReportConfig::default();
        assert_eq!(config.product("uas").template, "plantilla_contenido.pptx");
        assert_eq!(config.product("invgate.asj").template, NO_KPIS_TEMPLATE);
        assert!(config.product("invgate.asj").show_kpis);
        assert!(!config.product("wazuh").show_kpis);

        let unknown = config.product("newproduct");
        assert_eq!(unknown.template, "plantilla_contenido.pptx");
        assert!(unknown.show_kpis);
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r##"
data_dir = "/srv/reports"

[paths]
output = "out"

[charts]
width = 800
palette = ["#000000"]

[products.acme]
template = "acme.pptx"
show_kpis = false
"##;

        let config: ReportConfig = toml::from_str(toml_content).unwrap();
        assert_eq!(config.output_dir(), PathBuf::from("/srv/reports/out"));
        assert_eq!(config.pdf_parts_dir(), PathBuf::from("/srv/reports/pdf-parts"));
        assert_eq!(config.charts.width, 800);
        assert_eq!(config.charts.height, 750);
        assert_eq!(config.charts.palette, vec!["#000000".to_string()]);
        assert!(!config.product("acme").show_kpis);
        // Built-in entries survive alongside the new one
        assert!(config.products.contains_key("uas"));
        assert!(!config.product("wazuh").show_kpis);
    }

    #[test]
    fn test_product_entries_override_built_ins() {
        let toml_content = r#"
[products.wazuh]
show_kpis = true

[products.newproduct]
template = "nuevo.pptx"
"#;

        let config: ReportConfig = toml::from_str(toml_content).unwrap();
        assert!(config.product("wazuh").show_kpis);
        assert_eq!(config.product("wazuh").template, "plantilla_contenido.pptx");
        assert_eq!(config.product("newproduct").template, "nuevo.pptx");
        assert_eq!(config.product("invgate.asj").template, NO_KPIS_TEMPLATE);
        assert_eq!(config.products.len(), default_products().len() + 1);
    }

    #[test]
    fn test_chart_definitions_path() {
        let config = ReportConfig::default();
        assert_eq!(
            config.chart_definitions_path("invgate.asj"),
            PathBuf::from("/data/charts/chart_invgate.asj.json")
        );
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = ReportConfig::default_toml();
        assert!(toml_str.contains("data_dir"));
        assert!(toml_str.contains("[products.wazuh]"));

        let parsed: ReportConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.products, ReportConfig::default().products);
    }
}
