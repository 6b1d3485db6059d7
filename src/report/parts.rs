//! Cover, content and closing decks

use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::chart::{ChartDefinitions, ChartKind, ChartRenderer};
use crate::config::ReportConfig;
use crate::deck::Deck;
use crate::error::Result;
use crate::model::{ReportData, SlideEntry};
use crate::picture::Picture;

pub const PH_TITLE: &str = "{{ph_titulo}}";
pub const PH_SUBTITLE: &str = "{{ph_subtitle}}";
pub const PH_DATE: &str = "{{ph_fecha}}";
pub const PH_FOOTER_LEFT: &str = "{{ph_pie_l}}";
pub const PH_FOOTER_RIGHT: &str = "{{ph_pie_r}}";
pub const PH_SUMMARY: &str = "{{ph_resumen}}";
pub const PH_SUGGESTION: &str = "{{ph_sugerencia}}";
pub const PH_VERSION_SUGGESTION: &str = "{{ph_sugerencia_ver}}";
pub const PH_KPIS: &str = "{{ph_kpis}}";

const COVER_PART: &str = "portada.pptx";
const CLOSING_PART: &str = "cierre.pptx";

/// Everything a slide needs besides its own texts
pub struct PartContext<'a> {
    pub config: &'a ReportConfig,
    pub data: &'a ReportData,
    pub logo: Option<&'a Picture>,
}

impl PartContext<'_> {
    fn footers(&self) -> [(&'static str, String); 2] {
        [
            (PH_FOOTER_LEFT, self.data.footer_left.clone()),
            (PH_FOOTER_RIGHT, self.data.footer_right.clone()),
        ]
    }

    fn place_logo(&self, deck: &mut Deck) -> Result<()> {
        if let Some(logo) = self.logo {
            deck.insert_logo(logo, &self.config.charts.placeholders)?;
        }
        Ok(())
    }

    fn save(&self, deck: Deck, file_name: &str) -> Result<PathBuf> {
        let path = self.config.pptx_parts_dir().join(file_name);
        deck.save(&path)?;
        info!("Wrote {}", path.display());
        Ok(path)
    }
}

/// Cover: report title, subtitle, date, footers and logo
pub fn render_cover(ctx: &PartContext<'_>) -> Result<PathBuf> {
    let template = ctx.config.template_path(&ctx.config.templates.cover);
    let mut deck = Deck::open(&template)?;

    let mut replacements = vec![
        (PH_TITLE, ctx.data.cover_title.clone()),
        (PH_SUBTITLE, ctx.data.cover_subtitle.clone()),
        (PH_DATE, ctx.data.cover_date_text()),
    ];
    replacements.extend(ctx.footers());
    deck.replace_placeholders(&replacements);
    ctx.place_logo(&mut deck)?;

    ctx.save(deck, COVER_PART)
}

/// Closing: farewell title, footers and logo
pub fn render_closing(ctx: &PartContext<'_>) -> Result<PathBuf> {
    let template = ctx.config.template_path(&ctx.config.templates.closing);
    let mut deck = Deck::open(&template)?;

    let mut replacements = vec![(PH_TITLE, ctx.data.closing_title().to_string())];
    replacements.extend(ctx.footers());
    deck.replace_placeholders(&replacements);
    ctx.place_logo(&mut deck)?;

    ctx.save(deck, CLOSING_PART)
}

/// One product's content slide, saved as `contenido_<product>.pptx`
pub fn render_content(
    ctx: &PartContext<'_>,
    entry: &SlideEntry,
    charts: Option<&ChartRenderer>,
) -> Result<PathBuf> {
    let template = ctx.config.template_path(&entry.file_slide);
    let mut deck = Deck::open(&template)?;
    let content = &entry.slide;

    let mut replacements = vec![
        (PH_TITLE, content.title.clone()),
        (PH_SUMMARY, content.summary.clone().unwrap_or_default()),
        (PH_SUGGESTION, content.suggestion.clone().unwrap_or_default()),
        (PH_VERSION_SUGGESTION, content.version_suggestion.clone().unwrap_or_default()),
    ];
    replacements.extend(ctx.footers());
    if ctx.config.product(&entry.product).show_kpis {
        replacements.push((PH_KPIS, content.kpis.clone()));
    }
    deck.replace_placeholders(&replacements);

    if !content.charts.is_empty() {
        match charts {
            Some(renderer) => {
                let pictures = render_charts(ctx.config, entry, renderer)?;
                let placed = deck.insert_charts(&ctx.config.charts.placeholders, &pictures)?;
                debug!("Placed {} charts on '{}'", placed, entry.product);
            }
            None => warn!("Charts of '{}' skipped: no chart renderer", entry.product),
        }
    }

    ctx.place_logo(&mut deck)?;
    ctx.save(deck, &format!("contenido_{}.pptx", entry.product))
}

fn render_charts(config: &ReportConfig, entry: &SlideEntry, renderer: &ChartRenderer) -> Result<Vec<Picture>> {
    let definitions_path = config.chart_definitions_path(&entry.product);
    let definitions = ChartDefinitions::load(&definitions_path)?.unwrap_or_else(|| {
        warn!("No chart definitions at {}, using series ids as labels", definitions_path.display());
        ChartDefinitions::default()
    });

    let mut pictures = Vec::with_capacity(entry.slide.charts.len());
    for (name, chart) in &entry.slide.charts {
        if chart.kind == ChartKind::Unsupported {
            warn!("Chart '{}' of '{}' has an unsupported type, skipped", name, entry.product);
            continue;
        }
        match renderer.render(name, chart, &definitions) {
            Ok(picture) => pictures.push(picture),
            Err(e) => warn!("Chart '{}' of '{}' not rendered: {}", name, entry.product, e),
        }
    }
    Ok(pictures)
}
