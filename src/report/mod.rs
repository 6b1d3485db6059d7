//! Report generation: decks, PDF conversion and the final merge

pub mod parts;

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::chart::ChartRenderer;
use crate::config::ReportConfig;
use crate::convert::PdfConverter;
use crate::error::{Error, Result};
use crate::logo::{composite_logos, decode_logo, COMPOSITE_LOGO_HEIGHT};
use crate::model::{MultiCompanyRequest, ReportData};
use crate::pdf::{merge_pdfs, MergeOptions};

use parts::{render_closing, render_content, render_cover, PartContext};

/// `informe_<company>.pdf`, or `informe_<company>.<product>.pdf` for one product
pub fn report_file_name(company: &str, product: Option<&str>) -> String {
    match product {
        Some(product) => format!("informe_{}.{}.pdf", company, product),
        None => format!("informe_{}.pdf", company),
    }
}

/// Joined, lower-cased company codes naming a multi-company report
pub fn multi_company_key(codes: &[String]) -> String {
    codes.join("-").to_lowercase()
}

/// Runs the deck → PDF → merge pipeline against one data directory
pub struct ReportBuilder<C: PdfConverter> {
    config: ReportConfig,
    converter: C,
}

impl<C: PdfConverter> ReportBuilder<C> {
    pub fn new(config: ReportConfig, converter: C) -> Self {
        Self { config, converter }
    }

    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    fn prepare_dirs(&self) -> Result<()> {
        for dir in [
            self.config.pptx_parts_dir(),
            self.config.pdf_parts_dir(),
            self.config.output_dir(),
        ] {
            std::fs::create_dir_all(&dir)?;
        }
        Ok(())
    }

    fn to_pdf(&self, source: &Path) -> Result<PathBuf> {
        self.converter.convert(source, &self.config.pdf_parts_dir())
    }

    fn merge(&self, inputs: Vec<PathBuf>, file_name: &str) -> Result<PathBuf> {
        let output = self.config.output_dir().join(file_name);
        merge_pdfs(&MergeOptions::new(inputs, output.clone()))?;
        Ok(output)
    }

    /// Chart renderer, only set up when some slide has charts
    fn chart_renderer(&self, data: &ReportData) -> Option<ChartRenderer> {
        if data.slides.iter().all(|entry| entry.slide.charts.is_empty()) {
            return None;
        }
        match ChartRenderer::from_config(&self.config.charts) {
            Ok(renderer) => Some(renderer),
            Err(e) => {
                warn!("Charts disabled: {}", e);
                None
            }
        }
    }

    /// Build one company's report(s); returns the written PDF paths
    pub fn generate(&self, data: &ReportData) -> Result<Vec<PathBuf>> {
        self.prepare_dirs()?;

        let logo = decode_logo(data.logo_base64.as_deref());
        let company = data.company();
        let ctx = PartContext {
            config: &self.config,
            data,
            logo: logo.as_ref(),
        };
        debug!(
            "Generating report for '{}': {} slides, save={}, split={}",
            company,
            data.slides.len(),
            data.save,
            data.split
        );

        let (cover, closing) = if data.save {
            (Some(render_cover(&ctx)?), Some(render_closing(&ctx)?))
        } else {
            (None, None)
        };

        let charts = self.chart_renderer(data);
        let contents = data
            .slides
            .iter()
            .map(|entry| render_content(&ctx, entry, charts.as_ref()))
            .collect::<Result<Vec<PathBuf>>>()?;

        let cover_pdf = cover.as_deref().map(|path| self.to_pdf(path)).transpose()?;
        let closing_pdf = closing.as_deref().map(|path| self.to_pdf(path)).transpose()?;

        let mut reports = Vec::new();
        if data.is_split() {
            for (entry, content) in data.slides.iter().zip(&contents) {
                let mut inputs: Vec<PathBuf> = cover_pdf.iter().cloned().collect();
                inputs.push(self.to_pdf(content)?);
                inputs.extend(closing_pdf.iter().cloned());
                reports.push(self.merge(inputs, &report_file_name(&company, Some(&entry.product)))?);
            }
        } else {
            let mut inputs: Vec<PathBuf> = cover_pdf.iter().cloned().collect();
            for content in &contents {
                inputs.push(self.to_pdf(content)?);
            }
            inputs.extend(closing_pdf.iter().cloned());
            reports.push(self.merge(inputs, &report_file_name(&company, None))?);
        }

        info!("Generated {} report(s) for '{}'", reports.len(), company);
        Ok(reports)
    }

    /// Wrap previously generated company reports in one cover and closing
    ///
    /// Returns the report name without extension.
    pub fn generate_multi(&self, request: &MultiCompanyRequest) -> Result<String> {
        if request.emp_codes.is_empty() {
            warn!("No company codes given, report will hold only cover and closing");
        }
        self.prepare_dirs()?;

        let logo = composite_logos(&request.logos_base64, COMPOSITE_LOGO_HEIGHT);
        let ctx = PartContext {
            config: &self.config,
            data: &request.main,
            logo: logo.as_ref(),
        };

        let cover = render_cover(&ctx)?;
        let closing = render_closing(&ctx)?;

        let mut inputs = vec![self.to_pdf(&cover)?];
        for code in &request.emp_codes {
            let company_report = self.config.output_dir().join(report_file_name(&code.to_lowercase(), None));
            if !company_report.exists() {
                return Err(Error::FileNotFound(company_report));
            }
            inputs.push(company_report);
        }
        inputs.push(self.to_pdf(&closing)?);

        let key = multi_company_key(&request.emp_codes);
        let output = self.merge(inputs, &report_file_name(&key, None))?;
        info!("Generated multi-company report {}", output.display());

        Ok(format!("informe_{}", key))
    }
}
