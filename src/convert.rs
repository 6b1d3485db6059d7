//! Office document to PDF conversion

use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::ConverterConfig;
use crate::error::{Error, Result};

/// Converts one document into `<out_dir>/<stem>.pdf`
pub trait PdfConverter {
    fn convert(&self, source: &Path, out_dir: &Path) -> Result<PathBuf>;
}

/// Expected output of converting `source` into `out_dir`
pub fn pdf_output_path(source: &Path, out_dir: &Path) -> PathBuf {
    let stem = source.file_stem().unwrap_or_default().to_string_lossy();
    out_dir.join(format!("{}.pdf", stem))
}

/// Headless LibreOffice, one throw-away user profile per conversion
#[derive(Debug, Clone)]
pub struct LibreOffice {
    binary: String,
    profile_root: PathBuf,
}

impl LibreOffice {
    pub fn new(binary: impl Into<String>, profile_root: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            profile_root: profile_root.into(),
        }
    }

    pub fn from_config(config: &ConverterConfig) -> Self {
        Self::new(config.binary.clone(), config.profile_root.clone())
    }

    /// Command line for one conversion
    fn command(&self, source: &Path, out_dir: &Path, profile: &Path) -> Command {
        let mut command = Command::new(&self.binary);
        command
            .arg(format!("-env:UserInstallation=file://{}", profile.display()))
            .arg("--headless")
            .arg("--convert-to")
            .arg("pdf")
            .arg(source)
            .arg("--outdir")
            .arg(out_dir);
        command
    }
}

impl PdfConverter for LibreOffice {
    fn convert(&self, source: &Path, out_dir: &Path) -> Result<PathBuf> {
        if !source.exists() {
            return Err(Error::FileNotFound(source.to_path_buf()));
        }
        std::fs::create_dir_all(out_dir)?;

        let profile = self.profile_root.join(format!("lo_{}", Uuid::new_v4()));
        debug!("Converting {} with profile {}", source.display(), profile.display());

        let output = self.command(source, out_dir, &profile).output();

        if profile.exists() {
            if let Err(e) = std::fs::remove_dir_all(&profile) {
                warn!("Could not remove converter profile {}: {}", profile.display(), e);
            }
        }

        let output = output.map_err(|e| Error::Conversion {
            file: source.to_path_buf(),
            detail: format!("failed to start {}: {}", self.binary, e),
        })?;
        if !output.status.success() {
            return Err(Error::Conversion {
                file: source.to_path_buf(),
                detail: format!(
                    "{} exited with {}: {}",
                    self.binary,
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }

        let pdf = pdf_output_path(source, out_dir);
        if !pdf.exists() {
            return Err(Error::Conversion {
                file: source.to_path_buf(),
                detail: format!("no output at {}", pdf.display()),
            });
        }

        info!("Converted {}", pdf.display());
        Ok(pdf)
    }
}
