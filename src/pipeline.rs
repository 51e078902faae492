//! Generation Pipeline - Single Entry Point
//!
//! gather -> validate -> render -> write. Nothing touches the output file
//! until every field is known and the text is rendered, and the write
//! itself is a rename into place.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{DependencySpec, GeneratorConfig};
use crate::date::BuildDate;
use crate::hashing::{sha256_hex, HashField};
use crate::templates::PackageTemplate;
use crate::validation::{ValidationResult, Validator};
use crate::vcs::{SourceControl, VcsError};

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("Environment error: {0}")]
    Environment(#[from] VcsError),

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Configuration requires generator >= {0}, current is {1}")]
    IncompatibleConfig(String, String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// The four words stamped into the gateware
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRecord {
    pub build_date: BuildDate,
    pub switch_hdl_hash: HashField,
    pub gencores_hash: HashField,
    pub wrcores_hash: HashField,
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerateReport {
    pub path: PathBuf,
    pub record: VersionRecord,
    pub validation: ValidationResult,
    /// SHA-256 of the package text
    pub digest: String,
    /// False when the file already held identical content
    pub changed: bool,
}

/// A validated package ready to be written
#[derive(Debug, Clone)]
pub struct PreparedPackage {
    pub path: PathBuf,
    pub record: VersionRecord,
    pub validation: ValidationResult,
    pub text: String,
}

pub struct Generator<S: SourceControl> {
    config: GeneratorConfig,
    template: PackageTemplate,
    vcs: S,
}

impl<S: SourceControl> Generator<S> {
    pub fn new(config: GeneratorConfig, vcs: S) -> Self {
        Self {
            template: PackageTemplate::from_config(&config),
            config,
            vcs,
        }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn output_path(&self) -> Result<PathBuf, GenerateError> {
        Ok(self.vcs.toplevel()?.join(&self.config.output))
    }

    /// Gather all four fields for `today`.
    pub fn collect(&self, today: NaiveDate) -> Result<VersionRecord, GenerateError> {
        let toplevel = self.vcs.toplevel()?;
        self.collect_in(&toplevel, today)
    }

    pub fn render(&self, record: &VersionRecord) -> String {
        self.template.render(record)
    }

    /// Collect, validate and render without touching the filesystem.
    /// A record the policy rejects is an error here already.
    pub fn prepare(&self, today: NaiveDate) -> Result<PreparedPackage, GenerateError> {
        let toplevel = self.vcs.toplevel()?;
        debug!(toplevel = %toplevel.display(), "resolved working tree");

        let record = self.collect_in(&toplevel, today)?;

        let validation = Validator::new().strict(self.config.strict).validate(&record);
        for violation in validation.warnings() {
            warn!(field = %violation.field, "{}", violation.message);
        }
        if !validation.valid {
            let messages: Vec<_> = validation.violations.iter()
                .map(|v| format!("{}: {}", v.rule, v.message))
                .collect();
            return Err(GenerateError::Validation(messages.join("; ")));
        }

        let text = self.render(&record);
        Ok(PreparedPackage {
            path: toplevel.join(&self.config.output),
            record,
            validation,
            text,
        })
    }

    /// Collect, validate, render and write the package. A failure at any
    /// step leaves the existing file untouched.
    pub fn generate(&self, today: NaiveDate) -> Result<GenerateReport, GenerateError> {
        let PreparedPackage { path, record, validation, text } = self.prepare(today)?;
        let digest = sha256_hex(text.as_bytes());
        let changed = write_if_changed(&path, &text)?;

        if changed {
            info!(path = %path.display(), %digest, "wrote version package");
        } else {
            info!(path = %path.display(), "version package up to date");
        }

        Ok(GenerateReport {
            path,
            record,
            validation,
            digest,
            changed,
        })
    }

    fn collect_in(&self, toplevel: &Path, today: NaiveDate) -> Result<VersionRecord, GenerateError> {
        let build_date = BuildDate::from_date(today);

        let switch_hdl_hash = match self.vcs.head_hash(toplevel)? {
            Some(abbrev) => field_or_unknown(&abbrev, "switch HDL"),
            None => {
                warn!("no commit found, switch HDL version unknown");
                HashField::unknown()
            }
        };

        Ok(VersionRecord {
            build_date,
            switch_hdl_hash,
            gencores_hash: self.dependency_field(toplevel, &self.config.general_cores)?,
            wrcores_hash: self.dependency_field(toplevel, &self.config.wr_cores)?,
        })
    }

    fn dependency_field(&self, toplevel: &Path, dep: &DependencySpec) -> Result<HashField, GenerateError> {
        match self.vcs.dependency_hash(toplevel, &dep.path)? {
            Some(abbrev) => Ok(field_or_unknown(&abbrev, &dep.name)),
            None => {
                warn!(dependency = %dep.name, path = %dep.path.display(), "dependency version unknown");
                Ok(HashField::unknown())
            }
        }
    }
}

fn field_or_unknown(abbrev: &str, what: &str) -> HashField {
    HashField::from_abbrev(abbrev).unwrap_or_else(|| {
        warn!(source = what, value = abbrev, "not a commit hash, version unknown");
        HashField::unknown()
    })
}

/// Atomically replace `path` with `text` unless it already holds exactly
/// that. Returns whether the file was written. A symlink is written
/// through to its target; a read-only file is refused.
pub fn write_if_changed(path: &Path, text: &str) -> Result<bool, GenerateError> {
    let io_err = |source: std::io::Error| GenerateError::Io { path: path.to_path_buf(), source };

    let is_link = fs::symlink_metadata(path)
        .map(|m| m.file_type().is_symlink())
        .unwrap_or(false);
    let target = if is_link {
        fs::canonicalize(path).map_err(io_err)?
    } else {
        path.to_path_buf()
    };

    let previous = fs::metadata(&target).ok();
    if let Some(meta) = &previous {
        if meta.permissions().readonly() {
            return Err(io_err(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "output file is read-only",
            )));
        }
        if let Ok(existing) = fs::read(&target) {
            if existing == text.as_bytes() {
                return Ok(false);
            }
        }
    }

    let dir = match target.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir).map_err(io_err)?;
    tmp.write_all(text.as_bytes()).map_err(io_err)?;
    tmp.as_file().sync_all().map_err(io_err)?;

    let permissions = match previous {
        Some(meta) => meta.permissions(),
        None => default_permissions(tmp.as_file()).map_err(io_err)?,
    };
    fs::set_permissions(tmp.path(), permissions).map_err(io_err)?;

    tmp.persist(&target).map_err(|e| io_err(e.error))?;
    Ok(true)
}

#[cfg(unix)]
fn default_permissions(_file: &fs::File) -> std::io::Result<fs::Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Ok(fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn default_permissions(file: &fs::File) -> std::io::Result<fs::Permissions> {
    Ok(file.metadata()?.permissions())
}
