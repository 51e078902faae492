//! Generator Configuration
//!
//! Defaults reproduce the package layout the gateware already depends on,
//! so a missing config file means "behave like every previous build".

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::pipeline::GenerateError;

pub const DEFAULT_OUTPUT: &str = "modules/wrsw_hwiu/gw_ver_pkg.vhd";
pub const DEFAULT_PACKAGE: &str = "hwver_pkg";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratorConfig {
    /// Package file, relative to the working tree root
    #[serde(default = "default_output")]
    pub output: PathBuf,
    #[serde(default = "default_package")]
    pub package_name: String,
    #[serde(default)]
    pub constants: ConstantNames,
    #[serde(default = "default_general_cores")]
    pub general_cores: DependencySpec,
    #[serde(default = "default_wr_cores")]
    pub wr_cores: DependencySpec,
    /// Treat unknown revisions as fatal instead of warning
    #[serde(default)]
    pub strict: bool,
    #[serde(default)]
    pub generator_min_version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstantNames {
    pub build_date: String,
    pub switch_hdl: String,
    pub gencores: String,
    pub wrcores: String,
}

impl Default for ConstantNames {
    fn default() -> Self {
        Self {
            build_date: "c_build_date".to_string(),
            switch_hdl: "c_switch_hdl_ver".to_string(),
            gencores: "c_gencores_ver".to_string(),
            wrcores: "c_wrcores_ver".to_string(),
        }
    }
}

/// A submodule whose checked-out commit is stamped into the package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencySpec {
    pub name: String,
    pub path: PathBuf,
}

impl DependencySpec {
    pub fn new(name: &str, path: &str) -> Self {
        Self {
            name: name.to_string(),
            path: PathBuf::from(path),
        }
    }
}

fn default_output() -> PathBuf { PathBuf::from(DEFAULT_OUTPUT) }
fn default_package() -> String { DEFAULT_PACKAGE.to_string() }
fn default_general_cores() -> DependencySpec { DependencySpec::new("general-cores", "ip_cores/general-cores") }
fn default_wr_cores() -> DependencySpec { DependencySpec::new("wr-cores", "ip_cores/wr-cores") }

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            package_name: default_package(),
            constants: ConstantNames::default(),
            general_cores: default_general_cores(),
            wr_cores: default_wr_cores(),
            strict: false,
            generator_min_version: None,
        }
    }
}

impl GeneratorConfig {
    pub fn load(path: &Path) -> Result<Self, GenerateError> {
        let content = fs::read_to_string(path).map_err(|source| GenerateError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| GenerateError::Config(format!("{}: {}", path.display(), e)))?;
        config.check()?;
        Ok(config)
    }

    /// Reject configs that would render an unusable package or that ask
    /// for a newer generator.
    pub fn check(&self) -> Result<(), GenerateError> {
        if self.output.is_absolute() || self.output.file_name().is_none() {
            return Err(GenerateError::Config(format!(
                "output must be a file path relative to the working tree, got {}",
                self.output.display()
            )));
        }
        let names = [
            self.package_name.as_str(),
            self.constants.build_date.as_str(),
            self.constants.switch_hdl.as_str(),
            self.constants.gencores.as_str(),
            self.constants.wrcores.as_str(),
        ];
        if let Some(bad) = names.iter().find(|n| !is_vhdl_identifier(n)) {
            return Err(GenerateError::Config(format!("not a VHDL identifier: {bad:?}")));
        }
        if let Some(min) = &self.generator_min_version {
            let current = semver::Version::parse(crate::GENERATOR_VERSION)
                .map_err(|_| GenerateError::Config("Invalid generator version".into()))?;
            let required = semver::Version::parse(min)
                .map_err(|_| GenerateError::Config(format!("Invalid generatorMinVersion {min:?}")))?;
            if current < required {
                return Err(GenerateError::IncompatibleConfig(
                    min.clone(),
                    crate::GENERATOR_VERSION.to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Basic VHDL identifier: letter first, then letters, digits and single
/// underscores, no trailing underscore.
fn is_vhdl_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    !name.ends_with('_')
        && !name.contains("__")
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}
