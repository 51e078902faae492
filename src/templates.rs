//! Package Template - VHDL Rendering
//!
//! The generated package must stay byte-compatible with the files the
//! gateware already carries: same header, same comment line, one constant
//! per line in a fixed order.

use thiserror::Error;

use crate::config::{ConstantNames, GeneratorConfig};
use crate::date::BuildDate;
use crate::hashing::HashField;
use crate::pipeline::VersionRecord;

pub const PKG_LIB: &str = "library ieee;\nuse ieee.std_logic_1164.all;\n";
pub const PKG_COMMENT: &str = "--generated automatically by gen_ver.py script--\n";
pub const PKG_TAIL: &str = "end package;\n";
const WORD_TYPE: &str = "std_logic_vector(31 downto 0)";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("No package declaration found")]
    MissingPackage,

    #[error("Constant {0} not found")]
    MissingConstant(String),

    #[error("Constant {name} has invalid value {value:?}")]
    InvalidValue { name: String, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageTemplate {
    pub package_name: String,
    pub constants: ConstantNames,
}

impl PackageTemplate {
    pub fn from_config(config: &GeneratorConfig) -> Self {
        Self {
            package_name: config.package_name.clone(),
            constants: config.constants.clone(),
        }
    }

    pub fn render(&self, record: &VersionRecord) -> String {
        let mut out = String::with_capacity(512);
        out.push_str(PKG_LIB);
        out.push_str(PKG_COMMENT);
        out.push_str(&format!("package {} is\n", self.package_name));
        out.push_str(&constant_line(&self.constants.build_date, &record.build_date.to_hex()));
        out.push_str(&constant_line(&self.constants.switch_hdl, record.switch_hdl_hash.as_str()));
        out.push_str(&constant_line(&self.constants.gencores, record.gencores_hash.as_str()));
        out.push_str(&constant_line(&self.constants.wrcores, record.wrcores_hash.as_str()));
        out.push_str(PKG_TAIL);
        out
    }

    /// Read a previously generated package back into a record.
    pub fn parse(&self, text: &str) -> Result<VersionRecord, ParseError> {
        let declares_package = text.lines().any(|line| {
            let mut words = line.split_whitespace();
            words.next() == Some("package")
                && words.next() == Some(self.package_name.as_str())
                && words.next() == Some("is")
        });
        if !declares_package {
            return Err(ParseError::MissingPackage);
        }

        let build_date = {
            let name = &self.constants.build_date;
            let value = find_constant(text, name)?;
            BuildDate::from_hex(value).map_err(|_| invalid(name, value))?
        };

        Ok(VersionRecord {
            build_date,
            switch_hdl_hash: self.hash_constant(text, &self.constants.switch_hdl)?,
            gencores_hash: self.hash_constant(text, &self.constants.gencores)?,
            wrcores_hash: self.hash_constant(text, &self.constants.wrcores)?,
        })
    }

    fn hash_constant(&self, text: &str, name: &str) -> Result<HashField, ParseError> {
        let value = find_constant(text, name)?;
        if value.len() != crate::hashing::FIELD_WIDTH {
            return Err(invalid(name, value));
        }
        HashField::from_abbrev(value).ok_or_else(|| invalid(name, value))
    }
}

impl Default for PackageTemplate {
    fn default() -> Self {
        Self::from_config(&GeneratorConfig::default())
    }
}

fn constant_line(name: &str, hex: &str) -> String {
    format!("constant {} : {} := x\"{}\";\n", name, WORD_TYPE, hex)
}

fn invalid(name: &str, value: &str) -> ParseError {
    ParseError::InvalidValue {
        name: name.to_string(),
        value: value.to_string(),
    }
}

/// Value of `constant <name> : ... := x"<value>";`
fn find_constant<'a>(text: &'a str, name: &str) -> Result<&'a str, ParseError> {
    for line in text.lines() {
        let Some(rest) = line.trim_start().strip_prefix("constant") else {
            continue;
        };
        let Some((decl, value)) = rest.split_once(":=") else {
            continue;
        };
        let declared = decl.split(':').next().unwrap_or_default().trim();
        if !declared.eq_ignore_ascii_case(name) {
            continue;
        }
        let value = value.trim().trim_end_matches(';').trim();
        let literal = value
            .strip_prefix("x\"")
            .or_else(|| value.strip_prefix("X\""))
            .and_then(|v| v.strip_suffix('"'));
        return literal.ok_or_else(|| invalid(name, value));
    }
    Err(ParseError::MissingConstant(name.to_string()))
}
