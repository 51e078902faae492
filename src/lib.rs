//! hwver-core - Firmware Version Package Generator
//!
//! Stamps the White Rabbit switch gateware with a build date and the
//! abbreviated commit hashes of the switch HDL tree and its two core
//! submodules, emitted as a VHDL package.
//!
//! The generator never reads ambient state itself: the working tree,
//! the date and the source-control queries are all handed in, and only
//! the CLI binds them to `git` and the local clock.

pub mod config;
pub mod date;
pub mod hashing;
pub mod logging;
pub mod manifest;
pub mod pipeline;
pub mod templates;
pub mod validation;
pub mod vcs;

pub use config::{DependencySpec, GeneratorConfig};
pub use date::BuildDate;
pub use hashing::{sha256_hex, HashField};
pub use manifest::{Action, Manifest, Target};
pub use pipeline::{GenerateError, GenerateReport, Generator, PreparedPackage, VersionRecord};
pub use templates::PackageTemplate;
pub use validation::{ValidationResult, ValidationRule, ValidationViolation, ViolationSeverity};
pub use vcs::{Git, SourceControl, VcsError};

pub const GENERATOR_VERSION: &str = env!("CARGO_PKG_VERSION");
