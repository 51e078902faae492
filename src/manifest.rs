//! hdlmake Manifest Writer
//!
//! Produces the flat `Manifest.py` key/value documents the external HDL
//! build tool reads. Values are opaque strings passed through verbatim;
//! nothing here checks that paths exist or that a device is real.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    Xilinx,
    Altera,
}

impl Target {
    pub fn as_str(&self) -> &'static str {
        match self {
            Target::Xilinx => "xilinx",
            Target::Altera => "altera",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Synthesis,
    Simulation,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Synthesis => "synthesis",
            Action::Simulation => "simulation",
        }
    }
}

/// Module sources by kind
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modules {
    #[serde(default)]
    pub local: Vec<String>,
    /// Repository URLs, optionally suffixed with `::branch`
    #[serde(default)]
    pub git: Vec<String>,
}

impl Modules {
    pub fn is_empty(&self) -> bool {
        self.local.is_empty() && self.git.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub target: Option<Target>,
    #[serde(default)]
    pub action: Option<Action>,
    #[serde(default)]
    pub fetchto: Option<String>,
    #[serde(default)]
    pub syn_device: Option<String>,
    #[serde(default)]
    pub syn_grade: Option<String>,
    #[serde(default)]
    pub syn_package: Option<String>,
    #[serde(default)]
    pub syn_top: Option<String>,
    #[serde(default)]
    pub syn_project: Option<String>,
    #[serde(default)]
    pub vlog_opt: Option<String>,
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(default)]
    pub modules: Modules,
}

impl Manifest {
    /// A synthesis manifest for one top-level design.
    pub fn synthesis(target: Target, top_module_dir: &str) -> Self {
        Self {
            target: Some(target),
            action: Some(Action::Synthesis),
            modules: Modules {
                local: vec![top_module_dir.to_string()],
                git: vec![],
            },
            ..Default::default()
        }
    }

    pub fn render(&self) -> String {
        let mut sections: Vec<Vec<String>> = vec![];

        let mut head = vec![];
        if let Some(target) = self.target {
            head.push(assign("target", target.as_str()));
        }
        if let Some(action) = self.action {
            head.push(assign("action", action.as_str()));
        }
        sections.push(head);

        sections.push(self.fetchto.iter().map(|f| assign("fetchto", f)).collect());

        let syn = [
            ("syn_device", &self.syn_device),
            ("syn_grade", &self.syn_grade),
            ("syn_package", &self.syn_package),
            ("syn_top", &self.syn_top),
            ("syn_project", &self.syn_project),
        ];
        sections.push(
            syn.iter()
                .filter_map(|(key, value)| value.as_deref().map(|v| assign(key, v)))
                .collect(),
        );

        sections.push(self.vlog_opt.iter().map(|v| assign("vlog_opt", v)).collect());

        if !self.files.is_empty() {
            sections.push(vec![format!("files = {}", list(&self.files, 0))]);
        }
        if !self.modules.is_empty() {
            sections.push(vec![format!("modules = {}", self.render_modules())]);
        }

        let body: Vec<String> = sections.into_iter()
            .filter(|s| !s.is_empty())
            .map(|s| s.join("\n"))
            .collect();
        if body.is_empty() {
            return String::new();
        }
        format!("{}\n", body.join("\n\n"))
    }

    fn render_modules(&self) -> String {
        let kinds: Vec<(&str, &Vec<String>)> = [("local", &self.modules.local), ("git", &self.modules.git)]
            .into_iter()
            .filter(|(_, paths)| !paths.is_empty())
            .collect();

        if let [(kind, paths)] = kinds.as_slice() {
            if paths.len() == 1 {
                return format!("{{ {} : {} }}", quote(kind), list(paths, 0));
            }
        }

        let mut out = String::from("{\n");
        for (kind, paths) in kinds {
            out.push_str(&format!("    {} : {},\n", quote(kind), list(paths, 1)));
        }
        out.push('}');
        out
    }
}

fn assign(key: &str, value: &str) -> String {
    format!("{} = {}", key, quote(value))
}

fn quote(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{}\"", escaped)
}

/// One-element lists stay inline, longer ones get one entry per line.
fn list(items: &[String], indent: usize) -> String {
    if items.len() <= 1 {
        let inner: Vec<_> = items.iter().map(|i| quote(i)).collect();
        return format!("[ {} ]", inner.join(", "));
    }
    let pad = "    ".repeat(indent);
    let mut out = String::from("[\n");
    for item in items {
        out.push_str(&format!("{}    {},\n", pad, quote(item)));
    }
    out.push_str(&pad);
    out.push(']');
    out
}
