//! Policy evaluation report and exit-code mapping.

use serde::Serialize;

use crate::util::shell::color_enabled;

/// How severe a violation is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleSeverity {
    Error,
    Warning,
}

/// One rule firing for one package.
#[derive(Debug, Clone, Serialize)]
pub struct Violation {
    pub package: String,
    pub rule: String,
    pub severity: RuleSeverity,
    pub message: String,
}

/// The ordered evaluation result.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PolicyReport {
    pub violations: Vec<Violation>,

    /// Informational notes (e.g. sections parsed but not enforced). Never
    /// affect the exit code.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

impl PolicyReport {
    pub fn push(
        &mut self,
        package: &str,
        rule: impl Into<String>,
        severity: RuleSeverity,
        message: impl Into<String>,
    ) {
        self.violations.push(Violation {
            package: package.to_string(),
            rule: rule.into(),
            severity,
            message: message.into(),
        });
    }

    pub fn errors(&self) -> impl Iterator<Item = &Violation> {
        self.violations
            .iter()
            .filter(|v| v.severity == RuleSeverity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Violation> {
        self.violations
            .iter()
            .filter(|v| v.severity == RuleSeverity::Warning)
    }

    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }

    pub fn has_warnings(&self) -> bool {
        self.warnings().next().is_some()
    }

    /// Exit code: errors → 1, warnings under `--strict` → 1, warnings → 2,
    /// clean → 0.
    pub fn exit_code(&self, strict: bool) -> i32 {
        if self.has_errors() {
            1
        } else if self.has_warnings() {
            if strict {
                1
            } else {
                2
            }
        } else {
            0
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn render_terminal(&self) -> String {
        let mut out = String::new();

        for violation in &self.violations {
            out.push_str(&format!(
                "{} [{}] {}: {}\n",
                severity_label(violation.severity),
                violation.rule,
                violation.package,
                violation.message
            ));
        }

        for note in &self.notes {
            out.push_str(&format!("note: {}\n", note));
        }

        let errors = self.errors().count();
        let warnings = self.warnings().count();
        if errors == 0 && warnings == 0 {
            out.push_str("policy check passed\n");
        } else {
            out.push_str(&format!("\n{} error(s), {} warning(s)\n", errors, warnings));
        }
        out
    }
}

fn severity_label(severity: RuleSeverity) -> String {
    let text = match severity {
        RuleSeverity::Error => "error",
        RuleSeverity::Warning => "warning",
    };
    if !color_enabled() {
        return text.to_string();
    }
    let code = match severity {
        RuleSeverity::Error => "\x1b[1;31m",
        RuleSeverity::Warning => "\x1b[1;33m",
    };
    format!("{}{}\x1b[0m", code, text)
}
