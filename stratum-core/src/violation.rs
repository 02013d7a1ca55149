use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Ordered from least to most severe so that `max()` yields the worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    #[serde(alias = "info")]
    Info,
    #[serde(alias = "warning")]
    Warning,
    #[serde(alias = "error")]
    Error,
    #[serde(alias = "critical")]
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
            Severity::Critical => "CRITICAL",
        }
    }

    /// Whether a violation at this severity fails a scan.
    pub fn is_blocking(&self) -> bool {
        *self >= Severity::Error
    }

    /// Process exit code for a scan whose worst violation has this severity.
    pub fn exit_code(&self) -> i32 {
        match self {
            Severity::Info | Severity::Warning => 0,
            Severity::Error => 2,
            Severity::Critical => 3,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "INFO" => Ok(Severity::Info),
            "WARNING" | "WARN" => Ok(Severity::Warning),
            "ERROR" => Ok(Severity::Error),
            "CRITICAL" => Ok(Severity::Critical),
            other => Err(format!("unknown severity '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub rule_id: String,
    pub severity: Severity,
    /// Artifact id or file the violation is about.
    pub target: String,
    pub location: PathBuf,
    pub expected: String,
    pub found: String,
    pub reason: String,
    pub fix: String,
    pub reference: String,
    #[serde(default)]
    pub fixable: bool,
}

impl Violation {
    pub fn new(
        rule_id: impl Into<String>,
        severity: Severity,
        target: impl Into<String>,
        location: impl Into<PathBuf>,
    ) -> Self {
        Self {
            rule_id: rule_id.into(),
            severity,
            target: target.into(),
            location: location.into(),
            expected: String::new(),
            found: String::new(),
            reason: String::new(),
            fix: String::new(),
            reference: String::new(),
            fixable: false,
        }
    }

    pub fn located_at(mut self, location: impl Into<PathBuf>) -> Self {
        self.location = location.into();
        self
    }

    pub fn expected(mut self, expected: impl Into<String>) -> Self {
        self.expected = expected.into();
        self
    }

    pub fn found(mut self, found: impl Into<String>) -> Self {
        self.found = found.into();
        self
    }

    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }

    pub fn fix(mut self, fix: impl Into<String>) -> Self {
        self.fix = fix.into();
        self
    }

    pub fn reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = reference.into();
        self
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} {}: expected {}, found {}",
            self.severity, self.rule_id, self.target, self.expected, self.found
        )
    }
}

/// A rule that held, or did not apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Passed {
    pub rule_id: String,
    pub target: String,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Violated(Violation),
    Passed(Passed),
}

impl Verdict {
    pub fn passed(rule_id: impl Into<String>, target: impl Into<String>) -> Self {
        Verdict::Passed(Passed {
            rule_id: rule_id.into(),
            target: target.into(),
            reason: None,
        })
    }

    pub fn not_applicable(rule_id: impl Into<String>, target: impl Into<String>, why: impl fmt::Display) -> Self {
        Verdict::Passed(Passed {
            rule_id: rule_id.into(),
            target: target.into(),
            reason: Some(format!("not applicable: {}", why)),
        })
    }

    pub fn is_violation(&self) -> bool {
        matches!(self, Verdict::Violated(_))
    }

    pub fn violation(&self) -> Option<&Violation> {
        match self {
            Verdict::Violated(v) => Some(v),
            Verdict::Passed(_) => None,
        }
    }

    pub fn into_violation(self) -> Option<Violation> {
        match self {
            Verdict::Violated(v) => Some(v),
            Verdict::Passed(_) => None,
        }
    }
}
