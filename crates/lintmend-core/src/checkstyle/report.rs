//! Checkstyle XML report parsing.
//!
//! A report has one `<file>` element per scanned file, each with zero or
//! more `<error>` records. The toolkit treats the report as structured input
//! to filtering; it never writes reports back.

use crate::error::{LintmendError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

/// Checks the repair models are trained to fix (whitespace/layout family).
///
/// Names are the simple check names, without the `Check` class suffix.
pub const TARGETED_CHECKS: &[&str] = &[
    "AnnotationLocation",
    "EmptyForIteratorPad",
    "EmptyLineSeparator",
    "FileTabCharacter",
    "GenericWhitespace",
    "Indentation",
    "LeftCurly",
    "LineLength",
    "MethodParamPad",
    "NoLineWrap",
    "NoWhitespaceAfter",
    "NoWhitespaceBefore",
    "OneStatementPerLine",
    "OperatorWrap",
    "ParenPad",
    "Regexp",
    "RegexpMultiline",
    "RegexpSingleline",
    "RightCurly",
    "SeparatorWrap",
    "SingleSpaceSeparator",
    "TrailingComment",
    "TypecastParenPad",
    "WhitespaceAfter",
    "WhitespaceAround",
];

/// Severity attached to a checkstyle violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Ignore,
    Info,
    Warning,
    Error,
}

impl Severity {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "ignore" => Some(Severity::Ignore),
            "info" => Some(Severity::Info),
            "warning" => Some(Severity::Warning),
            "error" => Some(Severity::Error),
            _ => None,
        }
    }
}

/// A single violation record from a checkstyle report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Violation {
    pub severity: Severity,
    pub line: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<u64>,
    pub message: String,
    /// Fully qualified class of the emitting check.
    pub source: String,
}

impl Violation {
    /// Simple check name: final segment of `source` with any `Check` class
    /// suffix stripped.
    pub fn check_name(&self) -> &str {
        let simple = self
            .source
            .rsplit('.')
            .next()
            .unwrap_or(self.source.as_str());
        simple.strip_suffix("Check").unwrap_or(simple)
    }

    /// Whether the emitting check is one the repair models target.
    pub fn is_targeted(&self) -> bool {
        TARGETED_CHECKS.contains(&self.check_name())
    }
}

/// Violations reported for a single scanned file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileReport {
    pub violations: Vec<Violation>,
}

/// Parsed checkstyle report: one entry per scanned file, keyed by path.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Report {
    pub files: BTreeMap<String, FileReport>,
}

impl Report {
    pub fn total_violations(&self) -> usize {
        self.files.values().map(|f| f.violations.len()).sum()
    }

    /// Number of scanned files with zero violations.
    pub fn clean_files(&self) -> usize {
        self.files
            .values()
            .filter(|f| f.violations.is_empty())
            .count()
    }
}

/// Filters applied while parsing a report.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportFilter {
    /// Keep only `.java` files.
    pub only_java: bool,
    /// Keep only violations from [`TARGETED_CHECKS`].
    pub only_targeted: bool,
}

/// Parse a checkstyle XML report.
pub fn parse_report(xml: &str, filter: ReportFilter) -> Result<Report> {
    let doc = roxmltree::Document::parse(xml).map_err(|e| LintmendError::MalformedReport {
        message: e.to_string(),
    })?;

    let root = doc.root_element();
    if root.tag_name().name() != "checkstyle" {
        return Err(LintmendError::MalformedReport {
            message: format!("unexpected root element <{}>", root.tag_name().name()),
        });
    }

    let mut files = BTreeMap::new();
    for file_node in root
        .children()
        .filter(|n| n.is_element() && n.has_tag_name("file"))
    {
        let Some(name) = file_node.attribute("name") else {
            warn!("Skipping <file> element without a name attribute");
            continue;
        };
        if filter.only_java && !name.ends_with(".java") {
            continue;
        }

        let mut report = FileReport::default();
        for error_node in file_node
            .children()
            .filter(|n| n.is_element() && n.has_tag_name("error"))
        {
            let Some(violation) = parse_violation(&error_node) else {
                warn!("Skipping malformed <error> record in {name}");
                continue;
            };
            if filter.only_targeted && !violation.is_targeted() {
                continue;
            }
            report.violations.push(violation);
        }
        files.insert(name.to_string(), report);
    }

    Ok(Report { files })
}

fn parse_violation(node: &roxmltree::Node<'_, '_>) -> Option<Violation> {
    let line = node.attribute("line")?.parse::<u64>().ok()?;
    let column = node.attribute("column").and_then(|c| c.parse::<u64>().ok());
    let severity = node
        .attribute("severity")
        .and_then(Severity::parse)
        .unwrap_or(Severity::Error);

    Some(Violation {
        severity,
        line,
        column,
        message: node.attribute("message").unwrap_or_default().to_string(),
        source: node.attribute("source").unwrap_or_default().to_string(),
    })
}

/// Cut trailing non-XML noise checkstyle appends after `</checkstyle>` on
/// error exits. Returns `None` when no closing tag is present at all.
pub(crate) fn sanitize_output(raw: &str) -> Option<&str> {
    const CLOSING: &str = "</checkstyle>";
    raw.rfind(CLOSING).map(|i| &raw[..i + CLOSING.len()])
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<checkstyle version="8.0">
<file name="src/Main.java">
<error line="3" column="5" severity="error" message="WhitespaceAround: '{' is not preceded with whitespace." source="com.puppycrawl.tools.checkstyle.checks.whitespace.WhitespaceAroundCheck"/>
<error line="9" severity="warning" message="Missing a Javadoc comment." source="com.puppycrawl.tools.checkstyle.checks.javadoc.JavadocMethodCheck"/>
</file>
<file name="src/util/Helper.java">
</file>
<file name="README.md">
<error line="1" severity="info" message="not java" source="com.example.SomeCheck"/>
</file>
</checkstyle>"#;

    #[test]
    fn test_parse_counts_files_and_violations() {
        let report = parse_report(SAMPLE, ReportFilter::default()).unwrap();
        assert_eq!(report.files.len(), 3);
        assert_eq!(report.total_violations(), 3);
        assert_eq!(report.clean_files(), 1);
    }

    #[test]
    fn test_violation_fields() {
        let report = parse_report(SAMPLE, ReportFilter::default()).unwrap();
        let main = &report.files["src/Main.java"];
        assert_eq!(main.violations.len(), 2);

        let first = &main.violations[0];
        assert_eq!(first.line, 3);
        assert_eq!(first.column, Some(5));
        assert_eq!(first.severity, Severity::Error);
        assert_eq!(first.check_name(), "WhitespaceAround");
        assert!(first.is_targeted());

        let second = &main.violations[1];
        assert_eq!(second.column, None);
        assert_eq!(second.check_name(), "JavadocMethod");
        assert!(!second.is_targeted());
    }

    #[test]
    fn test_only_java_filter() {
        let filter = ReportFilter {
            only_java: true,
            only_targeted: false,
        };
        let report = parse_report(SAMPLE, filter).unwrap();
        assert_eq!(report.files.len(), 2);
        assert!(!report.files.contains_key("README.md"));
    }

    #[test]
    fn test_only_targeted_filter() {
        let filter = ReportFilter {
            only_java: false,
            only_targeted: true,
        };
        let report = parse_report(SAMPLE, filter).unwrap();
        assert_eq!(report.files["src/Main.java"].violations.len(), 1);
        assert_eq!(
            report.files["src/Main.java"].violations[0].check_name(),
            "WhitespaceAround"
        );
    }

    #[test]
    fn test_malformed_error_record_is_skipped() {
        let xml = r#"<checkstyle><file name="A.java"><error severity="error" message="no line attr" source="x.YCheck"/></file></checkstyle>"#;
        let report = parse_report(xml, ReportFilter::default()).unwrap();
        assert_eq!(report.files["A.java"].violations.len(), 0);
    }

    #[test]
    fn test_unexpected_root_is_an_error() {
        assert!(parse_report("<report/>", ReportFilter::default()).is_err());
    }

    #[test]
    fn test_sanitize_output_trims_trailing_noise() {
        let raw = "<checkstyle></checkstyle>\nCheckstyle ends with 2 errors.";
        assert_eq!(sanitize_output(raw), Some("<checkstyle></checkstyle>"));
    }

    #[test]
    fn test_sanitize_output_without_closing_tag() {
        assert_eq!(sanitize_output("garbage"), None);
    }
}
