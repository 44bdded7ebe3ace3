//! HTML report page
//!
//! A static page that embeds the report JSON for a front-end to render.

/// Kind of report embedded in the page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    /// Single result
    Snapshot,
    /// Several models side by side
    Diff,
    /// Results across the commit history
    History,
}

impl ReportKind {
    /// Identifier used by the front-end
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Snapshot => "snapshot",
            Self::Diff => "diff",
            Self::History => "history",
        }
    }
}

impl std::fmt::Display for ReportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// HTML page generator
#[derive(Debug)]
pub struct HtmlReport {
    /// Page title
    title: String,
}

impl HtmlReport {
    /// Create a new page generator
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
        }
    }

    /// Render a page embedding the report JSON
    #[must_use]
    pub fn generate(&self, kind: ReportKind, json: &str) -> String {
        format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
</head>
<body>
    <h1>{title}</h1>
    <div id="report" data-report-type="{kind}"></div>
    <script id="report-data" type="application/json">{data}</script>
</body>
</html>
"#,
            title = Self::escape_html(&self.title),
            kind = kind,
            data = Self::escape_script(json),
        )
    }

    /// Escape HTML special characters
    fn escape_html(s: &str) -> String {
        s.replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;")
            .replace('"', "&quot;")
    }

    /// Keep embedded JSON from closing the script element
    fn escape_script(s: &str) -> String {
        s.replace("</", "<\\/")
    }
}

impl Default for HtmlReport {
    fn default() -> Self {
        Self::new("Metabolic Model Report")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_generation() {
        let html = HtmlReport::new("My Model").generate(ReportKind::Snapshot, r#"{"tests":{}}"#);
        assert!(html.contains("<!DOCTYPE html>"));
        assert!(html.contains("<title>My Model</title>"));
        assert!(html.contains(r#"data-report-type="snapshot""#));
        assert!(html.contains(r#"{"tests":{}}"#));
    }

    #[test]
    fn test_html_escaping() {
        assert_eq!(HtmlReport::escape_html("<a & b>"), "&lt;a &amp; b&gt;");
        let html = HtmlReport::new("\"x\"").generate(ReportKind::Diff, "{}");
        assert!(html.contains("&quot;x&quot;"));
    }

    #[test]
    fn test_embedded_json_cannot_close_script() {
        let html = HtmlReport::default().generate(
            ReportKind::History,
            r#"{"message":"</script><script>alert(1)"}"#,
        );
        assert_eq!(html.matches("</script>").count(), 1);
        assert!(html.contains(r"<\/script>"));
    }

    #[test]
    fn test_report_kind_display() {
        assert_eq!(ReportKind::Diff.to_string(), "diff");
        assert_eq!(ReportKind::History.as_str(), "history");
    }
}
