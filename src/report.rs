//! Rendering of analysis results into shareable reports.

use serde::Serialize;
use time::{OffsetDateTime, macros::format_description};

/// Output format requested for an analysis report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// Markdown document with a title and labelled sections.
    #[default]
    Markdown,
    /// Single-row CSV with a `Query,Insights,Timestamp` header.
    Csv,
    /// The insight text as-is.
    Plain,
}

impl ReportFormat {
    /// Interpret a user-supplied format name; unknown names fall back to [`ReportFormat::Plain`].
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "markdown" | "md" => Self::Markdown,
            "csv" => Self::Csv,
            _ => Self::Plain,
        }
    }
}

/// Render `insights` for `query` in `format`, stamped with `generated_at`.
pub fn render_report(
    insights: &str,
    query: &str,
    format: ReportFormat,
    generated_at: OffsetDateTime,
) -> String {
    let stamp = timestamp(generated_at);
    match format {
        ReportFormat::Markdown => format!(
            "# Report\n\n**Generated:** {stamp}\n\n**Query:** {query}\n\n**Insights:**\n{insights}"
        ),
        ReportFormat::Csv => format!(
            "Query,Insights,Timestamp\n{},{},{}\n",
            csv_field(query),
            csv_field(insights),
            csv_field(&stamp)
        ),
        ReportFormat::Plain => insights.to_string(),
    }
}

fn timestamp(at: OffsetDateTime) -> String {
    let layout = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    at.format(layout)
        .unwrap_or_else(|_| at.unix_timestamp().to_string())
}

/// Quote a CSV field when it contains a delimiter, quote or line break.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    const AT: OffsetDateTime = datetime!(2024-03-05 14:07:09 UTC);

    #[test]
    fn markdown_report_carries_query_and_timestamp() {
        let report = render_report(
            "Grace period: 30 days.",
            "grace period?",
            ReportFormat::Markdown,
            AT,
        );
        assert_eq!(
            report,
            "# Report\n\n**Generated:** 2024-03-05 14:07:09\n\n**Query:** grace period?\n\n**Insights:**\nGrace period: 30 days."
        );
    }

    #[test]
    fn csv_report_quotes_fields_that_need_it() {
        let report = render_report(
            "Covers \"OPD\", dental\nand vision",
            "what is covered",
            ReportFormat::Csv,
            AT,
        );
        assert_eq!(
            report,
            "Query,Insights,Timestamp\nwhat is covered,\"Covers \"\"OPD\"\", dental\nand vision\",2024-03-05 14:07:09\n"
        );
    }

    #[test]
    fn unknown_format_returns_insights_verbatim() {
        let format = ReportFormat::from_name("xml");
        assert_eq!(format, ReportFormat::Plain);
        assert_eq!(render_report("raw", "q", format, AT), "raw");
    }

    #[test]
    fn format_names_are_case_insensitive() {
        assert_eq!(ReportFormat::from_name(" CSV "), ReportFormat::Csv);
        assert_eq!(ReportFormat::from_name("Markdown"), ReportFormat::Markdown);
        assert_eq!(ReportFormat::default(), ReportFormat::Markdown);
    }
}
