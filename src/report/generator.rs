//! Markdown and JSON rendering.
//!
//! Values arrive already rounded; the generator only formats them with the
//! precision recorded in the report metadata.

use crate::engine::aggregate::WindowComparison;
use crate::engine::breakdown::{ProjectDeviation, SectionSubtotal, Share};
use crate::engine::series::{CumulativePoint, SeriesPoint};
use crate::engine::summary_table::SummaryTable;
use crate::models::{Half, Month, Quarter};
use crate::report::builder::{DataQuality, ReportMetadata, Rounding, RollupReport, ScopeRollup};
use anyhow::Result;

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &RollupReport) -> String {
    let rounding = &report.metadata.rounding;
    let mut output = String::new();

    output.push_str(&format!(
        "# Commissioning Rollup: {}\n\n",
        report.metadata.fiscal_year
    ));

    output.push_str(&generate_metadata_section(&report.metadata));
    output.push_str(&generate_table_of_contents(report));
    output.push_str(&generate_kpi_section(&report.scopes, rounding));
    output.push_str(&generate_window_section(report, rounding));

    if let Some(ref series) = report.series {
        output.push_str("## Trend\n\n");
        output.push_str(&generate_series_table("Monthly", &series.monthly, rounding));
        output.push_str(&generate_series_table("Quarterly", &series.quarterly, rounding));
        output.push_str(&generate_series_table("Half-Yearly", &series.half_yearly, rounding));
        output.push_str(&generate_cumulative_table(&series.cumulative, rounding));
    }

    output.push_str(&generate_mix_section(
        &report.technology_split,
        &report.business_model_split,
        rounding,
    ));
    output.push_str(&generate_section_subtotals(
        &report.section_subtotals,
        &report.scopes,
        rounding,
    ));
    output.push_str(&generate_critical_section(&report.critical_projects, rounding));

    let tables: Vec<&SummaryTable> = report
        .scopes
        .iter()
        .filter_map(|s| s.summary_table.as_ref())
        .collect();
    if !tables.is_empty() {
        output.push_str("## Summary Tables\n\n");
        for table in tables {
            output.push_str(&generate_summary_table(table, rounding));
        }
    }

    output.push_str(&generate_quality_section(&report.data_quality));
    output.push_str(&generate_footer());

    output
}

fn sum(value: f64, rounding: &Rounding) -> String {
    format!("{:.*}", rounding.sum_decimals as usize, value)
}

fn ratio(value: f64, rounding: &Rounding) -> String {
    format!("{:.*}%", rounding.ratio_decimals as usize, value)
}

fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Fiscal Year:** {}\n", metadata.fiscal_year));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    if let Some(ref source) = metadata.source {
        section.push_str(&format!("- **Source:** `{}`\n", source));
    }
    section.push_str(&format!("- **Filter:** {}\n", metadata.filter));
    let counts = &metadata.status_counts;
    section.push_str(&format!(
        "- **Live Records:** {} (Plan {}, Rephase {}, Actual {})\n",
        counts.total, counts.plan, counts.rephase, counts.actual
    ));
    section.push('\n');

    section
}

fn generate_table_of_contents(report: &RollupReport) -> String {
    let mut toc = String::new();

    toc.push_str("## Table of Contents\n\n");
    toc.push_str("- [Metadata](#metadata)\n");
    toc.push_str("- [KPI Summary](#kpi-summary)\n");
    toc.push_str("- [Period Comparison](#period-comparison)\n");
    if report.series.is_some() {
        toc.push_str("- [Trend](#trend)\n");
    }
    toc.push_str("- [Portfolio Mix](#portfolio-mix)\n");
    toc.push_str("- [Section Subtotals](#section-subtotals)\n");
    toc.push_str("- [Critical Projects](#critical-projects)\n");
    if report.scopes.iter().any(|s| s.summary_table.is_some()) {
        toc.push_str("- [Summary Tables](#summary-tables)\n");
    }
    toc.push_str("- [Data Quality](#data-quality)\n\n");

    toc
}

fn generate_kpi_section(scopes: &[ScopeRollup], rounding: &Rounding) -> String {
    let mut section = String::new();

    section.push_str("## KPI Summary\n\n");
    section.push_str("| Scope | Plan | Rephase | Actual | Achievement | Projects |\n");
    section.push_str("|:---|---:|---:|---:|---:|---:|\n");

    for scope in scopes {
        let kpi = &scope.kpi;
        section.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} |\n",
            scope.label,
            sum(kpi.plan_total, rounding),
            sum(kpi.rephase_total, rounding),
            sum(kpi.actual_total, rounding),
            ratio(kpi.achievement, rounding),
            kpi.project_count
        ));
    }
    section.push('\n');

    section
}

fn comparison_row(label: &str, c: &WindowComparison, rounding: &Rounding) -> String {
    format!(
        "| {} | {} | {} | {} | {} | {} |\n",
        label,
        sum(c.plan, rounding),
        sum(c.rephase, rounding),
        sum(c.actual, rounding),
        sum(c.deviation, rounding),
        ratio(c.achievement, rounding)
    )
}

fn generate_window_section(report: &RollupReport, rounding: &Rounding) -> String {
    let mut section = String::new();

    section.push_str("## Period Comparison\n\n");
    section.push_str(&format!(
        "Selected window **{}** for {}: plan {}, actual {}, achievement {}.\n\n",
        report.selection.window,
        report.metadata.filter,
        sum(report.selection.plan, rounding),
        sum(report.selection.actual, rounding),
        ratio(report.selection.achievement, rounding)
    ));

    section.push_str("| Window | Plan | Rephase | Actual | Deviation | Achievement |\n");
    section.push_str("|:---|---:|---:|---:|---:|---:|\n");
    for comparison in &report.windows {
        section.push_str(&comparison_row(
            &comparison.window.to_string(),
            comparison,
            rounding,
        ));
    }
    section.push('\n');

    section
}

fn generate_series_table(title: &str, points: &[SeriesPoint], rounding: &Rounding) -> String {
    let mut section = String::new();

    section.push_str(&format!("### {}\n\n", title));
    section.push_str("| Period | Plan | Rephase | Actual | Deviation |\n");
    section.push_str("|:---|---:|---:|---:|---:|\n");
    for point in points {
        section.push_str(&format!(
            "| {} | {} | {} | {} | {} |\n",
            point.label,
            sum(point.plan, rounding),
            sum(point.rephase, rounding),
            sum(point.actual, rounding),
            sum(point.deviation, rounding)
        ));
    }
    section.push('\n');

    section
}

fn generate_cumulative_table(points: &[CumulativePoint], rounding: &Rounding) -> String {
    let mut section = String::new();

    section.push_str("### Cumulative\n\n");
    section.push_str("| Month | Plan | Actual |\n");
    section.push_str("|:---|---:|---:|\n");
    for point in points {
        section.push_str(&format!(
            "| {} | {} | {} |\n",
            point.label,
            sum(point.plan, rounding),
            sum(point.actual, rounding)
        ));
    }
    section.push('\n');

    section
}

fn generate_share_table(heading: &str, shares: &[Share], rounding: &Rounding) -> String {
    let mut section = String::new();

    section.push_str(&format!("### {}\n\n", heading));
    if shares.is_empty() {
        section.push_str("No planned capacity.\n\n");
        return section;
    }
    section.push_str("| Segment | Plan | Share |\n");
    section.push_str("|:---|---:|---:|\n");
    for share in shares {
        section.push_str(&format!(
            "| {} | {} | {} |\n",
            share.label,
            sum(share.value, rounding),
            ratio(share.percent, rounding)
        ));
    }
    section.push('\n');

    section
}

fn generate_mix_section(technology: &[Share], business_model: &[Share], rounding: &Rounding) -> String {
    let mut section = String::new();

    section.push_str("## Portfolio Mix\n\n");
    section.push_str(&generate_share_table("By Technology", technology, rounding));
    section.push_str(&generate_share_table("By Business Model", business_model, rounding));

    section
}

/// Sections grouped by technology, each group closed by the technology's
/// KPI row when that scope was rolled up.
fn generate_section_subtotals(
    sections: &[SectionSubtotal],
    scopes: &[ScopeRollup],
    rounding: &Rounding,
) -> String {
    let mut output = String::new();

    output.push_str("## Section Subtotals\n\n");
    if sections.is_empty() {
        output.push_str("No included projects in scope.\n\n");
        return output;
    }

    output.push_str("| Technology | Section | Plan | Rephase | Actual | Achievement |\n");
    output.push_str("|:---|:---|---:|---:|---:|---:|\n");

    for (i, subtotal) in sections.iter().enumerate() {
        output.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} |\n",
            subtotal.technology,
            subtotal.section,
            sum(subtotal.plan, rounding),
            sum(subtotal.rephase, rounding),
            sum(subtotal.actual, rounding),
            ratio(subtotal.achievement, rounding)
        ));

        let last_of_technology = sections
            .get(i + 1)
            .map_or(true, |next| next.technology != subtotal.technology);
        if !last_of_technology {
            continue;
        }
        let label = subtotal.technology.to_string();
        if let Some(scope) = scopes.iter().find(|s| s.label == label) {
            output.push_str(&format!(
                "| **{} Total** | | **{}** | **{}** | **{}** | **{}** |\n",
                label,
                sum(scope.kpi.plan_total, rounding),
                sum(scope.kpi.rephase_total, rounding),
                sum(scope.kpi.actual_total, rounding),
                ratio(scope.kpi.achievement, rounding)
            ));
        }
    }
    output.push('\n');

    output
}

fn generate_critical_section(projects: &[ProjectDeviation], rounding: &Rounding) -> String {
    let mut section = String::new();

    section.push_str("## Critical Projects\n\n");
    if projects.is_empty() {
        section.push_str("No planned projects in scope.\n\n");
        return section;
    }

    section.push_str("| Project | SPV | Category | Plan | Actual | Deviation | Status |\n");
    section.push_str("|:---|:---|:---|---:|---:|---:|:---:|\n");
    for project in projects {
        section.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} | {} |\n",
            project.key.project_name,
            project.key.spv,
            project.key.category,
            sum(project.plan, rounding),
            sum(project.actual, rounding),
            sum(project.deviation, rounding),
            project.status
        ));
    }
    section.push('\n');

    section
}

fn generate_summary_table(table: &SummaryTable, rounding: &Rounding) -> String {
    let mut section = String::new();

    section.push_str(&format!("### {}\n\n", table.scope_label));

    let mut header = vec!["Row".to_string()];
    header.extend(Month::ALL.iter().map(|m| m.to_string()));
    header.extend(Quarter::ALL.iter().map(|q| format!("Q{}", q.index() + 1)));
    header.extend(Half::ALL.iter().map(|h| format!("H{}", h.index() + 1)));
    header.push("Cumm".to_string());
    header.push("Total".to_string());

    section.push_str(&format!("| {} |\n", header.join(" | ")));
    section.push_str(&format!("|:---|{}\n", "---:|".repeat(header.len() - 1)));

    for row in &table.rows {
        let columns = &row.columns;
        let mut cells = vec![if row.business_model.is_none() {
            format!("**{}**", row.label())
        } else {
            row.label()
        }];
        cells.extend(columns.months.iter().map(|v| sum(*v, rounding)));
        cells.extend(columns.quarters.iter().map(|v| sum(*v, rounding)));
        cells.extend(columns.halves.iter().map(|v| sum(*v, rounding)));
        cells.push(sum(columns.cumulative_to_date, rounding));
        cells.push(sum(columns.total, rounding));
        section.push_str(&format!("| {} |\n", cells.join(" | ")));
    }
    section.push('\n');

    section
}

fn generate_quality_section(quality: &DataQuality) -> String {
    let mut section = String::new();

    section.push_str("## Data Quality\n\n");
    if quality.is_clean() {
        section.push_str("No duplicates, incomplete projects or rejected rows.\n\n");
        return section;
    }

    section.push_str("| Check | Findings |\n");
    section.push_str("|:---|:---:|\n");
    section.push_str(&format!("| Duplicate groups | {} |\n", quality.duplicates.len()));
    section.push_str(&format!("| Incomplete projects | {} |\n", quality.incomplete.len()));
    section.push_str(&format!("| Rejected records | {} |\n", quality.rejected.len()));
    section.push_str(&format!("| Undecodable rows | {} |\n\n", quality.undecodable.len()));

    if !quality.duplicates.is_empty() {
        section.push_str("### Duplicates\n\n");
        for group in &quality.duplicates {
            section.push_str(&format!(
                "- **{}** ({}, {}) at records {:?}\n",
                group.key.project_name, group.key.spv, group.key.status, group.indices
            ));
        }
        section.push('\n');
    }

    if !quality.incomplete.is_empty() {
        section.push_str("### Incomplete Projects\n\n");
        for project in &quality.incomplete {
            let missing: Vec<String> = project.missing.iter().map(|v| v.to_string()).collect();
            section.push_str(&format!(
                "- {}: missing {}\n",
                project.key,
                missing.join(", ")
            ));
        }
        section.push('\n');
    }

    if !quality.rejected.is_empty() || !quality.undecodable.is_empty() {
        section.push_str("### Rejected Rows\n\n");
        for rejected in &quality.undecodable {
            section.push_str(&format!(
                "- Input row {}: {}\n",
                rejected.index, rejected.reason
            ));
        }
        for rejected in &quality.rejected {
            let name = if rejected.project_name.is_empty() {
                "<unnamed>"
            } else {
                rejected.project_name.as_str()
            };
            section.push_str(&format!(
                "- Record {} ({}): {}\n",
                rejected.index, name, rejected.reason
            ));
        }
        section.push('\n');
    }

    section
}

fn generate_footer() -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    footer.push_str(&format!(
        "*Generated by commissioning-rollup v{}*\n",
        env!("CARGO_PKG_VERSION")
    ));

    footer
}

/// Generate a JSON report.
pub fn generate_json_report(report: &RollupReport) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}
