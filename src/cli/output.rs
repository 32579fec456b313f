//! Table output for command results.

use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::domain::MarketDataset;
use crate::rl::training::EvaluationReport;

/// One labelled value in a summary table
#[derive(Debug, Clone, PartialEq, Tabled)]
pub struct SummaryRow {
    #[tabled(rename = "Field")]
    pub field: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

impl SummaryRow {
    fn new(field: &str, value: impl ToString) -> Self {
        Self {
            field: field.to_string(),
            value: value.to_string(),
        }
    }
}

pub fn dataset_rows(table: &str, dataset: &MarketDataset) -> Vec<SummaryRow> {
    let (low, high) = dataset.close_range();
    vec![
        SummaryRow::new("Table", table),
        SummaryRow::new("Bars", dataset.len()),
        SummaryRow::new("First", dataset.first().timestamp),
        SummaryRow::new("Last", dataset.last().timestamp),
        SummaryRow::new("Close low", format!("{:.2}", low)),
        SummaryRow::new("Close high", format!("{:.2}", high)),
    ]
}

pub fn evaluation_rows(report: &EvaluationReport) -> Vec<SummaryRow> {
    let mut rows = vec![
        SummaryRow::new("Steps", report.steps),
        SummaryRow::new("Total reward", format!("{:.2}", report.total_reward)),
        SummaryRow::new("Initial value", format!("{:.2}", report.initial_value)),
        SummaryRow::new("Final value", format!("{:.2}", report.final_portfolio_value)),
        SummaryRow::new("Return", format!("{:+.2}%", report.total_return_pct)),
    ];
    rows.extend(
        report
            .action_counts
            .iter()
            .map(|(action, count)| SummaryRow::new(action, count)),
    );
    rows
}

/// Render rows as a table, or a placeholder when empty
pub fn render_table<T: Tabled>(items: &[T]) -> String {
    if items.is_empty() {
        return "(no results)".to_string();
    }
    Table::new(items).with(Style::rounded()).to_string()
}
