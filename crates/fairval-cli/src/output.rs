//! Human-readable rendering of analysis results

use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};
use fairval_engine::{AnalysisResult, CompanyIdentity, DataFreshness, PricePoint};

const UNAVAILABLE: &str = "N/A";

/// Most recent history rows shown under a result
const HISTORY_ROWS: usize = 200;

/// Number with thousands separators, or `N/A`
pub fn amount(value: Option<f64>) -> String {
    let Some(value) = value.filter(|v| v.is_finite()) else {
        return UNAVAILABLE.to_string();
    };

    let rounded = format!("{:.0}", value.abs());
    let mut grouped = String::with_capacity(rounded.len() + rounded.len() / 3);
    for (i, ch) in rounded.chars().enumerate() {
        if i > 0 && (rounded.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    if value < 0.0 && rounded != "0" {
        format!("-{grouped}")
    } else {
        grouped
    }
}

/// Fixed-point number, or `N/A`
pub fn decimal(value: Option<f64>, places: usize) -> String {
    value
        .filter(|v| v.is_finite())
        .map_or_else(|| UNAVAILABLE.to_string(), |v| format!("{v:.places$}"))
}

/// Signed percentage, or `N/A`
pub fn percent(value: Option<f64>) -> String {
    value
        .filter(|v| v.is_finite())
        .map_or_else(|| UNAVAILABLE.to_string(), |v| format!("{v:+.2}%"))
}

fn table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

pub fn render_identity(identity: &CompanyIdentity) -> String {
    let mut table = table();
    table.set_header(vec!["Code", "Name", "Sector"]);
    table.add_row(vec![
        identity.code.to_string(),
        identity.name.clone(),
        format!("{} ({})", identity.sector_name, identity.sector_code),
    ]);
    table.to_string()
}

/// Latest price history rows, oldest first
pub fn render_history(history: &[PricePoint]) -> String {
    let start = history.len().saturating_sub(HISTORY_ROWS);
    let mut table = table();
    table.set_header(vec!["Date", "Price", "Fair value"]);
    for point in &history[start..] {
        table.add_row(vec![
            point.date.to_string(),
            amount(Some(point.price)),
            amount(point.fair_value_est),
        ]);
    }
    table.to_string()
}

pub fn render_result(result: &AnalysisResult) -> String {
    let identity = &result.identity;
    let fundamentals = &result.fundamentals;
    let peers = &result.peer_summary;

    let mut summary = table();
    summary.set_header(vec!["Metric", "Value"]);
    summary.add_rows(vec![
        vec!["Company".to_string(), format!("{} ({})", identity.name, identity.code)],
        vec!["Sector".to_string(), identity.sector_name.clone()],
        vec![
            "Basis date".to_string(),
            result
                .basis_date
                .map_or_else(|| UNAVAILABLE.to_string(), |date| date.to_string()),
        ],
        vec!["Price".to_string(), amount(result.price)],
        vec!["Fair value".to_string(), amount(result.fair_value)],
        vec!["Undervaluation".to_string(), percent(result.undervaluation_pct)],
        vec!["Score (0-100)".to_string(), decimal(result.score_total, 1)],
    ]);

    let mut ratios = table();
    ratios.set_header(vec!["Ratio", "Value"]);
    ratios.add_rows(vec![
        vec!["ROE (%)".to_string(), decimal(fundamentals.roe, 2)],
        vec!["Operating margin (%)".to_string(), decimal(fundamentals.op_margin, 2)],
        vec!["Debt ratio (%)".to_string(), decimal(fundamentals.debt_ratio, 2)],
        vec!["Sales growth (%)".to_string(), decimal(fundamentals.sales_growth, 2)],
        vec!["PER".to_string(), decimal(fundamentals.per, 2)],
        vec!["PBR".to_string(), decimal(fundamentals.pbr, 2)],
        vec!["EPS".to_string(), amount(fundamentals.eps)],
        vec!["BPS".to_string(), amount(fundamentals.bps)],
    ]);

    let mut sector = table();
    sector.set_header(vec!["Peer comparison", "Value"]);
    sector.add_rows(vec![
        vec![
            "Sector".to_string(),
            peers.sector_name.clone().unwrap_or_else(|| UNAVAILABLE.to_string()),
        ],
        vec!["Peers used".to_string(), peers.peer_count_used.to_string()],
        vec!["Sector avg PER".to_string(), decimal(peers.sector_avg, 2)],
        vec!["Target PER".to_string(), decimal(peers.target_value, 2)],
        vec!["Relative".to_string(), decimal(peers.relative, 2)],
        vec!["Discount".to_string(), percent(peers.discount_pct)],
    ]);

    let mut sources = table();
    sources.set_header(vec!["Source", "Status", "As of"]);
    for status in &result.sources {
        let state = match status.freshness {
            DataFreshness::Current => "ok".to_string(),
            DataFreshness::Stale => "stale".to_string(),
            DataFreshness::Unavailable => status
                .error
                .clone()
                .unwrap_or_else(|| "unavailable".to_string()),
        };
        sources.add_row(vec![
            status.source.to_string(),
            state,
            status
                .as_of
                .map_or_else(|| UNAVAILABLE.to_string(), |date| date.to_string()),
        ]);
    }

    let mut out = format!("{summary}\n{ratios}\n{sector}\n{sources}\n");
    if !result.history.is_empty() {
        out.push_str(&format!(
            "Price history (last {} of {} trading days)\n{}\n",
            result.history.len().min(HISTORY_ROWS),
            result.history.len(),
            render_history(&result.history)
        ));
    }
    for warning in &result.warnings {
        out.push_str(&format!("warning: {warning}\n"));
    }
    out
}
