//! Report rendering - deterministic HTML and CSV exports.
//!
//! The HTML reports are self-contained documents (embedded stylesheet,
//! no scripts) with summary cards, a transaction table and a category
//! distribution; the same layout is printed to PDF by the client.

use once_cell::sync::Lazy;
use std::collections::HashMap;

use super::ServiceError;
use crate::domain::splits::round2;
use crate::models::expense;
use crate::services::group_service::{MemberBalanceView, TransferView};

/// Category bar colors, cycled in order.
static PALETTE: Lazy<Vec<&'static str>> = Lazy::new(|| {
    vec![
        "#6d28d9", "#2563eb", "#059669", "#d97706", "#dc2626", "#db2777", "#0891b2", "#65a30d",
    ]
});

#[derive(Debug, Clone)]
pub struct SummaryCard {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone)]
pub struct ReportTransaction {
    pub date: String,
    pub category: String,
    pub description: String,
    pub amount: f64,
}

#[derive(Debug, Clone)]
pub struct CategorySlice {
    pub category: String,
    pub amount: f64,
    pub percentage: f64,
    pub color: &'static str,
}

/// Per-category amounts into percentage slices, largest first.
pub fn category_distribution(totals: &HashMap<String, f64>) -> Vec<CategorySlice> {
    let grand_total: f64 = totals.values().sum();
    let mut entries: Vec<(&String, &f64)> = totals.iter().collect();
    entries.sort_by(|a, b| b.1.total_cmp(a.1).then(a.0.cmp(b.0)));

    entries
        .iter()
        .enumerate()
        .map(|(i, (category, amount))| CategorySlice {
            category: (*category).clone(),
            amount: round2(**amount),
            percentage: if grand_total > 0.0 {
                round2(**amount / grand_total * 100.0)
            } else {
                0.0
            },
            color: PALETTE[i % PALETTE.len()],
        })
        .collect()
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

const STYLE: &str = r#"
    * { margin: 0; padding: 0; box-sizing: border-box; }
    body { font-family: -apple-system, 'Segoe UI', Roboto, Arial, sans-serif; color: #0a0a0a; line-height: 1.5; background: white; }
    .header { background: linear-gradient(135deg, #1a1a1a 0%, #2d2d2d 100%); color: white; padding: 40px; }
    .header h1 { font-size: 32px; font-weight: 700; }
    .header .subtitle { font-size: 15px; opacity: 0.85; }
    .header .meta { display: flex; justify-content: space-between; font-size: 12px; opacity: 0.7; margin-top: 14px; }
    .content { padding: 36px 40px; }
    .cards { display: flex; gap: 16px; margin-bottom: 28px; }
    .card { flex: 1; border: 1px solid #e5e5e5; border-radius: 8px; padding: 16px; }
    .card .label { font-size: 12px; color: #737373; text-transform: uppercase; }
    .card .value { font-size: 22px; font-weight: 600; margin-top: 4px; }
    h2 { font-size: 18px; margin: 24px 0 12px 0; }
    table { width: 100%; border-collapse: collapse; font-size: 13px; }
    th { text-align: left; padding: 8px; border-bottom: 2px solid #d4d4d4; color: #525252; }
    td { padding: 8px; border-bottom: 1px solid #e5e5e5; }
    td.amount, th.amount { text-align: right; font-variant-numeric: tabular-nums; }
    .bar-row { display: flex; align-items: center; gap: 10px; margin: 6px 0; font-size: 13px; }
    .bar-label { width: 160px; }
    .bar-track { flex: 1; background: #f5f5f5; border-radius: 4px; height: 14px; }
    .bar-fill { height: 14px; border-radius: 4px; }
    .bar-value { width: 140px; text-align: right; font-variant-numeric: tabular-nums; }
"#;

/// Self-contained HTML expense report.
pub fn render_expense_report(
    title: &str,
    subtitle: &str,
    date_range: &str,
    generated_at: &str,
    summary_cards: &[SummaryCard],
    transactions: &[ReportTransaction],
    distribution: &[CategorySlice],
) -> String {
    let cards: String = summary_cards
        .iter()
        .map(|c| {
            format!(
                r#"<div class="card"><div class="label">{}</div><div class="value">{}</div></div>"#,
                html_escape(&c.label),
                html_escape(&c.value)
            )
        })
        .collect();

    let rows: String = transactions
        .iter()
        .enumerate()
        .map(|(i, t)| {
            format!(
                r#"<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td class="amount">{:.2}</td></tr>"#,
                i + 1,
                html_escape(&t.date),
                html_escape(&t.category),
                html_escape(&t.description),
                t.amount
            )
        })
        .collect();

    let bars: String = distribution
        .iter()
        .map(|slice| {
            format!(
                r#"<div class="bar-row"><div class="bar-label">{}</div><div class="bar-track"><div class="bar-fill" style="width: {:.0}%; background: {};"></div></div><div class="bar-value">{:.2} ({:.1}%)</div></div>"#,
                html_escape(&slice.category),
                slice.percentage.min(100.0),
                slice.color,
                slice.amount,
                slice.percentage
            )
        })
        .collect();

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="UTF-8">
<title>{title}</title>
<style>{style}</style>
</head>
<body>
<div class="header">
  <h1>{title}</h1>
  <div class="subtitle">{subtitle}</div>
  <div class="meta"><span>{date_range}</span><span>Generated {generated_at}</span></div>
</div>
<div class="content">
  <div class="cards">{cards}</div>
  <h2>Transactions</h2>
  <table>
    <thead><tr><th>#</th><th>Date</th><th>Category</th><th>Description</th><th class="amount">Amount</th></tr></thead>
    <tbody>{rows}</tbody>
  </table>
  <h2>Category distribution</h2>
  {bars}
</div>
</body>
</html>
"#,
        title = html_escape(title),
        subtitle = html_escape(subtitle),
        date_range = html_escape(date_range),
        generated_at = html_escape(generated_at),
        style = STYLE,
        cards = cards,
        rows = rows,
        bars = bars,
    )
}

/// Group report: member balances plus the simplified settle-up plan.
pub fn render_group_report(
    group_name: &str,
    currency: &str,
    generated_at: &str,
    balances: &[MemberBalanceView],
    transfers: &[TransferView],
    distribution: &[CategorySlice],
) -> String {
    let balance_rows: String = balances
        .iter()
        .map(|b| {
            format!(
                r#"<tr><td>{}</td><td class="amount">{:.2}</td><td class="amount">{:.2}</td><td class="amount">{:.2}</td><td>{}</td></tr>"#,
                html_escape(&b.username),
                b.total_paid,
                b.total_owed,
                b.balance,
                html_escape(&b.formatted.text)
            )
        })
        .collect();

    let transfer_rows: String = if transfers.is_empty() {
        r#"<tr><td colspan="3">Everyone is settled up</td></tr>"#.to_string()
    } else {
        transfers
            .iter()
            .map(|t| {
                format!(
                    r#"<tr><td>{}</td><td>{}</td><td class="amount">{:.2}</td></tr>"#,
                    html_escape(&t.from_username),
                    html_escape(&t.to_username),
                    t.amount
                )
            })
            .collect()
    };

    let bars: String = distribution
        .iter()
        .map(|slice| {
            format!(
                r#"<div class="bar-row"><div class="bar-label">{}</div><div class="bar-track"><div class="bar-fill" style="width: {:.0}%; background: {};"></div></div><div class="bar-value">{:.2} ({:.1}%)</div></div>"#,
                html_escape(&slice.category),
                slice.percentage.min(100.0),
                slice.color,
                slice.amount,
                slice.percentage
            )
        })
        .collect();

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="UTF-8">
<title>{name} group report</title>
<style>{style}</style>
</head>
<body>
<div class="header">
  <h1>{name}</h1>
  <div class="subtitle">Group expense report ({currency})</div>
  <div class="meta"><span></span><span>Generated {generated_at}</span></div>
</div>
<div class="content">
  <h2>Member balances</h2>
  <table>
    <thead><tr><th>Member</th><th class="amount">Paid</th><th class="amount">Share</th><th class="amount">Balance</th><th>Status</th></tr></thead>
    <tbody>{balance_rows}</tbody>
  </table>
  <h2>Suggested settlements</h2>
  <table>
    <thead><tr><th>From</th><th>To</th><th class="amount">Amount</th></tr></thead>
    <tbody>{transfer_rows}</tbody>
  </table>
  <h2>Spending by category</h2>
  {bars}
</div>
</body>
</html>
"#,
        name = html_escape(group_name),
        currency = html_escape(currency),
        generated_at = html_escape(generated_at),
        style = STYLE,
        balance_rows = balance_rows,
        transfer_rows = transfer_rows,
        bars = bars,
    )
}

/// Expenses as CSV, one row per transaction.
pub fn expenses_csv(
    expenses: &[expense::Model],
    category_names: &HashMap<i32, String>,
) -> Result<String, ServiceError> {
    let mut writer = csv::Writer::from_writer(vec![]);

    writer
        .write_record([
            "id",
            "date",
            "category",
            "description",
            "amount",
            "currency",
            "payment_method",
            "notes",
        ])
        .map_err(|e| ServiceError::Database(e.to_string()))?;

    for e in expenses {
        let category = e
            .category_id
            .and_then(|id| category_names.get(&id).cloned())
            .unwrap_or_else(|| "Uncategorized".to_string());
        writer
            .write_record([
                e.id.to_string(),
                e.expense_date.clone(),
                category,
                e.description.clone(),
                format!("{:.2}", e.amount),
                e.currency.clone(),
                e.payment_method.clone().unwrap_or_default(),
                e.notes.clone().unwrap_or_default(),
            ])
            .map_err(|e| ServiceError::Database(e.to_string()))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ServiceError::Database(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| ServiceError::Database(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distribution_orders_by_amount_and_sums_to_hundred() {
        let mut totals = HashMap::new();
        totals.insert("Food".to_string(), 60.0);
        totals.insert("Rent".to_string(), 120.0);
        totals.insert("Fun".to_string(), 20.0);

        let slices = category_distribution(&totals);
        assert_eq!(slices[0].category, "Rent");
        assert_eq!(slices[0].percentage, 60.0);
        assert_eq!(slices[2].category, "Fun");

        let total_pct: f64 = slices.iter().map(|s| s.percentage).sum();
        assert!((total_pct - 100.0).abs() < 0.1);
    }

    #[test]
    fn empty_distribution_has_no_slices() {
        assert!(category_distribution(&HashMap::new()).is_empty());
    }

    #[test]
    fn report_html_escapes_user_content() {
        let html = render_expense_report(
            "March <Report>",
            "alice & bob",
            "2025-03-01 to 2025-03-31",
            "2025-04-01",
            &[SummaryCard {
                label: "Total".to_string(),
                value: "180.00".to_string(),
            }],
            &[ReportTransaction {
                date: "2025-03-10".to_string(),
                category: "Food".to_string(),
                description: "Dinner <script>".to_string(),
                amount: 42.0,
            }],
            &[],
        );

        assert!(html.contains("March &lt;Report&gt;"));
        assert!(html.contains("alice &amp; bob"));
        assert!(html.contains("Dinner &lt;script&gt;"));
        assert!(!html.contains("<script>"));
        assert!(html.contains("42.00"));
    }

    #[test]
    fn csv_includes_header_and_rows() {
        let expense = expense::Model {
            id: 7,
            user_id: 1,
            category_id: Some(3),
            amount: 12.5,
            currency: "USD".to_string(),
            description: "Coffee, beans".to_string(),
            expense_date: "2025-02-02".to_string(),
            payment_method: Some("card".to_string()),
            notes: None,
            is_recurring: false,
            recurring_frequency: None,
            next_occurrence: None,
            deleted_at: None,
            created_at: "2025-02-02T10:00:00Z".to_string(),
            updated_at: "2025-02-02T10:00:00Z".to_string(),
        };
        let mut names = HashMap::new();
        names.insert(3, "Food".to_string());

        let csv = expenses_csv(&[expense], &names).expect("csv failed");
        let mut lines = csv.lines();
        assert!(lines.next().unwrap().starts_with("id,date,category"));
        let row = lines.next().unwrap();
        assert!(row.contains("\"Coffee, beans\""));
        assert!(row.contains("12.50"));
        assert!(row.contains("Food"));
    }
}
