//! Text of the advance notice sent to clients.

use chrono::{DateTime, Utc};
use shared::ChangeType;

use super::models::event::Event;

const TIMESTAMP_FORMAT: &str = "%d.%m.%Y %H:%M";

/// Format an amount the way notices show it: USD with cents, the local
/// currency in whole units, thousands separated by spaces.
pub fn format_currency(amount: f64, is_usd: bool, local_code: &str) -> String {
    let sign = if amount < 0.0 { "-" } else { "" };
    let magnitude = amount.abs();

    if is_usd {
        let fixed = format!("{:.2}", magnitude);
        let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
        format!("{}{}.{} USD", sign, group_thousands(whole), cents)
    } else {
        let whole = format!("{}", magnitude.trunc() as i64);
        format!("{}{} {}", sign, group_thousands(&whole), local_code)
    }
}

fn group_thousands(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(' ');
        }
        grouped.push(ch);
    }
    grouped
}

/// Render the notice for the event's current advance.
///
/// The headline describes the most recent change; the history block lists
/// every change, newest first. Remaining is shown in the total's currency
/// and is only computed when both sides share a currency.
pub fn advance_notice(event: &Event, local_code: &str, now: DateTime<Utc>) -> String {
    let headline = match event.last_change() {
        Some(change) => {
            let verb = match change.change_type {
                ChangeType::Add => "increased",
                ChangeType::Subtract => "reduced",
            };
            format!(
                "Advance {} by {}",
                verb,
                format_currency(change.amount, event.advance_money, local_code)
            )
        }
        None => "Advance summary".to_string(),
    };

    let remaining = if event.amount_money == event.advance_money {
        format_currency(event.amount - event.advance, event.amount_money, local_code)
    } else {
        "see contract".to_string()
    };

    let history = if event.advance_history.is_empty() {
        "No advance changes recorded".to_string()
    } else {
        event
            .advance_history
            .iter()
            .rev()
            .map(|entry| {
                let label = match entry.change_type {
                    ChangeType::Add => "+ Added",
                    ChangeType::Subtract => "- Deducted",
                };
                format!(
                    "• {} - {}: {}",
                    entry.date.format(TIMESTAMP_FORMAT),
                    label,
                    format_currency(entry.amount, event.advance_money, local_code)
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        "ADVANCE NOTICE\n\n\
         Client: {client}\n\
         Date: {date}\n\n\
         {headline}\n\n\
         CURRENT STATE:\n\
         • Total: {total}\n\
         • Current advance: {advance}\n\
         • Remaining: {remaining}\n\n\
         ADVANCE HISTORY:\n\
         {history}\n",
        client = event.client_name,
        date = now.format(TIMESTAMP_FORMAT),
        headline = headline,
        total = format_currency(event.amount, event.amount_money, local_code),
        advance = format_currency(event.advance, event.advance_money, local_code),
        remaining = remaining,
        history = history,
    )
}
