//! Reconciliation of locally recorded notification attempts with the server log.
//!
//! The dispatcher records every attempt locally as soon as it resolves, with a
//! `local-` id and the client clock. The server keeps its own log. When the log
//! is fetched, each local entry is matched against it:
//!
//! - a local entry with a server twin (same phone, same status, `sent_at` within
//!   the match window) is superseded by the server entry;
//! - a local entry with no twin is kept, because the server either has not
//!   recorded it yet or never will (e.g. the request failed before reaching it).
//!
//! One server entry supersedes at most one local entry. Two attempts to the same
//! phone a few seconds apart stay two entries. Phones are compared in canonical
//! form, since the server logs the number it normalized rather than the one typed.

use chrono::Duration;
use shared::NotificationAttempt;
use uuid::Uuid;

pub const LOCAL_ID_PREFIX: &str = "local-";

/// Default tolerance between client and server timestamps of the same attempt
pub const DEFAULT_MATCH_WINDOW_SECS: i64 = 120;

pub fn default_match_window() -> Duration {
    Duration::seconds(DEFAULT_MATCH_WINDOW_SECS)
}

pub fn new_local_id() -> String {
    format!("{}{}", LOCAL_ID_PREFIX, Uuid::new_v4())
}

pub fn is_local(attempt: &NotificationAttempt) -> bool {
    attempt.id.starts_with(LOCAL_ID_PREFIX)
}

const COUNTRY_CODE: &str = "998";
const SUBSCRIBER_DIGITS: usize = 9;

/// Phone number as the server logs it, without the `+`: separators dropped and
/// the country code added to a bare nine-digit number. Anything else is kept as typed.
pub fn canonical_phone(phone: &str) -> String {
    let cleaned: String = phone
        .trim()
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')'))
        .collect();
    let digits = cleaned.strip_prefix('+').unwrap_or(&cleaned);

    if digits.len() == SUBSCRIBER_DIGITS && digits.chars().all(|c| c.is_ascii_digit()) {
        format!("{}{}", COUNTRY_CODE, digits)
    } else {
        digits.to_string()
    }
}

fn is_twin(local: &NotificationAttempt, server: &NotificationAttempt, window: Duration) -> bool {
    canonical_phone(&local.phone) == canonical_phone(&server.phone)
        && local.status == server.status
        && (local.sent_at - server.sent_at).abs() <= window
}

/// Merge the currently displayed history with a freshly fetched server log.
///
/// Returns every authoritative entry plus the local entries that have no
/// authoritative twin, newest first. Server entries from an earlier fetch are
/// dropped; the new log is the source of truth for them.
pub fn merge_history(
    local: &[NotificationAttempt],
    authoritative: &[NotificationAttempt],
    window: Duration,
) -> Vec<NotificationAttempt> {
    let mut claimed = vec![false; authoritative.len()];
    let mut merged: Vec<NotificationAttempt> = authoritative.to_vec();

    for entry in local.iter().filter(|e| is_local(e)) {
        let twin = authoritative
            .iter()
            .enumerate()
            .find(|(i, server)| !claimed[*i] && is_twin(entry, server, window))
            .map(|(i, _)| i);

        match twin {
            Some(i) => claimed[i] = true,
            None => merged.push(entry.clone()),
        }
    }

    merged.sort_by(|a, b| b.sent_at.cmp(&a.sent_at));
    merged
}
