use chrono::{DateTime, Local, NaiveDate, Utc};
use ratatui::prelude::*;
use ratatui::widgets::TableState;

use crate::cache::CacheSource;

/// Truncate a string to at most `max_len` characters, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

/// Format a DART amount string with thousands separators.
///
/// DART sends amounts as plain digit strings, sometimes already grouped and
/// sometimes blank. Unparseable values are shown as-is.
pub fn format_amount(raw: &str) -> String {
  let cleaned: String = raw.chars().filter(|c| *c != ',' && !c.is_whitespace()).collect();
  if cleaned.is_empty() || cleaned == "-" {
    return "-".to_string();
  }

  let Ok(value) = cleaned.parse::<i128>() else {
    return raw.trim().to_string();
  };

  let digits = value.unsigned_abs().to_string();
  let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
  for (i, ch) in digits.chars().enumerate() {
    if i > 0 && (digits.len() - i) % 3 == 0 {
      grouped.push(',');
    }
    grouped.push(ch);
  }

  if value < 0 {
    format!("-{}", grouped)
  } else {
    grouped
  }
}

/// `YYYYMMDD` to `YYYY-MM-DD`; anything else is returned unchanged
pub fn format_date(raw: &str) -> String {
  NaiveDate::parse_from_str(raw.trim(), "%Y%m%d")
    .map(|d| d.format("%Y-%m-%d").to_string())
    .unwrap_or_else(|_| raw.to_string())
}

/// Badge telling where the shown data came from and when it was fetched
pub fn cache_badge(source: CacheSource, cached_at: DateTime<Utc>, refresh_failed: bool) -> Span<'static> {
  let color = match (source, refresh_failed) {
    (_, true) => Color::Red,
    (CacheSource::Network, _) => Color::Green,
    (CacheSource::CacheFresh, _) => Color::Cyan,
    (CacheSource::CacheStale, _) => Color::Yellow,
  };
  let at = cached_at.with_timezone(&Local).format("%H:%M:%S");
  let text = if refresh_failed {
    format!(" {} {} (refresh failed) ", source.label(), at)
  } else {
    format!(" {} {} ", source.label(), at)
  };
  Span::styled(text, Style::default().fg(color))
}

/// Keep the table selection within `len` rows
pub fn ensure_valid_selection(state: &mut TableState, len: usize) {
  match state.selected() {
    _ if len == 0 => state.select(None),
    None => state.select(Some(0)),
    Some(i) if i >= len => state.select(Some(len - 1)),
    Some(_) => {}
  }
}
