use ratatui::prelude::Color;

use crate::catalog::ProductStatus;

/// Truncate to at most `max_len` characters, ending in "..." when cut
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

/// Yen amount with thousands separators, e.g. `¥298,000`
pub fn format_price(price: u64) -> String {
  let digits = price.to_string();
  let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 2);
  out.push('¥');
  for (i, c) in digits.chars().enumerate() {
    if i > 0 && (digits.len() - i) % 3 == 0 {
      out.push(',');
    }
    out.push(c);
  }
  out
}

pub fn status_color(status: ProductStatus) -> Color {
  match status {
    ProductStatus::Active => Color::Green,
    ProductStatus::Inactive => Color::DarkGray,
    ProductStatus::Soldout => Color::Red,
  }
}

/// Out-of-stock counts stand out
pub fn stock_color(stock: u64) -> Color {
  if stock == 0 {
    Color::Red
  } else {
    Color::White
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_truncate_short_string() {
    assert_eq!(truncate("hello", 10), "hello");
    assert_eq!(truncate("hello", 5), "hello");
  }

  #[test]
  fn test_truncate_long_string() {
    assert_eq!(truncate("hello world", 8), "hello...");
  }

  #[test]
  fn test_truncate_counts_characters() {
    assert_eq!(truncate("北欧風ダイニングテーブル", 6), "北欧風...");
  }

  #[test]
  fn test_format_price() {
    assert_eq!(format_price(0), "¥0");
    assert_eq!(format_price(800), "¥800");
    assert_eq!(format_price(3_500), "¥3,500");
    assert_eq!(format_price(298_000), "¥298,000");
    assert_eq!(format_price(1_234_567), "¥1,234,567");
  }

  #[test]
  fn test_colors() {
    assert_eq!(status_color(ProductStatus::Soldout), Color::Red);
    assert_eq!(status_color(ProductStatus::Active), Color::Green);
    assert_eq!(stock_color(0), Color::Red);
    assert_eq!(stock_color(3), Color::White);
  }
}
