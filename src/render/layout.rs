use crate::core::PageConfig;

/// Relative widths of the six line-item columns: description, date,
/// quantity, unit price, tax, amount.
pub const COLUMN_FRACTIONS: [f32; 6] = [0.35, 0.15, 0.10, 0.15, 0.10, 0.15];

/// Left edge of each column in mm, measured from the page's left edge.
pub fn column_offsets(cfg: &PageConfig) -> [f32; 6] {
    let content = cfg.content_width();
    let mut offsets = [0.0f32; 6];
    let mut x = cfg.margin.left;
    for (i, fraction) in COLUMN_FRACTIONS.iter().enumerate() {
        offsets[i] = x;
        x += content * fraction;
    }
    offsets
}

/// Currency values always show exactly two decimals.
pub fn format_amount(value: f64) -> String {
    format!("{:.2}", value)
}

/// Tax rates render as an integer percentage.
pub fn format_percent(rate: f64) -> String {
    format!("{:.0}%", rate)
}

/// Clips text to a column, with an ellipsis when anything was cut.
pub fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{kept}...")
}
