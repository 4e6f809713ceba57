use unicode_width::UnicodeWidthChar;

/// Width units of a name: wide (CJK) characters count two, everything else one.
pub fn name_units(name: &str) -> usize {
    name.chars()
        .map(|c| match c.width() {
            Some(2) => 2,
            _ => 1,
        })
        .sum()
}

/// World-space width of a name label.
pub fn name_width(name: &str, glyph_width: f64) -> f64 {
    name_units(name) as f64 * glyph_width
}
