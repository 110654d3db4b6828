// src/util.rs — Small text helpers for logs and progress lines

/// At most `max_len` bytes of `s`, cut on a char boundary.
pub fn truncate_str(s: &str, max_len: usize) -> &str {
    if s.len() <= max_len {
        return s;
    }
    let mut end = max_len;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Single-line preview: whitespace runs collapse to one space, and an
/// ellipsis marks a cut.
pub fn preview(s: &str, max_len: usize) -> String {
    let flat = s.split_whitespace().collect::<Vec<_>>().join(" ");
    let cut = truncate_str(&flat, max_len);
    if cut.len() < flat.len() {
        format!("{cut}…")
    } else {
        flat
    }
}
