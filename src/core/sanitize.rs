// src/core/sanitize.rs

/// Collapse runs of whitespace (including NBSP) into single spaces and trim.
pub fn normalize_ws(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_space = false;
    for ch in s.chars() {
        if ch.is_whitespace() {
            if !prev_space { out.push(' '); prev_space = true; }
        } else { out.push(ch); prev_space = false; }
    }
    out.trim().to_string()
}

/// Remove any `[ ... ]` or `( ... )` annotation (e.g. `[note 3]`, `(Islamic Republic of)`).
/// Greedy within each pair, no nesting; stray closers are dropped too, so the
/// output never contains bracket characters.
pub fn strip_annotations(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut open: Option<char> = None;
    for ch in s.chars() {
        match (open, ch) {
            (None, '[') => open = Some(']'),
            (None, '(') => open = Some(')'),
            (None, ']' | ')') => {}
            (None, _) => out.push(ch),
            (Some(close), _) if ch == close => open = None,
            (Some(_), _) => {}
        }
    }
    normalize_ws(&out)
}

/// Filesystem-safe stem for diagnostics artifacts: `2024-05-01T10:00:00.000Z` → `2024-05-01T10-00-00-000Z`.
pub fn file_stem(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut last_dash = false;
    for ch in s.chars() {
        if ch.is_ascii_alphanumeric() { out.push(ch); last_dash = false; }
        else if !last_dash { out.push('-'); last_dash = true; }
    }
    out.trim_matches('-').to_string()
}
