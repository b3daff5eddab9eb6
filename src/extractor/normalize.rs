/// Strip `<...>` spans and collapse whitespace runs into single spaces.
///
/// An unterminated `<` swallows the remainder of the input. A `>` that does
/// not close a tag is kept as text, so `"5 > 3"` survives intact instead of
/// losing the bracket. No entity decoding is attempted.
pub fn strip_markup(raw: &str) -> String {
    let mut visible = String::with_capacity(raw.len());
    let mut in_tag = false;

    for ch in raw.chars() {
        match ch {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => visible.push(ch),
            _ => {}
        }
    }

    collapse_whitespace(&visible)
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}
