/// Prepares a value for use inside a quoted Lucene phrase (`field:"..."`).
///
/// Only the phrase delimiters need escaping there: backslash and double quote.
/// Runs of whitespace collapse to one space so pasted names still match.
pub(crate) fn escape_phrase(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for (i, word) in value.split_whitespace().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        for ch in word.chars() {
            if matches!(ch, '\\' | '"') {
                out.push('\\');
            }
            out.push(ch);
        }
    }
    out
}
