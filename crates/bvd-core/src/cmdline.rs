//! Free-text option splitting for the "additional options" setting.
//!
//! Honors double quotes so `-o "my file.mp4"` stays one token; there is no
//! backslash escaping, matching how the options box has always behaved.

/// Splits `command_line` into tokens.
///
/// A `"` toggles quoted mode and is never emitted. Whitespace outside
/// quotes ends the current token; inside quotes it is kept. Blank input
/// yields no tokens, and an unterminated quote simply runs to the end of
/// the string.
pub fn split(command_line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    if command_line.trim().is_empty() {
        return tokens;
    }

    let mut current = String::new();
    let mut in_quotes = false;

    for ch in command_line.chars() {
        if ch == '"' {
            in_quotes = !in_quotes;
            continue;
        }
        if ch.is_whitespace() && !in_quotes {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
            continue;
        }
        current.push(ch);
    }

    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}
