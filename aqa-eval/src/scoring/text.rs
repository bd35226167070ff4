use std::collections::HashSet;

/// Split on runs of `.`, `!` and `?`, trimming and discarding empty fragments.
pub(crate) fn sentences(text: &str) -> Vec<&str> {
    text.split(['.', '!', '?']).map(str::trim).filter(|s| !s.is_empty()).collect()
}

/// Distinct whitespace-delimited tokens.
pub(crate) fn word_set(sentence: &str) -> HashSet<&str> {
    sentence.split_whitespace().collect()
}

/// Byte range covering `window` characters either side of `start..start + len`.
pub(crate) fn char_window(text: &str, start: usize, len: usize, window: usize) -> &str {
    let from = if window == 0 {
        start
    } else {
        text[..start].char_indices().rev().nth(window - 1).map_or(0, |(i, _)| i)
    };
    let after = start + len;
    let to = text[after..].char_indices().nth(window).map_or(text.len(), |(i, _)| after + i);
    &text[from..to]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentences() {
        assert_eq!(sentences("One. Two!! Three?  "), vec!["One", "Two", "Three"]);
        assert!(sentences("...!?").is_empty());
        assert_eq!(sentences("no terminator"), vec!["no terminator"]);
    }

    #[test]
    fn test_word_set_collapses_duplicates() {
        assert_eq!(word_set("the the sky").len(), 2);
    }

    #[test]
    fn test_char_window() {
        let text = "abcdefghij";
        assert_eq!(char_window(text, 4, 2, 2), "cdefgh");
        assert_eq!(char_window(text, 0, 1, 5), "abcdef");
        assert_eq!(char_window(text, 8, 2, 5), "defghij");
        assert_eq!(char_window(text, 4, 2, 0), "ef");
    }

    #[test]
    fn test_char_window_multibyte() {
        let text = "ééé men are ééé";
        let start = text.find("men are").unwrap();
        assert_eq!(char_window(text, start, "men are".len(), 2), "é men are é");
    }
}
