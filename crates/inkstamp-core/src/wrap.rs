//! Greedy word wrapping for text overlays
//!
//! Both exporters wrap text themselves: words are added to the current line
//! while the measured line still fits the field width, otherwise the line is
//! emitted and the word starts the next one. Lines advance by
//! `LINE_HEIGHT_FACTOR × size`.

use crate::fonts::TextMeasure;

/// Baseline-to-baseline distance as a multiple of the font size.
pub const LINE_HEIGHT_FACTOR: f64 = 1.2;

/// Wrap `text` into lines no wider than `max_width` at `size`.
///
/// `\n` forces a break. A word that is wider than `max_width` on its own is
/// emitted alone on its line rather than split.
pub fn wrap_text<M: TextMeasure + ?Sized>(
    measure: &M,
    text: &str,
    size: f64,
    max_width: f64,
) -> Vec<String> {
    let mut lines = Vec::new();
    if text.trim().is_empty() {
        return lines;
    }

    for paragraph in text.trim_end().split('\n') {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            if current.is_empty() {
                current.push_str(word);
                continue;
            }
            let candidate = format!("{} {}", current, word);
            if measure.text_width(&candidate, size) <= max_width {
                current = candidate;
            } else {
                lines.push(std::mem::replace(&mut current, word.to_string()));
            }
        }
        lines.push(current);
    }

    lines
}

/// Vertical advance between consecutive lines.
pub fn line_height(size: f64) -> f64 {
    size * LINE_HEIGHT_FACTOR
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fonts::StandardFont;
    use pretty_assertions::assert_eq;

    /// Every character is one unit wide at size 1.
    struct Mono;

    impl TextMeasure for Mono {
        fn text_width(&self, text: &str, size: f64) -> f64 {
            text.chars().count() as f64 * size
        }
    }

    #[test]
    fn test_short_text_is_one_line() {
        assert_eq!(wrap_text(&Mono, "hello world", 1.0, 20.0), vec!["hello world"]);
    }

    #[test]
    fn test_breaks_when_line_overflows() {
        let lines = wrap_text(&Mono, "the quick brown fox jumps", 1.0, 10.0);
        assert_eq!(lines, vec!["the quick", "brown fox", "jumps"]);
    }

    #[test]
    fn test_exact_fit_stays_on_line() {
        assert_eq!(wrap_text(&Mono, "abcd efgh", 1.0, 9.0), vec!["abcd efgh"]);
        assert_eq!(wrap_text(&Mono, "abcd efgh", 1.0, 8.9), vec!["abcd", "efgh"]);
    }

    #[test]
    fn test_overlong_word_is_alone() {
        let lines = wrap_text(&Mono, "a supercalifragilistic b", 1.0, 5.0);
        assert_eq!(lines, vec!["a", "supercalifragilistic", "b"]);
    }

    #[test]
    fn test_explicit_newlines() {
        let lines = wrap_text(&Mono, "first\n\nthird line", 1.0, 100.0);
        assert_eq!(lines, vec!["first", "", "third line"]);
    }

    #[test]
    fn test_empty_text_has_no_lines() {
        assert!(wrap_text(&Mono, "", 1.0, 10.0).is_empty());
        assert!(wrap_text(&Mono, "  \n ", 1.0, 10.0).is_empty());
    }

    #[test]
    fn test_collapses_runs_of_spaces() {
        assert_eq!(wrap_text(&Mono, "a    b", 1.0, 10.0), vec!["a b"]);
    }

    #[test]
    fn test_with_helvetica_metrics() {
        // 200pt wide field, 12pt Helvetica
        let text = "This agreement is signed by both parties on the date written below";
        let lines = wrap_text(&StandardFont::Helvetica, text, 12.0, 200.0);
        assert!(lines.len() >= 2);
        for line in &lines {
            assert!(StandardFont::Helvetica.text_width(line, 12.0) <= 200.0);
        }
        assert_eq!(lines.join(" "), text);
    }

    #[test]
    fn test_line_height() {
        assert!((line_height(10.0) - 12.0).abs() < 1e-12);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use crate::fonts::StandardFont;
    use proptest::prelude::*;

    fn words() -> impl Strategy<Value = Vec<String>> {
        prop::collection::vec("[A-Za-z0-9,.]{1,14}", 1..30)
    }

    proptest! {
        /// No emitted line is wider than the field, except a lone overlong word
        #[test]
        fn lines_fit_field_width(
            words in words(),
            size in 6.0f64..36.0,
            max_width in 20.0f64..400.0,
        ) {
            let text = words.join(" ");
            let font = StandardFont::Helvetica;
            let lines = wrap_text(&font, &text, size, max_width);

            for line in &lines {
                let width = font.text_width(line, size);
                let single_word = !line.contains(' ');
                prop_assert!(
                    width <= max_width || single_word,
                    "line {:?} is {} wide, field is {}",
                    line, width, max_width
                );
            }
        }

        /// Wrapping never drops or reorders words
        #[test]
        fn wrapping_preserves_words(
            words in words(),
            max_width in 1.0f64..300.0,
        ) {
            let text = words.join(" ");
            let lines = wrap_text(&StandardFont::TimesRoman, &text, 12.0, max_width);
            let rejoined: Vec<&str> = lines.iter().flat_map(|l| l.split(' ')).collect();
            let original: Vec<&str> = words.iter().map(String::as_str).collect();
            prop_assert_eq!(rejoined, original);
        }

        /// A line is only broken when the next word would not fit
        #[test]
        fn lines_are_greedy(
            words in words(),
            max_width in 20.0f64..300.0,
        ) {
            let text = words.join(" ");
            let font = StandardFont::Helvetica;
            let lines = wrap_text(&font, &text, 12.0, max_width);
            for pair in lines.windows(2) {
                let next_word = pair[1].split(' ').next().unwrap_or_default();
                let joined = format!("{} {}", pair[0], next_word);
                prop_assert!(font.text_width(&joined, 12.0) > max_width);
            }
        }
    }
}
