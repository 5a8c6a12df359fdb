//! Token Counting
//!
//! Approximate token lengths used to enforce prompt budgets. Estimates are not
//! additive: measure the final concatenated text instead of summing parts.

/// Converts text into an approximate token count
pub trait TokenCounter: Send + Sync {
    fn count(&self, text: &str) -> usize;
}

impl<F> TokenCounter for F
where
    F: Fn(&str) -> usize + Send + Sync,
{
    fn count(&self, text: &str) -> usize {
        self(text)
    }
}

/// Word-tokenizer approximation.
///
/// Each run of alphanumeric characters is one token and every other
/// non-whitespace character (punctuation, markup, braces) is a token on its own.
#[derive(Clone, Copy, Debug, Default)]
pub struct WordTokenCounter;

impl TokenCounter for WordTokenCounter {
    fn count(&self, text: &str) -> usize {
        let mut tokens = 0;
        let mut in_word = false;

        for c in text.chars() {
            if c.is_alphanumeric() || c == '_' {
                if !in_word {
                    tokens += 1;
                    in_word = true;
                }
            } else {
                in_word = false;
                if !c.is_whitespace() {
                    tokens += 1;
                }
            }
        }

        tokens
    }
}

/// Rough estimate of ~4 bytes per token
#[derive(Clone, Copy, Debug, Default)]
pub struct CharRatioCounter;

impl TokenCounter for CharRatioCounter {
    fn count(&self, text: &str) -> usize {
        text.len().div_ceil(4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_is_zero() {
        assert_eq!(WordTokenCounter.count(""), 0);
        assert_eq!(WordTokenCounter.count("   \n\t"), 0);
        assert_eq!(CharRatioCounter.count(""), 0);
    }

    #[test]
    fn test_words_and_punctuation() {
        assert_eq!(WordTokenCounter.count("mint me an NFT"), 4);
        assert_eq!(WordTokenCounter.count("Hello, world!"), 4);
        assert_eq!(WordTokenCounter.count("<tool_call>"), 3);
        assert_eq!(WordTokenCounter.count("alice.testnet"), 3);
    }

    #[test]
    fn test_handles_arbitrary_unicode() {
        assert_eq!(WordTokenCounter.count("héllo wörld 🚀"), 3);
    }

    #[test]
    fn test_closure_counter() {
        let counter = |text: &str| text.split_whitespace().count();
        assert_eq!(TokenCounter::count(&counter, "a b c"), 3);
    }

    #[test]
    fn test_char_ratio_rounds_up() {
        assert_eq!(CharRatioCounter.count("abcde"), 2);
    }
}
