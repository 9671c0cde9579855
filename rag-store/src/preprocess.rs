//! Token preprocessing for the lexical retriever.
//!
//! Catalog text mixes Japanese and latin product names, so the default
//! tokenizer works without a morphological dictionary:
//! - NFKC + lowercase (folds half-width katakana and full-width ASCII)
//! - latin/digit runs become one token each
//! - kana/kanji runs become overlapping character bigrams (a lone character
//!   stays a unigram)
//! - duplicates are removed, first occurrence wins

use std::collections::HashSet;
use std::sync::Arc;

use unicode_normalization::UnicodeNormalization;

/// Turns raw text into index terms. Shared by indexing and querying.
pub type Preprocess = Arc<dyn Fn(&str) -> Vec<String> + Send + Sync>;

/// The default [`Preprocess`] (see module docs).
pub fn default_preprocess() -> Preprocess {
    Arc::new(tokenize)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum CharClass {
    Word,
    Cjk,
    Separator,
}

fn classify(ch: char) -> CharClass {
    if is_cjk(ch) {
        CharClass::Cjk
    } else if ch.is_alphanumeric() {
        CharClass::Word
    } else {
        CharClass::Separator
    }
}

fn is_cjk(ch: char) -> bool {
    matches!(ch,
        '\u{3040}'..='\u{309F}'   // hiragana
        | '\u{30A0}'..='\u{30FF}' // katakana (incl. prolonged sound mark)
        | '\u{3400}'..='\u{4DBF}' // CJK extension A
        | '\u{4E00}'..='\u{9FFF}' // CJK unified ideographs
        | '\u{F900}'..='\u{FAFF}' // compatibility ideographs
    )
}

/// Default tokenizer.
pub fn tokenize(text: &str) -> Vec<String> {
    let normalized: String = text.nfkc().flat_map(char::to_lowercase).collect();

    let mut tokens = Vec::new();
    let mut run: Vec<char> = Vec::new();
    let mut run_class = CharClass::Separator;

    for ch in normalized.chars() {
        let class = classify(ch);
        if class != run_class {
            flush(&mut tokens, &run, run_class);
            run.clear();
            run_class = class;
        }
        if class != CharClass::Separator {
            run.push(ch);
        }
    }
    flush(&mut tokens, &run, run_class);

    let mut seen = HashSet::new();
    tokens.retain(|t| seen.insert(t.clone()));
    tokens
}

fn flush(tokens: &mut Vec<String>, run: &[char], class: CharClass) {
    match class {
        CharClass::Separator => {}
        _ if run.is_empty() => {}
        CharClass::Word => tokens.push(run.iter().collect()),
        CharClass::Cjk if run.len() == 1 => tokens.push(run[0].to_string()),
        CharClass::Cjk => tokens.extend(run.windows(2).map(|w| w.iter().collect::<String>())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latin_words_are_lowercased_and_split() {
        assert_eq!(tokenize("Super Widget-3000!"), vec!["super", "widget", "3000"]);
    }

    #[test]
    fn japanese_runs_become_bigrams() {
        assert_eq!(tokenize("在庫あり"), vec!["在庫", "庫あ", "あり"]);
        assert_eq!(tokenize("靴"), vec!["靴"]);
    }

    #[test]
    fn width_variants_fold_together() {
        assert_eq!(tokenize("ＡＢＣ"), tokenize("abc"));
        assert_eq!(tokenize("ｶﾒﾗ"), tokenize("カメラ"));
    }

    #[test]
    fn duplicates_are_removed() {
        assert_eq!(tokenize("bag bag BAG"), vec!["bag"]);
    }
}
