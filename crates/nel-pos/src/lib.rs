//! Part-of-speech tagging as seen by the lookup tagger.
//!
//! The pipeline treats POS tagging as an opaque function from a token
//! sequence to one tag per token ([`PosTagger`]); any closure with that shape
//! qualifies. [`LexiconTagger`] is a dependency-free fallback that emits
//! Penn-Treebank-style tags:
//! 1. Look the lower-cased token up in a lexicon (built-in closed-class words
//!    plus an optional `word TAG` file).
//! 2. Classify by shape: punctuation tags as itself, numerals as `CD`,
//!    capitalised words as `NNP`.
//! 3. Apply suffix rules (`-ing` → `VBG`, `-ly` → `RB`, ...), defaulting to `NN`.
//!
//! # Example
//! ```no_run
//! use nel_pos::{LexiconTagger, PosTagger};
//!
//! # fn main() -> anyhow::Result<()> {
//! let tagger = LexiconTagger::load("/path/to/lexicon.txt")?;
//! let tags = tagger.tag(&["The", "senator", "spoke", "."]);
//! assert_eq!(tags.len(), 4);
//! # Ok(()) }
//! ```

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result};

/// Maps a token sequence to one part-of-speech tag per token.
pub trait PosTagger {
    fn tag(&self, tokens: &[&str]) -> Vec<String>;
}

impl<F> PosTagger for F
where
    F: Fn(&[&str]) -> Vec<String>,
{
    fn tag(&self, tokens: &[&str]) -> Vec<String> {
        self(tokens)
    }
}

/// How a tag was chosen.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TagSource {
    Lexicon,
    Shape,
    Rule { suffix: &'static str },
    Default,
}

/// Lexicon lookup with shape and suffix fallbacks.
pub struct LexiconTagger {
    lexicon: HashMap<String, String>,
}

impl LexiconTagger {
    /// Tagger with only the built-in closed-class lexicon.
    pub fn builtin() -> Self {
        let lexicon = BUILTIN_LEXICON
            .iter()
            .flat_map(|(tag, words)| words.iter().map(move |w| (w.to_string(), tag.to_string())))
            .collect();
        Self { lexicon }
    }

    /// Built-in lexicon extended (and overridden) by a `word TAG` file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let mut tagger = Self::builtin();
        tagger.lexicon.extend(load_lexicon(path.as_ref())?);
        Ok(tagger)
    }

    pub fn lexicon_len(&self) -> usize {
        self.lexicon.len()
    }

    /// Tag a single token, reporting which stage decided.
    pub fn tag_token(&self, token: &str) -> (String, TagSource) {
        let lower = token.to_lowercase();
        if let Some(tag) = self.lexicon.get(&lower) {
            return (tag.clone(), TagSource::Lexicon);
        }

        if !token.is_empty() && token.chars().all(|c| !c.is_alphanumeric()) {
            return (token.to_string(), TagSource::Shape);
        }
        if token.chars().any(|c| c.is_ascii_digit())
            && token.chars().all(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-'))
        {
            return ("CD".to_string(), TagSource::Shape);
        }
        if token.chars().next().is_some_and(char::is_uppercase) {
            let tag = if token.len() > 1 && lower.ends_with('s') && token.ends_with('s') {
                "NNPS"
            } else {
                "NNP"
            };
            return (tag.to_string(), TagSource::Shape);
        }

        for (suffix, tag) in SUFFIX_RULES {
            if lower.len() > suffix.len() + 1 && lower.ends_with(suffix) {
                return (tag.to_string(), TagSource::Rule { suffix });
            }
        }

        ("NN".to_string(), TagSource::Default)
    }
}

impl PosTagger for LexiconTagger {
    fn tag(&self, tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|t| self.tag_token(t).0).collect()
    }
}

fn load_lexicon(path: &Path) -> Result<HashMap<String, String>> {
    let file = File::open(path).with_context(|| format!("open lexicon {}", path.display()))?;
    let reader = BufReader::new(file);
    let mut map = HashMap::new();
    for (lineno, line) in reader.lines().enumerate() {
        let line =
            line.with_context(|| format!("read line {} in {}", lineno + 1, path.display()))?;
        let mut parts = line.split_whitespace();
        let (Some(word), Some(tag)) = (parts.next(), parts.next()) else {
            continue;
        };
        if word.starts_with('#') {
            continue;
        }
        map.insert(word.to_lowercase(), tag.to_string());
    }
    Ok(map)
}

const SUFFIX_RULES: &[(&str, &str)] = &[
    ("ing", "VBG"),
    ("ed", "VBD"),
    ("ly", "RB"),
    ("ous", "JJ"),
    ("ful", "JJ"),
    ("able", "JJ"),
    ("ible", "JJ"),
    ("ive", "JJ"),
    ("ical", "JJ"),
    ("ness", "NN"),
    ("ment", "NN"),
    ("tion", "NN"),
    ("s", "NNS"),
];

const BUILTIN_LEXICON: &[(&str, &[&str])] = &[
    ("DT", &["a", "an", "the", "this", "that", "these", "those", "every", "each", "no", "some", "any", "all"]),
    ("IN", &["of", "in", "on", "at", "by", "for", "with", "from", "about", "into", "over", "after", "before", "under", "between", "during", "against", "since", "than", "as", "if", "while", "because"]),
    ("CC", &["and", "or", "but", "nor", "yet"]),
    ("TO", &["to"]),
    ("PRP", &["i", "you", "he", "she", "it", "we", "they", "me", "him", "them", "us"]),
    ("PRP$", &["my", "your", "his", "her", "its", "our", "their"]),
    ("MD", &["can", "could", "may", "might", "must", "shall", "should", "will", "would"]),
    ("VBZ", &["is", "has", "does", "says"]),
    ("VBP", &["are", "am", "have", "do"]),
    ("VBD", &["was", "were", "had", "did", "said", "went", "met", "told", "made", "took"]),
    ("VBN", &["been", "done", "gone", "known"]),
    ("VB", &["be"]),
    ("WDT", &["which", "whatever"]),
    ("WP", &["who", "whom", "what"]),
    ("WRB", &["when", "where", "why", "how"]),
    ("RB", &["not", "also", "very", "then", "there", "here", "now", "just", "only"]),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_lexicon_holds_single_plain_words() {
        for (tag, words) in BUILTIN_LEXICON {
            for word in *words {
                assert!(
                    word.chars().all(|c| c.is_ascii_lowercase()),
                    "{tag} entry {word:?} can never match a token"
                );
            }
        }
        assert_eq!(LexiconTagger::builtin().tag_token("there").0, "RB");
    }

    #[test]
    fn closed_class_words_come_from_the_lexicon() {
        let tagger = LexiconTagger::builtin();
        assert_eq!(tagger.tag_token("The"), ("DT".to_string(), TagSource::Lexicon));
        assert_eq!(tagger.tag_token("of").0, "IN");
    }

    #[test]
    fn shapes_decide_before_suffixes() {
        let tagger = LexiconTagger::builtin();
        assert_eq!(tagger.tag_token(".").0, ".");
        assert_eq!(tagger.tag_token("1,200").0, "CD");
        assert_eq!(tagger.tag_token("Obama"), ("NNP".to_string(), TagSource::Shape));
        assert_eq!(tagger.tag_token("Americans").0, "NNPS");
        assert_eq!(tagger.tag_token("Running").0, "NNP");
    }

    #[test]
    fn suffix_rules_and_default() {
        let tagger = LexiconTagger::builtin();
        assert_eq!(
            tagger.tag_token("running"),
            ("VBG".to_string(), TagSource::Rule { suffix: "ing" })
        );
        assert_eq!(tagger.tag_token("quickly").0, "RB");
        assert_eq!(tagger.tag_token("senators").0, "NNS");
        assert_eq!(tagger.tag_token("ring"), ("NN".to_string(), TagSource::Default));
        assert_eq!(tagger.tag_token("senator"), ("NN".to_string(), TagSource::Default));
    }

    #[test]
    fn closures_are_taggers() {
        let all_nouns = |tokens: &[&str]| vec!["NN".to_string(); tokens.len()];
        assert_eq!(all_nouns.tag(&["a", "b"]), vec!["NN", "NN"]);
    }

    #[test]
    fn lexicon_file_overrides_builtin_entries() {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# word tag").unwrap();
        writeln!(file, "the NNP").unwrap();
        writeln!(file, "senate NNP").unwrap();
        writeln!(file, "orphan").unwrap();
        let tagger = LexiconTagger::load(file.path()).unwrap();
        assert_eq!(tagger.tag(&["The", "Senate"]), vec!["NNP", "NNP"]);
        assert_eq!(tagger.lexicon_len(), LexiconTagger::builtin().lexicon_len() + 1);
    }
}
