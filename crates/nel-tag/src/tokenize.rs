use nel_types::Token;

/// Split text into word runs and single punctuation tokens.
///
/// Offsets are character offsets. Apostrophes, hyphens and ampersands stay
/// inside a word when they sit between two word characters.
pub fn tokenize(text: &str) -> Vec<Token> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        let start = i;
        if c.is_alphanumeric() {
            i += 1;
            while i < chars.len() {
                let joins = matches!(chars[i], '\'' | '-' | '&')
                    && chars.get(i + 1).is_some_and(|n| n.is_alphanumeric());
                if chars[i].is_alphanumeric() || joins {
                    i += 1;
                } else {
                    break;
                }
            }
        } else {
            i += 1;
        }
        tokens.push(Token::new(start, i, chars[start..i].iter().collect::<String>()));
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(tokens: &[Token]) -> Vec<&str> {
        tokens.iter().map(|t| t.text.as_str()).collect()
    }

    #[test]
    fn splits_words_and_punctuation() {
        let tokens = tokenize("AT&T's CEO met O'Neil in Genève. Then left!");
        assert_eq!(
            texts(&tokens),
            vec!["AT&T's", "CEO", "met", "O'Neil", "in", "Genève", ".", "Then", "left", "!"]
        );
        let geneve = &tokens[5];
        assert_eq!((geneve.begin, geneve.end), (25, 31));
        assert_eq!(tokens[6].begin, 31);
    }

    #[test]
    fn trailing_joiners_are_separate_tokens() {
        assert_eq!(texts(&tokenize("rock- 'n' roll")), vec!["rock", "-", "'", "n", "'", "roll"]);
        assert!(tokenize("   ").is_empty());
    }
}
