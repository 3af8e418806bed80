//! Character-class tokenization.
//!
//! A token is a maximal run of characters sharing the same [`CharClass`], except
//! that every punctuation character forms a token of its own (so `"?!"` yields
//! two tokens).

/// Coarse Unicode character class used to split text into tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display, derive_more::IsVariant)]
pub enum CharClass {
    #[display("letter")]
    Letter,
    #[display("digit")]
    Digit,
    #[display("punct")]
    Punct,
    #[display("space")]
    Space,
    #[display("symbol")]
    Symbol,
    #[display("other")]
    Other,
}

// ASCII punctuation that Unicode classifies as symbols (Sm, Sc, Sk).
const ASCII_SYMBOLS: &str = "$+<=>^`|~";

impl CharClass {
    #[must_use]
    pub fn of(ch: char) -> Self {
        if ch.is_alphabetic() {
            Self::Letter
        } else if ch.is_numeric() {
            Self::Digit
        } else if ch.is_whitespace() {
            Self::Space
        } else if is_punctuation(ch) {
            Self::Punct
        } else if is_symbol(ch) {
            Self::Symbol
        } else {
            Self::Other
        }
    }
}

fn is_punctuation(ch: char) -> bool {
    if ch.is_ascii() {
        return ch.is_ascii_punctuation() && !ASCII_SYMBOLS.contains(ch);
    }
    matches!(
        ch,
        '\u{00A1}' | '\u{00A7}' | '\u{00AB}' | '\u{00B6}' | '\u{00B7}' | '\u{00BB}' | '\u{00BF}'
            | '\u{2010}'..='\u{2027}'
            | '\u{2030}'..='\u{2043}'
            | '\u{2045}'..='\u{2051}'
            | '\u{2053}'..='\u{205E}'
            | '\u{3001}'..='\u{3003}'
            | '\u{3008}'..='\u{3011}'
    )
}

fn is_symbol(ch: char) -> bool {
    if ch.is_ascii() {
        return ASCII_SYMBOLS.contains(ch);
    }
    matches!(
        ch,
        '\u{00A2}'..='\u{00A6}'
            | '\u{00A8}'
            | '\u{00A9}'
            | '\u{00AC}'
            | '\u{00AE}'..='\u{00B1}'
            | '\u{00B4}'
            | '\u{00D7}'
            | '\u{00F7}'
            | '\u{2044}'
            | '\u{2052}'
            | '\u{20A0}'..='\u{20CF}'
            | '\u{2100}'..='\u{214F}'
            | '\u{2190}'..='\u{23FF}'
            | '\u{2500}'..='\u{27BF}'
    )
}

/// A run of characters of one class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub class: CharClass,
    pub text: String,
}

impl Token {
    /// Returns the token text lowercased.
    #[must_use]
    pub fn lowercase(&self) -> String {
        self.text.to_lowercase()
    }
}

/// Splits `s` into class runs.
#[must_use]
pub fn tokenize(s: &str) -> Vec<Token> {
    let mut tokens: Vec<Token> = vec![];
    for ch in s.chars() {
        let class = CharClass::of(ch);
        match tokens.last_mut() {
            Some(last) if last.class == class && !class.is_punct() => last.text.push(ch),
            _ => tokens.push(Token {
                class,
                text: ch.to_string(),
            }),
        }
    }
    tokens
}
