//! Source-line lexer.
//!
//! Splits a raw source line into lexical pieces; `crunch` maps those pieces
//! onto token bytes. Keywords are not distinguished here: identifiers are
//! resolved against the keyword and function tables afterwards, so the lexer
//! stays a pure character-class machine.

use logos::Logos;

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawToken {
    #[regex(r"[ \t]+")]
    Whitespace,

    // Closing quote optional so an unterminated literal still lexes; crunch
    // rejects it with a proper error instead of a lexer failure.
    #[regex(r#""[^"\r\n]*"?"#)]
    StringLit,

    // 1.5  .5  2.  3.14E-2  1.0D6, optional ! / # type suffix
    #[regex(r"([0-9]+\.[0-9]*|\.[0-9]+)([EeDd][+-]?[0-9]+)?[!#]?", priority = 5)]
    Float,

    // 1E6, 2D-3: exponent without a decimal point
    #[regex(r"[0-9]+[EeDd][+-]?[0-9]+[!#]?", priority = 4)]
    FloatExp,

    #[regex(r"[0-9]+[%!#]?", priority = 3)]
    Integer,

    #[regex(r"&[Hh][0-9A-Fa-f]+")]
    HexInteger,

    #[regex(r"&[Oo]?[0-7]+")]
    OctInteger,

    #[regex(r"[A-Za-z][A-Za-z0-9]*[$%!#]?", priority = 2)]
    Ident,

    #[token("<=")]
    LessEq,
    #[token(">=")]
    GreaterEq,
    #[token("<>")]
    NotEq,
    #[token("<")]
    Less,
    #[token(">")]
    Greater,
    #[token("=")]
    Eq,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("\\")]
    Backslash,
    #[token("^")]
    Caret,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(",")]
    Comma,
    #[token(";")]
    Semicolon,
    #[token(":")]
    Colon,
    #[token("?")]
    Question,
    #[token("'")]
    Apostrophe,
    #[token("#")]
    Hash,
    #[token(".")]
    Dot,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(src: &str) -> Vec<(RawToken, String)> {
        let mut lexer = RawToken::lexer(src);
        let mut out = Vec::new();
        while let Some(tok) = lexer.next() {
            out.push((tok.expect("lex failure"), lexer.slice().to_string()));
        }
        out
    }

    #[test]
    fn test_lex_assignment() {
        let toks = lex("A% = 12");
        assert_eq!(toks[0], (RawToken::Ident, "A%".to_string()));
        assert_eq!(toks[1], (RawToken::Whitespace, " ".to_string()));
        assert_eq!(toks[2], (RawToken::Eq, "=".to_string()));
        assert_eq!(toks[4], (RawToken::Integer, "12".to_string()));
    }

    #[test]
    fn test_lex_number_shapes() {
        assert_eq!(lex("1.5")[0].0, RawToken::Float);
        assert_eq!(lex(".5")[0].0, RawToken::Float);
        assert_eq!(lex("2.")[0].0, RawToken::Float);
        assert_eq!(lex("3E4")[0].0, RawToken::FloatExp);
        assert_eq!(lex("3D-4")[0].0, RawToken::FloatExp);
        assert_eq!(lex("42")[0].0, RawToken::Integer);
        assert_eq!(lex("42%")[0].0, RawToken::Integer);
        assert_eq!(lex("1#")[0].0, RawToken::Integer);
        assert_eq!(lex("&HFF")[0].0, RawToken::HexInteger);
        assert_eq!(lex("&777")[0].0, RawToken::OctInteger);
    }

    #[test]
    fn test_lex_relational_operators() {
        let toks = lex("<=>=<><");
        assert_eq!(toks[0].0, RawToken::LessEq);
        assert_eq!(toks[1].0, RawToken::GreaterEq);
        assert_eq!(toks[2].0, RawToken::NotEq);
        assert_eq!(toks[3].0, RawToken::Less);
    }

    #[test]
    fn test_lex_string_and_suffix_ident() {
        let toks = lex(r#"A$ = "Hi, there""#);
        assert_eq!(toks[0], (RawToken::Ident, "A$".to_string()));
        assert_eq!(toks[4], (RawToken::StringLit, r#""Hi, there""#.to_string()));
    }

    #[test]
    fn test_lex_unterminated_string_still_lexes() {
        let toks = lex(r#""open"#);
        assert_eq!(toks[0].0, RawToken::StringLit);
        assert_eq!(toks[0].1, r#""open"#);
    }
}
