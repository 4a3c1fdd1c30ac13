//! Cruncher corpus: statements, literals, and listing output.

use pretty_assertions::assert_eq;

use gwbasic_tokenizer::{
    tokens, TokenizeError, Tokenizer, TOK_DOUBLE, TOK_EOL, TOK_FUNC_PREFIX, TOK_INT16, TOK_SINGLE,
};

fn crunch(src: &str) -> Vec<u8> {
    Tokenizer::new().crunch(src).unwrap()
}

#[test]
fn test_statement_keywords_become_single_bytes() {
    let bytes = crunch("FOR I = 1 TO 10");
    assert_eq!(bytes[0], tokens::keyword_byte("FOR").unwrap());
    assert!(bytes.contains(&tokens::keyword_byte("TO").unwrap()));
    assert_eq!(*bytes.last().unwrap(), TOK_EOL);
}

#[test]
fn test_operators_tokenize() {
    let bytes = crunch("1 <= 2");
    assert!(bytes.contains(&tokens::keyword_byte("<=").unwrap()));
    let bytes = crunch("A AND B");
    assert!(bytes.contains(&tokens::keyword_byte("AND").unwrap()));
}

#[test]
fn test_identifiers_uppercase_and_keep_suffix() {
    let bytes = crunch("total$ = other%");
    let text: Vec<u8> = bytes.clone();
    let as_str = String::from_utf8_lossy(&text[..6]).to_string();
    assert_eq!(as_str, "TOTAL$");
    assert!(bytes.windows(6).any(|w| w == b"OTHER%"));
}

#[test]
fn test_integer_encoding() {
    let bytes = crunch("12345");
    assert_eq!(bytes[0], TOK_INT16);
    assert_eq!(i16::from_le_bytes([bytes[1], bytes[2]]), 12345);
}

#[test]
fn test_single_and_double_encoding() {
    let bytes = crunch("2.5");
    assert_eq!(bytes[0], TOK_SINGLE);
    let mut le = [0u8; 4];
    le.copy_from_slice(&bytes[1..5]);
    assert_eq!(f32::from_le_bytes(le), 2.5);

    let bytes = crunch("2.5#");
    assert_eq!(bytes[0], TOK_DOUBLE);
    let mut le = [0u8; 8];
    le.copy_from_slice(&bytes[1..9]);
    assert_eq!(f64::from_le_bytes(le), 2.5);

    // A D exponent forces double precision.
    let bytes = crunch("1D2");
    assert_eq!(bytes[0], TOK_DOUBLE);
}

#[test]
fn test_integer_suffix_range_check() {
    assert_eq!(
        Tokenizer::new().crunch("40000%"),
        Err(TokenizeError::NumberOutOfRange)
    );
}

#[test]
fn test_function_names_become_two_byte_tokens() {
    for name in ["LEFT$", "MID$", "CHR$", "RND", "CINT"] {
        let bytes = crunch(&format!("{}(1)", name));
        assert_eq!(bytes[0], TOK_FUNC_PREFIX, "prefix for {}", name);
        assert_eq!(
            bytes[1],
            tokens::function_code(name).unwrap(),
            "code for {}",
            name
        );
    }
}

#[test]
fn test_strings_survive_verbatim() {
    let bytes = crunch(r#"PRINT "Mixed Case & Specials!""#);
    let text = String::from_utf8_lossy(&bytes);
    assert!(text.contains("Mixed Case & Specials!"));
}

#[test]
fn test_question_mark_is_print() {
    let bytes = crunch("? 1");
    assert_eq!(bytes[0], tokens::keyword_byte("PRINT").unwrap());
}

#[test]
fn test_apostrophe_comment_kept() {
    let bytes = crunch("X = 1 ' trailing note");
    let text = String::from_utf8_lossy(&bytes);
    assert!(text.contains("' trailing note"));
}

#[test]
fn test_non_ascii_rejected() {
    assert_eq!(
        Tokenizer::new().crunch("PRINT \u{00e9}"),
        Err(TokenizeError::NonAsciiSource)
    );
}

#[test]
fn test_line_too_long() {
    let long = format!("A$ = \"{}\"", "X".repeat(300));
    assert_eq!(Tokenizer::new().crunch(&long), Err(TokenizeError::LineTooLong));
}

#[test]
fn test_listing_corpus() {
    let tokenizer = Tokenizer::new();
    for (src, listed) in [
        ("PRINT A + 2", "PRINT A + 2"),
        ("FOR I = 1 TO 10 STEP 2", "FOR I = 1 TO 10 STEP 2"),
        ("IF X > 3 THEN 100", "IF X > 3 THEN 100"),
        (r#"PRINT LEFT$("HI", 1)"#, r#"PRINT LEFT$("HI", 1)"#),
        ("X = 1 AND 2", "X = 1 AND 2"),
    ] {
        let bytes = tokenizer.crunch(src).unwrap();
        assert_eq!(tokenizer.expand(&bytes), listed, "listing of {:?}", src);
    }
}

#[test]
fn test_program_line_parsing() {
    let tokenizer = Tokenizer::new();
    let (number, bytes) = tokenizer.parse_program_line("120 PRINT X").unwrap();
    assert_eq!(number, 120);
    assert_eq!(bytes[0], tokens::keyword_byte("PRINT").unwrap());

    assert_eq!(
        tokenizer.parse_program_line("PRINT X"),
        Err(TokenizeError::MissingLineNumber)
    );
    assert_eq!(
        tokenizer.parse_program_line("65535 END"),
        Err(TokenizeError::LineNumberOutOfRange(65535))
    );
}
