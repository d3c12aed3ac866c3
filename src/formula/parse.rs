//! Parsing of Hill-notation molecular formula strings, e.g. `"C6H12O6"`.

use super::MolecularFormula;
use crate::element::Element;
use crate::error::{Context, ErrorKind, IdentificationError};
use regex::Regex;
use std::str::FromStr;
use std::sync::OnceLock;

fn token_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"([A-Z][a-z]?)(\d*)").unwrap())
}

impl FromStr for MolecularFormula {
    type Err = IdentificationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(IdentificationError::new(
                ErrorKind::InvalidInput,
                "empty formula",
                "a molecular formula string cannot be empty",
                Context::none(),
            ));
        }
        let mut counts = Vec::new();
        let mut consumed = 0usize;
        for capture in token_regex().captures_iter(s) {
            let whole = capture.get(0).unwrap();
            if whole.start() != consumed {
                return Err(unexpected_character(s, consumed));
            }
            consumed = whole.end();
            let symbol = &capture[1];
            let element = Element::by_symbol(symbol).ok_or_else(|| {
                IdentificationError::new(
                    ErrorKind::InvalidInput,
                    "unknown element",
                    format!("`{symbol}` is not a recognised element symbol"),
                    Context::line(s, whole.start(), symbol.len()),
                )
            })?;
            let count: u32 = if capture[2].is_empty() {
                1
            } else {
                capture[2].parse().map_err(|_| {
                    IdentificationError::new(
                        ErrorKind::InvalidInput,
                        "element count too large",
                        format!("`{}` does not fit in a u32", &capture[2]),
                        Context::line(s, whole.start(), whole.len()),
                    )
                })?
            };
            counts.push((element, count));
        }
        if consumed != s.len() {
            return Err(unexpected_character(s, consumed));
        }
        Ok(MolecularFormula::new(counts))
    }
}

fn unexpected_character(s: &str, at: usize) -> IdentificationError {
    IdentificationError::new(
        ErrorKind::InvalidInput,
        "could not parse molecular formula",
        format!("unexpected character at byte offset {at}"),
        Context::line(s, at, 1),
    )
}

/// Parse a molecular formula string such as `"C6H12O6"`. Thin wrapper over `FromStr` for callers
/// that want a free function rather than a trait import.
pub fn parse_formula(s: &str) -> Result<MolecularFormula, IdentificationError> {
    s.parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_glucose() {
        let f: MolecularFormula = "C6H12O6".parse().unwrap();
        assert_eq!(f.hill_notation(), "C6H12O6");
    }

    #[test]
    fn parse_then_render_round_trips() {
        let f: MolecularFormula = "C6H12O6".parse().unwrap();
        let rendered = f.to_string();
        let reparsed: MolecularFormula = rendered.parse().unwrap();
        assert_eq!(f, reparsed);
    }

    #[test]
    fn rejects_unknown_element() {
        let err = "C6Xx2O6".parse::<MolecularFormula>().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn implicit_count_of_one() {
        let f: MolecularFormula = "NaCl".parse().unwrap();
        assert_eq!(f.count(Element::Na), 1);
        assert_eq!(f.count(Element::Cl), 1);
    }
}
