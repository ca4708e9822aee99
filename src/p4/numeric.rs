use std::fmt;
use std::str::FromStr;

use super::SyntaxError;

/// Numeric condition on a use count, e.g. `3`, `>=2`, `5..6` or `3,5..6,9`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NumericExpr {
    Exact(i64),
    Above(i64),
    AboveEq(i64),
    Below(i64),
    BelowEq(i64),
    /// Inclusive on both ends.
    Range(i64, i64),
    /// Satisfied when any member is.
    List(Vec<NumericExpr>),
}

impl NumericExpr {
    pub fn evaluate(&self, count: i64) -> bool {
        match self {
            NumericExpr::Exact(n) => count == *n,
            NumericExpr::Above(n) => count > *n,
            NumericExpr::AboveEq(n) => count >= *n,
            NumericExpr::Below(n) => count < *n,
            NumericExpr::BelowEq(n) => count <= *n,
            NumericExpr::Range(lo, hi) => (*lo..=*hi).contains(&count),
            NumericExpr::List(terms) => terms.iter().any(|t| t.evaluate(count)),
        }
    }
}

impl FromStr for NumericExpr {
    type Err = SyntaxError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let mut terms = text
            .split(',')
            .map(parse_term)
            .collect::<Result<Vec<_>, _>>()?;

        if terms.len() == 1 {
            Ok(terms.remove(0))
        } else {
            Ok(NumericExpr::List(terms))
        }
    }
}

fn parse_term(term: &str) -> Result<NumericExpr, SyntaxError> {
    if let Some((lo, hi)) = term.split_once("..") {
        return Ok(NumericExpr::Range(parse_number(lo)?, parse_number(hi)?));
    }

    // Two-character operators must be tried before their one-character prefixes.
    if let Some(rest) = term.strip_prefix(">=") {
        Ok(NumericExpr::AboveEq(parse_number(rest)?))
    } else if let Some(rest) = term.strip_prefix("<=") {
        Ok(NumericExpr::BelowEq(parse_number(rest)?))
    } else if let Some(rest) = term.strip_prefix('>') {
        Ok(NumericExpr::Above(parse_number(rest)?))
    } else if let Some(rest) = term.strip_prefix('<') {
        Ok(NumericExpr::Below(parse_number(rest)?))
    } else {
        Ok(NumericExpr::Exact(parse_number(term)?))
    }
}

fn parse_number(digits: &str) -> Result<i64, SyntaxError> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(SyntaxError::InvalidNumber(digits.to_string()));
    }
    digits
        .parse()
        .map_err(|_| SyntaxError::InvalidNumber(digits.to_string()))
}

impl fmt::Display for NumericExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumericExpr::Exact(n) => write!(f, "{n}"),
            NumericExpr::Above(n) => write!(f, ">{n}"),
            NumericExpr::AboveEq(n) => write!(f, ">={n}"),
            NumericExpr::Below(n) => write!(f, "<{n}"),
            NumericExpr::BelowEq(n) => write!(f, "<={n}"),
            NumericExpr::Range(lo, hi) => write!(f, "{lo}..{hi}"),
            NumericExpr::List(terms) => {
                for (i, term) in terms.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{term}")?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("7", NumericExpr::Exact(7))]
    #[case(">3", NumericExpr::Above(3))]
    #[case(">=3", NumericExpr::AboveEq(3))]
    #[case("<3", NumericExpr::Below(3))]
    #[case("<=3", NumericExpr::BelowEq(3))]
    #[case("5..6", NumericExpr::Range(5, 6))]
    #[case("3,5..6,9", NumericExpr::List(vec![
        NumericExpr::Exact(3),
        NumericExpr::Range(5, 6),
        NumericExpr::Exact(9),
    ]))]
    fn parse_and_render(#[case] text: &str, #[case] expected: NumericExpr) {
        let parsed: NumericExpr = text.parse().unwrap();
        assert_eq!(parsed, expected);
        assert_eq!(parsed.to_string(), text);
    }

    #[rstest]
    #[case(9, true)]
    #[case(4, false)]
    #[case(3, true)]
    #[case(5, true)]
    #[case(6, true)]
    #[case(7, false)]
    fn list_membership(#[case] count: i64, #[case] expected: bool) {
        let expr: NumericExpr = "3,5..6,9".parse().unwrap();
        assert_eq!(expr.evaluate(count), expected);
    }

    #[rstest]
    #[case(">2", 2, false)]
    #[case(">2", 3, true)]
    #[case(">=2", 2, true)]
    #[case("<2", 2, false)]
    #[case("<=2", 2, true)]
    #[case("0", 0, true)]
    fn comparison_bounds(#[case] text: &str, #[case] count: i64, #[case] expected: bool) {
        let expr: NumericExpr = text.parse().unwrap();
        assert_eq!(expr.evaluate(count), expected);
    }

    #[test]
    fn reversed_range_matches_nothing() {
        let expr = NumericExpr::Range(6, 5);
        assert!(!expr.evaluate(5));
        assert!(!expr.evaluate(6));
    }

    #[rstest]
    #[case("")]
    #[case("a")]
    #[case("3,")]
    #[case("..4")]
    #[case("=>3")]
    #[case("99999999999999999999")]
    fn invalid_expressions(#[case] text: &str) {
        assert!(matches!(
            text.parse::<NumericExpr>(),
            Err(SyntaxError::InvalidNumber(_))
        ));
    }
}
