//! Textual row conditions such as `variety=Setosa` or `sepallength>=5`.

use crate::error::{AggregateError, AggregateResult};
use crate::table::{Record, Value};
use std::fmt;
use std::str::FromStr;

/// Comparison operator in a condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Operator {
    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "!=",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
        }
    }
}

/// `column <op> literal`.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub column: String,
    pub operator: Operator,
    pub value: Value,
}

impl Condition {
    /// Evaluate against a record. Ordering operators require the record's
    /// value and the literal to be of the same kind.
    pub fn matches(&self, record: &Record) -> AggregateResult<bool> {
        let actual = record.get(&self.column)?;

        if !matches!(self.operator, Operator::Eq | Operator::Ne) && !actual.same_kind(&self.value)
        {
            // Name whichever side is text.
            let text = match actual {
                Value::Text(_) => actual,
                Value::Number(_) => &self.value,
            };
            return Err(AggregateError::NonNumeric {
                column: self.column.clone(),
                value: text.to_string(),
            });
        }

        Ok(match self.operator {
            Operator::Eq => actual == &self.value,
            Operator::Ne => actual != &self.value,
            Operator::Lt => actual < &self.value,
            Operator::Le => actual <= &self.value,
            Operator::Gt => actual > &self.value,
            Operator::Ge => actual >= &self.value,
        })
    }
}

impl FromStr for Condition {
    type Err = AggregateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || AggregateError::InvalidCondition(s.to_string());

        let start = s.find(&['=', '!', '<', '>'][..]).ok_or_else(invalid)?;
        let rest = &s[start..];

        let (operator, width) = if rest.starts_with("==") {
            (Operator::Eq, 2)
        } else if rest.starts_with("!=") {
            (Operator::Ne, 2)
        } else if rest.starts_with("<=") {
            (Operator::Le, 2)
        } else if rest.starts_with(">=") {
            (Operator::Ge, 2)
        } else if rest.starts_with('=') {
            (Operator::Eq, 1)
        } else if rest.starts_with('<') {
            (Operator::Lt, 1)
        } else if rest.starts_with('>') {
            (Operator::Gt, 1)
        } else {
            return Err(invalid());
        };

        let column = s[..start].trim();
        let literal = rest[width..].trim();
        if column.is_empty() || literal.is_empty() {
            return Err(invalid());
        }

        Ok(Self {
            column: column.to_string(),
            operator,
            value: Value::parse_literal(literal),
        })
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.column, self.operator.symbol(), self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iris() -> Record {
        Record::new()
            .with("sepallength", 5.1)
            .with("variety", "Setosa")
    }

    #[test]
    fn test_parse_operators() {
        let cases = [
            ("variety=Setosa", Operator::Eq),
            ("variety == Setosa", Operator::Eq),
            ("variety!=Setosa", Operator::Ne),
            ("sepallength<5", Operator::Lt),
            ("sepallength<=5", Operator::Le),
            ("sepallength>5", Operator::Gt),
            ("sepallength >= 5", Operator::Ge),
        ];

        for (text, expected) in cases {
            let condition: Condition = text.parse().unwrap();
            assert_eq!(condition.operator, expected, "{}", text);
        }
    }

    #[test]
    fn test_parse_literal_kind() {
        let numeric: Condition = "sepallength>=5.5".parse().unwrap();
        assert_eq!(numeric.column, "sepallength");
        assert_eq!(numeric.value, Value::Number(5.5));

        let text: Condition = "variety = Virginica".parse().unwrap();
        assert_eq!(text.value, Value::from("Virginica"));
        assert_eq!(text.to_string(), "variety=Virginica");
    }

    #[test]
    fn test_parse_invalid() {
        for text in ["variety", "=Setosa", "variety=", "variety!Setosa"] {
            assert!(
                matches!(text.parse::<Condition>(), Err(AggregateError::InvalidCondition(_))),
                "{}",
                text
            );
        }
    }

    #[test]
    fn test_matches() {
        let record = iris();
        let check = |text: &str| text.parse::<Condition>().unwrap().matches(&record);

        assert_eq!(check("variety=Setosa"), Ok(true));
        assert_eq!(check("variety!=Setosa"), Ok(false));
        assert_eq!(check("sepallength>5"), Ok(true));
        assert_eq!(check("sepallength<5.1"), Ok(false));
        assert_eq!(check("sepallength<=5.1"), Ok(true));
        // Equality across kinds is simply false.
        assert_eq!(check("variety=5"), Ok(false));
    }

    #[test]
    fn test_matches_errors() {
        let record = iris();
        let ordering_on_text: Condition = "variety>5".parse().unwrap();
        assert!(matches!(
            ordering_on_text.matches(&record),
            Err(AggregateError::NonNumeric { .. })
        ));

        let text_literal: Condition = "sepallength>abc".parse().unwrap();
        assert_eq!(
            text_literal.matches(&record),
            Err(AggregateError::NonNumeric {
                column: "sepallength".to_string(),
                value: "abc".to_string(),
            })
        );

        let missing: Condition = "species=Setosa".parse().unwrap();
        assert_eq!(
            missing.matches(&record),
            Err(AggregateError::UnknownColumn("species".to_string()))
        );
    }
}
