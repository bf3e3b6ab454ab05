//! Comparator and sort-order tokens, resolved through fixed lookup tables.

use crate::config::FieldDescriptor;
use crate::error::AppError;
use serde_json::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Comparator {
    Eq,
    Gt,
    Lt,
    Gte,
    Lte,
    Ne,
}

const COMPARATORS: &[(&str, Comparator, &str)] = &[
    ("eq", Comparator::Eq, "="),
    ("gt", Comparator::Gt, ">"),
    ("lt", Comparator::Lt, "<"),
    ("gte", Comparator::Gte, ">="),
    ("lte", Comparator::Lte, "<="),
    ("ne", Comparator::Ne, "<>"),
];

impl Comparator {
    pub fn parse(token: &str) -> Result<Self, AppError> {
        COMPARATORS
            .iter()
            .find(|(t, _, _)| *t == token)
            .map(|(_, c, _)| *c)
            .ok_or_else(|| AppError::InvalidArgument(format!("Invalid comparison operator: {}", token)))
    }

    pub fn sql_operator(self) -> &'static str {
        COMPARATORS
            .iter()
            .find(|(_, c, _)| *c == self)
            .map(|(_, _, op)| *op)
            .unwrap_or("=")
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn parse(token: &str) -> Result<Self, AppError> {
        match token {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(AppError::InvalidArgument(format!("Invalid order: {}", other))),
        }
    }

    /// Missing token means ascending.
    pub fn parse_opt(token: Option<&str>) -> Result<Self, AppError> {
        token.map(Self::parse).unwrap_or(Ok(SortOrder::Asc))
    }

    pub fn sql(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// One `(field, comparator, value)` predicate, value already coerced to the field type.
#[derive(Clone, Debug)]
pub struct Condition<'a> {
    pub field: &'a FieldDescriptor,
    pub comparator: Comparator,
    pub value: Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_all_comparator_tokens() {
        let expected = [("eq", "="), ("gt", ">"), ("lt", "<"), ("gte", ">="), ("lte", "<="), ("ne", "<>")];
        for (token, op) in expected {
            assert_eq!(Comparator::parse(token).unwrap().sql_operator(), op);
        }
    }

    #[test]
    fn unknown_tokens_are_invalid_arguments() {
        assert!(matches!(Comparator::parse("like"), Err(AppError::InvalidArgument(_))));
        assert!(matches!(Comparator::parse("EQ"), Err(AppError::InvalidArgument(_))));
        assert!(matches!(SortOrder::parse("up"), Err(AppError::InvalidArgument(_))));
    }

    #[test]
    fn order_defaults_to_ascending() {
        assert_eq!(SortOrder::parse_opt(None).unwrap(), SortOrder::Asc);
        assert_eq!(SortOrder::parse_opt(Some("desc")).unwrap().sql(), "DESC");
    }
}
