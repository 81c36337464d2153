//! Structured OData `$filter` expressions.
//!
//! Values are always rendered as quoted string literals with embedded quotes
//! doubled, so user input cannot break out of a comparison.

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq { field: String, value: String },
    Contains { field: String, value: String },
    And(Vec<Filter>),
    Or(Vec<Filter>),
}

/// Quote a value as an OData string literal.
pub fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn contains(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Contains {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn and(self, other: Filter) -> Self {
        match self {
            Self::And(mut terms) => {
                terms.push(other);
                Self::And(terms)
            }
            first => Self::And(vec![first, other]),
        }
    }

    pub fn or(self, other: Filter) -> Self {
        match self {
            Self::Or(mut terms) => {
                terms.push(other);
                Self::Or(terms)
            }
            first => Self::Or(vec![first, other]),
        }
    }

    /// Conjunction of every filter yielded, or `None` when there are none.
    pub fn all<I>(filters: I) -> Option<Filter>
    where
        I: IntoIterator<Item = Filter>,
    {
        filters.into_iter().reduce(Filter::and)
    }

    fn is_compound(&self) -> bool {
        matches!(self, Self::And(terms) | Self::Or(terms) if terms.len() > 1)
    }

    fn write_terms(f: &mut fmt::Formatter<'_>, terms: &[Filter], op: &str) -> fmt::Result {
        for (i, term) in terms.iter().enumerate() {
            if i > 0 {
                write!(f, " {op} ")?;
            }
            if term.is_compound() {
                write!(f, "({term})")?;
            } else {
                write!(f, "{term}")?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Eq { field, value } => write!(f, "{field} eq {}", quote(value)),
            Self::Contains { field, value } => write!(f, "contains({field},{})", quote(value)),
            Self::And(terms) => Self::write_terms(f, terms, "and"),
            Self::Or(terms) => Self::write_terms(f, terms, "or"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_are_doubled() {
        assert_eq!(quote("O'Reilly"), "'O''Reilly'");
        assert_eq!(
            Filter::eq("fields/Title", "x' or 1 eq 1 or 'a").to_string(),
            "fields/Title eq 'x'' or 1 eq 1 or ''a'"
        );
    }

    #[test]
    fn nested_or_is_parenthesised_inside_and() {
        let search = Filter::contains("fields/Title", "mac")
            .or(Filter::contains("fields/Description", "mac"));
        let filter = search.and(Filter::eq("fields/Category", "Electronics"));

        assert_eq!(
            filter.to_string(),
            "(contains(fields/Title,'mac') or contains(fields/Description,'mac')) \
             and fields/Category eq 'Electronics'"
        );
    }

    #[test]
    fn all_of_nothing_is_none() {
        assert!(Filter::all(Vec::new()).is_none());
        let single = Filter::all(vec![Filter::eq("fields/Status", "Sold")]).unwrap();
        assert_eq!(single.to_string(), "fields/Status eq 'Sold'");
    }

    #[test]
    fn and_chains_stay_flat() {
        let filter = Filter::eq("a", "1")
            .and(Filter::eq("b", "2"))
            .and(Filter::eq("c", "3"));
        assert_eq!(filter.to_string(), "a eq '1' and b eq '2' and c eq '3'");
    }
}
