//! Where clause parsing and evaluation.
//!
//! The supported language is a flat boolean expression over field comparisons:
//!
//! ```text
//! clause     := conjunction (OR conjunction)*
//! conjunction:= condition (AND condition)*
//! condition  := field op literal | field IS [NOT] NULL
//! op         := = | <> | != | < | <= | > | >=
//! literal    := number | 'text' | TRUE | FALSE
//! ```
//!
//! Keywords and field names are case-insensitive; field names may be double-quoted.
//! Text literals use `''` to escape a quote. Clauses are parsed once, against the
//! collection schema, when a cursor is opened.

use std::cmp::Ordering;
use std::iter::Peekable;
use std::str::CharIndices;

use geoscan_core_common::{FieldValue, ProviderError, ProviderResult, Record, Schema};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    fn test(self, ordering: Ordering) -> bool {
        match self {
            CompareOp::Eq => ordering == Ordering::Equal,
            CompareOp::Ne => ordering != Ordering::Equal,
            CompareOp::Lt => ordering == Ordering::Less,
            CompareOp::Le => ordering != Ordering::Greater,
            CompareOp::Gt => ordering == Ordering::Greater,
            CompareOp::Ge => ordering != Ordering::Less,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Number(f64),
    Text(String),
    Op(CompareOp),
    And,
    Or,
    Is,
    Not,
    Null,
    Boolean(bool),
}

#[derive(Debug, Clone, PartialEq)]
enum Literal {
    Number(f64),
    Text(String),
    Boolean(bool),
}

#[derive(Debug, Clone, PartialEq)]
enum FieldRef {
    ObjectId,
    Attribute(String),
}

#[derive(Debug, Clone, PartialEq)]
enum Condition {
    Compare {
        field: FieldRef,
        op: CompareOp,
        value: Literal,
    },
    IsNull {
        field: FieldRef,
        negated: bool,
    },
}

/// A parsed where clause, held as a disjunction of conjunctions.
#[derive(Debug, Clone, PartialEq)]
pub struct WhereClause {
    any_of: Vec<Vec<Condition>>,
}

fn syntax_error(clause: &str, message: impl Into<String>) -> ProviderError {
    ProviderError::QuerySyntax {
        clause: clause.to_string(),
        message: message.into(),
    }
}

fn tokenize(clause: &str) -> ProviderResult<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars: Peekable<CharIndices<'_>> = clause.char_indices().peekable();

    while let Some(&(start, c)) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            },
            '\'' => {
                chars.next();
                let mut text = String::new();
                loop {
                    match chars.next() {
                        Some((_, '\'')) => {
                            if matches!(chars.peek(), Some((_, '\''))) {
                                chars.next();
                                text.push('\'');
                            } else {
                                break;
                            }
                        },
                        Some((_, ch)) => text.push(ch),
                        None => {
                            return Err(syntax_error(
                                clause,
                                format!("unterminated string starting at offset {start}"),
                            ));
                        },
                    }
                }
                tokens.push(Token::Text(text));
            },
            '"' => {
                chars.next();
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some((_, '"')) => break,
                        Some((_, ch)) => name.push(ch),
                        None => {
                            return Err(syntax_error(
                                clause,
                                format!("unterminated field name starting at offset {start}"),
                            ));
                        },
                    }
                }
                tokens.push(Token::Ident(name));
            },
            '=' => {
                chars.next();
                tokens.push(Token::Op(CompareOp::Eq));
            },
            '<' => {
                chars.next();
                let op = match chars.peek() {
                    Some((_, '=')) => CompareOp::Le,
                    Some((_, '>')) => CompareOp::Ne,
                    _ => CompareOp::Lt,
                };
                if op != CompareOp::Lt {
                    chars.next();
                }
                tokens.push(Token::Op(op));
            },
            '>' => {
                chars.next();
                if matches!(chars.peek(), Some((_, '='))) {
                    chars.next();
                    tokens.push(Token::Op(CompareOp::Ge));
                } else {
                    tokens.push(Token::Op(CompareOp::Gt));
                }
            },
            '!' => {
                chars.next();
                if matches!(chars.peek(), Some((_, '='))) {
                    chars.next();
                    tokens.push(Token::Op(CompareOp::Ne));
                } else {
                    return Err(syntax_error(clause, format!("expected '=' after '!' at offset {start}")));
                }
            },
            c if c.is_ascii_digit() || c == '-' || c == '+' || c == '.' => {
                let mut end = start;
                while let Some(&(idx, ch)) = chars.peek() {
                    let sign_after_exponent =
                        (ch == '-' || ch == '+') && clause[start..idx].ends_with(['e', 'E']);
                    if ch.is_ascii_digit()
                        || ch == '.'
                        || ch == 'e'
                        || ch == 'E'
                        || (idx == start && (ch == '-' || ch == '+'))
                        || sign_after_exponent
                    {
                        end = idx + ch.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                let text = &clause[start..end];
                let number = text
                    .parse::<f64>()
                    .map_err(|_| syntax_error(clause, format!("invalid number '{text}'")))?;
                tokens.push(Token::Number(number));
            },
            c if c.is_alphabetic() || c == '_' => {
                let mut end = start;
                while let Some(&(idx, ch)) = chars.peek() {
                    if ch.is_alphanumeric() || ch == '_' {
                        end = idx + ch.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                let word = &clause[start..end];
                tokens.push(match word.to_ascii_uppercase().as_str() {
                    "AND" => Token::And,
                    "OR" => Token::Or,
                    "IS" => Token::Is,
                    "NOT" => Token::Not,
                    "NULL" => Token::Null,
                    "TRUE" => Token::Boolean(true),
                    "FALSE" => Token::Boolean(false),
                    _ => Token::Ident(word.to_string()),
                });
            },
            other => {
                return Err(syntax_error(
                    clause,
                    format!("unexpected character '{other}' at offset {start}"),
                ));
            },
        }
    }

    Ok(tokens)
}

struct Parser<'a> {
    clause: &'a str,
    schema: &'a Schema,
    tokens: std::vec::IntoIter<Token>,
    peeked: Option<Token>,
}

impl Parser<'_> {
    fn peek(&mut self) -> Option<&Token> {
        if self.peeked.is_none() {
            self.peeked = self.tokens.next();
        }
        self.peeked.as_ref()
    }

    fn advance(&mut self) -> Option<Token> {
        self.peeked.take().or_else(|| self.tokens.next())
    }

    fn error(&self, message: impl Into<String>) -> ProviderError {
        syntax_error(self.clause, message)
    }

    fn disjunction(&mut self) -> ProviderResult<Vec<Vec<Condition>>> {
        let mut any_of = vec![self.conjunction()?];
        while self.peek() == Some(&Token::Or) {
            self.advance();
            any_of.push(self.conjunction()?);
        }
        Ok(any_of)
    }

    fn conjunction(&mut self) -> ProviderResult<Vec<Condition>> {
        let mut all_of = vec![self.condition()?];
        while self.peek() == Some(&Token::And) {
            self.advance();
            all_of.push(self.condition()?);
        }
        Ok(all_of)
    }

    fn field(&self, name: &str) -> ProviderResult<FieldRef> {
        let field = self
            .schema
            .find_field(name)
            .and_then(|index| self.schema.field(index))
            .ok_or_else(|| self.error(format!("unknown field '{name}'")))?;

        if field.name == self.schema.oid_field() {
            Ok(FieldRef::ObjectId)
        } else if Some(field.name.as_str()) == self.schema.shape_field() {
            Err(self.error(format!("geometry field '{name}' cannot be compared")))
        } else {
            Ok(FieldRef::Attribute(field.name.clone()))
        }
    }

    fn condition(&mut self) -> ProviderResult<Condition> {
        let field = match self.advance() {
            Some(Token::Ident(name)) => self.field(&name)?,
            Some(other) => return Err(self.error(format!("expected a field name, found {other:?}"))),
            None => return Err(self.error("expected a field name, found end of clause")),
        };

        match self.advance() {
            Some(Token::Is) => {
                let negated = self.peek() == Some(&Token::Not);
                if negated {
                    self.advance();
                }
                match self.advance() {
                    Some(Token::Null) => Ok(Condition::IsNull { field, negated }),
                    _ => Err(self.error("expected NULL after IS")),
                }
            },
            Some(Token::Op(op)) => {
                let value = match self.advance() {
                    Some(Token::Number(n)) => Literal::Number(n),
                    Some(Token::Text(t)) => Literal::Text(t),
                    Some(Token::Boolean(b)) => Literal::Boolean(b),
                    Some(other) => return Err(self.error(format!("expected a literal, found {other:?}"))),
                    None => return Err(self.error("expected a literal, found end of clause")),
                };
                Ok(Condition::Compare { field, op, value })
            },
            Some(other) => Err(self.error(format!("expected an operator, found {other:?}"))),
            None => Err(self.error("expected an operator, found end of clause")),
        }
    }
}

impl WhereClause {
    /// Parses `clause` against `schema`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::QuerySyntax`] for malformed text, unknown fields and
    /// comparisons on the geometry field.
    pub fn parse(clause: &str, schema: &Schema) -> ProviderResult<Self> {
        let tokens = tokenize(clause)?;
        if tokens.is_empty() {
            return Err(syntax_error(clause, "empty clause"));
        }

        let mut parser = Parser {
            clause,
            schema,
            tokens: tokens.into_iter(),
            peeked: None,
        };
        let any_of = parser.disjunction()?;
        if let Some(extra) = parser.advance() {
            return Err(parser.error(format!("unexpected {extra:?} after condition")));
        }
        Ok(Self { any_of })
    }

    /// Returns `true` if `record` satisfies the clause.
    #[must_use]
    pub fn matches(&self, record: &Record) -> bool {
        self.any_of
            .iter()
            .any(|all_of| all_of.iter().all(|condition| condition.matches(record)))
    }
}

impl Condition {
    fn matches(&self, record: &Record) -> bool {
        match self {
            Condition::IsNull { field, negated } => field.value(record).is_none() != *negated,
            Condition::Compare { field, op, value } => field
                .value(record)
                .and_then(|actual| compare(&actual, value))
                .is_some_and(|ordering| op.test(ordering)),
        }
    }
}

impl FieldRef {
    fn value(&self, record: &Record) -> Option<FieldValue> {
        let value = match self {
            FieldRef::ObjectId => record.oid.map(FieldValue::Integer),
            FieldRef::Attribute(name) => record.value(name).cloned(),
        };
        value.filter(|v| !v.is_null())
    }
}

fn compare(actual: &FieldValue, literal: &Literal) -> Option<Ordering> {
    match (actual, literal) {
        (FieldValue::Text(a), Literal::Text(b)) => Some(a.as_str().cmp(b.as_str())),
        (FieldValue::Boolean(a), Literal::Boolean(b)) => Some(a.cmp(b)),
        (actual, Literal::Number(b)) => actual.as_f64()?.partial_cmp(b),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geoscan_core_common::{Field, FieldType, Shape};

    fn schema() -> Schema {
        Schema::feature_class("OBJECTID", "Shape")
            .with_field(Field::new("name", FieldType::Text))
            .with_field(Field::new("depth", FieldType::Double))
            .with_field(Field::new("active", FieldType::Boolean))
    }

    fn record(oid: i64, name: Option<&str>, depth: f64, active: bool) -> Record {
        let record = Record::new(oid, Some(Shape::point(0.0, 0.0)))
            .with_value("depth", FieldValue::Double(depth))
            .with_value("active", FieldValue::Boolean(active));
        match name {
            Some(name) => record.with_value("name", FieldValue::Text(name.to_string())),
            None => record.with_value("name", FieldValue::Null),
        }
    }

    fn matches(clause: &str, record: &Record) -> bool {
        WhereClause::parse(clause, &schema()).unwrap().matches(record)
    }

    #[test]
    fn test_comparisons() {
        let well = record(7, Some("north"), 12.5, true);
        assert!(matches("depth > 10", &well));
        assert!(matches("depth >= 12.5", &well));
        assert!(!matches("depth < 12.5", &well));
        assert!(matches("depth <= 12.5", &well));
        assert!(matches("name = 'north'", &well));
        assert!(matches("name <> 'south'", &well));
        assert!(matches("name != 'south'", &well));
        assert!(matches("active = TRUE", &well));
        assert!(matches("OBJECTID = 7", &well));
    }

    #[test]
    fn test_and_binds_tighter_than_or() {
        let well = record(1, Some("north"), 5.0, false);
        // true OR (false AND false)
        assert!(matches("name = 'north' OR depth > 10 AND active = TRUE", &well));
        // (false AND true) OR false
        assert!(!matches("depth > 10 AND name = 'north' OR active = TRUE", &well));
    }

    #[test]
    fn test_null_handling() {
        let unnamed = record(1, None, 1.0, true);
        assert!(matches("name IS NULL", &unnamed));
        assert!(!matches("name IS NOT NULL", &unnamed));
        assert!(!matches("name = 'x'", &unnamed));
        assert!(!matches("name <> 'x'", &unnamed));
    }

    #[test]
    fn test_keywords_and_fields_are_case_insensitive() {
        let well = record(1, Some("a"), 3.0, true);
        assert!(matches("DEPTH = 3 and \"Name\" = 'a'", &well));
        assert!(matches("objectid is not null", &well));
    }

    #[test]
    fn test_escaped_quote() {
        let well = record(1, Some("o'hara"), 0.0, true);
        assert!(matches("name = 'o''hara'", &well));
    }

    #[test]
    fn test_negative_and_exponent_numbers() {
        let well = record(1, None, -2.5, true);
        assert!(matches("depth = -2.5", &well));
        assert!(matches("depth > -1e1", &well));
    }

    #[test]
    fn test_type_mismatch_never_matches() {
        let well = record(1, Some("12"), 12.0, true);
        assert!(!matches("name = 12", &well));
        assert!(!matches("depth = '12'", &well));
    }

    #[test]
    fn test_syntax_errors() {
        let schema = schema();
        for clause in [
            "missing = 1",
            "name = 'open",
            "depth >",
            "depth 5",
            "depth = 5 AND",
            "depth = 5 depth = 6",
            "name IS 5",
            "Shape = 1",
            "depth # 5",
            "   ",
        ] {
            let err = WhereClause::parse(clause, &schema).unwrap_err();
            assert!(
                matches!(err, ProviderError::QuerySyntax { clause: ref c, .. } if c == clause),
                "{clause}: {err}"
            );
        }
    }
}
