//! Boolean expressions for condition nodes
//!
//! A deliberately small grammar. Nothing here can call functions, touch the
//! filesystem or reach anything outside the values it is handed.
//!
//! ```text
//! expr    := or
//! or      := and (("||" | "or") and)*
//! and     := not (("&&" | "and") not)*
//! not     := ("!" | "not") not | compare
//! compare := unary (("==" | "!=" | "<" | "<=" | ">" | ">=") unary)*
//! unary   := "-" unary | primary
//! primary := number | string | true | false | null
//!          | identifier | "{" key "}" | "(" expr ")"
//! ```
//!
//! Identifiers and `{key}` references both read from the context; a reference
//! to a missing key is an error. Placeholders inside string literals are
//! substituted like prompt templates. Comparisons chain (`1 < x < 3`) and
//! ordering is only defined between two numbers or two strings. Nesting of
//! parentheses and prefix operators is limited to [`MAX_DEPTH`] levels.

use contentcore::{template, Value};
use std::cmp::Ordering;
use std::collections::HashMap;
use thiserror::Error;

/// Deepest nesting of parentheses, `not` and unary `-` the parser accepts
pub const MAX_DEPTH: usize = 64;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExpressionError {
    #[error("Empty expression")]
    Empty,

    #[error("Unexpected character '{ch}' at offset {offset}")]
    UnexpectedChar { ch: char, offset: usize },

    #[error("Unterminated {what} starting at offset {offset}")]
    Unterminated { what: &'static str, offset: usize },

    #[error("Unexpected {found} at offset {offset}")]
    UnexpectedToken { found: String, offset: usize },

    #[error("Unexpected end of expression")]
    UnexpectedEnd,

    #[error("Expression nested deeper than {limit} levels")]
    TooDeep { limit: usize },

    #[error("Unknown variable: {0}")]
    UnknownVariable(String),

    #[error("Unsupported operand types for {op}: {left} and {right}")]
    TypeMismatch {
        op: &'static str,
        left: &'static str,
        right: &'static str,
    },

    #[error("Bad operand type for unary {op}: {operand}")]
    BadOperand {
        op: &'static str,
        operand: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Str(String),
    Ident(String),
    Var(String),
    True,
    False,
    Null,
    And,
    Or,
    Not,
    Minus,
    Cmp(CmpOp),
    LParen,
    RParen,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Number(n) => format!("number {}", n),
            Token::Str(s) => format!("string \"{}\"", s),
            Token::Ident(name) => format!("identifier '{}'", name),
            Token::Var(key) => format!("'{{{}}}'", key),
            Token::True => "'true'".to_string(),
            Token::False => "'false'".to_string(),
            Token::Null => "'null'".to_string(),
            Token::And => "'and'".to_string(),
            Token::Or => "'or'".to_string(),
            Token::Not => "'not'".to_string(),
            Token::Minus => "'-'".to_string(),
            Token::Cmp(op) => format!("'{}'", op.symbol()),
            Token::LParen => "'('".to_string(),
            Token::RParen => "')'".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    fn symbol(&self) -> &'static str {
        match self {
            CmpOp::Eq => "==",
            CmpOp::Ne => "!=",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
        }
    }
}

/// Parsed expression, ready to evaluate against any context
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    root: Expr,
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Literal(Value),
    Text(String),
    Var(String),
    Not(Box<Expr>),
    Neg(Box<Expr>),
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Compare(Box<Expr>, Vec<(CmpOp, Expr)>),
}

impl Expression {
    pub fn parse(source: &str) -> Result<Self, ExpressionError> {
        let tokens = tokenize(source)?;
        if tokens.is_empty() {
            return Err(ExpressionError::Empty);
        }

        let mut parser = Parser {
            tokens,
            pos: 0,
            depth: 0,
        };
        let root = parser.or()?;
        if let Some((token, offset)) = parser.tokens.get(parser.pos) {
            return Err(ExpressionError::UnexpectedToken {
                found: token.describe(),
                offset: *offset,
            });
        }
        Ok(Self { root })
    }

    /// Evaluate to a value. Boolean operators always produce booleans.
    pub fn evaluate(&self, vars: &HashMap<String, Value>) -> Result<Value, ExpressionError> {
        eval(&self.root, vars)
    }

    pub fn is_true(&self, vars: &HashMap<String, Value>) -> Result<bool, ExpressionError> {
        Ok(self.evaluate(vars)?.is_truthy())
    }
}

fn tokenize(source: &str) -> Result<Vec<(Token, usize)>, ExpressionError> {
    let mut tokens = Vec::new();
    let mut chars = source.char_indices().peekable();

    while let Some(&(offset, ch)) = chars.peek() {
        if ch.is_whitespace() {
            chars.next();
            continue;
        }

        let token = match ch {
            '(' => {
                chars.next();
                Token::LParen
            }
            ')' => {
                chars.next();
                Token::RParen
            }
            '-' => {
                chars.next();
                Token::Minus
            }
            '=' | '!' | '<' | '>' => {
                chars.next();
                let followed_by_eq = matches!(chars.peek(), Some((_, '=')));
                if followed_by_eq {
                    chars.next();
                }
                match (ch, followed_by_eq) {
                    ('=', true) => Token::Cmp(CmpOp::Eq),
                    ('!', true) => Token::Cmp(CmpOp::Ne),
                    ('<', true) => Token::Cmp(CmpOp::Le),
                    ('>', true) => Token::Cmp(CmpOp::Ge),
                    ('<', false) => Token::Cmp(CmpOp::Lt),
                    ('>', false) => Token::Cmp(CmpOp::Gt),
                    ('!', false) => Token::Not,
                    _ => return Err(ExpressionError::UnexpectedChar { ch, offset }),
                }
            }
            '&' | '|' => {
                chars.next();
                match chars.next() {
                    Some((_, next)) if next == ch => {
                        if ch == '&' {
                            Token::And
                        } else {
                            Token::Or
                        }
                    }
                    _ => return Err(ExpressionError::UnexpectedChar { ch, offset }),
                }
            }
            '"' | '\'' => {
                chars.next();
                let mut text = String::new();
                let mut closed = false;
                while let Some((_, c)) = chars.next() {
                    match c {
                        '\\' => match chars.next() {
                            Some((_, 'n')) => text.push('\n'),
                            Some((_, 't')) => text.push('\t'),
                            Some((_, escaped)) => text.push(escaped),
                            None => break,
                        },
                        c if c == ch => {
                            closed = true;
                            break;
                        }
                        c => text.push(c),
                    }
                }
                if !closed {
                    return Err(ExpressionError::Unterminated {
                        what: "string",
                        offset,
                    });
                }
                Token::Str(text)
            }
            '{' => {
                chars.next();
                let mut key = String::new();
                let mut closed = false;
                for (_, c) in chars.by_ref() {
                    if c == '}' {
                        closed = true;
                        break;
                    }
                    key.push(c);
                }
                if !closed || key.is_empty() || key.contains('{') {
                    return Err(ExpressionError::Unterminated {
                        what: "variable reference",
                        offset,
                    });
                }
                Token::Var(key)
            }
            c if c.is_ascii_digit() || c == '.' => {
                let mut literal = String::new();
                while let Some(&(_, c)) = chars.peek() {
                    if c.is_ascii_digit() || c == '.' {
                        literal.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let n = literal
                    .parse::<f64>()
                    .map_err(|_| ExpressionError::UnexpectedToken {
                        found: format!("number literal '{}'", literal),
                        offset,
                    })?;
                Token::Number(n)
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut word = String::new();
                while let Some(&(_, c)) = chars.peek() {
                    if c.is_alphanumeric() || c == '_' {
                        word.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                match word.as_str() {
                    "true" | "True" => Token::True,
                    "false" | "False" => Token::False,
                    "null" | "None" => Token::Null,
                    "and" => Token::And,
                    "or" => Token::Or,
                    "not" => Token::Not,
                    _ => Token::Ident(word),
                }
            }
            _ => return Err(ExpressionError::UnexpectedChar { ch, offset }),
        };

        tokens.push((token, offset));
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<(Token, usize)>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(token, _)| token)
    }

    fn advance(&mut self) -> Option<(Token, usize)> {
        let next = self.tokens.get(self.pos).cloned();
        if next.is_some() {
            self.pos += 1;
        }
        next
    }

    /// Run `parse` one nesting level down, failing once `MAX_DEPTH` is hit
    fn nested<F>(&mut self, parse: F) -> Result<Expr, ExpressionError>
    where
        F: FnOnce(&mut Self) -> Result<Expr, ExpressionError>,
    {
        if self.depth >= MAX_DEPTH {
            return Err(ExpressionError::TooDeep { limit: MAX_DEPTH });
        }
        self.depth += 1;
        let expr = parse(self);
        self.depth -= 1;
        expr
    }

    fn or(&mut self) -> Result<Expr, ExpressionError> {
        let mut terms = vec![self.and()?];
        while self.peek() == Some(&Token::Or) {
            self.pos += 1;
            terms.push(self.and()?);
        }
        Ok(if terms.len() == 1 {
            terms.remove(0)
        } else {
            Expr::Or(terms)
        })
    }

    fn and(&mut self) -> Result<Expr, ExpressionError> {
        let mut terms = vec![self.not()?];
        while self.peek() == Some(&Token::And) {
            self.pos += 1;
            terms.push(self.not()?);
        }
        Ok(if terms.len() == 1 {
            terms.remove(0)
        } else {
            Expr::And(terms)
        })
    }

    fn not(&mut self) -> Result<Expr, ExpressionError> {
        if self.peek() == Some(&Token::Not) {
            self.pos += 1;
            let inner = self.nested(Self::not)?;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.compare()
    }

    fn compare(&mut self) -> Result<Expr, ExpressionError> {
        let first = self.unary()?;
        let mut rest = Vec::new();
        while let Some(Token::Cmp(op)) = self.peek() {
            let op = *op;
            self.pos += 1;
            rest.push((op, self.unary()?));
        }

        if rest.is_empty() {
            Ok(first)
        } else {
            Ok(Expr::Compare(Box::new(first), rest))
        }
    }

    fn unary(&mut self) -> Result<Expr, ExpressionError> {
        if self.peek() == Some(&Token::Minus) {
            self.pos += 1;
            let inner = self.nested(Self::unary)?;
            return Ok(Expr::Neg(Box::new(inner)));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Expr, ExpressionError> {
        let (token, offset) = self.advance().ok_or(ExpressionError::UnexpectedEnd)?;
        let expr = match token {
            Token::Number(n) => Expr::Literal(Value::Number(n)),
            Token::Str(s) => Expr::Text(s),
            Token::True => Expr::Literal(Value::Bool(true)),
            Token::False => Expr::Literal(Value::Bool(false)),
            Token::Null => Expr::Literal(Value::Null),
            Token::Ident(name) | Token::Var(name) => Expr::Var(name),
            Token::LParen => {
                let inner = self.nested(Self::or)?;
                match self.advance() {
                    Some((Token::RParen, _)) => inner,
                    Some((other, offset)) => {
                        return Err(ExpressionError::UnexpectedToken {
                            found: other.describe(),
                            offset,
                        })
                    }
                    None => {
                        return Err(ExpressionError::Unterminated {
                            what: "parenthesis",
                            offset,
                        })
                    }
                }
            }
            other => {
                return Err(ExpressionError::UnexpectedToken {
                    found: other.describe(),
                    offset,
                })
            }
        };
        Ok(expr)
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn eval(expr: &Expr, vars: &HashMap<String, Value>) -> Result<Value, ExpressionError> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Text(raw) => Ok(Value::String(template::render(raw, vars))),
        Expr::Var(name) => vars
            .get(name)
            .cloned()
            .ok_or_else(|| ExpressionError::UnknownVariable(name.clone())),
        Expr::Not(inner) => Ok(Value::Bool(!eval(inner, vars)?.is_truthy())),
        Expr::Neg(inner) => match eval(inner, vars)? {
            Value::Number(n) => Ok(Value::Number(-n)),
            other => Err(ExpressionError::BadOperand {
                op: "-",
                operand: type_name(&other),
            }),
        },
        Expr::And(terms) => {
            for term in terms {
                if !eval(term, vars)?.is_truthy() {
                    return Ok(Value::Bool(false));
                }
            }
            Ok(Value::Bool(true))
        }
        Expr::Or(terms) => {
            for term in terms {
                if eval(term, vars)?.is_truthy() {
                    return Ok(Value::Bool(true));
                }
            }
            Ok(Value::Bool(false))
        }
        Expr::Compare(first, rest) => {
            let mut left = eval(first, vars)?;
            for (op, operand) in rest {
                let right = eval(operand, vars)?;
                if !compare(*op, &left, &right)? {
                    return Ok(Value::Bool(false));
                }
                left = right;
            }
            Ok(Value::Bool(true))
        }
    }
}

fn compare(op: CmpOp, left: &Value, right: &Value) -> Result<bool, ExpressionError> {
    let ordering = match op {
        CmpOp::Eq => return Ok(left == right),
        CmpOp::Ne => return Ok(left != right),
        _ => match (left, right) {
            (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            _ => {
                return Err(ExpressionError::TypeMismatch {
                    op: op.symbol(),
                    left: type_name(left),
                    right: type_name(right),
                })
            }
        },
    };

    // NaN compares false against everything
    let Some(ordering) = ordering else {
        return Ok(false);
    };
    Ok(match op {
        CmpOp::Lt => ordering == Ordering::Less,
        CmpOp::Le => ordering != Ordering::Greater,
        CmpOp::Gt => ordering == Ordering::Greater,
        CmpOp::Ge => ordering != Ordering::Less,
        CmpOp::Eq => ordering == Ordering::Equal,
        CmpOp::Ne => ordering != Ordering::Equal,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evaluate(source: &str, vars: &HashMap<String, Value>) -> Result<bool, ExpressionError> {
        Expression::parse(source)?.is_true(vars)
    }

    fn vars() -> HashMap<String, Value> {
        let mut vars = HashMap::new();
        vars.insert("score".to_string(), Value::from(7i64));
        vars.insert("platform".to_string(), Value::from("blog"));
        vars.insert("published".to_string(), Value::Bool(false));
        vars.insert("tags".to_string(), Value::from(vec!["a", "b"]));
        vars
    }

    #[test]
    fn literals_and_comparisons() {
        let v = HashMap::new();
        assert!(evaluate("1 < 2", &v).unwrap());
        assert!(evaluate("2.5 >= 2.5", &v).unwrap());
        assert!(!evaluate("3 == 4", &v).unwrap());
        assert!(evaluate("'abc' < 'abd'", &v).unwrap());
        assert!(evaluate("\"x\" != 'y'", &v).unwrap());
        assert!(evaluate("-1 < 0", &v).unwrap());
        assert!(!evaluate("null", &v).unwrap());
        assert!(evaluate("True", &v).unwrap());
    }

    #[test]
    fn variables_from_context() {
        let v = vars();
        assert!(evaluate("score > 5", &v).unwrap());
        assert!(evaluate("{score} > 5 && {platform} == 'blog'", &v).unwrap());
        assert!(evaluate("not published", &v).unwrap());
        assert!(evaluate("tags", &v).unwrap());
        assert!(evaluate("'{platform}-post' == 'blog-post'", &v).unwrap());
    }

    #[test]
    fn precedence_and_grouping() {
        let v = vars();
        assert!(evaluate("false and true or true", &v).unwrap());
        assert!(!evaluate("false and (true or true)", &v).unwrap());
        assert!(evaluate("!published && score == 7", &v).unwrap());
        assert!(evaluate("not score == 8", &v).unwrap());
    }

    #[test]
    fn comparisons_chain() {
        let v = vars();
        assert!(evaluate("1 < score < 10", &v).unwrap());
        assert!(!evaluate("1 < score < 5", &v).unwrap());
    }

    #[test]
    fn short_circuit_skips_unknown_names() {
        let v = vars();
        assert!(!evaluate("published && missing", &v).unwrap());
        assert!(evaluate("score or missing", &v).unwrap());
        assert_eq!(
            evaluate("missing or score", &v).unwrap_err(),
            ExpressionError::UnknownVariable("missing".to_string())
        );
    }

    #[test]
    fn type_errors() {
        let v = vars();
        assert!(matches!(
            evaluate("platform > 3", &v),
            Err(ExpressionError::TypeMismatch { op: ">", left: "string", right: "number" })
        ));
        assert!(matches!(
            evaluate("-platform", &v),
            Err(ExpressionError::BadOperand { op: "-", .. })
        ));
        // equality across types is simply false
        assert!(!evaluate("score == '7'", &v).unwrap());
    }

    #[test]
    fn rejects_anything_outside_the_grammar() {
        let v = vars();
        for source in [
            "__import__('os').system('ls')",
            "score = 3",
            "score & 1",
            "[1, 2]",
            "score +",
            "(1 < 2",
            "'open",
            "{score",
            "",
            "   ",
        ] {
            assert!(evaluate(source, &v).is_err(), "accepted: {}", source);
        }
    }

    #[test]
    fn parse_once_evaluate_many() {
        let expr = Expression::parse("score >= 5").unwrap();
        let mut low = vars();
        low.insert("score".to_string(), Value::from(2i64));
        assert!(expr.is_true(&vars()).unwrap());
        assert!(!expr.is_true(&low).unwrap());
    }

    #[test]
    fn nesting_is_bounded() {
        let deep = format!("{}1{}", "(".repeat(10_000), ")".repeat(10_000));
        assert_eq!(
            Expression::parse(&deep),
            Err(ExpressionError::TooDeep { limit: MAX_DEPTH })
        );
        assert_eq!(
            Expression::parse(&format!("{}true", "not ".repeat(10_000))),
            Err(ExpressionError::TooDeep { limit: MAX_DEPTH })
        );
        assert_eq!(
            Expression::parse(&format!("{}1", "-".repeat(10_000))),
            Err(ExpressionError::TooDeep { limit: MAX_DEPTH })
        );

        let v = HashMap::new();
        let at_limit = format!("{}1{}", "(".repeat(MAX_DEPTH), ")".repeat(MAX_DEPTH));
        assert!(evaluate(&at_limit, &v).unwrap());
        let past_limit = format!("({})", at_limit);
        assert!(Expression::parse(&past_limit).is_err());
    }

    #[test]
    fn long_chains_stay_flat() {
        let v = vars();
        let chain = vec!["published"; 50_000].join(" or ") + " or score";
        assert!(evaluate(&chain, &v).unwrap());
        let chain = vec!["score"; 50_000].join(" && ") + " && published";
        assert!(!evaluate(&chain, &v).unwrap());
    }
}
