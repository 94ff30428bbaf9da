//! Recursive-descent parser producing [`Expr`] trees.

use super::XPathError;
use super::ast::{Axis, BinaryOp, Expr, NodeTest, PathExpr, PathStart, Step};
use super::lexer::{Spanned, Token, tokenize};

/// Accepted argument counts of the core functions: (min, max).
fn arity(name: &str) -> Option<(usize, Option<usize>)> {
    Some(match name {
        "last" | "position" | "true" | "false" => (0, Some(0)),
        "count" | "sum" | "not" | "boolean" | "floor" | "ceiling" | "round" => (1, Some(1)),
        "name" | "local-name" | "namespace-uri" | "string" | "string-length"
        | "normalize-space" | "number" => (0, Some(1)),
        "starts-with" | "contains" | "substring-before" | "substring-after" => (2, Some(2)),
        "substring" => (2, Some(3)),
        "translate" => (3, Some(3)),
        "concat" => (2, None),
        _ => return None,
    })
}

pub(crate) fn parse(input: &str) -> Result<Expr, XPathError> {
    let tokens = tokenize(input)?;
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.parse_or()?;
    match parser.tokens.get(parser.pos) {
        None => Ok(expr),
        Some(extra) => Err(XPathError::UnexpectedToken {
            found: extra.token.describe(),
            expected: "end of expression".to_string(),
            position: extra.position,
        }),
    }
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|s| &s.token)
    }

    fn advance(&mut self) -> Option<Spanned> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn unexpected(&self, expected: &str) -> XPathError {
        match self.tokens.get(self.pos) {
            Some(s) => XPathError::UnexpectedToken {
                found: s.token.describe(),
                expected: expected.to_string(),
                position: s.position,
            },
            None => XPathError::UnexpectedEnd {
                expected: expected.to_string(),
            },
        }
    }

    fn expect(&mut self, token: Token, expected: &str) -> Result<(), XPathError> {
        if self.eat(&token) {
            Ok(())
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn binary_level(
        &mut self,
        ops: &[(Token, BinaryOp)],
        next: fn(&mut Self) -> Result<Expr, XPathError>,
    ) -> Result<Expr, XPathError> {
        let mut left = next(self)?;
        'outer: loop {
            for (token, op) in ops {
                if self.eat(token) {
                    let right = next(self)?;
                    left = Expr::Binary(*op, Box::new(left), Box::new(right));
                    continue 'outer;
                }
            }
            return Ok(left);
        }
    }

    fn parse_or(&mut self) -> Result<Expr, XPathError> {
        self.binary_level(&[(Token::Or, BinaryOp::Or)], Self::parse_and)
    }

    fn parse_and(&mut self) -> Result<Expr, XPathError> {
        self.binary_level(&[(Token::And, BinaryOp::And)], Self::parse_equality)
    }

    fn parse_equality(&mut self) -> Result<Expr, XPathError> {
        self.binary_level(
            &[(Token::Eq, BinaryOp::Eq), (Token::NotEq, BinaryOp::NotEq)],
            Self::parse_relational,
        )
    }

    fn parse_relational(&mut self) -> Result<Expr, XPathError> {
        self.binary_level(
            &[
                (Token::LtEq, BinaryOp::LtEq),
                (Token::GtEq, BinaryOp::GtEq),
                (Token::Lt, BinaryOp::Lt),
                (Token::Gt, BinaryOp::Gt),
            ],
            Self::parse_additive,
        )
    }

    fn parse_additive(&mut self) -> Result<Expr, XPathError> {
        self.binary_level(
            &[(Token::Plus, BinaryOp::Add), (Token::Minus, BinaryOp::Sub)],
            Self::parse_multiplicative,
        )
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, XPathError> {
        self.binary_level(
            &[
                (Token::Multiply, BinaryOp::Mul),
                (Token::Div, BinaryOp::Div),
                (Token::Mod, BinaryOp::Mod),
            ],
            Self::parse_unary,
        )
    }

    fn parse_unary(&mut self) -> Result<Expr, XPathError> {
        if self.eat(&Token::Minus) {
            let inner = self.parse_unary()?;
            return Ok(Expr::Negate(Box::new(inner)));
        }
        self.binary_level(&[(Token::Pipe, BinaryOp::Union)], Self::parse_path)
    }

    fn starts_step(token: Option<&Token>) -> bool {
        matches!(
            token,
            Some(
                Token::Name(_)
                    | Token::Star
                    | Token::PrefixWildcard(_)
                    | Token::Axis(_)
                    | Token::At
                    | Token::Dot
                    | Token::DotDot
                    | Token::NodeType(_)
            )
        )
    }

    fn parse_path(&mut self) -> Result<Expr, XPathError> {
        match self.peek() {
            Some(Token::Slash) => {
                self.pos += 1;
                let steps = if Self::starts_step(self.peek()) {
                    self.parse_relative()?
                } else {
                    Vec::new()
                };
                Ok(Expr::Path(PathExpr {
                    start: PathStart::Root,
                    steps,
                }))
            }
            Some(Token::DoubleSlash) => {
                self.pos += 1;
                let mut steps = vec![Step::abbreviated(Axis::DescendantOrSelf)];
                steps.extend(self.parse_relative()?);
                Ok(Expr::Path(PathExpr {
                    start: PathStart::Root,
                    steps,
                }))
            }
            token if Self::starts_step(token) => Ok(Expr::Path(PathExpr {
                start: PathStart::Context,
                steps: self.parse_relative()?,
            })),
            _ => {
                let primary = self.parse_primary()?;
                let predicates = self.parse_predicates()?;
                let filtered = if predicates.is_empty() {
                    primary
                } else {
                    Expr::Filter(Box::new(primary), predicates)
                };

                let mut steps = Vec::new();
                match self.peek() {
                    Some(Token::Slash) => {
                        self.pos += 1;
                    }
                    Some(Token::DoubleSlash) => {
                        self.pos += 1;
                        steps.push(Step::abbreviated(Axis::DescendantOrSelf));
                    }
                    _ => return Ok(filtered),
                }
                steps.extend(self.parse_relative()?);
                Ok(Expr::Path(PathExpr {
                    start: PathStart::Filter(Box::new(filtered)),
                    steps,
                }))
            }
        }
    }

    fn parse_relative(&mut self) -> Result<Vec<Step>, XPathError> {
        let mut steps = vec![self.parse_step()?];
        loop {
            match self.peek() {
                Some(Token::Slash) => {
                    self.pos += 1;
                }
                Some(Token::DoubleSlash) => {
                    self.pos += 1;
                    steps.push(Step::abbreviated(Axis::DescendantOrSelf));
                }
                _ => return Ok(steps),
            }
            steps.push(self.parse_step()?);
        }
    }

    fn parse_step(&mut self) -> Result<Step, XPathError> {
        if self.eat(&Token::Dot) {
            return Ok(Step::abbreviated(Axis::SelfAxis));
        }
        if self.eat(&Token::DotDot) {
            return Ok(Step::abbreviated(Axis::Parent));
        }

        let axis = match self.peek().cloned() {
            Some(Token::Axis(name)) => {
                let position = self.tokens[self.pos].position;
                self.pos += 1;
                Axis::from_name(&name).ok_or(XPathError::UnknownAxis { name, position })?
            }
            Some(Token::At) => {
                self.pos += 1;
                Axis::Attribute
            }
            _ => Axis::Child,
        };

        let test = match self.advance().map(|s| s.token) {
            Some(Token::Star) => NodeTest::AnyName,
            Some(Token::PrefixWildcard(prefix)) => NodeTest::PrefixedAny(prefix),
            Some(Token::Name(name)) => match name.split_once(':') {
                Some((prefix, local)) => NodeTest::Name {
                    prefix: Some(prefix.to_string()),
                    local: local.to_string(),
                },
                None => NodeTest::Name {
                    prefix: None,
                    local: name,
                },
            },
            Some(Token::NodeType(kind)) => {
                self.expect(Token::LParen, "'('")?;
                let test = match kind.as_str() {
                    "node" => NodeTest::Node,
                    "text" => NodeTest::Text,
                    "comment" => NodeTest::Comment,
                    _ => match self.peek().cloned() {
                        Some(Token::Literal(target)) => {
                            self.pos += 1;
                            NodeTest::ProcessingInstruction(Some(target))
                        }
                        _ => NodeTest::ProcessingInstruction(None),
                    },
                };
                self.expect(Token::RParen, "')'")?;
                test
            }
            _ => {
                self.pos -= 1;
                return Err(self.unexpected("a node test"));
            }
        };

        Ok(Step {
            axis,
            test,
            predicates: self.parse_predicates()?,
        })
    }

    fn parse_predicates(&mut self) -> Result<Vec<Expr>, XPathError> {
        let mut predicates = Vec::new();
        while self.eat(&Token::LBracket) {
            predicates.push(self.parse_or()?);
            self.expect(Token::RBracket, "']'")?;
        }
        Ok(predicates)
    }

    fn parse_primary(&mut self) -> Result<Expr, XPathError> {
        let Some(spanned) = self.advance() else {
            return Err(XPathError::UnexpectedEnd {
                expected: "an expression".to_string(),
            });
        };

        match spanned.token {
            Token::LParen => {
                let inner = self.parse_or()?;
                self.expect(Token::RParen, "')'")?;
                Ok(inner)
            }
            Token::Literal(s) => Ok(Expr::Literal(s)),
            Token::Number(n) => Ok(Expr::Number(n)),
            Token::Variable(name) => Err(XPathError::UnsupportedVariable(name)),
            Token::Function(name) => {
                self.expect(Token::LParen, "'('")?;
                let mut args = Vec::new();
                if !self.eat(&Token::RParen) {
                    loop {
                        args.push(self.parse_or()?);
                        if self.eat(&Token::RParen) {
                            break;
                        }
                        self.expect(Token::Comma, "',' or ')'")?;
                    }
                }

                let (min, max) = arity(&name).ok_or_else(|| XPathError::UnknownFunction {
                    name: name.clone(),
                    position: spanned.position,
                })?;
                if args.len() < min || max.is_some_and(|max| args.len() > max) {
                    return Err(XPathError::ArgumentCount {
                        name,
                        found: args.len(),
                    });
                }
                Ok(Expr::Function(name, args))
            }
            other => {
                self.pos -= 1;
                Err(XPathError::UnexpectedToken {
                    found: other.describe(),
                    expected: "an expression".to_string(),
                    position: spanned.position,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(local: &str) -> NodeTest {
        NodeTest::Name {
            prefix: None,
            local: local.to_string(),
        }
    }

    #[test]
    fn test_absolute_path() {
        let expr = parse("/configuration/appSettings").unwrap();
        let Expr::Path(path) = expr else {
            panic!("expected a path");
        };
        assert_eq!(path.start, PathStart::Root);
        assert_eq!(path.steps.len(), 2);
        assert_eq!(path.steps[1].test, name("appSettings"));
        assert_eq!(path.steps[1].axis, Axis::Child);
    }

    #[test]
    fn test_abbreviations() {
        let Expr::Path(path) = parse("..//@key").unwrap() else {
            panic!("expected a path");
        };
        assert_eq!(path.start, PathStart::Context);
        let axes: Vec<Axis> = path.steps.iter().map(|s| s.axis).collect();
        assert_eq!(axes, vec![Axis::Parent, Axis::DescendantOrSelf, Axis::Attribute]);
    }

    #[test]
    fn test_precedence() {
        let expr = parse("1 + 2 * 3 = 7 or false()").unwrap();
        let Expr::Binary(BinaryOp::Or, left, _) = expr else {
            panic!("expected or at the top");
        };
        let Expr::Binary(BinaryOp::Eq, sum, _) = *left else {
            panic!("expected = under or");
        };
        assert!(matches!(*sum, Expr::Binary(BinaryOp::Add, _, _)));
    }

    #[test]
    fn test_filter_path() {
        let expr = parse("(//add)[1]/@value").unwrap();
        let Expr::Path(path) = expr else {
            panic!("expected a path");
        };
        assert!(matches!(path.start, PathStart::Filter(_)));
        assert_eq!(path.steps[0].axis, Axis::Attribute);
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            parse("frobnicate(1)"),
            Err(XPathError::UnknownFunction { .. })
        ));
        assert!(matches!(
            parse("contains('a')"),
            Err(XPathError::ArgumentCount { found: 1, .. })
        ));
        assert!(matches!(parse("/a["), Err(XPathError::UnexpectedEnd { .. })));
        assert!(matches!(parse("a b"), Err(XPathError::UnexpectedToken { .. })));
        assert!(matches!(
            parse("bogus::a"),
            Err(XPathError::UnknownAxis { .. })
        ));
        assert!(matches!(parse("$x"), Err(XPathError::UnsupportedVariable(_))));
    }
}
