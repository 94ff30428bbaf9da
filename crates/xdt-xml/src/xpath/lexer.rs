//! Tokenizer for XPath expressions.

use super::XPathError;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Slash,
    DoubleSlash,
    LBracket,
    RBracket,
    LParen,
    RParen,
    At,
    Dot,
    DotDot,
    Comma,
    Pipe,
    Plus,
    Minus,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    /// `*` as a name test.
    Star,
    /// `*` as multiplication.
    Multiply,
    And,
    Or,
    Div,
    Mod,
    Literal(String),
    Number(f64),
    /// A name test, possibly prefixed.
    Name(String),
    /// `prefix:*`
    PrefixWildcard(String),
    /// An axis name; the `::` has been consumed.
    Axis(String),
    /// A function name; the `(` is the next token.
    Function(String),
    /// `node`, `text`, `comment` or `processing-instruction`; the `(` is the next token.
    NodeType(String),
    Variable(String),
}

impl Token {
    pub(crate) fn describe(&self) -> String {
        match self {
            Token::Literal(s) => format!("literal '{}'", s),
            Token::Number(n) => format!("number {}", n),
            Token::Name(n) | Token::Function(n) | Token::NodeType(n) => format!("'{}'", n),
            Token::PrefixWildcard(p) => format!("'{}:*'", p),
            Token::Axis(a) => format!("'{}::'", a),
            Token::Variable(v) => format!("'${}'", v),
            other => format!("'{}'", other.symbol()),
        }
    }

    fn symbol(&self) -> &'static str {
        match self {
            Token::Slash => "/",
            Token::DoubleSlash => "//",
            Token::LBracket => "[",
            Token::RBracket => "]",
            Token::LParen => "(",
            Token::RParen => ")",
            Token::At => "@",
            Token::Dot => ".",
            Token::DotDot => "..",
            Token::Comma => ",",
            Token::Pipe => "|",
            Token::Plus => "+",
            Token::Minus => "-",
            Token::Eq => "=",
            Token::NotEq => "!=",
            Token::Lt => "<",
            Token::LtEq => "<=",
            Token::Gt => ">",
            Token::GtEq => ">=",
            Token::Star | Token::Multiply => "*",
            Token::And => "and",
            Token::Or => "or",
            Token::Div => "div",
            Token::Mod => "mod",
            _ => "?",
        }
    }

    /// Whether a `*` or name right after this token is an operator.
    fn precedes_operator(&self) -> bool {
        !matches!(
            self,
            Token::At
                | Token::Axis(_)
                | Token::LParen
                | Token::LBracket
                | Token::Comma
                | Token::Slash
                | Token::DoubleSlash
                | Token::Pipe
                | Token::Plus
                | Token::Minus
                | Token::Eq
                | Token::NotEq
                | Token::Lt
                | Token::LtEq
                | Token::Gt
                | Token::GtEq
                | Token::Multiply
                | Token::And
                | Token::Or
                | Token::Div
                | Token::Mod
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Spanned {
    pub token: Token,
    /// Character position in the expression.
    pub position: usize,
}

const NODE_TYPES: [&str; 4] = ["node", "text", "comment", "processing-instruction"];

fn is_name_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.') || (!c.is_ascii() && !c.is_whitespace())
}

pub(crate) fn tokenize(input: &str) -> Result<Vec<Spanned>, XPathError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens: Vec<Spanned> = Vec::new();
    let mut i = 0;

    let peek_non_ws = |mut j: usize| {
        while j < chars.len() && chars[j].is_whitespace() {
            j += 1;
        }
        j
    };

    while i < chars.len() {
        let c = chars[i];
        let start = i;

        if c.is_whitespace() {
            i += 1;
            continue;
        }

        let operator_context = tokens
            .last()
            .is_some_and(|t| t.token.precedes_operator());

        let token = match c {
            '/' if chars.get(i + 1) == Some(&'/') => {
                i += 2;
                Token::DoubleSlash
            }
            '/' => {
                i += 1;
                Token::Slash
            }
            '[' => {
                i += 1;
                Token::LBracket
            }
            ']' => {
                i += 1;
                Token::RBracket
            }
            '(' => {
                i += 1;
                Token::LParen
            }
            ')' => {
                i += 1;
                Token::RParen
            }
            '@' => {
                i += 1;
                Token::At
            }
            ',' => {
                i += 1;
                Token::Comma
            }
            '|' => {
                i += 1;
                Token::Pipe
            }
            '+' => {
                i += 1;
                Token::Plus
            }
            '-' => {
                i += 1;
                Token::Minus
            }
            '=' => {
                i += 1;
                Token::Eq
            }
            '!' if chars.get(i + 1) == Some(&'=') => {
                i += 2;
                Token::NotEq
            }
            '<' if chars.get(i + 1) == Some(&'=') => {
                i += 2;
                Token::LtEq
            }
            '<' => {
                i += 1;
                Token::Lt
            }
            '>' if chars.get(i + 1) == Some(&'=') => {
                i += 2;
                Token::GtEq
            }
            '>' => {
                i += 1;
                Token::Gt
            }
            '*' => {
                i += 1;
                if operator_context {
                    Token::Multiply
                } else {
                    Token::Star
                }
            }
            '"' | '\'' => {
                let close = chars[i + 1..]
                    .iter()
                    .position(|ch| *ch == c)
                    .ok_or(XPathError::UnterminatedLiteral { position: start })?;
                let literal: String = chars[i + 1..i + 1 + close].iter().collect();
                i += close + 2;
                Token::Literal(literal)
            }
            '.' if chars.get(i + 1) == Some(&'.') => {
                i += 2;
                Token::DotDot
            }
            '.' if !chars.get(i + 1).is_some_and(|d| d.is_ascii_digit()) => {
                i += 1;
                Token::Dot
            }
            d if d.is_ascii_digit() || d == '.' => {
                while i < chars.len() && chars[i].is_ascii_digit() {
                    i += 1;
                }
                if chars.get(i) == Some(&'.') {
                    i += 1;
                    while i < chars.len() && chars[i].is_ascii_digit() {
                        i += 1;
                    }
                }
                let text: String = chars[start..i].iter().collect();
                Token::Number(text.parse().unwrap_or(f64::NAN))
            }
            '$' => {
                i += 1;
                let name_start = i;
                while i < chars.len() && is_name_char(chars[i]) {
                    i += 1;
                }
                Token::Variable(chars[name_start..i].iter().collect())
            }
            n if is_name_start(n) => {
                while i < chars.len() && is_name_char(chars[i]) {
                    i += 1;
                }
                let mut name: String = chars[start..i].iter().collect();

                if operator_context {
                    match name.as_str() {
                        "and" => Token::And,
                        "or" => Token::Or,
                        "div" => Token::Div,
                        "mod" => Token::Mod,
                        _ => {
                            return Err(XPathError::UnexpectedToken {
                                found: format!("'{}'", name),
                                expected: "an operator".to_string(),
                                position: start,
                            });
                        }
                    }
                } else if chars.get(i) == Some(&':') && chars.get(i + 1) == Some(&'*') {
                    i += 2;
                    Token::PrefixWildcard(name)
                } else {
                    if chars.get(i) == Some(&':')
                        && chars.get(i + 1).is_some_and(|ch| is_name_start(*ch))
                    {
                        i += 1;
                        let local_start = i;
                        while i < chars.len() && is_name_char(chars[i]) {
                            i += 1;
                        }
                        name.push(':');
                        name.extend(&chars[local_start..i]);
                    }

                    let next = peek_non_ws(i);
                    if chars.get(next) == Some(&':') && chars.get(next + 1) == Some(&':') {
                        i = next + 2;
                        Token::Axis(name)
                    } else if chars.get(next) == Some(&'(') {
                        if NODE_TYPES.contains(&name.as_str()) {
                            Token::NodeType(name)
                        } else {
                            Token::Function(name)
                        }
                    } else {
                        Token::Name(name)
                    }
                }
            }
            other => {
                return Err(XPathError::UnexpectedChar {
                    ch: other,
                    position: start,
                });
            }
        };

        tokens.push(Spanned {
            token,
            position: start,
        });
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<Token> {
        tokenize(input)
            .unwrap()
            .into_iter()
            .map(|s| s.token)
            .collect()
    }

    #[test]
    fn test_path_tokens() {
        assert_eq!(
            kinds("/configuration//add[@key='a']"),
            vec![
                Token::Slash,
                Token::Name("configuration".to_string()),
                Token::DoubleSlash,
                Token::Name("add".to_string()),
                Token::LBracket,
                Token::At,
                Token::Name("key".to_string()),
                Token::Eq,
                Token::Literal("a".to_string()),
                Token::RBracket,
            ]
        );
    }

    #[test]
    fn test_star_and_operator_names() {
        assert_eq!(
            kinds("* div 2 * count(x:*)"),
            vec![
                Token::Star,
                Token::Div,
                Token::Number(2.0),
                Token::Multiply,
                Token::Function("count".to_string()),
                Token::LParen,
                Token::PrefixWildcard("x".to_string()),
                Token::RParen,
            ]
        );
    }

    #[test]
    fn test_axes_and_node_types() {
        assert_eq!(
            kinds("ancestor-or-self :: node()/text()"),
            vec![
                Token::Axis("ancestor-or-self".to_string()),
                Token::NodeType("node".to_string()),
                Token::LParen,
                Token::RParen,
                Token::Slash,
                Token::NodeType("text".to_string()),
                Token::LParen,
                Token::RParen,
            ]
        );
    }

    #[test]
    fn test_numbers_and_dots() {
        assert_eq!(
            kinds(". .. .5 3.25"),
            vec![Token::Dot, Token::DotDot, Token::Number(0.5), Token::Number(3.25)]
        );
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            tokenize("@name = 'open"),
            Err(XPathError::UnterminatedLiteral { position: 8 })
        ));
        assert!(matches!(
            tokenize("a # b"),
            Err(XPathError::UnexpectedChar { ch: '#', position: 2 })
        ));
    }
}
