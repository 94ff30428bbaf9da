//! Parsing of `xdt:Transform` and `xdt:Locator` attributes.
//!
//! ```text
//! xdt:Transform="SetAttributes(name,value),Remove"
//! xdt:Locator="Match(name)"
//! xdt:Locator="Condition(@name='a' or @name='b')"
//! xdt:Locator="XPath(/configuration/appSettings)"
//! ```
//!
//! Problems are collected rather than returned early, so one element can
//! report every unknown operation it names.

use crate::error::TransformError;
use crate::transforms::{Transform, TransformRegistry};
use xdt_xml::xpath::XPath;
use xdt_xml::{NodeId, NodeInfo, QName, XmlDocument};

/// Namespace of the directive attributes.
pub const XDT_NAMESPACE: &str = "http://schemas.microsoft.com/XML-Document-Transform";

/// One entry of an operation list, before it is bound to an executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationSpec {
    pub name: String,
    /// Raw text between the parentheses, if there were any.
    pub arguments: Option<String>,
}

impl OperationSpec {
    /// Arguments split on top-level commas, trimmed, empties dropped.
    pub fn argument_list(&self) -> Vec<String> {
        let Some(arguments) = &self.arguments else {
            return Vec::new();
        };
        split_top_level(arguments)
            .unwrap_or_else(|_| vec![arguments.clone()])
            .into_iter()
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .collect()
    }

    pub fn has_arguments(&self) -> bool {
        self.arguments.as_deref().is_some_and(|a| !a.trim().is_empty())
    }
}

/// How a transform element finds its targets.
#[derive(Debug, Clone, PartialEq)]
pub enum LocatorSpec {
    /// Children of the parent with the element's name and namespace.
    Default,
    /// Same-named children whose listed attributes equal the element's.
    Match(Vec<String>),
    /// Same-named children for which the expression is true.
    Condition(XPath),
    /// The node-set of the expression, evaluated at the parent.
    XPath(XPath),
}

/// An operation bound to its executor.
#[derive(Debug)]
pub struct Operation {
    pub spec: OperationSpec,
    pub transform: Box<dyn Transform>,
}

#[derive(Debug)]
pub struct Directive {
    pub operations: Vec<Operation>,
    pub locator: LocatorSpec,
    /// Where the `Transform` attribute was read from.
    pub transform_info: Option<NodeInfo>,
    /// Where the `Locator` attribute was read from.
    pub locator_info: Option<NodeInfo>,
}

impl Directive {
    pub fn consumes_subtree(&self) -> bool {
        self.operations.iter().any(|op| op.transform.consumes_subtree())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DirectiveProblem {
    pub error: TransformError,
    pub info: Option<NodeInfo>,
}

#[derive(Debug)]
pub struct ParsedDirective {
    pub directive: Directive,
    pub problems: Vec<DirectiveProblem>,
    /// The locator clause was unusable; the element cannot find targets.
    pub locator_failed: bool,
}

/// Whether an attribute of `element` is a directive attribute or the
/// declaration of the directive namespace.
pub fn is_directive_attribute(doc: &XmlDocument, element: NodeId, name: &QName, value: &str) -> bool {
    if name.is_namespace_declaration() {
        return value == XDT_NAMESPACE;
    }
    doc.attribute_namespace(element, name).as_deref() == Some(XDT_NAMESPACE)
}

/// Whether the element carries an `xdt:Transform` or `xdt:Locator` attribute.
pub fn has_directive(doc: &XmlDocument, element: NodeId) -> bool {
    doc.attributes(element).iter().any(|attr| {
        !attr.name.is_namespace_declaration()
            && matches!(attr.name.local.as_str(), "Transform" | "Locator")
            && doc.attribute_namespace(element, &attr.name).as_deref() == Some(XDT_NAMESPACE)
    })
}

/// Read the directive of a transform-document element.
pub fn parse_directives(
    doc: &XmlDocument,
    element: NodeId,
    registry: &TransformRegistry,
) -> ParsedDirective {
    let mut transform_attr = None;
    let mut locator_attr = None;
    for attr in doc.attributes(element) {
        if attr.name.is_namespace_declaration()
            || doc.attribute_namespace(element, &attr.name).as_deref() != Some(XDT_NAMESPACE)
        {
            continue;
        }
        match attr.name.local.as_str() {
            "Transform" => transform_attr = Some((attr.value.clone(), attr.info)),
            "Locator" => locator_attr = Some((attr.value.clone(), attr.info)),
            _ => {}
        }
    }

    let mut problems = Vec::new();
    let mut operations = Vec::new();

    if let Some((text, info)) = &transform_attr {
        match parse_operation_list(text) {
            Ok(specs) => {
                for spec in specs {
                    if !registry.contains(&spec.name) {
                        problems.push(DirectiveProblem {
                            error: TransformError::UnrecognizedTransform { name: spec.name },
                            info: *info,
                        });
                        continue;
                    }
                    match registry.create(&spec) {
                        Ok(transform) => operations.push(Operation { spec, transform }),
                        Err(error) => problems.push(DirectiveProblem { error, info: *info }),
                    }
                }
            }
            Err(message) => problems.push(DirectiveProblem {
                error: TransformError::ArgumentError {
                    operation: "Transform".to_string(),
                    message,
                },
                info: *info,
            }),
        }
    }

    let mut locator_failed = false;
    let locator = match &locator_attr {
        Some((text, info)) => match parse_locator(text) {
            Ok(locator) => locator,
            Err(error) => {
                problems.push(DirectiveProblem { error, info: *info });
                locator_failed = true;
                LocatorSpec::Default
            }
        },
        None => LocatorSpec::Default,
    };

    ParsedDirective {
        directive: Directive {
            operations,
            locator,
            transform_info: transform_attr.and_then(|(_, info)| info),
            locator_info: locator_attr.and_then(|(_, info)| info),
        },
        problems,
        locator_failed,
    }
}

/// Parse `Name` / `Name(args)` entries separated by top-level commas.
pub fn parse_operation_list(text: &str) -> Result<Vec<OperationSpec>, String> {
    let mut specs = Vec::new();
    for token in split_top_level(text)? {
        let token = token.trim();
        if token.is_empty() {
            if text.trim().is_empty() {
                continue;
            }
            return Err(format!("empty entry in operation list '{}'", text));
        }
        let (name, arguments) = parse_call(token)?;
        specs.push(OperationSpec { name, arguments });
    }
    Ok(specs)
}

/// Parse a `Locator` attribute value.
pub fn parse_locator(text: &str) -> Result<LocatorSpec, TransformError> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(LocatorSpec::Default);
    }

    let argument_error = |message: String| TransformError::ArgumentError {
        operation: "Locator".to_string(),
        message,
    };
    let (name, arguments) = parse_call(text).map_err(argument_error)?;

    let compile = |expression: String| {
        XPath::compile(&expression)
            .map_err(|source| TransformError::Expression { expression, source })
    };

    match (name.as_str(), arguments) {
        ("Match", Some(arguments)) => {
            let spec = OperationSpec {
                name,
                arguments: Some(arguments),
            };
            let names = spec.argument_list();
            if names.is_empty() {
                return Err(argument_error(
                    "Match requires at least one attribute name".to_string(),
                ));
            }
            Ok(LocatorSpec::Match(names))
        }
        ("Condition", Some(expression)) => Ok(LocatorSpec::Condition(compile(expression)?)),
        ("XPath", Some(expression)) => Ok(LocatorSpec::XPath(compile(expression)?)),
        ("Match" | "Condition" | "XPath", None) => Err(argument_error(format!(
            "{} requires an argument, as in {}(...)",
            name, name
        ))),
        _ => Err(TransformError::UnrecognizedLocator { name }),
    }
}

/// Split `Name(args)` into its name and the raw argument text.
fn parse_call(token: &str) -> Result<(String, Option<String>), String> {
    let (name, arguments) = match token.find('(') {
        Some(open) => {
            let inner = token[open + 1..]
                .strip_suffix(')')
                .ok_or_else(|| format!("missing ')' in '{}'", token))?;
            (token[..open].trim(), Some(inner.to_string()))
        }
        None => (token, None),
    };

    if name.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '.') {
        return Err(format!("'{}' is not a valid name", name));
    }
    Ok((name.to_string(), arguments))
}

/// Split on commas outside parentheses, brackets and quotes.
fn split_top_level(text: &str) -> Result<Vec<String>, String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut nesting: Vec<char> = Vec::new();
    let mut quote: Option<char> = None;

    for ch in text.chars() {
        if let Some(q) = quote {
            if ch == q {
                quote = None;
            }
            current.push(ch);
            continue;
        }
        match ch {
            '\'' | '"' => quote = Some(ch),
            '(' => nesting.push(')'),
            '[' => nesting.push(']'),
            ')' | ']' => {
                if nesting.pop() != Some(ch) {
                    return Err(format!("unbalanced '{}' in '{}'", ch, text));
                }
            }
            ',' if nesting.is_empty() => {
                parts.push(std::mem::take(&mut current));
                continue;
            }
            _ => {}
        }
        current.push(ch);
    }

    if let Some(q) = quote {
        return Err(format!("unterminated {} quote in '{}'", q, text));
    }
    if let Some(close) = nesting.last() {
        return Err(format!("missing '{}' in '{}'", close, text));
    }
    parts.push(current);
    Ok(parts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use xdt_xml::FileId;

    fn names(specs: &[OperationSpec]) -> Vec<(&str, Option<&str>)> {
        specs
            .iter()
            .map(|s| (s.name.as_str(), s.arguments.as_deref()))
            .collect()
    }

    #[test]
    fn test_split_respects_nesting() {
        assert_eq!(
            split_top_level("a(b,c),d[e,f],'g,h',i").unwrap(),
            vec!["a(b,c)", "d[e,f]", "'g,h'", "i"]
        );
        assert!(split_top_level("a(b").is_err());
        assert!(split_top_level("a)b").is_err());
        assert!(split_top_level("a('b)").is_err());
    }

    #[test]
    fn test_operation_list() {
        let specs = parse_operation_list(" SetAttributes(name, value) , Remove").unwrap();
        assert_eq!(
            names(&specs),
            vec![("SetAttributes", Some("name, value")), ("Remove", None)]
        );
        assert_eq!(specs[0].argument_list(), vec!["name", "value"]);

        let specs = parse_operation_list("InsertBefore(/a/b[@k='x,y'])").unwrap();
        assert_eq!(specs[0].arguments.as_deref(), Some("/a/b[@k='x,y']"));

        assert!(parse_operation_list("").unwrap().is_empty());
        assert!(parse_operation_list("Insert,,Remove").is_err());
        assert!(parse_operation_list("Insert(").is_err());
        assert!(parse_operation_list("Bad Name").is_err());
    }

    #[test]
    fn test_locators() {
        assert_eq!(
            parse_locator("Match(name, key)").unwrap(),
            LocatorSpec::Match(vec!["name".to_string(), "key".to_string()])
        );
        assert!(matches!(
            parse_locator("Condition(@a='1' or @b='2')").unwrap(),
            LocatorSpec::Condition(x) if x.source() == "@a='1' or @b='2'"
        ));
        assert!(matches!(
            parse_locator("XPath(/configuration/appSettings)").unwrap(),
            LocatorSpec::XPath(_)
        ));
        assert_eq!(parse_locator("  ").unwrap(), LocatorSpec::Default);

        assert_eq!(
            parse_locator("Near(a)").unwrap_err().code(),
            "X-2-2"
        );
        assert_eq!(parse_locator("Match()").unwrap_err().code(), "X-2-3");
        assert_eq!(parse_locator("Match").unwrap_err().code(), "X-2-3");
        assert_eq!(parse_locator("XPath(/a[)").unwrap_err().code(), "X-3-2");
    }

    #[test]
    fn test_parse_directives_collects_every_problem() {
        let doc = XmlDocument::parse(
            r#"<add xmlns:xdt="http://schemas.microsoft.com/XML-Document-Transform"
     key="a"
     xdt:Transform="Frobnicate,SetAttributes,Twiddle"
     xdt:Locator="Match(key)"/>"#,
            FileId(1),
        )
        .unwrap();
        let root = doc.root_element().unwrap();

        let parsed = parse_directives(&doc, root, &TransformRegistry::default());
        assert_eq!(parsed.directive.operations.len(), 1);
        assert_eq!(parsed.directive.operations[0].spec.name, "SetAttributes");
        assert_eq!(
            parsed.directive.locator,
            LocatorSpec::Match(vec!["key".to_string()])
        );
        assert!(!parsed.locator_failed);

        let errors: Vec<String> = parsed.problems.iter().map(|p| p.error.to_string()).collect();
        assert_eq!(
            errors,
            vec![
                "unrecognized transform: Frobnicate",
                "unrecognized transform: Twiddle"
            ]
        );
        let info = parsed.problems[0].info.unwrap();
        assert_eq!((info.line, info.column), (3, 6));
    }

    #[test]
    fn test_directive_attributes() {
        let doc = XmlDocument::parse(
            r#"<a xmlns:t="http://schemas.microsoft.com/XML-Document-Transform" t:Transform="Remove" Transform="x"/>"#,
            FileId(1),
        )
        .unwrap();
        let root = doc.root_element().unwrap();
        assert!(has_directive(&doc, root));

        let flags: Vec<bool> = doc
            .attributes(root)
            .iter()
            .map(|a| is_directive_attribute(&doc, root, &a.name, &a.value))
            .collect();
        assert_eq!(flags, vec![true, true, false]);

        let parsed = parse_directives(&doc, root, &TransformRegistry::default());
        assert_eq!(parsed.directive.operations[0].spec.name, "Remove");
        assert!(parsed.directive.consumes_subtree());
    }
}
