// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! CSS Selector parsing and matching
//!
//! Covers what crawl addressing needs: compound selectors, the
//! descendant/child/sibling combinators and selector lists. Anything
//! unrecognised is a parse error, so a bad selector matches nothing.

use crate::error::{Error, Result};

use super::node::Node;

/// A parsed selector list (`a, b > c`)
#[derive(Debug, Clone)]
pub struct Selector {
    alternatives: Vec<Complex>,
}

/// One complex selector, stored subject first
#[derive(Debug, Clone)]
struct Complex {
    subject: Vec<SelectorPart>,
    /// (combinator, compound) pairs walking leftwards from the subject
    ancestry: Vec<(Combinator, Vec<SelectorPart>)>,
}

/// Combinator between selector parts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    /// Descendant (space)
    Descendant,
    /// Child (>)
    Child,
    /// Adjacent sibling (+)
    AdjacentSibling,
    /// General sibling (~)
    GeneralSibling,
}

/// A part of a selector
#[derive(Debug, Clone)]
pub enum SelectorPart {
    /// Universal selector (*)
    Universal,
    /// Tag name
    Tag(String),
    /// ID selector (#id)
    Id(String),
    /// Class selector (.class)
    Class(String),
    /// Attribute selector ([attr], [attr=value], etc.)
    Attribute(AttributeSelector),
    /// Pseudo-class (:first-child, etc.)
    PseudoClass(PseudoClass),
}

/// Attribute selector
#[derive(Debug, Clone)]
pub struct AttributeSelector {
    pub name: String,
    pub operator: Option<AttributeOperator>,
    pub value: Option<String>,
    pub case_insensitive: bool,
}

/// Attribute selector operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeOperator {
    /// [attr=value] - exact match
    Equals,
    /// [attr~=value] - word in space-separated list
    Includes,
    /// [attr|=value] - exact or prefix with hyphen
    DashMatch,
    /// [attr^=value] - starts with
    Prefix,
    /// [attr$=value] - ends with
    Suffix,
    /// [attr*=value] - contains substring
    Substring,
}

/// Pseudo-class selectors
#[derive(Debug, Clone)]
pub enum PseudoClass {
    FirstChild,
    LastChild,
    NthChild(NthExpr),
    FirstOfType,
    LastOfType,
    NthOfType(NthExpr),
    OnlyChild,
    Empty,
    Not(Box<Selector>),
    Checked,
    Disabled,
    Enabled,
    Root,
}

/// An+B expression for :nth-* selectors
#[derive(Debug, Clone)]
pub struct NthExpr {
    pub a: i32,
    pub b: i32,
}

impl Selector {
    /// Parse a CSS selector string
    pub fn parse(selector: &str) -> Result<Self> {
        let trimmed = selector.trim();
        if trimmed.is_empty() {
            return Err(Error::selector(selector, "empty selector"));
        }

        let mut alternatives = Vec::new();
        for part in split_list(trimmed) {
            let mut parser = SelectorParser::new(selector, part.trim());
            alternatives.push(parser.parse_complex()?);
        }
        Ok(Selector { alternatives })
    }

    /// Check if a node matches this selector
    pub fn matches(&self, node: &Node) -> bool {
        node.is_element() && self.alternatives.iter().any(|c| c.matches(node))
    }
}

/// Split a selector list on top-level commas
fn split_list(input: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (i, c) in input.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"') | (None, '\'') => quote = Some(c),
            (None, '(') | (None, '[') => depth += 1,
            (None, ')') | (None, ']') => depth -= 1,
            (None, ',') if depth == 0 => {
                parts.push(&input[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&input[start..]);
    parts
}

impl Complex {
    fn matches(&self, node: &Node) -> bool {
        compound_matches(&self.subject, node) && self.matches_ancestry(0, node)
    }

    /// Match `ancestry[index..]` starting from `node`
    fn matches_ancestry(&self, index: usize, node: &Node) -> bool {
        let Some((combinator, compound)) = self.ancestry.get(index) else {
            return true;
        };
        match combinator {
            Combinator::Child => parent_element(node)
                .map_or(false, |p| compound_matches(compound, &p) && self.matches_ancestry(index + 1, &p)),
            Combinator::Descendant => {
                let mut current = parent_element(node);
                while let Some(ancestor) = current {
                    if compound_matches(compound, &ancestor)
                        && self.matches_ancestry(index + 1, &ancestor)
                    {
                        return true;
                    }
                    current = parent_element(&ancestor);
                }
                false
            }
            Combinator::AdjacentSibling => prev_element(node)
                .map_or(false, |s| compound_matches(compound, &s) && self.matches_ancestry(index + 1, &s)),
            Combinator::GeneralSibling => {
                let mut current = prev_element(node);
                while let Some(sibling) = current {
                    if compound_matches(compound, &sibling)
                        && self.matches_ancestry(index + 1, &sibling)
                    {
                        return true;
                    }
                    current = prev_element(&sibling);
                }
                false
            }
        }
    }
}

fn parent_element(node: &Node) -> Option<Node> {
    node.parent().filter(|p| p.is_element())
}

fn prev_element(node: &Node) -> Option<Node> {
    let mut sibling = node.prev_sibling();
    while let Some(s) = sibling {
        if s.is_element() {
            return Some(s);
        }
        sibling = s.prev_sibling();
    }
    None
}

fn next_element(node: &Node) -> Option<Node> {
    let mut sibling = node.next_sibling();
    while let Some(s) = sibling {
        if s.is_element() {
            return Some(s);
        }
        sibling = s.next_sibling();
    }
    None
}

/// 1-based position among element siblings, optionally of the same type
fn element_index(node: &Node, same_type: bool, from_end: bool) -> i32 {
    let name = node.local_name();
    let step = |n: &Node| {
        if from_end {
            next_element(n)
        } else {
            prev_element(n)
        }
    };
    let mut index = 1;
    let mut current = step(node);
    while let Some(sibling) = current {
        if !same_type || sibling.local_name() == name {
            index += 1;
        }
        current = step(&sibling);
    }
    index
}

fn compound_matches(parts: &[SelectorPart], node: &Node) -> bool {
    parts.iter().all(|part| part_matches(part, node))
}

/// Check if a selector part matches
fn part_matches(part: &SelectorPart, node: &Node) -> bool {
    match part {
        SelectorPart::Universal => true,
        SelectorPart::Tag(tag) => node
            .local_name()
            .map(|n| n.eq_ignore_ascii_case(tag))
            .unwrap_or(false),
        SelectorPart::Id(id) => node
            .get_attribute("id")
            .map(|n| n == *id)
            .unwrap_or(false),
        SelectorPart::Class(class) => node
            .get_attribute("class")
            .map(|c| c.split_whitespace().any(|c| c == class))
            .unwrap_or(false),
        SelectorPart::Attribute(attr) => attribute_matches(attr, node),
        SelectorPart::PseudoClass(pseudo) => pseudo_matches(pseudo, node),
    }
}

/// Check if attribute selector matches
fn attribute_matches(attr: &AttributeSelector, node: &Node) -> bool {
    let Some(value) = node.get_attribute(&attr.name) else {
        return false;
    };

    let (Some(op), Some(target)) = (&attr.operator, &attr.value) else {
        return true; // Just checking existence
    };

    let (value, target) = if attr.case_insensitive {
        (value.to_lowercase(), target.to_lowercase())
    } else {
        (value, target.clone())
    };

    match op {
        AttributeOperator::Equals => value == target,
        AttributeOperator::Includes => value.split_whitespace().any(|w| w == target),
        AttributeOperator::DashMatch => {
            value == target || value.starts_with(&format!("{}-", target))
        }
        AttributeOperator::Prefix => !target.is_empty() && value.starts_with(&target),
        AttributeOperator::Suffix => !target.is_empty() && value.ends_with(&target),
        AttributeOperator::Substring => !target.is_empty() && value.contains(&target),
    }
}

/// Check if pseudo-class matches
fn pseudo_matches(pseudo: &PseudoClass, node: &Node) -> bool {
    match pseudo {
        PseudoClass::FirstChild => prev_element(node).is_none(),
        PseudoClass::LastChild => next_element(node).is_none(),
        PseudoClass::OnlyChild => prev_element(node).is_none() && next_element(node).is_none(),
        PseudoClass::NthChild(expr) => expr.matches(element_index(node, false, false)),
        PseudoClass::FirstOfType => element_index(node, true, false) == 1,
        PseudoClass::LastOfType => element_index(node, true, true) == 1,
        PseudoClass::NthOfType(expr) => expr.matches(element_index(node, true, false)),
        PseudoClass::Empty => node.children().is_empty(),
        PseudoClass::Checked => node.has_attribute("checked"),
        PseudoClass::Disabled => node.has_attribute("disabled"),
        PseudoClass::Enabled => !node.has_attribute("disabled"),
        PseudoClass::Not(sel) => !sel.matches(node),
        PseudoClass::Root => node
            .owner_document()
            .document_element()
            .map_or(false, |root| root.node.id == node.id),
    }
}

impl NthExpr {
    /// Check if an index matches this expression
    pub fn matches(&self, index: i32) -> bool {
        if self.a == 0 {
            return index == self.b;
        }

        let diff = index - self.b;
        if self.a > 0 {
            diff >= 0 && diff % self.a == 0
        } else {
            diff <= 0 && diff % self.a == 0
        }
    }

    /// Parse an An+B expression
    pub fn parse(expr: &str) -> Option<Self> {
        let expr: String = expr.to_lowercase().chars().filter(|c| !c.is_whitespace()).collect();
        match expr.as_str() {
            "odd" => return Some(Self { a: 2, b: 1 }),
            "even" => return Some(Self { a: 2, b: 0 }),
            _ => {}
        }

        if let Ok(n) = expr.parse::<i32>() {
            return Some(Self { a: 0, b: n });
        }

        let (a_part, b_part) = expr.split_once('n')?;
        let a = match a_part {
            "" | "+" => 1,
            "-" => -1,
            s => s.parse().ok()?,
        };
        let b = if b_part.is_empty() {
            0
        } else {
            b_part.parse().ok()?
        };
        Some(Self { a, b })
    }
}

/// Parser for one complex selector
struct SelectorParser<'a> {
    source: &'a str,
    input: Vec<char>,
    pos: usize,
}

impl<'a> SelectorParser<'a> {
    fn new(source: &'a str, input: &str) -> Self {
        Self {
            source,
            input: input.chars().collect(),
            pos: 0,
        }
    }

    fn error(&self, reason: impl Into<String>) -> Error {
        Error::selector(self.source, reason)
    }

    fn parse_complex(&mut self) -> Result<Complex> {
        let mut compounds = vec![self.parse_compound()?];
        let mut combinators = Vec::new();

        loop {
            let had_space = self.skip_whitespace();
            let combinator = match self.peek() {
                None => break,
                Some('>') => Combinator::Child,
                Some('+') => Combinator::AdjacentSibling,
                Some('~') => Combinator::GeneralSibling,
                Some(_) if had_space => Combinator::Descendant,
                Some(c) => return Err(self.error(format!("unexpected '{}'", c))),
            };
            if combinator != Combinator::Descendant {
                self.advance();
                self.skip_whitespace();
            }
            combinators.push(combinator);
            compounds.push(self.parse_compound()?);
        }

        let subject = compounds.pop().unwrap_or_default();
        let ancestry = combinators
            .into_iter()
            .rev()
            .zip(compounds.into_iter().rev())
            .collect();
        Ok(Complex { subject, ancestry })
    }

    fn parse_compound(&mut self) -> Result<Vec<SelectorPart>> {
        let mut parts = Vec::new();

        match self.peek() {
            Some('*') => {
                self.advance();
                parts.push(SelectorPart::Universal);
            }
            Some(c) if is_ident_start(c) => {
                let tag = self.read_identifier()?;
                parts.push(SelectorPart::Tag(tag.to_lowercase()));
            }
            _ => {}
        }

        loop {
            match self.peek() {
                Some('#') => {
                    self.advance();
                    parts.push(SelectorPart::Id(self.read_identifier()?));
                }
                Some('.') => {
                    self.advance();
                    parts.push(SelectorPart::Class(self.read_identifier()?));
                }
                Some('[') => parts.push(SelectorPart::Attribute(self.parse_attribute()?)),
                Some(':') => parts.push(SelectorPart::PseudoClass(self.parse_pseudo()?)),
                _ => break,
            }
        }

        if parts.is_empty() {
            return Err(match self.peek() {
                Some(c) => self.error(format!("unexpected '{}'", c)),
                None => self.error("expected selector"),
            });
        }
        Ok(parts)
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.pos).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek();
        self.pos += 1;
        c
    }

    fn skip_whitespace(&mut self) -> bool {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn read_identifier(&mut self) -> Result<String> {
        let mut result = String::new();
        while let Some(c) = self.peek() {
            if c == '\\' {
                self.advance();
                match self.advance() {
                    Some(escaped) => result.push(escaped),
                    None => return Err(self.error("dangling escape")),
                }
            } else if c.is_alphanumeric() || c == '_' || c == '-' || !c.is_ascii() {
                result.push(c);
                self.advance();
            } else {
                break;
            }
        }
        if result.is_empty() {
            return Err(self.error("expected identifier"));
        }
        Ok(result)
    }

    fn parse_attribute(&mut self) -> Result<AttributeSelector> {
        self.advance(); // consume '['

        self.skip_whitespace();
        let name = self.read_identifier()?.to_lowercase();
        self.skip_whitespace();

        let mut operator = None;
        let mut value = None;
        let mut case_insensitive = false;

        if let Some(c) = self.peek() {
            if c != ']' {
                self.advance();
                let op = match c {
                    '=' => AttributeOperator::Equals,
                    '~' => AttributeOperator::Includes,
                    '|' => AttributeOperator::DashMatch,
                    '^' => AttributeOperator::Prefix,
                    '$' => AttributeOperator::Suffix,
                    '*' => AttributeOperator::Substring,
                    _ => return Err(self.error(format!("unknown operator '{}'", c))),
                };
                if op != AttributeOperator::Equals {
                    self.expect('=')?;
                }
                operator = Some(op);

                self.skip_whitespace();
                value = Some(self.read_string_or_ident()?);
                self.skip_whitespace();

                if let Some('i') | Some('I') = self.peek() {
                    case_insensitive = true;
                    self.advance();
                    self.skip_whitespace();
                }
            }
        }

        self.expect(']')?;

        Ok(AttributeSelector {
            name,
            operator,
            value,
            case_insensitive,
        })
    }

    fn parse_pseudo(&mut self) -> Result<PseudoClass> {
        self.advance(); // consume ':'
        if let Some(':') = self.peek() {
            return Err(self.error("pseudo-elements never match elements"));
        }

        let name = self.read_identifier()?.to_lowercase();
        let nth = |parser: &mut Self| -> Result<NthExpr> {
            let arg = parser.parse_function_arg()?;
            NthExpr::parse(&arg).ok_or_else(|| parser.error(format!("invalid nth expression '{}'", arg)))
        };

        let pseudo = match name.as_str() {
            "first-child" => PseudoClass::FirstChild,
            "last-child" => PseudoClass::LastChild,
            "first-of-type" => PseudoClass::FirstOfType,
            "last-of-type" => PseudoClass::LastOfType,
            "only-child" => PseudoClass::OnlyChild,
            "empty" => PseudoClass::Empty,
            "checked" => PseudoClass::Checked,
            "disabled" => PseudoClass::Disabled,
            "enabled" => PseudoClass::Enabled,
            "root" => PseudoClass::Root,
            "nth-child" => PseudoClass::NthChild(nth(self)?),
            "nth-of-type" => PseudoClass::NthOfType(nth(self)?),
            "not" => {
                let inner = self.parse_function_arg()?;
                PseudoClass::Not(Box::new(Selector::parse(&inner)?))
            }
            other => return Err(self.error(format!("unsupported pseudo-class ':{}'", other))),
        };

        Ok(pseudo)
    }

    fn parse_function_arg(&mut self) -> Result<String> {
        self.expect('(')?;
        let mut depth = 1;
        let mut result = String::new();

        while let Some(c) = self.advance() {
            match c {
                '(' => {
                    depth += 1;
                    result.push(c);
                }
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(result.trim().to_string());
                    }
                    result.push(c);
                }
                _ => result.push(c),
            }
        }

        Err(self.error("unterminated argument"))
    }

    fn read_string_or_ident(&mut self) -> Result<String> {
        match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.advance();
                let mut result = String::new();
                while let Some(c) = self.advance() {
                    if c == quote {
                        return Ok(result);
                    }
                    if c == '\\' {
                        if let Some(escaped) = self.advance() {
                            result.push(escaped);
                        }
                    } else {
                        result.push(c);
                    }
                }
                Err(self.error("unterminated string"))
            }
            _ => self.read_identifier(),
        }
    }

    fn expect(&mut self, expected: char) -> Result<()> {
        match self.advance() {
            Some(c) if c == expected => Ok(()),
            Some(c) => Err(self.error(format!("expected '{}', got '{}'", expected, c))),
            None => Err(self.error(format!("expected '{}', got end of input", expected))),
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '-' || c == '\\' || !c.is_ascii()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse_html;

    #[test]
    fn test_selector_parsing() {
        assert!(Selector::parse("div").is_ok());
        assert!(Selector::parse(".class").is_ok());
        assert!(Selector::parse("#id").is_ok());
        assert!(Selector::parse("[attr]").is_ok());
        assert!(Selector::parse("[attr=value]").is_ok());
        assert!(Selector::parse("div.class#id").is_ok());
        assert!(Selector::parse("body > div:nth-of-type(2) a, span").is_ok());
    }

    #[test]
    fn test_invalid_selectors() {
        assert!(Selector::parse("").is_err());
        assert!(Selector::parse("a:hover").is_err());
        assert!(Selector::parse("#a:b").is_err());
        assert!(Selector::parse("div >").is_err());
        assert!(Selector::parse("a::before").is_err());
        assert!(Selector::parse("[x=\"open]").is_err());
    }

    #[test]
    fn test_nth_expr() {
        let odd = NthExpr::parse("odd").unwrap();
        assert!(odd.matches(1));
        assert!(!odd.matches(2));
        assert!(odd.matches(3));

        let even = NthExpr::parse("even").unwrap();
        assert!(!even.matches(1));
        assert!(even.matches(2));

        let expr = NthExpr::parse("2n + 1").unwrap();
        assert!(expr.matches(1));
        assert!(!expr.matches(2));
        assert!(expr.matches(3));
    }

    #[test]
    fn test_combinators() {
        let doc = parse_html(
            r#"<div id="wrap"><ul><li id="one"></li><li id="two"></li></ul></div><li id="three"></li>"#,
        )
        .unwrap();
        let ids = |sel: &str| -> Vec<String> {
            doc.query_selector_all(sel)
                .iter()
                .filter_map(|e| e.id())
                .collect()
        };

        assert_eq!(ids("#wrap li"), vec!["one", "two"]);
        assert_eq!(ids("div > li"), Vec::<String>::new());
        assert_eq!(ids("ul > li:nth-of-type(2)"), vec!["two"]);
        assert_eq!(ids("li + li"), vec!["two"]);
        assert_eq!(ids("body > li, #one"), vec!["one", "three"]);
    }

    #[test]
    fn test_nth_of_type_counts_same_tag_only() {
        let doc = parse_html("<div><p id='a'></p><span></span><p id='b'></p></div>").unwrap();
        let b = doc.query_selector("div > p:nth-of-type(2)").unwrap();
        assert_eq!(b.id(), Some("b".to_string()));
        assert!(doc.query_selector("p:last-of-type").unwrap().id() == Some("b".into()));
    }

    #[test]
    fn test_attribute_operators() {
        let doc = parse_html(r#"<input id="i" type="Submit" class="x y">"#).unwrap();
        let input = doc.get_element_by_id("i").unwrap();
        assert!(input.matches("input[type=Submit]"));
        assert!(!input.matches("input[type=submit]"));
        assert!(input.matches("input[type=submit i]"));
        assert!(input.matches("[class~=y]"));
        assert!(input.matches("input:not(.z)"));
    }
}
