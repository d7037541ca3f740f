//! # Route Table
//!
//! Compiles path templates such as `/user/{id}/order/{oid}` into anchored regexes and
//! resolves inbound paths against them.
//!
//! Lookup is first-match in registration order, not most-specific match: register
//! `/a/fixed` before `/a/{x}` if the literal route must win.

use regex::Regex;
use std::collections::HashMap;

use crate::domain::error::RouterError;

/// A compiled path template.
#[derive(Debug, Clone)]
pub struct RoutePattern {
    template: String,
    regex: Regex,
    params: Vec<String>,
}

impl RoutePattern {
    /// Compiles `template`. Each `{name}` becomes a group matching a run of `/`-free
    /// characters; the literal text in between is matched verbatim.
    pub fn compile(template: &str) -> Result<Self, RouterError> {
        let mut pattern = String::from("^");
        let mut params: Vec<String> = Vec::new();
        let mut literal = String::new();
        let mut chars = template.chars();

        while let Some(c) = chars.next() {
            match c {
                '{' => {
                    let mut name = String::new();
                    let mut closed = false;
                    for n in chars.by_ref() {
                        if n == '}' {
                            closed = true;
                            break;
                        }
                        name.push(n);
                    }
                    if !closed {
                        return Err(RouterError::invalid_template(template, "unclosed '{'"));
                    }
                    if name.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
                        return Err(RouterError::invalid_template(
                            template,
                            format!("bad placeholder name '{name}'"),
                        ));
                    }
                    if params.contains(&name) {
                        return Err(RouterError::invalid_template(
                            template,
                            format!("duplicate placeholder '{name}'"),
                        ));
                    }
                    pattern.push_str(&regex::escape(&literal));
                    literal.clear();
                    pattern.push_str("([^/]+)");
                    params.push(name);
                }
                '}' => {
                    return Err(RouterError::invalid_template(template, "unmatched '}'"));
                }
                _ => literal.push(c),
            }
        }
        pattern.push_str(&regex::escape(&literal));
        pattern.push('$');

        let regex = Regex::new(&pattern)
            .map_err(|e| RouterError::invalid_template(template, e.to_string()))?;

        Ok(Self {
            template: template.to_string(),
            regex,
            params,
        })
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// Parameter names in the order they appear in the template.
    pub fn params(&self) -> &[String] {
        &self.params
    }

    /// Matches the whole of `path`, binding captures positionally to parameter names.
    pub fn captures(&self, path: &str) -> Option<HashMap<String, String>> {
        let caps = self.regex.captures(path)?;
        Some(
            self.params
                .iter()
                .zip(caps.iter().skip(1))
                .filter_map(|(name, m)| m.map(|m| (name.clone(), m.as_str().to_string())))
                .collect(),
        )
    }
}

/// Result of a successful lookup.
#[derive(Debug)]
pub struct RouteMatch<'a, H> {
    pub template: &'a str,
    pub handler: &'a H,
    pub params: HashMap<String, String>,
}

/// Ordered collection of compiled templates and their handlers.
#[derive(Debug)]
pub struct RouteTable<H> {
    routes: Vec<(RoutePattern, H)>,
}

impl<H> Default for RouteTable<H> {
    fn default() -> Self {
        Self { routes: Vec::new() }
    }
}

impl<H> RouteTable<H> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` under `template`.
    ///
    /// Templates are unique by their literal text: registering the same template twice
    /// replaces the handler but keeps the original position in the lookup order.
    pub fn register(&mut self, template: &str, handler: H) -> Result<(), RouterError> {
        if let Some(slot) = self.routes.iter_mut().find(|(p, _)| p.template() == template) {
            tracing::warn!("Route '{}' registered twice, replacing handler", template);
            slot.1 = handler;
            return Ok(());
        }
        let pattern = RoutePattern::compile(template)?;
        self.routes.push((pattern, handler));
        Ok(())
    }

    /// Returns the first route, in registration order, whose pattern matches all of `path`.
    pub fn lookup(&self, path: &str) -> Result<RouteMatch<'_, H>, RouterError> {
        self.routes
            .iter()
            .find_map(|(pattern, handler)| {
                pattern.captures(path).map(|params| RouteMatch {
                    template: pattern.template(),
                    handler,
                    params,
                })
            })
            .ok_or_else(|| RouterError::RouteNotFound(path.to_string()))
    }

    pub fn templates(&self) -> impl Iterator<Item = &str> {
        self.routes.iter().map(|(p, _)| p.template())
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
