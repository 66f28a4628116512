//! Named looks and the look expression grammar.
//!
//! Reference: OCIO LookParse.cpp, LookTransform
//!
//! A look is a named creative grade with a forward transform and an optional
//! explicit inverse. Look expressions select looks:
//!
//! ```text
//! expr   := option ('|' option)*
//! option := term (',' term)*
//! term   := ['+'|'-'] name
//! ```
//!
//! `+name` applies the forward transform, `-name` the explicit inverse if
//! present or the forward with direction flipped. Options are fallbacks: the
//! builder tries them left to right and the first one whose every look
//! resolves and loads wins.

use crate::error::{ProcError, ProcResult};
use crate::transform::Transform;

/// A named creative look.
#[derive(Debug, Clone)]
pub struct Look {
    name: String,
    description: String,
    transform: Option<Transform>,
    inverse_transform: Option<Transform>,
}

impl Look {
    /// A look with the given name and no transforms yet.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            transform: None,
            inverse_transform: None,
        }
    }

    /// Sets the description.
    pub fn description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    /// Sets the forward transform.
    pub fn transform(mut self, t: Transform) -> Self {
        self.transform = Some(t);
        self
    }

    /// Sets an explicit inverse transform.
    pub fn inverse_transform(mut self, t: Transform) -> Self {
        self.inverse_transform = Some(t);
        self
    }

    /// The look name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The description.
    pub fn get_description(&self) -> &str {
        &self.description
    }

    /// The forward transform, if set.
    pub fn get_transform(&self) -> Option<&Transform> {
        self.transform.as_ref()
    }

    /// The explicit inverse transform, if set.
    pub fn get_inverse_transform(&self) -> Option<&Transform> {
        self.inverse_transform.as_ref()
    }
}

/// Collection of looks, looked up by case-insensitive name.
#[derive(Debug, Clone, Default)]
pub struct LookRegistry {
    looks: Vec<Look>,
}

impl LookRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a look. A later look with the same name shadows an earlier one.
    pub fn add(&mut self, look: Look) {
        self.looks.push(look);
    }

    /// The look named `name`, if registered.
    pub fn get(&self, name: &str) -> Option<&Look> {
        self.looks
            .iter()
            .rev()
            .find(|l| l.name.eq_ignore_ascii_case(name))
    }

    /// All registered looks.
    pub fn all(&self) -> &[Look] {
        &self.looks
    }
}

/// One `['+'|'-'] name` term of a look expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookTerm {
    /// Look name as written, whitespace-trimmed.
    pub name: String,
    /// True for `-name`.
    pub inverse: bool,
}

/// Parses a look expression into its fallback options, each a list of terms.
///
/// An empty expression yields no options, which the builder treats as "apply
/// no looks".
pub fn parse_look_expression(expr: &str) -> ProcResult<Vec<Vec<LookTerm>>> {
    let expr = expr.trim();
    if expr.is_empty() {
        return Ok(Vec::new());
    }

    let mut options = Vec::new();
    for option in expr.split('|') {
        let option = option.trim();
        if option.is_empty() {
            return Err(ProcError::LookParse {
                expr: expr.to_string(),
                reason: "empty option".into(),
            });
        }
        let mut terms = Vec::new();
        for term in option.split(',') {
            let term = term.trim();
            let (inverse, name) = match term.strip_prefix('-') {
                Some(rest) => (true, rest),
                None => (false, term.strip_prefix('+').unwrap_or(term)),
            };
            let name = name.trim();
            if name.is_empty() {
                return Err(ProcError::LookParse {
                    expr: expr.to_string(),
                    reason: format!("term '{term}' has no look name"),
                });
            }
            terms.push(LookTerm {
                name: name.to_string(),
                inverse,
            });
        }
        options.push(terms);
    }
    Ok(options)
}

/// Resolves one term against the registry.
///
/// A `-name` term prefers the look's explicit inverse transform and falls
/// back to the forward transform with its direction flipped.
pub(crate) fn resolve_term(registry: &LookRegistry, term: &LookTerm) -> ProcResult<Transform> {
    let look = registry.get(&term.name).ok_or_else(|| ProcError::LookParse {
        expr: term.name.clone(),
        reason: format!("look '{}' is not registered", term.name),
    })?;
    if term.inverse {
        if let Some(inv) = look.get_inverse_transform() {
            return Ok(inv.clone());
        }
    }
    let forward = look
        .get_transform()
        .ok_or_else(|| ProcError::LookParse {
            expr: term.name.clone(),
            reason: format!("look '{}' has no transform", term.name),
        })?
        .clone();
    if term.inverse {
        Ok(forward.inverse())
    } else {
        Ok(forward)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_term() {
        let opts = parse_look_expression("shot_grade").unwrap();
        assert_eq!(opts.len(), 1);
        assert_eq!(
            opts[0],
            vec![LookTerm {
                name: "shot_grade".into(),
                inverse: false
            }]
        );
    }

    #[test]
    fn signs_and_commas() {
        let opts = parse_look_expression("+di, -onset_cdl").unwrap();
        assert_eq!(opts.len(), 1);
        assert_eq!(opts[0][0].name, "di");
        assert!(!opts[0][0].inverse);
        assert_eq!(opts[0][1].name, "onset_cdl");
        assert!(opts[0][1].inverse);
    }

    #[test]
    fn pipe_separates_fallback_options() {
        let opts = parse_look_expression("+shot_a, +show | +show | ").map(|_| ());
        assert!(opts.is_err(), "trailing empty option must be rejected");

        let opts = parse_look_expression("+shot_a, +show | +show").unwrap();
        assert_eq!(opts.len(), 2);
        assert_eq!(opts[0].len(), 2);
        assert_eq!(opts[1].len(), 1);
    }

    #[test]
    fn empty_expression_is_no_looks() {
        assert!(parse_look_expression("  ").unwrap().is_empty());
    }

    #[test]
    fn bare_sign_is_an_error() {
        let err = parse_look_expression("+").unwrap_err();
        assert!(err.to_string().contains("no look name"));
    }

    #[test]
    fn registry_lookup_ignores_case_and_shadows() {
        let mut reg = LookRegistry::new();
        reg.add(Look::new("Neutral").description("v1"));
        reg.add(Look::new("neutral").description("v2"));
        assert_eq!(reg.get("NEUTRAL").unwrap().get_description(), "v2");
        assert!(reg.get("missing").is_none());
    }

    #[test]
    fn inverse_term_prefers_explicit_inverse() {
        let mut reg = LookRegistry::new();
        reg.add(
            Look::new("graded")
                .transform(Transform::Exponent(crate::transform::ExponentTransform::new(
                    2.2,
                )))
                .inverse_transform(Transform::Exponent(
                    crate::transform::ExponentTransform::new(0.4545),
                )),
        );
        let t = resolve_term(
            &reg,
            &LookTerm {
                name: "graded".into(),
                inverse: true,
            },
        )
        .unwrap();
        match t {
            Transform::Exponent(e) => {
                assert!((e.value[0] - 0.4545).abs() < 1e-12);
                assert_eq!(e.direction, ocre_ops::Direction::Forward);
            }
            other => panic!("expected exponent, got {other:?}"),
        }
    }

    #[test]
    fn inverse_term_falls_back_to_flipped_forward() {
        let mut reg = LookRegistry::new();
        reg.add(Look::new("graded").transform(Transform::Exponent(
            crate::transform::ExponentTransform::new(2.2),
        )));
        let t = resolve_term(
            &reg,
            &LookTerm {
                name: "graded".into(),
                inverse: true,
            },
        )
        .unwrap();
        match t {
            Transform::Exponent(e) => assert_eq!(e.direction, ocre_ops::Direction::Inverse),
            other => panic!("expected exponent, got {other:?}"),
        }
    }
}
