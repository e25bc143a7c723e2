use crate::equation_engine::{is_reserved, Bytecode, Compiler, Equation, VM};
use crate::error::{BindError, SolveError, UnusedParameter};
use crate::traits::ScalarOde;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::BTreeMap;

/// Parameter name -> value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterSet {
    values: BTreeMap<String, f64>,
}

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: f64) -> Option<f64> {
        self.values.insert(name.into(), value)
    }

    pub fn remove(&mut self, name: &str) -> Option<f64> {
        self.values.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(name, value)| (name.as_str(), *value))
    }

    /// Builds a set from parameter form rows `(name, value text)`.
    ///
    /// Rows with a blank value are skipped: the form may list parameters the
    /// current equation does not use.
    pub fn parse_entries<N, V>(entries: &[(N, V)]) -> Result<Self, SolveError>
    where
        N: AsRef<str>,
        V: AsRef<str>,
    {
        let mut set = Self::new();
        for (name, text) in entries {
            let name = name.as_ref().trim();
            let text = text.as_ref().trim();
            if text.is_empty() {
                continue;
            }
            if !is_identifier(name) {
                return Err(SolveError::input(
                    "parameters",
                    format!("'{name}' is not a valid parameter name"),
                ));
            }
            if is_reserved(name) {
                return Err(SolveError::input(
                    "parameters",
                    format!("'{name}' is a reserved name"),
                ));
            }
            let value: f64 = text.parse().map_err(|_| {
                SolveError::input(
                    "parameters",
                    format!("value '{text}' for '{name}' is not a number"),
                )
            })?;
            if set.insert(name, value).is_some() {
                return Err(SolveError::input(
                    "parameters",
                    format!("parameter '{name}' is listed twice"),
                ));
            }
        }
        Ok(set)
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for ParameterSet {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(name, value)| (name.into(), value))
                .collect(),
        }
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// A parsed equation closed over its parameter values: a function of `(t, y)` only.
pub struct BoundEquation {
    pub code: Bytecode,
    pub params: Vec<f64>,
    // Interior mutability for VM stack to avoid allocation in derivative().
    stack: RefCell<Vec<f64>>,
}

impl BoundEquation {
    pub fn new(code: Bytecode, params: Vec<f64>) -> Self {
        Self {
            code,
            params,
            stack: RefCell::new(Vec::with_capacity(32)),
        }
    }
}

impl ScalarOde<f64> for BoundEquation {
    fn derivative(&self, t: f64, y: f64) -> f64 {
        let mut stack = self.stack.borrow_mut();
        VM::execute(&self.code, &[t, y], &self.params, &mut stack)
    }
}

/// Result of a successful bind. `unused` lists extras, which are warnings only.
pub struct Binding {
    pub ode: BoundEquation,
    pub unused: Vec<UnusedParameter>,
}

/// Checks that `parameters` covers every free parameter of `equation` and compiles it.
pub fn bind(equation: &Equation, parameters: &ParameterSet) -> Result<Binding, BindError> {
    let missing: Vec<String> = equation
        .parameters
        .iter()
        .filter(|name| parameters.get(name).is_none())
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Err(BindError::UnboundParameter { names: missing });
    }

    let mut values = Vec::with_capacity(equation.parameters.len());
    for name in &equation.parameters {
        let value = parameters.get(name).unwrap_or(f64::NAN);
        if !value.is_finite() {
            return Err(BindError::NonFiniteParameter {
                name: name.clone(),
                value,
            });
        }
        values.push(value);
    }

    let unused: Vec<UnusedParameter> = parameters
        .iter()
        .filter(|(name, _)| !equation.parameters.iter().any(|p| p == name))
        .map(|(name, _)| UnusedParameter {
            name: name.to_string(),
        })
        .collect();
    for warning in &unused {
        log::warn!("{warning}");
    }

    let compiler = Compiler::new(&equation.var_names(), &equation.parameters);
    let code = compiler.compile(&equation.rhs)?;
    log::debug!(
        "Bound '{}' with {} parameter(s), {} op(s)",
        equation,
        values.len(),
        code.ops.len()
    );

    Ok(Binding {
        ode: BoundEquation::new(code, values),
        unused,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::equation_engine::parse_equation;

    fn params(pairs: &[(&str, f64)]) -> ParameterSet {
        pairs.iter().map(|&(name, value)| (name, value)).collect()
    }

    #[test]
    fn bind_exact_cover_evaluates_closed_function() {
        let eq = parse_equation("dy/dt = -a*y + sin(b*t)").expect("equation");
        let binding = bind(&eq, &params(&[("a", 2.0), ("b", 0.0)])).expect("binding");
        assert!(binding.unused.is_empty());
        assert!((binding.ode.derivative(1.0, 3.0) + 6.0).abs() < 1e-12);
    }

    #[test]
    fn bind_reports_each_missing_parameter_exactly() {
        let eq = parse_equation("dy/dt = -a*y + sin(b*t) + k").expect("equation");
        let full = [("a", 1.0), ("b", 2.0), ("k", 3.0)];
        assert!(bind(&eq, &params(&full)).is_ok());

        for removed in ["a", "b", "k"] {
            let mut set = params(&full);
            set.remove(removed);
            let err = bind(&eq, &set).err().expect("missing parameter");
            assert_eq!(
                err,
                BindError::UnboundParameter {
                    names: vec![removed.to_string()]
                }
            );
        }
    }

    #[test]
    fn bind_lists_all_missing_parameters_sorted() {
        let eq = parse_equation("dy/dt = z*y + a").expect("equation");
        let err = bind(&eq, &ParameterSet::new()).err().expect("missing");
        assert_eq!(err.to_string(), "Unbound parameter(s): a, z");
    }

    #[test]
    fn bind_warns_about_unused_parameters_without_failing() {
        let eq = parse_equation("dy/dt = -a*y").expect("equation");
        let binding = bind(&eq, &params(&[("a", 0.5), ("b", 1.0), ("k", 1.0)])).expect("binding");
        let names: Vec<&str> = binding.unused.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["b", "k"]);
    }

    #[test]
    fn bind_rejects_non_finite_values() {
        let eq = parse_equation("dy/dt = -a*y").expect("equation");
        let err = bind(&eq, &params(&[("a", f64::INFINITY)]))
            .err()
            .expect("non-finite");
        assert!(matches!(err, BindError::NonFiniteParameter { .. }));
    }

    #[test]
    fn bind_uses_equation_variable_names() {
        let eq = parse_equation("dx/ds = x * s").expect("equation");
        let binding = bind(&eq, &ParameterSet::new()).expect("binding");
        assert!((binding.ode.derivative(2.0, 3.0) - 6.0).abs() < 1e-12);
    }

    #[test]
    fn parse_entries_skips_blank_values_and_parses_numbers() {
        let entries = [("a", "0.5"), ("b", ""), ("c", " 2e-1 "), ("", "")];
        let set = ParameterSet::parse_entries(&entries).expect("entries");
        assert_eq!(set.len(), 2);
        assert_eq!(set.get("a"), Some(0.5));
        assert_eq!(set.get("c"), Some(0.2));
    }

    #[test]
    fn parse_entries_rejects_bad_rows() {
        for entries in [
            vec![("a", "abc")],
            vec![("2a", "1")],
            vec![("", "1")],
            vec![("sin", "1")],
            vec![("λ", "1")],
            vec![("a", "1"), ("a", "2")],
        ] {
            let err = ParameterSet::parse_entries(&entries).expect_err("bad row");
            assert!(matches!(err, SolveError::InvalidInput { .. }), "{err}");
        }
    }
}
