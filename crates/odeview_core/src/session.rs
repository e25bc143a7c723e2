//! The single-user solve session: one active equation/parameters/span/solution tuple.
//!
//! A Solve walks `Idle -> Parsing -> Binding -> Integrating -> Displaying -> Idle`.
//! Any failure drops straight back to `Idle` with the error kept for display; the
//! previous solution is discarded as soon as a Solve starts.

use crate::binder::{bind, ParameterSet};
use crate::equation_engine::{parse_equation, Equation};
use crate::error::{SolveError, UnusedParameter};
use crate::integrator::{integrate, IntegratorConfig};
use crate::presenter::{Figure, PlotBackend, Presenter};
use crate::problem::{InitialCondition, Resolution, TimeSpan};
use crate::solution::Solution;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionState {
    Idle,
    Parsing,
    Binding,
    Integrating,
    Displaying,
}

/// Plain-data form contents, as typed by the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolveRequest {
    pub equation: String,
    /// Parameter form rows: `(name, value text)`.
    pub parameters: Vec<(String, String)>,
    /// `y(t0)` as text.
    pub initial_value: String,
    /// `"t0, tf"` as text.
    pub time_span: String,
    pub resolution: Resolution,
    pub config: IntegratorConfig,
}

impl Default for SolveRequest {
    fn default() -> Self {
        Self {
            equation: "dy/dt = -a*y + sin(b*t)".to_string(),
            parameters: [("a", "0.5"), ("b", "1.0"), ("c", "0.8"), ("k", "1.0")]
                .into_iter()
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect(),
            initial_value: "1.0".to_string(),
            time_span: "0, 10".to_string(),
            resolution: Resolution::default(),
            config: IntegratorConfig::default(),
        }
    }
}

/// Parses `"t0, tf"` into a span.
pub fn parse_time_span(text: &str, resolution: Resolution) -> Result<TimeSpan, SolveError> {
    let bounds = text
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<Result<Vec<f64>, _>>()
        .map_err(|_| {
            SolveError::input("time span", format!("'{text}' is not a list of numbers"))
        })?;
    let &[start, end] = &bounds[..] else {
        return Err(SolveError::input(
            "time span",
            "Time span must contain exactly two numbers",
        ));
    };
    let span = TimeSpan::new(start, end).with_resolution(resolution);
    span.validate()?;
    Ok(span)
}

pub fn parse_initial_value(text: &str) -> Result<f64, SolveError> {
    let value: f64 = text.trim().parse().map_err(|_| {
        SolveError::input("initial condition", format!("'{}' is not a number", text.trim()))
    })?;
    if !value.is_finite() {
        return Err(SolveError::input(
            "initial condition",
            "Initial condition must be finite",
        ));
    }
    Ok(value)
}

#[derive(Debug)]
pub struct Session {
    state: SessionState,
    presenter: Presenter,
    equation: Option<Equation>,
    parameters: ParameterSet,
    initial: Option<InitialCondition>,
    span: Option<TimeSpan>,
    solution: Option<Solution>,
    figure: Option<Figure>,
    warnings: Vec<UnusedParameter>,
    last_error: Option<SolveError>,
    transitions: Vec<SessionState>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(Presenter::default())
    }
}

impl Session {
    pub fn new(presenter: Presenter) -> Self {
        Self {
            state: SessionState::Idle,
            presenter,
            equation: None,
            parameters: ParameterSet::new(),
            initial: None,
            span: None,
            solution: None,
            figure: None,
            warnings: Vec::new(),
            last_error: None,
            transitions: Vec::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn equation(&self) -> Option<&Equation> {
        self.equation.as_ref()
    }

    pub fn parameters(&self) -> &ParameterSet {
        &self.parameters
    }

    pub fn initial_condition(&self) -> Option<InitialCondition> {
        self.initial
    }

    pub fn time_span(&self) -> Option<&TimeSpan> {
        self.span.as_ref()
    }

    pub fn solution(&self) -> Option<&Solution> {
        self.solution.as_ref()
    }

    pub fn figure(&self) -> Option<&Figure> {
        self.figure.as_ref()
    }

    /// Non-fatal warnings of the last Solve.
    pub fn warnings(&self) -> &[UnusedParameter] {
        &self.warnings
    }

    pub fn last_error(&self) -> Option<&SolveError> {
        self.last_error.as_ref()
    }

    /// States entered during the last Solve, in order, ending with `Idle`.
    pub fn transitions(&self) -> &[SessionState] {
        &self.transitions
    }

    fn enter(&mut self, state: SessionState) {
        log::debug!("Session {:?} -> {:?}", self.state, state);
        self.state = state;
        self.transitions.push(state);
    }

    /// Runs the whole pipeline for `request`, replacing the previous result.
    ///
    /// Blocks until the integrator finishes or fails.
    pub fn solve(
        &mut self,
        request: &SolveRequest,
        backend: &mut impl PlotBackend,
    ) -> Result<&Solution, SolveError> {
        self.transitions.clear();
        self.equation = None;
        self.parameters = ParameterSet::new();
        self.initial = None;
        self.span = None;
        self.solution = None;
        self.figure = None;
        self.warnings.clear();
        self.last_error = None;

        match self.run(request, backend) {
            Ok(()) => {
                self.enter(SessionState::Idle);
                self.solution.as_ref().ok_or_else(|| {
                    SolveError::input("session", "solve finished without a solution")
                })
            }
            Err(err) => {
                log::error!("Solve failed: {err}");
                self.equation = None;
                self.parameters = ParameterSet::new();
                self.initial = None;
                self.span = None;
                self.solution = None;
                self.figure = None;
                self.last_error = Some(err.clone());
                self.enter(SessionState::Idle);
                Err(err)
            }
        }
    }

    fn run(
        &mut self,
        request: &SolveRequest,
        backend: &mut impl PlotBackend,
    ) -> Result<(), SolveError> {
        self.enter(SessionState::Parsing);
        let equation = parse_equation(&request.equation)?;

        self.enter(SessionState::Binding);
        let parameters = ParameterSet::parse_entries(&request.parameters)?;
        let y0 = parse_initial_value(&request.initial_value)?;
        let span = parse_time_span(&request.time_span, request.resolution)?;
        let initial = InitialCondition::new(span.start, y0);
        let binding = bind(&equation, &parameters)?;

        self.enter(SessionState::Integrating);
        let solution = integrate(&binding.ode, initial, &span, &request.config)?;

        self.enter(SessionState::Displaying);
        let figure = self.presenter.present(&solution, &equation, backend);

        self.equation = Some(equation);
        self.parameters = parameters;
        self.initial = Some(initial);
        self.span = Some(span);
        self.solution = Some(solution);
        self.figure = Some(figure);
        self.warnings = binding.unused;
        Ok(())
    }

    /// Drops the current result and clears the plot.
    pub fn clear(&mut self, backend: &mut impl PlotBackend) {
        self.solution = None;
        self.figure = None;
        self.warnings.clear();
        self.last_error = None;
        backend.clear();
    }
}
