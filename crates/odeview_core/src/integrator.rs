use crate::error::IntegrationError;
use crate::problem::{InitialCondition, TimeSpan};
use crate::solution::{IntegrationStats, Solution};
use crate::solvers::{Tsit5, RK4};
use crate::traits::{ScalarOde, Steppable};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    /// Classic RK4 on a uniform grid.
    Fixed,
    /// Tsit5 with embedded error control.
    #[default]
    Adaptive,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Fixed => write!(f, "fixed"),
            Method::Adaptive => write!(f, "adaptive"),
        }
    }
}

impl FromStr for Method {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fixed" | "rk4" => Ok(Method::Fixed),
            "adaptive" | "tsit5" => Ok(Method::Adaptive),
            other => Err(format!("unknown method '{other}', expected fixed or adaptive")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntegratorConfig {
    pub method: Method,
    /// Error tolerance per adaptive step, relative for |y| > 1 and absolute below.
    pub tol: f64,
    /// Upper bound on any step; `None` leaves steps bounded by the sample spacing (fixed)
    /// or the error controller (adaptive).
    pub max_step: Option<f64>,
    /// Total attempted steps before giving up.
    pub max_steps: usize,
}

impl Default for IntegratorConfig {
    fn default() -> Self {
        Self {
            method: Method::Adaptive,
            tol: 1e-6,
            max_step: None,
            max_steps: 100_000,
        }
    }
}

impl IntegratorConfig {
    pub fn validate(&self) -> Result<(), IntegrationError> {
        if !(self.tol.is_finite() && self.tol > 0.0) {
            return Err(IntegrationError::InvalidConfig(format!(
                "tol must be positive and finite, got {}",
                self.tol
            )));
        }
        if let Some(max_step) = self.max_step {
            if !(max_step.is_finite() && max_step > 0.0) {
                return Err(IntegrationError::InvalidConfig(format!(
                    "max_step must be positive and finite, got {max_step}"
                )));
            }
        }
        if self.max_steps == 0 {
            return Err(IntegrationError::InvalidConfig(
                "max_steps must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

const SAFETY: f64 = 0.9;
const MIN_FACTOR: f64 = 0.2;
const MAX_FACTOR: f64 = 5.0;

enum Driver {
    Fixed { stepper: RK4, h: f64 },
    Adaptive { stepper: Tsit5<f64>, h: f64 },
}

struct Run<'a> {
    config: &'a IntegratorConfig,
    stats: IntegrationStats,
    attempted: usize,
}

impl Run<'_> {
    fn count_attempt(&mut self, t: f64) -> Result<(), IntegrationError> {
        if self.attempted >= self.config.max_steps {
            return Err(IntegrationError::StepLimitExceeded {
                t,
                max_steps: self.config.max_steps,
            });
        }
        self.attempted += 1;
        Ok(())
    }
}

impl Driver {
    /// Advances `(t, y)` to exactly `target`.
    fn advance(
        &mut self,
        ode: &impl ScalarOde<f64>,
        run: &mut Run<'_>,
        t: &mut f64,
        y: &mut f64,
        target: f64,
    ) -> Result<(), IntegrationError> {
        match self {
            Driver::Fixed { stepper, h } => {
                let start = *t;
                let interval = target - start;
                let substeps = ((interval / *h) - 1e-9).ceil().max(1.0) as usize;
                let dt = interval / substeps as f64;
                for i in 1..=substeps {
                    run.count_attempt(*t)?;
                    let t_before = *t;
                    stepper.step(ode, t, y, dt);
                    if !y.is_finite() {
                        return Err(IntegrationError::Diverged {
                            t: t_before,
                            reason: "state became non-finite".to_string(),
                        });
                    }
                    *t = if i == substeps {
                        target
                    } else {
                        start + dt * i as f64
                    };
                    run.stats.accepted_steps += 1;
                }
                Ok(())
            }
            Driver::Adaptive { stepper, h } => {
                let tol = run.config.tol;
                while *t < target {
                    run.count_attempt(*t)?;

                    let remaining = target - *t;
                    let mut dt = *h;
                    if let Some(max_step) = run.config.max_step {
                        dt = dt.min(max_step);
                    }
                    // Land on the sample exactly instead of leaving a sliver step.
                    let landing = remaining <= dt * 1.01;
                    if landing {
                        dt = remaining;
                    }
                    let min_step = 16.0 * f64::EPSILON * t.abs().max(1.0);
                    if !landing && dt < min_step {
                        return Err(IntegrationError::Diverged {
                            t: *t,
                            reason: format!("step size underflow (h = {dt:e})"),
                        });
                    }

                    let attempt = stepper.attempt(ode, *t, *y, dt);
                    if !attempt.y.is_finite() || !attempt.max_slope.is_finite() {
                        if dt <= min_step {
                            return Err(IntegrationError::Diverged {
                                t: *t,
                                reason: "derivative became non-finite".to_string(),
                            });
                        }
                        run.stats.rejected_steps += 1;
                        *h = dt * MIN_FACTOR;
                        continue;
                    }

                    let scale = tol * 1.0_f64.max(y.abs()).max(attempt.y.abs());
                    let norm = attempt.error.abs() / scale;
                    if norm <= 1.0 {
                        *t = if landing { target } else { *t + dt };
                        *y = attempt.y;
                        run.stats.accepted_steps += 1;

                        let factor = if norm == 0.0 {
                            MAX_FACTOR
                        } else {
                            (SAFETY * norm.powf(-0.2)).clamp(MIN_FACTOR, MAX_FACTOR)
                        };
                        let proposal = dt * factor;
                        // A step shortened to land on a sample says little about the next one.
                        *h = if landing && factor >= 1.0 {
                            (*h).max(proposal)
                        } else {
                            proposal
                        };
                    } else {
                        run.stats.rejected_steps += 1;
                        *h = dt * (SAFETY * norm.powf(-0.2)).clamp(MIN_FACTOR, 1.0);
                    }
                }
                Ok(())
            }
        }
    }

    fn evaluations(&self) -> usize {
        match self {
            Driver::Fixed { stepper, .. } => stepper.evaluations,
            Driver::Adaptive { stepper, .. } => stepper.evaluations,
        }
    }
}

/// Integrates `ode` from `initial` and samples it over `span`.
///
/// When `initial.t0` lies before the span, the solution is advanced to the span start
/// first and only the span itself is recorded. Non-finite values are reported as
/// [`IntegrationError::Diverged`] and never returned.
pub fn integrate(
    ode: &impl ScalarOde<f64>,
    initial: InitialCondition,
    span: &TimeSpan,
    config: &IntegratorConfig,
) -> Result<Solution, IntegrationError> {
    config.validate()?;
    let times = span.sample_times()?;
    span.validate_initial(&initial)?;

    let spacing = times[1] - times[0];
    let mut driver = match config.method {
        Method::Fixed => Driver::Fixed {
            stepper: RK4::new(),
            h: config.max_step.map_or(spacing, |max_step| spacing.min(max_step)),
        },
        Method::Adaptive => Driver::Adaptive {
            stepper: Tsit5::new(),
            h: spacing,
        },
    };
    let mut run = Run {
        config,
        stats: IntegrationStats::default(),
        attempted: 0,
    };

    let mut t = initial.t0;
    let mut y = initial.y0;
    if t < times[0] {
        driver.advance(ode, &mut run, &mut t, &mut y, times[0])?;
    }

    let mut solution = Solution::with_capacity(times.len());
    solution.push(times[0], y);
    for &target in &times[1..] {
        driver.advance(ode, &mut run, &mut t, &mut y, target)?;
        solution.push(target, y);
    }

    run.stats.evaluations = driver.evaluations();
    solution.stats = run.stats;
    log::debug!(
        "Integrated [{}, {}] with {} method: {} samples, {} accepted / {} rejected steps, {} evaluations",
        span.start,
        span.end,
        config.method,
        solution.len(),
        solution.stats.accepted_steps,
        solution.stats.rejected_steps,
        solution.stats.evaluations
    );
    Ok(solution)
}
