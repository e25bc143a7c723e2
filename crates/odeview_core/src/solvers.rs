use crate::traits::{lit, Scalar, ScalarOde, Steppable};

/// Classic Runge-Kutta 4th Order Solver
#[derive(Debug, Default)]
pub struct RK4 {
    /// Number of derivative evaluations performed so far.
    pub evaluations: usize,
}

impl RK4 {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<T: Scalar> Steppable<T> for RK4 {
    fn step(&mut self, ode: &impl ScalarOde<T>, t: &mut T, y: &mut T, dt: T) {
        let half = lit::<T>(0.5);
        let sixth = lit::<T>(1.0 / 6.0);
        let two = lit::<T>(2.0);

        let t0 = *t;
        let y0 = *y;

        // k1 = f(t, y)
        let k1 = ode.derivative(t0, y0);
        // k2 = f(t + dt/2, y + dt*k1/2)
        let k2 = ode.derivative(t0 + dt * half, y0 + dt * k1 * half);
        // k3 = f(t + dt/2, y + dt*k2/2)
        let k3 = ode.derivative(t0 + dt * half, y0 + dt * k2 * half);
        // k4 = f(t + dt, y + dt*k3)
        let k4 = ode.derivative(t0 + dt, y0 + dt * k3);
        self.evaluations += 4;

        // y_next = y + dt/6 * (k1 + 2k2 + 2k3 + k4)
        *y = y0 + dt * sixth * (k1 + two * k2 + two * k3 + k4);
        *t = t0 + dt;
    }
}

/// Outcome of a single Tsit5 attempt. The caller decides whether to accept it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepAttempt<T> {
    /// 5th order solution at `t + dt`.
    pub y: T,
    /// Embedded local error estimate (5th minus 4th order solution).
    pub error: T,
    /// Largest magnitude among the stage derivatives; non-finite when any stage blew up.
    pub max_slope: T,
}

/// Tsitouras 5/4 Solver
///
/// Carries the last stage derivative across steps (FSAL) and keeps the
/// derivative at the start of a rejected step, so retries cost six evaluations.
#[derive(Debug)]
pub struct Tsit5<T: Scalar> {
    start: Option<(T, T, T)>,
    fsal: Option<(T, T, T)>,
    pub evaluations: usize,
}

impl<T: Scalar> Tsit5<T> {
    pub fn new() -> Self {
        Self {
            start: None,
            fsal: None,
            evaluations: 0,
        }
    }

    fn first_stage(&mut self, ode: &impl ScalarOde<T>, t: T, y: T) -> T {
        for (ct, cy, k) in [self.fsal, self.start].into_iter().flatten() {
            if ct == t && cy == y {
                return k;
            }
        }
        self.evaluations += 1;
        ode.derivative(t, y)
    }

    /// Computes the 5th order step from `(t, y)` and its error estimate without
    /// committing to it.
    pub fn attempt(&mut self, ode: &impl ScalarOde<T>, t: T, y: T, dt: T) -> StepAttempt<T> {
        // Tsit5 Coefficients
        let c2 = lit::<T>(0.161);
        let c3 = lit::<T>(0.327);
        let c4 = lit::<T>(0.9);
        let c5 = lit::<T>(0.9800255409045097);

        let a21 = lit::<T>(0.161);

        let a31 = lit::<T>(-0.008480655492356989);
        let a32 = lit::<T>(0.335480655492357);

        let a41 = lit::<T>(2.898);
        let a42 = lit::<T>(-6.359447987781783);
        let a43 = lit::<T>(4.361447987781783);

        let a51 = lit::<T>(5.325864858437957);
        let a52 = lit::<T>(-11.748883564062828);
        let a53 = lit::<T>(7.495539342889693);
        let a54 = lit::<T>(-0.09249506636030195);

        let a61 = lit::<T>(5.86145544294642);
        let a62 = lit::<T>(-12.92096931784711);
        let a63 = lit::<T>(8.159367898576159);
        let a64 = lit::<T>(-0.071584973281401);
        let a65 = lit::<T>(-0.028269050394068383);

        // b coefficients (5th order)
        let b1 = lit::<T>(0.09646076681806523);
        let b2 = lit::<T>(0.01);
        let b3 = lit::<T>(0.4798896504144996);
        let b4 = lit::<T>(1.379008574103742);
        let b5 = lit::<T>(-3.290069515436099);
        let b6 = lit::<T>(2.324710524099774);

        // Error coefficients (5th minus embedded 4th order)
        let e1 = lit::<T>(-0.00178001105222577714);
        let e2 = lit::<T>(-0.0008164344596567469);
        let e3 = lit::<T>(0.007880878010261995);
        let e4 = lit::<T>(-0.1447110071732629);
        let e5 = lit::<T>(0.5823571654525552);
        let e6 = lit::<T>(-0.45808210592918697);
        let e7 = lit::<T>(1.0 / 66.0);

        let k1 = self.first_stage(ode, t, y);
        let k2 = ode.derivative(t + c2 * dt, y + dt * (a21 * k1));
        let k3 = ode.derivative(t + c3 * dt, y + dt * (a31 * k1 + a32 * k2));
        let k4 = ode.derivative(t + c4 * dt, y + dt * (a41 * k1 + a42 * k2 + a43 * k3));
        let k5 = ode.derivative(
            t + c5 * dt,
            y + dt * (a51 * k1 + a52 * k2 + a53 * k3 + a54 * k4),
        );
        let k6 = ode.derivative(
            t + dt,
            y + dt * (a61 * k1 + a62 * k2 + a63 * k3 + a64 * k4 + a65 * k5),
        );

        let y_next = y + dt * (b1 * k1 + b2 * k2 + b3 * k3 + b4 * k4 + b5 * k5 + b6 * k6);
        let t_next = t + dt;
        let k7 = ode.derivative(t_next, y_next);
        self.evaluations += 6;

        let error =
            dt * (e1 * k1 + e2 * k2 + e3 * k3 + e4 * k4 + e5 * k5 + e6 * k6 + e7 * k7);

        let max_slope = [k1, k2, k3, k4, k5, k6, k7]
            .into_iter()
            .fold(T::zero(), |acc, k| {
                if k.is_finite() && acc.is_finite() {
                    acc.max(k.abs())
                } else {
                    T::infinity()
                }
            });

        self.start = Some((t, y, k1));
        self.fsal = Some((t_next, y_next, k7));

        StepAttempt {
            y: y_next,
            error,
            max_slope,
        }
    }
}

impl<T: Scalar> Steppable<T> for Tsit5<T> {
    fn step(&mut self, ode: &impl ScalarOde<T>, t: &mut T, y: &mut T, dt: T) {
        let attempt = self.attempt(ode, *t, *y, dt);
        *y = attempt.y;
        *t = *t + dt;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decay(_t: f64, y: f64) -> f64 {
        -y
    }

    #[test]
    fn rk4_step_is_exact_for_linear_in_time() {
        let mut solver = RK4::new();
        let mut t = 0.0;
        let mut y = 0.0;
        solver.step(&|t: f64, _y: f64| 2.0 * t, &mut t, &mut y, 0.5);
        assert!((t - 0.5).abs() < 1e-12);
        assert!((y - 0.25).abs() < 1e-12);
        assert_eq!(solver.evaluations, 4);
    }

    #[test]
    fn rk4_tracks_exponential_decay() {
        let mut solver = RK4::new();
        let mut t = 0.0;
        let mut y = 1.0;
        for _ in 0..100 {
            solver.step(&decay, &mut t, &mut y, 0.01);
        }
        assert!((y - (-1.0_f64).exp()).abs() < 1e-9);
    }

    #[test]
    fn tsit5_step_matches_exponential_and_estimates_small_error() {
        let mut solver = Tsit5::new();
        let attempt = solver.attempt(&decay, 0.0, 1.0, 0.1);
        assert!((attempt.y - (-0.1_f64).exp()).abs() < 1e-7);
        assert!(attempt.error.abs() < 1e-6);
        assert!(attempt.max_slope.is_finite());
    }

    #[test]
    fn tsit5_error_estimate_shrinks_with_step_size() {
        let mut solver = Tsit5::new();
        let coarse = solver.attempt(&decay, 0.0, 1.0, 0.4).error.abs();
        let fine = solver.attempt(&decay, 0.0, 1.0, 0.1).error.abs();
        assert!(fine < coarse);
    }

    #[test]
    fn tsit5_reuses_last_stage_after_accepted_step() {
        let mut solver = Tsit5::new();
        let mut t = 0.0;
        let mut y = 1.0;
        solver.step(&decay, &mut t, &mut y, 0.1);
        assert_eq!(solver.evaluations, 7);
        solver.step(&decay, &mut t, &mut y, 0.1);
        assert_eq!(solver.evaluations, 13);
        assert!((y - (-0.2_f64).exp()).abs() < 1e-7);
    }

    #[test]
    fn tsit5_reuses_first_stage_when_retrying_rejected_step() {
        let mut solver = Tsit5::new();
        solver.attempt(&decay, 0.0, 1.0, 0.5);
        solver.attempt(&decay, 0.0, 1.0, 0.25);
        assert_eq!(solver.evaluations, 13);
    }

    #[test]
    fn tsit5_flags_non_finite_stages() {
        let mut solver = Tsit5::new();
        let attempt = solver.attempt(&|_t: f64, y: f64| 1.0 / (y - 1.0), 0.0, 1.0, 0.1);
        assert!(!attempt.max_slope.is_finite());
    }
}
