use num_traits::{Float, FromPrimitive};
use std::fmt::Debug;

/// A trait for types that can be used as scalars by the evaluator and the steppers.
/// Must support basic arithmetic, debug printing, and conversion from f64.
pub trait Scalar: Float + FromPrimitive + Debug + 'static {}

impl<T: Float + FromPrimitive + Debug + 'static> Scalar for T {}

/// Converts an `f64` literal into the scalar type.
/// Types that cannot represent the literal yield NaN, which the integrator reports as divergence.
pub(crate) fn lit<T: Scalar>(value: f64) -> T {
    T::from_f64(value).unwrap_or_else(T::nan)
}

/// A first-order scalar ODE `dy/dt = f(t, y)`.
pub trait ScalarOde<T: Scalar> {
    /// Evaluates the right-hand side at time `t` and state `y`.
    fn derivative(&self, t: T, y: T) -> T;
}

impl<T: Scalar, F: Fn(T, T) -> T> ScalarOde<T> for F {
    fn derivative(&self, t: T, y: T) -> T {
        self(t, y)
    }
}

/// A single-step method that advances a scalar ODE.
pub trait Steppable<T: Scalar> {
    /// Performs one step of size dt.
    /// t: current time (updated after step)
    /// y: current state (updated after step)
    /// dt: step size
    fn step(&mut self, ode: &impl ScalarOde<T>, t: &mut T, y: &mut T, dt: T);
}
