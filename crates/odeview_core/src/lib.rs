//! The `odeview_core` crate solves user-typed scalar first-order ODEs `dy/dt = f(t, y)`.
//!
//! A Solve runs four stages, driven by [`session::Session`]:
//! - **Equation Engine**: tokenizer, recursive-descent parser and a bytecode VM for the right-hand side.
//! - **Binder**: closes the equation over numeric parameter values.
//! - **Integrator**: RK4 on a uniform grid or adaptive Tsit5, sampled on the requested times.
//! - **Presenter**: labels and series for a [`presenter::PlotBackend`].
pub mod binder;
pub mod equation_engine;
pub mod error;
pub mod integrator;
pub mod presenter;
pub mod presets;
pub mod problem;
pub mod session;
pub mod solution;
pub mod solvers;
pub mod traits;

pub use error::{BindError, IntegrationError, ParseError, SolveError, UnusedParameter};
pub use session::{Session, SessionState, SolveRequest};
