//! Turns a [`Solution`] into plot-ready data and hands it to a [`PlotBackend`].

use crate::equation_engine::Equation;
use crate::solution::Solution;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub name: String,
    pub points: Vec<[f64; 2]>,
}

/// Everything a backend needs to draw one 2D line plot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Figure {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub series: Vec<Series>,
}

/// The plotting collaborator.
pub trait PlotBackend {
    fn render(&mut self, figure: &Figure);
    fn clear(&mut self);
}

/// Chooses labels and series for a solution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Presenter {
    // At least 2 so the decimation stride is well defined.
    max_points: usize,
}

impl Default for Presenter {
    fn default() -> Self {
        Self { max_points: 5000 }
    }
}

impl Presenter {
    pub fn new(max_points: usize) -> Self {
        Self {
            max_points: max_points.max(2),
        }
    }

    /// Upper bound on points handed to the backend; longer series are decimated.
    pub fn max_points(&self) -> usize {
        self.max_points
    }

    pub fn figure(&self, solution: &Solution, equation: &Equation) -> Figure {
        Figure {
            title: equation.to_string(),
            x_label: format!("Time ({})", equation.time),
            y_label: format!("{}({})", equation.state, equation.time),
            series: vec![Series {
                name: "Numerical Solution".to_string(),
                points: self.select(solution),
            }],
        }
    }

    pub fn present(
        &self,
        solution: &Solution,
        equation: &Equation,
        backend: &mut impl PlotBackend,
    ) -> Figure {
        let figure = self.figure(solution, equation);
        backend.render(&figure);
        figure
    }

    /// Uniform-stride decimation that always keeps the first and last sample.
    fn select(&self, solution: &Solution) -> Vec<[f64; 2]> {
        let points = solution.points();
        let n = points.len();
        if n <= self.max_points {
            return points;
        }
        let stride = (n - 1).div_ceil(self.max_points - 1);
        let mut selected: Vec<[f64; 2]> = points.iter().copied().step_by(stride).collect();
        if (n - 1) % stride != 0 {
            selected.push(points[n - 1]);
        }
        selected
    }
}

/// Keeps every rendered figure. Used by tests and headless callers.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    pub figures: Vec<Figure>,
    pub clears: usize,
}

impl PlotBackend for RecordingBackend {
    fn render(&mut self, figure: &Figure) {
        self.figures.push(figure.clone());
    }

    fn clear(&mut self) {
        self.clears += 1;
        self.figures.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::equation_engine::parse_equation;
    use crate::integrator::{integrate, IntegratorConfig};
    use crate::problem::{InitialCondition, Resolution, TimeSpan};

    fn solution(points: usize) -> Solution {
        integrate(
            &|_t: f64, y: f64| -y,
            InitialCondition::new(0.0, 1.0),
            &TimeSpan::new(0.0, 1.0).with_resolution(Resolution::Points(points)),
            &IntegratorConfig::default(),
        )
        .expect("integration should succeed")
    }

    #[test]
    fn figure_labels_follow_equation_variables() {
        let eq = parse_equation("dx/ds = -x").expect("equation");
        let figure = Presenter::default().figure(&solution(5), &eq);
        assert_eq!(figure.x_label, "Time (s)");
        assert_eq!(figure.y_label, "x(s)");
        assert_eq!(figure.title, "dx/ds = -x");
        assert_eq!(figure.series.len(), 1);
        assert_eq!(figure.series[0].name, "Numerical Solution");
        assert_eq!(figure.series[0].points.len(), 5);
    }

    #[test]
    fn long_series_are_decimated_keeping_endpoints() {
        let eq = parse_equation("dy/dt = -y").expect("equation");
        let sol = solution(1000);
        let figure = Presenter::new(100).figure(&sol, &eq);
        let points = &figure.series[0].points;
        assert!(points.len() <= 100, "got {} points", points.len());
        assert_eq!(points[0], [0.0, 1.0]);
        assert_eq!(points[points.len() - 1][0], 1.0);
        assert!(points.windows(2).all(|w| w[0][0] < w[1][0]));
    }

    #[test]
    fn tiny_point_limits_keep_both_endpoints() {
        let eq = parse_equation("dy/dt = -y").expect("equation");
        let sol = solution(50);
        for limit in [0, 1, 2] {
            let presenter = Presenter::new(limit);
            assert_eq!(presenter.max_points(), 2);
            let points = &presenter.figure(&sol, &eq).series[0].points;
            assert_eq!(points.len(), 2);
            assert_eq!(points[0][0], 0.0);
            assert_eq!(points[1][0], 1.0);
        }
    }

    #[test]
    fn present_renders_through_backend() {
        let eq = parse_equation("dy/dt = -y").expect("equation");
        let mut backend = RecordingBackend::default();
        let figure = Presenter::default().present(&solution(10), &eq, &mut backend);
        assert_eq!(backend.figures, vec![figure]);
        backend.clear();
        assert!(backend.figures.is_empty());
        assert_eq!(backend.clears, 1);
    }
}
