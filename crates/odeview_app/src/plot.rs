//! egui_plot rendering of the presenter's [`Figure`].

use eframe::egui;
use egui_plot::{Legend, Line, Plot, PlotPoints};
use odeview_core::presenter::{Figure, PlotBackend};

/// Holds the figure handed over by the last Solve and draws it every frame.
#[derive(Debug, Default)]
pub struct EguiPlot {
    figure: Option<Figure>,
}

impl EguiPlot {
    pub fn figure(&self) -> Option<&Figure> {
        self.figure.as_ref()
    }

    pub fn show(&self, ui: &mut egui::Ui) {
        let Some(figure) = &self.figure else {
            ui.centered_and_justified(|ui| {
                ui.label("Enter an equation and press Solve.");
            });
            return;
        };

        ui.heading(&figure.title);
        Plot::new("solution_plot")
            .legend(Legend::default())
            .x_axis_label(figure.x_label.as_str())
            .y_axis_label(figure.y_label.as_str())
            .show(ui, |plot_ui| {
                for series in &figure.series {
                    let points: PlotPoints = series.points.iter().copied().collect();
                    plot_ui.line(Line::new(points).name(&series.name));
                }
            });
    }
}

impl PlotBackend for EguiPlot {
    fn render(&mut self, figure: &Figure) {
        self.figure = Some(figure.clone());
    }

    fn clear(&mut self) {
        self.figure = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use odeview_core::presenter::Series;

    fn figure() -> Figure {
        Figure {
            title: "dy/dt = -y".to_string(),
            x_label: "Time (t)".to_string(),
            y_label: "y(t)".to_string(),
            series: vec![Series {
                name: "Numerical Solution".to_string(),
                points: vec![[0.0, 1.0], [1.0, 0.5]],
            }],
        }
    }

    #[test]
    fn render_keeps_latest_figure_and_clear_drops_it() {
        let mut plot = EguiPlot::default();
        assert!(plot.figure().is_none());
        plot.render(&figure());
        assert_eq!(plot.figure(), Some(&figure()));
        plot.clear();
        assert!(plot.figure().is_none());
    }
}
