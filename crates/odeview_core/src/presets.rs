//! Built-in example problems offered by the front end.

use crate::integrator::IntegratorConfig;
use crate::problem::Resolution;
use crate::session::SolveRequest;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Preset {
    pub name: &'static str,
    pub equation: &'static str,
    pub parameters: &'static [(&'static str, f64)],
    pub initial_value: f64,
    pub span: (f64, f64),
}

const PRESETS: [Preset; 4] = [
    Preset {
        name: "Exponential Decay",
        equation: "dy/dt = -a*y",
        parameters: &[("a", 0.5)],
        initial_value: 1.0,
        span: (0.0, 5.0),
    },
    Preset {
        name: "Linear Relaxation",
        equation: "dy/dt = -k*y",
        parameters: &[("k", 1.0)],
        initial_value: 0.0,
        span: (0.0, 10.0),
    },
    Preset {
        name: "Forced Oscillator",
        equation: "dy/dt = -k*y + sin(b*t)",
        parameters: &[("k", 1.0), ("b", 3.0)],
        initial_value: 0.0,
        span: (0.0, 20.0),
    },
    Preset {
        name: "Logistic Growth",
        equation: "dy/dt = c*y*(1 - y)",
        parameters: &[("c", 0.8)],
        initial_value: 0.1,
        span: (0.0, 10.0),
    },
];

pub fn presets() -> &'static [Preset] {
    &PRESETS
}

pub fn find(name: &str) -> Option<&'static Preset> {
    PRESETS.iter().find(|preset| preset.name.eq_ignore_ascii_case(name))
}

impl Preset {
    /// Fills a form with this example, keeping the caller's integrator settings.
    pub fn to_request(&self, resolution: Resolution, config: IntegratorConfig) -> SolveRequest {
        SolveRequest {
            equation: self.equation.to_string(),
            parameters: self
                .parameters
                .iter()
                .map(|(name, value)| (name.to_string(), format_value(*value)))
                .collect(),
            initial_value: format_value(self.initial_value),
            time_span: format!(
                "{}, {}",
                format_value(self.span.0),
                format_value(self.span.1)
            ),
            resolution,
            config,
        }
    }
}

// Keeps a trailing ".0" on whole numbers so form fields read as decimals.
fn format_value(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presenter::RecordingBackend;
    use crate::session::Session;

    #[test]
    fn every_preset_solves_with_both_methods() {
        for method in ["fixed", "adaptive"] {
            let config = IntegratorConfig {
                method: method.parse().expect("method"),
                ..IntegratorConfig::default()
            };
            for preset in presets() {
                let mut session = Session::default();
                let mut backend = RecordingBackend::default();
                let request = preset.to_request(Resolution::Points(200), config);
                let solution = session
                    .solve(&request, &mut backend)
                    .unwrap_or_else(|err| panic!("{} failed: {err}", preset.name));
                assert_eq!(solution.len(), 200);
                assert!(session.warnings().is_empty(), "{}", preset.name);
            }
        }
    }

    #[test]
    fn preset_fields_render_as_form_text() {
        let preset = find("forced oscillator").expect("preset");
        let request = preset.to_request(Resolution::default(), IntegratorConfig::default());
        assert_eq!(request.equation, "dy/dt = -k*y + sin(b*t)");
        assert_eq!(
            request.parameters,
            vec![
                ("k".to_string(), "1.0".to_string()),
                ("b".to_string(), "3.0".to_string())
            ]
        );
        assert_eq!(request.initial_value, "0.0");
        assert_eq!(request.time_span, "0.0, 20.0");
        assert_eq!(format_value(0.1), "0.1");
    }

    #[test]
    fn unknown_preset_is_none() {
        assert!(find("Lorenz").is_none());
        assert_eq!(presets().len(), 4);
    }
}
