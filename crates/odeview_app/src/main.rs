mod app;
mod plot;

use anyhow::{anyhow, Result};
use clap::{Parser, ValueEnum};
use eframe::egui;
use odeview_core::integrator::{IntegratorConfig, Method};
use odeview_core::problem::Resolution;
use odeview_core::SolveRequest;

const TITLE: &str = "Differential Equation Solver";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Theme {
    Light,
    Dark,
}

/// Interactive solver for scalar first-order ODEs.
#[derive(Debug, Parser)]
#[command(name = "odeview", version, about)]
struct Cli {
    /// Window width in points
    #[arg(long, default_value_t = 1200.0)]
    width: f32,

    /// Window height in points
    #[arg(long, default_value_t = 800.0)]
    height: f32,

    #[arg(long, value_enum, default_value_t = Theme::Light)]
    theme: Theme,

    /// Integration method: fixed (RK4) or adaptive (Tsit5)
    #[arg(long, default_value_t = Method::Adaptive)]
    method: Method,

    /// Relative tolerance of the adaptive method
    #[arg(long, default_value_t = 1e-6)]
    tol: f64,

    /// Upper bound on the internal step size
    #[arg(long)]
    max_step: Option<f64>,

    /// Number of output samples over the time span
    #[arg(long, default_value_t = 1000)]
    points: usize,
}

impl Cli {
    fn integrator_config(&self) -> IntegratorConfig {
        IntegratorConfig {
            method: self.method,
            tol: self.tol,
            max_step: self.max_step,
            ..IntegratorConfig::default()
        }
    }

    /// The form the window opens with.
    fn initial_form(&self) -> Result<SolveRequest> {
        let config = self.integrator_config();
        config.validate()?;
        if self.points < 2 {
            return Err(anyhow!("--points must be at least 2, got {}", self.points));
        }
        Ok(SolveRequest {
            resolution: Resolution::Points(self.points),
            config,
            ..SolveRequest::default()
        })
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let form = cli.initial_form()?;
    log::info!("Starting with {} integration", form.config.method);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title(TITLE)
            .with_inner_size([cli.width, cli.height]),
        ..Default::default()
    };
    let theme = cli.theme;

    eframe::run_native(
        TITLE,
        options,
        Box::new(move |cc| {
            cc.egui_ctx.set_visuals(match theme {
                Theme::Light => egui::Visuals::light(),
                Theme::Dark => egui::Visuals::dark(),
            });
            Ok(Box::new(app::OdeApp::new(form)))
        }),
    )
    .map_err(|err| anyhow!("failed to open the solver window: {err}"))
}
