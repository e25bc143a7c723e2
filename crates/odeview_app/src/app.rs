use crate::plot::EguiPlot;
use eframe::egui;
use odeview_core::integrator::Method;
use odeview_core::presets::presets;
use odeview_core::problem::Resolution;
use odeview_core::{Session, SolveRequest};

const HELP: &str = "\
Enter a first-order equation such as  dy/dt = -a*y + sin(b*t)  or  y' = -y.

Operators: + - * / and ^ (or **) for powers.
Functions: sin cos tan exp log ln sqrt abs. The constant pi is built in.

Every other name on the right-hand side is a parameter and needs a value in
the parameter table. Rows with an empty value are ignored.

The time span is two numbers  t0, tf ; the initial condition is y(t0).";

/// The solver window: input form on the left, plot on the right.
pub struct OdeApp {
    form: SolveRequest,
    session: Session,
    plot: EguiPlot,
    show_examples: bool,
    show_help: bool,
}

impl OdeApp {
    pub fn new(form: SolveRequest) -> Self {
        Self {
            form,
            session: Session::default(),
            plot: EguiPlot::default(),
            show_examples: false,
            show_help: false,
        }
    }

    fn solve(&mut self) {
        // Errors stay on the session and are shown in the status area.
        if let Ok(solution) = self.session.solve(&self.form, &mut self.plot) {
            log::info!(
                "Solved {} sample(s) with {} accepted step(s)",
                solution.len(),
                solution.stats.accepted_steps
            );
        }
    }

    fn clear(&mut self) {
        self.session.clear(&mut self.plot);
    }

    fn equation_ui(&mut self, ui: &mut egui::Ui) {
        ui.label("Differential equation:");
        let response = ui.add(
            egui::TextEdit::singleline(&mut self.form.equation)
                .desired_width(f32::INFINITY)
                .font(egui::TextStyle::Monospace),
        );
        if response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
            self.solve();
        }
    }

    fn parameters_ui(&mut self, ui: &mut egui::Ui) {
        ui.label("Parameters:");
        let mut remove = None;
        egui::Grid::new("parameters")
            .num_columns(3)
            .striped(true)
            .show(ui, |ui| {
                for (index, (name, value)) in self.form.parameters.iter_mut().enumerate() {
                    ui.add(egui::TextEdit::singleline(name).desired_width(60.0));
                    ui.add(egui::TextEdit::singleline(value).desired_width(100.0));
                    if ui.small_button("x").clicked() {
                        remove = Some(index);
                    }
                    ui.end_row();
                }
            });
        if let Some(index) = remove {
            self.form.parameters.remove(index);
        }
        if ui.button("Add parameter").clicked() {
            self.form.parameters.push((String::new(), String::new()));
        }
    }

    fn problem_ui(&mut self, ui: &mut egui::Ui) {
        egui::Grid::new("problem").num_columns(2).show(ui, |ui| {
            ui.label("Initial condition y(t0):");
            ui.text_edit_singleline(&mut self.form.initial_value);
            ui.end_row();

            ui.label("Time span (t0, tf):");
            ui.text_edit_singleline(&mut self.form.time_span);
            ui.end_row();

            ui.label("Resolution:");
            ui.horizontal(|ui| match &mut self.form.resolution {
                Resolution::Points(n) => {
                    ui.add(egui::DragValue::new(n).range(2..=1_000_000).suffix(" points"));
                    if ui.small_button("use step").clicked() {
                        self.form.resolution = Resolution::Step(0.01);
                    }
                }
                Resolution::Step(h) => {
                    ui.add(
                        egui::DragValue::new(h)
                            .range(1e-9..=1e6)
                            .speed(0.001)
                            .prefix("step "),
                    );
                    if ui.small_button("use points").clicked() {
                        self.form.resolution = Resolution::default();
                    }
                }
            });
            ui.end_row();
        });
    }

    fn integrator_ui(&mut self, ui: &mut egui::Ui) {
        let config = &mut self.form.config;
        egui::ComboBox::from_label("Method")
            .selected_text(match config.method {
                Method::Fixed => "Fixed step (RK4)",
                Method::Adaptive => "Adaptive (Tsit5)",
            })
            .show_ui(ui, |ui| {
                ui.selectable_value(&mut config.method, Method::Fixed, "Fixed step (RK4)");
                ui.selectable_value(&mut config.method, Method::Adaptive, "Adaptive (Tsit5)");
            });

        if config.method == Method::Adaptive {
            ui.add(
                egui::Slider::new(&mut config.tol, 1e-12..=1e-2)
                    .logarithmic(true)
                    .text("Tolerance"),
            );
        }

        let mut limited = config.max_step.is_some();
        ui.horizontal(|ui| {
            ui.checkbox(&mut limited, "Max step");
            if limited {
                let h = config.max_step.get_or_insert(0.1);
                ui.add(egui::DragValue::new(h).range(1e-9..=1e6).speed(0.001));
            } else {
                config.max_step = None;
            }
        });
    }

    fn status_ui(&self, ui: &mut egui::Ui) {
        if let Some(err) = self.session.last_error() {
            ui.colored_label(egui::Color32::RED, err.to_string());
        }
        for warning in self.session.warnings() {
            ui.colored_label(egui::Color32::from_rgb(200, 140, 0), warning.to_string());
        }
        if let Some(solution) = self.session.solution() {
            ui.label(format!(
                "{} samples, {} accepted / {} rejected steps, {} evaluations",
                solution.len(),
                solution.stats.accepted_steps,
                solution.stats.rejected_steps,
                solution.stats.evaluations
            ));
        }
    }

    fn examples_window(&mut self, ctx: &egui::Context) {
        let mut open = self.show_examples;
        let mut chosen = None;
        egui::Window::new("Examples")
            .open(&mut open)
            .resizable(false)
            .show(ctx, |ui| {
                for preset in presets() {
                    ui.horizontal(|ui| {
                        if ui.button(preset.name).clicked() {
                            chosen = Some(preset);
                        }
                        ui.monospace(preset.equation);
                    });
                }
            });
        self.show_examples = open;

        if let Some(preset) = chosen {
            self.form = preset.to_request(self.form.resolution, self.form.config);
            self.show_examples = false;
            self.solve();
        }
    }

    fn help_window(&mut self, ctx: &egui::Context) {
        egui::Window::new("Help")
            .open(&mut self.show_help)
            .show(ctx, |ui| {
                ui.label(HELP);
            });
    }
}

impl eframe::App for OdeApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::SidePanel::left("form")
            .resizable(true)
            .default_width(380.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    self.equation_ui(ui);
                    ui.separator();
                    self.parameters_ui(ui);
                    ui.separator();
                    self.problem_ui(ui);
                    ui.separator();
                    self.integrator_ui(ui);
                    ui.separator();
                    ui.horizontal(|ui| {
                        if ui.button("Solve").clicked() {
                            self.solve();
                        }
                        if ui.button("Clear").clicked() {
                            self.clear();
                        }
                        if ui.button("Examples").clicked() {
                            self.show_examples = true;
                        }
                        if ui.button("Help").clicked() {
                            self.show_help = true;
                        }
                    });
                    ui.separator();
                    self.status_ui(ui);
                });
            });

        egui::CentralPanel::default().show(ctx, |ui| self.plot.show(ui));

        self.examples_window(ctx);
        self.help_window(ctx);
    }
}
