use egui::{Align2, Color32, Context, RichText};

use crate::view::render::UiFrame;

/// Which full-screen panel is showing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Overlay {
    /// Paused, waiting for a click to grab the pointer
    Blocker,
    /// Playing with the pointer grabbed; shows the controls hint
    Playing,
    /// Pointer grab is unavailable; playing without it
    PointerLockError,
    GameOver { score: String },
}

/// Everything the HUD shows. Written by the frame driver and the termination
/// hook, read once per frame by [`build_ui`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HudState {
    pub overlay: Overlay,
    pub score: String,
}

impl Default for HudState {
    fn default() -> Self {
        Self {
            overlay: Overlay::Blocker,
            score: "0.000".to_string(),
        }
    }
}

impl HudState {
    pub fn game_over(&mut self, score: String) {
        self.score = score.clone();
        self.overlay = Overlay::GameOver { score };
    }
}

/// Build the complete UI and return egui output
pub fn build_ui(egui_ctx: &Context, raw_input: egui::RawInput, hud: &HudState) -> egui::FullOutput {
    egui_ctx.run(raw_input, |ctx| {
        draw_crosshair(ctx);
        draw_score_bar(ctx, &hud.score);
        match &hud.overlay {
            Overlay::Blocker => draw_blocker(ctx),
            Overlay::Playing => draw_message(ctx, None),
            Overlay::PointerLockError => draw_message(
                ctx,
                Some("Your platform does not support pointer lock. Press ESC to pause."),
            ),
            Overlay::GameOver { score } => draw_game_over(ctx, score),
        }
    })
}

/// Run the UI and tessellate it for the renderer. The platform output is
/// returned for hosts that forward it (cursor icon, clipboard).
pub fn prepare_frame(
    egui_ctx: &Context,
    raw_input: egui::RawInput,
    hud: &HudState,
    pixels_per_point: f32,
) -> (UiFrame, egui::PlatformOutput) {
    let mut output = build_ui(egui_ctx, raw_input, hud);
    let primitives = egui_ctx.tessellate(std::mem::take(&mut output.shapes), pixels_per_point);
    let frame = UiFrame {
        primitives,
        textures_delta: output.textures_delta,
        pixels_per_point,
    };
    (frame, output.platform_output)
}

fn draw_crosshair(ctx: &Context) {
    let painter = ctx.layer_painter(egui::LayerId::new(egui::Order::TOP, egui::Id::new("crosshair")));
    let center = ctx.available_rect().center();
    let size = 10.0;
    let stroke = egui::Stroke::new(1.0, Color32::WHITE);
    painter.line_segment(
        [egui::pos2(center.x - size, center.y), egui::pos2(center.x + size, center.y)],
        stroke,
    );
    painter.line_segment(
        [egui::pos2(center.x, center.y - size), egui::pos2(center.x, center.y + size)],
        stroke,
    );
}

fn draw_score_bar(ctx: &Context, score: &str) {
    egui::Area::new(egui::Id::new("score_bar"))
        .anchor(Align2::CENTER_TOP, [0.0, 8.0])
        .show(ctx, |ui| {
            ui.label(RichText::new(score).size(24.0).strong().color(Color32::WHITE));
        });
}

fn draw_blocker(ctx: &Context) {
    let painter = ctx.layer_painter(egui::LayerId::new(egui::Order::Background, egui::Id::new("blocker")));
    painter.rect_filled(ctx.available_rect(), 0.0, Color32::from_black_alpha(128));

    egui::Area::new(egui::Id::new("instructions"))
        .anchor(Align2::CENTER_CENTER, [0.0, 0.0])
        .show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                ui.label(RichText::new("Click to play").size(36.0).color(Color32::WHITE));
                ui.label(RichText::new("Move: A, D    Look: MOUSE    Fire: hold CLICK").color(Color32::WHITE));
                ui.label(
                    RichText::new("Keep the falling bricks from sliding off the far edge")
                        .small()
                        .color(Color32::LIGHT_GRAY),
                );
            });
        });
}

fn draw_message(ctx: &Context, error: Option<&str>) {
    egui::Area::new(egui::Id::new("message"))
        .anchor(Align2::LEFT_BOTTOM, [8.0, -8.0])
        .show(ctx, |ui| {
            if let Some(error) = error {
                ui.label(RichText::new(error).color(Color32::from_rgb(255, 200, 80)));
            }
            ui.label(RichText::new("A / D strafe, hold click to fire").small().color(Color32::WHITE));
        });
}

fn draw_game_over(ctx: &Context, score: &str) {
    let painter = ctx.layer_painter(egui::LayerId::new(egui::Order::Background, egui::Id::new("game_over")));
    painter.rect_filled(ctx.available_rect(), 0.0, Color32::from_black_alpha(160));

    egui::Area::new(egui::Id::new("game_over_text"))
        .anchor(Align2::CENTER_CENTER, [0.0, 0.0])
        .show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                ui.label(RichText::new("GAME OVER").size(48.0).strong().color(Color32::RED));
                ui.label(RichText::new(format!("Score: {score}")).size(24.0).color(Color32::WHITE));
                ui.label(RichText::new("Reload to play again").small().color(Color32::LIGHT_GRAY));
            });
        });
}
