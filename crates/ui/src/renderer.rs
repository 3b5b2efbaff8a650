use egui::{Align2, CornerRadius, FontFamily, FontId, Pos2, Rect, Stroke, StrokeKind};
use subline_protocol::{RenderCommand, TextAlign, ThemeToken};

use crate::theme::{self, ThemeMode};

/// Screen area of one subtitle's rect, for hover feedback.
pub struct HitRegion {
    pub rect: Rect,
    pub subtitle_id: u64,
}

/// Result of rendering a command list: includes hit regions for interaction.
pub struct RenderResult {
    pub hit_regions: Vec<HitRegion>,
}

/// Render a list of `RenderCommand` into an egui `Painter`.
///
/// `offset` is the top-left pixel position of the rendering area. Text
/// positions are baselines.
pub fn render_commands(
    painter: &mut egui::Painter,
    commands: &[RenderCommand],
    offset: Pos2,
    mode: ThemeMode,
) -> RenderResult {
    let mut clip_stack: Vec<Rect> = Vec::new();
    let mut hit_regions: Vec<HitRegion> = Vec::new();
    let to_rect = |r: &subline_protocol::Rect| {
        Rect::from_min_size(
            Pos2::new(r.x as f32 + offset.x, r.y as f32 + offset.y),
            egui::vec2(r.w as f32, r.h as f32),
        )
    };

    for cmd in commands {
        match cmd {
            RenderCommand::ClearRect { rect } => {
                painter.rect_filled(
                    to_rect(rect),
                    CornerRadius::ZERO,
                    theme::resolve(ThemeToken::RulerBackground, mode),
                );
            }

            RenderCommand::DrawRect {
                rect,
                color,
                border_color,
                label,
                subtitle_id,
            } => {
                let egui_rect = to_rect(rect);
                if egui_rect.width() < 0.5 || egui_rect.height() < 0.5 {
                    continue;
                }
                // Cull off-screen
                if !painter.clip_rect().intersects(egui_rect) {
                    continue;
                }

                painter.rect_filled(egui_rect, CornerRadius::same(2), theme::resolve(*color, mode));
                if let Some(bc) = border_color {
                    painter.rect_stroke(
                        egui_rect,
                        CornerRadius::same(2),
                        Stroke::new(1.0, theme::resolve(*bc, mode)),
                        StrokeKind::Inside,
                    );
                }

                // Draw label text inside the rect
                if let Some(label_text) = label {
                    let label_str: &str = label_text;
                    if !label_str.is_empty() && egui_rect.width() > 6.0 {
                        let text_color = theme::resolve(ThemeToken::BandText, mode);
                        let text_rect = egui_rect.shrink2(egui::vec2(3.0, 0.0));
                        let galley = painter.layout_no_wrap(
                            label_str.to_string(),
                            FontId::proportional(12.0),
                            text_color,
                        );
                        let text_pos = Pos2::new(
                            text_rect.left(),
                            text_rect.center().y - galley.size().y / 2.0,
                        );
                        painter
                            .with_clip_rect(text_rect.intersect(painter.clip_rect()))
                            .galley(text_pos, galley, text_color);
                    }
                }

                if let Some(id) = subtitle_id {
                    hit_regions.push(HitRegion {
                        rect: egui_rect,
                        subtitle_id: *id,
                    });
                }
            }

            RenderCommand::DrawText {
                position,
                text,
                color,
                font_size,
                bold,
                align,
            } => {
                let size = *font_size as f32;
                if size < 1.0 {
                    continue;
                }
                let anchor = match align {
                    TextAlign::Left => Align2::LEFT_BOTTOM,
                    TextAlign::Center => Align2::CENTER_BOTTOM,
                    TextAlign::Right => Align2::RIGHT_BOTTOM,
                };
                // egui has no bold weight in the default fonts; monospace reads
                // heavier at small sizes.
                let family = if *bold {
                    FontFamily::Monospace
                } else {
                    FontFamily::Proportional
                };
                painter.text(
                    Pos2::new(position.x as f32 + offset.x, position.y as f32 + offset.y),
                    anchor,
                    text.as_str(),
                    FontId::new(size, family),
                    theme::resolve(*color, mode),
                );
            }

            RenderCommand::DrawLine {
                from,
                to,
                color,
                width,
            } => {
                let p1 = Pos2::new(from.x as f32 + offset.x, from.y as f32 + offset.y);
                let p2 = Pos2::new(to.x as f32 + offset.x, to.y as f32 + offset.y);
                painter.line_segment(
                    [p1, p2],
                    Stroke::new(*width as f32, theme::resolve(*color, mode)),
                );
            }

            RenderCommand::SetClip { rect } => {
                clip_stack.push(painter.clip_rect());
                let intersected = painter.clip_rect().intersect(to_rect(rect));
                painter.set_clip_rect(intersected);
            }

            RenderCommand::ClearClip => {
                if let Some(prev) = clip_stack.pop() {
                    painter.set_clip_rect(prev);
                }
            }

            RenderCommand::BeginGroup { .. } | RenderCommand::EndGroup => {
                // Groups are semantic only
            }
        }
    }

    RenderResult { hit_regions }
}
