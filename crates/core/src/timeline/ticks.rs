use subline_protocol::{Point, Rect, RenderCommand, SharedStr, TextAlign, ThemeToken};

use super::window::TimeWindow;

/// Each second is split into this many divisions by minor ticks.
const DIVISIONS: u32 = 4;
/// Distance from the bottom edge to the label baseline / tick base.
const BASELINE_INSET: f64 = 5.0;
const MINOR_TICK_LENGTH: f64 = 10.0;
const MIDPOINT_TICK_LENGTH: f64 = 15.0;

/// Render the seconds ruler.
///
/// Clears `width × height`, then for every whole second in the window draws
/// its label (except at 0) centered on the second's position, and three minor
/// ticks at the quarter marks, the half-second tick taller than the others.
pub fn render_ticks(window: &TimeWindow, width: f64, height: f64) -> Vec<RenderCommand> {
    let mut commands = vec![RenderCommand::ClearRect {
        rect: Rect::new(0.0, 0.0, width, height),
    }];
    if window.is_empty() {
        return commands;
    }

    let baseline = height - BASELINE_INSET;
    let font_size = height / 5.0;
    let step = window.pixels_per_second / f64::from(DIVISIONS);

    commands.push(RenderCommand::BeginGroup {
        id: "ruler".into(),
        label: Some("Ruler".into()),
    });

    let mut t = window.start_time.floor();
    while t < window.end_time {
        let x = window.time_to_x(t);

        if t > 0.0 {
            commands.push(RenderCommand::DrawText {
                position: Point::new(x, baseline),
                text: SharedStr::from(format!("{t:.0}")),
                color: ThemeToken::TickLabel,
                font_size,
                bold: true,
                align: TextAlign::Center,
            });
        }

        for i in 1..DIVISIONS {
            // Snap to the pixel center so 1px lines stay crisp.
            let tick_x = (0.5 + x + step * f64::from(i)).floor() + 0.5;
            let length = if i == DIVISIONS / 2 {
                MIDPOINT_TICK_LENGTH
            } else {
                MINOR_TICK_LENGTH
            };
            commands.push(RenderCommand::DrawLine {
                from: Point::new(tick_x, baseline),
                to: Point::new(tick_x, baseline - length),
                color: ThemeToken::TickLine,
                width: 1.0,
            });
        }

        t += 1.0;
    }

    commands.push(RenderCommand::EndGroup);
    commands
}
