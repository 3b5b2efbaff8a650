use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use subline_protocol::{RenderCommand, TextAlign, ThemeToken};

/// Timeline pixels covered by one terminal column.
pub const CELL_WIDTH: f64 = 10.0;

pub fn theme_to_color(token: ThemeToken) -> Color {
    match token {
        ThemeToken::Background => Color::Black,
        ThemeToken::Surface => Color::Black,
        ThemeToken::Border => Color::DarkGray,
        ThemeToken::TextPrimary => Color::White,
        ThemeToken::TextSecondary => Color::Gray,
        ThemeToken::TextMuted => Color::DarkGray,
        ThemeToken::RulerBackground => Color::Rgb(24, 24, 37),
        ThemeToken::TickLine => Color::Gray,
        ThemeToken::TickLabel => Color::White,
        ThemeToken::BandFill => Color::Rgb(40, 70, 130),
        ThemeToken::BandBorder => Color::Rgb(80, 120, 200),
        ThemeToken::BandText => Color::White,
        ThemeToken::BandHandle => Color::LightBlue,
        ThemeToken::BandDragging => Color::Rgb(170, 100, 40),
        ThemeToken::SelectionHighlight => Color::Green,
    }
}

/// Column of the cell containing timeline pixel `x`.
pub fn column_of(x: f64) -> i64 {
    (x / CELL_WIDTH).floor() as i64
}

/// Timeline pixel at the center of column `col`.
pub fn x_of(col: u16) -> f64 {
    (f64::from(col) + 0.5) * CELL_WIDTH
}

fn cell_at(buf: &mut Buffer, area: Rect, col: i64, row: u16) -> Option<&mut ratatui::buffer::Cell> {
    let col = u16::try_from(col).ok()?;
    if col >= area.width || row >= area.height {
        return None;
    }
    Some(&mut buf[(area.x + col, area.y + row)])
}

/// Paint the ruler into a two-row area: tick marks above, second labels below.
pub fn paint_ruler(buf: &mut Buffer, area: Rect, commands: &[RenderCommand]) {
    for cmd in commands {
        match cmd {
            RenderCommand::ClearRect { .. } => {
                let bg = theme_to_color(ThemeToken::RulerBackground);
                for row in 0..area.height {
                    for col in 0..area.width {
                        if let Some(cell) = cell_at(buf, area, i64::from(col), row) {
                            cell.set_char(' ').set_bg(bg);
                        }
                    }
                }
            }
            RenderCommand::DrawLine {
                from, to, color, ..
            } => {
                let tall = (from.y - to.y).abs() > 12.0;
                if let Some(cell) = cell_at(buf, area, column_of(from.x), 0) {
                    cell.set_char(if tall { '┃' } else { '╷' })
                        .set_fg(theme_to_color(*color));
                }
            }
            RenderCommand::DrawText {
                position,
                text,
                color,
                bold,
                align,
                ..
            } => {
                let len = text.chars().count() as i64;
                let anchor = column_of(position.x);
                let start = match align {
                    TextAlign::Left => anchor,
                    TextAlign::Center => anchor - len / 2,
                    TextAlign::Right => anchor - len + 1,
                };
                let mut style = Style::default().fg(theme_to_color(*color));
                if *bold {
                    style = style.add_modifier(Modifier::BOLD);
                }
                let row = area.height.saturating_sub(1);
                for (i, ch) in text.chars().enumerate() {
                    if let Some(cell) = cell_at(buf, area, start + i as i64, row) {
                        cell.set_char(ch).set_style(style);
                    }
                }
            }
            _ => {}
        }
    }
}

/// Paint subtitle bands across every row of `area`, labels on the middle row.
pub fn paint_bands(buf: &mut Buffer, area: Rect, commands: &[RenderCommand]) {
    let middle = area.height / 2;
    for cmd in commands {
        let RenderCommand::DrawRect {
            rect,
            color,
            border_color,
            label,
            subtitle_id: Some(_),
        } = cmd
        else {
            continue;
        };
        let first = column_of(rect.x);
        let last = column_of(rect.right() - 0.01).max(first);

        match (color, border_color, label) {
            // Handles
            (ThemeToken::BandHandle, _, _) => {
                let col = column_of(rect.x + rect.w / 2.0);
                for row in 0..area.height {
                    if let Some(cell) = cell_at(buf, area, col, row) {
                        cell.set_char('┃').set_fg(theme_to_color(ThemeToken::BandHandle));
                    }
                }
            }
            // Body with its label
            (_, None, Some(label)) => {
                let bg = theme_to_color(*color);
                let fg = theme_to_color(ThemeToken::BandText);
                let width = (last - first + 1).max(0) as usize;
                for (i, ch) in label.chars().take(width).enumerate() {
                    if let Some(cell) = cell_at(buf, area, first + i as i64, middle) {
                        cell.set_char(ch).set_fg(fg).set_bg(bg);
                    }
                }
            }
            // Full band
            _ => {
                let bg = theme_to_color(*color);
                for col in first..=last {
                    for row in 0..area.height {
                        if let Some(cell) = cell_at(buf, area, col, row) {
                            cell.set_char(' ').set_bg(bg);
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use subline_protocol::{Point, Rect as PxRect};

    use super::*;

    fn row(buf: &Buffer, y: u16) -> String {
        (0..buf.area.width).map(|x| buf[(x, y)].symbol()).collect()
    }

    #[test]
    fn pixel_column_mapping() {
        assert_eq!(column_of(0.0), 0);
        assert_eq!(column_of(9.99), 0);
        assert_eq!(column_of(10.0), 1);
        assert_eq!(column_of(-1.0), -1);
        assert_eq!(x_of(3), 35.0);
    }

    #[test]
    fn ruler_ticks_and_centered_label() {
        let area = Rect::new(0, 0, 12, 2);
        let mut buf = Buffer::empty(area);
        let cmds = vec![
            RenderCommand::ClearRect {
                rect: PxRect::new(0.0, 0.0, 120.0, 65.0),
            },
            RenderCommand::DrawText {
                position: Point::new(50.0, 60.0),
                text: "12".into(),
                color: ThemeToken::TickLabel,
                font_size: 13.0,
                bold: true,
                align: TextAlign::Center,
            },
            RenderCommand::DrawLine {
                from: Point::new(75.5, 60.0),
                to: Point::new(75.5, 45.0),
                color: ThemeToken::TickLine,
                width: 1.0,
            },
            RenderCommand::DrawLine {
                from: Point::new(100.5, 60.0),
                to: Point::new(100.5, 50.0),
                color: ThemeToken::TickLine,
                width: 1.0,
            },
        ];
        paint_ruler(&mut buf, area, &cmds);

        assert_eq!(row(&buf, 0), "       ┃  ╷ ");
        assert_eq!(row(&buf, 1), "    12      ");
        assert!(buf[(4, 1)].modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn band_fill_label_and_handles() {
        let area = Rect::new(0, 0, 10, 3);
        let mut buf = Buffer::empty(area);
        let id = Some(7);
        let cmds = vec![
            RenderCommand::DrawRect {
                rect: PxRect::new(10.0, 4.0, 60.0, 40.0),
                color: ThemeToken::BandFill,
                border_color: Some(ThemeToken::BandBorder),
                label: None,
                subtitle_id: id,
            },
            RenderCommand::DrawRect {
                rect: PxRect::new(20.0, 4.0, 40.0, 40.0),
                color: ThemeToken::BandFill,
                border_color: None,
                label: Some("Hello there".into()),
                subtitle_id: id,
            },
            RenderCommand::DrawRect {
                rect: PxRect::new(10.0, 4.0, 10.0, 40.0),
                color: ThemeToken::BandHandle,
                border_color: None,
                label: None,
                subtitle_id: id,
            },
            RenderCommand::DrawRect {
                rect: PxRect::new(60.0, 4.0, 10.0, 40.0),
                color: ThemeToken::BandHandle,
                border_color: None,
                label: None,
                subtitle_id: id,
            },
        ];
        paint_bands(&mut buf, area, &cmds);

        assert_eq!(row(&buf, 0), " ┃    ┃   ");
        assert_eq!(row(&buf, 1), " ┃Hell┃   ");
        assert_eq!(buf[(3, 0)].bg, theme_to_color(ThemeToken::BandFill));
        assert_eq!(buf[(8, 0)].bg, Color::Reset);
    }
}
