//! SVG renderer: converts `RenderCommand` lists into standalone SVG strings.

use subline_protocol::{RenderCommand, TextAlign, ThemeToken};

/// One command list drawn at a vertical offset, e.g. the ruler at 0 and the
/// band strip below it.
pub struct Layer<'a> {
    pub y: f64,
    pub commands: &'a [RenderCommand],
}

/// Render a list of commands as an SVG document string.
///
/// `width` and `height` define the SVG viewBox dimensions.
/// `dark` selects the color palette.
pub fn render_svg(commands: &[RenderCommand], width: f64, height: f64, dark: bool) -> String {
    render_layers(&[Layer { y: 0.0, commands }], width, height, dark)
}

/// Render several command lists into one SVG document.
pub fn render_layers(layers: &[Layer<'_>], width: f64, height: f64, dark: bool) -> String {
    let total: usize = layers.iter().map(|l| l.commands.len()).sum();
    let mut svg = String::with_capacity(total * 160 + 256);
    svg.push_str(&format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {width} {height}" width="{width}" height="{height}" style="font-family:system-ui,-apple-system,sans-serif;font-size:11px">"#,
    ));
    svg.push_str(&format!(
        r#"<rect width="{width}" height="{height}" fill="{}"/>"#,
        resolve_color(ThemeToken::Background, dark),
    ));

    for layer in layers {
        svg.push_str(&format!(r#"<g transform="translate(0,{})">"#, layer.y));
        for cmd in layer.commands {
            push_command(&mut svg, cmd, dark);
        }
        svg.push_str("</g>");
    }

    svg.push_str("</svg>");
    svg
}

fn push_command(svg: &mut String, cmd: &RenderCommand, dark: bool) {
    match cmd {
        RenderCommand::ClearRect { rect } => {
            svg.push_str(&format!(
                r#"<rect x="{}" y="{}" width="{}" height="{}" fill="{}"/>"#,
                rect.x,
                rect.y,
                rect.w,
                rect.h,
                resolve_color(ThemeToken::RulerBackground, dark),
            ));
        }
        RenderCommand::DrawRect {
            rect,
            color,
            border_color,
            label,
            ..
        } => {
            let fill = resolve_color(*color, dark);
            let stroke = border_color
                .map(|b| format!(r#" stroke="{}" stroke-width="1""#, resolve_color(b, dark)))
                .unwrap_or_default();
            svg.push_str(&format!(
                r#"<rect x="{}" y="{}" width="{}" height="{}" fill="{fill}"{stroke} rx="2">"#,
                rect.x, rect.y, rect.w, rect.h,
            ));
            if let Some(label) = label {
                svg.push_str(&format!("<title>{}</title>", escape_xml(label)));
            }
            svg.push_str("</rect>");

            // Render text label if rect is wide enough
            if let Some(label) = label
                && rect.w > 20.0
            {
                let tx = rect.x + 3.0;
                let ty = rect.y + rect.h * 0.6;
                let max_chars = (rect.w / 7.0) as usize;
                let text = if label.chars().count() > max_chars && max_chars > 2 {
                    let truncated: String = label.chars().take(max_chars - 1).collect();
                    format!("{truncated}…")
                } else {
                    label.to_string()
                };
                svg.push_str(&format!(
                    r#"<text x="{tx}" y="{ty}" fill="{}" style="pointer-events:none">{}</text>"#,
                    resolve_color(ThemeToken::BandText, dark),
                    escape_xml(&text),
                ));
            }
        }
        RenderCommand::DrawLine {
            from,
            to,
            color,
            width: line_width,
        } => {
            let stroke = resolve_color(*color, dark);
            svg.push_str(&format!(
                r#"<line x1="{}" y1="{}" x2="{}" y2="{}" stroke="{stroke}" stroke-width="{line_width}"/>"#,
                from.x, from.y, to.x, to.y,
            ));
        }
        RenderCommand::DrawText {
            text,
            position,
            color,
            font_size,
            bold,
            align,
        } => {
            let fill = resolve_color(*color, dark);
            let anchor = match align {
                TextAlign::Left => "start",
                TextAlign::Center => "middle",
                TextAlign::Right => "end",
            };
            let weight = if *bold { r#" font-weight="bold""# } else { "" };
            svg.push_str(&format!(
                r#"<text x="{}" y="{}" fill="{fill}" font-size="{font_size}" text-anchor="{anchor}"{weight}>{}</text>"#,
                position.x,
                position.y,
                escape_xml(text),
            ));
        }
        // Clip and group commands don't affect static SVG output
        _ => {}
    }
}

fn resolve_color(token: ThemeToken, dark: bool) -> &'static str {
    if dark {
        match token {
            ThemeToken::Background | ThemeToken::RulerBackground => "#181818",
            ThemeToken::Surface => "#222222",
            ThemeToken::Border | ThemeToken::BandBorder => "#303030",
            ThemeToken::TextPrimary | ThemeToken::TickLabel | ThemeToken::BandText => "#ececec",
            ThemeToken::TextSecondary | ThemeToken::TextMuted => "#9e9e9e",
            ThemeToken::TickLine => "#757575",
            ThemeToken::BandFill => "#3949ab",
            ThemeToken::BandHandle => "#7986cb",
            ThemeToken::BandDragging => "#ffa726",
            ThemeToken::SelectionHighlight => "#448aff",
        }
    } else {
        match token {
            ThemeToken::Background | ThemeToken::RulerBackground => "#f8f9fa",
            ThemeToken::Surface => "#ffffff",
            ThemeToken::Border | ThemeToken::BandBorder => "#dee2e6",
            ThemeToken::TextPrimary | ThemeToken::TickLabel | ThemeToken::BandText => "#1a1a2e",
            ThemeToken::TextSecondary | ThemeToken::TextMuted => "#666677",
            ThemeToken::TickLine => "#999999",
            ThemeToken::BandFill => "#a5d8ff",
            ThemeToken::BandHandle => "#457b9d",
            ThemeToken::BandDragging => "#f4845f",
            ThemeToken::SelectionHighlight => "#ffd60a",
        }
    }
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
