use std::cell::Cell;
use std::rc::Rc;

use anyhow::Context as _;
use eframe::egui;
use subline_core::controllers::ListStatus;
use subline_core::model::{JsonDocument, JsonDocumentParser};
use subline_core::storage::{MemoryStorage, SubtitleStorage};
use subline_core::timeline::band_label;
use subline_core::{Editor, TimelineConfig};
use subline_protocol::ThemeToken;

use crate::renderer;
use crate::theme::{self, ThemeMode};

const DEMO_EN: &str = include_str!("../assets/demo-en.json");
const DEMO_FR: &str = include_str!("../assets/demo-fr.json");

/// Video id used for documents opened from disk or the demo.
const LOCAL_VIDEO: &str = "local";

/// Format milliseconds as `m:ss.cc`.
fn format_ms(ms: f64) -> String {
    let total = (ms / 10.0).round().max(0.0) as u64;
    let (cs, secs) = (total % 100, total / 100);
    format!("{}:{:02}.{cs:02}", secs / 60, secs % 60)
}

/// Row currently open in the text editor.
struct RowDraft {
    index: usize,
    original: String,
    text: String,
}

/// Main application state.
pub struct SublineApp {
    editor: Editor,
    storage: Rc<MemoryStorage>,
    theme_mode: ThemeMode,
    draft: Option<RowDraft>,
    playing: bool,
    /// Error message to display.
    error: Option<String>,
    /// Status line after the last save.
    notice: Option<String>,
}

impl SublineApp {
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        cc.egui_ctx.set_visuals(theme::mocha_dark_visuals());
        theme::apply_typography(&cc.egui_ctx);

        let storage = Rc::new(MemoryStorage::new());
        storage.add_language("fr", "Français", false);
        storage.add_version("fr", 1, DEMO_FR);
        let editor = Editor::new(
            storage.clone(),
            Rc::new(JsonDocumentParser),
            TimelineConfig::default(),
        );

        let mut app = Self {
            editor,
            storage,
            theme_mode: ThemeMode::Dark,
            draft: None,
            playing: false,
            error: None,
            notice: None,
        };
        if let Err(e) = app.load_document(DEMO_EN) {
            app.error = Some(format!("{e:#}"));
        }
        app
    }

    /// Publish `raw` as the newest version of its language and edit it.
    fn load_document(&mut self, raw: &str) -> anyhow::Result<()> {
        let doc = JsonDocument::from_json(raw).context("not a subtitle document")?;
        let code = doc.language.clone().unwrap_or_else(|| "en".to_string());
        let end_ms = doc.subtitles.iter().map(|c| c.end).fold(0.0, f64::max);

        self.storage.add_language(&code, &code, true);
        let latest = Rc::new(Cell::new(0));
        let sink = Rc::clone(&latest);
        let wanted = code.clone();
        self.storage.get_languages(Box::new(move |result| {
            let newest = result.ok().and_then(|languages| {
                languages
                    .iter()
                    .find(|l| l.code == wanted)
                    .and_then(|l| l.versions.iter().map(|v| v.number).max())
            });
            sink.set(newest.unwrap_or(0));
        }));
        let version = latest.get() + 1;
        self.storage.add_version(&code, version, raw);
        log::info!("loaded {code} v{version} ({} cues)", doc.subtitles.len());

        self.draft = None;
        self.playing = false;
        let clock = self.editor.clock_mut();
        clock.set_duration(end_ms / 1000.0 + 2.0);
        clock.set_current_time(0.0);
        self.editor.load_working(LOCAL_VIDEO, &code, version);
        self.editor.load_reference_languages();
        self.editor.pump();

        if let ListStatus::Failed(reason) = self.editor.working().status() {
            anyhow::bail!("failed to load subtitles: {reason}");
        }
        self.error = None;
        Ok(())
    }

    fn set_theme(&mut self, ctx: &egui::Context, mode: ThemeMode) {
        self.theme_mode = mode;
        ctx.set_visuals(match mode {
            ThemeMode::Dark => theme::mocha_dark_visuals(),
            ThemeMode::Light => theme::light_visuals(),
        });
    }

    fn open_row(&mut self, index: usize) {
        self.close_row();
        match self.editor.start_editing(index) {
            Ok(raw) => {
                if let Some(item) = self.editor.working().item(index) {
                    let start = item.start_time / 1000.0;
                    self.editor.clock_mut().set_current_time(start);
                }
                self.draft = Some(RowDraft {
                    index,
                    original: raw.clone(),
                    text: raw,
                });
            }
            Err(e) => self.error = Some(e.to_string()),
        }
    }

    fn close_row(&mut self) {
        if let Some(draft) = self.draft.take() {
            if let Err(e) = self.editor.finish_editing(&draft.text) {
                self.error = Some(e.to_string());
            }
        }
    }

    fn cancel_row(&mut self) {
        if let Some(draft) = self.draft.take() {
            if let Err(e) = self.editor.finish_editing(&draft.original) {
                self.error = Some(e.to_string());
            }
        }
    }

    fn save(&mut self) {
        self.close_row();
        match self.editor.save_session() {
            Ok(()) => {
                self.editor.pump();
                self.notice = Some(format!("Saved {} version(s)", self.storage.saved().len()));
            }
            Err(e) => self.error = Some(format!("Save failed: {e}")),
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn open_file(&mut self) {
        let Some(path) = rfd::FileDialog::new()
            .add_filter("Subtitles", &["json"])
            .pick_file()
        else {
            return;
        };
        let result = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))
            .and_then(|raw| self.load_document(&raw));
        if let Err(e) = result {
            self.error = Some(format!("{e:#}"));
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn export_file(&mut self) {
        let Some(saved) = self.storage.saved().pop() else {
            return;
        };
        let Some(path) = rfd::FileDialog::new()
            .add_filter("Subtitles", &["json"])
            .set_file_name(format!("{}.json", saved.language_code))
            .save_file()
        else {
            return;
        };
        if let Err(e) = std::fs::write(&path, saved.document) {
            self.error = Some(format!("Failed to write {}: {e}", path.display()));
        }
    }

    fn handle_keys(&mut self, ctx: &egui::Context) {
        if ctx.wants_keyboard_input() {
            return;
        }
        let (toggle, back, forward, zoom_in, zoom_out, escape, save) = ctx.input(|i| {
            (
                i.key_pressed(egui::Key::Space),
                i.key_pressed(egui::Key::ArrowLeft),
                i.key_pressed(egui::Key::ArrowRight),
                i.key_pressed(egui::Key::Plus) || i.key_pressed(egui::Key::Equals),
                i.key_pressed(egui::Key::Minus),
                i.key_pressed(egui::Key::Escape),
                i.modifiers.command && i.key_pressed(egui::Key::S),
            )
        });
        let clock = self.editor.clock_mut();
        if toggle {
            self.playing = !self.playing;
        }
        if back {
            let t = clock.current_time() - 1.0;
            clock.set_current_time(t);
        }
        if forward {
            clock.advance(1.0);
        }
        if zoom_in {
            let s = (clock.scale() * 1.25).min(8.0);
            clock.set_scale(s);
        }
        if zoom_out {
            let s = (clock.scale() / 1.25).max(0.125);
            clock.set_scale(s);
        }
        if escape {
            self.editor.pointer_leave();
        }
        if save && self.editor.can_save() {
            self.save();
        }
    }

    fn toolbar(&mut self, ctx: &egui::Context, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.heading("subline");
            ui.separator();

            #[cfg(not(target_arch = "wasm32"))]
            {
                if ui.button("Open").clicked() {
                    self.open_file();
                }
                if ui
                    .add_enabled(!self.storage.saved().is_empty(), egui::Button::new("Export"))
                    .clicked()
                {
                    self.export_file();
                }
            }

            if ui
                .add_enabled(self.editor.can_save(), egui::Button::new("Save"))
                .clicked()
            {
                self.save();
            }

            ui.separator();

            let play_label = if self.playing { "Pause" } else { "Play" };
            if ui.button(play_label).clicked() {
                self.playing = !self.playing;
            }

            let duration = self.editor.clock().duration();
            let mut time = self.editor.clock().current_time();
            if ui
                .add(egui::Slider::new(&mut time, 0.0..=duration.max(0.0)).text("s"))
                .changed()
            {
                self.editor.clock_mut().set_current_time(time);
            }

            let mut scale = self.editor.clock().scale();
            if ui
                .add(
                    egui::Slider::new(&mut scale, 0.125..=8.0)
                        .logarithmic(true)
                        .text("zoom"),
                )
                .changed()
            {
                self.editor.clock_mut().set_scale(scale);
            }

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                let theme_label = match self.theme_mode {
                    ThemeMode::Dark => "Dark",
                    ThemeMode::Light => "Light",
                };
                if ui.button(theme_label).clicked() {
                    let next = match self.theme_mode {
                        ThemeMode::Dark => ThemeMode::Light,
                        ThemeMode::Light => ThemeMode::Dark,
                    };
                    self.set_theme(ctx, next);
                }
            });
        });
    }

    fn working_panel(&mut self, ui: &mut egui::Ui) {
        ui.heading("Editing");
        let rows: Vec<(usize, String)> = self
            .editor
            .working()
            .items()
            .iter()
            .map(|item| {
                (
                    item.index,
                    format!("{}  {}", format_ms(item.start_time), band_label(&item.text)),
                )
            })
            .collect();
        let selected = self.editor.working().selected_index();

        let mut clicked = None;
        egui::ScrollArea::vertical()
            .id_salt("working_rows")
            .max_height(ui.available_height() * 0.6)
            .show(ui, |ui| {
                for (index, label) in &rows {
                    if ui
                        .selectable_label(selected == Some(*index), label)
                        .clicked()
                    {
                        clicked = Some(*index);
                    }
                }
            });
        if let Some(index) = clicked {
            if self.draft.as_ref().map(|d| d.index) != Some(index) {
                self.open_row(index);
            }
        }

        let mut changed = None;
        let mut done = false;
        let mut cancel = false;
        if let Some(draft) = &mut self.draft {
            ui.separator();
            ui.label(format!("Row {}", draft.index + 1));
            if ui
                .add(egui::TextEdit::multiline(&mut draft.text).desired_rows(3))
                .changed()
            {
                changed = Some(draft.text.clone());
            }
            ui.horizontal(|ui| {
                done = ui.button("Done").clicked();
                cancel = ui.button("Cancel").clicked();
            });
        }
        if let Some(text) = changed {
            if let Err(e) = self.editor.text_changed(&text) {
                self.error = Some(e.to_string());
            }
        }
        if done {
            self.close_row();
        } else if cancel {
            self.cancel_row();
        }
    }

    fn reference_panel(&mut self, ui: &mut egui::Ui) {
        ui.heading("Reference");

        let languages: Vec<(String, String)> = self
            .editor
            .selector()
            .languages()
            .iter()
            .map(|l| (l.code.clone(), l.name.clone()))
            .collect();
        let current = self.editor.selector().language().map(|l| l.code.clone());
        let current_name = current
            .as_ref()
            .and_then(|c| languages.iter().find(|(code, _)| code == c))
            .map_or("None".to_string(), |(_, name)| name.clone());

        let mut picked_language = None;
        egui::ComboBox::from_id_salt("reference_language")
            .selected_text(current_name)
            .show_ui(ui, |ui| {
                for (code, name) in &languages {
                    if ui
                        .selectable_label(current.as_deref() == Some(code.as_str()), name)
                        .clicked()
                    {
                        picked_language = Some(code.clone());
                    }
                }
            });
        if let Some(code) = picked_language {
            self.editor.select_reference_language(&code);
        }

        let versions: Vec<u32> = self
            .editor
            .selector()
            .versions()
            .iter()
            .map(|v| v.number)
            .collect();
        let version = self.editor.selector().version();
        let mut picked_version = None;
        egui::ComboBox::from_id_salt("reference_version")
            .selected_text(version.map_or("None".to_string(), |v| format!("v{v}")))
            .show_ui(ui, |ui| {
                for number in &versions {
                    if ui
                        .selectable_label(version == Some(*number), format!("v{number}"))
                        .clicked()
                    {
                        picked_version = Some(*number);
                    }
                }
            });
        if let Some(number) = picked_version {
            self.editor.select_reference_version(number);
        }

        ui.separator();
        egui::ScrollArea::vertical()
            .id_salt("reference_rows")
            .show(ui, |ui| {
                for item in self.editor.reference().items() {
                    ui.label(format!(
                        "{}  {}",
                        format_ms(item.start_time),
                        band_label(&item.text)
                    ));
                }
            });
    }

    fn timeline(&mut self, ui: &mut egui::Ui) {
        let config = self.editor.timeline().config().clone();
        let strip_height = self.editor.timeline().band_strip_height();
        let height = (config.ruler_height + strip_height) as f32;
        let width = ui.available_width();
        let (rect, response) =
            ui.allocate_exact_size(egui::vec2(width, height), egui::Sense::click_and_drag());

        self.editor.clock_mut().set_viewport_width(f64::from(width));
        self.editor.pump();

        let band_top = rect.top() + config.ruler_height as f32;
        let to_local = |pos: egui::Pos2| (f64::from(pos.x - rect.left()), f64::from(pos.y - band_top));

        if response.drag_started() {
            // egui reports the drag once past its threshold; grab at the press point.
            let origin = ui
                .input(|i| i.pointer.press_origin())
                .or(response.interact_pointer_pos());
            if let Some(pos) = origin {
                let (x, y) = to_local(pos);
                self.editor.pointer_down(x, y);
            }
        }
        if response.dragged() && self.editor.timeline().is_dragging() {
            if let Some(pos) = response.interact_pointer_pos() {
                if rect.contains(pos) {
                    self.editor.pointer_move(to_local(pos).0);
                } else {
                    self.editor.pointer_leave();
                }
            }
        }
        if response.drag_stopped() {
            if let Err(e) = self.editor.pointer_up() {
                self.error = Some(format!("Retiming failed: {e}"));
            }
        }
        self.editor.pump();

        if self.editor.timeline().is_dragging() {
            ui.ctx().set_cursor_icon(egui::CursorIcon::Grabbing);
        }

        let mut painter = ui.painter_at(rect);
        painter.rect_filled(
            rect,
            egui::CornerRadius::ZERO,
            theme::resolve(ThemeToken::Background, self.theme_mode),
        );
        renderer::render_commands(
            &mut painter,
            self.editor.ruler_commands(),
            rect.min,
            self.theme_mode,
        );
        let bands = self.editor.band_commands();
        let result = renderer::render_commands(
            &mut painter,
            &bands,
            egui::pos2(rect.left(), band_top),
            self.theme_mode,
        );

        let window = self.editor.timeline().window();
        if !window.is_empty() {
            let x = rect.left() + window.time_to_x(self.editor.clock().current_time()) as f32;
            painter.line_segment(
                [egui::pos2(x, rect.top()), egui::pos2(x, rect.bottom())],
                egui::Stroke::new(
                    2.0,
                    theme::resolve(ThemeToken::SelectionHighlight, self.theme_mode),
                ),
            );
        }

        if let Some(hover) = response.hover_pos() {
            let hit = result.hit_regions.iter().find(|h| h.rect.contains(hover));
            let item = hit.and_then(|h| {
                self.editor
                    .working()
                    .items()
                    .iter()
                    .find(|i| i.id.0 == h.subtitle_id)
            });
            if let Some(item) = item {
                let tip = format!(
                    "{} to {}\n{}",
                    format_ms(item.start_time),
                    format_ms(item.end_time),
                    band_label(&item.text)
                );
                response.clone().on_hover_text_at_pointer(tip);
            }
        }
    }
}

impl eframe::App for SublineApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if self.editor.pump() {
            ctx.request_repaint();
        }

        self.handle_keys(ctx);
        if self.playing {
            let dt = f64::from(ctx.input(|i| i.stable_dt));
            self.editor.clock_mut().advance(dt);
            let clock = self.editor.clock();
            if clock.current_time() >= clock.duration() {
                self.playing = false;
            }
            ctx.request_repaint();
        }

        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| self.toolbar(ctx, ui));

        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if let Some(err) = &self.error {
                    ui.colored_label(ui.visuals().error_fg_color, err);
                } else {
                    let status = match self.editor.working().status() {
                        ListStatus::Idle => "Idle".to_string(),
                        ListStatus::Loading => "Loading".to_string(),
                        ListStatus::Ready => "Ready".to_string(),
                        ListStatus::Saving => "Saving".to_string(),
                        ListStatus::Failed(reason) => format!("Failed: {reason}"),
                    };
                    let window = self.editor.timeline().window();
                    ui.label(format!(
                        "{status} | {} cues | Viewing {:.1}s to {:.1}s | Zoom {:.0}%",
                        self.editor.working().items().len(),
                        window.start_time,
                        window.end_time,
                        self.editor.clock().scale() * 100.0,
                    ));
                    if let Some(notice) = &self.notice {
                        ui.separator();
                        ui.label(notice);
                    }
                }
            });
        });

        egui::SidePanel::right("reference")
            .default_width(280.0)
            .show(ctx, |ui| self.reference_panel(ui));

        egui::SidePanel::left("working")
            .default_width(320.0)
            .show(ctx, |ui| self.working_panel(ui));

        egui::CentralPanel::default().show(ctx, |ui| {
            self.timeline(ui);
            ui.add_space(8.0);
            ui.label("Drag a band to move it; drag its edges to change start or end.");
        });

        // Handle file drop
        let dropped: Option<Vec<u8>> = ctx.input(|i| {
            i.raw
                .dropped_files
                .first()
                .and_then(|f| f.bytes.as_ref().map(|b| b.to_vec()))
        });
        if let Some(bytes) = dropped {
            let result = String::from_utf8(bytes)
                .context("dropped file is not UTF-8")
                .and_then(|raw| self.load_document(&raw));
            if let Err(e) = result {
                self.error = Some(format!("{e:#}"));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_minutes_seconds_centis() {
        assert_eq!(format_ms(0.0), "0:00.00");
        assert_eq!(format_ms(2_600.0), "0:02.60");
        assert_eq!(format_ms(75_250.0), "1:15.25");
    }
}
