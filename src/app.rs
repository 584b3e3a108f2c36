// SPDX-License-Identifier: MPL-2.0
//! Application root state and the update/view loop.
//!
//! The `App` struct owns the image list, the two export options and the
//! status line, and translates messages into side effects: batch insertion
//! of dropped files, the save dialog, the blocking PDF export, and config
//! persistence on window close. Policy decisions (default window size,
//! persistence timing, drop batching) live close to the update loop so the
//! user-facing behavior is easy to audit.

use crate::compose::{self, ExportOptions, PageOrientation};
use crate::config;
use crate::i18n::I18n;
use crate::image_list::ImageList;
use iced::widget::{button, checkbox, container, radio, scrollable, text, Column, Row};
use iced::{event, keyboard, window, Element, Length, Point, Size, Subscription, Task};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Root Iced application state.
pub struct App {
    pub i18n: I18n,
    images: ImageList,
    selected: BTreeSet<usize>,
    orientation: PageOrientation,
    auto_rotate: bool,
    status: String,
    /// Paths dropped since the last settle message; flushed as one batch.
    pending_drop: Vec<PathBuf>,
    window_pos: Option<(f32, f32)>,
    window_size: (f32, f32),
}

/// Top-level messages consumed by [`App::update`].
#[derive(Debug, Clone)]
pub enum Message {
    FileDropped(PathBuf),
    DropBatchSettled,
    RowPressed(usize),
    RemoveSelected,
    ClearAll,
    OrientationSelected(PageOrientation),
    AutoRotateToggled(bool),
    ExportRequested,
    ExportPathSelected(Option<PathBuf>),
    WindowMoved(Point),
    WindowResized(Size),
    CloseRequested(window::Id),
}

/// Runtime flags passed in from the CLI to tweak startup behavior.
#[derive(Debug, Default)]
pub struct Flags {
    /// Force the `en-US` locale regardless of config and OS locale.
    pub english: bool,
}

pub const WINDOW_DEFAULT_WIDTH: f32 = 560.0;
pub const WINDOW_DEFAULT_HEIGHT: f32 = 480.0;
pub const MIN_WINDOW_WIDTH: f32 = 420.0;
pub const MIN_WINDOW_HEIGHT: f32 = 320.0;

/// Builds the window settings, restoring any persisted geometry.
pub fn window_settings(config: &config::Config) -> window::Settings {
    let size = config
        .window_size
        .map(|(w, h)| Size::new(w, h))
        .unwrap_or(Size::new(WINDOW_DEFAULT_WIDTH, WINDOW_DEFAULT_HEIGHT));
    let position = config
        .window_pos
        .map(|(x, y)| window::Position::Specific(Point::new(x, y)))
        .unwrap_or(window::Position::Default);

    window::Settings {
        size,
        position,
        min_size: Some(Size::new(MIN_WINDOW_WIDTH, MIN_WINDOW_HEIGHT)),
        // The close request must reach the update loop so preferences can be
        // written before the window goes away.
        exit_on_close_request: false,
        ..window::Settings::default()
    }
}

/// Entry point used by `main.rs` to launch the Iced application loop.
pub fn run(flags: Flags) -> iced::Result {
    let config = config::load().unwrap_or_default();
    iced::application(|state: &App| state.title(), App::update, App::view)
        .window(window_settings(&config))
        .subscription(App::subscription)
        .run_with(move || App::new(flags))
}

impl Default for App {
    fn default() -> Self {
        let i18n = I18n::default();
        let status = i18n.tr("status-ready");
        Self {
            i18n,
            images: ImageList::default(),
            selected: BTreeSet::new(),
            orientation: PageOrientation::default(),
            auto_rotate: false,
            status,
            pending_drop: Vec::new(),
            window_pos: None,
            window_size: (WINDOW_DEFAULT_WIDTH, WINDOW_DEFAULT_HEIGHT),
        }
    }
}

impl App {
    /// Initializes application state from persisted preferences and flags.
    fn new(flags: Flags) -> (Self, Task<Message>) {
        let config = config::load().unwrap_or_default();
        let cli_lang = flags.english.then(|| "en-US".to_string());
        let i18n = I18n::new(cli_lang, &config);

        let status = i18n.tr("status-ready");
        let app = App {
            i18n,
            orientation: config.orientation.unwrap_or_default(),
            auto_rotate: config.auto_rotate.unwrap_or(false),
            status,
            window_pos: config.window_pos,
            window_size: config
                .window_size
                .unwrap_or((WINDOW_DEFAULT_WIDTH, WINDOW_DEFAULT_HEIGHT)),
            ..Self::default()
        };

        (app, Task::none())
    }

    fn title(&self) -> String {
        self.i18n.tr("window-title")
    }

    fn subscription(&self) -> Subscription<Message> {
        event::listen_with(|event, status, window_id| match event {
            event::Event::Window(window::Event::FileDropped(path)) => {
                Some(Message::FileDropped(path))
            }
            event::Event::Window(window::Event::CloseRequested) => {
                Some(Message::CloseRequested(window_id))
            }
            event::Event::Window(window::Event::Moved(position)) => {
                Some(Message::WindowMoved(position))
            }
            event::Event::Window(window::Event::Resized(size)) => {
                Some(Message::WindowResized(size))
            }
            event::Event::Keyboard(keyboard::Event::KeyPressed {
                key: keyboard::Key::Named(keyboard::key::Named::Delete),
                ..
            }) => match status {
                event::Status::Ignored => Some(Message::RemoveSelected),
                event::Status::Captured => None,
            },
            _ => None,
        })
    }

    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::FileDropped(path) => {
                self.pending_drop.push(path);
                // Settles once the runtime drains the native event queue, so
                // every file of one physical drop lands in the same batch.
                Task::done(Message::DropBatchSettled)
            }
            Message::DropBatchSettled => {
                if !self.pending_drop.is_empty() {
                    let batch = std::mem::take(&mut self.pending_drop);
                    self.images.add_batch(batch);
                }
                Task::none()
            }
            Message::RowPressed(index) => {
                if !self.selected.remove(&index) {
                    self.selected.insert(index);
                }
                Task::none()
            }
            Message::RemoveSelected => {
                if !self.selected.is_empty() {
                    let selection = std::mem::take(&mut self.selected);
                    self.images.remove_indices(&selection);
                }
                Task::none()
            }
            Message::ClearAll => {
                self.images.clear();
                self.selected.clear();
                Task::none()
            }
            Message::OrientationSelected(orientation) => {
                self.orientation = orientation;
                Task::none()
            }
            Message::AutoRotateToggled(enabled) => {
                self.auto_rotate = enabled;
                Task::none()
            }
            Message::ExportRequested => self.open_save_dialog(),
            Message::ExportPathSelected(Some(path)) => {
                self.export_to(&path);
                Task::none()
            }
            Message::ExportPathSelected(None) => Task::none(),
            Message::WindowMoved(position) => {
                self.window_pos = Some((position.x, position.y));
                Task::none()
            }
            Message::WindowResized(size) => {
                self.window_size = (size.width, size.height);
                Task::none()
            }
            Message::CloseRequested(id) => {
                self.persist_preferences();
                window::close(id)
            }
        }
    }

    /// Opens the save dialog, unless the list is empty (then the whole
    /// export is a no-op).
    fn open_save_dialog(&mut self) -> Task<Message> {
        if self.images.is_empty() {
            return Task::none();
        }

        let dialog_title = self.i18n.tr("dialog-save-title");
        let file_name = format!("{}.album.pdf", chrono::Local::now().format("%Y-%m-%d"));
        Task::perform(
            async move {
                rfd::AsyncFileDialog::new()
                    .set_title(&dialog_title)
                    .set_file_name(&file_name)
                    .add_filter("Portable Document Files", &["pdf"])
                    .save_file()
                    .await
                    .map(|handle| handle.path().to_path_buf())
            },
            Message::ExportPathSelected,
        )
    }

    /// Runs the export synchronously on the event thread; the window is busy
    /// until the document is written.
    fn export_to(&mut self, path: &Path) {
        self.status = self.i18n.tr("status-export-start");

        let options = ExportOptions {
            orientation: self.orientation,
            auto_rotate: self.auto_rotate,
        };
        match compose::compose_album(self.images.entries(), &options, path) {
            Ok(()) => {
                self.status = format!(
                    "{} {}",
                    self.i18n.tr("status-export-done"),
                    path.display()
                );
            }
            Err(error) => {
                self.status = error.to_string();
            }
        }
    }

    /// Persists options and window geometry.
    ///
    /// Guarded during tests to keep isolation: unit tests exercise the logic
    /// by inspecting state rather than the config file.
    fn persist_preferences(&self) {
        if cfg!(test) {
            return;
        }

        let mut cfg = config::load().unwrap_or_default();
        cfg.orientation = Some(self.orientation);
        cfg.auto_rotate = Some(self.auto_rotate);
        cfg.window_pos = self.window_pos;
        cfg.window_size = Some(self.window_size);

        if let Err(error) = config::save(&cfg) {
            eprintln!("Failed to save config: {:?}", error);
        }
    }

    fn view(&self) -> Element<'_, Message> {
        let list: Element<'_, Message> = if self.images.is_empty() {
            container(text(self.i18n.tr("list-drop-hint")))
                .center(Length::Fill)
                .into()
        } else {
            let mut rows = Column::new().spacing(2);
            for (index, entry) in self.images.entries().iter().enumerate() {
                let style = if self.selected.contains(&index) {
                    button::primary
                } else {
                    button::text
                };
                rows = rows.push(
                    button(text(entry.file_name.clone()))
                        .style(style)
                        .width(Length::Fill)
                        .on_press(Message::RowPressed(index)),
                );
            }
            scrollable(rows)
                .width(Length::Fill)
                .height(Length::Fill)
                .into()
        };

        let options_row = Row::new()
            .spacing(16)
            .push(radio(
                self.i18n.tr("option-portrait"),
                PageOrientation::Portrait,
                Some(self.orientation),
                Message::OrientationSelected,
            ))
            .push(radio(
                self.i18n.tr("option-landscape"),
                PageOrientation::Landscape,
                Some(self.orientation),
                Message::OrientationSelected,
            ))
            .push(
                checkbox(self.i18n.tr("option-auto-rotate"), self.auto_rotate)
                    .on_toggle(Message::AutoRotateToggled),
            );

        let buttons_row = Row::new()
            .spacing(8)
            .push(
                button(text(self.i18n.tr("button-convert")))
                    .on_press(Message::ExportRequested),
            )
            .push(
                button(text(self.i18n.tr("button-remove")))
                    .style(button::secondary)
                    .on_press(Message::RemoveSelected),
            )
            .push(
                button(text(self.i18n.tr("button-clear")))
                    .style(button::secondary)
                    .on_press(Message::ClearAll),
            );

        Column::new()
            .push(
                container(list)
                    .width(Length::Fill)
                    .height(Length::Fill),
            )
            .push(options_row)
            .push(buttons_row)
            .push(text(self.status.clone()).size(14))
            .spacing(12)
            .padding(12)
            .into()
    }
}
