use crate::app::MergerApp;
use crate::ffmpeg::JobState;
use crate::project::{MediaFile, VIDEO_EXTENSIONS};
use eframe::egui;

const ACTIVE_BACKGROUND: egui::Color32 = egui::Color32::from_rgb(250, 230, 110);

pub fn render_main_window(app: &mut MergerApp, ctx: &egui::Context) {
    // Status bar at bottom
    egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
        render_status_bar(app, ui);
    });

    // Right panel: channel selection of the selected file
    egui::SidePanel::right("channel_panel")
        .resizable(true)
        .default_width(260.0)
        .min_width(180.0)
        .show(ctx, |ui| {
            render_channel_panel(app, ui);
        });

    egui::CentralPanel::default().show(ctx, |ui| {
        render_file_list_panel(app, ui);
        ui.separator();
        render_output_directory(app, ui);
        ui.separator();
        render_progress(app, ui);
        ui.separator();
        render_process_buttons(app, ui);
        ui.separator();
        render_console(app, ui);
    });
}

fn render_status_bar(app: &MergerApp, ui: &mut egui::Ui) {
    ui.horizontal(|ui| {
        ui.label(&app.status_message);

        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            ui.label(format!("{} video(s)", app.batch.file_count()));
        });
    });
}

fn render_file_list_panel(app: &mut MergerApp, ui: &mut egui::Ui) {
    let running = app.batch.is_running();

    ui.horizontal(|ui| {
        ui.heading("Input Video(s)");
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            if ui.add_enabled(!running, egui::Button::new("Clear List")).clicked() {
                app.clear_files();
            }
            if ui.button("Select File(s)").clicked() {
                if let Some(paths) = rfd::FileDialog::new()
                    .set_title("Select Input Video(s)")
                    .add_filter("Video Files", VIDEO_EXTENSIONS)
                    .pick_files()
                {
                    app.add_files(paths);
                }
            }
        });
    });

    let files = app.batch.files();
    if files.is_empty() {
        ui.vertical_centered(|ui| {
            ui.add_space(10.0);
            ui.label("No files loaded");
            ui.small("You can drag and drop files here.");
            ui.add_space(10.0);
        });
        return;
    }

    let mut select_idx: Option<usize> = None;
    let mut remove_idx: Option<usize> = None;

    egui::ScrollArea::vertical()
        .auto_shrink([false, true])
        .max_height(180.0)
        .id_salt("file_list_scroll")
        .show(ui, |ui| {
            for (i, file) in files.iter().enumerate() {
                let is_selected = app.selected_file_index == Some(i);

                ui.horizontal(|ui| {
                    let response = ui.selectable_label(is_selected, file_label(app, file));
                    if response.clicked() {
                        select_idx = Some(i);
                    }
                    let status = match app.outcomes.get(&file.path) {
                        Some(outcome) => *outcome,
                        None if app.active_file.as_ref() == Some(&file.path) => JobState::Running,
                        None => JobState::Idle,
                    };
                    response.on_hover_text(format!(
                        "{}\nAudio channels: {:?}\nStatus: {}",
                        file.path.display(),
                        file.detected_channels(),
                        status.label()
                    ));

                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui.small_button("x").on_hover_text("Remove file").clicked() {
                            remove_idx = Some(i);
                        }
                    });
                });
            }
        });

    if let Some(idx) = select_idx {
        app.select_file(idx);
    }
    if let Some(idx) = remove_idx {
        app.remove_file_at(idx);
    }
}

/// File name and duration, colored by the outcome of the last run
fn file_label(app: &MergerApp, file: &MediaFile) -> egui::RichText {
    let mut text = egui::RichText::new(format!("{} ({})", file.filename(), file.duration_string()));

    if app.active_file.as_ref() == Some(&file.path) {
        text = text.background_color(ACTIVE_BACKGROUND).color(egui::Color32::BLACK);
    }

    match app.outcomes.get(&file.path) {
        Some(JobState::Succeeded) => text.color(egui::Color32::DARK_GREEN),
        Some(JobState::Failed) | Some(JobState::Cancelled) => text.color(egui::Color32::RED),
        _ => text,
    }
}

fn render_output_directory(app: &mut MergerApp, ui: &mut egui::Ui) {
    ui.horizontal(|ui| {
        let label = app
            .batch
            .output_directory()
            .map(|d| d.display().to_string())
            .unwrap_or_else(|| "Not specified".to_string());
        ui.label(format!("Output Directory: {}", label));

        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            if ui.button("Set Output Directory").clicked() {
                app.choose_output_directory();
            }
        });
    });
}

fn render_progress(app: &MergerApp, ui: &mut egui::Ui) {
    ui.label("Current File Progress:");
    ui.add(egui::ProgressBar::new(f32::from(app.file_progress) / 100.0).show_percentage());

    ui.label("Total Processing Progress:");
    ui.add(egui::ProgressBar::new(f32::from(app.total_progress) / 100.0).show_percentage());
}

fn render_process_buttons(app: &mut MergerApp, ui: &mut egui::Ui) {
    let running = app.batch.is_running();

    ui.horizontal(|ui| {
        if ui
            .add_enabled(!running, egui::Button::new("Process All"))
            .clicked()
        {
            app.start_batch();
        }
        if ui
            .add_enabled(running, egui::Button::new("Stop"))
            .on_hover_text("Stops the current file; the batch continues with the next one")
            .clicked()
        {
            app.stop_batch();
        }
    });
}

fn render_console(app: &MergerApp, ui: &mut egui::Ui) {
    ui.label("Console Output:");
    egui::Frame::canvas(ui.style()).show(ui, |ui| {
        egui::ScrollArea::vertical()
            .auto_shrink([false, false])
            .stick_to_bottom(true)
            .id_salt("console_scroll")
            .show(ui, |ui| {
                for line in &app.log_lines {
                    ui.monospace(line);
                }
            });
    });
}

fn render_channel_panel(app: &mut MergerApp, ui: &mut egui::Ui) {
    ui.heading("Audio Channels");
    ui.separator();

    let Some(index) = app.selected_file_index else {
        ui.label("No File Selected");
        return;
    };
    let files = app.batch.files();
    let Some(file) = files.get(index) else {
        ui.label("No File Selected");
        return;
    };

    ui.label(format!("Selected File: {}", file.filename()));
    ui.add_space(6.0);

    if file.detected_channels().is_empty() {
        ui.small("No audio channels detected");
        return;
    }
    if file.selected_channels().is_empty() {
        ui.colored_label(egui::Color32::RED, "Select at least one channel");
    }

    egui::ScrollArea::vertical()
        .auto_shrink([false, false])
        .id_salt("channel_scroll")
        .show(ui, |ui| {
            for &channel in file.detected_channels() {
                let mut checked = file.is_selected(channel);
                if ui
                    .checkbox(&mut checked, format!("Audio Channel {}", channel))
                    .changed()
                {
                    app.batch.toggle_channel(index, channel, checked);
                }
            }
        });
}
