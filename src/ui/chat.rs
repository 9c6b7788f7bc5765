use eframe::egui::{self, Color32, RichText, ScrollArea};

use advisor_core::conversation::{ChatView, MessageKind};

#[derive(Debug, Clone)]
pub struct ChatEntry {
    pub kind: MessageKind,
    pub content: String,
}

/// In-memory chat log the window draws from.
#[derive(Debug, Default)]
pub struct ChatLog {
    entries: Vec<ChatEntry>,
    loading: bool,
    focus_requested: bool,
}

impl ChatLog {
    pub fn entries(&self) -> &[ChatEntry] {
        &self.entries
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Returns and clears a pending focus request for the input box.
    pub fn take_focus_request(&mut self) -> bool {
        std::mem::take(&mut self.focus_requested)
    }
}

impl ChatView for ChatLog {
    fn clear(&mut self) {
        self.entries.clear();
    }

    fn render(&mut self, kind: MessageKind, content: &str) {
        self.entries.push(ChatEntry {
            kind,
            content: content.to_string(),
        });
    }

    fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    fn focus_input(&mut self) {
        self.focus_requested = true;
    }
}

pub fn render_chat_log(ui: &mut egui::Ui, log: &ChatLog) {
    ScrollArea::vertical()
        .stick_to_bottom(true)
        .auto_shrink([false, false])
        .show(ui, |ui| {
            for entry in log.entries() {
                render_entry(ui, entry);
                ui.add_space(8.0);
            }

            if log.is_loading() {
                ui.label(RichText::new("💭 Thinking...").weak().italics());
            }
        });
}

fn render_entry(ui: &mut egui::Ui, entry: &ChatEntry) {
    let is_user = entry.kind == MessageKind::User;

    ui.horizontal(|ui| {
        if is_user {
            ui.add_space(ui.available_width() * 0.3);
        }

        ui.group(|ui| {
            ui.set_max_width(ui.available_width() * 0.7);

            let (role_label, role_color, bg_color) = match entry.kind {
                MessageKind::User => (
                    "You",
                    Color32::from_rgb(230, 190, 120),
                    Color32::from_rgb(50, 40, 30),
                ),
                MessageKind::Assistant => (
                    "Beauty Advisor",
                    Color32::from_rgb(220, 160, 200),
                    Color32::from_rgb(45, 30, 45),
                ),
                MessageKind::Greeting => (
                    "Welcome",
                    Color32::from_rgb(200, 200, 200),
                    Color32::from_rgb(35, 35, 35),
                ),
            };

            ui.visuals_mut().widgets.noninteractive.bg_fill = bg_color;
            ui.label(RichText::new(role_label).color(role_color).strong());
            ui.label(&entry.content);
        });

        if !is_user {
            ui.add_space(ui.available_width());
        }
    });
}
