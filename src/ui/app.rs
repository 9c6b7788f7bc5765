use std::sync::Arc;

use anyhow::{Context, Result};
use eframe::egui;
use flume::{Receiver, TryRecvError};

use super::chat::{render_chat_log, ChatLog};
use advisor_core::config::AdvisorConfig;
use advisor_core::conversation::ConversationManager;
use advisor_core::http_client::build_http_client;
use advisor_core::relay_client::{ChatRelay, RelayClient, RelayError};
use advisor_core::storage::{KeyValueStore, MemoryStore, SqliteStore};

type Session = ConversationManager<Box<dyn KeyValueStore>, ChatLog>;

pub struct AdvisorApp {
    session: Session,
    relay: Arc<RelayClient>,
    runtime: tokio::runtime::Runtime,
    pending: Option<Receiver<Result<String, RelayError>>>,
    user_input: String,
}

impl AdvisorApp {
    pub fn new(config: &AdvisorConfig) -> Result<Self> {
        let runtime = tokio::runtime::Runtime::new().context("failed to start UI tokio runtime")?;
        let relay = RelayClient::from_config(build_http_client()?, config);
        match relay.endpoint() {
            Some(endpoint) => tracing::info!("Relay endpoint: {}", endpoint),
            None => tracing::warn!("Relay endpoint not configured; replies will show setup steps"),
        }

        let mut session = ConversationManager::new(open_store(config), ChatLog::default());
        session.start_session();

        Ok(Self {
            session,
            relay: Arc::new(relay),
            runtime,
            pending: None,
            user_input: String::new(),
        })
    }

    fn submit_input(&mut self) {
        let Some(messages) = self.session.begin_submit(&self.user_input) else {
            return;
        };
        self.user_input.clear();

        let (outcome_tx, outcome_rx) = flume::bounded(1);
        let relay = self.relay.clone();
        self.runtime.spawn(async move {
            let outcome = relay.send(&messages).await;
            let _ = outcome_tx.send(outcome);
        });
        self.pending = Some(outcome_rx);
    }

    fn poll_pending(&mut self) {
        let received = match &self.pending {
            Some(rx) => rx.try_recv(),
            None => return,
        };

        match received {
            Ok(outcome) => {
                self.pending = None;
                self.session.finish_submit(outcome);
            }
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => {
                self.pending = None;
                self.session.finish_submit(Err(RelayError::Transport(
                    "relay task ended without a reply".to_string(),
                )));
            }
        }
    }

    fn restart_session(&mut self) {
        self.user_input.clear();
        self.session.start_session();
    }
}

fn open_store(config: &AdvisorConfig) -> Box<dyn KeyValueStore> {
    match SqliteStore::open(&config.database_path) {
        Ok(store) => {
            tracing::info!("Profile storage at {}", config.database_path);
            Box::new(store)
        }
        Err(error) => {
            tracing::warn!(
                "Failed to open profile storage ({:#}); profile will not persist",
                error
            );
            Box::new(MemoryStore::new())
        }
    }
}

impl eframe::App for AdvisorApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_pending();
        let busy = self.session.is_busy();

        egui::TopBottomPanel::top("header").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("L'Oréal Beauty Advisor");
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui
                        .add_enabled(!busy, egui::Button::new("⟲ New session"))
                        .clicked()
                    {
                        self.restart_session();
                    }
                });
            });
        });

        egui::TopBottomPanel::bottom("composer").show(ctx, |ui| {
            ui.add_space(6.0);
            ui.label(
                egui::RichText::new("Press Enter to send. Shift+Enter inserts a newline.")
                    .small()
                    .weak(),
            );
            ui.horizontal(|ui| {
                let response = ui.add_enabled(
                    !busy,
                    egui::TextEdit::multiline(&mut self.user_input)
                        .hint_text("Ask about makeup, skincare, haircare, or fragrances...")
                        .desired_rows(2)
                        .desired_width(ui.available_width() - 80.0),
                );

                if self.session.view_mut().take_focus_request() {
                    response.request_focus();
                }

                let send_shortcut = response.has_focus()
                    && ui.input(|i| {
                        i.key_pressed(egui::Key::Enter)
                            && !i.modifiers.shift
                            && !i.modifiers.ctrl
                            && !i.modifiers.command
                            && !i.modifiers.alt
                    });
                let send_clicked = ui.add_enabled(!busy, egui::Button::new("Send")).clicked();

                if send_shortcut || send_clicked {
                    self.submit_input();
                }
            });
            ui.add_space(6.0);
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            render_chat_log(ui, self.session.view());
        });

        if self.session.is_busy() {
            ctx.request_repaint_after(std::time::Duration::from_millis(100));
        }
    }
}
