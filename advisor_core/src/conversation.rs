//! Client-side conversation state: transcript, profile and submission lifecycle.

use crate::context::build_system_context;
use crate::extraction::ProfileExtractor;
use crate::message::{Message, Role};
use crate::profile::{load_profile, save_profile, UserProfile};
use crate::relay_client::{ChatRelay, RelayError};
use crate::storage::KeyValueStore;

pub const GENERIC_GREETING: &str = "👋 Welcome to L'Oréal Beauty Advisor! I'm here to help you \
discover the perfect products for your beauty routine. Ask me about makeup, skincare, haircare, \
or fragrances!";

pub const NOT_CONFIGURED_FALLBACK: &str = "I'd love to help you with L'Oréal products!

To connect me to the model, please:
1. Run the advisor_relay service
2. Set OPENAI_API_KEY in the relay's environment
3. Set relay_url in beauty_advisor.toml (or ADVISOR_RELAY_URL) to the relay's address

In the meantime, L'Oréal offers products for:
✨ Makeup: foundations, lipsticks, mascaras
🌸 Skincare: anti-aging, hydrating, cleansing
💇 Haircare: shampoos, treatments, styling
🌺 Fragrances: signature scents for every occasion

What type of products are you interested in?";

pub const CONNECTION_FALLBACK: &str = "I'm sorry, I'm having trouble connecting right now. \
Please try again in a moment, or check your internet connection.";

pub fn personalized_greeting(name: &str) -> String {
    format!(
        "👋 Welcome back, {}! Ready to continue finding the perfect L'Oréal products for you? \
         Ask me about makeup, skincare, haircare, or fragrances!",
        name
    )
}

/// Text shown in place of a reply when the relay call fails.
pub fn fallback_reply(error: &RelayError) -> &'static str {
    if error.is_configuration() {
        NOT_CONFIGURED_FALLBACK
    } else {
        CONNECTION_FALLBACK
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Greeting,
    User,
    Assistant,
}

/// Whatever displays the conversation.
pub trait ChatView {
    fn clear(&mut self);
    fn render(&mut self, kind: MessageKind, content: &str);
    /// Disable input and show the "thinking" indicator, or undo both.
    fn set_loading(&mut self, loading: bool);
    fn focus_input(&mut self);
}

pub struct ConversationManager<S, V> {
    store: S,
    view: V,
    extractor: ProfileExtractor,
    transcript: Vec<Message>,
    profile: UserProfile,
    /// User text of the submission awaiting a reply. `Some` means busy.
    in_flight: Option<String>,
}

impl<S: KeyValueStore, V: ChatView> ConversationManager<S, V> {
    pub fn new(store: S, view: V) -> Self {
        Self::with_extractor(store, view, ProfileExtractor::new())
    }

    pub fn with_extractor(store: S, view: V, extractor: ProfileExtractor) -> Self {
        Self {
            store,
            view,
            extractor,
            transcript: Vec::new(),
            profile: UserProfile::default(),
            in_flight: None,
        }
    }

    pub fn transcript(&self) -> &[Message] {
        &self.transcript
    }

    pub fn profile(&self) -> &UserProfile {
        &self.profile
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn start_session(&mut self) {
        self.view.clear();

        self.profile = load_profile(&self.store);
        self.transcript = vec![Message::system(build_system_context(&self.profile))];

        self.profile.conversation_count = self.profile.conversation_count.saturating_add(1);
        save_profile(&self.store, &self.profile);

        tracing::info!(
            "Session started (conversation #{}, returning user: {})",
            self.profile.conversation_count,
            self.profile.name.is_some()
        );

        match &self.profile.name {
            Some(name) => {
                let greeting = personalized_greeting(name);
                self.view.render(MessageKind::Greeting, &greeting);
            }
            None => self.view.render(MessageKind::Greeting, GENERIC_GREETING),
        }
        self.view.focus_input();
    }

    /// Accept a submission and return the transcript to send to the relay.
    ///
    /// Returns `None` without touching any state when a submission is already
    /// in flight or the text is blank.
    pub fn begin_submit(&mut self, user_text: &str) -> Option<Vec<Message>> {
        if self.in_flight.is_some() {
            tracing::debug!("Dropping submission while another is in flight");
            return None;
        }
        let text = user_text.trim();
        if text.is_empty() {
            return None;
        }

        self.view.render(MessageKind::User, text);
        self.transcript.push(Message::user(text));
        self.in_flight = Some(text.to_string());
        self.view.set_loading(true);

        Some(self.transcript.clone())
    }

    /// Apply the relay outcome for the in-flight submission and leave the
    /// loading state. Does nothing if no submission is in flight.
    pub fn finish_submit(&mut self, outcome: Result<String, RelayError>) {
        let Some(user_text) = self.in_flight.take() else {
            tracing::warn!("Relay outcome arrived with no submission in flight");
            return;
        };

        match outcome {
            Ok(reply) => {
                self.transcript.push(Message::assistant(reply.clone()));
                self.view.render(MessageKind::Assistant, &reply);

                self.extractor
                    .extract(&user_text, &reply, &mut self.profile);
                save_profile(&self.store, &self.profile);
            }
            Err(error) => {
                if error.is_configuration() {
                    tracing::warn!("Relay not configured; showing setup instructions");
                } else {
                    tracing::error!("Relay error: {}", error);
                }
                self.view.render(MessageKind::Assistant, fallback_reply(&error));
            }
        }

        self.view.set_loading(false);
        self.view.focus_input();
    }

    /// Full submission: guard, relay call, then the post-call steps.
    pub async fn submit<R>(&mut self, relay: &R, user_text: &str)
    where
        R: ChatRelay + ?Sized,
    {
        let Some(messages) = self.begin_submit(user_text) else {
            return;
        };
        let outcome = relay.send(&messages).await;
        self.finish_submit(outcome);
    }

    /// Last assistant reply in the transcript, if any.
    pub fn last_reply(&self) -> Option<&str> {
        self.transcript
            .iter()
            .rev()
            .find(|message| message.role == Role::Assistant)
            .map(|message| message.content.as_str())
    }
}
