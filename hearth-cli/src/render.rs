//! Terminal renderer for conversational output.
//!
//! One line per primitive, written to stdout. Write failures are swallowed;
//! a broken terminal must never bubble an error back into the assistant
//! core's conversation flow.

use std::io::{self, Write};

use hearth_core::conversation::ConversationOutput;
use hearth_core::types::{AskSpecial, CardCallback, RichCard};

pub struct TerminalOutput {
    color: bool,
}

impl TerminalOutput {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    fn paint(&self, code: &str, text: &str) -> String {
        if self.color {
            format!("\x1b[{code}m{text}\x1b[0m")
        } else {
            text.to_string()
        }
    }

    fn line(&self, text: String) {
        println!("{text}");
        let _ = io::stdout().flush();
    }
}

#[async_trait::async_trait]
impl ConversationOutput for TerminalOutput {
    async fn send_text(&self, message: &str) {
        self.line(format!("{} {}", self.paint("32", ">>"), message));
    }

    async fn send_picture(&self, url: &str) {
        self.line(format!("{} picture: {}", self.paint("32", ">>"), url));
    }

    async fn send_rich_card(&self, card: &RichCard) {
        let callback = match &card.callback {
            CardCallback::Invocable(payload) => payload.to_string(),
            CardCallback::Web(url) => url.clone(),
        };
        self.line(format!(
            "{} {} ({})",
            self.paint("32", ">>"),
            card.title,
            callback
        ));
    }

    async fn send_choice(&self, index: usize, _kind: &str, title: &str, body: &str) {
        let label = if body.is_empty() {
            title.to_string()
        } else {
            format!("{title}: {body}")
        };
        self.line(format!(
            "{} {} {}",
            self.paint("32", ">>"),
            self.paint("36", &format!("[{index}]")),
            label
        ));
    }

    async fn send_link(&self, title: &str, url: &str) {
        self.line(format!("{} {} <{}>", self.paint("32", ">>"), title, url));
    }

    async fn send_button(&self, title: &str, payload: &serde_json::Value) {
        self.line(format!(
            "{} button: {} {}",
            self.paint("32", ">>"),
            title,
            payload
        ));
    }

    async fn send_ask_special(&self, kind: &AskSpecial) {
        // Informational only; the operator replies on the next line.
        self.line(self.paint("90", &format!("   (expecting: {kind})")));
    }
}
