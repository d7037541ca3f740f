//! # Console Adapter
//!
//! Local transport for trying the bot without Telegram. Views are printed to stdout
//! with numbered buttons; typing a number presses the matching button of the last
//! message, anything else is sent as a command or free text.

use anyhow::Result;
use async_trait::async_trait;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::Mutex;

use crate::application::context::{InboundEvent, InboundKind};
use crate::application::inbox;
use crate::application::render;
use crate::application::router::CommandRouter;
use crate::domain::traits::ChatProvider;
use crate::domain::types::{Image, MessageId, OptionKind, View, ViewOption};

const CHAT_ID: &str = "console";
const USER_ID: &str = "local";

#[derive(Default)]
struct Screen {
    next_id: u64,
    /// Message holding the buttons currently on screen.
    last_message: Option<MessageId>,
    buttons: Vec<ViewOption>,
}

#[derive(Clone, Default)]
pub struct ConsoleChat {
    screen: Arc<Mutex<Screen>>,
}

impl ConsoleChat {
    pub fn new() -> Self {
        Self::default()
    }

    async fn draw(&self, id: MessageId, view: &View, edited: bool) -> MessageId {
        let buttons = render::buttons(view);
        let mut out = String::new();
        out.push_str(&format!("\n--- message {}{} ---\n", id, if edited { " (edited)" } else { "" }));
        if !view.title.is_empty() {
            out.push_str(&format!("{}\n", view.title));
        }
        match &view.image {
            Some(Image::Url(url)) => out.push_str(&format!("[image] {url}\n")),
            Some(Image::Bytes(bytes)) => out.push_str(&format!("[image] {} bytes\n", bytes.len())),
            None => {}
        }
        out.push_str(&render::body(view));
        out.push('\n');
        for (i, option) in buttons.iter().enumerate() {
            match option.kind {
                OptionKind::Callback => out.push_str(&format!("  [{}] {}\n", i + 1, option.label)),
                OptionKind::OpenUrl | OptionKind::WebApp => {
                    out.push_str(&format!("  [{}] {} -> {}\n", i + 1, option.label, option.target))
                }
            }
        }
        print!("{out}");
        if let Err(e) = std::io::stdout().flush() {
            tracing::debug!("Failed to flush stdout: {}", e);
        }

        let mut screen = self.screen.lock().await;
        if !buttons.is_empty() {
            screen.last_message = Some(id.clone());
            screen.buttons = buttons;
        }
        id
    }

    /// Turns one input line into an event.
    async fn to_event(&self, line: &str) -> Option<InboundEvent> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        if let Ok(n) = line.parse::<usize>() {
            let screen = self.screen.lock().await;
            if let Some(option) = n.checked_sub(1).and_then(|i| screen.buttons.get(i)) {
                if option.kind != OptionKind::Callback {
                    println!("Open {} in a browser.", option.target);
                    return None;
                }
                let mut event = InboundEvent::new(CHAT_ID, USER_ID, InboundKind::Callback, option.target.clone());
                event.message_id = screen.last_message.clone();
                return Some(event);
            }
        }
        let (kind, text) = match line {
            "/start" => (InboundKind::Command, "/"),
            l if l.starts_with('/') => (InboundKind::Command, l),
            l => (InboundKind::Text, l),
        };
        Some(InboundEvent::new(CHAT_ID, USER_ID, kind, text))
    }
}

#[async_trait]
impl ChatProvider for ConsoleChat {
    async fn send_view(&self, view: &View) -> Result<MessageId, String> {
        let id = {
            let mut screen = self.screen.lock().await;
            screen.next_id += 1;
            screen.next_id.to_string()
        };
        Ok(self.draw(id, view, false).await)
    }

    async fn edit_view(&self, message_id: &str, view: &View) -> Result<MessageId, String> {
        Ok(self.draw(message_id.to_string(), view, true).await)
    }

    async fn delete_message(&self, message_id: &str) -> Result<(), String> {
        println!("--- message {message_id} deleted ---");
        Ok(())
    }
}

/// Reads stdin until EOF, dispatching each line in order.
pub async fn run(router: Arc<CommandRouter>) -> Result<()> {
    let chat = ConsoleChat::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("Console mode. Type /start to begin, a number to press a button, Ctrl-D to quit.");
    while let Some(line) = lines.next_line().await? {
        let Some(event) = chat.to_event(&line).await else {
            continue;
        };
        inbox::process(&router, &chat, event).await;
    }
    tracing::info!("Console input closed");
    Ok(())
}
