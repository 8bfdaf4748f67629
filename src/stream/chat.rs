use std::{fmt, io::Read};

use log::{debug, error, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{accumulator::TokenAccumulator, frame::FrameDecoder, pump, Flow, StreamEnd};

pub const FALLBACK_REPLY: &str = "Xin lỗi, đã có lỗi xảy ra.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRejected {
    #[error("message is empty")]
    Empty,

    #[error("the previous reply is still streaming")]
    Busy,

    #[error("chat unlocks once the analysis has finished")]
    Locked,
}

#[derive(Deserialize)]
struct ChatFrame {
    token: Option<String>,
}

/// Transcript of a conversation about the analysis results. One assistant
/// entry per reply, grown in place as tokens arrive.
#[derive(Debug, Clone, Default)]
pub struct ChatSession {
    transcript: Vec<ChatMessage>,
    buffers: TokenAccumulator<u64>,
    reply_id: u64,
    reply_entry: Option<usize>,
    streaming: bool,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming
    }

    pub fn clear(&mut self) {
        self.transcript.clear();
        self.buffers.reset();
        self.reply_entry = None;
        self.streaming = false;
    }

    /// Records the user's message and marks a reply as pending. Returns the
    /// message to send.
    pub fn begin(&mut self, input: &str) -> Result<String, ChatRejected> {
        if self.streaming {
            return Err(ChatRejected::Busy);
        }
        if input.trim().is_empty() {
            return Err(ChatRejected::Empty);
        }

        self.transcript.push(ChatMessage::new(Role::User, input));
        self.buffers.reset();
        self.reply_id += 1;
        self.reply_entry = None;
        self.streaming = true;
        Ok(input.to_string())
    }

    pub fn handle_payload(&mut self, payload: &str) -> Flow {
        if !self.streaming {
            return Flow::Close;
        }

        match serde_json::from_str::<ChatFrame>(payload) {
            Ok(ChatFrame { token: Some(token) }) if !token.is_empty() => {
                self.on_token(&token);
                Flow::Continue
            }
            Ok(_) => Flow::Continue,
            Err(e) => {
                self.fail(&format!("error parsing chat frame {:?}: {}", payload, e));
                Flow::Close
            }
        }
    }

    /// The reply stream ended normally.
    pub fn finish(&mut self) {
        if self.streaming {
            debug!("chat reply finished");
        }
        self.streaming = false;
        self.reply_entry = None;
    }

    /// Appends the fallback reply. Text already streamed stays in place.
    pub fn fail(&mut self, reason: &dyn fmt::Display) {
        error!("chat error: {}", reason);
        self.transcript
            .push(ChatMessage::new(Role::Assistant, FALLBACK_REPLY));
        self.streaming = false;
        self.reply_entry = None;
    }

    /// Pulls reply chunks until the stream ends. `on_update` runs after every
    /// applied frame and may stop the reply early.
    pub fn consume<R: Read>(&mut self, reader: R, mut on_update: impl FnMut(&Self) -> Flow) {
        let mut decoder = FrameDecoder::new();

        let result = pump(reader, |chunk| {
            for payload in decoder.push(chunk) {
                let flow = self.handle_payload(&payload);
                if on_update(self) == Flow::Close {
                    warn!("chat reply cancelled");
                    self.finish();
                    return Flow::Close;
                }
                if flow == Flow::Close {
                    return Flow::Close;
                }
            }
            Flow::Continue
        });

        match result {
            Ok(StreamEnd::Closed) => {}
            Ok(StreamEnd::Eof) => {
                if let Some(payload) = decoder.finish() {
                    self.handle_payload(&payload);
                }
                self.finish();
                on_update(self);
            }
            Err(e) => {
                self.fail(&e);
                on_update(self);
            }
        }
    }

    fn on_token(&mut self, token: &str) {
        let content = self.buffers.on_token(self.reply_id, token).to_string();
        match self.reply_entry {
            Some(index) => self.transcript[index].content = content,
            None => {
                self.transcript
                    .push(ChatMessage::new(Role::Assistant, content));
                self.reply_entry = Some(self.transcript.len() - 1);
            }
        }
    }
}
