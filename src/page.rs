use log::{info, warn};

use crate::stream::{AnalysisSession, ChatRejected, ChatSession, Flow, StreamSource};

/// The results page: one analysis run plus a follow-up conversation about it.
#[derive(Debug, Clone, Default)]
pub struct AnalysisPage {
    analysis: AnalysisSession,
    chat: ChatSession,
}

impl AnalysisPage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn analysis(&self) -> &AnalysisSession {
        &self.analysis
    }

    pub fn chat(&self) -> &ChatSession {
        &self.chat
    }

    /// Chat stays locked until an analysis has run to completion.
    pub fn chat_unlocked(&self) -> bool {
        self.analysis.is_complete()
    }

    /// Starts a fresh run, dropping any previous results and conversation,
    /// and blocks until the stream closes.
    pub fn start_analysis(
        &mut self,
        source: &impl StreamSource,
        mut on_update: impl FnMut(&AnalysisSession) -> Flow,
    ) {
        self.chat.clear();
        self.analysis.start();
        info!("starting analysis");

        match source.open_analysis() {
            Ok(reader) => self.analysis.consume(reader, on_update),
            Err(e) => {
                self.analysis.transport_failed(&e);
                on_update(&self.analysis);
            }
        }
    }

    /// Sends one message and streams the reply into the transcript.
    pub fn send_chat(
        &mut self,
        source: &impl StreamSource,
        input: &str,
        mut on_update: impl FnMut(&ChatSession) -> Flow,
    ) -> Result<(), ChatRejected> {
        if !self.chat_unlocked() {
            warn!("chat rejected: analysis has not finished");
            return Err(ChatRejected::Locked);
        }

        let message = self.chat.begin(input)?;
        on_update(&self.chat);

        match source.open_chat(&message) {
            Ok(reader) => self.chat.consume(reader, on_update),
            Err(e) => {
                self.chat.fail(&e);
                on_update(&self.chat);
            }
        }
        Ok(())
    }

    /// Navigating away closes whatever stream is still open.
    pub fn leave(&mut self) {
        self.analysis.close();
        if self.chat.is_streaming() {
            self.chat.finish();
        }
    }
}
