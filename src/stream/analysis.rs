use std::{collections::BTreeMap, fmt, io::Read, str::FromStr};

use log::{debug, error, info, warn};
use serde::Deserialize;

use super::{accumulator::TokenAccumulator, frame::FrameDecoder, pump, Flow, StreamEnd};

const NO_DATA_TEXT: &str = "Chưa có dữ liệu...";
const PROCESSING_TEXT: &str = "Đang xử lý giai đoạn này...";
const CONNECTION_ERROR_TEXT: &str = "Lỗi kết nối.";
const CONNECTION_ERROR: &str = "Lỗi kết nối đến server phân tích.";
const PROTOCOL_ERROR: &str = "Lỗi xử lý dữ liệu từ server.";

/// The three phases of the analysis pipeline, in server order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    Survey,
    Grades,
    Synthesis,
}

impl Stage {
    pub const ALL: [Stage; 3] = [Stage::Survey, Stage::Grades, Stage::Synthesis];

    pub fn id(&self) -> &'static str {
        match self {
            Stage::Survey => "stage1_khaosat",
            Stage::Grades => "stage2_diem",
            Stage::Synthesis => "stage3_tonghop",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Stage::Survey => "Phân tích kỹ năng từ khảo sát",
            Stage::Grades => "Phân tích kết quả học tập",
            Stage::Synthesis => "Tổng hợp và lời khuyên",
        }
    }
}

impl FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Stage::ALL
            .into_iter()
            .find(|stage| stage.id() == s)
            .ok_or_else(|| s.to_string())
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamStatus {
    AllDone,
    /// `error_stage1`, `error_stage2`, ...
    StageFailed(String),
}

/// One decoded instruction from the analysis stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisEvent {
    Failed {
        stage: Option<Stage>,
        message: String,
    },
    StageStarted(Stage),
    Token {
        stage: Stage,
        token: String,
    },
    Finished(StreamStatus),
}

#[derive(Deserialize)]
struct RawEvent {
    stage: Option<String>,
    token: Option<String>,
    error: Option<String>,
    status: Option<String>,
}

impl AnalysisEvent {
    /// Decodes one frame payload into the instructions it carries, in the
    /// order they must be applied.
    pub fn decode(payload: &str) -> Result<Vec<AnalysisEvent>, serde_json::Error> {
        let raw: RawEvent = serde_json::from_str(payload)?;
        let stage = raw.stage.as_deref().and_then(|id| match id.parse::<Stage>() {
            Ok(stage) => Some(stage),
            Err(unknown) => {
                warn!("ignoring unknown analysis stage '{}'", unknown);
                None
            }
        });

        if let Some(message) = raw.error.filter(|e| !e.is_empty()) {
            return Ok(vec![AnalysisEvent::Failed { stage, message }]);
        }

        let mut events = Vec::with_capacity(2);
        if let Some(stage) = stage {
            match raw.token.filter(|t| !t.is_empty()) {
                Some(token) => events.push(AnalysisEvent::Token { stage, token }),
                None => events.push(AnalysisEvent::StageStarted(stage)),
            }
        }

        match raw.status.as_deref() {
            Some("all_done") => events.push(AnalysisEvent::Finished(StreamStatus::AllDone)),
            Some(status) if status.starts_with("error_stage") => events.push(
                AnalysisEvent::Finished(StreamStatus::StageFailed(status.to_string())),
            ),
            Some(status) => debug!("ignoring analysis status '{}'", status),
            None => {}
        }

        Ok(events)
    }
}

/// Client side of one analysis run: per-stage text, page error, and the
/// loading / complete flags.
#[derive(Debug, Clone)]
pub struct AnalysisSession {
    buffers: TokenAccumulator<Stage>,
    texts: BTreeMap<Stage, String>,
    current_stage: Option<Stage>,
    error: Option<String>,
    failed_stage: Option<Stage>,
    loading: bool,
    complete: bool,
    open: bool,
}

impl Default for AnalysisSession {
    fn default() -> Self {
        Self {
            buffers: TokenAccumulator::new(),
            texts: placeholder_texts(NO_DATA_TEXT),
            current_stage: None,
            error: None,
            failed_stage: None,
            loading: false,
            complete: false,
            open: false,
        }
    }
}

impl AnalysisSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resets every stage for a fresh run and starts listening.
    pub fn start(&mut self) {
        self.buffers.reset();
        self.texts = placeholder_texts(PROCESSING_TEXT);
        self.current_stage = None;
        self.error = None;
        self.failed_stage = None;
        self.loading = true;
        self.complete = false;
        self.open = true;
    }

    /// Text currently shown for `stage`.
    pub fn text(&self, stage: Stage) -> &str {
        self.texts.get(&stage).map(String::as_str).unwrap_or(NO_DATA_TEXT)
    }

    /// Tokens received for `stage` so far, regardless of what is shown.
    pub fn accumulated(&self, stage: Stage) -> &str {
        self.buffers.get(&stage).unwrap_or_default()
    }

    pub fn current_stage(&self) -> Option<Stage> {
        self.current_stage
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Stage whose text holds a server-reported error, for the front end to highlight.
    pub fn failed_stage(&self) -> Option<Stage> {
        self.failed_stage
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn handle_payload(&mut self, payload: &str) -> Flow {
        match AnalysisEvent::decode(payload) {
            Ok(events) => {
                for event in events {
                    if self.handle_event(event) == Flow::Close {
                        return Flow::Close;
                    }
                }
                Flow::Continue
            }
            Err(e) => {
                error!("error parsing analysis event {:?}: {}", payload, e);
                self.error = Some(PROTOCOL_ERROR.to_string());
                self.end();
                Flow::Close
            }
        }
    }

    pub fn handle_event(&mut self, event: AnalysisEvent) -> Flow {
        if !self.open {
            return Flow::Close;
        }

        match event {
            AnalysisEvent::Failed { stage, message } => {
                error!("analysis reported an error: {}", message);
                self.failed_stage = stage.or(self.current_stage);
                if let Some(stage) = self.failed_stage {
                    self.texts.insert(stage, format!("Lỗi: {}", message));
                }
                self.error = Some(message);
                self.end();
                Flow::Close
            }
            AnalysisEvent::StageStarted(stage) => {
                self.enter(stage);
                Flow::Continue
            }
            AnalysisEvent::Token { stage, token } => {
                self.enter(stage);
                let text = self.buffers.on_token(stage, &token).to_string();
                self.texts.insert(stage, text);
                Flow::Continue
            }
            AnalysisEvent::Finished(status) => {
                match status {
                    StreamStatus::AllDone => info!("analysis finished"),
                    StreamStatus::StageFailed(code) => warn!("analysis ended with {}", code),
                }
                self.complete = true;
                self.end();
                Flow::Close
            }
        }
    }

    /// The connection could not be opened or broke mid-stream.
    pub fn transport_failed(&mut self, reason: &dyn fmt::Display) {
        error!("analysis stream failed: {}", reason);
        self.error = Some(CONNECTION_ERROR.to_string());
        self.texts = placeholder_texts(CONNECTION_ERROR_TEXT);
        self.end();
    }

    /// Stops listening without marking the run complete, e.g. when the page is left.
    pub fn close(&mut self) {
        if self.open {
            debug!("analysis stream closed by the client");
        }
        self.end();
    }

    /// Drives the session from a raw event stream until it closes.
    /// `on_update` runs after every applied frame and may close the stream.
    pub fn consume<R: Read>(&mut self, reader: R, mut on_update: impl FnMut(&Self) -> Flow) {
        let mut decoder = FrameDecoder::new();

        let result = pump(reader, |chunk| {
            for payload in decoder.push(chunk) {
                let flow = self.handle_payload(&payload);
                if on_update(self) == Flow::Close {
                    self.close();
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
                if self.open {
                    self.transport_failed(&"stream ended before the analysis finished");
                }
                on_update(self);
            }
            Err(e) => {
                self.transport_failed(&e);
                on_update(self);
            }
        }
    }

    fn enter(&mut self, stage: Stage) {
        if self.current_stage != Some(stage) {
            debug!("analysis stage {}", stage);
            self.current_stage = Some(stage);
        }
    }

    fn end(&mut self) {
        self.loading = false;
        self.open = false;
    }
}

fn placeholder_texts(text: &str) -> BTreeMap<Stage, String> {
    Stage::ALL
        .into_iter()
        .map(|stage| (stage, text.to_string()))
        .collect()
}
