use std::{
    io::Read,
    time::{SystemTime, UNIX_EPOCH},
};

use anyhow::Context;
use log::{debug, info};
use serde_json::{json, Value};
use thiserror::Error;

use super::{
    summary::{GradeReport, SkillSummary},
    upload::{GradeFile, UploadError},
};
use crate::{
    config::Config,
    stream::StreamSource,
    survey::{SurveyRecord, SurveySink},
};

const SUBMIT_SURVEY: &str = "submit-survey";
const UPLOAD_FILE: &str = "upload-file";
const START_ANALYSIS: &str = "start-llm-analysis";
const CHAT: &str = "llm-chat";
const SURVEY_SUMMARY: &str = "get-khaosat-summary";
const GRADES: &str = "get-data";

const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

#[derive(Error, Debug)]
pub enum RequestError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] ureq::Error),

    #[error("Failed to read response body: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Server returned an error: {status}")]
    ServerError { status: u16 },

    #[error("Server rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },
}

impl RequestError {
    fn from_ureq(e: ureq::Error) -> Self {
        match e {
            ureq::Error::Status(code, _) => RequestError::ServerError { status: code },
            other => RequestError::HttpError(other),
        }
    }

    /// Like [`RequestError::from_ureq`] but keeps the `{error}` message the
    /// server puts in rejection bodies.
    fn with_server_message(e: ureq::Error) -> Self {
        match e {
            ureq::Error::Status(status, response) => {
                let message = response
                    .into_json::<Value>()
                    .ok()
                    .and_then(|body| body.get("error").and_then(Value::as_str).map(str::to_string));
                match message {
                    Some(message) => RequestError::Rejected { status, message },
                    None => RequestError::ServerError { status },
                }
            }
            other => RequestError::HttpError(other),
        }
    }
}

/// Blocking client for the survey backend.
pub struct ApiClient {
    agent: ureq::Agent,
    stream_agent: ureq::Agent,
    base_url: String,
}

impl ApiClient {
    pub fn new(config: &Config) -> Self {
        let mut stream_agent = ureq::AgentBuilder::new();
        if let Some(timeout) = config.stream_timeout {
            stream_agent = stream_agent.timeout_read(timeout);
        }

        Self {
            agent: ureq::agent(),
            stream_agent: stream_agent.build(),
            base_url: config.api_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    pub fn upload_grades(&self, file: &GradeFile) -> Result<(), UploadError> {
        let mut contents = Vec::with_capacity(file.size as usize);
        std::fs::File::open(&file.path)
            .and_then(|mut f| f.read_to_end(&mut contents))
            .map_err(UploadError::Io)?;

        let boundary = format!(
            "humg-{:x}",
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_nanos())
                .unwrap_or_default()
        );
        let body = multipart_body(&boundary, &file.name, &contents);

        debug!("uploading {} ({} bytes)", file.name, file.size);
        self.agent
            .post(&self.endpoint(UPLOAD_FILE))
            .set(
                "Content-Type",
                &format!("multipart/form-data; boundary={}", boundary),
            )
            .send_bytes(&body)
            .map_err(RequestError::with_server_message)?;

        info!("uploaded {}", file.name);
        Ok(())
    }

    pub fn skill_summary(&self) -> anyhow::Result<SkillSummary> {
        let body = self
            .get_json(SURVEY_SUMMARY)
            .context("Failed to fetch survey summary")?;
        SkillSummary::from_json(&body)
    }

    pub fn grade_report(&self) -> anyhow::Result<GradeReport> {
        let body = self.get_json(GRADES).context("Failed to fetch grades")?;
        GradeReport::from_json(&body)
    }

    fn get_json(&self, path: &str) -> Result<Value, RequestError> {
        let response = self
            .agent
            .get(&self.endpoint(path))
            .call()
            .map_err(RequestError::from_ureq)?;
        Ok(response.into_json()?)
    }
}

impl SurveySink for ApiClient {
    fn submit_survey(&self, record: &SurveyRecord) -> Result<(), RequestError> {
        self.agent
            .post(&self.endpoint(SUBMIT_SURVEY))
            .send_json(record)
            .map_err(RequestError::from_ureq)?;
        Ok(())
    }
}

impl StreamSource for ApiClient {
    fn open_analysis(&self) -> Result<Box<dyn Read + Send>, RequestError> {
        debug!("opening analysis stream");
        let response = self
            .stream_agent
            .post(&self.endpoint(START_ANALYSIS))
            .set("Accept", "text/event-stream")
            .call()
            .map_err(RequestError::from_ureq)?;
        Ok(Box::new(response.into_reader()))
    }

    fn open_chat(&self, message: &str) -> Result<Box<dyn Read + Send>, RequestError> {
        debug!("opening chat stream");
        let response = self
            .stream_agent
            .post(&self.endpoint(CHAT))
            .send_json(json!({ "message": message }))
            .map_err(RequestError::from_ureq)?;
        Ok(Box::new(response.into_reader()))
    }
}

fn multipart_body(boundary: &str, file_name: &str, contents: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(contents.len() + 256);
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\nContent-Type: {XLSX_MIME}\r\n\r\n",
            file_name.replace('"', "")
        )
        .as_bytes(),
    );
    body.extend_from_slice(contents);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    body
}
