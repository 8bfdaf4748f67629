use std::{collections::BTreeMap, fmt, str::FromStr};

use log::{debug, error, info, warn};
use thiserror::Error;

use crate::api::RequestError;

use super::{
    content::{
        answer_key, is_likert_value, is_social_media_value, section_by_key, Section, SECTIONS,
        SOCIAL_MEDIA_ORDINAL, SOCIAL_MEDIA_SECTION_KEY,
    },
    store::{FormStore, KeyValueStore, PersonalInfo, WizardState},
};

/// field or answer key -> message shown next to it
pub type ValidationErrors = BTreeMap<String, String>;

/// Flat submission payload: personal info fields plus every answer key.
pub type SurveyRecord = BTreeMap<String, String>;

const MSG_PICK_ANSWER: &str = "Vui lòng chọn một đáp án";
const MSG_PICK_SOCIAL_HOURS: &str = "Vui lòng chọn thời gian sử dụng mạng xã hội";
const MSG_SUBMIT_OK: &str = "Khảo sát đã được gửi thành công!";
const MSG_SUBMIT_FAILED: &str = "Có lỗi xảy ra khi gửi khảo sát.";
const MSG_PERSONAL_INCOMPLETE: &str = "Vui lòng điền đầy đủ thông tin cá nhân.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersonalField {
    FullName,
    StudentId,
    Gender,
    Faculty,
    AcademicYear,
    SocialMediaHours,
}

impl PersonalField {
    pub const REQUIRED: [PersonalField; 5] = [
        PersonalField::FullName,
        PersonalField::StudentId,
        PersonalField::Gender,
        PersonalField::Faculty,
        PersonalField::AcademicYear,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            PersonalField::FullName => "ho_va_ten",
            PersonalField::StudentId => "ma_so_sinh_vien",
            PersonalField::Gender => "gioi_tinh",
            PersonalField::Faculty => "khoa",
            PersonalField::AcademicYear => "nam_hoc",
            PersonalField::SocialMediaHours => "social_media_hours",
        }
    }

    /// Prompt shown next to the input.
    pub fn label(&self) -> &'static str {
        match self {
            PersonalField::FullName => "Họ và tên",
            PersonalField::StudentId => "Mã số sinh viên",
            PersonalField::Gender => "Giới tính",
            PersonalField::Faculty => "Khoa",
            PersonalField::AcademicYear => "Năm học",
            PersonalField::SocialMediaHours => "Thời gian sử dụng mạng xã hội mỗi ngày",
        }
    }

    fn missing_message(&self) -> &'static str {
        match self {
            PersonalField::FullName => "Vui lòng nhập họ tên",
            PersonalField::StudentId => "Vui lòng nhập mã số sinh viên",
            PersonalField::Gender => "Vui lòng chọn giới tính",
            PersonalField::Faculty => "Vui lòng chọn khoa",
            PersonalField::AcademicYear => "Vui lòng chọn năm học",
            PersonalField::SocialMediaHours => MSG_PICK_SOCIAL_HOURS,
        }
    }

    pub fn value<'a>(&self, info: &'a PersonalInfo) -> &'a str {
        match self {
            PersonalField::FullName => &info.ho_va_ten,
            PersonalField::StudentId => &info.ma_so_sinh_vien,
            PersonalField::Gender => &info.gioi_tinh,
            PersonalField::Faculty => &info.khoa,
            PersonalField::AcademicYear => &info.nam_hoc,
            PersonalField::SocialMediaHours => &info.social_media_hours,
        }
    }

    fn value_mut<'a>(&self, info: &'a mut PersonalInfo) -> &'a mut String {
        match self {
            PersonalField::FullName => &mut info.ho_va_ten,
            PersonalField::StudentId => &mut info.ma_so_sinh_vien,
            PersonalField::Gender => &mut info.gioi_tinh,
            PersonalField::Faculty => &mut info.khoa,
            PersonalField::AcademicYear => &mut info.nam_hoc,
            PersonalField::SocialMediaHours => &mut info.social_media_hours,
        }
    }
}

impl FromStr for PersonalField {
    type Err = WizardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ho_va_ten" => Ok(PersonalField::FullName),
            "ma_so_sinh_vien" => Ok(PersonalField::StudentId),
            "gioi_tinh" => Ok(PersonalField::Gender),
            "khoa" => Ok(PersonalField::Faculty),
            "nam_hoc" => Ok(PersonalField::AcademicYear),
            "social_media_hours" => Ok(PersonalField::SocialMediaHours),
            other => Err(WizardError::UnknownField(other.to_string())),
        }
    }
}

impl fmt::Display for PersonalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum WizardError {
    #[error("unknown section '{0}'")]
    UnknownSection(String),

    #[error("section '{section}' has no question {ordinal}")]
    UnknownQuestion { section: String, ordinal: usize },

    #[error("'{value}' is not a valid answer for {key}")]
    InvalidValue { key: String, value: String },

    #[error("unknown personal field '{0}'")]
    UnknownField(String),
}

#[derive(Error, Debug)]
pub enum SubmitError {
    #[error("the survey can only be submitted from the last step")]
    NotOnFinalStep,

    #[error("{0} field(s) still need an answer")]
    Invalid(usize),

    #[error("submission endpoint failed: {0}")]
    Endpoint(#[from] RequestError),
}

/// Where the survey sends a completed record.
pub trait SurveySink {
    fn submit_survey(&self, record: &SurveyRecord) -> Result<(), RequestError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// The active step changed; the host should scroll back to the top.
    Moved { step: usize },
    Stayed,
}

impl StepOutcome {
    pub fn scroll_to_top(&self) -> bool {
        matches!(self, StepOutcome::Moved { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitStatus {
    Success(String),
    Error(String),
}

/// The workflow stage that follows a successful submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextStage {
    FileUpload,
}

/// Paginated survey state machine. Every mutation is mirrored into the
/// backing store so a restart resumes on the same step with the same answers.
pub struct SurveyWizard<S> {
    state: WizardState,
    errors: ValidationErrors,
    store: FormStore<S>,
    submit_status: Option<SubmitStatus>,
    submitted: bool,
}

impl<S: KeyValueStore> SurveyWizard<S> {
    pub fn new(backend: S) -> Self {
        let store = FormStore::new(backend);
        let mut state = store.load();
        resync_progress(&mut state);
        debug!(
            "survey restored at step {} with {} answer(s)",
            state.active_step,
            state.answers.len()
        );

        Self {
            state,
            errors: ValidationErrors::new(),
            store,
            submit_status: None,
            submitted: false,
        }
    }

    pub fn state(&self) -> &WizardState {
        &self.state
    }

    pub fn active_step(&self) -> usize {
        self.state.active_step
    }

    pub fn current_section(&self) -> &'static Section {
        &SECTIONS[self.state.active_step]
    }

    pub fn is_final_step(&self) -> bool {
        self.state.active_step == SECTIONS.len() - 1
    }

    pub fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    pub fn submit_status(&self) -> Option<&SubmitStatus> {
        self.submit_status.as_ref()
    }

    pub fn progress(&self, section_key: &str) -> u8 {
        self.state.progress.get(section_key).copied().unwrap_or(0)
    }

    pub fn answer(&self, section_key: &str, ordinal: usize) -> Option<&str> {
        self.state
            .answers
            .get(&answer_key(section_key, ordinal))
            .map(String::as_str)
    }

    pub fn store(&self) -> &FormStore<S> {
        &self.store
    }

    /// True when leaving now would lose in-progress answers.
    pub fn should_confirm_leave(&self) -> bool {
        self.state.active_step > 0 && !self.submitted
    }

    pub fn set_answer(
        &mut self,
        section_key: &str,
        ordinal: usize,
        value: &str,
    ) -> Result<(), WizardError> {
        let (_, section) = section_by_key(section_key)
            .ok_or_else(|| WizardError::UnknownSection(section_key.to_string()))?;

        if section.is_social_media_item(ordinal) {
            return self.set_personal_field(PersonalField::SocialMediaHours, value);
        }

        let key = answer_key(section_key, ordinal);
        if section.question(ordinal).is_none() {
            return Err(WizardError::UnknownQuestion {
                section: section_key.to_string(),
                ordinal,
            });
        }
        if !is_likert_value(value) {
            return Err(WizardError::InvalidValue {
                key,
                value: value.to_string(),
            });
        }

        self.state.answers.insert(key.clone(), value.to_string());
        self.recompute_progress(section);
        self.errors.remove(&key);
        self.persist();
        Ok(())
    }

    pub fn set_personal_field(
        &mut self,
        field: PersonalField,
        value: &str,
    ) -> Result<(), WizardError> {
        if field == PersonalField::SocialMediaHours
            && !value.is_empty()
            && !is_social_media_value(value)
        {
            return Err(WizardError::InvalidValue {
                key: field.name().to_string(),
                value: value.to_string(),
            });
        }

        *field.value_mut(&mut self.state.personal) = value.to_string();

        if !value.is_empty() {
            self.errors.remove(field.name());
        }
        if field == PersonalField::SocialMediaHours {
            if !value.is_empty() {
                self.errors
                    .remove(&answer_key(SOCIAL_MEDIA_SECTION_KEY, SOCIAL_MEDIA_ORDINAL));
            }
            if let Some((_, section)) = section_by_key(SOCIAL_MEDIA_SECTION_KEY) {
                self.recompute_progress(section);
            }
        }

        self.persist();
        Ok(())
    }

    pub fn advance(&mut self) -> StepOutcome {
        let errors = self.validate_step(self.state.active_step);
        if !errors.is_empty() {
            info!(
                "step '{}' blocked by {} validation error(s)",
                self.current_section().key,
                errors.len()
            );
            self.errors = errors;
            return StepOutcome::Stayed;
        }

        self.errors.clear();
        if self.is_final_step() {
            debug!("last step is valid, waiting for submission");
            return StepOutcome::Stayed;
        }

        self.state.active_step += 1;
        self.persist();
        StepOutcome::Moved {
            step: self.state.active_step,
        }
    }

    pub fn retreat(&mut self) -> StepOutcome {
        if self.state.active_step == 0 {
            return StepOutcome::Stayed;
        }

        self.state.active_step -= 1;
        self.errors.clear();
        self.persist();
        StepOutcome::Moved {
            step: self.state.active_step,
        }
    }

    /// Validation for `step` without touching the stored errors.
    pub fn validate_step(&self, step: usize) -> ValidationErrors {
        let Some(section) = SECTIONS.get(step) else {
            return ValidationErrors::new();
        };

        if section.is_personal_info() {
            return PersonalField::REQUIRED
                .iter()
                .filter(|field| field.value(&self.state.personal).is_empty())
                .map(|field| (field.name().to_string(), field.missing_message().to_string()))
                .collect();
        }

        (1..=section.question_count())
            .filter_map(|ordinal| {
                let key = answer_key(section.key, ordinal);
                if section.is_social_media_item(ordinal) {
                    self.state
                        .personal
                        .social_media_hours
                        .is_empty()
                        .then(|| (key, MSG_PICK_SOCIAL_HOURS.to_string()))
                } else if self.state.answers.contains_key(&key) {
                    None
                } else {
                    Some((key, MSG_PICK_ANSWER.to_string()))
                }
            })
            .collect()
    }

    pub fn record(&self) -> SurveyRecord {
        let mut record: SurveyRecord = PersonalField::REQUIRED
            .iter()
            .map(|field| {
                (
                    field.name().to_string(),
                    field.value(&self.state.personal).to_string(),
                )
            })
            .collect();
        record.extend(
            self.state
                .answers
                .iter()
                .map(|(key, value)| (key.clone(), value.clone())),
        );
        record
    }

    pub fn submit(&mut self, sink: &impl SurveySink) -> Result<NextStage, SubmitError> {
        if !self.is_final_step() {
            return Err(SubmitError::NotOnFinalStep);
        }

        let errors = self.validate_step(self.state.active_step);
        if !errors.is_empty() {
            let count = errors.len();
            self.errors = errors;
            return Err(SubmitError::Invalid(count));
        }

        let personal_errors = self.validate_step(0);
        if !personal_errors.is_empty() {
            error!(
                "personal info incomplete at submission: {:?}",
                personal_errors.keys().collect::<Vec<_>>()
            );
            self.submit_status = Some(SubmitStatus::Error(MSG_PERSONAL_INCOMPLETE.to_string()));
            return Err(SubmitError::Invalid(personal_errors.len()));
        }

        let record = self.record();
        debug!("submitting survey with {} field(s)", record.len());

        if let Err(e) = sink.submit_survey(&record) {
            error!("error submitting survey: {}", e);
            self.submit_status = Some(SubmitStatus::Error(MSG_SUBMIT_FAILED.to_string()));
            return Err(e.into());
        }

        info!("survey submitted");
        self.errors.clear();
        self.submitted = true;
        self.submit_status = Some(SubmitStatus::Success(MSG_SUBMIT_OK.to_string()));
        if let Err(e) = self.store.clear() {
            warn!("submitted, but persisted progress could not be cleared: {}", e);
        }
        Ok(NextStage::FileUpload)
    }

    fn recompute_progress(&mut self, section: &Section) {
        let percentage = section_progress(&self.state, section);
        self.state.progress.insert(section.key.to_string(), percentage);
    }

    fn persist(&mut self) {
        if let Err(e) = self.store.save(&self.state) {
            warn!("could not persist survey progress: {}", e);
        }
    }
}

fn section_progress(state: &WizardState, section: &Section) -> u8 {
    let total = section.question_count();
    if total == 0 {
        return 0;
    }

    let answered = (1..=total)
        .filter(|&ordinal| {
            if section.is_social_media_item(ordinal) {
                !state.personal.social_media_hours.is_empty()
            } else {
                state
                    .answers
                    .contains_key(&answer_key(section.key, ordinal))
            }
        })
        .count();

    (answered as f64 / total as f64 * 100.0).round() as u8
}

/// Progress keys are restored independently of the answers, so a stale or
/// missing entry is rebuilt from what was actually restored.
fn resync_progress(state: &mut WizardState) {
    for section in SECTIONS.iter().filter(|s| !s.is_personal_info()) {
        let percentage = section_progress(state, section);
        let stored = state.progress.get(section.key).copied();
        if stored != Some(percentage) && (percentage > 0 || stored.is_some()) {
            warn!(
                "restored progress for section '{}' was {:?}, answers give {}",
                section.key, stored, percentage
            );
            state.progress.insert(section.key.to_string(), percentage);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::survey::store::{MemoryStore, PROGRESS_KEY, SCORES_KEY};

    struct RecordingSink {
        fail_with: Option<u16>,
        received: RefCell<Vec<SurveyRecord>>,
    }

    impl RecordingSink {
        fn ok() -> Self {
            Self {
                fail_with: None,
                received: RefCell::new(Vec::new()),
            }
        }

        fn failing(status: u16) -> Self {
            Self {
                fail_with: Some(status),
                received: RefCell::new(Vec::new()),
            }
        }
    }

    impl SurveySink for RecordingSink {
        fn submit_survey(&self, record: &SurveyRecord) -> Result<(), RequestError> {
            self.received.borrow_mut().push(record.clone());
            match self.fail_with {
                Some(status) => Err(RequestError::ServerError { status }),
                None => Ok(()),
            }
        }
    }

    fn wizard() -> SurveyWizard<MemoryStore> {
        SurveyWizard::new(MemoryStore::new())
    }

    fn fill_personal(w: &mut SurveyWizard<MemoryStore>) {
        w.set_personal_field(PersonalField::FullName, "Trần Thị B").unwrap();
        w.set_personal_field(PersonalField::StudentId, "2221050123").unwrap();
        w.set_personal_field(PersonalField::Gender, "Nữ").unwrap();
        w.set_personal_field(PersonalField::Faculty, "Công nghệ Thông tin")
            .unwrap();
        w.set_personal_field(PersonalField::AcademicYear, "2").unwrap();
    }

    fn fill_section(w: &mut SurveyWizard<MemoryStore>, key: &str) {
        let (_, section) = section_by_key(key).unwrap();
        for ordinal in 1..=section.question_count() {
            if section.is_social_media_item(ordinal) {
                w.set_personal_field(PersonalField::SocialMediaHours, "3")
                    .unwrap();
            } else {
                w.set_answer(key, ordinal, "4").unwrap();
            }
        }
    }

    fn walk_to_final_step(w: &mut SurveyWizard<MemoryStore>) {
        fill_personal(w);
        assert_eq!(w.advance(), StepOutcome::Moved { step: 1 });
        for section in &SECTIONS[1..SECTIONS.len() - 1] {
            fill_section(w, section.key);
            assert!(w.advance().scroll_to_top());
        }
        assert!(w.is_final_step());
    }

    #[test]
    fn personal_step_reports_only_missing_faculty() {
        let mut w = wizard();
        w.set_personal_field(PersonalField::FullName, "A").unwrap();
        w.set_personal_field(PersonalField::StudentId, "1").unwrap();
        w.set_personal_field(PersonalField::Gender, "Nam").unwrap();
        w.set_personal_field(PersonalField::AcademicYear, "1").unwrap();

        assert_eq!(w.advance(), StepOutcome::Stayed);
        assert_eq!(w.active_step(), 0);
        assert_eq!(w.errors().len(), 1);
        assert_eq!(w.errors()["khoa"], "Vui lòng chọn khoa");
    }

    #[test]
    fn social_media_hours_is_not_required_on_personal_step() {
        let mut w = wizard();
        fill_personal(&mut w);
        assert_eq!(w.advance(), StepOutcome::Moved { step: 1 });
        assert!(w.errors().is_empty());
    }

    #[test]
    fn error_clears_when_field_receives_value() {
        let mut w = wizard();
        w.advance();
        assert_eq!(w.errors().len(), 5);

        w.set_personal_field(PersonalField::FullName, "").unwrap();
        assert!(w.errors().contains_key("ho_va_ten"));

        w.set_personal_field(PersonalField::FullName, "C").unwrap();
        assert!(!w.errors().contains_key("ho_va_ten"));
        assert_eq!(w.errors().len(), 4);
    }

    #[test]
    fn content_step_requires_every_ordinal() {
        let mut w = wizard();
        fill_personal(&mut w);
        w.advance();

        for ordinal in 1..=4 {
            w.set_answer("I", ordinal, "5").unwrap();
        }
        assert_eq!(w.advance(), StepOutcome::Stayed);
        assert_eq!(w.errors().keys().collect::<Vec<_>>(), vec!["I_5"]);

        w.set_answer("I", 5, "1").unwrap();
        assert!(w.errors().is_empty());
        assert_eq!(w.advance(), StepOutcome::Moved { step: 2 });
    }

    #[test]
    fn social_media_item_is_routed_through_personal_info() {
        let mut w = wizard();
        fill_personal(&mut w);
        w.advance();
        fill_section(&mut w, "I");
        w.advance();
        assert_eq!(w.current_section().key, "II");

        for ordinal in 1..=4 {
            w.set_answer("II", ordinal, "2").unwrap();
        }
        assert_eq!(w.advance(), StepOutcome::Stayed);
        assert!(w.errors().contains_key("II_5"));
        assert_eq!(w.progress("II"), 80);

        w.set_answer("II", 5, "5+").unwrap();
        assert_eq!(w.state().personal.social_media_hours, "5+");
        assert!(!w.state().answers.contains_key("II_5"));
        assert!(w.errors().is_empty());
        assert_eq!(w.progress("II"), 100);
        assert_eq!(w.advance(), StepOutcome::Moved { step: 3 });
    }

    #[test]
    fn progress_is_rounded_percentage() {
        let mut w = wizard();
        w.set_answer("VI", 1, "3").unwrap();
        assert_eq!(w.progress("VI"), 25);

        w.set_answer("I", 1, "3").unwrap();
        w.set_answer("I", 2, "3").unwrap();
        assert_eq!(w.progress("I"), 40);

        // re-answering does not double count
        w.set_answer("I", 2, "5").unwrap();
        assert_eq!(w.progress("I"), 40);

        assert_eq!(w.progress("IX"), 0);
    }

    #[test]
    fn rejects_bad_answers() {
        let mut w = wizard();
        assert_eq!(
            w.set_answer("XI", 1, "3"),
            Err(WizardError::UnknownSection("XI".into()))
        );
        assert!(matches!(
            w.set_answer("VI", 5, "3"),
            Err(WizardError::UnknownQuestion { .. })
        ));
        assert!(matches!(
            w.set_answer("I", 1, "6"),
            Err(WizardError::InvalidValue { .. })
        ));
        assert!(matches!(
            w.set_answer("II", 5, "7"),
            Err(WizardError::InvalidValue { .. })
        ));
        assert!(w.state().answers.is_empty());
        assert_eq!(
            "nickname".parse::<PersonalField>(),
            Err(WizardError::UnknownField("nickname".into()))
        );
    }

    #[test]
    fn retreat_is_guarded_at_first_step() {
        let mut w = wizard();
        assert_eq!(w.retreat(), StepOutcome::Stayed);
        assert!(!w.retreat().scroll_to_top());

        fill_personal(&mut w);
        w.advance();
        w.advance();
        assert!(!w.errors().is_empty());

        assert_eq!(w.retreat(), StepOutcome::Moved { step: 0 });
        assert!(w.errors().is_empty());
    }

    #[test]
    fn reload_resumes_in_progress_answers() {
        let mut w = wizard();
        fill_personal(&mut w);
        w.advance();
        w.set_answer("I", 1, "2").unwrap();
        w.set_answer("I", 3, "4").unwrap();

        let backend = w.store().backend().clone();
        let restored = SurveyWizard::new(backend);

        assert_eq!(restored.state(), w.state());
        assert_eq!(restored.active_step(), 1);
        assert_eq!(restored.answer("I", 3), Some("4"));
        assert_eq!(restored.progress("I"), 40);
    }

    #[test]
    fn reload_with_corrupt_answers_resets_progress() {
        let mut w = wizard();
        w.set_answer("I", 1, "2").unwrap();
        w.set_answer("I", 2, "5").unwrap();
        assert_eq!(w.progress("I"), 40);

        let mut backend = w.store().backend().clone();
        backend.set(SCORES_KEY, "{not json").unwrap();
        let restored = SurveyWizard::new(backend);

        assert!(restored.state().answers.is_empty());
        assert_eq!(restored.progress("I"), 0);
    }

    #[test]
    fn reload_without_progress_derives_it_from_answers() {
        let mut w = wizard();
        fill_section(&mut w, "I");
        w.set_personal_field(PersonalField::SocialMediaHours, "3")
            .unwrap();

        let mut backend = w.store().backend().clone();
        backend.remove(PROGRESS_KEY).unwrap();
        let restored = SurveyWizard::new(backend);

        assert_eq!(restored.state().answers.len(), 5);
        assert_eq!(restored.progress("I"), 100);
        assert_eq!(restored.progress("II"), 20);
        assert_eq!(restored.progress("III"), 0);
    }

    #[test]
    fn leave_confirmation_after_first_step_until_submitted() {
        let mut w = wizard();
        assert!(!w.should_confirm_leave());

        walk_to_final_step(&mut w);
        assert!(w.should_confirm_leave());

        fill_section(&mut w, "X");
        w.submit(&RecordingSink::ok()).unwrap();
        assert!(!w.should_confirm_leave());
    }

    #[test]
    fn submit_only_from_final_step() {
        let mut w = wizard();
        let sink = RecordingSink::ok();
        assert!(matches!(w.submit(&sink), Err(SubmitError::NotOnFinalStep)));
        assert!(sink.received.borrow().is_empty());
    }

    #[test]
    fn submit_blocks_on_unanswered_final_section() {
        let mut w = wizard();
        walk_to_final_step(&mut w);
        w.set_answer("X", 1, "5").unwrap();

        let sink = RecordingSink::ok();
        assert!(matches!(w.submit(&sink), Err(SubmitError::Invalid(3))));
        assert_eq!(w.errors().len(), 3);
        assert!(sink.received.borrow().is_empty());
    }

    #[test]
    fn successful_submit_sends_flat_record_and_clears_store() {
        let mut w = wizard();
        walk_to_final_step(&mut w);
        fill_section(&mut w, "X");

        let sink = RecordingSink::ok();
        assert_eq!(w.submit(&sink).unwrap(), NextStage::FileUpload);

        let sent = sink.received.borrow();
        let record = &sent[0];
        assert_eq!(record["khoa"], "Công nghệ Thông tin");
        assert_eq!(record["I_1"], "4");
        assert_eq!(record["X_4"], "4");
        assert!(!record.contains_key("II_5"));
        assert!(!record.contains_key("social_media_hours"));
        // II_5 lives in personal info, not in the answers
        assert_eq!(record.len(), 5 + 44);

        assert!(matches!(w.submit_status(), Some(SubmitStatus::Success(_))));
        assert_eq!(w.store().load(), WizardState::default());
    }

    #[test]
    fn failed_submit_keeps_state_for_retry() {
        let mut w = wizard();
        walk_to_final_step(&mut w);
        fill_section(&mut w, "X");
        let before = w.state().clone();

        let err = w.submit(&RecordingSink::failing(500)).unwrap_err();
        assert!(matches!(
            err,
            SubmitError::Endpoint(RequestError::ServerError { status: 500 })
        ));
        assert_eq!(
            w.submit_status(),
            Some(&SubmitStatus::Error(MSG_SUBMIT_FAILED.to_string()))
        );
        assert_eq!(w.state(), &before);
        assert_eq!(w.store().load(), before);
        assert!(w.should_confirm_leave());

        assert!(w.submit(&RecordingSink::ok()).is_ok());
    }
}
