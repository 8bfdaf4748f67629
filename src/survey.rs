mod content;
mod store;
mod wizard;

pub use content::{
    answer_key, section_by_key, Section, FACULTY_OPTIONS, GENDER_OPTIONS, LIKERT_OPTIONS,
    SECTIONS, SOCIAL_MEDIA_OPTIONS,
};
pub use store::{
    FileStore, FormStore, KeyValueStore, MemoryStore, PersonalInfo, StoreError, WizardState,
};
pub use wizard::{
    NextStage, PersonalField, StepOutcome, SubmitError, SubmitStatus, SurveyRecord, SurveySink,
    SurveyWizard, ValidationErrors, WizardError,
};
