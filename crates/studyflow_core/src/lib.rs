pub mod context;
pub mod domain;
pub mod error;
pub mod memory;
pub mod ports;
pub mod quiz;
pub mod workflow;
pub mod wrong_notes;

#[cfg(test)]
mod testing;

pub use context::StudyContext;
pub use domain::{
    AuthState, Decoded, Grade, NoteKey, Payload, QuestionId, QuizData, QuizKind, QuizQuestion, QuizReport,
    QuizResult, SavedSession, SessionId, UploadResult, UserProfile, WrongNote,
};
pub use error::{StudyError, StudyResult};
pub use memory::MemoryKeyValueStore;
pub use ports::{
    GradeRequest, KeyValueStore, PdfRequest, PortError, PortResult, SaveSessionRequest, SessionBridge,
    StoreError, UploadRequest, WrongNotePayload,
};
pub use quiz::{GradeTicket, QuizError, QuizRunner, QuizState};
pub use workflow::StudyWorkflow;
pub use wrong_notes::WrongNoteStore;
