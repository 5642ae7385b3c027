pub mod bill;
pub mod document;
pub mod error;
pub mod job;
pub mod money;
pub mod note;
pub mod retrieval;
pub mod snapshot;
pub mod status;
pub mod timeline;

pub use bill::{BillId, Chamber};
pub use document::{Document, DocumentKind, DocumentType};
pub use error::{ErrorKind, PipelineError};
pub use job::{Job, JobState};
pub use money::{Currency, MoneyOccurrence};
pub use note::{
    AttributedChunk, ChangeKind, CitationMap, CitedMoney, FiscalNote, NoteMetadata,
    SectionChange, SentenceAttribution, SECTION_KEYS,
};
pub use retrieval::{Extractor, RetrievalLogEntry, RetrievalOutcome};
pub use snapshot::PortalSnapshot;
pub use status::StatusEvent;
pub use timeline::{Timeline, TimelineEntry};
