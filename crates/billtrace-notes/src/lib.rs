//! Fiscal-note generation (Stage 5), citation/attribution binding
//! (Stage 6/7), and the chronological change ledger (Stage I).

pub mod attribution;
pub mod changes;
pub mod cumulative;
pub mod error;
pub mod generator;

pub use attribution::{enhance_note, resolve_document_citations, resolve_money_citations};
pub use changes::diff_notes;
pub use cumulative::{is_checkpoint, visible_numbers};
pub use error::Error;
pub use generator::{generate_notes, GeneratedNote};
