use crate::document::Document;
use crate::status::StatusEvent;

/// Stage 1 output: the bill landing page reduced to its status timeline and
/// document list, per spec.md §4.2.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct PortalSnapshot {
    pub status_rows: Vec<StatusEvent>,
    pub documents: Vec<Document>,
    pub committee_report_names: Vec<String>,
}
