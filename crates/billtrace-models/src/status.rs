/// One row of the portal's status table. Dates are opaque strings — the
/// chronology resolver never parses them (spec.md §4.3).
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StatusEvent {
    pub date: String,
    pub chamber: String,
    pub text: String,
}
