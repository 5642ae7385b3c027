/// A single monetary amount discovered in a document, with surrounding
/// context. Per spec.md §3: `amount` is non-negative and was literally
/// present in the source text after normalizing `$`, commas, and `USD`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MoneyOccurrence {
    pub amount: f64,
    pub currency: Currency,
    pub filename: String,
    pub context: String,
    pub offset_chars: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Currency {
    Usd,
}

impl Default for Currency {
    fn default() -> Self {
        Currency::Usd
    }
}
