use std::fmt;
use std::str::FromStr;

/// The legislative chamber a bill originated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Chamber {
    House,
    Senate,
}

impl Chamber {
    /// Single-letter portal code, e.g. `H` or `S`.
    pub fn code(&self) -> &'static str {
        match self {
            Chamber::House => "H",
            Chamber::Senate => "S",
        }
    }
}

impl fmt::Display for Chamber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("invalid chamber code {0:?}, expected \"H\" or \"S\"")]
pub struct ChamberParseError(String);

impl FromStr for Chamber {
    type Err = ChamberParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "H" => Ok(Chamber::House),
            "S" => Ok(Chamber::Senate),
            other => Err(ChamberParseError(other.to_string())),
        }
    }
}

/// A bill identifier: `(chamber, number, year)`, canonically rendered as
/// `{chamber}B_{number}_{year}` (e.g. `HB_1483_2025`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct BillId {
    pub chamber: Chamber,
    pub number: u32,
    pub year: u32,
}

impl BillId {
    pub fn new(chamber: Chamber, number: u32, year: u32) -> Self {
        Self {
            chamber,
            number,
            year,
        }
    }

    /// Canonical string form, also used as the per-bill filesystem directory name.
    pub fn canonical(&self) -> String {
        format!("{}B_{}_{}", self.chamber, self.number, self.year)
    }

    /// The portal's query-string bill type, e.g. `HB` or `SB`.
    pub fn portal_bill_type(&self) -> String {
        format!("{}B", self.chamber)
    }
}

impl fmt::Display for BillId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BillIdParseError {
    #[error("expected form {{chamber}}B_{{number}}_{{year}}, got {0:?}")]
    Malformed(String),
    #[error(transparent)]
    Chamber(#[from] ChamberParseError),
    #[error("invalid number or year in {0:?}")]
    Numeric(String),
}

impl FromStr for BillId {
    type Err = BillIdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('_');
        let head = parts
            .next()
            .ok_or_else(|| BillIdParseError::Malformed(s.to_string()))?;
        let number_str = parts
            .next()
            .ok_or_else(|| BillIdParseError::Malformed(s.to_string()))?;
        let year_str = parts
            .next()
            .ok_or_else(|| BillIdParseError::Malformed(s.to_string()))?;
        if parts.next().is_some() {
            return Err(BillIdParseError::Malformed(s.to_string()));
        }

        let chamber_code = head
            .strip_suffix('B')
            .ok_or_else(|| BillIdParseError::Malformed(s.to_string()))?;
        let chamber: Chamber = chamber_code.parse()?;

        let number: u32 = number_str
            .parse()
            .map_err(|_| BillIdParseError::Numeric(s.to_string()))?;
        let year: u32 = year_str
            .parse()
            .map_err(|_| BillIdParseError::Numeric(s.to_string()))?;

        Ok(BillId::new(chamber, number, year))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_canonical_form() {
        let id = BillId::new(Chamber::House, 1483, 2025);
        assert_eq!(id.canonical(), "HB_1483_2025");
        assert_eq!(id.canonical().parse::<BillId>().unwrap(), id);
    }

    #[test]
    fn rejects_malformed_ids() {
        assert!("HB_1483".parse::<BillId>().is_err());
        assert!("XB_1483_2025".parse::<BillId>().is_err());
        assert!("HB_abc_2025".parse::<BillId>().is_err());
    }

    #[test]
    fn portal_bill_type_is_chamber_plus_b() {
        let id = BillId::new(Chamber::Senate, 42, 2024);
        assert_eq!(id.portal_bill_type(), "SB");
    }
}
