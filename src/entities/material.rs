//! Material entity and structured material codes
//!
//! Generated codes look like `P-13-05-0000-002`:
//! platform (`P` purchased, `R` in-house), two type digits, the two-digit
//! supplier code, a fixed `0000` block, and a three-digit sequence.

use serde::Serialize;

use super::DocExt;
use crate::core::error::{ImsError, ImsResult};
use crate::core::store::Document;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Material {
    pub material_code: String,
    pub material_name: Option<String>,
    pub specification: Option<String>,
    pub unit: Option<String>,
    pub supplier_name: Option<String>,
    pub supplier_code: Option<String>,
    pub unit_price: Option<f64>,
}

impl Material {
    pub fn from_doc(doc: &Document) -> Option<Self> {
        Some(Self {
            material_code: doc.text("material_code")?,
            material_name: doc.text("material_name"),
            specification: doc.text("specification"),
            unit: doc.text("unit"),
            supplier_name: doc.text("supplier_name"),
            supplier_code: doc.text("supplier_code"),
            unit_price: doc.number("unit_price"),
        })
    }

    /// Name + specification match used to resolve lines without a code
    pub fn matches_name(&self, name: &str, spec: Option<&str>) -> bool {
        let same_name = self
            .material_name
            .as_deref()
            .is_some_and(|n| n.trim() == name.trim());
        let same_spec = match (self.specification.as_deref(), spec) {
            (Some(a), Some(b)) => a.trim() == b.trim(),
            (_, None) => true,
            (None, Some(_)) => false,
        };
        same_name && same_spec
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaterialCode {
    pub platform: char,
    pub type1: u8,
    pub type2: u8,
    pub supplier_code: u8,
    pub sequence: u16,
}

impl MaterialCode {
    /// Validate the parts of a code; sequence starts at 1
    pub fn new(platform: &str, type1: &str, type2: &str, supplier_code: &str) -> ImsResult<Self> {
        let platform = match platform.trim().to_uppercase().as_str() {
            "P" => 'P',
            "R" => 'R',
            _ => {
                return Err(ImsError::validation(format!(
                    "platform must be P or R, got '{}'",
                    platform
                )))
            }
        };
        let digit = |name: &str, raw: &str| -> ImsResult<u8> {
            match raw.trim().parse::<u8>() {
                Ok(d) if d <= 9 => Ok(d),
                _ => Err(ImsError::validation(format!(
                    "{} must be a digit 0-9, got '{}'",
                    name, raw
                ))),
            }
        };
        let type1 = digit("type1", type1)?;
        let type2 = digit("type2", type2)?;
        let supplier_code = match supplier_code.trim().parse::<u8>() {
            Ok(c) if (1..=99).contains(&c) => c,
            _ => {
                return Err(ImsError::validation(format!(
                    "supplier_code must be 01-99, got '{}'",
                    supplier_code
                )))
            }
        };
        Ok(Self {
            platform,
            type1,
            type2,
            supplier_code,
            sequence: 1,
        })
    }

    /// Everything before the sequence: `P-13-05-0000`
    pub fn prefix(&self) -> String {
        format!(
            "{}-{}{}-{:02}-0000",
            self.platform, self.type1, self.type2, self.supplier_code
        )
    }

    /// Next free code given the existing material codes
    pub fn next_after<'a>(
        mut self,
        existing: impl IntoIterator<Item = &'a str>,
    ) -> ImsResult<Self> {
        let prefix = format!("{}-", self.prefix());
        let max = existing
            .into_iter()
            .filter_map(|code| code.strip_prefix(&prefix))
            .filter_map(|seq| seq.parse::<u16>().ok())
            .max()
            .unwrap_or(0);
        if max >= 999 {
            return Err(ImsError::validation(format!(
                "no free sequence left under {}",
                self.prefix()
            )));
        }
        self.sequence = max + 1;
        Ok(self)
    }
}

impl std::fmt::Display for MaterialCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{:03}", self.prefix(), self.sequence)
    }
}

impl std::str::FromStr for MaterialCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split('-').collect();
        let invalid = || format!("Invalid material code: {}. Expected P-XX-XX-0000-XXX", s);
        if parts.len() != 5 || parts[1].len() != 2 || parts[3] != "0000" {
            return Err(invalid());
        }
        let mut types = parts[1].chars();
        let (t1, t2) = (types.next(), types.next());
        let (Some(t1), Some(t2)) = (t1, t2) else {
            return Err(invalid());
        };
        let mut code = MaterialCode::new(parts[0], &t1.to_string(), &t2.to_string(), parts[2])
            .map_err(|_| invalid())?;
        code.sequence = parts[4].parse().map_err(|_| invalid())?;
        Ok(code)
    }
}
