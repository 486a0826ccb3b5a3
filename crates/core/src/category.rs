//! Center categories
//!
//! Centers carry a free-form category string entered by owners ("PC Gaming",
//! "PlayStation 5", "Billiard club", ...). Filtering works on the normalized
//! [`CenterCategory`] instead.

use serde::{Deserialize, Serialize};

/// Normalized venue category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CenterCategory {
    #[serde(rename = "pc-center")]
    PcCenter,
    #[serde(rename = "ps5")]
    Ps5,
    #[serde(rename = "billard")]
    Billard,
    #[default]
    #[serde(rename = "gaming")]
    Gaming,
}

impl CenterCategory {
    pub fn id(&self) -> &'static str {
        match self {
            CenterCategory::PcCenter => "pc-center",
            CenterCategory::Ps5 => "ps5",
            CenterCategory::Billard => "billard",
            CenterCategory::Gaming => "gaming",
        }
    }

    pub fn all() -> &'static [CenterCategory] {
        &[
            CenterCategory::PcCenter,
            CenterCategory::Ps5,
            CenterCategory::Billard,
            CenterCategory::Gaming,
        ]
    }

    pub fn from_id(id: &str) -> Option<CenterCategory> {
        Self::all().iter().copied().find(|c| c.id() == id)
    }

    /// Map a raw category string onto a category.
    ///
    /// Checks run in order: `pc`, then `ps`/`playstation`, then
    /// `billard`/`billiard`, then `game`. Missing or unrecognized values
    /// read as [`CenterCategory::Gaming`].
    pub fn normalize(raw: Option<&str>) -> CenterCategory {
        let val = raw.unwrap_or("").trim().to_lowercase();
        if val.contains("pc") {
            CenterCategory::PcCenter
        } else if val.contains("ps") || val.contains("playstation") {
            CenterCategory::Ps5
        } else if val.contains("billard") || val.contains("billiard") {
            CenterCategory::Billard
        } else {
            // "game" without "pc" and anything unrecognized both land here
            CenterCategory::Gaming
        }
    }
}

impl std::fmt::Display for CenterCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

/// Category chip selected in the UI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CategorySelection {
    #[default]
    All,
    /// Featured centers whose owner is on `business_pro`
    Vip,
    Category(CenterCategory),
}

impl CategorySelection {
    /// Parse a selection id; anything other than `all`, `vip` or a category id
    /// goes through the same heuristics as center categories.
    pub fn parse(raw: &str) -> CategorySelection {
        let val = raw.trim().to_lowercase();
        match val.as_str() {
            "" | "all" => CategorySelection::All,
            "vip" => CategorySelection::Vip,
            other => CategorySelection::Category(
                CenterCategory::from_id(other)
                    .unwrap_or_else(|| CenterCategory::normalize(Some(other))),
            ),
        }
    }
}
