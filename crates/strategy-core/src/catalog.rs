//! Static framework catalog.
//!
//! The four frameworks and their categories are closed enums: a project can
//! never hold a framework key or category that is not listed here, and every
//! project holds all of them.

use crate::error::{Result, StrategyError};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Framework
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Framework {
    Pestle,
    Porter,
    #[serde(rename = "marketing4p")]
    Marketing4p,
    Swot,
}

impl Framework {
    pub fn all() -> &'static [Framework] {
        &[
            Framework::Pestle,
            Framework::Porter,
            Framework::Marketing4p,
            Framework::Swot,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Framework::Pestle => "pestle",
            Framework::Porter => "porter",
            Framework::Marketing4p => "marketing4p",
            Framework::Swot => "swot",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Framework::Pestle => "PESTLE Analysis",
            Framework::Porter => "Porter's Five Forces",
            Framework::Marketing4p => "Marketing Mix (4Ps)",
            Framework::Swot => "SWOT Analysis",
        }
    }

    /// Categories of this framework in catalog (display) order.
    pub fn categories(self) -> &'static [Category] {
        use Category::*;
        match self {
            Framework::Pestle => &[
                Political,
                Economic,
                Social,
                Technological,
                Legal,
                Environmental,
            ],
            Framework::Porter => &[
                CompetitiveRivalry,
                SupplierPower,
                BuyerPower,
                ThreatOfSubstitution,
                ThreatOfNewEntry,
            ],
            Framework::Marketing4p => &[Product, Price, Place, Promotion],
            Framework::Swot => &[Strengths, Weaknesses, Opportunities, Threats],
        }
    }
}

impl fmt::Display for Framework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Framework {
    type Err = StrategyError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pestle" => Ok(Framework::Pestle),
            "porter" | "porters" => Ok(Framework::Porter),
            "marketing4p" | "4ps" => Ok(Framework::Marketing4p),
            "swot" => Ok(Framework::Swot),
            _ => Err(StrategyError::UnknownFramework(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Category
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Political,
    Economic,
    Social,
    Technological,
    Legal,
    Environmental,
    CompetitiveRivalry,
    SupplierPower,
    BuyerPower,
    ThreatOfSubstitution,
    ThreatOfNewEntry,
    Product,
    Price,
    Place,
    Promotion,
    Strengths,
    Weaknesses,
    Opportunities,
    Threats,
}

impl Category {
    pub fn all() -> impl Iterator<Item = Category> {
        Framework::all()
            .iter()
            .flat_map(|fw| fw.categories().iter().copied())
    }

    pub fn framework(self) -> Framework {
        use Category::*;
        match self {
            Political | Economic | Social | Technological | Legal | Environmental => {
                Framework::Pestle
            }
            CompetitiveRivalry | SupplierPower | BuyerPower | ThreatOfSubstitution
            | ThreatOfNewEntry => Framework::Porter,
            Product | Price | Place | Promotion => Framework::Marketing4p,
            Strengths | Weaknesses | Opportunities | Threats => Framework::Swot,
        }
    }

    /// Stable slug, used as the framework item id on the wire.
    pub fn as_str(self) -> &'static str {
        use Category::*;
        match self {
            Political => "political",
            Economic => "economic",
            Social => "social",
            Technological => "technological",
            Legal => "legal",
            Environmental => "environmental",
            CompetitiveRivalry => "competitive-rivalry",
            SupplierPower => "supplier-power",
            BuyerPower => "buyer-power",
            ThreatOfSubstitution => "threat-of-substitution",
            ThreatOfNewEntry => "threat-of-new-entry",
            Product => "product",
            Price => "price",
            Place => "place",
            Promotion => "promotion",
            Strengths => "strengths",
            Weaknesses => "weaknesses",
            Opportunities => "opportunities",
            Threats => "threats",
        }
    }

    pub fn title(self) -> &'static str {
        use Category::*;
        match self {
            Political => "Political",
            Economic => "Economic",
            Social => "Social",
            Technological => "Technological",
            Legal => "Legal",
            Environmental => "Environmental",
            CompetitiveRivalry => "Competitive Rivalry",
            SupplierPower => "Supplier Power",
            BuyerPower => "Buyer Power",
            ThreatOfSubstitution => "Threat of Substitution",
            ThreatOfNewEntry => "Threat of New Entry",
            Product => "Product",
            Price => "Price",
            Place => "Place",
            Promotion => "Promotion",
            Strengths => "Strengths",
            Weaknesses => "Weaknesses",
            Opportunities => "Opportunities",
            Threats => "Threats",
        }
    }

    pub fn color(self) -> &'static str {
        use Category::*;
        match self {
            Political => "#ef4444",
            Economic => "#f59e0b",
            Social => "#10b981",
            Technological => "#3b82f6",
            Legal => "#8b5cf6",
            Environmental => "#22c55e",
            CompetitiveRivalry => "#dc2626",
            SupplierPower => "#ea580c",
            BuyerPower => "#0891b2",
            ThreatOfSubstitution => "#7c3aed",
            ThreatOfNewEntry => "#db2777",
            Product => "#2563eb",
            Price => "#16a34a",
            Place => "#ca8a04",
            Promotion => "#c026d3",
            Strengths => "#059669",
            Weaknesses => "#e11d48",
            Opportunities => "#0284c7",
            Threats => "#b45309",
        }
    }

    /// Resolve a `(framework key, item id)` pair as sent over the wire.
    pub fn lookup(framework: &str, item: &str) -> Result<Category> {
        let fw: Framework = framework.parse()?;
        fw.categories()
            .iter()
            .copied()
            .find(|c| c.as_str() == item.trim())
            .ok_or_else(|| StrategyError::UnknownCategory {
                framework: fw.to_string(),
                category: item.to_string(),
            })
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category slugs are unique across the whole catalog, so a bare slug is
/// enough to identify both the framework and the item.
impl std::str::FromStr for Category {
    type Err = StrategyError;

    fn from_str(s: &str) -> Result<Self> {
        let needle = s.trim().to_ascii_lowercase();
        Category::all()
            .find(|c| c.as_str() == needle)
            .ok_or_else(|| StrategyError::UnknownCategory {
                framework: "*".to_string(),
                category: s.to_string(),
            })
    }
}
