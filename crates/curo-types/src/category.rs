//! Treatment categories and plan classification
//!
//! A user may hold one plan per treatment category at a time; the
//! category is the partition key for everything plan-shaped in the
//! store, so classification has billing consequences and the fallback
//! case is logged rather than swallowed.

use serde::{Deserialize, Serialize};

use crate::ParseError;

/// Treatment category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// GLP-1 / weight management plans
    WeightLoss,
    /// Hair loss treatment plans
    HairRestoration,
    /// ED / sexual wellness plans
    SexualHealth,
    /// NAD+ / longevity plans
    Longevity,
}

/// Keyword table for classification, checked in order; first match wins.
const KEYWORDS: &[(Category, &[&str])] = &[
    (
        Category::HairRestoration,
        &["hair", "finasteride", "minoxidil", "dutasteride"],
    ),
    (
        Category::SexualHealth,
        &["sexual", "sildenafil", "tadalafil", "vardenafil", "erectile"],
    ),
    (
        Category::Longevity,
        &["longevity", "nad", "sermorelin", "glutathione"],
    ),
    (
        Category::WeightLoss,
        &["weight", "semaglutide", "tirzepatide", "glp"],
    ),
];

impl Category {
    /// All categories, in classification order
    pub const ALL: [Category; 4] = [
        Category::HairRestoration,
        Category::SexualHealth,
        Category::Longevity,
        Category::WeightLoss,
    ];

    /// Stable slug used as the partition key in the store
    pub const fn slug(&self) -> &'static str {
        match self {
            Self::WeightLoss => "weight_loss",
            Self::HairRestoration => "hair_restoration",
            Self::SexualHealth => "sexual_health",
            Self::Longevity => "longevity",
        }
    }

    /// Classify a product without defaulting.
    ///
    /// Tests keyword membership against the lower-cased product name,
    /// then against the caller-supplied category hint. Returns `None`
    /// when nothing matches.
    pub fn matching(product_name: &str, category_hint: &str) -> Option<Category> {
        let name = product_name.to_lowercase();
        let hint = category_hint.to_lowercase();

        for (category, keywords) in KEYWORDS {
            if keywords.iter().any(|k| name.contains(k) || hint.contains(k)) {
                return Some(*category);
            }
        }
        None
    }

    /// Classify a product, falling back to [`Category::WeightLoss`].
    ///
    /// Total: always returns a value. The fallback is logged because a
    /// misclassified product lands in the wrong billing partition.
    pub fn classify(product_name: &str, category_hint: &str) -> Category {
        Self::matching(product_name, category_hint).unwrap_or_else(|| {
            tracing::warn!(
                product_name = %product_name,
                category_hint = %category_hint,
                "No category keyword matched; defaulting to weight_loss"
            );
            Category::WeightLoss
        })
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.slug())
    }
}

impl std::str::FromStr for Category {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "weight_loss" => Ok(Self::WeightLoss),
            "hair_restoration" => Ok(Self::HairRestoration),
            "sexual_health" => Ok(Self::SexualHealth),
            "longevity" => Ok(Self::Longevity),
            other => Err(ParseError::UnknownCategory(other.to_string())),
        }
    }
}
