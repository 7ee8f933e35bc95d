//! Semantic column classification.
//!
//! Every column of a cleaned table lands in exactly one [`Category`]. An
//! ordered list of name rules is tried first and the first matching rule
//! wins. Columns no rule claims are checked for boolean-like content and
//! otherwise fall back on their type (`Numeric`, `Text` or `Other`).

use std::fmt;

use log::debug;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::{
    data::Value,
    frame::{Column, ColumnType, Table},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Time,
    Coordinates,
    BooleanLike,
    RegionOrArea,
    Species,
    SiteType,
    Counts,
    Lengths,
    Numeric,
    Text,
    Other,
}

impl Category {
    pub const FALLBACKS: [Category; 3] = [Category::Numeric, Category::Text, Category::Other];

    pub fn label(&self) -> &'static str {
        match self {
            Category::Time => "Time",
            Category::Coordinates => "Coordinates",
            Category::BooleanLike => "Boolean-like",
            Category::RegionOrArea => "Region or area",
            Category::Species => "Species",
            Category::SiteType => "Site type",
            Category::Counts => "Counts",
            Category::Lengths => "Lengths",
            Category::Numeric => "Numeric",
            Category::Text => "Text",
            Category::Other => "Other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A name rule: the trimmed, lowercased column name either contains one of
/// `contains_any` or equals one of `equals_any`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierRule {
    pub category: Category,
    #[serde(default)]
    pub contains_any: Vec<String>,
    #[serde(default)]
    pub equals_any: Vec<String>,
}

impl ClassifierRule {
    fn new(category: Category, contains_any: &[&str], equals_any: &[&str]) -> Self {
        Self {
            category,
            contains_any: contains_any.iter().map(|s| s.to_string()).collect(),
            equals_any: equals_any.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn matches(&self, normalized_name: &str) -> bool {
        self.equals_any.iter().any(|token| normalized_name == token)
            || self
                .contains_any
                .iter()
                .any(|token| normalized_name.contains(token.as_str()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Evaluated in order; the first match wins.
    pub rules: Vec<ClassifierRule>,
    pub true_tokens: Vec<String>,
    pub false_tokens: Vec<String>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        use Category::*;
        let rules = vec![
            ClassifierRule::new(
                Time,
                &[
                    "date",
                    "time",
                    "aika",
                    "päivä",
                    "kuukausi",
                    "viikko",
                    "vmi",
                    "vuosi",
                    "timestamp",
                    "datetime",
                    "created",
                    "modified",
                ],
                &["pvm", "pp", "dd", "kk", "mm", "yyyy", "vvvv", "vko"],
            ),
            ClassifierRule::new(
                Coordinates,
                &[
                    "lat",
                    "latitude",
                    "lon",
                    "long",
                    "lng",
                    "longitude",
                    "koord",
                    "coord",
                    "x_",
                    "y_",
                ],
                &["x", "y"],
            ),
            ClassifierRule::new(BooleanLike, &[], &[]),
            ClassifierRule::new(
                RegionOrArea,
                &[
                    "maakunta",
                    "region",
                    "county",
                    "province",
                    "country",
                    "block",
                    "stand",
                    "plot",
                    "pinta-ala",
                    "area",
                    "pinta_ala",
                ],
                &["site"],
            ),
            ClassifierRule::new(Species, &["species"], &["puulaji"]),
            ClassifierRule::new(
                SiteType,
                &[
                    "metsätyypp",
                    "metsa",
                    "forest type",
                    "site",
                    "soil",
                    "maaperä",
                    "ground type",
                ],
                &["site.type", "site_type", "maan_laji", "maalaji", "maa_laji"],
            ),
            ClassifierRule::new(
                Counts,
                &[
                    "count",
                    "number",
                    "quantity",
                    "määrä",
                    "lukumäärä",
                    "no",
                    "lkm",
                    "kpl",
                    "qty",
                ],
                &[],
            ),
            ClassifierRule::new(
                Lengths,
                &[
                    "length",
                    "pituus",
                    "height",
                    "korkeus",
                    "diameter",
                    "läpimitta",
                ],
                &[],
            ),
        ];
        let tokens = |items: &[&str]| items.iter().map(|s| s.to_string()).collect();
        Self {
            rules,
            true_tokens: tokens(&["1", "true", "yes", "y", "t", "on", "kyllä", "k", "tosi"]),
            false_tokens: tokens(&["0", "false", "no", "n", "f", "off", "ei", "epätosi"]),
        }
    }
}

impl ClassifierConfig {
    /// Rule categories in rule order, followed by the type fallbacks.
    pub fn category_order(&self) -> Vec<Category> {
        let mut order: Vec<Category> = Vec::new();
        for category in self
            .rules
            .iter()
            .map(|rule| rule.category)
            .chain(Category::FALLBACKS)
        {
            if !order.contains(&category) {
                order.push(category);
            }
        }
        order
    }

    fn is_boolean_token(&self, raw: &str) -> bool {
        let token = raw.trim().to_lowercase();
        self.true_tokens
            .iter()
            .chain(&self.false_tokens)
            .any(|candidate| candidate.to_lowercase() == token)
    }
}

/// Ordered mapping from category to the columns it holds. Only non-empty
/// categories are present.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryMap {
    entries: Vec<(Category, Vec<String>)>,
}

impl CategoryMap {
    pub fn get(&self, category: Category) -> &[String] {
        self.entries
            .iter()
            .find(|(c, _)| *c == category)
            .map(|(_, columns)| columns.as_slice())
            .unwrap_or_default()
    }

    pub fn categories(&self) -> impl Iterator<Item = Category> + '_ {
        self.entries.iter().map(|(c, _)| *c)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Category, &[String])> {
        self.entries.iter().map(|(c, cols)| (*c, cols.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for CategoryMap {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (category, columns) in &self.entries {
            map.serialize_entry(category.label(), columns)?;
        }
        map.end()
    }
}

/// True when the column has at least one value and every value reads
/// unambiguously as 0 or 1.
pub fn is_boolean_like(column: &Column, config: &ClassifierConfig) -> bool {
    let mut seen = false;
    for value in column.non_null() {
        seen = true;
        let ok = match value {
            Value::Boolean(_) => true,
            Value::Integer(i) => *i == 0 || *i == 1,
            Value::Float(f) => *f == 0.0 || *f == 1.0,
            Value::String(s) => config.is_boolean_token(s),
            Value::DateTime(_) => false,
        };
        if !ok {
            return false;
        }
    }
    seen
}

fn fallback_category(kind: ColumnType) -> Category {
    match kind {
        kind if kind.is_numeric() => Category::Numeric,
        ColumnType::String => Category::Text,
        _ => Category::Other,
    }
}

/// Category of a single column.
pub fn classify_column(column: &Column, config: &ClassifierConfig) -> Category {
    let name = column.name().trim().to_lowercase();
    if let Some(rule) = config.rules.iter().find(|rule| rule.matches(&name)) {
        return rule.category;
    }
    if is_boolean_like(column, config) {
        return Category::BooleanLike;
    }
    fallback_category(column.kind())
}

pub fn classify(table: &Table, config: &ClassifierConfig) -> CategoryMap {
    let order = config.category_order();
    let mut buckets: Vec<(Category, Vec<String>)> =
        order.into_iter().map(|c| (c, Vec::new())).collect();

    for column in table.columns() {
        let category = classify_column(column, config);
        debug!("Column '{}' classified as {category}", column.name());
        if let Some((_, members)) = buckets.iter_mut().find(|(c, _)| *c == category)
            && !members.iter().any(|m| m == column.name())
        {
            members.push(column.name().to_string());
        }
    }

    buckets.retain(|(_, members)| !members.is_empty());
    CategoryMap { entries: buckets }
}
