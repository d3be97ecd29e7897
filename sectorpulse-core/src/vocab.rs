//! Sector vocabulary: the canonical, ordered list of industry sectors.
//!
//! The vocabulary is an immutable configuration value. It is passed into the
//! sanitizer (alias normalization, index sentinel), the ranking assigner and
//! the pivot views (fixed display order) instead of living in global state,
//! so tests can run against alternate vocabularies.
//!
//! Stored as TOML:
//!
//! ```toml
//! index_sentinel = "株価指数"
//! order = ["水産・農林業", "鉱業"]
//!
//! [aliases]
//! "水産･農林業" = "水産・農林業"
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// The 33 TSE industry sectors in exchange order.
pub const TSE33_SECTORS: [&str; 33] = [
    "水産・農林業",
    "鉱業",
    "建設業",
    "食料品",
    "繊維製品",
    "パルプ・紙",
    "化学",
    "医薬品",
    "石油・石炭製品",
    "ゴム製品",
    "ガラス・土石製品",
    "鉄鋼",
    "非鉄金属",
    "金属製品",
    "機械",
    "電気機器",
    "輸送用機器",
    "精密機器",
    "その他製品",
    "電気・ガス業",
    "陸運業",
    "海運業",
    "空運業",
    "倉庫・運輸関連業",
    "情報・通信業",
    "卸売業",
    "小売業",
    "銀行業",
    "証券、商品先物取引業",
    "保険業",
    "その他金融業",
    "不動産業",
    "サービス業",
];

/// Sector label used by raw files for index pseudo-rows.
pub const DEFAULT_INDEX_SENTINEL: &str = "株価指数";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectorVocabulary {
    /// Raw sector value marking index/aggregate pseudo-rows.
    #[serde(default = "default_sentinel")]
    pub index_sentinel: String,
    /// Canonical sectors in display order.
    pub order: Vec<String>,
    /// Raw spelling → canonical name.
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,
    #[serde(skip)]
    positions: HashMap<String, usize>,
}

fn default_sentinel() -> String {
    DEFAULT_INDEX_SENTINEL.to_string()
}

impl SectorVocabulary {
    pub fn new(
        order: Vec<String>,
        aliases: BTreeMap<String, String>,
        index_sentinel: impl Into<String>,
    ) -> Self {
        let mut vocab = Self {
            index_sentinel: index_sentinel.into(),
            order,
            aliases,
            positions: HashMap::new(),
        };
        vocab.reindex();
        vocab
    }

    /// TSE 33-sector vocabulary with the spelling variants seen in raw downloads.
    pub fn tse33() -> Self {
        let order = TSE33_SECTORS.iter().map(|s| s.to_string()).collect();
        let aliases = [
            ("水産･農林業", "水産・農林業"),
            ("パルプ･紙", "パルプ・紙"),
            ("石油･石炭製品", "石油・石炭製品"),
            ("ガラス･土石製品", "ガラス・土石製品"),
            ("電気･ガス業", "電気・ガス業"),
            ("倉庫･運輸関連業", "倉庫・運輸関連業"),
            ("倉庫・運輸関連", "倉庫・運輸関連業"),
            ("情報･通信業", "情報・通信業"),
            ("証券・商品先物取引業", "証券、商品先物取引業"),
            ("証券･商品先物取引業", "証券、商品先物取引業"),
            ("証券業", "証券、商品先物取引業"),
            ("電力・ガス業", "電気・ガス業"),
            ("通信業", "情報・通信業"),
        ]
        .into_iter()
        .map(|(raw, canonical)| (raw.to_string(), canonical.to_string()))
        .collect();
        Self::new(order, aliases, DEFAULT_INDEX_SENTINEL)
    }

    pub fn from_file(path: &Path) -> Result<Self, String> {
        let content =
            std::fs::read_to_string(path).map_err(|e| format!("read vocabulary file: {e}"))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, String> {
        let mut vocab: Self =
            toml::from_str(content).map_err(|e| format!("parse vocabulary TOML: {e}"))?;
        if vocab.order.is_empty() {
            return Err("vocabulary must list at least one sector".into());
        }
        vocab.reindex();
        Ok(vocab)
    }

    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("serialize vocabulary: {e}"))
    }

    fn reindex(&mut self) {
        self.positions = self
            .order
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();
    }

    /// Map a raw industry string to its canonical name.
    ///
    /// Unknown names pass through trimmed; they still aggregate and rank,
    /// they just have no fixed display position.
    pub fn normalize(&self, raw: &str) -> String {
        let trimmed = raw.trim();
        match self.aliases.get(trimmed) {
            Some(canonical) => canonical.clone(),
            None => trimmed.to_string(),
        }
    }

    pub fn is_index_sentinel(&self, raw: &str) -> bool {
        raw.trim() == self.index_sentinel
    }

    /// Display position of a canonical sector, `None` if outside the vocabulary.
    pub fn position(&self, sector: &str) -> Option<usize> {
        self.positions.get(sector).copied()
    }

    pub fn contains(&self, sector: &str) -> bool {
        self.positions.contains_key(sector)
    }

    pub fn sectors(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Sort key: vocabulary position first, unknown sectors after, by name.
    pub fn sort_key<'a>(&self, sector: &'a str) -> (usize, &'a str) {
        (self.position(sector).unwrap_or(usize::MAX), sector)
    }
}

impl Default for SectorVocabulary {
    fn default() -> Self {
        Self::tse33()
    }
}
