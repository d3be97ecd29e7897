//! Short plain-text digest of the latest ledger date.
//!
//! Four tables: strongest and weakest sectors by overall weighted change,
//! and by the 5/20 turnover ratio. Each entry carries a streak: how many of
//! the most recent ledger dates (ending at the digest date) the sector was
//! in that same top or bottom group.

use chrono::NaiveDate;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use std::fmt::Write as _;

use crate::ledger::LedgerTable;
use crate::views::{overall_entries, ratio_entries};
use crate::vocab::SectorVocabulary;

pub const DEFAULT_TOP_N: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Top,
    Bottom,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DigestEntry {
    pub position: usize,
    pub sector: String,
    pub value: f64,
    /// (advancers, advancers + decliners); change sections only.
    pub breadth: Option<(u32, u32)>,
    pub streak: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DigestSection {
    pub title: String,
    pub side: Side,
    pub entries: Vec<DigestEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Digest {
    pub date: NaiveDate,
    pub sections: Vec<DigestSection>,
}

/// A (date → sector → value) series for one metric.
type Series = BTreeMap<NaiveDate, Vec<(String, f64)>>;

fn select<'a>(
    values: &'a [(String, f64)],
    side: Side,
    n: usize,
    vocab: &SectorVocabulary,
) -> Vec<&'a (String, f64)> {
    let mut sorted: Vec<&(String, f64)> = values.iter().collect();
    sorted.sort_by(|a, b| {
        let by_value = match side {
            Side::Top => b.1.partial_cmp(&a.1),
            Side::Bottom => a.1.partial_cmp(&b.1),
        }
        .unwrap_or(Ordering::Equal);
        by_value.then_with(|| vocab.sort_key(&a.0).cmp(&vocab.sort_key(&b.0)))
    });
    sorted.truncate(n);
    sorted
}

/// Consecutive dates, newest first from `latest`, on which `sector` was
/// among the selected group.
fn streak(series: &Series, latest: NaiveDate, sector: &str, side: Side, n: usize, vocab: &SectorVocabulary) -> usize {
    series
        .range(..=latest)
        .rev()
        .take_while(|(_, values)| {
            select(values, side, n, vocab)
                .iter()
                .any(|(s, _)| s == sector)
        })
        .count()
}

fn section(
    title: &str,
    series: &Series,
    date: NaiveDate,
    side: Side,
    n: usize,
    vocab: &SectorVocabulary,
    breadth: &BTreeMap<(NaiveDate, String), (u32, u32)>,
) -> DigestSection {
    let today = series.get(&date).map(Vec::as_slice).unwrap_or(&[]);
    let entries = select(today, side, n, vocab)
        .into_iter()
        .enumerate()
        .map(|(i, (sector, value))| DigestEntry {
            position: i + 1,
            sector: sector.clone(),
            value: *value,
            breadth: breadth.get(&(date, sector.clone())).copied(),
            streak: streak(series, date, sector, side, n, vocab),
        })
        .collect();
    DigestSection {
        title: title.to_string(),
        side,
        entries,
    }
}

/// Build the digest for the latest date in `sector_log`. `None` when the
/// ledger holds no overall rows.
pub fn build_digest(
    sector_log: &LedgerTable,
    momentum_log: &LedgerTable,
    vocab: &SectorVocabulary,
    top_n: usize,
) -> Option<Digest> {
    let overall = overall_entries(sector_log, vocab);
    let date = overall.iter().map(|e| e.date).max()?;

    let mut changes: Series = BTreeMap::new();
    let mut breadth = BTreeMap::new();
    let mut seen = HashSet::new();
    for e in &overall {
        if !seen.insert((e.date, e.sector.clone())) {
            continue;
        }
        breadth.insert((e.date, e.sector.clone()), (e.up_count, e.up_count + e.down_count));
        if let Some(v) = e.weighted_change {
            changes.entry(e.date).or_default().push((e.sector.clone(), v));
        }
    }

    let mut ratios: Series = BTreeMap::new();
    let mut seen = HashSet::new();
    for e in ratio_entries(momentum_log, vocab) {
        if !seen.insert((e.date, e.sector.clone())) {
            continue;
        }
        if let Some(v) = e.ratio_5_20 {
            ratios.entry(e.date).or_default().push((e.sector, v));
        }
    }
    let no_breadth = BTreeMap::new();

    Some(Digest {
        date,
        sections: vec![
            section("weighted change top", &changes, date, Side::Top, top_n, vocab, &breadth),
            section("weighted change bottom", &changes, date, Side::Bottom, top_n, vocab, &breadth),
            section("turnover 5d/20d ratio top", &ratios, date, Side::Top, top_n, vocab, &no_breadth),
            section("turnover 5d/20d ratio bottom", &ratios, date, Side::Bottom, top_n, vocab, &no_breadth),
        ],
    })
}

impl Digest {
    /// Plain-text rendering for a chat notification.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{} sector momentum digest", crate::domain::format_ledger_date(self.date));
        for section in &self.sections {
            let _ = writeln!(out);
            let _ = writeln!(out, "{}", section.title);
            if section.entries.is_empty() {
                let _ = writeln!(out, "  (no data)");
                continue;
            }
            for e in &section.entries {
                let _ = match e.breadth {
                    Some((up, total)) => {
                        let ratio = if total == 0 { 0.0 } else { up as f64 / total as f64 };
                        writeln!(
                            out,
                            "{} | {} | {}/{} ({:.2}) | {:.2} | {}d",
                            e.position, e.sector, up, total, ratio, e.value, e.streak
                        )
                    }
                    None => writeln!(
                        out,
                        "{} | {} | {:.2} | {}d",
                        e.position, e.sector, e.value, e.streak
                    ),
                };
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{MOMENTUM_HEADER, SECTOR_SUMMARY_HEADER};

    fn vocab() -> SectorVocabulary {
        SectorVocabulary::new(
            vec!["A".into(), "B".into(), "C".into()],
            Default::default(),
            "IDX",
        )
    }

    fn cells(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    fn sector_log() -> LedgerTable {
        let mut t = LedgerTable::with_header(&SECTOR_SUMMARY_HEADER);
        for (date, sector, change) in [
            ("2024/10/03", "A", "2.0"),
            ("2024/10/03", "B", "1.0"),
            ("2024/10/03", "C", "-1.0"),
            ("2024/10/02", "A", "1.0"),
            ("2024/10/02", "B", "0.5"),
            ("2024/10/02", "C", "3.0"),
            ("2024/10/01", "A", "5.0"),
            ("2024/10/01", "B", "-2.0"),
            ("2024/10/01", "C", "0.0"),
        ] {
            t.push_row(cells(&[date, sector, "overall", "3", "1", change, "10", "derived", ""]));
        }
        t
    }

    #[test]
    fn top_and_bottom_with_streaks() {
        let digest = build_digest(&sector_log(), &LedgerTable::default(), &vocab(), 2).unwrap();
        assert_eq!(digest.date.to_string(), "2024-10-03");

        let top = &digest.sections[0];
        assert_eq!(top.side, Side::Top);
        let names: Vec<&str> = top.entries.iter().map(|e| e.sector.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
        // A is in the top 2 on all three dates; B drops out on 10/02
        assert_eq!(top.entries[0].streak, 3);
        assert_eq!(top.entries[1].streak, 1);
        assert_eq!(top.entries[0].breadth, Some((3, 4)));

        let bottom = &digest.sections[1];
        assert_eq!(bottom.entries[0].sector, "C");
        assert_eq!(bottom.entries[0].streak, 1);
    }

    #[test]
    fn momentum_sections_use_digest_date() {
        let mut mom = LedgerTable::with_header(&MOMENTUM_HEADER);
        mom.push_row(cells(&["2024/10/03", "B", "1", "1", "1", "1", "1", "1.4", "1"]));
        mom.push_row(cells(&["2024/10/03", "A", "1", "1", "1", "1", "1", "", "1"]));
        let digest = build_digest(&sector_log(), &mom, &vocab(), 5).unwrap();
        let top = &digest.sections[2];
        assert_eq!(top.entries.len(), 1);
        assert_eq!(top.entries[0].sector, "B");
        assert_eq!(top.entries[0].breadth, None);
    }

    #[test]
    fn render_lists_every_section() {
        let digest = build_digest(&sector_log(), &LedgerTable::default(), &vocab(), 2).unwrap();
        let text = digest.render();
        assert!(text.starts_with("2024/10/03 sector momentum digest"));
        assert!(text.contains("1 | A | 3/4 (0.75) | 2.00 | 3d"));
        assert!(text.contains("turnover 5d/20d ratio top\n  (no data)"));
    }

    #[test]
    fn empty_ledger_has_no_digest() {
        assert!(build_digest(&LedgerTable::default(), &LedgerTable::default(), &vocab(), 5).is_none());
    }
}
