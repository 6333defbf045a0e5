use super::findings::{ClashCategory, Finding, RepairNote};
use crate::core::models::ids::ResidueKey;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::io::{self, Write};
use std::str::FromStr;

/// Name of one diagnostic pass; also the top-level key of its report section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckKind {
    Models,
    Chains,
    Altloc,
    Disulfides,
    Metals,
    Ligands,
    Hydrogens,
    Water,
    Amide,
    Chirality,
    Sidechains,
    Backbone,
    Clashes,
    UnknownResidues,
}

impl CheckKind {
    pub const ALL: [CheckKind; 14] = [
        CheckKind::Models,
        CheckKind::Chains,
        CheckKind::Altloc,
        CheckKind::Disulfides,
        CheckKind::Metals,
        CheckKind::Ligands,
        CheckKind::Hydrogens,
        CheckKind::Water,
        CheckKind::Amide,
        CheckKind::Chirality,
        CheckKind::Sidechains,
        CheckKind::Backbone,
        CheckKind::Clashes,
        CheckKind::UnknownResidues,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CheckKind::Models => "models",
            CheckKind::Chains => "chains",
            CheckKind::Altloc => "altloc",
            CheckKind::Disulfides => "disulfides",
            CheckKind::Metals => "metals",
            CheckKind::Ligands => "ligands",
            CheckKind::Hydrogens => "hydrogens",
            CheckKind::Water => "water",
            CheckKind::Amide => "amide",
            CheckKind::Chirality => "chirality",
            CheckKind::Sidechains => "sidechains",
            CheckKind::Backbone => "backbone",
            CheckKind::Clashes => "clashes",
            CheckKind::UnknownResidues => "unknown_residues",
        }
    }
}

impl fmt::Display for CheckKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CheckKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        CheckKind::ALL
            .into_iter()
            .find(|kind| kind.name() == wanted)
            .ok_or_else(|| format!("unknown check '{s}'"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckSection {
    pub count: usize,
    pub defects: usize,
    pub findings: Vec<Finding>,
}

impl CheckSection {
    fn new(findings: Vec<Finding>) -> Self {
        Self {
            count: findings.len(),
            defects: findings.iter().filter(|f| f.is_defect()).count(),
            findings,
        }
    }
}

/// Findings of every check for one structure revision.
///
/// Serializes as one JSON object with a top-level key per check name next to the entry id,
/// revision, unresolved count and repair notes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub entry_id: Option<String>,
    pub revision: u32,
    pub unresolved: usize,
    #[serde(flatten)]
    pub checks: BTreeMap<CheckKind, CheckSection>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<RepairNote>,
}

#[derive(Debug, Serialize)]
struct FindingRow {
    revision: u32,
    check: &'static str,
    finding: &'static str,
    subject: String,
    defect: bool,
    details: String,
}

impl Report {
    /// Assembles per-check findings into a report. A check listed twice has its findings
    /// concatenated.
    pub fn merge(
        entry_id: Option<String>,
        revision: u32,
        sections: impl IntoIterator<Item = (CheckKind, Vec<Finding>)>,
    ) -> Self {
        let mut grouped: BTreeMap<CheckKind, Vec<Finding>> = BTreeMap::new();
        for (kind, findings) in sections {
            grouped.entry(kind).or_default().extend(findings);
        }
        let checks: BTreeMap<CheckKind, CheckSection> = grouped
            .into_iter()
            .map(|(kind, findings)| (kind, CheckSection::new(findings)))
            .collect();
        let unresolved = checks.values().map(|s| s.defects).sum();
        Self {
            entry_id,
            revision,
            unresolved,
            checks,
            notes: Vec::new(),
        }
    }

    pub fn with_notes(mut self, notes: Vec<RepairNote>) -> Self {
        self.notes = notes;
        self
    }

    pub fn findings(&self, kind: CheckKind) -> &[Finding] {
        self.checks
            .get(&kind)
            .map_or(&[][..], |section| section.findings.as_slice())
    }

    pub fn count(&self, kind: CheckKind) -> usize {
        self.findings(kind).len()
    }

    pub fn defects(&self, kind: CheckKind) -> usize {
        self.checks.get(&kind).map_or(0, |s| s.defects)
    }

    pub fn clash_counts(&self) -> BTreeMap<ClashCategory, usize> {
        let mut counts = BTreeMap::new();
        for finding in self.findings(CheckKind::Clashes) {
            if let Finding::Clash(pair) = finding {
                *counts.entry(pair.category).or_insert(0) += 1;
            }
        }
        counts
    }

    /// Copy of the report with residue identities translated through `map`.
    pub fn remap_residues(&self, map: &BTreeMap<ResidueKey, ResidueKey>) -> Report {
        let mut report = self.clone();
        if map.is_empty() {
            return report;
        }
        for section in report.checks.values_mut() {
            for finding in &mut section.findings {
                finding.remap_residues(map);
            }
        }
        for note in &mut report.notes {
            if let Some(residue) = &mut note.residue {
                if let Some(new) = map.get(residue) {
                    *residue = new.clone();
                }
            }
        }
        report
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Writes one CSV row per finding: revision, check, finding type, subject, defect flag
    /// and the finding as compact JSON.
    pub fn write_csv<W: Write>(&self, writer: W) -> csv::Result<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        for (kind, section) in &self.checks {
            for finding in &section.findings {
                let details = serde_json::to_string(finding).map_err(|e| csv::Error::from(io::Error::other(e)))?;
                csv_writer.serialize(FindingRow {
                    revision: self.revision,
                    check: kind.name(),
                    finding: finding.type_name(),
                    subject: finding.subject(),
                    defect: finding.is_defect(),
                    details,
                })?;
            }
        }
        csv_writer.flush()?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CheckDelta {
    pub before: usize,
    pub after: usize,
    pub resolved: usize,
    pub introduced: usize,
}

/// Per-check change between two reports, matched by finding identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportDiff {
    pub from_revision: u32,
    pub to_revision: u32,
    pub unresolved_before: usize,
    pub unresolved_after: usize,
    pub checks: BTreeMap<CheckKind, CheckDelta>,
    pub severe_clashes_introduced: usize,
}

impl ReportDiff {
    pub fn between(before: &Report, after: &Report) -> Self {
        let kinds: std::collections::BTreeSet<CheckKind> =
            before.checks.keys().chain(after.checks.keys()).copied().collect();
        let checks = kinds
            .into_iter()
            .map(|kind| {
                let old = identity_counts(before.findings(kind));
                let new = identity_counts(after.findings(kind));
                let resolved = old
                    .iter()
                    .map(|(id, n)| n.saturating_sub(new.get(id).copied().unwrap_or(0)))
                    .sum();
                let introduced = new
                    .iter()
                    .map(|(id, n)| n.saturating_sub(old.get(id).copied().unwrap_or(0)))
                    .sum();
                (
                    kind,
                    CheckDelta {
                        before: before.count(kind),
                        after: after.count(kind),
                        resolved,
                        introduced,
                    },
                )
            })
            .collect();

        let severe_before = identity_counts(
            before
                .findings(CheckKind::Clashes)
                .iter()
                .filter(|f| matches!(f, Finding::Clash(p) if p.category == ClashCategory::Severe)),
        );
        let severe_clashes_introduced = after
            .findings(CheckKind::Clashes)
            .iter()
            .filter(|f| matches!(f, Finding::Clash(p) if p.category == ClashCategory::Severe))
            .filter(|f| !severe_before.contains_key(&f.identity()))
            .count();

        Self {
            from_revision: before.revision,
            to_revision: after.revision,
            unresolved_before: before.unresolved,
            unresolved_after: after.unresolved,
            checks,
            severe_clashes_introduced,
        }
    }

    pub fn total_resolved(&self) -> usize {
        self.checks.values().map(|d| d.resolved).sum()
    }

    pub fn total_introduced(&self) -> usize {
        self.checks.values().map(|d| d.introduced).sum()
    }
}

fn identity_counts<'a>(findings: impl IntoIterator<Item = &'a Finding>) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for finding in findings {
        *counts.entry(finding.identity()).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::ids::AtomKey;
    use crate::engine::findings::ClashPair;

    fn clash(a: isize, b: isize, category: ClashCategory) -> Finding {
        let key = |n: isize| AtomKey {
            residue: ResidueKey::new("A", n, None),
            residue_name: "VAL".into(),
            atom: "CG1".into(),
            altloc: None,
        };
        Finding::Clash(ClashPair {
            first: key(a),
            second: key(b),
            distance: 2.5,
            category,
        })
    }

    fn report(revision: u32, clashes: Vec<Finding>) -> Report {
        Report::merge(
            Some("1ABC".into()),
            revision,
            vec![
                (CheckKind::Hydrogens, vec![Finding::HydrogenCount { count: 0 }]),
                (CheckKind::Clashes, clashes),
            ],
        )
    }

    #[test]
    fn merge_counts_defects_per_section() {
        let report = report(0, vec![clash(1, 5, ClashCategory::Apolar), clash(2, 9, ClashCategory::Severe)]);
        assert_eq!(report.count(CheckKind::Clashes), 2);
        assert_eq!(report.defects(CheckKind::Hydrogens), 0);
        assert_eq!(report.unresolved, 2);
        assert_eq!(report.count(CheckKind::Chirality), 0);
        assert_eq!(report.clash_counts()[&ClashCategory::Severe], 1);
    }

    #[test]
    fn json_has_one_key_per_check() {
        let report = report(3, vec![clash(1, 5, ClashCategory::Apolar)]);
        let value: serde_json::Value = serde_json::from_str(&report.to_json_pretty().unwrap()).unwrap();
        assert_eq!(value["revision"], 3);
        assert_eq!(value["clashes"]["count"], 1);
        assert_eq!(value["clashes"]["findings"][0]["category"], "apolar");
        assert_eq!(value["hydrogens"]["findings"][0]["type"], "hydrogen_count");
        assert!(value.get("notes").is_none());
    }

    #[test]
    fn diff_matches_findings_by_identity() {
        let before = report(0, vec![clash(1, 5, ClashCategory::Apolar), clash(2, 9, ClashCategory::Apolar)]);
        let after = report(1, vec![clash(5, 1, ClashCategory::Apolar), clash(3, 7, ClashCategory::Severe)]);
        let diff = ReportDiff::between(&before, &after);
        let delta = diff.checks[&CheckKind::Clashes];
        assert_eq!(delta.before, 2);
        assert_eq!(delta.after, 2);
        assert_eq!(delta.resolved, 1);
        assert_eq!(delta.introduced, 1);
        assert_eq!(diff.severe_clashes_introduced, 1);
        assert_eq!(diff.checks[&CheckKind::Hydrogens], CheckDelta { before: 1, after: 1, resolved: 0, introduced: 0 });
    }

    #[test]
    fn csv_has_header_and_one_row_per_finding() {
        let report = report(0, vec![clash(1, 5, ClashCategory::Apolar)]);
        let mut buffer = Vec::new();
        report.write_csv(&mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("revision,check,finding,subject,defect,details"));
        assert!(lines.iter().any(|l| l.starts_with("0,clashes,clash,")));
    }

    #[test]
    fn csv_details_carry_the_full_finding() {
        let report = report(2, vec![clash(1, 5, ClashCategory::Severe)]);
        let mut buffer = Vec::new();
        report.write_csv(&mut buffer).unwrap();
        let mut reader = csv::Reader::from_reader(buffer.as_slice());
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        for row in &rows {
            let details: serde_json::Value = serde_json::from_str(&row[5]).unwrap();
            assert_eq!(details["type"], row[2]);
        }
        let clash_row = rows.iter().find(|r| &r[1] == "clashes").unwrap();
        let details: serde_json::Value = serde_json::from_str(&clash_row[5]).unwrap();
        assert_eq!(details["category"], "severe");
        assert_eq!(details["distance"], 2.5);
    }

    #[test]
    fn check_names_parse_back() {
        assert_eq!("unknown-residues".parse::<CheckKind>().unwrap(), CheckKind::UnknownResidues);
        assert_eq!("Clashes".parse::<CheckKind>().unwrap(), CheckKind::Clashes);
        assert!("bogus".parse::<CheckKind>().is_err());
    }
}
