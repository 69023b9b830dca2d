// src/registry.rs
//! Tracked companies and their name variants.
//!
//! Matching is case-insensitive and whole-word: a variant only matches when the
//! characters around it are not alphanumeric, so "Tyson" matches
//! "Tyson's new CFO" but not "Tysonville".
//!
//! Import reads delimited records `name, domain, website, aliases` (header line
//! required, double quotes allowed, aliases separated by `;` or `|`).

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::Path;

use regex::{Regex, RegexBuilder};

use crate::error::ConfigError;
use crate::model::{Company, CompanyId};

/// One occurrence of a company variant inside a text (byte offsets).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mention {
    pub company_id: CompanyId,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug)]
struct Matcher {
    company_id: CompanyId,
    // One pattern per variant so a failed boundary on a long variant
    // never hides a shorter one at the same start.
    variants: Vec<Regex>,
}

#[derive(Debug, Default)]
pub struct CompanyRegistry {
    companies: Vec<Company>,
    by_id: HashMap<CompanyId, usize>,
    // lowercase variant -> owner
    variants: HashMap<String, CompanyId>,
    matchers: Vec<Matcher>,
}

impl CompanyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry, failing on duplicate ids or aliases shared across companies.
    pub fn from_companies<I>(companies: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = Company>,
    {
        let mut reg = Self::new();
        for c in companies {
            reg.insert(c)?;
        }
        Ok(reg)
    }

    pub fn insert(&mut self, company: Company) -> Result<(), ConfigError> {
        if self.by_id.contains_key(&company.id) {
            return Err(ConfigError::DuplicateCompany(company.id));
        }
        let mut claimed = BTreeSet::new();
        for v in company.name_variants() {
            let key = variant_key(v);
            if key.is_empty() {
                continue;
            }
            if let Some(owner) = self.variants.get(&key) {
                return Err(ConfigError::DuplicateAlias {
                    alias: v.trim().to_string(),
                    first: owner.clone(),
                    second: company.id.clone(),
                });
            }
            claimed.insert(key);
        }
        for key in claimed {
            self.variants.insert(key, company.id.clone());
        }
        self.by_id.insert(company.id.clone(), self.companies.len());
        self.companies.push(company);
        self.rebuild_matcher(self.companies.len() - 1)?;
        Ok(())
    }

    /// Add an alias to an existing company (the only permitted post-import mutation).
    pub fn add_alias(&mut self, id: &CompanyId, alias: &str) -> Result<(), ConfigError> {
        let idx = *self
            .by_id
            .get(id)
            .ok_or_else(|| ConfigError::UnknownCompany(id.clone()))?;
        let key = variant_key(alias);
        if key.is_empty() {
            return Err(ConfigError::Invalid("empty alias".into()));
        }
        match self.variants.get(&key) {
            Some(owner) if owner == id => return Ok(()),
            Some(owner) => {
                return Err(ConfigError::DuplicateAlias {
                    alias: alias.trim().to_string(),
                    first: owner.clone(),
                    second: id.clone(),
                })
            }
            None => {}
        }
        self.variants.insert(key, id.clone());
        self.companies[idx].aliases.insert(alias.trim().to_string());
        self.rebuild_matcher(idx)
    }

    pub fn get(&self, id: &CompanyId) -> Option<&Company> {
        self.by_id.get(id).map(|&i| &self.companies[i])
    }

    pub fn companies(&self) -> &[Company] {
        &self.companies
    }

    pub fn active(&self) -> impl Iterator<Item = &Company> {
        self.companies.iter().filter(|c| c.active)
    }

    pub fn len(&self) -> usize {
        self.companies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.companies.is_empty()
    }

    /// Companies whose canonical name contains `needle` (case-insensitive).
    pub fn find_by_name(&self, needle: &str) -> Vec<&Company> {
        let n = needle.trim().to_lowercase();
        self.active()
            .filter(|c| {
                c.canonical_name.to_lowercase().contains(&n) || c.id.as_str() == n.as_str()
            })
            .collect()
    }

    /// Every active company mentioned in `text`.
    pub fn match_text(&self, text: &str) -> BTreeSet<CompanyId> {
        self.mentions(text).into_iter().map(|m| m.company_id).collect()
    }

    /// All whole-word mentions, sorted by position. Overlapping mentions keep the longest.
    pub fn mentions(&self, text: &str) -> Vec<Mention> {
        let mut found = Vec::new();
        for m in &self.matchers {
            if !self.get(&m.company_id).is_some_and(|c| c.active) {
                continue;
            }
            for re in &m.variants {
                let mut at = 0;
                while at <= text.len() {
                    let Some(hit) = re.find_at(text, at) else {
                        break;
                    };
                    if is_word_boundary(text, hit.start(), hit.end()) {
                        found.push(Mention {
                            company_id: m.company_id.clone(),
                            start: hit.start(),
                            end: hit.end(),
                        });
                        at = hit.end();
                    } else {
                        at = next_char_boundary(text, hit.start());
                    }
                }
            }
        }
        found.sort_by(|a, b| a.start.cmp(&b.start).then((b.end - b.start).cmp(&(a.end - a.start))));
        let mut out: Vec<Mention> = Vec::with_capacity(found.len());
        for m in found {
            if let Some(last) = out.last() {
                if m.start < last.end {
                    continue;
                }
            }
            out.push(m);
        }
        out
    }

    fn rebuild_matcher(&mut self, idx: usize) -> Result<(), ConfigError> {
        let company = &self.companies[idx];
        let mut variants: Vec<&str> = company
            .name_variants()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .collect();
        variants.sort_by_key(|v| std::cmp::Reverse(v.len()));
        variants.dedup();
        let res = variants
            .iter()
            .map(|v| {
                RegexBuilder::new(&flexible_whitespace(&regex::escape(v)))
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| ConfigError::Invalid(format!("matcher for {}: {e}", company.id)))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let id = company.id.clone();
        match self.matchers.iter_mut().find(|m| m.company_id == id) {
            Some(m) => m.variants = res,
            None => self.matchers.push(Matcher {
                company_id: id,
                variants: res,
            }),
        }
        Ok(())
    }
}

fn variant_key(v: &str) -> String {
    v.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

// An escaped single space matches any run of whitespace in the text.
fn flexible_whitespace(escaped: &str) -> String {
    escaped.split(' ').filter(|p| !p.is_empty()).collect::<Vec<_>>().join(r"\s+")
}

fn is_word_boundary(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
}

fn next_char_boundary(text: &str, from: usize) -> usize {
    text[from..]
        .char_indices()
        .nth(1)
        .map(|(i, _)| from + i)
        .unwrap_or(text.len() + 1)
}

/* ----------------------------
Import
---------------------------- */

/// Outcome of a bulk import.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ImportReport {
    pub parsed: usize,
    pub added: usize,
    pub already_exists: usize,
}

pub fn load_companies_from(path: &Path) -> Result<Vec<Company>, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_company_records(&content)
}

/// Parse `name, domain, website, aliases` records. The first non-empty line is the header.
pub fn parse_company_records(input: &str) -> Result<Vec<Company>, ConfigError> {
    let input = input.trim_start_matches('\u{feff}');
    let mut lines = input
        .lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l))
        .filter(|(_, l)| !l.trim().is_empty() && !l.trim_start().starts_with('#'));

    let Some((hline, header)) = lines.next() else {
        return Ok(Vec::new());
    };
    let header = split_record(header, hline)?;
    let col = |name: &str| {
        header
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name))
    };
    let name_col = col("name").ok_or_else(|| ConfigError::MalformedRecord {
        line: hline,
        reason: "header has no `name` column".into(),
    })?;
    let domain_col = col("domain");
    let website_col = col("website");
    let aliases_col = col("aliases");

    let mut out = Vec::new();
    for (line, raw) in lines {
        let fields = split_record(raw, line)?;
        if fields.len() != header.len() {
            return Err(ConfigError::MalformedRecord {
                line,
                reason: format!("expected {} fields, found {}", header.len(), fields.len()),
            });
        }
        let name = fields[name_col].trim();
        if name.is_empty() {
            return Err(ConfigError::MalformedRecord {
                line,
                reason: "empty company name".into(),
            });
        }
        let mut company = Company::new(name);
        if let Some(i) = website_col {
            company.website = fields[i].trim().to_string();
        }
        if let Some(i) = domain_col {
            company = company.with_domain(&fields[i]);
        }
        if let Some(i) = aliases_col {
            company = company.with_aliases(
                fields[i]
                    .split(['|', ';'])
                    .map(str::trim)
                    .filter(|a| !a.is_empty() && !a.eq_ignore_ascii_case(name))
                    .map(str::to_string),
            );
        }
        out.push(company);
    }
    Ok(out)
}

fn split_record(line: &str, line_no: usize) -> Result<Vec<String>, ConfigError> {
    let mut fields = Vec::new();
    let mut cur = String::new();
    let mut chars = line.chars().peekable();
    let mut in_quotes = false;
    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                cur.push('"');
                chars.next();
            }
            '"' if in_quotes => in_quotes = false,
            '"' if cur.trim().is_empty() => {
                cur.clear();
                in_quotes = true;
            }
            ',' if !in_quotes => fields.push(std::mem::take(&mut cur)),
            _ => cur.push(c),
        }
    }
    if in_quotes {
        return Err(ConfigError::MalformedRecord {
            line: line_no,
            reason: "unterminated quoted field".into(),
        });
    }
    fields.push(cur);
    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tyson() -> Company {
        Company::new("Tyson Foods").with_aliases(["Tyson"])
    }

    #[test]
    fn matches_whole_words_case_insensitively() {
        let reg = CompanyRegistry::from_companies([tyson(), Company::new("Cargill")]).unwrap();
        let ids = reg.match_text("TYSON FOODS and cargill announced");
        assert_eq!(ids.len(), 2);
        assert!(reg.match_text("Tysonville expands").is_empty());
    }

    #[test]
    fn longest_variant_wins_on_overlap() {
        let reg = CompanyRegistry::from_companies([tyson()]).unwrap();
        let m = reg.mentions("Tyson Foods names Jane Smith");
        assert_eq!(m.len(), 1);
        assert_eq!((m[0].start, m[0].end), (0, 11));
    }

    #[test]
    fn shorter_alias_matches_where_longer_variant_runs_into_a_word() {
        let reg = CompanyRegistry::from_companies([tyson()]).unwrap();
        let text = "Tyson Foodservice names Jane Smith as COO";
        let m = reg.mentions(text);
        assert_eq!(m.len(), 1);
        assert_eq!(&text[m[0].start..m[0].end], "Tyson");
        assert!(reg.match_text(text).contains(&CompanyId::from_name("Tyson Foods")));
    }

    #[test]
    fn multiple_companies_are_not_tie_broken() {
        let reg = CompanyRegistry::from_companies([
            tyson(),
            Company::new("JBS USA").with_aliases(["JBS"]),
        ])
        .unwrap();
        let ids = reg.match_text("Former Tyson exec joins JBS as CFO");
        assert_eq!(ids.len(), 2);
    }

    #[test]
    fn duplicate_alias_across_companies_is_rejected() {
        let err = CompanyRegistry::from_companies([
            Company::new("Maple Leaf Foods").with_aliases(["Maple Leaf"]),
            Company::new("Maple Leaf Farms").with_aliases(["maple leaf"]),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateAlias { .. }));
    }

    #[test]
    fn add_alias_checks_ownership() {
        let mut reg = CompanyRegistry::from_companies([tyson(), Company::new("Cargill")]).unwrap();
        let cargill = CompanyId::from_name("Cargill");
        reg.add_alias(&cargill, "Cargill Meat Solutions").unwrap();
        assert!(reg.match_text("cargill meat solutions hires").contains(&cargill));
        assert!(reg.add_alias(&cargill, "Tyson").is_err());
    }

    #[test]
    fn parses_quoted_records_and_alias_lists() {
        let csv = "name,domain,website,aliases\n\
                   Tyson Foods,tyson.com,,Tyson|Tyson Fresh Meats\n\
                   \"Bell & Evans\",bellandevans.com,https://bellandevans.com,\"B&E; Bell and Evans\"\n";
        let cs = parse_company_records(csv).unwrap();
        assert_eq!(cs.len(), 2);
        assert_eq!(cs[0].website, "https://www.tyson.com");
        assert!(cs[0].aliases.contains("Tyson Fresh Meats"));
        assert_eq!(cs[1].canonical_name, "Bell & Evans");
        assert_eq!(cs[1].website, "https://bellandevans.com");
        assert!(cs[1].aliases.contains("Bell and Evans"));
    }

    #[test]
    fn malformed_record_reports_line() {
        let csv = "name,domain,website,aliases\nTyson Foods,tyson.com\n";
        match parse_company_records(csv) {
            Err(ConfigError::MalformedRecord { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected malformed record, got {other:?}"),
        }
    }
}
