// Version normalization and ordering (running vs. latest published version).
//
// Normalized form: optional leading `v` and `+build` metadata removed, numeric
// core joined with `.` and stripped of leading zeros, anything after the core
// lowercased and appended after a single `-`. Strings without a numeric core
// are kept verbatim (trimmed) and order below every numeric version.

use std::cmp::Ordering;

/// Running and latest version after normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionPair {
    pub running: String,
    pub latest: String,
}

/// Outcome of comparing a running version against the latest known one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub versions: VersionPair,
    /// True iff `latest` is strictly newer than `running`.
    pub is_newer: bool,
}

impl Decision {
    /// Gauge value: 1 when an update is available, else 0.
    pub fn status(&self) -> i64 {
        i64::from(self.is_newer)
    }
}

/// Canonicalizes a free-form version string. Deterministic and idempotent.
pub fn normalize(v: &str) -> String {
    let s = v.split_once('+').map_or(v, |(head, _)| head).trim();
    let s = match s.strip_prefix(['v', 'V']) {
        Some(rest) if rest.starts_with(|c: char| c.is_ascii_digit()) => rest,
        _ => s,
    };

    let Some((core, rest)) = split_numeric(s) else {
        return s.to_string();
    };
    let core = core
        .into_iter()
        .map(trim_zeros)
        .collect::<Vec<_>>()
        .join(".");
    let rest = rest.trim_start_matches(SEPARATORS);
    if rest.is_empty() {
        core
    } else {
        format!("{core}-{}", rest.to_ascii_lowercase().replace('_', "."))
    }
}

/// Total preorder over (normalized) version strings.
///
/// Numeric versions compare component-wise (missing components count as 0),
/// then by pre-release using SemVer precedence (no pre-release > any
/// pre-release). Numeric versions always order above non-numeric strings;
/// non-numeric strings compare bytewise. Never fails.
pub fn compare(a: &str, b: &str) -> Ordering {
    match (Parsed::from(a), Parsed::from(b)) {
        (
            Parsed::Numeric { core: ca, pre: pa },
            Parsed::Numeric { core: cb, pre: pb },
        ) => compare_core(&ca, &cb).then_with(|| compare_pre(pa, pb)),
        (Parsed::Numeric { .. }, Parsed::Text(_)) => Ordering::Greater,
        (Parsed::Text(_), Parsed::Numeric { .. }) => Ordering::Less,
        (Parsed::Text(x), Parsed::Text(y)) => x.cmp(y),
    }
}

/// Normalizes both versions and reports whether `latest` is strictly newer.
pub fn decide(running: &str, latest: &str) -> Decision {
    let running = normalize(running);
    let latest = normalize(latest);
    let is_newer = compare(&latest, &running) == Ordering::Greater;
    Decision {
        versions: VersionPair { running, latest },
        is_newer,
    }
}

/// Sorts tags ascending by the normalized ordering. Stable: equal versions
/// keep their input order.
pub fn sort_versions(tags: &mut Vec<String>) {
    let mut keyed: Vec<(String, String)> = tags.drain(..).map(|t| (normalize(&t), t)).collect();
    keyed.sort_by(|(a, _), (b, _)| compare(a, b));
    tags.extend(keyed.into_iter().map(|(_, t)| t));
}

const SEPARATORS: [char; 3] = ['-', '.', '_'];

enum Parsed<'a> {
    Numeric { core: Vec<&'a str>, pre: Option<&'a str> },
    Text(&'a str),
}

impl<'a> From<&'a str> for Parsed<'a> {
    fn from(s: &'a str) -> Self {
        match split_numeric(s) {
            Some((core, rest)) => {
                let rest = rest.trim_start_matches(SEPARATORS);
                Parsed::Numeric {
                    core,
                    pre: (!rest.is_empty()).then_some(rest),
                }
            }
            None => Parsed::Text(s),
        }
    }
}

/// Splits a leading `\d+([._]\d+)*` run into its components and the remainder.
fn split_numeric(s: &str) -> Option<(Vec<&str>, &str)> {
    let bytes = s.as_bytes();
    let mut parts = Vec::new();
    let mut start = 0;
    let mut i = 0;
    loop {
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if i == start {
            break;
        }
        parts.push(&s[start..i]);
        if i + 1 < bytes.len() && matches!(bytes[i], b'.' | b'_') && bytes[i + 1].is_ascii_digit()
        {
            i += 1;
            start = i;
        } else {
            break;
        }
    }
    (!parts.is_empty()).then(|| (parts, &s[i..]))
}

fn trim_zeros(digits: &str) -> &str {
    match digits.trim_start_matches('0') {
        "" => "0",
        t => t,
    }
}

/// Compares two digit strings numerically without parsing (no overflow).
fn compare_digits(a: &str, b: &str) -> Ordering {
    let (a, b) = (trim_zeros(a), trim_zeros(b));
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

fn compare_core(a: &[&str], b: &[&str]) -> Ordering {
    let len = a.len().max(b.len());
    (0..len)
        .map(|i| compare_digits(a.get(i).unwrap_or(&"0"), b.get(i).unwrap_or(&"0")))
        .find(|o| o.is_ne())
        .unwrap_or(Ordering::Equal)
}

fn compare_pre(a: Option<&str>, b: Option<&str>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => {
            let mut xs = a.split('.');
            let mut ys = b.split('.');
            loop {
                match (xs.next(), ys.next()) {
                    (None, None) => return Ordering::Equal,
                    (None, Some(_)) => return Ordering::Less,
                    (Some(_), None) => return Ordering::Greater,
                    (Some(x), Some(y)) => {
                        let o = compare_identifier(x, y);
                        if o.is_ne() {
                            return o;
                        }
                    }
                }
            }
        }
    }
}

fn compare_identifier(a: &str, b: &str) -> Ordering {
    let numeric = |s: &str| !s.is_empty() && s.bytes().all(|c| c.is_ascii_digit());
    match (numeric(a), numeric(b)) {
        (true, true) => compare_digits(a, b),
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => a.cmp(b),
    }
}
