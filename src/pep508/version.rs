//! Minimal PEP 440 versions for marker comparisons
//!
//! Marker evaluation only ever compares interpreter-reported versions such as
//! `3.11.4` or `3.13.0rc1` against short literals like `"3.8"`, so this covers
//! epochs, release segments, pre/post/dev suffixes and local labels without
//! aiming to be a full version-resolution implementation.

use std::cmp::Ordering;
use std::str::FromStr;

/// Pre-release phase, ordered alpha < beta < rc
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum PreKind {
    Alpha,
    Beta,
    Rc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version {
    epoch: u64,
    release: Vec<u64>,
    pre: Option<(PreKind, u64)>,
    post: Option<u64>,
    dev: Option<u64>,
    local: Option<String>,
}

impl Version {
    pub fn release(&self) -> &[u64] {
        &self.release
    }

    /// Sort key for the suffix part, following PEP 440 ordering:
    /// `1.0.dev0 < 1.0a1.dev0 < 1.0a1 < 1.0 < 1.0.post1.dev0 < 1.0.post1`
    fn suffix_key(&self) -> (i8, Option<(PreKind, u64)>, i8, u64, i8, u64) {
        let phase = match (&self.pre, self.post, self.dev) {
            (None, None, Some(_)) => -1,
            (Some(_), _, _) => 0,
            _ => 1,
        };
        let (post_flag, post) = match self.post {
            Some(n) => (1, n),
            None => (0, 0),
        };
        let (dev_flag, dev) = match self.dev {
            Some(n) => (0, n),
            None => (1, 0),
        };
        (phase, self.pre, post_flag, post, dev_flag, dev)
    }

    /// Compare ignoring the local label, as public version comparisons do
    pub fn cmp_public(&self, other: &Self) -> Ordering {
        self.epoch
            .cmp(&other.epoch)
            .then_with(|| cmp_release(&self.release, &other.release))
            .then_with(|| self.suffix_key().cmp(&other.suffix_key()))
    }

    pub fn has_local(&self) -> bool {
        self.local.is_some()
    }
}

/// Compare release tuples with implicit trailing zeros (`3.8 == 3.8.0`)
fn cmp_release(a: &[u64], b: &[u64]) -> Ordering {
    let len = a.len().max(b.len());
    for i in 0..len {
        let x = a.get(i).copied().unwrap_or(0);
        let y = b.get(i).copied().unwrap_or(0);
        match x.cmp(&y) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}

impl FromStr for Version {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || format!("Invalid version '{}'", s);

        let lowered = s.trim().to_ascii_lowercase();
        let lowered = lowered.strip_prefix('v').unwrap_or(&lowered);

        let (public, local) = match lowered.split_once('+') {
            Some((public, local)) if !local.is_empty() => (public, Some(local.to_string())),
            Some(_) => return Err(invalid()),
            None => (lowered, None),
        };

        let (epoch, rest) = match public.split_once('!') {
            Some((epoch, rest)) => (epoch.parse::<u64>().map_err(|_| invalid())?, rest),
            None => (0, public),
        };

        let release_end = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        let release_str = rest[..release_end].trim_end_matches('.');
        if release_str.is_empty() {
            return Err(invalid());
        }
        let release = release_str
            .split('.')
            .map(|part| part.parse::<u64>().map_err(|_| invalid()))
            .collect::<Result<Vec<_>, _>>()?;

        let mut suffix = &rest[release_end..];
        // Allow the separator that precedes a suffix to be dropped after the release
        if rest[..release_end].ends_with('.') {
            suffix = &rest[release_end - 1..];
        }

        let mut version = Version {
            epoch,
            release,
            pre: None,
            post: None,
            dev: None,
            local,
        };

        let mut cursor = suffix;
        if let Some((kind, number, remaining)) = parse_pre(cursor) {
            version.pre = Some((kind, number));
            cursor = remaining;
        }
        if let Some((number, remaining)) = parse_labeled(cursor, &["post", "rev", "r"]) {
            version.post = Some(number);
            cursor = remaining;
        } else if let Some(remaining) = cursor.strip_prefix('-') {
            // Implicit post release: `1.0-1`
            let end = remaining
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(remaining.len());
            if end > 0 {
                version.post = remaining[..end].parse().ok();
                cursor = &remaining[end..];
            }
        }
        if let Some((number, remaining)) = parse_labeled(cursor, &["dev"]) {
            version.dev = Some(number);
            cursor = remaining;
        }

        if cursor.is_empty() {
            Ok(version)
        } else {
            Err(invalid())
        }
    }
}

fn strip_separator(s: &str) -> &str {
    s.strip_prefix(['.', '-', '_']).unwrap_or(s)
}

fn parse_pre(s: &str) -> Option<(PreKind, u64, &str)> {
    let labels: [(&str, PreKind); 7] = [
        ("alpha", PreKind::Alpha),
        ("beta", PreKind::Beta),
        ("preview", PreKind::Rc),
        ("pre", PreKind::Rc),
        ("rc", PreKind::Rc),
        ("a", PreKind::Alpha),
        ("b", PreKind::Beta),
    ];
    let body = strip_separator(s);
    for (label, kind) in labels {
        if let Some(rest) = body.strip_prefix(label) {
            let (number, rest) = parse_number(rest);
            return Some((kind, number, rest));
        }
    }
    // `c` is an alternate spelling of `rc`
    let rest = body.strip_prefix('c')?;
    let (number, rest) = parse_number(rest);
    Some((PreKind::Rc, number, rest))
}

fn parse_labeled<'a>(s: &'a str, labels: &[&str]) -> Option<(u64, &'a str)> {
    let body = strip_separator(s);
    labels.iter().find_map(|label| {
        let rest = body.strip_prefix(label)?;
        Some(parse_number(rest))
    })
}

/// Parse an optional separator plus digits; missing number means 0
fn parse_number(s: &str) -> (u64, &str) {
    let body = strip_separator(s);
    let end = body
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(body.len());
    if end == 0 {
        return (0, s);
    }
    (body[..end].parse().unwrap_or(0), &body[end..])
}
