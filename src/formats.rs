// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Named string formats checked by the `format` constraint.
//!
//! Predicates are pure functions over a string. Names are normalized with the
//! underscore inflection, so `date-time`, `dateTime` and `date_time` are the
//! same format; `datetime` is accepted as an alias of `date_time`.

use crate::inflection::underscore;

use core::fmt;
use std::collections::BTreeMap;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate};
use lazy_static::lazy_static;
use regex::Regex;

pub type FormatPredicate = Arc<dyn Fn(&str) -> bool + Send + Sync>;

lazy_static! {
    static ref TIME_RE: Option<Regex> =
        Regex::new(r"^\s*(\d\d):(\d\d):(\d\d)(\.\d+)?([zZ]|[-+]\d\d:?\d\d)\s*$").ok();
    static ref EMAIL_RE: Option<Regex> = Regex::new(
        r#"^(?i)[a-z0-9!#$%&'*+/=?^_`{|}~-]+(\.[a-z0-9!#$%&'*+/=?^_`{|}~-]+)*@([a-z0-9]([a-z0-9-]*[a-z0-9])?\.)+[a-z0-9]([a-z0-9-]*[a-z0-9])?$"#
    )
    .ok();
    static ref HOSTNAME_LABEL_RE: Option<Regex> =
        Regex::new(r"^(?i)[a-z\d]([a-z\d-]{0,61}[a-z\d])?$").ok();
}

/// Canonical registry key for a format name.
pub fn normalize(name: &str) -> String {
    match underscore(name).as_str() {
        "datetime" => "date_time".to_string(),
        other => other.to_string(),
    }
}

#[derive(Clone, Default)]
pub struct FormatRegistry {
    formats: BTreeMap<String, FormatPredicate>,
}

impl FormatRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the built-in formats.
    pub fn builtin() -> Self {
        let mut r = Self::new();
        r.register("date_time", date_time);
        r.register("date", date);
        r.register("time", time);
        r.register("email", email);
        r.register("hostname", hostname);
        r.register("ipv4", ipv4);
        r.register("ipv6", ipv6);
        r.register("uri", uri);
        r.register("uri_reference", uri_reference);
        r.register("regex", regex);
        r
    }

    pub fn register<F>(&mut self, name: &str, predicate: F)
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.formats.insert(normalize(name), Arc::new(predicate));
    }

    pub fn get(&self, name: &str) -> Option<FormatPredicate> {
        self.formats.get(&normalize(name)).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.formats.contains_key(&normalize(name))
    }

    pub fn remove(&mut self, name: &str) -> Option<FormatPredicate> {
        self.formats.remove(&normalize(name))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.formats.keys().map(|k| k.as_str())
    }

    /// Apply the named format. `None` if the format is unknown.
    pub fn check(&self, name: &str, s: &str) -> Option<bool> {
        self.formats.get(&normalize(name)).map(|f| f(s))
    }
}

impl fmt::Debug for FormatRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.formats.keys()).finish()
    }
}

fn date_time(s: &str) -> bool {
    let s = s.trim();
    // RFC 3339 also allows a space between date and time.
    DateTime::parse_from_rfc3339(s).is_ok() || {
        let mut parts = s.splitn(2, ' ');
        match (parts.next(), parts.next()) {
            (Some(d), Some(t)) => DateTime::parse_from_rfc3339(&format!("{d}T{t}")).is_ok(),
            _ => false,
        }
    }
}

fn date(s: &str) -> bool {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").is_ok()
}

fn time(s: &str) -> bool {
    let Some(caps) = TIME_RE.as_ref().and_then(|re| re.captures(s)) else {
        return false;
    };
    let field = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u32>().ok());
    matches!(
        (field(1), field(2), field(3)),
        (Some(h), Some(m), Some(sec)) if h < 24 && m < 60 && sec <= 60
    )
}

fn email(s: &str) -> bool {
    EMAIL_RE.as_ref().is_some_and(|re| re.is_match(s))
}

fn hostname(s: &str) -> bool {
    if s.is_empty() || s.len() > 255 {
        return false;
    }
    let s = s.strip_suffix('.').unwrap_or(s);
    match HOSTNAME_LABEL_RE.as_ref() {
        Some(re) => s.split('.').all(|label| re.is_match(label)),
        None => false,
    }
}

fn ipv4(s: &str) -> bool {
    Ipv4Addr::from_str(s).is_ok()
}

fn ipv6(s: &str) -> bool {
    Ipv6Addr::from_str(s).is_ok()
}

fn uri(s: &str) -> bool {
    url::Url::parse(s).is_ok()
}

fn uri_reference(s: &str) -> bool {
    lazy_static! {
        static ref BASE: Option<url::Url> = url::Url::parse("http://example.invalid/").ok();
    }
    match BASE.as_ref() {
        Some(base) => base.join(s).is_ok(),
        None => false,
    }
}

fn regex(s: &str) -> bool {
    Regex::new(s).is_ok()
}
