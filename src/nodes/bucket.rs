// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Bucket codes separating sibling nodes with equal ranks

use std::cmp::Ordering;
use std::fmt;

use crate::{EvalBankError, Result};

/// Alphabetic bucket code: `a`..`z`, then `aa`, `ab`, ...
///
/// Ordered by length first, then text, which is the order codes are issued in.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Bucket(String);

impl Bucket {
    pub fn first() -> Self {
        Self("a".to_string())
    }

    pub fn parse(code: &str) -> Result<Self> {
        if code.is_empty() || !code.bytes().all(|b| b.is_ascii_lowercase()) {
            return Err(EvalBankError::InvalidNodeName(format!("bad bucket code '{}'", code)));
        }
        Ok(Self(code.to_string()))
    }

    /// Following code, carrying like a base-26 counter: `z` -> `aa`, `az` -> `ba`
    pub fn next(&self) -> Self {
        let mut bytes = self.0.clone().into_bytes();
        for b in bytes.iter_mut().rev() {
            if *b < b'z' {
                *b += 1;
                return Self(String::from_utf8_lossy(&bytes).into_owned());
            }
            *b = b'a';
        }
        bytes.insert(0, b'a');
        Self(String::from_utf8_lossy(&bytes).into_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Ord for Bucket {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.len().cmp(&other.0.len()).then_with(|| self.0.cmp(&other.0))
    }
}

impl PartialOrd for Bucket {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn b(code: &str) -> Bucket {
        Bucket::parse(code).unwrap()
    }

    #[test]
    fn test_sequence_starts_at_a() {
        let first = Bucket::first();
        assert_eq!(first.as_str(), "a");
        assert_eq!(first.next().as_str(), "b");
        assert_eq!(first.next().next().as_str(), "c");
    }

    #[test]
    fn test_carry() {
        assert_eq!(b("z").next().as_str(), "aa");
        assert_eq!(b("az").next().as_str(), "ba");
        assert_eq!(b("zz").next().as_str(), "aaa");
        assert_eq!(b("azz").next().as_str(), "baa");
    }

    #[test]
    fn test_longer_codes_sort_after() {
        assert!(b("aa") > b("z"));
        assert!(b("b") > b("a"));
        assert_eq!([b("z"), b("aa"), b("c")].into_iter().max(), Some(b("aa")));
    }

    #[test]
    fn test_parse_rejects_non_letters() {
        assert!(Bucket::parse("").is_err());
        assert!(Bucket::parse("A").is_err());
        assert!(Bucket::parse("a1").is_err());
    }
}
