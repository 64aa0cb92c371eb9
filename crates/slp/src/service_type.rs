// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Structured service-type names.
//!
//! A service type is either `service:<concrete>` or
//! `service:<abstract>:<concrete>`. Comparisons are case-insensitive on
//! all parts (RFC 2608 Sec.4.1).

/// A structured service-type name, normalized to lower case.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServiceType {
    name: String,
}

impl ServiceType {
    /// Parse a service-type string. Case is not significant and is folded.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.trim().to_ascii_lowercase(),
        }
    }

    /// Full normalized form, e.g. `service:printer:lpr`.
    pub fn as_str(&self) -> &str {
        &self.name
    }

    /// True when the type uses the `service:` naming authority.
    pub fn is_service(&self) -> bool {
        self.name.starts_with("service:")
    }

    /// The abstract part of `service:<abstract>:<concrete>`, if any.
    pub fn abstract_type(&self) -> Option<&str> {
        let rest = self.name.strip_prefix("service:")?;
        let colon = rest.find(':')?;
        Some(&rest[..colon])
    }

    /// The concrete part: the last colon-separated component.
    pub fn concrete_type(&self) -> &str {
        match self.name.rfind(':') {
            Some(idx) => &self.name[idx + 1..],
            None => &self.name,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_empty()
    }
}

impl std::fmt::Display for ServiceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}
