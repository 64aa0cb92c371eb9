// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Registered service identity and payload.

use crate::attributes::Attributes;
use crate::scopes::Scopes;
use crate::service_type::ServiceType;
use crate::service_url::{ServiceUrl, LIFETIME_PERMANENT};
use std::time::{Duration, Instant};

/// Registry key: (service URL, language tag), both case-insensitive.
///
/// Registrations of the same URL in different languages are independent
/// entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServiceKey {
    url: String,
    language: String,
}

impl ServiceKey {
    pub fn new(url: &str, language: &str) -> Self {
        Self {
            url: url.to_ascii_lowercase(),
            language: language.to_ascii_lowercase(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn language(&self) -> &str {
        &self.language
    }
}

/// A registered service: URL, scopes, attributes and language, stamped
/// with the registration instant for lifetime accounting.
#[derive(Debug, Clone)]
pub struct ServiceInfo {
    pub url: ServiceUrl,
    pub language: String,
    pub scopes: Scopes,
    pub attributes: Attributes,
    /// When the service was registered. Attribute updates keep the
    /// original instant; the lifetime keeps counting from registration.
    pub registered_at: Instant,
}

impl ServiceInfo {
    pub fn new(url: ServiceUrl, language: &str, scopes: Scopes, attributes: Attributes) -> Self {
        Self {
            url,
            language: language.to_string(),
            scopes,
            attributes,
            registered_at: Instant::now(),
        }
    }

    pub fn key(&self) -> ServiceKey {
        ServiceKey::new(self.url.url(), &self.language)
    }

    pub fn service_type(&self) -> ServiceType {
        self.url.service_type()
    }

    /// Whether the registration lifetime has elapsed at `now`. Permanent
    /// registrations never expire.
    pub fn is_expired(&self, now: Instant) -> bool {
        let lifetime = self.url.lifetime();
        if lifetime == LIFETIME_PERMANENT {
            return false;
        }
        now.duration_since(self.registered_at) >= Duration::from_secs(u64::from(lifetime))
    }

    /// Seconds of lifetime left at `now`, saturating at zero. Permanent
    /// registrations report `LIFETIME_PERMANENT`.
    pub fn remaining_lifetime(&self, now: Instant) -> u16 {
        let lifetime = self.url.lifetime();
        if lifetime == LIFETIME_PERMANENT {
            return LIFETIME_PERMANENT;
        }
        let elapsed = now.duration_since(self.registered_at).as_secs();
        u64::from(lifetime).saturating_sub(elapsed) as u16
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn printer(lifetime: u16) -> ServiceInfo {
        ServiceInfo::new(
            ServiceUrl::new("service:printer://p1", lifetime),
            "en",
            Scopes::default_scope(),
            Attributes::none(),
        )
    }

    #[test]
    fn test_key_folds_case() {
        let a = ServiceKey::new("service:printer://P1", "EN");
        let b = ServiceKey::new("SERVICE:printer://p1", "en");
        assert_eq!(a, b);
    }

    #[test]
    fn test_same_url_different_language() {
        let en = ServiceKey::new("service:printer://p1", "en");
        let de = ServiceKey::new("service:printer://p1", "de");
        assert_ne!(en, de);
    }

    #[test]
    fn test_expiry() {
        let mut service = printer(60);
        let now = Instant::now();
        assert!(!service.is_expired(now));

        service.registered_at = now - Duration::from_secs(61);
        assert!(service.is_expired(now));
    }

    #[test]
    fn test_permanent_never_expires() {
        let mut service = printer(LIFETIME_PERMANENT);
        service.registered_at = Instant::now() - Duration::from_secs(1_000_000);
        assert!(!service.is_expired(Instant::now()));
        assert_eq!(
            service.remaining_lifetime(Instant::now()),
            LIFETIME_PERMANENT
        );
    }

    #[test]
    fn test_remaining_lifetime_counts_down() {
        let mut service = printer(60);
        let now = Instant::now();
        service.registered_at = now - Duration::from_secs(20);
        let remaining = service.remaining_lifetime(now);
        assert!(remaining <= 40);
        assert!(remaining >= 39);

        service.registered_at = now - Duration::from_secs(120);
        assert_eq!(service.remaining_lifetime(now), 0);
    }
}
