//! Cookie-backed variant persistence

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::domain::experiment::{storage_key, ExperimentId, StorageBackend, VariantStore};
use crate::domain::DomainError;

/// Lifetime of a persisted assignment cookie
pub const COOKIE_MAX_AGE_DAYS: i64 = 365;

/// Expiry written when a cookie is cleared
pub const EXPIRED_DATE: &str = "Thu, 01 Jan 1970 00:00:00 GMT";

const COOKIE_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Format a timestamp the way the `expires` cookie attribute expects
pub fn format_cookie_date(at: DateTime<Utc>) -> String {
    at.format(COOKIE_DATE_FORMAT).to_string()
}

/// A `document.cookie`-style cookie store
pub trait CookieJar: Send + Sync {
    /// All live cookies joined as `name=value; name=value`
    fn cookie_string(&self) -> Result<String, DomainError>;

    /// Apply one `Set-Cookie`-style assignment
    fn set_cookie(&self, cookie: &str) -> Result<(), DomainError>;
}

/// One cookie held by [`InMemoryCookieJar`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCookie {
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub same_site: Option<String>,
}

impl StoredCookie {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires.is_none_or(|expires| expires > now)
    }
}

/// Thread-safe in-memory cookie jar
///
/// Cookies set with a past `expires` are removed, matching browser behavior.
#[derive(Debug, Default)]
pub struct InMemoryCookieJar {
    cookies: RwLock<BTreeMap<String, StoredCookie>>,
}

impl InMemoryCookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore a jar from a previously taken snapshot
    pub fn from_snapshot(cookies: BTreeMap<String, StoredCookie>) -> Self {
        Self {
            cookies: RwLock::new(cookies),
        }
    }

    /// Copy out every live cookie
    pub fn snapshot(&self) -> Result<BTreeMap<String, StoredCookie>, DomainError> {
        let now = Utc::now();
        let cookies = self.cookies.read().map_err(|e| {
            DomainError::storage("cookie", format!("Failed to acquire read lock: {}", e))
        })?;

        Ok(cookies
            .iter()
            .filter(|(_, cookie)| cookie.is_live(now))
            .map(|(name, cookie)| (name.clone(), cookie.clone()))
            .collect())
    }

    /// Look up a single cookie by name
    pub fn get(&self, name: &str) -> Result<Option<StoredCookie>, DomainError> {
        Ok(self.snapshot()?.remove(name))
    }
}

impl CookieJar for InMemoryCookieJar {
    fn cookie_string(&self) -> Result<String, DomainError> {
        Ok(self
            .snapshot()?
            .iter()
            .map(|(name, cookie)| format!("{}={}", name, cookie.value))
            .collect::<Vec<_>>()
            .join("; "))
    }

    fn set_cookie(&self, cookie: &str) -> Result<(), DomainError> {
        let mut parts = cookie.split(';');

        let pair = parts.next().unwrap_or_default();
        let (name, value) = pair
            .split_once('=')
            .ok_or_else(|| DomainError::validation(format!("Malformed cookie: '{}'", cookie)))?;
        let name = name.trim();

        if name.is_empty() {
            return Err(DomainError::validation("Cookie name must not be empty"));
        }

        let mut stored = StoredCookie {
            value: value.trim().to_string(),
            expires: None,
            path: None,
            same_site: None,
        };

        for attribute in parts {
            let (key, val) = attribute.split_once('=').unwrap_or((attribute, ""));
            let val = val.trim();

            match key.trim().to_ascii_lowercase().as_str() {
                "expires" => {
                    let parsed = DateTime::parse_from_rfc2822(val).map_err(|e| {
                        DomainError::validation(format!("Invalid cookie expiry '{}': {}", val, e))
                    })?;
                    stored.expires = Some(parsed.with_timezone(&Utc));
                }
                "path" => stored.path = Some(val.to_string()),
                "samesite" => stored.same_site = Some(val.to_string()),
                _ => {}
            }
        }

        let mut cookies = self.cookies.write().map_err(|e| {
            DomainError::storage("cookie", format!("Failed to acquire write lock: {}", e))
        })?;

        if stored.is_live(Utc::now()) {
            cookies.insert(name.to_string(), stored);
        } else {
            cookies.remove(name);
        }

        Ok(())
    }
}

/// Stores an assignment in a site-wide cookie
///
/// The cookie name is the URI-encoded storage key, so any experiment id
/// yields a valid cookie name.
pub struct CookieVariantStore {
    jar: Arc<dyn CookieJar>,
    key: String,
    name: String,
}

impl CookieVariantStore {
    pub fn new(jar: Arc<dyn CookieJar>, experiment_id: &ExperimentId) -> Self {
        let key = storage_key(experiment_id);
        let name = urlencoding::encode(&key).into_owned();

        Self { jar, key, name }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Name of the cookie as written to the jar
    pub fn cookie_name(&self) -> &str {
        &self.name
    }

    fn try_read(&self) -> Result<Option<String>, DomainError> {
        let cookies = self.jar.cookie_string()?;

        for pair in cookies.split(';') {
            let Some((name, value)) = pair.trim().split_once('=') else {
                continue;
            };

            if name == self.name {
                let decoded = urlencoding::decode(value).map_err(|e| {
                    DomainError::storage(StorageBackend::Cookie.as_str(), e.to_string())
                })?;
                return Ok(Some(decoded.into_owned()).filter(|v| !v.is_empty()));
            }
        }

        Ok(None)
    }
}

impl VariantStore for CookieVariantStore {
    fn read(&self) -> Option<String> {
        self.try_read().unwrap_or_else(|e| {
            error!(key = %self.key, error = %e, "WebExperiment: Failed to read cookie storage");
            None
        })
    }

    fn write(&self, variant_id: &str) {
        if variant_id.is_empty() {
            return;
        }

        let expires = format_cookie_date(Utc::now() + Duration::days(COOKIE_MAX_AGE_DAYS));
        let cookie = format!(
            "{}={};expires={};path=/;SameSite=Lax",
            self.name,
            urlencoding::encode(variant_id),
            expires
        );

        if let Err(e) = self.jar.set_cookie(&cookie) {
            error!(key = %self.key, error = %e, "WebExperiment: Failed to write cookie storage");
        }
    }

    fn clear(&self) {
        let cookie = format!("{}=;expires={};path=/;SameSite=Lax", self.name, EXPIRED_DATE);

        if let Err(e) = self.jar.set_cookie(&cookie) {
            error!(key = %self.key, error = %e, "WebExperiment: Failed to clear cookie storage");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn store(jar: Arc<InMemoryCookieJar>) -> CookieVariantStore {
        CookieVariantStore::new(jar, &ExperimentId::new("hero").unwrap())
    }

    /// Records raw cookie assignments without interpreting them
    #[derive(Default)]
    struct RecordingJar {
        written: Mutex<Vec<String>>,
        fail: bool,
    }

    impl CookieJar for RecordingJar {
        fn cookie_string(&self) -> Result<String, DomainError> {
            if self.fail {
                return Err(DomainError::storage("cookie", "cookies disabled"));
            }
            Ok(String::new())
        }

        fn set_cookie(&self, cookie: &str) -> Result<(), DomainError> {
            if self.fail {
                return Err(DomainError::storage("cookie", "cookies disabled"));
            }
            self.written.lock().unwrap().push(cookie.to_string());
            Ok(())
        }
    }

    #[test]
    fn test_format_cookie_date() {
        let epoch = DateTime::from_timestamp(0, 0).unwrap();
        assert_eq!(format_cookie_date(epoch), EXPIRED_DATE);
    }

    #[test]
    fn test_write_then_read() {
        let jar = Arc::new(InMemoryCookieJar::new());
        let store = store(jar.clone());

        assert_eq!(store.read(), None);
        store.write("variant b");

        assert_eq!(store.read(), Some("variant b".to_string()));
        let cookie = jar.get("web_experiment_hero").unwrap().unwrap();
        assert_eq!(cookie.value, "variant%20b");
        assert_eq!(cookie.path.as_deref(), Some("/"));
        assert_eq!(cookie.same_site.as_deref(), Some("Lax"));
        assert!(cookie.expires.unwrap() > Utc::now() + Duration::days(360));
    }

    #[test]
    fn test_write_format() {
        let jar = Arc::new(RecordingJar::default());
        let store = CookieVariantStore::new(jar.clone(), &ExperimentId::new("hero").unwrap());

        store.write("A");
        store.clear();

        let written = jar.written.lock().unwrap();
        assert!(written[0].starts_with("web_experiment_hero=A;expires="));
        assert!(written[0].ends_with(" GMT;path=/;SameSite=Lax"));
        assert_eq!(
            written[1],
            "web_experiment_hero=;expires=Thu, 01 Jan 1970 00:00:00 GMT;path=/;SameSite=Lax"
        );
    }

    #[test]
    fn test_empty_write_is_ignored() {
        let jar = Arc::new(RecordingJar::default());
        let store = CookieVariantStore::new(jar.clone(), &ExperimentId::new("hero").unwrap());

        store.write("");
        assert!(jar.written.lock().unwrap().is_empty());
    }

    #[test]
    fn test_clear_removes_cookie() {
        let jar = Arc::new(InMemoryCookieJar::new());
        let store = store(jar.clone());

        store.write("A");
        store.clear();

        assert_eq!(store.read(), None);
        assert!(jar.get("web_experiment_hero").unwrap().is_none());
    }

    #[test]
    fn test_read_ignores_other_cookies() {
        let jar = Arc::new(InMemoryCookieJar::new());
        jar.set_cookie("web_experiment_hero_2=X;path=/").unwrap();
        jar.set_cookie("session=abc").unwrap();
        let store = store(jar.clone());

        assert_eq!(store.read(), None);

        jar.set_cookie("web_experiment_hero=B").unwrap();
        assert_eq!(store.read(), Some("B".to_string()));
    }

    #[test]
    fn test_failures_are_swallowed() {
        let jar = Arc::new(RecordingJar {
            fail: true,
            ..RecordingJar::default()
        });
        let store = CookieVariantStore::new(jar, &ExperimentId::new("hero").unwrap());

        assert_eq!(store.read(), None);
        store.write("A");
        store.clear();
    }

    #[test]
    fn test_unsafe_experiment_id_stays_sticky() {
        let jar = Arc::new(InMemoryCookieJar::new());

        for raw in ["promo;v2", "a=b", " padded ", "50% off"] {
            let id = ExperimentId::new(raw).unwrap();
            let store = CookieVariantStore::new(jar.clone(), &id);

            store.write("B");
            assert_eq!(store.read(), Some("B".to_string()), "id {raw:?}");

            let again = CookieVariantStore::new(jar.clone(), &id);
            assert_eq!(again.read(), Some("B".to_string()), "id {raw:?}");
        }

        let store = CookieVariantStore::new(jar.clone(), &ExperimentId::new("promo;v2").unwrap());
        assert_eq!(store.key(), "web_experiment_promo;v2");
        assert_eq!(store.cookie_name(), "web_experiment_promo%3Bv2");
        assert!(jar.get("web_experiment_promo%3Bv2").unwrap().is_some());

        store.clear();
        assert_eq!(store.read(), None);
    }

    #[test]
    fn test_jar_rejects_malformed() {
        let jar = InMemoryCookieJar::new();
        assert!(jar.set_cookie("no-equals-sign").is_err());
        assert!(jar.set_cookie("=value").is_err());
        assert!(jar.set_cookie("a=b;expires=not a date").is_err());
    }

    #[test]
    fn test_snapshot_roundtrip_keeps_live_cookies() {
        let jar = InMemoryCookieJar::new();
        jar.set_cookie("a=1;path=/").unwrap();

        let snapshot = jar.snapshot().unwrap();
        let json = serde_json::to_string(&snapshot).unwrap();
        let restored = InMemoryCookieJar::from_snapshot(serde_json::from_str(&json).unwrap());

        assert_eq!(restored.cookie_string().unwrap(), "a=1");
    }
}
