//! Signed session cookie
//!
//! The cookie value is `<session id>.<hex HMAC-SHA256 of the id>`. A value
//! with a missing or wrong signature is ignored, so clients cannot pick
//! another browser's session id.

use axum::http::{header, HeaderMap, HeaderValue};
use data_encoding::HEXLOWER;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::config::SessionConfig;

type HmacSha256 = Hmac<Sha256>;

/// Builds and checks the session cookie
#[derive(Clone)]
pub struct SessionCookie {
    name: String,
    key: Vec<u8>,
    secure: bool,
}

impl std::fmt::Debug for SessionCookie {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCookie")
            .field("name", &self.name)
            .field("secure", &self.secure)
            .finish_non_exhaustive()
    }
}

impl SessionCookie {
    pub fn new(name: impl Into<String>, key: impl Into<Vec<u8>>, secure: bool) -> Self {
        Self {
            name: name.into(),
            key: key.into(),
            secure,
        }
    }

    /// Cookie settings from configuration with an explicit signing key
    pub fn from_config(config: &SessionConfig, key: impl Into<Vec<u8>>) -> Self {
        Self::new(config.cookie_name.clone(), key, config.secure_cookie)
    }

    fn mac(&self) -> HmacSha256 {
        // HMAC accepts keys of any length
        HmacSha256::new_from_slice(&self.key).expect("HMAC can take key of any size")
    }

    /// Sign a session id into a cookie value
    pub fn sign(&self, id: &str) -> String {
        let mut mac = self.mac();
        mac.update(id.as_bytes());
        let tag = mac.finalize().into_bytes();
        format!("{}.{}", id, HEXLOWER.encode(&tag))
    }

    /// Recover the session id from a cookie value, if the signature holds
    pub fn verify(&self, value: &str) -> Option<String> {
        let (id, signature) = value.rsplit_once('.')?;
        if id.is_empty() {
            return None;
        }
        let signature = HEXLOWER.decode(signature.as_bytes()).ok()?;

        let mut mac = self.mac();
        mac.update(id.as_bytes());
        mac.verify_slice(&signature).ok()?;
        Some(id.to_string())
    }

    /// Find and verify this cookie among the request's `Cookie` headers
    pub fn session_id(&self, headers: &HeaderMap) -> Option<String> {
        let prefix = format!("{}=", self.name);
        headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|cookies| cookies.split(';'))
            .filter_map(|cookie| cookie.trim().strip_prefix(prefix.as_str()))
            .find_map(|value| self.verify(value))
    }

    /// `Set-Cookie` value carrying a signed session id
    pub fn set_cookie(&self, id: &str) -> HeaderValue {
        let mut cookie = format!("{}={}; Path=/; HttpOnly; SameSite=Lax", self.name, self.sign(id));
        if self.secure {
            cookie.push_str("; Secure");
        }
        // names come from config and values are [0-9a-f.], both valid header bytes
        HeaderValue::from_str(&cookie).unwrap_or_else(|_| HeaderValue::from_static(""))
    }

    /// `Set-Cookie` value that removes the cookie from the browser
    pub fn expire_cookie(&self) -> HeaderValue {
        let mut cookie = format!(
            "{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT",
            self.name
        );
        if self.secure {
            cookie.push_str("; Secure");
        }
        HeaderValue::from_str(&cookie).unwrap_or_else(|_| HeaderValue::from_static(""))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cookie() -> SessionCookie {
        SessionCookie::new("ublog_session", b"test-secret".to_vec(), false)
    }

    #[test]
    fn test_sign_and_verify() {
        let cookie = cookie();
        let value = cookie.sign("abc123");

        assert!(value.starts_with("abc123."));
        assert_eq!(value.len(), "abc123.".len() + 64);
        assert_eq!(cookie.verify(&value), Some("abc123".to_string()));
    }

    #[test]
    fn test_verify_rejects_tampering() {
        let cookie = cookie();
        let value = cookie.sign("abc123");
        let signature = value.split_once('.').unwrap().1;

        assert_eq!(cookie.verify(&format!("abc124.{}", signature)), None);
        assert_eq!(cookie.verify("abc123"), None);
        assert_eq!(cookie.verify("abc123.zz"), None);
        assert_eq!(cookie.verify(&format!(".{}", signature)), None);

        let other_key = SessionCookie::new("ublog_session", b"other-secret".to_vec(), false);
        assert_eq!(other_key.verify(&value), None);
    }

    #[test]
    fn test_session_id_from_headers() {
        let cookie = cookie();
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_str(&format!("theme=dark; ublog_session={}", cookie.sign("abc123")))
                .unwrap(),
        );

        assert_eq!(cookie.session_id(&headers), Some("abc123".to_string()));
        assert_eq!(cookie.session_id(&HeaderMap::new()), None);
    }

    #[test]
    fn test_session_id_ignores_forged_cookie() {
        let cookie = cookie();
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("ublog_session=abc123.deadbeef"));
        assert_eq!(cookie.session_id(&headers), None);
    }

    #[test]
    fn test_cookie_attributes() {
        let value = cookie().set_cookie("abc123");
        let value = value.to_str().unwrap();
        assert!(value.starts_with("ublog_session=abc123."));
        assert!(value.contains("Path=/"));
        assert!(value.contains("HttpOnly"));
        assert!(value.contains("SameSite=Lax"));
        assert!(!value.contains("Secure"));
        assert!(!value.contains("Max-Age"));

        let secure = SessionCookie::new("ublog_session", b"k".to_vec(), true);
        assert!(secure.set_cookie("abc").to_str().unwrap().ends_with("; Secure"));

        let expired = cookie().expire_cookie();
        assert!(expired.to_str().unwrap().contains("Max-Age=0"));
    }
}
