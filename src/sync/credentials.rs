//! Turns a marketplace's credential blob into ready-to-use request headers.

use crate::marketplace::Credentials;
use crate::sync::error::SyncError;
use crate::sync::signature;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};

pub const PUBLIC_KEY_HEADER: &str = "x-request-public-key";
pub const SIGNATURE_HEADER: &str = "x-request-signature";

/// Pagination context the signed scheme bakes into the signature. Because the
/// signature is page- and time-dependent, resolution happens once per
/// paginated request, never reused across pages.
#[derive(Debug, Clone, Copy)]
pub struct PageContext {
    pub page_nr: u32,
    pub items_per_page: u32,
}

/// Produce scheme-specific auth headers for one request.
pub fn resolve(credentials: &Credentials, page: PageContext) -> Result<HeaderMap, SyncError> {
    let mut headers = HeaderMap::new();
    match credentials {
        Credentials::UserPass { username, password } => {
            if username.is_empty() || password.is_empty() {
                return Err(SyncError::UnsupportedCredential(
                    "user_pass with empty key".into(),
                ));
            }
            let token = BASE64.encode(format!("{username}:{password}"));
            headers.insert(AUTHORIZATION, header_value(&format!("Basic {token}"))?);
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }
        Credentials::PubPriv {
            public_key,
            private_key,
        } => {
            if public_key.is_empty() || private_key.is_empty() {
                return Err(SyncError::UnsupportedCredential(
                    "pub_priv with empty key".into(),
                ));
            }
            let sig = signature::sign(public_key, private_key, page.page_nr, page.items_per_page);
            headers.insert(
                HeaderName::from_static(PUBLIC_KEY_HEADER),
                header_value(public_key)?,
            );
            headers.insert(HeaderName::from_static(SIGNATURE_HEADER), header_value(&sig)?);
        }
    }
    Ok(headers)
}

fn header_value(raw: &str) -> Result<HeaderValue, SyncError> {
    HeaderValue::from_str(raw)
        .map_err(|_| SyncError::UnsupportedCredential("key material not header-safe".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: PageContext = PageContext {
        page_nr: 1,
        items_per_page: 100,
    };

    #[test]
    fn user_pass_yields_basic_authorization() {
        let creds = Credentials::UserPass {
            username: "user".into(),
            password: "pass".into(),
        };
        let headers = resolve(&creds, PAGE).unwrap();
        // base64("user:pass")
        assert_eq!(
            headers.get(AUTHORIZATION).unwrap(),
            "Basic dXNlcjpwYXNz"
        );
        assert_eq!(headers.get(CONTENT_TYPE).unwrap(), "application/json");
    }

    #[test]
    fn pub_priv_yields_signed_headers() {
        let creds = Credentials::PubPriv {
            public_key: "my-public-key".into(),
            private_key: "my-private-key".into(),
        };
        let headers = resolve(&creds, PAGE).unwrap();
        assert_eq!(headers.get(PUBLIC_KEY_HEADER).unwrap(), "my-public-key");

        let sig = headers.get(SIGNATURE_HEADER).unwrap().to_str().unwrap();
        // Leading 4-digit zero-padded window, then the hex digest.
        assert_eq!(sig.len(), 4 + 128);
        assert!(sig[..4].chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn fresh_page_context_changes_signature() {
        let creds = Credentials::PubPriv {
            public_key: "pk".into(),
            private_key: "sk".into(),
        };
        let first = resolve(&creds, PAGE).unwrap();
        let second = resolve(
            &creds,
            PageContext {
                page_nr: 2,
                items_per_page: 100,
            },
        )
        .unwrap();
        assert_ne!(
            first.get(SIGNATURE_HEADER).unwrap(),
            second.get(SIGNATURE_HEADER).unwrap()
        );
    }

    #[test]
    fn empty_key_material_is_unsupported() {
        let creds = Credentials::UserPass {
            username: "".into(),
            password: "pass".into(),
        };
        assert!(matches!(
            resolve(&creds, PAGE),
            Err(SyncError::UnsupportedCredential(_))
        ));
    }
}
