//! Token-embedded credential provider.
//!
//! Highest-priority source: credentials packaged into a short-lived
//! HMAC-SHA256-signed token already bound to (organization, integration
//! type). A token whose integration type does not match the request is not an
//! error - the provider falls through so broader sources can answer.

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD as BASE64URL;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::{debug, warn};

use crate::domains::credentials::error::CredentialError;
use crate::domains::credentials::provider::{CredentialProvider, ResolveRequest};
use crate::domains::credentials::record::{CredentialMap, CredentialRecord};
use crate::domains::registry::IntegrationType;

type HmacSha256 = Hmac<Sha256>;

/// Signed token payload: `base64url(json) + "." + base64url(hmac)`.
#[derive(Debug, Serialize, Deserialize)]
struct TokenPayload {
    #[serde(rename = "org")]
    organization_id: String,
    #[serde(rename = "integrationType")]
    integration_type: IntegrationType,
    /// Expiry as unix seconds.
    exp: i64,
    fields: CredentialMap,
}

/// Verifies and unpacks short-lived credential tokens.
pub struct TokenCredentialProvider {
    signing_key: Vec<u8>,
}

impl TokenCredentialProvider {
    pub fn new(signing_key: impl AsRef<[u8]>) -> Self {
        Self {
            signing_key: signing_key.as_ref().to_vec(),
        }
    }

    /// Mint a token for the given scope. Used by trusted internal callers
    /// and by tests; the gateway itself only verifies.
    pub fn mint(
        &self,
        organization_id: &str,
        integration_type: &IntegrationType,
        fields: &CredentialMap,
        expires_at: chrono::DateTime<chrono::Utc>,
    ) -> String {
        let payload = TokenPayload {
            organization_id: organization_id.to_string(),
            integration_type: integration_type.clone(),
            exp: expires_at.timestamp(),
            fields: fields.clone(),
        };
        let body = BASE64URL.encode(serde_json::to_vec(&payload).expect("payload serializes"));
        let mut mac =
            HmacSha256::new_from_slice(&self.signing_key).expect("hmac accepts any key length");
        mac.update(body.as_bytes());
        let sig = BASE64URL.encode(mac.finalize().into_bytes());
        format!("{body}.{sig}")
    }

    fn verify(&self, token: &str) -> Result<TokenPayload, CredentialError> {
        let (body, sig) = token
            .split_once('.')
            .ok_or_else(|| CredentialError::provider("token", "malformed token"))?;

        let sig_bytes = BASE64URL
            .decode(sig)
            .map_err(|_| CredentialError::provider("token", "malformed signature"))?;

        let mut mac =
            HmacSha256::new_from_slice(&self.signing_key).expect("hmac accepts any key length");
        mac.update(body.as_bytes());
        mac.verify_slice(&sig_bytes)
            .map_err(|_| CredentialError::provider("token", "signature verification failed"))?;

        let payload_bytes = BASE64URL
            .decode(body)
            .map_err(|_| CredentialError::provider("token", "malformed payload"))?;
        serde_json::from_slice(&payload_bytes)
            .map_err(|e| CredentialError::provider("token", e.to_string()))
    }
}

#[async_trait]
impl CredentialProvider for TokenCredentialProvider {
    fn name(&self) -> &'static str {
        "token"
    }

    async fn resolve(
        &self,
        request: &ResolveRequest,
    ) -> Result<Option<CredentialRecord>, CredentialError> {
        let Some(token) = request.credential_token.as_deref() else {
            return Ok(None);
        };

        let payload = self.verify(token)?;

        if payload.integration_type != request.integration_type {
            // Bound to a different integration: fall through, not an error.
            debug!(
                token_type = %payload.integration_type,
                requested = %request.integration_type,
                "credential token bound to a different integration type"
            );
            return Ok(None);
        }

        if payload.organization_id != request.organization_id {
            warn!(
                requested = %request.organization_id,
                "credential token bound to a different organization; ignoring"
            );
            return Ok(None);
        }

        if payload.exp <= chrono::Utc::now().timestamp() {
            debug!("credential token expired");
            return Ok(None);
        }

        Ok(Some(CredentialRecord::new(
            payload.organization_id,
            payload.integration_type,
            payload.fields,
        )))
    }
}
