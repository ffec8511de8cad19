//! Token 签发与校验（HS256 紧凑 JWS）。

use anyhow::{Context, anyhow};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use sa_shared_protocol::{Claims, unix_now};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use sha2::Sha256;
use uuid::Uuid;

use crate::auth::error::AuthError;

type HmacSha256 = Hmac<Sha256>;

/// 唯一支持的签名算法。
const JWT_ALG: &str = "HS256";
/// 头部 typ 字段。
const JWT_TYP: &str = "JWT";

/// JWS 头部。
#[derive(Debug, Serialize, Deserialize)]
struct JwtHeader {
    alg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    typ: Option<String>,
}

/// 一次签发结果。
#[derive(Debug, Clone)]
pub(crate) struct IssuedToken {
    pub(crate) token: String,
    pub(crate) claims: Claims,
}

/// 持有服务端签名密钥的签发/校验器；启动后只读。
#[derive(Clone)]
pub(crate) struct TokenSigner {
    mac: HmacSha256,
    ttl_sec: u64,
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner")
            .field("ttl_sec", &self.ttl_sec)
            .finish_non_exhaustive()
    }
}

impl TokenSigner {
    /// 用配置中的密钥构造签名器。
    pub(crate) fn new(secret: &str, ttl_sec: u64) -> anyhow::Result<Self> {
        if secret.is_empty() {
            return Err(anyhow!("signing secret must not be empty"));
        }
        let mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|err| anyhow!("invalid signing secret: {err}"))?;
        Ok(Self { mac, ttl_sec })
    }

    /// token 有效期（秒）。
    pub(crate) fn ttl_sec(&self) -> u64 {
        self.ttl_sec
    }

    /// 以当前时间签发 token。
    pub(crate) fn issue(&self, user_id: &str, roles: &[String]) -> anyhow::Result<IssuedToken> {
        self.issue_at(user_id, roles, unix_now())
    }

    /// 以指定时间签发 token。
    pub(crate) fn issue_at(
        &self,
        user_id: &str,
        roles: &[String],
        now: u64,
    ) -> anyhow::Result<IssuedToken> {
        let claims = Claims {
            user_id: user_id.to_string(),
            roles: dedup_roles(roles),
            iat: now,
            exp: now.saturating_add(self.ttl_sec),
            jti: Uuid::new_v4().simple().to_string(),
        };
        let header = JwtHeader {
            alg: JWT_ALG.to_string(),
            typ: Some(JWT_TYP.to_string()),
        };
        let header_b64 = encode_segment(&header).context("encode token header")?;
        let payload_b64 = encode_segment(&claims).context("encode token claims")?;
        let signing_input = format!("{header_b64}.{payload_b64}");
        let sig_b64 = URL_SAFE_NO_PAD.encode(self.sign(signing_input.as_bytes()));
        Ok(IssuedToken {
            token: format!("{signing_input}.{sig_b64}"),
            claims,
        })
    }

    /// 以当前时间校验 token。
    pub(crate) fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        self.verify_at(token, unix_now())
    }

    /// 校验顺序：结构 -> 签名 -> 头部/载荷解码 -> 过期。签名通过前不解码任何载荷。
    pub(crate) fn verify_at(&self, token: &str, now: u64) -> Result<Claims, AuthError> {
        let mut parts = token.split('.');
        let header_b64 = parts.next().unwrap_or_default();
        let payload_b64 = parts.next().unwrap_or_default();
        let sig_b64 = parts.next().unwrap_or_default();
        if header_b64.is_empty()
            || payload_b64.is_empty()
            || sig_b64.is_empty()
            || parts.next().is_some()
        {
            return Err(AuthError::MalformedToken);
        }

        let sig = URL_SAFE_NO_PAD
            .decode(sig_b64.as_bytes())
            .map_err(|_| AuthError::InvalidSignature)?;
        let mut mac = self.mac.clone();
        mac.update(header_b64.as_bytes());
        mac.update(b".");
        mac.update(payload_b64.as_bytes());
        mac.verify_slice(&sig)
            .map_err(|_| AuthError::InvalidSignature)?;

        let header: JwtHeader = decode_segment(header_b64)?;
        if header.alg != JWT_ALG {
            return Err(AuthError::MalformedToken);
        }
        let claims: Claims = decode_segment(payload_b64)?;
        if claims.is_expired_at(now) {
            return Err(AuthError::Expired);
        }
        Ok(claims)
    }

    /// HMAC-SHA256 原始签名。
    fn sign(&self, input: &[u8]) -> Vec<u8> {
        let mut mac = self.mac.clone();
        mac.update(input);
        mac.finalize().into_bytes().to_vec()
    }
}

/// 角色去重，保持首次出现顺序。
fn dedup_roles(roles: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(roles.len());
    for role in roles {
        if !out.contains(role) {
            out.push(role.clone());
        }
    }
    out
}

/// JSON 编码并输出 base64url。
fn encode_segment<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let raw = serde_json::to_vec(value)?;
    Ok(URL_SAFE_NO_PAD.encode(raw))
}

/// base64url 解码后按 JSON 解析。
fn decode_segment<T: DeserializeOwned>(segment: &str) -> Result<T, AuthError> {
    let raw = URL_SAFE_NO_PAD
        .decode(segment.as_bytes())
        .map_err(|_| AuthError::MalformedToken)?;
    serde_json::from_slice(&raw).map_err(|_| AuthError::MalformedToken)
}

#[cfg(test)]
mod tests {
    use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};

    use super::{TokenSigner, encode_segment};
    use crate::auth::error::AuthError;

    const SECRET: &str = "unit-test-secret-with-enough-length-0001";
    const TTL: u64 = 86_400;
    const NOW: u64 = 1_700_000_000;

    fn signer() -> TokenSigner {
        TokenSigner::new(SECRET, TTL).unwrap()
    }

    fn roles(items: &[&str]) -> Vec<String> {
        items.iter().map(|item| item.to_string()).collect()
    }

    fn split(token: &str) -> (String, String, String) {
        let parts: Vec<&str> = token.split('.').collect();
        assert_eq!(parts.len(), 3);
        (
            parts[0].to_string(),
            parts[1].to_string(),
            parts[2].to_string(),
        )
    }

    #[test]
    fn issued_claims_round_trip() {
        let signer = signer();
        let issued = signer.issue_at("admin", &roles(&["admin"]), NOW).unwrap();
        assert_eq!(issued.claims.iat, NOW);
        assert_eq!(issued.claims.exp, NOW + TTL);

        let claims = signer.verify_at(&issued.token, NOW + TTL - 1).unwrap();
        assert_eq!(claims, issued.claims);
        assert_eq!(claims.user_id, "admin");
        assert_eq!(claims.roles, vec!["admin".to_string()]);
    }

    #[test]
    fn roles_are_deduplicated_in_order() {
        let issued = signer()
            .issue_at("ops", &roles(&["user", "admin", "user"]), NOW)
            .unwrap();
        assert_eq!(issued.claims.roles, roles(&["user", "admin"]));
    }

    #[test]
    fn jti_is_unique_hex() {
        let signer = signer();
        let a = signer.issue_at("admin", &[], NOW).unwrap();
        let b = signer.issue_at("admin", &[], NOW).unwrap();
        assert_ne!(a.claims.jti, b.claims.jti);
        assert_eq!(a.claims.jti.len(), 32);
        assert!(a.claims.jti.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn header_declares_hs256() {
        let issued = signer().issue_at("admin", &[], NOW).unwrap();
        let (header, _, _) = split(&issued.token);
        let raw = URL_SAFE_NO_PAD.decode(header).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&raw).unwrap();
        assert_eq!(value["alg"], "HS256");
        assert_eq!(value["typ"], "JWT");
    }

    #[test]
    fn any_single_bit_flip_in_signature_is_rejected() {
        let signer = signer();
        let issued = signer.issue_at("admin", &roles(&["admin"]), NOW).unwrap();
        let (header, payload, sig) = split(&issued.token);
        let sig_raw = URL_SAFE_NO_PAD.decode(sig).unwrap();

        for byte in 0..sig_raw.len() {
            for bit in 0..8 {
                let mut flipped = sig_raw.clone();
                flipped[byte] ^= 1 << bit;
                let token = format!("{header}.{payload}.{}", URL_SAFE_NO_PAD.encode(&flipped));
                assert_eq!(
                    signer.verify_at(&token, NOW),
                    Err(AuthError::InvalidSignature),
                    "byte {byte} bit {bit}"
                );
            }
        }
    }

    #[test]
    fn undecodable_signature_is_invalid_signature() {
        let signer = signer();
        let issued = signer.issue_at("admin", &[], NOW).unwrap();
        let (header, payload, _) = split(&issued.token);
        let token = format!("{header}.{payload}.@@@");
        assert_eq!(
            signer.verify_at(&token, NOW),
            Err(AuthError::InvalidSignature)
        );
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let signer = signer();
        let issued = signer.issue_at("guest", &roles(&["user"]), NOW).unwrap();
        let (header, _, sig) = split(&issued.token);

        let mut forged = issued.claims.clone();
        forged.roles = roles(&["admin"]);
        let payload = encode_segment(&forged).unwrap();
        let token = format!("{header}.{payload}.{sig}");
        assert_eq!(
            signer.verify_at(&token, NOW),
            Err(AuthError::InvalidSignature)
        );
    }

    #[test]
    fn token_from_other_secret_is_rejected() {
        let other = TokenSigner::new("another-secret-entirely-different-0002", TTL).unwrap();
        let issued = other.issue_at("admin", &[], NOW).unwrap();
        assert_eq!(
            signer().verify_at(&issued.token, NOW),
            Err(AuthError::InvalidSignature)
        );
    }

    #[test]
    fn expired_token_with_valid_signature_is_rejected() {
        let signer = signer();
        let issued = signer.issue_at("admin", &[], NOW).unwrap();
        assert_eq!(
            signer.verify_at(&issued.token, NOW + TTL),
            Err(AuthError::Expired)
        );
        assert_eq!(
            signer.verify_at(&issued.token, NOW + TTL * 10),
            Err(AuthError::Expired)
        );
    }

    #[test]
    fn signature_is_checked_before_expiry() {
        let signer = signer();
        let issued = signer.issue_at("admin", &[], NOW).unwrap();
        let (header, payload, _) = split(&issued.token);
        let token = format!("{header}.{payload}.{}", URL_SAFE_NO_PAD.encode([0u8; 32]));
        assert_eq!(
            signer.verify_at(&token, NOW + TTL * 2),
            Err(AuthError::InvalidSignature)
        );
    }

    #[test]
    fn non_hs256_header_is_rejected_even_when_signed() {
        let signer = signer();
        let issued = signer.issue_at("admin", &[], NOW).unwrap();
        let (_, payload, _) = split(&issued.token);
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
        let input = format!("{header}.{payload}");
        let sig = URL_SAFE_NO_PAD.encode(signer.sign(input.as_bytes()));
        assert_eq!(
            signer.verify_at(&format!("{input}.{sig}"), NOW),
            Err(AuthError::MalformedToken)
        );
    }

    #[test]
    fn signed_non_json_payload_is_malformed() {
        let signer = signer();
        let issued = signer.issue_at("admin", &[], NOW).unwrap();
        let (header, _, _) = split(&issued.token);
        let payload = URL_SAFE_NO_PAD.encode(b"not json");
        let input = format!("{header}.{payload}");
        let sig = URL_SAFE_NO_PAD.encode(signer.sign(input.as_bytes()));
        assert_eq!(
            signer.verify_at(&format!("{input}.{sig}"), NOW),
            Err(AuthError::MalformedToken)
        );
    }

    #[test]
    fn structurally_broken_tokens_are_malformed() {
        let signer = signer();
        for token in ["", "abc", "a.b", "a..c", "a.b.c.d", ".b.c"] {
            assert_eq!(
                signer.verify_at(token, NOW),
                Err(AuthError::MalformedToken),
                "{token:?}"
            );
        }
    }

    #[test]
    fn empty_secret_is_refused() {
        assert!(TokenSigner::new("", TTL).is_err());
    }
}
