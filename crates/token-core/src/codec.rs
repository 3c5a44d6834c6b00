//! Claim Codec: deterministic, strictly-typed translation
//! between [`AccessClaims`]/[`RefreshClaims`] and the generic [`ClaimMap`]
//! the Signer deals in.
//!
//! Decoding never trusts the wire: every standard claim is type-checked,
//! and a caller-supplied list of additional claim names can be required to
//! be present as non-empty strings.

use std::collections::BTreeMap;

use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use uuid::Uuid;

use token_crypto::ClaimMap;

use crate::claims::{AccessClaims, ClaimTimestamps, RefreshClaims, TokenKind};
use crate::error::TokenError;

const CLAIM_JTI: &str = "jti";
const CLAIM_SUB: &str = "sub";
const CLAIM_SID: &str = "sid";
const CLAIM_USERNAME: &str = "usr";
const CLAIM_ISS: &str = "iss";
const CLAIM_AUD: &str = "aud";
const CLAIM_ROLES: &str = "rls";
const CLAIM_IAT: &str = "iat";
const CLAIM_EXP: &str = "exp";
const CLAIM_NBF: &str = "nbf";
const CLAIM_MLE: &str = "mle";
const CLAIM_TYP: &str = "typ";

fn to_unix(ts: DateTime<Utc>) -> Value {
    Value::Number(ts.timestamp().into())
}

/// Extracts a Unix-seconds value from whatever numeric representation the
/// underlying JSON layer produced for a timestamp claim: a JSON integer, a
/// JSON float (truncated toward zero), or a string holding a number — all
/// of which a counterpart implementation may legitimately emit.
fn numeric_seconds(value: &Value, name: &str) -> Result<i64, TokenError> {
    if let Some(n) = value.as_i64() {
        return Ok(n);
    }
    if let Some(f) = value.as_f64() {
        return Ok(f as i64);
    }
    if let Some(s) = value.as_str() {
        return s
            .parse::<f64>()
            .map(|f| f as i64)
            .map_err(|_| TokenError::MalformedClaim(name.to_string()));
    }
    Err(TokenError::MalformedClaim(name.to_string()))
}

fn from_unix(map: &ClaimMap, name: &str) -> Result<DateTime<Utc>, TokenError> {
    let raw = map
        .get(name)
        .ok_or_else(|| TokenError::MissingRequiredClaim(name.to_string()))?;
    let n = numeric_seconds(raw, name)?;
    Utc.timestamp_opt(n, 0)
        .single()
        .ok_or_else(|| TokenError::MalformedClaim(name.to_string()))
}

fn required_string(map: &ClaimMap, name: &str) -> Result<String, TokenError> {
    map.get(name)
        .ok_or_else(|| TokenError::MissingRequiredClaim(name.to_string()))?
        .as_str()
        .map(str::to_owned)
        .ok_or_else(|| TokenError::MalformedClaim(name.to_string()))
}

fn required_uuid(map: &ClaimMap, name: &str) -> Result<Uuid, TokenError> {
    let raw = required_string(map, name)?;
    Uuid::parse_str(&raw).map_err(|_| TokenError::MalformedClaim(name.to_string()))
}

fn optional_uuid(map: &ClaimMap, name: &str) -> Result<Option<Uuid>, TokenError> {
    match map.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => {
            let s = v
                .as_str()
                .ok_or_else(|| TokenError::MalformedClaim(name.to_string()))?;
            Uuid::parse_str(s)
                .map(Some)
                .map_err(|_| TokenError::MalformedClaim(name.to_string()))
        }
    }
}

fn required_string_array(map: &ClaimMap, name: &str) -> Result<Vec<String>, TokenError> {
    let arr = map
        .get(name)
        .ok_or_else(|| TokenError::MissingRequiredClaim(name.to_string()))?
        .as_array()
        .ok_or_else(|| TokenError::MalformedClaim(name.to_string()))?;
    arr.iter()
        .map(|v| {
            v.as_str()
                .map(str::to_owned)
                .ok_or_else(|| TokenError::MalformedClaim(name.to_string()))
        })
        .collect()
}

/// Like [`required_string_array`] but also accepts a single JSON string, the
/// way `aud` is conventionally encoded when a token carries exactly one
/// audience — explicit case handling rather than a dynamic-dispatch shim.
fn required_string_or_array(map: &ClaimMap, name: &str) -> Result<Vec<String>, TokenError> {
    let value = map
        .get(name)
        .ok_or_else(|| TokenError::MissingRequiredClaim(name.to_string()))?;
    match value {
        Value::String(s) => Ok(vec![s.clone()]),
        Value::Array(_) => required_string_array(map, name),
        _ => Err(TokenError::MalformedClaim(name.to_string())),
    }
}

/// Checks that every caller-configured required claim name is present and
/// non-empty. Kept separate from [`decode_access`]/[`decode_refresh`] so the
/// Maker can run this check *after* the time-window checks (spec §4.5 stage
/// 6, not stage 4) — a token that is both expired and missing a configured
/// claim must surface `expired`, not `missing_required_claim`.
pub fn check_required_claims(map: &ClaimMap, required: &[String]) -> Result<(), TokenError> {
    for name in required {
        match map.get(name) {
            None | Some(Value::Null) => {
                return Err(TokenError::MissingRequiredClaim(name.clone()))
            }
            Some(Value::String(s)) if s.is_empty() => {
                return Err(TokenError::MissingRequiredClaim(name.clone()))
            }
            _ => {}
        }
    }
    Ok(())
}

fn timestamps_from_map(map: &ClaimMap) -> Result<ClaimTimestamps, TokenError> {
    Ok(ClaimTimestamps {
        issued_at: from_unix(map, CLAIM_IAT)?,
        expires_at: from_unix(map, CLAIM_EXP)?,
        not_before: from_unix(map, CLAIM_NBF)?,
        max_lifetime_expiry: from_unix(map, CLAIM_MLE)?,
    })
}

/// Encodes an [`AccessClaims`] record into the generic claim map the Signer
/// will serialize and sign.
pub fn encode_access(claims: &AccessClaims) -> ClaimMap {
    let mut map: ClaimMap = BTreeMap::new();
    map.insert(CLAIM_JTI.into(), Value::String(claims.token_id.to_string()));
    map.insert(CLAIM_SUB.into(), Value::String(claims.subject.to_string()));
    if let Some(sid) = claims.session_id {
        map.insert(CLAIM_SID.into(), Value::String(sid.to_string()));
    }
    map.insert(CLAIM_USERNAME.into(), Value::String(claims.username.clone()));
    map.insert(CLAIM_ISS.into(), Value::String(claims.issuer.clone()));
    map.insert(
        CLAIM_AUD.into(),
        Value::Array(claims.audience.iter().cloned().map(Value::String).collect()),
    );
    map.insert(
        CLAIM_ROLES.into(),
        Value::Array(claims.roles.iter().cloned().map(Value::String).collect()),
    );
    map.insert(CLAIM_TYP.into(), Value::String(TokenKind::Access.as_str().into()));
    map.insert(CLAIM_IAT.into(), to_unix(claims.timestamps.issued_at));
    map.insert(CLAIM_EXP.into(), to_unix(claims.timestamps.expires_at));
    map.insert(CLAIM_NBF.into(), to_unix(claims.timestamps.not_before));
    map.insert(CLAIM_MLE.into(), to_unix(claims.timestamps.max_lifetime_expiry));
    map
}

/// Encodes a [`RefreshClaims`] record.
pub fn encode_refresh(claims: &RefreshClaims) -> ClaimMap {
    let mut map: ClaimMap = BTreeMap::new();
    map.insert(CLAIM_JTI.into(), Value::String(claims.token_id.to_string()));
    map.insert(CLAIM_SUB.into(), Value::String(claims.subject.to_string()));
    if let Some(sid) = claims.session_id {
        map.insert(CLAIM_SID.into(), Value::String(sid.to_string()));
    }
    map.insert(CLAIM_USERNAME.into(), Value::String(claims.username.clone()));
    map.insert(CLAIM_ISS.into(), Value::String(claims.issuer.clone()));
    map.insert(
        CLAIM_AUD.into(),
        Value::Array(claims.audience.iter().cloned().map(Value::String).collect()),
    );
    map.insert(CLAIM_TYP.into(), Value::String(TokenKind::Refresh.as_str().into()));
    map.insert(CLAIM_IAT.into(), to_unix(claims.timestamps.issued_at));
    map.insert(CLAIM_EXP.into(), to_unix(claims.timestamps.expires_at));
    map.insert(CLAIM_NBF.into(), to_unix(claims.timestamps.not_before));
    map.insert(CLAIM_MLE.into(), to_unix(claims.timestamps.max_lifetime_expiry));
    map
}

/// Decodes a claim map into the kind the caller expects, enforcing that
/// `typ` matches and that every name in `required_claims` is present.
///
/// This performs no time-window validation — that is the Maker's job,
/// since only the Maker knows "now" and the configured clock skew.
pub fn decode_kind(map: &ClaimMap) -> Result<TokenKind, TokenError> {
    match required_string(map, CLAIM_TYP)?.as_str() {
        "access" => Ok(TokenKind::Access),
        "refresh" => Ok(TokenKind::Refresh),
        _ => Err(TokenError::MalformedClaim(CLAIM_TYP.to_string())),
    }
}

/// Decodes the fixed base claim set for an access token. Does not enforce
/// any caller-configured `required_claims` — call
/// [`check_required_claims`] separately once the Maker has finished its
/// time-window checks.
pub fn decode_access(map: &ClaimMap) -> Result<AccessClaims, TokenError> {
    if decode_kind(map)? != TokenKind::Access {
        return Err(TokenError::KindMismatch);
    }
    Ok(AccessClaims {
        token_id: required_uuid(map, CLAIM_JTI)?,
        subject: required_uuid(map, CLAIM_SUB)?,
        session_id: optional_uuid(map, CLAIM_SID)?,
        username: required_string(map, CLAIM_USERNAME)?,
        issuer: required_string(map, CLAIM_ISS)?,
        audience: required_string_or_array(map, CLAIM_AUD)?,
        roles: required_string_array(map, CLAIM_ROLES)?,
        timestamps: timestamps_from_map(map)?,
    })
}

/// Decodes the fixed base claim set for a refresh token. See
/// [`decode_access`] for why `required_claims` is not enforced here.
pub fn decode_refresh(map: &ClaimMap) -> Result<RefreshClaims, TokenError> {
    if decode_kind(map)? != TokenKind::Refresh {
        return Err(TokenError::KindMismatch);
    }
    Ok(RefreshClaims {
        token_id: required_uuid(map, CLAIM_JTI)?,
        subject: required_uuid(map, CLAIM_SUB)?,
        session_id: optional_uuid(map, CLAIM_SID)?,
        username: required_string(map, CLAIM_USERNAME)?,
        issuer: required_string(map, CLAIM_ISS)?,
        audience: required_string_or_array(map, CLAIM_AUD)?,
        timestamps: timestamps_from_map(map)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample_access() -> AccessClaims {
        let now = Utc::now();
        AccessClaims {
            token_id: Uuid::new_v4(),
            subject: Uuid::new_v4(),
            session_id: Some(Uuid::new_v4()),
            username: "alice".into(),
            issuer: "token-engine".into(),
            audience: vec!["api".into()],
            roles: vec!["admin".into()],
            timestamps: ClaimTimestamps {
                issued_at: now,
                expires_at: now + Duration::minutes(15),
                not_before: now,
                max_lifetime_expiry: now + Duration::hours(12),
            },
        }
    }

    #[test]
    fn access_round_trips_through_the_claim_map() {
        let original = sample_access();
        let map = encode_access(&original);
        let decoded = decode_access(&map).unwrap();
        assert_eq!(decoded.token_id, original.token_id);
        assert_eq!(decoded.subject, original.subject);
        assert_eq!(decoded.session_id, original.session_id);
        assert_eq!(decoded.roles, original.roles);
    }

    #[test]
    fn roles_are_carried_on_the_wire_as_rls_not_roles() {
        let map = encode_access(&sample_access());
        assert!(map.contains_key("rls"));
        assert!(!map.contains_key("roles"));
    }

    #[test]
    fn a_single_string_audience_decodes_like_a_one_element_array() {
        let mut map = encode_access(&sample_access());
        map.insert(CLAIM_AUD.into(), Value::String("solo-audience".into()));
        let decoded = decode_access(&map).unwrap();
        assert_eq!(decoded.audience, vec!["solo-audience".to_string()]);
    }

    #[test]
    fn timestamp_claims_accept_float_and_string_number_forms() {
        let original = sample_access();
        let mut map = encode_access(&original);
        let exp_seconds = original.timestamps.expires_at.timestamp();

        map.insert(CLAIM_EXP.into(), serde_json::json!(exp_seconds as f64));
        let decoded = decode_access(&map).unwrap();
        assert_eq!(decoded.timestamps.expires_at.timestamp(), exp_seconds);

        map.insert(CLAIM_EXP.into(), Value::String(exp_seconds.to_string()));
        let decoded = decode_access(&map).unwrap();
        assert_eq!(decoded.timestamps.expires_at.timestamp(), exp_seconds);
    }

    #[test]
    fn decoding_refresh_as_access_is_a_kind_mismatch() {
        let now = Utc::now();
        let refresh = RefreshClaims {
            token_id: Uuid::new_v4(),
            subject: Uuid::new_v4(),
            session_id: None,
            username: "bob".into(),
            issuer: "token-engine".into(),
            audience: vec!["api".into()],
            timestamps: ClaimTimestamps {
                issued_at: now,
                expires_at: now + Duration::days(7),
                not_before: now,
                max_lifetime_expiry: now + Duration::days(30),
            },
        };
        let map = encode_refresh(&refresh);
        let err = decode_access(&map).unwrap_err();
        assert!(matches!(err, TokenError::KindMismatch));
    }

    #[test]
    fn missing_extra_required_claim_is_rejected() {
        let original = sample_access();
        let map = encode_access(&original);
        let err = check_required_claims(&map, &["tenant".to_string()]).unwrap_err();
        assert!(matches!(err, TokenError::MissingRequiredClaim(name) if name == "tenant"));
    }

    #[test]
    fn wrong_claim_type_is_malformed_not_a_panic() {
        let original = sample_access();
        let mut map = encode_access(&original);
        map.insert(CLAIM_EXP.into(), Value::String("not-a-number".into()));
        let err = decode_access(&map).unwrap_err();
        assert!(matches!(err, TokenError::MalformedClaim(name) if name == "exp"));
    }

    #[test]
    fn missing_standard_claim_is_rejected() {
        let original = sample_access();
        let mut map = encode_access(&original);
        map.remove(CLAIM_SUB);
        let err = decode_access(&map).unwrap_err();
        assert!(matches!(err, TokenError::MissingRequiredClaim(name) if name == "sub"));
    }
}
