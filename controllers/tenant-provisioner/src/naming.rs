//! Tenant identity and instance naming.
//!
//! Tenant ids are validated here before anything touches the cluster store.
//! Instance names, gateway tokens, hosts and endpoints are all derived here.

use crate::error::ProvisionerError;
use rand::RngCore;
use rand::rngs::OsRng;
use uuid::Uuid;

/// Prefix of every generated instance name
pub const INSTANCE_NAME_PREFIX: &str = "tenant-";

/// Random bytes behind an instance name suffix (8 hex chars)
const INSTANCE_NAME_BYTES: usize = 4;

/// Random bytes behind a gateway token (64 hex chars)
const GATEWAY_TOKEN_BYTES: usize = 32;

/// Length of the canonical hyphenated UUID form
const HYPHENATED_UUID_LEN: usize = 36;

/// A tenant identifier in canonical UUID form.
///
/// Only obtainable through [`TenantId::parse`]. The caller's original text,
/// including letter case, is kept and used as the `tenant` label value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TenantId(String);

impl TenantId {
    /// Validate `id` against the 8-4-4-4-12 hex grammar.
    ///
    /// Case-insensitive. Version and variant bits are not checked. Braced,
    /// URN and unhyphenated forms are rejected.
    pub fn parse(id: &str) -> Result<Self, ProvisionerError> {
        // The hyphenated form is the only 36-character form uuid accepts.
        if id.len() == HYPHENATED_UUID_LEN && Uuid::try_parse(id).is_ok() {
            Ok(Self(id.to_string()))
        } else {
            Err(ProvisionerError::InvalidTenantId(id.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Label selector matching every instance of this tenant
    pub fn label_selector(&self) -> String {
        format!("tenant={}", self.0)
    }
}

impl std::fmt::Display for TenantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

fn random_hex(len: usize) -> Result<String, ProvisionerError> {
    let mut bytes = vec![0u8; len];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| ProvisionerError::Entropy(e.to_string()))?;

    Ok(to_hex(&bytes))
}

/// Lowercase, zero-padded hex of `bytes`
fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Fresh `tenant-<8 hex>` instance name
pub fn generate_instance_name() -> Result<String, ProvisionerError> {
    Ok(format!("{}{}", INSTANCE_NAME_PREFIX, random_hex(INSTANCE_NAME_BYTES)?))
}

/// Fresh 64-hex-char gateway token
pub fn generate_gateway_token() -> Result<String, ProvisionerError> {
    random_hex(GATEWAY_TOKEN_BYTES)
}

pub fn public_host(instance_name: &str, domain: &str) -> String {
    format!("{}.{}", instance_name, domain)
}

pub fn internal_host(instance_name: &str, internal_domain: &str) -> String {
    format!("{}.{}", instance_name, internal_domain)
}

pub fn tls_secret_name(instance_name: &str) -> String {
    format!("{}-tls", instance_name)
}

/// Public URL of an instance. Depends only on the name and the domain.
pub fn endpoint_url(instance_name: &str, domain: &str) -> String {
    format!("https://{}", public_host(instance_name, domain))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_lower_hex(s: &str) -> bool {
        s.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
    }

    #[test]
    fn test_accepts_canonical_uuids() {
        for id in [
            "3f2c8a10-5b7e-4c1d-9a2f-0e6d4b8c7a91",
            "3F2C8A10-5B7E-4C1D-9A2F-0E6D4B8C7A91",
            "00000000-0000-0000-0000-000000000000",
            // v1 and arbitrary variant bits are fine
            "c232ab00-9414-11ec-b3c8-9e6bdeced846",
            "ffffffff-ffff-ffff-ffff-ffffffffffff",
        ] {
            let tenant = TenantId::parse(id).unwrap();
            assert_eq!(tenant.as_str(), id);
        }
    }

    #[test]
    fn test_rejects_non_canonical_ids() {
        for id in [
            "",
            "not-a-uuid",
            "3f2c8a105b7e4c1d9a2f0e6d4b8c7a91",
            "{3f2c8a10-5b7e-4c1d-9a2f-0e6d4b8c7a91}",
            "urn:uuid:3f2c8a10-5b7e-4c1d-9a2f-0e6d4b8c7a91",
            "3f2c8a10-5b7e-4c1d-9a2f-0e6d4b8c7a9",
            "3f2c8a10-5b7e-4c1d-9a2f-0e6d4b8c7a911",
            "3f2c8a10-5b7e-4c1d-9a2f-0e6d4b8c7a9g",
            "3f2c8a10_5b7e_4c1d_9a2f_0e6d4b8c7a91",
            " 3f2c8a10-5b7e-4c1d-9a2f-0e6d4b8c7a9",
            "3f2c8a1-05b7e-4c1d-9a2f-0e6d4b8c7a91",
        ] {
            assert!(
                matches!(TenantId::parse(id), Err(ProvisionerError::InvalidTenantId(_))),
                "{:?} should be rejected",
                id
            );
        }
    }

    #[test]
    fn test_label_selector() {
        let tenant = TenantId::parse("3f2c8a10-5b7e-4c1d-9a2f-0e6d4b8c7a91").unwrap();
        assert_eq!(tenant.label_selector(), "tenant=3f2c8a10-5b7e-4c1d-9a2f-0e6d4b8c7a91");
    }

    #[test]
    fn test_instance_name_shape() {
        let name = generate_instance_name().unwrap();
        let suffix = name.strip_prefix(INSTANCE_NAME_PREFIX).unwrap();
        assert_eq!(suffix.len(), 8);
        assert!(is_lower_hex(suffix));
    }

    #[test]
    fn test_instance_names_differ() {
        let a = generate_instance_name().unwrap();
        let b = generate_instance_name().unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_gateway_token_shape() {
        let token = generate_gateway_token().unwrap();
        assert_eq!(token.len(), 64);
        assert!(is_lower_hex(&token));
    }

    #[test]
    fn test_hex_is_zero_padded() {
        assert_eq!(to_hex(&[0x00, 0x0f, 0xa0, 0xff]), "000fa0ff");
        assert_eq!(to_hex(&[]), "");
    }

    #[test]
    fn test_derived_hosts() {
        assert_eq!(public_host("tenant-0a1b2c3d", "wareit.ai"), "tenant-0a1b2c3d.wareit.ai");
        assert_eq!(
            internal_host("tenant-0a1b2c3d", "internal.wareit.ai"),
            "tenant-0a1b2c3d.internal.wareit.ai"
        );
        assert_eq!(tls_secret_name("tenant-0a1b2c3d"), "tenant-0a1b2c3d-tls");
        assert_eq!(
            endpoint_url("tenant-0a1b2c3d", "wareit.ai"),
            "https://tenant-0a1b2c3d.wareit.ai"
        );
    }
}
