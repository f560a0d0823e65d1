//! URN helpers
//!
//! Cloud Avenue objects are addressed by URNs of the form
//! `urn:vcloud:<kind>:<uuid>` (or `urn:cloudavenue:<kind>:<uuid>` for
//! tenant-local kinds). This module recognises, classifies and normalises them.

use lazy_static::lazy_static;
use regex::Regex;
use std::fmt;

lazy_static! {
    /// Canonical 8-4-4-4-12 lowercase hex pattern
    static ref UUID_REGEX: Regex =
        Regex::new(r"[a-f0-9]{8}-[a-f0-9]{4}-[a-f0-9]{4}-[a-f0-9]{4}-[a-f0-9]{12}")
            .expect("UUID_REGEX should be a valid regex pattern");
    static ref UUID_EXACT_REGEX: Regex =
        Regex::new(r"^[a-f0-9]{8}-[a-f0-9]{4}-[a-f0-9]{4}-[a-f0-9]{4}-[a-f0-9]{12}$")
            .expect("UUID_EXACT_REGEX should be a valid regex pattern");
}

/// Registered URN kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UrnKind {
    Organization,
    Vm,
    User,
    Group,
    Gateway,
    Vdc,
    VdcGroup,
    Network,
    LoadBalancerPool,
    VdcStorageProfile,
    Vapp,
    VappTemplate,
    Disk,
    FirewallGroup,
    Catalog,
    Token,
    ApplicationPortProfile,
    VdcComputePolicy,
    CertificateLibraryItem,
    LoadBalancerVirtualService,
    ServiceEngineGroup,
    Vcda,
}

impl UrnKind {
    pub const ALL: [UrnKind; 22] = [
        UrnKind::Organization,
        UrnKind::Vm,
        UrnKind::User,
        UrnKind::Group,
        UrnKind::Gateway,
        UrnKind::Vdc,
        UrnKind::VdcGroup,
        UrnKind::Network,
        UrnKind::LoadBalancerPool,
        UrnKind::VdcStorageProfile,
        UrnKind::Vapp,
        UrnKind::VappTemplate,
        UrnKind::Disk,
        UrnKind::FirewallGroup,
        UrnKind::Catalog,
        UrnKind::Token,
        UrnKind::ApplicationPortProfile,
        UrnKind::VdcComputePolicy,
        UrnKind::CertificateLibraryItem,
        UrnKind::LoadBalancerVirtualService,
        UrnKind::ServiceEngineGroup,
        UrnKind::Vcda,
    ];

    /// Registered prefix, including the trailing colon
    pub fn prefix(&self) -> &'static str {
        match self {
            UrnKind::Organization => "urn:vcloud:org:",
            UrnKind::Vm => "urn:vcloud:vm:",
            UrnKind::User => "urn:vcloud:user:",
            UrnKind::Group => "urn:vcloud:group:",
            UrnKind::Gateway => "urn:vcloud:gateway:",
            UrnKind::Vdc => "urn:vcloud:vdc:",
            UrnKind::VdcGroup => "urn:vcloud:vdcGroup:",
            UrnKind::Network => "urn:vcloud:network:",
            UrnKind::LoadBalancerPool => "urn:vcloud:loadBalancerPool:",
            UrnKind::VdcStorageProfile => "urn:vcloud:vdcstorageProfile:",
            UrnKind::Vapp => "urn:vcloud:vapp:",
            UrnKind::VappTemplate => "urn:vcloud:vapptemplate:",
            UrnKind::Disk => "urn:vcloud:disk:",
            UrnKind::FirewallGroup => "urn:vcloud:firewallGroup:",
            UrnKind::Catalog => "urn:vcloud:catalog:",
            UrnKind::Token => "urn:vcloud:token:",
            UrnKind::ApplicationPortProfile => "urn:vcloud:applicationPortProfile:",
            UrnKind::VdcComputePolicy => "urn:vcloud:vdcComputePolicy:",
            UrnKind::CertificateLibraryItem => "urn:vcloud:certificateLibraryItem:",
            UrnKind::LoadBalancerVirtualService => "urn:vcloud:loadBalancerVirtualService:",
            UrnKind::ServiceEngineGroup => "urn:vcloud:serviceEngineGroup:",
            UrnKind::Vcda => "urn:cloudavenue:vcda:",
        }
    }

    /// Short name used in logs and error messages
    pub fn name(&self) -> &'static str {
        let prefix = self.prefix().trim_end_matches(':');
        prefix.rsplit(':').next().unwrap_or(prefix)
    }

    /// Build a URN of this kind from a bare UUID (see [`normalize`])
    pub fn normalize(&self, value: &str) -> String {
        normalize(self.prefix(), value)
    }
}

impl fmt::Display for UrnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// True iff `value` starts with the registered prefix for `kind` and the
/// remainder is a UUID
pub fn is_kind(value: &str, kind: UrnKind) -> bool {
    value.strip_prefix(kind.prefix()).is_some_and(is_uuid)
}

/// True iff `value` is a URN of any registered kind
pub fn is_valid(value: &str) -> bool {
    UrnKind::ALL.iter().any(|kind| is_kind(value, *kind))
}

/// Kind of a valid URN
pub fn kind_of(value: &str) -> Option<UrnKind> {
    UrnKind::ALL.iter().copied().find(|kind| is_kind(value, *kind))
}

/// True iff `value` is exactly a canonical lowercase UUID
pub fn is_uuid(value: &str) -> bool {
    UUID_EXACT_REGEX.is_match(value)
}

/// Last UUID occurring in `value` (typically a URL), or an empty string
pub fn extract_uuid(value: &str) -> String {
    UUID_REGEX
        .find_iter(value)
        .last()
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

/// Returns `value` untouched if it already carries a registered prefix,
/// otherwise `prefix + value`. An empty prefix yields an empty string.
pub fn normalize(prefix: &str, value: &str) -> String {
    if prefix.is_empty() {
        return String::new();
    }

    if UrnKind::ALL.iter().any(|kind| value.contains(kind.prefix())) {
        return value.to_string();
    }

    format!("{}{}", prefix, value)
}

#[cfg(test)]
mod tests {
    use super::*;

    const UUID: &str = "11111111-1111-4111-8111-111111111111";
    const HEX_UUID: &str = "aaaaaaaa-bbbb-4ccc-8ddd-eeeeeeeeeeee";

    #[test]
    fn test_is_kind() {
        let pool = format!("urn:vcloud:loadBalancerPool:{}", UUID);
        assert!(is_kind(&pool, UrnKind::LoadBalancerPool));
        assert!(!is_kind(&pool, UrnKind::LoadBalancerVirtualService));
        assert!(!is_kind("urn:vcloud:loadBalancerPool:not-a-uuid", UrnKind::LoadBalancerPool));
        assert!(is_kind(&format!("urn:vcloud:loadBalancerPool:{}", HEX_UUID), UrnKind::LoadBalancerPool));
        let upper = format!("urn:vcloud:loadBalancerPool:{}", HEX_UUID.to_uppercase());
        assert!(!is_kind(&upper, UrnKind::LoadBalancerPool));
        assert!(is_kind(&format!("urn:cloudavenue:vcda:{}", UUID), UrnKind::Vcda));
    }

    #[test]
    fn test_is_valid() {
        assert!(is_valid(&format!("urn:vcloud:gateway:{}", UUID)));
        assert!(!is_valid(&format!("urn:vcloud:unknown:{}", UUID)));
        assert!(!is_valid(UUID));
        assert!(!is_valid(""));
    }

    #[test]
    fn test_kind_of() {
        assert_eq!(kind_of(&format!("urn:vcloud:vdcGroup:{}", UUID)), Some(UrnKind::VdcGroup));
        assert_eq!(kind_of("urn:vcloud:vdcGroup:"), None);
    }

    #[test]
    fn test_extract_uuid() {
        let url = format!(
            "https://host/cloudapi/1.0.0/edgeGateways/urn:vcloud:gateway:{}/loadBalancer/pools/{}",
            "22222222-2222-4222-8222-222222222222", UUID
        );
        assert_eq!(extract_uuid(&url), UUID);
        assert_eq!(extract_uuid("no identifiers here"), "");
    }

    #[test]
    fn test_normalize() {
        let prefix = UrnKind::Gateway.prefix();
        assert_eq!(normalize("", UUID), "");
        assert_eq!(normalize(prefix, UUID), format!("urn:vcloud:gateway:{}", UUID));

        let already = format!("urn:vcloud:vdc:{}", UUID);
        assert_eq!(normalize(prefix, &already), already);
        assert_eq!(UrnKind::Vdc.normalize(UUID), already);
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(UrnKind::LoadBalancerPool.name(), "loadBalancerPool");
        assert_eq!(UrnKind::Organization.name(), "org");
        assert_eq!(UrnKind::Vcda.to_string(), "vcda");
    }
}
