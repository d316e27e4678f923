//! IP network matching.
//!
//! Literals are parsed once into [`IpNet`]s; event values are tested against
//! them with plain containment, with no allocation on the hot path.

use ipnet::IpNet;

use crate::error::Result;
use crate::state::{FieldValue, IntoFieldValues, ValueType};

/// Parse a CIDR (`10.0.0.0/8`) or a bare address (`10.1.2.3`, taken as a
/// host network).
pub fn parse_ip_net(s: &str) -> Result<IpNet> {
    match s.parse::<IpNet>() {
        Ok(net) => Ok(net),
        Err(e) => s
            .parse::<std::net::IpAddr>()
            .map(IpNet::from)
            .map_err(|_| e.into()),
    }
}

/// Whether two networks overlap by containment, in either direction.
///
/// Used for `==` between two single networks, which must be symmetric.
pub fn ip_nets_match(a: &IpNet, b: &IpNet) -> bool {
    a.contains(b) || b.contains(a)
}

/// A compiled set of networks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CidrValues {
    ip_nets: Vec<IpNet>,
    field_values: Vec<FieldValue>,
}

impl CidrValues {
    /// Build a set from CIDR or address literals.
    pub fn from_strs<'s>(values: impl IntoIterator<Item = &'s str>) -> Result<Self> {
        let mut set = CidrValues::default();
        for value in values {
            set.append_cidr(value)?;
        }
        Ok(set)
    }

    pub fn append_cidr(&mut self, value: &str) -> Result<()> {
        let net = parse_ip_net(value)?;
        self.append_ip_net(net);
        Ok(())
    }

    pub fn append_ip_net(&mut self, net: IpNet) {
        self.ip_nets.push(net);
        self.field_values.push(FieldValue::ip_net(net));
    }

    /// True if at least one network of the set contains `ip`.
    pub fn contains(&self, ip: &IpNet) -> bool {
        self.ip_nets.iter().any(|net| net.contains(ip))
    }

    /// True if every network of the set contains `ip`.
    pub fn contains_all(&self, ip: &IpNet) -> bool {
        self.ip_nets.iter().all(|net| net.contains(ip))
    }

    pub fn ip_nets(&self) -> &[IpNet] {
        &self.ip_nets
    }

    pub fn field_values(&self) -> &[FieldValue] {
        &self.field_values
    }

    pub fn len(&self) -> usize {
        self.ip_nets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ip_nets.is_empty()
    }
}

impl IntoFieldValues for CidrValues {
    fn field_values(&self, _value_type: ValueType) -> Vec<FieldValue> {
        self.field_values.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EvalError;

    fn net(s: &str) -> IpNet {
        parse_ip_net(s).unwrap()
    }

    #[test]
    fn test_parse_address_as_host_network() {
        assert_eq!(net("10.1.2.3").to_string(), "10.1.2.3/32");
        assert_eq!(net("::1").to_string(), "::1/128");
        assert_eq!(net("10.0.0.0/8").to_string(), "10.0.0.0/8");
    }

    #[test]
    fn test_parse_invalid() {
        let err = parse_ip_net("not-a-cidr").unwrap_err();
        assert!(matches!(err, EvalError::InvalidCidr(_)));
    }

    #[test]
    fn test_ip_nets_match_is_symmetric() {
        assert!(ip_nets_match(&net("10.0.0.0/8"), &net("10.1.2.3")));
        assert!(ip_nets_match(&net("10.1.2.3"), &net("10.0.0.0/8")));
        assert!(!ip_nets_match(&net("10.0.0.0/8"), &net("11.0.0.1")));
        // Mixed families never match.
        assert!(!ip_nets_match(&net("0.0.0.0/0"), &net("::1")));
    }

    #[test]
    fn test_contains_any_and_all() {
        let set = CidrValues::from_strs(["10.0.0.0/8", "192.168.0.0/16"]).unwrap();
        assert!(set.contains(&net("10.1.2.3")));
        assert!(set.contains(&net("192.168.1.1")));
        assert!(!set.contains(&net("172.16.0.1")));
        assert!(!set.contains_all(&net("10.1.2.3")));

        let nested = CidrValues::from_strs(["10.0.0.0/8", "10.1.0.0/16"]).unwrap();
        assert!(nested.contains_all(&net("10.1.2.3")));
        assert!(!nested.contains_all(&net("10.2.0.1")));
    }

    #[test]
    fn test_field_values_carry_matchers() {
        let set = CidrValues::from_strs(["10.0.0.0/8"]).unwrap();
        let fvs = set.field_values();
        assert_eq!(fvs.len(), 1);
        assert_eq!(fvs[0].value_type, ValueType::IpNet);
        assert_eq!(fvs[0].ip_matcher, Some(net("10.0.0.0/8")));
    }
}
