use cloudflare::{endpoints, framework::response::ApiFailure};

use crate::provider::{DnsRecord, ProviderError, Zone};

impl From<ApiFailure> for ProviderError {
    fn from(f: ApiFailure) -> Self {
        match f {
            ApiFailure::Error(s, errs) => format!("[{}] {:?}", s, errs.errors).into(),
            ApiFailure::Invalid(e) => e.to_string().into(),
        }
    }
}

impl From<&endpoints::zone::Zone> for Zone {
    fn from(z: &endpoints::zone::Zone) -> Self {
        Zone {
            id: z.id.to_owned(),
            name: z.name.to_owned(),
        }
    }
}

impl TryFrom<&endpoints::dns::DnsRecord> for DnsRecord {
    type Error = String;

    fn try_from(r: &endpoints::dns::DnsRecord) -> Result<Self, Self::Error> {
        let content = match &r.content {
            endpoints::dns::DnsContent::A { content } => *content,
            _ => return Err(format!("Not an A record: {:?}", r.content)),
        };
        Ok(DnsRecord {
            id: Some(r.id.to_owned()),
            name: r.name.to_owned(),
            content,
            ttl: r.ttl,
            proxied: r.proxied,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use cloudflare::endpoints;
    use serde_json::json;
    use totems::assert_err;

    use crate::provider::DnsRecord;

    fn api_record(kind: &str, content: &str) -> endpoints::dns::DnsRecord {
        serde_json::from_value(json!({
            "id": "372e67954025e0ba6aaa6d586b9e0b59",
            "type": kind,
            "name": "k8s.example.com",
            "content": content,
            "proxiable": true,
            "proxied": true,
            "ttl": 300,
            "locked": false,
            "zone_id": "023e105f4ecef8ad9ca31a8372d0c353",
            "zone_name": "example.com",
            "created_on": "2023-01-01T05:20:00.12345Z",
            "modified_on": "2023-01-01T05:20:00.12345Z",
            "meta": {"auto_added": false, "source": "primary"}
        }))
        .unwrap()
    }

    #[test]
    fn should_convert_a_record() {
        assert_eq!(
            DnsRecord::try_from(&api_record("A", "198.51.100.4")),
            Ok(DnsRecord {
                id: Some("372e67954025e0ba6aaa6d586b9e0b59".to_string()),
                name: "k8s.example.com".to_string(),
                content: Ipv4Addr::new(198, 51, 100, 4),
                ttl: 300,
                proxied: true,
            })
        );
    }

    #[test]
    fn should_reject_other_record_types() {
        assert_err!(DnsRecord::try_from(&api_record("TXT", "v=spf1 -all")));
        assert_err!(DnsRecord::try_from(&api_record("AAAA", "2001:db8::1")));
    }
}
