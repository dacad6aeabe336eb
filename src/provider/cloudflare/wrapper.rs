#![cfg_attr(test, allow(dead_code))]

use cloudflare::{
    endpoints::{self},
    framework::{
        auth,
        response::{ApiFailure, ApiResponse},
        Environment, HttpApiClient, HttpApiClientConfig,
    },
};
use log::trace;

use crate::{
    config::Credentials,
    provider::{DnsRecord, ProviderError, RecordId, Zone},
};

const CLOUDFLARE_ZONE_PAGE_SIZE: u8 = 50;
const CLOUDFLARE_RECORD_PAGE_SIZE: u16 = 5000;

/// Internal wrapper around the Cloudflare API.
/// Provides some convenience features such as paged requests and conversion into our own types
pub struct CloudflareWrapper {
    client: HttpApiClient,
}

impl CloudflareWrapper {
    // Perform a paged request by repeatedly calling the provided request fun with the current page_counter.
    // page_size must match the page_size in the request. The caller is responsible for ensuring that these match
    fn paged_request<R>(
        &self,
        page_size: usize,
        request: &mut dyn FnMut(u32) -> ApiResponse<Vec<R>>,
    ) -> Result<Vec<R>, ApiFailure> {
        let mut page_counter = 1;

        // Initial failures are never good, return quickly
        let mut results = request(page_counter)?.result;
        let mut current_size = results.len();

        while current_size >= page_size {
            page_counter += 1;
            match request(page_counter) {
                Ok(mut r) => {
                    current_size = r.result.len();
                    results.append(&mut r.result);
                }
                Err(e) => match e {
                    ApiFailure::Error(code, _) => match code {
                        http::StatusCode::NOT_FOUND => return Ok(results),
                        _ => return Err(e),
                    },
                    ApiFailure::Invalid(_) => return Err(e),
                },
            };
        }
        trace!("Paged request returned {} results", results.len());
        Ok(results)
    }

    pub fn list_zones(&self) -> Result<Vec<Zone>, ProviderError> {
        let zones = self.paged_request(
            CLOUDFLARE_ZONE_PAGE_SIZE.into(),
            &mut |page_counter: u32| {
                self.client.request(&endpoints::zone::ListZones {
                    params: endpoints::zone::ListZonesParams {
                        page: Some(page_counter),
                        per_page: Some(CLOUDFLARE_ZONE_PAGE_SIZE.into()),
                        ..Default::default()
                    },
                })
            },
        )?;
        Ok(zones.iter().map(Zone::from).collect())
    }

    pub fn list_a_records(&self, zone_id: &str, name: &str) -> Result<Vec<DnsRecord>, ProviderError> {
        let records = self.paged_request(
            CLOUDFLARE_RECORD_PAGE_SIZE.into(),
            &mut |page_counter: u32| {
                self.client.request(&endpoints::dns::ListDnsRecords {
                    zone_identifier: zone_id,
                    params: endpoints::dns::ListDnsRecordsParams {
                        page: Some(page_counter),
                        name: Some(name.to_owned()),
                        per_page: Some(CLOUDFLARE_RECORD_PAGE_SIZE.into()),
                        ..Default::default()
                    },
                })
            },
        )?;

        // Anything that isn't an A record fails the conversion and is dropped here
        Ok(records
            .iter()
            .filter_map(|r| DnsRecord::try_from(r).ok())
            .collect())
    }

    pub fn create_a_record(&self, zone_id: &str, record: &DnsRecord) -> Result<RecordId, ProviderError> {
        let created = self.client.request(&endpoints::dns::CreateDnsRecord {
            zone_identifier: zone_id,
            params: endpoints::dns::CreateDnsRecordParams {
                priority: None,
                ttl: Some(record.ttl),
                proxied: Some(record.proxied),
                name: &record.name,
                content: endpoints::dns::DnsContent::A {
                    content: record.content,
                },
            },
        })?;
        Ok(created.result.id)
    }

    pub fn update_a_record(
        &self,
        zone_id: &str,
        record_id: &str,
        record: &DnsRecord,
    ) -> Result<(), ProviderError> {
        self.client.request(&endpoints::dns::UpdateDnsRecord {
            zone_identifier: zone_id,
            identifier: record_id,
            params: endpoints::dns::UpdateDnsRecordParams {
                ttl: Some(record.ttl),
                proxied: Some(record.proxied),
                name: &record.name,
                content: endpoints::dns::DnsContent::A {
                    content: record.content,
                },
            },
        })?;
        Ok(())
    }

    pub fn delete_record(&self, zone_id: &str, record_id: &str) -> Result<(), ProviderError> {
        self.client.request(&endpoints::dns::DeleteDnsRecord {
            zone_identifier: zone_id,
            identifier: record_id,
        })?;
        Ok(())
    }

    pub fn try_new(credentials: &Credentials) -> Result<CloudflareWrapper, ProviderError> {
        let credentials = match credentials {
            Credentials::Token(token) => auth::Credentials::UserAuthToken {
                token: token.to_owned(),
            },
            Credentials::Key { email, key } => auth::Credentials::UserAuthKey {
                email: email.to_owned(),
                key: key.to_owned(),
            },
        };

        match HttpApiClient::new(
            credentials,
            HttpApiClientConfig::default(),
            Environment::Production,
        ) {
            Ok(client) => Ok(CloudflareWrapper { client }),
            Err(e) => Err(format!("could not create Cloudflare API client: {}", e).into()),
        }
    }
}

#[cfg(test)]
use mockall::mock;

#[cfg(test)]
mock! {
    pub CloudflareWrapper {
        pub fn list_zones(&self) -> Result<Vec<Zone>, ProviderError>;
        pub fn list_a_records(&self, zone_id: &str, name: &str) -> Result<Vec<DnsRecord>, ProviderError>;
        pub fn create_a_record(&self, zone_id: &str, record: &DnsRecord) -> Result<RecordId, ProviderError>;
        pub fn update_a_record(
            &self,
            zone_id: &str,
            record_id: &str,
            record: &DnsRecord,
        ) -> Result<(), ProviderError>;
        pub fn delete_record(&self, zone_id: &str, record_id: &str) -> Result<(), ProviderError>;
        pub fn try_new(credentials: &Credentials) -> Result<MockCloudflareWrapper, ProviderError>;
    }
}
