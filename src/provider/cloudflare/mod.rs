mod convert;
mod wrapper;

use log::{debug, info, trace};
use mockall_double::double;

#[double]
use self::wrapper::CloudflareWrapper;

use super::{DnsRecord, Provider, ProviderError, RecordId, Zone};
use crate::config::Credentials;

// Returned instead of a real ID for records that were not created due to dry-run mode
const DRY_RUN_RECORD_ID: &str = "dry-run";

/// A [`Provider`] connecting to the Cloudflare API for listing zones and managing A records.
///
/// To create a provider, use the [`CloudflareProvider::from_config()`] function.
#[non_exhaustive]
pub struct CloudflareProvider {
    api: CloudflareWrapper,
    dry_run: bool,
}

/// Configuration object for a [`CloudflareProvider`]. Must be supplied when creating a provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CloudflareProviderConfig<'a> {
    /// Either an API token or an email + global API key pair
    pub credentials: &'a Credentials,
}

impl CloudflareProvider {
    pub fn from_config(
        config: &CloudflareProviderConfig,
    ) -> Result<Box<dyn Provider + Send>, ProviderError> {
        let api = CloudflareWrapper::try_new(config.credentials)?;
        Ok(Box::new(CloudflareProvider::with_api(api)))
    }

    fn with_api(api: CloudflareWrapper) -> Self {
        CloudflareProvider {
            api,
            dry_run: false,
        }
    }
}

impl Provider for CloudflareProvider {
    fn enable_dry_run(&mut self) -> Result<(), ProviderError> {
        self.dry_run = true;
        Ok(())
    }

    fn zones(&self) -> Result<Vec<Zone>, ProviderError> {
        debug!("Reading zones from Cloudflare API");
        let zones = self.api.list_zones()?;
        trace!("Collected zones {:?}", zones);
        Ok(zones)
    }

    fn records(&self, zone_id: &str, name: &str) -> Result<Vec<DnsRecord>, ProviderError> {
        debug!("Reading A records for {} in zone {}", name, zone_id);
        let records = self.api.list_a_records(zone_id, name)?;
        trace!("Collected records {:?}", records);
        Ok(records)
    }

    fn create_record(&self, zone_id: &str, record: &DnsRecord) -> Result<RecordId, ProviderError> {
        if self.dry_run {
            info!("[dry-run] Would create record {} in zone {}", record, zone_id);
            return Ok(DRY_RUN_RECORD_ID.to_string());
        }
        let id = self.api.create_a_record(zone_id, record)?;
        debug!("Created record {} with id {} in zone {}", record, id, zone_id);
        Ok(id)
    }

    fn update_record(
        &self,
        zone_id: &str,
        record_id: &str,
        record: &DnsRecord,
    ) -> Result<(), ProviderError> {
        if self.dry_run {
            info!(
                "[dry-run] Would update record {} with id {} in zone {}",
                record, record_id, zone_id
            );
            return Ok(());
        }
        self.api.update_a_record(zone_id, record_id, record)?;
        debug!("Updated record {} with id {} in zone {}", record, record_id, zone_id);
        Ok(())
    }

    fn delete_record(&self, zone_id: &str, record_id: &str) -> Result<(), ProviderError> {
        if self.dry_run {
            info!("[dry-run] Would delete record with id {} from zone {}", record_id, zone_id);
            return Ok(());
        }
        self.api.delete_record(zone_id, record_id)?;
        debug!("Deleted record with id {} from zone {}", record_id, zone_id);
        Ok(())
    }
}
