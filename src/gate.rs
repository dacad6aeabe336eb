use log::debug;

use crate::address::AddressSet;

/// Remembers the last address set a pass was attempted for and
/// suppresses passes for address sets that were already applied.
///
/// The gate starts out unset, so the first candidate always passes,
/// even if it is empty.
#[derive(Debug, Clone, Default)]
pub struct ChangeGate {
    last: Option<AddressSet>,
}

impl ChangeGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if `candidate` differs from the last applied address set.
    /// In that case `candidate` becomes the new last applied set.
    pub fn should_sync(&mut self, candidate: &AddressSet) -> bool {
        if self.last.as_ref() == Some(candidate) {
            debug!("No change detected in {}", candidate);
            return false;
        }
        self.last = Some(candidate.clone());
        true
    }

    /// Forget the last applied set, causing the next candidate to pass regardless of its value
    pub fn invalidate(&mut self) {
        self.last = None;
    }

    pub fn last(&self) -> Option<&AddressSet> {
        self.last.as_ref()
    }
}
