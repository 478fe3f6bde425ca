//! EPC allow/deny filtering.

use grokker_core::{Epc, Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Where filtering is applied for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterLocation {
    /// The allow-list was handed to the reader, which filters and plays
    /// feedback sounds without host round-trips.
    Reader,

    /// Reads are filtered on the host.
    Host,
}

impl fmt::Display for FilterLocation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FilterLocation::Reader => write!(f, "reader"),
            FilterLocation::Host => write!(f, "host"),
        }
    }
}

/// Allow-set or deny-set of EPCs.
///
/// Both sets empty accepts every tag. Setting both is rejected by
/// [`validate`](Self::validate) when a session starts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EpcFilter {
    /// Only these EPCs are reported.
    allow: HashSet<Epc>,

    /// These EPCs are never reported.
    deny: HashSet<Epc>,
}

impl EpcFilter {
    /// Filter accepting every tag.
    pub fn all() -> Self {
        Self::default()
    }

    /// Filter accepting only the given EPCs.
    pub fn allow(epcs: impl IntoIterator<Item = Epc>) -> Self {
        Self {
            allow: epcs.into_iter().collect(),
            deny: HashSet::new(),
        }
    }

    /// Filter rejecting the given EPCs.
    pub fn deny(epcs: impl IntoIterator<Item = Epc>) -> Self {
        Self {
            allow: HashSet::new(),
            deny: epcs.into_iter().collect(),
        }
    }

    /// Filter accepting a single EPC.
    pub fn single(epc: Epc) -> Self {
        Self::allow([epc])
    }

    /// Build a filter from both sets without checking them.
    pub fn new(
        allow: impl IntoIterator<Item = Epc>,
        deny: impl IntoIterator<Item = Epc>,
    ) -> Self {
        Self {
            allow: allow.into_iter().collect(),
            deny: deny.into_iter().collect(),
        }
    }

    /// The allow-set.
    pub fn allowed(&self) -> &HashSet<Epc> {
        &self.allow
    }

    /// The deny-set.
    pub fn denied(&self) -> &HashSet<Epc> {
        &self.deny
    }

    /// Returns `true` if the filter accepts every tag.
    pub fn is_pass_all(&self) -> bool {
        self.allow.is_empty() && self.deny.is_empty()
    }

    /// Check that at most one of the sets is non-empty.
    ///
    /// # Errors
    /// Returns `Error::Configuration` if both are set.
    pub fn validate(&self) -> Result<()> {
        if !self.allow.is_empty() && !self.deny.is_empty() {
            return Err(Error::configuration(format!(
                "EPC filter cannot have both an allow-list ({} EPCs) and a deny-list ({} EPCs)",
                self.allow.len(),
                self.deny.len()
            )));
        }
        Ok(())
    }

    /// Returns `true` if reads of `epc` should be reported.
    #[inline]
    pub fn accepts(&self, epc: &Epc) -> bool {
        if !self.allow.is_empty() {
            return self.allow.contains(epc);
        }
        !self.deny.contains(epc)
    }

    /// Choose where to filter.
    ///
    /// Small allow-lists go to the reader. Deny-lists and large allow-lists
    /// stay on the host.
    pub fn location(&self, max_epcs_sent_to_reader: usize) -> FilterLocation {
        if !self.allow.is_empty() && self.allow.len() <= max_epcs_sent_to_reader {
            FilterLocation::Reader
        } else {
            FilterLocation::Host
        }
    }
}
