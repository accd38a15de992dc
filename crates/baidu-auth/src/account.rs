//! Provider account model and environment-list parsing
//!
//! Accounts arrive as a single environment variable in the format
//! `AK1,SK1|AK2,SK2`. The list is ordered: the ordinal position is the
//! account id and drives the `basic`-mode segregation policy (index 1).

use common::Secret;
use tracing::warn;

/// One provider credential pair, immutable for the process lifetime.
#[derive(Debug, Clone)]
pub struct Account {
    /// Ordinal position in the configured list
    pub index: usize,
    pub access_key: String,
    pub secret_key: Secret<String>,
}

impl Account {
    /// Label used in the `strategy_used` tag and in logs, e.g. `acc1`.
    pub fn label(&self) -> String {
        format!("acc{}", self.index)
    }
}

/// Parse the `ak,sk|ak,sk` account list.
///
/// Malformed entries (no comma, empty key on either side) are skipped with
/// a warning rather than failing the whole list; indices are assigned over
/// the accepted entries in order. An empty input yields an empty list —
/// the dispatch strategy turns that into a configuration failure.
pub fn parse_accounts(raw: &str) -> Vec<Account> {
    let mut accounts = Vec::new();
    for entry in raw.split('|') {
        if entry.trim().is_empty() {
            continue;
        }
        let Some((ak, sk)) = entry.split_once(',') else {
            warn!(entry_len = entry.len(), "skipping account entry without comma");
            continue;
        };
        let ak = ak.trim();
        let sk = sk.trim();
        if ak.is_empty() || sk.is_empty() {
            warn!("skipping account entry with empty key");
            continue;
        }
        accounts.push(Account {
            index: accounts.len(),
            access_key: ak.to_owned(),
            secret_key: Secret::new(sk.to_owned()),
        });
    }
    accounts
}
