//! 📒 The group registry — a process-wide phone book of named throttlers.
//!
//! Starts empty. Gets written to when a throttler is built with a group name.
//! Gets read from when someone asks for a group by name. Never gets cleared.
//! Entries live until the process dies, like a tattoo of your ex's name. 🦆
//!
//! 🔒 One `Mutex` guards the whole map, so "is the name free?" and "take the name"
//! happen as one step. Two threads racing for `"io"` get exactly one winner.
//!
//! ⚠️ Not `pub`. The only doors in are `Throttler::new` and `Throttler::lookup`.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::{Arc, LazyLock, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use super::Throttler;
use crate::error::ThrottleError;

static REGISTRY: LazyLock<Mutex<HashMap<String, Arc<Throttler>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

// -- 🧯 a panic while holding the lock can't leave the map half-written (insert is one call),
// -- so a poisoned guard is still a perfectly good guard.
fn lock() -> MutexGuard<'static, HashMap<String, Arc<Throttler>>> {
    REGISTRY.lock().unwrap_or_else(PoisonError::into_inner)
}

/// 📝 Claim `group` for `throttler`. Fails with `DuplicateGroup` if the name is taken,
/// and in that case the existing entry is left exactly as it was.
pub(super) fn register(group: &str, throttler: Arc<Throttler>) -> Result<(), ThrottleError> {
    match lock().entry(group.to_string()) {
        Entry::Occupied(_) => {
            warn!("🚫 throttler group '{}' is already taken", group);
            Err(ThrottleError::DuplicateGroup {
                group: group.to_string(),
            })
        }
        Entry::Vacant(slot) => {
            info!(
                "🚦 registered throttler group '{}' with capacity {}",
                group,
                throttler.capacity()
            );
            slot.insert(throttler);
            Ok(())
        }
    }
}

pub(super) fn lookup(group: &str) -> Result<Arc<Throttler>, ThrottleError> {
    let the_found = lock().get(group).cloned();
    match the_found {
        Some(throttler) => {
            debug!("🔎 found throttler group '{}'", group);
            Ok(throttler)
        }
        None => Err(ThrottleError::NotFound {
            group: group.to_string(),
        }),
    }
}

/// 📋 Sorted snapshot of every registered group name. Stale the moment it returns.
pub fn registered_groups() -> Vec<String> {
    let mut the_names: Vec<String> = lock().keys().cloned().collect();
    the_names.sort();
    the_names
}
