//! Persisted session state commands.

use anyhow::Result;
use folio_core::nav::NAV_STATE_KEY;
use folio_core::storage::StateStore;

pub fn show() -> Result<()> {
    let store = StateStore::open_default();
    match store.get(NAV_STATE_KEY) {
        Some(value) => println!("{}", serde_json::to_string_pretty(&value)?),
        None => println!("No session state saved."),
    }
    Ok(())
}

pub fn reset() -> Result<()> {
    let store = StateStore::open_default();
    store.remove(NAV_STATE_KEY);
    println!("Session state cleared.");
    Ok(())
}
