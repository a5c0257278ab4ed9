//! Cross-engine equivalence helpers.
//!
//! Every engine must return the same rows for the same filter chain. The
//! helpers here run a chain against an in-memory reference model and
//! against each engine, and report the first disagreement.

use crate::fixtures::{all_engines, TestStore};
use savable_codec::ValueCodec;
use savable_storage::{FilterChain, Meta, Row, StoredRow};
use std::collections::BTreeSet;

/// `(object_id, key, payload)` of a stored row.
pub type RowTriple = (String, String, String);

fn triple(row: StoredRow) -> RowTriple {
    (row.object_id, row.key, row.payload)
}

/// Evaluates `chain` over `rows` without any engine.
pub fn reference_select(rows: &[Row], chain: &FilterChain) -> BTreeSet<RowTriple> {
    let codec = ValueCodec::standard();
    rows.iter()
        .map(|row| StoredRow::encode(&codec, row).expect("Failed to encode row"))
        .filter(|stored| chain.matches(stored))
        .map(triple)
        .collect()
}

/// Runs `chain` against one engine.
pub fn engine_select(backend: &dyn Meta, chain: &FilterChain) -> BTreeSet<RowTriple> {
    backend
        .fetch(chain)
        .expect("Failed to fetch rows")
        .into_iter()
        .map(triple)
        .collect()
}

/// Every row of one engine.
pub fn snapshot(backend: &dyn Meta) -> BTreeSet<RowTriple> {
    engine_select(backend, &FilterChain::new())
}

/// Loads `rows` into a fresh store of every engine.
pub fn seeded_engines(rows: &[Row]) -> Vec<TestStore> {
    let stores = all_engines();
    for store in &stores {
        store.insert(rows).expect("Failed to seed rows");
    }
    stores
}

/// Checks that every store agrees with the reference model on `chain`.
///
/// # Errors
///
/// Returns a description of the first store that disagrees.
pub fn check_engines_agree(
    stores: &[TestStore],
    rows: &[Row],
    chain: &FilterChain,
) -> Result<(), String> {
    let expected = reference_select(rows, chain);
    for store in stores {
        let actual = engine_select(store.backend.as_ref(), chain);
        if actual != expected {
            return Err(format!(
                "{} disagrees on {chain:?}\n  expected: {expected:?}\n  actual:   {actual:?}",
                store.engine
            ));
        }
    }
    Ok(())
}
