//! Every engine answers every filter chain the same way.

use proptest::prelude::*;
use savable_storage::{
    Column, FilterChain, FilterOperator, FilterQuery, FilterType, Meta, QueryUpdate, Row,
};
use savable_testkit::prelude::*;
use std::collections::BTreeSet;

fn check(result: Result<(), String>) -> Result<(), TestCaseError> {
    result.map_err(|message| TestCaseError::fail(message))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn engines_match_reference_model(
        rows in rows_strategy(10),
        chains in prop::collection::vec(filter_chain_strategy(4), 1..4),
    ) {
        let stores = seeded_engines(&rows);
        for chain in &chains {
            check(check_engines_agree(&stores, &rows, chain))?;
        }
    }

    #[test]
    fn chain_is_union_of_its_groups(
        rows in rows_strategy(10),
        chain in filter_chain_strategy(5),
    ) {
        let stores = seeded_engines(&rows);
        for store in &stores {
            let whole = engine_select(store.backend.as_ref(), &chain);

            let mut union = BTreeSet::new();
            for group in chain.groups() {
                let conjunction: FilterChain = group
                    .into_iter()
                    .cloned()
                    .enumerate()
                    .map(|(i, filter)| {
                        let operator = if i == 0 {
                            FilterOperator::Init
                        } else {
                            FilterOperator::And
                        };
                        filter.with_operator(operator)
                    })
                    .collect();
                union.extend(engine_select(store.backend.as_ref(), &conjunction));
            }

            if chain.is_empty() {
                prop_assert_eq!(whole.len(), rows.len());
            } else {
                prop_assert_eq!(&whole, &union, "{}", store.engine);
            }
        }
    }

    #[test]
    fn updates_agree(
        rows in rows_strategy(10),
        chain in filter_chain_strategy(3),
        payload in payload_strategy(),
    ) {
        let stores = seeded_engines(&rows);
        let expected_count = reference_select(&rows, &chain).len();

        let update = QueryUpdate::new()
            .set(Column::Value, payload.clone())
            .with_filters(chain.clone());

        let mut snapshots = Vec::new();
        for store in &stores {
            let matched = store.update(&update).unwrap();
            prop_assert_eq!(matched, expected_count, "{}", store.engine);
            snapshots.push(snapshot(store.backend.as_ref()));
        }
        for pair in snapshots.windows(2) {
            prop_assert_eq!(&pair[0], &pair[1]);
        }
        prop_assert_eq!(snapshots[0].len(), rows.len());
    }

    #[test]
    fn deletes_agree(
        rows in rows_strategy(10),
        chain in filter_chain_strategy(3),
    ) {
        let stores = seeded_engines(&rows);
        let matched = reference_select(&rows, &chain);
        let everything = reference_select(&rows, &FilterChain::new());
        let remaining: BTreeSet<_> = everything.difference(&matched).cloned().collect();

        for store in &stores {
            let removed = store.delete(&chain).unwrap();
            prop_assert_eq!(removed, matched.len(), "{}", store.engine);
            prop_assert_eq!(&snapshot(store.backend.as_ref()), &remaining, "{}", store.engine);
        }
    }
}

#[test]
fn sql_metacharacters_are_literal() {
    let rows = vec![
        Row::new("a%", "k", "x"),
        Row::new("ab", "k", "y"),
        Row::new("a_", "k", "z"),
        Row::new("a.b", "k", "w"),
    ];
    // the flat file cannot hold "a.b"
    let stores: Vec<_> = all_engines()
        .into_iter()
        .filter(|store| store.engine != Engine::FlatFile)
        .collect();
    for store in &stores {
        store.insert(&rows).unwrap();
    }

    let chains = [
        FilterChain::new().and(Column::RowId, FilterType::StartsWith, "a%"),
        FilterChain::new().and(Column::RowId, FilterType::ExactMatch, "a_"),
        FilterChain::new().and(Column::RowId, FilterType::EndsWith, ".b"),
    ];
    for chain in &chains {
        check_engines_agree(&stores, &rows, chain).unwrap();
        assert_eq!(reference_select(&rows, chain).len(), 1);
    }
}

#[test]
fn leading_or_is_treated_as_init() {
    let rows = vec![Row::new("a", "k", "1"), Row::new("b", "k", "2")];
    let stores = seeded_engines(&rows);
    let chain: FilterChain = vec![FilterQuery::exact(Column::RowId, "a")
        .with_operator(FilterOperator::Or)]
    .into();
    check_engines_agree(&stores, &rows, &chain).unwrap();
    assert_eq!(reference_select(&rows, &chain).len(), 1);
}
