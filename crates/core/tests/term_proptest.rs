//! Property-based tests for tidal-core using proptest.

use core::cmp::Ordering;
use proptest::prelude::*;
use tidal_core::{compare_terms, vocab, Binding, Term};

fn term() -> impl Strategy<Value = Term> {
    prop_oneof![
        (0u8..4).prop_map(|i| Term::iri(format!("http://ex.org/{}", i))),
        (0u8..4).prop_map(|i| Term::blank(format!("b{}", i))),
        (-5i64..5).prop_map(Term::integer),
        (-5i64..5).prop_map(|v| Term::typed(format!("{}.5", v), vocab::XSD_DECIMAL)),
        "[a-c0-9]{0,2}".prop_map(Term::string),
        ("[a-c]{1,2}", "en|fr").prop_map(|(v, l)| Term::lang(v, l)),
    ]
}

fn binding() -> impl Strategy<Value = Binding> {
    prop::collection::btree_map("[xyz]", term(), 0..3)
        .prop_map(|entries| entries.into_iter().collect())
}

proptest! {
    /// Term order is total and agrees with equality.
    #[test]
    fn term_order_is_total(a in term(), b in term(), c in term()) {
        let ab = compare_terms(&a, &b);
        prop_assert_eq!(ab, compare_terms(&b, &a).reverse());
        prop_assert_eq!(ab == Ordering::Equal, a == b);
        if ab != Ordering::Greater && compare_terms(&b, &c) != Ordering::Greater {
            prop_assert_ne!(compare_terms(&a, &c), Ordering::Greater);
        }
    }

    /// Merging is symmetric and defined exactly on compatible bindings.
    #[test]
    fn merge_is_symmetric(a in binding(), b in binding()) {
        let ab = a.merge(&b);
        prop_assert_eq!(ab.is_some(), a.is_compatible(&b));
        prop_assert_eq!(&ab, &b.merge(&a));
        if let Some(merged) = ab {
            prop_assert!(merged.is_compatible(&a) && merged.is_compatible(&b));
            prop_assert_eq!(merged.len(), a.variables().chain(b.variables()).collect::<std::collections::BTreeSet<_>>().len());
        }
    }
}
