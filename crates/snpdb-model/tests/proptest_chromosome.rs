// SPDX-License-Identifier: Apache-2.0

use std::cmp::Ordering;

use proptest::prelude::*;
use proptest::test_runner::Config;
use snpdb_model::compare_chromosomes;

proptest! {
    #![proptest_config(Config::with_cases(128))]
    #[test]
    fn numeric_chromosomes_order_like_integers(a in 0_u64..100, b in 0_u64..100) {
        prop_assert_eq!(compare_chromosomes(&a.to_string(), &b.to_string()), a.cmp(&b));
    }

    #[test]
    fn chromosome_order_is_antisymmetric(a in "[0-9XYMT]{1,3}", b in "[0-9XYMT]{1,3}") {
        let forward = compare_chromosomes(&a, &b);
        let backward = compare_chromosomes(&b, &a);
        prop_assert_eq!(forward, backward.reverse());
        if forward == Ordering::Equal {
            prop_assert!(a == b || a.parse::<u64>().is_ok());
        }
    }
}
