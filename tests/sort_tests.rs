//! Sort engine scenarios.

mod test_data_gen;

use colframe::colframe_ops::Sort;
use colframe::prelude::*;
use test_data_gen::{beers_frame, ids, scenario_frame};

#[test]
fn test_sort_by_x_then_id() {
    let out = scenario_frame()
        .sort(&[Order::asc("x"), Order::asc("id")])
        .expect("sort");
    assert_eq!(ids(&out), vec![1, 3, 2]);
    assert_eq!(out.column("x").expect("x").as_f64().expect("floats"), &[5.0, 5.0, 30.0]);
}

#[test]
fn test_sort_is_stable_for_ties() {
    let out = scenario_frame().sort(&[Order::asc("x")]).expect("sort");
    assert_eq!(ids(&out), vec![1, 3, 2]);
    let out = scenario_frame().sort(&[Order::desc("x")]).expect("sort");
    assert_eq!(ids(&out), vec![2, 1, 3]);
}

#[test]
fn test_nulls_first_by_default_in_both_directions() {
    let beers = beers_frame();
    let asc = beers.sort(&[Order::asc("abv")]).expect("sort");
    assert_eq!(ids(&asc), vec![3, 4, 5, 1, 2]);
    let desc = beers.sort(&[Order::desc("abv")]).expect("sort");
    assert_eq!(ids(&desc), vec![3, 2, 1, 5, 4]);
}

#[test]
fn test_nulls_last() {
    let out = beers_frame().sort(&[Order::asc("abv").nulls_last()]).expect("sort");
    assert_eq!(ids(&out), vec![4, 5, 1, 2, 3]);
}

#[test]
fn test_enum_sorts_by_dictionary_order() {
    // lager < ipa < stout; id 4 is null.
    let out = beers_frame().sort(&[Order::asc("style"), Order::asc("id")]).expect("sort");
    assert_eq!(ids(&out), vec![4, 5, 1, 3, 2]);
}

#[test]
fn test_strings_and_bools() {
    let beers = beers_frame();
    let by_name = beers.sort(&[Order::asc("name")]).expect("sort");
    assert_eq!(ids(&by_name), vec![5, 3, 2, 4, 1]);
    let by_organic = beers.sort(&[Order::desc("organic"), Order::asc("id")]).expect("sort");
    assert_eq!(ids(&by_organic), vec![4, 1, 3, 2, 5]);
}

#[test]
fn test_custom_comparator() {
    let by_len = CustomOrdering::str(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));
    let out = beers_frame()
        .sort(&[Order::asc("name").nulls_last().with_comparator(by_len)])
        .expect("sort");
    // "Mystery"(7), "Ale Mary"(8), "Pale Ale"(8), "Dark Night"(10), null
    assert_eq!(ids(&out), vec![4, 3, 1, 2, 5]);
}

#[test]
fn test_custom_comparator_kind_must_match() {
    let reverse = CustomOrdering::int(|a: i64, b: i64| b.cmp(&a));
    let err = beers_frame()
        .sort(&[Order::asc("abv").with_comparator(reverse)])
        .unwrap_err();
    assert!(matches!(err, Error::TypeMismatch(_)));
}

#[test]
fn test_empty_order_list_is_identity() {
    let frame = scenario_frame();
    assert_eq!(frame.sort(&[]).expect("sort"), frame);
}

#[test]
fn test_unknown_sort_column() {
    let err = scenario_frame().sort(&[Order::asc("nope")]).unwrap_err();
    assert_eq!(err, Error::UnknownColumn("nope".into()));
}

#[test]
fn test_permutation_without_materializing() {
    let perm = Sort::new(vec![Order::desc("id")])
        .permutation(&scenario_frame())
        .expect("permutation");
    assert_eq!(perm, vec![2, 1, 0]);
}

#[test]
fn test_float_total_order_puts_nan_last_ascending() {
    let frame = Frame::new([
        ("id", Column::from_i64(vec![1, 2, 3])),
        ("v", Column::from_f64(vec![f64::NAN, -1.0, 2.0])),
    ])
    .expect("frame");
    let out = frame.sort(&[Order::asc("v")]).expect("sort");
    assert_eq!(ids(&out), vec![2, 3, 1]);
}
