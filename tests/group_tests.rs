//! GroupBy/Aggregate engine scenarios.

mod test_data_gen;

use colframe::colframe_ops::{Aggregate, Operator};
use colframe::prelude::*;
use test_data_gen::{beers_frame, scenario_frame};

#[test]
fn test_group_by_derived_flag_with_mean_and_count() {
    let frame = scenario_frame()
        .eval("big", &col("x").gt(lit(10.0)))
        .expect("eval");
    let out = frame
        .group_by(&["big"])
        .expect("group")
        .aggregate(&[Aggregation::mean("x"), Aggregation::count("id").alias("n")])
        .expect("aggregate");

    assert_eq!(out.column_names(), vec!["big", "x", "n"]);
    // First appearance: row 0 is `false`.
    assert_eq!(
        out.row(0).expect("row"),
        vec![Scalar::Bool(false), Scalar::F64(5.0), Scalar::I64(2)]
    );
    assert_eq!(
        out.row(1).expect("row"),
        vec![Scalar::Bool(true), Scalar::F64(30.0), Scalar::I64(1)]
    );
}

#[test]
fn test_null_keys_form_one_group() {
    let frame = Frame::new([
        ("k", Column::from_opt_strs([Some("a"), None, Some("a"), None, Some("b")])),
        ("v", Column::from_i64(vec![1, 2, 3, 4, 5])),
    ])
    .expect("frame");
    let out = frame
        .group_by(&["k"])
        .expect("group")
        .aggregate(&[Aggregation::sum("v")])
        .expect("aggregate");
    assert_eq!(out.len(), 3);
    assert_eq!(
        out.column("k").expect("k").to_scalars(),
        vec![Scalar::from("a"), Scalar::Null, Scalar::from("b")]
    );
    assert_eq!(out.column("v").expect("v").as_i64().expect("ints"), &[4, 6, 5]);
}

#[test]
fn test_composite_keys() {
    let frame = Frame::new([
        ("a", Column::from_i64(vec![1, 1, 2, 1])),
        ("b", Column::from_bool(vec![true, false, true, true])),
        ("v", Column::from_f64(vec![1.0, 2.0, 3.0, 4.0])),
    ])
    .expect("frame");
    let grouper = frame.group_by(&["a", "b"]).expect("group");
    assert_eq!(grouper.len(), 3);
    assert_eq!(grouper.groups(), &[vec![0usize, 3], vec![1], vec![2]]);
    let out = grouper.aggregate(&[Aggregation::sum("v")]).expect("aggregate");
    assert_eq!(out.column("v").expect("v").as_f64().expect("floats"), &[5.0, 2.0, 3.0]);
}

#[test]
fn test_float_keys_fold_negative_zero() {
    let frame = Frame::new([("x", Column::from_f64(vec![0.0, -0.0, 1.0]))]).expect("frame");
    assert_eq!(frame.group_by(&["x"]).expect("group").len(), 2);
}

#[test]
fn test_reducers_skip_nulls() {
    let beers = beers_frame();
    let out = beers
        .group_by(&[])
        .expect("group")
        .aggregate(&[
            Aggregation::min("abv").alias("min"),
            Aggregation::max("abv").alias("max"),
            Aggregation::count("abv").alias("count"),
            Aggregation::first("name").alias("first"),
            Aggregation::last("name").alias("last"),
            Aggregation::count_distinct("style").alias("styles"),
            Aggregation::max("style").alias("max_style"),
        ])
        .expect("aggregate");
    assert_eq!(
        out.row(0).expect("row"),
        vec![
            Scalar::F64(4.2),
            Scalar::F64(8.0),
            Scalar::I64(4),
            Scalar::from("Pale Ale"),
            Scalar::from("Mystery"),
            Scalar::I64(3),
            Scalar::from("stout"),
        ]
    );
}

#[test]
fn test_zero_keys_on_empty_frame_is_one_group() {
    let empty = scenario_frame().head(0);
    let out = empty
        .group_by(&[])
        .expect("group")
        .aggregate(&[
            Aggregation::sum("id"),
            Aggregation::mean("x"),
            Aggregation::count("x").alias("n"),
        ])
        .expect("aggregate");
    assert_eq!(out.len(), 1);
    assert_eq!(out.row(0).expect("row"), vec![Scalar::I64(0), Scalar::Null, Scalar::I64(0)]);
}

#[test]
fn test_zero_keys_without_aggregations_keeps_one_row_per_group() {
    let frame = scenario_frame();
    let grouper = frame.group_by(&[]).expect("group");
    let out = grouper.aggregate(&[]).expect("aggregate");
    assert_eq!(grouper.len(), 1);
    assert_eq!(out.len(), 1);
    assert_eq!(out.num_columns(), 0);

    let no_columns = frame.select(&[]).expect("select");
    assert_eq!(no_columns.distinct().expect("distinct").len(), 1);
    assert!(Frame::empty().distinct().expect("distinct").is_empty());
}

#[test]
fn test_custom_reducer_and_empty_group() {
    let frame = Frame::new([
        ("k", Column::from_i64(vec![1, 1, 2])),
        ("v", Column::from_opt_i64(vec![Some(3), Some(4), None])),
    ])
    .expect("frame");
    let product = || Aggregation::custom("v", CustomReducer::int(|xs| xs.iter().product()));

    let ok = frame.filter(&Filter::eq("k", 1)).expect("filter");
    let out = ok.group_by(&["k"]).expect("group").aggregate(&[product()]).expect("aggregate");
    assert_eq!(out.column("v").expect("v").get(0), Scalar::I64(12));

    let err = frame.group_by(&["k"]).expect("group").aggregate(&[product()]).unwrap_err();
    assert!(matches!(err, Error::EmptyGroupReduction { .. }));
}

#[test]
fn test_type_and_name_errors_come_first() {
    let beers = beers_frame();
    let grouper = beers.group_by(&["style"]).expect("group");
    assert!(matches!(grouper.aggregate(&[Aggregation::sum("name")]), Err(Error::TypeMismatch(_))));
    assert!(matches!(grouper.aggregate(&[Aggregation::sum("nope")]), Err(Error::UnknownColumn(_))));
    assert!(matches!(
        grouper.aggregate(&[Aggregation::count("id").alias("style")]),
        Err(Error::DuplicateColumn(_))
    ));
    assert!(matches!(
        grouper.aggregate(&[Aggregation::max("abv"), Aggregation::min("abv")]),
        Err(Error::DuplicateColumn(_))
    ));
    assert!(matches!(beers.group_by(&["nope"]), Err(Error::UnknownColumn(_))));
}

#[test]
fn test_count_and_distinct() {
    let frame = Frame::new([
        ("a", Column::from_i64(vec![1, 2, 1, 1])),
        ("b", Column::from_strs(["x", "y", "x", "z"])),
    ])
    .expect("frame");
    let counts = frame.group_by(&["a"]).expect("group").count("n").expect("count");
    assert_eq!(counts.column("n").expect("n").as_i64().expect("ints"), &[3, 1]);

    let distinct = frame.distinct().expect("distinct");
    assert_eq!(distinct.len(), 3);
    assert_eq!(distinct.row(2).expect("row"), vec![Scalar::I64(1), Scalar::from("z")]);
}

#[test]
fn test_aggregate_operator() {
    let op = Aggregate {
        keys: vec!["x".into()],
        aggregations: vec![Aggregation::new("id", "max".parse().expect("reducer"))],
    };
    let out = op.apply(&scenario_frame()).expect("aggregate");
    assert_eq!(out.column("id").expect("id").as_i64().expect("ints"), &[3, 2]);
}
