//! Expression evaluator scenarios.

mod test_data_gen;

use colframe::colframe_ops::BinaryOp;
use colframe::prelude::*;
use test_data_gen::{beers_frame, ids, scenario_frame};

#[test]
fn test_abs_of_floats() {
    let frame = Frame::new([("x", Column::from_f64(vec![-3.0, 4.0]))]).expect("frame");
    let out = frame.eval("y", &col("x").abs()).expect("eval");
    assert_eq!(out.column_names(), vec!["x", "y"]);
    assert_eq!(out.column("y").expect("y").as_f64().expect("floats"), &[3.0, 4.0]);
}

#[test]
fn test_mixed_arithmetic_promotes_to_float() {
    let out = scenario_frame().eval("z", &(col("id") * col("x") + lit(1))).expect("eval");
    let z = out.column("z").expect("z");
    assert_eq!(z.data_type(), DataType::Float64);
    assert_eq!(z.as_f64().expect("floats"), &[6.0, 61.0, 16.0]);
}

#[test]
fn test_int_arithmetic_stays_int() {
    let out = scenario_frame().eval("z", &(col("id") + col("id") - lit(1))).expect("eval");
    assert_eq!(out.column("z").expect("z").as_i64().expect("ints"), &[1, 3, 5]);
}

#[test]
fn test_int_division_by_zero_is_null_float_is_ieee() {
    let frame = Frame::new([
        ("a", Column::from_i64(vec![4, 1])),
        ("b", Column::from_i64(vec![2, 0])),
        ("f", Column::from_f64(vec![1.0, 0.0])),
    ])
    .expect("frame");
    let out = frame.eval("q", &(col("a") / col("b"))).expect("eval");
    assert_eq!(out.column("q").expect("q").to_scalars(), vec![Scalar::I64(2), Scalar::Null]);

    let out = frame.eval("q", &(col("a") / col("f"))).expect("eval");
    let q = out.column("q").expect("q").as_f64().expect("floats").to_vec();
    assert_eq!(q[0], 4.0);
    assert!(q[1].is_infinite());
}

#[test]
fn test_nulls_propagate() {
    let out = beers_frame().eval("double", &(col("abv") * lit(2.0))).expect("eval");
    let d = out.column("double").expect("double");
    assert_eq!(d.get(0), Scalar::F64(11.0));
    assert_eq!(d.get(2), Scalar::Null);
    assert_eq!(d.null_count(), 1);
}

#[test]
fn test_string_concatenation_and_enum_values() {
    let out = beers_frame()
        .eval("label", &(col("name") + lit(" / ") + col("style")))
        .expect("eval");
    let label = out.column("label").expect("label");
    assert_eq!(label.data_type(), DataType::Utf8);
    assert_eq!(label.get(0), Scalar::from("Pale Ale / ipa"));
    assert_eq!(label.get(3), Scalar::Null);
    assert_eq!(label.get(4), Scalar::Null);
}

#[test]
fn test_comparisons_and_logic() {
    let expr = col("abv").gt(lit(5)) & col("organic").equals(lit(true));
    let out = beers_frame().eval("pick", &expr).expect("eval");
    assert_eq!(
        out.column("pick").expect("pick").to_scalars(),
        vec![
            Scalar::Bool(true),
            Scalar::Bool(false),
            Scalar::Null,
            Scalar::Null,
            Scalar::Bool(false),
        ]
    );

    let expr = !(col("id").lt(lit(2)) | col("id").ge(lit(3)));
    let out = scenario_frame().eval("mid", &expr).expect("eval");
    assert_eq!(out.column("mid").expect("mid").as_bool().expect("bools"), &[false, true, false]);
}

#[test]
fn test_enum_ordering_follows_dictionary_like_filter() {
    let beers = beers_frame();
    let out = beers.eval("f", &col("style").gt(lit("lager"))).expect("eval");
    assert_eq!(
        out.column("f").expect("f").to_scalars(),
        vec![
            Scalar::Bool(true),
            Scalar::Bool(true),
            Scalar::Bool(true),
            Scalar::Null,
            Scalar::Bool(false),
        ]
    );
    let via_eval = out.filter(&Filter::eq("f", true)).expect("filter");
    let via_filter = beers.filter(&Filter::gt("style", "lager")).expect("filter");
    assert_eq!(ids(&via_eval), ids(&via_filter));
    assert_eq!(ids(&via_eval), vec![1, 2, 3]);

    // Literal on the left, and a column over the same dictionary.
    let out = beers.eval("f", &lit("stout").gt(col("style"))).expect("eval");
    assert_eq!(out.column("f").expect("f").get(0), Scalar::Bool(true));
    let style = beers.column("style").expect("style").clone();
    let twin = beers.with_column("twin", style).expect("twin");
    let out = twin.eval("f", &col("style").le(col("twin"))).expect("eval");
    assert_eq!(out.column("f").expect("f").get(1), Scalar::Bool(true));

    // Equality and concatenation still see the strings.
    let out = beers.eval("f", &col("style").equals(lit("porter"))).expect("eval");
    assert_eq!(out.column("f").expect("f").get(0), Scalar::Bool(false));
}

#[test]
fn test_enum_ordering_needs_a_member_or_same_dictionary() {
    let beers = beers_frame();
    let letters = [Some("a"), Some("b"), Some("c"), Some("d"), Some("e")];
    let other = Column::enum_from_strs(letters, None).expect("enum");
    let frame = beers.with_column("other", other).expect("frame");
    for expr in [
        col("style").gt(lit("porter")),
        col("style").lt(col("name")),
        col("style").lt(col("other")),
        col("style").ge(Expr::call("upper", lit("ipa"))),
    ] {
        let err = frame.eval("bad", &expr).unwrap_err();
        assert!(matches!(err, Error::TypeMismatch(_)), "{expr:?} gave {err:?}");
    }
}

#[test]
fn test_type_mismatches() {
    let beers = beers_frame();
    for expr in [
        col("name") * lit(2),
        col("organic") + lit(1),
        col("abv") & col("organic"),
        col("name").gt(lit(1)),
        Expr::call("upper", col("abv")),
        Expr::call("not", col("id")),
    ] {
        let err = beers.eval("bad", &expr).unwrap_err();
        assert!(matches!(err, Error::TypeMismatch(_)), "{expr:?} gave {err:?}");
    }
}

#[test]
fn test_unary_builtins() {
    let frame = Frame::new([
        ("f", Column::from_f64(vec![2.5, -1.5])),
        ("s", Column::from_strs(["Ab", "cdé"])),
    ])
    .expect("frame");
    let get = |e: Expr| -> Vec<Scalar> {
        let out = frame.eval("r", &e).expect("eval");
        out.column("r").expect("r").to_scalars()
    };
    assert_eq!(get(Expr::call("floor", col("f"))), vec![Scalar::F64(2.0), Scalar::F64(-2.0)]);
    assert_eq!(get(Expr::call("ceil", col("f"))), vec![Scalar::F64(3.0), Scalar::F64(-1.0)]);
    assert_eq!(get(-col("f")), vec![Scalar::F64(-2.5), Scalar::F64(1.5)]);
    assert_eq!(get(Expr::call("int", col("f"))), vec![Scalar::I64(2), Scalar::I64(-1)]);
    assert_eq!(get(Expr::call("len", col("s"))), vec![Scalar::I64(2), Scalar::I64(3)]);
    assert_eq!(get(Expr::call("upper", col("s"))), vec![Scalar::from("AB"), Scalar::from("CDÉ")]);
    assert_eq!(get(Expr::call("str", col("f"))), vec![Scalar::from("2.5"), Scalar::from("-1.5")]);
    assert_eq!(get(Expr::call("bool", col("f"))), vec![Scalar::Bool(true), Scalar::Bool(true)]);
    assert_eq!(get(lit(4).sqrt()), vec![Scalar::F64(2.0), Scalar::F64(2.0)]);
}

#[test]
fn test_registry_functions() {
    let mut registry = FunctionRegistry::new();
    registry
        .register_float("half", |v| v / 2.0)
        .register_str("shout", |s| format!("{s}!"));

    let beers = beers_frame();
    let out = beers.eval_with("h", &Expr::call("half", col("abv")), &registry).expect("eval");
    assert_eq!(out.column("h").expect("h").get(1), Scalar::F64(4.0));

    let out = beers.eval_with("s", &Expr::call("shout", col("style")), &registry).expect("eval");
    assert_eq!(out.column("s").expect("s").get(1), Scalar::from("stout!"));

    // Registered for floats only.
    let err = beers.eval_with("h", &Expr::call("half", col("id")), &registry).unwrap_err();
    assert_eq!(
        err,
        Error::UnknownFunction {
            name: "half".into(),
            data_type: DataType::Int64
        }
    );
    let unregistered = beers.eval("h", &Expr::call("half", col("abv")));
    assert!(matches!(unregistered, Err(Error::UnknownFunction { .. })));
}

#[test]
fn test_existing_destination_is_replaced_in_place() {
    let out = scenario_frame().eval("id", &(col("id") * lit(10))).expect("eval");
    assert_eq!(out.column_names(), vec!["id", "x"]);
    assert_eq!(out.column("id").expect("id").as_i64().expect("ints"), &[10, 20, 30]);
}

#[test]
fn test_literal_only_expression_broadcasts() {
    let out = scenario_frame().eval("one", &lit(1)).expect("eval");
    assert_eq!(out.column("one").expect("one").as_i64().expect("ints"), &[1, 1, 1]);
}

#[test]
fn test_binary_op_names() {
    assert_eq!("<=".parse::<BinaryOp>().expect("op"), BinaryOp::Le);
    assert_eq!("&".parse::<BinaryOp>().expect("op"), BinaryOp::And);
    assert!("%".parse::<BinaryOp>().is_err());
}
