//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use colframe::prelude::*;

/// `{id:1,x:5.0}, {id:2,x:30.0}, {id:3,x:5.0}`
pub fn scenario_frame() -> Frame {
    Frame::new([
        ("id", Column::from_i64(vec![1, 2, 3])),
        ("x", Column::from_f64(vec![5.0, 30.0, 5.0])),
    ])
    .expect("valid frame")
}

/// Mixed types with a few nulls, in the shape of the beer benchmark data.
pub fn beers_frame() -> Frame {
    let style = Column::enum_from_strs(
        [Some("ipa"), Some("stout"), Some("ipa"), None, Some("lager")],
        Some(&["lager".to_string(), "ipa".into(), "stout".into()]),
    )
    .expect("enum column");
    Frame::new([
        ("id", Column::from_i64(vec![1, 2, 3, 4, 5])),
        (
            "name",
            Column::from_opt_strs([
                Some("Pale Ale"),
                Some("Dark Night"),
                Some("Ale Mary"),
                Some("Mystery"),
                None,
            ]),
        ),
        ("abv", Column::from_opt_f64(vec![Some(5.5), Some(8.0), None, Some(4.2), Some(4.8)])),
        ("style", style),
        (
            "organic",
            Column::from_opt_bool(vec![Some(true), Some(false), Some(true), None, Some(false)]),
        ),
    ])
    .expect("valid frame")
}

pub fn ids(frame: &Frame) -> Vec<i64> {
    frame
        .column("id")
        .expect("id column")
        .as_i64()
        .expect("int ids")
        .to_vec()
}
