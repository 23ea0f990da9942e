use tagdb::column::{Column, ColumnData, ColumnRef, INTEGER_FILL};
use tagdb::error::TagdbError;
use tagdb::merge::merge;
use tagdb::store::Tagdb;

fn setup() -> (Tagdb, Tagdb) {
    let a = Tagdb::new(
        [
            ("id", Column::string(vec!["x", "y"])),
            ("foo", Column::boolean(vec![true, false])),
            ("mag", Column::float(vec![1.5, 2.5])),
            ("rank", Column::integer(vec![7, 8])),
        ],
        Some("mag".into()),
    )
    .unwrap();
    let b = Tagdb::new(
        [
            ("id", Column::string(vec!["y", "z"])),
            ("foo", Column::boolean(vec![false, true])),
            ("mag", Column::float(vec![9.0, 3.0])),
            ("label", Column::string(vec!["why", "zed"])),
        ],
        None,
    )
    .unwrap();
    (a, b)
}

fn values<'a>(db: &'a Tagdb, name: &str) -> ColumnRef<'a> {
    db.column(name).and_then(Column::scalar).unwrap()
}

#[test]
fn union_of_ids_in_first_seen_order() {
    let (a, b) = setup();
    let merged = merge([&a, &b]).unwrap();
    assert_eq!(merged.ids(), ["x", "y", "z"]);
    assert_eq!(merged.column_names(), vec!["foo", "id", "label", "mag", "rank"]);
    let merged = merge([&b, &a]).unwrap();
    assert_eq!(merged.ids(), ["y", "z", "x"]);
}

#[test]
fn booleans_accumulate() {
    let (a, b) = setup();
    let merged = merge([&a, &b]).unwrap();
    assert_eq!(values(&merged, "foo"), ColumnRef::Boolean(&[true, false, true]));
    assert_eq!(merged.query("foo").unwrap(), vec!["x", "z"]);
    // a tag set by either input survives whatever the order
    let c = Tagdb::new(
        [("id", Column::string(vec!["y"])), ("foo", Column::boolean(vec![true]))],
        None,
    )
    .unwrap();
    let merged = merge([&a, &c, &b]).unwrap();
    assert_eq!(values(&merged, "foo"), ColumnRef::Boolean(&[true, true, true]));
}

#[test]
fn later_values_overwrite() {
    let (a, b) = setup();
    let merged = merge([&a, &b]).unwrap();
    assert_eq!(values(&merged, "mag"), ColumnRef::Float(&[1.5, 9.0, 3.0]));
    let merged = merge([&b, &a]).unwrap();
    // ids y, z, x
    assert_eq!(values(&merged, "mag"), ColumnRef::Float(&[2.5, 3.0, 1.5]));
}

#[test]
fn missing_values_get_defaults() {
    let (a, b) = setup();
    let merged = merge([&a, &b]).unwrap();
    assert_eq!(values(&merged, "rank"), ColumnRef::Integer(&[7, 8, INTEGER_FILL]));
    let label = match values(&merged, "label") {
        ColumnRef::String(label) => label.to_vec(),
        other => panic!("unexpected {:?}", other),
    };
    assert_eq!(label, vec!["", "why", "zed"]);
    let only_a = Tagdb::new(
        [("id", Column::string(vec!["x"])), ("ra", Column::float(vec![4.0]))],
        None,
    )
    .unwrap();
    let merged = merge([&only_a, &b]).unwrap();
    match values(&merged, "ra") {
        ColumnRef::Float(ra) => {
            assert_eq!(ra[0], 4.0);
            assert!(ra[1].is_nan() && ra[2].is_nan());
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn multi_component_columns() {
    let a = Tagdb::new(
        [
            ("id", Column::string(vec!["p", "q"])),
            ("pos", Column::from_rows(vec![vec![1.0, 2.0], vec![10.0, 20.0]]).unwrap()),
        ],
        None,
    )
    .unwrap();
    let b = Tagdb::new(
        [
            ("id", Column::string(vec!["r", "q"])),
            ("pos", Column::from_rows(vec![vec![3.0, 4.0], vec![30.0, 40.0]]).unwrap()),
        ],
        None,
    )
    .unwrap();
    let merged = merge([&a, &b]).unwrap();
    assert_eq!(merged.ids(), ["p", "q", "r"]);
    let pos = merged.column("pos").unwrap();
    assert_eq!(pos.components(), 2);
    assert_eq!(pos.data(), &ColumnData::Float(vec![1.0, 4.0, 3.0, 10.0, 40.0, 30.0]));
    assert_eq!(merged.query("pos[1] > 35").unwrap(), vec!["q"]);
}

#[test]
fn merge_identity() {
    let (a, _) = setup();
    let merged = merge([&a]).unwrap();
    assert_eq!(merged.ids(), a.ids());
    for name in a.column_names() {
        assert_eq!(merged.column(name), a.column(name));
    }
    // merge never carries the default sort
    assert_eq!(merged.sort(), None);
    assert_eq!(a.sort(), Some("mag"));
}

#[test]
fn inputs_are_untouched() {
    let (a, b) = setup();
    let before = (a.clone(), b.clone());
    let _ = a.union(&b).unwrap();
    assert_eq!(a.ids(), before.0.ids());
    assert_eq!(b.column("foo"), before.1.column("foo"));
    assert_eq!(a.union(&b).unwrap().ids(), merge([&a, &b]).unwrap().ids());
}

#[test]
fn mismatches_are_rejected() {
    let (a, _) = setup();
    let other = Tagdb::new(
        [("id", Column::string(vec!["w"])), ("foo", Column::string(vec!["yes"]))],
        None,
    )
    .unwrap();
    let err = merge([&a, &other]).unwrap_err();
    assert!(matches!(err, TagdbError::Merge(_)), "{err}");
    let wide = Tagdb::new(
        [
            ("id", Column::string(vec!["w"])),
            ("mag", Column::from_rows(vec![vec![1.0], vec![2.0]]).unwrap()),
        ],
        None,
    )
    .unwrap();
    let err = merge([&a, &wide]).unwrap_err();
    assert!(matches!(err, TagdbError::Merge(_)), "{err}");
}

#[test]
fn numeric_kinds_are_widened() {
    let ints = Tagdb::new(
        [("id", Column::string(vec!["x", "w"])), ("v", Column::integer(vec![1, 7]))],
        None,
    )
    .unwrap();
    let floats = Tagdb::new(
        [("id", Column::string(vec!["y", "w"])), ("v", Column::float(vec![2.5, 8.5]))],
        None,
    )
    .unwrap();
    let flags = Tagdb::new(
        [("id", Column::string(vec!["z"])), ("v", Column::boolean(vec![true]))],
        None,
    )
    .unwrap();
    let merged = merge([&ints, &floats, &flags]).unwrap();
    assert_eq!(merged.ids(), ["x", "w", "y", "z"]);
    assert_eq!(values(&merged, "v"), ColumnRef::Float(&[1.0, 8.5, 2.5, 1.0]));

    let merged = merge([&flags, &ints]).unwrap();
    assert_eq!(values(&merged, "v"), ColumnRef::Integer(&[1, 1, 7]));
    let merged = merge([&floats, &ints]).unwrap();
    assert_eq!(values(&merged, "v"), ColumnRef::Float(&[2.5, 7.0, 1.0]));
    // ids no input gives a value get the widened default
    let missing = Tagdb::new([("id", Column::string(vec!["q"]))], None).unwrap();
    let merged = merge([&ints, &floats, &missing]).unwrap();
    match values(&merged, "v") {
        ColumnRef::Float(v) => assert!(v[3].is_nan()),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn nested_merges_agree() {
    let store = |ids: Vec<&str>, foo: Vec<bool>, mag: Vec<f64>| {
        Tagdb::new(
            [("id", Column::string(ids)), ("foo", Column::boolean(foo)), ("mag", Column::float(mag))],
            None,
        )
        .unwrap()
    };
    let a = store(vec!["x", "y"], vec![true, false], vec![1.0, 2.0]);
    let b = store(vec!["y", "z"], vec![false, true], vec![3.0, 4.0]);
    let c = store(vec!["z", "x", "w"], vec![false, false, true], vec![5.0, 6.0, 7.0]);
    let flat = merge([&a, &b, &c]).unwrap();
    let nested = merge([&merge([&a, &b]).unwrap(), &c]).unwrap();
    assert_eq!(nested.ids(), flat.ids());
    assert_eq!(flat.ids(), ["x", "y", "z", "w"]);
    assert_eq!(flat.id_at(3), Some("w"));
    for name in ["foo", "mag"] {
        assert_eq!(nested.column(name), flat.column(name), "column '{name}'");
    }
    assert_eq!(values(&flat, "foo"), ColumnRef::Boolean(&[true, false, true, true]));
    assert_eq!(values(&flat, "mag"), ColumnRef::Float(&[6.0, 3.0, 5.0, 7.0]));
}

#[test]
fn nothing_to_merge() {
    let err = merge(Vec::<&Tagdb>::new()).unwrap_err();
    assert!(matches!(err, TagdbError::Merge(_)));
}

#[test]
fn invalid_stores() {
    let schema = |result: tagdb::Result<Tagdb>| matches!(result, Err(TagdbError::Schema(_)));
    assert!(schema(Tagdb::new([("foo", Column::boolean(vec![true]))], None)));
    assert!(schema(Tagdb::new([("id", Column::integer(vec![1]))], None)));
    assert!(schema(Tagdb::new([("id", Column::string(vec!["a", "a"]))], None)));
    assert!(schema(Tagdb::new(
        [("id", Column::string(vec!["a", "b"])), ("foo", Column::boolean(vec![true]))],
        None
    )));
    assert!(schema(Tagdb::new(
        [("id", Column::string(vec!["a"])), ("id", Column::string(vec!["b"]))],
        None
    )));
    assert!(schema(Tagdb::new([("id", Column::string(vec!["a"]))], Some("nosuch".into()))));
}
