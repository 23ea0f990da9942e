use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;
use tempfile::TempDir;

use tagdb::column::{Column, ColumnData, ColumnRef};
use tagdb::container::{read_container, write_container};
use tagdb::error::TagdbError;
use tagdb::loader::{Format, read};
use tagdb::settings::Settings;
use tagdb::store::Tagdb;
use tagdb::text::{parse_manifest, read_id_list, read_text};

fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

fn setup() -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "lists/deep56.txt", "a\nb\n# skipped\n\nc extra words\nb\n");
    write(dir.path(), "lists/night.txt", "b\nd\n");
    let manifest = write(
        dir.path(),
        "tags.txt",
        "# survey tags\nroot = lists\n{root}/deep56.txt deep56 wide deep56\n\"{root}/night.txt\" night\n",
    );
    (dir, manifest)
}

fn booleans<'a>(db: &'a Tagdb, name: &str) -> &'a [bool] {
    match db.column(name).and_then(Column::scalar) {
        Some(ColumnRef::Boolean(values)) => values,
        other => panic!("'{name}' is not a boolean column: {:?}", other),
    }
}

#[test]
fn manifest_entries() {
    let (dir, manifest) = setup();
    let entries = parse_manifest(&manifest).unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].file, dir.path().join("lists/deep56.txt"));
    assert_eq!(entries[0].tags, vec!["deep56", "wide"]);
    assert_eq!(entries[1].file, dir.path().join("lists/night.txt"));
    assert_eq!(entries[1].tags, vec!["night"]);
}

#[test]
fn text_store() {
    let (_dir, manifest) = setup();
    let db = read_text(&manifest, None).unwrap();
    assert_eq!(db.ids(), ["a", "b", "c", "d"]);
    assert_eq!(db.column_names(), vec!["deep56", "id", "night", "wide"]);
    assert_eq!(booleans(&db, "deep56"), &[true, true, true, false]);
    assert_eq!(booleans(&db, "wide"), &[true, true, true, false]);
    assert_eq!(booleans(&db, "night"), &[false, true, false, true]);
    assert_eq!(db.query("deep56,night").unwrap(), vec!["b"]);
    assert_eq!(db.query("~deep56").unwrap(), vec!["d"]);
}

#[test]
fn id_patterns() {
    let dir = tempfile::tempdir().unwrap();
    let list = write(
        dir.path(),
        "files.txt",
        "# file  exposure\nobs_001.fits 12.5\nobs_002.fits 3.0\nobs_001.fits 99\nnotes\n",
    );
    let pattern = Regex::new(r"^(\S+)\.fits").unwrap();
    assert_eq!(
        read_id_list(&list, Some(&pattern)).unwrap(),
        vec!["obs_001", "obs_002", "notes"]
    );
    assert_eq!(
        read_id_list(&list, None).unwrap(),
        vec!["obs_001.fits", "obs_002.fits", "notes"]
    );
}

#[test]
fn id_patterns_match_from_line_start() {
    let dir = tempfile::tempdir().unwrap();
    let list = write(dir.path(), "numbers.txt", "obs 123\n456 extra\n");
    let pattern = Regex::new(r"(\d+)").unwrap();
    assert_eq!(read_id_list(&list, Some(&pattern)).unwrap(), vec!["obs 123", "456"]);
}

#[test]
fn manifest_errors() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "ids.txt", "a\n");
    let cases = [
        ("unknown_variable.txt", "{nowhere}/ids.txt tag\n"),
        ("no_tags.txt", "ids.txt\n"),
        ("no_value.txt", "root =\n"),
        ("missing_list.txt", "absent.txt tag\n"),
        ("empty.txt", "# nothing here\n\n"),
    ];
    for (name, content) in cases {
        let manifest = write(dir.path(), name, content);
        let err = read_text(&manifest, None).unwrap_err();
        assert!(matches!(err, TagdbError::Load { .. }), "{name}: {err}");
    }
    let err = read_text(&dir.path().join("absent_manifest.txt"), None).unwrap_err();
    assert!(matches!(err, TagdbError::Load { .. }), "{err}");
}

#[test]
fn later_entries_add_tags() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "first.txt", "a\nb\n");
    write(dir.path(), "second.txt", "b\nc\n");
    let manifest = write(dir.path(), "tags.txt", "first.txt foo\nsecond.txt foo bar\n");
    let db = read_text(&manifest, None).unwrap();
    assert_eq!(db.ids(), ["a", "b", "c"]);
    assert_eq!(booleans(&db, "foo"), &[true, true, true]);
    assert_eq!(booleans(&db, "bar"), &[false, true, true]);
}

fn mixed() -> Tagdb {
    Tagdb::new(
        [
            ("id", Column::string(vec!["p", "q", "r"])),
            ("flag", Column::boolean(vec![true, false, true])),
            ("rank", Column::integer(vec![-1, 0, i64::MAX])),
            ("ra", Column::float(vec![1.25, f64::NAN, -0.0])),
            ("label", Column::string(vec!["plain", "with \"quotes\"", "ünïcode, too"])),
            (
                "pos",
                Column::array(ColumnData::Integer(vec![1, 2, 3, 4, 5, 6]), 2).unwrap(),
            ),
        ],
        Some("rank".into()),
    )
    .unwrap()
}

#[test]
fn container_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.tagdb");
    let db = mixed();
    write_container(&db, &path).unwrap();
    let back = read_container(&path).unwrap();
    assert_eq!(back.ids(), db.ids());
    assert_eq!(back.sort(), Some("rank"));
    assert_eq!(back.column_names(), db.column_names());
    for name in ["id", "flag", "rank", "label", "pos"] {
        assert_eq!(back.column(name), db.column(name), "column '{name}'");
    }
    match back.column("ra").and_then(Column::scalar) {
        Some(ColumnRef::Float(ra)) => {
            assert_eq!(ra[0], 1.25);
            assert!(ra[1].is_nan());
            assert_eq!(ra[2], 0.0);
        }
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(back.query("flag").unwrap(), db.query("flag").unwrap());
    assert_eq!(back.query("pos[1] > 4").unwrap(), vec!["q", "r"]);
}

#[test]
fn container_is_replaced() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.db");
    write_container(&mixed(), &path).unwrap();
    let small = Tagdb::new([("id", Column::string(vec!["z"]))], None).unwrap();
    write_container(&small, &path).unwrap();
    let back = read_container(&path).unwrap();
    assert_eq!(back.ids(), ["z"]);
    assert_eq!(back.column_names(), vec!["id"]);
    assert_eq!(back.sort(), None);
}

#[test]
fn corrupt_container_shape() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.db");
    write_container(&mixed(), &path).unwrap();
    let connection = rusqlite::Connection::open(&path).unwrap();
    connection
        .execute(
            "update TagdbColumn set Components = 4294967296, Length = 4294967296 where Name = 'rank'",
            [],
        )
        .unwrap();
    drop(connection);
    let err = read_container(&path).unwrap_err();
    assert!(matches!(err, TagdbError::Load { .. }), "{err}");
}

#[test]
fn missing_container() {
    let dir = tempfile::tempdir().unwrap();
    let err = read_container(&dir.path().join("absent.db")).unwrap_err();
    assert!(matches!(err, TagdbError::Load { .. }), "{err}");
}

#[test]
fn format_detection() {
    let settings = Settings::default();
    assert_eq!(Format::detect(Path::new("a/b.db"), &settings), Format::Container);
    assert_eq!(Format::detect(Path::new("b.TAGDB"), &settings), Format::Container);
    assert_eq!(Format::detect(Path::new("b.txt"), &settings), Format::Text);
    assert_eq!(Format::detect(Path::new("manifest"), &settings), Format::Text);
    let settings = Settings { container_extensions: vec!["bin".into()], ..Settings::default() };
    assert_eq!(Format::detect(Path::new("b.bin"), &settings), Format::Container);
    assert_eq!(Format::detect(Path::new("b.db"), &settings), Format::Text);
}

#[test]
fn loading_with_settings() {
    let (dir, manifest) = setup();
    let settings = Settings { default_sort: Some("night".into()), ..Settings::default() };
    let db = read(&manifest, None, &settings).unwrap();
    assert_eq!(db.sort(), Some("night"));
    assert_eq!(db.query("").unwrap(), vec!["a", "c", "b", "d"]);

    let container = dir.path().join("copy.sqlite");
    write_container(&db, &container).unwrap();
    let back = read(&container, None, &Settings::default()).unwrap();
    assert_eq!(back.ids(), db.ids());
    // an explicit format wins over the extension
    let err = read(&container, Some(Format::Text), &Settings::default()).unwrap_err();
    assert!(matches!(err, TagdbError::Load { .. }), "{err}");

    let bad = Settings { id_pattern: Some("(".into()), ..Settings::default() };
    let err = read(&manifest, None, &bad).unwrap_err();
    assert!(matches!(err, TagdbError::Config(_)), "{err}");
    let unknown_sort = Settings { default_sort: Some("nosuch".into()), ..Settings::default() };
    assert!(read(&manifest, None, &unknown_sort).is_err());
}

#[test]
fn settings_file() {
    let dir = tempfile::tempdir().unwrap();
    let file = write(
        dir.path(),
        "tagdb.toml",
        "id_pattern = '^(\\S+)\\.fits'\ndefault_sort = \"rank\"\ncontainer_extensions = [\"bin\", \"h5\"]\n",
    );
    let settings = Settings::load(file.to_str().unwrap()).unwrap();
    assert_eq!(settings.id_pattern.as_deref(), Some(r"^(\S+)\.fits"));
    assert_eq!(settings.default_sort.as_deref(), Some("rank"));
    assert_eq!(settings.container_extensions, vec!["bin", "h5"]);
    assert_eq!(settings.log_filter, "info");

    let defaults = Settings::load(dir.path().join("absent").to_str().unwrap()).unwrap();
    assert_eq!(defaults, Settings::default());
}
