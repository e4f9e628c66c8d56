use crate::harness::{Assertion, Scenario};
use defstore_core::{DefFilter, IndexKind, DEFS_FILE, MANIFEST_FILE};

#[test]
fn test_reopen_answers_like_fresh_build() {
    Scenario::new("reopen_answers_like_fresh_build")
        .from_fixture("sample")
        .build()
        .reopen()
        .assert_def_count(14)
        .assert_ready(IndexKind::DefQuery)
        .assert_ready(IndexKind::Unit)
        .assert_query(
            vec![DefFilter::by_def_query("un")],
            &["encoding/json/Unmarshal"],
        )
        .assert_uses_index(vec![DefFilter::by_unit("GoPackage", "net/url")], IndexKind::Unit)
        .run()
        .expect("scenario should pass");
}

#[test]
fn test_store_layout() {
    Scenario::new("store_layout")
        .from_fixture("sample")
        .build()
        .assert(Assertion::StoreFileExists(DEFS_FILE.to_string()))
        .assert(Assertion::StoreFileExists(MANIFEST_FILE.to_string()))
        .assert(Assertion::StoreFileExists("config.toml".to_string()))
        .assert(Assertion::StoreFileExists("indexes/def_query.idx".to_string()))
        .assert(Assertion::StoreFileExists("indexes/unit.idx".to_string()))
        .run()
        .unwrap();
}

#[test]
fn test_garbage_index_falls_back_to_scan() {
    Scenario::new("garbage_index_falls_back_to_scan")
        .from_fixture("sample")
        .build()
        .overwrite_store_file("indexes/def_query.idx", b"not zstd at all")
        .reopen()
        .assert_not_ready(IndexKind::DefQuery)
        .assert_ready(IndexKind::Unit)
        .assert_scans(vec![DefFilter::by_def_query("parse")])
        .assert_query(
            vec![DefFilter::by_def_query("parse")],
            &["net/url/Parse", "net/url/parse"],
        )
        .run()
        .unwrap();
}

#[test]
fn test_flipped_byte_in_index_is_detected() {
    // Damage lands inside the compressed frame; either zstd or the checksum
    // must reject it.
    Scenario::new("flipped_byte_in_index")
        .from_fixture("sample")
        .build()
        .flip_store_byte("indexes/unit.idx", 20)
        .reopen()
        .assert_not_ready(IndexKind::Unit)
        .assert_query(
            vec![DefFilter::by_unit("GoPackage", "net/url")],
            &["net/url/URL", "net/url/Parse", "net/url/parse", "net/url/URL/String"],
        )
        .run()
        .unwrap();
}

#[test]
fn test_missing_index_file_falls_back() {
    Scenario::new("missing_index_file")
        .from_fixture("sample")
        .build()
        .delete_store_file("indexes/unit.idx")
        .reopen()
        .assert_not_ready(IndexKind::Unit)
        .assert_scans(vec![DefFilter::by_unit("GoPackage", "encoding/json")])
        .assert_query(
            vec![DefFilter::by_unit("GoPackage", "encoding/json")],
            &[
                "encoding/json/Marshal",
                "encoding/json/Unmarshal",
                "encoding/json/Decoder",
            ],
        )
        .run()
        .unwrap();
}

#[test]
fn test_missing_blob_fails_open() {
    Scenario::new("missing_blob_fails_open")
        .from_fixture("sample")
        .build()
        .delete_store_file(DEFS_FILE)
        .assert_open_fails()
        .run()
        .unwrap();
}

#[test]
fn test_missing_manifest_fails_open() {
    Scenario::new("missing_manifest_fails_open")
        .from_fixture("sample")
        .build()
        .delete_store_file(MANIFEST_FILE)
        .assert_open_fails()
        .run()
        .unwrap();
}

#[test]
fn test_rebuild_repairs_damage() {
    Scenario::new("rebuild_repairs_damage")
        .from_fixture("sample")
        .build()
        .overwrite_store_file("indexes/def_query.idx", b"")
        .reopen()
        .assert_not_ready(IndexKind::DefQuery)
        .build()
        .reopen()
        .assert_ready(IndexKind::DefQuery)
        .assert_uses_index(vec![DefFilter::by_def_query("m")], IndexKind::DefQuery)
        .assert_query(vec![DefFilter::by_def_query("m")], &["encoding/json/Marshal"])
        .run()
        .unwrap();
}
