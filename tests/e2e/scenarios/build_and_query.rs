use crate::harness::{Assertion, Scenario};
use defstore_core::{Def, DefFilter, DefKind, IndexKind};

#[test]
fn test_name_prefix_query() {
    Scenario::new("name_prefix_query")
        .from_fixture("sample")
        .build()
        .assert_def_count(14)
        .assert_query(
            vec![DefFilter::by_def_query("serve")],
            &[
                "net/http/Server",
                "net/http/Server/Serve",
                "net/http/Server/ServeTLS",
                "net/http/serve",
            ],
        )
        .assert_uses_index(vec![DefFilter::by_def_query("serve")], IndexKind::DefQuery)
        .run()
        .expect("scenario should pass");
}

#[test]
fn test_query_is_case_insensitive() {
    Scenario::new("query_is_case_insensitive")
        .from_fixture("sample")
        .build()
        .assert_query(
            vec![DefFilter::by_def_query("PARSE")],
            &["net/url/Parse", "net/url/parse"],
        )
        .assert_query(
            vec![DefFilter::by_def_query("hAnDlEr")],
            &["net/http/Handler", "net/http/HandlerFunc"],
        )
        .run()
        .unwrap();
}

#[test]
fn test_prefix_does_not_match_infix() {
    // "ListenAndServe" contains "serve" but does not start with it
    Scenario::new("prefix_does_not_match_infix")
        .from_fixture("sample")
        .build()
        .assert_query(vec![DefFilter::by_def_query("listen")], &["net/http/ListenAndServe"])
        .assert_query(vec![DefFilter::by_def_query("andserve")], &[])
        .run()
        .unwrap();
}

#[test]
fn test_empty_query_matches_everything() {
    Scenario::new("empty_query_matches_everything")
        .from_fixture("sample")
        .build()
        .assert_uses_index(vec![DefFilter::by_def_query("")], IndexKind::DefQuery)
        .assert(Assertion::Custom(Box::new(|store| {
            let all = store.defs(&[DefFilter::by_def_query("")])?;
            anyhow::ensure!(all.len() == 14, "expected 14 defs, got {}", all.len());
            Ok(())
        })))
        .run()
        .unwrap();
}

#[test]
fn test_no_match_uses_index_and_returns_nothing() {
    Scenario::new("no_match")
        .from_fixture("sample")
        .build()
        .assert_uses_index(vec![DefFilter::by_def_query("zzz")], IndexKind::DefQuery)
        .assert_query(vec![DefFilter::by_def_query("zzz")], &[])
        .run()
        .unwrap();
}

#[test]
fn test_unit_query() {
    Scenario::new("unit_query")
        .from_fixture("sample")
        .build()
        .assert_uses_index(
            vec![DefFilter::by_unit("GoPackage", "encoding/json")],
            IndexKind::Unit,
        )
        .assert_query(
            vec![DefFilter::by_unit("GoPackage", "encoding/json")],
            &[
                "encoding/json/Marshal",
                "encoding/json/Unmarshal",
                "encoding/json/Decoder",
            ],
        )
        .assert_query(vec![DefFilter::by_unit("CommonJSPackage", "net/url")], &[])
        .run()
        .unwrap();
}

#[test]
fn test_tie_prefers_name_index_and_post_filters() {
    let filters = vec![
        DefFilter::by_def_query("u"),
        DefFilter::by_unit("GoPackage", "net/url"),
    ];
    Scenario::new("tie_prefers_name_index")
        .from_fixture("sample")
        .build()
        .assert_uses_index(filters.clone(), IndexKind::DefQuery)
        .assert_query(filters, &["net/url/URL"])
        .run()
        .unwrap();
}

#[test]
fn test_uncovered_filters_scan() {
    Scenario::new("uncovered_filters_scan")
        .from_fixture("sample")
        .build()
        .assert_scans(vec![DefFilter::ByKind(DefKind::Method)])
        .assert_query(
            vec![DefFilter::ByKind(DefKind::Method)],
            &[
                "net/http/Server/Serve",
                "net/http/Server/ServeTLS",
                "net/url/URL/String",
            ],
        )
        .assert_query(
            vec![DefFilter::ByDefPath("net/url/URL/String".to_string())],
            &["net/url/URL/String"],
        )
        .assert_query(
            vec![DefFilter::ByFile("decode.go".to_string())],
            &["encoding/json/Unmarshal"],
        )
        .run()
        .unwrap();
}

#[test]
fn test_combined_filters() {
    Scenario::new("combined_filters")
        .from_fixture("sample")
        .build()
        .assert_query(
            vec![DefFilter::by_def_query("serve"), DefFilter::Exported],
            &[
                "net/http/Server",
                "net/http/Server/Serve",
                "net/http/Server/ServeTLS",
            ],
        )
        .assert_query(
            vec![
                DefFilter::by_def_query("s"),
                DefFilter::ByKind(DefKind::Method),
                DefFilter::Exported,
            ],
            &[
                "net/http/Server/Serve",
                "net/http/Server/ServeTLS",
                "net/url/URL/String",
            ],
        )
        .run()
        .unwrap();
}

#[test]
fn test_duplicate_names_keep_every_def() {
    Scenario::new("duplicate_names")
        .with_defs(vec![
            Def::new("a/Open", "Open").in_unit("GoPackage", "a"),
            Def::new("b/Open", "Open").in_unit("GoPackage", "b"),
            Def::new("c/open", "open").in_unit("GoPackage", "c"),
        ])
        .build()
        .assert_query(
            vec![DefFilter::by_def_query("open")],
            &["a/Open", "b/Open", "c/open"],
        )
        .reopen()
        .assert_query(
            vec![DefFilter::by_def_query("OPEN")],
            &["a/Open", "b/Open", "c/open"],
        )
        .run()
        .unwrap();
}

#[test]
fn test_empty_store() {
    Scenario::new("empty_store")
        .with_defs(Vec::new())
        .build()
        .assert_def_count(0)
        .assert_ready(IndexKind::DefQuery)
        .assert_query(vec![DefFilter::by_def_query("")], &[])
        .assert_query(vec![], &[])
        .run()
        .unwrap();
}
