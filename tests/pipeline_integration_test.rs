//! End-to-end tests for the resolve, index and convert stages.

use rdfdoc::config::ResolutionRules;
use rdfdoc::core::BlankNodeNamer;
use rdfdoc::indexing::{SatelliteIndexReader, SatelliteLookup};
use rdfdoc::pipeline::{build_index, convert, resolve_paths, ConvertOptions};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

const PREFIX: &str = "http://example.org/org/";
const LAT: &str = "http://www.w3.org/2003/01/geo/wgs84_pos#lat";

const RULES: &str = "\
resolve=http://example.org/hasLocation;http://purl.org/dc/terms/creator
predicates=http://www.w3.org/2003/01/geo/wgs84_pos#lat
parents=http://example.org/itemOf
paths=http://purl.org/dc/terms/creator|http://example.org/name|http://example.org/creatorName
reducers=3
sparse.interval=2
";

const CORPUS: &[&str] = &[
    "<http://example.org/org/A> <http://example.org/hasLocation> _:b1 .",
    "<http://example.org/org/B> <http://example.org/hasLocation> _:b1 .",
    "_:b1 <http://www.w3.org/2003/01/geo/wgs84_pos#lat> \"1.0\" .",
    "<http://example.org/org/C> <http://example.org/name> \"C\" .",
    "<http://example.org/org/A/about> <http://example.org/modified> \"2020\" .",
];

const AUTHORITY_RULES: &str = "\
resolve=http://purl.org/dc/terms/creator
predicates=http://example.org/name
parents=
separate=http://d-nb.info/gnd/
reducers=3
";

fn rules() -> ResolutionRules {
    ResolutionRules::parse(RULES, PREFIX).unwrap()
}

fn write_corpus(dir: &Path, name: &str, lines: &[&str]) -> PathBuf {
    fs::create_dir_all(dir).unwrap();
    fs::write(dir.join(name), lines.join("\n") + "\n").unwrap();
    dir.to_path_buf()
}

/// Concatenated bulk output, part files in name order.
fn read_bulk(output: &Path) -> String {
    let mut parts: Vec<PathBuf> = fs::read_dir(output)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| p.extension().map_or(false, |ext| ext == "ndjson"))
        .collect();
    parts.sort();
    parts.iter().map(|p| fs::read_to_string(p).unwrap()).collect()
}

/// Document id -> (action line, body).
fn documents(bulk: &str) -> BTreeMap<String, (Value, Value)> {
    let lines: Vec<&str> = bulk.lines().collect();
    assert_eq!(lines.len() % 2, 0);
    lines
        .chunks(2)
        .map(|pair| {
            let action: Value = serde_json::from_str(pair[0]).unwrap();
            let body: Value = serde_json::from_str(pair[1]).unwrap();
            (action["index"]["_id"].as_str().unwrap().to_string(), (action, body))
        })
        .collect()
}

/// Document ids in output order, duplicates kept.
fn ids(bulk: &str) -> Vec<String> {
    bulk.lines()
        .step_by(2)
        .map(|line| {
            let action: Value = serde_json::from_str(line).unwrap();
            action["index"]["_id"].as_str().unwrap().to_string()
        })
        .collect()
}

fn run_convert(rules: &ResolutionRules, input: &Path, artifact: &Path, output: &Path) -> String {
    convert(
        rules,
        &ConvertOptions {
            input: input.to_path_buf(),
            document_type: "org".to_string(),
            artifact: artifact.to_path_buf(),
            output: Some(output.to_path_buf()),
            index_name: Some("orgs".to_string()),
        },
    )
    .unwrap();
    read_bulk(output)
}

#[test]
fn test_satellite_fans_out_to_every_requestor() {
    let dir = tempfile::tempdir().unwrap();
    let rules = rules();
    let input = write_corpus(&dir.path().join("input"), "part-0.nt", CORPUS);
    let artifact = dir.path().join("index").join("satellites");

    let report = build_index(&rules, &input, &artifact).unwrap();
    assert_eq!(report.counters.written, 1);

    let mut reader = SatelliteIndexReader::open(&artifact).unwrap();
    let key = BlankNodeNamer::label("b1", "part-0.nt").to_string();
    let requestors = reader.lookup(&key).unwrap().unwrap();
    assert_eq!(
        requestors.into_iter().collect::<Vec<_>>(),
        vec!["http://example.org/org/A", "http://example.org/org/B"]
    );

    let docs = documents(&run_convert(&rules, &input, &artifact, &dir.path().join("bulk")));
    assert_eq!(docs.len(), 3);
    for id in ["http://example.org/org/A", "http://example.org/org/B"] {
        let (action, body) = &docs[id];
        assert_eq!(action["index"]["_index"], "orgs");
        assert_eq!(action["index"]["_type"], "org");
        assert_eq!(body["http://example.org/hasLocation"][LAT], "1.0");
    }
    let (_, c) = &docs["http://example.org/org/C"];
    assert!(!c.to_string().contains(LAT));
    assert!(!docs.contains_key("http://example.org/org/A/about"));
}

#[test]
fn test_resolved_corpus_keeps_the_join() {
    let dir = tempfile::tempdir().unwrap();
    let rules = rules();
    let mut lines = CORPUS.to_vec();
    lines.push("<http://example.org/org/A> <http://purl.org/dc/terms/creator> <http://example.org/person/1> .");
    lines.push("<http://example.org/person/1> <http://example.org/name> \"Ada\" .");
    let input = write_corpus(&dir.path().join("input"), "part-0.nt", &lines);

    let resolved = dir.path().join("resolved");
    let report = resolve_paths(&rules, &input, &resolved).unwrap();
    assert_eq!(report.counters.path_failures, 0);
    assert_eq!(report.counters.written, lines.len() as u64 + 1);

    let artifact = dir.path().join("index");
    build_index(&rules, &resolved, &artifact).unwrap();
    let docs = documents(&run_convert(&rules, &resolved, &artifact, &dir.path().join("bulk")));

    let (_, a) = &docs["http://example.org/org/A"];
    assert_eq!(a["http://example.org/creatorName"], "Ada");
    assert_eq!(a["http://example.org/hasLocation"][LAT], "1.0");
    let (_, b) = &docs["http://example.org/org/B"];
    assert_eq!(b["http://example.org/hasLocation"][LAT], "1.0");
}

#[test]
fn test_line_order_does_not_change_output() {
    let dir = tempfile::tempdir().unwrap();
    let rules = rules();
    let mut reversed = CORPUS.to_vec();
    reversed.reverse();

    let forward = write_corpus(&dir.path().join("forward"), "part-0.nt", CORPUS);
    let backward = write_corpus(&dir.path().join("backward"), "part-0.nt", &reversed);

    build_index(&rules, &forward, &dir.path().join("idx-f")).unwrap();
    build_index(&rules, &backward, &dir.path().join("idx-b")).unwrap();

    let first = run_convert(&rules, &forward, &dir.path().join("idx-f"), &dir.path().join("bulk-f"));
    let second = run_convert(&rules, &backward, &dir.path().join("idx-b"), &dir.path().join("bulk-b"));
    assert_eq!(first, second);
}

#[test]
fn test_malformed_lines_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let rules = rules();
    let extra = "<http://example.org/org/D> <http://example.org/name> \"D\" .";

    let clean = write_corpus(&dir.path().join("clean"), "part-0.nt", CORPUS);
    write_corpus(&clean, "part-1.nt", &[extra]);

    let corrupt = write_corpus(&dir.path().join("corrupt"), "part-0.nt", CORPUS);
    write_corpus(
        &corrupt,
        "part-1.nt",
        &[
            "<http://example.org/org/A> this is not a triple",
            extra,
            "<http://example.org/org/B> <http://example.org/name> \"B\" . trailing junk",
            "# trailing comment",
        ],
    );

    let report = build_index(&rules, &corrupt, &dir.path().join("idx-corrupt")).unwrap();
    assert_eq!(report.counters.malformed, 2);
    assert_eq!(report.counters.triples_read, CORPUS.len() as u64 + 1);
    build_index(&rules, &clean, &dir.path().join("idx-clean")).unwrap();

    let expected = run_convert(&rules, &clean, &dir.path().join("idx-clean"), &dir.path().join("bulk-clean"));
    let actual = run_convert(&rules, &corrupt, &dir.path().join("idx-corrupt"), &dir.path().join("bulk-corrupt"));
    let expected_docs = documents(&expected);
    assert_eq!(expected_docs.len(), 4);
    assert_eq!(documents(&actual), expected_docs);
    assert_eq!(actual, expected);
}

#[test]
fn test_suppressed_subject_never_requests_a_document() {
    let dir = tempfile::tempdir().unwrap();
    let rules = rules();
    let input = write_corpus(
        &dir.path().join("input"),
        "part-0.nt",
        &[
            "<http://example.org/org/A/about> <http://example.org/hasLocation> _:b1 .",
            "_:b1 <http://www.w3.org/2003/01/geo/wgs84_pos#lat> \"1.0\" .",
            "<http://example.org/org/C> <http://example.org/name> \"C\" .",
        ],
    );

    let report = build_index(&rules, &input, &dir.path().join("idx")).unwrap();
    assert_eq!(report.counters.written, 0);

    let bulk = run_convert(&rules, &input, &dir.path().join("idx"), &dir.path().join("bulk"));
    assert_eq!(ids(&bulk), vec!["http://example.org/org/C"]);
}

#[test]
fn test_shared_authority_is_emitted_once() {
    let dir = tempfile::tempdir().unwrap();
    let rules = ResolutionRules::parse(AUTHORITY_RULES, PREFIX).unwrap();
    let input = write_corpus(
        &dir.path().join("input"),
        "part-0.nt",
        &[
            "<http://example.org/org/A> <http://purl.org/dc/terms/creator> <http://d-nb.info/gnd/118540238> .",
            "<http://example.org/org/B> <http://purl.org/dc/terms/creator> <http://d-nb.info/gnd/118540238> .",
            "<http://example.org/org/C> <http://purl.org/dc/terms/creator> <http://d-nb.info/gnd/118540238> .",
            "<http://d-nb.info/gnd/118540238> <http://example.org/name> \"Goethe\" .",
        ],
    );
    build_index(&rules, &input, &dir.path().join("idx")).unwrap();

    let bulk = run_convert(&rules, &input, &dir.path().join("idx"), &dir.path().join("bulk"));
    let mut found = ids(&bulk);
    found.sort();
    assert_eq!(
        found,
        vec![
            "http://d-nb.info/gnd/118540238",
            "http://example.org/org/A",
            "http://example.org/org/B",
            "http://example.org/org/C",
        ]
    );

    let docs = documents(&bulk);
    let (_, authority) = &docs["http://d-nb.info/gnd/118540238"];
    assert_eq!(authority["http://example.org/name"], "Goethe");
    for id in ["http://example.org/org/A", "http://example.org/org/B", "http://example.org/org/C"] {
        let (_, body) = &docs[id];
        assert_eq!(body["http://purl.org/dc/terms/creator"]["@id"], "http://d-nb.info/gnd/118540238");
        assert!(!body.to_string().contains("Goethe"));
    }
}

#[test]
fn test_missing_index_degrades_to_primary_triples() {
    let dir = tempfile::tempdir().unwrap();
    let rules = rules();
    let input = write_corpus(&dir.path().join("input"), "part-0.nt", CORPUS);

    let docs = documents(&run_convert(&rules, &input, &dir.path().join("no-index"), &dir.path().join("bulk")));
    let (_, a) = &docs["http://example.org/org/A"];
    assert!(a["http://example.org/hasLocation"].get(LAT).is_none());
}

#[test]
fn test_child_documents_name_their_parent() {
    let dir = tempfile::tempdir().unwrap();
    let rules = rules();
    let input = write_corpus(
        &dir.path().join("input"),
        "items.nt",
        &[
            "<http://example.org/org/A> <http://example.org/name> \"A\" .",
            "<http://example.org/org/A/item/1> <http://example.org/itemOf> <http://example.org/org/A> .",
        ],
    );

    let docs = documents(&run_convert(&rules, &input, &dir.path().join("idx"), &dir.path().join("bulk")));
    let (action, _) = &docs["http://example.org/org/A/item/1"];
    assert_eq!(action["index"]["_type"], "item");
    assert_eq!(action["index"]["_parent"], "http://example.org/org/A");

    let (action, _) = &docs["http://example.org/org/A"];
    assert!(action["index"].get("_parent").is_none());
}

#[test]
fn test_outputs_are_published_atomically() {
    let dir = tempfile::tempdir().unwrap();
    let rules = rules();
    let input = write_corpus(&dir.path().join("input"), "part-0.nt", CORPUS);
    build_index(&rules, &input, &dir.path().join("idx")).unwrap();
    run_convert(&rules, &input, &dir.path().join("idx"), &dir.path().join("bulk"));

    let names: Vec<String> = fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert!(names.iter().all(|n| !n.contains("staging")), "leftover staging dir in {:?}", names);
}
