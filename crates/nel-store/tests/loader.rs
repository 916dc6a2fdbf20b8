use std::io::Write;

use nel_store::{AliasIndex, CandidateStore, LoadMode};
use tempfile::NamedTempFile;

fn fixture() -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    writeln!(file, "George Washington\tGeorge_Washington\t0.9").unwrap();
    writeln!(file, "Washington\tWashington,_D.C.\t0.6").unwrap();
    writeln!(file, "Genève\tGeneva\t1").unwrap();
    file
}

#[test]
fn loads_with_both_modes() {
    let file = fixture();
    for mode in [LoadMode::Mmap, LoadMode::Owned] {
        let index = AliasIndex::load_with_mode(file.path(), mode).expect("load aliases");
        assert_eq!(index.alias_count(), 3);
        let hits = index.search("George Washington");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "George_Washington");
        assert_eq!(hits[0].score, Some(0.9));
        assert_eq!(index.search("Genève")[0].id, "Geneva");
    }
}

#[test]
fn missing_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = AliasIndex::load(dir.path().join("nope.tsv"))
        .err()
        .expect("missing file rejected");
    assert!(err.to_string().contains("nope.tsv"));
}
