use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use igir::config::Config;
use igir::file::File;
use igir::indexer::Indexer;

#[test]
fn prefers_plain_on_disk_file_over_duplicate_in_output_dir() {
    let config = Config::default();
    let dir = tempfile::tempdir().unwrap();
    let output_dir = dir.path().join("output");
    std::fs::create_dir_all(&output_dir).unwrap();

    let input_path = dir.path().join("game.rom");
    std::fs::write(&input_path, b"identical bytes").unwrap();

    let output_path = output_dir.join("game.rom");
    std::fs::write(&output_path, b"identical bytes").unwrap();

    let input_file = Arc::new(File::on_disk(input_path.clone(), 16, None));
    let output_file = Arc::new(File::on_disk(output_path.clone(), 16, None));

    let files = vec![Arc::clone(&output_file), Arc::clone(&input_file)];
    let indexer = Indexer::build(&files, &config).unwrap();

    let fp = input_file.with_header_fingerprint(&config).unwrap().unwrap();
    let best = indexer.best(&fp, &output_dir).unwrap();

    assert_eq!(best.path(), input_path.as_path());
}

#[test]
fn lexicographic_tiebreak_is_deterministic_across_runs() {
    let config = Config::default();
    let dir = tempfile::tempdir().unwrap();

    let path_a = dir.path().join("a.rom");
    let path_b = dir.path().join("b.rom");
    for p in [&path_a, &path_b] {
        let mut f = std::fs::File::create(p).unwrap();
        f.write_all(b"same content").unwrap();
    }

    let file_a = Arc::new(File::on_disk(path_a.clone(), 12, None));
    let file_b = Arc::new(File::on_disk(path_b.clone(), 12, None));
    let files = vec![Arc::clone(&file_b), Arc::clone(&file_a)];
    let indexer = Indexer::build(&files, &config).unwrap();

    let fp = file_a.with_header_fingerprint(&config).unwrap().unwrap();
    let best = indexer.best(&fp, Path::new("/nonexistent-output")).unwrap();

    assert_eq!(best.path(), path_a.as_path());
}
