use std::path::Path;
use std::time::{Duration, SystemTime};

use media_pack::{MediaDatabase, PackOptions, run};
use tempfile::tempdir;

fn write(path: &Path, content: &[u8]) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

fn set_mtime(path: &Path, time: SystemTime) {
    std::fs::File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(time)
        .unwrap();
}

fn setup(root: &Path) -> PackOptions {
    write(&root.join("media/shaders/spirv/blit.bin"), b"blob blob blob blob blob");
    write(&root.join("media/shaders/spirv/blit_0a1b2c3d.bin"), b"permutation");
    write(&root.join("media/shaders/spirv/post/tonemap.bin"), b"tonemap blob");
    write(&root.join("media/fonts/ui.ttf"), b"font data");
    write(
        &root.join("package_manifest.txt"),
        b"# demo media\nmedia/shaders/$(API) -> shaders\nmedia/shaders/$(API)\nmedia/fonts/ui.ttf  # font\n",
    );

    let mut options = PackOptions::new(root.join("package_manifest.txt"), root.join("media.db"));
    options.root = root.to_path_buf();
    options.defines = vec![("$(API)".to_string(), "spirv".to_string())];
    options
}

#[test]
fn test_pack_and_read_back() {
    let dir = tempdir().unwrap();
    let options = setup(dir.path());

    let summary = run(&options).unwrap();
    assert_eq!(summary.stored, 3);
    assert_eq!(summary.skipped, 1);

    let db = MediaDatabase::open(&options.database).unwrap();
    assert_eq!(
        db.names().collect::<Vec<_>>(),
        vec!["media/fonts/ui.ttf", "shaders/blit.bin", "shaders/post/tonemap.bin"]
    );

    let blit = db.get("shaders/blit.bin").unwrap();
    assert!(blit.compressed_size > 0);
    assert_eq!(db.get("media/fonts/ui.ttf").unwrap().compressed_size, 0);

    assert_eq!(db.read("shaders/blit.bin", None).unwrap(), b"blob blob blob blob blob");
    assert_eq!(db.read("media/fonts/ui.ttf", None).unwrap(), b"font data");
}

#[test]
fn test_unchanged_files_are_skipped() {
    let dir = tempdir().unwrap();
    let options = setup(dir.path());
    run(&options).unwrap();

    let summary = run(&options).unwrap();
    assert_eq!(summary.stored, 0);
    assert_eq!(summary.unchanged, 3);

    let font = dir.path().join("media/fonts/ui.ttf");
    write(&font, b"new font data");
    set_mtime(&font, SystemTime::now() + Duration::from_secs(120));

    let summary = run(&options).unwrap();
    assert_eq!(summary.stored, 1);
    let db = MediaDatabase::open(&options.database).unwrap();
    assert_eq!(db.read("media/fonts/ui.ttf", None).unwrap(), b"new font data");
}

#[test]
fn test_encrypted_pack() {
    let dir = tempdir().unwrap();
    let mut options = setup(dir.path());
    options.password = Some("hunter2".to_string());
    run(&options).unwrap();

    let db = MediaDatabase::open(&options.database).unwrap();
    let stored = db.get("shaders/post/tonemap.bin").unwrap();
    assert!(stored.encrypted);
    assert_eq!((stored.data.len() - 16) % 32, 0);

    assert_eq!(
        db.read("shaders/post/tonemap.bin", Some("hunter2")).unwrap(),
        b"tonemap blob"
    );
    assert_eq!(db.read("media/fonts/ui.ttf", Some("hunter2")).unwrap(), b"font data");
    assert!(db.read("media/fonts/ui.ttf", None).is_err());
}

#[test]
fn test_dry_run_leaves_no_database() {
    let dir = tempdir().unwrap();
    let mut options = setup(dir.path());
    options.dry_run = true;

    let summary = run(&options).unwrap();
    assert_eq!(summary.stored, 3);
    assert!(!options.database.exists());
}

#[test]
fn test_missing_manifest() {
    let dir = tempdir().unwrap();
    let options = PackOptions::new(dir.path().join("nope.txt"), dir.path().join("media.db"));
    assert!(run(&options).is_err());
}
