use disk_kit::{DiskConfig, DiskManager, StorageConfig};

fn main() {
    env_logger::init();

    let tmp = std::env::temp_dir();
    let root = tmp.join("my_disks");
    println!("Local disk root: {}", root.display());

    // `files` is a local disk rooted at `/tmp/my_disks` and is the default;
    // `scratch` lives in memory only
    let config = StorageConfig::new("files")
        .with_disk(DiskConfig::local("files", root.to_string_lossy()))
        .with_disk(DiskConfig::memory("scratch"));
    let mut manager = DiskManager::new(config);

    // the first access builds the backend, later accesses return the same one
    let files = manager.driver().unwrap();
    let scratch = manager.disk(Some("scratch")).unwrap();

    // missing parent directories are created on write
    files.put("docs/first.txt", b"Hello").unwrap();
    scratch.put("second.txt", b"World").unwrap();

    // paths may not leave the disk root
    assert!(files.get("../outside.txt").unwrap_err().is_invalid_path());

    // move the memory file onto the local disk
    let second = scratch.get("second.txt").unwrap();
    files.put("docs/second.txt", &second).unwrap();
    scratch.delete("second.txt");

    files.copy("docs/first.txt", "backup/first.txt").unwrap();
    files.rename("docs/second.txt", "backup/second.txt").unwrap();
    println!("Files: {:?}", files.files("", true).unwrap());

    let first = files.get("backup/first.txt").unwrap();
    let second = files.get("backup/second.txt").unwrap();
    println!(
        "{}, {}!",
        String::from_utf8(first).unwrap(),
        String::from_utf8(second).unwrap()
    );

    // removes everything that was created
    files.delete_directory("docs", true).unwrap();
    files.delete_directory("backup", true).unwrap();
}
