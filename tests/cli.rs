use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

fn bin() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("keyhaven"))
}

#[test]
fn add_classifies_and_reports_the_key() {
    let dir = tempdir().unwrap();
    let store = dir.path().join("keys.enc");

    bin()
        .arg("--store")
        .arg(&store)
        .args(["add", "--name", "GitHub", "--tag", "github"])
        .args(["--material", "ssh-ed25519 AAAC3NzaC1lZDI1 user@host"])
        .assert()
        .success()
        .stdout(predicate::str::contains("stored key 'GitHub' (Ed25519)"));

    assert!(store.exists());
}

#[test]
fn add_and_show_roundtrip() {
    let dir = tempdir().unwrap();
    let store = dir.path().join("keys.enc");

    bin()
        .arg("--store")
        .arg(&store)
        .args(["add", "--name", "Work", "--material", "ssh-rsa AAAAB3Nza deploy@ci"])
        .assert()
        .success();

    bin()
        .arg("--store")
        .arg(&store)
        .args(["show", "Work"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ssh-rsa AAAAB3Nza deploy@ci"));
}

#[test]
fn add_from_key_file() {
    let dir = tempdir().unwrap();
    let store = dir.path().join("keys.enc");
    let key_file = dir.path().join("id_ed25519.pub");
    std::fs::write(&key_file, "ssh-ed25519 AAAA user@host").unwrap();

    bin()
        .arg("--store")
        .arg(&store)
        .args(["add", "--name", "FromFile"])
        .arg("--file")
        .arg(&key_file)
        .assert()
        .success()
        .stdout(predicate::str::contains("(Ed25519)"));
}

#[test]
fn add_with_empty_name_fails() {
    let dir = tempdir().unwrap();
    let store = dir.path().join("keys.enc");

    bin()
        .arg("--store")
        .arg(&store)
        .args(["add", "--name", "", "--material", "ssh-rsa AAAA"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("key name cannot be empty"));

    assert!(!store.exists());
}

#[test]
fn list_shows_stored_names() {
    let dir = tempdir().unwrap();
    let store = dir.path().join("keys.enc");

    bin()
        .arg("--store")
        .arg(&store)
        .args(["add", "--name", "Alpha", "--material", "ssh-rsa AAAA"])
        .assert()
        .success();
    bin()
        .arg("--store")
        .arg(&store)
        .args(["add", "--name", "Beta", "--material", "ssh-rsa BBBB"])
        .assert()
        .success();

    bin()
        .arg("--store")
        .arg(&store)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("Alpha").and(predicate::str::contains("Beta")));

    bin()
        .arg("--store")
        .arg(&store)
        .args(["list", "--long"])
        .assert()
        .success()
        .stdout(predicate::str::contains("RSA"));
}

#[test]
fn list_empty_store() {
    let dir = tempdir().unwrap();
    let store = dir.path().join("keys.enc");

    bin()
        .arg("--store")
        .arg(&store)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("No keys stored."));
}

#[test]
fn edit_changes_tag() {
    let dir = tempdir().unwrap();
    let store = dir.path().join("keys.enc");

    bin()
        .arg("--store")
        .arg(&store)
        .args(["add", "--name", "GitHub", "--tag", "github"])
        .args(["--material", "ssh-ed25519 AAAC3"])
        .assert()
        .success();

    bin()
        .arg("--store")
        .arg(&store)
        .args(["edit", "GitHub", "--tag", "work"])
        .assert()
        .success()
        .stdout(predicate::str::contains("key 'GitHub' updated"));

    bin()
        .arg("--store")
        .arg(&store)
        .args(["list", "--long"])
        .assert()
        .success()
        .stdout(predicate::str::contains("work"));
}

#[test]
fn edit_without_changes_fails() {
    let dir = tempdir().unwrap();
    let store = dir.path().join("keys.enc");

    bin()
        .arg("--store")
        .arg(&store)
        .args(["add", "--name", "A", "--material", "ssh-rsa AAAA"])
        .assert()
        .success();

    bin()
        .arg("--store")
        .arg(&store)
        .args(["edit", "A"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nothing to edit"));
}

#[test]
fn remove_then_show_fails() {
    let dir = tempdir().unwrap();
    let store = dir.path().join("keys.enc");

    bin()
        .arg("--store")
        .arg(&store)
        .args(["add", "--name", "Old", "--material", "ssh-rsa AAAA"])
        .assert()
        .success();

    bin()
        .arg("--store")
        .arg(&store)
        .args(["remove", "Old"])
        .assert()
        .success()
        .stdout(predicate::str::contains("key removed"));

    bin()
        .arg("--store")
        .arg(&store)
        .args(["show", "Old"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no key named 'Old'"));
}

#[test]
fn export_and_import_between_stores() {
    let dir = tempdir().unwrap();
    let store_a = dir.path().join("a.enc");
    let store_b = dir.path().join("b.enc");
    let transfer = dir.path().join("keys.json");

    bin()
        .arg("--store")
        .arg(&store_a)
        .args(["add", "--name", "GitHub", "--material", "ssh-ed25519 AAAC3"])
        .assert()
        .success();

    bin()
        .arg("--store")
        .arg(&store_a)
        .arg("export")
        .arg(&transfer)
        .assert()
        .success()
        .stdout(predicate::str::contains("exported 1 key(s)"));

    bin()
        .arg("--store")
        .arg(&store_b)
        .arg("import")
        .arg(&transfer)
        .assert()
        .success()
        .stdout(predicate::str::contains("imported 1 key(s), skipped 0 duplicate(s)"));

    // Second import of the same file only finds duplicates.
    bin()
        .arg("--store")
        .arg(&store_b)
        .arg("import")
        .arg(&transfer)
        .assert()
        .success()
        .stdout(predicate::str::contains("imported 0 key(s), skipped 1 duplicate(s)"));
}

#[test]
fn encrypted_export_requires_the_transfer_password() {
    let dir = tempdir().unwrap();
    let store_a = dir.path().join("a.enc");
    let store_b = dir.path().join("b.enc");
    let transfer = dir.path().join("keys.enc.json");

    bin()
        .arg("--store")
        .arg(&store_a)
        .args(["add", "--name", "GitHub", "--material", "ssh-ed25519 AAAC3"])
        .assert()
        .success();

    bin()
        .env("KEYHAVEN_TRANSFER_PASSWORD", "transfer-pw")
        .arg("--store")
        .arg(&store_a)
        .args(["export", "--encrypt"])
        .arg(&transfer)
        .assert()
        .success();

    // The transfer file is an envelope, not plain JSON.
    let raw = std::fs::read_to_string(&transfer).unwrap();
    assert!(!raw.contains("ssh-ed25519"));

    bin()
        .env("KEYHAVEN_TRANSFER_PASSWORD", "wrong-pw")
        .arg("--store")
        .arg(&store_b)
        .args(["import", "--encrypted"])
        .arg(&transfer)
        .assert()
        .failure()
        .stderr(predicate::str::contains("wrong password or corrupted data"));

    bin()
        .env("KEYHAVEN_TRANSFER_PASSWORD", "transfer-pw")
        .arg("--store")
        .arg(&store_b)
        .args(["import", "--encrypted"])
        .arg(&transfer)
        .assert()
        .success()
        .stdout(predicate::str::contains("imported 1 key(s)"));
}

#[test]
fn scan_lists_and_imports_found_keys() {
    let dir = tempdir().unwrap();
    let store = dir.path().join("keys.enc");
    let ssh_dir = dir.path().join("ssh");
    std::fs::create_dir(&ssh_dir).unwrap();
    std::fs::write(ssh_dir.join("id_ed25519.pub"), "ssh-ed25519 AAAA user@host").unwrap();
    std::fs::write(ssh_dir.join("known_hosts"), "host ssh-rsa AAAA").unwrap();

    bin()
        .arg("--store")
        .arg(&store)
        .arg("scan")
        .arg("--dir")
        .arg(&ssh_dir)
        .assert()
        .success()
        .stdout(
            predicate::str::contains("id_ed25519.pub")
                .and(predicate::str::contains("known_hosts").not()),
        );

    bin()
        .arg("--store")
        .arg(&store)
        .args(["scan", "--import"])
        .arg("--dir")
        .arg(&ssh_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("imported 1 key(s)"));

    bin()
        .arg("--store")
        .arg(&store)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("id_ed25519.pub"));
}

#[test]
fn import_rejects_records_with_empty_fields() {
    let dir = tempdir().unwrap();
    let store = dir.path().join("keys.enc");
    let transfer = dir.path().join("empty.json");
    std::fs::write(&transfer, "{\"name\": \"\", \"key\": \"\"}").unwrap();

    bin()
        .arg("--store")
        .arg(&store)
        .arg("import")
        .arg(&transfer)
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be empty"));

    // Nothing was committed.
    bin()
        .arg("--store")
        .arg(&store)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("No keys stored."));
}

#[test]
fn import_of_malformed_file_fails() {
    let dir = tempdir().unwrap();
    let store = dir.path().join("keys.enc");
    let bogus = dir.path().join("bogus.json");
    std::fs::write(&bogus, "{\"foo\": 1}").unwrap();

    bin()
        .arg("--store")
        .arg(&store)
        .arg("import")
        .arg(&bogus)
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized import format"));
}

#[test]
fn show_accepts_the_printed_id() {
    let dir = tempdir().unwrap();
    let store = dir.path().join("keys.enc");

    let output = bin()
        .arg("--store")
        .arg(&store)
        .args(["add", "--name", "ById", "--material", "ssh-rsa AAAA"])
        .output()
        .unwrap();
    assert!(output.status.success());

    // The id is the last line of the add output.
    let stdout = String::from_utf8(output.stdout).unwrap();
    let id = stdout.lines().last().unwrap().trim().to_string();

    bin()
        .arg("--store")
        .arg(&store)
        .args(["show", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains("ssh-rsa AAAA"));
}
