use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

const HEADER: [&str; 7] = ["type", "user", "counterparty", "amount", "currency", "frequency", "at"];

#[test]
fn test_malformed_csv_handling() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("robustness_test.csv");
    let mut wtr = csv::Writer::from_path(&path).unwrap();
    wtr.write_record(HEADER).unwrap();

    wtr.write_record(["open", "alice", "", "", "NGN", "", ""]).unwrap();
    wtr.write_record(["deposit", "alice", "", "1.0", "", "", ""]).unwrap();
    // Invalid type
    wtr.write_record(["refund", "alice", "", "1.0", "", "", ""]).unwrap();
    // Text in amount field
    wtr.write_record(["deposit", "alice", "", "not_a_number", "", "", ""]).unwrap();
    // Unknown currency
    wtr.write_record(["open", "bob", "", "", "GBP", "", ""]).unwrap();
    // Valid deposit again
    wtr.write_record(["deposit", "alice", "", "2.0", "", "", ""]).unwrap();
    wtr.flush().unwrap();
    drop(wtr);

    let mut cmd = Command::new(cargo_bin!("fincore"));
    cmd.arg(&path);

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("Error reading command"))
        .stdout(predicate::str::contains("alice,NGN,3"))
        .stdout(predicate::str::contains("bob").not());
}

#[test]
fn test_rejected_commands_do_not_stop_processing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rejections.csv");
    let mut wtr = csv::Writer::from_path(&path).unwrap();
    wtr.write_record(HEADER).unwrap();

    wtr.write_record(["open", "alice", "", "", "NGN", "", ""]).unwrap();
    wtr.write_record(["open", "bob", "", "", "NGN", "", ""]).unwrap();
    wtr.write_record(["deposit", "alice", "", "100", "", "", ""]).unwrap();
    // Second wallet for the same user
    wtr.write_record(["open", "alice", "", "", "USD", "", ""]).unwrap();
    // Insufficient funds
    wtr.write_record(["transfer", "alice", "bob", "500", "", "", ""]).unwrap();
    // Negative amount
    wtr.write_record(["transfer", "alice", "bob", "-5", "", "", ""]).unwrap();
    // Self transfer
    wtr.write_record(["transfer", "alice", "alice", "5", "", "", ""]).unwrap();
    // Missing amount
    wtr.write_record(["withdraw", "alice", "", "", "", "", ""]).unwrap();
    // Nothing to cancel
    wtr.write_record(["cancel", "alice", "bob", "", "", "", ""]).unwrap();
    wtr.write_record(["transfer", "alice", "bob", "40", "", "", ""]).unwrap();
    wtr.flush().unwrap();
    drop(wtr);

    let output = Command::new(cargo_bin!("fincore")).arg(&path).output().unwrap();
    assert!(output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(stderr.matches("Error processing command").count(), 6);
    assert!(stderr.contains("insufficient funds"));

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("alice,NGN,60"));
    assert!(stdout.contains("bob,NGN,40"));
}

#[test]
fn test_overflowing_conversion_is_rejected_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("overflow.csv");
    let mut wtr = csv::Writer::from_path(&path).unwrap();
    wtr.write_record(HEADER).unwrap();

    wtr.write_record(["open", "alice", "", "", "USD", "", ""]).unwrap();
    wtr.write_record(["open", "bob", "", "", "NGN", "", ""]).unwrap();
    wtr.write_record(["transfer", "alice", "bob", "9000000000000000000000000000", "", "", ""])
        .unwrap();
    wtr.write_record(["deposit", "alice", "", "3", "", "", ""]).unwrap();
    wtr.flush().unwrap();
    drop(wtr);

    let output = Command::new(cargo_bin!("fincore")).arg(&path).output().unwrap();
    assert!(output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Error processing command: invalid amount"));
    assert!(!stderr.contains("panicked"));
    assert!(!stderr.contains("retryable"));

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("alice,USD,3"));
    assert!(stdout.contains("bob,NGN,0"));
}

#[test]
fn test_empty_input_prints_header_only() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.csv");
    std::fs::write(&path, HEADER.join(",") + "\n").unwrap();

    Command::new(cargo_bin!("fincore"))
        .arg(&path)
        .assert()
        .success()
        .stdout("user,currency,balance\n");
}
