//! Integration tests for the bloodbank binary.
//!
//! These tests verify end-to-end behavior including:
//! - Inventory updates and request approval/rejection
//! - Donation scheduling against the eligibility window
//! - Role enforcement for the acting user
//! - CSV exports and store recovery behavior

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Helper to create a test data directory
fn setup_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// Helper to get the path to the CLI binary
fn cli() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("bloodbank"))
}

/// Pull the id printed on the `id:` line of a command's output
fn extract_id(stdout: &[u8]) -> String {
    String::from_utf8_lossy(stdout)
        .lines()
        .find_map(|l| l.trim().strip_prefix("id: ").map(str::to_string))
        .expect("output has no id line")
}

fn add_user(data_dir: &Path, username: &str, role: &str) -> String {
    let output = cli()
        .args(["user", "add", "--username", username, "--role", role])
        .arg("--email")
        .arg(format!("{}@example.org", username))
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    extract_id(&output)
}

fn stock(data_dir: &Path, admin: &str, blood_type: &str, ml: &str) {
    cli()
        .args(["inventory", "add", blood_type, ml, "--as", admin])
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .success();
}

fn submit(data_dir: &Path, recipient: &str, blood_type: &str, ml: &str) -> String {
    let output = cli()
        .args(["request", "submit", "--blood-type", blood_type, "--quantity", ml])
        .args(["--hospital", "City Hospital", "--contact", "555-0100"])
        .args(["--as", recipient])
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    extract_id(&output)
}

fn inventory_line(data_dir: &Path, blood_type: &str) -> String {
    let output = cli()
        .args(["inventory", "show"])
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    String::from_utf8_lossy(&output)
        .lines()
        .find(|l| l.split_whitespace().next() == Some(blood_type))
        .map(str::to_string)
        .expect("blood type missing from inventory")
}

#[test]
fn test_cli_help() {
    cli()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Blood donation coordination"));
}

#[test]
fn test_init_creates_seeded_store() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    cli()
        .arg("init")
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized store"));

    assert!(data_dir.join("bloodbank.json").exists());
    for blood_type in ["A+", "A-", "B+", "B-", "AB+", "AB-", "O+", "O-"] {
        assert!(inventory_line(data_dir, blood_type).ends_with(" 0ml"));
    }

    cli()
        .arg("init")
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("already initialized"));
}

#[test]
fn test_approve_flow() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    let admin = add_user(data_dir, "admin", "admin");
    let recipient = add_user(data_dir, "recipient", "recipient");
    stock(data_dir, &admin, "O+", "500");

    let request = submit(data_dir, &recipient, "O+", "300");

    // Admin hears about the new request
    cli()
        .args(["notifications", "--unread", "--as", admin.as_str()])
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("New blood request: 300ml of O+"));

    cli()
        .args(["request", "approve", request.as_str(), "--as", admin.as_str()])
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("approved"));

    assert!(inventory_line(data_dir, "O+").ends_with(" 200ml"));

    let store = fs::read_to_string(data_dir.join("bloodbank.json")).expect("Failed to read store");
    let db: serde_json::Value = serde_json::from_str(&store).expect("Store is not valid JSON");
    assert_eq!(db["requests"][0]["id"], request.as_str());
    assert_eq!(db["requests"][0]["status"], "approved");

    cli()
        .args(["notifications", "--unread", "--as", recipient.as_str()])
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Your blood request for 300ml of O+ has been approved.",
        ));

    cli()
        .args(["request", "list", "--as", recipient.as_str()])
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("approved"));
}

#[test]
fn test_insufficient_stock_leaves_request_pending() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    let admin = add_user(data_dir, "admin", "admin");
    let recipient = add_user(data_dir, "recipient", "recipient");
    stock(data_dir, &admin, "AB-", "100");
    let request = submit(data_dir, &recipient, "AB-", "250");

    cli()
        .args(["request", "approve", request.as_str(), "--as", admin.as_str()])
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "Insufficient AB- stock: 100ml available, 250ml requested",
        ));

    assert!(inventory_line(data_dir, "AB-").ends_with(" 100ml"));

    cli()
        .args(["request", "list", "--pending", "--as", admin.as_str()])
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains(request.as_str()));
}

#[test]
fn test_second_approval_fails() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    let admin = add_user(data_dir, "admin", "admin");
    let recipient = add_user(data_dir, "recipient", "recipient");
    stock(data_dir, &admin, "B+", "1000");
    let request = submit(data_dir, &recipient, "B+", "400");

    cli()
        .args(["request", "approve", request.as_str(), "--as", admin.as_str()])
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .success();

    cli()
        .args(["request", "approve", request.as_str(), "--as", admin.as_str()])
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .failure()
        .stderr(predicate::str::contains("is already approved"));

    assert!(inventory_line(data_dir, "B+").ends_with(" 600ml"));
}

#[test]
fn test_reject_does_not_touch_inventory() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    let admin = add_user(data_dir, "admin", "admin");
    let recipient = add_user(data_dir, "recipient", "recipient");
    stock(data_dir, &admin, "A-", "300");
    let request = submit(data_dir, &recipient, "A-", "200");

    cli()
        .args(["request", "reject", request.as_str(), "--as", admin.as_str()])
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .success();

    assert!(inventory_line(data_dir, "A-").ends_with(" 300ml"));

    cli()
        .args(["notifications", "--as", recipient.as_str()])
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("has been rejected"));
}

#[test]
fn test_donation_window() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    let donor = add_user(data_dir, "donor1", "donor");

    cli()
        .args(["donor", "create", "--blood-type", "O-", "--last-donation", "2024-01-01"])
        .args(["--city", "Springfield", "--as", donor.as_str()])
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .success();

    cli()
        .args(["donor", "schedule", "2024-02-20", "--as", donor.as_str()])
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .failure()
        .stderr(predicate::str::contains("not eligible until 2024-02-26"));

    cli()
        .args(["donor", "schedule", "2024-02-26", "--as", donor.as_str()])
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("Donation scheduled for 2024-02-26"));

    cli()
        .args(["donor", "show", "--as", donor.as_str()])
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("donations: 1"))
        .stdout(predicate::str::contains("Next eligible: 2024-04-22"));

    cli()
        .args(["donor", "search", "--city", "spring"])
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains(donor.as_str()));
}

#[test]
fn test_roles_enforced() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    let recipient = add_user(data_dir, "recipient", "recipient");

    cli()
        .args(["inventory", "add", "O+", "500", "--as", recipient.as_str()])
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .failure()
        .stderr(predicate::str::contains("A recipient may not update inventory"));

    cli()
        .args(["donor", "schedule", "2024-02-26", "--as", recipient.as_str()])
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .failure()
        .stderr(predicate::str::contains("may not schedule a donation"));
}

#[test]
fn test_missing_identity() {
    let temp_dir = setup_test_dir();

    cli()
        .args(["inventory", "add", "O+", "500"])
        .arg("--data-dir")
        .arg(temp_dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("requires --as"));
}

#[test]
fn test_invalid_blood_type() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    let admin = add_user(data_dir, "admin", "admin");

    cli()
        .args(["inventory", "add", "Q+", "500", "--as", admin.as_str()])
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid blood type"));
}

#[test]
fn test_export_csv() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    let admin = add_user(data_dir, "admin", "admin");
    let recipient = add_user(data_dir, "recipient", "recipient");
    stock(data_dir, &admin, "O+", "500");
    submit(data_dir, &recipient, "O+", "300");

    let inventory_csv = data_dir.join("reports/inventory.csv");
    let requests_csv = data_dir.join("reports/requests.csv");

    cli()
        .args(["export", "--as", admin.as_str()])
        .arg("--inventory")
        .arg(&inventory_csv)
        .arg("--requests")
        .arg(&requests_csv)
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("Exported 8 inventory rows"))
        .stdout(predicate::str::contains("Exported 1 requests"));

    let content = fs::read_to_string(&inventory_csv).expect("Failed to read CSV");
    assert!(content.starts_with("blood_type,quantity_ml,last_updated"));
    assert!(content.contains("O+,500,"));

    let content = fs::read_to_string(&requests_csv).expect("Failed to read CSV");
    assert!(content.contains(",pending,"));
}

#[test]
fn test_corrupted_store_is_not_replaced() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    let store_path = data_dir.join("bloodbank.json");
    fs::write(&store_path, "{ invalid json }}}}").expect("Failed to write corrupted store");

    cli()
        .args(["inventory", "show"])
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Store error"));

    let content = fs::read_to_string(&store_path).unwrap();
    assert_eq!(content, "{ invalid json }}}}");
}

#[test]
fn test_notifications_mark_all_read() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    let admin = add_user(data_dir, "admin", "admin");
    let recipient = add_user(data_dir, "recipient", "recipient");
    submit(data_dir, &recipient, "A+", "100");
    submit(data_dir, &recipient, "A+", "150");

    cli()
        .args(["notifications", "read-all", "--as", admin.as_str()])
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("Marked 2 notifications read"));

    cli()
        .args(["notifications", "--unread", "--as", admin.as_str()])
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("No notifications."));
}
