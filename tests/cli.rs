//! CLI integration tests for promokit commands.
//!
//! Each test uses an isolated temp directory for the database, ensuring tests
//! can run in parallel safely.

#![allow(deprecated)] // Command::cargo_bin deprecation only affects custom build dirs

use std::path::Path;

use assert_cmd::Command;
use assert_fs::TempDir;
use assert_fs::prelude::*;
use chrono::Utc;
use predicates::prelude::*;
use promokit::store::{SqliteStore, Store};
use promokit::types::{Business, User};
use serde_json::Value;

struct TestContext {
    temp_dir: TempDir,
}

impl TestContext {
    fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("failed to create temp dir"),
        }
    }

    fn data_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    fn data_dir_str(&self) -> String {
        self.data_dir().to_string_lossy().to_string()
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("promokit").expect("failed to find binary");
        cmd.env("NO_COLOR", "1");
        cmd
    }

    fn init(&self) -> assert_cmd::assert::Assert {
        self.cmd()
            .args([
                "admin",
                "init",
                "--data-dir",
                &self.data_dir_str(),
                "--non-interactive",
            ])
            .assert()
    }

    fn store(&self) -> SqliteStore {
        SqliteStore::new(self.data_dir().join("promokit.db")).expect("failed to open store")
    }

    /// Seeds an owner and a business directly in the database.
    fn seed_business(&self, slug: &str) {
        let store = self.store();
        let now = Utc::now();
        store
            .create_user(&User {
                id: "owner-1".to_string(),
                email: "owner@example.com".to_string(),
                display_name: "Owner".to_string(),
                created_at: now,
                updated_at: now,
            })
            .expect("failed to create user");
        store
            .create_business(&Business {
                id: "biz-1".to_string(),
                owner_id: "owner-1".to_string(),
                name: "Duka".to_string(),
                slug: slug.to_string(),
                industry: String::new(),
                location: String::new(),
                created_at: now,
            })
            .expect("failed to create business");
    }

    fn import(&self, kind: &str, slug: &str, csv: &str) -> assert_cmd::assert::Assert {
        let file = self.temp_dir.child(format!("{kind}.csv"));
        file.write_str(csv).expect("failed to write csv");

        self.cmd()
            .args(["import", kind, "--business", slug, "--file"])
            .arg(file.path())
            .args(["--data-dir", &self.data_dir_str()])
            .assert()
    }
}

fn stdout_json(assert: &assert_cmd::assert::Assert) -> Value {
    serde_json::from_slice(&assert.get_output().stdout).expect("failed to parse JSON")
}

#[test]
fn test_init_writes_admin_token() {
    let ctx = TestContext::new();

    ctx.init()
        .success()
        .stdout(predicate::str::contains("Admin token"));

    let token_file = ctx.temp_dir.child(".admin_token");
    token_file.assert(predicate::str::starts_with("promokit_"));
    ctx.temp_dir.child("promokit.db").assert(predicate::path::exists());
    assert!(ctx.store().has_admin_token().unwrap());
}

#[test]
fn test_init_twice_fails() {
    let ctx = TestContext::new();
    ctx.init().success();

    ctx.init()
        .failure()
        .stderr(predicate::str::contains("already initialized"));
}

#[test]
fn test_user_create() {
    let ctx = TestContext::new();
    ctx.init().success();

    let args = [
        "admin",
        "user",
        "create",
        "--email",
        "Owner@Example.com",
        "--data-dir",
    ];

    ctx.cmd()
        .args(args)
        .arg(ctx.data_dir())
        .assert()
        .success()
        .stdout(predicate::str::contains("Created user 'owner@example.com'"))
        .stdout(predicate::str::contains("promokit_"));

    ctx.cmd()
        .args(args)
        .arg(ctx.data_dir())
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_user_create_rejects_bad_email() {
    let ctx = TestContext::new();
    ctx.init().success();

    ctx.cmd()
        .args(["admin", "user", "create", "--email", "not-an-email", "--data-dir"])
        .arg(ctx.data_dir())
        .assert()
        .failure();
}

#[test]
fn test_import_requires_init() {
    let ctx = TestContext::new();

    ctx.import("products", "duka", "name,price\nSoap,100\n")
        .failure()
        .stderr(predicate::str::contains("not initialized"));
}

#[test]
fn test_import_unknown_business() {
    let ctx = TestContext::new();
    ctx.init().success();

    ctx.import("products", "nope", "name,price\nSoap,100\n")
        .failure()
        .stderr(predicate::str::contains("Business 'nope' not found"));
}

#[test]
fn test_import_products_then_sales() {
    let ctx = TestContext::new();
    ctx.init().success();
    ctx.seed_business("duka");

    let assert = ctx
        .import("products", "duka", "name,price\nSoap,100\n,50\n")
        .success();
    let report = stdout_json(&assert);
    assert_eq!(report["message"], "Product import completed successfully");
    assert_eq!(report["summary"]["created"], 1);
    assert_eq!(report["summary"]["errors"], 1);

    let assert = ctx
        .import("sales", "duka", "product_name,quantity,date\nSoap,3,2024-01-01\n")
        .success();
    let report = stdout_json(&assert);
    assert_eq!(report["message"], "Sales data import completed");
    assert_eq!(report["results"]["cleaned"], 1);

    let sales = ctx.store().list_sales("biz-1").unwrap();
    assert_eq!(sales.len(), 1);
    assert_eq!(sales[0].revenue, 300.0);
}

#[test]
fn test_import_malformed_csv_fails() {
    let ctx = TestContext::new();
    ctx.init().success();
    ctx.seed_business("duka");

    ctx.import("products", "duka", "name,,price\nSoap,x,100\n")
        .failure()
        .stderr(predicate::str::contains("unable to read CSV file"));
}

#[test]
fn test_serve_requires_init() {
    let ctx = TestContext::new();

    ctx.cmd()
        .args(["serve", "--data-dir", &ctx.data_dir_str()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not initialized"));
}

#[test]
fn test_serve_rejects_unknown_config_keys() {
    let ctx = TestContext::new();
    ctx.init().success();
    ctx.temp_dir
        .child("promokit.toml")
        .write_str("colour = \"red\"\n")
        .unwrap();

    ctx.cmd()
        .args(["serve", "--data-dir", &ctx.data_dir_str()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid configuration"));
}
