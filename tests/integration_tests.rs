//! Integration tests for the IMS CLI
//!
//! These tests exercise the CLI commands end-to-end using assert_cmd.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Helper to get an ims command isolated from the user's config
fn ims(tmp: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("ims").unwrap();
    cmd.current_dir(tmp.path())
        .env("HOME", tmp.path())
        .env("XDG_CONFIG_HOME", tmp.path().join(".config"))
        .env_remove("IMS_DATABASE")
        .env_remove("IMS_DATA_DIR")
        .env_remove("IMS_LOG");
    cmd
}

/// Helper to create a test project in a temp directory
fn setup_test_project() -> TempDir {
    let tmp = TempDir::new().unwrap();
    ims(&tmp).arg("init").assert().success();
    tmp
}

fn write_file(tmp: &TempDir, name: &str, content: &str) -> String {
    let path = tmp.path().join(name);
    fs::write(&path, content).unwrap();
    path.display().to_string()
}

/// Run a command expected to print an envelope and parse it
fn envelope(tmp: &TempDir, args: &[&str]) -> Value {
    let output = ims(tmp).args(args).output().unwrap();
    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(&stdout)
        .unwrap_or_else(|e| panic!("not JSON ({}): {}", e, stdout))
}

const SUPPLIERS_CSV: &str = "supplier_name,contact_person,phone\n\
ACME Ltd,Ann,555-0100\n\
Beta Co,Bob,555-0101\n";

const PURCHASES_CSV: &str = "记录编号,入库日期,供应商名称,物料编码,物料名称,数量,单价,金额\n\
PI-001,2024-01-10,ACME Ltd,M-1,Bolt,10,2.5,25\n\
PI-002,2024-02-12,ACME Ltd,M-2,Nut,20,1,20\n\
PI-003,2024-02-15,Beta Co,M-1,Bolt,4,2.5,10\n";

const PAYMENTS_CSV: &str = "记录编号,付款日期,供应商名称,付款金额\n\
PAY-001,2024-02-01,ACME Ltd,30\n\
PAY-002,2024-03-01,Beta Co,15\n";

fn import_csv(tmp: &TempDir, collection: &str, name: &str, content: &str) {
    let path = write_file(tmp, name, content);
    ims(tmp).args(["import", collection, &path]).assert().success();
}

// ============================================================================
// CLI Basic Tests
// ============================================================================

#[test]
fn test_help_displays() {
    let tmp = TempDir::new().unwrap();
    ims(&tmp)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("import"))
        .stdout(predicate::str::contains("report"))
        .stdout(predicate::str::contains("call"));
}

#[test]
fn test_version_displays() {
    let tmp = TempDir::new().unwrap();
    ims(&tmp)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("ims"));
}

#[test]
fn test_unknown_command_fails() {
    let tmp = TempDir::new().unwrap();
    ims(&tmp).arg("frobnicate").assert().failure();
}

// ============================================================================
// Init Tests
// ============================================================================

#[test]
fn test_init_creates_project_structure() {
    let tmp = TempDir::new().unwrap();
    ims(&tmp)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized IMS project"));

    assert!(tmp.path().join(".ims").is_dir());
    assert!(tmp.path().join(".ims/config.yaml").is_file());
    assert!(tmp.path().join("data").is_dir());
    assert!(tmp.path().join("exports").is_dir());
}

#[test]
fn test_init_twice_warns() {
    let tmp = setup_test_project();
    ims(&tmp)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));
}

// ============================================================================
// Import Tests
// ============================================================================

#[test]
fn test_import_suppliers_csv() {
    let tmp = setup_test_project();
    let path = write_file(&tmp, "suppliers.csv", SUPPLIERS_CSV);
    ims(&tmp)
        .args(["import", "suppliers", &path])
        .assert()
        .success()
        .stdout(predicate::str::contains("Import Summary"));

    let listed = envelope(&tmp, &["data", "list", "suppliers", "-f", "json"]);
    assert_eq!(listed["success"], Value::Bool(true));
    assert_eq!(listed["data"].as_array().unwrap().len(), 2);
    assert_eq!(listed["pagination"]["total_count"], 2);
}

#[test]
fn test_import_outside_project_fails() {
    let tmp = TempDir::new().unwrap();
    let path = write_file(&tmp, "suppliers.csv", SUPPLIERS_CSV);
    ims(&tmp)
        .args(["import", "suppliers", &path])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no database configured"));

    ims(&tmp)
        .args(["data", "create", "suppliers", "--set", "supplier_name=ACME"])
        .assert()
        .failure();
}

#[test]
fn test_explicit_database_outside_project() {
    let tmp = TempDir::new().unwrap();
    let path = write_file(&tmp, "suppliers.csv", SUPPLIERS_CSV);
    ims(&tmp)
        .args(["--database", "standalone.db", "import", "suppliers", &path])
        .assert()
        .success();
    ims(&tmp)
        .args(["--database", "standalone.db", "data", "list", "suppliers", "--count"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("2"));
}

#[test]
fn test_import_dry_run_writes_nothing() {
    let tmp = setup_test_project();
    let path = write_file(&tmp, "suppliers.csv", SUPPLIERS_CSV);
    ims(&tmp)
        .args(["import", "suppliers", &path, "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Nothing was written"));

    ims(&tmp)
        .args(["data", "list", "suppliers", "--count"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("0"));
}

#[test]
fn test_duplicate_import_refused_without_force() {
    let tmp = setup_test_project();
    let path = write_file(&tmp, "suppliers.csv", SUPPLIERS_CSV);
    ims(&tmp).args(["import", "suppliers", &path]).assert().success();

    ims(&tmp)
        .args(["import", "suppliers", &path])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already imported"));

    ims(&tmp)
        .args(["import", "suppliers", &path, "--force"])
        .assert()
        .success();
    ims(&tmp)
        .args(["data", "list", "suppliers", "--count"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("2"));
}

#[test]
fn test_import_bad_rows_block_sheet() {
    let tmp = setup_test_project();
    let path = write_file(
        &tmp,
        "inventory.csv",
        "物料编码,物料名称,当前库存\nM-1,Bolt,12\nM-2,Nut,lots\n",
    );
    ims(&tmp)
        .args(["import", "inventory", &path])
        .assert()
        .failure()
        .stderr(predicate::str::contains("bad row"));
    ims(&tmp)
        .args(["data", "list", "inventory", "--count"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("0"));

    ims(&tmp)
        .args(["import", "inventory", &path, "--skip-errors", "--force"])
        .assert()
        .success();
    ims(&tmp)
        .args(["data", "list", "inventory", "--count"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("1"));
}

#[test]
fn test_import_template() {
    let tmp = setup_test_project();
    ims(&tmp)
        .args(["import", "suppliers", "--template"])
        .assert()
        .success()
        .stdout(predicate::str::contains("supplier_name"));
}

#[test]
fn test_import_keyless_lines_are_idempotent() {
    let tmp = setup_test_project();
    let path = write_file(
        &tmp,
        "sales.csv",
        "出库日期,客户名称,物料名称,数量,单价,金额\n2024-01-05,Carol,Bolt,2,5,10\n2024-01-06,Dave,Nut,1,3,3\n",
    );
    ims(&tmp).args(["import", "sales", &path]).assert().success();
    ims(&tmp)
        .args(["import", "sales", &path, "--force"])
        .assert()
        .success();
    ims(&tmp)
        .args(["data", "list", "sales", "--count"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("2"));
}

fn write_workbook(path: &Path) {
    write_workbook_with(path, false);
}

/// Workbook fixture; `bad_stock` makes one inventory row unparseable.
/// The inventory sheet is imported after the sales sheet.
fn write_workbook_with(path: &Path, bad_stock: bool) {
    use rust_xlsxwriter::Workbook;

    let mut workbook = Workbook::new();

    let inventory = workbook.add_worksheet();
    inventory.set_name("库存统计表").unwrap();
    for (col, header) in ["物料编码", "物料名称", "当前库存", "单价"].iter().enumerate() {
        inventory.write_string(0, col as u16, *header).unwrap();
    }
    let items = [("M-1", "Bolt", 50.0, 2.5), ("M-2", "Nut", 3.0, 1.0), ("M-3", "Gear", 0.0, 9.0)];
    for (i, (code, name, stock, price)) in items.iter().enumerate() {
        let row = (i + 1) as u32;
        inventory.write_string(row, 0, *code).unwrap();
        inventory.write_string(row, 1, *name).unwrap();
        if bad_stock && *code == "M-2" {
            inventory.write_string(row, 2, "lots").unwrap();
        } else {
            inventory.write_number(row, 2, *stock).unwrap();
        }
        inventory.write_number(row, 3, *price).unwrap();
    }

    let sales = workbook.add_worksheet();
    sales.set_name("销售出库明细表").unwrap();
    for (col, header) in ["记录编号", "出库日期", "客户名称", "物料编码", "物料名称", "数量", "单价", "金额"]
        .iter()
        .enumerate()
    {
        sales.write_string(0, col as u16, *header).unwrap();
    }
    let lines = [
        ("SO-1", "2024-03-01", "Carol", "M-1", "Bolt", 4.0, 5.0, 20.0),
        ("SO-2", "2024-03-09", "Dave", "M-2", "Nut", 2.0, 3.0, 6.0),
    ];
    for (i, (no, date, customer, code, name, qty, price, amount)) in lines.iter().enumerate() {
        let row = (i + 1) as u32;
        sales.write_string(row, 0, *no).unwrap();
        sales.write_string(row, 1, *date).unwrap();
        sales.write_string(row, 2, *customer).unwrap();
        sales.write_string(row, 3, *code).unwrap();
        sales.write_string(row, 4, *name).unwrap();
        sales.write_number(row, 5, *qty).unwrap();
        sales.write_number(row, 6, *price).unwrap();
        sales.write_number(row, 7, *amount).unwrap();
    }

    workbook.save(path).unwrap();
}

#[test]
fn test_import_all_from_workbook() {
    let tmp = setup_test_project();
    let path = tmp.path().join("data").join("book.xlsx");
    write_workbook(&path);

    ims(&tmp)
        .args(["import", "all", path.to_str().unwrap()])
        .assert()
        .success();

    ims(&tmp)
        .args(["data", "list", "inventory", "--count"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("3"));

    ims(&tmp)
        .args(["report", "inventory"])
        .assert()
        .success()
        .stdout(predicate::str::contains("# Inventory"))
        .stdout(predicate::str::contains("out_of_stock"))
        .stdout(predicate::str::contains("M-2"));

    let report = envelope(
        &tmp,
        &["report", "inventory", "--status", "low_stock", "-f", "json"],
    );
    assert_eq!(report["success"], Value::Bool(true));
    let rows = report["data"]["rows"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["material_code"], "M-2");

    let status = envelope(&tmp, &["status", "-f", "json"]);
    assert_eq!(status["data"]["collections"]["sales_outbound"], 2);
    assert_eq!(status["data"]["source_files"].as_array().unwrap().len(), 1);
}

#[test]
fn test_import_all_rolls_back_when_later_sheet_fails() {
    let tmp = setup_test_project();
    let path = tmp.path().join("data").join("book.xlsx");
    write_workbook_with(&path, true);

    ims(&tmp)
        .args(["import", "all", path.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nothing was written"));

    for collection in ["sales", "inventory"] {
        ims(&tmp)
            .args(["data", "list", collection, "--count"])
            .assert()
            .success()
            .stdout(predicate::str::starts_with("0"));
    }

    // No import was logged, so a rerun needs no --force
    ims(&tmp)
        .args(["import", "all", path.to_str().unwrap(), "--skip-errors"])
        .assert()
        .success();
    ims(&tmp)
        .args(["data", "list", "sales", "--count"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("2"));
    ims(&tmp)
        .args(["data", "list", "inventory", "--count"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("2"));
}

// ============================================================================
// Data CRUD Tests
// ============================================================================

#[test]
fn test_data_crud_envelopes() {
    let tmp = setup_test_project();

    let created = envelope(
        &tmp,
        &[
            "data", "create", "customers", "--set", "customer_name=Carol", "--set",
            "credit_limit=5000", "-f", "json",
        ],
    );
    assert_eq!(created["success"], Value::Bool(true));
    assert_eq!(created["method"], "data.create.customers");

    let got = envelope(&tmp, &["data", "get", "customers", "Carol", "-f", "json"]);
    assert_eq!(got["data"]["customer_name"], "Carol");
    assert_eq!(got["data"]["credit_limit"].as_f64(), Some(5000.0));

    let updated = envelope(
        &tmp,
        &["data", "update", "customers", "Carol", "--set", "phone=555-0199", "-f", "json"],
    );
    assert_eq!(updated["data"]["phone"], "555-0199");

    ims(&tmp)
        .args(["data", "delete", "customers", "Carol", "--yes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleted"));

    ims(&tmp)
        .args(["data", "get", "customers", "Carol", "-f", "json"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("NOT_FOUND"));
}

#[test]
fn test_data_create_duplicate_fails() {
    let tmp = setup_test_project();
    ims(&tmp)
        .args(["data", "create", "suppliers", "--set", "supplier_name=ACME"])
        .assert()
        .success();
    ims(&tmp)
        .args(["data", "create", "suppliers", "--set", "supplier_name=ACME", "-f", "json"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("\"success\": false"));
}

#[test]
fn test_data_export_csv() {
    let tmp = setup_test_project();
    import_csv(&tmp, "suppliers", "suppliers.csv", SUPPLIERS_CSV);
    let out = tmp.path().join("exports").join("suppliers.csv");
    ims(&tmp)
        .args(["data", "export", "suppliers", "-o", out.to_str().unwrap()])
        .assert()
        .success();
    let written = fs::read_to_string(&out).unwrap();
    assert!(written.contains("ACME Ltd"));
    assert!(written.contains("Beta Co"));
}

// ============================================================================
// Supplier and Material Tests
// ============================================================================

#[test]
fn test_supplier_codes_and_material_code() {
    let tmp = setup_test_project();
    import_csv(&tmp, "suppliers", "suppliers.csv", SUPPLIERS_CSV);

    ims(&tmp)
        .args(["sup", "assign-codes", "--yes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Assigned 2"));

    ims(&tmp)
        .args(["sup", "list", "-f", "tsv"])
        .assert()
        .success()
        .stdout(predicate::str::contains("01"))
        .stdout(predicate::str::contains("02"));

    ims(&tmp)
        .args(["mat", "code", "--type1", "1", "--type2", "3", "--supplier", "Beta Co"])
        .assert()
        .success()
        .stdout(predicate::str::contains("P-13-02-0000-001"));
}

#[test]
fn test_material_new_advances_sequence() {
    let tmp = setup_test_project();
    for name in ["Bolt", "Nut"] {
        ims(&tmp)
            .args(["mat", "new", "--name", name, "--supplier-code", "05"])
            .assert()
            .success();
    }
    ims(&tmp)
        .args(["mat", "code", "--supplier-code", "05"])
        .assert()
        .success()
        .stdout(predicate::str::contains("P-00-05-0000-003"));
}

// ============================================================================
// Report Tests
// ============================================================================

#[test]
fn test_supplier_reconciliation_report() {
    let tmp = setup_test_project();
    import_csv(&tmp, "purchases", "purchases.csv", PURCHASES_CSV);
    import_csv(&tmp, "payments", "payments.csv", PAYMENTS_CSV);

    let report = envelope(&tmp, &["report", "supplier-reconciliation", "-f", "json"]);
    assert_eq!(report["success"], Value::Bool(true));
    let rows = report["data"]["rows"].as_array().unwrap();
    let acme = rows.iter().find(|r| r["supplier_name"] == "ACME Ltd").unwrap();
    assert_eq!(acme["balance"].as_f64().unwrap(), 15.0);
    let beta = rows.iter().find(|r| r["supplier_name"] == "Beta Co").unwrap();
    assert_eq!(beta["status"], "overpaid");

    ims(&tmp)
        .args(["report", "supplier-reconciliation"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Supplier"))
        .stdout(predicate::str::contains("overpaid"));
}

#[test]
fn test_purchase_report_to_file() {
    let tmp = setup_test_project();
    import_csv(&tmp, "purchases", "purchases.csv", PURCHASES_CSV);

    let md = tmp.path().join("exports").join("purchases.md");
    ims(&tmp)
        .args(["report", "purchases", "-o", md.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Report written to"));
    assert!(fs::read_to_string(&md).unwrap().contains("ACME Ltd"));

    let csv = tmp.path().join("exports").join("purchases.csv");
    ims(&tmp)
        .args(["report", "purchases", "-o", csv.to_str().unwrap()])
        .assert()
        .success();
    assert!(fs::read_to_string(&csv).unwrap().starts_with("supplier_name"));
}

#[test]
fn test_purchase_summary_filters_by_date() {
    let tmp = setup_test_project();
    import_csv(&tmp, "purchases", "purchases.csv", PURCHASES_CSV);

    let summary = envelope(
        &tmp,
        &[
            "report", "purchases", "--summary", "--start-date", "2024-02-01", "-f", "json",
        ],
    );
    assert_eq!(summary["method"], "purchase_summary");
    assert_eq!(summary["data"]["total_amount"].as_f64().unwrap(), 30.0);
}

#[test]
fn test_report_summary_unsupported() {
    let tmp = setup_test_project();
    ims(&tmp)
        .args(["report", "inventory", "--summary"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no separate summary"));
}

// ============================================================================
// Call / Params / Normalize Tests
// ============================================================================

#[test]
fn test_call_dashboard_summary() {
    let tmp = setup_test_project();
    let result = envelope(&tmp, &["call", "get_dashboard_summary"]);
    assert_eq!(result["success"], Value::Bool(true));
    assert_eq!(result["method"], "get_dashboard_summary");
    assert!(result["generated_at"].is_string());
}

#[test]
fn test_call_legacy_analysis_type() {
    let tmp = setup_test_project();
    let result = envelope(&tmp, &["call", "--analysis-type", "overview"]);
    assert_eq!(result["method"], "get_dashboard_summary");
}

#[test]
fn test_call_unknown_method_fails() {
    let tmp = setup_test_project();
    ims(&tmp)
        .args(["call", "no_such_method"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("UNKNOWN_METHOD"));
}

#[test]
fn test_call_invalid_params() {
    let tmp = setup_test_project();
    ims(&tmp)
        .args(["call", "sales_report", "--params", "{not json"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("INVALID_JSON"));

    let reversed = r#"{"start_date": "2024-05-01", "end_date": "2024-01-01"}"#;
    ims(&tmp)
        .args(["call", "sales_report", "--params", reversed])
        .assert()
        .failure()
        .stdout(predicate::str::contains("INVALID_PARAMS"));
}

#[test]
fn test_call_paginates_past_end_to_last_page() {
    let tmp = setup_test_project();
    import_csv(&tmp, "purchases", "purchases.csv", PURCHASES_CSV);
    let result = envelope(
        &tmp,
        &["call", "purchase_report", "--params", r#"{"page": 99, "page_size": 2}"#],
    );
    assert_eq!(result["pagination"]["current_page"], 2);
    assert_eq!(result["pagination"]["total_pages"], 2);
}

#[test]
fn test_call_list() {
    let tmp = TempDir::new().unwrap();
    ims(&tmp)
        .args(["call", "--list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("get_dashboard_summary"))
        .stdout(predicate::str::contains("customer_reconciliation"));
}

#[test]
fn test_params_clamps_and_drops() {
    let tmp = TempDir::new().unwrap();
    let result = envelope(
        &tmp,
        &["params", "sales_report", "--params", r#"{"page_size": 100000, "bogus": true}"#],
    );
    assert_eq!(result["success"], Value::Bool(true));
    assert_eq!(result["data"]["page_size"], 500);
    assert!(result["data"].get("bogus").is_none());
}

#[test]
fn test_params_rejects_bad_choice() {
    let tmp = TempDir::new().unwrap();
    ims(&tmp)
        .args(["params", "inventory_report", "--params", r#"{"stock_status": "sideways"}"#])
        .assert()
        .failure()
        .stdout(predicate::str::contains("INVALID_PARAMS"));
}

#[test]
fn test_params_describe() {
    let tmp = TempDir::new().unwrap();
    ims(&tmp)
        .args(["params", "analyze_sales_trend"])
        .assert()
        .success()
        .stdout(predicate::str::contains("dimension"))
        .stdout(predicate::str::contains("quarter"));
}

#[test]
fn test_normalize_legacy_success() {
    let tmp = TempDir::new().unwrap();
    let output = ims(&tmp)
        .args(["normalize", "--method", "sales_report"])
        .write_stdin(r#"{"success": true, "rows": [1, 2], "total": 2}"#)
        .output()
        .unwrap();
    assert!(output.status.success());
    let value: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["success"], Value::Bool(true));
    assert_eq!(value["method"], "sales_report");
    assert_eq!(value["data"]["rows"], serde_json::json!([1, 2]));
}

#[test]
fn test_normalize_legacy_error() {
    let tmp = TempDir::new().unwrap();
    let output = ims(&tmp)
        .arg("normalize")
        .write_stdin(r#"{"error": "boom"}"#)
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    let value: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["success"], Value::Bool(false));
    assert_eq!(value["error"]["message"], "boom");
}

#[test]
fn test_normalize_legacy_failure_exits_nonzero() {
    let tmp = TempDir::new().unwrap();
    ims(&tmp)
        .arg("normalize")
        .write_stdin(r#"{"success": false, "message": "sheet missing"}"#)
        .assert()
        .failure()
        .stdout(predicate::str::contains("OPERATION_FAILED"))
        .stdout(predicate::str::contains("sheet missing"));
}

#[test]
fn test_normalize_invalid_json() {
    let tmp = TempDir::new().unwrap();
    ims(&tmp)
        .arg("normalize")
        .write_stdin("{oops")
        .assert()
        .failure()
        .stdout(predicate::str::contains("INVALID_JSON"));
}

// ============================================================================
// Config / Completions Tests
// ============================================================================

#[test]
fn test_config_set_and_show() {
    let tmp = setup_test_project();
    ims(&tmp)
        .args(["config", "set", "low_stock_threshold", "5"])
        .assert()
        .success();
    ims(&tmp)
        .args(["config", "show", "low_stock_threshold"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("5"));
    ims(&tmp)
        .args(["config", "set", "no_such_key", "1"])
        .assert()
        .failure();
}

#[test]
fn test_completions_bash() {
    let tmp = TempDir::new().unwrap();
    ims(&tmp)
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ims"));
}
