use std::path::{Path, PathBuf};

use assert_cmd::Command;
use lopdf::{Dictionary, Document, Object, Stream, dictionary};
use predicates::prelude::*;
use pretty_assertions::assert_eq;

const PAYSLIP: &[&str] = &[
    "Recibo de Pagamento Mensal Maio de 2023",
    "CPF: 123.456.789-09",
    "12345JOAO DA SILVAMatricula",
];

const BLANK: &[&str] = &["Pagina de observacoes"];

fn write_batch(dir: &Path, name: &str, pages: &[&[&str]]) -> PathBuf {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });

    let kids: Vec<Object> = pages
        .iter()
        .map(|lines| {
            let content: String = lines
                .iter()
                .enumerate()
                .map(|(i, line)| format!("BT /F1 10 Tf 50 {} Td ({}) Tj ET\n", 780 - 14 * i, line))
                .collect();
            let content_id =
                doc.add_object(Stream::new(Dictionary::new(), content.into_bytes()));
            doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            })
            .into()
        })
        .collect();

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Count" => kids.len() as i64,
            "Kids" => kids,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(595),
                Object::Integer(842),
            ],
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => font_id },
            },
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let path = dir.join(name);
    doc.save(&path).unwrap();
    path
}

fn folha(config: &Path) -> Command {
    let mut cmd = Command::cargo_bin("folha").unwrap();
    cmd.arg("--config").arg(config);
    cmd
}

fn empty_config(dir: &Path) -> PathBuf {
    let path = dir.join("config.json");
    std::fs::write(&path, "{}").unwrap();
    path
}

#[test]
fn split_writes_one_file_per_page() {
    let dir = tempfile::tempdir().unwrap();
    let config = empty_config(dir.path());
    let batch = write_batch(dir.path(), "lote.pdf", &[PAYSLIP, BLANK]);
    let out = dir.path().join("pages");

    folha(&config)
        .arg("split")
        .arg(&batch)
        .arg("--output-dir")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote 2 of 2 pages"));

    for name in ["lote_page_001.pdf", "lote_page_002.pdf"] {
        let page = Document::load(out.join(name)).unwrap();
        assert_eq!(page.get_pages().len(), 1);
    }
}

#[test]
fn extract_prints_records_as_json() {
    let dir = tempfile::tempdir().unwrap();
    let config = empty_config(dir.path());
    let batch = write_batch(dir.path(), "lote.pdf", &[PAYSLIP, BLANK]);

    let output = folha(&config)
        .arg("extract")
        .arg(&batch)
        .arg("--diagnostics")
        .output()
        .unwrap();
    assert!(output.status.success());

    let entries: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(entries[0]["record"]["documentClass"], "HOLERITE");
    assert_eq!(entries[0]["record"]["nationalId"], "123.456.789-09");
    assert_eq!(entries[0]["record"]["enrollmentNumber"], "12345");
    assert_eq!(
        entries[0]["fileName"],
        "123.456.789-09_Joao Da Silva_12345_5_2023.pdf"
    );
    assert_eq!(entries[0]["ruleHits"][0]["rule"], "cpf/anchored");
    assert_eq!(entries[1]["failure"]["reason"], "NO_NATIONAL_ID_FOUND");
}

#[test]
fn extract_rejects_missing_input() {
    let dir = tempfile::tempdir().unwrap();
    let config = empty_config(dir.path());

    folha(&config)
        .arg("extract")
        .arg(dir.path().join("nope.pdf"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Input file not found"));
}

#[test]
fn ingest_stores_pages_and_reports_duplicates() {
    let dir = tempfile::tempdir().unwrap();
    let config = empty_config(dir.path());
    write_batch(dir.path(), "lote.pdf", &[PAYSLIP, BLANK]);
    let root = dir.path().join("uploads");
    let pattern = dir.path().join("*.pdf");
    let summary = dir.path().join("summary.csv");

    folha(&config)
        .arg("ingest")
        .arg(pattern.to_str().unwrap())
        .arg("--root")
        .arg(&root)
        .arg("--summary")
        .arg(&summary)
        .assert()
        .success()
        .stdout(predicate::str::contains("SUCCESS"))
        .stdout(predicate::str::contains("NO_NATIONAL_ID_FOUND"));

    let stored = root
        .join("12345678909")
        .join("123.456.789-09_Joao Da Silva_12345_5_2023.pdf");
    assert!(stored.exists());
    assert!(stored.with_extension("json").exists());

    let csv = std::fs::read_to_string(&summary).unwrap();
    assert!(csv.starts_with("batch,page,status,national_id,file_name,error"));
    assert!(csv.contains("lote.pdf,1,SUCCESS,123.456.789-09"));

    folha(&config)
        .arg("ingest")
        .arg(pattern.to_str().unwrap())
        .arg("--root")
        .arg(&root)
        .assert()
        .success()
        .stdout(predicate::str::contains("DUPLICATE"));
}

#[test]
fn config_set_then_get() {
    let dir = tempfile::tempdir().unwrap();
    let config = empty_config(dir.path());

    folha(&config)
        .args(["config", "set", "pipeline.max_concurrent_pages", "8"])
        .assert()
        .success();

    folha(&config)
        .args(["config", "get", "pipeline.max_concurrent_pages"])
        .assert()
        .success()
        .stdout(predicate::str::contains("8"));

    folha(&config)
        .args(["config", "set", "pipeline.no_such_key", "1"])
        .assert()
        .failure();
}

#[test]
fn config_path_points_at_the_given_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = empty_config(dir.path());

    folha(&config)
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.json"))
        .stdout(predicate::str::contains("exists"));
}
