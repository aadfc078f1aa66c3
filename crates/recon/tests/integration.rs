use std::path::PathBuf;

use stockrecon_recon::config::RulesConfig;
use stockrecon_recon::engine::{run, LOT_NOT_FOUND};
use stockrecon_recon::model::{AnalysisRequest, ExportSelection, LotStatus, Source};
use stockrecon_recon::prepare::{consolidate_sap, prepare_physical};
use stockrecon_recon::{CellValue, ReconError, Rules, Sheet, Workbook};

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn builtin() -> Rules {
    Rules::builtin().unwrap()
}

fn row(cells: &[&str]) -> Vec<CellValue> {
    cells
        .iter()
        .map(|c| match c.parse::<f64>() {
            Ok(n) => CellValue::Number(n),
            Err(_) => CellValue::text(*c),
        })
        .collect()
}

/// Physical count as it comes out of the warehouse template: a title row,
/// a blank row, then the header.
fn physical_workbook() -> Workbook {
    let sheet = Sheet::from_rows(
        "CONTAGEM",
        vec![
            row(&["CONTAGEM FÍSICA - JANEIRO"]),
            vec![],
            row(&["CÓDIGO", "DESCRIÇÃO", "QTD. DISPONÍVEL", "UNID.", "DS. FSA", "(A) LOTE"]),
            row(&["10001", "RESINA A", "60", "KG", "", "R-01"]),
            row(&["10001", "RESINA A", "40", "KG", "", "R-01"]),
            row(&["10002", "SOLVENTE", "25", "KG", "AMOSTRA COLETA", "S-07"]),
            row(&["10003", "PIGMENTO", "12", "KG", "VENCIDO EM 12/2025", "P-33"]),
            row(&["10004", "ADITIVO", "8", "KG", "DESCARTE", "X-90"]),
            row(&["", "SUBTOTAL", "145", "", "", ""]),
        ],
    );
    Workbook::new(vec![sheet])
}

fn sap_workbook() -> Workbook {
    let sheet = Sheet::from_rows(
        "Planilha1",
        vec![
            row(&["Estoque por lote"]),
            row(&["Nº do item", "Item", "Depósito", "Lote", "Qtde por lote"]),
            row(&["10001", "RESINA A", "UDL", "R-01", "100"]),
            row(&["10002", "SOLVENTE", "UDL", "S-07", "20"]),
            row(&["10002", "SOLVENTE", "TST", "S-07", "5"]),
            row(&["10003", "PIGMENTO", "UDL", "P-33", "12"]),
            row(&["99999", "OUTRO", "AV UDL", "x-90", "1"]),
        ],
    );
    Workbook::new(vec![Sheet::new("Capa"), sheet])
}

#[test]
fn full_analysis_annotates_both_sides() {
    let analysis = run(AnalysisRequest::new(physical_workbook(), sap_workbook()), &builtin()).unwrap();

    assert_eq!(analysis.meta.physical_sheet, "CONTAGEM");
    assert_eq!(analysis.meta.physical_header_row, 3);
    assert_eq!(analysis.meta.sap_header_row, 2);

    let s = &analysis.summary;
    assert_eq!(s.physical_rows, 5);
    assert_eq!(s.matched, 3);
    assert_eq!(s.discrepancies, 1);
    assert_eq!(s.not_in_sap, 1);
    assert_eq!(s.transfers, 2);
    assert_eq!(s.sap_rows_excluded, 1);
    assert_eq!(s.sap_rows, 4);

    let physical = analysis.physical.as_ref().unwrap();
    let sheet = physical.sheet("CONTAGEM").unwrap();
    // auxiliary columns appended after the last header cell
    assert_eq!(sheet.get(3, 7).as_text(), "depósito SAP");
    assert_eq!(sheet.get(3, 8).as_text(), "OBSERVAÇÕES");

    assert_eq!(sheet.get(4, 7).as_text(), "UDL");
    assert_eq!(sheet.get(4, 8).as_text(), "OK");
    assert_eq!(sheet.get(6, 7).as_text(), "UDL TRANSFERIR PARA AM UDL");
    assert_eq!(
        sheet.get(6, 8).as_text(),
        "DIFERENÇA DE 5 KG - ESTOQUE SAP 20 E ESTOQUE FÍSICO 25"
    );
    assert_eq!(sheet.get(7, 7).as_text(), "UDL TRANSFERIR PARA V UDL");
    assert_eq!(sheet.get(8, 7).as_text(), "DESC UDL");
    assert_eq!(sheet.get(8, 8).as_text(), LOT_NOT_FOUND);
    // subtotal row has no code and stays untouched
    assert!(sheet.get(9, 8).is_empty());

    let plain = analysis.sap_plain.as_ref().unwrap();
    assert_eq!(plain.get(1, 1).as_text(), "Nº do item");
    assert_eq!(plain.get(1, 6).as_text(), "detalhes analise");
    assert_eq!(plain.row_count(), 5);
    let details: Vec<String> = (2..=5).map(|r| plain.get(r, 6).as_text()).collect();
    // X-90 is counted physically under another code; lot-only match
    assert_eq!(details, vec!["OK", "OK", "OK", "OK"]);
}

#[test]
fn report_serializes() {
    let analysis = run(AnalysisRequest::new(physical_workbook(), sap_workbook()), &builtin()).unwrap();
    let json = serde_json::to_value(analysis.report()).unwrap();
    assert_eq!(json["summary"]["matched"], 3);
    assert_eq!(json["rows"][0]["key"]["code"], "10001");
    assert_eq!(json["rows"][0]["status"]["status"], "matched");
    assert_eq!(json["rows"][2]["status"]["status"], "discrepancy");
    assert_eq!(json["rows"][2]["status"]["diff"], 5);
    assert_eq!(json["rows"][4]["target"], "DESC_UDL");
}

#[test]
fn export_selection_limits_outputs() {
    let mut request = AnalysisRequest::new(physical_workbook(), sap_workbook());
    request.export = ExportSelection::Fisico;
    let analysis = run(request, &builtin()).unwrap();
    assert!(analysis.physical.is_some());
    assert!(analysis.sap_plain.is_none());
}

#[test]
fn sap_sheet_must_exist() {
    let sap = Workbook::new(vec![Sheet::new("Sheet1")]);
    let err = run(AnalysisRequest::new(physical_workbook(), sap), &builtin()).unwrap_err();
    assert_eq!(
        err,
        ReconError::SheetNotFound { source: Source::Sap, sheet: "Planilha1".into() }
    );
    assert!(err.to_string().contains("Planilha1"));
}

#[test]
fn missing_sap_column_is_reported() {
    let sap = Workbook::new(vec![Sheet::from_rows(
        "Planilha1",
        vec![row(&["Nº do item", "Depósito", "Lote"]), row(&["10001", "UDL", "R-01"])],
    )]);
    let err = run(AnalysisRequest::new(physical_workbook(), sap), &builtin()).unwrap_err();
    assert_eq!(err, ReconError::MissingColumn { source: Source::Sap, field: "quantity".into() });
}

#[test]
fn custom_rules_from_fixture() {
    let input = std::fs::read_to_string(fixtures_dir().join("plant-b.rules.toml")).unwrap();
    let rules = RulesConfig::from_toml(&input).unwrap().compile().unwrap();

    let physical = Workbook::new(vec![Sheet::from_rows(
        "Count",
        vec![
            row(&["ITEM CODE", "BATCH", "ON HAND", "STATUS"]),
            row(&["A-1", "B1", "10", "damaged drum"]),
            row(&["A-2", "B2", "4", "expired"]),
        ],
    )]);
    let sap = Workbook::new(vec![Sheet::from_rows(
        "Planilha1",
        vec![
            row(&["Nº do item", "Depósito", "Lote", "Quantidade"]),
            row(&["A-1", "UDL", "B1", "10"]),
            row(&["A-2", "RET_DSB", "B2", "4"]),
        ],
    )]);

    let analysis = run(AnalysisRequest::new(physical, sap), &rules).unwrap();
    let sheet = analysis.physical.as_ref().unwrap().sheet("Count").unwrap();
    assert_eq!(sheet.get(2, 5).as_text(), "UDL TRANSFERIR PARA AV UDL");
    assert_eq!(sheet.get(2, 6).as_text(), "OK");
    // RET_DSB rows are excluded, so A-2/B2 is unknown to SAP
    assert_eq!(sheet.get(3, 5).as_text(), "V UDL");
    assert_eq!(analysis.annotations[1].status, LotStatus::NotInSap);
}

#[test]
fn prepare_then_analyze() {
    let mut physical = physical_workbook();
    let sheet = physical.sheet_mut("CONTAGEM").unwrap();
    // header is on row 3, so the row-1 check adds the column on the title row
    assert!(prepare_physical(sheet));
    assert_eq!(sheet.get(1, 2).as_text(), "depósito SAP");

    let mut sap = sap_workbook();
    let consolidated = consolidate_sap(sap.sheet_mut("Planilha1").unwrap(), &builtin());
    assert_eq!(consolidated.removed, 1);

    let analysis = run(AnalysisRequest::new(physical, sap), &builtin()).unwrap();
    assert_eq!(analysis.summary.sap_rows_excluded, 0);
    assert_eq!(analysis.summary.matched, 3);
}
