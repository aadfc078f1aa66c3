use std::collections::{BTreeMap, HashSet};

use crate::grid::Sheet;
use crate::header::HeaderMap;
use crate::model::{PhysicalField, RecordKey, SapField};

/// Deposit label used for SAP rows with a blank deposit.
pub const UNLABELLED_DEPOSIT: &str = "SAP";

/// Physical-side totals per key, plus every lot seen (upper-cased) for the
/// lot-only existence check on the SAP side.
#[derive(Debug, Clone, Default)]
pub struct PhysicalAggregate {
    pub totals: BTreeMap<RecordKey, f64>,
    pub lots: HashSet<String>,
}

/// SAP-side totals per key with the quantity held in each deposit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SapEntry {
    pub total: f64,
    /// Deposit label → quantity, in first-seen order.
    pub by_deposit: Vec<(String, f64)>,
}

impl SapEntry {
    fn add(&mut self, deposit: String, qty: f64) {
        self.total += qty;
        match self.by_deposit.iter_mut().find(|(d, _)| *d == deposit) {
            Some((_, q)) => *q += qty,
            None => self.by_deposit.push((deposit, qty)),
        }
    }

    /// Deposit label holding the largest quantity. Equal quantities keep the
    /// label seen first.
    pub fn dominant_deposit(&self) -> Option<&str> {
        let mut best: Option<&(String, f64)> = None;
        for entry in &self.by_deposit {
            if best.map_or(true, |b| entry.1 > b.1) {
                best = Some(entry);
            }
        }
        best.map(|(d, _)| d.as_str())
    }
}

/// Bucket key for a raw SAP deposit: blank → `SAP`, whitespace runs → `_`, upper-cased.
pub fn deposit_label(raw: &str) -> String {
    let raw = raw.trim();
    let raw = if raw.is_empty() { UNLABELLED_DEPOSIT } else { raw };
    raw.split_whitespace().collect::<Vec<_>>().join("_").to_uppercase()
}

/// Lot form used by the lot-only existence check.
pub fn lot_key(lot: &str) -> String {
    lot.trim().to_uppercase()
}

/// Remove SAP data rows whose deposit is in `excluded`. Returns the number of rows removed.
pub fn exclude_deposits(
    sheet: &mut Sheet,
    header_row: usize,
    deposit_col: usize,
    excluded: &HashSet<String>,
) -> usize {
    let doomed: Vec<usize> = (header_row + 1..=sheet.row_count())
        .filter(|&r| excluded.contains(sheet.get(r, deposit_col).as_text().trim()))
        .collect();

    for &r in doomed.iter().rev() {
        sheet.delete_row(r);
    }
    doomed.len()
}

/// Sum physical quantities per (code, lot). Rows without a full key are skipped.
pub fn aggregate_physical(sheet: &Sheet, columns: &HeaderMap<PhysicalField>) -> PhysicalAggregate {
    let code_col = columns.get(PhysicalField::Code);
    let lot_col = columns.get(PhysicalField::Lot);
    let qty_col = columns.get(PhysicalField::Quantity);

    let mut agg = PhysicalAggregate::default();
    for r in columns.first_data_row()..=sheet.row_count() {
        let lot = sheet.text_at(r, lot_col);
        let Some(key) = RecordKey::new(&sheet.text_at(r, code_col), &lot) else {
            continue;
        };
        let qty = qty_col.map_or(0.0, |c| sheet.get(r, c).as_quantity());
        *agg.totals.entry(key).or_insert(0.0) += qty;
        agg.lots.insert(lot_key(&lot));
    }
    agg
}

/// Sum SAP quantities per (item number, lot), bucketed by deposit label.
pub fn aggregate_sap(sheet: &Sheet, columns: &HeaderMap<SapField>) -> BTreeMap<RecordKey, SapEntry> {
    let code_col = columns.get(SapField::ItemNumber);
    let lot_col = columns.get(SapField::Lot);
    let qty_col = columns.get(SapField::Quantity);
    let deposit_col = columns.get(SapField::Deposit);

    let mut out: BTreeMap<RecordKey, SapEntry> = BTreeMap::new();
    for r in columns.first_data_row()..=sheet.row_count() {
        let Some(key) = RecordKey::new(&sheet.text_at(r, code_col), &sheet.text_at(r, lot_col)) else {
            continue;
        };
        let qty = qty_col.map_or(0.0, |c| sheet.get(r, c).as_quantity());
        let deposit = deposit_label(&sheet.text_at(r, deposit_col));
        out.entry(key).or_default().add(deposit, qty);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::CellValue;
    use crate::header::SynonymTable;
    use proptest::prelude::*;

    fn sap_sheet(rows: &[(&str, &str, &str, f64)]) -> Sheet {
        let mut sheet = Sheet::new("SAP");
        sheet.push_row(vec!["Nº do item".into(), "Depósito".into(), "Lote".into(), "Qtde por lote".into()]);
        for (item, dep, lot, qty) in rows {
            sheet.push_row(vec![(*item).into(), (*dep).into(), (*lot).into(), CellValue::Number(*qty)]);
        }
        sheet
    }

    fn sap_map(sheet: &Sheet) -> HeaderMap<SapField> {
        let table = SynonymTable::new([
            (SapField::ItemNumber, vec!["Nº do item"]),
            (SapField::Deposit, vec!["Depósito"]),
            (SapField::Lot, vec!["Lote"]),
            (SapField::Quantity, vec!["Qtde por lote"]),
        ]);
        HeaderMap::resolve(sheet, 1, &table)
    }

    fn key(code: &str, lot: &str) -> RecordKey {
        RecordKey::new(code, lot).unwrap()
    }

    #[test]
    fn sap_totals_and_dominant_deposit() {
        let sheet = sap_sheet(&[
            ("A1", "UDL", "L1", 60.0),
            ("A1", "AV UDL", "L1", 70.0),
            ("A1", "UDL", "L1", 40.0),
            ("B2", "", "L2", 5.0),
        ]);
        let aggs = aggregate_sap(&sheet, &sap_map(&sheet));
        assert_eq!(aggs.len(), 2);

        let a1 = &aggs[&key("A1", "L1")];
        assert_eq!(a1.total, 170.0);
        assert_eq!(a1.by_deposit, vec![("UDL".to_string(), 100.0), ("AV_UDL".to_string(), 70.0)]);
        assert_eq!(a1.dominant_deposit(), Some("UDL"));

        let b2 = &aggs[&key("B2", "L2")];
        assert_eq!(b2.dominant_deposit(), Some("SAP"));
    }

    #[test]
    fn dominant_tie_keeps_first_seen() {
        let sheet = sap_sheet(&[
            ("A1", "V UDL", "L1", 50.0),
            ("A1", "AV UDL", "L1", 50.0),
        ]);
        let aggs = aggregate_sap(&sheet, &sap_map(&sheet));
        assert_eq!(aggs[&key("A1", "L1")].dominant_deposit(), Some("V_UDL"));
    }

    #[test]
    fn blank_code_or_lot_excluded() {
        let sheet = sap_sheet(&[("", "UDL", "L1", 1.0), ("A1", "UDL", "  ", 1.0), (" A1 ", "UDL", " L1 ", 2.0)]);
        let aggs = aggregate_sap(&sheet, &sap_map(&sheet));
        assert_eq!(aggs.len(), 1);
        assert_eq!(aggs[&key("A1", "L1")].total, 2.0);
    }

    #[test]
    fn exclusion_removes_rows_bottom_up() {
        let mut sheet = sap_sheet(&[
            ("A1", "TST", "L1", 1.0),
            ("A1", "UDL", "L1", 2.0),
            ("A1", "TST", "L1", 3.0),
            ("A1", " MS WIP ", "L1", 4.0),
            ("A1", "tst", "L1", 5.0),
        ]);
        let excluded: HashSet<String> = ["TST", "MS WIP"].iter().map(|s| s.to_string()).collect();
        let removed = exclude_deposits(&mut sheet, 1, 2, &excluded);
        assert_eq!(removed, 3);
        assert_eq!(sheet.row_count(), 3);
        for r in 2..=sheet.row_count() {
            assert!(!excluded.contains(sheet.get(r, 2).as_text().trim()));
        }
        assert_eq!(sheet.get(3, 4).as_quantity(), 5.0);
    }

    #[test]
    fn exclusion_never_touches_header() {
        let mut sheet = Sheet::from_rows("S", vec![vec!["TST".into()], vec!["TST".into()]]);
        let excluded: HashSet<String> = ["TST".to_string()].into_iter().collect();
        assert_eq!(exclude_deposits(&mut sheet, 1, 1, &excluded), 1);
        assert_eq!(sheet.get(1, 1).as_text(), "TST");
    }

    #[test]
    fn physical_totals_and_lot_set() {
        let sheet = Sheet::from_rows(
            "F",
            vec![
                vec!["CÓDIGO".into(), "LOTE".into(), "QTD DISPONIVEL".into()],
                vec!["A1".into(), "l1".into(), CellValue::Number(10.0)],
                vec!["A1".into(), "l1".into(), CellValue::text("abc")],
                vec!["A1".into(), "l1".into(), CellValue::formula("B1*2", CellValue::Number(5.0))],
                vec!["".into(), "L9".into(), CellValue::Number(99.0)],
            ],
        );
        let table = SynonymTable::new([
            (PhysicalField::Code, vec!["CODIGO"]),
            (PhysicalField::Lot, vec!["LOTE"]),
            (PhysicalField::Quantity, vec!["QTD DISPONIVEL"]),
        ]);
        let map = HeaderMap::resolve(&sheet, 1, &table);
        let agg = aggregate_physical(&sheet, &map);
        assert_eq!(agg.totals.len(), 1);
        assert_eq!(agg.totals[&key("A1", "l1")], 15.0);
        assert!(agg.lots.contains("L1"));
        assert!(!agg.lots.contains("L9"));
    }

    #[test]
    fn deposit_labels() {
        assert_eq!(deposit_label(" av  udl "), "AV_UDL");
        assert_eq!(deposit_label(""), "SAP");
    }

    proptest! {
        #[test]
        fn totals_are_order_independent(
            rows in proptest::collection::vec((0u8..3, 0u8..3, 0u32..1000), 0..40),
            seed in any::<u64>(),
        ) {
            let build = |rows: &[(u8, u8, u32)]| {
                let data: Vec<(String, &str, String, f64)> = rows
                    .iter()
                    .map(|(c, l, q)| (format!("C{c}"), "UDL", format!("L{l}"), *q as f64))
                    .collect();
                let borrowed: Vec<(&str, &str, &str, f64)> =
                    data.iter().map(|(c, d, l, q)| (c.as_str(), *d, l.as_str(), *q)).collect();
                let sheet = sap_sheet(&borrowed);
                aggregate_sap(&sheet, &sap_map(&sheet))
                    .into_iter()
                    .map(|(k, e)| (k, e.total))
                    .collect::<BTreeMap<_, _>>()
            };

            let mut shuffled = rows.clone();
            // deterministic rotation as a cheap permutation
            if !shuffled.is_empty() {
                let n = (seed as usize) % shuffled.len();
                shuffled.rotate_left(n);
                shuffled.reverse();
            }
            prop_assert_eq!(build(&rows), build(&shuffled));
        }
    }
}
