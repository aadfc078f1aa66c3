use crate::model::{LotStatus, ReconSummary, RowAnnotation};

/// Compute summary statistics from the physical annotations and the SAP pass.
pub fn compute_summary(
    annotations: &[RowAnnotation],
    sap_rows: usize,
    sap_rows_excluded: usize,
    sap_rows_found: usize,
) -> ReconSummary {
    let mut summary = ReconSummary {
        physical_rows: annotations.len(),
        sap_rows,
        sap_rows_excluded,
        sap_rows_found,
        ..Default::default()
    };

    for a in annotations {
        match a.status {
            LotStatus::Matched => summary.matched += 1,
            LotStatus::Discrepancy { .. } => summary.discrepancies += 1,
            LotStatus::NotInSap => summary.not_in_sap += 1,
        }
        if a.needs_transfer() {
            summary.transfers += 1;
        }
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::DepositCode;
    use crate::model::RecordKey;

    fn annotation(status: LotStatus, current: Option<DepositCode>, target: DepositCode) -> RowAnnotation {
        RowAnnotation {
            row: 2,
            key: RecordKey::new("A", "L").unwrap(),
            current,
            target,
            deposit_cell: String::new(),
            observation: String::new(),
            status,
        }
    }

    #[test]
    fn summary_counts() {
        let rows = vec![
            annotation(LotStatus::Matched, Some(DepositCode::Udl), DepositCode::Udl),
            annotation(LotStatus::Matched, Some(DepositCode::Udl), DepositCode::VUdl),
            annotation(
                LotStatus::Discrepancy { diff: 3, total_sap: 7, total_physical: 10 },
                Some(DepositCode::AvUdl),
                DepositCode::AvUdl,
            ),
            annotation(LotStatus::NotInSap, None, DepositCode::DescUdl),
        ];
        let summary = compute_summary(&rows, 12, 2, 9);
        assert_eq!(summary.physical_rows, 4);
        assert_eq!(summary.matched, 2);
        assert_eq!(summary.discrepancies, 1);
        assert_eq!(summary.not_in_sap, 1);
        assert_eq!(summary.transfers, 1);
        assert_eq!(summary.sap_rows, 12);
        assert_eq!(summary.sap_rows_excluded, 2);
        assert_eq!(summary.sap_rows_found, 9);
    }
}
