use std::fmt;
use std::str::FromStr;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::error::ReconError;

// ---------------------------------------------------------------------------
// Deposit codes
// ---------------------------------------------------------------------------

/// Target storage deposits. `Udl` is the regular ("OK") bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DepositCode {
    #[serde(rename = "UDL")]
    Udl,
    #[serde(rename = "AV_UDL")]
    AvUdl,
    #[serde(rename = "DESC_UDL")]
    DescUdl,
    #[serde(rename = "AM_UDL")]
    AmUdl,
    #[serde(rename = "UDL_MP")]
    UdlMp,
    #[serde(rename = "V_UDL")]
    VUdl,
}

impl DepositCode {
    pub const ALL: [DepositCode; 6] = [
        Self::Udl,
        Self::AvUdl,
        Self::DescUdl,
        Self::AmUdl,
        Self::UdlMp,
        Self::VUdl,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Udl => "UDL",
            Self::AvUdl => "AV_UDL",
            Self::DescUdl => "DESC_UDL",
            Self::AmUdl => "AM_UDL",
            Self::UdlMp => "UDL_MP",
            Self::VUdl => "V_UDL",
        }
    }

    /// Human-readable form written into the sheets.
    pub fn short_label(self) -> &'static str {
        match self {
            Self::Udl => "UDL",
            Self::AvUdl => "AV UDL",
            Self::DescUdl => "DESC UDL",
            Self::AmUdl => "AM UDL",
            Self::UdlMp => "UDL MP",
            Self::VUdl => "V UDL",
        }
    }
}

impl fmt::Display for DepositCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DepositCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|code| code.as_str() == upper)
            .ok_or_else(|| format!("unknown deposit code '{s}'"))
    }
}

// ---------------------------------------------------------------------------
// Classifier
// ---------------------------------------------------------------------------

/// Ordered pattern rules over the disposition text. First match wins.
#[derive(Debug, Clone)]
pub struct DepositClassifier {
    rules: Vec<(Regex, DepositCode)>,
}

impl DepositClassifier {
    /// Compile `(pattern, code)` rules, case-insensitive.
    pub fn new<'a, I>(rules: I) -> Result<Self, ReconError>
    where
        I: IntoIterator<Item = (&'a str, DepositCode)>,
    {
        let rules = rules
            .into_iter()
            .map(|(pattern, code)| {
                RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .map(|rx| (rx, code))
                    .map_err(|e| {
                        ReconError::RulesValidation(format!("classifier pattern '{pattern}': {e}"))
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }

    /// Deposit the lot should live in. Text matching no rule (or empty) stays in `UDL`.
    pub fn classify(&self, text: &str) -> DepositCode {
        self.rules
            .iter()
            .find(|(rx, _)| rx.is_match(text))
            .map(|(_, code)| *code)
            .unwrap_or(DepositCode::Udl)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Labels already stored in SAP
// ---------------------------------------------------------------------------

/// Map a free-text SAP deposit label ("AV UDL", "av-udl", "AV_UDL", ...) to a code.
///
/// Separators are ignored; containment is checked in the order DESC, AV, AM,
/// V, MP so that e.g. `AVUDL` is not mistaken for `VUDL`. Anything else
/// non-empty is plain `UDL`.
pub fn normalize_deposit_label(label: &str) -> Option<DepositCode> {
    let v: String = label
        .to_uppercase()
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-' && *c != '_')
        .collect();
    if v.is_empty() {
        return None;
    }

    let code = if v.contains("DESCUDL") {
        DepositCode::DescUdl
    } else if v.contains("AVUDL") {
        DepositCode::AvUdl
    } else if v.contains("AMUDL") {
        DepositCode::AmUdl
    } else if v.contains("VUDL") {
        DepositCode::VUdl
    } else if v.contains("UDLMP") {
        DepositCode::UdlMp
    } else {
        DepositCode::Udl
    };
    Some(code)
}

/// Text of the physical "depósito SAP" cell for a lot currently in `current`
/// that should be in `target`.
pub fn compose_deposit_cell(current: Option<DepositCode>, target: DepositCode) -> String {
    match current {
        None => target.short_label().to_string(),
        Some(cur) if cur == target => cur.short_label().to_string(),
        Some(cur) => format!("{} TRANSFERIR PARA {}", cur.short_label(), target.short_label()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RulesConfig;
    use proptest::prelude::*;

    fn classifier() -> DepositClassifier {
        RulesConfig::default().compile().unwrap().classifier
    }

    #[test]
    fn default_rules() {
        let c = classifier();
        assert_eq!(c.classify("AVARIA NA EMBALAGEM"), DepositCode::AvUdl);
        assert_eq!(c.classify("para descarte"), DepositCode::DescUdl);
        assert_eq!(c.classify("DESC.: lote bloqueado"), DepositCode::DescUdl);
        assert_eq!(c.classify("amostra coleta"), DepositCode::AmUdl);
        assert_eq!(c.classify("Blenda"), DepositCode::UdlMp);
        assert_eq!(c.classify("uso na produção"), DepositCode::UdlMp);
        assert_eq!(c.classify("LOTE VENCIDO"), DepositCode::VUdl);
        assert_eq!(c.classify("vencida"), DepositCode::VUdl);
        assert_eq!(c.classify(""), DepositCode::Udl);
        assert_eq!(c.classify("OK"), DepositCode::Udl);
    }

    #[test]
    fn first_matching_rule_wins() {
        let c = classifier();
        // Matches both AVARIA and VENCID; AVARIA is listed first.
        assert_eq!(c.classify("VENCIDO COM AVARIA"), DepositCode::AvUdl);
        // "MP" is a bare substring pattern.
        assert_eq!(c.classify("AMOSTRA MP"), DepositCode::AmUdl);
        assert_eq!(c.classify("EMPILHADO VENCIDO"), DepositCode::UdlMp);
    }

    #[test]
    fn invalid_pattern_is_rejected() {
        let err = DepositClassifier::new([("(", DepositCode::Udl)]).unwrap_err();
        assert!(matches!(err, ReconError::RulesValidation(_)));
    }

    #[test]
    fn label_normalization() {
        assert_eq!(normalize_deposit_label("AV UDL"), Some(DepositCode::AvUdl));
        assert_eq!(normalize_deposit_label("av-udl"), Some(DepositCode::AvUdl));
        assert_eq!(normalize_deposit_label("AVUDL"), Some(DepositCode::AvUdl));
        assert_eq!(normalize_deposit_label("DESC_UDL"), Some(DepositCode::DescUdl));
        assert_eq!(normalize_deposit_label("AM UDL"), Some(DepositCode::AmUdl));
        assert_eq!(normalize_deposit_label("V_UDL"), Some(DepositCode::VUdl));
        assert_eq!(normalize_deposit_label("UDL_MP"), Some(DepositCode::UdlMp));
        assert_eq!(normalize_deposit_label("UD_LOG"), Some(DepositCode::Udl));
        assert_eq!(normalize_deposit_label("SAP"), Some(DepositCode::Udl));
        assert_eq!(normalize_deposit_label("  "), None);
    }

    #[test]
    fn short_labels() {
        assert_eq!(DepositCode::AvUdl.short_label(), "AV UDL");
        assert_eq!(DepositCode::UdlMp.short_label(), "UDL MP");
        assert_eq!("v_udl".parse::<DepositCode>(), Ok(DepositCode::VUdl));
        assert!("XYZ".parse::<DepositCode>().is_err());
    }

    #[test]
    fn compose_cell() {
        assert_eq!(compose_deposit_cell(None, DepositCode::AvUdl), "AV UDL");
        assert_eq!(compose_deposit_cell(Some(DepositCode::Udl), DepositCode::Udl), "UDL");
        assert_eq!(
            compose_deposit_cell(Some(DepositCode::Udl), DepositCode::VUdl),
            "UDL TRANSFERIR PARA V UDL"
        );
    }

    proptest! {
        #[test]
        fn classification_is_total_and_deterministic(s in "\\PC{0,60}") {
            let c = classifier();
            let first = c.classify(&s);
            prop_assert!(DepositCode::ALL.contains(&first));
            prop_assert_eq!(c.classify(&s), first);
        }
    }
}
