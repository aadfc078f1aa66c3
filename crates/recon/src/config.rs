use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::classify::{DepositClassifier, DepositCode};
use crate::error::ReconError;
use crate::header::SynonymTable;
use crate::model::{PhysicalField, SapField};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Deployment rules: column synonyms, header thresholds, the SAP deposit
/// exclusion list and the disposition classifier. `Default` is the built-in
/// rule set; a TOML file may override any section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RulesConfig {
    /// SAP deposits removed before aggregation (exact, case-sensitive).
    pub exclude_deposits: Vec<String>,
    pub physical: PhysicalLayout,
    pub sap: SapLayout,
    pub classifier: ClassifierConfig,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            exclude_deposits: strings(&[
                "CHEM WIP", "V_CHEWP", "SC_Nest", "SC_DSB", "SC_DSB_2", "TST", "MS WIP", "EM DSB",
            ]),
            physical: PhysicalLayout::default(),
            sap: SapLayout::default(),
            classifier: ClassifierConfig::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Sheet layouts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PhysicalLayout {
    /// Distinct synonym groups a row must hit to be taken as the header.
    pub min_score: usize,
    pub columns: PhysicalColumns,
}

impl Default for PhysicalLayout {
    fn default() -> Self {
        Self { min_score: 3, columns: PhysicalColumns::default() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PhysicalColumns {
    pub code: Vec<String>,
    pub description: Vec<String>,
    pub quantity: Vec<String>,
    pub unit: Vec<String>,
    pub disposition: Vec<String>,
    pub manufactured: Vec<String>,
    pub expiry: Vec<String>,
    pub lot: Vec<String>,
    pub observations: Vec<String>,
    pub sap_deposit: Vec<String>,
}

impl Default for PhysicalColumns {
    fn default() -> Self {
        Self {
            code: strings(&["CÓDIGO", "CODIGO"]),
            description: strings(&["DESCRIÇÃO", "DESCRICAO"]),
            quantity: strings(&["QTD. DISPONÍVEL", "QTD DISPONIVEL", "QTDE DISPONIVEL", "QTDE. DISPONIVEL"]),
            unit: strings(&["UNID.", "UNID", "UNIDADE"]),
            disposition: strings(&["DS. FSA", "DS FSA", "DS_FSA"]),
            manufactured: strings(&["(A) FABRICAÇÃO", "FABRICAÇÃO"]),
            expiry: strings(&["(A) VALIDADE", "VALIDADE"]),
            lot: strings(&["(A) LOTE", "LOTE"]),
            observations: strings(&["OBSERVAÇÕES"]),
            sap_deposit: strings(&["DEPÓSITO SAP"]),
        }
    }
}

impl PhysicalColumns {
    pub fn entries(&self) -> Vec<(PhysicalField, &[String])> {
        PhysicalField::ALL
            .into_iter()
            .map(|f| {
                let names = match f {
                    PhysicalField::Code => &self.code,
                    PhysicalField::Description => &self.description,
                    PhysicalField::Quantity => &self.quantity,
                    PhysicalField::Unit => &self.unit,
                    PhysicalField::Disposition => &self.disposition,
                    PhysicalField::Manufactured => &self.manufactured,
                    PhysicalField::Expiry => &self.expiry,
                    PhysicalField::Lot => &self.lot,
                    PhysicalField::Observations => &self.observations,
                    PhysicalField::SapDeposit => &self.sap_deposit,
                };
                (f, names.as_slice())
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SapLayout {
    pub min_score: usize,
    pub columns: SapColumns,
}

impl Default for SapLayout {
    fn default() -> Self {
        Self { min_score: 2, columns: SapColumns::default() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SapColumns {
    pub item_number: Vec<String>,
    pub item: Vec<String>,
    pub deposit: Vec<String>,
    pub lot: Vec<String>,
    pub quantity: Vec<String>,
    pub details: Vec<String>,
}

impl Default for SapColumns {
    fn default() -> Self {
        Self {
            item_number: strings(&["Nº do item", "N° do item", "No do item", "N do item"]),
            item: strings(&["Item"]),
            deposit: strings(&["Depósito", "Código de depósito"]),
            lot: strings(&["Lote"]),
            quantity: strings(&["Qtde por lote", "Qtd por lote", "Quantidade por lote"]),
            details: strings(&["detalhes analise", "detalhes"]),
        }
    }
}

impl SapColumns {
    pub fn entries(&self) -> Vec<(SapField, &[String])> {
        SapField::ALL
            .into_iter()
            .map(|f| {
                let names = match f {
                    SapField::ItemNumber => &self.item_number,
                    SapField::Item => &self.item,
                    SapField::Deposit => &self.deposit,
                    SapField::Lot => &self.lot,
                    SapField::Quantity => &self.quantity,
                    SapField::Details => &self.details,
                };
                (f, names.as_slice())
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Classifier
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClassifierConfig {
    /// Checked in order against the raw disposition text; first match wins.
    pub rules: Vec<ClassifierRule>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClassifierRule {
    pub pattern: String,
    pub code: DepositCode,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        let rule = |pattern: &str, code| ClassifierRule { pattern: pattern.into(), code };
        Self {
            rules: vec![
                rule("AVARIA", DepositCode::AvUdl),
                rule(r"DESCARTE|DESC\.*:", DepositCode::DescUdl),
                rule("AMOSTRA|AMOSTRAS|AMOSTRA COLETA", DepositCode::AmUdl),
                rule("BLENDA|PRODUÇÃO|PRODUCAO|MP", DepositCode::UdlMp),
                rule("VENCID", DepositCode::VUdl),
            ],
        }
    }
}

// ---------------------------------------------------------------------------
// Compiled rules
// ---------------------------------------------------------------------------

/// Immutable, ready-to-use form of [`RulesConfig`]. Safe to share across runs.
#[derive(Debug, Clone)]
pub struct Rules {
    pub physical: SynonymTable<PhysicalField>,
    pub physical_min_score: usize,
    pub sap: SynonymTable<SapField>,
    pub sap_min_score: usize,
    pub exclude_deposits: HashSet<String>,
    pub classifier: DepositClassifier,
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl RulesConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: RulesConfig =
            toml::from_str(input).map_err(|e| ReconError::RulesParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ReconError> {
        toml::to_string_pretty(self).map_err(|e| ReconError::RulesParse(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        let physical_fields = PhysicalField::ALL.len();
        if self.physical.min_score == 0 || self.physical.min_score > physical_fields {
            return Err(ReconError::RulesValidation(format!(
                "physical.min_score must be between 1 and {physical_fields}, got {}",
                self.physical.min_score
            )));
        }
        let sap_fields = SapField::ALL.len();
        if self.sap.min_score == 0 || self.sap.min_score > sap_fields {
            return Err(ReconError::RulesValidation(format!(
                "sap.min_score must be between 1 and {sap_fields}, got {}",
                self.sap.min_score
            )));
        }

        // Every field needs at least one spelling, required or not: auxiliary
        // columns are looked up before being created.
        for (field, names) in self.physical.columns.entries() {
            if names.iter().all(|n| n.trim().is_empty()) {
                return Err(ReconError::RulesValidation(format!(
                    "physical.columns.{} has no synonyms",
                    field.name()
                )));
            }
        }
        for (field, names) in self.sap.columns.entries() {
            if names.iter().all(|n| n.trim().is_empty()) {
                return Err(ReconError::RulesValidation(format!(
                    "sap.columns.{} has no synonyms",
                    field.name()
                )));
            }
        }

        for (i, rule) in self.classifier.rules.iter().enumerate() {
            if rule.pattern.is_empty() {
                return Err(ReconError::RulesValidation(format!(
                    "classifier rule #{} has an empty pattern",
                    i + 1
                )));
            }
        }

        Ok(())
    }

    /// Validate and build the run-time rules (normalized synonyms, compiled regexes).
    pub fn compile(&self) -> Result<Rules, ReconError> {
        self.validate()?;
        let classifier = DepositClassifier::new(
            self.classifier.rules.iter().map(|r| (r.pattern.as_str(), r.code)),
        )?;
        Ok(Rules {
            physical: SynonymTable::new(
                self.physical.columns.entries().into_iter().map(|(f, n)| (f, n.to_vec())),
            ),
            physical_min_score: self.physical.min_score,
            sap: SynonymTable::new(
                self.sap.columns.entries().into_iter().map(|(f, n)| (f, n.to_vec())),
            ),
            sap_min_score: self.sap.min_score,
            exclude_deposits: self.exclude_deposits.iter().cloned().collect(),
            classifier,
        })
    }
}

impl Rules {
    /// The built-in rule set.
    pub fn builtin() -> Result<Self, ReconError> {
        RulesConfig::default().compile()
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
