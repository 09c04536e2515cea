//! Expected input columns per record type.
//!
//! The catalog is guidance for whoever prepares the spreadsheet. The mapper
//! does not enforce it: a missing column simply maps to an absent value.

use serde::Serialize;

use super::RecordType;

const DRIVER_FIELDS: &[&str] = &[
    "idUsuario", "CPF", "RG", "ufRG", "expedRG", "dtExpedRG", "xNome", "dtNascto",
    "nomeMae", "Sexo", "Natural", "dtPrimHabilit", "CEP", "xLgr", "nro", "xBairro",
    "xCpl", "cMun", "nCNH", "nSegCNH", "catCNH", "dtVencCNH", "PIS", "xDocContrat",
    "tpFunc", "Email", "Telefone", "tpCartao", "nCartao", "tpOpera", "Raca",
];

const VEHICLE_FIELDS: &[&str] = &[
    "idUsuario", "tpVeic", "placa", "RENAVAM", "tara", "capKG", "capM3", "tpRod",
    "tpCar", "UF", "RNTRC", "xDocProp", "nEixos", "Cor", "AnoFabric", "AnoMod",
    "Chassi", "Marca", "Modelo", "cMunEmplac", "xDocAgreg", "xCNPJEmissor", "nTAG",
];

const CARRIER_FIELDS: &[&str] = &[
    "idUsuario", "tipoPessoa", "CPF", "RG", "ufRG", "expedRG", "dtExpedRG", "xNome",
    "dtNascto", "Email", "qtdDepend", "Telefone", "Sexo", "Natural", "Raca",
    "xCNPJEmpresa", "xIE", "xIM", "xRazaoSocial", "xNomeFant", "tpPart",
    "EmailEmpresa", "TelefoneEmpresa", "tpEmpresa", "CEP", "xLgr", "nro", "xBairro",
    "xCpl", "cMun", "RNTRC", "dtVencRNTRC", "tpProp", "tpCartao", "nCartao", "tpOpera",
];

const INDIVIDUAL_FIELDS: &[&str] = &[
    "idUsuario", "CPF", "RG", "ufRG", "expedRG", "dtExpedRG", "xNome", "dtNascto",
    "Email", "Telefone", "Sexo", "Natural", "Raca", "CEP", "xLgr", "nro",
    "xBairro", "xCpl", "cMun",
];

const COMPANY_FIELDS: &[&str] = &[
    "idUsuario", "xCNPJ", "xIE", "xIM", "xRazaoSocial", "xNomeFant", "tpPart",
    "Email", "Telefone", "CEP", "xLgr", "nro", "xBairro", "xCpl", "cMun",
];

/// Ordered list of the columns advertised for a record type.
pub fn expected_fields(record_type: RecordType) -> &'static [&'static str] {
    match record_type {
        RecordType::Driver => DRIVER_FIELDS,
        RecordType::Vehicle => VEHICLE_FIELDS,
        RecordType::Carrier => CARRIER_FIELDS,
        RecordType::Individual => INDIVIDUAL_FIELDS,
        RecordType::Company => COMPANY_FIELDS,
    }
}

/// How well a spreadsheet header matches the catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnCoverage {
    /// Catalog fields with no matching header, in catalog order.
    pub missing: Vec<String>,
    /// Headers that no mapping reads, in header order.
    pub unexpected: Vec<String>,
}

impl ColumnCoverage {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Compare spreadsheet headers against the catalog (exact, case-sensitive:
/// the mapper reads columns by their exact name).
pub fn column_coverage(record_type: RecordType, headers: &[String]) -> ColumnCoverage {
    let expected = expected_fields(record_type);

    let missing = expected
        .iter()
        .filter(|field| !headers.iter().any(|h| h == *field))
        .map(|field| field.to_string())
        .collect();

    let unexpected = headers
        .iter()
        .filter(|h| !expected.contains(&h.as_str()))
        .cloned()
        .collect();

    ColumnCoverage { missing, unexpected }
}
