//! Row mapper: flat spreadsheet row → nested cadastro record.
//!
//! One mapping table per record type. Mapping is pure and never fails:
//! missing columns become absent values, which the serializer omits.
//!
//! ```text
//! RawRow { CPF, xNome, CEP, cMun, tpCartao, ... }
//!    │
//!    ▼  map(row, RecordType::Driver)
//! MappedRecord { CPF, xNome, Ender { CEP, cMun }, Cartao { tpCartao }, ... }
//! ```

use crate::models::{MappedRecord, RawRow, RawValue, RecordType};

use super::municipality::{municipalities, MunicipalityTable};
use super::normalize::{clean_document, excel_date_to_iso};

/// Column holding the carrier person kind (`1` individual, `2` company).
pub const CARRIER_DISCRIMINATOR: &str = "tipoPessoa";

// =============================================================================
// Carrier party
// =============================================================================

/// The person-or-company part of a carrier record.
#[derive(Debug, Clone, PartialEq)]
pub enum CarrierParty {
    /// `tipoPessoa = 1`: emitted as `pFisica`.
    Individual(MappedRecord),
    /// `tipoPessoa = 2`: emitted as `pJuridica`.
    Company(MappedRecord),
    /// Unknown discriminator: only the common carrier fields are emitted.
    Bare,
}

impl CarrierParty {
    /// Select and build the party sub-record for a carrier row.
    pub fn from_row(row: &RawRow) -> Self {
        match discriminator(row.get(CARRIER_DISCRIMINATOR)) {
            Some(1) => Self::Individual(carrier_individual(row)),
            Some(2) => Self::Company(carrier_company(row)),
            _ => Self::Bare,
        }
    }

    /// Element name and content, if any.
    pub fn into_element(self) -> Option<(&'static str, MappedRecord)> {
        match self {
            Self::Individual(record) => Some(("pFisica", record)),
            Self::Company(record) => Some(("pJuridica", record)),
            Self::Bare => None,
        }
    }
}

/// Accepts `1`, `2` as numbers or text.
fn discriminator(value: &RawValue) -> Option<u8> {
    match value {
        RawValue::Number(n) if *n == 1.0 => Some(1),
        RawValue::Number(n) if *n == 2.0 => Some(2),
        RawValue::Text(s) => match s.trim() {
            "1" => Some(1),
            "2" => Some(2),
            _ => None,
        },
        _ => None,
    }
}

fn carrier_individual(row: &RawRow) -> MappedRecord {
    let mut record = MappedRecord::new();
    copy(&mut record, row, &[
        "CPF", "RG", "ufRG", "expedRG", "dtExpedRG", "xNome", "dtNascto", "Email", "qtdDepend",
    ]);
    record.push_value("Telefone", clean_document(row.get("Telefone")));
    copy(&mut record, row, &["Sexo", "Natural", "Raca"]);
    record
}

fn carrier_company(row: &RawRow) -> MappedRecord {
    let mut record = MappedRecord::new();
    record.push_value("xCNPJ", clean_document(row.get("xCNPJEmpresa")));
    copy(&mut record, row, &["xIE", "xIM", "xRazaoSocial", "xNomeFant", "tpPart"]);
    record.push_value("Email", row.get("EmailEmpresa").clone());
    record.push_value("Telefone", clean_document(row.get("TelefoneEmpresa")));
    copy(&mut record, row, &["tpEmpresa"]);
    record
}

// =============================================================================
// Row mapper
// =============================================================================

/// Maps raw rows using a given municipality table.
#[derive(Debug, Clone, Copy)]
pub struct RowMapper<'a> {
    municipalities: &'a MunicipalityTable,
}

impl<'a> RowMapper<'a> {
    pub fn new(municipalities: &'a MunicipalityTable) -> Self {
        Self { municipalities }
    }

    /// Map one row for the given record type.
    pub fn map(&self, row: &RawRow, record_type: RecordType) -> MappedRecord {
        match record_type {
            RecordType::Driver => self.map_driver(row),
            RecordType::Vehicle => self.map_vehicle(row),
            RecordType::Carrier => self.map_carrier(row),
            RecordType::Individual => self.map_individual(row),
            RecordType::Company => self.map_company(row),
        }
    }

    fn map_driver(&self, row: &RawRow) -> MappedRecord {
        let mut record = MappedRecord::new();
        copy(&mut record, row, &[
            "idUsuario", "CPF", "RG", "ufRG", "expedRG", "dtExpedRG", "xNome",
        ]);
        record.push_value("dtNascto", excel_date_to_iso(row.get("dtNascto")));
        copy(&mut record, row, &["nomeMae", "Sexo", "Natural", "dtPrimHabilit"]);
        record.push_group("Ender", self.address(row));
        copy(&mut record, row, &["nCNH", "nSegCNH", "catCNH"]);
        record.push_value("dtVencCNH", excel_date_to_iso(row.get("dtVencCNH")));
        copy(&mut record, row, &["PIS", "xDocContrat", "tpFunc", "Email", "Telefone"]);
        record.push_group("Cartao", card(row));
        copy(&mut record, row, &["Raca"]);
        record
    }

    fn map_vehicle(&self, row: &RawRow) -> MappedRecord {
        let mut record = MappedRecord::new();
        copy(&mut record, row, &[
            "idUsuario", "tpVeic", "placa", "RENAVAM", "tara", "capKG", "capM3", "tpRod",
            "tpCar", "UF", "RNTRC",
        ]);
        record.push_value("xDocProp", clean_document(row.get("xDocProp")));
        copy(&mut record, row, &[
            "nEixos", "Cor", "AnoFabric", "AnoMod", "Chassi", "Marca", "Modelo",
        ]);
        record.push_value("cMunEmplac", self.municipalities.resolve(row.get("cMunEmplac")));
        copy(&mut record, row, &["xDocAgreg"]);

        let mut tag = MappedRecord::new();
        copy(&mut tag, row, &["xCNPJEmissor", "nTAG"]);
        record.push_group("TAG", tag);
        record
    }

    fn map_carrier(&self, row: &RawRow) -> MappedRecord {
        let mut record = MappedRecord::new();
        copy(&mut record, row, &["idUsuario"]);
        if let Some((name, party)) = CarrierParty::from_row(row).into_element() {
            record.push_group(name, party);
        }
        record.push_group("Ender", self.address(row));
        copy(&mut record, row, &["RNTRC"]);
        record.push_value("dtVencRNTRC", excel_date_to_iso(row.get("dtVencRNTRC")));
        copy(&mut record, row, &["tpProp"]);
        record.push_group("Cartao", card(row));
        record
    }

    fn map_individual(&self, row: &RawRow) -> MappedRecord {
        let mut person = MappedRecord::new();
        copy(&mut person, row, &[
            "CPF", "RG", "ufRG", "expedRG", "dtExpedRG", "xNome", "dtNascto", "Email",
        ]);
        person.push_value("Telefone", clean_document(row.get("Telefone")));
        copy(&mut person, row, &["Sexo", "Natural", "Raca"]);

        let mut record = MappedRecord::new();
        copy(&mut record, row, &["idUsuario"]);
        record.push_group("pFisica", person);
        record.push_group("Ender", self.address(row));
        record
    }

    fn map_company(&self, row: &RawRow) -> MappedRecord {
        let mut company = MappedRecord::new();
        company.push_value("xCNPJ", clean_document(row.get("xCNPJ")));
        copy(&mut company, row, &["xIE", "xIM", "xRazaoSocial", "xNomeFant", "tpPart", "Email"]);
        company.push_value("Telefone", clean_document(row.get("Telefone")));

        let mut record = MappedRecord::new();
        copy(&mut record, row, &["idUsuario"]);
        record.push_group("pJuridica", company);
        record.push_group("Ender", self.address(row));
        record
    }

    /// `Ender` sub-record, shared by every type except vehicle.
    fn address(&self, row: &RawRow) -> MappedRecord {
        let mut address = MappedRecord::new();
        copy(&mut address, row, &["CEP", "xLgr", "nro", "xBairro", "xCpl"]);
        address.push_value("cMun", self.municipalities.resolve(row.get("cMun")));
        address
    }
}

/// `Cartao` sub-record (driver and carrier).
fn card(row: &RawRow) -> MappedRecord {
    let mut card = MappedRecord::new();
    copy(&mut card, row, &["tpCartao", "nCartao", "tpOpera"]);
    card
}

fn copy(record: &mut MappedRecord, row: &RawRow, keys: &[&str]) {
    for key in keys {
        record.push_value(*key, row.get(key).clone());
    }
}

/// Map a row against the process-wide municipality table.
pub fn map_row(row: &RawRow, record_type: RecordType) -> MappedRecord {
    RowMapper::new(municipalities()).map(row, record_type)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Field;

    fn text(record: &MappedRecord, key: &str) -> String {
        record.value(key).map(|v| v.to_text()).unwrap_or_default()
    }

    fn carrier_row(tipo: RawValue) -> RawRow {
        RawRow::new()
            .with("idUsuario", "1")
            .with("tipoPessoa", tipo)
            .with("CPF", "123")
            .with("xNome", "Ana")
            .with("Telefone", "(11) 9999-8888")
            .with("xCNPJEmpresa", "12.345.678/0001-90")
            .with("xRazaoSocial", "Transportes Ana LTDA")
            .with("TelefoneEmpresa", "(11) 3333-4444")
            .with("EmailEmpresa", "contato@ana.com.br")
            .with("cMun", "São Paulo")
            .with("RNTRC", "000123456")
            .with("dtVencRNTRC", "31/12/2025")
    }

    #[test]
    fn test_driver_shape() {
        let row = RawRow::new()
            .with("idUsuario", "7")
            .with("CPF", "12345678901")
            .with("dtNascto", 33000.0)
            .with("dtVencCNH", "10/05/2030")
            .with("CEP", "01001000")
            .with("cMun", "são paulo")
            .with("tpCartao", "1")
            .with("nCartao", "999");

        let record = map_row(&row, RecordType::Driver);

        assert_eq!(text(&record, "dtNascto"), "1990-05-07");
        assert_eq!(text(&record, "dtVencCNH"), "2030-05-10");
        let ender = record.group("Ender").unwrap();
        assert_eq!(text(ender, "cMun"), "3550308");
        assert_eq!(text(ender, "CEP"), "01001000");
        let cartao = record.group("Cartao").unwrap();
        assert_eq!(text(cartao, "nCartao"), "999");

        let keys: Vec<&str> = record.keys().collect();
        assert_eq!(keys.first(), Some(&"idUsuario"));
        assert_eq!(keys.last(), Some(&"Raca"));
        let ender_pos = keys.iter().position(|k| *k == "Ender").unwrap();
        let cnh_pos = keys.iter().position(|k| *k == "nCNH").unwrap();
        assert!(ender_pos < cnh_pos);
    }

    #[test]
    fn test_vehicle_shape() {
        let row = RawRow::new()
            .with("placa", "ABC1D23")
            .with("xDocProp", "123.456.789-01")
            .with("cMunEmplac", "Curitiba")
            .with("xCNPJEmissor", "11222333000144")
            .with("nTAG", "T-1");

        let record = map_row(&row, RecordType::Vehicle);

        assert_eq!(text(&record, "xDocProp"), "12345678901");
        assert_eq!(text(&record, "cMunEmplac"), "4106902");
        assert_eq!(text(record.group("TAG").unwrap(), "nTAG"), "T-1");
        assert!(record.get("Ender").is_none());
    }

    #[test]
    fn test_carrier_individual() {
        let record = map_row(&carrier_row(RawValue::Number(1.0)), RecordType::Carrier);

        let person = record.group("pFisica").unwrap();
        assert_eq!(text(person, "CPF"), "123");
        assert_eq!(text(person, "Telefone"), "1199998888");
        assert!(record.get("pJuridica").is_none());
        assert_eq!(text(&record, "dtVencRNTRC"), "2025-12-31");
        assert_eq!(text(record.group("Ender").unwrap(), "cMun"), "3550308");
    }

    #[test]
    fn test_carrier_company() {
        let record = map_row(&carrier_row(RawValue::from("2")), RecordType::Carrier);

        let company = record.group("pJuridica").unwrap();
        assert_eq!(text(company, "xCNPJ"), "12345678000190");
        assert_eq!(text(company, "Telefone"), "1133334444");
        assert_eq!(text(company, "Email"), "contato@ana.com.br");
        assert!(record.get("pFisica").is_none());
    }

    #[test]
    fn test_carrier_unknown_discriminator_keeps_common_fields() {
        for tipo in [RawValue::from("3"), RawValue::Number(1.5), RawValue::Empty] {
            let record = map_row(&carrier_row(tipo), RecordType::Carrier);
            assert!(record.get("pFisica").is_none());
            assert!(record.get("pJuridica").is_none());
            assert_eq!(text(&record, "idUsuario"), "1");
            assert_eq!(text(&record, "RNTRC"), "000123456");
        }
    }

    #[test]
    fn test_carrier_party_variants() {
        assert!(matches!(
            CarrierParty::from_row(&RawRow::new().with("tipoPessoa", " 1 ")),
            CarrierParty::Individual(_)
        ));
        assert!(matches!(
            CarrierParty::from_row(&RawRow::new().with("tipoPessoa", 2i64)),
            CarrierParty::Company(_)
        ));
        assert_eq!(CarrierParty::from_row(&RawRow::new()), CarrierParty::Bare);
    }

    #[test]
    fn test_individual_and_company() {
        let row = RawRow::new()
            .with("idUsuario", "3")
            .with("CPF", "111")
            .with("xCNPJ", "12.345.678/0001-90")
            .with("xRazaoSocial", "ACME")
            .with("Telefone", "(21) 2222-3333")
            .with("cMun", "Niterói");

        let individual = map_row(&row, RecordType::Individual);
        assert_eq!(text(individual.group("pFisica").unwrap(), "Telefone"), "2122223333");
        assert_eq!(text(individual.group("Ender").unwrap(), "cMun"), "3303302");

        let company = map_row(&row, RecordType::Company);
        let pj = company.group("pJuridica").unwrap();
        assert_eq!(text(pj, "xCNPJ"), "12345678000190");
        assert_eq!(text(pj, "xRazaoSocial"), "ACME");
    }

    #[test]
    fn test_missing_columns_are_absent() {
        let record = map_row(&RawRow::new(), RecordType::Company);
        let pj = record.group("pJuridica").unwrap();
        assert!(matches!(pj.get("Email"), Some(Field::Value(v)) if v.is_empty()));
        assert!(record.is_blank());
    }

    #[test]
    fn test_explicit_table() {
        let table = MunicipalityTable::new(vec![]);
        let row = RawRow::new().with("cMun", "São Paulo");
        let record = RowMapper::new(&table).map(&row, RecordType::Individual);
        assert_eq!(text(record.group("Ender").unwrap(), "cMun"), "São Paulo");
    }

    #[test]
    fn test_row_not_mutated() {
        let row = carrier_row(RawValue::Number(1.0));
        let before = row.clone();
        let _ = map_row(&row, RecordType::Carrier);
        assert_eq!(row, before);
    }
}
