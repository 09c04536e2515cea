//! XML serializer for cadastro documents.
//!
//! Produces one document per mapped record:
//!
//! ```text
//! <?xml version="1.0" encoding="UTF-8"?>
//! <envProprietario versao="1.00" xmlns="http://www.controleembarque.com.br">
//!   <Autentic>
//!     <xCNPJ>...</xCNPJ>
//!     <xToken>...</xToken>
//!   </Autentic>
//!   <Control>
//!     ...mapped record...
//!   </Control>
//! </envProprietario>
//! ```
//!
//! Empty values and groups whose children are all empty are omitted, at
//! every level. Carrier records are emitted in a fixed key order.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::borrow::Cow;
use std::io;

use crate::models::{Field, MappedRecord, RecordType};

/// XML declaration line.
pub const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

/// Namespace of every envelope.
pub const NAMESPACE: &str = "http://www.controleembarque.com.br";

/// Value of the envelope `versao` attribute.
pub const LAYOUT_VERSION: &str = "1.00";

/// `Control` child order for carrier documents. Keys not listed follow in
/// their natural order.
pub const CARRIER_ORDER: [&str; 8] = [
    "idUsuario",
    "pFisica",
    "pJuridica",
    "Ender",
    "RNTRC",
    "dtVencRNTRC",
    "tpProp",
    "Cartao",
];

const INDENT_SIZE: usize = 2;

/// Escape the five XML special characters.
pub fn escape_xml(text: &str) -> Cow<'_, str> {
    quick_xml::escape::escape(text)
}

/// Serialize one mapped record into a complete envelope.
///
/// `cnpj` and `token` form the `Autentic` block and are escaped like any
/// other text. Never fails.
pub fn serialize(record: &MappedRecord, record_type: RecordType, cnpj: &str, token: &str) -> String {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', INDENT_SIZE);
    // Writes into a Vec<u8> cannot fail.
    let _ = write_envelope(&mut writer, record, record_type, cnpj, token);

    match String::from_utf8(writer.into_inner()) {
        Ok(xml) => xml,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    }
}

fn write_envelope<W: io::Write>(
    writer: &mut Writer<W>,
    record: &MappedRecord,
    record_type: RecordType,
    cnpj: &str,
    token: &str,
) -> io::Result<()> {
    let tag = record_type.envelope_tag();

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    writer.write_event(Event::Start(
        BytesStart::new(tag).with_attributes([("versao", LAYOUT_VERSION), ("xmlns", NAMESPACE)]),
    ))?;

    writer.write_event(Event::Start(BytesStart::new("Autentic")))?;
    write_leaf(writer, "xCNPJ", cnpj)?;
    write_leaf(writer, "xToken", token)?;
    writer.write_event(Event::End(BytesEnd::new("Autentic")))?;

    writer.write_event(Event::Start(BytesStart::new("Control")))?;
    for (key, field) in ordered_entries(record, key_order(record_type)) {
        write_field(writer, key, field)?;
    }
    writer.write_event(Event::End(BytesEnd::new("Control")))?;

    writer.write_event(Event::End(BytesEnd::new(tag)))
}

/// Fixed top-level key order for a record type (empty = natural order).
fn key_order(record_type: RecordType) -> &'static [&'static str] {
    match record_type {
        RecordType::Carrier => &CARRIER_ORDER,
        _ => &[],
    }
}

/// Listed keys first (in list order), then the rest in natural order.
fn ordered_entries<'r>(record: &'r MappedRecord, order: &[&str]) -> Vec<&'r (String, Field)> {
    let entries = record.entries();
    let mut ordered: Vec<&(String, Field)> = order
        .iter()
        .filter_map(|key| entries.iter().find(|(k, _)| k == *key))
        .collect();
    ordered.extend(entries.iter().filter(|(k, _)| !order.contains(&k.as_str())));
    ordered
}

/// Write one field; blank values and groups with no non-blank descendant
/// are skipped together with their wrapper tag.
fn write_field<W: io::Write>(writer: &mut Writer<W>, key: &str, field: &Field) -> io::Result<()> {
    if field.is_blank() {
        return Ok(());
    }
    match field {
        Field::Value(value) => write_leaf(writer, key, &value.to_text()),
        Field::Group(group) => {
            writer.write_event(Event::Start(BytesStart::new(key)))?;
            for (child_key, child) in group.entries() {
                write_field(writer, child_key, child)?;
            }
            writer.write_event(Event::End(BytesEnd::new(key)))
        }
    }
}

fn write_leaf<W: io::Write>(writer: &mut Writer<W>, key: &str, text: &str) -> io::Result<()> {
    writer.write_event(Event::Start(BytesStart::new(key)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(key)))
}
