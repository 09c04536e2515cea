//! Transformation module.
//!
//! This module turns flat rows into cadastro XML documents:
//! - Normalize: spreadsheet dates and document numbers
//! - Municipality: name to IBGE code lookup
//! - Mapper: flat row to nested record, per record type
//! - Pipeline: parse, map and serialize a whole file

pub mod mapper;
pub mod municipality;
pub mod normalize;
pub mod pipeline;

pub use mapper::{map_row, CarrierParty, RowMapper};
pub use municipality::{
    init_municipalities, municipalities, resolve_municipality, Municipality, MunicipalityTable,
};
pub use normalize::{clean_document, excel_date_to_iso};
pub use pipeline::*;
