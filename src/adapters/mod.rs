// Adapters layer: concrete implementations for external systems (model service, spreadsheets).

pub mod http;
pub mod spreadsheet;
