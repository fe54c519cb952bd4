//! tenderfetch - export a procurement portal's current tender listing.
//!
//! Pages are fetched with a plain HTTP client and, when the portal rejects
//! that, through a headless browser session. Rows are deduplicated by
//! `UniqueID` across pages and written to a spreadsheet, either on disk or
//! through the bundled web server.

pub mod cli;
pub mod config;
pub mod export;
pub mod scrapers;
pub mod server;
pub mod tenders;
