//! Exchange rates, the currency catalog and the BIC bank directory published by the Bank of
//! Russia, decoded into typed, indexed collections.
//!
//! ```no_run
//! use cbr_refdata::{HttpFetcher, Locale, retrieve_rates};
//! use jiff::civil::date;
//!
//! let rates = retrieve_rates(&HttpFetcher::default(), Some(date(2016, 6, 26)), Locale::En)?;
//! assert!(!rates.dates_match);
//! println!("{}", rates.get("USD")?.rate);
//! # Ok::<(), cbr_refdata::Error>(())
//! ```

pub mod annotate;
pub mod banks;
pub mod cli;
pub mod codepage;
pub mod config;
pub mod currencies;
pub mod dbf;
pub mod error;
pub mod fetch;
pub mod index;
pub mod query;
pub mod rates;
mod xml;

pub use annotate::{BANK_TITLES, BankField, annotate, annotate_all};
pub use banks::{Bank, Banks, Coded, DecodeStats, RegistryFiles};
pub use config::FetchConfig;
pub use currencies::{CatalogPeriod, Currencies, Currency, decode_catalog};
pub use error::{Error, FetchError, Result};
pub use fetch::{DirectoryRegistry, HttpFetcher, RatesFetch, RegistryFetch};
pub use index::{Keyed, RecordIndex};
pub use query::{retrieve_banks, retrieve_catalog, retrieve_currencies, retrieve_rates};
pub use rates::{ExchangeRate, ExchangeRateDate, Locale, RatesDocument, decode_rates};
