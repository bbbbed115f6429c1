use jiff::civil::Date;
use tracing::debug;

use crate::banks::Banks;
use crate::currencies::{CatalogPeriod, Currencies, decode_catalog};
use crate::error::Result;
use crate::fetch::{RatesFetch, RegistryFetch};
use crate::rates::{ExchangeRateDate, Locale, decode_rates};

/// Get the official rates for `on_date`, or the latest published ones.
///
/// The Bank of Russia does not publish on weekends and holidays, and answers such dates with the
/// preceding business day; `dates_match` on the result tells whether that happened.
pub fn retrieve_rates<F: RatesFetch + ?Sized>(
    fetch: &F,
    on_date: Option<Date>,
    locale: Locale,
) -> Result<ExchangeRateDate> {
    let raw = fetch.daily(on_date, locale)?;
    let rates = ExchangeRateDate::new(on_date, decode_rates(&raw)?);
    if !rates.dates_match {
        debug!(
            "Requested {} but received rates for {}",
            rates.date_requested, rates.date_received
        );
    }
    Ok(rates)
}

/// Get the bank directory in force on `on_date` (today when absent), optionally narrowed to the
/// given BIC or SWIFT codes and to operating participants.
pub fn retrieve_banks<F, S>(
    fetch: &F,
    on_date: Option<Date>,
    filter: Option<&[S]>,
    active_only: bool,
) -> Result<Banks>
where
    F: RegistryFetch + ?Sized,
    S: AsRef<str>,
{
    let files = fetch.registry(on_date)?;
    let banks = Banks::decode(&files, filter)?;
    Ok(if active_only {
        banks.active_only()
    } else {
        banks
    })
}

/// Get the full currency catalog, daily and monthly quoted currencies merged.
pub fn retrieve_currencies<F: RatesFetch + ?Sized>(fetch: &F) -> Result<Currencies> {
    let daily = decode_catalog(&fetch.catalog(CatalogPeriod::Daily)?)?;
    let monthly = decode_catalog(&fetch.catalog(CatalogPeriod::Monthly)?)?;
    Ok(Currencies::from_lists([daily, monthly]))
}

/// Get a single catalog list.
pub fn retrieve_catalog<F: RatesFetch + ?Sized>(
    fetch: &F,
    period: CatalogPeriod,
) -> Result<Currencies> {
    let list = decode_catalog(&fetch.catalog(period)?)?;
    Ok(Currencies::from_lists([list]))
}
