use clap::ValueEnum;
use jiff::civil::Date;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::index::{Keyed, RecordIndex};
use crate::xml::{self, present};

/// Language of the currency names in the daily feed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Locale {
    #[default]
    Ru,
    En,
}

/// Official rate of one foreign currency against the rouble.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExchangeRate {
    /// Bank of Russia currency id, e.g. `R01235`
    pub id: String,
    pub name: String,
    /// ISO 4217 alphabetic code
    pub code: String,
    /// ISO 4217 numeric code, zero-padded to three digits
    pub num: String,
    /// Number of foreign currency units the value is quoted for
    pub par: u32,
    /// Roubles per `par` units
    pub value: Decimal,
    /// Roubles per single unit, `value / par`
    pub rate: Decimal,
}

impl Keyed for ExchangeRate {
    fn primary_key(&self) -> &str {
        &self.id
    }

    fn alternate_keys(&self) -> Vec<&str> {
        vec![&self.code, &self.num]
    }
}

/// Rates published for one day.
#[derive(Debug, Clone, Serialize)]
pub struct ExchangeRateDate {
    pub date_requested: Date,
    /// Date the Bank of Russia actually returned; the preceding business day when the requested
    /// date has no publication of its own
    pub date_received: Date,
    pub dates_match: bool,
    rates: RecordIndex<ExchangeRate>,
}

impl ExchangeRateDate {
    /// Pair a decoded document with the date it was requested for. No requested date means
    /// "latest", which by definition matches what was received.
    pub fn new(date_requested: Option<Date>, document: RatesDocument) -> Self {
        let date_requested = date_requested.unwrap_or(document.date);
        ExchangeRateDate {
            date_requested,
            date_received: document.date,
            dates_match: date_requested == document.date,
            rates: RecordIndex::build(document.rates),
        }
    }

    /// Look up a rate by Bank of Russia id, ISO alphabetic code (any case) or ISO numeric code.
    pub fn get(&self, key: &str) -> Result<&ExchangeRate> {
        self.rates.get(key)
    }

    /// Rates in document order.
    pub fn rates(&self) -> &[ExchangeRate] {
        self.rates.records()
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}

/// A decoded daily feed, before it is matched against a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RatesDocument {
    pub date: Date,
    pub rates: Vec<ExchangeRate>,
}

#[derive(Deserialize)]
struct ValCurs {
    #[serde(rename = "@Date")]
    date: Option<String>,
    #[serde(rename = "Valute", default)]
    valutes: Vec<Valute>,
}

#[derive(Deserialize)]
struct Valute {
    #[serde(rename = "@ID")]
    id: Option<String>,
    #[serde(rename = "NumCode")]
    num_code: Option<String>,
    #[serde(rename = "CharCode")]
    char_code: Option<String>,
    #[serde(rename = "Nominal")]
    nominal: Option<String>,
    #[serde(rename = "Name")]
    name: Option<String>,
    #[serde(rename = "Value")]
    value: Option<String>,
}

/// Decode the daily rates feed (`XML_daily.asp`).
///
/// A document without a readable `Date` attribute is rejected as a whole. A currency entry with
/// a missing field, or a nominal or value that is not a positive number, aborts the parse with
/// [`Error::MalformedRecord`]; no partial rate list is ever returned.
pub fn decode_rates(bytes: &[u8]) -> Result<RatesDocument> {
    debug!("Parsing exchange rates ({} bytes)", bytes.len());
    let doc: ValCurs = xml::parse_document(bytes)?;

    let raw_date = present(&doc.date).ok_or_else(|| Error::document("no `Date` attribute"))?;
    let date = parse_feed_date(raw_date)
        .ok_or_else(|| Error::document(format!("unreadable date `{raw_date}`")))?;

    let rates = doc
        .valutes
        .iter()
        .enumerate()
        .map(|(position, valute)| decode_valute(position, valute))
        .collect::<Result<Vec<_>>>()?;

    debug!("Parsed {} currencies for {date}", rates.len());
    Ok(RatesDocument { date, rates })
}

fn decode_valute(position: usize, valute: &Valute) -> Result<ExchangeRate> {
    let raw_id = present(&valute.id);
    let field = |value: &Option<String>, name: &str| {
        present(value)
            .map(str::to_string)
            .ok_or_else(|| Error::record(position, raw_id, format!("missing {name}")))
    };

    let id = field(&valute.id, "ID")?;
    let code = field(&valute.char_code, "CharCode")?;
    let num = xml::pad_num_code(&field(&valute.num_code, "NumCode")?);
    let name = field(&valute.name, "Name")?;

    let nominal = field(&valute.nominal, "Nominal")?;
    let par = nominal
        .parse::<u32>()
        .ok()
        .filter(|&par| par >= 1)
        .ok_or_else(|| Error::record(position, raw_id, format!("bad Nominal `{nominal}`")))?;

    let raw_value = field(&valute.value, "Value")?;
    let value = xml::parse_decimal(&raw_value)
        .filter(|v| v.is_sign_positive() && !v.is_zero())
        .ok_or_else(|| Error::record(position, raw_id, format!("bad Value `{raw_value}`")))?;

    let rate = value
        .checked_div(Decimal::from(par))
        .ok_or_else(|| Error::record(position, raw_id, "rate out of range"))?;

    Ok(ExchangeRate {
        id,
        name,
        code,
        num,
        par,
        value,
        rate,
    })
}

fn parse_feed_date(raw: &str) -> Option<Date> {
    Date::strptime("%d.%m.%Y", raw)
        .or_else(|_| Date::strptime("%d/%m/%Y", raw))
        .ok()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use jiff::civil::date;
    use std::str::FromStr;

    pub(crate) const DAILY_2016_06_25: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ValCurs Date="25.06.2016" name="Foreign Currency Market">
<Valute ID="R01010"><NumCode>036</NumCode><CharCode>AUD</CharCode><Nominal>1</Nominal><Name>Australian Dollar</Name><Value>48,6458</Value></Valute>
<Valute ID="R01090"><NumCode>974</NumCode><CharCode>BYR</CharCode><Nominal>10000</Nominal><Name>Belarussian Ruble</Name><Value>32,6582</Value></Valute>
<Valute ID="R01235"><NumCode>840</NumCode><CharCode>USD</CharCode><Nominal>1</Nominal><Name>US Dollar</Name><Value>65,6046</Value></Valute>
<Valute ID="R01239"><NumCode>978</NumCode><CharCode>EUR</CharCode><Nominal>1</Nominal><Name>Euro</Name><Value>72,9694</Value></Valute>
</ValCurs>"#;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_decode_daily_feed() {
        let doc = decode_rates(DAILY_2016_06_25.as_bytes()).unwrap();
        assert_eq!(doc.date, date(2016, 6, 25));
        let codes: Vec<_> = doc.rates.iter().map(|r| r.code.as_str()).collect();
        assert_eq!(codes, ["AUD", "BYR", "USD", "EUR"]);

        let byr = &doc.rates[1];
        assert_eq!(byr.id, "R01090");
        assert_eq!(byr.num, "974");
        assert_eq!(byr.par, 10000);
        assert_eq!(byr.value, dec("32.6582"));
        assert_eq!(byr.rate, dec("0.00326582"));
    }

    #[test]
    fn test_rate_is_exact() {
        let doc = decode_rates(DAILY_2016_06_25.as_bytes()).unwrap();
        for rate in &doc.rates {
            assert!(rate.par >= 1);
            assert_eq!(rate.rate * Decimal::from(rate.par), rate.value);
            assert_eq!(rate.rate, rate.value / Decimal::from(rate.par));
        }
    }

    #[test]
    fn test_windows_1251_feed() {
        let mut bytes =
            br#"<?xml version="1.0" encoding="windows-1251"?><ValCurs Date="25.06.2016"><Valute ID="R01235"><NumCode>840</NumCode><CharCode>USD</CharCode><Nominal>1</Nominal><Name>"#
                .to_vec();
        // "Доллар США"
        bytes.extend([0xC4, 0xEE, 0xEB, 0xEB, 0xE0, 0xF0, 0x20, 0xD1, 0xD8, 0xC0]);
        bytes.extend(b"</Name><Value>65,6046</Value></Valute></ValCurs>");

        let doc = decode_rates(&bytes).unwrap();
        assert_eq!(doc.rates[0].name, "Доллар США");
    }

    #[test]
    fn test_missing_date_is_document_error() {
        let err = decode_rates(b"<ValCurs>Error in parameters</ValCurs>").unwrap_err();
        assert!(matches!(err, Error::MalformedDocument(_)));

        let err = decode_rates(b"<ValCurs Date=\"2016-13-45\"></ValCurs>").unwrap_err();
        assert!(matches!(err, Error::MalformedDocument(_)));

        let err = decode_rates(b"<ValCurs Date=\"25.06.2016\"><Valute>").unwrap_err();
        assert!(matches!(err, Error::MalformedDocument(_)));
    }

    #[test]
    fn test_malformed_record_aborts_parse() {
        let feed = DAILY_2016_06_25.replace("<CharCode>USD</CharCode>", "");
        let err = decode_rates(feed.as_bytes()).unwrap_err();
        match err {
            Error::MalformedRecord { position, id, reason } => {
                assert_eq!(position, 2);
                assert_eq!(id, "R01235");
                assert!(reason.contains("CharCode"));
            }
            other => panic!("unexpected error {other:?}"),
        }

        let feed = DAILY_2016_06_25.replace("<Nominal>10000</Nominal>", "<Nominal>0</Nominal>");
        assert!(matches!(
            decode_rates(feed.as_bytes()),
            Err(Error::MalformedRecord { position: 1, .. })
        ));

        let feed = DAILY_2016_06_25.replace("48,6458", "-48,6458");
        assert!(matches!(
            decode_rates(feed.as_bytes()),
            Err(Error::MalformedRecord { position: 0, .. })
        ));
    }

    #[test]
    fn test_dates_match() {
        let doc = decode_rates(DAILY_2016_06_25.as_bytes()).unwrap();

        let rates = ExchangeRateDate::new(Some(date(2016, 6, 26)), doc.clone());
        assert_eq!(rates.date_requested, date(2016, 6, 26));
        assert_eq!(rates.date_received, date(2016, 6, 25));
        assert!(!rates.dates_match);

        let rates = ExchangeRateDate::new(Some(date(2016, 6, 25)), doc.clone());
        assert!(rates.dates_match);

        let rates = ExchangeRateDate::new(None, doc);
        assert_eq!(rates.date_requested, date(2016, 6, 25));
        assert!(rates.dates_match);
    }

    #[test]
    fn test_lookup_variants() {
        let rates = ExchangeRateDate::new(None, decode_rates(DAILY_2016_06_25.as_bytes()).unwrap());
        let usd = rates.get("USD").unwrap();
        assert_eq!(rates.get("usd").unwrap(), usd);
        assert_eq!(rates.get("R01235").unwrap(), usd);
        assert_eq!(rates.get("840").unwrap(), usd);
        assert_eq!(rates.get("36").unwrap().code, "AUD");
        assert!(matches!(rates.get("GBP"), Err(Error::KeyNotFound(_))));
        assert_eq!(rates.len(), 4);
    }
}
