use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::index::{Keyed, RecordIndex};
use crate::xml::{self, present};

/// Catalog entry for a currency the Bank of Russia quotes or has quoted.
///
/// Superseded currencies stay in the catalog without ISO codes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Currency {
    pub id: String,
    pub name_ru: String,
    pub name_eng: String,
    pub num: Option<String>,
    pub code: Option<String>,
    pub par: u32,
}

impl Keyed for Currency {
    fn primary_key(&self) -> &str {
        &self.id
    }

    fn alternate_keys(&self) -> Vec<&str> {
        [self.code.as_deref(), self.num.as_deref()]
            .into_iter()
            .flatten()
            .collect()
    }
}

/// Which list of `XML_valFull.asp` to fetch: currencies quoted daily or monthly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogPeriod {
    Daily,
    Monthly,
}

/// Known currencies, indexed by id, ISO alphabetic and ISO numeric code.
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct Currencies {
    index: RecordIndex<Currency>,
}

impl Currencies {
    /// Merge catalog lists; an id repeated in a later list replaces the earlier entry.
    pub fn from_lists(lists: impl IntoIterator<Item = Vec<Currency>>) -> Self {
        Currencies {
            index: RecordIndex::build(lists.into_iter().flatten()),
        }
    }

    pub fn get(&self, key: &str) -> Result<&Currency> {
        self.index.get(key)
    }

    pub fn currencies(&self) -> &[Currency] {
        self.index.records()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

#[derive(Deserialize)]
struct Valuta {
    #[serde(rename = "Item", default)]
    items: Vec<Item>,
}

#[derive(Deserialize)]
struct Item {
    #[serde(rename = "@ID")]
    id: Option<String>,
    #[serde(rename = "Name")]
    name: Option<String>,
    #[serde(rename = "EngName")]
    eng_name: Option<String>,
    #[serde(rename = "Nominal")]
    nominal: Option<String>,
    #[serde(rename = "ISO_Num_Code")]
    iso_num_code: Option<String>,
    #[serde(rename = "ISO_Char_Code")]
    iso_char_code: Option<String>,
}

/// Decode one `XML_valFull.asp` list. Same strict policy as the daily feed: the first broken
/// entry aborts the parse.
pub fn decode_catalog(bytes: &[u8]) -> Result<Vec<Currency>> {
    let doc: Valuta = xml::parse_document(bytes)?;

    let currencies = doc
        .items
        .iter()
        .enumerate()
        .map(|(position, item)| {
            let id = present(&item.id);
            let missing = |name: &str| Error::record(position, id, format!("missing {name}"));

            let nominal = present(&item.nominal).ok_or_else(|| missing("Nominal"))?;
            let par = nominal
                .parse::<u32>()
                .ok()
                .filter(|&par| par >= 1)
                .ok_or_else(|| Error::record(position, id, format!("bad Nominal `{nominal}`")))?;

            Ok(Currency {
                id: id.ok_or_else(|| missing("ID"))?.to_string(),
                name_ru: present(&item.name).ok_or_else(|| missing("Name"))?.to_string(),
                name_eng: present(&item.eng_name)
                    .ok_or_else(|| missing("EngName"))?
                    .to_string(),
                num: present(&item.iso_num_code).map(xml::pad_num_code),
                code: present(&item.iso_char_code).map(str::to_string),
                par,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    debug!("Parsed {} catalog currencies", currencies.len());
    Ok(currencies)
}
