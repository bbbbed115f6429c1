//! The BIC directory: every credit institution and settlement participant registered with the
//! Bank of Russia.
//!
//! The directory ships as a set of dBase tables. `BNKSEEK` holds one row per participant; small
//! side tables resolve region, locality type, participant type and settlement type codes, and
//! a separate table maps BICs to SWIFT codes.

use std::collections::HashMap;

use jiff::civil::Date;
use serde::Serialize;
use tracing::{debug, warn};

use crate::dbf::{Row, RowSkip, Table};
use crate::error::Result;
use crate::index::{Keyed, RecordIndex, normalize_key};

/// A code from one of the directory's side tables, with its name when the table was supplied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Coded {
    pub code: String,
    pub name: Option<String>,
}

impl Coded {
    fn resolve(code: &str, table: &HashMap<String, String>) -> Self {
        Coded {
            code: code.to_string(),
            name: table.get(code).cloned(),
        }
    }

    /// Name if resolved, the bare code otherwise.
    pub fn display(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.code)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bank {
    /// Nine-digit bank identification code
    pub bic: String,
    pub name: String,
    pub name_full: String,
    /// OKATO region code with the region name
    pub region: Coded,
    pub zip: String,
    pub place_type: Coded,
    pub place: String,
    pub address: String,
    /// BIC of the cash settlement centre serving the participant
    pub rkc_bic: String,
    /// Settlement term in days
    pub term: Option<u32>,
    pub date_added: Option<Date>,
    pub date_updated: Option<Date>,
    pub date_change: Option<Date>,
    pub mfo: String,
    /// Correspondent account
    pub corr: String,
    pub corr_bik: String,
    pub phone: String,
    pub telegraph: String,
    pub commutator: String,
    pub okpo: String,
    /// Registration (licence) number
    pub regnum: String,
    pub participant_type: Coded,
    pub pay_type: Coded,
    /// Restriction code such as a revoked licence or liquidation; empty for operating participants
    pub control_code: String,
    pub control_date: Option<Date>,
    pub swift: Option<String>,
}

impl Bank {
    pub fn is_active(&self) -> bool {
        self.control_code.is_empty()
    }

    fn matches(&self, wanted: &[String]) -> bool {
        wanted.iter().any(|key| {
            *key == normalize_key(&self.bic)
                || self.swift.as_deref().is_some_and(|s| *key == normalize_key(s))
        })
    }
}

impl Keyed for Bank {
    fn primary_key(&self) -> &str {
        &self.bic
    }

    fn alternate_keys(&self) -> Vec<&str> {
        self.swift.as_deref().into_iter().collect()
    }
}

/// Raw directory tables as delivered by a fetch collaborator.
#[derive(Debug, Clone, Default)]
pub struct RegistryFiles {
    /// `BNKSEEK`, the participant table
    pub banks: Vec<u8>,
    /// `BIK_SWIF`: `KOD_RUS` → `KOD_SWIFT`
    pub swift: Option<Vec<u8>>,
    /// `REG`: `RGN` → `NAME`
    pub regions: Option<Vec<u8>>,
    /// `TNP`: `TNP` → `SHORTNAME`
    pub place_types: Option<Vec<u8>>,
    /// `PZN`: `PZN` → `NAME`
    pub participant_types: Option<Vec<u8>>,
    /// `UER`: `UER` → `UERNAME`
    pub pay_types: Option<Vec<u8>>,
}

/// What happened to the rows of the participant table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DecodeStats {
    /// Rows read from the table, whatever their fate
    pub rows: usize,
    pub decoded: usize,
    /// Rows marked deleted in the table
    pub deleted: usize,
    /// Rows that could not be decoded: truncated, bad marker, malformed BIC, term or date
    pub skipped: usize,
    /// Decoded rows superseded by a later row with the same BIC
    pub duplicates: usize,
    /// Truncated or unmarked rows of the side tables, whose codes stay unresolved
    pub side_skipped: usize,
}

/// Decoded directory.
#[derive(Debug, Clone, Serialize)]
pub struct Banks {
    banks: RecordIndex<Bank>,
    stats: DecodeStats,
}

impl Banks {
    /// Decode the directory tables.
    ///
    /// With a `filter`, only banks whose BIC or SWIFT code is listed are kept; listed codes with
    /// no bank are simply absent. A BIC that occurs twice keeps its last row.
    pub fn decode<S: AsRef<str>>(files: &RegistryFiles, filter: Option<&[S]>) -> Result<Self> {
        let mut stats = DecodeStats::default();
        let mut side_table = |bytes: &Option<Vec<u8>>, name, [key, value]: [&str; 2]| {
            lookup_table(bytes.as_deref(), name, key, value, &mut stats.side_skipped)
        };
        let swift = side_table(&files.swift, "BIK_SWIF", ["KOD_RUS", "KOD_SWIFT"])?;
        let side = SideTables {
            regions: side_table(&files.regions, "REG", ["RGN", "NAME"])?,
            place_types: side_table(&files.place_types, "TNP", ["TNP", "SHORTNAME"])?,
            participant_types: side_table(&files.participant_types, "PZN", ["PZN", "NAME"])?,
            pay_types: side_table(&files.pay_types, "UER", ["UER", "UERNAME"])?,
        };

        let table = Table::parse(&files.banks)?;
        let columns = Columns::resolve(&table)?;

        let mut decoded = Vec::new();
        for row in table.rows() {
            stats.rows += 1;
            match row {
                Ok(row) => match columns.bank(&row, &side, &swift) {
                    Some(bank) => decoded.push(bank),
                    None => stats.skipped += 1,
                },
                Err(RowSkip::Deleted) => stats.deleted += 1,
                Err(RowSkip::Truncated | RowSkip::BadMarker(_)) => stats.skipped += 1,
            }
        }
        stats.decoded = decoded.len();

        let banks = RecordIndex::build(decoded);
        stats.duplicates = stats.decoded - banks.len();

        let banks = match filter {
            Some(filter) => {
                let wanted: Vec<String> =
                    filter.iter().map(|k| normalize_key(k.as_ref())).collect();
                let kept = banks.into_records().into_iter().filter(|b| b.matches(&wanted));
                RecordIndex::build(kept)
            }
            None => banks,
        };

        if stats.skipped > 0 {
            warn!("Skipped {} undecodable registry rows", stats.skipped);
        }
        debug!("Decoded registry: {stats:?}, {} banks kept", banks.len());
        Ok(Banks { banks, stats })
    }

    /// Keep operating participants only.
    pub fn active_only(self) -> Self {
        let active = self.banks.into_records().into_iter().filter(Bank::is_active);
        Banks {
            banks: RecordIndex::build(active),
            stats: self.stats,
        }
    }

    /// Look up a bank by BIC or SWIFT code.
    pub fn get(&self, key: &str) -> Result<&Bank> {
        self.banks.get(key)
    }

    pub fn banks(&self) -> &[Bank] {
        self.banks.records()
    }

    pub fn stats(&self) -> DecodeStats {
        self.stats
    }

    pub fn len(&self) -> usize {
        self.banks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.banks.is_empty()
    }
}

struct SideTables {
    regions: HashMap<String, String>,
    place_types: HashMap<String, String>,
    participant_types: HashMap<String, String>,
    pay_types: HashMap<String, String>,
}

/// Column positions in `BNKSEEK`. Only the BIC and the full name are mandatory.
struct Columns {
    bic: usize,
    name_full: usize,
    name: Option<usize>,
    region: Option<usize>,
    zip: Option<usize>,
    place_type: Option<usize>,
    place: Option<usize>,
    address: Option<usize>,
    rkc_bic: Option<usize>,
    term: Option<usize>,
    date_added: Option<usize>,
    date_updated: Option<usize>,
    date_change: Option<usize>,
    mfo: Option<usize>,
    corr: Option<usize>,
    corr_bik: Option<usize>,
    phone: Option<usize>,
    telegraph: [Option<usize>; 2],
    commutator: Option<usize>,
    okpo: Option<usize>,
    regnum: Option<usize>,
    participant_type: Option<usize>,
    pay_type: Option<usize>,
    control_code: Option<usize>,
    control_date: Option<usize>,
}

impl Columns {
    fn resolve(table: &Table<'_>) -> Result<Self> {
        let [bic, name_full] = table.require(["NEWNUM", "NAMEP"])?;
        let col = |name| table.column(name);
        Ok(Columns {
            bic,
            name_full,
            name: col("NAMEN"),
            region: col("RGN"),
            zip: col("IND"),
            place_type: col("TNP"),
            place: col("NNP"),
            address: col("ADR"),
            rkc_bic: col("RKC"),
            term: col("SROK"),
            date_added: col("DATE_IN"),
            date_updated: col("DT_IZM"),
            date_change: col("DT_IZMR"),
            mfo: col("PERMFO"),
            corr: col("KSNP"),
            corr_bik: col("NEWKS"),
            phone: col("TELEF"),
            telegraph: [col("AT1"), col("AT2")],
            commutator: col("CKS"),
            okpo: col("OKPO"),
            regnum: col("REGN"),
            participant_type: col("PZN"),
            pay_type: col("UER"),
            control_code: col("REAL"),
            control_date: col("DATE_CH"),
        })
    }

    /// `None` when the row does not hold a well-formed participant.
    fn bank(
        &self,
        row: &Row,
        side: &SideTables,
        swift: &HashMap<String, String>,
    ) -> Option<Bank> {
        let text = |column: Option<usize>| row.get_opt(column).to_string();
        let date = |column: Option<usize>| parse_table_date(row.get_opt(column));

        let bic = row.get(self.bic);
        if bic.len() != 9 || !bic.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }

        let term = match row.get_opt(self.term) {
            "" => None,
            raw => Some(raw.parse().ok()?),
        };

        let telegraph = self
            .telegraph
            .iter()
            .map(|&c| row.get_opt(c))
            .filter(|v| !v.is_empty())
            .collect::<Vec<_>>()
            .join(",");

        Some(Bank {
            bic: bic.to_string(),
            name: text(self.name),
            name_full: row.get(self.name_full).to_string(),
            region: Coded::resolve(row.get_opt(self.region), &side.regions),
            zip: text(self.zip),
            place_type: Coded::resolve(row.get_opt(self.place_type), &side.place_types),
            place: text(self.place),
            address: text(self.address),
            rkc_bic: text(self.rkc_bic),
            term,
            date_added: date(self.date_added)?,
            date_updated: date(self.date_updated)?,
            date_change: date(self.date_change)?,
            mfo: text(self.mfo),
            corr: text(self.corr),
            corr_bik: text(self.corr_bik),
            phone: text(self.phone),
            telegraph,
            commutator: text(self.commutator),
            okpo: text(self.okpo),
            regnum: text(self.regnum),
            participant_type: Coded::resolve(
                row.get_opt(self.participant_type),
                &side.participant_types,
            ),
            pay_type: Coded::resolve(row.get_opt(self.pay_type), &side.pay_types),
            control_code: text(self.control_code),
            control_date: date(self.control_date)?,
            swift: swift.get(bic).cloned(),
        })
    }
}

/// `Some(None)` for a blank date, `None` for an unreadable one.
fn parse_table_date(raw: &str) -> Option<Option<Date>> {
    if raw.is_empty() {
        return Some(None);
    }
    Date::strptime("%Y%m%d", raw)
        .or_else(|_| Date::strptime("%d.%m.%Y", raw))
        .ok()
        .map(Some)
}

/// Two-column code → name map from a side table. An absent table yields an empty map; rows that
/// cannot be read are added to `skipped`.
fn lookup_table(
    bytes: Option<&[u8]>,
    name: &str,
    key: &str,
    value: &str,
    skipped: &mut usize,
) -> Result<HashMap<String, String>> {
    let Some(bytes) = bytes else {
        debug!("No {name} table supplied");
        return Ok(HashMap::new());
    };
    let table = Table::parse(bytes)?;
    let [key, value] = table.require([key, value])?;

    let mut map = HashMap::new();
    let mut unreadable = 0;
    for row in table.rows() {
        match row {
            Ok(row) if !row.get(key).is_empty() => {
                map.insert(row.get(key).to_string(), row.get(value).to_string());
            }
            Ok(_) | Err(RowSkip::Deleted) => {}
            Err(RowSkip::Truncated | RowSkip::BadMarker(_)) => unreadable += 1,
        }
    }
    if unreadable > 0 {
        warn!("Skipped {unreadable} undecodable rows of the {name} table");
    }
    *skipped += unreadable;
    Ok(map)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::dbf::writer::TableWriter;
    use crate::error::Error;
    use jiff::civil::date;

    const BNKSEEK: &[(&str, u8, usize)] = &[
        ("REAL", b'C', 4),
        ("PZN", b'C', 2),
        ("UER", b'C', 1),
        ("RGN", b'C', 2),
        ("IND", b'C', 6),
        ("TNP", b'C', 1),
        ("NNP", b'C', 25),
        ("ADR", b'C', 30),
        ("RKC", b'C', 9),
        ("NAMEP", b'C', 45),
        ("NAMEN", b'C', 30),
        ("NEWNUM", b'C', 9),
        ("NEWKS", b'C', 9),
        ("PERMFO", b'C', 6),
        ("SROK", b'N', 2),
        ("AT1", b'C', 7),
        ("AT2", b'C', 7),
        ("TELEF", b'C', 25),
        ("REGN", b'C', 9),
        ("OKPO", b'C', 8),
        ("DT_IZM", b'D', 8),
        ("CKS", b'C', 6),
        ("KSNP", b'C', 20),
        ("DATE_IN", b'D', 8),
        ("DATE_CH", b'D', 8),
        ("DT_IZMR", b'D', 8),
    ];

    #[allow(clippy::too_many_arguments)]
    fn bank_row<'a>(
        real: &'a str,
        pzn: &'a str,
        name: &'a str,
        bic: &'a str,
        term: &'a str,
        at1: &'a str,
        ksnp: &'a str,
        date_in: &'a str,
    ) -> Vec<&'a str> {
        vec![
            real, pzn, "5", "50", "630099", "1", "НОВОСИБИРСК", "УЛ СЕРЕБРЕННИКОВСКАЯ, 20",
            "045004001", name, name, bic, "", "", term, at1, "", "8-383-2244800", "1481/1",
            "09105901", "20180115", "", ksnp, date_in, "", "",
        ]
    }

    pub(crate) fn registry() -> RegistryFiles {
        let banks = TableWriter::new(BNKSEEK)
            .row(&bank_row(
                "",
                "20",
                "СИБИРСКИЙ БАНК ПАО СБЕРБАНК",
                "045004641",
                "1",
                "133161",
                "30101810500000000641",
                "19930701",
            ))
            .row(&bank_row(
                "ОТЗВ",
                "20",
                "БАНК ОТОЗВАННЫЙ",
                "045004001",
                "2",
                "",
                "30101810900000000001",
                "19950101",
            ))
            .row_marked(b'*', &bank_row("", "20", "УДАЛЁННЫЙ", "045004002", "", "", "", ""))
            .row(&bank_row("", "20", "БИК С ОШИБКОЙ", "04500X", "", "", "", ""))
            .row(&bank_row("", "20", "ПЛОХОЙ СРОК", "045004003", "x", "", "", ""))
            .row(&bank_row(
                "",
                "20",
                "НСК БАНК",
                "045004777",
                "1",
                "",
                "30101810000000000777",
                "20000101",
            ))
            .row(&bank_row(
                "",
                "20",
                "НСК БАНК ОБНОВЛЁННЫЙ",
                "045004777",
                "1",
                "",
                "30101810000000000778",
                "20010101",
            ))
            .build();

        let swift = TableWriter::new(&[("KOD_RUS", b'C', 9), ("KOD_SWIFT", b'C', 11)])
            .row(&["045004641", "SABRRUMMNH1"])
            .build();
        let regions = TableWriter::new(&[("RGN", b'C', 2), ("NAME", b'C', 30)])
            .row(&["50", "НОВОСИБИРСКАЯ ОБЛАСТЬ"])
            .build();
        let place_types = TableWriter::new(&[
            ("TNP", b'C', 1),
            ("FULLNAME", b'C', 25),
            ("SHORTNAME", b'C', 5),
        ])
        .row(&["1", "ГОРОД", "Г"])
        .build();
        let participant_types = TableWriter::new(&[("PZN", b'C', 2), ("NAME", b'C', 30)])
            .row(&["20", "КО"])
            .build();

        RegistryFiles {
            banks,
            swift: Some(swift),
            regions: Some(regions),
            place_types: Some(place_types),
            participant_types: Some(participant_types),
            pay_types: None,
        }
    }

    #[test]
    fn test_decode_registry() {
        let banks = Banks::decode::<&str>(&registry(), None).unwrap();

        let bank = banks.get("045004641").unwrap();
        assert_eq!(bank.swift.as_deref(), Some("SABRRUMMNH1"));
        assert_eq!(bank.corr, "30101810500000000641");
        assert_eq!(bank.place, "НОВОСИБИРСК");
        assert_eq!(bank.place_type.display(), "Г");
        assert_eq!(bank.region.name.as_deref(), Some("НОВОСИБИРСКАЯ ОБЛАСТЬ"));
        assert_eq!(bank.participant_type.display(), "КО");
        assert_eq!(bank.pay_type.display(), "5");
        assert_eq!(bank.term, Some(1));
        assert_eq!(bank.telegraph, "133161");
        assert_eq!(bank.date_added, Some(date(1993, 7, 1)));
        assert_eq!(bank.date_updated, Some(date(2018, 1, 15)));
        assert_eq!(bank.control_date, None);
        assert!(bank.is_active());

        assert_eq!(banks.get("sabrrummnh1").unwrap().bic, "045004641");
        assert!(matches!(banks.get("000000000"), Err(Error::KeyNotFound(_))));
    }

    #[test]
    fn test_stats_count_every_row() {
        let banks = Banks::decode::<&str>(&registry(), None).unwrap();
        assert_eq!(
            banks.stats(),
            DecodeStats {
                rows: 7,
                decoded: 4,
                deleted: 1,
                skipped: 2,
                duplicates: 1,
                side_skipped: 0,
            }
        );
        assert_eq!(banks.len(), 3);
    }

    #[test]
    fn test_duplicate_bic_last_wins() {
        let banks = Banks::decode::<&str>(&registry(), None).unwrap();
        let bank = banks.get("045004777").unwrap();
        assert_eq!(bank.name, "НСК БАНК ОБНОВЛЁННЫЙ");
        assert_eq!(bank.corr, "30101810000000000778");
        let bics: Vec<_> = banks.banks().iter().map(|b| b.bic.as_str()).collect();
        assert_eq!(bics, ["045004641", "045004001", "045004777"]);
    }

    #[test]
    fn test_filter() {
        let filter = ["045004777", "SABRRUMMNH1", "999999999"];
        let banks = Banks::decode(&registry(), Some(&filter[..])).unwrap();
        let bics: Vec<_> = banks.banks().iter().map(|b| b.bic.as_str()).collect();
        assert_eq!(bics, ["045004641", "045004777"]);
        assert!(banks.get("045004001").is_err());
    }

    #[test]
    fn test_active_only() {
        let banks = Banks::decode::<&str>(&registry(), None).unwrap();
        assert!(!banks.get("045004001").unwrap().is_active());

        let active = banks.active_only();
        assert_eq!(active.len(), 2);
        assert!(active.banks().iter().all(Bank::is_active));
        assert!(active.get("045004001").is_err());
    }

    #[test]
    fn test_without_side_tables() {
        let files = RegistryFiles {
            banks: registry().banks,
            ..Default::default()
        };
        let banks = Banks::decode::<&str>(&files, None).unwrap();
        let bank = banks.get("045004641").unwrap();
        assert_eq!(bank.swift, None);
        assert_eq!(bank.region.display(), "50");
        assert!(banks.get("SABRRUMMNH1").is_err());
    }

    #[test]
    fn test_truncated_swift_table_counted() {
        let mut swift = TableWriter::new(&[("KOD_RUS", b'C', 9), ("KOD_SWIFT", b'C', 11)])
            .row(&["045004641", "SABRRUMMNH1"])
            .row(&["045004777", "NSKBRUMMXXX"])
            .build();
        // Drop the EOF marker and the tail of the second row
        swift.truncate(swift.len() - 10);
        let files = RegistryFiles {
            swift: Some(swift),
            ..registry()
        };

        let banks = Banks::decode::<&str>(&files, None).unwrap();
        assert_eq!(banks.stats().side_skipped, 1);
        assert_eq!(banks.stats().skipped, 2);
        assert_eq!(banks.get("SABRRUMMNH1").unwrap().bic, "045004641");
        assert_eq!(banks.get("045004777").unwrap().swift, None);
    }

    #[test]
    fn test_missing_bic_column() {
        let files = RegistryFiles {
            banks: TableWriter::new(&[("NAMEP", b'C', 10)]).row(&["X"]).build(),
            ..Default::default()
        };
        assert!(matches!(
            Banks::decode::<&str>(&files, None),
            Err(Error::MalformedDocument(_))
        ));
    }
}
