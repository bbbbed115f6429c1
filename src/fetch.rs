//! Collaborators that deliver raw documents. Decoding never depends on how the bytes arrived.

use std::collections::HashMap;
use std::fs;
use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};

use jiff::Zoned;
use jiff::civil::Date;
use tracing::debug;
use ureq::Agent;
use zip::ZipArchive;
use zip::result::ZipError;

use crate::banks::RegistryFiles;
use crate::config::FetchConfig;
use crate::currencies::CatalogPeriod;
use crate::error::FetchError;
use crate::rates::Locale;

/// The registry archive is a few MiB; the tables inside run to about 10 MiB.
const MAX_BODY: u64 = 64 * 1024 * 1024;

pub trait RatesFetch {
    /// Daily rates feed for `on_date`, or the latest one.
    fn daily(&self, on_date: Option<Date>, locale: Locale) -> Result<Vec<u8>, FetchError>;

    /// Currency catalog list.
    fn catalog(&self, period: CatalogPeriod) -> Result<Vec<u8>, FetchError>;
}

pub trait RegistryFetch {
    /// Directory tables in force on `on_date`, or today.
    fn registry(&self, on_date: Option<Date>) -> Result<RegistryFiles, FetchError>;
}

const BANKS_TABLE: &str = "BNKSEEK.DBF";
const SWIFT_TABLE: &str = "BIK_SWIF.DBF";
const REGIONS_TABLE: &str = "REG.DBF";
const PLACE_TYPES_TABLE: &str = "TNP.DBF";
const PARTICIPANT_TYPES_TABLE: &str = "PZN.DBF";
const PAY_TYPES_TABLE: &str = "UER.DBF";

/// Fetches everything from the Bank of Russia web site, one blocking request per document.
pub struct HttpFetcher {
    agent: Agent,
    config: FetchConfig,
}

impl HttpFetcher {
    pub fn new(config: FetchConfig) -> Self {
        let agent = Agent::new_with_config(
            Agent::config_builder()
                .timeout_global(Some(config.timeout))
                .build(),
        );
        HttpFetcher { agent, config }
    }

    fn get(&self, url: &str, query: &[(&str, String)]) -> Result<Vec<u8>, FetchError> {
        debug!("Getting {url} {query:?}");
        let request = query.iter().fold(
            self.agent
                .get(url)
                .header("User-Agent", self.config.user_agent.as_str()),
            |request, (key, value)| request.query(key, value),
        );
        let mut resp = request
            .call()
            .map_err(|e| FetchError::from_ureq(url, e))?;
        resp.body_mut()
            .with_config()
            .limit(MAX_BODY)
            .read_to_vec()
            .map_err(|e| FetchError::from_ureq(url, e))
    }

    /// Like [`HttpFetcher::get`], with a missing document reported as `None`.
    fn get_optional(&self, url: &str) -> Result<Option<Vec<u8>>, FetchError> {
        match self.get(url, &[]) {
            Ok(body) => Ok(Some(body)),
            Err(FetchError::Status { status: 404, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        HttpFetcher::new(FetchConfig::default())
    }
}

impl RatesFetch for HttpFetcher {
    fn daily(&self, on_date: Option<Date>, locale: Locale) -> Result<Vec<u8>, FetchError> {
        let url = match locale {
            Locale::Ru => format!("{}/XML_daily.asp", self.config.base_url),
            Locale::En => format!("{}/XML_daily_eng.asp", self.config.base_url),
        };
        let query: Vec<_> = on_date
            .map(|d| ("date_req", d.strftime("%d/%m/%Y").to_string()))
            .into_iter()
            .collect();
        self.get(&url, &query)
    }

    fn catalog(&self, period: CatalogPeriod) -> Result<Vec<u8>, FetchError> {
        let url = format!("{}/XML_valFull.asp", self.config.base_url);
        match period {
            CatalogPeriod::Daily => self.get(&url, &[]),
            CatalogPeriod::Monthly => self.get(&url, &[("d", "1".to_string())]),
        }
    }
}

impl RegistryFetch for HttpFetcher {
    /// Downloads the dated directory archive, then the separately published SWIFT archive. A
    /// missing SWIFT archive leaves whatever SWIFT table the directory archive carried.
    fn registry(&self, on_date: Option<Date>) -> Result<RegistryFiles, FetchError> {
        let on_date = on_date.unwrap_or_else(|| Zoned::now().date());
        let url = format!(
            "{}/bik_db_{}.zip",
            self.config.registry_url,
            on_date.strftime("%d%m%Y")
        );
        let mut files = registry_archive(&url, &self.get(&url, &[])?)?;

        let swift_url = &self.config.swift_url;
        if let Some(archive) = self.get_optional(swift_url)? {
            let swift = unpack(swift_url, &archive)?.remove(SWIFT_TABLE);
            files.swift = swift.or(files.swift);
        }
        Ok(files)
    }
}

/// Directory tables from a downloaded `bik_db_DDMMYYYY.zip`.
fn registry_archive(url: &str, bytes: &[u8]) -> Result<RegistryFiles, FetchError> {
    let mut tables = unpack(url, bytes)?;
    collect_tables(
        |table| Ok(tables.remove(table)),
        || FetchError::Archive {
            url: url.to_string(),
            reason: format!("no {BANKS_TABLE} inside"),
        },
    )
}

/// Archive members keyed by upper-cased file name; folders inside the archive are ignored.
fn unpack(url: &str, bytes: &[u8]) -> Result<HashMap<String, Vec<u8>>, FetchError> {
    let broken = |e: ZipError| FetchError::Archive {
        url: url.to_string(),
        reason: e.to_string(),
    };
    let mut archive = ZipArchive::new(Cursor::new(bytes)).map_err(broken)?;
    let mut tables = HashMap::new();
    for i in 0..archive.len() {
        let mut file = archive.by_index(i).map_err(broken)?;
        if file.is_dir() {
            continue;
        }
        let name = file
            .name()
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_ascii_uppercase();
        let mut data = Vec::new();
        file.read_to_end(&mut data).map_err(|e| broken(ZipError::from(e)))?;
        tables.insert(name, data);
    }
    debug!("Unpacked {} files from {url}", tables.len());
    Ok(tables)
}

/// Assemble the tables from any source. Only the participant table is mandatory.
fn collect_tables(
    mut read: impl FnMut(&str) -> Result<Option<Vec<u8>>, FetchError>,
    missing_banks: impl FnOnce() -> FetchError,
) -> Result<RegistryFiles, FetchError> {
    Ok(RegistryFiles {
        banks: read(BANKS_TABLE)?.ok_or_else(missing_banks)?,
        swift: read(SWIFT_TABLE)?,
        regions: read(REGIONS_TABLE)?,
        place_types: read(PLACE_TYPES_TABLE)?,
        participant_types: read(PARTICIPANT_TYPES_TABLE)?,
        pay_types: read(PAY_TYPES_TABLE)?,
    })
}

/// Reads the directory tables from an unpacked archive. File names match case-insensitively,
/// since the archives have shipped with both cases. The directory holds one snapshot, so the
/// requested date is not consulted.
pub struct DirectoryRegistry {
    dir: PathBuf,
}

impl DirectoryRegistry {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        DirectoryRegistry { dir: dir.into() }
    }

    fn find(&self, table: &str) -> Result<Option<PathBuf>, FetchError> {
        let entries = fs::read_dir(&self.dir).map_err(|e| io_error(&self.dir, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| io_error(&self.dir, e))?;
            if entry.file_name().to_string_lossy().eq_ignore_ascii_case(table) {
                return Ok(Some(entry.path()));
            }
        }
        Ok(None)
    }

    fn read_optional(&self, table: &str) -> Result<Option<Vec<u8>>, FetchError> {
        self.find(table)?
            .map(|path| fs::read(&path).map_err(|e| io_error(&path, e)))
            .transpose()
    }
}

impl RegistryFetch for DirectoryRegistry {
    fn registry(&self, _on_date: Option<Date>) -> Result<RegistryFiles, FetchError> {
        debug!("Reading registry tables from {}", self.dir.display());
        collect_tables(
            |table| self.read_optional(table),
            || {
                io_error(
                    &self.dir.join(BANKS_TABLE),
                    io::Error::from(io::ErrorKind::NotFound),
                )
            },
        )
    }
}

fn io_error(path: &Path, source: io::Error) -> FetchError {
    FetchError::Io {
        path: path.display().to_string(),
        source,
    }
}
