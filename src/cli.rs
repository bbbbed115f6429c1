use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use jiff::civil::Date;

use crate::annotate::annotate_all;
use crate::config::{CBR_BASE_URL, CBR_REGISTRY_URL, CBR_SWIFT_URL, FetchConfig};
use crate::currencies::CatalogPeriod;
use crate::error::Result;
use crate::fetch::{DirectoryRegistry, HttpFetcher, RegistryFetch};
use crate::query::{retrieve_banks, retrieve_catalog, retrieve_currencies, retrieve_rates};
use crate::rates::Locale;

/// Query reference data published by the Bank of Russia: official exchange rates, the currency
/// catalog and the BIC bank directory.
#[derive(Parser)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Base URL of the XML services
    #[arg(long, global = true, env = "CBR_BASE_URL", default_value = CBR_BASE_URL)]
    pub base_url: String,

    /// URL of the directory holding the dated BIC directory archives
    #[arg(long, global = true, env = "CBR_REGISTRY_URL", default_value = CBR_REGISTRY_URL)]
    pub registry_url: String,

    /// URL of the BIC to SWIFT archive
    #[arg(long, global = true, env = "CBR_SWIFT_URL", default_value = CBR_SWIFT_URL)]
    pub swift_url: String,

    /// Request timeout in seconds
    #[arg(long, global = true, env = "CBR_TIMEOUT", default_value_t = 10)]
    pub timeout: u64,

    /// Log filter used when RUST_LOG is not set (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "CBR_LOG_LEVEL", default_value = "warn")]
    pub log_level: String,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Official exchange rates for a date. Falls back to the preceding business day when the
    /// date has no publication.
    Rates(RatesArgs),
    /// Bank directory entries
    Banks(BanksArgs),
    /// Known currencies
    Currencies(CurrenciesArgs),
}

#[derive(Args)]
pub struct RatesArgs {
    /// Date to get rates for (format: YYYY-MM-DD); latest if omitted
    #[arg(short, long, value_name = "DATE")]
    pub date: Option<Date>,

    /// Single currency to show (e.g. USD, 840, R01235)
    #[arg(short, long)]
    pub currency: Option<String>,

    /// Language of the currency names
    #[arg(long, value_enum, default_value_t = Locale::En)]
    pub locale: Locale,
}

#[derive(Args)]
pub struct BanksArgs {
    /// Date of the directory (format: YYYY-MM-DD); today if omitted
    #[arg(short, long, value_name = "DATE")]
    pub date: Option<Date>,

    /// BIC or SWIFT code to show; may be repeated
    #[arg(short, long = "bic", value_name = "CODE")]
    pub bics: Vec<String>,

    /// Leave out participants with a revoked licence or other restriction
    #[arg(long)]
    pub active_only: bool,

    /// Read the tables from an unpacked directory archive instead of the network
    #[arg(long, value_name = "DIR")]
    pub registry_dir: Option<PathBuf>,

    /// Language of the field labels
    #[arg(long, value_enum, default_value_t = Locale::Ru)]
    pub locale: Locale,
}

#[derive(Args)]
pub struct CurrenciesArgs {
    /// Single currency to show (e.g. AUD, 36, R01010)
    #[arg(short, long)]
    pub currency: Option<String>,

    /// Only currencies whose rates are set monthly
    #[arg(long)]
    pub monthly: bool,
}

impl Cli {
    pub fn fetch_config(&self) -> FetchConfig {
        FetchConfig::default()
            .with_base_url(&self.base_url)
            .with_registry_url(&self.registry_url)
            .with_swift_url(&self.swift_url)
            .with_timeout(Duration::from_secs(self.timeout))
    }
}

pub fn run(cli: &Cli) -> Result<()> {
    let http = HttpFetcher::new(cli.fetch_config());
    match &cli.command {
        Command::Rates(args) => {
            let rates = retrieve_rates(&http, args.date, args.locale)?;
            if let Some(currency) = &args.currency {
                let rate = rates.get(currency)?;
                if cli.json {
                    print_json(rate);
                } else {
                    println!("{}", rates.date_received);
                    println!("[{}] {} - {}", rate.code, rate.name, rate.rate);
                }
            } else if cli.json {
                print_json(&rates);
            } else {
                println!("{}", rates.date_received);
                println!("{}", "=".repeat(10));
                let mut sorted: Vec<_> = rates.rates().iter().collect();
                sorted.sort_by(|a, b| a.code.cmp(&b.code));
                for rate in sorted {
                    println!("[{}] {} - {}", rate.code, rate.name, rate.rate);
                }
            }
        }
        Command::Banks(args) => {
            let source: Box<dyn RegistryFetch> = match &args.registry_dir {
                Some(dir) => Box::new(DirectoryRegistry::new(dir)),
                None => Box::new(http),
            };
            let filter = (!args.bics.is_empty()).then_some(args.bics.as_slice());
            let banks = retrieve_banks(source.as_ref(), args.date, filter, args.active_only)?;
            if let Some(missing) = args.bics.iter().find(|bic| banks.get(bic).is_err()) {
                tracing::warn!("No bank with code {missing}");
            }
            if cli.json {
                print_json(&banks);
            } else {
                for bank in annotate_all(banks.banks(), args.locale) {
                    println!();
                    for (title, value) in bank {
                        println!("{title}: {value}");
                    }
                }
            }
        }
        Command::Currencies(args) => {
            let currencies = if args.monthly {
                retrieve_catalog(&http, CatalogPeriod::Monthly)?
            } else {
                retrieve_currencies(&http)?
            };
            let shown = match &args.currency {
                Some(key) => vec![currencies.get(key)?],
                None => currencies.currencies().iter().collect(),
            };
            if cli.json {
                print_json(&shown);
            } else {
                for currency in shown {
                    println!(
                        "{} [{}/{}] {} ({}) x{}",
                        currency.id,
                        currency.code.as_deref().unwrap_or("-"),
                        currency.num.as_deref().unwrap_or("-"),
                        currency.name_eng,
                        currency.name_ru,
                        currency.par
                    );
                }
            }
        }
    }
    Ok(())
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(e) => tracing::error!("Failed to serialize output: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use jiff::civil::date;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_rates() {
        let cli =
            Cli::try_parse_from(["cbr_refdata", "rates", "-d", "2016-06-26", "-c", "USD"]).unwrap();
        let Command::Rates(args) = cli.command else {
            panic!("expected rates command");
        };
        assert_eq!(args.date, Some(date(2016, 6, 26)));
        assert_eq!(args.currency.as_deref(), Some("USD"));
        assert_eq!(args.locale, Locale::En);
    }

    #[test]
    fn test_parse_banks() {
        let cli = Cli::try_parse_from([
            "cbr_refdata",
            "banks",
            "-d",
            "2018-06-29",
            "-b",
            "045004641",
            "--bic",
            "SABRRUMMNH1",
            "--active-only",
            "--timeout",
            "3",
        ])
        .unwrap();
        assert_eq!(cli.fetch_config().timeout, Duration::from_secs(3));
        let Command::Banks(args) = cli.command else {
            panic!("expected banks command");
        };
        assert_eq!(args.date, Some(date(2018, 6, 29)));
        assert_eq!(args.bics, ["045004641", "SABRRUMMNH1"]);
        assert!(args.active_only);
        assert_eq!(args.registry_dir, None);
    }

    #[test]
    fn test_parse_currencies() {
        let cli = Cli::try_parse_from(["cbr_refdata", "currencies", "--monthly"]).unwrap();
        let Command::Currencies(args) = cli.command else {
            panic!("expected currencies command");
        };
        assert!(args.monthly);
        assert_eq!(args.currency, None);

        let cli = Cli::try_parse_from(["cbr_refdata", "currencies", "-c", "KPW"]).unwrap();
        assert_eq!(cli.fetch_config().swift_url, CBR_SWIFT_URL);
        let Command::Currencies(args) = cli.command else {
            panic!("expected currencies command");
        };
        assert!(!args.monthly);
    }
}
