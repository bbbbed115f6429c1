//! Human-readable views of directory entries.

use jiff::civil::Date;

use crate::banks::Bank;
use crate::rates::Locale;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BankField {
    Bic,
    Swift,
    Name,
    NameFull,
    DateAdded,
    DateUpdated,
    DateChange,
    ControlCode,
    ControlDate,
    Corr,
    CorrBik,
    Regnum,
    Mfo,
    Okpo,
    ParticipantType,
    PayType,
    RegionCode,
    Region,
    Zip,
    PlaceType,
    Place,
    Address,
    Phone,
    Telegraph,
    Commutator,
    RkcBic,
    Term,
}

/// Display order and labels, Russian then English.
pub const BANK_TITLES: &[(BankField, &str, &str)] = &[
    (BankField::Bic, "БИК", "BIC"),
    (BankField::Swift, "Код SWIFT", "SWIFT code"),
    (BankField::Name, "Название", "Name"),
    (BankField::NameFull, "Полное название", "Full name"),
    (BankField::DateAdded, "Дата добавления записи", "Date added"),
    (BankField::DateUpdated, "Дата обновления записи", "Date updated"),
    (BankField::DateChange, "Дата изменения реквизитов", "Details changed"),
    (BankField::ControlCode, "Код контроля", "Control code"),
    (BankField::ControlDate, "Дата контроля", "Control date"),
    (BankField::Corr, "Кор. счёт", "Correspondent account"),
    (BankField::CorrBik, "Кор. счёт (расчёты с БИК)", "Correspondent account (BIC settlements)"),
    (BankField::Regnum, "Регистрационный номер", "Registration number"),
    (BankField::Mfo, "Номер МФО", "MFO number"),
    (BankField::Okpo, "Номер ОКПО", "OKPO number"),
    (BankField::ParticipantType, "Тип", "Type"),
    (BankField::PayType, "Тип расчётов", "Settlement type"),
    (BankField::RegionCode, "Код региона ОКАТО", "OKATO region code"),
    (BankField::Region, "Регион", "Region"),
    (BankField::Zip, "Индекс", "Postal code"),
    (BankField::PlaceType, "Тип населённого пункта", "Locality type"),
    (BankField::Place, "Населённый пункт", "Locality"),
    (BankField::Address, "Адрес", "Address"),
    (BankField::Phone, "Телефон", "Phone"),
    (BankField::Telegraph, "Телеграф", "Telegraph"),
    (BankField::Commutator, "Коммутатор", "Commutator"),
    (BankField::RkcBic, "БИК РКЦ", "Settlement centre BIC"),
    (BankField::Term, "Срок проведения расчётов (дней)", "Settlement term (days)"),
];

impl BankField {
    /// Value as displayed, empty when the bank has none.
    pub fn value(self, bank: &Bank) -> String {
        let date = |d: Option<Date>| d.map(|d| d.to_string()).unwrap_or_default();
        match self {
            BankField::Bic => bank.bic.clone(),
            BankField::Swift => bank.swift.clone().unwrap_or_default(),
            BankField::Name => bank.name.clone(),
            BankField::NameFull => bank.name_full.clone(),
            BankField::DateAdded => date(bank.date_added),
            BankField::DateUpdated => date(bank.date_updated),
            BankField::DateChange => date(bank.date_change),
            BankField::ControlCode => bank.control_code.clone(),
            BankField::ControlDate => date(bank.control_date),
            BankField::Corr => bank.corr.clone(),
            BankField::CorrBik => bank.corr_bik.clone(),
            BankField::Regnum => bank.regnum.clone(),
            BankField::Mfo => bank.mfo.clone(),
            BankField::Okpo => bank.okpo.clone(),
            BankField::ParticipantType => bank.participant_type.display().to_string(),
            BankField::PayType => bank.pay_type.display().to_string(),
            BankField::RegionCode => bank.region.code.clone(),
            BankField::Region => bank.region.name.clone().unwrap_or_default(),
            BankField::Zip => bank.zip.clone(),
            BankField::PlaceType => bank.place_type.display().to_string(),
            BankField::Place => bank.place.clone(),
            BankField::Address => bank.address.clone(),
            BankField::Phone => bank.phone.clone(),
            BankField::Telegraph => bank.telegraph.clone(),
            BankField::Commutator => bank.commutator.clone(),
            BankField::RkcBic => bank.rkc_bic.clone(),
            BankField::Term => bank.term.map(|t| t.to_string()).unwrap_or_default(),
        }
    }
}

/// Label/value pairs for a bank in [`BANK_TITLES`] order, empty values left out.
pub fn annotate(bank: &Bank, locale: Locale) -> Vec<(&'static str, String)> {
    BANK_TITLES
        .iter()
        .filter_map(|&(field, ru, en)| {
            let value = field.value(bank);
            let label = match locale {
                Locale::Ru => ru,
                Locale::En => en,
            };
            (!value.is_empty()).then_some((label, value))
        })
        .collect()
}

pub fn annotate_all<'a>(
    banks: impl IntoIterator<Item = &'a Bank>,
    locale: Locale,
) -> Vec<Vec<(&'static str, String)>> {
    banks
        .into_iter()
        .map(|bank| annotate(bank, locale))
        .collect()
}
