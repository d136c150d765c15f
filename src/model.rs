use std::path::Path;

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Deserializer};

use crate::error::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub enum IdType {
    #[serde(rename = "Traffic Register Number")]
    TrafficRegisterNumber,
    #[serde(rename = "Namibia ID-doc")]
    NamibiaIdDoc,
    #[serde(rename = "Business Reg. No")]
    BusinessRegNo,
}

impl IdType {
    pub const ALL: [IdType; 3] = [
        IdType::TrafficRegisterNumber,
        IdType::NamibiaIdDoc,
        IdType::BusinessRegNo,
    ];

    pub fn label(self) -> &'static str {
        match self {
            IdType::TrafficRegisterNumber => "Traffic Register Number",
            IdType::NamibiaIdDoc => "Namibia ID-doc",
            IdType::BusinessRegNo => "Business Reg. No",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub enum PlateFormat {
    #[serde(rename = "Long/German")]
    LongGerman,
    Normal,
    American,
    Square,
    #[serde(rename = "Small motorcycle")]
    SmallMotorcycle,
}

impl PlateFormat {
    pub const ALL: [PlateFormat; 5] = [
        PlateFormat::LongGerman,
        PlateFormat::Normal,
        PlateFormat::American,
        PlateFormat::Square,
        PlateFormat::SmallMotorcycle,
    ];

    /// Row caption as printed on the official form.
    pub fn label(self) -> &'static str {
        match self {
            PlateFormat::LongGerman => "Long/German format (520 mm x 110mm)",
            PlateFormat::Normal => "Normal format (440 mm x 120mm)",
            PlateFormat::American => "American format (305 mm x 165mm)",
            PlateFormat::Square => "Square format (250 mm x 205mm)",
            PlateFormat::SmallMotorcycle => "Small motorcycle format (250 mm x 165mm)",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeclarationRole {
    Applicant,
    Proxy,
    Representative,
}

impl DeclarationRole {
    pub const ALL: [DeclarationRole; 3] = [
        DeclarationRole::Applicant,
        DeclarationRole::Proxy,
        DeclarationRole::Representative,
    ];

    pub fn label(self) -> &'static str {
        match self {
            DeclarationRole::Applicant => "applicant / holder of a personalised licence number",
            DeclarationRole::Proxy => "applicant / holder's proxy",
            DeclarationRole::Representative => "applicant / holder's representative",
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Address {
    #[serde(default)]
    pub line1: Option<String>,
    #[serde(default)]
    pub line2: Option<String>,
    #[serde(default)]
    pub line3: Option<String>,
}

impl Address {
    pub fn lines(&self) -> [Option<&str>; 3] {
        [
            present(&self.line1),
            present(&self.line2),
            present(&self.line3),
        ]
    }

    /// Non-empty lines joined with ", ".
    pub fn joined(&self) -> String {
        self.lines()
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct PhoneNumber {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub number: String,
}

impl PhoneNumber {
    pub fn concatenated(&self) -> String {
        format!("{}{}", self.code.trim(), self.number.trim())
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct PlateChoice {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub meaning: Option<String>,
}

/// Validated application for a personalised licence number, as handed over by
/// the portal backend. Read-only to the engine.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApplicationRecord {
    pub reference_id: Option<String>,
    pub transaction_type: Option<String>,

    pub id_type: Option<IdType>,
    pub traffic_register_number: Option<String>,
    pub business_reg_number: Option<String>,
    pub id_number: Option<String>,
    pub surname: Option<String>,
    pub initials: Option<String>,
    pub business_name: Option<String>,
    pub full_name: Option<String>,

    pub postal_address: Option<Address>,
    pub street_address: Option<Address>,

    pub telephone_home: Option<PhoneNumber>,
    pub telephone_day: Option<PhoneNumber>,
    pub cell_number: Option<PhoneNumber>,
    pub phone_number: Option<String>,
    pub email: Option<String>,

    pub plate_format: Option<PlateFormat>,
    pub quantity: Option<u8>,
    pub plate_choices: Vec<PlateChoice>,

    pub has_representative: bool,
    pub representative_id_type: Option<IdType>,
    pub representative_id_number: Option<String>,
    pub representative_surname: Option<String>,
    pub representative_initials: Option<String>,

    pub current_licence_number: Option<String>,
    pub vehicle_register_number: Option<String>,
    pub chassis_number: Option<String>,
    pub vehicle_make: Option<String>,
    pub series_name: Option<String>,

    pub declaration_accepted: bool,
    pub declaration_place: Option<String>,
    #[serde(deserialize_with = "deserialize_declaration_date")]
    pub declaration_date: Option<NaiveDate>,
    pub declaration_role: Option<DeclarationRole>,
}

pub const DEFAULT_TRANSACTION: &str = "New Personalised Licence Number";

impl ApplicationRecord {
    pub fn from_json(json: &str) -> Result<Self, Error> {
        serde_json::from_str(json).map_err(|e| Error::InvalidRecord(e.to_string()))
    }

    pub fn from_path(path: &Path) -> Result<Self, Error> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            Error::Io(std::io::Error::new(e.kind(), format!("{}: {}", e, path.display())))
        })?;
        Self::from_json(&json)
    }

    /// Number printed in the identification grid. Personal id types prefer the
    /// traffic register number, businesses the registration number; both fall
    /// back to the generic id number.
    pub fn identification_number(&self) -> Option<&str> {
        match self.id_type? {
            IdType::TrafficRegisterNumber | IdType::NamibiaIdDoc => {
                present(&self.traffic_register_number).or(present(&self.id_number))
            }
            IdType::BusinessRegNo => {
                present(&self.business_reg_number).or(present(&self.id_number))
            }
        }
    }

    /// A business name replaces surname and initials only for business
    /// registrations that actually carry one.
    pub fn shows_business_name(&self) -> bool {
        self.id_type == Some(IdType::BusinessRegNo) && present(&self.business_name).is_some()
    }

    pub fn display_full_name(&self) -> Option<String> {
        if let Some(name) = present(&self.full_name) {
            return Some(name.to_string());
        }
        let joined = format!(
            "{} {}",
            present(&self.surname).unwrap_or(""),
            present(&self.initials).unwrap_or("")
        );
        let joined = joined.trim();
        (!joined.is_empty()).then(|| joined.to_string())
    }

    pub fn has_vehicle_particulars(&self) -> bool {
        [
            &self.current_licence_number,
            &self.vehicle_register_number,
            &self.chassis_number,
            &self.vehicle_make,
            &self.series_name,
        ]
        .into_iter()
        .any(|v| present(v).is_some())
    }

    pub fn transaction(&self) -> &str {
        present(&self.transaction_type).unwrap_or(DEFAULT_TRANSACTION)
    }
}

/// `Some` only for values with visible content.
pub fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.trim().is_empty())
}

/// Two-character year, month and day parts used by the multi-box date fields.
pub fn date_parts(date: NaiveDate) -> [String; 3] {
    [
        date.format("%y").to_string(),
        date.format("%m").to_string(),
        date.format("%d").to_string(),
    ]
}

fn deserialize_declaration_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    let Some(raw) = raw.filter(|s| !s.trim().is_empty()) else {
        return Ok(None);
    };
    parse_date(raw.trim())
        .map(Some)
        .ok_or_else(|| serde::de::Error::custom(format!("unrecognised date: {raw}")))
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    let day = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_portal_json() {
        let record = ApplicationRecord::from_json(
            r#"{
                "idType": "Business Reg. No",
                "businessRegNumber": "CC/2019/0042",
                "businessName": "Acme Traders",
                "postalAddress": {"line1": "PO Box 1", "line2": ""},
                "plateFormat": "Small motorcycle",
                "quantity": 2,
                "plateChoices": [{"text": "ACME1", "meaning": "company"}],
                "declarationDate": "2024-01-15T08:30:00.000Z",
                "declarationRole": "proxy",
                "somethingTheEngineIgnores": true
            }"#,
        )
        .expect("parse");
        assert_eq!(record.id_type, Some(IdType::BusinessRegNo));
        assert_eq!(record.identification_number(), Some("CC/2019/0042"));
        assert!(record.shows_business_name());
        assert_eq!(record.plate_format, Some(PlateFormat::SmallMotorcycle));
        assert_eq!(record.declaration_role, Some(DeclarationRole::Proxy));
        assert_eq!(
            record.declaration_date,
            NaiveDate::from_ymd_opt(2024, 1, 15)
        );
        let postal = record.postal_address.as_ref().expect("postal");
        assert_eq!(postal.lines(), [Some("PO Box 1"), None, None]);
    }

    #[test]
    fn malformed_record_is_an_invalid_record_error() {
        let err = ApplicationRecord::from_json(r#"{"quantity": "two"}"#).expect_err("must fail");
        assert!(matches!(err, Error::InvalidRecord(_)), "got {err}");
    }

    #[test]
    fn identification_number_falls_back_to_id_number() {
        let record = ApplicationRecord {
            id_type: Some(IdType::NamibiaIdDoc),
            id_number: Some("85010112345".into()),
            traffic_register_number: Some("  ".into()),
            ..Default::default()
        };
        assert_eq!(record.identification_number(), Some("85010112345"));
    }

    #[test]
    fn business_name_needs_business_id_type() {
        let record = ApplicationRecord {
            id_type: Some(IdType::TrafficRegisterNumber),
            business_name: Some("Acme".into()),
            ..Default::default()
        };
        assert!(!record.shows_business_name());
    }

    #[test]
    fn date_parts_are_two_characters() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 5).expect("date");
        assert_eq!(date_parts(date), ["24", "01", "05"]);
    }

    #[test]
    fn plain_dates_and_garbage() {
        assert_eq!(parse_date("2023-12-31"), NaiveDate::from_ymd_opt(2023, 12, 31));
        assert_eq!(parse_date("31/12/2023"), None);
        assert!(ApplicationRecord::from_json(r#"{"declarationDate": "soon"}"#).is_err());
    }

    #[test]
    fn full_name_is_derived_from_surname_and_initials() {
        let record = ApplicationRecord {
            surname: Some("Shikongo".into()),
            initials: Some("T.N".into()),
            ..Default::default()
        };
        assert_eq!(record.display_full_name().as_deref(), Some("Shikongo T.N"));
        assert_eq!(ApplicationRecord::default().display_full_name(), None);
    }
}
