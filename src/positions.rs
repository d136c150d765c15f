use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::config::{Locator, first_existing};
use crate::error::Error;
use crate::model::{DeclarationRole, IdType, PlateFormat};

pub const DEFAULT_FONT_SIZE: f32 = 9.0;

/// Where a field is drawn, in template page points with a top-left origin
/// (the calibration tools measure from the top of the sheet).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FieldPosition {
    pub x: f32,
    pub y: f32,
    pub font_size: f32,
    pub page: usize,
}

macro_rules! field_keys {
    ($($variant:ident => $key:literal, $x:expr, $y:expr;)*) => {
        /// Every field the overlay can place. The JSON key of the position map is
        /// [`FieldKey::as_str`]; the built-in anchor is used when the map lacks it.
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        pub enum FieldKey {
            $($variant,)*
        }

        impl FieldKey {
            pub const ALL: &'static [FieldKey] = &[$(FieldKey::$variant,)*];

            pub fn as_str(self) -> &'static str {
                match self {
                    $(FieldKey::$variant => $key,)*
                }
            }

            pub fn default_anchor(self) -> (f32, f32) {
                match self {
                    $(FieldKey::$variant => ($x as f32, $y as f32),)*
                }
            }

            pub fn from_key(key: &str) -> Option<FieldKey> {
                match key {
                    $($key => Some(FieldKey::$variant),)*
                    _ => None,
                }
            }
        }
    };
}

// Anchors for rows that share a y with another field (connector, quantity,
// plate choices) carry the row's usual y; callers pass the resolved row y.
field_keys! {
    TransactionNewPln => "transactionNewPLN", 60, 140;
    IdTypeTrafficRegister => "idTypeTrafficRegister", 60, 195;
    IdTypeNamibiaId => "idTypeNamibiaID", 180, 195;
    IdTypeBusinessReg => "idTypeBusinessReg", 320, 195;
    IdNumber => "idNumber", 80, 228;
    BusinessName => "businessName", 80, 258;
    Surname => "surname", 80, 258;
    NameConnector => "nameConnector", 300, 258;
    Initials => "initials", 330, 258;
    PostalAddressLine1 => "postalAddressLine1", 80, 293;
    PostalAddressLine2 => "postalAddressLine2", 80, 311;
    PostalAddressLine3 => "postalAddressLine3", 80, 329;
    StreetAddressLine1 => "streetAddressLine1", 80, 363;
    StreetAddressLine2 => "streetAddressLine2", 80, 381;
    StreetAddressLine3 => "streetAddressLine3", 80, 399;
    TelephoneHomeCode => "telephoneHomeCode", 200, 433;
    TelephoneHomeNumber => "telephoneHomeNumber", 280, 433;
    TelephoneDayCode => "telephoneDayCode", 200, 451;
    TelephoneDayNumber => "telephoneDayNumber", 280, 451;
    CellNumberCode => "cellNumberCode", 200, 469;
    CellNumberNumber => "cellNumberNumber", 280, 469;
    Email => "email", 200, 487;
    PlateFormatLongGerman => "plateFormatLongGerman", 60, 575;
    PlateFormatNormal => "plateFormatNormal", 60, 575;
    PlateFormatAmerican => "plateFormatAmerican", 60, 575;
    PlateFormatSquare => "plateFormatSquare", 60, 575;
    PlateFormatMotorcycle => "plateFormatMotorcycle", 60, 575;
    PlateQuantity => "plateQuantity", 230, 575;
    PlateChoice1 => "plateChoice1", 300, 575;
    PlateChoice2 => "plateChoice2", 380, 575;
    PlateChoice3 => "plateChoice3", 460, 575;
    RepresentativeIdTypeTraffic => "representativeIdTypeTraffic", 60, 673;
    RepresentativeIdTypeIdDoc => "representativeIdTypeIDDoc", 180, 673;
    RepresentativeIdNumber => "representativeIdNumber", 80, 698;
    RepresentativeSurname => "representativeSurname", 80, 723;
    RepresentativeNameConnector => "representativeNameConnector", 300, 723;
    RepresentativeInitials => "representativeInitials", 330, 723;
    VehicleCurrentLicence => "vehicleCurrentLicence", 250, 763;
    VehicleRegisterNumber => "vehicleRegisterNumber", 250, 781;
    VehicleChassisNumber => "vehicleChassisNumber", 250, 799;
    VehicleMake => "vehicleMake", 250, 817;
    VehicleSeries => "vehicleSeries", 250, 835;
    DeclarationRoleApplicant => "declarationRoleApplicant", 60, 493;
    DeclarationRoleProxy => "declarationRoleProxy", 180, 493;
    DeclarationRoleRepresentative => "declarationRoleRepresentative", 320, 493;
    DeclarationPlace => "declarationPlace", 450, 813;
    DeclarationYear => "declarationYear", 490, 831;
    DeclarationMonth => "declarationMonth", 510, 831;
    DeclarationDay => "declarationDay", 530, 831;
}

impl FieldKey {
    pub fn id_type(id_type: IdType) -> FieldKey {
        match id_type {
            IdType::TrafficRegisterNumber => FieldKey::IdTypeTrafficRegister,
            IdType::NamibiaIdDoc => FieldKey::IdTypeNamibiaId,
            IdType::BusinessRegNo => FieldKey::IdTypeBusinessReg,
        }
    }

    /// The representative block only offers the two personal id types.
    pub fn representative_id_type(id_type: IdType) -> Option<FieldKey> {
        match id_type {
            IdType::TrafficRegisterNumber => Some(FieldKey::RepresentativeIdTypeTraffic),
            IdType::NamibiaIdDoc => Some(FieldKey::RepresentativeIdTypeIdDoc),
            IdType::BusinessRegNo => None,
        }
    }

    pub fn plate_format(format: PlateFormat) -> FieldKey {
        match format {
            PlateFormat::LongGerman => FieldKey::PlateFormatLongGerman,
            PlateFormat::Normal => FieldKey::PlateFormatNormal,
            PlateFormat::American => FieldKey::PlateFormatAmerican,
            PlateFormat::Square => FieldKey::PlateFormatSquare,
            PlateFormat::SmallMotorcycle => FieldKey::PlateFormatMotorcycle,
        }
    }

    pub fn declaration_role(role: DeclarationRole) -> FieldKey {
        match role {
            DeclarationRole::Applicant => FieldKey::DeclarationRoleApplicant,
            DeclarationRole::Proxy => FieldKey::DeclarationRoleProxy,
            DeclarationRole::Representative => FieldKey::DeclarationRoleRepresentative,
        }
    }

    pub const PLATE_CHOICES: [FieldKey; 3] = [
        FieldKey::PlateChoice1,
        FieldKey::PlateChoice2,
        FieldKey::PlateChoice3,
    ];
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PositionEntry {
    x: f32,
    y: f32,
    #[serde(default)]
    font_size: Option<f32>,
    #[serde(default)]
    page: Option<usize>,
}

#[derive(Clone, Debug, Default, Deserialize)]
struct PositionFile {
    #[serde(default)]
    fields: HashMap<String, PositionEntry>,
}

/// Field key → position table. Built-in anchors are always available; entries
/// loaded from a position map override them key by key.
#[derive(Clone, Debug, Default)]
pub struct PositionRegistry {
    overrides: HashMap<FieldKey, PositionEntry>,
    source: Option<PathBuf>,
}

impl PositionRegistry {
    /// Built-in anchors only.
    pub fn defaults() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self, Error> {
        let file: PositionFile =
            serde_json::from_str(json).map_err(|e| Error::Config(format!("position map: {e}")))?;
        let mut overrides = HashMap::new();
        for (key, entry) in file.fields {
            if !entry.x.is_finite() || !entry.y.is_finite() {
                return Err(Error::Config(format!(
                    "position map: non-finite coordinate for {key}"
                )));
            }
            match FieldKey::from_key(&key) {
                Some(field) => {
                    overrides.insert(field, entry);
                }
                None => log::warn!("Position map entry {key:?} matches no known field, ignored"),
            }
        }
        Ok(Self {
            overrides,
            source: None,
        })
    }

    pub fn from_path(path: &Path) -> Result<Self, Error> {
        let json = std::fs::read_to_string(path)?;
        let mut registry = Self::from_json(&json)?;
        registry.source = Some(path.to_path_buf());
        Ok(registry)
    }

    /// Load from the first existing candidate. No candidate is not an error:
    /// the registry then serves built-in anchors only.
    pub fn locate(locators: &[Locator]) -> Result<Self, Error> {
        let (found, tried) = first_existing(locators);
        match found {
            Some(path) => {
                let registry = Self::from_path(&path)?;
                log::info!(
                    "Loaded field positions from {} ({} entries)",
                    path.display(),
                    registry.overrides.len()
                );
                Ok(registry)
            }
            None => {
                log::warn!(
                    "No {} found (tried {:?}), using built-in coordinates",
                    crate::config::POSITIONS_FILE,
                    tried
                );
                Ok(Self::defaults())
            }
        }
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn override_count(&self) -> usize {
        self.overrides.len()
    }

    pub fn resolve(&self, key: FieldKey) -> FieldPosition {
        let (x, y) = key.default_anchor();
        self.resolve_with(key, x, y, DEFAULT_FONT_SIZE)
    }

    /// Configured entry if present, otherwise the caller's defaults.
    pub fn resolve_with(
        &self,
        key: FieldKey,
        default_x: f32,
        default_y: f32,
        default_font_size: f32,
    ) -> FieldPosition {
        match self.overrides.get(&key) {
            Some(entry) => FieldPosition {
                x: entry.x,
                y: entry.y,
                font_size: entry.font_size.unwrap_or(default_font_size),
                page: entry.page.unwrap_or(0),
            },
            None => FieldPosition {
                x: default_x,
                y: default_y,
                font_size: default_font_size,
                page: 0,
            },
        }
    }

    /// Field sitting on the row of another, already resolved field: the
    /// built-in x of `key`, the row's y and page.
    pub fn resolve_in_row(&self, key: FieldKey, row: FieldPosition) -> FieldPosition {
        let (x, _) = key.default_anchor();
        let mut pos = self.resolve_with(key, x, row.y, DEFAULT_FONT_SIZE);
        if !self.overrides.contains_key(&key) {
            pos.page = row.page;
        }
        pos
    }
}
