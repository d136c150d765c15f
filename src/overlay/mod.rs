mod canvas;

pub use canvas::{DocumentCanvas, DrawReport, TextRun};

use crate::error::Error;
use crate::model::{self, ApplicationRecord, IdType, PhoneNumber, present};
use crate::positions::{FieldKey, FieldPosition, PositionRegistry};

/// Size of the "and" between surname and initials on the printed form.
const CONNECTOR_SIZE: f32 = 9.0;

/// Values go on the form in block capitals, except where case matters.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Case {
    Upper,
    AsIs,
}

struct Overlay<'a> {
    canvas: DocumentCanvas,
    registry: &'a PositionRegistry,
}

impl Overlay<'_> {
    fn text(&mut self, value: Option<&str>, pos: FieldPosition, case: Case) -> Result<(), Error> {
        self.text_sized(value, pos, case, None)
    }

    fn text_sized(
        &mut self,
        value: Option<&str>,
        pos: FieldPosition,
        case: Case,
        size: Option<f32>,
    ) -> Result<(), Error> {
        let Some(value) = value else {
            return Ok(());
        };
        let value = match case {
            Case::Upper => value.to_uppercase(),
            Case::AsIs => value.to_string(),
        };
        if let Some(run) = TextRun::new(&value) {
            self.canvas.draw_text(&run, pos, size)?;
        }
        Ok(())
    }

    fn field(&mut self, key: FieldKey, value: Option<&str>) -> Result<(), Error> {
        let pos = self.registry.resolve(key);
        self.text(value, pos, Case::Upper)
    }

    fn check(&mut self, key: FieldKey) -> Result<(), Error> {
        let pos = self.registry.resolve(key);
        self.canvas.draw_checkbox(pos)?;
        Ok(())
    }

    fn phone(
        &mut self,
        phone: Option<&PhoneNumber>,
        code: FieldKey,
        number: FieldKey,
    ) -> Result<(), Error> {
        let Some(phone) = phone else {
            return Ok(());
        };
        self.field(code, Some(&phone.code))?;
        self.field(number, Some(&phone.number))
    }

    /// Surname, a fixed "and", then initials, all on the surname's row.
    fn name_row(
        &mut self,
        surname: Option<&str>,
        initials: Option<&str>,
        keys: [FieldKey; 3],
    ) -> Result<(), Error> {
        let [surname_key, connector_key, initials_key] = keys;
        if surname.is_none() || initials.is_none() {
            log::warn!("{} row incomplete: surname or initials missing", surname_key.as_str());
        }
        let row = self.registry.resolve(surname_key);
        self.text(surname, row, Case::Upper)?;
        let connector = self.registry.resolve_in_row(connector_key, row);
        self.text_sized(Some("and"), connector, Case::AsIs, Some(CONNECTOR_SIZE))?;
        self.field(initials_key, initials)
    }
}

/// Draw the record onto the template pages at registry positions and return
/// the saved document with a count of what was drawn and skipped.
///
/// Any error here means the template cannot carry an overlay at all; fields
/// that merely fall off the page are skipped and counted instead.
pub fn overlay(
    bytes: &[u8],
    record: &ApplicationRecord,
    registry: &PositionRegistry,
) -> Result<(Vec<u8>, DrawReport), Error> {
    let t0 = std::time::Instant::now();
    let canvas = DocumentCanvas::load(bytes)?;
    let mut o = Overlay { canvas, registry };

    // A. Owner
    o.check(FieldKey::TransactionNewPln)?;
    if let Some(id_type) = record.id_type {
        o.check(FieldKey::id_type(id_type))?;
    }
    let id_number = record.identification_number();
    if id_number.is_none() {
        log::warn!("Identification number missing for id type {:?}", record.id_type);
    }
    o.field(FieldKey::IdNumber, id_number)?;

    if record.shows_business_name() {
        o.field(FieldKey::BusinessName, present(&record.business_name))?;
    } else {
        o.name_row(
            present(&record.surname),
            present(&record.initials),
            [
                FieldKey::Surname,
                FieldKey::NameConnector,
                FieldKey::Initials,
            ],
        )?;
    }

    let postal = record.postal_address.clone().unwrap_or_default();
    let street = record.street_address.clone().unwrap_or_default();
    let postal_keys = [
        FieldKey::PostalAddressLine1,
        FieldKey::PostalAddressLine2,
        FieldKey::PostalAddressLine3,
    ];
    let street_keys = [
        FieldKey::StreetAddressLine1,
        FieldKey::StreetAddressLine2,
        FieldKey::StreetAddressLine3,
    ];
    for (key, line) in postal_keys.into_iter().zip(postal.lines()) {
        o.field(key, line)?;
    }
    for (key, line) in street_keys.into_iter().zip(street.lines()) {
        o.field(key, line)?;
    }

    o.phone(
        record.telephone_home.as_ref(),
        FieldKey::TelephoneHomeCode,
        FieldKey::TelephoneHomeNumber,
    )?;
    o.phone(
        record.telephone_day.as_ref(),
        FieldKey::TelephoneDayCode,
        FieldKey::TelephoneDayNumber,
    )?;
    o.phone(
        record.cell_number.as_ref(),
        FieldKey::CellNumberCode,
        FieldKey::CellNumberNumber,
    )?;
    let email = registry.resolve(FieldKey::Email);
    o.text(present(&record.email), email, Case::AsIs)?;

    // B. Plate: quantity and choices share the format row.
    if let Some(format) = record.plate_format {
        let row = registry.resolve(FieldKey::plate_format(format));
        o.canvas.draw_checkbox(row)?;
        let quantity = record.quantity.map(|q| q.to_string());
        let quantity_pos = registry.resolve_in_row(FieldKey::PlateQuantity, row);
        o.text(quantity.as_deref(), quantity_pos, Case::Upper)?;
        for (key, choice) in FieldKey::PLATE_CHOICES.into_iter().zip(&record.plate_choices) {
            let pos = registry.resolve_in_row(key, row);
            o.text(Some(&choice.text), pos, Case::Upper)?;
        }
    }

    // C. Representative
    if record.has_representative {
        if let Some(key) = record
            .representative_id_type
            .and_then(FieldKey::representative_id_type)
        {
            o.check(key)?;
        } else if record.representative_id_type == Some(IdType::BusinessRegNo) {
            log::warn!("Representative id type {:?} has no box on the form", IdType::BusinessRegNo);
        }
        o.field(
            FieldKey::RepresentativeIdNumber,
            present(&record.representative_id_number),
        )?;
        o.name_row(
            present(&record.representative_surname),
            present(&record.representative_initials),
            [
                FieldKey::RepresentativeSurname,
                FieldKey::RepresentativeNameConnector,
                FieldKey::RepresentativeInitials,
            ],
        )?;
    }

    // D. Vehicle
    o.field(FieldKey::VehicleCurrentLicence, present(&record.current_licence_number))?;
    o.field(FieldKey::VehicleRegisterNumber, present(&record.vehicle_register_number))?;
    o.field(FieldKey::VehicleChassisNumber, present(&record.chassis_number))?;
    o.field(FieldKey::VehicleMake, present(&record.vehicle_make))?;
    o.field(FieldKey::VehicleSeries, present(&record.series_name))?;

    // E. Declaration
    if let Some(role) = record.declaration_role {
        o.check(FieldKey::declaration_role(role))?;
    }
    o.field(FieldKey::DeclarationPlace, present(&record.declaration_place))?;
    if let Some(date) = record.declaration_date {
        let keys = [
            FieldKey::DeclarationYear,
            FieldKey::DeclarationMonth,
            FieldKey::DeclarationDay,
        ];
        for (key, part) in keys.into_iter().zip(model::date_parts(date)) {
            o.field(key, Some(&part))?;
        }
    }

    let report = o.canvas.report();
    let bytes = o.canvas.finish()?;
    log::info!(
        "Overlay: {} drawn, {} skipped in {:.1}ms ({} bytes)",
        report.drawn,
        report.skipped,
        t0.elapsed().as_secs_f64() * 1000.0,
        bytes.len()
    );
    Ok((bytes, report))
}
