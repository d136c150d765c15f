use std::collections::HashMap;

use lopdf::{Document, Object, ObjectId};

use crate::error::Error;
use crate::model::{
    self, Address, ApplicationRecord, DeclarationRole, IdType, PhoneNumber, PlateFormat, present,
};
use crate::template::{TerminalField, encode_text_string, resolve, resolve_dict, terminal_fields};

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum FieldValue {
    Text(String),
    Check(bool),
}

#[derive(Debug)]
enum SetError {
    Missing,
    WrongType(&'static str),
}

/// Fill the template's interactive form with the record and return the saved
/// document. Individual fields that are missing or of the wrong kind are
/// skipped; only an unreadable or unsavable document is an error.
pub fn fill(bytes: &[u8], record: &ApplicationRecord) -> Result<Vec<u8>, Error> {
    let t0 = std::time::Instant::now();
    let mut doc = Document::load_mem(bytes).map_err(|e| Error::NativeFill(e.to_string()))?;
    let fields: HashMap<String, ObjectId> = terminal_fields(&doc)
        .map_err(|e| Error::NativeFill(e.to_string()))?
        .into_iter()
        .map(|TerminalField { name, id }| (name, id))
        .collect();

    let values = native_values(record);
    let mut applied = 0usize;
    for (name, value) in &values {
        let result = match fields.get(name.as_str()) {
            None => Err(SetError::Missing),
            Some(&id) => match value {
                FieldValue::Text(text) => set_text(&mut doc, id, text),
                FieldValue::Check(on) => set_checkbox(&mut doc, id, *on),
            },
        };
        match result {
            Ok(()) => applied += 1,
            Err(SetError::Missing) => log::debug!("Could not set field {name:?}: no such field"),
            Err(SetError::WrongType(kind)) => {
                log::debug!("Could not set field {name:?}: not a {kind} field")
            }
        }
    }
    set_need_appearances(&mut doc)?;

    let mut out = Vec::new();
    doc.save_to(&mut out)
        .map_err(|e| Error::NativeFill(format!("save: {e}")))?;
    log::info!(
        "Native fill: {applied}/{} values applied in {:.1}ms",
        values.len(),
        t0.elapsed().as_secs_f64() * 1000.0
    );
    Ok(out)
}

/// Field name → value pairs for the interactive form. Absent record values
/// produce no text entry; checkbox groups always name every member.
pub(crate) fn native_values(record: &ApplicationRecord) -> Vec<(String, FieldValue)> {
    let mut values = Vec::new();
    let mut text = |name: &str, value: Option<&str>| {
        if let Some(v) = value.filter(|v| !v.trim().is_empty()) {
            values.push((name.to_string(), FieldValue::Text(v.to_string())));
        }
    };

    let id_field = match record.id_type {
        Some(IdType::TrafficRegisterNumber) => Some("trafficRegisterNumber"),
        Some(IdType::NamibiaIdDoc) => Some("idNumber"),
        Some(IdType::BusinessRegNo) => Some("businessRegNumber"),
        None => None,
    };
    if let Some(field) = id_field {
        text(field, record.identification_number());
    }

    text("surname", present(&record.surname));
    text("initials", present(&record.initials));
    text("businessName", present(&record.business_name));
    text("fullName", record.display_full_name().as_deref());

    address_values(&mut text, "postalAddress", record.postal_address.as_ref());
    address_values(&mut text, "streetAddress", record.street_address.as_ref());

    phone_values(&mut text, "telephoneHome", record.telephone_home.as_ref());
    phone_values(&mut text, "telephoneDay", record.telephone_day.as_ref());
    phone_values(&mut text, "cellNumber", record.cell_number.as_ref());

    text("email", present(&record.email));
    let phone = present(&record.phone_number)
        .map(str::to_string)
        .or_else(|| record.cell_number.as_ref().map(PhoneNumber::concatenated));
    text("phoneNumber", phone.as_deref());

    let quantity = record.quantity.map(|q| q.to_string());
    text("plateQuantity", quantity.as_deref());
    for (i, choice) in record.plate_choices.iter().take(3).enumerate() {
        let n = i + 1;
        text(&format!("plateChoice{n}"), Some(choice.text.as_str()));
        text(&format!("plateChoice{n}_Text"), Some(choice.text.as_str()));
        text(&format!("plateChoice{n}_Meaning"), present(&choice.meaning));
    }

    if record.has_representative {
        text("representativeIdNumber", present(&record.representative_id_number));
        text("representativeSurname", present(&record.representative_surname));
        text("representativeInitials", present(&record.representative_initials));
    }

    text("currentLicenceNumber", present(&record.current_licence_number));
    text("vehicleRegisterNumber", present(&record.vehicle_register_number));
    text("chassisNumber", present(&record.chassis_number));
    text("vehicleMake", present(&record.vehicle_make));
    text("seriesName", present(&record.series_name));

    text("declarationPlace", present(&record.declaration_place));
    if let Some(date) = record.declaration_date {
        let [yy, mm, dd] = model::date_parts(date);
        text("declarationDate", Some(&date.format("%d/%m/%Y").to_string()));
        text("declarationYear", Some(&yy));
        text("declarationMonth", Some(&mm));
        text("declarationDay", Some(&dd));
    }

    text("referenceId", present(&record.reference_id));
    text("transactionType", Some(record.transaction()));

    let mut check = |name: &str, on: bool| values.push((name.to_string(), FieldValue::Check(on)));

    for id_type in IdType::ALL {
        check(id_type_field(id_type), record.id_type == Some(id_type));
    }
    for format in PlateFormat::ALL {
        check(plate_format_field(format), record.plate_format == Some(format));
    }
    check("hasRepresentative", record.has_representative);
    if record.has_representative {
        check(
            "repIdType_TrafficRegister",
            record.representative_id_type == Some(IdType::TrafficRegisterNumber),
        );
        check(
            "repIdType_IDDoc",
            record.representative_id_type == Some(IdType::NamibiaIdDoc),
        );
    }
    check("declarationAccepted", record.declaration_accepted);
    for role in DeclarationRole::ALL {
        check(declaration_role_field(role), record.declaration_role == Some(role));
    }

    values
}

fn address_values(
    text: &mut impl FnMut(&str, Option<&str>),
    prefix: &str,
    address: Option<&Address>,
) {
    let Some(address) = address else {
        return;
    };
    text(prefix, Some(&address.joined()));
    for (i, line) in address.lines().into_iter().enumerate() {
        text(&format!("{prefix}Line{}", i + 1), line);
    }
}

fn phone_values(
    text: &mut impl FnMut(&str, Option<&str>),
    prefix: &str,
    phone: Option<&PhoneNumber>,
) {
    let Some(phone) = phone else {
        return;
    };
    text(prefix, Some(&phone.concatenated()));
    text(&format!("{prefix}Code"), Some(&phone.code));
    text(&format!("{prefix}Number"), Some(&phone.number));
}

fn id_type_field(id_type: IdType) -> &'static str {
    match id_type {
        IdType::TrafficRegisterNumber => "idType_TrafficRegister",
        IdType::NamibiaIdDoc => "idType_IDDoc",
        IdType::BusinessRegNo => "idType_BusinessReg",
    }
}

fn plate_format_field(format: PlateFormat) -> &'static str {
    match format {
        PlateFormat::LongGerman => "plateFormat_LongGerman",
        PlateFormat::Normal => "plateFormat_Normal",
        PlateFormat::American => "plateFormat_American",
        PlateFormat::Square => "plateFormat_Square",
        PlateFormat::SmallMotorcycle => "plateFormat_SmallMotorcycle",
    }
}

fn declaration_role_field(role: DeclarationRole) -> &'static str {
    match role {
        DeclarationRole::Applicant => "declarationRole_Applicant",
        DeclarationRole::Proxy => "declarationRole_Proxy",
        DeclarationRole::Representative => "declarationRole_Representative",
    }
}

/// `/FT` of a field, looked up through `/Parent` since it is inheritable.
fn field_type(doc: &Document, id: ObjectId) -> Option<Vec<u8>> {
    let mut current = doc.get_dictionary(id).ok()?;
    for _ in 0..16 {
        if let Ok(Object::Name(ft)) = current.get(b"FT").map(|o| resolve(doc, o)) {
            return Some(ft.clone());
        }
        current = current.get(b"Parent").ok().and_then(|p| resolve_dict(doc, p))?;
    }
    None
}

/// The field itself when it is merged with its widget, otherwise its kids.
fn widget_ids(doc: &Document, id: ObjectId) -> Vec<ObjectId> {
    let kids = doc
        .get_dictionary(id)
        .ok()
        .and_then(|d| d.get(b"Kids").ok())
        .and_then(|k| match resolve(doc, k) {
            Object::Array(a) => Some(a.clone()),
            _ => None,
        });
    match kids {
        Some(kids) => kids
            .iter()
            .filter_map(|k| k.as_reference().ok())
            .collect(),
        None => vec![id],
    }
}

fn set_text(doc: &mut Document, id: ObjectId, value: &str) -> Result<(), SetError> {
    if field_type(doc, id).as_deref() != Some(b"Tx") {
        return Err(SetError::WrongType("text"));
    }
    let dict = doc
        .get_object_mut(id)
        .and_then(Object::as_dict_mut)
        .map_err(|_| SetError::Missing)?;
    dict.set("V", Object::string_literal(encode_text_string(value)));
    Ok(())
}

/// Name of the "on" appearance: the first `/AP /N` key that is not `Off`.
fn on_state(doc: &Document, widgets: &[ObjectId]) -> Vec<u8> {
    for &widget in widgets {
        let normal = doc
            .get_dictionary(widget)
            .ok()
            .and_then(|w| w.get(b"AP").ok())
            .and_then(|ap| resolve_dict(doc, ap))
            .and_then(|ap| ap.get(b"N").ok())
            .and_then(|n| match resolve(doc, n) {
                Object::Dictionary(states) => Some(states),
                _ => None,
            });
        if let Some(normal) = normal
            && let Some((key, _)) = normal.iter().find(|(k, _)| k.as_slice() != b"Off")
        {
            return key.clone();
        }
    }
    b"Yes".to_vec()
}

fn set_checkbox(doc: &mut Document, id: ObjectId, checked: bool) -> Result<(), SetError> {
    if field_type(doc, id).as_deref() != Some(b"Btn") {
        return Err(SetError::WrongType("checkbox"));
    }
    let widgets = widget_ids(doc, id);
    let state = if checked {
        on_state(doc, &widgets)
    } else {
        b"Off".to_vec()
    };

    doc.get_object_mut(id)
        .and_then(Object::as_dict_mut)
        .map_err(|_| SetError::Missing)?
        .set("V", Object::Name(state.clone()));
    for widget in widgets {
        if let Ok(dict) = doc.get_object_mut(widget).and_then(Object::as_dict_mut) {
            dict.set("AS", Object::Name(state.clone()));
        }
    }
    Ok(())
}

fn set_need_appearances(doc: &mut Document) -> Result<(), Error> {
    let root = doc
        .trailer
        .get(b"Root")
        .and_then(Object::as_reference)
        .map_err(|e| Error::NativeFill(format!("no catalog: {e}")))?;
    let acroform_ref = doc
        .get_dictionary(root)
        .ok()
        .and_then(|c| c.get(b"AcroForm").ok())
        .and_then(|a| a.as_reference().ok());

    let acroform = match acroform_ref {
        Some(id) => doc.get_object_mut(id).and_then(Object::as_dict_mut),
        None => doc
            .get_object_mut(root)
            .and_then(Object::as_dict_mut)
            .and_then(|c| c.get_mut(b"AcroForm"))
            .and_then(Object::as_dict_mut),
    };
    match acroform {
        Ok(dict) => {
            dict.set("NeedAppearances", Object::Boolean(true));
            Ok(())
        }
        Err(e) => Err(Error::NativeFill(format!("AcroForm not writable: {e}"))),
    }
}
