//! The PLN2-NA(2)(2007/05) sheet, section by section.

use crate::fonts::FontRole::{Bold, Regular};
use crate::model::{self, ApplicationRecord, DeclarationRole, IdType, PhoneNumber, PlateFormat, present};

use super::grid::{SMALL, STANDARD};
use super::layout::{Align, CONTENT_WIDTH, FormLayout, MARGIN, PAGE_WIDTH};

pub(super) const FORM_CODE: &str = "PLN2-NA(2)(2007/05)";

pub(super) const SECTION_A: &str = "A. PARTICULARS OF OWNER/TRANSFEROR:";
pub(super) const SECTION_B: &str = "B. PERSONALISED NUMBER PLATE:";
pub(super) const SECTION_C: &str = "C. APPLICANT'S REPRESENTATIVE / PROXY (If applicable):";
pub(super) const SECTION_D: &str = "D. PARTICULARS OF VEHICLE (If available):";
pub(super) const SECTION_E: &str = "E. DECLARATION";
pub(super) const SECTION_F: &str = "F. FOR OFFICE USE";

const LABEL_SIZE: f32 = 8.0;
const HEADING_SIZE: f32 = 10.0;
/// As many standard boxes as fit the content width.
const ADDRESS_BOXES: usize = 35;

/// (transaction, sections to complete)
const TRANSACTIONS: [(&str, &str); 5] = [
    (model::DEFAULT_TRANSACTION, "A, B, C, E"),
    (
        "Allocate a personalised licence number to another vehicle",
        "A, B, C, D, E",
    ),
    (
        "Order alternative personalised number plate format(s) due to re-allocation to another vehicle of same owner",
        "A, B, C, E",
    ),
    ("Replacement of lost or stolen personalised number plate", "A, B, C, E"),
    ("Duplicate certificate of entitlement", "A, B, C, E"),
];

const DECLARATION_POINTS: [&str; 4] = [
    "(a) I am aware that a personalised licence number or the right to use it may be subject to copyright or other intellectual property rights.",
    "(b) In the event of surrender of a personalised licence number, I declare that the personalised licence plates have been destroyed.",
    "(c) I declare that all the particulars furnished by me are true and correct.",
    "(d) I am aware that a false declaration is punishable by law.",
];

fn heading(layout: &mut FormLayout, text: &str, block_height: f32) {
    layout.reserve(block_height);
    layout.line(Bold, HEADING_SIZE, Align::Left, text);
    layout.advance(15.0);
}

fn label(layout: &mut FormLayout, text: &str) {
    layout.line(Regular, LABEL_SIZE, Align::Left, text);
}

fn mark(layout: &mut FormLayout, x: f32, checked: bool) {
    if checked {
        let top = layout.y + 2.0;
        layout.text_at(Regular, LABEL_SIZE, x, top, "X");
    }
}

pub(super) fn header(layout: &mut FormLayout) {
    let top = layout.y;
    layout.text_at(Regular, 8.0, MARGIN, top, FORM_CODE);
    layout.line(Regular, 8.0, Align::Right, "PLN2");
    layout.advance(15.0);
    layout.line(Bold, 12.0, Align::Center, "REPUBLIC OF NAMIBIA");
    layout.advance(15.0);
    layout.line(Bold, 11.0, Align::Center, "MINISTRY OF WORKS AND TRANSPORT");
    layout.advance(12.0);
    layout.line(Bold, 11.0, Align::Center, "DEPARTMENT OF TRANSPORT");
    layout.advance(12.0);
    layout.line(Bold, 9.0, Align::Center, "(Road Traffic and Transport Act, 1999)");
    layout.advance(15.0);

    let title = "APPLICATION FOR PERSONALISED LICENCE NUMBER AND ORDERING OF PLATES";
    let lines = layout.wrap(Bold, 14.0, CONTENT_WIDTH, title);
    for line in lines {
        layout.line(Bold, 14.0, Align::Center, &line);
        layout.advance(17.0);
    }
    layout.advance(3.0);
    label(
        layout,
        "Acceptable identification is essential (including that of the proxy and/or representative).",
    );
    layout.advance(20.0);
}

pub(super) fn transactions(layout: &mut FormLayout, record: &ApplicationRecord) {
    heading(layout, "LIST OF POSSIBLE TRANSACTIONS:", 15.0 + 12.0 * 6.0);
    let selected = record.transaction();
    let name_width = CONTENT_WIDTH - 80.0;
    for (name, parts) in TRANSACTIONS {
        // Unknown transaction types fall back to marking the first row.
        let checked = name == selected
            || (name == model::DEFAULT_TRANSACTION
                && !TRANSACTIONS.iter().any(|(n, _)| *n == selected));
        let lines = layout.wrap(Regular, LABEL_SIZE, name_width, name).len();
        layout.reserve(12.0 * lines as f32);
        mark(layout, MARGIN + 5.0, checked);
        let top = layout.y;
        layout.wrapped_at(Regular, LABEL_SIZE, MARGIN + 20.0, top, name_width, 10.0, name);
        layout.line(Regular, LABEL_SIZE, Align::Right, parts);
        layout.advance(12.0 + 10.0 * (lines as f32 - 1.0));
    }
    layout.advance(10.0);
}

fn phone_row(layout: &mut FormLayout, caption: &str, phone: Option<&PhoneNumber>) {
    label(layout, caption);
    if let Some(phone) = phone {
        let top = layout.y;
        layout.text_at(Regular, LABEL_SIZE, MARGIN + 150.0, top, &format!("(code) {}", phone.code));
        layout.text_at(
            Regular,
            LABEL_SIZE,
            MARGIN + 220.0,
            top,
            &format!("(number) {}", phone.number),
        );
    }
    layout.advance(12.0);
}

fn address_block(layout: &mut FormLayout, caption: &str, lines: [Option<&str>; 3]) {
    layout.reserve(12.0 + 3.0 * 18.0);
    label(layout, caption);
    layout.advance(12.0);
    for line in lines {
        let top = layout.y;
        layout.grid(STANDARD, MARGIN, top, ADDRESS_BOXES, line);
        layout.advance(18.0);
    }
    layout.advance(5.0);
}

/// Surname boxes, "and", three initials boxes on one row.
fn name_grid(layout: &mut FormLayout, surname_boxes: usize, surname: Option<&str>, initials: Option<&str>) {
    let top = layout.y;
    layout.grid(STANDARD, MARGIN, top, surname_boxes, surname);
    let and_x = MARGIN + surname_boxes as f32 * STANDARD.pitch();
    layout.text_at(Regular, LABEL_SIZE, and_x, top + 4.0, "and");
    layout.grid(STANDARD, and_x + 20.0, top, 3, initials);
}

pub(super) fn section_a(layout: &mut FormLayout, record: &ApplicationRecord) {
    heading(layout, SECTION_A, 15.0 + 12.0 + 15.0);
    label(layout, "Type of identification (mark with X):");
    layout.advance(12.0);
    let top = layout.y;
    for (i, id_type) in IdType::ALL.into_iter().enumerate() {
        let x = MARGIN + i as f32 * 100.0;
        mark(layout, x + 5.0, record.id_type == Some(id_type));
        layout.text_at(Regular, LABEL_SIZE, x + 20.0, top, id_type.label());
    }
    layout.advance(15.0);

    layout.reserve(32.0);
    label(layout, "Identification number/Business Reg. Number:");
    layout.advance(12.0);
    let top = layout.y;
    layout.grid(STANDARD, MARGIN, top, 20, record.identification_number());
    layout.advance(20.0);

    layout.reserve(32.0);
    label(layout, "Surname and initials/Business Name:");
    layout.advance(12.0);
    if record.shows_business_name() {
        let top = layout.y;
        layout.grid(STANDARD, MARGIN, top, 30, present(&record.business_name));
    } else {
        name_grid(layout, 25, present(&record.surname), present(&record.initials));
    }
    layout.advance(20.0);

    let postal = record.postal_address.clone().unwrap_or_default();
    let street = record.street_address.clone().unwrap_or_default();
    address_block(layout, "Postal address:", postal.lines());
    address_block(layout, "Street address:", street.lines());

    layout.reserve(12.0 * 3.0 + 20.0);
    phone_row(layout, "Telephone number at home:", record.telephone_home.as_ref());
    phone_row(layout, "Telephone number during day:", record.telephone_day.as_ref());
    phone_row(layout, "Cell number:", record.cell_number.as_ref());
    label(layout, "E-mail:");
    if let Some(email) = present(&record.email) {
        let top = layout.y;
        layout.text_at(Regular, LABEL_SIZE, MARGIN + 150.0, top, email);
    }
    layout.advance(20.0);
}

pub(super) fn section_b(layout: &mut FormLayout, record: &ApplicationRecord) {
    // Heading, column captions, five format rows, choice grids.
    let block = 15.0 + 15.0 + 12.0 * 5.0 + 25.0;
    heading(layout, SECTION_B, block);

    let columns = [
        ("Number plate format", 0.0),
        ("Quantity (1 or 2)", 180.0),
        ("1st Number Choice", 260.0),
        ("2nd Alternative", 360.0),
        ("3rd Alternative", 440.0),
    ];
    let top = layout.y;
    for (caption, dx) in columns {
        layout.text_at(Bold, LABEL_SIZE, MARGIN + dx, top, caption);
    }
    layout.advance(15.0);

    let rows_top = layout.y;
    for format in PlateFormat::ALL {
        let selected = record.plate_format == Some(format);
        mark(layout, MARGIN + 5.0, selected);
        let top = layout.y;
        if selected && let Some(quantity) = record.quantity {
            layout.text_at(Regular, LABEL_SIZE, MARGIN + 185.0, top, &quantity.to_string());
        }
        layout.wrapped_at(Regular, LABEL_SIZE, MARGIN + 20.0, top, 160.0, 9.0, format.label());
        layout.advance(12.0);
    }

    // Choice grids sit beside the format rows.
    let choice_top = rows_top + 15.0;
    let captions = ["1st", "2nd", "3rd"];
    for (i, choice) in record.plate_choices.iter().take(3).enumerate() {
        let x = MARGIN + [260.0, 360.0, 440.0][i];
        layout.text_at(Regular, 7.0, x, rows_top, &format!("{} Choice:", captions[i]));
        layout.grid(SMALL, x, choice_top, 7, Some(&choice.text));
        layout.text_at(Regular, 7.0, x + SMALL.width(7) + 5.0, choice_top + 2.0, "NA");
    }
    layout.advance(25.0);
}

pub(super) fn section_c(layout: &mut FormLayout, record: &ApplicationRecord) {
    heading(layout, SECTION_C, 15.0 + 12.0 + 15.0 + 32.0 + 37.0);
    label(layout, "Type of identification (mark with X):");
    layout.advance(12.0);
    let top = layout.y;
    for (i, id_type) in [IdType::TrafficRegisterNumber, IdType::NamibiaIdDoc]
        .into_iter()
        .enumerate()
    {
        let x = MARGIN + i as f32 * 150.0;
        mark(layout, x + 5.0, record.representative_id_type == Some(id_type));
        layout.text_at(Regular, LABEL_SIZE, x + 20.0, top, id_type.label());
    }
    layout.advance(15.0);

    label(layout, "Identification number:");
    layout.advance(12.0);
    let top = layout.y;
    layout.grid(STANDARD, MARGIN, top, 13, present(&record.representative_id_number));
    layout.advance(20.0);

    label(layout, "Surname and initials:");
    layout.advance(12.0);
    name_grid(
        layout,
        13,
        present(&record.representative_surname),
        present(&record.representative_initials),
    );
    layout.advance(25.0);
}

pub(super) fn section_d(layout: &mut FormLayout, record: &ApplicationRecord) {
    enum Slot {
        Grid(usize),
        Box,
    }
    let rows = [
        ("Current licence number:", &record.current_licence_number, Slot::Grid(7)),
        ("Vehicle register number:", &record.vehicle_register_number, Slot::Grid(10)),
        ("Chassis number/VIN:", &record.chassis_number, Slot::Grid(17)),
        ("Vehicle make:", &record.vehicle_make, Slot::Box),
        ("Series name:", &record.series_name, Slot::Box),
    ];
    let filled = rows.iter().filter(|(_, v, _)| present(v).is_some()).count();
    heading(layout, SECTION_D, 15.0 + 18.0 * filled as f32 + 10.0);

    for (caption, value, slot) in rows {
        let Some(value) = present(value) else {
            continue;
        };
        layout.reserve(18.0);
        label(layout, caption);
        let top = layout.y;
        let x = MARGIN + 150.0;
        match slot {
            Slot::Grid(count) => layout.grid(STANDARD, x, top, count, Some(value)),
            Slot::Box => {
                layout.rect(x, top, 200.0, 15.0);
                let fitted = fit_line(layout, value, 196.0);
                layout.text_at(Regular, LABEL_SIZE, x + 2.0, top + 3.0, &fitted);
            }
        }
        layout.advance(18.0);
    }
    layout.advance(10.0);
}

/// Longest prefix of `text` that fits `width` at label size.
fn fit_line(layout: &FormLayout, text: &str, width: f32) -> String {
    let mut out = String::new();
    for ch in text.trim().chars() {
        out.push(ch);
        if layout.fonts().text_width(Regular, &out, LABEL_SIZE) > width {
            out.pop();
            break;
        }
    }
    out
}

pub(super) fn section_e(layout: &mut FormLayout, record: &ApplicationRecord) {
    let point_width = CONTENT_WIDTH - 100.0;
    let point_lines: usize = DECLARATION_POINTS
        .iter()
        .map(|p| layout.wrap(Regular, LABEL_SIZE, point_width, p).len())
        .sum();
    let block = 15.0 + 30.0 + point_lines as f32 * 10.0 + 20.0 + 18.0 + 25.0 + 10.0;
    heading(layout, SECTION_E, block);

    let top = layout.y;
    layout.text_at(Regular, LABEL_SIZE, MARGIN, top, "I the");
    for (i, role) in DeclarationRole::ALL.into_iter().enumerate() {
        let x = MARGIN + 30.0 + i as f32 * 120.0;
        layout.rect(x, top, 110.0, 12.0);
        if record.declaration_role == Some(role) {
            layout.text_at(Regular, LABEL_SIZE, x + 2.0, top + 2.0, "X");
        }
        layout.wrapped_at(Regular, 6.0, x + 2.0, top + 15.0, 106.0, 7.0, role.label());
    }
    layout.advance(30.0);

    for point in DECLARATION_POINTS {
        let top = layout.y;
        let lines = layout.wrapped_at(Regular, LABEL_SIZE, MARGIN, top, point_width, 10.0, point);
        layout.advance(5.0 + 10.0 * lines as f32);
    }

    let sig_x = PAGE_WIDTH - MARGIN - 150.0;
    let top = layout.y;
    layout.text_at(Regular, LABEL_SIZE, sig_x, top, "Signature:");
    layout.hline(sig_x + 50.0, sig_x + 200.0, top + 10.0);
    layout.advance(20.0);

    let top = layout.y;
    layout.text_at(Regular, LABEL_SIZE, sig_x, top, "Place:");
    layout.rect(sig_x + 50.0, top, 150.0, 12.0);
    if let Some(place) = present(&record.declaration_place) {
        let fitted = fit_line(layout, place, 146.0);
        layout.text_at(Regular, LABEL_SIZE, sig_x + 52.0, top + 2.0, &fitted);
    }
    layout.advance(18.0);

    let parts = record.declaration_date.map(model::date_parts);
    date_boxes(layout, sig_x, "Date: 20", 50.0, parts.as_ref());
    layout.advance(25.0);
}

/// "20" YY : MM : DD boxes starting `offset` points right of `x`.
fn date_boxes(layout: &mut FormLayout, x: f32, caption: &str, offset: f32, parts: Option<&[String; 3]>) {
    let top = layout.y;
    layout.text_at(Regular, LABEL_SIZE, x, top, caption);
    for i in 0..3 {
        let bx = x + offset + i as f32 * 25.0;
        let part = parts.map(|p| p[i].as_str());
        layout.grid(SMALL, bx, top, 2, part);
        if i < 2 {
            layout.text_at(Regular, LABEL_SIZE, bx + 22.0, top + 2.0, ":");
        }
    }
}

pub(super) fn section_f(layout: &mut FormLayout) {
    heading(layout, SECTION_F, 15.0 + 18.0 * 3.0 + 20.0 + 14.0);

    let top = layout.y;
    label(layout, "Fees paid and serial number of receipt: N$");
    layout.rect(MARGIN + 200.0, top, 80.0, 12.0);
    layout.text_at(Regular, LABEL_SIZE, MARGIN + 285.0, top, "and");
    layout.grid(STANDARD, MARGIN + 310.0, top, 10, None);
    layout.advance(18.0);

    let top = layout.y;
    label(layout, "Control number of Certificate of Entitlement:");
    layout.grid(STANDARD, MARGIN + 250.0, top, 10, None);
    layout.advance(18.0);

    date_boxes(layout, MARGIN, "Date of transaction: 20", 150.0, None);
    layout.advance(18.0);

    let top = layout.y;
    label(layout, "Signature of official(s):");
    layout.hline(MARGIN + 150.0, MARGIN + 350.0, top + 10.0);
    layout.advance(20.0);

    let top = layout.y;
    layout.text_at(Regular, LABEL_SIZE, MARGIN, top, "Licensing of officer");
    layout.text_at(Regular, LABEL_SIZE, MARGIN + 200.0, top, "Data Capturing");
    layout.hline(MARGIN, MARGIN + 120.0, top + 12.0);
    layout.hline(MARGIN + 200.0, MARGIN + 320.0, top + 12.0);
    layout.advance(14.0);
}
