//! French administrative code utilities.
//!
//! Provides validation for department codes and postal codes, and the
//! mapping from department codes to the 18 current regions (13
//! metropolitan + 5 overseas).

/// Current French regions, by name.
pub const REGIONS: &[&str] = &[
    "Auvergne-Rhône-Alpes",
    "Bourgogne-Franche-Comté",
    "Bretagne",
    "Centre-Val de Loire",
    "Corse",
    "Grand Est",
    "Hauts-de-France",
    "Île-de-France",
    "Normandie",
    "Nouvelle-Aquitaine",
    "Occitanie",
    "Pays de la Loire",
    "Provence-Alpes-Côte d'Azur",
    "Guadeloupe",
    "Martinique",
    "Guyane",
    "La Réunion",
    "Mayotte",
];

/// Returns `true` if `code` is a well-formed department code.
///
/// Metropolitan departments use two characters (`01`–`95`, plus `2A` and
/// `2B` for Corsica); overseas departments use three digits starting with
/// `97`.
#[must_use]
pub fn is_department_code(code: &str) -> bool {
    let bytes = code.as_bytes();
    match bytes.len() {
        2 => {
            if code.eq_ignore_ascii_case("2A") || code.eq_ignore_ascii_case("2B") {
                return true;
            }
            bytes.iter().all(u8::is_ascii_digit) && code != "00" && code != "20"
        }
        3 => code.starts_with("97") && bytes.iter().all(u8::is_ascii_digit),
        _ => false,
    }
}

/// Returns `true` if `code` is a five-digit postal code.
#[must_use]
pub fn is_postal_code(code: &str) -> bool {
    code.len() == 5 && code.bytes().all(|b| b.is_ascii_digit())
}

/// Normalizes a department code as found in source data.
///
/// Trims whitespace, upper-cases the Corsican letters, and left-pads
/// single-digit codes (`"1"` becomes `"01"`), since some exports store the
/// code as an integer.
#[must_use]
pub fn normalize_department_code(code: &str) -> String {
    let code = code.trim().to_uppercase();
    if code.len() == 1 && code.bytes().all(|b| b.is_ascii_digit()) {
        format!("0{code}")
    } else {
        code
    }
}

/// Derives the department code from a postal code.
///
/// Postal codes in Corsica all start with `20`; `200xx`–`201xx` belong to
/// Corse-du-Sud (`2A`), the rest to Haute-Corse (`2B`).
#[must_use]
pub fn department_from_postal_code(postal_code: &str) -> Option<String> {
    if !is_postal_code(postal_code) {
        return None;
    }

    if postal_code.starts_with("97") {
        return Some(postal_code[..3].to_string());
    }

    if postal_code.starts_with("20") {
        let number: u32 = postal_code.parse().ok()?;
        return Some(if number < 20_200 { "2A" } else { "2B" }.to_string());
    }

    Some(postal_code[..2].to_string())
}

/// Maps a department code to the name of its region.
///
/// Returns `None` for unrecognized codes.
#[must_use]
pub fn region_for_department(code: &str) -> Option<&'static str> {
    let region = match code {
        "01" | "03" | "07" | "15" | "26" | "38" | "42" | "43" | "63" | "69" | "73" | "74" => {
            "Auvergne-Rhône-Alpes"
        }
        "21" | "25" | "39" | "58" | "70" | "71" | "89" | "90" => "Bourgogne-Franche-Comté",
        "22" | "29" | "35" | "56" => "Bretagne",
        "18" | "28" | "36" | "37" | "41" | "45" => "Centre-Val de Loire",
        "2A" | "2B" => "Corse",
        "08" | "10" | "51" | "52" | "54" | "55" | "57" | "67" | "68" | "88" => "Grand Est",
        "02" | "59" | "60" | "62" | "80" => "Hauts-de-France",
        "75" | "77" | "78" | "91" | "92" | "93" | "94" | "95" => "Île-de-France",
        "14" | "27" | "50" | "61" | "76" => "Normandie",
        "16" | "17" | "19" | "23" | "24" | "33" | "40" | "47" | "64" | "79" | "86" | "87" => {
            "Nouvelle-Aquitaine"
        }
        "09" | "11" | "12" | "30" | "31" | "32" | "34" | "46" | "48" | "65" | "66" | "81"
        | "82" => "Occitanie",
        "44" | "49" | "53" | "72" | "85" => "Pays de la Loire",
        "04" | "05" | "06" | "13" | "83" | "84" => "Provence-Alpes-Côte d'Azur",
        "971" => "Guadeloupe",
        "972" => "Martinique",
        "973" => "Guyane",
        "974" => "La Réunion",
        "976" => "Mayotte",
        _ => return None,
    };
    Some(region)
}

/// Case-insensitive comparison of two territory names, ignoring
/// surrounding whitespace.
#[must_use]
pub fn same_name(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}
