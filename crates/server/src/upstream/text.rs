//! Normalization of the values scraped from upstream pages.

use chrono::{NaiveDate, NaiveTime};
use fuzzy_search::strip_diacritics;

/// Date format used by the SII, e.g. `14-03-2019`.
const SII_DATE_FORMAT: &str = "%d-%m-%Y";

/// Time of day format used by MeteoChile, e.g. `14:20`.
const CLOCK_TIME_FORMAT: &str = "%H:%M";

/// Currency names as published by the Banco Central and their ISO 4217 codes.
const ISO_4217_CODES: [(&str, &str); 58] = [
    ("Baht tailandés", "THB"),
    ("Balboa panameño", "PAB"),
    ("Bolívar fuerte venezolano", "VEF"),
    ("Boliviano", "BOB"),
    ("Colón costarricense", "CRC"),
    ("Corona checa", "CZK"),
    ("Corona danesa", "DKK"),
    ("Corona islandesa", "ISK"),
    ("Corona noruega", "NOK"),
    ("Corona sueca", "SEK"),
    ("DEG", "XDR"),
    ("Dírham de Emiratos Árabes Unidos", "AED"),
    ("Dírham marroquí", "MAD"),
    ("Dólar australiano", "AUD"),
    ("Dólar canadiense", "CAD"),
    ("Dólar de Bermudas", "BMD"),
    ("Dólar de Islas Caimán", "KYD"),
    ("Dólar de las Bahamas", "BSD"),
    ("Dólar estadounidense", "USD"),
    ("Dólar fiyiano", "FJD"),
    ("Dólar hongkonés", "HKD"),
    ("Dólar neozelandés", "NZD"),
    ("Dólar singapurense", "SGD"),
    ("Dólar taiwanés", "TWD"),
    ("Euro", "EUR"),
    ("Forint húngaro", "HUF"),
    ("Franco de la Polinesia Francesa", "XPF"),
    ("Franco suizo", "CHF"),
    ("Guaraní paraguayo", "PYG"),
    ("Hryvnia ucraniano", "UAH"),
    ("Leu rumano", "RON"),
    ("Libra egipcia", "EGP"),
    ("Libra esterlina", "GBP"),
    ("Nueva lira turca", "TRY"),
    ("Nuevo sol peruano", "PEN"),
    ("Peso argentino", "ARS"),
    ("Peso colombiano", "COP"),
    ("Peso cubano", "CUP"),
    ("Peso de República Dominicana", "DOP"),
    ("Peso filipino", "PHP"),
    ("Peso mexicano", "MXN"),
    ("Peso uruguayo", "UYU"),
    ("Quetzal guatemalteco", "GTQ"),
    ("Rand surafricano", "ZAR"),
    ("Real brasileño", "BRL"),
    ("Rial iraní", "IRR"),
    ("Rial saudita", "SAR"),
    ("Ringgit malasio", "MYR"),
    ("Rublo ruso", "RUB"),
    ("Rupia de Indonesia", "IDR"),
    ("Rupia india", "INR"),
    ("Rupia pakistaní", "PKR"),
    ("Shekel israelí", "ILS"),
    ("Tenge de Kazajstán", "KZT"),
    ("Won coreano", "KRW"),
    ("Yen", "JPY"),
    ("Yuan", "CNY"),
    ("Zloty polaco", "PLN"),
];

/// Parse a number written the Chilean way, `.` grouping thousands and `,` as the decimal mark.
///
/// `"1.023,45"` is `1023.45`. Returns `None` for anything else, e.g. the `ND` the Banco Central
/// publishes when there is no value for the day.
pub fn parse_chilean_number(text: &str) -> Option<f64> {
    let normalized = text.trim().replace('.', "").replace(',', ".");
    if normalized.is_empty() || !normalized.chars().all(|c| c.is_ascii_digit() || c == '.' || c == '-') {
        return None;
    }
    normalized.parse().ok()
}

/// Parse a number written the English way, `,` grouping thousands and `.` as the decimal mark.
///
/// A leading `$`, a trailing `%` and anything after the first space are ignored, so `"$1,234.56"`
/// is `1234.56`, `"-0.51%"` is `-0.51` and `"19,012,337 BTC"` is `19012337`. Returns `None` for
/// anything else, e.g. the `.` MeteoChile shows for a missing reading.
pub fn parse_english_number(text: &str) -> Option<f64> {
    let number = text.split_whitespace().next()?;
    let normalized: String = number
        .trim_start_matches('$')
        .trim_end_matches('%')
        .chars()
        .filter(|c| *c != ',')
        .collect();
    if normalized.is_empty() || !normalized.chars().all(|c| c.is_ascii_digit() || c == '.' || c == '-') {
        return None;
    }
    normalized.parse().ok()
}

/// Parse the integer part of an English number, e.g. `"$1,234.56"` is `1234`.
pub fn parse_whole_number(text: &str) -> Option<u64> {
    let number = text.split_whitespace().next()?.trim_start_matches('$');
    number.split('.').next()?.replace(',', "").parse().ok()
}

/// Parse an `hh:mm` time of day as published by MeteoChile.
pub fn parse_clock_time(text: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(text.trim(), CLOCK_TIME_FORMAT).ok()
}

/// Capitalize the first letter of every word and lowercase the rest, as the SII publishes
/// everything in capitals.
///
/// Any character that is not a letter, a digit or `_` starts a new word.
pub fn title_case(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut at_word_start = true;
    for c in text.trim().chars() {
        if at_word_start {
            result.extend(c.to_uppercase());
        } else {
            result.extend(c.to_lowercase());
        }
        at_word_start = !(c.is_alphanumeric() || c == '_');
    }
    result
}

/// Parse a `dd-mm-yyyy` date as published by the SII.
pub fn parse_sii_date(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), SII_DATE_FORMAT).ok()
}

/// The ISO 4217 code of a currency named as the Banco Central does, ignoring case and accents.
pub fn iso_4217_code(name: &str) -> Option<&'static str> {
    let wanted = strip_diacritics(name.trim()).to_lowercase();
    ISO_4217_CODES
        .iter()
        .find(|(known, _)| strip_diacritics(known).to_lowercase() == wanted)
        .map(|(_, code)| *code)
}
