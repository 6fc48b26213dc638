//! Text and price normalization for scraped listing fields.
//!
//! Everything here is a pure string transform. `clean` is idempotent, and the
//! price helpers map the various Finnish "sold out" and "free" phrasings onto
//! two fixed markers so the reconciler compares like with like.

use once_cell::sync::Lazy;
use regex::Regex;

pub const SOLD_OUT: &str = "SOLD OUT!";
pub const FREE_ENTRY: &str = "free entry";

/// Ticket vendor and wording noise stripped from price fragments, in order.
const PRICE_PREFIXES: &[(&str, &str)] = &[
    ("+", ""),
    ("(Lippu.fi)", ""),
    ("Lippu.fi", ""),
    ("(Ticketmaster)", ""),
    ("(Tiketti)", ""),
    ("alakertaan ", ""),
    ("alk. ", ""),
    ("alkaen ", ""),
    ("Ennakot ", ""),
    ("ennakkoon ", ""),
    ("eteispalvelumaksu", ""),
    ("Eventualista ", ""),
    ("ja ", ""),
    ("kulut", ""),
    ("Liput:", ""),
    ("Liput\n", ""),
    ("Liput ", ""),
    ("liput ", ""),
    ("lippukaupan ", ""),
    ("Loppuunmyyty", SOLD_OUT),
    ("Loppuunvarattu", SOLD_OUT),
    ("ovelta ", ""),
    ("sis. ", ""),
    ("Ticketmasterista ", ""),
    ("Tiketistä ", ""),
];

static EURO_AMOUNT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+(?:[.,]\d{1,2})?)\s*€").expect("valid euro amount regex"));

const SOLD_OUT_MARKERS: &[&str] = &["loppuunmyyty", "loppuunvarattu", "sold out"];
const FREE_ENTRY_MARKERS: &[&str] = &["vapaa pääsy", "vapaa sisäänpääsy", "maksuton", "free entry"];

fn decode_entity(name: &str) -> Option<char> {
    if let Some(num) = name.strip_prefix('#') {
        let code = match num.strip_prefix('x').or_else(|| num.strip_prefix('X')) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse::<u32>().ok()?,
        };
        return char::from_u32(code);
    }
    let ch = match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{00A0}',
        "thinsp" => '\u{2009}',
        "euro" => '€',
        "ndash" => '–',
        "mdash" => '—',
        "hellip" => '…',
        "lsquo" => '‘',
        "rsquo" => '’',
        "ldquo" => '“',
        "rdquo" => '”',
        "auml" => 'ä',
        "Auml" => 'Ä',
        "ouml" => 'ö',
        "Ouml" => 'Ö',
        "aring" => 'å',
        "Aring" => 'Å',
        "uuml" => 'ü',
        "eacute" => 'é',
        _ => return None,
    };
    Some(ch)
}

fn decode_entities_once(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let decoded = tail[1..]
            .find(';')
            .filter(|&end| end > 0 && end <= 10)
            .and_then(|end| decode_entity(&tail[1..=end]).map(|ch| (ch, end)));
        match decoded {
            Some((ch, end)) => {
                out.push(ch);
                rest = &tail[end + 2..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Decodes named and numeric entities until nothing decodes anymore, so
/// double-escaped text such as `&amp;amp;` ends up as `&`.
pub fn decode_entities(input: &str) -> String {
    let mut current = input.to_string();
    loop {
        let next = decode_entities_once(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

/// Normalizes a scraped text field: entities decoded, every unicode space
/// (nbsp, narrow nbsp, thin space, newlines) collapsed to one ASCII space,
/// no space before `€`, trimmed.
pub fn clean(text: &str) -> String {
    let decoded = decode_entities(text);
    let collapsed = decoded.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.replace(" €", "€").trim().to_string()
}

pub fn replace_prefixes(text: &str) -> String {
    PRICE_PREFIXES
        .iter()
        .fold(text.to_string(), |acc, (from, to)| acc.replace(from, to))
}

fn contains_any(text: &str, markers: &[&str]) -> bool {
    let lower = text.to_lowercase();
    markers.iter().any(|m| lower.contains(m))
}

pub fn is_sold_out(text: &str) -> bool {
    contains_any(&decode_entities(text), SOLD_OUT_MARKERS)
}

pub fn is_free_entry(text: &str) -> bool {
    contains_any(&decode_entities(text), FREE_ENTRY_MARKERS)
}

/// Builds one price string out of raw fragments.
///
/// A sold-out marker anywhere wins over every amount, then free entry.
/// Otherwise each fragment loses its vendor prefixes, is cleaned, and the
/// non-empty results are joined with `" / "`.
pub fn clean_price<S: AsRef<str>>(fragments: &[S]) -> String {
    if fragments.iter().any(|f| is_sold_out(f.as_ref())) {
        return SOLD_OUT.to_string();
    }
    if fragments.iter().any(|f| is_free_entry(f.as_ref())) {
        return FREE_ENTRY.to_string();
    }
    fragments
        .iter()
        .map(|f| clean(&replace_prefixes(&decode_entities(f.as_ref()))))
        .filter(|f| !f.is_empty())
        .collect::<Vec<_>>()
        .join(" / ")
}

/// Every euro amount in `text`, formatted as `"<amount>€"`.
pub fn euro_amounts(text: &str) -> Vec<String> {
    let text = clean(text);
    EURO_AMOUNT_RE
        .captures_iter(&text)
        .map(|caps| format!("{}€", &caps[1]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_decodes_entities_and_tightens_euro() {
        assert_eq!(clean("  20,00 &euro; "), "20,00€");
        assert_eq!(clean("25&#8364;"), "25€");
        assert_eq!(clean("25&#x20AC;"), "25€");
        assert_eq!(clean("Rock &amp; Roll"), "Rock & Roll");
        assert_eq!(clean("Rock &#038; Roll"), "Rock & Roll");
        assert_eq!(clean("20&#8211;23"), "20–23");
    }

    #[test]
    fn clean_collapses_unicode_spaces() {
        assert_eq!(clean("Jo\u{00A0}Sung\u{202F}Band\u{2009}Live"), "Jo Sung Band Live");
        assert_eq!(clean("Line one\n\n  line two"), "Line one line two");
        assert_eq!(clean("10&nbsp;€"), "10€");
        assert_eq!(clean("&#32;€"), "€");
        assert_eq!(clean("x&#160;€"), "x€");
        assert_eq!(clean("&amp;#32;€"), "€");
    }

    #[test]
    fn clean_is_idempotent() {
        let samples = [
            "",
            "   ",
            "Rock &amp;amp; Roll",
            "20,00 €",
            "&lt;b&gt;",
            "a & b",
            "&unknown; text",
            "Ovet klo 20\u{00A0}–\u{202F}",
            "&&amp;;",
            "trailing &",
            "Äänet &auml; &#x41;",
            // decoded spaces next to the euro sign
            "&#32;€",
            "x&#160;€",
            "x &#32; &#8364;",
            "&amp;#32;€",
            "20&#x20;&#x20;&euro;&nbsp;",
            "a\u{2009}€ €",
            "&nbsp;&euro;&nbsp;&euro;",
            "&#32;&amp;#32;&#32;",
        ];
        for s in samples {
            let once = clean(s);
            assert_eq!(clean(&once), once, "not idempotent for {:?}", s);
        }
    }

    #[test]
    fn unknown_entities_pass_through() {
        assert_eq!(clean("&bogus; & more"), "&bogus; & more");
    }

    #[test]
    fn clean_price_strips_vendor_prefixes() {
        let price = clean_price(&["Liput 25 €", "Lippu.fi"]);
        assert_eq!(price, "25€");
        assert!(!price.contains("Liput"));
    }

    #[test]
    fn clean_price_joins_fragments() {
        assert_eq!(clean_price(&["alk. 20 €", "ovelta 25 €"]), "20€ / 25€");
    }

    #[test]
    fn sold_out_takes_priority_over_amounts() {
        assert_eq!(clean_price(&["25 €", "Loppuunmyyty"]), SOLD_OUT);
        assert_eq!(clean_price(&["LOPPUUNVARATTU"]), SOLD_OUT);
        assert_eq!(clean_price(&["Sold out"]), SOLD_OUT);
    }

    #[test]
    fn free_entry_is_standardized() {
        assert_eq!(clean_price(&["Vapaa pääsy!"]), FREE_ENTRY);
        assert_eq!(clean_price(&["Maksuton"]), FREE_ENTRY);
    }

    #[test]
    fn empty_input_yields_empty_price() {
        let none: [&str; 0] = [];
        assert_eq!(clean_price(&none), "");
        assert_eq!(clean_price(&["", "   "]), "");
    }

    #[test]
    fn euro_amounts_picks_every_amount() {
        let amounts = euro_amounts("Ennakko 15 € / ovelta 20,50€ + kulut");
        assert_eq!(amounts, vec!["15€".to_string(), "20,50€".to_string()]);
        assert!(euro_amounts("Vapaa pääsy").is_empty());
    }
}
