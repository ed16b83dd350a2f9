//! Name cleaning for email local-part generation.

/// Folds common Latin diacritics to ASCII. Anything else non-ASCII is dropped
/// by [`clean_name_part`].
fn fold_char(c: char) -> Option<&'static str> {
    let folded = match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' | 'ă' | 'ą' => "a",
        'æ' => "ae",
        'ç' | 'ć' | 'č' | 'ĉ' => "c",
        'ď' | 'đ' | 'ð' => "d",
        'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ė' | 'ę' | 'ě' => "e",
        'ğ' | 'ġ' | 'ģ' => "g",
        'ì' | 'í' | 'î' | 'ï' | 'ī' | 'į' | 'ı' => "i",
        'ķ' => "k",
        'ł' | 'ľ' | 'ļ' | 'ĺ' => "l",
        'ñ' | 'ń' | 'ň' | 'ņ' => "n",
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'ō' | 'ő' => "o",
        'œ' => "oe",
        'ř' | 'ŕ' => "r",
        'ś' | 'š' | 'ş' | 'ș' => "s",
        'ß' => "ss",
        'ť' | 'ţ' | 'ț' => "t",
        'þ' => "th",
        'ù' | 'ú' | 'û' | 'ü' | 'ū' | 'ů' | 'ű' | 'ų' => "u",
        'ý' | 'ÿ' => "y",
        'ź' | 'ż' | 'ž' => "z",
        _ => return None,
    };
    Some(folded)
}

/// Lower-cases, transliterates and strips everything but ASCII letters and
/// digits. Internal whitespace, apostrophes, hyphens and dots disappear:
/// `"O'Malley"` → `"omalley"`, `"José María"` → `"josemaria"`.
pub fn clean_name_part(part: &str) -> String {
    let mut out = String::with_capacity(part.len());
    for c in part.trim().chars().flat_map(char::to_lowercase) {
        if c.is_ascii_alphanumeric() {
            out.push(c);
        } else if let Some(folded) = fold_char(c) {
            out.push_str(folded);
        }
    }
    out
}

/// A contact's name after cleaning. Both parts are non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PersonName {
    pub first: String,
    pub last: String,
}

impl PersonName {
    /// Cleans both parts; `None` if either ends up empty.
    pub fn new(first: &str, last: &str) -> Option<Self> {
        let first = clean_name_part(first);
        let last = clean_name_part(last);
        if first.is_empty() || last.is_empty() {
            return None;
        }
        Some(Self { first, last })
    }

    pub fn first_initial(&self) -> char {
        // Constructor guarantees non-empty parts.
        self.first.chars().next().unwrap_or_default()
    }

    pub fn last_initial(&self) -> char {
        self.last.chars().next().unwrap_or_default()
    }
}
