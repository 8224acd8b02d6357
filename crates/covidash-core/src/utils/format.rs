use std::cmp::Ordering;

/// Lowercase a string one char at a time.
///
/// `str::to_lowercase` is context sensitive (Greek final sigma), which would
/// make a prefix of a query lowercase differently from the full query.
fn lower_chars(s: &str) -> impl Iterator<Item = char> + '_ {
    s.chars().flat_map(char::to_lowercase)
}

/// Map a lowercase letter to its unaccented base so that "Çorum" sorts next
/// to "Corum" rather than after "Z".
fn fold_accent(c: char) -> char {
    match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' | 'ă' | 'ą' => 'a',
        'ç' | 'ć' | 'č' => 'c',
        'ď' | 'đ' => 'd',
        'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ė' | 'ę' | 'ě' => 'e',
        'ğ' => 'g',
        'ì' | 'í' | 'î' | 'ï' | 'ı' | 'ī' | 'į' => 'i',
        'ł' | 'ľ' => 'l',
        'ñ' | 'ń' | 'ň' => 'n',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'ō' | 'ő' => 'o',
        'ř' => 'r',
        'ś' | 'ş' | 'š' | 'ș' => 's',
        'ţ' | 'ť' | 'ț' => 't',
        'ù' | 'ú' | 'û' | 'ü' | 'ū' | 'ů' | 'ű' => 'u',
        'ý' | 'ÿ' => 'y',
        'ź' | 'ż' | 'ž' => 'z',
        other => other,
    }
}

/// Combining diacritical marks, produced e.g. by lowercasing 'İ'.
fn is_combining_mark(c: char) -> bool {
    ('\u{0300}'..='\u{036f}').contains(&c)
}

fn collation_key(s: &str) -> impl Iterator<Item = char> + '_ {
    lower_chars(s)
        .filter(|c| !is_combining_mark(*c))
        .map(fold_accent)
}

/// Case-insensitive, accent-folding comparison for display ordering.
///
/// Strings that differ only in case or accents still order deterministically:
/// lowercase before uppercase, then by code point.
pub fn cmp_ignore_case(a: &str, b: &str) -> Ordering {
    collation_key(a)
        .cmp(collation_key(b))
        .then_with(|| tie_break(a, b))
}

fn tie_break(a: &str, b: &str) -> Ordering {
    for (ca, cb) in a.chars().zip(b.chars()) {
        if ca != cb {
            // Lowercase first, matching typical locale collation
            return match (ca.is_lowercase(), cb.is_lowercase()) {
                (true, false) => Ordering::Less,
                (false, true) => Ordering::Greater,
                _ => ca.cmp(&cb),
            };
        }
    }
    a.len().cmp(&b.len())
}

/// Check whether `haystack` contains `needle`, ignoring case.
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    let needle: String = lower_chars(needle).collect();
    if needle.is_empty() {
        return true;
    }
    let haystack: String = lower_chars(haystack).collect();
    haystack.contains(&needle)
}

/// Format a count with thousands separators: 1234567 -> "1,234,567"
pub fn format_count(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if n < 0 {
        out.push('-');
    }
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Format a daily change with an explicit sign: "+1,024", "-3", "0"
pub fn format_diff(n: i64) -> String {
    if n > 0 {
        format!("+{}", format_count(n))
    } else {
        format_count(n)
    }
}

/// Format a ratio as a percentage with two decimals: 0.0283 -> "2.83%"
pub fn format_percent(rate: f64) -> String {
    format!("{:.2}%", rate * 100.0)
}

/// Truncate a string to a maximum length, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}
