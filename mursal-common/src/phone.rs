//! Egyptian phone canonicalization
//!
//! Order sheets carry phone numbers in every imaginable shape: local
//! `01xxxxxxxxx`, international `+20`/`0020`, digits embedded in formula
//! error text, stray punctuation. Everything outbound is normalized to the
//! single canonical form `20` + 10 digits before it reaches the transport.

/// A validated Egyptian mobile number in international form.
///
/// Always 12 digits: `20` followed by a 10-digit subscriber number whose
/// first digit is `1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct CanonicalPhone(String);

impl CanonicalPhone {
    /// The canonical digit string, e.g. `201234567890`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last `n` digits, used for stable-key derivation.
    #[must_use]
    pub fn last_digits(&self, n: usize) -> &str {
        &self.0[self.0.len().saturating_sub(n)..]
    }
}

impl std::fmt::Display for CanonicalPhone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Canonicalize a row's phone fields, preferring the alternate number when
/// it yields a valid result.
#[must_use]
pub fn canonicalize(primary: &str, alternate: &str) -> Option<CanonicalPhone> {
    canonicalize_single(alternate).or_else(|| canonicalize_single(primary))
}

/// Canonicalize a single raw phone cell.
///
/// Returns `None` when no valid Egyptian mobile number can be recovered.
#[must_use]
pub fn canonicalize_single(raw: &str) -> Option<CanonicalPhone> {
    let digits = extract_digits(raw)?;

    // Accepted input shapes, all normalized to 20 + 10 digits:
    //   20XXXXXXXXXX (already international)
    //   01XXXXXXXXX  (local with trunk zero)
    //   1XXXXXXXXX   (bare subscriber number)
    let candidate = if digits.len() == 12 && digits.starts_with("20") {
        digits
    } else if digits.len() == 11 && digits.starts_with("01") {
        format!("20{}", &digits[1..])
    } else if digits.len() == 10 && digits.starts_with('1') {
        format!("20{digits}")
    } else {
        return None;
    };

    (candidate.len() == 12 && candidate.starts_with("201")).then(|| CanonicalPhone(candidate))
}

/// Pull a usable digit string out of a raw cell.
///
/// Separators are dropped and an international prefix (`+` or `00`) is
/// stripped. Cells polluted by non-numeric text (formula errors, notes)
/// fall back to the longest embedded run of 8 to 15 digits.
fn extract_digits(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let stripped: String = trimmed
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')' | '.' | '/' | '\u{a0}'))
        .collect();

    let stripped = stripped
        .strip_prefix('+')
        .or_else(|| stripped.strip_prefix("00"))
        .unwrap_or(&stripped);

    if !stripped.is_empty() && stripped.chars().all(|c| c.is_ascii_digit()) {
        return Some(stripped.to_string());
    }

    longest_digit_run(stripped)
}

fn longest_digit_run(text: &str) -> Option<String> {
    let mut best: Option<&str> = None;
    let mut start = None;

    for (i, c) in text.char_indices() {
        if c.is_ascii_digit() {
            start.get_or_insert(i);
        } else if let Some(s) = start.take() {
            let run = &text[s..i];
            if run.len() > best.map_or(0, str::len) {
                best = Some(run);
            }
        }
    }
    if let Some(s) = start {
        let run = &text[s..];
        if run.len() > best.map_or(0, str::len) {
            best = Some(run);
        }
    }

    best.filter(|run| (8..=15).contains(&run.len()))
        .map(str::to_string)
}
