use crate::types::ResultRecord;
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    /// `topic|side_a_score|side_b_score|verdict`, with `\` and `|` escaped in
    /// the text fields.
    pub payload: String,
    /// 64 lowercase hex chars. This is the only thing written on-chain.
    pub digest: String,
}

pub fn fingerprint(record: &ResultRecord) -> Fingerprint {
    let payload = canonical_payload(record);
    let digest = digest_hex(&payload);
    Fingerprint { payload, digest }
}

pub fn canonical_payload(record: &ResultRecord) -> String {
    format!(
        "{}|{}|{}|{}",
        escape_field(&record.topic),
        format_score(record.side_a_score),
        format_score(record.side_b_score),
        escape_field(&record.verdict),
    )
}

pub fn digest_hex(payload: &str) -> String {
    hex::encode(Sha256::digest(payload.as_bytes()))
}

/// Canonical float text that off-chain verifiers recompute: shortest
/// round-trip digits, a mandatory fractional part in positional form (`74.0`),
/// exponent form outside `1e-4 <= |x| < 1e16` (`1e+16`, `1.5e-05`), and
/// `nan`/`inf` for non-finite values.
pub fn format_score(score: f64) -> String {
    if score.is_nan() {
        return "nan".into();
    }
    if score.is_infinite() {
        return if score > 0.0 { "inf".into() } else { "-inf".into() };
    }

    // `{:e}` gives the shortest round-trip mantissa, e.g. "1.5e-5".
    let sci = format!("{score:e}");
    let (mantissa, exp) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let exp: i32 = exp.parse().unwrap_or(0);

    if score != 0.0 && !(-4..16).contains(&exp) {
        let sign = if exp < 0 { '-' } else { '+' };
        return format!("{mantissa}e{sign}{:02}", exp.abs());
    }
    let plain = format!("{score}");
    if plain.contains('.') {
        plain
    } else {
        format!("{plain}.0")
    }
}

// Escaping keeps the encoding injective: an unescaped `|` can only be a field
// separator. Text without `\` or `|` is left untouched.
fn escape_field(text: &str) -> std::borrow::Cow<'_, str> {
    if !text.contains(|c: char| c == '\\' || c == '|') {
        return std::borrow::Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len() + 4);
    for ch in text.chars() {
        if ch == '\\' || ch == '|' {
            out.push('\\');
        }
        out.push(ch);
    }
    std::borrow::Cow::Owned(out)
}
