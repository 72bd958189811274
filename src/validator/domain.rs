const MAX_LABEL_LEN: usize = 63;

/// Converts `domain` to its lowercase ASCII (punycode) form and checks every
/// label. Returns `None` and pushes reasons when the domain is unusable.
pub(crate) fn normalize_domain(domain: &str, reasons: &mut Vec<String>) -> Option<String> {
    let ascii = match idna::domain_to_ascii(domain.trim_end_matches('.')) {
        Ok(ascii) if !ascii.is_empty() => ascii,
        Ok(_) => {
            reasons.push("domain empty after IDNA conversion".to_string());
            return None;
        }
        Err(_) => {
            reasons.push("domain punycode conversion failed".to_string());
            return None;
        }
    };

    let before = reasons.len();
    if !ascii.contains('.') {
        reasons.push("domain must contain at least one dot".to_string());
    }
    for label in ascii.split('.') {
        if label.is_empty() {
            reasons.push("empty domain label".to_string());
        } else if label.len() > MAX_LABEL_LEN {
            reasons.push(format!("domain label '{label}' length {} > 63", label.len()));
        } else if label.starts_with('-') || label.ends_with('-') {
            reasons.push(format!("domain label '{label}' cannot start/end with '-'"));
        } else if !label.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-') {
            reasons.push(format!("domain label '{label}' has invalid chars"));
        }
    }

    (reasons.len() == before).then_some(ascii)
}
