use super::ValidationMode;

const MAX_LOCAL_LEN: usize = 64;

/// Pushes every reason `local` is not acceptable under `mode`.
pub(crate) fn check_local(local: &str, mode: ValidationMode, reasons: &mut Vec<String>) {
    if local.is_empty() || local.len() > MAX_LOCAL_LEN {
        reasons.push(format!(
            "local part length {} invalid (1..={MAX_LOCAL_LEN})",
            local.len()
        ));
        return;
    }

    let ok = match mode {
        ValidationMode::Strict => is_dot_atom(local),
        ValidationMode::Relaxed => is_quoted_string(local) || is_dot_atom(local),
    };
    if !ok {
        reasons.push(match mode {
            ValidationMode::Strict => "invalid local part (strict rules)".into(),
            ValidationMode::Relaxed => "invalid local part (relaxed rules)".into(),
        });
    }
}

fn is_dot_atom(s: &str) -> bool {
    !s.split('.').any(str::is_empty) && s.chars().all(|c| c == '.' || is_atext(c))
}

// RFC 5322 §3.2.3
fn is_atext(c: char) -> bool {
    c.is_ascii_alphanumeric() || "!#$%&'*+-/=?^_`{|}~".contains(c)
}

fn is_quoted_string(s: &str) -> bool {
    let Some(inner) = s
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
    else {
        return false;
    };
    let mut escaped = false;
    for c in inner.chars() {
        if c.is_ascii_control() {
            return false;
        }
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '"' => return false,
            _ => {}
        }
    }
    !escaped
}
