use validator::ValidateEmail;

/// Validates that the input looks like a valid email address
pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    !email.is_empty() && email.validate_email()
}

/// Strips punctuation from masked inputs such as `529.982.247-25`.
pub fn digits_only(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Accepts a CPF (11 digits) or CNPJ (14 digits), masked or not,
/// and checks the verification digits.
pub fn is_valid_tax_id(raw: &str) -> bool {
    let digits: Vec<u32> = digits_only(raw)
        .chars()
        .filter_map(|c| c.to_digit(10))
        .collect();
    match digits.len() {
        11 => is_valid_cpf(&digits),
        14 => is_valid_cnpj(&digits),
        _ => false,
    }
}

fn all_same(digits: &[u32]) -> bool {
    digits.windows(2).all(|w| w[0] == w[1])
}

fn is_valid_cpf(digits: &[u32]) -> bool {
    if all_same(digits) {
        return false;
    }
    let check = |len: usize| -> u32 {
        let sum: u32 = digits[..len]
            .iter()
            .enumerate()
            .map(|(i, d)| d * (len as u32 + 1 - i as u32))
            .sum();
        let r = (sum * 10) % 11;
        if r == 10 { 0 } else { r }
    };
    check(9) == digits[9] && check(10) == digits[10]
}

fn is_valid_cnpj(digits: &[u32]) -> bool {
    if all_same(digits) {
        return false;
    }
    const W1: [u32; 12] = [5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];
    const W2: [u32; 13] = [6, 5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];
    let check = |weights: &[u32]| -> u32 {
        let sum: u32 = digits.iter().zip(weights).map(|(d, w)| d * w).sum();
        let r = sum % 11;
        if r < 2 { 0 } else { 11 - r }
    };
    check(&W1) == digits[12] && check(&W2) == digits[13]
}

/// Normalizes a Brazilian phone number to area code + number (10 or 11 digits).
/// A leading `55` country code is dropped.
pub fn normalize_phone(raw: &str) -> Option<String> {
    let mut digits = digits_only(raw);
    if (digits.len() == 12 || digits.len() == 13) && digits.starts_with("55") {
        digits.drain(..2);
    }
    match digits.len() {
        10 | 11 => Some(digits),
        _ => None,
    }
}
