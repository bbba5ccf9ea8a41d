#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum UserLanguage {
    #[default]
    Pt,
    En,
}

impl UserLanguage {
    /// Picks the first tag of an `Accept-Language` value, defaulting to Portuguese.
    pub fn from_raw(raw: Option<&str>) -> Self {
        let candidate = raw
            .unwrap_or("pt")
            .split(',')
            .next()
            .unwrap_or("pt")
            .split(['-', '_', ';'])
            .next()
            .unwrap_or("pt")
            .trim()
            .to_lowercase();
        match candidate.as_str() {
            "en" => UserLanguage::En,
            _ => UserLanguage::Pt,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UserLanguage::Pt => "pt",
            UserLanguage::En => "en",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_raw() {
        assert_eq!(UserLanguage::from_raw(None), UserLanguage::Pt);
        assert_eq!(UserLanguage::from_raw(Some("en-US,en;q=0.9")), UserLanguage::En);
        assert_eq!(UserLanguage::from_raw(Some("pt-BR")), UserLanguage::Pt);
        assert_eq!(UserLanguage::from_raw(Some("fr")), UserLanguage::Pt);
    }
}
