use serde::{Deserialize, Serialize};

/// Editor font choice stored with each document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontFamily {
    #[default]
    System,
    Serif,
    Mono,
    Inter,
    Georgia,
    Merriweather,
}

impl FontFamily {
    pub const ALL: [FontFamily; 6] = [
        FontFamily::System,
        FontFamily::Serif,
        FontFamily::Mono,
        FontFamily::Inter,
        FontFamily::Georgia,
        FontFamily::Merriweather,
    ];

    /// Parse a stored name. Unknown names fall back to the default.
    pub fn parse(name: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|f| f.as_str() == name)
            .unwrap_or_default()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FontFamily::System => "system",
            FontFamily::Serif => "serif",
            FontFamily::Mono => "mono",
            FontFamily::Inter => "inter",
            FontFamily::Georgia => "georgia",
            FontFamily::Merriweather => "merriweather",
        }
    }

    /// Closest font a word processor is likely to have installed.
    pub fn word_font(&self) -> &'static str {
        match self {
            FontFamily::System | FontFamily::Inter => "Aptos",
            FontFamily::Serif | FontFamily::Georgia | FontFamily::Merriweather => "Georgia",
            FontFamily::Mono => "Consolas",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("system", "Aptos")]
    #[case("inter", "Aptos")]
    #[case("serif", "Georgia")]
    #[case("merriweather", "Georgia")]
    #[case("mono", "Consolas")]
    #[case("comic-sans", "Aptos")]
    fn test_word_font(#[case] name: &str, #[case] expected: &str) {
        assert_eq!(FontFamily::parse(name).word_font(), expected);
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&FontFamily::Merriweather).unwrap();
        assert_eq!(json, "\"merriweather\"");
        let font: FontFamily = serde_json::from_str("\"mono\"").unwrap();
        assert_eq!(font, FontFamily::Mono);
    }
}
