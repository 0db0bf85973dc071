use std::fmt;

/// A typed header value.
#[derive(Clone, Debug, PartialEq)]
pub enum HeaderValue {
    Str(String),
    Int(i64),
    Float(f64),
}

impl HeaderValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            _ => None,
        }
    }
}

impl fmt::Display for HeaderValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => write!(f, "'{s}'"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{v}"),
        }
    }
}

impl From<&str> for HeaderValue {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for HeaderValue {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<f64> for HeaderValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<i64> for HeaderValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

/// One keyword/value pair.
#[derive(Clone, Debug, PartialEq)]
pub struct Card {
    pub keyword: String,
    pub value: HeaderValue,
}

impl Card {
    pub fn new(keyword: &str, value: impl Into<HeaderValue>) -> Self {
        Self {
            keyword: keyword.to_ascii_uppercase(),
            value: value.into(),
        }
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<8}= {}", self.keyword, self.value)
    }
}

/// Ordered keyword cards of one HDU, without the data-layout keywords that
/// cfitsio maintains itself.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FitsHeader {
    cards: Vec<Card>,
}

impl FitsHeader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn push(&mut self, card: Card) {
        self.cards.push(card);
    }

    pub fn get(&self, keyword: &str) -> Option<&HeaderValue> {
        let keyword = keyword.to_ascii_uppercase();
        self.cards
            .iter()
            .find(|c| c.keyword == keyword)
            .map(|c| &c.value)
    }

    pub fn get_str(&self, keyword: &str) -> Option<&str> {
        self.get(keyword).and_then(HeaderValue::as_str)
    }

    pub fn get_f64(&self, keyword: &str) -> Option<f64> {
        self.get(keyword).and_then(HeaderValue::as_f64)
    }

    pub fn get_i64(&self, keyword: &str) -> Option<i64> {
        self.get(keyword).and_then(HeaderValue::as_i64)
    }

    pub fn contains(&self, keyword: &str) -> bool {
        self.get(keyword).is_some()
    }

    /// Update the first card with this keyword or append a new one.
    pub fn set(&mut self, keyword: &str, value: impl Into<HeaderValue>) {
        self.set_card(Card::new(keyword, value));
    }

    pub fn set_card(&mut self, card: Card) {
        match self.cards.iter_mut().find(|c| c.keyword == card.keyword) {
            Some(existing) => existing.value = card.value,
            None => self.cards.push(card),
        }
    }

    /// Remove every card whose keyword satisfies `pred`.
    pub fn remove_where(&mut self, pred: impl Fn(&str) -> bool) {
        self.cards.retain(|c| !pred(c.keyword.as_str()));
    }

    pub fn remove(&mut self, keyword: &str) {
        let keyword = keyword.to_ascii_uppercase();
        self.remove_where(|k| k == keyword);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_updates_in_place() {
        let mut header = FitsHeader::new();
        header.set("object", "M31");
        header.set("EXPTIME", 30.0);
        header.set("OBJECT", "M33");
        assert_eq!(header.len(), 2);
        assert_eq!(header.cards()[0].keyword, "OBJECT");
        assert_eq!(header.get_str("OBJECT"), Some("M33"));
    }

    #[test]
    fn test_numeric_accessors() {
        let mut header = FitsHeader::new();
        header.set("NCOMBINE", 5i64);
        header.set("GAIN", 1.5);
        assert_eq!(header.get_f64("NCOMBINE"), Some(5.0));
        assert_eq!(header.get_i64("GAIN"), None);
        assert_eq!(header.get_str("GAIN"), None);
    }

    #[test]
    fn test_remove_where() {
        let mut header = FitsHeader::new();
        header.set("CRPIX1", 10.0);
        header.set("CRPIX2", 12.0);
        header.set("OBJECT", "M31");
        header.remove_where(|k| k.starts_with("CRPIX"));
        assert_eq!(header.len(), 1);
        assert!(header.contains("OBJECT"));
    }

    #[test]
    fn test_card_display() {
        assert_eq!(Card::new("FILTRO", "Sloan_r").to_string(), "FILTRO  = 'Sloan_r'");
        assert_eq!(Card::new("NAXIS1", 2073i64).to_string(), "NAXIS1  = 2073");
    }
}
