use super::Rank;
use std::fmt;
use std::str::FromStr;

/// A logical field of the song director aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Property {
    FullName,
    EmailAddress,
    PhoneNumber,
    Rank,
    IsActive,
}

const ALL_PROPERTIES: &[Property] = &[
    Property::FullName,
    Property::EmailAddress,
    Property::PhoneNumber,
    Property::Rank,
    Property::IsActive,
];

impl Property {
    pub fn all() -> &'static [Property] {
        ALL_PROPERTIES
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Property::FullName => "full_name",
            Property::EmailAddress => "email_address",
            Property::PhoneNumber => "phone_number",
            Property::Rank => "rank",
            Property::IsActive => "is_active",
        }
    }

    /// Resolves a property name, accepting the snake_case and PascalCase spellings
    /// and the `RankName` alias used by stores that keep the rank as its name.
    pub fn parse(name: &str) -> Option<Self> {
        let normalized: String = name
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .flat_map(char::to_lowercase)
            .collect();

        match normalized.as_str() {
            "fullname" | "displayname" | "name" => Some(Property::FullName),
            "emailaddress" | "email" | "mail" => Some(Property::EmailAddress),
            "phonenumber" | "phone" | "mobilephone" => Some(Property::PhoneNumber),
            "rank" | "rankname" => Some(Property::Rank),
            "isactive" | "active" => Some(Property::IsActive),
            _ => None,
        }
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Property {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Property::parse(s).ok_or_else(|| format!("Unknown song director property '{}'", s))
    }
}

/// The value of a single property as reported by a fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    Text(String),
    Rank(Rank),
    Flag(bool),
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Text(text) => f.write_str(text),
            PropertyValue::Rank(rank) => write!(f, "{}", rank),
            PropertyValue::Flag(flag) => write!(f, "{}", flag),
        }
    }
}
