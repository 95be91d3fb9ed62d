use std::fmt;

/// Prefix of the role string carrying a song director's rank in the identity directory.
pub const RANK_ROLE_PREFIX: &str = "SongDirector.Rank";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Rank {
    Apprentice,
    Journeyer,
    Master,
    Grandmaster,
}

const ALL_RANKS: &[Rank] = &[
    Rank::Apprentice,
    Rank::Journeyer,
    Rank::Master,
    Rank::Grandmaster,
];

impl Rank {
    pub fn all() -> &'static [Rank] {
        ALL_RANKS
    }

    pub fn name(self) -> &'static str {
        match self {
            Rank::Apprentice => "Apprentice",
            Rank::Journeyer => "Journeyer",
            Rank::Master => "Master",
            Rank::Grandmaster => "Grandmaster",
        }
    }

    /// Tier number, 1 for the lowest rank and 4 for the highest.
    pub fn number(self) -> u8 {
        match self {
            Rank::Apprentice => 1,
            Rank::Journeyer => 2,
            Rank::Master => 3,
            Rank::Grandmaster => 4,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        ALL_RANKS.iter().copied().find(|r| r.name() == name)
    }

    pub fn from_number(number: u8) -> Option<Self> {
        ALL_RANKS.iter().copied().find(|r| r.number() == number)
    }

    /// The rank directly above this one, None for the top rank.
    pub fn next(self) -> Option<Self> {
        Self::from_number(self.number() + 1)
    }

    /// The rank directly below this one, None for the lowest rank.
    pub fn previous(self) -> Option<Self> {
        Self::from_number(self.number().checked_sub(1)?)
    }

    /// Role string stored by the identity directory, e.g. `SongDirector.Rank:Master`.
    /// The name is written as given, unknown names included.
    pub fn role_string_for(name: &str) -> String {
        format!("{}:{}", RANK_ROLE_PREFIX, name)
    }

    /// Extracts the rank name from a roles string. Only the name is returned, unknown
    /// names are left for the caller to reject.
    pub fn name_from_roles(roles: &str) -> Option<String> {
        roles
            .split(';')
            .map(str::trim)
            .find_map(|role| role.strip_prefix(RANK_ROLE_PREFIX)?.strip_prefix(':'))
            .filter(|name| !name.is_empty())
            .map(str::to_string)
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranks_are_ordered_by_tier() {
        assert!(Rank::Apprentice < Rank::Journeyer);
        assert!(Rank::Journeyer < Rank::Master);
        assert!(Rank::Master < Rank::Grandmaster);
        assert_eq!(Rank::all().len(), 4);
    }

    #[test]
    fn from_name_is_exact() {
        assert_eq!(Rank::from_name("Master"), Some(Rank::Master));
        assert_eq!(Rank::from_name("master"), None);
        assert_eq!(Rank::from_name("Captain"), None);
    }

    #[test]
    fn next_and_previous_stop_at_the_ends() {
        assert_eq!(Rank::Apprentice.next(), Some(Rank::Journeyer));
        assert_eq!(Rank::Grandmaster.next(), None);
        assert_eq!(Rank::Master.previous(), Some(Rank::Journeyer));
        assert_eq!(Rank::Apprentice.previous(), None);
    }

    #[test]
    fn parses_rank_from_roles_string() {
        assert_eq!(
            Rank::name_from_roles("SongDirector.Rank:Journeyer"),
            Some("Journeyer".to_string())
        );
        assert_eq!(
            Rank::name_from_roles("Other:Thing; SongDirector.Rank:Master"),
            Some("Master".to_string())
        );
        assert_eq!(Rank::name_from_roles("Other:Thing"), None);
        assert_eq!(Rank::name_from_roles("SongDirector.Rank:"), None);
        assert_eq!(
            Rank::name_from_roles(&Rank::role_string_for(Rank::Grandmaster.name())),
            Some("Grandmaster".to_string())
        );
    }
}
