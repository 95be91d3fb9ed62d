//! The song director aggregate.
//!
//! A song director is never stored as a whole: its fields live in several
//! fragments and the aggregate only exists after the coordinator merges them.

mod property;
mod rank;

pub use property::{Property, PropertyValue};
pub use rank::{Rank, RANK_ROLE_PREFIX};

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Full name is required.")]
    MissingFullName,

    #[error("Email address is required.")]
    MissingEmailAddress,

    #[error("Invalid rank: {0}")]
    InvalidRank(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SongDirector {
    id: Option<String>,
    full_name: String,
    email_address: String,
    phone_number: Option<String>,
    rank: Option<Rank>,
    is_active: bool,
}

impl SongDirector {
    /// Creates a song director without an id.
    ///
    /// Only presence is checked here; name, email and phone formats are the
    /// concern of the use cases calling the repository.
    pub fn try_create(
        full_name: Option<&str>,
        email_address: Option<&str>,
        phone_number: Option<&str>,
        rank_name: Option<&str>,
        is_active: bool,
    ) -> Result<Self, ValidationError> {
        let full_name = full_name
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(ValidationError::MissingFullName)?;

        let email_address = email_address
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(ValidationError::MissingEmailAddress)?;

        let rank = match rank_name {
            Some(name) => Some(
                Rank::from_name(name)
                    .ok_or_else(|| ValidationError::InvalidRank(name.to_string()))?,
            ),
            None => None,
        };

        let phone_number = phone_number
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        Ok(Self {
            id: None,
            full_name: full_name.to_string(),
            email_address: email_address.to_string(),
            phone_number,
            rank,
            is_active,
        })
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    pub fn email_address(&self) -> &str {
        &self.email_address
    }

    pub fn phone_number(&self) -> Option<&str> {
        self.phone_number.as_deref()
    }

    pub fn rank(&self) -> Option<Rank> {
        self.rank
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    /// Assigns the id produced by the identity-owning fragment.
    pub fn update_id<S: Into<String>>(&mut self, id: S) {
        self.id = Some(id.into());
    }

    pub fn with_id<S: Into<String>>(mut self, id: S) -> Self {
        self.update_id(id);
        self
    }

    pub fn set_full_name(&mut self, full_name: &str) -> Result<(), ValidationError> {
        let full_name = full_name.trim();
        if full_name.is_empty() {
            return Err(ValidationError::MissingFullName);
        }
        self.full_name = full_name.to_string();
        Ok(())
    }

    pub fn set_email_address(&mut self, email_address: &str) -> Result<(), ValidationError> {
        let email_address = email_address.trim();
        if email_address.is_empty() {
            return Err(ValidationError::MissingEmailAddress);
        }
        self.email_address = email_address.to_string();
        Ok(())
    }

    pub fn set_phone_number(&mut self, phone_number: Option<&str>) {
        self.phone_number = phone_number
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
    }

    pub fn set_rank(&mut self, rank: Option<Rank>) {
        self.rank = rank;
    }

    pub fn set_active(&mut self, is_active: bool) {
        self.is_active = is_active;
    }
}
