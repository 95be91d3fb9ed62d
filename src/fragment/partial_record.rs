//! Sparse song director records exchanged with fragments.
//!
//! A `None` field means "this fragment does not know the field", so merging
//! treats it as neutral. Two known values must be equal, otherwise the merge
//! fails and the coordinator reports the conflict instead of choosing a value.

use crate::song_director::{Property, PropertyValue, Rank, SongDirector, ValidationError};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MergeError {
    #[error("Conflicting values for {field} of song director {id:?}: {left:?} != {right:?}")]
    FieldConflict {
        id: Option<String>,
        field: Property,
        left: String,
        right: String,
    },

    #[error("Song director records with different ids can't be merged: {left:?} != {right:?}")]
    IdMismatch {
        left: Option<String>,
        right: Option<String>,
    },

    #[error("There are no song director records to merge")]
    Empty,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartialRecord {
    pub id: Option<String>,
    pub full_name: Option<String>,
    pub email_address: Option<String>,
    pub phone_number: Option<String>,
    pub rank_name: Option<String>,
    pub is_active: Option<bool>,
}

impl PartialRecord {
    pub fn with_id<S: Into<String>>(id: S) -> Self {
        Self {
            id: Some(id.into()),
            ..Default::default()
        }
    }

    /// Merges two records describing the same song director.
    pub fn merge(&self, other: &PartialRecord) -> Result<PartialRecord, MergeError> {
        if self.id != other.id {
            return Err(MergeError::IdMismatch {
                left: self.id.clone(),
                right: other.id.clone(),
            });
        }

        let id = &self.id;
        Ok(PartialRecord {
            id: id.clone(),
            full_name: merge_value(id, Property::FullName, &self.full_name, &other.full_name)?,
            email_address: merge_value(
                id,
                Property::EmailAddress,
                &self.email_address,
                &other.email_address,
            )?,
            phone_number: merge_value(
                id,
                Property::PhoneNumber,
                &self.phone_number,
                &other.phone_number,
            )?,
            rank_name: merge_value(id, Property::Rank, &self.rank_name, &other.rank_name)?,
            is_active: merge_value(id, Property::IsActive, &self.is_active, &other.is_active)?,
        })
    }

    /// Folds `merge` over the records in order, stopping at the first conflict.
    pub fn merge_all<I>(records: I) -> Result<PartialRecord, MergeError>
    where
        I: IntoIterator<Item = PartialRecord>,
    {
        let mut records = records.into_iter();
        let first = records.next().ok_or(MergeError::Empty)?;
        records.try_fold(first, |merged, next| merged.merge(&next))
    }

    /// Keeps the id and the given fields, clearing everything else.
    pub fn project(&self, owned: &[Property]) -> PartialRecord {
        let keep = |property: Property| owned.contains(&property);
        PartialRecord {
            id: self.id.clone(),
            full_name: self.full_name.clone().filter(|_| keep(Property::FullName)),
            email_address: self
                .email_address
                .clone()
                .filter(|_| keep(Property::EmailAddress)),
            phone_number: self
                .phone_number
                .clone()
                .filter(|_| keep(Property::PhoneNumber)),
            rank_name: self.rank_name.clone().filter(|_| keep(Property::Rank)),
            is_active: self.is_active.filter(|_| keep(Property::IsActive)),
        }
    }

    /// Value of a single property. A rank name that is not a known rank is returned
    /// as `Err` with the raw name.
    pub fn property(&self, property: Property) -> Result<Option<PropertyValue>, String> {
        Ok(match property {
            Property::FullName => self.full_name.clone().map(PropertyValue::Text),
            Property::EmailAddress => self.email_address.clone().map(PropertyValue::Text),
            Property::PhoneNumber => self.phone_number.clone().map(PropertyValue::Text),
            Property::Rank => match &self.rank_name {
                Some(name) => Some(PropertyValue::Rank(
                    Rank::from_name(name).ok_or_else(|| name.clone())?,
                )),
                None => None,
            },
            Property::IsActive => self.is_active.map(PropertyValue::Flag),
        })
    }

    /// Builds the aggregate from a merged record. A missing active flag reads as inactive.
    pub fn to_song_director(&self) -> Result<SongDirector, ValidationError> {
        let mut song_director = SongDirector::try_create(
            self.full_name.as_deref(),
            self.email_address.as_deref(),
            self.phone_number.as_deref(),
            self.rank_name.as_deref(),
            self.is_active.unwrap_or(false),
        )?;
        if let Some(id) = &self.id {
            song_director.update_id(id.clone());
        }
        Ok(song_director)
    }
}

impl From<&SongDirector> for PartialRecord {
    fn from(song_director: &SongDirector) -> Self {
        PartialRecord {
            id: song_director.id().map(str::to_string),
            full_name: Some(song_director.full_name().to_string()),
            email_address: Some(song_director.email_address().to_string()),
            phone_number: song_director.phone_number().map(str::to_string),
            rank_name: song_director.rank().map(|r| r.name().to_string()),
            is_active: Some(song_director.is_active()),
        }
    }
}

fn merge_value<T>(
    id: &Option<String>,
    field: Property,
    left: &Option<T>,
    right: &Option<T>,
) -> Result<Option<T>, MergeError>
where
    T: Clone + PartialEq + std::fmt::Debug,
{
    match (left, right) {
        (None, None) => Ok(None),
        (Some(value), None) | (None, Some(value)) => Ok(Some(value.clone())),
        (Some(l), Some(r)) if l == r => Ok(Some(l.clone())),
        (Some(l), Some(r)) => Err(MergeError::FieldConflict {
            id: id.clone(),
            field,
            left: format!("{:?}", l),
            right: format!("{:?}", r),
        }),
    }
}
