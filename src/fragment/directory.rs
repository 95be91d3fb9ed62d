//! Identity fragment backed by a user-directory REST service.
//!
//! Song directors are directory users with a dedicated job title. The directory
//! owns the id and every field except the active flag; the rank is kept in a
//! roles extension attribute as `SongDirector.Rank:<name>`.

use super::{Fragment, FragmentError, FragmentResult, Operation, PartialRecord};
use crate::song_director::{Property, PropertyValue, Rank};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::debug;

const FRAGMENT_NAME: &str = "directory";

pub const DEFAULT_JOB_TITLE: &str = "Song Director";
pub const DEFAULT_ROLES_ATTRIBUTE: &str = "extension_Roles";
pub const DEFAULT_TIMEOUT_SEC: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryFragmentConfig {
    /// Base URL of the directory API, e.g. "https://directory.example.com/v1.0".
    pub base_url: String,
    /// Domain used for user principal names.
    pub domain: String,
    pub roles_attribute: String,
    pub job_title: String,
    pub timeout_sec: u64,
}

impl DirectoryFragmentConfig {
    pub fn new<S: Into<String>>(base_url: S, domain: S) -> Self {
        Self {
            base_url: base_url.into(),
            domain: domain.into(),
            roles_attribute: DEFAULT_ROLES_ATTRIBUTE.to_string(),
            job_title: DEFAULT_JOB_TITLE.to_string(),
            timeout_sec: DEFAULT_TIMEOUT_SEC,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PasswordProfile {
    force_change_password_next_sign_in: bool,
    password: String,
}

/// A directory user as sent and received on the wire. The roles attribute has a
/// configurable name, so it travels in `additional_data`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DirectoryUser {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    mail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    mobile_phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    job_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    mail_nickname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_principal_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    password_profile: Option<PasswordProfile>,
    #[serde(flatten)]
    additional_data: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct UserList {
    value: Vec<DirectoryUser>,
}

/// Lowercased full name with spaces replaced by dots.
fn mail_nickname(full_name: &str) -> String {
    full_name.to_lowercase().replace(' ', ".")
}

pub struct DirectoryFragment {
    client: reqwest::Client,
    config: DirectoryFragmentConfig,
}

impl DirectoryFragment {
    pub fn new(config: DirectoryFragmentConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_sec))
            .build()
            .context("Failed to create HTTP client")?;

        let config = DirectoryFragmentConfig {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            ..config
        };

        Ok(Self { client, config })
    }

    fn users_url(&self) -> String {
        format!("{}/users", self.config.base_url)
    }

    fn user_url(&self, id: &str) -> FragmentResult<String> {
        Ok(format!("{}/users/{}", self.config.base_url, path_segment(id)?))
    }

    fn restore_url(&self, id: &str) -> FragmentResult<String> {
        Ok(format!(
            "{}/deletedItems/{}/restore",
            self.config.base_url,
            path_segment(id)?
        ))
    }

    fn rank_name(&self, user: &DirectoryUser) -> Option<String> {
        user.additional_data
            .get(&self.config.roles_attribute)
            .and_then(Value::as_str)
            .and_then(Rank::name_from_roles)
    }

    fn to_record(&self, user: DirectoryUser) -> PartialRecord {
        let rank_name = self.rank_name(&user);
        PartialRecord {
            id: user.id,
            full_name: user.display_name,
            email_address: user.mail,
            phone_number: user.mobile_phone,
            rank_name,
            is_active: None,
        }
    }

    /// Fields written on both create and update. Unset optional fields are sent as
    /// null so that an update can clear them.
    fn profile_fields(&self, record: &PartialRecord) -> DirectoryUser {
        let mut additional_data = Map::new();
        additional_data.insert(
            self.config.roles_attribute.clone(),
            record
                .rank_name
                .as_ref()
                .map(|name| Value::String(Rank::role_string_for(name)))
                .unwrap_or(Value::Null),
        );
        if record.phone_number.is_none() {
            additional_data.insert("mobilePhone".to_string(), Value::Null);
        }

        DirectoryUser {
            display_name: record.full_name.clone(),
            mail: record.email_address.clone(),
            mobile_phone: record.phone_number.clone(),
            additional_data,
            ..Default::default()
        }
    }

    fn new_user(&self, record: &PartialRecord) -> DirectoryUser {
        let nickname = record.full_name.as_deref().map(mail_nickname);
        DirectoryUser {
            job_title: Some(self.config.job_title.clone()),
            user_principal_name: nickname
                .as_ref()
                .map(|n| format!("{}@{}", n, self.config.domain)),
            mail_nickname: nickname,
            password_profile: Some(PasswordProfile {
                force_change_password_next_sign_in: false,
                password: uuid::Uuid::new_v4().to_string(),
            }),
            ..self.profile_fields(record)
        }
    }

    async fn fetch_user(&self, id: &str) -> FragmentResult<DirectoryUser> {
        let response = self.client.get(self.user_url(id)?).send().await?;
        let response = check_status(response, id, Operation::GetById).await?;
        Ok(response.json().await?)
    }
}

/// Encodes `id` as exactly one URL path segment. Ids that would still be read as
/// dot segments after encoding are rejected.
fn path_segment(id: &str) -> FragmentResult<String> {
    if id.is_empty() || id == "." || id == ".." {
        return Err(FragmentError::InvalidId(id.to_string()));
    }
    Ok(urlencoding::encode(id).into_owned())
}

/// Maps a non-success response to a fragment error, 404 being "not found".
async fn check_status(
    response: Response,
    id: &str,
    operation: Operation,
) -> FragmentResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::NOT_FOUND {
        return Err(FragmentError::NotFound(id.to_string()));
    }
    let body = response.text().await.unwrap_or_default();
    Err(FragmentError::Store(format!(
        "Directory {} of {} failed with status {}: {}",
        operation, id, status, body
    )))
}

fn required_id(record: &PartialRecord) -> FragmentResult<&str> {
    record
        .id
        .as_deref()
        .ok_or_else(|| FragmentError::MissingId(FRAGMENT_NAME.to_string()))
}

#[async_trait]
impl Fragment for DirectoryFragment {
    fn name(&self) -> &str {
        FRAGMENT_NAME
    }

    fn operation_execution_order(&self, operation: Operation) -> i32 {
        match operation {
            Operation::Add => 1,
            Operation::RemoveById => 2,
            _ => 0,
        }
    }

    async fn try_add(&self, record: &PartialRecord) -> FragmentResult<Option<String>> {
        let user = self.new_user(record);
        debug!("Creating directory user {:?}", user.user_principal_name);

        let response = self.client.post(self.users_url()).json(&user).send().await?;
        let response = check_status(response, "<new>", Operation::Add).await?;
        let created: DirectoryUser = response.json().await?;

        created
            .id
            .map(Some)
            .ok_or_else(|| {
                FragmentError::Store("Directory created a user without an id".to_string())
            })
    }

    async fn try_find_property_by_id(
        &self,
        id: &str,
        property: Property,
    ) -> FragmentResult<Option<PropertyValue>> {
        if property == Property::IsActive {
            return Err(FragmentError::PropertyNotStored {
                fragment: FRAGMENT_NAME.to_string(),
                property,
            });
        }
        let record = self.to_record(self.fetch_user(id).await?);
        record
            .property(property)
            .map_err(|value| FragmentError::InvalidValue { property, value })
    }

    async fn try_get_all(&self) -> FragmentResult<Vec<PartialRecord>> {
        let response = self
            .client
            .get(self.users_url())
            .query(&[("jobTitle", self.config.job_title.as_str())])
            .send()
            .await?;
        let response = check_status(response, "*", Operation::GetAll).await?;
        let users: UserList = response.json().await?;

        Ok(users
            .value
            .into_iter()
            .map(|user| self.to_record(user))
            .collect())
    }

    async fn try_get_by_id(&self, id: &str) -> FragmentResult<PartialRecord> {
        Ok(self.to_record(self.fetch_user(id).await?))
    }

    async fn try_remove_by_id(&self, id: &str) -> FragmentResult<()> {
        let response = self.client.delete(self.user_url(id)?).send().await?;
        check_status(response, id, Operation::RemoveById).await?;
        Ok(())
    }

    async fn try_update(&self, record: &PartialRecord) -> FragmentResult<()> {
        let id = required_id(record)?;
        let response = self
            .client
            .patch(self.user_url(id)?)
            .json(&self.profile_fields(record))
            .send()
            .await?;
        check_status(response, id, Operation::Update).await?;
        Ok(())
    }

    async fn try_rollback_remove(&self, record: &PartialRecord) -> FragmentResult<()> {
        let id = required_id(record)?;
        let response = self.client.post(self.restore_url(id)?).send().await?;
        check_status(response, id, Operation::RollbackRemove).await?;
        Ok(())
    }
}
