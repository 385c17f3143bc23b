use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Account tier: invitation-gated accounts are `registered`, the rest `trial`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    Trial,
    Registered,
}

/// Usage counters maintained by the trial-tracking collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrialData {
    pub count: u64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub first_use: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub last_update: OffsetDateTime,
}

impl TrialData {
    pub fn zeroed(now: OffsetDateTime) -> Self {
        Self {
            count: 0,
            created_at: now,
            first_use: now,
            last_update: now,
        }
    }
}

/// Persisted user record. The password hash stays in the users collection
/// and never crosses the API boundary; responses use [`PublicUser`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
    pub user_type: UserType,
    #[serde(with = "time::serde::rfc3339")]
    pub registration_date: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub last_login: OffsetDateTime,
    pub trial_data: TrialData,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
}

impl UserRecord {
    pub fn new(
        username: String,
        password_hash: String,
        user_type: UserType,
        fingerprint: Option<String>,
    ) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            id: Uuid::new_v4(),
            username,
            password_hash,
            user_type,
            registration_date: now,
            last_login: now,
            trial_data: TrialData::zeroed(now),
            fingerprint,
        }
    }
}

/// User record minus the password hash, as returned to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: Uuid,
    pub username: String,
    pub user_type: UserType,
    #[serde(with = "time::serde::rfc3339")]
    pub registration_date: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub last_login: OffsetDateTime,
    pub trial_data: TrialData,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
}

impl From<&UserRecord> for PublicUser {
    fn from(user: &UserRecord) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            user_type: user.user_type,
            registration_date: user.registration_date,
            last_login: user.last_login,
            trial_data: user.trial_data.clone(),
            fingerprint: user.fingerprint.clone(),
        }
    }
}

/// Single-use registration gate. Transitions `used: false -> true` exactly
/// once, atomically with the registration that consumes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvitationRecord {
    pub code: String,
    pub used: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub used_by: Option<String>,
    #[serde(
        with = "time::serde::rfc3339::option",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub used_date: Option<OffsetDateTime>,
}

/// Security-relevant events appended to the audit collection. The store
/// stamps each entry with a timestamp on append.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AuditEvent {
    #[serde(rename_all = "camelCase")]
    Login {
        username: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        ip: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        user_agent: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Register {
        username: String,
        user_type: UserType,
        invitation_code: String,
    },
    #[serde(rename_all = "camelCase")]
    Logout { username: String },
}
