use std::sync::Arc;

use time::OffsetDateTime;
use tracing::{error, info, warn};

use crate::auth::dto::{AuthResponse, CheckResponse, LoginRequest, LogoutResponse, RegisterRequest};
use crate::auth::password::PasswordHasher;
use crate::auth::records::{AuditEvent, InvitationRecord, PublicUser, UserRecord, UserType};
use crate::auth::token::TokenSigner;
use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::store::{Collection, FileStore};

/// Request metadata supplied by the HTTP layer for auditing.
#[derive(Debug, Default, Clone)]
pub struct ClientContext {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

/// The credential authority: password hashing, token lifecycle, and the four
/// auth operations over the record store.
pub struct AuthService {
    store: Arc<FileStore>,
    passwords: PasswordHasher,
    tokens: TokenSigner,
}

impl AuthService {
    pub fn new(store: Arc<FileStore>, config: &AuthConfig) -> Self {
        Self {
            store,
            passwords: PasswordHasher::new(config.password_salt.clone()),
            tokens: TokenSigner::new(config.token_secret.clone(), config.token_ttl_days),
        }
    }

    /// Verify credentials, refresh `lastLogin` (and fingerprint, when sent),
    /// and mint a session token.
    ///
    /// Missing field, unknown username, and wrong password all produce the
    /// same error so callers cannot probe which accounts exist.
    pub async fn login(
        &self,
        req: LoginRequest,
        ctx: &ClientContext,
    ) -> Result<AuthResponse, AuthError> {
        let (username, password) = match (req.username, req.password) {
            (Some(u), Some(p)) if !u.is_empty() && !p.is_empty() => (u, p),
            _ => return Err(AuthError::InvalidCredentials),
        };

        let guard = self.store.lock(Collection::Users).await;
        let mut users: Vec<UserRecord> = guard.read().await.into_inner();
        let idx = users
            .iter()
            .position(|u| u.username == username)
            .ok_or(AuthError::InvalidCredentials)?;
        if !self.passwords.verify(&password, &users[idx].password_hash) {
            warn!(%username, "login with wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        users[idx].last_login = OffsetDateTime::now_utc();
        if let Some(fingerprint) = req.fingerprint {
            users[idx].fingerprint = Some(fingerprint);
        }
        let user = users[idx].clone();
        if !guard.write(&users).await {
            return Err(AuthError::Storage);
        }
        drop(guard);

        let token = self.tokens.issue(&user)?;
        self.store
            .append(
                Collection::Audit,
                &AuditEvent::Login {
                    username: user.username.clone(),
                    ip: ctx.ip.clone(),
                    user_agent: ctx.user_agent.clone(),
                },
            )
            .await;

        info!(user_id = %user.id, username = %user.username, "user logged in");
        Ok(AuthResponse {
            success: true,
            token,
            user: PublicUser::from(&user),
            message: "login successful".into(),
        })
    }

    /// Create an account, consuming an invitation code when one is supplied.
    ///
    /// Code consumption and user creation commit together: both collection
    /// locks are held (users before invitations, the declaration order),
    /// users is written first, and a failed invitations write rolls the new
    /// user back so a code is never burned without a matching account.
    pub async fn register(&self, req: RegisterRequest) -> Result<AuthResponse, AuthError> {
        let username = req.username.trim().to_string();
        if username.chars().count() < 3 {
            return Err(AuthError::Validation(
                "username must be at least 3 characters".into(),
            ));
        }
        if req.password.len() < 6 {
            return Err(AuthError::Validation(
                "password must be at least 6 characters".into(),
            ));
        }

        let users_guard = self.store.lock(Collection::Users).await;
        let mut users: Vec<UserRecord> = users_guard.read().await.into_inner();
        if users.iter().any(|u| u.username == username) {
            return Err(AuthError::DuplicateUser);
        }

        let code = req.invitation_code.as_deref().filter(|c| !c.is_empty());
        let mut user_type = UserType::Trial;
        let mut consumed = None;
        if let Some(code) = code {
            let invitations_guard = self.store.lock(Collection::Invitations).await;
            let mut invitations: Vec<InvitationRecord> =
                invitations_guard.read().await.into_inner();
            let idx = invitations
                .iter()
                .position(|i| i.code == code)
                .ok_or(AuthError::InvalidCode)?;
            if invitations[idx].used {
                return Err(AuthError::CodeAlreadyUsed);
            }
            invitations[idx].used = true;
            invitations[idx].used_by = Some(username.clone());
            invitations[idx].used_date = Some(OffsetDateTime::now_utc());
            user_type = UserType::Registered;
            consumed = Some((invitations_guard, invitations));
        }

        let user = UserRecord::new(
            username,
            self.passwords.hash(&req.password),
            user_type,
            req.fingerprint,
        );
        let previous_users = users.clone();
        users.push(user.clone());
        if !users_guard.write(&users).await {
            return Err(AuthError::Storage);
        }
        if let Some((invitations_guard, invitations)) = &consumed {
            if !invitations_guard.write(invitations).await {
                // Undo the user so disk state stays consistent with the code.
                if !users_guard.write(&previous_users).await {
                    error!(username = %user.username, "rollback of user record failed");
                }
                return Err(AuthError::Storage);
            }
        }
        drop(consumed);
        drop(users_guard);

        let token = self.tokens.issue(&user)?;
        self.store
            .append(
                Collection::Audit,
                &AuditEvent::Register {
                    username: user.username.clone(),
                    user_type: user.user_type,
                    invitation_code: code.unwrap_or("none").to_string(),
                },
            )
            .await;

        info!(user_id = %user.id, username = %user.username, user_type = ?user.user_type,
            "user registered");
        Ok(AuthResponse {
            success: true,
            token,
            user: PublicUser::from(&user),
            message: "registration successful".into(),
        })
    }

    /// Best-effort: audit the logout when the token verifies, succeed always.
    /// The token itself stays valid until expiry; there is no revocation list.
    pub async fn logout(&self, token: Option<&str>) -> LogoutResponse {
        if let Some(claims) = token.and_then(|t| self.tokens.verify(t)) {
            self.store
                .append(
                    Collection::Audit,
                    &AuditEvent::Logout {
                        username: claims.username.clone(),
                    },
                )
                .await;
            info!(username = %claims.username, "user logged out");
        }
        LogoutResponse {
            success: true,
            message: "logged out".into(),
        }
    }

    /// Resolve a `Bearer` header to the current user record.
    pub async fn check(&self, bearer: Option<&str>) -> Result<CheckResponse, AuthError> {
        let token = bearer
            .and_then(|h| h.strip_prefix("Bearer "))
            .ok_or(AuthError::MissingToken)?;
        let claims = self.tokens.verify(token).ok_or(AuthError::InvalidToken)?;

        let users: Vec<UserRecord> = self.store.read(Collection::Users).await.into_inner();
        let user = users
            .iter()
            .find(|u| u.id == claims.user_id)
            .ok_or(AuthError::UnknownUser)?;
        Ok(CheckResponse {
            success: true,
            user: PublicUser::from(user),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn config() -> AuthConfig {
        AuthConfig {
            password_salt: "test-salt".into(),
            token_secret: "test-secret".into(),
            token_ttl_days: 7,
        }
    }

    async fn service() -> (tempfile::TempDir, AuthService) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = Arc::new(FileStore::new(dir.path()));
        store.initialize().await.expect("initialize");
        let service = AuthService::new(store, &config());
        (dir, service)
    }

    fn register_request(username: &str, code: Option<&str>) -> RegisterRequest {
        RegisterRequest {
            username: username.into(),
            password: "secret1".into(),
            invitation_code: code.map(Into::into),
            fingerprint: None,
        }
    }

    fn login_request(username: &str, password: &str) -> LoginRequest {
        LoginRequest {
            username: Some(username.into()),
            password: Some(password.into()),
            fingerprint: None,
        }
    }

    async fn seed_invitation(service: &AuthService, code: &str) {
        let codes = vec![InvitationRecord {
            code: code.into(),
            used: false,
            used_by: None,
            used_date: None,
        }];
        assert!(service.store.write(Collection::Invitations, &codes).await);
    }

    #[tokio::test]
    async fn register_then_login_round_trip() {
        let (_dir, service) = service().await;
        let registered = service
            .register(register_request("alice", None))
            .await
            .expect("register");
        assert_eq!(registered.user.user_type, UserType::Trial);
        assert!(service.tokens.verify(&registered.token).is_some());

        let logged_in = service
            .login(login_request("alice", "secret1"), &ClientContext::default())
            .await
            .expect("login");
        assert_eq!(logged_in.user.username, "alice");
        assert!(service.tokens.verify(&logged_in.token).is_some());
    }

    #[tokio::test]
    async fn register_validates_username_and_password_length() {
        let (_dir, service) = service().await;
        let err = service
            .register(RegisterRequest {
                username: "ab".into(),
                password: "secret1".into(),
                invitation_code: None,
                fingerprint: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Validation(_)));

        let err = service
            .register(RegisterRequest {
                username: "alice".into(),
                password: "short".into(),
                invitation_code: None,
                fingerprint: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Validation(_)));
    }

    #[tokio::test]
    async fn username_length_counts_characters_not_bytes() {
        let (_dir, service) = service().await;

        // Two CJK characters are six bytes but still too short.
        let err = service
            .register(register_request("你好", None))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Validation(_)));

        service
            .register(register_request("你好吗", None))
            .await
            .expect("three characters suffice");
    }

    #[tokio::test]
    async fn duplicate_username_is_rejected() {
        let (_dir, service) = service().await;
        service
            .register(register_request("bob", None))
            .await
            .expect("first register");
        let err = service
            .register(register_request("bob", None))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::DuplicateUser));
    }

    #[tokio::test]
    async fn invitation_code_grants_registered_tier_once() {
        let (_dir, service) = service().await;
        seed_invitation(&service, "WELCOME").await;

        let first = service
            .register(register_request("alice", Some("WELCOME")))
            .await
            .expect("first consumption");
        assert_eq!(first.user.user_type, UserType::Registered);

        let err = service
            .register(register_request("carol", Some("WELCOME")))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::CodeAlreadyUsed));

        let err = service
            .register(register_request("dave", Some("NO-SUCH-CODE")))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCode));

        let codes: Vec<InvitationRecord> =
            service.store.read(Collection::Invitations).await.into_inner();
        assert!(codes[0].used);
        assert_eq!(codes[0].used_by.as_deref(), Some("alice"));
        assert!(codes[0].used_date.is_some());
    }

    #[tokio::test]
    async fn concurrent_registrations_consume_a_code_at_most_once() {
        let (_dir, service) = service().await;
        seed_invitation(&service, "ONCE").await;
        let service = Arc::new(service);

        let mut tasks = Vec::new();
        for i in 0..8 {
            let service = Arc::clone(&service);
            tasks.push(tokio::spawn(async move {
                service
                    .register(register_request(&format!("user-{i}"), Some("ONCE")))
                    .await
            }));
        }

        let mut successes = 0;
        for task in tasks {
            match task.await.expect("task") {
                Ok(response) => {
                    assert_eq!(response.user.user_type, UserType::Registered);
                    successes += 1;
                }
                Err(err) => assert!(matches!(err, AuthError::CodeAlreadyUsed)),
            }
        }
        assert_eq!(successes, 1);
    }

    #[tokio::test]
    async fn login_failures_are_indistinguishable() {
        let (_dir, service) = service().await;
        service
            .register(register_request("alice", None))
            .await
            .expect("register");

        let wrong_password = service
            .login(login_request("alice", "not-the-password"), &ClientContext::default())
            .await
            .unwrap_err();
        let unknown_user = service
            .login(login_request("nobody", "secret1"), &ClientContext::default())
            .await
            .unwrap_err();
        let missing_field = service
            .login(
                LoginRequest {
                    username: Some("alice".into()),
                    password: None,
                    fingerprint: None,
                },
                &ClientContext::default(),
            )
            .await
            .unwrap_err();

        assert_eq!(wrong_password.to_string(), unknown_user.to_string());
        assert_eq!(wrong_password.to_string(), missing_field.to_string());
        assert_eq!(wrong_password.status(), unknown_user.status());
    }

    #[tokio::test]
    async fn login_updates_last_login_and_fingerprint() {
        let (_dir, service) = service().await;
        let registered = service
            .register(register_request("alice", None))
            .await
            .expect("register");

        let response = service
            .login(
                LoginRequest {
                    username: Some("alice".into()),
                    password: Some("secret1".into()),
                    fingerprint: Some("fp-9".into()),
                },
                &ClientContext::default(),
            )
            .await
            .expect("login");
        assert!(response.user.last_login >= registered.user.last_login);

        let users: Vec<UserRecord> = service.store.read(Collection::Users).await.into_inner();
        assert_eq!(users[0].fingerprint.as_deref(), Some("fp-9"));
    }

    #[tokio::test]
    async fn check_returns_user_without_hash_and_survives_logout() {
        let (_dir, service) = service().await;
        let registered = service
            .register(register_request("alice", None))
            .await
            .expect("register");
        let bearer = format!("Bearer {}", registered.token);

        let checked = service.check(Some(&bearer)).await.expect("check");
        assert_eq!(checked.user.username, "alice");
        assert_eq!(checked.user.user_type, UserType::Trial);
        let json = serde_json::to_value(&checked.user).expect("serialize");
        assert!(json.get("passwordHash").is_none());

        let logout = service.logout(Some(&registered.token)).await;
        assert!(logout.success);

        // Stateless tokens: logout does not revoke.
        assert!(service.check(Some(&bearer)).await.is_ok());
    }

    #[tokio::test]
    async fn check_rejects_missing_and_invalid_tokens() {
        let (_dir, service) = service().await;
        assert!(matches!(
            service.check(None).await.unwrap_err(),
            AuthError::MissingToken
        ));
        assert!(matches!(
            service.check(Some("not-a-bearer")).await.unwrap_err(),
            AuthError::MissingToken
        ));
        assert!(matches!(
            service.check(Some("Bearer garbage")).await.unwrap_err(),
            AuthError::InvalidToken
        ));
    }

    #[tokio::test]
    async fn check_fails_when_claimed_user_is_gone() {
        let (_dir, service) = service().await;
        let registered = service
            .register(register_request("alice", None))
            .await
            .expect("register");
        assert!(service.store.write(Collection::Users, &Vec::<UserRecord>::new()).await);

        let err = service
            .check(Some(&format!("Bearer {}", registered.token)))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::UnknownUser));
    }

    #[tokio::test]
    async fn operations_leave_an_audit_trail_in_order() {
        let (_dir, service) = service().await;
        let registered = service
            .register(register_request("alice", None))
            .await
            .expect("register");
        service
            .login(
                login_request("alice", "secret1"),
                &ClientContext {
                    ip: Some("10.0.0.1".into()),
                    user_agent: Some("tests".into()),
                },
            )
            .await
            .expect("login");
        service.logout(Some(&registered.token)).await;
        // Unverifiable token: success, but no audit entry.
        service.logout(Some("garbage")).await;
        service.logout(None).await;

        let entries: Vec<Value> = service.store.read(Collection::Audit).await.into_inner();
        let types: Vec<&str> = entries.iter().filter_map(|e| e["type"].as_str()).collect();
        assert_eq!(types, ["register", "login", "logout"]);
        assert_eq!(entries[0]["invitationCode"], "none");
        assert_eq!(entries[1]["ip"], "10.0.0.1");
        assert_eq!(entries[1]["userAgent"], "tests");
        assert!(entries.iter().all(|e| e["timestamp"].is_string()));
    }
}
