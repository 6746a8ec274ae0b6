use rusqlite::Connection;
use taskauth_core::db::open_db_in_memory;
use taskauth_core::{
    AccountService, AuthConfig, CoreError, CredentialHasher, IdentityFilter, IdentityRepository,
    NewIdentity, SessionRegistry, SqliteIdentityRepository, TokenIssuer,
};

fn config() -> AuthConfig {
    AuthConfig::new("test-secret").unwrap().with_hash_cost(1, 8)
}

fn candidate() -> NewIdentity {
    NewIdentity {
        name: "Grace Hopper".to_string(),
        email: "grace@example.com".to_string(),
        password: "Cobol#1959x".to_string(),
        age: None,
    }
}

fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

fn with_accounts(test: impl FnOnce(&Connection, AccountService<'_, SqliteIdentityRepository<'_>>)) {
    let conn = open_db_in_memory().unwrap();
    let config = config();
    let hasher = CredentialHasher::new(&config).unwrap();
    let issuer = TokenIssuer::new(&config);
    let service = AccountService::new(SqliteIdentityRepository::new(&conn), &hasher, &issuer);
    test(&conn, service);
}

#[test]
fn register_returns_sanitized_identity_and_live_token() {
    with_accounts(|_, accounts| {
        let grant = accounts.register(candidate()).unwrap();
        let encoded = serde_json::to_value(&grant).unwrap();

        assert!(encoded["user"].get("password").is_none());
        assert!(encoded["user"].get("password_hash").is_none());
        assert!(encoded["user"].get("active_tokens").is_none());
        assert_eq!(encoded["user"]["email"], "grace@example.com");

        let context = accounts.authenticate(Some(&bearer(&grant.token))).unwrap();
        assert_eq!(context.identity.id, grant.identity.id);
        assert_eq!(context.token, grant.token);
    });
}

#[test]
fn logout_revokes_only_the_presented_token() {
    with_accounts(|_, accounts| {
        let registered = accounts.register(candidate()).unwrap();
        let laptop = accounts.login("grace@example.com", "Cobol#1959x").unwrap();
        let phone = accounts.login("grace@example.com", "Cobol#1959x").unwrap();
        assert_ne!(laptop.token, phone.token);

        let context = accounts.authenticate(Some(&bearer(&laptop.token))).unwrap();
        accounts.logout(&context).unwrap();

        assert_eq!(
            accounts
                .authenticate(Some(&bearer(&laptop.token)))
                .unwrap_err(),
            CoreError::Unauthenticated
        );
        assert!(accounts.authenticate(Some(&bearer(&phone.token))).is_ok());
        assert!(accounts
            .authenticate(Some(&bearer(&registered.token)))
            .is_ok());
    });
}

#[test]
fn logout_all_revokes_every_session() {
    with_accounts(|_, accounts| {
        let first = accounts.register(candidate()).unwrap();
        let second = accounts.login("grace@example.com", "Cobol#1959x").unwrap();

        let context = accounts.authenticate(Some(&bearer(&second.token))).unwrap();
        accounts.logout_all(&context).unwrap();

        for token in [&first.token, &second.token] {
            assert_eq!(
                accounts.authenticate(Some(&bearer(token))).unwrap_err(),
                CoreError::Unauthenticated
            );
        }
    });
}

#[test]
fn gate_rejects_missing_forged_and_unregistered_tokens() {
    with_accounts(|_, accounts| {
        let grant = accounts.register(candidate()).unwrap();

        assert_eq!(accounts.authenticate(None).unwrap_err(), CoreError::Unauthenticated);
        assert_eq!(
            accounts.authenticate(Some(&grant.token)).unwrap_err(),
            CoreError::Unauthenticated
        );

        let foreign = TokenIssuer::new(&AuthConfig::new("other-secret").unwrap())
            .issue(grant.identity.id)
            .unwrap();
        assert_eq!(
            accounts.authenticate(Some(&bearer(&foreign))).unwrap_err(),
            CoreError::Unauthenticated
        );

        // Correctly signed but never registered as a session.
        let unregistered = TokenIssuer::new(&config()).issue(grant.identity.id).unwrap();
        assert_eq!(
            accounts
                .authenticate(Some(&bearer(&unregistered)))
                .unwrap_err(),
            CoreError::Unauthenticated
        );
    });
}

#[test]
fn deleted_account_tokens_stop_authenticating() {
    with_accounts(|_, accounts| {
        let grant = accounts.register(candidate()).unwrap();
        let context = accounts.authenticate(Some(&bearer(&grant.token))).unwrap();

        let removed = accounts.delete_account(&context).unwrap();
        assert_eq!(removed.id, grant.identity.id);
        assert_eq!(
            accounts.authenticate(Some(&bearer(&grant.token))).unwrap_err(),
            CoreError::Unauthenticated
        );
        assert_eq!(
            accounts.login("grace@example.com", "Cobol#1959x").unwrap_err(),
            CoreError::Authentication
        );
    });
}

#[test]
fn registry_revoke_of_absent_token_is_a_no_op() {
    with_accounts(|conn, accounts| {
        let grant = accounts.register(candidate()).unwrap();
        let repo = SqliteIdentityRepository::new(conn);
        let registry = SessionRegistry::new(&repo);

        let unchanged = registry
            .revoke(grant.identity.id, "never-issued")
            .unwrap()
            .unwrap();
        assert_eq!(unchanged.active_tokens, vec![grant.token.clone()]);

        registry.register(grant.identity.id, "second").unwrap();
        registry.revoke(grant.identity.id, &grant.token).unwrap();
        let identity = repo
            .find_identity(IdentityFilter::Id(grant.identity.id))
            .unwrap()
            .unwrap();
        assert_eq!(identity.active_tokens, vec!["second".to_string()]);

        assert!(registry
            .register(uuid::Uuid::new_v4(), "orphan")
            .unwrap()
            .is_none());
    });
}

#[test]
fn profile_update_rejects_disallowed_fields_before_writing() {
    with_accounts(|_, accounts| {
        let grant = accounts.register(candidate()).unwrap();
        let context = accounts.authenticate(Some(&bearer(&grant.token))).unwrap();

        let patch = taskauth_core::IdentityPatch::from_json(&serde_json::json!({
            "name": "Rear Admiral Hopper",
            "tokens": [],
        }));
        assert!(patch.is_err());

        let patch = taskauth_core::IdentityPatch::from_json(&serde_json::json!({
            "name": "Rear Admiral Hopper",
        }))
        .unwrap();
        let updated = accounts.update_profile(&context, patch).unwrap();
        assert_eq!(updated.name, "Rear Admiral Hopper");
        let refreshed = accounts.authenticate(Some(&bearer(&grant.token))).unwrap();
        assert_eq!(accounts.profile(&refreshed).name, "Rear Admiral Hopper");
    });
}
