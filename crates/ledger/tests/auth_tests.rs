use ledger::{require_authenticated, require_super_admin, AccessError, AuthResolver, CacheSnapshot, Role};

fn snapshot_with_sub(secret: Option<&str>) -> CacheSnapshot {
    CacheSnapshot {
        sub_password: secret.map(str::to_string),
        ..CacheSnapshot::default()
    }
}

#[test]
fn admin_secret_resolves_super_admin() {
    let resolver = AuthResolver::new("admin-secret");
    let snapshot = snapshot_with_sub(Some("sub-secret"));
    assert_eq!(resolver.resolve(Some("admin-secret"), &snapshot), Role::SuperAdmin);
    assert_eq!(resolver.resolve(Some("sub-secret"), &snapshot), Role::SubAdmin);
    assert_eq!(resolver.resolve(Some("guess"), &snapshot), Role::Unauthenticated);
    assert_eq!(resolver.resolve(None, &snapshot), Role::Unauthenticated);
}

#[test]
fn admin_secret_wins_when_both_match() {
    let resolver = AuthResolver::new("shared");
    let snapshot = snapshot_with_sub(Some("shared"));
    assert_eq!(resolver.resolve(Some("shared"), &snapshot), Role::SuperAdmin);
}

#[test]
fn empty_or_missing_sub_secret_disables_tier() {
    let resolver = AuthResolver::new("admin-secret");
    assert_eq!(
        resolver.resolve(Some(""), &snapshot_with_sub(Some(""))),
        Role::Unauthenticated
    );
    assert_eq!(
        resolver.resolve(Some(""), &snapshot_with_sub(None)),
        Role::Unauthenticated
    );
    assert_eq!(
        resolver.resolve(Some("anything"), &snapshot_with_sub(None)),
        Role::Unauthenticated
    );
}

#[test]
fn super_admin_gate_distinguishes_401_from_403() {
    assert_eq!(require_super_admin(Role::SuperAdmin), Ok(()));
    assert_eq!(require_super_admin(Role::SubAdmin), Err(AccessError::Forbidden));
    assert_eq!(
        require_super_admin(Role::Unauthenticated),
        Err(AccessError::Unauthenticated)
    );
}

#[test]
fn authenticated_gate_accepts_both_tiers() {
    assert_eq!(require_authenticated(Role::SubAdmin), Ok(Role::SubAdmin));
    assert_eq!(require_authenticated(Role::SuperAdmin), Ok(Role::SuperAdmin));
    assert_eq!(
        require_authenticated(Role::Unauthenticated),
        Err(AccessError::Unauthenticated)
    );
}
