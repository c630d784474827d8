//! End-to-end behaviour of the authorization core on in-memory backends

use std::collections::BTreeSet;
use std::sync::Arc;

use authz::{
    AuthzConfig, AuthzError, AuthzService, catalog,
    cache::MemoryPermissionCache,
    models::{Actor, OperationRequirement},
    store::{MemoryRoleStore, RoleStore},
};
use tokio_test::{assert_err, assert_ok};
use uuid::Uuid;

struct Harness {
    store: Arc<MemoryRoleStore>,
    cache: Arc<MemoryPermissionCache>,
    service: AuthzService,
}

async fn seeded() -> Harness {
    let store = Arc::new(MemoryRoleStore::new());
    let cache = Arc::new(MemoryPermissionCache::new());
    let service = AuthzService::new(store.clone(), cache.clone(), &AuthzConfig::default());
    service.seed().await.expect("seeding failed");
    Harness {
        store,
        cache,
        service,
    }
}

fn as_set(codes: Vec<String>) -> BTreeSet<String> {
    codes.into_iter().collect()
}

fn contributeur() -> Actor {
    Actor::new(Uuid::new_v4(), "CONTRIBUTEUR")
}

async fn allowed(service: &AuthzService, actor: &Actor, codes: &[&str]) -> bool {
    service
        .decide(&OperationRequirement::all_of(codes.iter().copied()), Some(actor))
        .await
        .unwrap()
}

async fn permission_ids(service: &AuthzService, codes: &[&str]) -> Vec<Uuid> {
    let grouped = service.list_permissions().await.unwrap();
    codes
        .iter()
        .map(|code| {
            grouped
                .values()
                .flatten()
                .find(|p| p.code == *code)
                .map(|p| p.id)
                .unwrap_or_else(|| panic!("{} missing from catalog", code))
        })
        .collect()
}

#[tokio::test]
async fn test_seeding_twice_changes_nothing() {
    let h = seeded().await;
    let links = h.store.count_links().await;
    let permissions = h.store.count_permissions().await;
    let roles = h.store.count_roles().await.unwrap();
    let before = h.service.list_roles().await.unwrap();

    let report = h.service.seed().await.unwrap();
    assert_eq!(report.permissions, catalog::PERMISSIONS.len());
    assert_eq!(report.roles, catalog::ROLES.len());

    assert_eq!(h.store.count_links().await, links);
    assert_eq!(h.store.count_roles().await.unwrap(), roles);
    assert_eq!(h.store.count_permissions().await, permissions);
    let after = h.service.list_roles().await.unwrap();
    assert_eq!(before.len(), after.len());
    for (b, a) in before.iter().zip(after.iter()) {
        assert_eq!(b.role.id, a.role.id);
        assert_eq!(b.permissions, a.permissions);
    }
}

#[tokio::test]
async fn test_every_builtin_role_resolves_to_its_catalog_grants() {
    let h = seeded().await;
    for role in catalog::ROLES {
        let resolved = h.service.resolve_permissions(role.code).await.unwrap();
        assert_eq!(as_set(resolved), role.permission_codes(), "{}", role.code);
    }

    let observer = as_set(h.service.resolve_permissions("OBSERVATEUR").await.unwrap());
    let reads: BTreeSet<String> = catalog::PERMISSIONS
        .iter()
        .filter(|p| p.action == "read")
        .map(|p| p.code())
        .collect();
    assert_eq!(observer, reads);
}

#[tokio::test]
async fn test_seeded_roles_are_system_roles() {
    let h = seeded().await;
    let roles = h.service.list_roles().await.unwrap();
    assert_eq!(roles.len(), catalog::ROLES.len());
    assert!(roles.iter().all(|r| r.role.is_system));
    let defaults: Vec<&str> = roles
        .iter()
        .filter(|r| r.role.is_default)
        .map(|r| r.role.code.as_str())
        .collect();
    assert_eq!(defaults, vec!["CONTRIBUTEUR"]);
}

#[tokio::test]
async fn test_decisions_are_conjunctive() {
    let h = seeded().await;
    let actor = contributeur();

    assert!(allowed(&h.service, &actor, &["tasks:read"]).await);
    assert!(!allowed(&h.service, &actor, &["tasks:read", "tasks:delete"]).await);
    assert!(allowed(&h.service, &actor, &[]).await);
    assert!(allowed(&h.service, &actor, &["tasks:create_orphan", "telework:create", "leaves:read"]).await);
    assert!(!allowed(&h.service, &actor, &["projects:create"]).await);
}

#[tokio::test]
async fn test_missing_actor_or_role_is_denied() {
    let h = seeded().await;
    let requirement = OperationRequirement::all_of(["projects:create"]);

    assert!(!h.service.decide(&requirement, None).await.unwrap());

    let no_role = Actor {
        id: Uuid::new_v4(),
        role_code: None,
    };
    assert!(!h.service.decide(&requirement, Some(&no_role)).await.unwrap());

    let blank_role = Actor::new(Uuid::new_v4(), "");
    assert!(!h.service.decide(&requirement, Some(&blank_role)).await.unwrap());

    // No requirement means no check, even without an actor.
    assert!(h.service.decide(&OperationRequirement::none(), None).await.unwrap());
}

#[tokio::test]
async fn test_unknown_role_holds_nothing() {
    let h = seeded().await;
    let ghost = Actor::new(Uuid::new_v4(), "GHOST");
    assert!(h.service.resolve_permissions("GHOST").await.unwrap().is_empty());
    assert!(
        !h.service
            .decide(&OperationRequirement::all_of(["tasks:read"]), Some(&ghost))
            .await
            .unwrap()
    );
}

#[tokio::test]
async fn test_replace_is_visible_immediately_despite_cache() {
    let h = seeded().await;
    let role = h
        .service
        .create_role("AUDITOR", "Auditor", None)
        .await
        .unwrap();

    let first = permission_ids(&h.service, &["analytics:read"]).await;
    h.service.replace_role_permissions(role.id, &first).await.unwrap();
    assert_eq!(
        h.service.resolve_permissions("AUDITOR").await.unwrap(),
        vec!["analytics:read".to_string()]
    );
    assert!(h.cache.contains("role-permissions:AUDITOR").await);

    let second = permission_ids(&h.service, &["analytics:export", "settings:read"]).await;
    let updated = h
        .service
        .replace_role_permissions(role.id, &second)
        .await
        .unwrap();
    assert_eq!(updated.permissions, vec!["analytics:export", "settings:read"]);
    assert_eq!(
        as_set(h.service.resolve_permissions("AUDITOR").await.unwrap()),
        as_set(vec!["analytics:export".to_string(), "settings:read".to_string()])
    );
}

#[tokio::test]
async fn test_unavailable_cache_still_resolves_from_store() {
    let h = seeded().await;
    h.cache.set_available(false);

    let resolved = h.service.resolve_permissions("CONTRIBUTEUR").await.unwrap();
    assert_eq!(
        as_set(resolved),
        catalog::role("CONTRIBUTEUR").unwrap().permission_codes()
    );
    assert!(
        h.service
            .decide(&OperationRequirement::all_of(["tasks:read"]), Some(&contributeur()))
            .await
            .unwrap()
    );
}

#[tokio::test]
async fn test_mutations_succeed_when_invalidation_fails() {
    let h = seeded().await;
    let role = h
        .service
        .create_role("AUDITOR", "Auditor", None)
        .await
        .unwrap();

    h.cache.set_available(false);
    let ids = permission_ids(&h.service, &["analytics:read"]).await;
    assert_ok!(h.service.replace_role_permissions(role.id, &ids).await);
    assert_ok!(h.service.delete_role(role.id).await);
    assert_ok!(h.service.seed().await);
}

#[tokio::test]
async fn test_delete_guards() {
    let h = seeded().await;

    let admin = h
        .service
        .store()
        .find_role_by_code("ADMIN")
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(
        h.service.delete_role(admin.role.id).await,
        Err(AuthzError::InvalidRequest(_))
    ));

    assert!(matches!(
        h.service.delete_role(Uuid::new_v4()).await,
        Err(AuthzError::NotFound(_))
    ));

    let role = h
        .service
        .create_role("AUDITOR", "Auditor", None)
        .await
        .unwrap();
    let ids = permission_ids(&h.service, &["analytics:read"]).await;
    h.service.replace_role_permissions(role.id, &ids).await.unwrap();
    assert!(!h.service.resolve_permissions("AUDITOR").await.unwrap().is_empty());

    assert_ok!(h.service.delete_role(role.id).await);
    assert!(h.service.resolve_permissions("AUDITOR").await.unwrap().is_empty());
    let missing = assert_err!(h.service.get_role(role.id).await);
    assert!(matches!(missing, AuthzError::NotFound(_)));
}

#[tokio::test]
async fn test_replace_with_unknown_id_changes_nothing() {
    let h = seeded().await;
    let manager = h
        .service
        .store()
        .find_role_by_code("MANAGER")
        .await
        .unwrap()
        .unwrap();
    let before = h.service.resolve_permissions("MANAGER").await.unwrap();

    let mut ids = permission_ids(&h.service, &["tasks:read"]).await;
    ids.push(Uuid::new_v4());
    assert!(matches!(
        h.service
            .replace_role_permissions(manager.role.id, &ids)
            .await,
        Err(AuthzError::InvalidRequest(_))
    ));

    assert_eq!(h.service.resolve_permissions("MANAGER").await.unwrap(), before);
    assert_eq!(
        h.service.get_role(manager.role.id).await.unwrap().permissions,
        manager.permissions
    );
}

#[tokio::test]
async fn test_reseed_resets_customized_system_role() {
    let h = seeded().await;
    let observer = h
        .service
        .store()
        .find_role_by_code("OBSERVATEUR")
        .await
        .unwrap()
        .unwrap();

    let ids = permission_ids(&h.service, &["tasks:read"]).await;
    h.service
        .replace_role_permissions(observer.role.id, &ids)
        .await
        .unwrap();
    assert_eq!(
        h.service.resolve_permissions("OBSERVATEUR").await.unwrap(),
        vec!["tasks:read".to_string()]
    );

    h.service.seed().await.unwrap();
    assert_eq!(
        as_set(h.service.resolve_permissions("OBSERVATEUR").await.unwrap()),
        catalog::role("OBSERVATEUR").unwrap().permission_codes()
    );
}

#[tokio::test]
async fn test_concurrent_decisions_for_one_role() {
    let h = seeded().await;
    let mut handles = Vec::new();
    for i in 0..32 {
        let service = h.service.clone();
        handles.push(tokio::spawn(async move {
            let actor = Actor::new(Uuid::new_v4(), "CONTRIBUTEUR");
            let requirement = if i % 2 == 0 {
                OperationRequirement::all_of(["time_tracking:create"])
            } else {
                OperationRequirement::all_of(["time_tracking:read_all"])
            };
            (i, service.decide(&requirement, Some(&actor)).await.unwrap())
        }));
    }

    for handle in handles {
        let (i, allowed) = handle.await.unwrap();
        assert_eq!(allowed, i % 2 == 0);
    }
}
