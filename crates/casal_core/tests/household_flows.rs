use casal_core::{
    AccountService, CategoryService, HouseholdService, MemoryIdentityProvider, MemoryRecordStore,
    RecordKind, SessionCache, SessionConfig, SessionError, SessionPhase, SessionReconciler,
    SessionState, SignUpRequest, SqliteCacheStore,
};
use std::sync::Arc;

struct App {
    store: Arc<MemoryRecordStore>,
    cache: SessionCache,
    reconciler: Arc<SessionReconciler>,
    accounts: AccountService,
    households: HouseholdService,
    categories: CategoryService,
}

fn app() -> App {
    let provider = Arc::new(MemoryIdentityProvider::new());
    let store = Arc::new(MemoryRecordStore::new());
    let cache = SessionCache::new(Arc::new(
        SqliteCacheStore::open_in_memory().expect("open cache"),
    ));
    let reconciler = SessionReconciler::new(
        provider.clone(),
        store.clone(),
        cache.clone(),
        &SessionConfig::default(),
    );
    reconciler.start();
    App {
        accounts: AccountService::new(provider, store.clone(), reconciler.clone()),
        households: HouseholdService::new(store.clone(), reconciler.clone()),
        categories: CategoryService::new(store.clone(), reconciler.clone()),
        store,
        cache,
        reconciler,
    }
}

fn sign_up(app: &App, name: &str, email: &str) -> SessionState {
    app.accounts
        .sign_up(&SignUpRequest {
            display_name: name.to_string(),
            email: email.to_string(),
            secret: "s3cret!".to_string(),
            confirm_secret: "s3cret!".to_string(),
        })
        .expect("sign up")
}

#[test]
fn sign_up_then_create_household_reaches_household_phase() {
    let app = app();
    let state = sign_up(&app, "Ana", "ana@example.com");
    assert_eq!(state.phase(), SessionPhase::AuthenticatedNoHousehold);
    assert_eq!(state.user_record().expect("user").display_name, "Ana");

    let state = app.households.create_household("  Casa  ").expect("create");
    assert_eq!(state.phase(), SessionPhase::AuthenticatedWithHousehold);

    let household = state.household_record().expect("household").clone();
    let uid = state.identity().expect("identity").uid().to_string();
    assert_eq!(household.name, "Casa");
    assert_eq!(household.owner_id, uid);
    assert!(household.is_member(&uid));
    assert!(!household.id.contains('@'));

    let user_doc = app
        .store
        .document(RecordKind::Users, &uid)
        .expect("user document");
    assert_eq!(user_doc["householdId"], household.id.as_str());
    assert_eq!(
        app.cache.read_household().expect("cache read"),
        Some(household)
    );
}

#[test]
fn join_household_adds_member_and_assigns_it() {
    let app = app();
    sign_up(&app, "Ana", "ana@example.com");
    let created = app.households.create_household("Casa").expect("create");
    let household_id = created.household_record().expect("household").id.clone();
    let owner = created.identity().expect("identity").uid().to_string();
    app.reconciler.logout();

    let joiner = sign_up(&app, "Bia", "bia@example.com");
    let joiner_uid = joiner.identity().expect("identity").uid().to_string();
    let state = app
        .households
        .join_household(&format!(" {household_id} "))
        .expect("join");

    assert_eq!(state.phase(), SessionPhase::AuthenticatedWithHousehold);
    let household = state.household_record().expect("household");
    assert_eq!(household.id, household_id);
    assert_eq!(household.owner_id, owner);
    assert!(household.is_member(&owner));
    assert!(household.is_member(&joiner_uid));

    let stored = app
        .store
        .document(RecordKind::Households, &household_id)
        .expect("household document");
    assert_eq!(
        stored["memberIds"].as_array().map(Vec::len),
        Some(2),
        "members: {:?}",
        stored["memberIds"]
    );
}

#[test]
fn joining_unknown_household_fails_without_changing_session() {
    let app = app();
    sign_up(&app, "Ana", "ana@example.com");

    let err = app
        .households
        .join_household("no-such-household")
        .expect_err("missing household");
    assert_eq!(
        err,
        SessionError::HouseholdNotFound("no-such-household".to_string())
    );
    assert_eq!(
        app.reconciler.snapshot().phase(),
        SessionPhase::AuthenticatedNoHousehold
    );
}

#[test]
fn household_actions_require_a_session() {
    let app = app();
    assert_eq!(
        app.households.create_household("Casa"),
        Err(SessionError::NotAuthenticated)
    );
    assert_eq!(
        app.households.join_household("h-1"),
        Err(SessionError::NotAuthenticated)
    );
}

#[test]
fn blank_household_inputs_are_rejected() {
    let app = app();
    sign_up(&app, "Ana", "ana@example.com");
    assert!(matches!(
        app.households.create_household("   "),
        Err(SessionError::InvalidInput(_))
    ));
    assert!(matches!(
        app.households.join_household(""),
        Err(SessionError::InvalidInput(_))
    ));
}

#[test]
fn duplicate_sign_up_is_reported() {
    let app = app();
    sign_up(&app, "Ana", "ana@example.com");
    app.reconciler.logout();

    let err = app
        .accounts
        .sign_up(&SignUpRequest {
            display_name: "Ana again".to_string(),
            email: "ANA@example.com".to_string(),
            secret: "s3cret!".to_string(),
            confirm_secret: "s3cret!".to_string(),
        })
        .expect_err("email taken");
    assert_eq!(err, SessionError::EmailAlreadyInUse);
    assert_eq!(
        app.reconciler.snapshot().phase(),
        SessionPhase::Unauthenticated
    );
}

#[test]
fn create_household_reports_store_outage() {
    let app = app();
    sign_up(&app, "Ana", "ana@example.com");
    app.store.set_offline(true);

    let err = app
        .households
        .create_household("Casa")
        .expect_err("store offline");
    assert!(matches!(err, SessionError::Network(_)));
    assert_eq!(
        app.reconciler.snapshot().phase(),
        SessionPhase::AuthenticatedNoHousehold
    );
}

#[test]
fn categories_are_scoped_to_the_current_household() {
    let app = app();
    sign_up(&app, "Ana", "ana@example.com");
    let home = app.households.create_household("Casa").expect("create");
    let home_id = home.household_record().expect("household").id.clone();

    let groceries = app.categories.add_category("  Mercado ").expect("add");
    assert_eq!(groceries.name, "Mercado");
    assert_eq!(groceries.household_id, home_id);
    app.categories.add_category("Aluguel").expect("add");

    app.reconciler.logout();
    sign_up(&app, "Bia", "bia@example.com");
    app.households.create_household("Outra casa").expect("create");
    app.categories.add_category("Lazer").expect("add");
    assert_eq!(
        app.categories
            .list_categories()
            .expect("list")
            .into_iter()
            .map(|category| category.name)
            .collect::<Vec<_>>(),
        vec!["Lazer".to_string()]
    );

    app.reconciler.logout();
    app.reconciler
        .login("ana@example.com", "s3cret!")
        .expect("login");
    let listed = app.categories.list_categories().expect("list");
    assert_eq!(listed.len(), 2);
    assert!(listed.contains(&groceries));
    assert!(listed.iter().all(|category| category.household_id == home_id));
}

#[test]
fn categories_require_a_resolved_household() {
    let app = app();
    assert_eq!(
        app.categories.list_categories(),
        Err(SessionError::NotAuthenticated)
    );

    sign_up(&app, "Ana", "ana@example.com");
    assert_eq!(
        app.categories.add_category("Mercado"),
        Err(SessionError::HouseholdUnresolved)
    );
    assert_eq!(
        app.categories.list_categories(),
        Err(SessionError::HouseholdUnresolved)
    );

    app.households.create_household("Casa").expect("create");
    assert!(matches!(
        app.categories.add_category("   "),
        Err(SessionError::InvalidInput(_))
    ));
}

#[test]
fn malformed_category_documents_are_skipped() {
    let app = app();
    sign_up(&app, "Ana", "ana@example.com");
    let state = app.households.create_household("Casa").expect("create");
    let household_id = state.household_record().expect("household").id.clone();

    app.categories.add_category("Mercado").expect("add");
    app.store.insert(
        RecordKind::Categories,
        "broken",
        serde_json::json!({ "householdId": household_id, "createdAt": 1 })
            .as_object()
            .cloned()
            .expect("object"),
    );

    let listed = app.categories.list_categories().expect("list");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].name, "Mercado");
}
