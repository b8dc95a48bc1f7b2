use std::collections::VecDeque;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;

use cotiza_core::clock::FixedClock;
use cotiza_core::codegen::FolioSource;
use cotiza_core::domain::catalog::{Ambience, CatalogItem, ItemCategory, ItemDraft, ItemId, ItemPatch, QualityTier};
use cotiza_core::domain::identity::Caller;
use cotiza_core::domain::partner::{Partner, PartnerId};
use cotiza_core::domain::quote::{LineItemDraft, QuoteDraft, QuoteStatus};
use cotiza_core::errors::DomainError;
use cotiza_db::repositories::{
    CatalogRepository, InMemoryCatalogRepository, InMemoryPartnerRepository,
    InMemoryQuoteRepository, PartnerRepository, QuoteRepository,
};
use cotiza_engine::{QuoteService, ServiceError, ServiceSettings};

/// Deterministic folio source: hands out a scripted prefix, then repeats a
/// fixed value forever.
struct ScriptedFolio {
    script: Mutex<VecDeque<u16>>,
    then: u16,
}

impl ScriptedFolio {
    fn new(script: &[u16], then: u16) -> Self {
        Self { script: Mutex::new(script.iter().copied().collect()), then }
    }
}

impl FolioSource for ScriptedFolio {
    fn next_folio(&self) -> u16 {
        self.script.lock().expect("folio script poisoned").pop_front().unwrap_or(self.then)
    }
}

#[derive(Default)]
struct SequentialFolio(AtomicU16);

impl FolioSource for SequentialFolio {
    fn next_folio(&self) -> u16 {
        self.0.fetch_add(1, Ordering::SeqCst) % 10_000
    }
}

struct TestWorld {
    service: QuoteService,
    clock: Arc<FixedClock>,
    quotes: Arc<InMemoryQuoteRepository>,
    partners: Arc<InMemoryPartnerRepository>,
    catalog: Arc<InMemoryCatalogRepository>,
    partner: Partner,
    item: CatalogItem,
}

fn settings(code_attempts: u32) -> ServiceSettings {
    ServiceSettings { tax_rate: Decimal::new(16, 2), validity_days: 30, code_attempts }
}

fn item_draft() -> ItemDraft {
    ItemDraft {
        name: "Terrace dinner".to_string(),
        description: "Three-course plated dinner".to_string(),
        category: ItemCategory::Catering,
        tier: QualityTier::Gold,
        ambience: Ambience::Outdoor,
        base_price: Decimal::new(10_000, 2),
        min_margin: 15,
        max_margin: 30,
    }
}

async fn world_with(folios: Arc<dyn FolioSource>, code_attempts: u32) -> TestWorld {
    let _ = tracing_subscriber::fmt().with_env_filter("info").with_test_writer().try_init();

    let catalog = Arc::new(InMemoryCatalogRepository::default());
    let partners = Arc::new(InMemoryPartnerRepository::default());
    let quotes = Arc::new(InMemoryQuoteRepository::default());
    let clock = Arc::new(FixedClock::at(Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()));

    let partner = Partner {
        id: PartnerId::generate(),
        name: "Eventos Rivera".to_string(),
        company: "Rivera SA".to_string(),
        email: "ventas@rivera.example".to_string(),
        phone: "555-0200".to_string(),
        active: true,
    };
    partners.save(partner.clone()).await.expect("seed partner");

    let service = QuoteService::new(
        catalog.clone(),
        partners.clone(),
        quotes.clone(),
        clock.clone(),
        folios,
        settings(code_attempts),
    );

    let item = service.create_item(item_draft(), &Caller::Admin).await.expect("seed item");

    TestWorld { service, clock, quotes, partners, catalog, partner, item }
}

async fn world() -> TestWorld {
    world_with(Arc::new(SequentialFolio::default()), 5).await
}

fn quote_draft(world: &TestWorld) -> QuoteDraft {
    QuoteDraft {
        partner_id: world.partner.id,
        client_name: "Laura Mendoza".to_string(),
        client_email: "laura@example.com".to_string(),
        client_phone: "555-0100".to_string(),
        event_date: NaiveDate::from_ymd_opt(2026, 6, 20),
        venue: "Hacienda San Pedro".to_string(),
        terms: "50% advance, balance on event day".to_string(),
    }
}

fn line(world: &TestWorld, margin: u8) -> LineItemDraft {
    LineItemDraft { item_id: world.item.id, margin }
}

#[tokio::test]
async fn created_quote_prices_the_reference_scenario() {
    let world = world().await;
    let caller = Caller::Partner(world.partner.id);

    let view = world
        .service
        .create_quote(quote_draft(&world), vec![line(&world, 20)], &caller)
        .await
        .expect("create quote");

    assert_eq!(view.quote.subtotal, Decimal::new(12_000, 2));
    assert_eq!(view.quote.tax, Decimal::new(1_920, 2));
    assert_eq!(view.quote.total, Decimal::new(13_920, 2));
    assert_eq!(view.quote.status, QuoteStatus::Draft);
    assert!(view.quote.code.starts_with("ER-LM-"), "code was {}", view.quote.code);
    assert_eq!(view.quote.code.len(), "ER-LM-0000".len());
    assert!(!view.is_expired);
    assert_eq!(view.valid_until, view.quote.created_at + Duration::days(30));

    assert_eq!(view.items.len(), 1);
    let item = &view.items[0];
    assert_eq!(item.margin, 20);
    assert_eq!(item.margin_amount, Decimal::new(2_000, 2));
    assert_eq!(item.total_price, Decimal::new(12_000, 2));
    assert_eq!(item.item_name, "Terrace dinner");
}

#[tokio::test]
async fn fetched_totals_survive_later_catalog_edits() {
    let world = world().await;
    let caller = Caller::Partner(world.partner.id);

    let created = world
        .service
        .create_quote(quote_draft(&world), vec![line(&world, 20)], &caller)
        .await
        .expect("create quote");

    // Reprice the catalog item; the issued quote must not move.
    world
        .service
        .update_item(
            &world.item.id,
            ItemPatch { base_price: Some(Decimal::new(55_500, 2)), ..ItemPatch::default() },
            &Caller::Admin,
        )
        .await
        .expect("reprice item");

    let fetched = world.service.get_quote(&created.quote.id).await.expect("fetch quote");
    assert_eq!(fetched.quote.subtotal, created.quote.subtotal);
    assert_eq!(fetched.quote.total, created.quote.total);
    assert_eq!(fetched.items[0].base_price, Decimal::new(10_000, 2));
}

#[tokio::test]
async fn create_quote_validates_inputs() {
    let world = world().await;
    let caller = Caller::Partner(world.partner.id);

    let empty = world
        .service
        .create_quote(quote_draft(&world), Vec::new(), &caller)
        .await
        .expect_err("empty line set");
    assert!(matches!(empty, ServiceError::Domain(DomainError::Validation { .. })));

    let missing_item = world
        .service
        .create_quote(
            quote_draft(&world),
            vec![LineItemDraft { item_id: ItemId::generate(), margin: 20 }],
            &caller,
        )
        .await
        .expect_err("unknown item");
    assert!(matches!(missing_item, ServiceError::Domain(DomainError::NotFound { .. })));

    let bad_margin = world
        .service
        .create_quote(quote_draft(&world), vec![line(&world, 35)], &caller)
        .await
        .expect_err("margin above item max");
    assert!(matches!(bad_margin, ServiceError::Domain(DomainError::Validation { .. })));

    let foreign = world
        .service
        .create_quote(
            quote_draft(&world),
            vec![line(&world, 20)],
            &Caller::Partner(PartnerId::generate()),
        )
        .await
        .expect_err("foreign partner");
    assert!(matches!(foreign, ServiceError::Domain(DomainError::Forbidden(_))));
}

#[tokio::test]
async fn deactivated_partner_cannot_author_quotes() {
    let world = world().await;
    let mut deactivated = world.partner.clone();
    deactivated.active = false;
    world.partners.save(deactivated).await.expect("deactivate partner");

    let error = world
        .service
        .create_quote(quote_draft(&world), vec![line(&world, 20)], &Caller::Admin)
        .await
        .expect_err("inactive partner");
    assert!(matches!(error, ServiceError::Domain(DomainError::Forbidden(_))));
}

#[tokio::test]
async fn colliding_folio_retries_until_codes_differ() {
    let world = world_with(Arc::new(ScriptedFolio::new(&[7, 7], 8)), 5).await;
    let caller = Caller::Partner(world.partner.id);

    let first = world
        .service
        .create_quote(quote_draft(&world), vec![line(&world, 20)], &caller)
        .await
        .expect("first quote");
    let second = world
        .service
        .create_quote(quote_draft(&world), vec![line(&world, 20)], &caller)
        .await
        .expect("second quote retries past the collision");

    assert_eq!(first.quote.code, "ER-LM-0007");
    assert_eq!(second.quote.code, "ER-LM-0008");
}

#[tokio::test]
async fn exhausted_code_attempts_surface_a_conflict() {
    let world = world_with(Arc::new(ScriptedFolio::new(&[], 7)), 3).await;
    let caller = Caller::Partner(world.partner.id);

    world
        .service
        .create_quote(quote_draft(&world), vec![line(&world, 20)], &caller)
        .await
        .expect("first quote takes folio 7");
    let error = world
        .service
        .create_quote(quote_draft(&world), vec![line(&world, 20)], &caller)
        .await
        .expect_err("every retry collides");
    assert!(matches!(error, ServiceError::Domain(DomainError::Conflict(_))));
}

#[tokio::test]
async fn lifecycle_walks_draft_to_executed() {
    let world = world().await;
    let caller = Caller::Partner(world.partner.id);
    let created = world
        .service
        .create_quote(quote_draft(&world), vec![line(&world, 20)], &caller)
        .await
        .expect("create quote");
    let id = created.quote.id;

    let sent = world
        .service
        .request_transition(&id, QuoteStatus::Sent, &caller)
        .await
        .expect("draft -> sent");
    assert_eq!(sent.status, QuoteStatus::Sent);

    let accepted = world
        .service
        .request_transition(&id, QuoteStatus::Accepted, &caller)
        .await
        .expect("sent -> accepted");
    assert_eq!(accepted.status, QuoteStatus::Accepted);

    let executed = world
        .service
        .request_transition(&id, QuoteStatus::Executed, &Caller::Admin)
        .await
        .expect("accepted -> executed by admin");
    assert_eq!(executed.status, QuoteStatus::Executed);

    // Executed is terminal.
    for to in [QuoteStatus::Sent, QuoteStatus::Accepted, QuoteStatus::Rejected] {
        let error = world
            .service
            .request_transition(&id, to, &Caller::Admin)
            .await
            .expect_err("terminal state");
        assert!(matches!(
            error,
            ServiceError::Domain(DomainError::InvalidTransition { allowed, .. }) if allowed.is_empty()
        ));
    }
}

#[tokio::test]
async fn skipping_sent_names_the_allowed_set() {
    let world = world().await;
    let caller = Caller::Partner(world.partner.id);
    let created = world
        .service
        .create_quote(quote_draft(&world), vec![line(&world, 20)], &caller)
        .await
        .expect("create quote");

    let error = world
        .service
        .request_transition(&created.quote.id, QuoteStatus::Accepted, &caller)
        .await
        .expect_err("draft -> accepted is not allowed");
    match error {
        ServiceError::Domain(DomainError::InvalidTransition { from, to, allowed }) => {
            assert_eq!(from, QuoteStatus::Draft);
            assert_eq!(to, QuoteStatus::Accepted);
            assert_eq!(allowed, vec![QuoteStatus::Sent]);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn foreign_partner_cannot_transition_or_delete() {
    let world = world().await;
    let owner = Caller::Partner(world.partner.id);
    let created = world
        .service
        .create_quote(quote_draft(&world), vec![line(&world, 20)], &owner)
        .await
        .expect("create quote");

    let intruder = Caller::Partner(PartnerId::generate());
    let transition = world
        .service
        .request_transition(&created.quote.id, QuoteStatus::Sent, &intruder)
        .await
        .expect_err("foreign transition");
    assert!(matches!(transition, ServiceError::Domain(DomainError::Forbidden(_))));

    let delete = world
        .service
        .delete_quote(&created.quote.id, &intruder)
        .await
        .expect_err("foreign delete");
    assert!(matches!(delete, ServiceError::Domain(DomainError::Forbidden(_))));
}

#[tokio::test]
async fn only_drafts_can_be_deleted() {
    let world = world().await;
    let caller = Caller::Partner(world.partner.id);
    let created = world
        .service
        .create_quote(quote_draft(&world), vec![line(&world, 20)], &caller)
        .await
        .expect("create quote");
    let id = created.quote.id;

    world
        .service
        .request_transition(&id, QuoteStatus::Sent, &caller)
        .await
        .expect("send quote");
    let sent_delete = world
        .service
        .delete_quote(&id, &Caller::Admin)
        .await
        .expect_err("sent quotes are not deletable, even for admins");
    assert!(matches!(sent_delete, ServiceError::Domain(DomainError::Forbidden(_))));

    let draft = world
        .service
        .create_quote(quote_draft(&world), vec![line(&world, 22)], &caller)
        .await
        .expect("second quote");
    world.service.delete_quote(&draft.quote.id, &caller).await.expect("draft delete");

    let missing = world.service.get_quote(&draft.quote.id).await.expect_err("gone");
    assert!(matches!(missing, ServiceError::Domain(DomainError::NotFound { .. })));
}

#[tokio::test]
async fn expiry_is_computed_on_fetch_and_persisted_by_the_sweep() {
    let world = world().await;
    let caller = Caller::Partner(world.partner.id);

    let stale = world
        .service
        .create_quote(quote_draft(&world), vec![line(&world, 20)], &caller)
        .await
        .expect("stale quote");
    world
        .service
        .request_transition(&stale.quote.id, QuoteStatus::Sent, &caller)
        .await
        .expect("send stale");

    world.clock.advance(Duration::days(2));
    let fresh = world
        .service
        .create_quote(quote_draft(&world), vec![line(&world, 20)], &caller)
        .await
        .expect("fresh quote");
    world
        .service
        .request_transition(&fresh.quote.id, QuoteStatus::Sent, &caller)
        .await
        .expect("send fresh");

    // Stale is now 31 days old, fresh 29.
    world.clock.advance(Duration::days(29));

    let stale_view = world.service.get_quote(&stale.quote.id).await.expect("fetch stale");
    assert!(stale_view.is_expired);
    // Display-only: the stored status has not moved yet.
    assert_eq!(stale_view.quote.status, QuoteStatus::Sent);

    let fresh_view = world.service.get_quote(&fresh.quote.id).await.expect("fetch fresh");
    assert!(!fresh_view.is_expired);

    // A display-expired quote can no longer be accepted.
    let accept = world
        .service
        .request_transition(&stale.quote.id, QuoteStatus::Accepted, &caller)
        .await
        .expect_err("accepting an expired quote");
    assert!(matches!(
        accept,
        ServiceError::Domain(DomainError::InvalidTransition { from: QuoteStatus::Expired, .. })
    ));

    let report = world.service.sweep_expired_quotes().await.expect("sweep");
    assert_eq!(report.expired_count, 1);
    let swept = world.service.get_quote(&stale.quote.id).await.expect("fetch swept");
    assert_eq!(swept.quote.status, QuoteStatus::Expired);
    assert!(swept.is_expired);

    // Idempotent: the fresh quote stays sent.
    let second = world.service.sweep_expired_quotes().await.expect("second sweep");
    assert_eq!(second.expired_count, 0);
    assert_eq!(
        world.service.get_quote(&fresh.quote.id).await.expect("fresh").quote.status,
        QuoteStatus::Sent
    );
}

#[tokio::test]
async fn referenced_items_cannot_be_deleted_until_quotes_release_them() {
    let world = world().await;
    let caller = Caller::Partner(world.partner.id);
    let created = world
        .service
        .create_quote(quote_draft(&world), vec![line(&world, 20)], &caller)
        .await
        .expect("create quote");

    let blocked = world
        .service
        .delete_item(&world.item.id, &Caller::Admin)
        .await
        .expect_err("item is referenced");
    assert!(matches!(blocked, ServiceError::Domain(DomainError::Conflict(_))));
    assert!(world.catalog.find_by_id(&world.item.id).await.expect("lookup").is_some());

    world.service.delete_quote(&created.quote.id, &caller).await.expect("delete draft");
    world.service.delete_item(&world.item.id, &Caller::Admin).await.expect("now deletable");
}

#[tokio::test]
async fn catalog_mutations_require_admin() {
    let world = world().await;
    let partner_caller = Caller::Partner(world.partner.id);

    let create = world.service.create_item(item_draft(), &partner_caller).await;
    assert!(matches!(create, Err(ServiceError::Domain(DomainError::Forbidden(_)))));

    let update = world
        .service
        .update_item(&world.item.id, ItemPatch::default(), &partner_caller)
        .await;
    assert!(matches!(update, Err(ServiceError::Domain(DomainError::Forbidden(_)))));

    let delete = world.service.delete_item(&world.item.id, &partner_caller).await;
    assert!(matches!(delete, Err(ServiceError::Domain(DomainError::Forbidden(_)))));
}

#[tokio::test]
async fn stats_reflect_the_portfolio() {
    let world = world().await;
    let caller = Caller::Partner(world.partner.id);

    let mut ids = Vec::new();
    for margin in [15u8, 18, 20, 25] {
        let view = world
            .service
            .create_quote(quote_draft(&world), vec![line(&world, margin)], &caller)
            .await
            .expect("create quote");
        ids.push(view.quote.id);
    }

    // One stays draft; two are sent; one of those is accepted.
    for id in &ids[1..] {
        world
            .service
            .request_transition(id, QuoteStatus::Sent, &caller)
            .await
            .expect("send");
    }
    let accepted = world
        .service
        .request_transition(&ids[3], QuoteStatus::Accepted, &caller)
        .await
        .expect("accept");

    let stats = world.service.quote_stats().await.expect("stats");
    assert_eq!(stats.total_quotes, 4);
    assert_eq!(stats.by_status["draft"], 1);
    assert_eq!(stats.by_status["sent"], 2);
    assert_eq!(stats.by_status["accepted"], 1);
    assert_eq!(stats.this_month_count, 4);
    assert_eq!(stats.accepted_value, accepted.total);
    // 1 accepted / 2 sent = 50%.
    assert_eq!(stats.conversion_rate, Decimal::new(5_000, 2));

    // The fixed check stays consistent with the compare-and-set store.
    assert!(world
        .quotes
        .update_status(&ids[3], QuoteStatus::Accepted, QuoteStatus::Executed)
        .await
        .expect("cas"));
}
