use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::ResourceCache;
use crate::api::{ApiError, HttpTransport};
use crate::clock::Clock;
use crate::connectivity::Connectivity;
use crate::conversion::{self, ConversionNotice, ConversionPreview};
use crate::dashboard::{self, DashboardView, Period, DASHBOARD_FETCH_LIMIT};
use crate::models::{
    seed_categories, seed_expenses, Category, Expense, ExpenseId, RatesTable, DEFAULT_CURRENCIES,
};
use crate::outbox::{Method, OutboxItem, OutboxQueue, WriteOperation, LOCAL_ID_FIELD};
use crate::validation::{ExpenseForm, ValidationError};

pub const EXPENSES_KEY: &str = "cache:expenses";
pub const CATEGORIES_KEY: &str = "cache:categories";
pub const RATES_KEY: &str = "cache:rates";

/// A cacheable snapshot. Empty snapshots count as absent so the seed is
/// served instead.
pub trait CachedResource: Serialize + DeserializeOwned {
    fn is_present(&self) -> bool;
}

impl<T: Serialize + DeserializeOwned> CachedResource for Vec<T> {
    fn is_present(&self) -> bool {
        !self.is_empty()
    }
}

impl CachedResource for Option<RatesTable> {
    fn is_present(&self) -> bool {
        self.is_some()
    }
}

/// Resource URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub expenses: String,
    pub categories: String,
    pub rates: String,
}

impl Endpoints {
    pub fn new(api_base_url: &str, rates_url: &str) -> Self {
        let base = api_base_url.trim_end_matches('/');
        Self {
            expenses: format!("{}/expenses", base),
            categories: format!("{}/categories", base),
            rates: rates_url.to_string(),
        }
    }
}

/// A validated draft with its USD amount filled in.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedExpense {
    pub draft: Expense,
    /// Shown to the user when the amount could not be converted.
    pub notice: Option<ConversionNotice>,
    /// Rate applied to a non-USD amount.
    pub preview: Option<ConversionPreview>,
}

/// Outcome of one outbox replay.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Items sent successfully and removed from the queue.
    pub replayed: usize,
    /// Local placeholders replaced by the server record.
    pub reconciled: usize,
    /// Items still queued afterwards.
    pub remaining: usize,
    /// Id of the item whose replay failed, if any.
    pub halted_at: Option<String>,
    /// Another sync was already running; nothing was attempted.
    pub skipped: bool,
}

/// Clears the in-progress flag when a sync finishes, however it exits.
struct SyncGuard<'a>(&'a AtomicBool);

impl<'a> SyncGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| SyncGuard(flag))
    }
}

impl Drop for SyncGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Cache-then-network access to expenses, categories and rates.
///
/// Reads never fail: when offline, or when the request fails, the cached
/// snapshot is served, or the seed data if nothing is cached. Expense
/// creation falls back to a local placeholder plus an outbox entry, and
/// `sync_outbox` replays those entries once the network is back.
pub struct CachedResourceStore {
    cache: ResourceCache,
    outbox: Arc<OutboxQueue>,
    http: Arc<dyn HttpTransport>,
    connectivity: Arc<dyn Connectivity>,
    clock: Arc<dyn Clock>,
    endpoints: Endpoints,
    sync_running: AtomicBool,
}

impl CachedResourceStore {
    pub fn new(
        cache: ResourceCache,
        outbox: Arc<OutboxQueue>,
        http: Arc<dyn HttpTransport>,
        connectivity: Arc<dyn Connectivity>,
        clock: Arc<dyn Clock>,
        endpoints: Endpoints,
    ) -> Self {
        Self {
            cache,
            outbox,
            http,
            connectivity,
            clock,
            endpoints,
            sync_running: AtomicBool::new(false),
        }
    }

    pub fn cache(&self) -> &ResourceCache {
        &self.cache
    }

    pub fn outbox(&self) -> &OutboxQueue {
        &self.outbox
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    pub fn is_online(&self) -> bool {
        self.connectivity.is_online()
    }

    // ===== Read-through =====

    /// Serve `key` through the cache. Offline or on a failed `network`
    /// call, returns the cached snapshot or `seed`. A successful result
    /// replaces the snapshot.
    pub async fn fetch<T, F>(&self, key: &str, network: F, seed: T) -> T
    where
        T: CachedResource,
        F: Future<Output = Result<T, ApiError>>,
    {
        if !self.is_online() {
            debug!(cache = key, "Offline, serving cached data");
            return self.cached_or(key, seed);
        }

        match network.await {
            Ok(value) => {
                self.cache.save(key, &value);
                value
            }
            Err(e) => {
                warn!(cache = key, error = %e, "Fetch failed, serving cached data");
                self.cached_or(key, seed)
            }
        }
    }

    fn cached_or<T: CachedResource>(&self, key: &str, seed: T) -> T {
        self.cache
            .load::<T>(key)
            .filter(|value| value.is_present())
            .unwrap_or(seed)
    }

    async fn get_typed<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let value = self.http.get_json(url, query).await?;
        serde_json::from_value(value).map_err(ApiError::decode)
    }

    // ===== Expenses =====

    /// Everything currently cached, newest first. Empty if nothing is cached.
    pub fn cached_expenses(&self) -> Vec<Expense> {
        self.cache.load(EXPENSES_KEY).unwrap_or_default()
    }

    fn expenses_or_seed(&self) -> Vec<Expense> {
        self.cached_or(EXPENSES_KEY, seed_expenses(self.clock.today()))
    }

    /// One page of expenses sorted by date, newest first.
    ///
    /// Only a first-page response replaces the expense cache; offline and
    /// failed reads page through the cached list (or the seed).
    pub async fn fetch_expenses(&self, page: usize, limit: usize) -> Vec<Expense> {
        if !self.is_online() {
            debug!(page, limit, "Offline, paging cached expenses");
            return dashboard::page_window(&self.expenses_or_seed(), page, limit);
        }

        let query = [
            ("_page", page.to_string()),
            ("_limit", limit.to_string()),
            ("_sort", "date".to_string()),
            ("_order", "desc".to_string()),
        ];
        match self
            .get_typed::<Vec<Expense>>(&self.endpoints.expenses, &query)
            .await
        {
            Ok(expenses) => {
                if page == 1 {
                    self.cache.save(EXPENSES_KEY, &expenses);
                }
                expenses
            }
            Err(e) => {
                warn!(page, error = %e, "Failed to fetch expenses, paging cached data");
                dashboard::page_window(&self.expenses_or_seed(), page, limit)
            }
        }
    }

    /// Validate a form and compute its USD amount, fetching rates through
    /// the cache when the currency is not USD.
    pub async fn prepare_expense(
        &self,
        form: &ExpenseForm,
    ) -> Result<PreparedExpense, ValidationError> {
        let mut draft = form.validate()?;
        let currency = draft.currency.clone().unwrap_or_default();

        let rates = if currency == conversion::BASE_CURRENCY {
            None
        } else {
            self.fetch_rates().await
        };
        let converted = conversion::to_usd(draft.amount, &currency, rates.as_ref());
        draft.amount_usd = Some(converted.amount_usd);
        let preview = rates
            .as_ref()
            .and_then(|table| conversion::preview(draft.amount, &currency, table));

        Ok(PreparedExpense {
            draft,
            notice: converted.notice,
            preview,
        })
    }

    /// Save a new expense.
    ///
    /// Returns the server record when the POST succeeds: the draft with the
    /// response's fields, `id` included, laid over it. Offline, or when the
    /// POST fails, returns a placeholder with a `local-` id that is
    /// cached immediately and queued for `sync_outbox`.
    pub async fn add_expense(&self, mut draft: Expense) -> Expense {
        draft.id = None;
        if draft.amount_usd.is_none()
            && draft.currency.as_deref() == Some(conversion::BASE_CURRENCY)
        {
            draft.amount_usd = Some(conversion::round2(draft.amount));
        }

        if !self.is_online() {
            return self.enqueue_local(draft);
        }

        let body = match serde_json::to_value(&draft) {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "Failed to encode expense, keeping it local");
                return self.enqueue_local(draft);
            }
        };

        match self
            .http
            .send_json(Method::Post, &self.endpoints.expenses, Some(&body))
            .await
        {
            Ok(response) => {
                let saved = overlay_response(&draft, &response);
                if saved.id.is_none() {
                    debug!("Server accepted the expense without returning an id");
                }
                self.cache
                    .update_list(EXPENSES_KEY, |list: &mut Vec<Expense>| {
                        list.insert(0, saved.clone())
                    });
                saved
            }
            Err(e) => {
                warn!(error = %e, "POST failed, enqueuing for later sync");
                self.enqueue_local(draft)
            }
        }
    }

    fn enqueue_local(&self, draft: Expense) -> Expense {
        let local_id = ExpenseId::local(self.clock.now());

        let mut body = serde_json::to_value(&draft).unwrap_or(Value::Null);
        if let Value::Object(map) = &mut body {
            map.insert(
                LOCAL_ID_FIELD.to_string(),
                Value::String(local_id.to_string()),
            );
        }
        self.outbox.push(WriteOperation {
            url: self.endpoints.expenses.clone(),
            method: Method::Post,
            body: Some(body),
            created_at: self.clock.now_millis(),
        });

        let record = Expense {
            id: Some(local_id),
            ..draft
        };
        self.cache
            .update_list(EXPENSES_KEY, |list: &mut Vec<Expense>| {
                list.insert(0, record.clone())
            });
        record
    }

    // ===== Categories =====

    pub async fn fetch_categories(&self) -> Vec<Category> {
        self.fetch(
            CATEGORIES_KEY,
            self.get_typed(&self.endpoints.categories, &[]),
            seed_categories(),
        )
        .await
    }

    // ===== Rates =====

    /// Latest USD rates, or the last cached table. `None` if never fetched.
    pub async fn fetch_rates(&self) -> Option<RatesTable> {
        let network = async {
            self.get_typed::<RatesTable>(&self.endpoints.rates, &[])
                .await
                .map(Some)
        };
        self.fetch(RATES_KEY, network, None).await
    }

    /// Currency codes to offer, from the rates table when one is available.
    pub async fn currencies(&self) -> Vec<String> {
        match self.fetch_rates().await {
            Some(table) if !table.rates.is_empty() => table.currency_codes(),
            _ => DEFAULT_CURRENCIES.iter().map(|c| c.to_string()).collect(),
        }
    }

    // ===== Dashboard =====

    pub fn selected_period(&self) -> Period {
        dashboard::load_period(&self.cache)
    }

    pub fn select_period(&self, period: Period) {
        dashboard::save_period(&self.cache, period);
    }

    /// Fetch up to `DASHBOARD_FETCH_LIMIT` expenses and derive the view.
    pub async fn dashboard(&self, period: Period, page_size: usize) -> DashboardView {
        let all = self.fetch_expenses(1, DASHBOARD_FETCH_LIMIT).await;
        DashboardView::build(&all, period, self.clock.today(), page_size)
    }

    // ===== Outbox replay =====

    /// Replay queued writes oldest first, stopping at the first failure so
    /// the rest stay queued in order. Returns immediately with
    /// `skipped = true` if another sync is in progress.
    pub async fn sync_outbox(&self) -> SyncReport {
        let Some(_guard) = SyncGuard::acquire(&self.sync_running) else {
            debug!("Outbox sync already in progress");
            return SyncReport {
                skipped: true,
                remaining: self.outbox.len(),
                ..SyncReport::default()
            };
        };

        let items = self.outbox.list();
        let mut report = SyncReport::default();
        if !items.is_empty() {
            info!(pending = items.len(), "Syncing outbox");
        }

        for item in items {
            match self
                .http
                .send_json(item.method, &item.url, item.body.as_ref())
                .await
            {
                Ok(response) => {
                    if self.reconcile(&item, response) {
                        report.reconciled += 1;
                    }
                    self.outbox.remove(&item.id);
                    report.replayed += 1;
                }
                Err(e) => {
                    warn!(id = %item.id, method = %item.method, url = %item.url, error = %e, "Failed to sync outbox item");
                    report.halted_at = Some(item.id);
                    break;
                }
            }
        }

        report.remaining = self.outbox.len();
        if report.replayed > 0 || report.halted_at.is_some() {
            info!(
                replayed = report.replayed,
                reconciled = report.reconciled,
                remaining = report.remaining,
                "Outbox sync finished"
            );
        }
        report
    }

    /// Swap the cached placeholder created by `item` for the server record.
    /// The response only needs to carry an `id`; any other fields it has
    /// overwrite the placeholder's.
    fn reconcile(&self, item: &OutboxItem, response: Value) -> bool {
        let Some(local_id) = item.local_id() else {
            return false;
        };
        if server_id(&response).is_none() {
            debug!(local_id, "Server response has no id, leaving placeholder");
            return false;
        }

        self.cache
            .update_list(EXPENSES_KEY, |list: &mut Vec<Expense>| {
                let mut replaced = false;
                for entry in list.iter_mut() {
                    if entry.id.as_ref().is_some_and(|id| id.matches_text(local_id)) {
                        *entry = overlay_response(entry, &response);
                        replaced = true;
                    }
                }
                replaced
            })
    }
}

/// The `id` of a write response, if it has a usable one.
fn server_id(response: &Value) -> Option<ExpenseId> {
    response
        .get("id")
        .filter(|id| !id.is_null())
        .and_then(|id| serde_json::from_value(id.clone()).ok())
}

/// `base` with the fields of a write response laid over it. Responses that
/// are not objects leave `base` as it is. If the merged fields do not form
/// an expense, only the server id is taken.
fn overlay_response(base: &Expense, response: &Value) -> Expense {
    let Value::Object(fields) = response else {
        return base.clone();
    };
    if let Ok(Value::Object(mut merged)) = serde_json::to_value(base) {
        merged.extend(fields.clone());
        merged.remove(LOCAL_ID_FIELD);
        match serde_json::from_value(Value::Object(merged)) {
            Ok(expense) => return expense,
            Err(e) => {
                debug!(error = %e, "Response fields do not fit an expense, keeping local fields")
            }
        }
    }
    let mut record = base.clone();
    if let Some(id) = server_id(response) {
        record.id = Some(id);
    }
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::connectivity::ConnectivityFlag;
    use crate::storage::{LogObserver, MemoryStore};
    use crate::testing::ScriptedTransport;
    use chrono::NaiveDate;
    use serde_json::json;

    struct Fixture {
        store: CachedResourceStore,
        http: Arc<ScriptedTransport>,
        online: Arc<ConnectivityFlag>,
    }

    fn fixture(online: bool) -> Fixture {
        let kv = Arc::new(MemoryStore::new());
        let observer = Arc::new(LogObserver);
        let clock = Arc::new(FixedClock::at_date(
            NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
        ));
        let http = Arc::new(ScriptedTransport::new());
        let flag = Arc::new(ConnectivityFlag::new(online));
        let outbox = Arc::new(OutboxQueue::new(kv.clone(), observer.clone(), clock.clone()));
        let store = CachedResourceStore::new(
            ResourceCache::new(kv, observer),
            outbox,
            http.clone(),
            flag.clone(),
            clock,
            Endpoints::new("http://api.test/", "http://rates.test/latest/USD"),
        );
        Fixture {
            store,
            http,
            online: flag,
        }
    }

    #[test]
    fn test_endpoints_strip_trailing_slash() {
        let e = Endpoints::new("http://localhost:3001/", "http://r");
        assert_eq!(e.expenses, "http://localhost:3001/expenses");
        assert_eq!(e.categories, "http://localhost:3001/categories");
    }

    #[tokio::test]
    async fn test_offline_categories_use_seed() {
        let f = fixture(false);
        let categories = f.store.fetch_categories().await;
        assert_eq!(categories.len(), 8);
        assert!(f.http.requests().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_caches_then_serves_cache_on_failure() {
        let f = fixture(true);
        f.http.respond_ok(json!([{ "id": "misc", "label": "Misc" }]));
        let first = f.store.fetch_categories().await;
        assert_eq!(first[0].id, "misc");

        f.http.respond_err(ApiError::ServerError("boom".into()));
        let second = f.store.fetch_categories().await;
        assert_eq!(second, first);

        f.online.set_online(false);
        assert_eq!(f.store.fetch_categories().await, first);
    }

    #[tokio::test]
    async fn test_expense_query_parameters() {
        let f = fixture(true);
        f.http.respond_ok(json!([]));
        f.store.fetch_expenses(2, 5).await;
        let request = &f.http.requests()[0];
        assert_eq!(request.url, "http://api.test/expenses");
        assert_eq!(
            request.query,
            vec![
                ("_page".to_string(), "2".to_string()),
                ("_limit".to_string(), "5".to_string()),
                ("_sort".to_string(), "date".to_string()),
                ("_order".to_string(), "desc".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_only_first_page_replaces_cache() {
        let f = fixture(true);
        f.http
            .respond_ok(json!([{ "id": 1, "category": "gas", "amount": 5, "date": "2024-05-01" }]));
        f.store.fetch_expenses(1, 10).await;
        f.http
            .respond_ok(json!([{ "id": 2, "category": "food", "amount": 7, "date": "2024-04-01" }]));
        f.store.fetch_expenses(2, 10).await;

        let cached = f.store.cached_expenses();
        assert_eq!(cached.len(), 1);
        assert_eq!(cached[0].id, Some(ExpenseId::Number(1)));
    }

    #[tokio::test]
    async fn test_offline_expenses_page_through_seed() {
        let f = fixture(false);
        let page = f.store.fetch_expenses(2, 3).await;
        let ids: Vec<_> = page.iter().map(|e| e.id.clone().unwrap()).collect();
        assert_eq!(
            ids,
            vec![ExpenseId::Number(4), ExpenseId::Number(5), ExpenseId::Number(6)]
        );
    }

    #[tokio::test]
    async fn test_online_add_prepends_server_record() {
        let f = fixture(true);
        f.http.respond_ok(json!({
            "id": 41, "category": "gas", "amount": 50, "currency": "USD",
            "amountUsd": 50, "date": "2024-01-01", "receipt": null
        }));
        let saved = f
            .store
            .add_expense(Expense::new("gas", 50.0, "USD", "2024-01-01"))
            .await;
        assert_eq!(saved.id, Some(ExpenseId::Number(41)));
        assert!(f.store.outbox().is_empty());
        assert_eq!(f.store.cached_expenses()[0].id, Some(ExpenseId::Number(41)));

        let sent = &f.http.requests()[0];
        assert_eq!(sent.method, "POST");
        assert_eq!(sent.body.as_ref().unwrap()["amountUsd"], 50.0);
    }

    #[tokio::test]
    async fn test_online_add_accepts_id_only_response() {
        let f = fixture(true);
        f.http.respond_ok(json!({ "id": 41 }));
        let saved = f
            .store
            .add_expense(Expense::new("gas", 50.0, "USD", "2024-01-01"))
            .await;
        assert_eq!(saved.id, Some(ExpenseId::Number(41)));
        assert_eq!(saved.category, "gas");
        assert_eq!(saved.amount_usd, Some(50.0));
        assert!(f.store.outbox().is_empty());
        assert_eq!(f.store.cached_expenses(), vec![saved]);
    }

    #[tokio::test]
    async fn test_online_add_with_empty_response_is_not_queued() {
        let f = fixture(true);
        f.http.respond_ok(Value::Null);
        let saved = f
            .store
            .add_expense(Expense::new("gas", 50.0, "USD", "2024-01-01"))
            .await;
        assert_eq!(saved.id, None);
        assert!(!saved.is_local());
        assert!(f.store.outbox().is_empty());
        assert_eq!(f.http.requests().len(), 1);
        assert_eq!(f.store.cached_expenses().len(), 1);
    }

    #[tokio::test]
    async fn test_sync_reconciles_id_only_response() {
        let f = fixture(false);
        let placeholder = f
            .store
            .add_expense(Expense::new("food", 12.5, "USD", "2024-05-31"))
            .await;
        assert!(placeholder.is_local());

        f.online.set_online(true);
        f.http.respond_ok(json!({ "id": 77 }));
        let report = f.store.sync_outbox().await;
        assert_eq!(report.replayed, 1);
        assert_eq!(report.reconciled, 1);
        assert_eq!(report.remaining, 0);

        let cached = f.store.cached_expenses();
        assert_eq!(cached.len(), 1);
        assert_eq!(cached[0].id, Some(ExpenseId::Number(77)));
        assert_eq!(cached[0].category, "food");
        assert_eq!(cached[0].amount, 12.5);
    }

    #[tokio::test]
    async fn test_sync_response_fields_override_placeholder() {
        let f = fixture(false);
        f.store
            .add_expense(Expense::new("food", 12.5, "USD", "2024-05-31"))
            .await;

        f.online.set_online(true);
        f.http
            .respond_ok(json!({ "id": "srv-9", "amount": 13, "_localId": "ignored" }));
        let report = f.store.sync_outbox().await;
        assert_eq!(report.reconciled, 1);

        let cached = f.store.cached_expenses();
        assert_eq!(cached[0].id, Some(ExpenseId::Text("srv-9".into())));
        assert_eq!(cached[0].amount, 13.0);
        assert_eq!(cached[0].date, "2024-05-31");
    }

    #[tokio::test]
    async fn test_sync_without_server_id_keeps_placeholder() {
        let f = fixture(false);
        let placeholder = f
            .store
            .add_expense(Expense::new("food", 12.5, "USD", "2024-05-31"))
            .await;

        f.online.set_online(true);
        f.http.respond_ok(Value::Null);
        let report = f.store.sync_outbox().await;
        assert_eq!(report.replayed, 1);
        assert_eq!(report.reconciled, 0);
        assert!(f.store.outbox().is_empty());
        assert_eq!(f.store.cached_expenses()[0].id, placeholder.id);
    }

    #[tokio::test]
    async fn test_failed_post_behaves_like_offline() {
        let f = fixture(true);
        f.http.respond_err(ApiError::ServerError("down".into()));
        let saved = f
            .store
            .add_expense(Expense::new("gas", 50.0, "USD", "2024-01-01"))
            .await;
        assert!(saved.is_local());
        let queued = f.store.outbox().list();
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].local_id(), Some(saved.id.unwrap().to_string().as_str()));
    }

    #[tokio::test]
    async fn test_prepare_expense_converts_with_cached_rates() {
        let f = fixture(true);
        f.http
            .respond_ok(json!({ "base_code": "USD", "rates": { "USD": 1, "EUR": 0.5 } }));
        let form = ExpenseForm {
            category: Some("food".into()),
            amount: Some(10.0),
            currency: Some("EUR".into()),
            date: Some("2024-05-30".into()),
            receipt: None,
        };
        let prepared = f.store.prepare_expense(&form).await.unwrap();
        assert_eq!(prepared.draft.amount_usd, Some(20.0));
        assert!(prepared.notice.is_none());
        assert_eq!(
            prepared.preview,
            Some(ConversionPreview {
                rate: 0.5,
                amount_usd: 20.0
            })
        );

        // Network gone: the cached table still converts
        f.online.set_online(false);
        let prepared = f.store.prepare_expense(&form).await.unwrap();
        assert_eq!(prepared.draft.amount_usd, Some(20.0));
    }

    #[tokio::test]
    async fn test_prepare_expense_without_rates() {
        let f = fixture(false);
        let form = ExpenseForm {
            category: Some("food".into()),
            amount: Some(10.0),
            currency: Some("EUR".into()),
            date: Some("2024-05-30".into()),
            receipt: None,
        };
        let prepared = f.store.prepare_expense(&form).await.unwrap();
        assert_eq!(prepared.draft.amount_usd, Some(10.0));
        assert_eq!(prepared.notice, Some(ConversionNotice::RatesUnavailable));
        assert!(prepared.preview.is_none());

        let bad = ExpenseForm {
            amount: Some(0.0),
            ..form
        };
        assert_eq!(
            f.store.prepare_expense(&bad).await,
            Err(ValidationError::InvalidAmount)
        );
    }

    #[tokio::test]
    async fn test_currencies_fall_back_to_defaults() {
        let f = fixture(false);
        assert_eq!(f.store.currencies().await, vec!["USD", "EUR", "GBP", "EGP"]);
    }

    #[tokio::test]
    async fn test_sync_replays_put_and_delete() {
        let f = fixture(true);
        f.store.outbox().push(WriteOperation {
            url: "http://api.test/expenses/3".into(),
            method: Method::Put,
            body: Some(json!({ "amount": 9 })),
            created_at: 0,
        });
        f.store.outbox().push(WriteOperation {
            url: "http://api.test/expenses/4".into(),
            method: Method::Delete,
            body: None,
            created_at: 0,
        });
        f.http.respond_ok(json!({ "id": 3, "category": "gas", "amount": 9 }));
        f.http.respond_ok(Value::Null);

        let report = f.store.sync_outbox().await;
        assert_eq!(report.replayed, 2);
        assert_eq!(report.reconciled, 0);
        let methods: Vec<_> = f.http.requests().iter().map(|r| r.method.clone()).collect();
        assert_eq!(methods, vec!["PUT", "DELETE"]);
    }

    #[tokio::test]
    async fn test_sync_is_not_reentrant() {
        let f = fixture(true);
        let _held = SyncGuard::acquire(&f.store.sync_running).unwrap();
        f.store.outbox().push(WriteOperation {
            url: "u".into(),
            method: Method::Delete,
            body: None,
            created_at: 0,
        });

        let report = f.store.sync_outbox().await;
        assert!(report.skipped);
        assert_eq!(report.remaining, 1);
        assert!(f.http.requests().is_empty());
    }

    #[tokio::test]
    async fn test_dashboard_uses_selected_period() {
        let f = fixture(false);
        f.store.select_period(Period::Last7Days);
        let view = f.store.dashboard(f.store.selected_period(), 10).await;
        // Seed expenses dated 1, 2 and 5 days before 2024-06-01
        assert_eq!(view.period, Period::Last7Days);
        assert_eq!(view.feed.total(), 3);
        assert_eq!(view.summary.income, 215.0);
    }
}
