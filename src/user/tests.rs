use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde_json::{Value, json};
use tokio::sync::{Mutex, mpsc, oneshot};

use super::{UserContext, VirtualUser, endpoints};
use crate::catalog::{CatalogData, TaskKind, ThinkTime, UserClass, UserKind};
use crate::http::{ApiRequest, ApiResponse, Transport, TransportError};
use crate::metrics::{Outcome, SampleRecorder, TaskSample};

fn run_async_test<F>(future: F) -> Result<(), String>
where
    F: Future<Output = Result<(), String>>,
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| format!("Failed to build runtime: {}", err))?;
    runtime.block_on(future)
}

/// Answers by metric name and remembers every request it saw.
#[derive(Default)]
struct ScriptedTransport {
    routes: BTreeMap<&'static str, (u16, Value)>,
    refuse: bool,
    seen: Mutex<Vec<ApiRequest>>,
}

impl ScriptedTransport {
    fn with(mut self, name: &'static str, status: u16, body: Value) -> Self {
        self.routes.insert(name, (status, body));
        self
    }

    async fn requests(&self) -> Vec<ApiRequest> {
        self.seen.lock().await.clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        let name = request.name;
        self.seen.lock().await.push(request);
        if self.refuse {
            return Err(TransportError::Failed("connection refused".to_owned()));
        }
        let (status, body) = self
            .routes
            .get(name)
            .cloned()
            .unwrap_or((404, json!({ "error": "not found" })));
        Ok(ApiResponse::new(status, Bytes::from(body.to_string())))
    }
}

struct Harness {
    transport: Arc<ScriptedTransport>,
    samples: mpsc::UnboundedReceiver<TaskSample>,
    user: VirtualUser,
}

fn harness(transport: ScriptedTransport, class: UserClass, seed: u64) -> Harness {
    let transport = Arc::new(transport);
    let (recorder, samples) = SampleRecorder::channel();
    let ctx = Arc::new(UserContext {
        transport: transport.clone(),
        data: CatalogData::default(),
        recorder,
    });
    let user = VirtualUser::new(1, Arc::new(class), ctx, StdRng::seed_from_u64(seed));
    Harness {
        transport,
        samples,
        user,
    }
}

fn staking_class() -> Result<UserClass, String> {
    UserClass::staking(1, UserKind::Staking.default_think_time(), &BTreeMap::new())
        .map_err(|err| format!("class build failed: {}", err))
}

fn drain(samples: &mut mpsc::UnboundedReceiver<TaskSample>) -> Vec<TaskSample> {
    let mut drained = Vec::new();
    while let Ok(sample) = samples.try_recv() {
        drained.push(sample);
    }
    drained
}

fn single(samples: &mut mpsc::UnboundedReceiver<TaskSample>) -> Result<TaskSample, String> {
    let mut drained = drain(samples);
    if drained.len() != 1 {
        return Err(format!("Expected one sample, got {:?}", drained));
    }
    drained.pop().ok_or_else(|| "No sample".to_owned())
}

#[test]
fn login_stores_token_and_later_requests_carry_it() -> Result<(), String> {
    run_async_test(async {
        let transport = ScriptedTransport::default()
            .with(endpoints::LOGIN, 200, json!({ "token": "tok-1" }))
            .with(endpoints::NOTIFICATIONS, 200, json!({ "unread": 0 }));
        let mut h = harness(transport, staking_class()?, 1);

        h.user.login().await;
        h.user.execute(TaskKind::Notifications).await;

        if h.user.session().bearer() != Some("tok-1") {
            return Err(format!("Unexpected session {:?}", h.user.session()));
        }
        let requests = h.transport.requests().await;
        let [login, notifications] = requests.as_slice() else {
            return Err(format!("Unexpected requests {:?}", requests));
        };
        let expected_email = h.user.session().login_email.clone();
        if login.body != Some(json!({ "email": expected_email, "password": "Test123456!" }))
            || login.bearer.is_some()
        {
            return Err(format!("Unexpected login request {:?}", login));
        }
        if notifications.bearer.as_deref() != Some("tok-1")
            || notifications.path != "/api/notifications/unread"
        {
            return Err(format!("Unexpected notifications request {:?}", notifications));
        }
        Ok(())
    })
}

#[test]
fn failed_login_records_failure_and_user_continues_anonymously() -> Result<(), String> {
    run_async_test(async {
        let transport = ScriptedTransport::default()
            .with(endpoints::LOGIN, 401, json!({ "error": "bad credentials" }))
            .with(endpoints::NOTIFICATIONS, 200, json!({ "unread": 0 }));
        let mut h = harness(transport, staking_class()?, 2);

        h.user.login().await;
        let login = single(&mut h.samples)?;
        if login.outcome != Outcome::failure("Got status code 401") || login.status != 401 {
            return Err(format!("Unexpected login sample {:?}", login));
        }

        h.user.execute(TaskKind::Notifications).await;
        let requests = h.transport.requests().await;
        if requests.last().and_then(|request| request.bearer.as_ref()).is_some() {
            return Err("Anonymous user sent a bearer token".to_owned());
        }
        if !single(&mut h.samples)?.outcome.is_success() {
            return Err("Expected anonymous notifications to succeed".to_owned());
        }
        Ok(())
    })
}

#[test]
fn empty_search_fails_without_follow_up() -> Result<(), String> {
    run_async_test(async {
        let transport = ScriptedTransport::default().with(endpoints::SEARCH, 200, json!([]));
        let mut h = harness(transport, staking_class()?, 3);

        h.user.execute(TaskKind::Search).await;

        let sample = single(&mut h.samples)?;
        if sample.outcome != Outcome::failure("No results returned") {
            return Err(format!("Unexpected search sample {:?}", sample));
        }
        let requests = h.transport.requests().await;
        let Some(search) = requests.first() else {
            return Err("No request sent".to_owned());
        };
        if !search.path.starts_with("/api/staking/search?query=")
            || !search.path.ends_with("&limit=20")
        {
            return Err(format!("Unexpected search path {}", search.path));
        }
        Ok(())
    })
}

#[test]
fn search_follow_up_opens_returned_influencer() -> Result<(), String> {
    run_async_test(async {
        let transport = ScriptedTransport::default()
            .with(endpoints::SEARCH, 200, json!([{ "id": "inf-9" }]))
            .with(
                endpoints::INFLUENCER_DETAILS,
                200,
                json!({ "pool": {}, "metrics": {} }),
            );
        let mut h = harness(transport, staking_class()?, 4);

        for _ in 0..40 {
            h.user.execute(TaskKind::Search).await;
        }

        let details: Vec<String> = h
            .transport
            .requests()
            .await
            .into_iter()
            .filter(|request| request.name == endpoints::INFLUENCER_DETAILS)
            .map(|request| request.path)
            .collect();
        if details.is_empty() || details.len() == 40 {
            return Err(format!("Follow-up count {} is not probabilistic", details.len()));
        }
        if details.iter().any(|path| path != "/api/influencers/inf-9") {
            return Err(format!("Unexpected details paths {:?}", details));
        }
        if drain(&mut h.samples).iter().any(|sample| !sample.outcome.is_success()) {
            return Err("Expected every sample to succeed".to_owned());
        }
        Ok(())
    })
}

fn paths_named(requests: &[ApiRequest], name: &str) -> Vec<String> {
    requests
        .iter()
        .filter(|request| request.name == name)
        .map(|request| request.path.clone())
        .collect()
}

#[test]
fn view_details_opens_a_known_influencer() -> Result<(), String> {
    run_async_test(async {
        let transport = ScriptedTransport::default().with(
            endpoints::INFLUENCER_DETAILS,
            200,
            json!({ "pool": { "apy": 12 }, "metrics": {} }),
        );
        let mut h = harness(transport, staking_class()?, 10);

        for _ in 0..20 {
            h.user.execute(TaskKind::ViewDetails).await;
        }

        let known: Vec<String> = CatalogData::default()
            .influencers
            .iter()
            .map(|influencer| format!("/api/influencers/{}", influencer.id))
            .collect();
        let paths = paths_named(&h.transport.requests().await, endpoints::INFLUENCER_DETAILS);
        if paths.len() != 20 || paths.iter().any(|path| !known.contains(path)) {
            return Err(format!("Unexpected details paths {:?}", paths));
        }
        if drain(&mut h.samples).iter().any(|sample| !sample.outcome.is_success()) {
            return Err("Expected every details sample to succeed".to_owned());
        }
        Ok(())
    })
}

#[test]
fn view_details_without_metrics_fails() -> Result<(), String> {
    run_async_test(async {
        let transport = ScriptedTransport::default().with(
            endpoints::INFLUENCER_DETAILS,
            200,
            json!({ "pool": {} }),
        );
        let mut h = harness(transport, staking_class()?, 11);

        h.user.execute(TaskKind::ViewDetails).await;

        let sample = single(&mut h.samples)?;
        if sample.outcome != Outcome::failure("Missing required fields in response") {
            return Err(format!("Unexpected details sample {:?}", sample));
        }
        Ok(())
    })
}

#[test]
fn portfolio_follow_up_claims_nested_influencer() -> Result<(), String> {
    run_async_test(async {
        let transport = ScriptedTransport::default()
            .with(
                endpoints::PORTFOLIO,
                200,
                json!([{ "amount": "5", "influencer": { "id": "inf-7" } }]),
            )
            .with(endpoints::CLAIM, 200, json!({ "claimed": "5" }));
        let mut h = harness(transport, staking_class()?, 12);

        for _ in 0..60 {
            h.user.execute(TaskKind::Portfolio).await;
        }

        let requests = h.transport.requests().await;
        let claims: Vec<&ApiRequest> = requests
            .iter()
            .filter(|request| request.name == endpoints::CLAIM)
            .collect();
        if claims.is_empty() || claims.len() >= 60 {
            return Err(format!("Claim count {} is not probabilistic", claims.len()));
        }
        let expected = json!({
            "influencerId": "inf-7",
            "wallet": format!("wallet_{}", h.user.session().user_id),
        });
        if claims.iter().any(|claim| claim.body.as_ref() != Some(&expected)) {
            return Err(format!("Unexpected claim bodies {:?}", claims));
        }
        if drain(&mut h.samples).iter().any(|sample| !sample.outcome.is_success()) {
            return Err("Expected every sample to succeed".to_owned());
        }
        Ok(())
    })
}

#[test]
fn empty_portfolio_never_claims() -> Result<(), String> {
    run_async_test(async {
        let transport = ScriptedTransport::default()
            .with(endpoints::PORTFOLIO, 200, json!([]))
            .with(endpoints::CLAIM, 200, json!({}));
        let mut h = harness(transport, staking_class()?, 13);

        for _ in 0..30 {
            h.user.execute(TaskKind::Portfolio).await;
        }

        let requests = h.transport.requests().await;
        if requests.len() != 30 || !paths_named(&requests, endpoints::CLAIM).is_empty() {
            return Err(format!("Unexpected requests {:?}", requests));
        }
        if drain(&mut h.samples).iter().any(|sample| !sample.outcome.is_success()) {
            return Err("An empty portfolio is still a success".to_owned());
        }
        Ok(())
    })
}

#[test]
fn browse_follow_up_opens_listed_content() -> Result<(), String> {
    run_async_test(async {
        let transport = ScriptedTransport::default()
            .with(endpoints::CONTENT_LIST, 200, json!({ "items": [{ "id": "c-3" }] }))
            .with(endpoints::CONTENT_DETAILS, 200, json!({ "id": "c-3" }));
        let mut h = harness(transport, staking_class()?, 14);

        for _ in 0..40 {
            h.user.execute(TaskKind::BrowseContent).await;
        }

        let requests = h.transport.requests().await;
        let lists = paths_named(&requests, endpoints::CONTENT_LIST);
        if lists.len() != 40
            || lists
                .iter()
                .any(|path| path != "/api/content?status=published&limit=20")
        {
            return Err(format!("Unexpected list requests {:?}", lists));
        }
        let details = paths_named(&requests, endpoints::CONTENT_DETAILS);
        if details.is_empty() || details.len() == 40 {
            return Err(format!("Details count {} is not probabilistic", details.len()));
        }
        if details.iter().any(|path| path != "/api/content/c-3") {
            return Err(format!("Unexpected details paths {:?}", details));
        }
        Ok(())
    })
}

#[test]
fn empty_content_list_skips_details() -> Result<(), String> {
    run_async_test(async {
        let transport = ScriptedTransport::default()
            .with(endpoints::CONTENT_LIST, 200, json!({ "items": [] }))
            .with(endpoints::CONTENT_DETAILS, 200, json!({}));
        let mut h = harness(transport, staking_class()?, 15);

        for _ in 0..30 {
            h.user.execute(TaskKind::BrowseContent).await;
        }

        let requests = h.transport.requests().await;
        if !paths_named(&requests, endpoints::CONTENT_DETAILS).is_empty() {
            return Err(format!("Details requested for an empty list: {:?}", requests));
        }
        if drain(&mut h.samples).iter().any(|sample| !sample.outcome.is_success()) {
            return Err("An empty content list is still a success".to_owned());
        }
        Ok(())
    })
}

#[test]
fn analytics_rotates_over_three_endpoints() -> Result<(), String> {
    run_async_test(async {
        let transport =
            ScriptedTransport::default().with(endpoints::ANALYTICS, 200, json!({ "ok": true }));
        let mut h = harness(transport, staking_class()?, 16);

        for _ in 0..60 {
            h.user.execute(TaskKind::Analytics).await;
        }

        let ranges = ["24h", "7d", "30d"];
        let mut seen = [false; 3];
        for path in paths_named(&h.transport.requests().await, endpoints::ANALYTICS) {
            let slot = if let Some(range) = path.strip_prefix("/api/analytics/overview?timeRange=")
                && ranges.contains(&range)
            {
                seen.get_mut(0)
            } else if let Some(range) =
                path.strip_prefix("/api/analytics/portfolio/performance?period=")
                && ranges.contains(&range)
            {
                seen.get_mut(1)
            } else if path == "/api/analytics/top-earners?limit=10" {
                seen.get_mut(2)
            } else {
                return Err(format!("Unexpected analytics path {}", path));
            };
            if let Some(flag) = slot {
                *flag = true;
            }
        }
        if seen != [true; 3] {
            return Err(format!("Not every analytics endpoint was used: {:?}", seen));
        }
        Ok(())
    })
}

#[test]
fn stake_without_transaction_id_fails_and_keeps_session() -> Result<(), String> {
    run_async_test(async {
        let transport =
            ScriptedTransport::default().with(endpoints::STAKE, 200, json!({ "success": true }));
        let mut h = harness(transport, staking_class()?, 5);

        h.user.execute(TaskKind::Stake).await;

        let sample = single(&mut h.samples)?;
        if sample.outcome != Outcome::failure("Staking operation failed") {
            return Err(format!("Unexpected stake sample {:?}", sample));
        }
        if h.user.session().last_transaction_id.is_some() {
            return Err("Failed stake must not store a transaction id".to_owned());
        }
        Ok(())
    })
}

#[test]
fn successful_stake_sends_scaled_amount_and_stores_transaction() -> Result<(), String> {
    run_async_test(async {
        let transport = ScriptedTransport::default().with(
            endpoints::STAKE,
            200,
            json!({ "success": true, "transactionId": "tx-42" }),
        );
        let mut h = harness(transport, staking_class()?, 6);

        h.user.execute(TaskKind::Stake).await;

        if h.user.session().last_transaction_id.as_deref() != Some("tx-42") {
            return Err(format!("Unexpected session {:?}", h.user.session()));
        }
        let requests = h.transport.requests().await;
        let body = requests
            .first()
            .and_then(|request| request.body.clone())
            .ok_or_else(|| "Stake request had no body".to_owned())?;
        let amount = body
            .get("amount")
            .and_then(Value::as_str)
            .ok_or_else(|| format!("Amount must be a string: {}", body))?;
        let allowed = [
            "1000000000000",
            "5000000000000",
            "10000000000000",
            "25000000000000",
            "50000000000000",
        ];
        if !allowed.contains(&amount) {
            return Err(format!("Unexpected amount {}", amount));
        }
        let wallet_prefix = format!("wallet_{}_", h.user.session().user_id);
        let wallet = body.get("wallet").and_then(Value::as_str).unwrap_or_default();
        if !wallet.starts_with(&wallet_prefix) {
            return Err(format!("Unexpected wallet {}", wallet));
        }
        Ok(())
    })
}

#[test]
fn claim_with_nothing_to_claim_counts_as_success() -> Result<(), String> {
    run_async_test(async {
        let transport = ScriptedTransport::default().with(
            endpoints::CLAIM,
            400,
            json!({ "error": "nothing to claim" }),
        );
        let mut h = harness(transport, staking_class()?, 7);

        h.user.execute(TaskKind::ClaimRewards).await;

        let sample = single(&mut h.samples)?;
        if !sample.outcome.is_success() || sample.status != 400 {
            return Err(format!("Unexpected claim sample {:?}", sample));
        }
        Ok(())
    })
}

#[test]
fn transport_errors_are_recorded_with_status_zero() -> Result<(), String> {
    run_async_test(async {
        let transport = ScriptedTransport {
            refuse: true,
            ..ScriptedTransport::default()
        };
        let mut h = harness(transport, staking_class()?, 8);

        h.user.execute(TaskKind::Analytics).await;

        let sample = single(&mut h.samples)?;
        if sample.status != 0
            || sample.name != endpoints::ANALYTICS
            || sample.outcome != Outcome::failure("Request failed: connection refused")
        {
            return Err(format!("Unexpected sample {:?}", sample));
        }
        Ok(())
    })
}

#[test]
fn realtime_user_subscribes_polls_and_stops_on_signal() -> Result<(), String> {
    run_async_test(async {
        let transport = ScriptedTransport::default()
            .with(endpoints::LOGIN, 200, json!({ "token": "rt" }))
            .with(endpoints::REALTIME_UPDATES, 200, json!({ "updates": [] }));
        let think = ThinkTime::new(Duration::from_millis(1), Duration::from_millis(1))
            .map_err(|err| format!("think time failed: {}", err))?;
        let class = UserClass::realtime(1, think).map_err(|err| format!("class failed: {}", err))?;
        let h = harness(transport, class, 9);

        let (stop_tx, stop_rx) = oneshot::channel();
        let handle = tokio::spawn(h.user.run(stop_rx));
        tokio::time::sleep(Duration::from_millis(30)).await;
        if stop_tx.send(()).is_err() {
            return Err("user exited before the stop signal".to_owned());
        }
        let session = tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .map_err(|err| format!("user did not stop: {}", err))?
            .map_err(|err| format!("user task failed: {}", err))?;

        if !session.user_id.starts_with("wsuser-") {
            return Err(format!("Unexpected realtime identity {}", session.user_id));
        }
        let subscribed = session.subscribed_entity_id.clone().unwrap_or_default();
        if subscribed != "inf-1" && subscribed != "inf-2" {
            return Err(format!("Unexpected subscription {:?}", session.subscribed_entity_id));
        }
        let requests = h.transport.requests().await;
        let Some((first, polls)) = requests.split_first() else {
            return Err("No requests sent".to_owned());
        };
        if first.name != endpoints::LOGIN || polls.is_empty() {
            return Err(format!("Unexpected request sequence {:?}", requests));
        }
        let expected_path = format!("/api/realtime/updates?influencerId={}", subscribed);
        if polls
            .iter()
            .any(|poll| poll.path != expected_path || poll.bearer.as_deref() != Some("rt"))
        {
            return Err(format!("Unexpected polls {:?}", polls));
        }
        Ok(())
    })
}
