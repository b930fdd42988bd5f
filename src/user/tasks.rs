use rand::Rng;
use serde_json::json;
use tracing::{debug, warn};

use crate::catalog::checks;
use crate::catalog::{
    CONTENT_FOLLOW_UP_PCT, CONTENT_ID_MAX, CatalogData, PORTFOLIO_CLAIM_PCT,
    SEARCH_FOLLOW_UP_PCT, SEARCH_LIMIT, TOP_EARNERS_LIMIT, TaskKind, pick_one, roll_percent,
};
use crate::http::ApiRequest;

use super::VirtualUser;

/// Metric names; parameterised paths share one name.
pub mod endpoints {
    pub const LOGIN: &str = "/api/auth/login";
    pub const SEARCH: &str = "/api/staking/search";
    pub const INFLUENCER_DETAILS: &str = "/api/influencers/[id]";
    pub const STAKE: &str = "/api/staking/stake";
    pub const PORTFOLIO: &str = "/api/staking/user/stakes";
    pub const CLAIM: &str = "/api/staking/claim";
    pub const ANALYTICS: &str = "/api/analytics/[endpoint]";
    pub const CONTENT_LIST: &str = "/api/content?status=published&limit=20";
    pub const CONTENT_DETAILS: &str = "/api/content/[id]";
    pub const NOTIFICATIONS: &str = "/api/notifications/unread";
    pub const REALTIME_UPDATES: &str = "/api/realtime/updates";
}

fn encode(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

impl VirtualUser {
    pub(super) async fn execute(&mut self, task: TaskKind) {
        match task {
            TaskKind::Search => self.search().await,
            TaskKind::ViewDetails => self.view_details(None).await,
            TaskKind::Stake => self.stake().await,
            TaskKind::Portfolio => self.portfolio().await,
            TaskKind::ClaimRewards => self.claim_rewards(None).await,
            TaskKind::Analytics => self.analytics().await,
            TaskKind::BrowseContent => self.browse_content().await,
            TaskKind::ViewContentDetails => self.view_content_details(None).await,
            TaskKind::Notifications => self.notifications().await,
            TaskKind::PollUpdates => self.poll_updates().await,
        }
    }

    pub(super) async fn login(&mut self) {
        let body = json!({
            "email": self.session.login_email,
            "password": self.ctx.data.password,
        });
        let request = ApiRequest::post(endpoints::LOGIN.to_owned(), endpoints::LOGIN, body);
        match self.call(request, checks::login).await {
            Some(Some(token)) => self.session.auth_token = Some(token),
            Some(None) => warn!("Login for {} returned no token", self.session.user_id),
            None => warn!("Login failed for {}", self.session.user_id),
        }
    }

    pub(super) fn subscribe(&mut self) {
        let chosen = self
            .ctx
            .data
            .random_subscription(&mut self.rng)
            .map(|influencer| influencer.id.clone());
        if chosen.is_none() {
            warn!("User {} has no influencer to subscribe to", self.id);
        }
        self.session.subscribed_entity_id = chosen;
    }

    async fn search(&mut self) {
        let Some(query) = self.ctx.data.random_query(&mut self.rng).map(encode) else {
            return;
        };
        let sort_by = CatalogData::random_sort_key(&mut self.rng);
        let path = format!(
            "/api/staking/search?query={}&sortBy={}&limit={}",
            query, sort_by, SEARCH_LIMIT
        );
        let request = ApiRequest::get(path, endpoints::SEARCH).with_bearer(self.session.bearer());
        let Some(results) = self.call(request, checks::search).await else {
            return;
        };

        if roll_percent(&mut self.rng, SEARCH_FOLLOW_UP_PCT) {
            match pick_one(&results, &mut self.rng).and_then(checks::entity_id) {
                Some(id) => self.view_details(Some(id)).await,
                None => debug!("Search result without an id; skipping details"),
            }
        }
    }

    async fn view_details(&mut self, influencer_id: Option<String>) {
        let id = match influencer_id {
            Some(id) => id,
            None => match self.ctx.data.random_influencer(&mut self.rng) {
                Some(influencer) => influencer.id.clone(),
                None => return,
            },
        };
        let request = ApiRequest::get(
            format!("/api/influencers/{}", encode(&id)),
            endpoints::INFLUENCER_DETAILS,
        )
        .with_bearer(self.session.bearer());
        self.call(request, checks::view_details).await;
    }

    async fn stake(&mut self) {
        let Some(influencer_id) = self
            .ctx
            .data
            .random_influencer(&mut self.rng)
            .map(|influencer| influencer.id.clone())
        else {
            return;
        };
        let Some(amount) = self.ctx.data.random_stake_amount(&mut self.rng) else {
            return;
        };
        let body = json!({
            "influencerId": influencer_id,
            "amount": amount.to_string(),
            "wallet": format!("wallet_{}_{}", self.session.user_id, chrono::Utc::now().timestamp()),
        });
        let request = ApiRequest::post(endpoints::STAKE.to_owned(), endpoints::STAKE, body)
            .with_bearer(self.session.bearer());
        if let Some(transaction_id) = self.call(request, checks::stake).await {
            self.session.last_transaction_id = Some(transaction_id);
        }
    }

    async fn portfolio(&mut self) {
        let request = ApiRequest::get(endpoints::PORTFOLIO.to_owned(), endpoints::PORTFOLIO)
            .with_bearer(self.session.bearer());
        let Some(stakes) = self.call(request, checks::portfolio).await else {
            return;
        };

        if !stakes.is_empty() && roll_percent(&mut self.rng, PORTFOLIO_CLAIM_PCT) {
            match pick_one(&stakes, &mut self.rng).and_then(checks::stake_influencer_id) {
                Some(id) => self.claim_rewards(Some(id)).await,
                None => debug!("Stake without influencer id; skipping claim"),
            }
        }
    }

    async fn claim_rewards(&mut self, influencer_id: Option<String>) {
        let id = match influencer_id {
            Some(id) => id,
            None => match self.ctx.data.random_influencer(&mut self.rng) {
                Some(influencer) => influencer.id.clone(),
                None => return,
            },
        };
        let body = json!({
            "influencerId": id,
            "wallet": format!("wallet_{}", self.session.user_id),
        });
        let request = ApiRequest::post(endpoints::CLAIM.to_owned(), endpoints::CLAIM, body)
            .with_bearer(self.session.bearer());
        self.call(request, checks::claim_rewards).await;
    }

    async fn analytics(&mut self) {
        let range = CatalogData::random_time_range(&mut self.rng);
        let path = match self.rng.gen_range(0..3u8) {
            0 => format!("/api/analytics/overview?timeRange={}", range),
            1 => format!("/api/analytics/portfolio/performance?period={}", range),
            _ => format!("/api/analytics/top-earners?limit={}", TOP_EARNERS_LIMIT),
        };
        let request =
            ApiRequest::get(path, endpoints::ANALYTICS).with_bearer(self.session.bearer());
        self.call(request, checks::status_ok).await;
    }

    async fn browse_content(&mut self) {
        let request = ApiRequest::get(endpoints::CONTENT_LIST.to_owned(), endpoints::CONTENT_LIST)
            .with_bearer(self.session.bearer());
        let Some(items) = self.call(request, checks::browse_content).await else {
            return;
        };

        if !items.is_empty() && roll_percent(&mut self.rng, CONTENT_FOLLOW_UP_PCT) {
            match pick_one(&items, &mut self.rng).and_then(checks::entity_id) {
                Some(id) => self.view_content_details(Some(id)).await,
                None => debug!("Content item without an id; skipping details"),
            }
        }
    }

    async fn view_content_details(&mut self, content_id: Option<String>) {
        let id = content_id
            .unwrap_or_else(|| format!("content-{}", self.rng.gen_range(1..=CONTENT_ID_MAX)));
        let request = ApiRequest::get(
            format!("/api/content/{}", encode(&id)),
            endpoints::CONTENT_DETAILS,
        )
        .with_bearer(self.session.bearer());
        self.call(request, checks::status_ok).await;
    }

    async fn notifications(&mut self) {
        let request =
            ApiRequest::get(endpoints::NOTIFICATIONS.to_owned(), endpoints::NOTIFICATIONS)
                .with_bearer(self.session.bearer());
        self.call(request, checks::status_ok).await;
    }

    async fn poll_updates(&mut self) {
        if self.session.subscribed_entity_id.is_none() {
            self.subscribe();
        }
        let Some(id) = self.session.subscribed_entity_id.as_deref() else {
            return;
        };
        let request = ApiRequest::get(
            format!("/api/realtime/updates?influencerId={}", encode(id)),
            endpoints::REALTIME_UPDATES,
        )
        .with_bearer(self.session.bearer());
        self.call(request, checks::status_ok).await;
    }
}
