use std::sync::Arc;

use chrono::{DateTime, Months, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::{
    cache::QueryCache,
    capacity::{
        self, auto_fill, borrow_limit, check_borrow, collateral_ratio, fee_split,
        from_base_units, health_band, lp_redemption, service_fee, spendable_collateral,
        to_base_units, total_obligation, valuation_price, AutoFill, FeeSplit, HealthBand,
    },
    config::{Config, ProtocolParams},
    decode::{decode_credit_profile, decode_pool, decode_position, total_balance},
    error::{DashboardError, Result},
    models::{
        AmountRequest, BorrowForm, BorrowRequest, ClaimRequest, CreditProfile, CreditTier,
        DepositRequest, LiquidityPool, LiquidityRequest, Position, RepayRequest,
        SignedTransaction, SubmitResponse, WalletBalances,
    },
    oracle::{PriceFeed, PriceQuote},
    refresh::{RefreshGeneration, RefreshHandle},
    sui::{parse_address, LedgerRpc},
    tx::{self, Funding, TransactionIntent},
};

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    PoolEmpty,
    MissingCollateral,
    MissingAmount,
    CollateralExceedsWallet,
    NoGasLeft,
    InvalidTerm,
    ExceedsCapacity,
    ExceedsLiquidity,
    NotAgreed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum BorrowDecision {
    Allowed,
    Rejected(RejectReason),
}

impl BorrowDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, BorrowDecision::Allowed)
    }
}

/// Observed state a borrow form is evaluated against, in display units.
#[derive(Debug, Clone, Copy)]
pub struct BorrowInputs {
    pub wallet_collateral: Decimal,
    pub liquidity: Decimal,
    pub price: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct BorrowQuote {
    pub price: Decimal,
    pub wallet_collateral: Decimal,
    pub collateral: Decimal,
    pub amount: Decimal,
    pub capacity: Decimal,
    pub liquidity: Decimal,
    pub limit: Decimal,
    pub service_fee: Decimal,
    pub total_obligation: Decimal,
    pub fee_split: FeeSplit,
    pub term_months: u64,
    pub due_by: Option<DateTime<Utc>>,
    pub auto_fill: Option<AutoFill>,
    pub decision: BorrowDecision,
}

/// Evaluates the borrow form. Empty collateral and amount fields take the
/// auto-fill suggestion. Never fails: a bad form yields a rejected decision.
pub fn evaluate_borrow(
    collateral: Option<Decimal>,
    amount: Option<Decimal>,
    term_months: Option<u64>,
    agreed: bool,
    inputs: BorrowInputs,
    params: &ProtocolParams,
    now: DateTime<Utc>,
) -> BorrowQuote {
    let suggestion = auto_fill(inputs.wallet_collateral, inputs.price, inputs.liquidity, params);
    let (collateral, amount) = match (collateral, amount, suggestion) {
        (None, None, Some(fill)) => (Some(fill.collateral), Some(fill.amount)),
        other => (other.0, other.1),
    };
    let term_months = term_months.unwrap_or(params.default_term_months);

    let pledged = collateral.unwrap_or(Decimal::ZERO);
    let requested = amount.unwrap_or(Decimal::ZERO);
    let capacity = capacity::capacity(pledged, inputs.price, params);
    let fee = service_fee(requested, params.service_fee_rate);

    let decision = if inputs.liquidity <= Decimal::ZERO {
        BorrowDecision::Rejected(RejectReason::PoolEmpty)
    } else if pledged <= Decimal::ZERO {
        BorrowDecision::Rejected(RejectReason::MissingCollateral)
    } else if requested <= Decimal::ZERO {
        BorrowDecision::Rejected(RejectReason::MissingAmount)
    } else if pledged > inputs.wallet_collateral {
        BorrowDecision::Rejected(RejectReason::CollateralExceedsWallet)
    } else if pledged > spendable_collateral(inputs.wallet_collateral, params) {
        BorrowDecision::Rejected(RejectReason::NoGasLeft)
    } else if term_months < params.min_term_months || term_months > params.max_term_months {
        BorrowDecision::Rejected(RejectReason::InvalidTerm)
    } else {
        match check_borrow(requested, capacity, inputs.liquidity) {
            Err(DashboardError::ExceedsCapacity { .. }) => {
                BorrowDecision::Rejected(RejectReason::ExceedsCapacity)
            }
            Err(DashboardError::ExceedsLiquidity { .. }) => {
                BorrowDecision::Rejected(RejectReason::ExceedsLiquidity)
            }
            Err(_) => BorrowDecision::Rejected(RejectReason::MissingAmount),
            Ok(()) if !agreed => BorrowDecision::Rejected(RejectReason::NotAgreed),
            Ok(()) => BorrowDecision::Allowed,
        }
    };

    BorrowQuote {
        price: inputs.price,
        wallet_collateral: inputs.wallet_collateral,
        collateral: pledged,
        amount: requested,
        capacity,
        liquidity: inputs.liquidity,
        limit: borrow_limit(capacity, inputs.liquidity),
        service_fee: fee,
        total_obligation: total_obligation(requested, params.service_fee_rate),
        fee_split: fee_split(fee, params),
        term_months,
        due_by: u32::try_from(term_months)
            .ok()
            .and_then(|months| now.checked_add_months(Months::new(months))),
        auto_fill: suggestion,
        decision,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionStatus {
    Active,
    Expired,
    Claimable,
    Closed,
}

#[derive(Debug, Clone, Serialize)]
pub struct PositionView {
    pub object_id: String,
    pub short_id: String,
    pub principal: Decimal,
    pub service_fee: Decimal,
    pub total_due: Decimal,
    pub collateral: Decimal,
    pub collateral_value: Decimal,
    pub collateral_ratio: Option<Decimal>,
    pub health: HealthBand,
    pub deadline: Option<DateTime<Utc>>,
    pub time_remaining: String,
    pub status: PositionStatus,
}

pub fn position_view(
    position: &Position,
    price: Decimal,
    params: &ProtocolParams,
    now: DateTime<Utc>,
) -> PositionView {
    let principal = from_base_units(position.principal_debt, params);
    let fee = from_base_units(position.fee_debt, params);
    let total_due = principal + fee;
    let collateral = from_base_units(position.collateral, params);
    let collateral_value = collateral.saturating_mul(price);
    let ratio = collateral_ratio(collateral_value, total_due);

    let (time_remaining, expired) = match position.deadline {
        None => ("Not set".to_string(), false),
        Some(deadline) => {
            let left_ms = (deadline - now).num_milliseconds();
            let days = (left_ms / DAY_MS).max(0);
            (format!("{}m {}d left", days / 30, days % 30), left_ms < 0)
        }
    };

    let status = match (position.total_debt(), position.collateral) {
        (0, 0) => PositionStatus::Closed,
        (0, _) => PositionStatus::Claimable,
        _ if expired => PositionStatus::Expired,
        _ => PositionStatus::Active,
    };

    PositionView {
        object_id: position.object_id.clone(),
        short_id: position.object_id.chars().take(6).collect(),
        principal,
        service_fee: fee,
        total_due,
        collateral,
        collateral_value,
        collateral_ratio: ratio,
        health: health_band(ratio, params),
        deadline: position.deadline,
        time_remaining,
        status,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CreditScoreView {
    pub score: u64,
    pub tier: u8,
    pub tier_name: CreditTier,
    pub discount_percent: u8,
    /// Share of the 0..=1000 gauge filled.
    pub gauge: Decimal,
    pub on_chain: bool,
}

pub fn credit_view(profile: &CreditProfile) -> CreditScoreView {
    CreditScoreView {
        score: profile.score,
        tier: profile.tier,
        tier_name: CreditTier::from_level(profile.tier),
        discount_percent: profile.tier,
        gauge: Decimal::from(profile.score.min(1000)) / Decimal::from(1000u64),
        on_chain: profile.object_id.is_some(),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProtocolStats {
    pub available_liquidity: Decimal,
    pub cash_reserve: Decimal,
    pub staked_reserve: Decimal,
    pub reward_reserve: Decimal,
    pub waqf_reserve: Decimal,
    pub maintenance_reserve: Decimal,
    pub total_collateral_locked: Decimal,
    pub total_lp_supply: Decimal,
}

pub fn protocol_stats(pool: &LiquidityPool, params: &ProtocolParams) -> ProtocolStats {
    let units = |v: u64| from_base_units(v, params);
    ProtocolStats {
        available_liquidity: units(pool.available_liquidity()),
        cash_reserve: units(pool.cash_reserve),
        staked_reserve: units(pool.staked_reserve),
        reward_reserve: units(pool.reward_reserve),
        waqf_reserve: units(pool.waqf_reserve),
        maintenance_reserve: units(pool.maintenance_reserve),
        total_collateral_locked: units(pool.total_collateral_locked),
        total_lp_supply: units(pool.total_lp_supply),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PoolView {
    pub wallet_buck: Decimal,
    pub lp_shares: Decimal,
    pub redeemable: Decimal,
    pub lp_fee_share: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct InsightBar {
    pub available_base: Decimal,
    pub available_buck: Decimal,
    pub max_borrow_potential: Decimal,
    pub protocol_capacity: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub owner: String,
    pub price: PriceQuote,
    pub valuation_price: Decimal,
    pub insight: InsightBar,
    pub credit: CreditScoreView,
    pub positions: Vec<PositionView>,
    pub pool: PoolView,
    pub stats: ProtocolStats,
    pub refresh: RefreshGeneration,
}

/// Composes ledger reads, the price feed and the refresh coordinator into
/// the views and intents the browser asks for.
pub struct Dashboard {
    config: Arc<Config>,
    rpc: Arc<dyn LedgerRpc>,
    cache: Arc<QueryCache>,
    price: Arc<PriceFeed>,
    refresh: RefreshHandle,
}

impl Dashboard {
    pub fn new(
        config: Arc<Config>,
        rpc: Arc<dyn LedgerRpc>,
        cache: Arc<QueryCache>,
        price: Arc<PriceFeed>,
        refresh: RefreshHandle,
    ) -> Self {
        Self {
            config,
            rpc,
            cache,
            price,
            refresh,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn params(&self) -> &ProtocolParams {
        &self.config.params
    }

    pub fn price_quote(&self) -> PriceQuote {
        self.price.quote()
    }

    pub fn valuation_price(&self) -> Decimal {
        valuation_price(self.params(), &self.price.quote())
    }

    pub fn refresh_generation(&self) -> RefreshGeneration {
        self.refresh.current()
    }

    pub fn subscribe_refresh(&self) -> tokio::sync::watch::Receiver<RefreshGeneration> {
        self.refresh.subscribe()
    }

    pub async fn wallet_balances(&self, owner: &str) -> Result<WalletBalances> {
        let deployment = &self.config.deployment;
        let buck_type = deployment.buck_coin_type();
        let lp_type = deployment.lp_coin_type();
        let (base, buck, lp) = tokio::try_join!(
            self.cache.coins(owner, deployment.base_coin_type()),
            self.cache.coins(owner, &buck_type),
            self.cache.coins(owner, &lp_type),
        )?;
        Ok(WalletBalances {
            base: total_balance(&base),
            buck: total_balance(&buck),
            lp: total_balance(&lp),
        })
    }

    /// Coin object ids of `coin_type`, largest first.
    async fn coin_ids(&self, owner: &str, coin_type: &str) -> Result<Vec<String>> {
        let mut coins = self.cache.coins(owner, coin_type).await?;
        coins.sort_by(|a, b| b.balance.cmp(&a.balance));
        Ok(coins.into_iter().map(|c| c.coin_object_id).collect())
    }

    pub async fn pool(&self) -> Result<LiquidityPool> {
        let object = self
            .cache
            .object(&self.config.deployment.lending_pool_id)
            .await?;
        decode_pool(&object)
    }

    pub async fn positions(&self, owner: &str) -> Result<Vec<Position>> {
        let struct_type = self.config.deployment.vault_struct_type();
        let objects = self.cache.owned_objects(owner, &struct_type).await?;
        objects.iter().map(decode_position).collect()
    }

    async fn position(&self, owner: &str, vault_id: &str) -> Result<Position> {
        self.positions(owner)
            .await?
            .into_iter()
            .find(|p| p.object_id.eq_ignore_ascii_case(vault_id))
            .ok_or_else(|| DashboardError::ObjectNotFound(vault_id.to_string()))
    }

    /// The wallet's credit profile, or the neutral default when it has none.
    pub async fn credit_profile(&self, owner: &str) -> Result<CreditProfile> {
        let struct_type = self.config.deployment.credit_score_struct_type();
        let objects = self.cache.owned_objects(owner, &struct_type).await?;
        match objects.first() {
            Some(object) => decode_credit_profile(object),
            None => Ok(CreditProfile {
                object_id: None,
                score: self.params().default_credit_score,
                tier: self.params().default_credit_tier,
            }),
        }
    }

    pub async fn stats(&self) -> Result<ProtocolStats> {
        Ok(protocol_stats(&self.pool().await?, self.params()))
    }

    pub async fn snapshot(&self, owner: &str) -> Result<DashboardView> {
        let owner = parse_address(owner)?;
        let (balances, pool, positions, profile) = tokio::try_join!(
            self.wallet_balances(&owner),
            self.pool(),
            self.positions(&owner),
            self.credit_profile(&owner),
        )?;

        let params = self.params();
        let quote = self.price.quote();
        let price = valuation_price(params, &quote);
        let now = Utc::now();
        let available_base = from_base_units(balances.base, params);

        Ok(DashboardView {
            insight: InsightBar {
                available_base,
                available_buck: from_base_units(balances.buck, params),
                max_borrow_potential: capacity::capacity(available_base, price, params),
                protocol_capacity: from_base_units(pool.available_liquidity(), params),
            },
            credit: credit_view(&profile),
            positions: positions
                .iter()
                .map(|p| position_view(p, price, params, now))
                .collect(),
            pool: PoolView {
                wallet_buck: from_base_units(balances.buck, params),
                lp_shares: from_base_units(balances.lp, params),
                redeemable: from_base_units(lp_redemption(balances.lp, &pool), params),
                lp_fee_share: params.lp_fee_share,
            },
            stats: protocol_stats(&pool, params),
            owner,
            price: quote,
            valuation_price: price,
            refresh: self.refresh.current(),
        })
    }

    pub async fn position_views(&self, owner: &str) -> Result<Vec<PositionView>> {
        let owner = parse_address(owner)?;
        let params = self.params();
        let price = self.valuation_price();
        let now = Utc::now();
        Ok(self
            .positions(&owner)
            .await?
            .iter()
            .map(|p| position_view(p, price, params, now))
            .collect())
    }

    pub async fn credit(&self, owner: &str) -> Result<CreditScoreView> {
        let owner = parse_address(owner)?;
        Ok(credit_view(&self.credit_profile(&owner).await?))
    }

    pub async fn quote_borrow(&self, form: &BorrowForm) -> Result<BorrowQuote> {
        let owner = parse_address(&form.owner)?;
        let (balances, pool) = tokio::try_join!(self.wallet_balances(&owner), self.pool())?;
        let params = self.params();
        let inputs = BorrowInputs {
            wallet_collateral: from_base_units(balances.base, params),
            liquidity: from_base_units(pool.available_liquidity(), params),
            price: self.valuation_price(),
        };
        Ok(evaluate_borrow(
            form.collateral,
            form.amount,
            form.term_months,
            form.agreed,
            inputs,
            params,
            Utc::now(),
        ))
    }

    fn term(&self, term_months: Option<u64>) -> Result<u64> {
        let params = self.params();
        let term = term_months.unwrap_or(params.default_term_months);
        if term < params.min_term_months || term > params.max_term_months {
            return Err(DashboardError::InvalidTerm {
                got: term,
                min: params.min_term_months,
                max: params.max_term_months,
            });
        }
        Ok(term)
    }

    pub async fn open_position_intent(&self, form: &BorrowForm) -> Result<TransactionIntent> {
        let owner = parse_address(&form.owner)?;
        let collateral = form.collateral.ok_or(DashboardError::MissingField("collateral"))?;
        let amount = form.amount.ok_or(DashboardError::MissingField("amount"))?;
        let term = self.term(form.term_months)?;

        let quote = self.quote_borrow(form).await?;
        if let BorrowDecision::Rejected(reason) = quote.decision {
            return Err(match reason {
                RejectReason::ExceedsCapacity => DashboardError::ExceedsCapacity {
                    requested: quote.amount,
                    capacity: quote.capacity,
                },
                RejectReason::ExceedsLiquidity | RejectReason::PoolEmpty => {
                    DashboardError::ExceedsLiquidity {
                        requested: quote.amount,
                        liquidity: quote.liquidity,
                    }
                }
                RejectReason::NotAgreed => DashboardError::MissingField("agreed"),
                RejectReason::MissingCollateral => DashboardError::MissingField("collateral"),
                RejectReason::MissingAmount => DashboardError::MissingField("amount"),
                RejectReason::CollateralExceedsWallet => DashboardError::InvalidAmount(format!(
                    "collateral {} exceeds wallet balance {}",
                    quote.collateral, quote.wallet_collateral
                )),
                RejectReason::NoGasLeft => DashboardError::InvalidAmount(format!(
                    "collateral {} leaves less than the {} gas reserve",
                    quote.collateral,
                    self.params().gas_reserve
                )),
                RejectReason::InvalidTerm => DashboardError::InvalidTerm {
                    got: quote.term_months,
                    min: self.params().min_term_months,
                    max: self.params().max_term_months,
                },
            });
        }

        let profile = self.credit_profile(&owner).await?;
        tx::open_position(
            &self.config.deployment,
            &owner,
            to_base_units(collateral, self.params())?,
            to_base_units(amount, self.params())?,
            term,
            profile.object_id.as_deref(),
        )
    }

    pub async fn deposit_intent(&self, req: &DepositRequest) -> Result<TransactionIntent> {
        let owner = parse_address(&req.owner)?;
        let units = to_base_units(req.amount, self.params())?;
        let reserve = to_base_units(self.params().gas_reserve, self.params())?;
        let balances = self.wallet_balances(&owner).await?;
        if units.saturating_add(reserve) > balances.base {
            return Err(DashboardError::InvalidAmount(format!(
                "deposit {} leaves less than the {} gas reserve in a balance of {}",
                req.amount,
                self.params().gas_reserve,
                from_base_units(balances.base, self.params())
            )));
        }
        let vault = self.position(&owner, &req.vault_id).await?;
        tx::deposit_collateral(&self.config.deployment, &owner, &vault.object_id, units)
    }

    /// Borrows more against an existing vault; headroom is the vault's
    /// capacity less principal already drawn.
    pub async fn borrow_intent(&self, req: &BorrowRequest) -> Result<TransactionIntent> {
        let owner = parse_address(&req.owner)?;
        let term = self.term(req.term_months)?;
        let params = self.params();
        let (vault, pool) = tokio::try_join!(self.position(&owner, &req.vault_id), self.pool())?;

        let vault_capacity = capacity::capacity(
            from_base_units(vault.collateral, params),
            self.valuation_price(),
            params,
        );
        let headroom =
            (vault_capacity - from_base_units(vault.principal_debt, params)).max(Decimal::ZERO);
        check_borrow(
            req.amount,
            headroom,
            from_base_units(pool.available_liquidity(), params),
        )?;

        let credit_score_id = match &req.credit_score_id {
            Some(id) => Some(id.clone()),
            None => self.credit_profile(&owner).await?.object_id,
        };
        tx::borrow(
            &self.config.deployment,
            &owner,
            &vault.object_id,
            to_base_units(req.amount, params)?,
            term,
            credit_score_id.as_deref(),
        )
    }

    pub async fn repay_intent(&self, req: &RepayRequest) -> Result<TransactionIntent> {
        let owner = parse_address(&req.owner)?;
        let params = self.params();
        let units = to_base_units(req.amount, params)?;
        let vault = self.position(&owner, &req.vault_id).await?;
        if units > vault.total_debt() {
            return Err(DashboardError::InvalidAmount(format!(
                "repayment {} exceeds outstanding {}",
                req.amount,
                from_base_units(vault.total_debt(), params)
            )));
        }
        let balances = self.wallet_balances(&owner).await?;
        if units > balances.buck {
            return Err(DashboardError::InvalidAmount(format!(
                "repayment {} exceeds wallet BUCK {}",
                req.amount,
                from_base_units(balances.buck, params)
            )));
        }
        let coins = self
            .coin_ids(&owner, &self.config.deployment.buck_coin_type())
            .await?;
        let credit_score_id = match &req.credit_score_id {
            Some(id) => Some(id.clone()),
            None => self.credit_profile(&owner).await?.object_id,
        };
        tx::repay(
            &self.config.deployment,
            &owner,
            &vault.object_id,
            &coins,
            units,
            credit_score_id.as_deref(),
        )
    }

    pub async fn repay_with_collateral_intent(
        &self,
        req: &RepayRequest,
    ) -> Result<TransactionIntent> {
        let owner = parse_address(&req.owner)?;
        let params = self.params();
        let units = to_base_units(req.amount, params)?;
        let vault = self.position(&owner, &req.vault_id).await?;
        if vault.total_debt() == 0 {
            return Err(DashboardError::InvalidAmount("vault has no outstanding debt".into()));
        }
        if units > vault.collateral {
            return Err(DashboardError::InvalidAmount(format!(
                "{} exceeds locked collateral {}",
                req.amount,
                from_base_units(vault.collateral, params)
            )));
        }
        let credit_score_id = match &req.credit_score_id {
            Some(id) => Some(id.clone()),
            None => self.credit_profile(&owner).await?.object_id,
        };
        tx::repay_with_collateral(
            &self.config.deployment,
            &owner,
            &vault.object_id,
            units,
            credit_score_id.as_deref(),
        )
    }

    pub async fn claim_intent(&self, req: &ClaimRequest) -> Result<TransactionIntent> {
        let owner = parse_address(&req.owner)?;
        let vault = self.position(&owner, &req.vault_id).await?;
        if vault.total_debt() > 0 {
            return Err(DashboardError::InvalidAmount(
                "vault still has outstanding debt".into(),
            ));
        }
        if vault.collateral == 0 {
            return Err(DashboardError::InvalidAmount("vault holds no collateral".into()));
        }
        tx::claim_collateral(&self.config.deployment, &owner, &vault.object_id)
    }

    pub async fn provide_intent(&self, req: &LiquidityRequest) -> Result<TransactionIntent> {
        let owner = parse_address(&req.owner)?;
        let params = self.params();
        let units = to_base_units(req.amount, params)?;
        let funding = if req.use_faucet {
            Funding::Faucet
        } else {
            let balances = self.wallet_balances(&owner).await?;
            if units > balances.buck {
                return Err(DashboardError::InvalidAmount(format!(
                    "deposit {} exceeds wallet BUCK {}",
                    req.amount,
                    from_base_units(balances.buck, params)
                )));
            }
            Funding::Wallet(
                self.coin_ids(&owner, &self.config.deployment.buck_coin_type())
                    .await?,
            )
        };
        tx::provide_liquidity(&self.config.deployment, &owner, &funding, units)
    }

    pub async fn withdraw_intent(&self, req: &AmountRequest) -> Result<TransactionIntent> {
        let owner = parse_address(&req.owner)?;
        let params = self.params();
        let units = to_base_units(req.amount, params)?;
        let balances = self.wallet_balances(&owner).await?;
        if units > balances.lp {
            return Err(DashboardError::InvalidAmount(format!(
                "withdrawal {} exceeds LP shares {}",
                req.amount,
                from_base_units(balances.lp, params)
            )));
        }
        let coins = self
            .coin_ids(&owner, &self.config.deployment.lp_coin_type())
            .await?;
        tx::remove_liquidity(&self.config.deployment, &owner, &coins, units)
    }

    pub fn faucet_intent(&self, req: &AmountRequest) -> Result<TransactionIntent> {
        let owner = parse_address(&req.owner)?;
        let units = to_base_units(req.amount, self.params())?;
        tx::mint_test_asset(&self.config.deployment, &owner, units)
    }

    /// Forwards a wallet-signed transaction. On success the refresh
    /// coordinator is told about the commit.
    pub async fn submit(&self, signed: &SignedTransaction) -> Result<SubmitResponse> {
        tx::validate_signed(signed)?;
        let sender = signed.sender.as_deref().map(parse_address).transpose()?;

        let result = self
            .rpc
            .execute_transaction(&signed.tx_bytes, &signed.signatures)
            .await
            .map_err(|e| DashboardError::Submission(e.to_string()))?;
        if let Some(reason) = result.failure() {
            tracing::warn!(digest = %result.digest, %reason, "transaction aborted");
            return Err(DashboardError::Submission(reason));
        }

        tracing::info!(digest = %result.digest, "✅ transaction committed");
        self.refresh
            .transaction_committed(result.digest.clone(), sender);
        Ok(SubmitResponse {
            digest: result.digest,
            status: "success",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
    }

    fn inputs() -> BorrowInputs {
        BorrowInputs {
            wallet_collateral: dec!(10),
            liquidity: dec!(1000),
            price: dec!(0.70),
        }
    }

    fn quote(collateral: Decimal, amount: Decimal) -> BorrowQuote {
        evaluate_borrow(
            Some(collateral),
            Some(amount),
            None,
            true,
            inputs(),
            &ProtocolParams::default(),
            now(),
        )
    }

    #[test]
    fn allowed_quote_carries_fee_and_obligation() {
        let q = quote(dec!(9), dec!(4));
        assert_eq!(q.decision, BorrowDecision::Allowed);
        assert_eq!(q.service_fee, dec!(0.4));
        assert_eq!(q.total_obligation, dec!(4.4));
        assert_eq!(q.term_months, 6);
        assert_eq!(q.due_by, Some(Utc.with_ymd_and_hms(2026, 7, 1, 0, 0, 0).unwrap()));
    }

    #[test]
    fn empty_form_is_auto_filled() {
        let p = ProtocolParams::default();
        let q = evaluate_borrow(None, None, None, true, inputs(), &p, now());
        assert_eq!(q.collateral, dec!(9));
        assert_eq!(q.amount, dec!(4.2));
        assert_eq!(q.decision, BorrowDecision::Allowed);
    }

    #[test]
    fn rejections_are_values() {
        let p = ProtocolParams::default();
        let reject = |q: BorrowQuote| match q.decision {
            BorrowDecision::Rejected(reason) => reason,
            BorrowDecision::Allowed => panic!("expected rejection"),
        };

        assert_eq!(reject(quote(dec!(11), dec!(1))), RejectReason::CollateralExceedsWallet);
        assert_eq!(reject(quote(dec!(10), dec!(1))), RejectReason::NoGasLeft);
        assert_eq!(reject(quote(dec!(9), dec!(5))), RejectReason::ExceedsCapacity);
        assert_eq!(reject(quote(dec!(0), dec!(1))), RejectReason::MissingCollateral);
        assert_eq!(reject(quote(dec!(9), dec!(0))), RejectReason::MissingAmount);

        let not_agreed = evaluate_borrow(
            Some(dec!(9)),
            Some(dec!(1)),
            None,
            false,
            inputs(),
            &p,
            now(),
        );
        assert_eq!(reject(not_agreed), RejectReason::NotAgreed);

        let long_term =
            evaluate_borrow(Some(dec!(9)), Some(dec!(1)), Some(25), true, inputs(), &p, now());
        assert_eq!(reject(long_term), RejectReason::InvalidTerm);

        let dry_pool = BorrowInputs {
            liquidity: Decimal::ZERO,
            ..inputs()
        };
        let empty = evaluate_borrow(Some(dec!(9)), Some(dec!(1)), None, true, dry_pool, &p, now());
        assert_eq!(reject(empty), RejectReason::PoolEmpty);

        let shallow_pool = BorrowInputs {
            liquidity: dec!(2),
            ..inputs()
        };
        let shallow =
            evaluate_borrow(Some(dec!(9)), Some(dec!(3)), None, true, shallow_pool, &p, now());
        assert_eq!(reject(shallow), RejectReason::ExceedsLiquidity);
    }

    #[test]
    fn pledging_the_whole_wallet_leaves_no_gas() {
        let all_in = quote(dec!(10), dec!(1));
        assert_eq!(all_in.decision, BorrowDecision::Rejected(RejectReason::NoGasLeft));

        let at_reserve = quote(dec!(9.95), dec!(1));
        assert_eq!(at_reserve.decision, BorrowDecision::Allowed);

        let no_reserve = ProtocolParams {
            gas_reserve: Decimal::ZERO,
            ..ProtocolParams::default()
        };
        let gas_elsewhere = evaluate_borrow(
            Some(dec!(10)),
            Some(dec!(1)),
            None,
            true,
            inputs(),
            &no_reserve,
            now(),
        );
        assert_eq!(gas_elsewhere.decision, BorrowDecision::Allowed);
    }

    fn position(debt: u64, collateral: u64, deadline: Option<DateTime<Utc>>) -> Position {
        Position {
            object_id: "0x9f3a77bb".into(),
            collateral,
            principal_debt: debt,
            fee_debt: debt / 10,
            deadline,
        }
    }

    #[test]
    fn position_counts_down_to_deadline() {
        let deadline = now() + chrono::Duration::days(75);
        let view = position_view(
            &position(4_000_000_000, 10_000_000_000, Some(deadline)),
            dec!(0.70),
            &ProtocolParams::default(),
            now(),
        );
        assert_eq!(view.short_id, "0x9f3a");
        assert_eq!(view.total_due, dec!(4.4));
        assert_eq!(view.time_remaining, "2m 15d left");
        assert_eq!(view.status, PositionStatus::Active);
        assert_eq!(view.collateral_value, dec!(7));
        assert_eq!(view.health, HealthBand::Warning);
    }

    #[test]
    fn past_deadline_is_expired() {
        let deadline = now() - chrono::Duration::days(1);
        let view = position_view(
            &position(1_000_000_000, 1_000_000_000, Some(deadline)),
            dec!(0.70),
            &ProtocolParams::default(),
            now(),
        );
        assert_eq!(view.status, PositionStatus::Expired);
        assert_eq!(view.time_remaining, "0m 0d left");
        assert_eq!(view.health, HealthBand::AtRisk);
    }

    #[test]
    fn repaid_vault_is_claimable_then_closed() {
        let p = ProtocolParams::default();
        let claimable = position_view(&position(0, 5, None), dec!(1), &p, now());
        assert_eq!(claimable.status, PositionStatus::Claimable);
        assert_eq!(claimable.time_remaining, "Not set");
        assert_eq!(claimable.collateral_ratio, None);

        let closed = position_view(&position(0, 0, None), dec!(1), &p, now());
        assert_eq!(closed.status, PositionStatus::Closed);
    }

    #[test]
    fn credit_tiers() {
        let view = credit_view(&CreditProfile {
            object_id: None,
            score: 500,
            tier: 3,
        });
        assert_eq!(view.tier_name, CreditTier::Fair);
        assert_eq!(view.discount_percent, 3);
        assert_eq!(view.gauge, dec!(0.5));
        assert!(!view.on_chain);

        let top = credit_view(&CreditProfile {
            object_id: Some("0x5".into()),
            score: 910,
            tier: 5,
        });
        assert_eq!(top.tier_name, CreditTier::Muttaqin);
        assert_eq!(CreditTier::from_level(4), CreditTier::Shalih);
    }
}
