//! Transaction intents for the emergency fund package.
//!
//! An intent is an ordered list of commands over numbered inputs, the shape
//! a wallet turns into one atomic programmable transaction. Amounts are
//! already scaled to base units.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Serialize;

use crate::{
    config::{Deployment, MODULE_BUCKET_MOCK, MODULE_CREDIT_SCORE, MODULE_EMERGENCY_FUND},
    error::{DashboardError, Result},
    models::SignedTransaction,
};

/// Collateral and debt recorded on the mock CDP bottle `borrow` requires.
const MOCK_BOTTLE_COLLATERAL: u64 = 1000;
const MOCK_BOTTLE_DEBT: u64 = 0;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CallArg {
    Object { object_id: String },
    Pure { value_type: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Argument {
    GasCoin,
    Input { index: u16 },
    Result { index: u16 },
    NestedResult { index: u16, result: u16 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Command {
    MoveCall {
        target: String,
        type_arguments: Vec<String>,
        arguments: Vec<Argument>,
    },
    SplitCoins {
        coin: Argument,
        amounts: Vec<Argument>,
    },
    MergeCoins {
        destination: Argument,
        sources: Vec<Argument>,
    },
    TransferObjects {
        objects: Vec<Argument>,
        address: Argument,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionIntent {
    pub action: &'static str,
    pub sender: String,
    pub inputs: Vec<CallArg>,
    pub commands: Vec<Command>,
}

impl TransactionIntent {
    /// `package::module::function` of every move call, in order.
    pub fn call_targets(&self) -> Vec<&str> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                Command::MoveCall { target, .. } => Some(target.as_str()),
                _ => None,
            })
            .collect()
    }
}

pub struct TransactionBuilder<'a> {
    deployment: &'a Deployment,
    sender: String,
    inputs: Vec<CallArg>,
    commands: Vec<Command>,
}

impl<'a> TransactionBuilder<'a> {
    pub fn new(deployment: &'a Deployment, sender: impl Into<String>) -> Self {
        Self {
            deployment,
            sender: sender.into(),
            inputs: Vec::new(),
            commands: Vec::new(),
        }
    }

    fn input(&mut self, arg: CallArg) -> Argument {
        if let Some(pos) = self.inputs.iter().position(|existing| *existing == arg) {
            return Argument::Input { index: pos as u16 };
        }
        self.inputs.push(arg);
        Argument::Input {
            index: (self.inputs.len() - 1) as u16,
        }
    }

    fn push(&mut self, command: Command) -> u16 {
        self.commands.push(command);
        (self.commands.len() - 1) as u16
    }

    pub fn object(&mut self, object_id: &str) -> Argument {
        self.input(CallArg::Object {
            object_id: object_id.to_string(),
        })
    }

    pub fn pure_u64(&mut self, value: u64) -> Argument {
        self.input(CallArg::Pure {
            value_type: "u64",
            value: value.to_string(),
        })
    }

    pub fn pure_address(&mut self, address: &str) -> Argument {
        self.input(CallArg::Pure {
            value_type: "address",
            value: address.to_string(),
        })
    }

    pub fn move_call(
        &mut self,
        module: &str,
        function: &str,
        arguments: Vec<Argument>,
    ) -> Argument {
        let target = self.deployment.target(module, function);
        let index = self.push(Command::MoveCall {
            target,
            type_arguments: Vec::new(),
            arguments,
        });
        Argument::Result { index }
    }

    pub fn split_coin(&mut self, coin: Argument, amount: u64) -> Argument {
        let amount = self.pure_u64(amount);
        let index = self.push(Command::SplitCoins {
            coin,
            amounts: vec![amount],
        });
        Argument::NestedResult { index, result: 0 }
    }

    /// Merges `coin_ids` into the first and returns it.
    pub fn merged_coin(&mut self, coin_ids: &[String]) -> Result<Argument> {
        let (first, rest) = coin_ids
            .split_first()
            .ok_or(DashboardError::MissingField("coin_ids"))?;
        let destination = self.object(first);
        if !rest.is_empty() {
            let sources = rest.iter().map(|id| self.object(id)).collect();
            self.push(Command::MergeCoins {
                destination,
                sources,
            });
        }
        Ok(destination)
    }

    pub fn transfer_to_sender(&mut self, objects: Vec<Argument>) {
        let sender = self.sender.clone();
        let address = self.pure_address(&sender);
        self.push(Command::TransferObjects { objects, address });
    }

    pub fn pool(&mut self) -> Argument {
        let id = self.deployment.lending_pool_id.clone();
        self.object(&id)
    }

    pub fn clock(&mut self) -> Argument {
        let id = self.deployment.clock_id.clone();
        self.object(&id)
    }

    fn credit_score(&mut self, existing: Option<&str>) -> (Argument, bool) {
        match existing {
            Some(id) => (self.object(id), false),
            None => (
                self.move_call(MODULE_CREDIT_SCORE, "create_credit_score", vec![]),
                true,
            ),
        }
    }

    fn mock_bottle(&mut self) -> Argument {
        let collateral = self.pure_u64(MOCK_BOTTLE_COLLATERAL);
        let debt = self.pure_u64(MOCK_BOTTLE_DEBT);
        self.move_call(MODULE_BUCKET_MOCK, "create_mock_bottle", vec![collateral, debt])
    }

    pub fn finish(self, action: &'static str) -> TransactionIntent {
        TransactionIntent {
            action,
            sender: self.sender,
            inputs: self.inputs,
            commands: self.commands,
        }
    }
}

fn require_positive(units: u64, what: &str) -> Result<()> {
    if units == 0 {
        return Err(DashboardError::InvalidAmount(format!(
            "{what} must be greater than zero"
        )));
    }
    Ok(())
}

/// Creates a vault, pledges collateral split from gas and borrows against it
/// in one transaction.
pub fn open_position(
    deployment: &Deployment,
    sender: &str,
    collateral_units: u64,
    borrow_units: u64,
    term_months: u64,
    credit_score_id: Option<&str>,
) -> Result<TransactionIntent> {
    require_positive(collateral_units, "collateral")?;
    require_positive(borrow_units, "borrow amount")?;

    let mut tx = TransactionBuilder::new(deployment, sender);
    let vault = tx.move_call(MODULE_EMERGENCY_FUND, "create_vault", vec![]);
    let collateral = tx.split_coin(Argument::GasCoin, collateral_units);
    let pool = tx.pool();
    tx.move_call(
        MODULE_EMERGENCY_FUND,
        "deposit_collateral",
        vec![pool, vault, collateral],
    );

    let bottle = tx.mock_bottle();
    let (score, created_score) = tx.credit_score(credit_score_id);
    let amount = tx.pure_u64(borrow_units);
    let term = tx.pure_u64(term_months);
    let clock = tx.clock();
    tx.move_call(
        MODULE_EMERGENCY_FUND,
        "borrow",
        vec![pool, vault, bottle, amount, term, score, clock],
    );

    let mut owned = vec![vault];
    if created_score {
        owned.push(score);
    }
    tx.transfer_to_sender(owned);
    Ok(tx.finish("open_position"))
}

pub fn deposit_collateral(
    deployment: &Deployment,
    sender: &str,
    vault_id: &str,
    collateral_units: u64,
) -> Result<TransactionIntent> {
    require_positive(collateral_units, "collateral")?;

    let mut tx = TransactionBuilder::new(deployment, sender);
    let collateral = tx.split_coin(Argument::GasCoin, collateral_units);
    let pool = tx.pool();
    let vault = tx.object(vault_id);
    tx.move_call(
        MODULE_EMERGENCY_FUND,
        "deposit_collateral",
        vec![pool, vault, collateral],
    );
    Ok(tx.finish("deposit_collateral"))
}

pub fn borrow(
    deployment: &Deployment,
    sender: &str,
    vault_id: &str,
    borrow_units: u64,
    term_months: u64,
    credit_score_id: Option<&str>,
) -> Result<TransactionIntent> {
    require_positive(borrow_units, "borrow amount")?;

    let mut tx = TransactionBuilder::new(deployment, sender);
    let pool = tx.pool();
    let vault = tx.object(vault_id);
    let bottle = tx.mock_bottle();
    let (score, created_score) = tx.credit_score(credit_score_id);
    let amount = tx.pure_u64(borrow_units);
    let term = tx.pure_u64(term_months);
    let clock = tx.clock();
    tx.move_call(
        MODULE_EMERGENCY_FUND,
        "borrow",
        vec![pool, vault, bottle, amount, term, score, clock],
    );
    if created_score {
        tx.transfer_to_sender(vec![score]);
    }
    Ok(tx.finish("borrow"))
}

/// Repays with BUCK from the wallet's coins.
pub fn repay(
    deployment: &Deployment,
    sender: &str,
    vault_id: &str,
    buck_coin_ids: &[String],
    repay_units: u64,
    credit_score_id: Option<&str>,
) -> Result<TransactionIntent> {
    require_positive(repay_units, "repayment")?;

    let mut tx = TransactionBuilder::new(deployment, sender);
    let merged = tx.merged_coin(buck_coin_ids)?;
    let payment = tx.split_coin(merged, repay_units);
    let pool = tx.pool();
    let vault = tx.object(vault_id);
    let (score, created_score) = tx.credit_score(credit_score_id);
    let clock = tx.clock();
    tx.move_call(
        MODULE_EMERGENCY_FUND,
        "repay",
        vec![pool, vault, payment, score, clock],
    );
    if created_score {
        tx.transfer_to_sender(vec![score]);
    }
    Ok(tx.finish("repay"))
}

/// Settles debt out of the vault's own collateral.
pub fn repay_with_collateral(
    deployment: &Deployment,
    sender: &str,
    vault_id: &str,
    collateral_units: u64,
    credit_score_id: Option<&str>,
) -> Result<TransactionIntent> {
    require_positive(collateral_units, "collateral")?;

    let mut tx = TransactionBuilder::new(deployment, sender);
    let pool = tx.pool();
    let vault = tx.object(vault_id);
    let amount = tx.pure_u64(collateral_units);
    let (score, created_score) = tx.credit_score(credit_score_id);
    let clock = tx.clock();
    tx.move_call(
        MODULE_EMERGENCY_FUND,
        "repay_with_jaminan",
        vec![pool, vault, amount, score, clock],
    );
    if created_score {
        tx.transfer_to_sender(vec![score]);
    }
    Ok(tx.finish("repay_with_collateral"))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Funding {
    Wallet(Vec<String>),
    Faucet,
}

pub fn provide_liquidity(
    deployment: &Deployment,
    sender: &str,
    funding: &Funding,
    units: u64,
) -> Result<TransactionIntent> {
    require_positive(units, "deposit")?;

    let mut tx = TransactionBuilder::new(deployment, sender);
    let deposit = match funding {
        Funding::Wallet(coin_ids) => {
            let merged = tx.merged_coin(coin_ids)?;
            tx.split_coin(merged, units)
        }
        Funding::Faucet => {
            let treasury_id = deployment.buck_treasury_id.clone();
            let treasury = tx.object(&treasury_id);
            let amount = tx.pure_u64(units);
            tx.move_call(MODULE_BUCKET_MOCK, "mint_mock", vec![treasury, amount])
        }
    };
    let pool = tx.pool();
    let lp = tx.move_call(
        MODULE_EMERGENCY_FUND,
        "provide_liquidity",
        vec![pool, deposit],
    );
    tx.transfer_to_sender(vec![lp]);
    Ok(tx.finish("provide_liquidity"))
}

pub fn remove_liquidity(
    deployment: &Deployment,
    sender: &str,
    lp_coin_ids: &[String],
    share_units: u64,
) -> Result<TransactionIntent> {
    require_positive(share_units, "withdrawal")?;

    let mut tx = TransactionBuilder::new(deployment, sender);
    let merged = tx.merged_coin(lp_coin_ids)?;
    let shares = tx.split_coin(merged, share_units);
    let pool = tx.pool();
    let payout = tx.move_call(
        MODULE_EMERGENCY_FUND,
        "remove_liquidity",
        vec![pool, shares],
    );
    tx.transfer_to_sender(vec![payout]);
    Ok(tx.finish("remove_liquidity"))
}

pub fn claim_collateral(
    deployment: &Deployment,
    sender: &str,
    vault_id: &str,
) -> Result<TransactionIntent> {
    let mut tx = TransactionBuilder::new(deployment, sender);
    let pool = tx.pool();
    let vault = tx.object(vault_id);
    let released = tx.move_call(MODULE_EMERGENCY_FUND, "claim_collateral", vec![pool, vault]);
    tx.transfer_to_sender(vec![released]);
    Ok(tx.finish("claim_collateral"))
}

/// Mints test BUCK from the mock treasury.
pub fn mint_test_asset(
    deployment: &Deployment,
    sender: &str,
    units: u64,
) -> Result<TransactionIntent> {
    require_positive(units, "mint amount")?;

    let mut tx = TransactionBuilder::new(deployment, sender);
    let treasury_id = deployment.buck_treasury_id.clone();
    let treasury = tx.object(&treasury_id);
    let amount = tx.pure_u64(units);
    let minted = tx.move_call(MODULE_BUCKET_MOCK, "mint_mock", vec![treasury, amount]);
    tx.transfer_to_sender(vec![minted]);
    Ok(tx.finish("mint_test_asset"))
}

/// Rejects signed payloads that cannot be what a wallet produced.
pub fn validate_signed(signed: &SignedTransaction) -> Result<()> {
    let bytes = STANDARD
        .decode(signed.tx_bytes.trim())
        .map_err(|e| DashboardError::InvalidPayload(format!("tx_bytes is not base64: {e}")))?;
    if bytes.is_empty() {
        return Err(DashboardError::MissingField("tx_bytes"));
    }
    if signed.signatures.is_empty() {
        return Err(DashboardError::MissingField("signatures"));
    }
    for signature in &signed.signatures {
        STANDARD
            .decode(signature.trim())
            .map_err(|e| DashboardError::InvalidPayload(format!("signature is not base64: {e}")))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SENDER: &str = "0xa11ce";

    fn deployment() -> Deployment {
        Deployment {
            package_id: "0xpkg".into(),
            lending_pool_id: "0xpool".into(),
            buck_treasury_id: "0xtreasury".into(),
            ..Deployment::default()
        }
    }

    #[test]
    fn open_position_orders_calls() {
        let intent =
            open_position(&deployment(), SENDER, 10_000_000_000, 4_000_000_000, 6, None).unwrap();
        assert_eq!(
            intent.call_targets(),
            vec![
                "0xpkg::emergency_fund::create_vault",
                "0xpkg::emergency_fund::deposit_collateral",
                "0xpkg::bucket_mock::create_mock_bottle",
                "0xpkg::credit_score::create_credit_score",
                "0xpkg::emergency_fund::borrow",
            ]
        );
        assert!(matches!(intent.commands[1], Command::SplitCoins { coin: Argument::GasCoin, .. }));
        assert!(matches!(
            intent.commands.last(),
            Some(Command::TransferObjects { objects, .. }) if objects.len() == 2
        ));
        assert!(intent.inputs.contains(&CallArg::Pure {
            value_type: "u64",
            value: "4000000000".into()
        }));
        assert!(intent.inputs.contains(&CallArg::Pure {
            value_type: "u64",
            value: "10000000000".into()
        }));
    }

    #[test]
    fn shared_objects_are_single_inputs() {
        let intent =
            open_position(&deployment(), SENDER, 1_000_000_000, 100, 3, None).unwrap();
        let pool_inputs = intent
            .inputs
            .iter()
            .filter(|i| matches!(i, CallArg::Object { object_id } if object_id == "0xpool"))
            .count();
        assert_eq!(pool_inputs, 1);
    }

    #[test]
    fn existing_credit_score_is_reused() {
        let intent = borrow(&deployment(), SENDER, "0xvault", 5, 12, Some("0xscore")).unwrap();
        assert!(!intent
            .call_targets()
            .contains(&"0xpkg::credit_score::create_credit_score"));
        assert!(!intent
            .commands
            .iter()
            .any(|c| matches!(c, Command::TransferObjects { .. })));
    }

    #[test]
    fn repay_merges_wallet_coins() {
        let coins = vec!["0xc1".to_string(), "0xc2".to_string(), "0xc3".to_string()];
        let intent = repay(&deployment(), SENDER, "0xvault", &coins, 110, Some("0xscore")).unwrap();
        assert!(matches!(
            &intent.commands[0],
            Command::MergeCoins { sources, .. } if sources.len() == 2
        ));
        assert_eq!(intent.call_targets(), vec!["0xpkg::emergency_fund::repay"]);
    }

    #[test]
    fn repay_without_coins_is_rejected() {
        assert!(matches!(
            repay(&deployment(), SENDER, "0xvault", &[], 110, None),
            Err(DashboardError::MissingField("coin_ids"))
        ));
    }

    #[test]
    fn faucet_deposit_mints_then_provides() {
        let intent = provide_liquidity(&deployment(), SENDER, &Funding::Faucet, 50).unwrap();
        assert_eq!(
            intent.call_targets(),
            vec![
                "0xpkg::bucket_mock::mint_mock",
                "0xpkg::emergency_fund::provide_liquidity",
            ]
        );
    }

    #[test]
    fn zero_amounts_are_rejected() {
        assert!(deposit_collateral(&deployment(), SENDER, "0xvault", 0).is_err());
        assert!(mint_test_asset(&deployment(), SENDER, 0).is_err());
        assert!(remove_liquidity(&deployment(), SENDER, &["0xlp".into()], 0).is_err());
    }

    #[test]
    fn intent_serializes_with_kinds() {
        let intent = claim_collateral(&deployment(), SENDER, "0xvault").unwrap();
        let json = serde_json::to_value(&intent).unwrap();
        assert_eq!(json["action"], "claim_collateral");
        assert_eq!(json["commands"][0]["kind"], "move_call");
        assert_eq!(json["commands"][0]["arguments"][0]["kind"], "input");
        assert_eq!(json["inputs"][0]["object_id"], "0xpool");
    }

    #[test]
    fn signed_payload_validation() {
        let ok = SignedTransaction {
            tx_bytes: STANDARD.encode([1u8, 2, 3]),
            signatures: vec![STANDARD.encode([9u8; 4])],
            sender: None,
        };
        validate_signed(&ok).unwrap();

        let unsigned = SignedTransaction {
            signatures: vec![],
            ..ok.clone()
        };
        assert!(matches!(
            validate_signed(&unsigned),
            Err(DashboardError::MissingField("signatures"))
        ));

        let garbage = SignedTransaction {
            tx_bytes: "not base64!".into(),
            ..ok
        };
        assert!(validate_signed(&garbage).is_err());
    }
}
