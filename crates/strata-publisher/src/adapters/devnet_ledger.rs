//! Devnet Ledger
//!
//! In-memory ledger implementing `LedgerBackend`: balances, gas charging and
//! a digest-indexed transaction log. No signing is performed.

use crate::domain::{
    AccountAddress, Amount, BackendError, LedgerTransaction, SubmittedTransaction,
    TransactionKind, TxDigest,
};
use crate::ports::LedgerBackend;
use async_trait::async_trait;
use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use tracing::debug;

#[derive(Default)]
struct LedgerState {
    balances: HashMap<AccountAddress, Amount>,
    transactions: HashMap<TxDigest, LedgerTransaction>,
    nonce: u64,
}

/// In-memory ledger for local runs and tests.
pub struct DevnetLedger {
    /// Account charged for gas.
    signer: AccountAddress,
    /// Fee per submitted transaction.
    gas_fee: Amount,
    state: RwLock<LedgerState>,
}

impl DevnetLedger {
    /// Create a ledger whose submissions are paid by `signer`.
    pub fn new(signer: AccountAddress, gas_fee: Amount) -> Self {
        Self {
            signer,
            gas_fee,
            state: RwLock::new(LedgerState::default()),
        }
    }

    /// Signing account.
    pub fn signer(&self) -> &AccountAddress {
        &self.signer
    }

    /// Credit `amount` to `account` (faucet).
    pub fn fund(&self, account: &AccountAddress, amount: Amount) {
        let mut state = self.state.write();
        let balance = state.balances.entry(account.clone()).or_default();
        *balance = balance.saturating_add(amount);
    }

    /// Current balance of `account`.
    pub fn balance_of(&self, account: &AccountAddress) -> Amount {
        self.state
            .read()
            .balances
            .get(account)
            .copied()
            .unwrap_or_default()
    }

    /// Transaction recorded under `digest`.
    pub fn lookup(&self, digest: &TxDigest) -> Option<LedgerTransaction> {
        self.state.read().transactions.get(digest).cloned()
    }

    /// Number of recorded transactions of `kind`.
    pub fn transaction_count(&self, kind: TransactionKind) -> usize {
        self.state
            .read()
            .transactions
            .values()
            .filter(|tx| tx.kind == kind)
            .count()
    }

    /// Whether any recorded transaction carries exactly `payload`.
    pub fn contains_payload(&self, kind: TransactionKind, payload: &[u8]) -> bool {
        self.state
            .read()
            .transactions
            .values()
            .any(|tx| tx.kind == kind && tx.payload == payload)
    }

    fn digest_for(payload: &[u8], nonce: u64) -> TxDigest {
        let mut hasher = Sha256::new();
        hasher.update(payload);
        hasher.update(nonce.to_le_bytes());
        TxDigest::new(hex::encode(hasher.finalize()))
    }
}

#[async_trait]
impl LedgerBackend for DevnetLedger {
    async fn get_balance(&self, account: &AccountAddress) -> Result<Amount, BackendError> {
        Ok(self.balance_of(account))
    }

    async fn sign_and_submit(
        &self,
        tx: LedgerTransaction,
    ) -> Result<SubmittedTransaction, BackendError> {
        let mut state = self.state.write();
        let balance = state
            .balances
            .get(&self.signer)
            .copied()
            .unwrap_or_default();
        let remaining = balance.checked_sub(self.gas_fee).ok_or_else(|| {
            BackendError::Rejected(format!(
                "signer {} cannot pay gas {} (balance {})",
                self.signer, self.gas_fee, balance
            ))
        })?;
        state.balances.insert(self.signer.clone(), remaining);

        state.nonce += 1;
        let digest = Self::digest_for(&tx.payload, state.nonce);
        debug!(digest = %digest, kind = %tx.kind, "[strata] Devnet tx executed");
        state.transactions.insert(digest.clone(), tx);
        Ok(SubmittedTransaction { digest })
    }
}
