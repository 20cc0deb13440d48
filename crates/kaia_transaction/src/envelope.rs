use std::sync::{
    atomic::{AtomicU64, Ordering},
    OnceLock,
};

use alloy_rlp::{BufMut, Encodable};
use kaia_chain_config::Rules;
use kaia_primitives::{Address, B256};
use kaia_state_api::State;
use parking_lot::Mutex;

use crate::{
    account_key::{AccountKeyEngine, Role},
    execution::Action,
    gas::ValidatedGas,
    signer::{sender_from_public_keys, Signer, SignerCapabilities, SignerError},
    validation::AdmissionError,
    Signed, TransactionVariant as _,
};

static NEXT_ARRIVAL: AtomicU64 = AtomicU64::new(0);

/// An address recovered under a specific signer.
///
/// The first successful recovery is kept. A lookup only hits when the
/// requesting signer is capability-equal to the one that produced the entry;
/// other signers recompute on every access. Failures are never stored.
#[derive(Clone, Debug, Default)]
struct RecoverySlot(OnceLock<(SignerCapabilities, Address)>);

impl RecoverySlot {
    fn get(&self, capabilities: &SignerCapabilities) -> Option<Address> {
        self.0
            .get()
            .filter(|(cached, _address)| cached == capabilities)
            .map(|(_capabilities, address)| *address)
    }

    fn insert(&self, capabilities: SignerCapabilities, address: Address, name: &str) {
        if let Err((capabilities, _address)) = self.0.set((capabilities, address))
            && let Some((cached, _address)) = self.0.get()
            && *cached != capabilities
        {
            log::debug!(
                "Not caching {name} recovered under {capabilities:?}, slot holds {cached:?}"
            );
        }
    }

    fn get_or_try_insert(
        &self,
        signer: &dyn Signer,
        name: &str,
        recover: impl FnOnce() -> Result<Address, SignerError>,
    ) -> Result<Address, SignerError> {
        let capabilities = signer.capabilities();
        if let Some(address) = self.get(&capabilities) {
            return Ok(address);
        }

        let address = recover()?;
        self.insert(capabilities, address, name);

        Ok(address)
    }
}

/// Values written while a transaction is admitted into a block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidatedFields {
    pub sender: Option<Address>,
    pub fee_payer: Option<Address>,
    pub gas: Option<ValidatedGas>,
    /// Whether the sender's nonce is checked at execution
    pub check_nonce: bool,
    /// Set when the transaction failed to execute and must be dropped
    pub unexecutable: bool,
}

impl Default for ValidatedFields {
    fn default() -> Self {
        Self {
            sender: None,
            fee_payer: None,
            gas: None,
            check_nonce: true,
            unexecutable: false,
        }
    }
}

/// A signed transaction together with the values derived from it.
///
/// Derived values are computed on first access and cached for the lifetime of
/// the envelope. Recovered addresses are cached per signer.
#[derive(Debug)]
pub struct Transaction {
    inner: Signed,
    arrival: u64,
    hash: OnceLock<B256>,
    size: OnceLock<usize>,
    sender_only_hash: OnceLock<B256>,
    sender: RecoverySlot,
    fee_payer: RecoverySlot,
    validated: Mutex<ValidatedFields>,
}

impl Transaction {
    /// Wraps a signed transaction, assigning it the next arrival sequence
    /// number.
    pub fn new(inner: Signed) -> Self {
        let arrival = NEXT_ARRIVAL.fetch_add(1, Ordering::Relaxed);
        Self::with_arrival(inner, arrival)
    }

    /// Wraps a signed transaction with a previously assigned arrival sequence
    /// number.
    pub fn with_arrival(inner: Signed, arrival: u64) -> Self {
        Self {
            inner,
            arrival,
            hash: OnceLock::new(),
            size: OnceLock::new(),
            sender_only_hash: OnceLock::new(),
            sender: RecoverySlot::default(),
            fee_payer: RecoverySlot::default(),
            validated: Mutex::new(ValidatedFields::default()),
        }
    }

    /// Returns the signed transaction.
    pub fn inner(&self) -> &Signed {
        &self.inner
    }

    pub fn into_inner(self) -> Signed {
        self.inner
    }

    /// Returns the arrival sequence number. Lower numbers arrived earlier.
    pub fn arrival(&self) -> u64 {
        self.arrival
    }

    /// Returns the identity hash.
    pub fn hash(&self) -> B256 {
        *self.hash.get_or_init(|| self.inner.transaction_hash())
    }

    /// Returns the size of the network encoding in bytes.
    pub fn size(&self) -> usize {
        *self.size.get_or_init(|| self.inner.network_length())
    }

    /// Returns the identity hash without fee payer fields.
    pub fn sender_only_hash(&self) -> B256 {
        *self
            .sender_only_hash
            .get_or_init(|| self.inner.sender_only_hash())
    }

    /// Returns the sender as recovered by `signer`.
    pub fn sender(&self, signer: &dyn Signer) -> Result<Address, SignerError> {
        self.sender
            .get_or_try_insert(signer, "sender", || signer.sender(&self.inner))
    }

    /// Returns the account paying the fee as recovered by `signer`. That is
    /// the sender for transactions that are not fee-delegated.
    pub fn fee_payer(&self, signer: &dyn Signer) -> Result<Address, SignerError> {
        let Some(fee_payer_bearing) = self.inner.as_fee_payer_bearing() else {
            return self.sender(signer);
        };

        self.fee_payer.get_or_try_insert(signer, "fee payer", || {
            signer.fee_payer_public_keys(&self.inner)?;
            Ok(fee_payer_bearing.fee_payer())
        })
    }

    /// Returns the sender recorded during admission.
    pub fn validated_sender(&self) -> Option<Address> {
        self.validated.lock().sender
    }

    /// Returns the fee payer recorded during admission.
    pub fn validated_fee_payer(&self) -> Option<Address> {
        self.validated.lock().fee_payer
    }

    /// Returns the gas breakdown recorded during admission.
    pub fn validated_gas(&self) -> Option<ValidatedGas> {
        self.validated.lock().gas
    }

    /// Returns all values recorded during admission.
    pub fn validated_fields(&self) -> ValidatedFields {
        self.validated.lock().clone()
    }

    /// Whether the sender's nonce is checked at execution.
    pub fn check_nonce(&self) -> bool {
        self.validated.lock().check_nonce
    }

    pub fn set_check_nonce(&self, check_nonce: bool) {
        self.validated.lock().check_nonce = check_nonce;
    }

    /// Marks the transaction as unexecutable.
    pub fn mark_unexecutable(&self) {
        self.validated.lock().unexecutable = true;
    }

    pub fn is_unexecutable(&self) -> bool {
        self.validated.lock().unexecutable
    }

    /// Validates the transaction for inclusion in a block.
    ///
    /// Recovers the sender's keys and checks them against the sender's account
    /// key, then does the same for the fee payer of fee-delegated
    /// transactions. Runs structural and state-dependent validation last and
    /// checks that the gas limit covers intrinsic gas plus signature
    /// validation costs. On success the sender, fee payer, and gas breakdown
    /// are recorded on the envelope.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all))]
    pub fn validate_for_admission<StateT, KeyEngineT>(
        &self,
        signer: &dyn Signer,
        state: &StateT,
        key_engine: &KeyEngineT,
        rules: &Rules,
    ) -> Result<ValidatedGas, AdmissionError<StateT::Error, KeyEngineT::Error>>
    where
        StateT: State,
        KeyEngineT: AccountKeyEngine,
    {
        let block_number = rules.block_number;
        let capabilities = signer.capabilities();

        let sender_keys = signer.sender_public_keys(&self.inner)?;
        let sender = sender_from_public_keys(&self.inner, &sender_keys)?;
        self.sender.insert(capabilities, sender, "sender");

        let sender_role = if self.inner.transaction_type().is_account_update() {
            Role::AccountUpdate
        } else {
            Role::Transaction
        };
        let account_key = state.account_key(sender).map_err(AdmissionError::State)?;
        key_engine
            .validate(
                block_number,
                &sender,
                account_key.as_ref(),
                &sender_keys,
                sender_role,
            )
            .map_err(|error| AdmissionError::AccountKey {
                address: sender,
                error,
            })?;
        let mut sig_validation =
            key_engine.sig_validation_gas(block_number, sender_role, sender_keys.len());

        let fee_payer = if let Some(fee_payer_bearing) = self.inner.as_fee_payer_bearing() {
            let fee_payer_keys = signer.fee_payer_public_keys(&self.inner)?;
            let fee_payer = fee_payer_bearing.fee_payer();
            self.fee_payer.insert(capabilities, fee_payer, "fee payer");

            let account_key = state
                .account_key(fee_payer)
                .map_err(AdmissionError::State)?;
            key_engine
                .validate(
                    block_number,
                    &fee_payer,
                    account_key.as_ref(),
                    &fee_payer_keys,
                    Role::FeePayer,
                )
                .map_err(|error| AdmissionError::AccountKey {
                    address: fee_payer,
                    error,
                })?;
            sig_validation = sig_validation.saturating_add(key_engine.sig_validation_gas(
                block_number,
                Role::FeePayer,
                fee_payer_keys.len(),
            ));

            fee_payer
        } else {
            sender
        };

        self.inner.validate(state, rules)?;
        self.inner.validate_mutable(state, rules)?;

        let key_gas = match self.inner.action() {
            Action::UpdateKey { key } => key_engine
                .key_update_gas(block_number, key)
                .map_err(|error| AdmissionError::AccountKey {
                    address: sender,
                    error,
                })?,
            _ => 0,
        };

        let gas = ValidatedGas::new(self.inner.intrinsic_gas(rules), key_gas, sig_validation);
        let gas_limit = self.inner.gas_limit();
        if gas_limit < gas.required {
            return Err(AdmissionError::InsufficientGas {
                gas_limit,
                required: gas.required,
            });
        }

        let mut validated = self.validated.lock();
        validated.sender.get_or_insert(sender);
        validated.fee_payer.get_or_insert(fee_payer);
        validated.gas.get_or_insert(gas);

        Ok(gas)
    }

    /// Encodes the transaction for propagation between peers, including a
    /// blob transaction's sidecar.
    pub fn encode_network(&self, out: &mut dyn BufMut) {
        self.inner.encode_network(out);
    }

    /// Decodes a transaction from its network or canonical encoding.
    pub fn decode_network(buf: &mut &[u8]) -> alloy_rlp::Result<Self> {
        Signed::decode_network(buf).map(Self::new)
    }
}

impl Clone for Transaction {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            arrival: self.arrival,
            hash: self.hash.clone(),
            size: self.size.clone(),
            sender_only_hash: self.sender_only_hash.clone(),
            sender: self.sender.clone(),
            fee_payer: self.fee_payer.clone(),
            validated: Mutex::new(self.validated.lock().clone()),
        }
    }
}

impl PartialEq for Transaction {
    fn eq(&self, other: &Self) -> bool {
        self.inner == other.inner
    }
}

impl Eq for Transaction {}

impl From<Signed> for Transaction {
    fn from(inner: Signed) -> Self {
        Self::new(inner)
    }
}

impl Encodable for Transaction {
    fn encode(&self, out: &mut dyn BufMut) {
        self.inner.encode(out);
    }

    fn length(&self) -> usize {
        self.inner.length()
    }
}

impl alloy_rlp::Decodable for Transaction {
    fn decode(buf: &mut &[u8]) -> alloy_rlp::Result<Self> {
        <Signed as alloy_rlp::Decodable>::decode(buf).map(Self::new)
    }
}
