use auto_impl::auto_impl;
use kaia_primitives::{Address, Bytes, U256};
use kaia_state_api::StateMut;

use crate::{FillContractAddress as _, TransactionVariant};

/// What executing a transaction does, besides incrementing the sender's
/// nonce.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action<'a> {
    /// Message call to `to`
    Call {
        /// Recipient
        to: Address,
        /// Call data
        input: &'a [u8],
    },
    /// Contract creation running `input` as initcode
    Create {
        /// Initcode
        input: &'a [u8],
    },
    /// Installation of a new account key
    UpdateKey {
        /// The encoded account key
        key: &'a Bytes,
    },
    /// Nothing besides the nonce increment
    NonceOnly,
}

/// Result of a VM invocation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CallResult {
    /// Return data
    pub output: Bytes,
    pub gas_used: u64,
    /// Whether execution succeeded without reverting
    pub success: bool,
}

/// The call and create primitives of a virtual machine.
#[auto_impl(&mut, Box)]
pub trait Vm {
    /// The VM's error type
    type Error;

    fn call(
        &mut self,
        sender: Address,
        to: Address,
        input: &[u8],
        gas: u64,
        value: U256,
    ) -> Result<CallResult, Self::Error>;

    /// Creates a contract at the provided address.
    fn create(
        &mut self,
        sender: Address,
        input: &[u8],
        gas: u64,
        value: U256,
        address: Address,
    ) -> Result<CallResult, Self::Error>;
}

/// Result of executing a transaction.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExecutionOutcome {
    /// Return data
    pub output: Bytes,
    pub gas_used: u64,
    pub success: bool,
    /// Address of the created contract, for contract creations
    pub contract_address: Option<Address>,
}

/// Error executing a transaction.
#[derive(Debug, thiserror::Error)]
pub enum ExecutionError<StateErrorT, VmErrorT> {
    /// Error accessing the state.
    #[error("State error: {0}")]
    State(StateErrorT),
    /// Error raised by the VM.
    #[error("VM error: {0}")]
    Vm(VmErrorT),
}

/// Executes `transaction` on behalf of `sender`.
///
/// The sender's nonce is incremented before the transaction's action runs.
#[cfg_attr(feature = "tracing", tracing::instrument(skip_all))]
pub fn execute<TransactionT, StateT, VmT>(
    transaction: &TransactionT,
    sender: Address,
    vm: &mut VmT,
    state: &mut StateT,
    gas: u64,
) -> Result<ExecutionOutcome, ExecutionError<StateT::Error, VmT::Error>>
where
    TransactionT: TransactionVariant,
    StateT: StateMut,
    VmT: Vm,
{
    state
        .increment_nonce(sender)
        .map_err(ExecutionError::State)?;

    let value = transaction.value();
    let contract_address = transaction.contract_address(&sender);

    let result = match transaction.action() {
        Action::Call { to, input } => vm
            .call(sender, to, input, gas, value)
            .map_err(ExecutionError::Vm)?,
        Action::Create { input } => {
            let address = sender.create(transaction.nonce());
            vm.create(sender, input, gas, value, address)
                .map_err(ExecutionError::Vm)?
        }
        Action::UpdateKey { key } => {
            state
                .update_key(sender, key.clone())
                .map_err(ExecutionError::State)?;

            CallResult {
                success: true,
                ..CallResult::default()
            }
        }
        Action::NonceOnly => CallResult {
            success: true,
            ..CallResult::default()
        },
    };

    Ok(ExecutionOutcome {
        output: result.output,
        gas_used: result.gas_used,
        success: result.success,
        contract_address: contract_address.filter(|_| result.success),
    })
}
