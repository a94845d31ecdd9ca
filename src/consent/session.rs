use std::sync::Arc;
use std::time::Duration;

use alloy::dyn_abi::DynSolValue;
use alloy::primitives::{Address, U256};
use tracing::{debug, info};

use crate::chain::{ChainConnector, Receipt, SubmitPolicy, TxHash};
use crate::consent::error::WriteKind;
use crate::consent::{
    Ack, ConsentError, ConsentHandle, ConsentTerms, ConsentView, DataFlags, Identity,
    NetworkStatus,
};
use crate::contract::{ContractInterface, ContractProxy, Deployment, InterfaceError};

/// Creates, observes and mutates consent records through one chain connector.
///
/// The session holds no record state of its own. Every read goes to the chain and every write
/// blocks until its transaction has been included, so a snapshot taken after a write returns
/// observes it. Sessions are cheap to clone and any number of them can work against the same
/// records concurrently, ordering of conflicting writes is left to the chain.
///
/// Rules about who may grant, revoke or delegate live in the contract. The session only checks
/// what can be known without the chain (the creation terms, the record existing at all) and
/// reports the contract's verdict faithfully.
pub struct ConsentSession<C: ?Sized> {
    connector: Arc<C>,
    interface: Arc<ContractInterface>,
    policy: SubmitPolicy,
}

impl<C: ?Sized> Clone for ConsentSession<C> {
    fn clone(&self) -> Self {
        Self {
            connector: self.connector.clone(),
            interface: self.interface.clone(),
            policy: self.policy.clone(),
        }
    }
}

impl<C: ChainConnector + ?Sized> ConsentSession<C> {
    /// Identities the node is able to sign for.
    pub async fn accounts(&self) -> Result<Vec<Identity>, ConsentError> {
        let accounts = self.connector.accounts().await?;
        Ok(accounts.into_iter().map(Identity::new).collect())
    }

    /// Lets `delegate` grant and revoke on the data subject's behalf. Only the data subject may
    /// manage delegates.
    pub async fn add_delegate(
        &self,
        handle: ConsentHandle,
        signer: Identity,
        delegate: Identity,
    ) -> Result<Ack, ConsentError> {
        let args = [DynSolValue::Address(delegate.address())];
        self.invoke(handle, "addDelegate", &args, signer).await
    }

    /// Refers to an existing record. Nothing is checked until the handle is used.
    pub fn attach(&self, address: Address) -> ConsentHandle {
        ConsentHandle::new(address)
    }

    /// The most recent record deployed on the connected network, if any.
    pub fn attach_latest(&self, deployment: &Deployment) -> Option<ConsentHandle> {
        if deployment.interface().name() != self.interface.name() {
            debug!(
                deployment = deployment.interface().name(),
                session = self.interface.name(),
                "attaching to a deployment of a differently named contract"
            );
        }

        deployment.address().map(ConsentHandle::new)
    }

    /// Asks the record whether `recipient` may currently receive the `requested` categories of
    /// data. The contract's answer is returned as-is.
    pub async fn authorize(
        &self,
        handle: ConsentHandle,
        recipient: Identity,
        requested: DataFlags,
    ) -> Result<bool, ConsentError> {
        let proxy = self.proxy(handle);
        let args = [
            DynSolValue::Address(recipient.address()),
            DynSolValue::Uint(requested.to_u256(), 256),
        ];

        read_bool(&proxy, "authorize", &args).await
    }

    pub fn connector(&self) -> &Arc<C> {
        &self.connector
    }

    /// Deploys a new consent record signed by `subject`, who becomes its data subject. Invalid
    /// terms are rejected before anything is sent.
    ///
    /// A failed creation may still have been submitted, check [`ConsentError::submission`]
    /// before trying again or the subject can end up with two records.
    pub async fn create(
        &self,
        subject: Identity,
        terms: &ConsentTerms,
    ) -> Result<ConsentHandle, ConsentError> {
        terms.validate()?;

        let args = terms.constructor_args();
        let (proxy, receipt) = ContractProxy::deploy(
            self.connector.clone(),
            self.interface.clone(),
            &args,
            subject.address(),
            &self.policy,
        )
        .await
        .map_err(|err| ConsentError::from_write(err, WriteKind::Creation))?;

        info!(
            record = %proxy.address(),
            %subject,
            controller = %terms.controller,
            recipients = terms.recipients.len(),
            data = %terms.data,
            duration_secs = terms.duration.as_secs(),
            tx_hash = %receipt.transaction_hash,
            block = receipt.block_number,
            "consent record created"
        );

        Ok(ConsentHandle::new(proxy.address()))
    }

    /// Sets the signer's consent flag. Granting twice is harmless, whether the signer is allowed
    /// to grant at all is decided by the contract.
    pub async fn grant(
        &self,
        handle: ConsentHandle,
        signer: Identity,
    ) -> Result<Ack, ConsentError> {
        self.invoke(handle, "grantConsent", &[], signer).await
    }

    pub fn interface(&self) -> &Arc<ContractInterface> {
        &self.interface
    }

    pub async fn is_delegate(
        &self,
        handle: ConsentHandle,
        who: Identity,
    ) -> Result<bool, ConsentError> {
        let proxy = self.proxy(handle);
        read_bool(&proxy, "delegates", &[DynSolValue::Address(who.address())]).await
    }

    /// The contract's own validity verdict.
    pub async fn is_valid(&self, handle: ConsentHandle) -> Result<bool, ConsentError> {
        Ok(self.snapshot(handle).await?.valid)
    }

    pub async fn network_status(&self) -> Result<NetworkStatus, ConsentError> {
        let (network_id, block_number) = futures::try_join!(
            self.connector.network_id(),
            self.connector.block_number()
        )?;

        Ok(NetworkStatus {
            network_id,
            block_number,
        })
    }

    pub fn new(connector: Arc<C>, interface: Arc<ContractInterface>, policy: SubmitPolicy) -> Self {
        Self {
            connector,
            interface,
            policy,
        }
    }

    pub fn policy(&self) -> &SubmitPolicy {
        &self.policy
    }

    /// Looks up the receipt of an earlier submission. After a [`ConsentError::Timeout`] this is
    /// how to learn whether the transaction landed after all.
    pub async fn receipt(&self, tx_hash: TxHash) -> Result<Option<Receipt>, ConsentError> {
        Ok(self.connector.transaction_receipt(tx_hash).await?)
    }

    pub async fn remove_delegate(
        &self,
        handle: ConsentHandle,
        signer: Identity,
        delegate: Identity,
    ) -> Result<Ack, ConsentError> {
        let args = [DynSolValue::Address(delegate.address())];
        self.invoke(handle, "removeDelegate", &args, signer).await
    }

    /// Clears the signer's consent flag. Revoking twice is harmless.
    pub async fn revoke(
        &self,
        handle: ConsentHandle,
        signer: Identity,
    ) -> Result<Ack, ConsentError> {
        self.invoke(handle, "revokeConsent", &[], signer).await
    }

    /// Reads the current state of a record. The reads are issued concurrently and are not
    /// atomic, see [`ConsentView`] for what that means for writes in flight.
    pub async fn snapshot(&self, handle: ConsentHandle) -> Result<ConsentView, ConsentError> {
        let proxy = self.proxy(handle);

        let (valid, consent_from_ds, consent_from_dc, data_subject, controller, data, duration) =
            futures::try_join!(
                read_bool(&proxy, "verify", &[]),
                read_bool(&proxy, "consentFromDS", &[]),
                read_bool(&proxy, "consentFromDC", &[]),
                read_address(&proxy, "dataSubject"),
                read_address(&proxy, "controller"),
                read_uint(&proxy, "data"),
                read_uint(&proxy, "duration"),
            )?;

        let data = DataFlags::try_from(data)
            .map_err(|value| unexpected("data", format!("out of range data flags {value}")))?;
        let duration = u64::try_from(duration)
            .map_err(|_| unexpected("duration", format!("out of range duration {duration}")))?;

        Ok(ConsentView {
            address: handle.address(),
            valid,
            consent_from_ds,
            consent_from_dc,
            data_subject: Identity::new(data_subject),
            controller: Identity::new(controller),
            data,
            duration: Duration::from_secs(duration),
        })
    }

    async fn invoke(
        &self,
        handle: ConsentHandle,
        method: &str,
        args: &[DynSolValue],
        signer: Identity,
    ) -> Result<Ack, ConsentError> {
        self.interface.function(method)?;

        let proxy = self.proxy(handle);

        // A transaction sent to an address without code is included successfully and does
        // nothing, it has to be caught before submission
        read_address(&proxy, "dataSubject").await?;

        let receipt = proxy
            .transact(method, args, signer.address(), &self.policy)
            .await
            .map_err(|err| ConsentError::from_write(err, WriteKind::Invocation))?;

        info!(
            record = %handle,
            method,
            %signer,
            tx_hash = %receipt.transaction_hash,
            block = receipt.block_number,
            "consent record updated"
        );

        Ok(Ack::from(&receipt))
    }

    fn proxy(&self, handle: ConsentHandle) -> ContractProxy<C> {
        ContractProxy::new(self.connector.clone(), self.interface.clone(), handle.address())
    }
}

async fn read_address<C: ChainConnector + ?Sized>(
    proxy: &ContractProxy<C>,
    method: &str,
) -> Result<Address, ConsentError> {
    read_single(proxy, method, &[])
        .await?
        .as_address()
        .ok_or_else(|| unexpected(method, "a non address value"))
}

async fn read_bool<C: ChainConnector + ?Sized>(
    proxy: &ContractProxy<C>,
    method: &str,
    args: &[DynSolValue],
) -> Result<bool, ConsentError> {
    read_single(proxy, method, args)
        .await?
        .as_bool()
        .ok_or_else(|| unexpected(method, "a non boolean value"))
}

async fn read_single<C: ChainConnector + ?Sized>(
    proxy: &ContractProxy<C>,
    method: &str,
    args: &[DynSolValue],
) -> Result<DynSolValue, ConsentError> {
    let mut values = proxy
        .call(method, args)
        .await
        .map_err(ConsentError::from_read)?;

    let count = values.len();
    match (values.pop(), count) {
        (Some(value), 1) => Ok(value),
        _ => Err(unexpected(method, format!("{count} values where one was expected"))),
    }
}

async fn read_uint<C: ChainConnector + ?Sized>(
    proxy: &ContractProxy<C>,
    method: &str,
) -> Result<U256, ConsentError> {
    read_single(proxy, method, &[])
        .await?
        .as_uint()
        .map(|(value, _)| value)
        .ok_or_else(|| unexpected(method, "a non integer value"))
}

fn unexpected(method: &str, detail: impl Into<String>) -> ConsentError {
    ConsentError::Interface(InterfaceError::UnexpectedReturn {
        method: method.to_string(),
        detail: detail.into(),
    })
}
