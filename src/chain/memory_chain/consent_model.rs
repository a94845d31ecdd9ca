use std::collections::BTreeSet;

use alloy::dyn_abi::DynSolValue;
use alloy::primitives::{Address, U256};

pub(super) const NOT_ALLOWED: &str = "Actor not allowed";
pub(super) const ONLY_SUBJECT: &str = "Only the data Subject can manage delegates";
pub(super) const NO_RECIPIENTS: &str = "At least one recipient is required";
pub(super) const ZERO_DURATION: &str = "Duration must be greater than zero";

pub(super) type Execution = Result<Vec<DynSolValue>, String>;

/// Behavior of the collection consent contract as exercised by the contract's own test suites.
/// Only used to back [`super::MemoryChain`], the real rules live on chain.
#[derive(Clone, Debug)]
pub(super) struct ConsentModel {
    created_at: u64,
    data_subject: Address,
    controller: Address,
    recipients: Vec<Address>,
    data: U256,
    duration: u64,
    purposes: Vec<U256>,

    consent_from_ds: bool,
    consent_from_dc: bool,
    delegates: BTreeSet<Address>,
}

impl ConsentModel {
    pub(super) fn construct(
        deployer: Address,
        args: &[DynSolValue],
        now: u64,
    ) -> Result<Self, String> {
        let [controller, recipients, data, duration, purposes] = args else {
            return Err(format!("constructor takes 5 arguments, got {}", args.len()));
        };

        let recipients = array_arg(recipients)?
            .iter()
            .map(address_arg)
            .collect::<Result<Vec<_>, _>>()?;
        if recipients.is_empty() {
            return Err(NO_RECIPIENTS.to_string());
        }

        let duration = u64::try_from(uint_arg(duration)?)
            .map_err(|_| "Duration out of range".to_string())?;
        if duration == 0 {
            return Err(ZERO_DURATION.to_string());
        }

        let purposes = array_arg(purposes)?
            .iter()
            .map(uint_arg)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            created_at: now,
            data_subject: deployer,
            controller: address_arg(controller)?,
            recipients,
            data: uint_arg(data)?,
            duration,
            purposes,

            consent_from_ds: false,
            consent_from_dc: false,
            delegates: BTreeSet::new(),
        })
    }

    pub(super) fn read(&self, method: &str, args: &[DynSolValue], now: u64) -> Execution {
        let output = match (method, args) {
            ("verify", []) => DynSolValue::Bool(self.verify(now)),
            ("consentFromDS", []) => DynSolValue::Bool(self.consent_from_ds),
            ("consentFromDC", []) => DynSolValue::Bool(self.consent_from_dc),
            ("dataSubject", []) => DynSolValue::Address(self.data_subject),
            ("controller", []) => DynSolValue::Address(self.controller),
            ("data", []) | ("getData", []) => DynSolValue::Uint(self.data, 256),
            ("duration", []) => DynSolValue::Uint(U256::from(self.duration), 256),
            ("authorize", [recipient, requested]) => {
                let recipient = address_arg(recipient)?;
                let requested = uint_arg(requested)?;

                let known_recipient = self.recipients.contains(&recipient);
                let within_scope = requested & !self.data == U256::ZERO;

                DynSolValue::Bool(self.verify(now) && known_recipient && within_scope)
            }
            ("delegates", [who]) => DynSolValue::Bool(self.delegates.contains(&address_arg(who)?)),
            _ => return Err(format!("unsupported read {method}")),
        };

        Ok(vec![output])
    }

    pub(super) fn write(
        &mut self,
        method: &str,
        args: &[DynSolValue],
        sender: Address,
        now: u64,
    ) -> Execution {
        match (method, args) {
            ("grantConsent", []) => self.set_consent(sender, true)?,
            ("revokeConsent", []) => self.set_consent(sender, false)?,
            ("addDelegate", [delegate]) => {
                self.require_subject(sender)?;
                self.delegates.insert(address_arg(delegate)?);
            }
            ("removeDelegate", [delegate]) => {
                self.require_subject(sender)?;
                self.delegates.remove(&address_arg(delegate)?);
            }
            // Reads sent as transactions execute but change nothing
            _ => {
                self.read(method, args, now)?;
            }
        }

        Ok(Vec::new())
    }

    fn require_subject(&self, sender: Address) -> Result<(), String> {
        if sender != self.data_subject {
            return Err(ONLY_SUBJECT.to_string());
        }

        Ok(())
    }

    // Subject and controller are checked independently, the same account holding both roles
    // moves both flags.
    fn set_consent(&mut self, sender: Address, granted: bool) -> Result<(), String> {
        let acts_for_subject = sender == self.data_subject || self.delegates.contains(&sender);
        let acts_for_controller = sender == self.controller;

        if !acts_for_subject && !acts_for_controller {
            return Err(NOT_ALLOWED.to_string());
        }

        if acts_for_subject {
            self.consent_from_ds = granted;
        }

        if acts_for_controller {
            self.consent_from_dc = granted;
        }

        Ok(())
    }

    fn verify(&self, now: u64) -> bool {
        let expires_at = self.created_at.saturating_add(self.duration);
        self.consent_from_ds && self.consent_from_dc && now >= self.created_at && now < expires_at
    }
}

fn address_arg(value: &DynSolValue) -> Result<Address, String> {
    value.as_address().ok_or_else(|| "expected an address argument".to_string())
}

fn array_arg(value: &DynSolValue) -> Result<&[DynSolValue], String> {
    value.as_array().ok_or_else(|| "expected an array argument".to_string())
}

fn uint_arg(value: &DynSolValue) -> Result<U256, String> {
    value
        .as_uint()
        .map(|(number, _)| number)
        .ok_or_else(|| "expected an unsigned integer argument".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUBJECT: Address = Address::repeat_byte(0x01);
    const CONTROLLER: Address = Address::repeat_byte(0x02);
    const RECIPIENT: Address = Address::repeat_byte(0x03);

    fn constructor_args(recipients: Vec<Address>, data: u64, duration: u64) -> Vec<DynSolValue> {
        vec![
            DynSolValue::Address(CONTROLLER),
            DynSolValue::Array(recipients.into_iter().map(DynSolValue::Address).collect()),
            DynSolValue::Uint(U256::from(data), 256),
            DynSolValue::Uint(U256::from(duration), 256),
            DynSolValue::Array(vec![DynSolValue::Uint(U256::ZERO, 8)]),
        ]
    }

    fn granted_model(duration: u64) -> ConsentModel {
        let args = constructor_args(vec![RECIPIENT], 15, duration);
        let mut model = ConsentModel::construct(SUBJECT, &args, 1_000).unwrap();
        model.write("grantConsent", &[], SUBJECT, 1_000).unwrap();
        model.write("grantConsent", &[], CONTROLLER, 1_000).unwrap();
        model
    }

    #[test]
    fn test_constructor_guards() {
        let args = constructor_args(vec![], 15, 60);
        let err = ConsentModel::construct(SUBJECT, &args, 0).unwrap_err();
        assert_eq!(err, NO_RECIPIENTS);

        let args = constructor_args(vec![RECIPIENT], 15, 0);
        let err = ConsentModel::construct(SUBJECT, &args, 0).unwrap_err();
        assert_eq!(err, ZERO_DURATION);
    }

    #[test]
    fn test_validity_window_is_half_open() {
        let model = granted_model(60);

        assert!(model.verify(1_000));
        assert!(model.verify(1_059));
        assert!(!model.verify(1_060));
        assert!(!model.verify(999));
    }

    #[test]
    fn test_authorize_requires_scope_and_recipient() {
        let model = granted_model(60);
        let check = |who: Address, flags: u64| {
            let args = [
                DynSolValue::Address(who),
                DynSolValue::Uint(U256::from(flags), 256),
            ];
            model.read("authorize", &args, 1_010).unwrap()
        };

        assert_eq!(check(RECIPIENT, 3), vec![DynSolValue::Bool(true)]);
        assert_eq!(check(RECIPIENT, 31), vec![DynSolValue::Bool(false)]);
        assert_eq!(check(CONTROLLER, 1), vec![DynSolValue::Bool(false)]);
    }

    #[test]
    fn test_outsider_cannot_toggle_consent() {
        let mut model = granted_model(60);
        let err = model.write("revokeConsent", &[], RECIPIENT, 1_000).unwrap_err();
        assert_eq!(err, NOT_ALLOWED);
        assert!(model.verify(1_000));
    }

    #[test]
    fn test_delegate_acts_for_subject() {
        let mut model = granted_model(60);
        let delegate = DynSolValue::Address(RECIPIENT);

        let err = model
            .write("addDelegate", &[delegate.clone()], CONTROLLER, 1_000)
            .unwrap_err();
        assert_eq!(err, ONLY_SUBJECT);

        model.write("addDelegate", &[delegate.clone()], SUBJECT, 1_000).unwrap();
        model.write("revokeConsent", &[], RECIPIENT, 1_000).unwrap();
        assert!(!model.consent_from_ds);
        assert!(model.consent_from_dc);

        model.write("removeDelegate", &[delegate], SUBJECT, 1_000).unwrap();
        assert_eq!(model.write("grantConsent", &[], RECIPIENT, 1_000).unwrap_err(), NOT_ALLOWED);
    }
}
