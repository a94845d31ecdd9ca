use std::collections::BTreeSet;
use std::time::Duration;

use alloy::dyn_abi::DynSolValue;
use alloy::primitives::U256;

use crate::consent::{DataFlags, Identity, Purpose};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TermsError {
    #[error("a consent record needs at least one recipient")]
    NoRecipients,

    #[error("consent duration must be at least one second")]
    ZeroDuration,
}

/// The fixed part of a consent record, everything the data subject agrees to at creation time.
///
/// The data subject is not part of the terms, it is whoever signs the creation. Nothing prevents
/// the controller from being the data subject itself.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConsentTerms {
    pub controller: Identity,
    pub recipients: BTreeSet<Identity>,
    pub data: DataFlags,

    /// Length of the validity window counted from creation. Sub-second precision is dropped.
    pub duration: Duration,

    pub purposes: BTreeSet<Purpose>,
}

impl ConsentTerms {
    pub fn new(
        controller: Identity,
        recipients: impl IntoIterator<Item = Identity>,
        data: DataFlags,
        duration: Duration,
        purposes: impl IntoIterator<Item = Purpose>,
    ) -> Result<Self, TermsError> {
        let terms = Self {
            controller,
            recipients: recipients.into_iter().collect(),
            data,
            duration,
            purposes: purposes.into_iter().collect(),
        };

        terms.validate()?;

        Ok(terms)
    }

    pub fn validate(&self) -> Result<(), TermsError> {
        if self.recipients.is_empty() {
            return Err(TermsError::NoRecipients);
        }

        if self.duration.as_secs() == 0 {
            return Err(TermsError::ZeroDuration);
        }

        Ok(())
    }

    /// Arguments in the order the contract constructor takes them.
    pub(crate) fn constructor_args(&self) -> Vec<DynSolValue> {
        let recipients = self
            .recipients
            .iter()
            .map(|recipient| DynSolValue::Address(recipient.address()))
            .collect();

        let purposes = self
            .purposes
            .iter()
            .map(|purpose| DynSolValue::Uint(U256::from(purpose.code()), 8))
            .collect();

        vec![
            DynSolValue::Address(self.controller.address()),
            DynSolValue::Array(recipients),
            DynSolValue::Uint(self.data.to_u256(), 256),
            DynSolValue::Uint(U256::from(self.duration.as_secs()), 256),
            DynSolValue::Array(purposes),
        ]
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::Address;

    use super::*;

    fn identity(byte: u8) -> Identity {
        Identity::new(Address::repeat_byte(byte))
    }

    #[test]
    fn test_local_validation() {
        let err = ConsentTerms::new(identity(1), [], DataFlags::NAME, Duration::from_secs(60), [])
            .unwrap_err();
        assert_eq!(err, TermsError::NoRecipients);

        let too_short = Duration::from_millis(999);
        let err = ConsentTerms::new(identity(1), [identity(2)], DataFlags::NAME, too_short, [])
            .unwrap_err();
        assert_eq!(err, TermsError::ZeroDuration);
    }

    #[test]
    fn test_subject_may_be_controller() {
        let terms = ConsentTerms::new(
            identity(1),
            [identity(1)],
            DataFlags::NONE,
            Duration::from_secs(1),
            [],
        );
        assert!(terms.is_ok());
    }

    #[test]
    fn test_constructor_args_layout() {
        let terms = ConsentTerms::new(
            identity(1),
            [identity(3), identity(2), identity(3)],
            DataFlags::from_bits(0b1011),
            Duration::from_secs(86_400),
            [Purpose::ANALYTICS, Purpose::MARKETING],
        )
        .unwrap();

        let args = terms.constructor_args();
        assert_eq!(args.len(), 5);
        assert_eq!(args[0], DynSolValue::Address(Address::repeat_byte(1)));
        assert_eq!(
            args[1],
            DynSolValue::Array(vec![
                DynSolValue::Address(Address::repeat_byte(2)),
                DynSolValue::Address(Address::repeat_byte(3)),
            ])
        );
        assert_eq!(args[2], DynSolValue::Uint(U256::from(11u64), 256));
        assert_eq!(args[3], DynSolValue::Uint(U256::from(86_400u64), 256));
        assert_eq!(
            args[4],
            DynSolValue::Array(vec![
                DynSolValue::Uint(U256::ZERO, 8),
                DynSolValue::Uint(U256::from(1u64), 8),
            ])
        );
    }
}
