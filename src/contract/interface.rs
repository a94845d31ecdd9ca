use alloy::dyn_abi::{DynSolType, DynSolValue, FunctionExt, JsonAbiExt, Specifier};
use alloy::json_abi::{Function, JsonAbi, Param, StateMutability};
use alloy::primitives::Bytes;

use crate::contract::InterfaceError;

/// A contract's ABI plus the bytecode needed to deploy new instances of it.
///
/// Values handed to the encoders are conformed to the declared parameter types first, so callers
/// can pass a `uint256` for a `uint8[]` element and the like without knowing the exact widths the
/// contract author picked.
#[derive(Debug)]
pub struct ContractInterface {
    name: String,
    abi: JsonAbi,
    bytecode: Option<Bytes>,
}

impl ContractInterface {
    pub fn abi(&self) -> &JsonAbi {
        &self.abi
    }

    pub fn bytecode(&self) -> Option<&Bytes> {
        self.bytecode.as_ref()
    }

    pub fn decode_output(
        &self,
        method: &str,
        data: &[u8],
    ) -> Result<Vec<DynSolValue>, InterfaceError> {
        let function = self.function(method)?;
        Ok(function.abi_decode_output(data)?)
    }

    pub fn encode_call(&self, method: &str, args: &[DynSolValue]) -> Result<Bytes, InterfaceError> {
        let function = self.function(method)?;
        let args = conform_all(method, &function.inputs, args)?;
        Ok(function.abi_encode_input(&args)?.into())
    }

    /// Creation payload: the contract bytecode followed by the encoded constructor arguments.
    pub fn encode_deployment(&self, args: &[DynSolValue]) -> Result<Bytes, InterfaceError> {
        let bytecode = self.bytecode.as_ref().ok_or(InterfaceError::MissingBytecode)?;

        let encoded_args = match self.abi.constructor() {
            Some(constructor) => {
                let args = conform_all("constructor", &constructor.inputs, args)?;
                constructor.abi_encode_input(&args)?
            }
            None if args.is_empty() => Vec::new(),
            None => {
                return Err(InterfaceError::ArgumentCount {
                    method: "constructor".to_string(),
                    expected: 0,
                    given: args.len(),
                })
            }
        };

        let mut payload = bytecode.to_vec();
        payload.extend(encoded_args);

        Ok(payload.into())
    }

    pub fn function(&self, method: &str) -> Result<&Function, InterfaceError> {
        self.abi
            .function(method)
            .and_then(|overloads| overloads.first())
            .ok_or_else(|| InterfaceError::UnknownMethod(method.to_string()))
    }

    pub fn has_method(&self, method: &str) -> bool {
        self.function(method).is_ok()
    }

    /// Whether the method can be evaluated with a plain call instead of a transaction.
    pub fn is_read_only(&self, method: &str) -> Result<bool, InterfaceError> {
        let function = self.function(method)?;

        Ok(matches!(
            function.state_mutability,
            StateMutability::View | StateMutability::Pure
        ))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn new(name: impl Into<String>, abi: JsonAbi, bytecode: Option<Bytes>) -> Self {
        Self {
            name: name.into(),
            abi,
            bytecode,
        }
    }

    pub(crate) fn decode_deployment(
        &self,
        payload: &[u8],
    ) -> Result<Vec<DynSolValue>, InterfaceError> {
        let bytecode = self.bytecode.as_ref().ok_or(InterfaceError::MissingBytecode)?;

        let encoded_args = payload.strip_prefix(&bytecode[..]).ok_or_else(|| {
            InterfaceError::Malformed("creation payload doesn't carry the contract bytecode".into())
        })?;

        match self.abi.constructor() {
            Some(constructor) => Ok(constructor.abi_decode_input(encoded_args)?),
            None => Ok(Vec::new()),
        }
    }

    /// Matches calldata to a function by its selector and decodes the arguments.
    pub(crate) fn decode_invocation(
        &self,
        calldata: &[u8],
    ) -> Option<Result<(&Function, Vec<DynSolValue>), InterfaceError>> {
        if calldata.len() < 4 {
            return None;
        }

        let (selector, encoded_args) = calldata.split_at(4);
        let function = self
            .abi
            .functions()
            .find(|function| function.selector().as_slice() == selector)?;

        Some(
            function
                .abi_decode_input(encoded_args)
                .map(|args| (function, args))
                .map_err(InterfaceError::from),
        )
    }

    pub(crate) fn encode_output(
        &self,
        method: &str,
        values: &[DynSolValue],
    ) -> Result<Bytes, InterfaceError> {
        let function = self.function(method)?;
        let values = conform_all(method, &function.outputs, values)?;
        Ok(function.abi_encode_output(&values)?.into())
    }
}

fn conform_all(
    method: &str,
    params: &[Param],
    values: &[DynSolValue],
) -> Result<Vec<DynSolValue>, InterfaceError> {
    if params.len() != values.len() {
        return Err(InterfaceError::ArgumentCount {
            method: method.to_string(),
            expected: params.len(),
            given: values.len(),
        });
    }

    params
        .iter()
        .zip(values)
        .enumerate()
        .map(|(index, (param, value))| {
            let ty = param.resolve()?;
            conform(value.clone(), &ty).ok_or_else(|| InterfaceError::ArgumentType {
                method: method.to_string(),
                index,
                expected: ty.to_string(),
            })
        })
        .collect()
}

fn conform(value: DynSolValue, ty: &DynSolType) -> Option<DynSolValue> {
    match (value, ty) {
        (DynSolValue::Uint(number, _), DynSolType::Uint(bits)) => {
            (number.bit_len() <= *bits).then_some(DynSolValue::Uint(number, *bits))
        }
        (DynSolValue::Array(values), DynSolType::Array(inner)) => values
            .into_iter()
            .map(|value| conform(value, inner))
            .collect::<Option<Vec<_>>>()
            .map(DynSolValue::Array),
        (value, ty) if ty.matches(&value) => Some(value),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::{Address, U256};

    use super::*;
    use crate::contract::ContractArtifact;

    fn fixture_interface() -> ContractInterface {
        let raw = include_str!("../../fixtures/CollectionConsent.json");
        let (interface, _) = ContractArtifact::from_json(raw).unwrap().into_parts().unwrap();
        interface
    }

    #[test]
    fn test_read_only_detection() {
        let interface = fixture_interface();

        assert!(interface.is_read_only("verify").unwrap());
        assert!(interface.is_read_only("consentFromDS").unwrap());
        assert!(!interface.is_read_only("grantConsent").unwrap());
        assert!(matches!(
            interface.is_read_only("selfDestruct"),
            Err(InterfaceError::UnknownMethod(_))
        ));
    }

    #[test]
    fn test_call_encoding_starts_with_selector() {
        let interface = fixture_interface();
        let calldata = interface.encode_call("grantConsent", &[]).unwrap();

        let selector = interface.function("grantConsent").unwrap().selector();
        assert_eq!(&calldata[..], selector.as_slice());
    }

    #[test]
    fn test_uint_widths_are_conformed() {
        let interface = fixture_interface();
        let recipient = Address::repeat_byte(0x42);

        // Purposes are declared as uint8[] while callers hand over full width integers
        let args = vec![
            DynSolValue::Address(Address::repeat_byte(0x01)),
            DynSolValue::Array(vec![DynSolValue::Address(recipient)]),
            DynSolValue::Uint(U256::from(11u64), 256),
            DynSolValue::Uint(U256::from(86_400u64), 256),
            DynSolValue::Array(vec![
                DynSolValue::Uint(U256::from(0u64), 256),
                DynSolValue::Uint(U256::from(1u64), 256),
            ]),
        ];

        let payload = interface.encode_deployment(&args).unwrap();
        let decoded = interface.decode_deployment(&payload).unwrap();

        assert_eq!(decoded.len(), 5);
        assert_eq!(decoded[2], DynSolValue::Uint(U256::from(11u64), 256));
        assert_eq!(
            decoded[4],
            DynSolValue::Array(vec![
                DynSolValue::Uint(U256::from(0u64), 8),
                DynSolValue::Uint(U256::from(1u64), 8),
            ])
        );
    }

    #[test]
    fn test_oversized_purpose_is_rejected() {
        let interface = fixture_interface();

        let args = vec![
            DynSolValue::Address(Address::repeat_byte(0x01)),
            DynSolValue::Array(vec![DynSolValue::Address(Address::repeat_byte(0x02))]),
            DynSolValue::Uint(U256::from(1u64), 256),
            DynSolValue::Uint(U256::from(60u64), 256),
            DynSolValue::Array(vec![DynSolValue::Uint(U256::from(300u64), 256)]),
        ];

        assert!(matches!(
            interface.encode_deployment(&args),
            Err(InterfaceError::ArgumentType { index: 4, .. })
        ));
    }

    #[test]
    fn test_wrong_argument_count() {
        let interface = fixture_interface();
        let err = interface
            .encode_call("authorize", &[DynSolValue::Bool(true)])
            .unwrap_err();

        assert!(matches!(
            err,
            InterfaceError::ArgumentCount {
                expected: 2,
                given: 1,
                ..
            }
        ));
    }

    #[test]
    fn test_invocation_round_trip_by_selector() {
        let interface = fixture_interface();
        let who = Address::repeat_byte(0x07);

        let calldata = interface
            .encode_call("addDelegate", &[DynSolValue::Address(who)])
            .unwrap();
        let (function, args) = interface.decode_invocation(&calldata).unwrap().unwrap();

        assert_eq!(function.name, "addDelegate");
        assert_eq!(args, vec![DynSolValue::Address(who)]);
        assert!(interface.decode_invocation(&[0xff, 0xff, 0xff, 0xff]).is_none());
    }
}
