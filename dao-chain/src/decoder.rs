//! Event log decoding
//!
//! An ABI is compiled once into a lookup table keyed by event selector
//! (`topics[0]`). Decoding a log is then a table lookup followed by a typed
//! decode of the indexed topics and the data section. Logs that match no
//! entry are skipped; a log whose selector matches but whose layout does not
//! is rejected rather than coerced.

use alloy_dyn_abi::{DynSolType, DynSolValue, Specifier};
use alloy_json_abi::{Event, EventParam};
use alloy_primitives::{keccak256, Address, Bytes, B256, I256, U256};
use dao_core::{CanonicalAddress, DaoError, DaoResult};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, trace};

use crate::error::{ChainError, ChainResult};
use crate::receipt::RawLog;

/// A decoded argument value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbiValue {
    Address(Address),
    Uint(U256),
    Int(I256),
    Bool(bool),
    String(String),
    Bytes(Bytes),
    FixedBytes(Vec<u8>),
    Array(Vec<AbiValue>),
    /// Keccak hash standing in for an indexed dynamic value
    TopicHash(B256),
    /// Types this platform never emits (function pointers and the like)
    Unsupported(String),
}

impl AbiValue {
    fn from_dyn(value: DynSolValue) -> Self {
        match value {
            DynSolValue::Address(a) => Self::Address(a),
            DynSolValue::Uint(u, _) => Self::Uint(u),
            DynSolValue::Int(i, _) => Self::Int(i),
            DynSolValue::Bool(b) => Self::Bool(b),
            DynSolValue::String(s) => Self::String(s),
            DynSolValue::Bytes(b) => Self::Bytes(Bytes::from(b)),
            DynSolValue::FixedBytes(word, size) => Self::FixedBytes(word[..size].to_vec()),
            DynSolValue::Array(items)
            | DynSolValue::FixedArray(items)
            | DynSolValue::Tuple(items) => {
                Self::Array(items.into_iter().map(Self::from_dyn).collect())
            }
            other => Self::Unsupported(format!("{:?}", other)),
        }
    }

    /// JSON rendering: integers as decimal strings, addresses checksummed
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value;
        match self {
            Self::Address(a) => Value::String(a.canonical()),
            Self::Uint(u) => Value::String(u.to_string()),
            Self::Int(i) => Value::String(i.to_string()),
            Self::Bool(b) => Value::Bool(*b),
            Self::String(s) => Value::String(s.clone()),
            Self::Bytes(b) => Value::String(b.to_string()),
            Self::FixedBytes(b) => Value::String(format!("0x{}", alloy_primitives::hex::encode(b))),
            Self::Array(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            Self::TopicHash(h) => Value::String(h.to_string()),
            Self::Unsupported(s) => Value::String(s.clone()),
        }
    }
}

/// A log matched against a known event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedEvent {
    pub name: String,
    /// Canonical signature, e.g. `VoteCast(uint256,address,bool)`
    pub signature: String,
    /// Contract that emitted the log
    pub emitter: Address,
    pub log_index: u64,
    /// Arguments in declaration order
    pub args: Vec<(String, AbiValue)>,
}

impl DecodedEvent {
    /// Whether `wanted` names this event, either by bare name or full signature
    pub fn matches(&self, wanted: &str) -> bool {
        if wanted.contains('(') {
            self.signature == wanted
        } else {
            self.name == wanted
        }
    }

    /// Argument by name
    pub fn get(&self, name: &str) -> Option<&AbiValue> {
        self.args.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Argument by position
    pub fn arg(&self, index: usize) -> Option<&AbiValue> {
        self.args.get(index).map(|(_, v)| v)
    }

    fn require(&self, name: &str) -> DaoResult<&AbiValue> {
        self.get(name).ok_or_else(|| DaoError::FieldMismatch {
            field: name.to_string(),
            detail: format!("event {} has no argument `{}`", self.name, name),
        })
    }

    fn wrong_type(&self, name: &str, expected: &str) -> DaoError {
        DaoError::FieldMismatch {
            field: name.to_string(),
            detail: format!("event {} argument `{}` is not {}", self.name, name, expected),
        }
    }

    pub fn address(&self, name: &str) -> DaoResult<Address> {
        match self.require(name)? {
            AbiValue::Address(a) => Ok(*a),
            _ => Err(self.wrong_type(name, "an address")),
        }
    }

    pub fn uint(&self, name: &str) -> DaoResult<U256> {
        match self.require(name)? {
            AbiValue::Uint(u) => Ok(*u),
            _ => Err(self.wrong_type(name, "an unsigned integer")),
        }
    }

    /// Small unsigned integer (enum indexes, timestamps)
    pub fn uint_u64(&self, name: &str) -> DaoResult<u64> {
        let value = self.uint(name)?;
        u64::try_from(value).map_err(|_| self.wrong_type(name, "within u64 range"))
    }

    pub fn string(&self, name: &str) -> DaoResult<&str> {
        match self.require(name)? {
            AbiValue::String(s) => Ok(s.as_str()),
            _ => Err(self.wrong_type(name, "a string")),
        }
    }

    pub fn boolean(&self, name: &str) -> DaoResult<bool> {
        match self.require(name)? {
            AbiValue::Bool(b) => Ok(*b),
            _ => Err(self.wrong_type(name, "a bool")),
        }
    }

    /// Arguments as a JSON object
    pub fn args_json(&self) -> serde_json::Value {
        let map = self
            .args
            .iter()
            .map(|(name, value)| (name.clone(), value.to_json()))
            .collect::<serde_json::Map<_, _>>();
        serde_json::Value::Object(map)
    }
}

/// One typed argument slot
#[derive(Debug, Clone)]
struct ParamDescriptor {
    name: String,
    ty: DynSolType,
    indexed: bool,
}

/// Compiled event: name, selector and ordered typed params
#[derive(Debug, Clone)]
pub struct EventDescriptor {
    pub name: String,
    pub signature: String,
    pub selector: B256,
    params: Vec<ParamDescriptor>,
    body: DynSolType,
    indexed_count: usize,
}

impl EventDescriptor {
    fn compile(event: &Event) -> ChainResult<Self> {
        let params = event
            .inputs
            .iter()
            .enumerate()
            .map(|(i, param)| resolve_param(&event.name, i, param))
            .collect::<ChainResult<Vec<_>>>()?;

        let body = DynSolType::Tuple(
            params
                .iter()
                .filter(|p| !p.indexed)
                .map(|p| p.ty.clone())
                .collect(),
        );
        let indexed_count = params.iter().filter(|p| p.indexed).count();

        Ok(Self {
            name: event.name.clone(),
            signature: event.signature(),
            selector: event.selector(),
            params,
            body,
            indexed_count,
        })
    }

    /// Decode `log` against this layout
    fn decode(&self, log: &RawLog) -> ChainResult<DecodedEvent> {
        if log.topics.len() != self.indexed_count + 1 {
            return Err(ChainError::Abi(format!(
                "{} expects {} topics, log has {}",
                self.signature,
                self.indexed_count + 1,
                log.topics.len()
            )));
        }

        let mut body = match self
            .body
            .abi_decode_sequence(&log.data)
            .map_err(|e| ChainError::Abi(format!("{} data: {}", self.signature, e)))?
        {
            DynSolValue::Tuple(values) => values.into_iter(),
            other => vec![other].into_iter(),
        };
        let mut topics = log.topics.iter().skip(1);

        let mut args = Vec::with_capacity(self.params.len());
        for param in &self.params {
            let value = if param.indexed {
                let topic = topics
                    .next()
                    .ok_or_else(|| ChainError::Abi(format!("{} is missing a topic", self.signature)))?;
                decode_topic(&param.ty, topic)?
            } else {
                let value = body.next().ok_or_else(|| {
                    ChainError::Abi(format!("{} data is missing `{}`", self.signature, param.name))
                })?;
                AbiValue::from_dyn(value)
            };
            args.push((param.name.clone(), value));
        }

        Ok(DecodedEvent {
            name: self.name.clone(),
            signature: self.signature.clone(),
            emitter: log.address,
            log_index: log.log_index,
            args,
        })
    }

    /// Build the log this event would emit with `values` (declaration order)
    pub fn encode_log(
        &self,
        emitter: Address,
        log_index: u64,
        values: Vec<DynSolValue>,
    ) -> ChainResult<RawLog> {
        if values.len() != self.params.len() {
            return Err(ChainError::Abi(format!(
                "{} takes {} arguments, got {}",
                self.signature,
                self.params.len(),
                values.len()
            )));
        }

        let mut topics = vec![self.selector];
        let mut body = Vec::new();
        for (param, value) in self.params.iter().zip(values) {
            if !param.ty.matches(&value) {
                return Err(ChainError::Abi(format!(
                    "{} argument `{}` is not a {}",
                    self.signature, param.name, param.ty
                )));
            }
            if !param.indexed {
                body.push(value);
            } else if param.ty.is_dynamic() {
                topics.push(keccak256(value.abi_encode_packed()));
            } else {
                topics.push(B256::from_slice(&value.abi_encode()));
            }
        }

        Ok(RawLog {
            address: emitter,
            topics,
            data: Bytes::from(DynSolValue::Tuple(body).abi_encode_params()),
            log_index,
        })
    }
}

fn resolve_param(event: &str, position: usize, param: &EventParam) -> ChainResult<ParamDescriptor> {
    let ty = param
        .resolve()
        .map_err(|e| ChainError::Abi(format!("{} param {}: {}", event, position, e)))?;
    let name = if param.name.is_empty() {
        format!("arg{}", position)
    } else {
        param.name.clone()
    };
    Ok(ParamDescriptor {
        name,
        ty,
        indexed: param.indexed,
    })
}

/// Indexed value types are stored inline; everything else only as a hash
fn decode_topic(ty: &DynSolType, topic: &B256) -> ChainResult<AbiValue> {
    match ty {
        DynSolType::Address
        | DynSolType::Bool
        | DynSolType::Int(_)
        | DynSolType::Uint(_)
        | DynSolType::FixedBytes(_) => ty
            .abi_decode(topic.as_slice())
            .map(AbiValue::from_dyn)
            .map_err(|e| ChainError::Abi(format!("topic as {}: {}", ty, e))),
        _ => Ok(AbiValue::TopicHash(*topic)),
    }
}

/// Minimal view of an ABI JSON item
#[derive(Debug, Deserialize)]
struct AbiItem {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    inputs: Vec<serde_json::Value>,
    #[serde(default)]
    anonymous: bool,
}

/// Compiled decoder for one contract interface
#[derive(Debug, Clone, Default)]
pub struct EventLogDecoder {
    /// Selector → candidates in declaration order
    by_selector: HashMap<B256, Vec<EventDescriptor>>,
    event_count: usize,
}

impl EventLogDecoder {
    /// Compile from ABI JSON: either a bare item array or an artifact with an `abi` field
    pub fn from_json(source: &str) -> ChainResult<Self> {
        let value: serde_json::Value = serde_json::from_str(source)?;
        let items = match value {
            serde_json::Value::Array(items) => items,
            serde_json::Value::Object(mut artifact) => match artifact.remove("abi") {
                Some(serde_json::Value::Array(items)) => items,
                _ => return Err(ChainError::Abi("artifact has no `abi` array".to_string())),
            },
            _ => return Err(ChainError::Abi("ABI must be an array or artifact object".to_string())),
        };

        let mut decoder = Self::default();
        for item in items {
            let item: AbiItem = serde_json::from_value(item)?;
            if item.kind != "event" || item.anonymous {
                continue;
            }
            let inputs = item
                .inputs
                .into_iter()
                .map(serde_json::from_value::<EventParam>)
                .collect::<Result<Vec<_>, _>>()?;
            let event = Event {
                name: item.name,
                inputs,
                anonymous: false,
            };
            decoder.insert(EventDescriptor::compile(&event)?);
        }
        Ok(decoder)
    }

    fn insert(&mut self, descriptor: EventDescriptor) {
        trace!(event = %descriptor.signature, selector = %descriptor.selector, "Compiled event");
        self.event_count += 1;
        self.by_selector
            .entry(descriptor.selector)
            .or_default()
            .push(descriptor);
    }

    /// Number of compiled events
    pub fn len(&self) -> usize {
        self.event_count
    }

    pub fn is_empty(&self) -> bool {
        self.event_count == 0
    }

    /// Descriptor for an event by name or signature
    pub fn event(&self, wanted: &str) -> Option<&EventDescriptor> {
        self.by_selector.values().flatten().find(|d| {
            if wanted.contains('(') {
                d.signature == wanted
            } else {
                d.name == wanted
            }
        })
    }

    /// Decode one log; `None` when no known event fits
    pub fn decode_log(&self, log: &RawLog) -> Option<DecodedEvent> {
        let selector = log.topics.first()?;
        let candidates = self.by_selector.get(selector)?;
        for candidate in candidates {
            match candidate.decode(log) {
                Ok(event) => return Some(event),
                Err(e) => debug!(
                    event = %candidate.signature,
                    log_index = log.log_index,
                    error = %e,
                    "Selector matched but layout did not"
                ),
            }
        }
        None
    }

    /// Lazily decode every recognised log, in emission order
    pub fn decode<'a>(&'a self, logs: &'a [RawLog]) -> impl Iterator<Item = DecodedEvent> + 'a {
        logs.iter().filter_map(move |log| self.decode_log(log))
    }

    /// First log decoding to `wanted` (bare name or full signature)
    pub fn find_first(&self, logs: &[RawLog], wanted: &str) -> Option<DecodedEvent> {
        self.decode(logs).find(|event| event.matches(wanted))
    }
}
