//! Contract ABI registry
//!
//! Every platform contract module ships an ABI JSON file under `abis/`,
//! embedded into the binary. A directory override can replace any of them at
//! startup; after that the registry is immutable.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use tracing::info;

use crate::decoder::EventLogDecoder;
use crate::error::{ChainError, ChainResult};

/// Contract modules whose events the platform verifies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AbiModule {
    DaoFactory,
    ProposalVoting,
    ClaimVoting,
    Member,
    TaskManagement,
    Calendar,
    DocumentSigning,
    Announcement,
}

impl AbiModule {
    pub const ALL: [AbiModule; 8] = [
        AbiModule::DaoFactory,
        AbiModule::ProposalVoting,
        AbiModule::ClaimVoting,
        AbiModule::Member,
        AbiModule::TaskManagement,
        AbiModule::Calendar,
        AbiModule::DocumentSigning,
        AbiModule::Announcement,
    ];

    /// Contract name, also the ABI file stem
    pub fn contract_name(&self) -> &'static str {
        match self {
            AbiModule::DaoFactory => "DaoFactory",
            AbiModule::ProposalVoting => "ProposalVotingModule",
            AbiModule::ClaimVoting => "ClaimVotingModule",
            AbiModule::Member => "MemberModule",
            AbiModule::TaskManagement => "TaskManagementModule",
            AbiModule::Calendar => "CalendarModule",
            AbiModule::DocumentSigning => "DocumentSigningModule",
            AbiModule::Announcement => "AnnouncementModule",
        }
    }

    fn embedded_json(&self) -> &'static str {
        match self {
            AbiModule::DaoFactory => include_str!("../abis/DaoFactory.json"),
            AbiModule::ProposalVoting => include_str!("../abis/ProposalVotingModule.json"),
            AbiModule::ClaimVoting => include_str!("../abis/ClaimVotingModule.json"),
            AbiModule::Member => include_str!("../abis/MemberModule.json"),
            AbiModule::TaskManagement => include_str!("../abis/TaskManagementModule.json"),
            AbiModule::Calendar => include_str!("../abis/CalendarModule.json"),
            AbiModule::DocumentSigning => include_str!("../abis/DocumentSigningModule.json"),
            AbiModule::Announcement => include_str!("../abis/AnnouncementModule.json"),
        }
    }
}

impl fmt::Display for AbiModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.contract_name())
    }
}

/// Compiled decoders for every contract module
#[derive(Debug, Clone)]
pub struct AbiRegistry {
    decoders: HashMap<AbiModule, EventLogDecoder>,
}

impl AbiRegistry {
    /// Registry built from the embedded ABI files
    pub fn embedded() -> ChainResult<Self> {
        Self::load(None)
    }

    /// Registry built from the embedded ABIs, with `<dir>/<ContractName>.json`
    /// taking precedence where present
    pub fn load(dir: Option<&Path>) -> ChainResult<Self> {
        let mut decoders = HashMap::with_capacity(AbiModule::ALL.len());

        for module in AbiModule::ALL {
            let override_path = dir.map(|d| d.join(format!("{}.json", module.contract_name())));
            let decoder = match override_path {
                Some(path) if path.is_file() => {
                    let source = std::fs::read_to_string(&path).map_err(|e| {
                        ChainError::Abi(format!("reading {}: {}", path.display(), e))
                    })?;
                    info!(module = %module, path = %path.display(), "Loaded ABI override");
                    EventLogDecoder::from_json(&source)?
                }
                _ => EventLogDecoder::from_json(module.embedded_json())?,
            };
            decoders.insert(module, decoder);
        }

        Ok(Self { decoders })
    }

    /// Decoder for `module`
    pub fn decoder(&self, module: AbiModule) -> ChainResult<&EventLogDecoder> {
        self.decoders
            .get(&module)
            .ok_or_else(|| ChainError::Abi(format!("no ABI registered for {}", module)))
    }

    /// Total compiled events across all modules
    pub fn event_count(&self) -> usize {
        self.decoders.values().map(EventLogDecoder::len).sum()
    }
}
