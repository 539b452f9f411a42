//! Command handlers for the CLI

use alloy_primitives::Address;
use dao_api::{run_server, ApiConfig, AppComponents, AppState, JwtIdentityProvider};
use dao_chain::{
    AbiModule, AbiRegistry, ChainConfig, Expectation, JsonRpcReceiptFetcher, TransactionVerifier,
};
use dao_core::{parse_address, parse_tx_hash};
use dao_db::services::UserService;
use dao_db::MemoryDocumentStore;
use dao_payments::{GoCardlessClient, GoCardlessConfig, MockPaymentProvider, PaymentProvider};
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

pub type CmdResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

pub struct StartOptions {
    pub rpc_url: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub data_file: Option<PathBuf>,
    pub mock_payments: bool,
}

/// Chain settings from the environment, with the `--rpc-url` override
fn chain_config(rpc_url: Option<String>) -> Result<ChainConfig, Box<dyn std::error::Error + Send + Sync>> {
    let mut config = ChainConfig::from_env()?;
    if let Some(url) = rpc_url {
        config.rpc_url = url;
    }
    config.validate()?;
    Ok(config)
}

fn load_store(path: Option<&Path>) -> Result<MemoryDocumentStore, Box<dyn std::error::Error + Send + Sync>> {
    match path {
        Some(path) if path.is_file() => {
            let store = MemoryDocumentStore::from_json(&fs::read_to_string(path)?)?;
            info!(path = %path.display(), documents = store.document_count(), "Loaded document snapshot");
            Ok(store)
        }
        _ => Ok(MemoryDocumentStore::new()),
    }
}

fn save_store(store: &MemoryDocumentStore, path: &Path) -> CmdResult {
    fs::write(path, store.to_json()?)?;
    info!(path = %path.display(), documents = store.document_count(), "Saved document snapshot");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}

/// Handle `start`
pub async fn handle_start(options: StartOptions) -> CmdResult {
    let chain = chain_config(options.rpc_url)?;
    let registry = Arc::new(AbiRegistry::load(chain.abi_dir.as_deref())?);
    let fetcher = Arc::new(JsonRpcReceiptFetcher::new(chain.clone())?);

    let mut api = ApiConfig::from_env()?;
    if let Some(host) = options.host {
        api.host = host;
    }
    if let Some(port) = options.port {
        api.port = port;
    }

    let payments = GoCardlessConfig::from_env();
    let success_redirect_url = payments.success_redirect_url.clone();
    let payment_provider: Arc<dyn PaymentProvider> = if options.mock_payments {
        warn!("Serving payments from the mock provider");
        Arc::new(MockPaymentProvider::new())
    } else {
        Arc::new(GoCardlessClient::new(payments)?)
    };

    let store = Arc::new(load_store(options.data_file.as_deref())?);
    let state = AppState::new(AppComponents {
        store: store.clone(),
        verifier: TransactionVerifier::new(fetcher, registry),
        payment_provider,
        identity: Arc::new(JwtIdentityProvider::new(api.auth.clone())),
        dao_factory: chain.dao_factory,
        success_redirect_url,
    });

    println!("Starting DAO API server on {}:{}...", api.host, api.port);
    println!("  Chain RPC: {}", chain.rpc_url);
    run_server(&api, state, shutdown_signal()).await?;

    if let Some(path) = options.data_file {
        save_store(&store, &path)?;
    }
    Ok(())
}

fn parse_module(name: &str) -> Result<AbiModule, String> {
    let wanted = name.to_lowercase();
    AbiModule::ALL
        .into_iter()
        .find(|module| {
            let contract = module.contract_name().to_lowercase();
            contract == wanted || contract.trim_end_matches("module") == wanted
        })
        .ok_or_else(|| {
            let known: Vec<_> = AbiModule::ALL.iter().map(AbiModule::contract_name).collect();
            format!("unknown module {}; expected one of {}", name, known.join(", "))
        })
}

/// Handle `verify-tx`
pub async fn handle_verify_tx(
    rpc_url: Option<String>,
    tx_hash: &str,
    event: Option<(String, String)>,
    to: Option<&str>,
) -> CmdResult {
    let chain = chain_config(rpc_url)?;
    let registry = Arc::new(AbiRegistry::load(chain.abi_dir.as_deref())?);
    let fetcher = Arc::new(JsonRpcReceiptFetcher::new(chain)?);
    let verifier = TransactionVerifier::new(fetcher, registry);

    let tx_hash = parse_tx_hash(tx_hash)?;
    let destination: Option<Address> = to.map(|raw| parse_address("to", raw)).transpose()?;
    let module = event
        .as_ref()
        .map(|(module, _)| parse_module(module))
        .transpose()?;

    let mut expectation = Expectation::default().sent_to(destination);
    if let (Some(module), Some((_, name))) = (module, event.as_ref()) {
        expectation = Expectation::event(module, name).sent_to(destination);
    }

    let verified = verifier.verify(&tx_hash, &expectation).await?;

    println!("Transaction verified");
    println!("  Hash: {}", verified.tx_hash());
    println!("  From: {}", verified.sender());
    if let Some(to) = verified.receipt.to {
        println!("  To: {}", to);
    }
    println!("  Block: {}", verified.receipt.block_number);
    println!("  Logs: {}", verified.receipt.logs.len());

    if let Some(decoded) = verified.event {
        let args: serde_json::Map<String, Value> = decoded
            .args
            .iter()
            .map(|(name, value)| (name.clone(), value.to_json()))
            .collect();
        println!("  Event: {} (log {})", decoded.signature, decoded.log_index);
        println!("{}", serde_json::to_string_pretty(&Value::Object(args))?);
    }
    Ok(())
}

/// Handle `recount-members`
pub async fn handle_recount_members(data_file: &Path) -> CmdResult {
    if !data_file.is_file() {
        return Err(format!("snapshot {} does not exist", data_file.display()).into());
    }
    let store = Arc::new(load_store(Some(data_file))?);
    let users = UserService::new(store.clone());

    let updated = users.recount_members().await?;
    save_store(&store, data_file)?;

    println!("Member counts corrected: {}", updated);
    Ok(())
}

/// Handle `status`
pub async fn handle_status(rpc_url: Option<String>, api_url: &str) -> CmdResult {
    let chain = chain_config(rpc_url)?;
    let fetcher = JsonRpcReceiptFetcher::new(chain)?;
    let chain_status = match fetcher.block_number().await {
        Ok(block) => json!({ "rpcUrl": fetcher.rpc_url(), "blockNumber": block }),
        Err(e) => json!({ "rpcUrl": fetcher.rpc_url(), "error": e.to_string() }),
    };

    let client = reqwest::Client::new();
    let server_status = match client.get(format!("{}/health", api_url)).send().await {
        Ok(response) => response.json::<Value>().await?,
        Err(e) => json!({ "url": api_url, "error": e.to_string() }),
    };

    let status = json!({ "chain": chain_status, "server": server_status });
    println!("Status: {}", serde_json::to_string_pretty(&status)?);
    Ok(())
}
