// src/main.rs

//! # dao-vc - Command Line Entry Point
//!
//! Issues EIP-712 signed DAO credentials and verifies them off-chain or
//! against a deployed `DaoVcVerifier` contract.
//!
//! ## Commands
//! - `issue --document <file>`: sign a raw credential document
//! - `verify --credential <file>`: recover the signer and compare it with the issuer
//! - `resolve <did>`: show the account behind a `did:pkh` identifier
//! - `present --credential <file>`: verify on-chain and report gas
//! - `digest --credential <file>`: print the typed-data and contract digests
//! - `export --credential <file>`: print a credential with W3C field names
//!
//! ## Settings
//! Read from `dao-vc.toml` and `DAO_VC_*` environment variables (see
//! [`dao_vc::config`]). `DAO_VC_PRIVATE_KEY` is needed for `issue`,
//! `DAO_VC_RPC_URL` and `DAO_VC_VERIFIER_CONTRACT` for `present`.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use dao_vc::blockchain::ledger_client::LedgerClient;
use dao_vc::config::Settings;
use dao_vc::contracts::dao_vc_verifier::{contract_digest, DaoVc, DaoVcVerifierContract};
use dao_vc::eip712::digest::{digest, struct_hash};
use dao_vc::eip712::schema::{SchemaRegistry, DAO_VC_KIND};
use dao_vc::models::document::RawDocument;
use dao_vc::services::verifier::verify_self_described;
use dao_vc::utils::crypto::checksum;
use dao_vc::utils::serialization::{read_json_file, serialize_pretty};
use dao_vc::{CredentialIssuer, PkhIdentity, SignedCredential, Verifier};
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "dao-vc", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign a raw credential document and print the signed envelope.
    Issue {
        /// JSON file with `@context`, `type` and `credentialSubject`.
        #[arg(long)]
        document: PathBuf,

        /// Write the envelope here instead of stdout.
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Verify a signed credential off-chain.
    Verify {
        #[arg(long)]
        credential: PathBuf,

        /// Trust the types embedded in the credential instead of the built-in schema.
        #[arg(long)]
        self_described: bool,
    },

    /// Resolve a `did:pkh` identifier to its account.
    Resolve { did: String },

    /// Verify a signed credential with the configured on-chain verifier.
    Present {
        #[arg(long)]
        credential: PathBuf,
    },

    /// Print the digests a credential's signature covers.
    Digest {
        #[arg(long)]
        credential: PathBuf,
    },

    /// Print a signed credential with `@context` and `type` restored.
    Export {
        #[arg(long)]
        credential: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.command {
        Command::Issue { document, out } => issue(&document, out.as_deref()).await,
        Command::Verify {
            credential,
            self_described,
        } => verify(&credential, self_described),
        Command::Resolve { did } => resolve(&did),
        Command::Present { credential } => present(&credential).await,
        Command::Digest { credential } => print_digests(&credential),
        Command::Export { credential } => export(&credential),
    }
}

fn load_credential(path: &Path) -> anyhow::Result<SignedCredential> {
    read_json_file(path).with_context(|| format!("reading credential {}", path.display()))
}

fn verdict(valid: bool) -> ExitCode {
    if valid {
        println!("valid");
        ExitCode::SUCCESS
    } else {
        println!("invalid");
        ExitCode::FAILURE
    }
}

async fn issue(document: &Path, out: Option<&Path>) -> anyhow::Result<ExitCode> {
    let settings = Settings::load().context("loading settings")?;
    let keys = settings.key_manager()?;
    let schema = SchemaRegistry::builtin().get(DAO_VC_KIND)?;
    let raw: RawDocument = read_json_file(document)
        .with_context(|| format!("reading document {}", document.display()))?;

    let issuer = CredentialIssuer::new(keys.into_wallet(), settings.domain()?, schema);
    let credential = issuer.issue(&raw).await?;
    let rendered = serialize_pretty(&credential)?;

    match out {
        Some(path) => {
            std::fs::write(path, rendered)
                .with_context(|| format!("writing credential {}", path.display()))?;
            info!("credential written to {}", path.display());
        }
        None => println!("{rendered}"),
    }
    Ok(ExitCode::SUCCESS)
}

fn verify(credential: &Path, self_described: bool) -> anyhow::Result<ExitCode> {
    let credential = load_credential(credential)?;
    let valid = if self_described {
        verify_self_described(&credential)?
    } else {
        Verifier::new(SchemaRegistry::builtin().get(DAO_VC_KIND)?).verify_credential(&credential)?
    };
    Ok(verdict(valid))
}

fn resolve(did: &str) -> anyhow::Result<ExitCode> {
    let identity: PkhIdentity = did.parse()?;
    println!("chain id:            {}", identity.chain_id());
    println!("account:             {}", checksum(&identity.address()));
    println!("verification method: {}", identity.verification_method());
    Ok(ExitCode::SUCCESS)
}

async fn present(credential: &Path) -> anyhow::Result<ExitCode> {
    let settings = Settings::load().context("loading settings")?;
    let credential = load_credential(credential)?;
    let domain = &credential.proof.eip712.domain;

    let ledger = LedgerClient::connect(settings.rpc_url()?)?;
    let chain_id = ledger.chain_id().await?;
    if chain_id != domain.chain_id() {
        bail!(
            "credential is scoped to chain {} but the node reports chain {}",
            domain.chain_id(),
            chain_id
        );
    }

    let contract = DaoVcVerifierContract::new(ledger, settings.verifier_contract()?);
    if !domain.is_neutral() && domain.verifying_contract() != contract.address() {
        warn!(
            "credential is pinned to {:?}, presenting to {:?}",
            domain.verifying_contract(),
            contract.address()
        );
    }

    let outcome = contract
        .verify(&credential.document, &credential.proof.proof_value)
        .await?;
    println!("gas: {}", outcome.gas);
    Ok(verdict(outcome.valid))
}

fn print_digests(credential: &Path) -> anyhow::Result<ExitCode> {
    let credential = load_credential(credential)?;
    let schema = SchemaRegistry::builtin().get(DAO_VC_KIND)?;
    let domain = &credential.proof.eip712.domain;

    let typed = digest(domain, &schema, &credential.document)?;
    let mirrored = contract_digest(domain, &DaoVc::from_document(&credential.document)?);

    println!("domain separator: {:?}", domain.separator());
    println!("struct hash:      {:?}", struct_hash(&schema, &credential.document)?);
    println!("typed-data:       {typed:?}");
    println!("contract mirror:  {mirrored:?}");
    if typed != mirrored {
        warn!("typed-data and contract digests differ");
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

fn export(credential: &Path) -> anyhow::Result<ExitCode> {
    let credential = load_credential(credential)?;
    println!("{}", serialize_pretty(&credential.to_w3c()?)?);
    Ok(ExitCode::SUCCESS)
}
