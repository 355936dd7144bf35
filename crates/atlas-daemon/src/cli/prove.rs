use super::snapshot::read_snapshot;
use atlas_crypto::{derive_commitment, IdentitySecret, MembershipKeys};
use atlas_daemon::api::SubmitRequest;
use atlas_daemon::config::AtlasConfig;
use atlas_daemon::services::ProvingClient;
use atlas_types::{AtlasError, AtlasResult, FieldBytes, IdempotencyKey, JurisdictionId};
use rand::rngs::OsRng;
use std::path::PathBuf;
use std::time::Duration;

pub fn new_identity() -> AtlasResult<()> {
    let secret = IdentitySecret::random(&mut OsRng);
    let commitment = derive_commitment(&secret);
    println!("Secret:     {}", FieldBytes::from_bytes(*secret.as_bytes()));
    println!("Commitment: {}", commitment);
    println!();
    println!("Keep the secret offline. Register only the commitment.");
    Ok(())
}

pub struct ProveArgs {
    pub snapshot: PathBuf,
    pub content_id: Option<String>,
    pub secret_file: PathBuf,
    pub jurisdiction: String,
    pub action: String,
    pub payload: String,
}

pub async fn prove(config: &AtlasConfig, args: ProveArgs) -> AtlasResult<()> {
    let snapshot = read_snapshot(&args.snapshot, args.content_id.as_deref())?;
    let secret = read_secret(&args.secret_file)?;
    let commitment = derive_commitment(&secret);
    let jurisdiction = JurisdictionId::new(args.jurisdiction)?;

    let leaf_index = snapshot.find_leaf(&jurisdiction, &commitment)?;
    let path = snapshot.inclusion_path(&jurisdiction, leaf_index)?;

    let keys = MembershipKeys::load(&config.keys_dir())?;
    if keys.params() != snapshot.params() {
        return Err(AtlasError::Config(format!(
            "keys are for depths {}/{}, snapshot uses {}/{}",
            keys.params().district_depth,
            keys.params().global_depth,
            snapshot.params().district_depth,
            snapshot.params().global_depth
        )));
    }

    let client = ProvingClient::new(
        keys.prover(),
        config.zk.prove_timeout_ms.map(Duration::from_millis),
    );
    let proof = client.prove(secret, commitment, path, args.action).await?;

    let request = SubmitRequest {
        proof: proof.proof_base64()?,
        public_inputs: proof.public_inputs,
        idempotency_key: Some(IdempotencyKey::new()),
        payload: args.payload,
    };
    let body = serde_json::to_string_pretty(&request)
        .map_err(|e| AtlasError::Serialization(e.to_string()))?;
    println!("{}", body);
    Ok(())
}

fn read_secret(path: &PathBuf) -> AtlasResult<IdentitySecret> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| AtlasError::NotFound(format!("Failed to read secret file: {}", e)))?;
    let bytes = FieldBytes::from_hex(contents.trim())?;
    IdentitySecret::from_bytes(*bytes.as_bytes())
}
